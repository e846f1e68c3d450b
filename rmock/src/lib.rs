// vim: tw=80
//! Name-based stubs, expectations, and test doubles.
//!
//! rmock builds a synthetic collaborator, a [`Double`], whose behavior is
//! configured by method name.  Tests register which calls are permitted
//! (stubs) and which are required (expectations), hand the double to the code
//! under test, and finally verify that every required call happened.
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Return values`](#return-values)
//! * [`Expectations`](#expectations)
//! * [`Trailing blocks`](#trailing-blocks)
//! * [`Typed doubles`](#typed-doubles)
//! * [`Automatic verification`](#automatic-verification)
//! * [`Crate features`](#crate-features)
//!
//! ## Getting started
//!
//! ```
//! use rmock::*;
//!
//! let mock = Mock::new();
//! mock.stub_call("ping", patterns![]).return_const("pong");
//!
//! let double = mock.double();
//! assert_eq!("pong", double.call("ping", args![]).get::<&str>());
//! assert_eq!("pong", double.call("ping", args![]).get::<&str>());
//! mock.verify().unwrap();
//! ```
//!
//! Calling a method that was never registered fails with
//! [`Error::UnknownMethod`].  The panicking [`Double::call`] is what code
//! under test normally uses; [`Double::try_call`] returns the error instead.
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! let e = mock.double().try_call("fly", args![]).unwrap_err();
//! assert!(matches!(e, Error::UnknownMethod{..}));
//! ```
//!
//! ## Matching arguments
//!
//! Every registration takes one [`Pattern`] per argument.  Handlers for the
//! same method are tried in registration order and the first one whose
//! patterns all accept the actual arguments wins.  A call with more
//! arguments than the handler has patterns never matches it.  Patterns beyond
//! the last actual argument are not checked.
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! mock.stub_call("greet", patterns![eq("alice")]).return_const("hi alice");
//! mock.stub_call("greet", patterns![eq("bob")]).return_const("hi bob");
//!
//! let double = mock.double();
//! assert_eq!("hi bob", double.call("greet", args!["bob"]).get::<&str>());
//! let e = double.try_call("greet", args!["carol"]).unwrap_err();
//! assert!(matches!(e, Error::NoMatchingHandler{..}));
//! ```
//!
//! Patterns come from the [`predicates`] crate.  Besides [`eq`] there are
//! [`ne`], [`in_range`], [`contains`], [`kind`], [`anything`], [`function`],
//! and, with the `regex` feature, [`matches_regex`].  Any other
//! [`Predicate`] can be used through [`Pattern::new`].
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! mock.stub_call("score", patterns![in_range(1..=5)]).return_const("low");
//! mock.stub_call("score", patterns![in_range(6..=10)]).return_const("high");
//!
//! let double = mock.double();
//! assert_eq!("low", double.call("score", args![3]).get::<&str>());
//! assert_eq!("high", double.call("score", args![8]).get::<&str>());
//! ```
//!
//! ## Return values
//!
//! A handler without a response returns "no value", which converts to `()`.
//! Responses are configured on the [`Handle`] returned by registration with
//! [`returning`](Handle::returning), [`return_const`](Handle::return_const),
//! [`return_once`](Handle::return_once), or the single-threaded
//! [`returning_st`](Handle::returning_st) and
//! [`return_once_st`](Handle::return_once_st).  The last one configured wins.
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! let mut n = 0u32;
//! mock.stub_call("next", patterns![]).returning(move || { n += 1; n });
//!
//! let double = mock.double();
//! assert_eq!(1, double.call("next", args![]).get::<u32>());
//! assert_eq!(2, double.call("next", args![]).get::<u32>());
//! ```
//!
//! ## Expectations
//!
//! An expectation must be matched exactly once.  [`Mock::verify`] reports the
//! earliest registered expectation that never was, and a second match fails
//! immediately with [`Error::DuplicateExpectationCall`].
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! mock.expect_call("commit", patterns![]);
//! let double = mock.double();
//! double.call("commit", args![]);
//! assert!(double.try_call("commit", args![]).is_err());
//! ```
//!
//! [`Mock::using`] runs a closure with the double and verifies afterwards.
//!
//! ## Trailing blocks
//!
//! A [`Block`] passed with [`Double::call_with_block`] is appended as one
//! more positional argument before matching.
//!
//! ```
//! # use rmock::*;
//! let mock = Mock::new();
//! mock.stub_call("each", patterns![kind::<Block>()]);
//! mock.double().call_with_block("each", args![], Block::new(|_| Value::none()));
//! ```
//!
//! ## Typed doubles
//!
//! [`#[double]`](double) on a trait implements that trait for [`Double`] and
//! generates a `Calls` extension trait for [`Recorder`], so that both sides
//! read like ordinary method calls.  Without such a trait, calls are recorded
//! by name with [`recording::Record`].
//!
//! ```
//! # use rmock::*;
//! #[double]
//! trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! let mock = Mock::new();
//! mock.stub().greet(eq(String::from("bob"))).return_const(String::from("hi bob"));
//!
//! fn welcome(g: &dyn Greeter) -> String {
//!     g.greet("bob")
//! }
//! assert_eq!("hi bob", welcome(&mock.double()));
//! ```
//!
//! Reference arguments are converted with `ToOwned`, so `&str` arguments are
//! recorded as `String`.
//!
//! ## Automatic verification
//!
//! A [`Session`] verifies every mock it created when it is dropped.
//!
//! ## Crate features
//!
//! * `regex` (default): enables [`matches_regex`].

mod error;
mod handler;
mod mock;
mod pattern;
mod session;
mod table;
mod value;

pub use error::Error;
pub use handler::Handle;
pub use mock::{Double, Mock, Recorder};
pub use pattern::{
    Pattern,
    anything,
    contains,
    eq,
    function,
    in_range,
    kind,
    ne
};
#[cfg(feature = "regex")]
pub use pattern::matches_regex;
pub use session::Session;
pub use value::{Arg, Argument, Block, Value};

/// Recording calls by method name.
///
/// [`Record`](recording::Record) stays out of the crate root so that
/// `use rmock::*` never conflicts with a doubled method named `record`.
pub mod recording {
    pub use crate::mock::Record;
}

pub use predicates::prelude::{Predicate, predicate};
pub use rmock_derive::double;
