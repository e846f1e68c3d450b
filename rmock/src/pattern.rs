// vim: tw=80
//! Argument patterns.
//!
//! A [`Pattern`] decides whether one actual argument is acceptable.  Patterns
//! are built from [`predicates`], so anything implementing
//! [`Predicate`](predicates::Predicate) can be used to match arguments of the
//! type it judges.  An argument of any other type never matches.

use std::{
    any,
    fmt,
    marker::PhantomData,
    ops::RangeInclusive
};

use cfg_if::cfg_if;
use predicates::prelude::*;
use predicates_tree::CaseTreeExt;

use crate::{Arg, Argument};
#[cfg(feature = "regex")]
use crate::Error;

/// Type-erased predicate over a single argument.
trait ArgPredicate: fmt::Display + Send + Sync {
    fn eval(&self, arg: &Arg) -> bool;

    /// Describe why `arg` fails this predicate, or `None` if it doesn't.
    fn explain(&self, arg: &Arg) -> Option<String>;
}

/// Judges one positional argument of a call.
pub struct Pattern(Box<dyn ArgPredicate>);

impl Pattern {
    /// Match arguments of type `T` with any [`Predicate`] over `T`.
    ///
    /// # Examples
    /// ```
    /// # use rmock::*;
    /// use rmock::predicate;
    /// let p = Pattern::new::<u32, _>(predicate::gt(3u32));
    /// assert!(p.matches(&Arg::new(4u32)));
    /// assert!(!p.matches(&Arg::new(2u32)));
    /// // Arguments of other types never match
    /// assert!(!p.matches(&Arg::new(4i64)));
    /// ```
    pub fn new<T, P>(pred: P) -> Self
        where T: Argument + Send + Sync,
              P: Predicate<T> + Send + Sync + 'static
    {
        Pattern(Box::new(Typed { pred, _t: PhantomData::<fn(&T)> }))
    }

    pub fn matches(&self, arg: &Arg) -> bool {
        self.0.eval(arg)
    }

    /// Explain why `arg` does not match, as a `predicates` case tree.
    /// Returns `None` if it does match.
    pub fn explain(&self, arg: &Arg) -> Option<String> {
        self.0.explain(arg)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pattern({})", self.0)
    }
}

fn type_mismatch<T>(arg: &Arg) -> String {
    format!("expected a {}, got a {}", any::type_name::<T>(), arg.type_name())
}

struct Typed<T, P> {
    pred: P,
    _t: PhantomData<fn(&T)>
}

impl<T, P> fmt::Display for Typed<T, P>
    where P: fmt::Display
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.pred, f)
    }
}

impl<T, P> ArgPredicate for Typed<T, P>
    where T: Argument + Send + Sync,
          P: Predicate<T> + Send + Sync
{
    fn eval(&self, arg: &Arg) -> bool {
        arg.downcast_ref::<T>()
            .is_some_and(|v| self.pred.eval(v))
    }

    fn explain(&self, arg: &Arg) -> Option<String> {
        match arg.downcast_ref::<T>() {
            Some(v) => self.pred.find_case(false, v)
                .map(|case| case.tree().to_string()),
            None => Some(type_mismatch::<T>(arg))
        }
    }
}

/// Matches textual arguments, either `&'static str` or `String`.
struct Text<P>(P);

impl<P: fmt::Display> fmt::Display for Text<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

fn as_text(arg: &Arg) -> Option<&str> {
    if let Some(s) = arg.downcast_ref::<&'static str>() {
        Some(*s)
    } else {
        arg.downcast_ref::<String>().map(String::as_str)
    }
}

impl<P> ArgPredicate for Text<P>
    where P: Predicate<str> + Send + Sync
{
    fn eval(&self, arg: &Arg) -> bool {
        as_text(arg).is_some_and(|s| self.0.eval(s))
    }

    fn explain(&self, arg: &Arg) -> Option<String> {
        match as_text(arg) {
            Some(s) => self.0.find_case(false, s)
                .map(|case| case.tree().to_string()),
            None => Some(type_mismatch::<String>(arg))
        }
    }
}

struct Kind<T>(PhantomData<fn(&T)>);

impl<T> fmt::Display for Kind<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "kind({})", any::type_name::<T>())
    }
}

impl<T: Argument> ArgPredicate for Kind<T> {
    fn eval(&self, arg: &Arg) -> bool {
        arg.is::<T>()
    }

    fn explain(&self, arg: &Arg) -> Option<String> {
        (!self.eval(arg)).then(|| type_mismatch::<T>(arg))
    }
}

struct Anything;

impl fmt::Display for Anything {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("anything")
    }
}

impl ArgPredicate for Anything {
    fn eval(&self, _arg: &Arg) -> bool {
        true
    }

    fn explain(&self, _arg: &Arg) -> Option<String> {
        None
    }
}

/// Match an argument exactly equal to `value`.
pub fn eq<T>(value: T) -> Pattern
    where T: Argument + PartialEq + Send + Sync
{
    Pattern::new::<T, _>(predicate::eq(value))
}

/// Match any argument of type `T` that is not equal to `value`.
pub fn ne<T>(value: T) -> Pattern
    where T: Argument + PartialEq + Send + Sync
{
    Pattern::new::<T, _>(predicate::ne(value))
}

/// Match an argument contained in an inclusive range.
///
/// # Examples
/// ```
/// # use rmock::*;
/// let p = in_range(1..=5);
/// assert!(p.matches(&Arg::new(5)));
/// assert!(!p.matches(&Arg::new(6)));
/// ```
pub fn in_range<T>(range: RangeInclusive<T>) -> Pattern
    where T: Argument + PartialOrd + Send + Sync
{
    let (lo, hi) = range.into_inner();
    Pattern::new::<T, _>(predicate::ge(lo).and(predicate::le(hi)))
}

/// Match an argument of type `T` with an arbitrary closure.
pub fn function<T, F>(f: F) -> Pattern
    where T: Argument + Send + Sync,
          F: Fn(&T) -> bool + Send + Sync + 'static
{
    Pattern::new::<T, _>(predicate::function(f))
}

/// Match any argument whose type is `T`, regardless of its value.
///
/// This is how a trailing [`Block`](crate::Block) is usually matched.
pub fn kind<T: Argument>() -> Pattern {
    Pattern(Box::new(Kind::<T>(PhantomData)))
}

/// Match any argument at all.
pub fn anything() -> Pattern {
    Pattern(Box::new(Anything))
}

/// Match a `&'static str` or `String` argument containing `needle`.
pub fn contains(needle: &str) -> Pattern {
    Pattern(Box::new(Text(predicate::str::contains(needle))))
}

cfg_if! {
    if #[cfg(feature = "regex")] {
        /// Match a `&'static str` or `String` argument containing a match for
        /// the regular expression `re`.
        ///
        /// # Examples
        /// ```
        /// # use rmock::*;
        /// let p = matches_regex("^[a-z]+@example\\.com$").unwrap();
        /// assert!(p.matches(&Arg::new("bob@example.com")));
        /// assert!(!p.matches(&Arg::new(String::from("bob@example.org"))));
        /// ```
        pub fn matches_regex(re: &str) -> Result<Pattern, Error> {
            predicate::str::is_match(re)
                .map(|p| Pattern(Box::new(Text(p))))
                .map_err(|e| Error::InvalidPattern(e.to_string()))
        }
    }
}

/// Build a `Vec<Pattern>` from a list of patterns.
#[macro_export]
macro_rules! patterns {
    () => {
        ::std::vec::Vec::<$crate::Pattern>::new()
    };
    ($($p:expr),+ $(,)?) => {
        ::std::vec![$( $p, )+]
    };
}
