// vim: tw=80
//! Type-erased arguments and return values.

use std::{
    any::{self, Any as StdAny},
    fmt
};

use downcast::{Any, downcast};

use crate::Error;

/// Anything that can be passed to a double as an argument.
///
/// It is implemented for every `'static` type that implements `Debug`.  The
/// `Debug` bound is what lets failure messages show the actual arguments.
pub trait Argument: Any + fmt::Debug {}
downcast!(dyn Argument);

impl<T: Any + fmt::Debug> Argument for T {}

/// One actual argument of a call to a [`Double`](crate::Double).
pub struct Arg {
    value: Box<dyn Argument>,
    type_name: &'static str,
}

impl Arg {
    /// Wrap a value as an argument.
    pub fn new<T: Argument>(value: T) -> Self {
        Arg {
            value: Box::new(value),
            type_name: any::type_name::<T>()
        }
    }

    /// Borrow the argument as a `T`, if that is what it is.
    pub fn downcast_ref<T: Argument>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>().ok()
    }

    /// Is the argument a `T`?
    pub fn is<T: Argument>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the argument's concrete type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

/// Build a `Vec<Arg>` from a list of values.
///
/// # Examples
/// ```
/// # use rmock::*;
/// let args = args!["alice", 42u32];
/// assert_eq!(2, args.len());
/// assert!(args[1].is::<u32>());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($a:expr),+ $(,)?) => {
        ::std::vec![$( $crate::Arg::new($a), )+]
    };
}

/// A callable passed after the positional arguments of a call.
///
/// When supplied to [`Double::call_with_block`](crate::Double::call_with_block)
/// it is appended as one more positional argument before matching, so it can
/// be matched like any other argument, usually with
/// [`kind::<Block>()`](crate::kind).
pub struct Block(Box<dyn FnMut(&[Arg]) -> Value>);

impl Block {
    pub fn new<F>(f: F) -> Self
        where F: FnMut(&[Arg]) -> Value + 'static
    {
        Block(Box::new(f))
    }

    /// Invoke the block.
    pub fn call(&mut self, args: &[Arg]) -> Value {
        (self.0)(args)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<block>")
    }
}

/// What a handler's response produced.
///
/// A handler without a configured response produces "no value".
pub struct Value {
    inner: Option<Box<dyn StdAny>>,
    type_name: &'static str,
}

const NO_VALUE: &str = "no value";

impl Value {
    /// The absence of a value.
    pub fn none() -> Self {
        Value { inner: None, type_name: NO_VALUE }
    }

    pub fn new<T: 'static>(value: T) -> Self {
        Value {
            inner: Some(Box::new(value)),
            type_name: any::type_name::<T>()
        }
    }

    pub fn is_none(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.inner.as_ref().is_some_and(|v| v.is::<T>())
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Take the value out as a `T`.
    ///
    /// "No value" converts to `()`, so unit-returning methods need no
    /// response at all.
    pub fn downcast<T: 'static>(self) -> Result<T, Error> {
        let found = self.type_name;
        let boxed = self.inner
            .unwrap_or_else(|| Box::new(()) as Box<dyn StdAny>);
        boxed.downcast::<T>()
            .map(|b| *b)
            .map_err(|_| Error::ValueType {
                expected: any::type_name::<T>(),
                found
            })
    }

    /// Like [`downcast`](#method.downcast), but panics on a type mismatch.
    /// This is what generated trait doubles use for their return values.
    pub fn get<T: 'static>(self) -> T {
        match self.downcast() {
            Ok(v) => v,
            Err(e) => panic!("{}", e)
        }
    }

    /// Name of the contained value's type, or "no value".
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::none()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}
