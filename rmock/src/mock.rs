// vim: tw=80
//! Mocks, the doubles they hand out, and the recorders used to configure
//! them.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex}
};

use tracing::{debug, trace};

use crate::{
    Arg,
    Block,
    Error,
    Pattern,
    Value,
    error::join,
    handler::{Handle, Handler, HandlerId, Listener},
    table::DispatchTable
};

#[derive(Default)]
struct Inner {
    name: Option<String>,
    tables: Mutex<HashMap<String, Arc<DispatchTable>>>,
    /// Mandatory handlers, in registration order
    expectations: Mutex<Vec<Arc<Handler>>>,
    satisfied: Arc<Mutex<HashSet<HandlerId>>>,
}

impl Inner {
    fn qualify(&self, method: &str) -> String {
        match &self.name {
            Some(name) => format!("{}.{}", name, method),
            None => method.to_owned()
        }
    }

    fn register(&self, method: &str, patterns: Vec<Pattern>,
                listener: Option<Listener>) -> Arc<Handler>
    {
        let qualified = self.qualify(method);
        let handler = Arc::new(Handler::new(qualified.clone(), patterns,
                                            listener));
        self.tables.lock().unwrap()
            .entry(method.to_owned())
            .or_insert_with(|| Arc::new(DispatchTable::new(qualified)))
            .push(handler.clone());
        handler
    }

    fn dispatch(&self, method: &str, mut args: Vec<Arg>, block: Option<Block>)
        -> Result<Value, Error>
    {
        if let Some(block) = block {
            args.push(Arg::new(block));
        }
        trace!(method, args = %join(&args), "dispatching");
        // Don't hold the map's lock while the response runs
        let table = self.tables.lock().unwrap().get(method).cloned();
        match table {
            Some(table) => table.resolve(&args),
            None => Err(Error::UnknownMethod {
                method: self.qualify(method),
                args: join(&args)
            })
        }
    }
}

/// A configurable test double.
///
/// Register stubs and expectations by method name, hand
/// [`double`](#method.double) to the code under test, then
/// [`verify`](#method.verify) that every expectation was met.
///
/// Cloning a `Mock` yields another handle to the same state.
///
/// # Examples
/// ```
/// # use rmock::*;
/// let mock = Mock::new();
/// mock.stub_call("ping", patterns![]).return_const("pong");
/// mock.expect_call("commit", patterns![eq(3u32)]);
///
/// let double = mock.double();
/// assert_eq!("pong", double.call("ping", args![]).get::<&str>());
/// double.call("commit", args![3u32]);
/// mock.verify().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Mock {
    inner: Arc<Inner>
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose name qualifies every method name in its failure
    /// messages, like `db.query`.
    pub fn named<S: Into<String>>(name: S) -> Self {
        let inner = Inner {
            name: Some(name.into()),
            .. Inner::default()
        };
        Mock { inner: Arc::new(inner) }
    }

    /// Create a mock and configure it with `setup`.
    ///
    /// # Examples
    /// ```
    /// # use rmock::*;
    /// let mock = Mock::with_setup(|m| {
    ///     m.stub_call("ping", patterns![]).return_const("pong");
    /// });
    /// assert_eq!("pong", mock.double().call("ping", args![]).get::<&str>());
    /// ```
    pub fn with_setup<F: FnOnce(&Mock)>(setup: F) -> Self {
        let mock = Mock::new();
        setup(&mock);
        mock
    }

    /// The mock's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Register an optional, repeatable call.
    pub fn stub_call<I>(&self, method: &str, patterns: I) -> Handle
        where I: IntoIterator<Item = Pattern>
    {
        let handler = self.inner.register(method,
                                          patterns.into_iter().collect(),
                                          None);
        debug!(handler = %handler, "registered stub");
        Handle::new(handler)
    }

    /// Register a mandatory call.  It must be matched exactly once before
    /// [`verify`](#method.verify); matching it a second time fails that call.
    pub fn expect_call<I>(&self, method: &str, patterns: I) -> Handle
        where I: IntoIterator<Item = Pattern>
    {
        let satisfied = self.inner.satisfied.clone();
        let listener: Listener = Box::new(move |h: &Handler| {
            if satisfied.lock().unwrap().insert(h.id()) {
                Ok(())
            } else {
                Err(Error::DuplicateExpectationCall {
                    method: h.method().to_owned(),
                    patterns: h.describe_patterns()
                })
            }
        });
        let handler = self.inner.register(method,
                                          patterns.into_iter().collect(),
                                          Some(listener));
        self.inner.expectations.lock().unwrap().push(handler.clone());
        debug!(handler = %handler, "registered expectation");
        Handle::new(handler)
    }

    /// Record stubs using the methods of a `#[double]` trait's `Calls`
    /// extension, or [`Record::record`].
    pub fn stub(&self) -> Recorder<'_> {
        Recorder { mock: self, mode: Mode::Stub }
    }

    /// Record expectations using the methods of a `#[double]` trait's `Calls`
    /// extension, or [`Record::record`].
    pub fn expect(&self) -> Recorder<'_> {
        Recorder { mock: self, mode: Mode::Expect }
    }

    /// The object to hand to the code under test.
    pub fn double(&self) -> Double {
        Double { inner: self.inner.clone() }
    }

    /// Simulate a call to `method`.  A trailing `block`, if any, is matched as
    /// one more positional argument.
    pub fn dispatch(&self, method: &str, args: Vec<Arg>, block: Option<Block>)
        -> Result<Value, Error>
    {
        self.inner.dispatch(method, args, block)
    }

    /// Check that every expectation has been matched.
    ///
    /// Only the earliest registered unmet expectation is reported.
    pub fn verify(&self) -> Result<(), Error> {
        let satisfied = self.inner.satisfied.lock().unwrap();
        let expectations = self.inner.expectations.lock().unwrap();
        debug!(expectations = expectations.len(),
               satisfied = satisfied.len(),
               "verifying");
        match expectations.iter().find(|h| !satisfied.contains(&h.id())) {
            Some(h) => Err(Error::UnmetExpectation {
                method: h.method().to_owned(),
                patterns: h.describe_patterns()
            }),
            None => Ok(())
        }
    }

    /// Run `f` with the double, then [`verify`](#method.verify).
    ///
    /// If `f` panics, the panic propagates and verification is skipped.
    pub fn using<F, R>(&self, f: F) -> Result<R, Error>
        where F: FnOnce(&Double) -> R
    {
        let r = f(&self.double());
        self.verify()?;
        Ok(r)
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mock")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

/// The surface of a [`Mock`] seen by the code under test.
///
/// Every call is routed by method name to the mock's handlers.  The panicking
/// methods are meant for code under test, where any failure is a test
/// failure.
#[derive(Clone)]
pub struct Double {
    inner: Arc<Inner>
}

impl Double {
    /// Call `method`, panicking if the mock can't handle it.
    pub fn call(&self, method: &str, args: Vec<Arg>) -> Value {
        self.try_call(method, args)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// Call `method` with a trailing block, panicking if the mock can't
    /// handle it.
    pub fn call_with_block(&self, method: &str, args: Vec<Arg>, block: Block)
        -> Value
    {
        self.try_call_with_block(method, args, block)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_call(&self, method: &str, args: Vec<Arg>)
        -> Result<Value, Error>
    {
        self.inner.dispatch(method, args, None)
    }

    pub fn try_call_with_block(&self, method: &str, args: Vec<Arg>,
                               block: Block) -> Result<Value, Error>
    {
        self.inner.dispatch(method, args, Some(block))
    }
}

impl fmt::Debug for Double {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Double")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Stub,
    Expect
}

/// Turns calls into stub or expectation registrations on a [`Mock`].
///
/// A `Recorder` has no inherent methods, so nothing it offers can shadow a
/// method name being recorded.  Its only capability is [`Record`], which the
/// extension traits generated by [`#[double]`](crate::double) build on.
pub struct Recorder<'m> {
    mock: &'m Mock,
    mode: Mode,
}

/// Record a call to `method` whose arguments match `patterns`.
pub trait Record {
    fn record<I>(&self, method: &str, patterns: I) -> Handle
        where I: IntoIterator<Item = Pattern>;
}

impl Record for Recorder<'_> {
    fn record<I>(&self, method: &str, patterns: I) -> Handle
        where I: IntoIterator<Item = Pattern>
    {
        match self.mode {
            Mode::Stub => self.mock.stub_call(method, patterns),
            Mode::Expect => self.mock.expect_call(method, patterns)
        }
    }
}

impl fmt::Debug for Recorder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("mock", self.mock)
            .field("mode", &self.mode)
            .finish()
    }
}
