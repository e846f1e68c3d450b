// vim: tw=80
//! Call handlers: one argument-pattern list, one response, and an optional
//! listener, registered for a single method name.

use std::{
    cell::RefCell,
    fmt,
    mem,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{AtomicUsize, Ordering}
    }
};

use fragile::Fragile;
use tracing::trace;

use crate::{Arg, Error, Pattern, Value, error::join};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a handler.  Two handlers with identical patterns are still
/// distinct.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct HandlerId(usize);

impl HandlerId {
    fn next() -> Self {
        HandlerId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Return functions for handlers
enum Rfunc {
    Default,
    // Indicates that a `return_once` handler has already returned
    Expired,
    Mut(Box<dyn FnMut() -> Value + Send>),
    Once(Box<dyn FnOnce() -> Value + Send>),
}

impl Rfunc {
    fn call_mut(&mut self) -> Value {
        match self {
            Rfunc::Default => Value::none(),
            Rfunc::Expired => {
                panic!("Called a method twice that was expected only once")
            },
            Rfunc::Mut(f) => f(),
            Rfunc::Once(_) => {
                let fo = mem::replace(self, Rfunc::Expired);
                if let Rfunc::Once(f) = fo {
                    f()
                } else {
                    unreachable!()
                }
            },
        }
    }
}

thread_local! {
    /// Handlers whose responses are running on this thread, innermost last
    static ACTIVE: RefCell<Vec<HandlerId>> = const { RefCell::new(Vec::new()) };
}

/// Marks a handler as running on this thread until dropped, even if the
/// response panics.
struct ActiveGuard(HandlerId);

impl ActiveGuard {
    /// Returns `None` if the handler is already running on this thread.
    fn enter(id: HandlerId) -> Option<Self> {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&id) {
                None
            } else {
                active.push(id);
                Some(ActiveGuard(id))
            }
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().retain(|id| *id != self.0));
    }
}

/// Lock, taking over a poisoned lock as is.  A panicking response or
/// predicate leaves its handler usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Invoked with the handler itself every time it is selected, before its
/// response runs.
pub(crate) type Listener = Box<dyn Fn(&Handler) -> Result<(), Error> + Send + Sync>;

pub(crate) struct Handler {
    id: HandlerId,
    /// Method name, qualified with the mock's name if it has one
    method: String,
    patterns: Mutex<Arc<Vec<Pattern>>>,
    rfunc: Mutex<Rfunc>,
    listener: Option<Listener>,
}

impl Handler {
    pub(crate) fn new(method: String,
                      patterns: Vec<Pattern>,
                      listener: Option<Listener>) -> Self
    {
        Handler {
            id: HandlerId::next(),
            method,
            patterns: Mutex::new(Arc::new(patterns)),
            rfunc: Mutex::new(Rfunc::Default),
            listener
        }
    }

    pub(crate) fn id(&self) -> HandlerId {
        self.id
    }

    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    /// The current patterns.  No lock is held while they are evaluated, so a
    /// predicate may call back into the double.
    fn patterns(&self) -> Arc<Vec<Pattern>> {
        lock(&self.patterns).clone()
    }

    /// Do the actual arguments satisfy this handler's patterns?
    ///
    /// More actual arguments than patterns never match.  Patterns beyond the
    /// last actual argument are not checked.
    pub(crate) fn matches(&self, args: &[Arg]) -> bool {
        let patterns = self.patterns();
        args.len() <= patterns.len() &&
            patterns.iter()
                .zip(args)
                .all(|(p, a)| p.matches(a))
    }

    /// Explain why `args` don't match.
    pub(crate) fn explain(&self, args: &[Arg]) -> String {
        let patterns = self.patterns();
        if args.len() > patterns.len() {
            return format!("expected at most {} arguments, got {}",
                           patterns.len(), args.len());
        }
        patterns.iter()
            .zip(args)
            .enumerate()
            .find_map(|(i, (p, a))| {
                p.explain(a).map(|why| format!("argument {}: {}", i, why))
            }).unwrap_or_else(|| "matches".to_owned())
    }

    pub(crate) fn describe_patterns(&self) -> String {
        join(self.patterns().iter())
    }

    /// Notify the listener, then produce the response.
    ///
    /// A response may call the double again, but not in a way that selects
    /// this same handler: that fails with [`Error::RecursiveCall`].
    pub(crate) fn invoke(&self) -> Result<Value, Error> {
        let _guard = ActiveGuard::enter(self.id)
            .ok_or_else(|| Error::RecursiveCall {
                method: self.method.clone(),
                patterns: self.describe_patterns()
            })?;
        if let Some(listener) = &self.listener {
            listener(self)?;
        }
        trace!(handler = %self, "invoking response");
        Ok(lock(&self.rfunc).call_mut())
    }

    fn set_rfunc(&self, rfunc: Rfunc) {
        *lock(&self.rfunc) = rfunc;
    }

    fn set_patterns(&self, patterns: Vec<Pattern>) {
        *lock(&self.patterns) = Arc::new(patterns);
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.method, self.describe_patterns())
    }
}

/// A registered stub or expectation, used to configure its response.
///
/// Returned by [`Mock::stub_call`](crate::Mock::stub_call),
/// [`Mock::expect_call`](crate::Mock::expect_call), and the
/// [`Recorder`](crate::Recorder).  All configuration methods may be called
/// any number of times; the last one wins.
#[derive(Clone)]
pub struct Handle {
    handler: Arc<Handler>
}

impl Handle {
    pub(crate) fn new(handler: Arc<Handler>) -> Self {
        Handle { handler }
    }

    /// Supply a closure that will produce the return value each time the
    /// handler is selected.
    pub fn returning<F, T>(&self, mut f: F) -> &Self
        where F: FnMut() -> T + Send + 'static,
              T: 'static
    {
        self.will(move || Value::new(f()))
    }

    /// Return a constant value.  The value must be `Clone`.
    pub fn return_const<T>(&self, c: T) -> &Self
        where T: Clone + Send + 'static
    {
        self.returning(move || c.clone())
    }

    /// Supply an `FnOnce` closure that will provide the return value.  This
    /// is useful for return types that aren't `Clone`.  Selecting the handler
    /// a second time panics.
    pub fn return_once<F, T>(&self, f: F) -> &Self
        where F: FnOnce() -> T + Send + 'static,
              T: 'static
    {
        let fonce = move || Value::new(f());
        self.handler.set_rfunc(Rfunc::Once(Box::new(fonce)));
        self
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure isn't `Send`.
    ///
    /// It is a runtime error to call the double from a different thread than
    /// the one that originally called this method.
    pub fn returning_st<F, T>(&self, f: F) -> &Self
        where F: FnMut() -> T + 'static,
              T: 'static
    {
        let mut fragile = Fragile::new(f);
        self.will(move || Value::new((fragile.get_mut())()))
    }

    /// Single-threaded version of [`return_once`](#method.return_once).
    pub fn return_once_st<F, T>(&self, f: F) -> &Self
        where F: FnOnce() -> T + 'static,
              T: 'static
    {
        let fragile = Fragile::new(f);
        let fonce = move || Value::new((fragile.into_inner())());
        self.handler.set_rfunc(Rfunc::Once(Box::new(fonce)));
        self
    }

    /// Supply the raw response producer.  Use [`Value::none`] to explicitly
    /// return nothing.
    pub fn will<F>(&self, f: F) -> &Self
        where F: FnMut() -> Value + Send + 'static
    {
        self.handler.set_rfunc(Rfunc::Mut(Box::new(f)));
        self
    }

    /// Replace the argument patterns.
    pub fn with<I>(&self, patterns: I) -> &Self
        where I: IntoIterator<Item = Pattern>
    {
        self.handler.set_patterns(patterns.into_iter().collect());
        self
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Handle")
            .field(&format_args!("{}", self.handler))
            .finish()
    }
}
