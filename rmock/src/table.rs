// vim: tw=80
//! Per-method dispatch tables.

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::{
    Arg,
    Error,
    Value,
    error::join,
    handler::Handler
};

/// Every handler registered for one method name, in registration order.
pub(crate) struct DispatchTable {
    method: String,
    handlers: Mutex<Vec<Arc<Handler>>>,
}

impl DispatchTable {
    pub(crate) fn new(method: String) -> Self {
        DispatchTable {
            method,
            handlers: Mutex::new(Vec::new())
        }
    }

    pub(crate) fn push(&self, handler: Arc<Handler>) {
        self.handlers.lock().unwrap().push(handler);
    }

    /// Find the first handler, in registration order, whose patterns accept
    /// `args`.
    ///
    /// Patterns are evaluated on a snapshot of the handler list, so a
    /// predicate may call back into the double.
    pub(crate) fn select(&self, args: &[Arg]) -> Result<Arc<Handler>, Error> {
        let handlers = self.handlers.lock().unwrap().clone();
        match handlers.iter().find(|h| h.matches(args)) {
            Some(h) => {
                trace!(method = %self.method, handler = %h, "selected handler");
                Ok(h.clone())
            },
            None => {
                let detail = handlers.iter()
                    .map(|h| format!("\n  {}: {}", h, h.explain(args)))
                    .collect::<String>();
                Err(Error::NoMatchingHandler {
                    method: self.method.clone(),
                    args: join(args),
                    detail
                })
            }
        }
    }

    /// Select a handler for `args` and invoke it.
    ///
    /// The table's lock is released before the response runs, so a response
    /// may call back into the same double.
    pub(crate) fn resolve(&self, args: &[Arg]) -> Result<Value, Error> {
        let handler = self.select(args)?;
        handler.invoke()
    }
}
