// vim: tw=80
//! Automatic verification of every mock created during a test.

use std::{
    sync::Mutex,
    thread
};

use crate::{Error, Mock};

/// Creates mocks and verifies all of them when dropped.
///
/// Dropping a `Session` panics if any of its mocks has an unmet expectation,
/// unless the thread is already panicking.
///
/// # Examples
/// ```should_panic
/// # use rmock::*;
/// let session = Session::new();
/// let mock = session.mock();
/// mock.expect_call("commit", patterns![]);
/// // `commit` is never called, so dropping the session panics
/// ```
#[derive(Debug, Default)]
pub struct Session {
    mocks: Mutex<Vec<Mock>>
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, mock: Mock) -> Mock {
        self.mocks.lock().unwrap().push(mock.clone());
        mock
    }

    pub fn mock(&self) -> Mock {
        self.track(Mock::new())
    }

    pub fn named<S: Into<String>>(&self, name: S) -> Mock {
        self.track(Mock::named(name))
    }

    pub fn mock_with<F: FnOnce(&Mock)>(&self, setup: F) -> Mock {
        self.track(Mock::with_setup(setup))
    }

    /// Verify every mock, in creation order, stopping at the first failure.
    pub fn verify(&self) -> Result<(), Error> {
        self.mocks.lock().unwrap()
            .iter()
            .try_for_each(Mock::verify)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !thread::panicking() {
            if let Err(e) = self.verify() {
                panic!("{}", e);
            }
        }
    }
}
