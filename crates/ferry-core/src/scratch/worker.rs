//! Worker identity used to key scratch scopes.

use std::fmt;
use std::thread::ThreadId;

/// Identity of a logical worker: an OS thread, or a caller-named unit of
/// work such as a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkerId {
    Thread(ThreadId),
    Named(String),
}

impl WorkerId {
    /// Identity of the calling thread.
    pub fn current() -> Self {
        WorkerId::Thread(std::thread::current().id())
    }

    pub fn named(name: impl Into<String>) -> Self {
        WorkerId::Named(name.into())
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerId::Thread(id) => write!(f, "{:?}", id),
            WorkerId::Named(name) => f.write_str(name),
        }
    }
}
