//! Internal utilities for the chat system.

pub mod keyed_lock;
pub mod time;
pub mod timeout;
pub mod validation;

pub use keyed_lock::{KeyedGuard, KeyedLocks};
pub use timeout::with_timeout;
pub use validation::Validator;
