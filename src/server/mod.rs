//! Accepting side: the listening socket, the accept loop and worker bookkeeping.

pub mod listener;
pub mod supervisor;

pub use listener::Server;
pub use supervisor::{Supervisor, WorkerStats};
