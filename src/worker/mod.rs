//! Persistent worker mode
//!
//! Hosts one pipeline per process behind a line-delimited JSON protocol on
//! stdin/stdout. Keeping the process alive across requests amortizes model
//! load cost; callers scale by running more worker processes.

mod protocol;
mod service;

pub use protocol::{Request, Response};
pub use service::{run, serve_stdio};
