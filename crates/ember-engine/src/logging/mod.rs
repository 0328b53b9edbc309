//! Logger initialization for binaries and tests built on the engine.
//!
//! Library code only talks to the `log` facade; installing `env_logger`
//! is left to whoever owns `main`.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
