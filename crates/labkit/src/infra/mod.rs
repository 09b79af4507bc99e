//! Infrastructure adapters for IO, clipboard, config, and logging.

pub mod clipboard;
pub mod config;
pub mod encoding;
pub mod logging;
