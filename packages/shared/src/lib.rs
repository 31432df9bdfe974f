//! Utilities shared by the Hiroba packages: logging setup and clock abstraction.

pub mod logger;
pub mod time;
