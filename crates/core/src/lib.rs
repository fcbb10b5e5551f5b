//! vmdoctor core: diagnostic model, ports and the phased check pipeline
//!
//! Infrastructure (process spawning, sysinfo, HTTP, config files) lives in
//! adapter crates behind the traits in [`port`].

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
