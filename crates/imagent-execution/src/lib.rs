//! Process execution for imagent.
//!
//! Detects the installed ImageMagick entry point and runs validated commands
//! with captured output and wall-clock timeouts.

pub mod detection;
pub mod executor;

pub use detection::ImageMagickBinary;
pub use executor::{CommandExecutor, DEFAULT_INFO_TIMEOUT, DEFAULT_TIMEOUT, ExecutorOptions};
