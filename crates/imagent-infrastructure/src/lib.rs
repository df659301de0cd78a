//! Infrastructure for imagent: paths, configuration and secret loading, the
//! JSONL audit log, and tracing setup.

pub mod audit_log;
pub mod config_service;
pub mod env;
pub mod logging;
pub mod paths;
pub mod secret_service;
pub mod storage;

pub use audit_log::JsonlAuditLog;
pub use config_service::ConfigService;
pub use env::Environment;
pub use logging::{LoggingGuard, init_logging};
pub use paths::{ImagentPaths, PathError};
pub use secret_service::SecretServiceImpl;
pub use storage::{SecretStorage, SecretStorageError};
