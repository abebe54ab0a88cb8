#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond latencies fit in u64
    clippy::cast_sign_loss,           // Guarded by explicit non-negative checks
    clippy::missing_errors_doc,       // Error enums document themselves
    clippy::module_name_repetitions,  // e.g. ConfigError in config module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown
)]

pub mod app;
pub mod config;
pub mod domain;
pub mod formatter;
pub mod handler;
pub mod sender;

// Re-export main types for easy access
pub use config::{ConfigError, HandlerConfig, LokiSettings};
pub use domain::{FieldValue, LogRecord, Severity};
pub use handler::{BufferConfig, BufferedHandler, Delivery, LokiHandler};
pub use sender::{SendOutcome, SerializationError, TransportError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
