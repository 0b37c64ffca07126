#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod authorize;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod gatekeeper;
pub mod operation;
pub mod pipeline;
pub mod platform;
pub mod resolve;
pub mod sanitize;
pub mod summary;
pub mod validate;

pub use config::SafeOutputsConfig;
pub use error::{ErrorCode, OperationError, SafeOutputError};
pub use pipeline::Pipeline;
pub use summary::BatchSummary;
