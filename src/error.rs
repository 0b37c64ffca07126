use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const MAX_ECHOED_VALUE_CHARS: usize = 80;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the safe-output gate.
///
/// Only run-level failures travel as `Err`. Per-operation failures are data
/// (`OperationError`) and live in the batch summary.
#[derive(Debug, Error)]
pub enum SafeOutputError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Platform ─────────────────────────────────────────────────────────
    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    // ── IO ───────────────────────────────────────────────────────────────
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("integrity mismatch: expected digest {expected}, computed {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Platform errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlatformErrorClass {
    /// Timeouts, connection failures, 408 and 5xx.
    Transient,
    /// Explicit rate-limit signal (429, or 403 with an exhausted quota header).
    RateLimited,
    /// The platform understood the request and refused its content (422).
    ValidationRejected,
    /// Any other client error.
    Permanent,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{class} platform error (status {status:?}): {message}")]
pub struct PlatformError {
    pub class: PlatformErrorClass,
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl PlatformError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: PlatformErrorClass::Transient,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: PlatformErrorClass::Permanent,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Classify an HTTP failure status.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        rate_limit_exhausted: bool,
        retry_after: Option<Duration>,
    ) -> Self {
        let class = match status {
            429 => PlatformErrorClass::RateLimited,
            403 if rate_limit_exhausted => PlatformErrorClass::RateLimited,
            408 | 500..=599 => PlatformErrorClass::Transient,
            422 => PlatformErrorClass::ValidationRejected,
            _ => PlatformErrorClass::Permanent,
        };
        Self {
            class,
            status: Some(status),
            message: message.into(),
            retry_after,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.class,
            PlatformErrorClass::Transient | PlatformErrorClass::RateLimited
        )
    }
}

// ─── Sanitization errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("content is encoded more than two levels deep near '{fragment}'")]
    NestedEncoding { fragment: String },
}

// ─── Operation error taxonomy ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    SchemaInvalid,
    LimitExceeded,
    UnauthorizedDomain,
    UnauthorizedRepository,
    MissingOrAmbiguousDependency,
    SanitizationUnrecoverable,
    PlatformApiError,
    ConfigurationIntegrityFailure,
}

/// Stable, machine-readable error codes surfaced in the batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidSchema,
    UnknownOperation,
    LimitExceeded,
    UnauthorizedDomain,
    MalformedRepository,
    UnauthorizedRepository,
    DuplicateTemporaryId,
    MissingDependency,
    DependencyCycle,
    BlockedByDependency,
    SanitizationUnrecoverable,
    PlatformTransientFailure,
    PlatformRequestFailed,
    SkippedAfterFailure,
    ConfigIntegrityMismatch,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidSchema | Self::UnknownOperation => ErrorKind::SchemaInvalid,
            Self::LimitExceeded => ErrorKind::LimitExceeded,
            Self::UnauthorizedDomain => ErrorKind::UnauthorizedDomain,
            Self::MalformedRepository | Self::UnauthorizedRepository => {
                ErrorKind::UnauthorizedRepository
            }
            Self::DuplicateTemporaryId
            | Self::MissingDependency
            | Self::DependencyCycle
            | Self::BlockedByDependency => ErrorKind::MissingOrAmbiguousDependency,
            Self::SanitizationUnrecoverable => ErrorKind::SanitizationUnrecoverable,
            Self::PlatformTransientFailure
            | Self::PlatformRequestFailed
            | Self::SkippedAfterFailure => ErrorKind::PlatformApiError,
            Self::ConfigIntegrityMismatch => ErrorKind::ConfigurationIntegrityFailure,
        }
    }
}

/// One per-operation (or batch-level, when `index` is `None`) failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct OperationError {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl OperationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: code.kind(),
            message: message.into(),
            index: None,
            field: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Shorten an attacker-controlled value before it is placed into a message.
pub fn echo_value(value: &str) -> String {
    let mut chars = value.chars();
    let head: String = chars.by_ref().take(MAX_ECHOED_VALUE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SafeOutputError>;
