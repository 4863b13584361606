//! Error types for pixelization and harmonic transforms.
//!
//! This module provides a single error type [`SphereError`] shared by the pixel
//! scheme, the FFT engine and the transform core, so that failures propagate
//! across crate boundaries with `?` and no conversion layers.
//!
//! # Error Categories
//!
//! | Variant | Use Case | Recoverable? |
//! |---------|----------|--------------|
//! | [`InvalidParameter`](SphereError::InvalidParameter) | Bad nside, lmax, mmax, thread count, ring geometry | No |
//! | [`SizeMismatch`](SphereError::SizeMismatch) | Buffer length inconsistent with a descriptor | No |
//! | [`UnsupportedScheme`](SphereError::UnsupportedScheme) | Operation not available for the pixel ordering | No |
//! | [`NumericalInstability`](SphereError::NumericalInstability) | Non-finite values inside a recurrence or transform | No |
//! | [`ThreadPoolUnavailable`](SphereError::ThreadPoolUnavailable) | Worker threads could not be spawned | Yes |
//!
//! # Usage
//!
//! Most functions return [`SphereResult<T>`], which is `Result<T, SphereError>`.
//! Validation always happens before allocation or parallel dispatch:
//!
//! ```
//! use celestial_core::{SphereError, SphereResult};
//!
//! fn check_lmax(lmax: usize, mmax: usize) -> SphereResult<()> {
//!     if mmax > lmax {
//!         return Err(SphereError::invalid_parameter(
//!             "mmax",
//!             format!("mmax ({mmax}) must not exceed lmax ({lmax})"),
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_lmax(8, 9).is_err());
//! ```

use thiserror::Error;

/// Unified error type for pixel and transform operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SphereError {
    /// A construction or call parameter is outside its valid domain.
    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A caller buffer does not match the descriptor it is used with.
    #[error("Size mismatch in {context}: expected {expected}, got {actual}")]
    SizeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// The operation needs a pixel ordering or resolution the object does not support.
    #[error("Unsupported scheme for {operation}: {message}")]
    UnsupportedScheme { operation: String, message: String },

    /// A recurrence or transform produced NaN or infinity.
    #[error("Numerical instability in {context}: {message}")]
    NumericalInstability { context: String, message: String },

    /// Worker threads could not be created.
    ///
    /// This is the only recoverable variant: execution can continue sequentially.
    #[error("Thread pool unavailable: {message}")]
    ThreadPoolUnavailable { message: String },
}

/// Convenience alias for `Result<T, SphereError>`.
pub type SphereResult<T> = Result<T, SphereError>;

impl SphereError {
    /// Creates an [`InvalidParameter`](Self::InvalidParameter) error.
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Creates a [`SizeMismatch`](Self::SizeMismatch) error.
    pub fn size_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Creates an [`UnsupportedScheme`](Self::UnsupportedScheme) error.
    pub fn unsupported_scheme(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a [`NumericalInstability`](Self::NumericalInstability) error.
    pub fn numerical_instability(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NumericalInstability {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates a [`ThreadPoolUnavailable`](Self::ThreadPoolUnavailable) error.
    pub fn thread_pool_unavailable(message: impl Into<String>) -> Self {
        Self::ThreadPoolUnavailable {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller can continue in a degraded mode.
    ///
    /// Only [`ThreadPoolUnavailable`](Self::ThreadPoolUnavailable) qualifies:
    /// the transform falls back to single-threaded execution.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ThreadPoolUnavailable { .. })
    }
}
