use thiserror::Error;

/// Error kinds callers may need to tell apart.
/// They travel inside `anyhow::Error`; use `downcast_ref::<SplineFitError>()` to inspect them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplineFitError {
    /// Parallel inputs disagree in length, or a knot vector does not match its control points
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    /// An argument is outside of what the operation accepts
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A query that needs a prior `eval()` call
    #[error("surface has not been evaluated, call eval() before querying distances")]
    NotEvaluated,
}

/// Fails with [`SplineFitError::InvalidShape`] when `cond` does not hold
macro_rules! ensure_shape {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(anyhow::Error::from($crate::error::SplineFitError::InvalidShape(
                format!($($arg)+),
            )));
        }
    };
}

/// Fails with [`SplineFitError::InvalidArgument`] when `cond` does not hold
macro_rules! ensure_argument {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(anyhow::Error::from($crate::error::SplineFitError::InvalidArgument(
                format!($($arg)+),
            )));
        }
    };
}

pub(crate) use ensure_argument;
pub(crate) use ensure_shape;
