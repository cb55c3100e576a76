//! Core error types for fedra.

use thiserror::Error;

/// Result type alias using `FedraError`.
pub type FedraResult<T> = std::result::Result<T, FedraError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for fedra operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FedraError {
    /// Table or stage could not be mapped to a data source, or a data source
    /// has no connector / connection available.
    #[error("ConfigurationError: {0}")]
    ConfigurationError(String),

    /// A plan node kind the physical converter cannot execute.
    #[error("UnsupportedOperator: {0}")]
    UnsupportedOperator(String),

    /// An expression form the row compiler cannot evaluate.
    #[error("UnsupportedExpression: {0}")]
    UnsupportedExpression(String),

    /// Operator lifecycle misuse (`next()` past exhaustion, before `open()`).
    #[error("UsageError: {0}")]
    UsageError(String),

    /// An intermediate result exceeded the configured row cap.
    #[error("ResourceExhausted: {operator} accumulated more than {limit} rows")]
    ResourceExhausted {
        /// Operator that hit the cap.
        operator: String,
        /// Configured intermediate result limit.
        limit: usize,
    },

    /// A query issued against one data source failed.
    #[error("RemoteExecutionError [{data_source}]: {message}")]
    RemoteExecution {
        /// Data source the query was issued against.
        data_source: String,
        /// Error reported by the source.
        message: String,
    },

    /// Schema discovery failed for a data source.
    #[error("DiscoveryError [{data_source}]: {message}")]
    DiscoveryError {
        /// Data source whose discovery failed.
        data_source: String,
        /// Underlying failure.
        message: String,
    },

    /// A data source status change that the lifecycle does not allow.
    #[error("InvalidStateTransition: {0}")]
    InvalidStateTransition(String),

    /// Invalid parameter provided (precondition failure).
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Logical planning or optimization failure.
    #[error("PlanningError: {0}")]
    PlanningError(String),

    /// Query execution error not covered by a more specific variant.
    #[error("ExecutionError: {0}")]
    ExecutionError(String),

    /// Internal error (bug in fedra).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    ExternalError(GenericError),
}

impl FedraError {
    /// Create a new `ConfigurationError`.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a new `UnsupportedOperator` error.
    pub fn unsupported_operator<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedOperator(msg.into())
    }

    /// Create a new `UnsupportedExpression` error.
    pub fn unsupported_expression<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedExpression(msg.into())
    }

    /// Create a new `UsageError`.
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Self::UsageError(msg.into())
    }

    /// Create a resource exhausted error for an operator.
    pub fn resource_exhausted<S: Into<String>>(operator: S, limit: usize) -> Self {
        Self::ResourceExhausted {
            operator: operator.into(),
            limit,
        }
    }

    /// Create a remote execution error.
    pub fn remote<D: Into<String>, M: Into<String>>(data_source: D, message: M) -> Self {
        Self::RemoteExecution {
            data_source: data_source.into(),
            message: message.into(),
        }
    }

    /// Create a discovery error.
    pub fn discovery<D: Into<String>, M: Into<String>>(data_source: D, message: M) -> Self {
        Self::DiscoveryError {
            data_source: data_source.into(),
            message: message.into(),
        }
    }

    /// Create a new `InvalidStateTransition` error.
    pub fn invalid_transition<S: Into<String>>(msg: S) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `PlanningError`.
    pub fn planning<S: Into<String>>(msg: S) -> Self {
        Self::PlanningError(msg.into())
    }

    /// Create a new `ExecutionError`.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Whether this error is the intermediate-result cap being exceeded.
    ///
    /// Callers use this to react (narrow the query) instead of retrying.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }

    /// Whether this error came from a remote data source.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteExecution { .. })
    }
}

/// Ensure a condition holds, returning an `ExecutionError` if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::FedraError::ExecutionError($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::FedraError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with an `InvalidParameter` error.
#[macro_export]
macro_rules! invalid_param {
    ($($arg:tt)*) => {
        return Err($crate::FedraError::InvalidParameter(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_positive(n: i64) -> FedraResult<i64> {
        ensure!(n > 0, InvalidParameter: "expected positive, got {}", n);
        Ok(n)
    }

    #[test]
    fn test_error_display() {
        let err = FedraError::type_error("expected Int64, got String");
        assert_eq!(err.to_string(), "TypeError: expected Int64, got String");

        let err = FedraError::remote("ds1", "connection reset");
        assert_eq!(
            err.to_string(),
            "RemoteExecutionError [ds1]: connection reset"
        );
    }

    #[test]
    fn test_resource_exhausted_is_distinguishable() {
        let err = FedraError::resource_exhausted("HashJoinExec", 10);
        assert!(err.is_resource_exhausted());
        assert!(!FedraError::execution("boom").is_resource_exhausted());
        assert!(err.to_string().contains("more than 10 rows"));
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(check_positive(3).unwrap(), 3);
        let err = check_positive(-1).unwrap_err();
        assert!(matches!(err, FedraError::InvalidParameter(_)));
    }
}
