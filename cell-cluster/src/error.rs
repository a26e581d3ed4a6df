use leiden::NetworkError;
use thiserror::Error;

/// Errors raised by the clustering pipeline. Every error is reported before any partial
/// result is written to the dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// `k` was zero.
    #[error("k must be a positive integer")]
    KNotPositive,

    /// `k` was larger than `n - 2` for `n` points.
    #[error("k must be smaller than the total number of points minus one (k = {k}, {n} points)")]
    KTooLarge {
        /// Requested neighbor count
        k: usize,
        /// Number of points
        n: usize,
    },

    /// Any other malformed argument: unknown method, non-finite coordinates, bad options.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// There are no points to cluster.
    #[error("no points to cluster")]
    EmptyInput,

    /// A combination of options that the selected method does not support.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

impl ClusterError {
    /// True for the argument-validation family of errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ClusterError::KNotPositive | ClusterError::KTooLarge { .. } | ClusterError::InvalidArgument(_)
        )
    }
}

impl From<NetworkError> for ClusterError {
    fn from(err: NetworkError) -> Self {
        ClusterError::InvalidArgument(err.to_string())
    }
}

/// Result alias for the clustering pipeline
pub type Result<T> = std::result::Result<T, ClusterError>;
