use thiserror::Error;

/// Everything that can stop a scenario before or while it is measured.
///
/// None of these are retried: a benchmark that cannot be set up the way it
/// was declared produces a worthless number, so the error is surfaced as is.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The backend rejected (or would reject) the requested configuration.
    #[error("cannot construct {backend} cache: {reason}")]
    Construction {
        backend: &'static str,
        reason: String,
    },

    /// A structured record could not be serialised.
    #[error("cannot encode structured record: {0}")]
    Encode(#[from] prost::EncodeError),

    /// An environment override could not be parsed.
    #[error("invalid setting {name}={value:?}: {reason}")]
    Config {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;

impl BenchError {
    pub(crate) fn construction(backend: &'static str, reason: impl Into<String>) -> Self {
        BenchError::Construction {
            backend,
            reason: reason.into(),
        }
    }
}
