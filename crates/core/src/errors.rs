use std::num::ParseIntError;

use thiserror::Error;

use crate::pipeline::PipelineStage;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("cannot parse timestamp `{raw}`: {reason}")]
    InvalidTimestamp { raw: String, reason: String },
    #[error("cannot find location: `{0}`")]
    UnknownArea(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreConfigError {
    #[error("unknown database scheme: `{0}`")]
    UnsupportedScheme(String),
    #[error("invalid storage url: {0}")]
    InvalidUrl(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("table reference `{0}` must be `project.dataset.table`")]
    MalformedTableReference(String),
    #[error("{backend} client construction failed: {message}")]
    ClientConstruction { backend: &'static str, message: String },
    #[error("{backend} write failed: {message}")]
    Write { backend: &'static str, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("empty text in form")]
    EmptyText,
    #[error("token may be missing or invalid: {0}")]
    AuthFailure(String),
    #[error("missing user_id in form")]
    MissingUserId,
    #[error("measure `{token}` is not an integer: {reason}")]
    InvalidMeasure { token: String, reason: String },
    #[error("measure {measure} is outside the accepted range {range}")]
    MeasureOutOfRange { measure: i64, range: String },
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("could not persist log: {0}")]
    PersistFailure(#[source] StorageError),
}

impl PipelineError {
    pub(crate) fn invalid_measure(token: &str, source: ParseIntError) -> Self {
        Self::InvalidMeasure { token: token.to_owned(), reason: source.to_string() }
    }

    /// Stage of the request pipeline that produced this error.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::EmptyText | Self::AuthFailure(_) | Self::MissingUserId => {
                PipelineStage::Validate
            }
            Self::InvalidMeasure { .. } | Self::MeasureOutOfRange { .. } => PipelineStage::Parse,
            Self::Timestamp(_) => PipelineStage::Timestamp,
            Self::PersistFailure(_) => PipelineStage::Persist,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let message = self.to_string();
        match self {
            Self::AuthFailure(_) => InterfaceError::Unauthorized { message, correlation_id },
            Self::EmptyText
            | Self::MissingUserId
            | Self::InvalidMeasure { .. }
            | Self::MeasureOutOfRange { .. }
            | Self::Timestamp(_) => InterfaceError::BadRequest { message, correlation_id },
            Self::PersistFailure(_) => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::BadRequest { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { message, .. }
            | Self::BadRequest { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Unauthorized { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "The request could not be authenticated.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}
