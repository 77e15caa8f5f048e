use serde::{Deserialize, Serialize};

use barometer_core::errors::InterfaceError;

/// Body returned with every non-200 reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
}

impl ErrorBody {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code }
    }
}

impl From<&InterfaceError> for ErrorBody {
    fn from(error: &InterfaceError) -> Self {
        Self::new(error.status_code(), error.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongBody {
    pub message: String,
}

impl Default for PongBody {
    fn default() -> Self {
        Self { message: "PONG".to_owned() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use barometer_core::errors::PipelineError;

    use super::{ErrorBody, PongBody};

    #[test]
    fn error_body_carries_status_and_message() {
        let interface = PipelineError::AuthFailure("invalid request/credentials".to_owned())
            .into_interface("req-1");
        let body = ErrorBody::from(&interface);

        assert_eq!(body.status_code, 401);
        assert!(body.message.contains("invalid request/credentials"));
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({ "message": body.message, "status_code": 401 })
        );
    }

    #[test]
    fn pong_shape() {
        assert_eq!(
            serde_json::to_value(PongBody::default()).expect("serialize"),
            json!({ "message": "PONG" })
        );
    }
}
