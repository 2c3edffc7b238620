use crate::consts;
use derive_more::{Display, Error};
use ntex::{http, web};
use tracing::warn;

/// Reasons a Twilio callback is turned away before its view runs
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum CallbackError {
    /// Missing or invalid self-issued bearer token
    #[display("Unauthorized")]
    AuthenticationFailure,
    /// Missing or non-matching `X-Twilio-Signature`
    #[display("Forbidden")]
    SignatureMismatch,
    #[display("Method Not Allowed")]
    MethodNotAllowed,
}

impl web::error::WebResponseError for CallbackError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        warn!("Twilio callback rejected: {}", self);

        let mut response = web::HttpResponse::build(self.status_code());
        response.set_header("content-type", "text/plain; charset=utf-8");
        if let CallbackError::AuthenticationFailure = self {
            response.set_header("www-authenticate", consts::BASIC_AUTH_CHALLENGE);
        }

        response.body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            CallbackError::AuthenticationFailure => http::StatusCode::UNAUTHORIZED,
            CallbackError::SignatureMismatch => http::StatusCode::FORBIDDEN,
            CallbackError::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Error body returned by the Twilio REST API
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<i64>,
    pub message: String,
    pub more_info: Option<String>,
    pub status: Option<u16>,
}

/// Failures while submitting an outbound call or message
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// Twilio rejected the request, e.g. an invalid destination number
    #[display("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
        more_info: Option<String>,
    },
    /// The request never got a Twilio answer
    #[display("Twilio API unreachable: {_0}")]
    Transport(#[error(not(source))] String),
    /// Rejected locally before reaching Twilio
    #[display("{_0}")]
    InvalidRequest(#[error(not(source))] String),
    /// A callback token was requested but no secret key is configured
    #[display("callback tokens are disabled without a secret key")]
    Disabled,
    /// The callback url could not be signed
    #[display("callback token could not be signed: {_0}")]
    Signing(#[error(not(source))] String),
}

impl ProviderError {
    pub fn from_api_body(status: u16, body: ApiErrorBody) -> Self {
        ProviderError::Api {
            status: body.status.unwrap_or(status),
            code: body.code,
            message: body.message,
            more_info: body.more_info,
        }
    }

    /// Twilio error code, if Twilio sent one
    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Api { code, .. } => *code,
            _ => None,
        }
    }
}
