use crate::oauth::OAuthError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("authorization code missing from callback")]
    MissingCode,

    #[error("authorization was denied: {0}")]
    Denied(String),

    #[error("identity provider error: {0}")]
    OAuth(#[from] OAuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingCode | GatewayError::Denied(_) => StatusCode::BAD_REQUEST,
            GatewayError::OAuth(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Provider error bodies are not shown to visitors.
        let detail = match &self {
            GatewayError::MissingCode | GatewayError::Denied(_) => {
                "Authorization was not completed. Please start again from the login link."
            }
            _ => "Verification failed. Please try again later.",
        };

        let body = Html(format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"><title>Verification failed</title></head>\
             <body><h1>Verification failed</h1><p>{detail}</p></body></html>"
        ));

        (status, body).into_response()
    }
}
