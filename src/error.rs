use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure of a single call against the marketplace API.
///
/// The first one encountered aborts the whole report, so a handler only ever
/// sees one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{endpoint} responded with {status}: {body}")]
    Upstream {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("sending request to {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("decoding response of {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The status the `/items` endpoint answers with for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::Transport { source, .. } if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport { .. } | Self::Decode { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn detail(&self) -> String {
        match self {
            // The upstream body is passed through untouched
            Self::Upstream { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}
