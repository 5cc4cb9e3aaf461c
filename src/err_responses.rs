use axum::response::{IntoResponse, Response};
use maud::html;
use reqwest::StatusCode;
use tracing::warn;

use crate::{components, icons};

/// How a failed operation should reach the user: a bare status, an inline
/// blocking alert swapped into the target, or a transient toast.
pub enum ErrorResponse {
    InternalServerError,
    StatusCode(StatusCode),
    Alert,
    Toast,
}

pub trait MapErrorResponse<T> {
    fn map_err_response(self, mapper: ErrorResponse) -> Result<T, Response>;
}

impl<T, E: ToString> MapErrorResponse<T> for Result<T, E> {
    fn map_err_response(self, mapper: ErrorResponse) -> Result<T, Response> {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(mapper.transform(err)),
        }
    }
}

impl ErrorResponse {
    pub fn transform<E: ToString>(&self, err: E) -> Response {
        let err = err.to_string();
        warn!(%err, "rendering error response");
        match self {
            Self::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
            }
            Self::StatusCode(code) => (*code, err).into_response(),
            Self::Alert => {
                html! { ."alert"."alert-error" {(icons::error()) span {(err)}} }.into_response()
            }
            Self::Toast => components::ToastAlert::Error(&err).into_response(),
        }
    }
}
