//! HTTP API for card submission and queue inspection

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{CardRequest, JobError};
use crate::service::Service;

pub fn router(service: Service) -> Router {
    Router::new()
        .route("/cards", post(personalize_card))
        .route("/jobs", get(list_jobs))
        .with_state(service)
}

enum ApiError {
    Validation(String),
    Job(JobError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Job(JobError::Cancelled | JobError::QueueClosed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service is shutting down").into_response()
            }
            ApiError::Job(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

/// Enqueue a card and answer once it has been written (or has failed)
async fn personalize_card(
    State(service): State<Service>,
    Json(request): Json<CardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;

    let response = service.submit(request).await.map_err(ApiError::Job)?;
    Ok(Json(response))
}

async fn list_jobs(State(service): State<Service>) -> impl IntoResponse {
    Json(service.jobs())
}
