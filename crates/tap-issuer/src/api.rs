//! HTTP API for account management and card issuance

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::models::{CardRequest, CreateAccount};
use crate::service::{Service, ServiceError};

pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/:account_id", get(get_account))
        .route("/accounts/:account_id/cards", post(issue_card))
        .route("/accounts/:account_id/transactions", get(list_transactions))
        .with_state(service)
}

/// Boundary errors map to 4xx with a human message; everything else is a 500
enum ApiError {
    Validation(String),
    Service(ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Service(ServiceError::NotFound) => {
                (StatusCode::NOT_FOUND, "not found").into_response()
            }
            ApiError::Service(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

async fn create_account(
    State(service): State<Arc<Service>>,
    Json(create): Json<CreateAccount>,
) -> Result<impl IntoResponse, ApiError> {
    create.validate().map_err(ApiError::Validation)?;

    let account = service.create_account(create);
    Ok((StatusCode::CREATED, Json(account)))
}

async fn list_accounts(State(service): State<Arc<Service>>) -> impl IntoResponse {
    Json(service.list_accounts())
}

async fn get_account(
    State(service): State<Arc<Service>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account = service.get_account(&account_id)?;
    Ok(Json(account))
}

#[derive(Debug, Default, Deserialize)]
struct IssueCardQuery {
    #[serde(rename = "flashCard")]
    flash_card: Option<bool>,
}

async fn issue_card(
    State(service): State<Arc<Service>>,
    Path(account_id): Path<String>,
    Query(query): Query<IssueCardQuery>,
    body: Option<Json<CardRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let flash = query.flash_card.unwrap_or(false);
    let request = body.map(|Json(request)| request).unwrap_or_default();

    // the card writer needs a real expiry and PIN; plain issuance does not
    if flash {
        request.validate().map_err(ApiError::Validation)?;
    }

    let card = service.issue_card(&account_id, request, flash).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn list_transactions(
    State(service): State<Arc<Service>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = service.list_transactions(&account_id)?;
    Ok(Json(transactions))
}
