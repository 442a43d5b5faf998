//! HTTP API for merchants and payments

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{CreateMerchant, CreatePayment};
use crate::service::{Service, ServiceError};

pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/merchants", post(create_merchant))
        .route("/merchants/:merchant_id/payments", post(create_payment))
        .route(
            "/merchants/:merchant_id/payments/:payment_id",
            get(get_payment),
        )
        .with_state(service)
}

struct ApiError(ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ServiceError::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            ServiceError::Validation(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ServiceError::Gateway(err) => {
                (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

async fn create_merchant(
    State(service): State<Arc<Service>>,
    Json(create): Json<CreateMerchant>,
) -> impl IntoResponse {
    let merchant = service.create_merchant(create);
    (StatusCode::CREATED, Json(merchant))
}

async fn create_payment(
    State(service): State<Arc<Service>>,
    Path(merchant_id): Path<String>,
    Json(create): Json<CreatePayment>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = service.create_payment(&merchant_id, create).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(service): State<Arc<Service>>,
    Path((merchant_id, payment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = service.get_payment(&merchant_id, &payment_id)?;
    Ok(Json(payment))
}
