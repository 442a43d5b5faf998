//! tap-acquirer - merchant-facing front of the pipeline
//!
//! Accepts payment intents (EMV payload from a tap, or raw card details
//! from e-commerce), persists a payment record, and runs the authorization
//! against the issuer over ISO 8583.

pub mod api;
pub mod app;
pub mod config;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod service;

pub use app::App;
pub use config::AcquirerConfig;
pub use gateway::{AuthorizationGateway, GatewayError, IssuerGateway};
pub use repository::Repository;
pub use service::{Service, ServiceError};
