//! tap-issuer - the card-issuing side of the pipeline
//!
//! Owns accounts, cards and transactions, answers ISO 8583 authorization
//! requests over the length-prefixed TCP endpoint, and exposes a small HTTP
//! API for account management and card issuance.

pub mod api;
pub mod app;
pub mod authorize;
pub mod config;
pub mod models;
pub mod personalizer;
pub mod repository;
pub mod service;

pub use app::App;
pub use config::IssuerConfig;
pub use repository::Repository;
pub use service::{Service, ServiceError};
