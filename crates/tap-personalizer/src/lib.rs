//! tap-personalizer - writes card profiles onto physical cards
//!
//! One background worker owns the PC/SC reader and processes submissions
//! strictly one at a time: wait for a card, write it, wait for it to be
//! removed, move on. Everything else (HTTP, the issuer) talks to the
//! worker through a bounded queue.

pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod service;
pub mod watcher;
pub mod writer;

pub use app::App;
pub use config::PersonalizerConfig;
pub use service::{Service, Worker};
