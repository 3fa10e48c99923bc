//! Core library for dairyview.
//!
//! Session lifecycle, the authenticated data gateway, live and demo data
//! sources, view polling and formatting helpers. The terminal front end lives
//! in `dairyview-tui`.

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod models;
pub mod poll;
pub mod source;
pub mod utils;

pub use api::ApiError;
pub use config::Config;
pub use gateway::{DashboardOverview, Gateway};
