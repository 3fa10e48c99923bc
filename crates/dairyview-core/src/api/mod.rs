//! REST API client module for the dairy operations backend.
//!
//! This module provides the `ApiClient` for authenticating and fetching
//! tank, route, volume and dashboard data for a dairy.
//!
//! The API uses bearer token authentication obtained from `/api/auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
