//! Facility client - command-line and library access to the facility
//! management API
//!
//! This is the library interface, allowing programmatic access to
//! locations, tanks, permits, users and permissions with a persisted,
//! self-refreshing session.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod facilities;
pub mod permissions;
pub mod views;

pub use api::ApiClient;
pub use auth::AuthContext;
pub use config::Config;
pub use error::Error;
