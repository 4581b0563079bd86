//! Client for the facility management REST API

mod auth;
pub mod client;
mod facilities;
mod permissions;
mod resource;

pub use client::{ApiClient, Auth, ListResponse, Page};
pub use resource::Resource;
