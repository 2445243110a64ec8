//! HTTP client for the product image-generation backend.
//!
//! Exposes the two collaborator seams consumed by the generation
//! controller, [`resources::ResourceApi`] (products, templates, logos) and
//! [`jobs::JobApi`] (start + poll generation jobs), plus the reqwest-backed
//! [`api::ApiClient`] that implements both.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod resources;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use jobs::JobApi;
pub use resources::ResourceApi;
