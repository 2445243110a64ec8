//! Resource API: CRUD over products, templates and logos.

use async_trait::async_trait;
use prodgen_core::logo::{Logo, NewLogo};
use prodgen_core::product::{NewProduct, Product};
use prodgen_core::template::Template;
use prodgen_core::types::DbId;
use reqwest::multipart::Form;

use crate::api::{file_part, ApiClient};
use crate::error::ApiError;

/// Stateless request/response access to backend resources.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// `GET /products/`
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /products/{id}/`
    async fn get_product(&self, id: DbId) -> Result<Product, ApiError>;

    /// `POST /products/` (multipart). Fails with [`ApiError::Validation`]
    /// without touching the network when required fields are missing.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError>;

    /// `GET /templates/`, or `GET /templates/by_kind/?kind=...` when a kind
    /// is given.
    async fn list_templates(&self, kind: Option<&str>) -> Result<Vec<Template>, ApiError>;

    /// `GET /logos/`
    async fn list_logos(&self) -> Result<Vec<Logo>, ApiError>;

    /// `GET /logos/default/`; a missing default surfaces as a 404
    /// [`ApiError::Status`].
    async fn default_logo(&self) -> Result<Logo, ApiError>;

    /// `POST /logos/` (multipart).
    async fn upload_logo(&self, logo: &NewLogo) -> Result<Logo, ApiError>;
}

#[async_trait]
impl ResourceApi for ApiClient {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_json("/products/", &[]).await
    }

    async fn get_product(&self, id: DbId) -> Result<Product, ApiError> {
        self.get_json(&format!("/products/{id}/"), &[]).await
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        product.check()?;

        let mut form = Form::new()
            .text("name", product.name.clone())
            .text("sku", product.sku.clone());
        if let Some(description) = &product.description {
            form = form.text("description", description.clone());
        }
        let form = form.part("original_image", file_part(&product.original_image)?);

        let created: Product = self.post_multipart("/products/", form).await?;
        tracing::info!(product_id = created.id, sku = ?created.sku, "Product created");
        Ok(created)
    }

    async fn list_templates(&self, kind: Option<&str>) -> Result<Vec<Template>, ApiError> {
        match kind {
            Some(kind) => self.get_json("/templates/by_kind/", &[("kind", kind)]).await,
            None => self.get_json("/templates/", &[]).await,
        }
    }

    async fn list_logos(&self) -> Result<Vec<Logo>, ApiError> {
        self.get_json("/logos/", &[]).await
    }

    async fn default_logo(&self) -> Result<Logo, ApiError> {
        self.get_json("/logos/default/", &[]).await
    }

    async fn upload_logo(&self, logo: &NewLogo) -> Result<Logo, ApiError> {
        logo.check()?;

        let form = Form::new()
            .text("name", logo.name.clone())
            .text("is_default", logo.is_default.to_string())
            .part("image", file_part(&logo.image)?);

        self.post_multipart("/logos/", form).await
    }
}
