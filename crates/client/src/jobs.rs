//! Job API: start generation jobs and poll their status.

use async_trait::async_trait;
use prodgen_core::job::{JobId, JobStatusReport, StartJobResponse};
use prodgen_core::types::DbId;
use serde::Serialize;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Stateless access to the generation job endpoints.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `POST /products/{id}/generate_images/`. An empty `template_ids`
    /// list asks the backend to use every active template.
    async fn start_job(
        &self,
        product_id: DbId,
        template_ids: &[DbId],
    ) -> Result<StartJobResponse, ApiError>;

    /// `GET /products/{id}/job_status/?job_id=...`
    async fn job_status(&self, product_id: DbId, job_id: &JobId)
        -> Result<JobStatusReport, ApiError>;
}

#[derive(Serialize)]
struct StartJobRequest<'a> {
    template_ids: &'a [DbId],
}

#[async_trait]
impl JobApi for ApiClient {
    async fn start_job(
        &self,
        product_id: DbId,
        template_ids: &[DbId],
    ) -> Result<StartJobResponse, ApiError> {
        let response: StartJobResponse = self
            .post_json(
                &format!("/products/{product_id}/generate_images/"),
                &StartJobRequest { template_ids },
            )
            .await?;

        tracing::info!(
            product_id,
            job_id = %response.job_id,
            templates = template_ids.len(),
            "Generation job accepted",
        );
        Ok(response)
    }

    async fn job_status(
        &self,
        product_id: DbId,
        job_id: &JobId,
    ) -> Result<JobStatusReport, ApiError> {
        self.get_json(
            &format!("/products/{product_id}/job_status/"),
            &[("job_id", job_id.as_str())],
        )
        .await
    }
}
