//! Scripted fakes for the Resource and Job APIs and a recording downloader.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use prodgen_client::{ApiError, JobApi, ResourceApi};
use prodgen_core::job::{GenerationResult, JobId, JobStatus, JobStatusReport, StartJobResponse};
use prodgen_core::logo::{Logo, NewLogo};
use prodgen_core::product::{Image, ImageKind, NewProduct, Product};
use prodgen_core::template::Template;
use prodgen_core::types::DbId;
use prodgen_studio::downloads::{DownloadError, Downloader};
use tokio::sync::Notify;
use tokio::time::Instant;

pub const PRODUCT_ID: DbId = 7;

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

pub fn image(id: DbId, kind: &str) -> Image {
    Image {
        id,
        kind: ImageKind::from(kind),
        url: format!("http://cdn.test/{id}.png"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

/// A product with its original image plus `generated` template images.
pub fn product_with(generated: usize) -> Product {
    let kinds = ["social_square", "banner", "story", "poster", "flyer"];
    let mut images = vec![image(1, "original")];
    for i in 0..generated {
        images.push(image(i as DbId + 2, kinds[i % kinds.len()]));
    }
    Product {
        id: PRODUCT_ID,
        name: "Ceramic Mug".into(),
        sku: Some("MUG-1".into()),
        description: Some("White mug".into()),
        images,
        created_at: None,
        updated_at: None,
    }
}

pub fn started(job_id: &str) -> Result<StartJobResponse, ApiError> {
    Ok(StartJobResponse {
        job_id: JobId::new(job_id),
        status: Some(JobStatus::Pending),
        message: None,
    })
}

pub fn processing(job_id: &str) -> Result<JobStatusReport, ApiError> {
    Ok(JobStatusReport {
        job_id: JobId::new(job_id),
        status: JobStatus::Processing,
        result: None,
        error_message: None,
    })
}

pub fn completed(job_id: &str, generated_count: u32) -> Result<JobStatusReport, ApiError> {
    Ok(JobStatusReport {
        job_id: JobId::new(job_id),
        status: JobStatus::Completed,
        result: Some(GenerationResult { generated_count }),
        error_message: None,
    })
}

pub fn failed(job_id: &str, message: &str) -> Result<JobStatusReport, ApiError> {
    Ok(JobStatusReport {
        job_id: JobId::new(job_id),
        status: JobStatus::Failed,
        result: None,
        error_message: Some(message.to_string()),
    })
}

pub fn unavailable<T>() -> Result<T, ApiError> {
    Err(ApiError::Status {
        status: 503,
        body: "upstream unavailable".into(),
    })
}

// ---------------------------------------------------------------------------
// FakeJobs
// ---------------------------------------------------------------------------

/// Job API with scripted responses. A job with no scripted status left
/// reports `processing`.
#[derive(Default)]
pub struct FakeJobs {
    starts: Mutex<VecDeque<Result<StartJobResponse, ApiError>>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<JobStatusReport, ApiError>>>>,
    start_gate: Mutex<Option<Arc<Notify>>>,
    poll_gates: Mutex<HashMap<String, Arc<Notify>>>,
    start_calls: Mutex<Vec<(DbId, Vec<DbId>)>>,
    poll_calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(self, response: Result<StartJobResponse, ApiError>) -> Self {
        self.starts.lock().unwrap().push_back(response);
        self
    }

    pub fn on_poll<I>(self, job_id: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = Result<JobStatusReport, ApiError>>,
    {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .extend(responses);
        self
    }

    /// Hold every start request until the returned gate is notified.
    pub fn gate_start(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.start_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold polls for `job_id` until the returned gate is notified.
    pub fn gate_poll(&self, job_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.poll_gates
            .lock()
            .unwrap()
            .insert(job_id.to_string(), gate.clone());
        gate
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    pub fn start_calls(&self) -> Vec<(DbId, Vec<DbId>)> {
        self.start_calls.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.lock().unwrap().len()
    }

    pub fn poll_calls(&self) -> Vec<(String, Instant)> {
        self.poll_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobApi for FakeJobs {
    async fn start_job(
        &self,
        product_id: DbId,
        template_ids: &[DbId],
    ) -> Result<StartJobResponse, ApiError> {
        self.start_calls
            .lock()
            .unwrap()
            .push((product_id, template_ids.to_vec()));
        let gate = self.start_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = self.starts.lock().unwrap().pop_front();
        next.unwrap_or_else(|| started("1"))
    }

    async fn job_status(
        &self,
        _product_id: DbId,
        job_id: &JobId,
    ) -> Result<JobStatusReport, ApiError> {
        self.poll_calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), Instant::now()));
        let gate = self.poll_gates.lock().unwrap().get(job_id.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(job_id.as_str())
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| processing(job_id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// FakeResources
// ---------------------------------------------------------------------------

/// Resource API whose product fetches follow a script; the final scripted
/// response repeats.
pub struct FakeResources {
    products: Mutex<VecDeque<Result<Product, ApiError>>>,
    product_fetches: AtomicUsize,
}

impl FakeResources {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Product, ApiError>>,
    {
        Self {
            products: Mutex::new(responses.into_iter().collect()),
            product_fetches: AtomicUsize::new(0),
        }
    }

    pub fn product_fetches(&self) -> usize {
        self.product_fetches.load(Ordering::SeqCst)
    }
}

fn clone_result(result: &Result<Product, ApiError>) -> Result<Product, ApiError> {
    match result {
        Ok(product) => Ok(product.clone()),
        Err(e) => Err(ApiError::Status {
            status: e.status().unwrap_or(500),
            body: e.to_string(),
        }),
    }
}

#[async_trait]
impl ResourceApi for FakeResources {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        Ok(Vec::new())
    }

    async fn get_product(&self, _id: DbId) -> Result<Product, ApiError> {
        self.product_fetches.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.products.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(unavailable)
        } else {
            queue.front().map(clone_result).unwrap_or_else(unavailable)
        }
    }

    async fn create_product(&self, _product: &NewProduct) -> Result<Product, ApiError> {
        unavailable()
    }

    async fn list_templates(&self, _kind: Option<&str>) -> Result<Vec<Template>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_logos(&self) -> Result<Vec<Logo>, ApiError> {
        Ok(Vec::new())
    }

    async fn default_logo(&self) -> Result<Logo, ApiError> {
        unavailable()
    }

    async fn upload_logo(&self, _logo: &NewLogo) -> Result<Logo, ApiError> {
        unavailable()
    }
}

// ---------------------------------------------------------------------------
// RecordingDownloader
// ---------------------------------------------------------------------------

/// Records every download with the instant it was triggered.
#[derive(Default)]
pub struct RecordingDownloader {
    calls: Mutex<Vec<(String, String, Instant)>>,
}

impl RecordingDownloader {
    /// `(url, filename)` pairs in trigger order.
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, name, _)| (url.clone(), name.clone()))
            .collect()
    }

    /// `(filename, offset from origin)` in trigger order.
    pub fn offsets(&self, origin: Instant) -> Vec<(String, Duration)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name, at)| (name.clone(), at.duration_since(origin)))
            .collect()
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn download(&self, url: &str, filename: &str) -> Result<(), DownloadError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), filename.to_string(), Instant::now()));
        Ok(())
    }
}

/// Assert `actual` is `expected` give or take timer granularity.
pub fn assert_near(actual: Duration, expected: Duration) {
    let slack = Duration::from_millis(20);
    assert!(
        actual >= expected && actual <= expected + slack,
        "expected ~{expected:?}, got {actual:?}"
    );
}
