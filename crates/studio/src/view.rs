//! Presentation adapter for the product detail screen.
//!
//! [`present`] maps a [`ControllerSnapshot`] to a [`ViewModel`] with no
//! other input, and [`ProductView`] forwards user actions (generate,
//! download) to the controller and download scheduler. No business logic
//! lives here.

use std::fmt;
use std::sync::Arc;

use prodgen_client::{JobApi, ResourceApi};
use prodgen_core::download::download_filename;
use prodgen_core::job::JobState;
use prodgen_core::types::DbId;
use tokio::sync::watch;

use crate::controller::{
    ControllerError, ControllerHandle, ControllerSnapshot, GenerationJobController, PollConfig,
};
use crate::downloads::{DownloadBatch, DownloadError, DownloadScheduler, Downloader};

pub const GENERATE_LABEL: &str = "Generate Images";
pub const GENERATING_LABEL: &str = "Generating...";
pub const NOT_FOUND_MESSAGE: &str = "Product not found";
pub const EMPTY_GALLERY_MESSAGE: &str =
    "No images yet. Click \"Generate Images\" to create product variations.";

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewModel {
    /// First product fetch still in flight.
    Loading,
    NotFound,
    Product(ProductPanel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPanel {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub banner: Option<Banner>,
    pub generate: GenerateButton,
    /// "Download All" is offered only when generated images exist.
    pub download_all_visible: bool,
    pub images: Vec<ImageCard>,
    pub empty_message: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTone {
    /// Work in progress; rendered with a spinner.
    Progress,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub tone: BannerTone,
    pub headline: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateButton {
    pub enabled: bool,
    pub busy: bool,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCard {
    pub id: DbId,
    pub label: String,
    pub url: String,
    /// Creation date, `YYYY-MM-DD`.
    pub created: String,
    pub filename: String,
}

/// Map controller state to display data.
pub fn present(snapshot: &ControllerSnapshot) -> ViewModel {
    let Some(product) = &snapshot.product else {
        return if snapshot.loading {
            ViewModel::Loading
        } else {
            ViewModel::NotFound
        };
    };

    let active = snapshot.job.is_active();
    let images: Vec<ImageCard> = product
        .images
        .iter()
        .map(|img| ImageCard {
            id: img.id,
            label: img.kind.label(),
            url: img.url.clone(),
            created: img.created_at.format("%Y-%m-%d").to_string(),
            filename: download_filename(product, img),
        })
        .collect();

    ViewModel::Product(ProductPanel {
        name: product.name.clone(),
        sku: product.sku.clone(),
        description: product.description.clone(),
        banner: banner(snapshot),
        generate: GenerateButton {
            enabled: !active,
            busy: active,
            label: if active { GENERATING_LABEL } else { GENERATE_LABEL },
        },
        download_all_visible: product.has_generated_images(),
        empty_message: images.is_empty().then_some(EMPTY_GALLERY_MESSAGE),
        images,
    })
}

fn banner(snapshot: &ControllerSnapshot) -> Option<Banner> {
    match &snapshot.job {
        JobState::Idle => snapshot.notice.as_ref().map(|notice| Banner {
            tone: BannerTone::Error,
            headline: "Could Not Start Generation".to_string(),
            detail: Some(notice.clone()),
        }),
        JobState::Starting => Some(Banner {
            tone: BannerTone::Progress,
            headline: "Starting Generation...".to_string(),
            detail: None,
        }),
        JobState::Polling { .. } => Some(Banner {
            tone: BannerTone::Progress,
            headline: "Generating Images...".to_string(),
            detail: None,
        }),
        // The result is presented only once the refetched product is in.
        JobState::Completed { .. } if snapshot.loading => Some(Banner {
            tone: BannerTone::Progress,
            headline: "Loading New Images...".to_string(),
            detail: None,
        }),
        JobState::Completed {
            generated_count, ..
        } => Some(Banner {
            tone: BannerTone::Success,
            headline: "Generation Complete!".to_string(),
            detail: generated_count.map(|n| format!("Generated {n} images")),
        }),
        JobState::Failed { error_message, .. } => Some(Banner {
            tone: BannerTone::Error,
            headline: "Generation Failed".to_string(),
            detail: error_message.clone(),
        }),
    }
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let panel = match self {
            ViewModel::Loading => return writeln!(f, "Loading..."),
            ViewModel::NotFound => return writeln!(f, "{NOT_FOUND_MESSAGE}"),
            ViewModel::Product(panel) => panel,
        };

        writeln!(f, "{}", panel.name)?;
        if let Some(sku) = &panel.sku {
            writeln!(f, "SKU: {sku}")?;
        }
        if let Some(description) = &panel.description {
            writeln!(f, "{description}")?;
        }

        let marker = if panel.generate.enabled { " " } else { "x" };
        write!(f, "[{marker}] {}", panel.generate.label)?;
        if panel.download_all_visible {
            write!(f, "   [ ] Download All")?;
        }
        writeln!(f)?;

        if let Some(banner) = &panel.banner {
            let icon = match banner.tone {
                BannerTone::Progress => "…",
                BannerTone::Success => "✔",
                BannerTone::Error => "✘",
            };
            writeln!(f, "{icon} {}", banner.headline)?;
            if let Some(detail) = &banner.detail {
                writeln!(f, "  {detail}")?;
            }
        }

        writeln!(f, "Images")?;
        if let Some(empty) = panel.empty_message {
            writeln!(f, "  {empty}")?;
        }
        for card in &panel.images {
            writeln!(f, "  #{} {} ({}) {}", card.id, card.label, card.created, card.url)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProductView
// ---------------------------------------------------------------------------

/// A mounted product detail screen.
pub struct ProductView {
    controller: ControllerHandle,
    downloads: DownloadScheduler,
}

impl ProductView {
    /// Mount the view; the product load starts immediately.
    pub fn mount(
        product_id: DbId,
        jobs: Arc<dyn JobApi>,
        resources: Arc<dyn ResourceApi>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self::with_parts(
            GenerationJobController::spawn(product_id, jobs, resources, PollConfig::default()),
            DownloadScheduler::new(downloader),
        )
    }

    pub fn with_parts(controller: ControllerHandle, downloads: DownloadScheduler) -> Self {
        Self {
            controller,
            downloads,
        }
    }

    pub fn model(&self) -> ViewModel {
        present(&self.controller.snapshot())
    }

    /// Receiver that changes whenever the view should re-render.
    pub fn changes(&self) -> watch::Receiver<ControllerSnapshot> {
        self.controller.subscribe()
    }

    pub fn controller(&self) -> &ControllerHandle {
        &self.controller
    }

    /// The "Generate Images" action: all active templates.
    pub async fn generate(&self) -> Result<(), ControllerError> {
        self.controller.generate(Vec::new()).await
    }

    pub async fn generate_with(&self, template_ids: Vec<DbId>) -> Result<(), ControllerError> {
        self.controller.generate(template_ids).await
    }

    /// Per-image download button.
    pub async fn download(&self, image_id: DbId) -> Result<(), DownloadError> {
        let (url, filename) = {
            let snapshot = self.controller.snapshot();
            let product = snapshot
                .product
                .as_ref()
                .ok_or(DownloadError::UnknownImage(image_id))?;
            let image = product
                .images
                .iter()
                .find(|img| img.id == image_id)
                .ok_or(DownloadError::UnknownImage(image_id))?;
            (image.url.clone(), download_filename(product, image))
        };
        self.downloads.download_one(&url, &filename).await
    }

    /// "Download All": every generated image, staggered. `None` when there
    /// is no product loaded yet.
    pub fn download_all(&self) -> Option<DownloadBatch> {
        let snapshot = self.controller.snapshot();
        let product = snapshot.product.as_ref()?;
        Some(
            self.downloads
                .download_all(&product.images, |img| download_filename(product, img)),
        )
    }

    /// Tear the view down; the poll timer is cancelled.
    pub async fn unmount(self) {
        self.controller.shutdown().await;
    }
}
