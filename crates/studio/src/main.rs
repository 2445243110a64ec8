//! `prodgen-studio` -- headless product detail screen.
//!
//! Mounts the product view for one product, starts a generation job with
//! every active template, re-renders on each state change until the job
//! settles, then downloads the generated images.
//!
//! ```text
//! prodgen-studio <product-id> [download-dir]
//! ```
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                              |
//! |------------------------|----------|--------------------------------------|
//! | `API_BASE_URL`         | no       | `http://localhost:8000/api/products` |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`                                 |

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use prodgen_client::{ApiClient, ClientConfig};
use prodgen_core::job::JobState;
use prodgen_core::types::DbId;
use prodgen_studio::downloads::FileDownloader;
use prodgen_studio::view::{present, ProductView};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prodgen_studio=info,prodgen_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("prodgen-studio failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the generation job completed.
async fn run() -> anyhow::Result<bool> {
    let mut args = std::env::args().skip(1);
    let product_id: DbId = args
        .next()
        .context("usage: prodgen-studio <product-id> [download-dir]")?
        .parse()
        .context("product id must be an integer")?;
    let download_dir = args.next().map(PathBuf::from).unwrap_or_else(|| ".".into());

    let config = ClientConfig::from_env()?;
    let client = Arc::new(ApiClient::from_config(&config)?);
    tracing::info!(base_url = %config.base_url, product_id, "Starting prodgen-studio");

    let downloader = Arc::new(FileDownloader::new(client.http().clone(), download_dir));
    let view = ProductView::mount(product_id, client.clone(), client, downloader);
    let mut changes = view.changes();

    let loaded = changes
        .wait_for(|s| !s.loading)
        .await
        .context("controller stopped while loading")?
        .clone();
    print!("{}", present(&loaded));
    if loaded.product.is_none() {
        view.unmount().await;
        return Ok(false);
    }

    view.generate().await?;

    while changes.changed().await.is_ok() {
        let snapshot = changes.borrow_and_update().clone();
        print!("{}", present(&snapshot));
        let settled = match snapshot.job {
            JobState::Completed { .. } => !snapshot.loading,
            JobState::Failed { .. } => true,
            JobState::Idle => snapshot.notice.is_some(),
            JobState::Starting | JobState::Polling { .. } => false,
        };
        if settled {
            break;
        }
    }

    let completed = matches!(view.controller().snapshot().job, JobState::Completed { .. });
    if completed {
        if let Some(batch) = view.download_all() {
            for (filename, result) in batch.join().await {
                match result {
                    Ok(()) => println!("saved {filename}"),
                    Err(e) => tracing::warn!(filename = %filename, error = %e, "Download failed"),
                }
            }
        }
    }

    view.unmount().await;
    Ok(completed)
}
