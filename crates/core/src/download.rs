//! Download naming and batch staggering.
//!
//! A "download all" request becomes an ordered list of
//! [`ScheduledDownload`]s, each carrying its own delay from the start of the
//! batch, so the scheduler needs no shared loop state.

use std::time::Duration;

use crate::product::{Image, Product};

/// Spacing between consecutive downloads of one batch.
pub const DOWNLOAD_SPACING: Duration = Duration::from_millis(500);

/// File extension used for every downloaded image.
const DOWNLOAD_EXTENSION: &str = "png";

/// One staged download of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledDownload {
    pub url: String,
    pub filename: String,
    /// Offset from the start of the batch.
    pub delay: Duration,
}

/// `{sku}_{kind}.png`, using the product id when the SKU is missing.
pub fn download_filename(product: &Product, image: &Image) -> String {
    format!(
        "{}_{}.{DOWNLOAD_EXTENSION}",
        product.sku_or_id(),
        image.kind.as_str()
    )
}

/// Plan a staggered batch: the original image is skipped and the n-th
/// remaining image is delayed by `n * spacing`.
pub fn plan_downloads<F>(images: &[Image], namer: F, spacing: Duration) -> Vec<ScheduledDownload>
where
    F: Fn(&Image) -> String,
{
    images
        .iter()
        .filter(|img| !img.kind.is_original())
        .zip(0u32..)
        .map(|(img, index)| ScheduledDownload {
            url: img.url.clone(),
            filename: namer(img),
            delay: spacing * index,
        })
        .collect()
}
