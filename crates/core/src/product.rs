//! Products, their images, and the upload payload for new products.
//!
//! A product owns exactly one `original` image (created at upload time)
//! plus any number of generated images appended by completed generation
//! jobs. Images are never edited or removed by this system.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Image kind
// ---------------------------------------------------------------------------

/// Wire value for the single uploaded image of a product.
pub const KIND_ORIGINAL: &str = "original";

/// What produced an [`Image`]: the upload itself, or a generation template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageKind {
    /// The user-uploaded source photo.
    Original,
    /// Output of the generation template with this identifier.
    Template(String),
}

impl ImageKind {
    pub fn is_original(&self) -> bool {
        matches!(self, ImageKind::Original)
    }

    /// Raw wire identifier, e.g. `original` or `social_square`.
    pub fn as_str(&self) -> &str {
        match self {
            ImageKind::Original => KIND_ORIGINAL,
            ImageKind::Template(kind) => kind,
        }
    }

    /// Human-readable label: the first underscore becomes a space and the
    /// first letter is upper-cased (`social_square` -> `Social square`).
    pub fn label(&self) -> String {
        let spaced = self.as_str().replacen('_', " ", 1);
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<String> for ImageKind {
    fn from(value: String) -> Self {
        if value == KIND_ORIGINAL {
            ImageKind::Original
        } else {
            ImageKind::Template(value)
        }
    }
}

impl From<&str> for ImageKind {
    fn from(value: &str) -> Self {
        ImageKind::from(value.to_string())
    }
}

impl From<ImageKind> for String {
    fn from(kind: ImageKind) -> Self {
        match kind {
            ImageKind::Original => KIND_ORIGINAL.to_string(),
            ImageKind::Template(kind) => kind,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Product + Image
// ---------------------------------------------------------------------------

/// One stored image belonging to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: DbId,
    pub kind: ImageKind,
    /// Opaque, fetchable resource location.
    pub url: String,
    pub created_at: Timestamp,
}

/// A product as returned by `GET /products/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: DbId,
    pub name: String,
    /// Human-facing unique code. Older rows may not have one.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Images in backend order; the original is normally first.
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Product {
    /// The uploaded source image, if the backend returned it.
    pub fn original_image(&self) -> Option<&Image> {
        self.images.iter().find(|img| img.kind.is_original())
    }

    /// Every image produced by a generation job, in backend order.
    pub fn generated_images(&self) -> impl Iterator<Item = &Image> {
        self.images.iter().filter(|img| !img.kind.is_original())
    }

    pub fn has_generated_images(&self) -> bool {
        self.generated_images().next().is_some()
    }

    /// The SKU, falling back to the numeric id for products without one.
    /// Used as the stem of download file names.
    pub fn sku_or_id(&self) -> String {
        match self.sku.as_deref() {
            Some(sku) if !sku.trim().is_empty() => sku.to_string(),
            _ => self.id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload payloads
// ---------------------------------------------------------------------------

/// An in-memory file destined for a multipart upload field.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    /// MIME type; the HTTP layer guesses from the extension when absent.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Content type to send, derived from the file extension if unset.
    pub fn mime_type(&self) -> &str {
        if let Some(ct) = self.content_type.as_deref() {
            return ct;
        }
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "application/octet-stream",
        }
    }
}

/// Reject an upload field with no file name or no content. The message
/// leads with `field` because struct-level errors carry no field key.
pub(crate) fn check_image_file(field: &str, file: &ImageFile) -> Result<(), ValidationError> {
    if file.file_name.trim().is_empty() || file.bytes.is_empty() {
        let mut err = ValidationError::new("image_file");
        err.message = Some(format!("{field} must have a file name and non-empty content").into());
        return Err(err);
    }
    Ok(())
}

fn validate_original_image(product: &NewProduct) -> Result<(), ValidationError> {
    check_image_file("original_image", &product.original_image)
}

/// Fields of the `POST /products/` multipart upload.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_original_image", skip_on_field_errors = false))]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub sku: String,
    pub description: Option<String>,
    pub original_image: ImageFile,
}

impl NewProduct {
    /// Check required fields before any request is made.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(CoreError::from)
    }
}
