//! Brand logos stored alongside products. Read-only to the generation
//! lifecycle; listed, fetched and uploaded through the resource API.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::product::{check_image_file, ImageFile};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logo {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

fn validate_logo_image(logo: &NewLogo) -> Result<(), ValidationError> {
    check_image_file("image", &logo.image)
}

/// Fields of the `POST /logos/` multipart upload.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_logo_image", skip_on_field_errors = false))]
pub struct NewLogo {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,
    pub image: ImageFile,
    /// Uploading a default logo demotes any previous default.
    pub is_default: bool,
}

impl NewLogo {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(CoreError::from)
    }
}
