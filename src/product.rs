//! Canonical listing records shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// Image shown for listings that carry no usable picture.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/150";

/// Normalized product listing. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Trimmed product title.
    pub name: String,
    /// Trimmed price text without currency symbol or thousands separators.
    pub price: String,
    /// Product detail link.
    pub url: String,
    /// Canonical name of the site the listing came from.
    pub source_site: String,
    /// Absolute http(s) image link or [`PLACEHOLDER_IMAGE_URL`].
    pub image_url: String,
}

/// Loosely-typed product as read back from a merged file.
///
/// Fields are optional so that downstream stages can apply their own defaults
/// for keys that are absent, while keeping keys that are present but empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title, if present.
    #[serde(default)]
    pub name: Option<String>,
    /// Price text, if present.
    #[serde(default)]
    pub price: Option<String>,
    /// Detail link, if present.
    #[serde(default)]
    pub url: Option<String>,
    /// Source site, if present.
    #[serde(default)]
    pub source_site: Option<String>,
    /// Image link, if present.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&Product> for ProductRecord {
    fn from(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            price: Some(product.price.clone()),
            url: Some(product.url.clone()),
            source_site: Some(product.source_site.clone()),
            image_url: Some(product.image_url.clone()),
        }
    }
}

/// Returns `value` when it is an http(s) link, otherwise the placeholder image.
pub fn usable_image_url(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        PLACEHOLDER_IMAGE_URL.to_string()
    }
}
