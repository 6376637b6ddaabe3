//! Raw scraper record normalization into canonical [`Product`] listings.

use serde_json::{Map, Value};
use tracing::debug;

use crate::product::{usable_image_url, Product};
use crate::sites::SiteSpec;

/// Converts one site's raw records into [`Product`]s using the site's field mapping.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    site: &'a SiteSpec,
}

impl<'a> Normalizer<'a> {
    /// Builds a normalizer bound to `site`.
    pub fn new(site: &'a SiteSpec) -> Self {
        Self { site }
    }

    /// Normalizes every JSON object in `raw`, silently dropping anything else.
    pub fn normalize(&self, raw: &[Value]) -> Vec<Product> {
        let products: Vec<Product> = raw
            .iter()
            .filter_map(Value::as_object)
            .map(|record| self.normalize_record(record))
            .collect();
        let skipped = raw.len() - products.len();
        if skipped > 0 {
            debug!(site = self.site.id, skipped, "dropped non-object records");
        }
        products
    }

    /// Normalizes a single record. Missing keys become empty strings.
    pub fn normalize_record(&self, record: &Map<String, Value>) -> Product {
        let fields = &self.site.fields;
        Product {
            name: text_or_empty(record, fields.name),
            price: clean_price(&text_or_empty(record, fields.price)),
            url: text_or_empty(record, fields.url),
            source_site: self.site.source_site.to_string(),
            image_url: usable_image_url(&text_or_empty(record, fields.image_url)),
        }
    }
}

/// Normalizes `raw` records scraped from `site`.
pub fn normalize(site: &SiteSpec, raw: &[Value]) -> Vec<Product> {
    Normalizer::new(site).normalize(raw)
}

/// Strips currency symbols and thousands separators from a price string.
pub fn clean_price(price: &str) -> String {
    price
        .chars()
        .filter(|ch| *ch != '$' && *ch != ',')
        .collect::<String>()
        .trim()
        .to_string()
}

fn text_or_empty(record: &Map<String, Value>, key: &str) -> String {
    field_text(record, key).unwrap_or_default()
}

// Strings and numbers count as text; every other JSON type is treated as absent.
fn field_text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::PLACEHOLDER_IMAGE_URL;
    use crate::sites::{EBAY, TRAILER_PARTS_UNLIMITED};
    use serde_json::json;

    #[test]
    fn normalizes_ebay_listing() {
        let raw = vec![json!({
            "title": " Axle Hub ",
            "price": "$12.00",
            "link": "http://ebay.com/x"
        })];

        let products = normalize(&EBAY, &raw);

        assert_eq!(
            products,
            vec![Product {
                name: "Axle Hub".into(),
                price: "12.00".into(),
                url: "http://ebay.com/x".into(),
                source_site: "eBay".into(),
                image_url: PLACEHOLDER_IMAGE_URL.into(),
            }]
        );
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let raw = vec![json!({})];
        let products = normalize(&TRAILER_PARTS_UNLIMITED, &raw);

        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.name, "");
        assert_eq!(product.price, "");
        assert_eq!(product.url, "");
        assert_eq!(product.source_site, "trailerpartsunlimited.com");
        assert_eq!(product.image_url, PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn skips_non_object_records() {
        let raw = vec![
            json!("not a record"),
            json!(42),
            json!(null),
            json!(["nested"]),
            json!({"name": "Leaf Spring", "url": "https://trailerpartsunlimited.com/ls"}),
        ];

        let products = normalize(&TRAILER_PARTS_UNLIMITED, &raw);

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Leaf Spring");
    }

    #[test]
    fn uses_site_field_mapping() {
        // eBay records use `title`/`link`; a trailerpartsunlimited-shaped record yields blanks.
        let raw = vec![json!({"name": "Coupler", "url": "https://ebay.com/c"})];
        let products = normalize(&EBAY, &raw);
        assert_eq!(products[0].name, "");
        assert_eq!(products[0].url, "");
    }

    #[test]
    fn keeps_http_images_and_numeric_prices() {
        let raw = vec![json!({
            "name": "Fender",
            "price": 1249.5,
            "url": "https://trailerpartsunlimited.com/f",
            "image_url": "https://cdn.example.com/fender.jpg"
        })];
        let product = &normalize(&TRAILER_PARTS_UNLIMITED, &raw)[0];
        assert_eq!(product.price, "1249.5");
        assert_eq!(product.image_url, "https://cdn.example.com/fender.jpg");
    }

    #[test]
    fn cleans_price_text() {
        assert_eq!(clean_price(" $1,299.99 "), "1299.99");
        assert_eq!(clean_price("N/A"), "N/A");
        assert_eq!(clean_price(""), "");
    }
}
