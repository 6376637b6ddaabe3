//! Merges every site's latest scraper output into one normalized product list.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::files::{latest_matching, read_json, write_json_pretty};
use crate::normalizer::normalize;
use crate::product::Product;
use crate::sites::{SiteSpec, SITES};

/// Filename prefix of merged product files.
pub const MERGED_FILE_PREFIX: &str = "merged_trailer_parts_";

/// Normalized products from one site, plus the file they were read from.
#[derive(Debug, Clone)]
pub struct SiteBatch {
    /// Site the products belong to.
    pub site: &'static SiteSpec,
    /// Scraper output file, `None` when the site had no file.
    pub source: Option<PathBuf>,
    /// Normalized products in file order.
    pub products: Vec<Product>,
}

/// Per-site contribution to a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteCount {
    /// Site identifier.
    pub site: String,
    /// Number of products contributed.
    pub count: usize,
    /// Whether the site had no input file.
    pub missing: bool,
}

/// Output of [`merge`].
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// All products, site by site in processing order.
    pub products: Vec<Product>,
    /// Per-site counts in processing order.
    pub counts: Vec<SiteCount>,
}

impl MergeReport {
    /// One-line human summary, e.g. `3 eBay + 0 trailerpartsunlimited.com`.
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|count| format!("{} {}", count.count, count.site))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Concatenates site batches in the given order. No sorting, no deduplication.
pub fn merge(batches: Vec<SiteBatch>) -> MergeReport {
    let mut products = Vec::new();
    let mut counts = Vec::with_capacity(batches.len());
    for batch in batches {
        counts.push(SiteCount {
            site: batch.site.source_site.to_string(),
            count: batch.products.len(),
            missing: batch.source.is_none(),
        });
        products.extend(batch.products);
    }
    MergeReport { products, counts }
}

/// Newest scraper output file for `site` inside `data_dir`.
pub fn latest_site_file(data_dir: &Path, site: &SiteSpec) -> Result<Option<PathBuf>> {
    latest_matching(data_dir, |name| site.matches_file_name(name))
}

/// Loads a scraper output file as a list of untyped records.
pub fn load_site_records(path: &Path) -> Result<Vec<Value>> {
    let value: Value = read_json(path)?;
    match value {
        Value::Array(records) => Ok(records),
        other => anyhow::bail!(
            "expected a JSON array of records in {:?}, found {}",
            path,
            json_kind(&other)
        ),
    }
}

/// Reads and normalizes the newest file of every known site.
///
/// Sites without a file contribute an empty batch and a warning.
pub fn load_site_batches(data_dir: &Path) -> Result<Vec<SiteBatch>> {
    let mut batches = Vec::with_capacity(SITES.len());
    for site in SITES.iter() {
        let Some(path) = latest_site_file(data_dir, site)? else {
            warn!(site = site.id, dir = ?data_dir, "no scraper output found");
            batches.push(SiteBatch {
                site,
                source: None,
                products: Vec::new(),
            });
            continue;
        };
        let records = load_site_records(&path)
            .with_context(|| format!("failed to load {} records", site.id))?;
        let products = normalize(site, &records);
        info!(site = site.id, file = ?path, count = products.len(), "loaded site records");
        batches.push(SiteBatch {
            site,
            source: Some(path),
            products,
        });
    }
    Ok(batches)
}

/// Timestamped merged filename, e.g. `merged_trailer_parts_20240131_0915.json`.
pub fn merged_file_name(at: DateTime<Local>) -> String {
    format!("{}{}.json", MERGED_FILE_PREFIX, at.format("%Y%m%d_%H%M"))
}

/// Whether `file_name` is a merged product file.
pub fn is_merged_file_name(file_name: &str) -> bool {
    file_name.starts_with(MERGED_FILE_PREFIX) && file_name.ends_with(".json")
}

/// Writes the merged products to a timestamped file in `output_dir`.
pub fn write_merged(output_dir: &Path, products: &[Product], at: DateTime<Local>) -> Result<PathBuf> {
    let path = output_dir.join(merged_file_name(at));
    write_json_pretty(&path, products)?;
    Ok(path)
}

/// Merge stage result.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Merged products and counts.
    pub report: MergeReport,
    /// File the products were written to.
    pub path: PathBuf,
}

/// Loads every site from `data_dir`, merges and writes the result into `output_dir`.
pub fn run_merge(data_dir: &Path, output_dir: &Path) -> Result<MergeOutcome> {
    let batches = load_site_batches(data_dir)?;
    let report = merge(batches);
    let path = write_merged(output_dir, &report.products, Local::now())?;
    info!(
        total = report.products.len(),
        file = ?path,
        "merged {}",
        report.summary()
    );
    Ok(MergeOutcome { report, path })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::{EBAY, TRAILER_PARTS_UNLIMITED};
    use chrono::TimeZone;
    use std::fs;

    fn product(name: &str, site: &SiteSpec) -> Product {
        Product {
            name: name.into(),
            price: "1.00".into(),
            url: format!("https://{}/{}", site.url_marker, name),
            source_site: site.source_site.into(),
            image_url: crate::PLACEHOLDER_IMAGE_URL.into(),
        }
    }

    #[test]
    fn concatenates_in_site_order_without_dedup() {
        let batches = vec![
            SiteBatch {
                site: &SITES[0],
                source: Some(PathBuf::from("ebay_products_20240101.json")),
                products: vec![product("b", &EBAY), product("a", &EBAY), product("a", &EBAY)],
            },
            SiteBatch {
                site: &SITES[1],
                source: Some(PathBuf::from("trailerpartsunlimited_products_20240101.json")),
                products: vec![product("c", &TRAILER_PARTS_UNLIMITED)],
            },
        ];

        let report = merge(batches);

        let names: Vec<&str> = report.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "a", "c"]);
        assert_eq!(report.counts[0].count, 3);
        assert_eq!(report.counts[1].count, 1);
        assert_eq!(report.summary(), "3 eBay + 1 trailerpartsunlimited.com");
    }

    #[test]
    fn missing_site_file_contributes_zero_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("trailerpartsunlimited_products_20240101_0900.json"),
            r#"[{"name": " Hub ", "price": "10.00", "url": "https://trailerpartsunlimited.com/h"}, "junk"]"#,
        )
        .expect("write");

        let report = merge(load_site_batches(dir.path()).expect("load"));

        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].name, "Hub");
        assert_eq!(
            report.counts[0],
            SiteCount {
                site: "eBay".into(),
                count: 0,
                missing: true
            }
        );
        assert!(!report.counts[1].missing);
    }

    #[test]
    fn rejects_non_array_site_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ebay_products_20240101.json");
        fs::write(&path, r#"{"title": "Hub"}"#).expect("write");
        let err = load_site_records(&path).unwrap_err();
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn merged_file_name_uses_minute_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 1, 31, 9, 15, 42).unwrap();
        let name = merged_file_name(at);
        assert_eq!(name, "merged_trailer_parts_20240131_0915.json");
        assert!(is_merged_file_name(&name));
        assert!(!is_merged_file_name("merged_trailer_parts_20240131_0915.csv"));
    }
}
