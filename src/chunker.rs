//! Turns merged products into text cards plus flattened metadata for indexing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::files::{latest_matching, read_json, write_json_pretty};
use crate::merge::is_merged_file_name;
use crate::product::{Product, ProductRecord, PLACEHOLDER_IMAGE_URL};
use crate::sites::UNKNOWN_SOURCE;

/// Default chunk file written by the chunk stage.
pub const DEFAULT_CHUNK_FILE: &str = "data/product_chunks.json";

/// Price shown when a product carries none.
pub const MISSING_PRICE: &str = "N/A";

/// Link used when a product carries none.
pub const MISSING_LINK: &str = "#";

/// One indexable unit, derived from exactly one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Four-line text card (`Product:`, `Price:`, `Source:`, `Link:`).
    pub text: String,
    /// Product title.
    pub name: String,
    /// Price text.
    pub price: String,
    /// Source site.
    pub seller: String,
    /// Detail link.
    pub link: String,
    /// Image link.
    pub image_url: String,
}

impl Chunk {
    /// Builds a chunk from a loosely-typed product record.
    ///
    /// Absent fields render as empty text in the card; metadata gets the chunk
    /// defaults (`N/A`, `Unknown`, `#`, placeholder image).
    pub fn from_record(record: &ProductRecord) -> Self {
        let text = render_card(
            record.name.as_deref().unwrap_or_default(),
            record.price.as_deref().unwrap_or_default(),
            record.source_site.as_deref().unwrap_or_default(),
            record.url.as_deref().unwrap_or_default(),
        );
        Self {
            text,
            name: record.name.clone().unwrap_or_default(),
            price: or_default(&record.price, MISSING_PRICE),
            seller: or_default(&record.source_site, UNKNOWN_SOURCE),
            link: or_default(&record.url, MISSING_LINK),
            image_url: or_default(&record.image_url, PLACEHOLDER_IMAGE_URL),
        }
    }
}

impl From<&Product> for Chunk {
    fn from(product: &Product) -> Self {
        Self::from_record(&ProductRecord::from(product))
    }
}

/// Renders the fixed four-line card, trimmed as a whole.
pub fn render_card(name: &str, price: &str, source: &str, link: &str) -> String {
    format!("Product: {name}\nPrice: {price}\nSource: {source}\nLink: {link}")
        .trim()
        .to_string()
}

/// Maps products to chunks 1:1, preserving order.
pub fn chunk(products: &[Product]) -> Vec<Chunk> {
    products.iter().map(Chunk::from).collect()
}

/// Maps loosely-typed records to chunks 1:1, preserving order.
pub fn chunk_records(records: &[ProductRecord]) -> Vec<Chunk> {
    records.iter().map(Chunk::from_record).collect()
}

/// Newest merged product file in `dir`.
pub fn latest_merged_file(dir: &Path) -> Result<Option<PathBuf>> {
    latest_matching(dir, is_merged_file_name)
}

/// Chunk stage result.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// Merged file the chunks came from.
    pub source: PathBuf,
    /// Chunk file written.
    pub path: PathBuf,
    /// Number of chunks written.
    pub count: usize,
}

/// Chunks the newest merged file in `merged_dir` and writes `chunk_file`.
pub fn run_chunking(merged_dir: &Path, chunk_file: &Path) -> Result<ChunkOutcome> {
    let source = latest_merged_file(merged_dir)?.with_context(|| {
        format!(
            "no merged_trailer_parts_*.json file found in {:?}",
            merged_dir
        )
    })?;
    info!(file = ?source, "using latest merged file");
    let records: Vec<ProductRecord> = read_json(&source)?;
    let chunks = chunk_records(&records);
    write_chunks(chunk_file, &chunks)?;
    info!(count = chunks.len(), file = ?chunk_file, "saved product chunks");
    Ok(ChunkOutcome {
        source,
        path: chunk_file.to_path_buf(),
        count: chunks.len(),
    })
}

/// Writes chunks as a JSON array.
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    write_json_pretty(path, chunks)
}

/// Reads a chunk file.
pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    read_json(path)
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: &str) -> Product {
        Product {
            name: name.into(),
            price: price.into(),
            url: format!("https://ebay.com/{name}"),
            source_site: "eBay".into(),
            image_url: PLACEHOLDER_IMAGE_URL.into(),
        }
    }

    #[test]
    fn renders_four_line_card() {
        let chunks = chunk(&[product("Axle Hub", "12.00")]);
        assert_eq!(
            chunks[0].text,
            "Product: Axle Hub\nPrice: 12.00\nSource: eBay\nLink: https://ebay.com/Axle Hub"
        );
        assert_eq!(chunks[0].seller, "eBay");
        assert_eq!(chunks[0].link, "https://ebay.com/Axle Hub");
    }

    #[test]
    fn preserves_length_and_order() {
        let products: Vec<Product> = (0..5)
            .map(|i| product(&format!("part-{i}"), &format!("{i}.00")))
            .collect();
        let chunks = chunk(&products);
        assert_eq!(chunks.len(), products.len());
        for (product, chunk) in products.iter().zip(&chunks) {
            assert_eq!(chunk.name, product.name);
            assert_eq!(chunk.price, product.price);
        }
    }

    #[test]
    fn absent_fields_use_chunk_defaults() {
        let chunk = Chunk::from_record(&ProductRecord::default());
        assert_eq!(chunk.text, "Product: \nPrice: \nSource: \nLink:");
        assert_eq!(chunk.name, "");
        assert_eq!(chunk.price, MISSING_PRICE);
        assert_eq!(chunk.seller, UNKNOWN_SOURCE);
        assert_eq!(chunk.link, MISSING_LINK);
        assert_eq!(chunk.image_url, PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn empty_but_present_fields_stay_empty() {
        let record = ProductRecord {
            name: Some("Hub".into()),
            price: Some(String::new()),
            url: Some(String::new()),
            source_site: Some(String::new()),
            image_url: None,
        };
        let chunk = Chunk::from_record(&record);
        assert_eq!(chunk.price, "");
        assert_eq!(chunk.seller, "");
        assert_eq!(chunk.link, "");
    }

    #[test]
    fn chunk_stage_requires_a_merged_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run_chunking(dir.path(), &dir.path().join("chunks.json")).unwrap_err();
        assert!(err.to_string().contains("no merged_trailer_parts_"));
    }
}
