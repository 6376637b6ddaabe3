//! Static table describing every listing site the pipeline understands.

/// Source name used when a listing cannot be attributed to a known site.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Maps a site's raw record keys onto canonical [`Product`](crate::Product) fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Key holding the product title.
    pub name: &'static str,
    /// Key holding the price text.
    pub price: &'static str,
    /// Key holding the detail link.
    pub url: &'static str,
    /// Key holding the image link.
    pub image_url: &'static str,
}

/// One row of the site table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteSpec {
    /// Short identifier used on the command line and in logs.
    pub id: &'static str,
    /// Canonical `source_site` value stamped on normalized products.
    pub source_site: &'static str,
    /// Prefix of the scraper output files, e.g. `ebay` for `ebay_products_20240101_1200.json`.
    pub file_prefix: &'static str,
    /// Substring identifying the site inside a product URL.
    pub url_marker: &'static str,
    /// Raw record field names.
    pub fields: FieldMapping,
}

impl SiteSpec {
    /// Whether `file_name` looks like a scraper output file for this site
    /// (`<prefix>_products_20*.json`).
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.file_prefix)
            .and_then(|rest| rest.strip_prefix("_products_20"))
            .is_some_and(|rest| rest.ends_with(".json"))
    }
}

/// eBay search listings.
pub const EBAY: SiteSpec = SiteSpec {
    id: "ebay",
    source_site: "eBay",
    file_prefix: "ebay",
    url_marker: "ebay.com",
    fields: FieldMapping {
        name: "title",
        price: "price",
        url: "link",
        image_url: "image_url",
    },
};

/// trailerpartsunlimited.com category grids.
pub const TRAILER_PARTS_UNLIMITED: SiteSpec = SiteSpec {
    id: "trailerpartsunlimited",
    source_site: "trailerpartsunlimited.com",
    file_prefix: "trailerpartsunlimited",
    url_marker: "trailerpartsunlimited",
    fields: FieldMapping {
        name: "name",
        price: "price",
        url: "url",
        image_url: "image_url",
    },
};

/// Sites in merge order.
pub static SITES: [SiteSpec; 2] = [EBAY, TRAILER_PARTS_UNLIMITED];

/// Attributes a URL to a site by substring, falling back to [`UNKNOWN_SOURCE`].
/// trailerpartsunlimited takes precedence over eBay.
pub fn infer_source_site(url: &str) -> &'static str {
    [TRAILER_PARTS_UNLIMITED, EBAY]
        .iter()
        .find(|spec| url.contains(spec.url_marker))
        .map(|spec| spec.source_site)
        .unwrap_or(UNKNOWN_SOURCE)
}

/// Keeps an explicit source name, or infers one from `url` when it is blank
/// or the generic unknown marker.
pub fn resolve_source_site(explicit: &str, url: &str) -> String {
    let explicit = explicit.trim();
    if explicit.is_empty() || explicit == UNKNOWN_SOURCE {
        infer_source_site(url).to_string()
    } else {
        explicit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_site_from_url_substring() {
        assert_eq!(
            infer_source_site("https://trailerpartsunlimited.com/p1"),
            "trailerpartsunlimited.com"
        );
        assert_eq!(infer_source_site("https://www.ebay.com/itm/123"), "eBay");
        assert_eq!(infer_source_site("https://example.com/x"), UNKNOWN_SOURCE);
        assert_eq!(infer_source_site(""), UNKNOWN_SOURCE);
    }

    #[test]
    fn blank_source_is_inferred() {
        assert_eq!(
            resolve_source_site("", "https://trailerpartsunlimited.com/p1"),
            "trailerpartsunlimited.com"
        );
        assert_eq!(resolve_source_site("  ", "http://ebay.com/x"), "eBay");
        assert_eq!(resolve_source_site("Unknown", "http://ebay.com/x"), "eBay");
        assert_eq!(resolve_source_site("Acme", "http://ebay.com/x"), "Acme");
    }

    #[test]
    fn matches_scraper_file_names() {
        assert!(EBAY.matches_file_name("ebay_products_20240102_1130.json"));
        assert!(!EBAY.matches_file_name("ebay_products_20240102_1130.csv"));
        assert!(!EBAY.matches_file_name("ebay_products_19991231.json"));
        assert!(TRAILER_PARTS_UNLIMITED
            .matches_file_name("trailerpartsunlimited_products_20240102.json"));
        assert!(!TRAILER_PARTS_UNLIMITED.matches_file_name("ebay_products_20240102.json"));
    }
}
