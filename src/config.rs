use std::path::PathBuf;
use std::time::Duration;

use crate::{
    GALLERY_IMAGE_SELECTOR, HEADLESS, IDLE_TIMEOUT_MS, NAVIGATION_TIMEOUT_MS, OUTPUT_PATH,
    PLACEHOLDER_SELECTOR, PRODUCT_LINKS_PATH, STOCK_SELECTOR, TITLE_SELECTOR, VALID_PRODUCTS_PATH,
};

/// Everything a run needs. `Config::default()` is what the binary uses.
#[derive(Debug, Clone)]
pub struct Config {
    /// CSV with a `product_title` column.
    pub valid_products_path: PathBuf,
    /// CSV with a `link` column.
    pub product_links_path: PathBuf,
    /// Truncated at the start of every run.
    pub output_path: PathBuf,
    pub navigation_timeout: Duration,
    pub idle_timeout: Duration,
    pub headless: bool,
    pub selectors: PageSelectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            valid_products_path: VALID_PRODUCTS_PATH.into(),
            product_links_path: PRODUCT_LINKS_PATH.into(),
            output_path: OUTPUT_PATH.into(),
            navigation_timeout: Duration::from_millis(NAVIGATION_TIMEOUT_MS),
            idle_timeout: Duration::from_millis(IDLE_TIMEOUT_MS),
            headless: HEADLESS,
            selectors: PageSelectors::default(),
        }
    }
}

/// The named page elements the extractor looks for, as CSS selectors.
/// These are tied to one site's markup, swap them here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub stock: String,
    pub placeholder: String,
    pub title: String,
    pub gallery_image: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            stock: STOCK_SELECTOR.into(),
            placeholder: PLACEHOLDER_SELECTOR.into(),
            title: TITLE_SELECTOR.into(),
            gallery_image: GALLERY_IMAGE_SELECTOR.into(),
        }
    }
}
