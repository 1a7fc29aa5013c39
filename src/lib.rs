//! PRODUCT IMAGE SCRAPER
//! Visits product pages one at a time, pulls out the name + gallery images
//! and keeps the ones whose name is on the valid products list.

mod config;
mod error;
mod macros;
mod parse;
pub mod process;
mod records;
mod request;

pub use config::{Config, PageSelectors};
pub use error::{Error, FetchError, FetchResult, Result};
pub use parse::{strip_query, CompiledSelectors, Product};
pub use process::{fetch_product, process_site, scrape_links, Extraction, RunSummary};
pub use records::{build_row, product_handle, product_id, ProductRow, Rejection, RowWriter};
pub use request::{BrowserSession, ChromePage, PageDriver};

const VALID_PRODUCTS_PATH: &str = "./files/products_with_no_images.csv";
const PRODUCT_LINKS_PATH: &str = "./files/NBAHype_product_links.csv";
const OUTPUT_PATH: &str = "./files/product_images.csv";

const NAVIGATION_TIMEOUT_MS: u64 = 5_000;
const IDLE_TIMEOUT_MS: u64 = 10_000;
/// Run the browser with a visible window so the scrape can be watched.
const HEADLESS: bool = false;

const STOCK_SELECTOR: &str = "p.📚19-7-0uGevg.📚19-7-0EEwzY";
const PLACEHOLDER_SELECTOR: &str = "div.figure__placeholder-bg";
const TITLE_SELECTOR: &str = "h1.w-product-title";
const GALLERY_IMAGE_SELECTOR: &str = "#bb240244-f7c5-11ec-a611-571561743ede > div > div > div.w-cell.fullwidth-mobile.no-margin-top.no-overflow.row > div > div > div > div.product-gallery__wrapper > div > div.display-desktop > div > div img";

const OUT_OF_STOCK_MARKER: &str = "Out of stock";
const NAME_NOT_FOUND: &str = "Name not found";
