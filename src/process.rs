use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;

use crate::parse::{inspect_availability, parse_product, Availability};
use crate::records::{
    build_row, load_product_links, load_valid_titles, product_id, Rejection, RowWriter,
};
use crate::request::{BrowserSession, PageDriver};
use crate::{info_time, warn_time, CompiledSelectors, Config, FetchError, Product, Result};

/// The outcome of visiting one product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Extracted(Product),
    SkippedOutOfStock,
    SkippedNoImages,
    SkippedFetchError,
}

/// Tally of what happened to every link in a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub visited: usize,
    pub written: usize,
    pub out_of_stock: usize,
    pub no_images: usize,
    pub fetch_errors: usize,
    /// Extracted, but the name isn't on the valid products list.
    pub not_valid: usize,
    /// Extracted with an empty title.
    pub missing_name: usize,
    /// Extracted, but the gallery held no usable images.
    pub missing_images: usize,
}

/// Reads both input files, launches the browser and scrapes every link into the output file.
/// The browser is closed whether or not the scrape itself succeeded.
pub async fn process_site(config: Config) -> Result<RunSummary> {
    let start_time = Local::now();
    info_time!("Started scraping");

    let selectors = Arc::new(CompiledSelectors::compile(&config.selectors)?);
    let valid_titles = load_valid_titles(&config.valid_products_path)?;
    info_time!("Loaded {} valid product titles", valid_titles.len());
    let links = load_product_links(&config.product_links_path)?;
    info_time!("Loaded {} product links", links.len());

    let mut writer = RowWriter::create(&config.output_path)?;

    let mut session = BrowserSession::launch(&config).await?;
    let scraped = scrape_links(
        session.page(),
        &links,
        &valid_titles,
        &mut writer,
        &config,
        selectors,
    )
    .await;
    let closed = session.close().await;

    let summary = scraped?;
    closed?;
    info_time!(
        start_time,
        "Finished scraping, wrote {} rows to {}",
        summary.written,
        config.output_path.display()
    );
    Ok(summary)
}

/// Visits `links` in order with `driver`, writing a row for every valid product.
/// A page that can't be scraped is logged and skipped, only a failing writer stops the run.
pub async fn scrape_links<D: PageDriver + Send>(
    driver: &mut D,
    links: &[String],
    valid_titles: &HashSet<String>,
    writer: &mut RowWriter,
    config: &Config,
    selectors: Arc<CompiledSelectors>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for link in links {
        info_time!("Processing {link}");
        summary.visited += 1;

        let product = match fetch_product(driver, link, config, selectors.clone()).await {
            Extraction::Extracted(product) => product,
            Extraction::SkippedOutOfStock => {
                summary.out_of_stock += 1;
                continue;
            }
            Extraction::SkippedNoImages => {
                summary.no_images += 1;
                continue;
            }
            Extraction::SkippedFetchError => {
                summary.fetch_errors += 1;
                continue;
            }
        };

        match build_row(link, &product, valid_titles) {
            Ok(row) => {
                writer.write(&row)?;
                summary.written += 1;
            }
            Err(Rejection::NotValid(name)) => {
                warn_time!("Product '{name}' not in the valid products list. Skipping.");
                summary.not_valid += 1;
            }
            Err(Rejection::EmptyName) => {
                warn_time!("Product at {link} has no name. Skipping.");
                summary.missing_name += 1;
            }
            Err(Rejection::NoImages) => {
                warn_time!("No product images found at {link}. Skipping.");
                summary.missing_images += 1;
            }
        }
    }

    info_time!("{summary:?}");
    Ok(summary)
}

/// Navigates to `url` and pulls the product out of the page.
/// Every failure is reported as one of the `Skipped*` variants, nothing here aborts a run.
pub async fn fetch_product<D: PageDriver + Send>(
    driver: &mut D,
    url: &str,
    config: &Config,
    selectors: Arc<CompiledSelectors>,
) -> Extraction {
    info_time!("Navigating to {url}...");
    match driver.goto(url, config.navigation_timeout).await {
        Ok(()) => {}
        Err(FetchError::Timeout(limit)) => {
            warn_time!("Navigation timed out after {limit:?}, processing what is available...")
        }
        Err(e) => return fetch_failed(url, e),
    }

    let html = match driver.content().await {
        Ok(html) => html,
        Err(e) => return fetch_failed(url, e),
    };
    match inspect_availability(html, selectors.clone()).await {
        Ok(Availability::Available) => {}
        Ok(Availability::OutOfStock) => {
            info_time!("Product is out of stock. Skipping.");
            return Extraction::SkippedOutOfStock;
        }
        Ok(Availability::NoImages) => {
            info_time!("No product images available. Skipping.");
            return Extraction::SkippedNoImages;
        }
        Err(e) => {
            warn_time!("Couldn't inspect {url}: {e}");
            return Extraction::SkippedFetchError;
        }
    }

    info_time!("Waiting for network to be idle...");
    match driver.wait_for_idle(config.idle_timeout).await {
        Ok(()) => {}
        Err(FetchError::Timeout(limit)) => {
            warn_time!("Network not idle after {limit:?}, processing what is available...")
        }
        Err(e) => return fetch_failed(url, e),
    }

    let html = match driver.content().await {
        Ok(html) => html,
        Err(e) => return fetch_failed(url, e),
    };
    info_time!("Extracting product name and image URLs...");
    let (name, images) = match parse_product(html, selectors).await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn_time!("Error extracting product details from {url}: {e}");
            return Extraction::SkippedFetchError;
        }
    };
    info_time!("Product name: {name}, found {} product images", images.len());

    Extraction::Extracted(Product {
        id: product_id(url).to_string(),
        name,
        images,
    })
}

fn fetch_failed(url: &str, err: FetchError) -> Extraction {
    warn_time!("Couldn't load {url}: {err}");
    Extraction::SkippedFetchError
}
