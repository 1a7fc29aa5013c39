use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::{Error, PageSelectors, Result, NAME_NOT_FOUND, OUT_OF_STOCK_MARKER};

/// What a product page gave us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Last `/` segment of the page URL.
    pub id: String,
    pub name: String,
    /// Canonical image URLs, in gallery order.
    pub images: Vec<String>,
}

/// `PageSelectors` parsed once up front, so a typo fails the run before the browser starts.
/// Build it once per run and share it, every page reuses the same selectors.
#[derive(Debug)]
pub struct CompiledSelectors {
    stock: Selector,
    placeholder: Selector,
    title: Selector,
    gallery_image: Selector,
}

impl CompiledSelectors {
    pub fn compile(selectors: &PageSelectors) -> Result<Self> {
        Ok(Self {
            stock: create_selector(&selectors.stock)?,
            placeholder: create_selector(&selectors.placeholder)?,
            title: create_selector(&selectors.title)?,
            gallery_image: create_selector(&selectors.gallery_image)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability {
    Available,
    OutOfStock,
    NoImages,
}

/// Checks the freshly navigated page for the stock marker and for the empty gallery placeholder.
/// Stock status wins when both are present.
pub(crate) async fn inspect_availability(
    html: String,
    selectors: Arc<CompiledSelectors>,
) -> Result<Availability> {
    let availability = spawn_blocking(move || {
        let doc = Html::parse_document(&html);
        availability_of(&doc, &selectors)
    })
    .await?;

    Ok(availability)
}

/// Attempts to parse the settled page.
/// Returns the product name (or a placeholder when the title is missing) and the gallery image URLs.
pub(crate) async fn parse_product(
    html: String,
    selectors: Arc<CompiledSelectors>,
) -> Result<(String, Vec<String>)> {
    let parsed = spawn_blocking(move || {
        let doc = Html::parse_document(&html);
        (name_of(&doc, &selectors), images_of(&doc, &selectors))
    })
    .await?;

    Ok(parsed)
}

fn availability_of(doc: &Html, selectors: &CompiledSelectors) -> Availability {
    let out_of_stock = doc
        .select(&selectors.stock)
        .next()
        .is_some_and(|stock| element_text(stock).contains(OUT_OF_STOCK_MARKER));
    if out_of_stock {
        return Availability::OutOfStock;
    }

    if doc.select(&selectors.placeholder).next().is_some() {
        return Availability::NoImages;
    }

    Availability::Available
}

fn name_of(doc: &Html, selectors: &CompiledSelectors) -> String {
    doc.select(&selectors.title)
        .next()
        .map(|title| element_text(title).trim().to_string())
        .unwrap_or_else(|| NAME_NOT_FOUND.to_string())
}

fn images_of(doc: &Html, selectors: &CompiledSelectors) -> Vec<String> {
    doc.select(&selectors.gallery_image)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(|src| strip_query(src).to_string())
        .collect()
}

#[inline]
fn element_text(el: ElementRef) -> String {
    el.text().collect()
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

/// Drops everything from the first `?` on, leaving the full size resource URL.
#[inline]
pub fn strip_query(src: &str) -> &str {
    src.split('?').next().unwrap_or(src)
}
