use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, Writer, WriterBuilder};

use crate::{Error, Product, Result};

pub(crate) const VALID_TITLE_COLUMN: &str = "product_title";
pub(crate) const LINK_COLUMN: &str = "link";
pub(crate) const OUTPUT_HEADER: [&str; 5] = [
    "product_id",
    "product_link",
    "product_handle",
    "product_name",
    "product_images",
];

/// One line of the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub product_id: String,
    pub product_link: String,
    pub product_handle: String,
    pub product_name: String,
    /// Image URLs joined with `,`.
    pub product_images: String,
}

impl ProductRow {
    fn as_record(&self) -> [&str; 5] {
        [
            self.product_id.as_str(),
            self.product_link.as_str(),
            self.product_handle.as_str(),
            self.product_name.as_str(),
            self.product_images.as_str(),
        ]
    }
}

/// Why an extracted product didn't make it into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyName,
    NoImages,
    NotValid(String),
}

/// Turns an extracted product into an output row, provided it has a name, at least one image
/// and the name is on the valid titles list.
pub fn build_row(
    link: &str,
    product: &Product,
    valid_titles: &HashSet<String>,
) -> core::result::Result<ProductRow, Rejection> {
    if product.name.is_empty() {
        return Err(Rejection::EmptyName);
    }
    if product.images.is_empty() {
        return Err(Rejection::NoImages);
    }
    if !valid_titles.contains(&product.name) {
        return Err(Rejection::NotValid(product.name.clone()));
    }

    Ok(ProductRow {
        product_id: product.id.clone(),
        product_link: link.to_string(),
        product_handle: product_handle(link).to_string(),
        product_name: product.name.clone(),
        product_images: product.images.join(","),
    })
}

/// Last `/` segment of a product link: `.../product/widget-123/abc999` -> `abc999`.
pub fn product_id(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// The segment right before the id: `.../product/widget-123/abc999` -> `widget-123`.
/// Empty when the link has no such segment.
pub fn product_handle(link: &str) -> &str {
    let mut segments = link.rsplit('/');
    segments.next();
    segments.next().unwrap_or("")
}

/// Loads the valid product titles.
pub(crate) fn load_valid_titles(path: &Path) -> Result<HashSet<String>> {
    Ok(read_column(path, VALID_TITLE_COLUMN)?.into_iter().collect())
}

/// Loads the product links, in file order.
pub(crate) fn load_product_links(path: &Path) -> Result<Vec<String>> {
    read_column(path, LINK_COLUMN)
}

fn read_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut rdr: Reader<File> = ReaderBuilder::new().flexible(true).from_path(path)?;
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::MissingColumn {
            path: path.display().to_string(),
            column: column.to_string(),
        })?;

    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(value) = record.get(idx) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Writes output rows, flushing each one so an interrupted run keeps what it already found.
pub struct RowWriter {
    writer: Writer<File>,
    rows: usize,
}

impl RowWriter {
    /// Creates (or truncates) the output file and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(OUTPUT_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, row: &ProductRow) -> Result<()> {
        self.writer.write_record(row.as_record())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;

    /// A path in the temp dir unique to this process and test.
    pub(crate) fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("prodscrap-{}-{name}", std::process::id()))
    }

    fn widget() -> Product {
        Product {
            id: "abc999".into(),
            name: "Widget".into(),
            images: vec!["https://cdn.example.com/img1.jpg".into()],
        }
    }

    #[test]
    fn id_and_handle_from_link() {
        let link = "https://example.com/product/widget-123/abc999";
        assert_eq!(product_id(link), "abc999");
        assert_eq!(product_handle(link), "widget-123");

        assert_eq!(product_id("abc999"), "abc999");
        assert_eq!(product_handle("abc999"), "");
        assert_eq!(product_handle("https://abc999"), "");
    }

    #[test]
    fn builds_row_for_valid_product() {
        let valid = HashSet::from(["Widget".to_string()]);
        let link = "https://example.com/product/widget-123/abc999";
        let mut product = widget();
        product.images.push("https://cdn.example.com/img2.jpg".into());

        let row = build_row(link, &product, &valid).unwrap();
        assert_eq!(row.product_id, "abc999");
        assert_eq!(row.product_link, link);
        assert_eq!(row.product_handle, "widget-123");
        assert_eq!(row.product_name, "Widget");
        assert_eq!(
            row.product_images,
            "https://cdn.example.com/img1.jpg,https://cdn.example.com/img2.jpg"
        );
    }

    #[test]
    fn rejects_unlisted_empty_and_imageless_products() {
        let valid = HashSet::from(["Widget".to_string(), String::new()]);
        let link = "https://example.com/product/gadget/1";

        let mut gadget = widget();
        gadget.name = "Gadget".into();
        assert_eq!(
            build_row(link, &gadget, &valid),
            Err(Rejection::NotValid("Gadget".into()))
        );

        let mut nameless = widget();
        nameless.name.clear();
        assert_eq!(build_row(link, &nameless, &valid), Err(Rejection::EmptyName));

        let mut imageless = widget();
        imageless.images.clear();
        assert_eq!(build_row(link, &imageless, &valid), Err(Rejection::NoImages));
    }

    #[test]
    fn reads_named_columns() {
        let path = temp_path("reads_named_columns.csv");
        std::fs::write(
            &path,
            "shopify_id,product_title\n1,Widget\n2,\"Gadget, Large\"\n3,Widget\n",
        )
        .unwrap();

        let titles = load_valid_titles(&path).unwrap();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains("Gadget, Large"));

        let err = load_product_links(&path).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column, .. } if column == LINK_COLUMN));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn links_keep_file_order() {
        let path = temp_path("links_keep_file_order.csv");
        std::fs::write(&path, "link\nhttps://a/x/1\nhttps://a/y/2\nhttps://a/x/1\n").unwrap();

        let links = load_product_links(&path).unwrap();
        assert_eq!(links, vec!["https://a/x/1", "https://a/y/2", "https://a/x/1"]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn writer_truncates_and_writes_header() {
        let path = temp_path("writer_truncates.csv");
        std::fs::write(&path, "stale contents\n").unwrap();

        let mut writer = RowWriter::create(&path).unwrap();
        let valid = HashSet::from(["Widget".to_string()]);
        let mut product = widget();
        product.images.push("https://cdn.example.com/img2.jpg".into());
        let row = build_row("https://example.com/product/widget-123/abc999", &product, &valid)
            .unwrap();
        writer.write(&row).unwrap();
        assert_eq!(writer.rows(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                "product_id,product_link,product_handle,product_name,product_images",
                "abc999,https://example.com/product/widget-123/abc999,widget-123,Widget,\
                 \"https://cdn.example.com/img1.jpg,https://cdn.example.com/img2.jpg\"",
            ]
        );
        std::fs::remove_file(&path).unwrap();
    }
}
