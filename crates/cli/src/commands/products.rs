//! Catalog management commands.
//!
//! # Usage
//!
//! ```bash
//! # Load products from a YAML file, replacing the current catalog
//! storehouse-cli products seed catalog.yaml --replace
//!
//! # Print id, name, price and stock
//! storehouse-cli products list
//!
//! # Delete products whose images are not hosted on the media host
//! storehouse-cli products cleanup --keep-host media.example.com --dry-run
//! ```
//!
//! # Catalog File
//!
//! ```yaml
//! products:
//!   - name: Desk Lamp
//!     price: 1299
//!     discountedPercentage: 10
//!     stock: 25
//!     category: Lighting
//!     images:
//!       - https://media.example.com/lamp.jpg
//!     _type: bestseller
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};
use url::Url;

use storehouse_api::db::ProductRepository;
use storehouse_core::product::{Product, ProductDraft};

use super::{CliError, connect};

/// Top level of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductDraft>,
}

/// Parse a catalog file and normalize every entry.
pub fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, CliError> {
    let file: CatalogFile = serde_yaml::from_str(content)?;
    Ok(file
        .products
        .into_iter()
        .map(ProductDraft::normalized)
        .collect())
}

/// Validate every entry, logging each failure. Returns the number of
/// invalid entries.
fn report_invalid(drafts: &[ProductDraft]) -> usize {
    drafts
        .iter()
        .enumerate()
        .filter_map(|(index, draft)| draft.validate().err().map(|e| (index, draft, e)))
        .inspect(|(index, draft, e)| {
            error!(index, name = %draft.name, error = %e, "Invalid product");
        })
        .count()
}

/// Load products from `file_path`, optionally deleting the catalog first.
///
/// The file is read and validated before connecting to the database.
pub async fn seed(file_path: &str, replace: bool) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let drafts = parse_catalog(&content)?;
    info!(products = drafts.len(), "Parsed catalog");

    let invalid = report_invalid(&drafts);
    if invalid > 0 {
        return Err(CliError::InvalidCatalog(invalid));
    }

    let pool = connect().await?;
    let products = ProductRepository::new(&pool);

    if replace {
        let removed = products.delete_all().await?;
        info!(removed, "Cleared existing catalog");
    }

    for draft in &drafts {
        let product = products.create(draft).await?;
        info!(id = %product.id, name = %product.name, "Inserted product");
    }

    info!(inserted = drafts.len(), "Seeding complete!");
    Ok(())
}

/// Print every product as a table row.
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let products = ProductRepository::new(&pool).list_all().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:>6}  {:<40}  {:>10}  {:>6}", "ID", "NAME", "PRICE", "STOCK");
        for product in &products {
            println!(
                "{:>6}  {:<40}  {:>10}  {:>6}",
                product.id,
                truncate(&product.name, 40),
                product.price,
                product.stock
            );
        }
        println!("{} product(s)", products.len());
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

/// Whether every image of a product is served from `host`.
///
/// A product without images is not considered served.
pub fn is_served_from(images: &[String], host: &str) -> bool {
    !images.is_empty()
        && images.iter().all(|image| {
            Url::parse(image)
                .ok()
                .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
                .is_some_and(|h| h == host.to_ascii_lowercase())
        })
}

/// Products that would be removed by a cleanup for `host`.
pub fn stale_products<'a>(products: &'a [Product], host: &str) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| !is_served_from(&p.images, host))
        .collect()
}

/// Delete products whose images are not hosted on `keep_host`.
pub async fn cleanup(keep_host: &str, dry_run: bool) -> Result<(), CliError> {
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);
    let products = repo.list_all().await?;

    let stale = stale_products(&products, keep_host);
    if stale.is_empty() {
        info!(host = %keep_host, "Every product is served from the media host");
        return Ok(());
    }

    for product in &stale {
        info!(id = %product.id, name = %product.name, "Stale product");
    }

    if dry_run {
        warn!(count = stale.len(), "Dry run, nothing deleted");
        return Ok(());
    }

    let ids: Vec<_> = stale.iter().map(|p| p.id).collect();
    let removed = repo.delete_many(&ids).await?;
    info!(removed, "Cleanup complete!");
    Ok(())
}
