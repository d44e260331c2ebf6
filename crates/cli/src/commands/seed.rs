//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Widget
//!     price: "9.99"
//!   - name: Gadget
//!     price: "4.50"
//! ```
//!
//! Prices are strings so they are read as exact decimals.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use sundry_api::config::get_database_url;
use sundry_api::db::{self, ProductRepository, ProductStore};
use sundry_api::models::order::MAX_PRODUCT_NAME_LENGTH;
use sundry_core::Price;

/// Top-level shape of a seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub price: String,
}

/// A product ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub name: String,
    pub price: Price,
}

/// Check every entry, collecting all problems.
///
/// # Errors
///
/// Returns one message per invalid entry.
pub fn validate_catalog(catalog: &CatalogFile) -> Result<Vec<ValidProduct>, Vec<String>> {
    let mut valid = Vec::with_capacity(catalog.products.len());
    let mut errors = Vec::new();

    for (index, product) in catalog.products.iter().enumerate() {
        let name = product.name.trim();
        if name.is_empty() {
            errors.push(format!("products[{index}].name: may not be blank"));
            continue;
        }
        if name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
            errors.push(format!(
                "products[{index}].name: longer than {MAX_PRODUCT_NAME_LENGTH} characters"
            ));
            continue;
        }

        match product.price.parse::<Price>() {
            Ok(price) => valid.push(ValidProduct {
                name: name.to_owned(),
                price,
            }),
            Err(e) => errors.push(format!("products[{index}].price: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(errors)
    }
}

/// Insert the products listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database operation fails.
pub async fn products(file_path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    info!(path = %file_path.display(), "Loading catalog from file");

    let content = tokio::fs::read_to_string(file_path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let products = match validate_catalog(&catalog) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(products = products.len(), "Catalog validated successfully");

    if dry_run {
        info!("Dry run, nothing inserted");
        return Ok(());
    }

    let database_url = get_database_url("SUNDRY_DATABASE_URL")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = ProductRepository::new(pool);
    for product in &products {
        let created = repo.create(&product.name, product.price).await?;
        info!(id = %created.id, name = %created.name, price = %created.price, "Inserted product");
    }

    info!("Seeding complete! {} products inserted", products.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> CatalogFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_catalog() {
        let catalog = parse(
            r#"
products:
  - name: "  Widget "
    price: "9.99"
  - name: Gadget
    price: "4.5"
"#,
        );

        let products = validate_catalog(&catalog).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Widget");
        assert_eq!(products[1].price.to_string(), "4.50");
    }

    #[test]
    fn test_invalid_entries_are_all_reported() {
        let catalog = parse(
            r#"
products:
  - name: ""
    price: "1.00"
  - name: Widget
    price: "-1"
  - name: Gadget
    price: "1.234"
"#,
        );

        let errors = validate_catalog(&catalog).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("products[0].name"));
        assert!(errors[1].starts_with("products[1].price"));
        assert!(errors[2].starts_with("products[2].price"));
    }
}
