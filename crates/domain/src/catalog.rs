//! Catalog service: categories and products.

use common::{CategoryId, Money, ProductId};
use serde::Deserialize;
use store::{Category, CatalogStore, NewCategory, NewProduct, Product, ProductPatch};

use crate::error::{DomainError, ValidationError};

/// Input for a new product. The price is a decimal amount.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Partial product update. Absent fields are left untouched; a `null`
/// description clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::patch::nullable")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_price(amount: f64) -> Result<Money, ValidationError> {
    Money::from_decimal(amount)
        .filter(|price| !price.is_negative())
        .ok_or_else(|| ValidationError::InvalidPrice(amount.to_string()))
}

fn check_stock(stock: i32) -> Result<i32, ValidationError> {
    if stock < 0 {
        Err(ValidationError::NegativeStock(stock))
    } else {
        Ok(stock)
    }
}

/// Service for managing the catalog.
pub struct CatalogService<S> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rejects a category id that does not exist, listing the ones that do.
    async fn ensure_category(&self, id: CategoryId) -> Result<(), DomainError> {
        if self.store.get_category(id).await?.is_some() {
            return Ok(());
        }
        let categories = self.store.list_categories().await?;
        let available = if categories.is_empty() {
            "none".to_string()
        } else {
            categories
                .iter()
                .map(|c| format!("{} - {}", c.id, c.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Err(ValidationError::UnknownCategory { id, available }.into())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, DomainError> {
        let name = non_empty(name, "category name")?;
        let category = self.store.create_category(NewCategory { name }).await?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, DomainError> {
        Ok(self.store.get_category(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<Category>, DomainError> {
        let name = non_empty(name, "category name")?;
        Ok(self.store.rename_category(id, name).await?)
    }

    /// Deletes a category. Its products stay in the catalog, uncategorized.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<bool, DomainError> {
        let deleted = self.store.delete_category(id).await?;
        if deleted {
            tracing::info!(category_id = %id, "category deleted");
        }
        Ok(deleted)
    }

    #[tracing::instrument(skip(self, cmd), fields(name = %cmd.name))]
    pub async fn create_product(&self, cmd: CreateProduct) -> Result<Product, DomainError> {
        let product = NewProduct {
            name: non_empty(&cmd.name, "product name")?,
            description: cmd.description,
            price: parse_price(cmd.price)?,
            stock: check_stock(cmd.stock)?,
            category_id: cmd.category_id,
        };
        if let Some(category_id) = product.category_id {
            self.ensure_category(category_id).await?;
        }

        let product = self.store.create_product(product).await?;
        tracing::info!(product_id = %product.id, price = %product.price, "product created");
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list_products().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.store.get_product(id).await?)
    }

    /// Applies a partial update.
    ///
    /// A new price does not touch existing orders; their totals only move
    /// when their lines are replaced.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn update_product(
        &self,
        id: ProductId,
        cmd: UpdateProduct,
    ) -> Result<Option<Product>, DomainError> {
        let patch = ProductPatch {
            name: cmd
                .name
                .as_deref()
                .map(|n| non_empty(n, "product name"))
                .transpose()?,
            description: cmd.description,
            price: cmd.price.map(parse_price).transpose()?,
            stock: cmd.stock.map(check_stock).transpose()?,
            category_id: cmd.category_id,
        };
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id).await?;
        }
        Ok(self.store.update_product(id, patch).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<bool, DomainError> {
        Ok(self.store.delete_product(id).await?)
    }
}
