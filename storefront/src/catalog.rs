//! Product lookup collaborator.

use crate::types::{Product, ProductId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Boxed future returned by catalog operations
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CatalogError>> + Send + 'a>>;

/// Errors reported by a product catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No product with this id
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The catalog could not be reached
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the product catalog
pub trait ProductCatalog: Send + Sync {
    /// Current data for one product
    fn get_product(&self, product_id: ProductId) -> CatalogFuture<'_, Product>;
}

/// Catalog held in memory, editable to simulate price and stock changes
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Create a catalog holding `products`
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Insert or overwrite a product
    pub async fn upsert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn get_product(&self, product_id: ProductId) -> CatalogFuture<'_, Product> {
        Box::pin(async move {
            self.products
                .read()
                .await
                .get(&product_id)
                .cloned()
                .ok_or(CatalogError::NotFound(product_id))
        })
    }
}
