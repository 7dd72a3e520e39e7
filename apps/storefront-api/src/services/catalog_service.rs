//! Product administration.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use storefront_core::catalog::{validate_product_draft, ProductDraft};
use storefront_core::validation::{clamp_list_limit, validate_search_query};
use storefront_core::Product;
use storefront_db::ProductRepository;

use crate::error::{ServiceError, ServiceResult};

pub struct ProductCatalog {
    products: ProductRepository,
}

impl ProductCatalog {
    pub fn new(products: ProductRepository) -> Self {
        ProductCatalog { products }
    }

    pub async fn create(&self, draft: ProductDraft) -> ServiceResult<Product> {
        let draft = validate_product_draft(draft)?;
        let product = draft.into_product(Uuid::new_v4().to_string(), String::new(), Utc::now());

        let product = self.products.insert(&product).await?;
        info!(id = %product.id, name = %product.name, digital = product.is_digital, "Product created");
        Ok(product)
    }

    pub async fn update(&self, id: &str, draft: ProductDraft) -> ServiceResult<Product> {
        let draft = validate_product_draft(draft)?;
        let existing = self
            .products
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let updated = draft.apply_to(&existing, Utc::now());
        self.products.update(&updated).await?;
        info!(id = %id, "Product updated");
        Ok(updated)
    }

    pub async fn list(&self, query: &str, limit: Option<u32>) -> ServiceResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        Ok(self.products.search(&query, clamp_list_limit(limit)).await?)
    }
}
