//! In-memory `ProductCatalogue`.
//!
//! Catalogue management is owned by the generic CRUD layer, so this adapter
//! only offers [`InMemoryProductCatalogue::upsert`] for seeding.

use async_trait::async_trait;

use crate::domain::ports::{ProductCatalogue, ProductCatalogueError};
use crate::domain::{OrganizationId, ProductId, ProductSummary};

use super::table::TenantTable;

/// Product summaries held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalogue {
    products: TenantTable<ProductId, ProductSummary>,
}

impl InMemoryProductCatalogue {
    /// Create an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product for `organization_id`.
    pub async fn upsert(&self, organization_id: &OrganizationId, product: ProductSummary) {
        self.products
            .upsert(organization_id, product.id, product)
            .await;
    }
}

#[async_trait]
impl ProductCatalogue for InMemoryProductCatalogue {
    async fn list_products(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProductSummary>, ProductCatalogueError> {
        Ok(self.products.list(organization_id).await)
    }
}
