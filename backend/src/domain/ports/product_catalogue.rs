//! Port exposing the product catalogue to search.

use async_trait::async_trait;

use crate::domain::{OrganizationId, ProductSummary};

use super::define_port_error;

define_port_error! {
    /// Errors raised by product catalogue adapters.
    pub enum ProductCatalogueError for "product catalogue"
}

/// Read access to the tenant's products.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalogue: Send + Sync {
    /// Every product of the organization, active or not.
    async fn list_products(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<ProductSummary>, ProductCatalogueError>;
}
