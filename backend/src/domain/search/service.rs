//! Search service implementing [`ProductSearchQuery`].

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{Page, PageRequest, paginate};
use serde_json::json;

use super::{SearchHit, rank, tokenize};
use crate::domain::ports::{ProductCatalogue, ProductSearchQuery, ProductSearchRequest};
use crate::domain::{Error, Permission, TenantContext};

/// Ranks the tenant's catalogue for keyword queries.
#[derive(Clone)]
pub struct ProductSearchService<C> {
    catalogue: Arc<C>,
}

impl<C> ProductSearchService<C> {
    /// Create a service over `catalogue`.
    pub fn new(catalogue: Arc<C>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl<C> ProductSearchQuery for ProductSearchService<C>
where
    C: ProductCatalogue,
{
    async fn search(
        &self,
        ctx: &TenantContext,
        request: ProductSearchRequest,
    ) -> Result<Page<SearchHit>, Error> {
        ctx.require(Permission::CatalogueSearch)?;
        let tokens = tokenize(&request.query);
        if tokens.is_empty() {
            return Err(Error::invalid_request("query must contain letters or digits")
                .with_details(json!({ "field": "query" })));
        }
        let page_request = PageRequest::from_params(&request.page)?;
        let products = self
            .catalogue
            .list_products(ctx.organization_id())
            .await?;
        let hits = rank(products, &request.query, &tokens);
        let total_hits = hits.len();
        let page = paginate(hits, &page_request, SearchHit::rank_key)?;
        tracing::debug!(
            organization_id = %ctx.organization_id(),
            tokens = tokens.len(),
            total_hits,
            returned = page.items.len(),
            "catalogue searched"
        );
        Ok(page)
    }
}
