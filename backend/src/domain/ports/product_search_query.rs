//! Driving port for catalogue search.

use async_trait::async_trait;
use pagination::{Page, PageParams};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, SearchHit, TenantContext};

/// Keyword search with cursor pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchRequest {
    /// Free-text query.
    pub query: String,
    /// Page position and size.
    #[serde(default, flatten)]
    pub page: PageParams,
}

/// Catalogue search consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSearchQuery: Send + Sync {
    /// Ranked products matching the query.
    async fn search(
        &self,
        ctx: &TenantContext,
        request: ProductSearchRequest,
    ) -> Result<Page<SearchHit>, Error>;
}
