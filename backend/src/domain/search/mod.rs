//! Keyword search over the product catalogue.
//!
//! Queries are split into lowercase alphanumeric tokens. A product scores
//! when its SKU equals the whole query or when every token hits its name,
//! tags, or description:
//!
//! | match                           | points |
//! |---------------------------------|--------|
//! | SKU equals query                | 100    |
//! | token equals a name word        | 10     |
//! | token prefixes a name word      | 5      |
//! | token equals a tag              | 3      |
//! | token equals a description word | 1      |

mod service;

pub use service::ProductSearchService;

use serde::{Deserialize, Serialize};

use super::{Money, ProductId};

/// Points for a query equal to the SKU.
pub const SKU_MATCH_SCORE: u32 = 100;
/// Points for a token equal to a word of the name.
pub const NAME_WORD_SCORE: u32 = 10;
/// Points for a token that starts a word of the name.
pub const NAME_PREFIX_SCORE: u32 = 5;
/// Points for a token equal to a tag.
pub const TAG_SCORE: u32 = 3;
/// Points for a token equal to a word of the description.
pub const DESCRIPTION_WORD_SCORE: u32 = 1;

/// Searchable projection of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Merchandising tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Current price.
    pub price: Money,
    /// Whether the product is on sale.
    pub active: bool,
}

/// A product that matched a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Matched product.
    pub product: ProductSummary,
    /// Relevance; higher is better.
    pub score: u32,
}

impl SearchHit {
    /// Sort key: score descending, then name, then id.
    pub(crate) fn rank_key(&self) -> (i64, String, ProductId) {
        (
            -i64::from(self.score),
            self.product.name.to_lowercase(),
            self.product.id,
        )
    }
}

/// Split text into distinct lowercase alphanumeric tokens, in order.
///
/// # Examples
/// ```
/// use storefront::domain::tokenize;
///
/// assert_eq!(tokenize("Blue mug, BLUE!"), vec!["blue", "mug"]);
/// assert!(tokenize(" -- ").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let token = word.to_lowercase();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Score a product against a tokenised query, or `None` when it does not
/// match. Inactive products never match.
pub fn score(product: &ProductSummary, query: &str, tokens: &[String]) -> Option<u32> {
    if !product.active {
        return None;
    }
    let sku_matches = !product.sku.trim().is_empty()
        && product.sku.trim().to_lowercase() == query.trim().to_lowercase();
    let name_words = tokenize(&product.name);
    let description_words = tokenize(&product.description);
    let tags: Vec<String> = product
        .tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .collect();

    let mut total = if sku_matches { SKU_MATCH_SCORE } else { 0 };
    let mut every_token_matched = true;
    for token in tokens {
        let name_points = if name_words.contains(token) {
            NAME_WORD_SCORE
        } else if name_words.iter().any(|word| word.starts_with(token.as_str())) {
            NAME_PREFIX_SCORE
        } else {
            0
        };
        let tag_points = if tags.contains(token) { TAG_SCORE } else { 0 };
        let description_points = if description_words.contains(token) {
            DESCRIPTION_WORD_SCORE
        } else {
            0
        };
        let token_points = name_points + tag_points + description_points;
        if token_points == 0 {
            every_token_matched = false;
        }
        total = total.saturating_add(token_points);
    }
    (sku_matches || every_token_matched).then_some(total)
}

/// Score and rank `products` for `query`, best first.
pub fn rank(products: Vec<ProductSummary>, query: &str, tokens: &[String]) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = products
        .into_iter()
        .filter_map(|product| {
            score(&product, query, tokens).map(|score| SearchHit { product, score })
        })
        .collect();
    hits.sort_by_cached_key(SearchHit::rank_key);
    hits
}

#[cfg(test)]
mod tests;
