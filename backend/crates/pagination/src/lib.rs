//! Opaque cursors and page envelopes shared by list endpoints.
//!
//! A cursor wraps the sort key of the last item on a page. Keys are
//! serialised to JSON and encoded as unpadded URL-safe base64 so clients can
//! pass them back verbatim without learning their structure.
//!
//! Lists are paginated by [`paginate`], which expects items sorted ascending
//! by the key the caller extracts. Descending orders are expressed through
//! the key itself (for example a negated timestamp).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page a client may request.
pub const MAX_LIMIT: usize = 100;

/// Failures while reading pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The cursor is not something this service issued.
    #[error("cursor is malformed")]
    InvalidCursor,
    /// The requested limit is outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}, got {requested}")]
    LimitOutOfRange {
        /// Limit sent by the client.
        requested: usize,
        /// Largest accepted limit.
        max: usize,
    },
    /// A sort key could not be serialised.
    #[error("failed to encode cursor: {0}")]
    Encode(String),
}

/// Encoded position after which the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap a sort key.
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the wrapped key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Unwrap the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the key as an opaque token.
    ///
    /// # Errors
    /// Returns [`PaginationError::Encode`] when the key cannot be serialised.
    ///
    /// # Examples
    /// ```
    /// use pagination::Cursor;
    ///
    /// let token = Cursor::new((3_i64, "b".to_owned())).encode()?;
    /// let decoded: Cursor<(i64, String)> = Cursor::decode(&token)?;
    /// assert_eq!(decoded.key(), &(3, "b".to_owned()));
    /// # Ok::<(), pagination::PaginationError>(())
    /// ```
    pub fn encode(&self) -> Result<String, PaginationError> {
        let json = serde_json::to_vec(&self.key)
            .map_err(|err| PaginationError::Encode(err.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidCursor`] when the token is not valid
    /// base64 or does not hold a key of type `K`.
    pub fn decode(token: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| PaginationError::InvalidCursor)?;
        let key = serde_json::from_slice(&bytes).map_err(|_| PaginationError::InvalidCursor)?;
        Ok(Self { key })
    }
}

/// Raw pagination parameters as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// Token from a previous page's `nextCursor`.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Requested page size.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Validated pagination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K> {
    after: Option<K>,
    limit: usize,
}

impl<K> PageRequest<K> {
    /// First page of `limit` items.
    pub const fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }

    /// Key of the last item already seen.
    pub const fn after(&self) -> Option<&K> {
        self.after.as_ref()
    }

    /// Page size.
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl<K: DeserializeOwned> PageRequest<K> {
    /// Validate client parameters.
    ///
    /// # Errors
    /// Returns [`PaginationError::LimitOutOfRange`] for a zero or oversized
    /// limit and [`PaginationError::InvalidCursor`] for a bad cursor.
    pub fn from_params(params: &PageParams) -> Result<Self, PaginationError> {
        let limit = match params.limit {
            None => DEFAULT_LIMIT,
            Some(requested) if (1..=MAX_LIMIT).contains(&requested) => requested,
            Some(requested) => {
                return Err(PaginationError::LimitOutOfRange {
                    requested,
                    max: MAX_LIMIT,
                });
            }
        };
        let after = params
            .cursor
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(Cursor::<K>::decode)
            .transpose()?
            .map(Cursor::into_key);
        Ok(Self { after, limit })
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Page size that was applied.
    pub limit: usize,
    /// Token for the following page, absent on the last page.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Convert every item, keeping the cursor.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            limit: self.limit,
            next_cursor: self.next_cursor,
        }
    }
}

/// Slice `sorted` into the page described by `request`.
///
/// `sorted` must be ordered ascending by `key`. Items whose key is not
/// strictly greater than the request's cursor are skipped, so a page stays
/// stable when earlier items are removed between requests.
///
/// # Errors
/// Returns [`PaginationError::Encode`] when the next cursor cannot be built.
///
/// # Examples
/// ```
/// use pagination::{PageRequest, paginate};
///
/// let page = paginate(vec![1, 2, 3, 4, 5], &PageRequest::first(2), |n| *n)?;
/// assert_eq!(page.items, vec![1, 2]);
/// assert!(page.next_cursor.is_some());
/// # Ok::<(), pagination::PaginationError>(())
/// ```
pub fn paginate<T, K, F>(
    sorted: Vec<T>,
    request: &PageRequest<K>,
    key: F,
) -> Result<Page<T>, PaginationError>
where
    K: Serialize + Ord,
    F: Fn(&T) -> K,
{
    let mut remaining = sorted
        .into_iter()
        .filter(|item| request.after().is_none_or(|after| key(item) > *after));
    let items: Vec<T> = remaining.by_ref().take(request.limit()).collect();
    let next_cursor = match (remaining.next(), items.last()) {
        (Some(_), Some(last)) => Some(Cursor::new(key(last)).encode()?),
        _ => None,
    };
    Ok(Page {
        items,
        limit: request.limit(),
        next_cursor,
    })
}

/// Navigation links for a page, derived from the request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
    /// The current page.
    #[serde(rename = "self")]
    pub self_link: String,
    /// The following page, when there is one.
    pub next: Option<String>,
}

impl PageLinks {
    /// Build links by rewriting the `cursor` and `limit` query parameters of
    /// `request_url` while keeping every other parameter.
    ///
    /// # Examples
    /// ```
    /// use pagination::PageLinks;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://shop.test/api/v1/search?q=mug&cursor=old").expect("url");
    /// let links = PageLinks::from_request_url(&url, 10, Some("abc"));
    /// assert_eq!(
    ///     links.next.as_deref(),
    ///     Some("https://shop.test/api/v1/search?q=mug&limit=10&cursor=abc")
    /// );
    /// ```
    #[must_use]
    pub fn from_request_url(request_url: &Url, limit: usize, next_cursor: Option<&str>) -> Self {
        let preserved: Vec<(String, String)> = request_url
            .query_pairs()
            .filter(|(name, _)| name != "cursor" && name != "limit")
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        let current: Option<String> = request_url
            .query_pairs()
            .find(|(name, _)| name == "cursor")
            .map(|(_, value)| value.into_owned());

        let build = |cursor: Option<&str>| {
            let mut url = request_url.clone();
            {
                let mut query = url.query_pairs_mut();
                query.clear();
                for (name, value) in &preserved {
                    query.append_pair(name, value);
                }
                query.append_pair("limit", &limit.to_string());
                if let Some(token) = cursor {
                    query.append_pair("cursor", token);
                }
            }
            url.to_string()
        };

        Self {
            self_link: build(current.as_deref()),
            next: next_cursor.map(|token| build(Some(token))),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::zero(Some(0))]
    #[case::too_large(Some(MAX_LIMIT + 1))]
    fn rejects_out_of_range_limits(#[case] limit: Option<usize>) {
        let params = PageParams {
            cursor: None,
            limit,
        };
        let result = PageRequest::<i64>::from_params(&params);
        assert!(matches!(
            result,
            Err(PaginationError::LimitOutOfRange { max: MAX_LIMIT, .. })
        ));
    }

    #[test]
    fn defaults_limit_and_ignores_blank_cursor() -> Result<(), PaginationError> {
        let params = PageParams {
            cursor: Some("  ".to_owned()),
            limit: None,
        };
        let request = PageRequest::<i64>::from_params(&params)?;
        assert_eq!(request.limit(), DEFAULT_LIMIT);
        assert_eq!(request.after(), None);
        Ok(())
    }

    #[rstest]
    #[case::not_base64("***")]
    #[case::wrong_shape("eyJhIjoxfQ")]
    fn rejects_foreign_cursors(#[case] token: &str) {
        assert_eq!(
            Cursor::<(i64, String)>::decode(token),
            Err(PaginationError::InvalidCursor)
        );
    }

    #[test]
    fn walks_every_item_exactly_once() -> Result<(), PaginationError> {
        let items: Vec<u32> = (1..=7).collect();
        let mut request = PageRequest::first(3);
        let mut seen = Vec::new();
        loop {
            let page = paginate(items.clone(), &request, |n| *n)?;
            seen.extend(page.items);
            let Some(token) = page.next_cursor else {
                break;
            };
            request = PageRequest::from_params(&PageParams {
                cursor: Some(token),
                limit: Some(3),
            })?;
        }
        assert_eq!(seen, items);
        Ok(())
    }

    #[test]
    fn last_full_page_has_no_next_cursor() -> Result<(), PaginationError> {
        let page = paginate(vec![1_u8, 2], &PageRequest::first(2), |n| *n)?;
        assert_eq!(page.next_cursor, None);
        Ok(())
    }

    #[test]
    fn cursor_survives_removed_items() -> Result<(), PaginationError> {
        let first = paginate(vec![10, 20, 30, 40], &PageRequest::first(2), |n| *n)?;
        let token = first.next_cursor.ok_or(PaginationError::InvalidCursor)?;
        let request = PageRequest::from_params(&PageParams {
            cursor: Some(token),
            limit: Some(2),
        })?;
        let second = paginate(vec![10, 30, 40], &request, |n| *n)?;
        assert_eq!(second.items, vec![30, 40]);
        Ok(())
    }

    #[test]
    fn links_keep_other_query_parameters() -> Result<(), url::ParseError> {
        let url = Url::parse("http://localhost/reviews?sort=new&limit=5")?;
        let links = PageLinks::from_request_url(&url, 5, None);
        assert_eq!(links.self_link, "http://localhost/reviews?sort=new&limit=5");
        assert_eq!(links.next, None);
        Ok(())
    }
}
