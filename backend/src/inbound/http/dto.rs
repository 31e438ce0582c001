//! Wire shapes shared by several endpoint modules.

use actix_web::HttpRequest;
use pagination::PageLinks;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use utoipa::ToSchema;

use crate::domain::{Error, Money};

/// Monetary amount in minor units of an ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBody {
    /// Amount in minor units, e.g. cents.
    #[schema(example = 1999)]
    pub amount_minor: i64,
    /// Three-letter uppercase currency code.
    #[schema(example = "USD")]
    pub currency: String,
}

impl From<Money> for MoneyBody {
    fn from(value: Money) -> Self {
        Self {
            amount_minor: value.amount_minor(),
            currency: value.currency().as_str().to_owned(),
        }
    }
}

impl MoneyBody {
    /// Convert into domain money, naming `field` when the currency is bad.
    pub(crate) fn into_money(self, field: &'static str) -> Result<Money, Error> {
        Money::parse(self.amount_minor, &self.currency).map_err(|err| {
            Error::invalid_request(format!("{field}: {err}")).with_details(json!({
                "field": field,
                "value": self.currency,
                "code": "invalid_money",
            }))
        })
    }
}

/// Navigation links for a paginated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LinksBody {
    /// The current page.
    #[serde(rename = "self")]
    #[schema(rename = "self")]
    pub self_link: String,
    /// The following page, when there is one.
    pub next: Option<String>,
}

impl From<PageLinks> for LinksBody {
    fn from(value: PageLinks) -> Self {
        Self {
            self_link: value.self_link,
            next: value.next,
        }
    }
}

/// Build page links from the URL the client actually requested.
pub(crate) fn page_links(
    req: &HttpRequest,
    limit: usize,
    next_cursor: Option<&str>,
) -> Result<LinksBody, Error> {
    let url = Url::parse(&req.full_url().to_string())
        .map_err(|err| Error::internal(format!("request url unparseable: {err}")))?;
    Ok(PageLinks::from_request_url(&url, limit, next_cursor).into())
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    fn money_body_round_trips_domain_money() {
        let money = Money::parse(1_250, "EUR").expect("money");
        let body = MoneyBody::from(money);
        assert_eq!(body.amount_minor, 1_250);
        assert_eq!(body.currency, "EUR");
        assert_eq!(body.into_money("price").expect("money"), money);
    }

    #[rstest]
    #[case("usd")]
    #[case("DOLLARS")]
    fn money_body_rejects_bad_currency(#[case] currency: &str) {
        let body = MoneyBody {
            amount_minor: 100,
            currency: currency.to_owned(),
        };
        let err = body.into_money("price").expect_err("bad currency");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details().expect("details")["field"], "price");
    }

    #[rstest]
    fn page_links_keep_query_and_add_cursor() {
        let req = TestRequest::get()
            .uri("/api/v1/products/search?q=mug&limit=5")
            .insert_header(("host", "shop.test"))
            .to_http_request();
        let links = page_links(&req, 5, Some("abc")).expect("links");
        assert_eq!(links.self_link, "http://shop.test/api/v1/products/search?q=mug&limit=5");
        assert_eq!(
            links.next.as_deref(),
            Some("http://shop.test/api/v1/products/search?q=mug&limit=5&cursor=abc")
        );
    }
}
