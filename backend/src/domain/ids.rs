//! Strongly typed UUID identifiers.
//!
//! Every aggregate gets its own identifier type so a customer id can never be
//! passed where a product id is expected.

use thiserror::Error;

/// Error raised when an identifier string is not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must be a valid UUID")]
pub struct IdParseError {
    /// Human-readable identifier kind, e.g. `organization id`.
    pub kind: &'static str,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::ids::IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim() != s {
                    return Err($crate::domain::ids::IdParseError { kind: $kind });
                }
                ::uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| $crate::domain::ids::IdParseError { kind: $kind })
            }
        }
    };
}

define_id!(
    /// Tenant identifier scoping every other record.
    OrganizationId,
    "organization id"
);
define_id!(
    /// Staff member acting within an organization.
    UserId,
    "user id"
);
define_id!(
    /// Shopper identifier.
    CustomerId,
    "customer id"
);
define_id!(
    /// Catalogue product identifier.
    ProductId,
    "product id"
);
define_id!(
    /// Order identifier.
    OrderId,
    "order id"
);
define_id!(
    /// Order line identifier.
    OrderLineId,
    "order line id"
);
define_id!(
    /// Subscription identifier.
    SubscriptionId,
    "subscription id"
);
define_id!(
    /// Return request identifier.
    ReturnId,
    "return id"
);
define_id!(
    /// Purchase order identifier.
    PurchaseOrderId,
    "purchase order id"
);
define_id!(
    /// Purchase order line identifier.
    PurchaseOrderLineId,
    "purchase order line id"
);
define_id!(
    /// Product review identifier.
    ReviewId,
    "review id"
);
define_id!(
    /// Automation rule identifier.
    RuleId,
    "rule id"
);
