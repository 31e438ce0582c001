//! Tenant scoping and role-based permission checks.
//!
//! Identity is established upstream; by the time a request reaches a driving
//! port it carries a [`TenantContext`] naming the organization, the acting
//! staff member, and their role. Every port call is scoped by the
//! organization, and every mutating call checks a [`Permission`] first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{Error, OrganizationId, UserId};

/// Staff role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Account owner; unrestricted.
    Owner,
    /// Administrator; unrestricted.
    Admin,
    /// Store manager; everything except automation management.
    Manager,
    /// Front-line staff.
    Staff,
    /// Read-only access.
    Viewer,
}

/// Error returned when a role name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }

    /// Whether this role grants `permission`.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{Permission, Role};
    ///
    /// assert!(Role::Manager.grants(Permission::PurchasingManage));
    /// assert!(!Role::Manager.grants(Permission::AutomationManage));
    /// assert!(!Role::Viewer.grants(Permission::ReturnsManage));
    /// ```
    pub const fn grants(self, permission: Permission) -> bool {
        match self {
            Self::Owner | Self::Admin => true,
            Self::Manager => !matches!(permission, Permission::AutomationManage),
            Self::Staff => matches!(
                permission,
                Permission::LoyaltyView
                    | Permission::LoyaltyManage
                    | Permission::ReturnsManage
                    | Permission::InventoryView
                    | Permission::ReviewsSubmit
                    | Permission::CatalogueSearch
            ),
            Self::Viewer => matches!(
                permission,
                Permission::LoyaltyView | Permission::InventoryView | Permission::CatalogueSearch
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            "viewer" => Ok(Self::Viewer),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

/// Capability checked before a driving port acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read loyalty accounts.
    LoyaltyView,
    /// Award, redeem, adjust, and reverse loyalty points.
    LoyaltyManage,
    /// Drive subscription lifecycle transitions.
    SubscriptionsManage,
    /// Request, approve, receive, and refund returns.
    ReturnsManage,
    /// Create, submit, receive, and cancel purchase orders.
    PurchasingManage,
    /// Read stock levels.
    InventoryView,
    /// Submit reviews on behalf of customers.
    ReviewsSubmit,
    /// Approve or reject reviews.
    ReviewsModerate,
    /// Manage and trigger automation rules.
    AutomationManage,
    /// Search the product catalogue.
    CatalogueSearch,
}

impl Permission {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoyaltyView => "loyalty_view",
            Self::LoyaltyManage => "loyalty_manage",
            Self::SubscriptionsManage => "subscriptions_manage",
            Self::ReturnsManage => "returns_manage",
            Self::PurchasingManage => "purchasing_manage",
            Self::InventoryView => "inventory_view",
            Self::ReviewsSubmit => "reviews_submit",
            Self::ReviewsModerate => "reviews_moderate",
            Self::AutomationManage => "automation_manage",
            Self::CatalogueSearch => "catalogue_search",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is acting, on behalf of which organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    organization_id: OrganizationId,
    user_id: UserId,
    role: Role,
}

impl TenantContext {
    /// Build a context from already-authenticated identity claims.
    pub const fn new(organization_id: OrganizationId, user_id: UserId, role: Role) -> Self {
        Self {
            organization_id,
            user_id,
            role,
        }
    }

    /// Organization every query is scoped to.
    pub const fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    /// Acting staff member.
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Role of the acting staff member.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Fail with `403 Forbidden` unless the role grants `permission`.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{
    ///     ErrorCode, OrganizationId, Permission, Role, TenantContext, UserId,
    /// };
    ///
    /// let ctx = TenantContext::new(OrganizationId::random(), UserId::random(), Role::Viewer);
    /// let err = ctx.require(Permission::ReturnsManage).expect_err("viewer cannot");
    /// assert_eq!(err.code(), ErrorCode::Forbidden);
    /// ```
    pub fn require(&self, permission: Permission) -> Result<(), Error> {
        if self.role.grants(permission) {
            return Ok(());
        }
        tracing::warn!(
            organization_id = %self.organization_id,
            user_id = %self.user_id,
            role = %self.role,
            permission = %permission,
            "permission denied"
        );
        Err(
            Error::forbidden(format!("role {} lacks permission {permission}", self.role))
                .with_details(json!({
                    "permission": permission.as_str(),
                    "role": self.role.as_str(),
                })),
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    const ALL: [Permission; 10] = [
        Permission::LoyaltyView,
        Permission::LoyaltyManage,
        Permission::SubscriptionsManage,
        Permission::ReturnsManage,
        Permission::PurchasingManage,
        Permission::InventoryView,
        Permission::ReviewsSubmit,
        Permission::ReviewsModerate,
        Permission::AutomationManage,
        Permission::CatalogueSearch,
    ];

    #[rstest]
    #[case(Role::Owner)]
    #[case(Role::Admin)]
    fn administrators_hold_every_permission(#[case] role: Role) {
        assert!(ALL.iter().all(|permission| role.grants(*permission)));
    }

    #[rstest]
    #[case(Role::Staff, Permission::PurchasingManage)]
    #[case(Role::Staff, Permission::ReviewsModerate)]
    #[case(Role::Staff, Permission::SubscriptionsManage)]
    #[case(Role::Viewer, Permission::LoyaltyManage)]
    #[case(Role::Manager, Permission::AutomationManage)]
    fn restricted_roles_are_denied(#[case] role: Role, #[case] permission: Permission) {
        let ctx = TenantContext::new(OrganizationId::random(), UserId::random(), role);
        let err = ctx.require(permission).expect_err("denied");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        let details = err.details().expect("details");
        assert_eq!(details["permission"], permission.as_str());
    }

    #[rstest]
    #[case("Owner", Role::Owner)]
    #[case(" staff ", Role::Staff)]
    #[case("VIEWER", Role::Viewer)]
    fn parses_role_names(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>().expect("known role"), expected);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
    }
}
