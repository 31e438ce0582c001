//! Tenant-partitioned row storage shared by the in-memory repositories.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::{OrganizationId, Revisioned};

/// A write named a revision the stored row no longer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StaleRevision {
    pub(crate) expected: u32,
    pub(crate) actual: u32,
}

/// Rows keyed by `K`, partitioned by organization, kept in insertion order.
///
/// A row saved under one organization is invisible to every other
/// organization, so lookups across tenants behave like misses.
#[derive(Debug)]
pub(crate) struct TenantTable<K, V> {
    partitions: RwLock<HashMap<OrganizationId, Vec<(K, V)>>>,
}

impl<K, V> Default for TenantTable<K, V> {
    fn default() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> TenantTable<K, V>
where
    K: PartialEq,
    V: Clone,
{
    pub(crate) async fn get(&self, organization_id: &OrganizationId, key: &K) -> Option<V> {
        let guard = self.partitions.read().await;
        guard
            .get(organization_id)?
            .iter()
            .find(|(row_key, _)| row_key == key)
            .map(|(_, value)| value.clone())
    }

    /// Insert a new row at the end, or replace an existing one in place.
    pub(crate) async fn upsert(&self, organization_id: &OrganizationId, key: K, value: V) {
        let mut guard = self.partitions.write().await;
        let rows = guard.entry(*organization_id).or_default();
        match rows.iter_mut().find(|(row_key, _)| *row_key == key) {
            Some((_, existing)) => *existing = value,
            None => rows.push((key, value)),
        }
    }

    pub(crate) async fn list(&self, organization_id: &OrganizationId) -> Vec<V> {
        self.filter(organization_id, |_| true).await
    }

    pub(crate) async fn filter(
        &self,
        organization_id: &OrganizationId,
        predicate: impl Fn(&V) -> bool,
    ) -> Vec<V> {
        let guard = self.partitions.read().await;
        guard
            .get(organization_id)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, value)| predicate(value))
                    .map(|(_, value)| value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) async fn find(
        &self,
        organization_id: &OrganizationId,
        predicate: impl Fn(&V) -> bool,
    ) -> Option<V> {
        let guard = self.partitions.read().await;
        guard
            .get(organization_id)?
            .iter()
            .find(|(_, value)| predicate(value))
            .map(|(_, value)| value.clone())
    }

    pub(crate) async fn any(
        &self,
        organization_id: &OrganizationId,
        predicate: impl Fn(&V) -> bool,
    ) -> bool {
        let guard = self.partitions.read().await;
        guard
            .get(organization_id)
            .is_some_and(|rows| rows.iter().any(|(_, value)| predicate(value)))
    }
}

impl<K, V> TenantTable<K, V>
where
    K: PartialEq,
    V: Clone + Revisioned,
{
    /// Insert or replace a row if it still holds `expected`.
    ///
    /// A missing row counts as revision zero and `None` expects zero, so two
    /// inserts of the same key cannot both succeed. The check and the write
    /// happen under one write guard.
    pub(crate) async fn save_revision(
        &self,
        organization_id: &OrganizationId,
        key: K,
        value: V,
        expected: Option<u32>,
    ) -> Result<(), StaleRevision> {
        let expected = expected.unwrap_or(0);
        let mut guard = self.partitions.write().await;
        let rows = guard.entry(*organization_id).or_default();
        let existing = rows.iter_mut().find(|(row_key, _)| *row_key == key);
        let actual = existing.as_ref().map_or(0, |(_, row)| row.revision());
        if actual != expected {
            return Err(StaleRevision { expected, actual });
        }
        match existing {
            Some((_, row)) => *row = value,
            None => rows.push((key, value)),
        }
        Ok(())
    }
}
