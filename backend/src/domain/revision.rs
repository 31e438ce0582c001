//! Optimistic concurrency for stored aggregates.
//!
//! Every aggregate carries the revision it was read at, zero meaning it has
//! never been stored. A save names the revision the store must still hold,
//! so of two writers that read the same row only the first one lands; the
//! second sees a `RevisionMismatch` from its repository.

/// An aggregate saved with optimistic revision checks.
pub trait Revisioned {
    /// Revision this copy was read at; zero before the first save.
    fn revision(&self) -> u32;

    /// Overwrite the revision.
    fn set_revision(&mut self, revision: u32);

    /// Step to the next revision ahead of a save.
    ///
    /// Returns the revision the store must still hold, or `None` when this
    /// copy has never been stored.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{CustomerId, LoyaltyAccount, Revisioned};
    ///
    /// let mut account = LoyaltyAccount::new(CustomerId::random());
    /// assert_eq!(account.advance_revision(), None);
    /// assert_eq!(account.advance_revision(), Some(1));
    /// assert_eq!(account.revision(), 2);
    /// ```
    fn advance_revision(&mut self) -> Option<u32> {
        let current = self.revision();
        self.set_revision(current.saturating_add(1));
        (current > 0).then_some(current)
    }
}
