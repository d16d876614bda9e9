//! Ledger read interface.
//!
//! Queries are read-only, tenant-free (the ledger is a single audit trail)
//! and deterministic: two identical calls against unchanged state return
//! identical ordered sequences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocktrail_core::ItemId;

use crate::entry::{EntryAction, LedgerEntry, LedgerError};

/// Filter criteria for ledger queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Filter by item lineage (matches source or destination id).
    pub item_id: Option<ItemId>,
    /// Match `item_id` against the source id only, ignoring transfer
    /// destinations. Demand aggregation wants this: an inbound transfer is
    /// not the destination item's own demand.
    #[serde(default)]
    pub source_only: bool,
    /// Restrict to a set of actions (None = all actions).
    pub actions: Option<Vec<EntryAction>>,
    /// Entries at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Entries at or before this time.
    pub until: Option<DateTime<Utc>>,
}

impl EntryFilter {
    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    /// Entries where the item is the acting source (destination lineage of a
    /// transfer does not match).
    pub fn for_source(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            source_only: true,
            ..Self::default()
        }
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = EntryAction>) -> Self {
        self.actions = Some(actions.into_iter().collect());
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Whether `entry` matches every criterion of this filter.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(item_id) = self.item_id {
            let matches_source = entry.item_id == item_id;
            let matches_destination = !self.source_only && entry.new_item_id == Some(item_id);
            if !matches_source && !matches_destination {
                return false;
            }
        }
        if let Some(actions) = &self.actions {
            if !actions.contains(&entry.action) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Read-only view of the ledger.
pub trait LedgerQuery: Send + Sync {
    /// Entries matching `filter`, ascending by (timestamp, sequence).
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, LedgerError>;
}

impl<L> LedgerQuery for std::sync::Arc<L>
where
    L: LedgerQuery + ?Sized,
{
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        (**self).entries(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryDraft;
    use chrono::Duration;

    fn entry_at(action_offset_minutes: i64, seq: u64, item_id: ItemId) -> LedgerEntry {
        let at = Utc::now() + Duration::minutes(action_offset_minutes);
        EntryDraft::update(item_id, 0, 1, "alice", at).commit(seq).unwrap()
    }

    #[test]
    fn filter_matches_destination_item_of_a_transfer() {
        let source = ItemId::new();
        let dest = ItemId::new();
        let entry = EntryDraft::transfer(source, dest, "WH1", "WH2", 5, "alice", Utc::now())
            .commit(1)
            .unwrap();

        assert!(EntryFilter::for_item(source).matches(&entry));
        assert!(EntryFilter::for_item(dest).matches(&entry));
        assert!(!EntryFilter::for_item(ItemId::new()).matches(&entry));
    }

    #[test]
    fn source_only_filter_excludes_transfer_destinations() {
        let source = ItemId::new();
        let dest = ItemId::new();
        let entry = EntryDraft::transfer(source, dest, "WH1", "WH2", 5, "alice", Utc::now())
            .commit(1)
            .unwrap();

        assert!(EntryFilter::for_source(source).matches(&entry));
        assert!(!EntryFilter::for_source(dest).matches(&entry));
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let item_id = ItemId::new();
        let entry = entry_at(0, 1, item_id);
        let filter = EntryFilter::for_item(item_id).between(entry.timestamp, entry.timestamp);
        assert!(filter.matches(&entry));

        let before = EntryFilter::default().between(
            entry.timestamp + Duration::seconds(1),
            entry.timestamp + Duration::seconds(2),
        );
        assert!(!before.matches(&entry));
    }

    #[test]
    fn action_filter_restricts_kinds() {
        let item_id = ItemId::new();
        let entry = entry_at(0, 1, item_id);
        assert!(EntryFilter::default()
            .with_actions([EntryAction::Update, EntryAction::Transfer])
            .matches(&entry));
        assert!(!EntryFilter::default()
            .with_actions([EntryAction::Delete])
            .matches(&entry));
    }
}
