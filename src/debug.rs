//! Per-unit debug channel.

use std::collections::BTreeMap;

use crate::model::{GameObject, ObjId};

/// Key/value annotations recorded for one unit.
pub type DebugTable = BTreeMap<String, String>;

/// Sink user logic writes debug annotations to while one unit runs.
///
/// A fresh channel is created for every unit invocation. Its table is kept
/// in the turn report only if non-empty; its located units are appended to
/// the turn-wide list in the order they were recorded.
#[derive(Debug, Clone)]
pub struct DebugChannel {
    unit: ObjId,
    table: DebugTable,
    located: Vec<ObjId>,
}

impl DebugChannel {
    /// Create a channel for `unit`.
    #[must_use]
    pub fn new(unit: ObjId) -> Self {
        Self {
            unit,
            table: DebugTable::new(),
            located: Vec::new(),
        }
    }

    /// The unit this channel belongs to.
    #[must_use]
    pub fn unit(&self) -> &ObjId {
        &self.unit
    }

    /// Record `value` under `key`; a later write to the same key wins.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.table.insert(key.into(), value.into());
    }

    /// Mark `target` for external inspection.
    ///
    /// Repeated flags of the same unit are all kept.
    pub fn flag(&mut self, target: &GameObject) {
        self.located.push(target.id().clone());
    }

    /// Annotations so far.
    #[must_use]
    pub fn table(&self) -> &DebugTable {
        &self.table
    }

    /// Units flagged so far.
    #[must_use]
    pub fn located(&self) -> &[ObjId] {
        &self.located
    }

    /// Consume the channel into its table and flagged units.
    #[must_use]
    pub fn into_parts(self) -> (DebugTable, Vec<ObjId>) {
        (self.table, self.located)
    }
}
