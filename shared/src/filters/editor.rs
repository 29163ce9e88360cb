//! Local editing state for the filter list.
//!
//! Each rule travels with its own edit state in a [`RuleEntry`]; the list is
//! the only owner of both, so dirty flags cannot drift from the rules they
//! describe. Every mutation marks exactly the rules it touched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::condition::{Condition, ConditionType};
use super::rule::{FilterRule, RuleId};
use crate::error::{AppError, EditError};

#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub rule: FilterRule,
    pub dirty: bool,
    pub saving: bool,
    pub deleting: bool,
    /// Bumped on every local mutation; a save only clears `dirty` if the
    /// revision it sent is still current when the response arrives.
    pub revision: u64,
    pub error: Option<AppError>,
}

impl RuleEntry {
    fn clean(rule: FilterRule) -> Self {
        Self {
            rule,
            dirty: false,
            saving: false,
            deleting: false,
            revision: 0,
            error: None,
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Snapshot handed to the PUT request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSave {
    pub rule: FilterRule,
    pub revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterList {
    entries: Vec<RuleEntry>,
}

impl FilterList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces local state with a freshly loaded list. Every rule is clean,
    /// but a rule that survives the reload keeps its in-flight save and
    /// delete flags. Its revision moves past any snapshot already sent, so a
    /// late acknowledgement cannot clear edits made on top of the reload.
    pub fn replace_all(&mut self, rules: Vec<FilterRule>) {
        let previous = std::mem::take(&mut self.entries);
        self.entries = rules
            .into_iter()
            .map(|rule| {
                let mut entry = RuleEntry::clean(rule);
                if let Some(old) = previous.iter().find(|e| e.rule.id == entry.rule.id) {
                    entry.saving = old.saving;
                    entry.deleting = old.deleting;
                    entry.revision = old.revision.wrapping_add(1);
                }
                entry
            })
            .collect();
    }

    /// Adds a rule the server just created. New rules start clean. A reload
    /// that already delivered the same id is replaced in place.
    pub fn push_created(&mut self, rule: FilterRule) {
        match self.entries.iter_mut().find(|e| e.rule.id == rule.id) {
            Some(existing) => {
                debug!(id = %rule.id, "created rule already listed");
                *existing = RuleEntry::clean(rule);
            }
            None => self.entries.push(RuleEntry::clean(rule)),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter()
    }

    pub fn rules(&self) -> impl Iterator<Item = &FilterRule> {
        self.entries.iter().map(|e| &e.rule)
    }

    #[must_use]
    pub fn get(&self, id: &RuleId) -> Option<&RuleEntry> {
        self.entries.iter().find(|e| &e.rule.id == id)
    }

    #[must_use]
    pub fn is_dirty(&self, id: &RuleId) -> bool {
        self.get(id).is_some_and(|e| e.dirty)
    }

    #[must_use]
    pub fn dirty_ids(&self) -> Vec<RuleId> {
        self.entries
            .iter()
            .filter(|e| e.dirty)
            .map(|e| e.rule.id.clone())
            .collect()
    }

    fn entry_mut(&mut self, id: &RuleId) -> Result<&mut RuleEntry, EditError> {
        self.entries
            .iter_mut()
            .find(|e| &e.rule.id == id)
            .ok_or_else(|| EditError::RuleNotFound(id.clone()))
    }

    pub fn update_name(&mut self, id: &RuleId, name: impl Into<String>) -> Result<(), EditError> {
        let entry = self.entry_mut(id)?;
        entry.rule.name = name.into();
        entry.touch();
        Ok(())
    }

    /// Appends an empty condition of the given type at the end of the rule.
    pub fn add_condition(
        &mut self,
        id: &RuleId,
        condition_type: ConditionType,
    ) -> Result<(), EditError> {
        let entry = self.entry_mut(id)?;
        entry.rule.conditions.push(Condition::empty(condition_type));
        entry.touch();
        Ok(())
    }

    /// Index splice. The last-distance-condition guard is checked by callers
    /// through [`FilterRule::can_remove_condition`].
    pub fn remove_condition(&mut self, id: &RuleId, index: usize) -> Result<Condition, EditError> {
        let entry = self.entry_mut(id)?;
        let len = entry.rule.conditions.len();
        if index >= len {
            return Err(EditError::ConditionOutOfRange { index, len });
        }
        let removed = entry.rule.conditions.remove(index);
        entry.touch();
        Ok(removed)
    }

    pub fn update_condition_value(
        &mut self,
        id: &RuleId,
        index: usize,
        input: impl Into<String>,
    ) -> Result<(), EditError> {
        let entry = self.entry_mut(id)?;
        let len = entry.rule.conditions.len();
        let condition = entry
            .rule
            .conditions
            .get_mut(index)
            .ok_or(EditError::ConditionOutOfRange { index, len })?;
        condition.set_input(input);
        entry.touch();
        Ok(())
    }

    /// Applies a new order given as a permutation of the current ids. Every
    /// rule gets `evaluation_order = position + 1` and is marked dirty.
    pub fn reorder(&mut self, order: &[RuleId]) -> Result<(), EditError> {
        if order.len() != self.entries.len() {
            return Err(EditError::InvalidOrder);
        }

        let mut positions = Vec::with_capacity(order.len());
        for id in order {
            let position = self
                .entries
                .iter()
                .position(|e| &e.rule.id == id)
                .ok_or(EditError::InvalidOrder)?;
            if positions.contains(&position) {
                return Err(EditError::InvalidOrder);
            }
            positions.push(position);
        }

        let mut slots: Vec<Option<RuleEntry>> =
            std::mem::take(&mut self.entries).into_iter().map(Some).collect();
        self.entries = positions
            .into_iter()
            .filter_map(|p| slots.get_mut(p).and_then(Option::take))
            .collect();
        self.renumber();
        debug!(rules = self.entries.len(), "filter list reordered");
        Ok(())
    }

    /// Drag helper: moves the rule at `from` to `to`, then renumbers like
    /// [`Self::reorder`].
    pub fn move_rule(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        let len = self.entries.len();
        if from >= len {
            return Err(EditError::PositionOutOfRange { position: from, len });
        }
        if to >= len {
            return Err(EditError::PositionOutOfRange { position: to, len });
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.renumber();
        Ok(())
    }

    fn renumber(&mut self) {
        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.rule.evaluation_order = u32::try_from(position + 1).ok();
            entry.touch();
        }
    }

    /// Marks a save in flight and returns the snapshot to send.
    pub fn begin_save(&mut self, id: &RuleId) -> Result<PendingSave, EditError> {
        let entry = self.entry_mut(id)?;
        if entry.saving {
            return Err(EditError::SaveInFlight(id.clone()));
        }
        entry.saving = true;
        entry.error = None;
        Ok(PendingSave {
            rule: entry.rule.clone(),
            revision: entry.revision,
        })
    }

    /// Records the outcome of a save. On success the dirty flag is cleared
    /// unless the rule was edited after the snapshot was taken.
    pub fn finish_save(
        &mut self,
        id: &RuleId,
        revision: u64,
        outcome: Result<(), AppError>,
    ) -> Result<(), EditError> {
        let entry = self.entry_mut(id)?;
        entry.saving = false;
        match outcome {
            Ok(()) => {
                if entry.revision == revision {
                    entry.dirty = false;
                }
                entry.error = None;
            }
            Err(error) => entry.error = Some(error),
        }
        Ok(())
    }

    pub fn begin_delete(&mut self, id: &RuleId) -> Result<(), EditError> {
        let entry = self.entry_mut(id)?;
        if entry.deleting {
            return Err(EditError::DeleteInFlight(id.clone()));
        }
        entry.deleting = true;
        entry.error = None;
        Ok(())
    }

    /// Removes the rule on success; on failure the list is left intact and
    /// the error is attached to the rule.
    pub fn finish_delete(
        &mut self,
        id: &RuleId,
        outcome: Result<(), AppError>,
    ) -> Result<Option<FilterRule>, EditError> {
        let position = self
            .entries
            .iter()
            .position(|e| &e.rule.id == id)
            .ok_or_else(|| EditError::RuleNotFound(id.clone()))?;
        match outcome {
            Ok(()) => Ok(Some(self.entries.remove(position).rule)),
            Err(error) => {
                let entry = &mut self.entries[position];
                entry.deleting = false;
                entry.error = Some(error);
                Ok(None)
            }
        }
    }

    pub fn clear_error(&mut self, id: &RuleId) -> Result<(), EditError> {
        self.entry_mut(id)?.error = None;
        Ok(())
    }
}
