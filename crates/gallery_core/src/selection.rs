//! Selection set scoped to the visible records

use std::collections::{BTreeSet, HashSet};

/// Process-lifetime set of selected record ids.
///
/// Ids hidden by the current filters stay in the set; every count and bulk
/// action works on `visible ∩ selected`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<i64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership; returns whether `id` is now selected
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Union the selection with every visible id
    pub fn select_all_visible(&mut self, visible: &[i64]) {
        self.ids.extend(visible.iter().copied());
    }

    /// Empties the whole set, hidden ids included
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// `visible ∩ selected`, in visible order
    pub fn selected_visible(&self, visible: &[i64]) -> Vec<i64> {
        visible.iter().copied().filter(|id| self.ids.contains(id)).collect()
    }

    pub fn selected_visible_count(&self, visible: &[i64]) -> usize {
        visible.iter().filter(|id| self.ids.contains(id)).count()
    }

    /// True iff something is visible and all of it is selected
    pub fn is_fully_selected(&self, visible: &[i64]) -> bool {
        !visible.is_empty() && self.selected_visible_count(visible) == visible.len()
    }

    /// Select-all / deselect-all toggle
    pub fn toggle_select_all(&mut self, visible: &[i64]) {
        if self.is_fully_selected(visible) {
            self.clear();
        } else {
            self.select_all_visible(visible);
        }
    }

    /// Drop ids that no longer exist after a reload
    pub fn retain_existing(&mut self, existing: &HashSet<i64>) {
        self.ids.retain(|id| existing.contains(id));
    }

    pub fn remove_all(&mut self, ids: &[i64]) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    /// Size of the raw set, hidden ids included
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
