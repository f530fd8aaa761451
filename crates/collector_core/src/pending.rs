use crate::state::{TabId, WindowId};

/// Transient state for one capture that is waiting for the user to supply a
/// refinement instruction. Holds the first tab's converted markdown so the
/// conversion does not have to be repeated once the instruction arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRefinement {
    pub markdown: String,
    pub url: String,
    pub title: String,
    pub multi_tab: bool,
    pub tab_count: usize,
    pub copy_after_refinement: bool,
    pub origin_tab_ids: Vec<TabId>,
    pub window_id: WindowId,
    pub timestamp: String,
}

/// Returned by [`PendingSlot::begin`] when a refinement is already waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupied;

/// Single-slot owner of the pending refinement. Every transition goes through
/// one of the named methods below, which is what enforces the "at most one
/// pending refinement" invariant in a single place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingSlot {
    current: Option<PendingRefinement>,
}

impl PendingSlot {
    /// Occupy the slot. Rejected while a refinement is already pending; the
    /// earlier capture is never silently replaced.
    pub fn begin(&mut self, pending: PendingRefinement) -> Result<(), SlotOccupied> {
        if self.current.is_some() {
            return Err(SlotOccupied);
        }
        self.current = Some(pending);
        Ok(())
    }

    /// Take the pending refinement out for processing (instruction submitted).
    pub fn resolve(&mut self) -> Option<PendingRefinement> {
        self.current.take()
    }

    /// Drop the pending refinement (explicit user cancel). Returns whether
    /// anything was cleared.
    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Auto-invalidation: the user activated a tab outside the pending
    /// refinement's origin scope. Clears the slot and reports whether it did.
    pub fn invalidate_on_tab_switch(&mut self, tab_id: TabId, window_id: WindowId) -> bool {
        let stale = match &self.current {
            Some(pending) => {
                pending.window_id != window_id || !pending.origin_tab_ids.contains(&tab_id)
            }
            None => false,
        };
        if stale {
            self.current = None;
        }
        stale
    }

    /// Auto-invalidation: one of the origin tabs navigated away.
    pub fn invalidate_on_navigation(&mut self, tab_id: TabId) -> bool {
        let stale = match &self.current {
            Some(pending) => pending.origin_tab_ids.contains(&tab_id),
            None => false,
        };
        if stale {
            self.current = None;
        }
        stale
    }

    pub fn get(&self) -> Option<&PendingRefinement> {
        self.current.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }
}
