use crate::state::{CaptureOutcome, CapturePhase};

/// Read-only snapshot of the pending refinement, safe to hand to hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingView {
    pub multi_tab: bool,
    pub tab_count: usize,
    pub copy_after_refinement: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorView {
    pub phase: CapturePhase,
    pub entry_count: usize,
    pub badge_count: usize,
    pub pending: Option<PendingView>,
    pub last_outcome: Option<CaptureOutcome>,
}
