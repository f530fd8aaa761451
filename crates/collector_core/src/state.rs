use crate::collection::Collection;
use crate::msg::RefineFailure;
use crate::pending::PendingSlot;
use crate::view_model::{CoordinatorView, PendingView};

pub type TabId = u64;
pub type WindowId = u64;

/// Monotonically increasing id for one capture (or refresh) operation.
/// Effect results echo it; results from superseded operations are dropped.
pub type OpSeq = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    Selecting,
    AwaitingInstruction,
    Processing,
    Persisting,
}

/// What the user asked for: plain save, or save plus clipboard copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureAction {
    Save,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NoTabsSelected,
    Conversion,
    AllConversionsFailed,
    Refine(RefineFailure),
    Storage,
}

/// Terminal result of the most recently finished capture operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved { saved: usize, failed: usize },
    Copied { saved: usize, failed: usize },
    Cancelled,
    Failed(FailureReason),
}

/// Settings snapshot the coordinator works from. Loaded by the host from the
/// store and refreshed via [`crate::Msg::SettingsLoaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSettings {
    /// Run readability-style extraction before conversion (`enableCleanup`).
    pub use_extraction: bool,
    /// LLM refinement feature toggle (`enableLLM`).
    pub refine_enabled: bool,
    /// Whether an API key is configured; without one the fast path is taken.
    pub has_credential: bool,
    /// Capture all highlighted tabs instead of the active one (`enableMultitab`).
    pub multi_tab: bool,
}

/// How the tabs of the active operation are being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OpMode {
    /// No refinement: convert every tab and persist.
    Direct,
    /// Refinement enabled: the first tab is being converted; its markdown
    /// will seed the pending-refinement slot.
    FirstForRefinement,
    /// Instruction was empty: convert the remaining tabs, persist unrefined.
    SaveUnrefined,
    /// Refine each tab separately with the same instruction.
    RefineEach { prompt: String },
    /// Combine all tabs and refine once into a single batch entry.
    RefineBatch { prompt: String },
}

/// A successfully captured tab, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TabCapture {
    pub tab: Tab,
    pub markdown: String,
}

/// A refine call that is in flight. The unrefined markdown is kept so a
/// malformed LLM response can fall back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InflightRefine {
    pub tab: Tab,
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveCapture {
    pub seq: OpSeq,
    pub action: CaptureAction,
    pub mode: OpMode,
    pub tabs: Vec<Tab>,
    /// Index of the next tab to convert.
    pub cursor: usize,
    pub captured: Vec<TabCapture>,
    pub failed: usize,
    pub inflight_refine: Option<InflightRefine>,
    pub last_refine_failure: Option<RefineFailure>,
    /// Built at persist time when the action is Copy.
    pub clipboard_text: Option<String>,
    /// Success toast composed when the entries are built, shown once the
    /// store write is acknowledged.
    pub success_message: Option<String>,
}

impl ActiveCapture {
    pub(crate) fn new(seq: OpSeq, action: CaptureAction) -> Self {
        Self {
            seq,
            action,
            mode: OpMode::Direct,
            tabs: Vec::new(),
            cursor: 0,
            captured: Vec::new(),
            failed: 0,
            inflight_refine: None,
            last_refine_failure: None,
            clipboard_text: None,
            success_message: None,
        }
    }

    pub(crate) fn next_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.cursor)
    }
}

/// An entry refresh (re-fetch of a saved url) that is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveRefresh {
    pub seq: OpSeq,
    pub url: String,
}

/// All state owned by the capture coordinator. Mutated exclusively by
/// [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorState {
    pub(crate) phase: CapturePhase,
    pub(crate) settings: CaptureSettings,
    pub(crate) collection: Collection,
    pub(crate) pending: PendingSlot,
    pub(crate) op: Option<ActiveCapture>,
    pub(crate) refresh: Option<ActiveRefresh>,
    pub(crate) next_seq: OpSeq,
    pub(crate) last_outcome: Option<CaptureOutcome>,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn pending(&self) -> Option<&crate::PendingRefinement> {
        self.pending.get()
    }

    pub fn last_outcome(&self) -> Option<&CaptureOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn view(&self) -> CoordinatorView {
        let pending = self.pending.get().map(|p| PendingView {
            multi_tab: p.multi_tab,
            tab_count: p.tab_count,
            copy_after_refinement: p.copy_after_refinement,
            timestamp: p.timestamp.clone(),
        });
        CoordinatorView {
            phase: self.phase,
            entry_count: self.collection.len(),
            badge_count: self.pending.get().map_or(0, |p| p.tab_count),
            pending,
            last_outcome: self.last_outcome.clone(),
        }
    }

    pub(crate) fn take_seq(&mut self) -> OpSeq {
        self.next_seq += 1;
        self.next_seq
    }
}
