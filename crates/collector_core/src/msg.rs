use crate::collection::Entry;
use crate::state::{CaptureAction, CaptureSettings, OpSeq, Tab, TabId, WindowId};

/// Result of asking a tab to convert its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// Plain converted markdown.
    Markdown(String),
    /// Converted markdown, and the tab is surfacing the instruction prompt;
    /// the instruction arrives later as a separate message.
    NeedsInstruction(String),
    /// The user dismissed the capture from the page.
    Cancelled,
    Failed { message: String },
}

/// Refiner failure categories as the coordinator sees them. The engine maps
/// its transport-level errors onto these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineFailure {
    Auth,
    Connection,
    RateOrServer { status: u16 },
    Malformed,
}

/// Inbound events applied to the coordinator state, one at a time.
///
/// Messages that can complete an operation carry `at`, the ISO 8601 time the
/// event was observed; it becomes `saved_at` on any entries the event
/// produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Collection restored from the store at startup.
    CollectionLoaded(Vec<Entry>),
    /// Settings snapshot loaded or changed.
    SettingsLoaded(CaptureSettings),
    /// User triggered a capture (shortcut, button or command).
    CaptureRequested { action: CaptureAction },
    /// Tab selection answered.
    TabsSelected { seq: OpSeq, tabs: Vec<Tab> },
    /// A tab answered (or failed) a convert request.
    TabConverted {
        seq: OpSeq,
        tab_id: TabId,
        outcome: ConvertOutcome,
        at: String,
    },
    /// A tab context pushed converted markdown for refinement on its own
    /// initiative (the `store-for-refinement` command).
    RefinementStored {
        tab: Tab,
        markdown: String,
        multi_tab: bool,
        tab_count: usize,
        copy_after_refinement: bool,
        at: String,
    },
    /// The user submitted a refinement instruction (possibly empty).
    InstructionSubmitted {
        prompt: String,
        collective: bool,
        at: String,
    },
    /// The user explicitly cancelled the pending refinement.
    InstructionCancelled,
    /// A tab was activated somewhere in the browser.
    TabActivated { tab_id: TabId, window_id: WindowId },
    /// A tab navigated to a new document.
    TabNavigated { tab_id: TabId },
    /// The refiner finished (successfully or not).
    RefineCompleted {
        seq: OpSeq,
        result: Result<String, RefineFailure>,
        at: String,
    },
    /// The store acknowledged (or failed) a whole-collection write. `seq` is
    /// `None` for writes triggered by direct collection edits.
    CollectionWritten {
        seq: Option<OpSeq>,
        result: Result<(), String>,
    },
    /// The clipboard write finished.
    ClipboardWritten {
        seq: OpSeq,
        result: Result<(), String>,
    },
    /// A saved url was re-fetched and re-converted.
    PageRefreshed {
        seq: OpSeq,
        url: String,
        result: Result<String, String>,
        at: String,
    },
    /// User deleted an entry from the collection view.
    EntryDeleted { url: String },
    /// User edited an entry's markdown in the collection view.
    EntryEdited { url: String, markdown: String },
    /// User asked for an entry to be re-captured from its url.
    EntryRefreshRequested { url: String },
    NoOp,
}
