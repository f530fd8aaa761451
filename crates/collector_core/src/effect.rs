use crate::collection::Entry;
use crate::state::{OpSeq, Tab, TabId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Warning,
    Error,
}

/// Parameters for a `convert-to-markdown` request to a tab. Mirrors the wire
/// protocol; extraction settings are the tab side's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertRequest {
    pub is_multi_tab: bool,
    pub is_first_tab: bool,
}

/// Work the engine performs on behalf of the coordinator. Async effects echo
/// `seq` in their result message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the tab selector which tabs the capture targets.
    QueryTabs { seq: OpSeq },
    /// Ask one tab to convert its page.
    ConvertTab {
        seq: OpSeq,
        tab: Tab,
        request: ConvertRequest,
    },
    /// Call the refiner with a payload and instruction.
    Refine {
        seq: OpSeq,
        tab_id: TabId,
        markdown: String,
        prompt: String,
    },
    /// Re-fetch a saved url and convert it.
    FetchPage { seq: OpSeq, url: String },
    /// Persist the whole collection as one value.
    WriteCollection {
        seq: Option<OpSeq>,
        entries: Vec<Entry>,
    },
    /// Write the final markdown to the system clipboard.
    CopyToClipboard { seq: OpSeq, text: String },
    /// Transient toast for the user.
    Notify { message: String, kind: NotifyKind },
    /// Badge counter reflecting pending refinement work; 0 clears it.
    SetBadge { count: usize },
}
