use crate::collection::Entry;
use crate::effect::NotifyKind;
use crate::view_model::PendingView;

/// Requests from the popup and collection page to the coordinator. A closed
/// union so the dispatcher matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capture the selected tab(s) into the collection.
    SaveUrl,
    /// Capture the selected tab(s) and copy the result to the clipboard.
    CopyAsMarkdown,
    GetCollection,
    /// A tab context pushes converted markdown and opens the pending slot.
    StoreForRefinement {
        markdown: String,
        multi_tab: bool,
        url: String,
        title: String,
        tab_count: usize,
        copy_after_refinement: bool,
    },
    GetPendingRefinement,
    /// Resolve the pending slot with an instruction (possibly empty).
    ProcessRefinement { prompt: String, collective: bool },
    ClearPendingRefinement,
    DeleteEntry { url: String },
    EditEntry { url: String, markdown: String },
    /// Re-capture a saved entry from its url.
    RefreshEntry { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Accepted,
    Rejected { message: String },
    Collection(Vec<Entry>),
    PendingRefinement(Option<PendingView>),
}

/// Requests the coordinator sends to a tab context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabRequest {
    ConvertToMarkdown {
        is_multi_tab: bool,
        is_first_tab: bool,
    },
    /// Fire-and-forget; the tab replies with a bare ack.
    ShowNotification { message: String, kind: NotifyKind },
    ShowLoading,
    HideLoading,
}

/// Replies from a tab context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabResponse {
    Markdown { markdown: String },
    /// Markdown captured; the tab is prompting the user for an instruction.
    PendingRefinement { markdown: String },
    Cancelled,
    Ack,
}
