//! Collector core: pure capture state machine, collection model and
//! message protocol. No IO happens here; the engine crate executes the
//! effects this crate emits.
mod collection;
mod command;
mod effect;
mod msg;
mod pending;
mod state;
mod update;
mod view_model;

pub use collection::{
    core_domain, edit_entry_markdown, example_collection, group_by_saved_date, merge_entries,
    remove_entry, BatchInfo, BatchSource, Collection, Entry, UNKNOWN_DATE,
};
pub use command::{Command, CommandResponse, TabRequest, TabResponse};
pub use effect::{ConvertRequest, Effect, NotifyKind};
pub use msg::{ConvertOutcome, Msg, RefineFailure};
pub use pending::{PendingRefinement, PendingSlot, SlotOccupied};
pub use state::{
    CaptureAction, CaptureOutcome, CapturePhase, CaptureSettings, CoordinatorState, FailureReason,
    OpSeq, Tab, TabId, WindowId,
};
pub use update::update;
pub use view_model::{CoordinatorView, PendingView};
