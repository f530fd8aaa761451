use crate::collection::{
    edit_entry_markdown, merge_entries, remove_entry, BatchInfo, BatchSource, Entry,
};
use crate::effect::{ConvertRequest, Effect, NotifyKind};
use crate::msg::{ConvertOutcome, Msg, RefineFailure};
use crate::pending::PendingRefinement;
use crate::state::{
    ActiveCapture, ActiveRefresh, CaptureAction, CaptureOutcome, CapturePhase, CoordinatorState,
    FailureReason, InflightRefine, OpMode, OpSeq, Tab, TabCapture, TabId,
};

/// Pure update function: applies one message to the coordinator state and
/// returns the effects to execute. All capture-pipeline decisions are made
/// here; the engine only carries them out.
pub fn update(mut state: CoordinatorState, msg: Msg) -> (CoordinatorState, Vec<Effect>) {
    let effects = match msg {
        Msg::CollectionLoaded(entries) => {
            state.collection = entries;
            Vec::new()
        }
        Msg::SettingsLoaded(settings) => {
            state.settings = settings;
            Vec::new()
        }
        Msg::CaptureRequested { action } => handle_capture_requested(&mut state, action),
        Msg::TabsSelected { seq, tabs } => handle_tabs_selected(&mut state, seq, tabs),
        Msg::TabConverted {
            seq,
            tab_id,
            outcome,
            at,
        } => handle_tab_converted(&mut state, seq, tab_id, outcome, &at),
        Msg::RefinementStored {
            tab,
            markdown,
            multi_tab,
            tab_count,
            copy_after_refinement,
            at,
        } => handle_refinement_stored(
            &mut state,
            tab,
            markdown,
            multi_tab,
            tab_count,
            copy_after_refinement,
            at,
        ),
        Msg::InstructionSubmitted {
            prompt,
            collective,
            at,
        } => handle_instruction_submitted(&mut state, prompt, collective, &at),
        Msg::InstructionCancelled => handle_instruction_cancelled(&mut state),
        Msg::TabActivated { tab_id, window_id } => {
            if state.pending.invalidate_on_tab_switch(tab_id, window_id) {
                auto_cancel(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::TabNavigated { tab_id } => {
            if state.pending.invalidate_on_navigation(tab_id) {
                auto_cancel(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::RefineCompleted { seq, result, at } => {
            handle_refine_completed(&mut state, seq, result, &at)
        }
        Msg::CollectionWritten { seq, result } => {
            handle_collection_written(&mut state, seq, result)
        }
        Msg::ClipboardWritten { seq, result } => {
            handle_clipboard_written(&mut state, seq, result)
        }
        Msg::PageRefreshed {
            seq,
            url,
            result,
            at,
        } => handle_page_refreshed(&mut state, seq, url, result, &at),
        Msg::EntryDeleted { url } => {
            if remove_entry(&mut state.collection, &url) {
                vec![write_collection(&state, None)]
            } else {
                Vec::new()
            }
        }
        Msg::EntryEdited { url, markdown } => {
            if edit_entry_markdown(&mut state.collection, &url, markdown) {
                vec![write_collection(&state, None)]
            } else {
                Vec::new()
            }
        }
        Msg::EntryRefreshRequested { url } => handle_refresh_requested(&mut state, url),
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn handle_capture_requested(state: &mut CoordinatorState, action: CaptureAction) -> Vec<Effect> {
    // A new capture never displaces a waiting refinement or a running
    // operation; it is rejected and the earlier work is preserved.
    if state.pending.is_pending() {
        return vec![notify(
            "A refinement prompt is already waiting; submit or cancel it first.",
            NotifyKind::Error,
        )];
    }
    if state.phase != CapturePhase::Idle {
        return vec![notify("A capture is already in progress.", NotifyKind::Error)];
    }
    let seq = state.take_seq();
    state.phase = CapturePhase::Selecting;
    state.op = Some(ActiveCapture::new(seq, action));
    vec![Effect::QueryTabs { seq }]
}

fn handle_tabs_selected(state: &mut CoordinatorState, seq: OpSeq, tabs: Vec<Tab>) -> Vec<Effect> {
    if state.phase != CapturePhase::Selecting || !op_matches(state, seq) {
        return Vec::new();
    }
    if tabs.is_empty() {
        return fail_op(state, FailureReason::NoTabsSelected, "No tabs selected.");
    }
    let refine = state.settings.refine_enabled && state.settings.has_credential;
    let is_multi = tabs.len() > 1;
    let first = tabs[0].clone();
    if let Some(op) = state.op.as_mut() {
        op.tabs = tabs;
        op.mode = if refine {
            OpMode::FirstForRefinement
        } else {
            OpMode::Direct
        };
    }
    if !refine {
        // Fast path: no instruction round-trip, straight to conversion.
        state.phase = CapturePhase::Processing;
    }
    vec![Effect::ConvertTab {
        seq,
        tab: first,
        request: ConvertRequest {
            is_multi_tab: is_multi,
            is_first_tab: true,
        },
    }]
}

fn handle_tab_converted(
    state: &mut CoordinatorState,
    seq: OpSeq,
    tab_id: TabId,
    outcome: ConvertOutcome,
    at: &str,
) -> Vec<Effect> {
    if !op_matches(state, seq)
        || !matches!(
            state.phase,
            CapturePhase::Selecting | CapturePhase::Processing
        )
    {
        return Vec::new();
    }
    let mode = {
        let Some(op) = state.op.as_ref() else {
            return Vec::new();
        };
        match op.next_tab() {
            Some(expected) if expected.id == tab_id => op.mode.clone(),
            _ => return Vec::new(),
        }
    };
    match mode {
        OpMode::FirstForRefinement => handle_first_converted(state, outcome, at),
        OpMode::Direct | OpMode::SaveUnrefined => handle_direct_converted(state, seq, outcome, at),
        OpMode::RefineEach { prompt } => {
            handle_refine_each_converted(state, seq, outcome, prompt, at)
        }
        OpMode::RefineBatch { .. } => handle_refine_batch_converted(state, seq, outcome, at),
    }
}

/// First tab converted on the refinement path: open the pending slot and
/// wait for the user's instruction.
fn handle_first_converted(
    state: &mut CoordinatorState,
    outcome: ConvertOutcome,
    at: &str,
) -> Vec<Effect> {
    let markdown = match outcome {
        ConvertOutcome::Markdown(md) | ConvertOutcome::NeedsInstruction(md) => md,
        ConvertOutcome::Cancelled => return cancel_op(state),
        ConvertOutcome::Failed { .. } => {
            return fail_op(
                state,
                FailureReason::Conversion,
                "Failed to convert the page.",
            );
        }
    };
    let pending = {
        let Some(op) = state.op.as_mut() else {
            return Vec::new();
        };
        let first = op.tabs[0].clone();
        let tab_count = op.tabs.len();
        op.cursor = 1;
        PendingRefinement {
            markdown,
            url: first.url,
            title: first.title,
            multi_tab: tab_count > 1,
            tab_count,
            copy_after_refinement: op.action == CaptureAction::Copy,
            origin_tab_ids: op.tabs.iter().map(|t| t.id).collect(),
            window_id: first.window_id,
            timestamp: at.to_string(),
        }
    };
    let count = pending.tab_count;
    if state.pending.begin(pending).is_err() {
        return fail_op(
            state,
            FailureReason::Conversion,
            "A refinement prompt is already waiting; submit or cancel it first.",
        );
    }
    state.phase = CapturePhase::AwaitingInstruction;
    vec![Effect::SetBadge { count }]
}

fn handle_direct_converted(
    state: &mut CoordinatorState,
    seq: OpSeq,
    outcome: ConvertOutcome,
    at: &str,
) -> Vec<Effect> {
    match outcome {
        ConvertOutcome::Markdown(md) | ConvertOutcome::NeedsInstruction(md) => {
            if let Some(op) = state.op.as_mut() {
                let tab = op.tabs[op.cursor].clone();
                op.captured.push(TabCapture { tab, markdown: md });
            }
        }
        ConvertOutcome::Cancelled => return cancel_op(state),
        ConvertOutcome::Failed { .. } => {
            // Per-tab failure: skip this tab, keep processing its siblings.
            if let Some(op) = state.op.as_mut() {
                op.failed += 1;
            }
        }
    }
    advance_conversion(state, seq, at)
}

fn handle_refine_each_converted(
    state: &mut CoordinatorState,
    seq: OpSeq,
    outcome: ConvertOutcome,
    prompt: String,
    at: &str,
) -> Vec<Effect> {
    match outcome {
        ConvertOutcome::Markdown(md) | ConvertOutcome::NeedsInstruction(md) => {
            let Some(op) = state.op.as_mut() else {
                return Vec::new();
            };
            let tab = op.tabs[op.cursor].clone();
            // This tab is converted; the refine result will continue with
            // the tab after it.
            op.cursor += 1;
            op.inflight_refine = Some(InflightRefine {
                tab: tab.clone(),
                markdown: md.clone(),
            });
            vec![Effect::Refine {
                seq,
                tab_id: tab.id,
                markdown: md,
                prompt,
            }]
        }
        ConvertOutcome::Cancelled => cancel_op(state),
        ConvertOutcome::Failed { .. } => {
            if let Some(op) = state.op.as_mut() {
                op.failed += 1;
            }
            advance_conversion(state, seq, at)
        }
    }
}

fn handle_refine_batch_converted(
    state: &mut CoordinatorState,
    seq: OpSeq,
    outcome: ConvertOutcome,
    at: &str,
) -> Vec<Effect> {
    match outcome {
        ConvertOutcome::Markdown(md) | ConvertOutcome::NeedsInstruction(md) => {
            if let Some(op) = state.op.as_mut() {
                let tab = op.tabs[op.cursor].clone();
                op.captured.push(TabCapture { tab, markdown: md });
            }
        }
        ConvertOutcome::Cancelled => return cancel_op(state),
        ConvertOutcome::Failed { .. } => {
            if let Some(op) = state.op.as_mut() {
                op.failed += 1;
            }
        }
    }
    advance_conversion(state, seq, at)
}

/// Step past the tab that was just handled and continue with the next one.
fn advance_conversion(state: &mut CoordinatorState, seq: OpSeq, at: &str) -> Vec<Effect> {
    if let Some(op) = state.op.as_mut() {
        op.cursor += 1;
    }
    convert_current(state, seq, at)
}

/// Convert the tab the cursor points at, or close out the conversion stage
/// when every tab has been visited. `cursor` always indexes the next tab
/// still to convert, which keeps processing in strict selection order.
fn convert_current(state: &mut CoordinatorState, seq: OpSeq, at: &str) -> Vec<Effect> {
    let next = {
        let Some(op) = state.op.as_ref() else {
            return Vec::new();
        };
        let is_multi = op.tabs.len() > 1;
        op.next_tab().cloned().map(|tab| (tab, is_multi))
    };
    match next {
        Some((tab, is_multi)) => vec![Effect::ConvertTab {
            seq,
            tab,
            request: ConvertRequest {
                is_multi_tab: is_multi,
                is_first_tab: false,
            },
        }],
        None => finish_conversion_stage(state, seq, at),
    }
}

fn finish_conversion_stage(state: &mut CoordinatorState, seq: OpSeq, at: &str) -> Vec<Effect> {
    let mode = match state.op.as_ref() {
        Some(op) => op.mode.clone(),
        None => return Vec::new(),
    };
    match mode {
        OpMode::RefineBatch { prompt } => start_batch_refine(state, seq, prompt),
        _ => finish_individual(state, seq, at),
    }
}

/// Build one entry per captured tab, merge them into the collection and hand
/// the whole collection to the store.
fn finish_individual(state: &mut CoordinatorState, seq: OpSeq, at: &str) -> Vec<Effect> {
    let entries = {
        let Some(op) = state.op.as_mut() else {
            return Vec::new();
        };
        if op.captured.is_empty() {
            let failed = op.failed;
            let (reason, message) = match op.last_refine_failure.clone() {
                Some(failure) => {
                    let message = refine_failure_message(&failure);
                    (FailureReason::Refine(failure), message)
                }
                None => (
                    FailureReason::AllConversionsFailed,
                    format!("Failed to process {failed} tab(s)."),
                ),
            };
            return fail_op(state, reason, &message);
        }
        let entries: Vec<Entry> = op
            .captured
            .iter()
            .map(|c| Entry {
                url: c.tab.url.clone(),
                title: c.tab.title.clone(),
                markdown: c.markdown.clone(),
                saved_at: at.to_string(),
                batch: None,
            })
            .collect();
        if op.action == CaptureAction::Copy {
            op.clipboard_text = Some(wrap_for_clipboard(&op.captured));
        }
        op.success_message = Some(success_message(op, &state.collection));
        entries
    };
    merge_entries(&mut state.collection, entries);
    state.phase = CapturePhase::Persisting;
    vec![write_collection(state, Some(seq))]
}

fn start_batch_refine(state: &mut CoordinatorState, seq: OpSeq, prompt: String) -> Vec<Effect> {
    let Some(op) = state.op.as_mut() else {
        return Vec::new();
    };
    if op.captured.is_empty() {
        let failed = op.failed;
        return fail_op(
            state,
            FailureReason::AllConversionsFailed,
            &format!("Failed to process {failed} tab(s)."),
        );
    }
    let combined = combine_captures(&op.captured);
    let first = op.captured[0].tab.clone();
    op.inflight_refine = Some(InflightRefine {
        tab: first.clone(),
        markdown: combined.clone(),
    });
    vec![Effect::Refine {
        seq,
        tab_id: first.id,
        markdown: combined,
        prompt,
    }]
}

fn handle_refinement_stored(
    state: &mut CoordinatorState,
    tab: Tab,
    markdown: String,
    multi_tab: bool,
    tab_count: usize,
    copy_after_refinement: bool,
    at: String,
) -> Vec<Effect> {
    if state.phase != CapturePhase::Idle {
        return vec![notify("A capture is already in progress.", NotifyKind::Error)];
    }
    let pending = PendingRefinement {
        markdown,
        url: tab.url.clone(),
        title: tab.title.clone(),
        multi_tab,
        tab_count: tab_count.max(1),
        copy_after_refinement,
        origin_tab_ids: vec![tab.id],
        window_id: tab.window_id,
        timestamp: at,
    };
    let count = pending.tab_count;
    if state.pending.begin(pending).is_err() {
        return vec![notify(
            "A refinement prompt is already waiting; submit or cancel it first.",
            NotifyKind::Error,
        )];
    }
    state.phase = CapturePhase::AwaitingInstruction;
    vec![Effect::SetBadge { count }]
}

fn handle_instruction_submitted(
    state: &mut CoordinatorState,
    prompt: String,
    collective: bool,
    at: &str,
) -> Vec<Effect> {
    let Some(pending) = state.pending.resolve() else {
        return vec![notify("No refinement is pending.", NotifyKind::Error)];
    };
    let mut effects = vec![Effect::SetBadge { count: 0 }];

    // The pushed path (`store-for-refinement`) has no active operation yet;
    // rebuild one around the tab recorded in the pending state.
    if state.op.is_none() {
        let seq = state.take_seq();
        let action = if pending.copy_after_refinement {
            CaptureAction::Copy
        } else {
            CaptureAction::Save
        };
        let mut op = ActiveCapture::new(seq, action);
        op.tabs = vec![Tab {
            id: pending.origin_tab_ids.first().copied().unwrap_or_default(),
            window_id: pending.window_id,
            url: pending.url.clone(),
            title: pending.title.clone(),
        }];
        op.cursor = 1;
        state.op = Some(op);
    }

    state.phase = CapturePhase::Processing;
    let trimmed = prompt.trim().to_string();
    let Some(op) = state.op.as_mut() else {
        return effects;
    };
    let seq = op.seq;
    let first_tab = op.tabs[0].clone();
    let is_multi = op.tabs.len() > 1;

    if trimmed.is_empty() {
        // Explicit save without refinement; an empty instruction in
        // collective mode degrades to this path as well.
        op.mode = OpMode::SaveUnrefined;
        op.captured.push(TabCapture {
            tab: first_tab,
            markdown: pending.markdown,
        });
        effects.extend(convert_current(state, seq, at));
        return effects;
    }

    if collective && is_multi {
        op.mode = OpMode::RefineBatch { prompt: trimmed };
        op.captured.push(TabCapture {
            tab: first_tab,
            markdown: pending.markdown,
        });
        effects.extend(convert_current(state, seq, at));
        return effects;
    }

    // Individual refinement, the first tab's markdown is already captured.
    op.mode = OpMode::RefineEach {
        prompt: trimmed.clone(),
    };
    op.inflight_refine = Some(InflightRefine {
        tab: first_tab.clone(),
        markdown: pending.markdown.clone(),
    });
    effects.push(Effect::Refine {
        seq,
        tab_id: first_tab.id,
        markdown: pending.markdown,
        prompt: trimmed,
    });
    effects
}

fn handle_instruction_cancelled(state: &mut CoordinatorState) -> Vec<Effect> {
    if !state.pending.cancel() {
        return Vec::new();
    }
    state.op = None;
    state.phase = CapturePhase::Idle;
    state.last_outcome = Some(CaptureOutcome::Cancelled);
    vec![Effect::SetBadge { count: 0 }]
}

fn handle_refine_completed(
    state: &mut CoordinatorState,
    seq: OpSeq,
    result: Result<String, RefineFailure>,
    at: &str,
) -> Vec<Effect> {
    if !op_matches(state, seq) || state.phase != CapturePhase::Processing {
        // The operation was cancelled or superseded; the result is dropped.
        return Vec::new();
    }
    let mode = match state.op.as_ref() {
        Some(op) => op.mode.clone(),
        None => return Vec::new(),
    };
    match mode {
        OpMode::RefineEach { .. } => {
            let mut warning = None;
            {
                let Some(op) = state.op.as_mut() else {
                    return Vec::new();
                };
                let Some(inflight) = op.inflight_refine.take() else {
                    return Vec::new();
                };
                match result {
                    Ok(refined) => op.captured.push(TabCapture {
                        tab: inflight.tab,
                        markdown: refined,
                    }),
                    Err(RefineFailure::Malformed) => {
                        // Never drop content: keep the unrefined markdown.
                        op.captured.push(TabCapture {
                            tab: inflight.tab,
                            markdown: inflight.markdown,
                        });
                        warning =
                            Some("The LLM response was malformed; keeping the unrefined content.");
                    }
                    Err(failure) => {
                        op.failed += 1;
                        op.last_refine_failure = Some(failure);
                    }
                }
            }
            let mut effects = convert_current(state, seq, at);
            if let Some(message) = warning {
                effects.insert(0, notify(message, NotifyKind::Warning));
            }
            effects
        }
        OpMode::RefineBatch { prompt } => finish_batch(state, seq, prompt, result, at),
        _ => Vec::new(),
    }
}

/// Build the single batch entry out of the combined refinement result.
fn finish_batch(
    state: &mut CoordinatorState,
    seq: OpSeq,
    prompt: String,
    result: Result<String, RefineFailure>,
    at: &str,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    let entry = {
        let Some(op) = state.op.as_mut() else {
            return Vec::new();
        };
        let Some(inflight) = op.inflight_refine.take() else {
            return Vec::new();
        };
        let markdown = match result {
            Ok(refined) => refined,
            Err(RefineFailure::Malformed) => {
                effects.push(notify(
                    "The LLM response was malformed; keeping the unrefined content.",
                    NotifyKind::Warning,
                ));
                inflight.markdown
            }
            Err(failure) => {
                let message = refine_failure_message(&failure);
                return fail_op(state, FailureReason::Refine(failure), &message);
            }
        };
        let first = op.captured[0].tab.clone();
        let sources = op
            .captured
            .iter()
            .map(|c| BatchSource {
                url: c.tab.url.clone(),
                title: c.tab.title.clone(),
            })
            .collect();
        let entry = Entry {
            url: first.url,
            title: first.title,
            markdown,
            saved_at: at.to_string(),
            batch: Some(BatchInfo { prompt, sources }),
        };
        if op.action == CaptureAction::Copy {
            op.clipboard_text = Some(format!(
                "<url>{}</url>\n<title>{}</title>\n{}",
                entry.url, entry.title, entry.markdown
            ));
        }
        op.success_message = Some(success_message(op, &state.collection));
        entry
    };
    merge_entries(&mut state.collection, vec![entry]);
    state.phase = CapturePhase::Persisting;
    effects.push(write_collection(state, Some(seq)));
    effects
}

fn handle_collection_written(
    state: &mut CoordinatorState,
    seq: Option<OpSeq>,
    result: Result<(), String>,
) -> Vec<Effect> {
    let Some(seq) = seq else {
        // Write triggered by a direct collection edit.
        return match result {
            Ok(()) => Vec::new(),
            Err(err) => vec![storage_failure_notice(&err)],
        };
    };
    if !op_matches(state, seq) || state.phase != CapturePhase::Persisting {
        return Vec::new();
    }
    if let Err(err) = result {
        state.op = None;
        state.phase = CapturePhase::Idle;
        state.last_outcome = Some(CaptureOutcome::Failed(FailureReason::Storage));
        return vec![storage_failure_notice(&err)];
    }
    let (action, saved, failed, clipboard_text, message) = {
        let Some(op) = state.op.as_ref() else {
            return Vec::new();
        };
        (
            op.action,
            op.captured.len(),
            op.failed,
            op.clipboard_text.clone(),
            op.success_message.clone(),
        )
    };
    match action {
        CaptureAction::Copy => {
            vec![Effect::CopyToClipboard {
                seq,
                text: clipboard_text.unwrap_or_default(),
            }]
        }
        CaptureAction::Save => {
            state.op = None;
            state.phase = CapturePhase::Idle;
            state.last_outcome = Some(CaptureOutcome::Saved { saved, failed });
            let kind = if failed > 0 {
                NotifyKind::Warning
            } else {
                NotifyKind::Info
            };
            vec![notify(
                &message.unwrap_or_else(|| "Saved.".to_string()),
                kind,
            )]
        }
    }
}

fn handle_clipboard_written(
    state: &mut CoordinatorState,
    seq: OpSeq,
    result: Result<(), String>,
) -> Vec<Effect> {
    if !op_matches(state, seq) || state.phase != CapturePhase::Persisting {
        return Vec::new();
    }
    let (saved, failed) = state
        .op
        .as_ref()
        .map(|op| (op.captured.len(), op.failed))
        .unwrap_or((0, 0));
    state.op = None;
    state.phase = CapturePhase::Idle;
    state.last_outcome = Some(CaptureOutcome::Copied { saved, failed });
    match result {
        Ok(()) => vec![notify(
            "Markdown copied to clipboard and saved.",
            NotifyKind::Info,
        )],
        // The entry is already persisted; the copy is only a convenience.
        Err(_) => vec![notify(
            "Failed to copy to clipboard, but the content was saved.",
            NotifyKind::Warning,
        )],
    }
}

fn handle_refresh_requested(state: &mut CoordinatorState, url: String) -> Vec<Effect> {
    if !state.collection.iter().any(|e| e.url == url) {
        return vec![notify("URL not found in the collection.", NotifyKind::Error)];
    }
    let seq = state.take_seq();
    state.refresh = Some(ActiveRefresh {
        seq,
        url: url.clone(),
    });
    vec![Effect::FetchPage { seq, url }]
}

fn handle_page_refreshed(
    state: &mut CoordinatorState,
    seq: OpSeq,
    url: String,
    result: Result<String, String>,
    at: &str,
) -> Vec<Effect> {
    let current = state
        .refresh
        .as_ref()
        .is_some_and(|r| r.seq == seq && r.url == url);
    if !current {
        return Vec::new();
    }
    state.refresh = None;
    let markdown = match result {
        Ok(md) => md,
        Err(err) => {
            return vec![notify(
                &format!("Failed to refresh entry: {err}"),
                NotifyKind::Error,
            )]
        }
    };
    let Some(entry) = state.collection.iter_mut().find(|e| e.url == url) else {
        return vec![notify("URL not found in the collection.", NotifyKind::Error)];
    };
    if entry.markdown == markdown {
        return vec![notify(
            "No changes detected in the entry content.",
            NotifyKind::Info,
        )];
    }
    entry.markdown = markdown;
    entry.saved_at = at.to_string();
    vec![
        notify("Entry updated.", NotifyKind::Info),
        write_collection(state, None),
    ]
}

fn op_matches(state: &CoordinatorState, seq: OpSeq) -> bool {
    state.op.as_ref().is_some_and(|op| op.seq == seq)
}

fn fail_op(state: &mut CoordinatorState, reason: FailureReason, message: &str) -> Vec<Effect> {
    state.op = None;
    state.phase = CapturePhase::Idle;
    state.last_outcome = Some(CaptureOutcome::Failed(reason));
    vec![notify(message, NotifyKind::Error)]
}

fn cancel_op(state: &mut CoordinatorState) -> Vec<Effect> {
    state.op = None;
    state.phase = CapturePhase::Idle;
    state.last_outcome = Some(CaptureOutcome::Cancelled);
    if state.pending.cancel() {
        vec![Effect::SetBadge { count: 0 }]
    } else {
        Vec::new()
    }
}

/// The pending slot was already cleared by its own invalidation check.
fn auto_cancel(state: &mut CoordinatorState) -> Vec<Effect> {
    state.op = None;
    state.phase = CapturePhase::Idle;
    state.last_outcome = Some(CaptureOutcome::Cancelled);
    vec![Effect::SetBadge { count: 0 }]
}

fn notify(message: &str, kind: NotifyKind) -> Effect {
    Effect::Notify {
        message: message.to_string(),
        kind,
    }
}

fn storage_failure_notice(err: &str) -> Effect {
    notify(
        &format!("Failed to save: content may not have been saved ({err})."),
        NotifyKind::Error,
    )
}

fn write_collection(state: &CoordinatorState, seq: Option<OpSeq>) -> Effect {
    Effect::WriteCollection {
        seq,
        entries: state.collection.clone(),
    }
}

fn refine_failure_message(failure: &RefineFailure) -> String {
    match failure {
        RefineFailure::Auth => "Authentication error! Please check your API key.".to_string(),
        RefineFailure::Connection => {
            "Connection error! Please check the base URL in settings.".to_string()
        }
        RefineFailure::RateOrServer { status } => {
            format!("LLM service error (status {status}).")
        }
        RefineFailure::Malformed => "The LLM returned an unexpected response format.".to_string(),
    }
}

fn success_message(op: &ActiveCapture, collection: &[Entry]) -> String {
    if matches!(op.mode, OpMode::RefineBatch { .. }) || op.captured.len() > 1 || op.failed > 0 {
        let mut message = format!("Successfully processed {} tab(s)", op.captured.len());
        if op.failed > 0 {
            message.push_str(&format!(", {} failed", op.failed));
        }
        message.push('.');
        return message;
    }
    let url = &op.captured[0].tab.url;
    if collection.iter().any(|e| e.url == *url) {
        "URL updated successfully.".to_string()
    } else {
        "URL saved successfully.".to_string()
    }
}

fn combine_captures(captures: &[TabCapture]) -> String {
    let mut combined = String::new();
    for capture in captures {
        combined.push_str(&format!(
            "\n\n## {}\n<url>{}</url>\n\n{}\n\n",
            capture.tab.title, capture.tab.url, capture.markdown
        ));
    }
    combined.trim().to_string()
}

fn wrap_for_clipboard(captures: &[TabCapture]) -> String {
    captures
        .iter()
        .map(|c| {
            format!(
                "<url>{}</url>\n<title>{}</title>\n{}",
                c.tab.url, c.tab.title, c.markdown
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n\n")
}
