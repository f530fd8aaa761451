use std::sync::Once;

use collector_core::{
    update, CaptureAction, CaptureOutcome, CapturePhase, CaptureSettings, ConvertOutcome,
    CoordinatorState, Effect, FailureReason, Msg, NotifyKind, OpSeq, RefineFailure, Tab,
};

const AT: &str = "2026-08-04T11:00:00Z";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(collector_logging::initialize_for_tests);
}

fn refine_settings() -> CaptureSettings {
    CaptureSettings {
        refine_enabled: true,
        has_credential: true,
        ..CaptureSettings::default()
    }
}

fn tab(id: u64, url: &str) -> Tab {
    Tab {
        id,
        window_id: 1,
        url: url.to_string(),
        title: format!("Title {id}"),
    }
}

fn loaded_state(settings: CaptureSettings) -> CoordinatorState {
    let (state, _) = update(CoordinatorState::new(), Msg::SettingsLoaded(settings));
    let (state, _) = update(state, Msg::CollectionLoaded(Vec::new()));
    state
}

fn converted(seq: OpSeq, tab_id: u64, markdown: &str) -> Msg {
    Msg::TabConverted {
        seq,
        tab_id,
        outcome: ConvertOutcome::Markdown(markdown.to_string()),
        at: AT.to_string(),
    }
}

fn instruction(prompt: &str, collective: bool) -> Msg {
    Msg::InstructionSubmitted {
        prompt: prompt.to_string(),
        collective,
        at: AT.to_string(),
    }
}

/// Drive a capture up to the point where the pending slot is occupied.
fn awaiting_instruction(tabs: Vec<Tab>) -> (CoordinatorState, OpSeq) {
    let state = loaded_state(refine_settings());
    let (state, effects) = update(
        state,
        Msg::CaptureRequested {
            action: CaptureAction::Save,
        },
    );
    let seq = match effects.as_slice() {
        [Effect::QueryTabs { seq }] => *seq,
        other => panic!("expected QueryTabs, got {other:?}"),
    };
    let first = tabs[0].clone();
    let count = tabs.len();
    let (state, _) = update(state, Msg::TabsSelected { seq, tabs });
    let (state, effects) = update(state, converted(seq, first.id, "first markdown"));

    assert_eq!(state.phase(), CapturePhase::AwaitingInstruction);
    assert_eq!(effects, vec![Effect::SetBadge { count }]);
    assert!(state.pending().is_some());
    (state, seq)
}

#[test]
fn refinement_path_waits_for_an_instruction() {
    init_logging();
    let (state, seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    let (state, effects) = update(state, instruction("tighten it up", false));
    assert_eq!(state.phase(), CapturePhase::Processing);
    assert!(state.pending().is_none());
    assert_eq!(
        effects,
        vec![
            Effect::SetBadge { count: 0 },
            Effect::Refine {
                seq,
                tab_id: 5,
                markdown: "first markdown".to_string(),
                prompt: "tighten it up".to_string(),
            },
        ]
    );

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Ok("refined markdown".to_string()),
            at: AT.to_string(),
        },
    );
    let entries = match effects.as_slice() {
        [Effect::WriteCollection { entries, .. }] => entries.clone(),
        other => panic!("expected WriteCollection, got {other:?}"),
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].markdown, "refined markdown");
    assert!(entries[0].batch.is_none());

    let (state, _) = update(
        state,
        Msg::CollectionWritten {
            seq: Some(seq),
            result: Ok(()),
        },
    );
    assert_eq!(
        state.last_outcome(),
        Some(&CaptureOutcome::Saved { saved: 1, failed: 0 })
    );
}

#[test]
fn only_one_pending_refinement_can_exist() {
    init_logging();
    let (state, _seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    // A second capture must not displace the waiting refinement.
    let (state, effects) = update(
        state,
        Msg::CaptureRequested {
            action: CaptureAction::Save,
        },
    );
    assert!(state.pending().is_some());
    assert_eq!(state.phase(), CapturePhase::AwaitingInstruction);
    assert_eq!(
        effects,
        vec![Effect::Notify {
            message: "A refinement prompt is already waiting; submit or cancel it first."
                .to_string(),
            kind: NotifyKind::Error,
        }]
    );
}

#[test]
fn empty_instruction_saves_without_refining() {
    init_logging();
    let (state, seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    let (state, effects) = update(state, instruction("   ", false));
    assert!(state.pending().is_none());
    let entries = match effects.as_slice() {
        [Effect::SetBadge { count: 0 }, Effect::WriteCollection { seq: Some(s), entries }]
            if *s == seq =>
        {
            entries.clone()
        }
        other => panic!("expected SetBadge + WriteCollection, got {other:?}"),
    };
    assert_eq!(entries[0].markdown, "first markdown");
}

#[test]
fn empty_instruction_in_collective_mode_degrades_to_individual_saves() {
    init_logging();
    let tabs = vec![tab(5, "https://a.example.com/"), tab(6, "https://b.example.com/")];
    let (state, seq) = awaiting_instruction(tabs);

    let (state, effects) = update(state, instruction("", true));
    // The remaining tab is converted for a plain save, no Refine call.
    assert!(matches!(
        effects.as_slice(),
        [Effect::SetBadge { count: 0 }, Effect::ConvertTab { tab, .. }] if tab.id == 6
    ));

    let (state, effects) = update(state, converted(seq, 6, "second markdown"));
    let entries = match effects.as_slice() {
        [Effect::WriteCollection { entries, .. }] => entries.clone(),
        other => panic!("expected WriteCollection, got {other:?}"),
    };
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.batch.is_none()));
    let _ = state;
}

#[test]
fn collective_instruction_produces_a_single_batch_entry() {
    init_logging();
    let tabs = vec![tab(5, "https://a.example.com/"), tab(6, "https://b.example.com/")];
    let (state, seq) = awaiting_instruction(tabs);

    let (state, effects) = update(state, instruction("summarize together", true));
    assert!(matches!(
        effects.as_slice(),
        [Effect::SetBadge { count: 0 }, Effect::ConvertTab { tab, .. }] if tab.id == 6
    ));

    let (state, effects) = update(state, converted(seq, 6, "second markdown"));
    let combined = match effects.as_slice() {
        [Effect::Refine { seq: s, markdown, prompt, .. }] if *s == seq => {
            assert_eq!(prompt, "summarize together");
            markdown.clone()
        }
        other => panic!("expected a single Refine call, got {other:?}"),
    };
    assert!(combined.contains("## Title 5"));
    assert!(combined.contains("<url>https://a.example.com/</url>"));
    assert!(combined.contains("## Title 6"));
    assert!(combined.contains("first markdown"));
    assert!(combined.contains("second markdown"));

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Ok("combined refined".to_string()),
            at: AT.to_string(),
        },
    );
    let entries = match effects.as_slice() {
        [Effect::WriteCollection { entries, .. }] => entries.clone(),
        other => panic!("expected WriteCollection, got {other:?}"),
    };
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.url, "https://a.example.com/");
    assert_eq!(entry.markdown, "combined refined");
    let batch = entry.batch.as_ref().expect("batch metadata");
    assert_eq!(batch.prompt, "summarize together");
    assert_eq!(batch.sources.len(), 2);
    let _ = state;
}

#[test]
fn individual_refinement_skips_a_failing_tab_and_keeps_order() {
    init_logging();
    let tabs = vec![
        tab(5, "https://a.example.com/"),
        tab(6, "https://b.example.com/"),
        tab(7, "https://c.example.com/"),
    ];
    let (state, seq) = awaiting_instruction(tabs);

    let (state, effects) = update(state, instruction("clean up", false));
    assert!(matches!(
        effects.as_slice(),
        [Effect::SetBadge { count: 0 }, Effect::Refine { tab_id: 5, .. }]
    ));

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Ok("refined a".to_string()),
            at: AT.to_string(),
        },
    );
    assert!(matches!(
        effects.as_slice(),
        [Effect::ConvertTab { tab, .. }] if tab.id == 6
    ));

    // Tab 6 fails to convert; tab 7 must still be processed.
    let (state, effects) = update(
        state,
        Msg::TabConverted {
            seq,
            tab_id: 6,
            outcome: ConvertOutcome::Failed {
                message: "unreachable".to_string(),
            },
            at: AT.to_string(),
        },
    );
    assert!(matches!(
        effects.as_slice(),
        [Effect::ConvertTab { tab, .. }] if tab.id == 7
    ));

    let (state, effects) = update(state, converted(seq, 7, "md c"));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Refine { tab_id: 7, .. }]
    ));

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Ok("refined c".to_string()),
            at: AT.to_string(),
        },
    );
    let entries = match effects.as_slice() {
        [Effect::WriteCollection { entries, .. }] => entries.clone(),
        other => panic!("expected WriteCollection, got {other:?}"),
    };
    let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example.com/", "https://c.example.com/"]);

    let (state, effects) = update(
        state,
        Msg::CollectionWritten {
            seq: Some(seq),
            result: Ok(()),
        },
    );
    assert_eq!(
        state.last_outcome(),
        Some(&CaptureOutcome::Saved { saved: 2, failed: 1 })
    );
    assert_eq!(
        effects,
        vec![Effect::Notify {
            message: "Successfully processed 2 tab(s), 1 failed.".to_string(),
            kind: NotifyKind::Warning,
        }]
    );
}

#[test]
fn switching_to_a_foreign_tab_cancels_the_pending_refinement() {
    init_logging();
    let (state, _seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    let (state, effects) = update(
        state,
        Msg::TabActivated {
            tab_id: 7,
            window_id: 1,
        },
    );
    assert!(state.pending().is_none());
    assert_eq!(state.phase(), CapturePhase::Idle);
    assert_eq!(state.last_outcome(), Some(&CaptureOutcome::Cancelled));
    assert_eq!(effects, vec![Effect::SetBadge { count: 0 }]);
}

#[test]
fn activating_an_origin_tab_keeps_the_pending_refinement() {
    init_logging();
    let (state, _seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    let (state, effects) = update(
        state,
        Msg::TabActivated {
            tab_id: 5,
            window_id: 1,
        },
    );
    assert!(state.pending().is_some());
    assert!(effects.is_empty());
}

#[test]
fn refine_result_for_a_cancelled_operation_is_discarded() {
    init_logging();
    let (state, seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    // Cancel, then let a late refiner result for the dead operation arrive.
    // The call is never aborted; its result just lands on the floor.
    let (state, _) = update(state, Msg::InstructionCancelled);
    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Ok("refined late".to_string()),
            at: AT.to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(state.collection().is_empty());
    assert_eq!(state.last_outcome(), Some(&CaptureOutcome::Cancelled));
}

#[test]
fn auth_failure_reports_and_persists_nothing() {
    init_logging();
    let (state, seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);
    let (state, _) = update(state, instruction("clean up", false));

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Err(RefineFailure::Auth),
            at: AT.to_string(),
        },
    );
    assert!(state.collection().is_empty());
    assert_eq!(
        state.last_outcome(),
        Some(&CaptureOutcome::Failed(FailureReason::Refine(
            RefineFailure::Auth
        )))
    );
    assert_eq!(
        effects,
        vec![Effect::Notify {
            message: "Authentication error! Please check your API key.".to_string(),
            kind: NotifyKind::Error,
        }]
    );
}

#[test]
fn malformed_response_falls_back_to_unrefined_content() {
    init_logging();
    let (state, seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);
    let (state, _) = update(state, instruction("clean up", false));

    let (state, effects) = update(
        state,
        Msg::RefineCompleted {
            seq,
            result: Err(RefineFailure::Malformed),
            at: AT.to_string(),
        },
    );
    let entries = match effects.as_slice() {
        [Effect::Notify { kind: NotifyKind::Warning, .. }, Effect::WriteCollection { entries, .. }] => {
            entries.clone()
        }
        other => panic!("expected warning + WriteCollection, got {other:?}"),
    };
    assert_eq!(entries[0].markdown, "first markdown");
    let _ = state;
}

#[test]
fn explicit_cancel_clears_the_slot_and_persists_nothing() {
    init_logging();
    let (state, _seq) = awaiting_instruction(vec![tab(5, "https://a.example.com/")]);

    let (state, effects) = update(state, Msg::InstructionCancelled);
    assert!(state.pending().is_none());
    assert_eq!(state.phase(), CapturePhase::Idle);
    assert_eq!(state.last_outcome(), Some(&CaptureOutcome::Cancelled));
    assert!(state.collection().is_empty());
    assert_eq!(effects, vec![Effect::SetBadge { count: 0 }]);
}
