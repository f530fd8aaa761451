use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use collector_core::{
    example_collection, update, CaptureAction, CaptureSettings, Command, CommandResponse,
    ConvertOutcome, ConvertRequest, CoordinatorState, Effect, Msg, RefineFailure, Tab, TabId,
    TabRequest, TabResponse,
};
use collector_logging::{collector_error, collector_info, collector_warn};

use crate::browser::{BrowserTabs, TabContext, TabSelector};
use crate::clipboard::Clipboard;
use crate::convert::{ConvertOptions, PageConverter, PageDocument};
use crate::extract::page_title;
use crate::fetch::PageFetcher;
use crate::notify::{BadgeSink, NotificationSink};
use crate::refine::{LoadingSink, RefineError, Refiner};
use crate::store::{load_collection, load_settings, save_collection, Settings, Store};

/// Clock injected into the service; stamps `saved_at` and event times.
pub type NowFn = Arc<dyn Fn() -> String + Send + Sync>;

pub struct CollectorConfig {
    /// Upper bound on one tab-conversion round-trip.
    pub convert_timeout: Duration,
    pub now: NowFn,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            convert_timeout: Duration::from_secs(30),
            now: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }
}

/// Everything the coordinator needs to talk to the outside world. Hosts and
/// tests swap individual seams.
pub struct CollectorDeps {
    pub tabs: Arc<dyn BrowserTabs>,
    pub tab_context: Arc<dyn TabContext>,
    pub refiner: Arc<dyn Refiner>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub converter: Arc<PageConverter>,
    pub store: Arc<dyn Store>,
    pub clipboard: Arc<dyn Clipboard>,
    pub notifications: Arc<dyn NotificationSink>,
    pub badge: Arc<dyn BadgeSink>,
}

enum Inbound {
    Command {
        command: Command,
        sender: Option<Tab>,
        reply: mpsc::Sender<CommandResponse>,
    },
    Msg(Msg),
    Shutdown,
}

#[derive(Clone)]
pub struct CollectorHandle {
    tx: mpsc::Sender<Inbound>,
}

impl CollectorHandle {
    /// Submit a command and wait for the acknowledgement. Long-running work
    /// continues in the background and reports through the notification
    /// sink.
    pub fn submit(&self, command: Command) -> CommandResponse {
        self.submit_from(command, None)
    }

    /// Like [`submit`](Self::submit) with the sending tab attached, the way
    /// content-script commands arrive.
    pub fn submit_from(&self, command: Command, sender: Option<Tab>) -> CommandResponse {
        let stopped = || CommandResponse::Rejected {
            message: "collector service stopped".to_string(),
        };
        let (reply_tx, reply_rx) = mpsc::channel();
        if self
            .tx
            .send(Inbound::Command {
                command,
                sender,
                reply: reply_tx,
            })
            .is_err()
        {
            return stopped();
        }
        reply_rx.recv().unwrap_or_else(|_| stopped())
    }

    /// Post a browser event (tab activation, navigation) into the
    /// coordinator.
    pub fn post(&self, msg: Msg) {
        let _ = self.tx.send(Inbound::Msg(msg));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Inbound::Shutdown);
    }
}

pub struct CollectorService;

impl CollectorService {
    /// Start the coordinator event loop on a dedicated thread with its own
    /// tokio runtime. Messages are applied one at a time; async effects run
    /// as spawned tasks that post their results back into the same inbox.
    pub fn spawn(deps: CollectorDeps, config: CollectorConfig) -> CollectorHandle {
        let (tx, rx) = mpsc::channel();
        let handle = CollectorHandle { tx: tx.clone() };
        thread::spawn(move || run_loop(deps, config, tx, rx));
        handle
    }
}

fn run_loop(
    deps: CollectorDeps,
    config: CollectorConfig,
    tx: mpsc::Sender<Inbound>,
    rx: mpsc::Receiver<Inbound>,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            collector_error!("failed to start tokio runtime: {err}");
            return;
        }
    };

    let settings = load_settings(deps.store.as_ref());
    let collection = match load_collection(deps.store.as_ref()) {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            // First run: seed the collection so the view has something to
            // show.
            let seeded = example_collection(&(config.now)());
            if let Err(err) = save_collection(deps.store.as_ref(), &seeded) {
                collector_warn!("failed to write the seeded collection: {err}");
            }
            seeded
        }
        Err(err) => {
            collector_error!("failed to load the collection: {err}");
            Vec::new()
        }
    };
    let capture_settings = CaptureSettings {
        use_extraction: settings.enable_cleanup,
        refine_enabled: settings.enable_llm,
        has_credential: settings.api_key.is_some(),
        multi_tab: settings.enable_multitab,
    };

    let runner = EffectRunner {
        deps,
        settings,
        tx,
        now: config.now,
        convert_timeout: config.convert_timeout,
    };

    let mut state = CoordinatorState::new();
    for msg in [
        Msg::SettingsLoaded(capture_settings),
        Msg::CollectionLoaded(collection),
    ] {
        state = apply(state, msg, &runner, &runtime);
    }
    collector_info!(
        "collector service ready with {} entries",
        state.collection().len()
    );

    while let Ok(inbound) = rx.recv() {
        match inbound {
            Inbound::Command {
                command,
                sender,
                reply,
            } => {
                let (response, msg) = dispatch_command(&state, command, sender, &runner.now);
                let _ = reply.send(response);
                if let Some(msg) = msg {
                    state = apply(state, msg, &runner, &runtime);
                }
            }
            Inbound::Msg(msg) => {
                state = apply(state, msg, &runner, &runtime);
            }
            Inbound::Shutdown => break,
        }
    }
}

fn apply(
    state: CoordinatorState,
    msg: Msg,
    runner: &EffectRunner,
    runtime: &tokio::runtime::Runtime,
) -> CoordinatorState {
    let (state, effects) = update(state, msg);
    runner.run(runtime, effects);
    state
}

/// One handler per command variant; queries answer from state, triggers turn
/// into coordinator messages.
fn dispatch_command(
    state: &CoordinatorState,
    command: Command,
    sender: Option<Tab>,
    now: &NowFn,
) -> (CommandResponse, Option<Msg>) {
    match command {
        Command::SaveUrl => (
            CommandResponse::Accepted,
            Some(Msg::CaptureRequested {
                action: CaptureAction::Save,
            }),
        ),
        Command::CopyAsMarkdown => (
            CommandResponse::Accepted,
            Some(Msg::CaptureRequested {
                action: CaptureAction::Copy,
            }),
        ),
        Command::GetCollection => (
            CommandResponse::Collection(state.collection().clone()),
            None,
        ),
        Command::StoreForRefinement {
            markdown,
            multi_tab,
            url,
            title,
            tab_count,
            copy_after_refinement,
        } => {
            // The payload's url/title describe the converted page; the
            // sender supplies the tab/window scope when known.
            let (id, window_id) = sender.map(|tab| (tab.id, tab.window_id)).unwrap_or((0, 0));
            let tab = Tab {
                id,
                window_id,
                url,
                title,
            };
            (
                CommandResponse::Accepted,
                Some(Msg::RefinementStored {
                    tab,
                    markdown,
                    multi_tab,
                    tab_count,
                    copy_after_refinement,
                    at: now(),
                }),
            )
        }
        Command::GetPendingRefinement => (
            CommandResponse::PendingRefinement(state.view().pending),
            None,
        ),
        Command::ProcessRefinement { prompt, collective } => (
            CommandResponse::Accepted,
            Some(Msg::InstructionSubmitted {
                prompt,
                collective,
                at: now(),
            }),
        ),
        Command::ClearPendingRefinement => (CommandResponse::Accepted, Some(Msg::InstructionCancelled)),
        Command::DeleteEntry { url } => (CommandResponse::Accepted, Some(Msg::EntryDeleted { url })),
        Command::EditEntry { url, markdown } => (
            CommandResponse::Accepted,
            Some(Msg::EntryEdited { url, markdown }),
        ),
        Command::RefreshEntry { url } => (
            CommandResponse::Accepted,
            Some(Msg::EntryRefreshRequested { url }),
        ),
    }
}

struct EffectRunner {
    deps: CollectorDeps,
    settings: Settings,
    tx: mpsc::Sender<Inbound>,
    now: NowFn,
    convert_timeout: Duration,
}

impl EffectRunner {
    fn run(&self, runtime: &tokio::runtime::Runtime, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::QueryTabs { seq } => {
                    let selector = TabSelector::new(self.settings.enable_multitab);
                    let tabs = selector.select_tabs(self.deps.tabs.as_ref());
                    collector_info!("selected {} tab(s) for capture", tabs.len());
                    let _ = self.tx.send(Inbound::Msg(Msg::TabsSelected { seq, tabs }));
                }
                Effect::ConvertTab { seq, tab, request } => {
                    let ctx = self.deps.tab_context.clone();
                    let tx = self.tx.clone();
                    let now = self.now.clone();
                    let timeout = self.convert_timeout;
                    runtime.spawn(async move {
                        let outcome = convert_tab(ctx.as_ref(), &tab, request, timeout).await;
                        let _ = tx.send(Inbound::Msg(Msg::TabConverted {
                            seq,
                            tab_id: tab.id,
                            outcome,
                            at: now(),
                        }));
                    });
                }
                Effect::Refine {
                    seq,
                    tab_id,
                    markdown,
                    prompt,
                } => {
                    let refiner = self.deps.refiner.clone();
                    let ctx = self.deps.tab_context.clone();
                    let tx = self.tx.clone();
                    let now = self.now.clone();
                    runtime.spawn(async move {
                        let loading = TabLoadingSink { ctx, tab: tab_id };
                        let result = refiner
                            .refine(&markdown, &prompt, &loading)
                            .await
                            .map_err(|err| {
                                collector_warn!("refinement failed: {err}");
                                map_refine_error(&err)
                            });
                        let _ = tx.send(Inbound::Msg(Msg::RefineCompleted {
                            seq,
                            result,
                            at: now(),
                        }));
                    });
                }
                Effect::FetchPage { seq, url } => {
                    let fetcher = self.deps.fetcher.clone();
                    let converter = self.deps.converter.clone();
                    let tx = self.tx.clone();
                    let now = self.now.clone();
                    let use_extraction = self.settings.enable_cleanup;
                    runtime.spawn(async move {
                        let result = match fetcher.fetch(&url).await {
                            Ok(page) => {
                                let title = page_title(&page.html).unwrap_or_else(|| url.clone());
                                let doc = PageDocument {
                                    title,
                                    html: page.html,
                                };
                                Ok(converter.convert(&doc, ConvertOptions { use_extraction }))
                            }
                            Err(err) => {
                                collector_warn!("fetch failed for {url}: {err}");
                                Err(err.to_string())
                            }
                        };
                        let _ = tx.send(Inbound::Msg(Msg::PageRefreshed {
                            seq,
                            url,
                            result,
                            at: now(),
                        }));
                    });
                }
                Effect::WriteCollection { seq, entries } => {
                    let result =
                        save_collection(self.deps.store.as_ref(), &entries).map_err(|err| {
                            collector_error!("collection write failed: {err}");
                            err.to_string()
                        });
                    let _ = self
                        .tx
                        .send(Inbound::Msg(Msg::CollectionWritten { seq, result }));
                }
                Effect::CopyToClipboard { seq, text } => {
                    let result = self.deps.clipboard.copy(&text).map_err(|err| {
                        collector_warn!("clipboard write failed: {err}");
                        err.to_string()
                    });
                    let _ = self
                        .tx
                        .send(Inbound::Msg(Msg::ClipboardWritten { seq, result }));
                }
                Effect::Notify { message, kind } => {
                    self.deps.notifications.notify(&message, kind);
                }
                Effect::SetBadge { count } => {
                    self.deps.badge.set_count(count);
                }
            }
        }
    }
}

async fn convert_tab(
    ctx: &dyn TabContext,
    tab: &Tab,
    request: ConvertRequest,
    timeout: Duration,
) -> ConvertOutcome {
    let request = TabRequest::ConvertToMarkdown {
        is_multi_tab: request.is_multi_tab,
        is_first_tab: request.is_first_tab,
    };
    match tokio::time::timeout(timeout, ctx.request(tab.id, request)).await {
        Ok(Ok(TabResponse::Markdown { markdown })) => ConvertOutcome::Markdown(markdown),
        Ok(Ok(TabResponse::PendingRefinement { markdown })) => {
            ConvertOutcome::NeedsInstruction(markdown)
        }
        Ok(Ok(TabResponse::Cancelled)) => ConvertOutcome::Cancelled,
        Ok(Ok(TabResponse::Ack)) => ConvertOutcome::Failed {
            message: "tab sent a bare ack to a convert request".to_string(),
        },
        Ok(Err(err)) => {
            collector_warn!("conversion failed for tab {}: {err}", tab.id);
            ConvertOutcome::Failed {
                message: err.to_string(),
            }
        }
        Err(_) => {
            collector_warn!("conversion timed out for tab {}", tab.id);
            ConvertOutcome::Failed {
                message: "conversion timed out".to_string(),
            }
        }
    }
}

fn map_refine_error(err: &RefineError) -> RefineFailure {
    match err {
        RefineError::Auth => RefineFailure::Auth,
        RefineError::Connection(_) => RefineFailure::Connection,
        RefineError::RateOrServer { status, .. } => RefineFailure::RateOrServer { status: *status },
        RefineError::MalformedResponse => RefineFailure::Malformed,
    }
}

/// Spinner signals around a refinement call; fire-and-forget, failures are
/// ignored by design of the protocol.
struct TabLoadingSink {
    ctx: Arc<dyn TabContext>,
    tab: TabId,
}

impl LoadingSink for TabLoadingSink {
    fn show_loading(&self) {
        self.send(TabRequest::ShowLoading);
    }

    fn hide_loading(&self) {
        self.send(TabRequest::HideLoading);
    }
}

impl TabLoadingSink {
    fn send(&self, request: TabRequest) {
        let ctx = self.ctx.clone();
        let tab = self.tab;
        tokio::spawn(async move {
            let _ = ctx.request(tab, request).await;
        });
    }
}
