use collector_core::{Tab, TabId, TabRequest, TabResponse};
use collector_logging::collector_warn;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("tab query failed: {0}")]
pub struct TabQueryError(pub String);

/// Which tabs of the focused window a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabQuery {
    Active,
    Highlighted,
}

/// The browser's tab list, behind a seam so hosts and tests can supply their
/// own.
pub trait BrowserTabs: Send + Sync {
    fn query(&self, query: TabQuery) -> Result<Vec<Tab>, TabQueryError>;
}

/// Decides which tabs a capture targets: all highlighted tabs when the
/// multi-tab capability is on, otherwise the single active tab. A failing
/// browser query is logged and yields an empty selection, never an error.
#[derive(Debug, Clone, Copy)]
pub struct TabSelector {
    multi_tab: bool,
}

impl TabSelector {
    pub fn new(multi_tab: bool) -> Self {
        Self { multi_tab }
    }

    pub fn select_tabs(&self, tabs: &dyn BrowserTabs) -> Vec<Tab> {
        let query = if self.multi_tab {
            TabQuery::Highlighted
        } else {
            TabQuery::Active
        };
        match tabs.query(query) {
            Ok(selected) => selected,
            Err(err) => {
                collector_warn!("{err}; selecting no tabs");
                Vec::new()
            }
        }
    }

    pub fn has_multiple_selected(&self, tabs: &dyn BrowserTabs) -> bool {
        self.select_tabs(tabs).len() > 1
    }
}

#[derive(Debug, Error)]
pub enum TabRpcError {
    #[error("tab {0} is unreachable")]
    Unreachable(TabId),
    #[error("tab request failed: {0}")]
    Failed(String),
}

/// Request/response RPC into a tab's content context. Conversions are the
/// only calls with a meaningful reply; notification and loading signals are
/// fire-and-forget and answer with a bare ack.
#[async_trait::async_trait]
pub trait TabContext: Send + Sync {
    async fn request(&self, tab: TabId, request: TabRequest) -> Result<TabResponse, TabRpcError>;
}
