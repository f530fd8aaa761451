//! Collector engine: IO seams and effect execution for the capture
//! coordinator. The pure state machine lives in `collector_core`; this crate
//! talks to tabs, the LLM endpoint, the store and the clipboard.
mod browser;
mod clipboard;
mod convert;
mod extract;
mod fetch;
mod notify;
mod refine;
mod service;
mod store;
mod structured;

pub use browser::{BrowserTabs, TabQuery, TabQueryError, TabRpcError, TabContext, TabSelector};
pub use clipboard::{Clipboard, ClipboardError, SystemClipboard};
pub use convert::{ConvertOptions, Converter, Html2MdConverter, PageConverter, PageDocument};
pub use extract::{ArticleExtractor, ArticleTagExtractor, ExtractedArticle};
pub use fetch::{FetchError, FetchSettings, FetchedPage, PageFetcher, ReqwestPageFetcher};
pub use notify::{
    BadgeSink, ChannelBadgeSink, ChannelNotificationSink, LogNotificationSink, NoopBadgeSink,
    NotificationSink,
};
pub use refine::{
    LoadingSink, NoopLoadingSink, OpenAiRefiner, RefineError, RefineSettings, Refiner,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use service::{CollectorConfig, CollectorDeps, CollectorHandle, CollectorService, NowFn};
pub use store::{
    load_collection, load_settings, save_collection, save_settings, FileStore, Settings, Store,
    StoreError, KEY_API_KEY, KEY_BASE_URL, KEY_COLLECTION, KEY_ENABLE_CLEANUP, KEY_ENABLE_LLM,
    KEY_ENABLE_MULTITAB, KEY_MODEL,
};
pub use structured::{structure_content_schema, structured_to_markdown, Block, BlockContent, BlockKind, StructuredDocument};
