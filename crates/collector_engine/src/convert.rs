use std::sync::Arc;

use collector_logging::collector_warn;

use crate::extract::{ArticleExtractor, ArticleTagExtractor};

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    pub use_extraction: bool,
}

/// A page as handed over by a tab context or the page fetcher: the document
/// title plus the full html.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub title: String,
    pub html: String,
}

/// Turns a page into `# <title>` plus the converted body. With extraction
/// enabled, article content is converted instead of the full page; extraction
/// failure or absence falls back to the full page. Malformed or empty html
/// never errors, it just yields the bare heading.
pub struct PageConverter {
    extractor: Arc<dyn ArticleExtractor>,
    converter: Arc<dyn Converter>,
}

impl PageConverter {
    pub fn new(extractor: Arc<dyn ArticleExtractor>, converter: Arc<dyn Converter>) -> Self {
        Self {
            extractor,
            converter,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ArticleTagExtractor), Arc::new(Html2MdConverter))
    }

    pub fn convert(&self, page: &PageDocument, options: ConvertOptions) -> String {
        if options.use_extraction {
            if let Some(article) = self.extractor.extract(&page.html) {
                let title = article
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| fallback_title(&page.title));
                let title = title.to_string();
                return compose(&title, &self.converter.to_markdown(&article.content_html));
            }
            collector_warn!("extraction found no article content; converting the full page");
        }
        let body = if page.html.trim().is_empty() {
            String::new()
        } else {
            self.converter.to_markdown(&page.html)
        };
        compose(fallback_title(&page.title), &body)
    }
}

fn fallback_title(title: &str) -> &str {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        "Untitled"
    } else {
        trimmed
    }
}

fn compose(title: &str, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("# {title}")
    } else {
        format!("# {title}\n\n{body}")
    }
}
