use scraper::{Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub content_html: String,
}

/// Readability-style boilerplate removal. Returns `None` when the page has no
/// recognizable article content, in which case the caller converts the full
/// page instead.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Option<ExtractedArticle>;
}

/// Lightweight extractor:
/// - pulls `<title>` text if present
/// - returns the inner html of the first `<article>`, else `<main>`
/// - yields `None` when neither exists, so the full-body fallback runs.
#[derive(Debug, Default)]
pub struct ArticleTagExtractor;

/// `<title>` text of a document, if it has a non-empty one.
pub fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

impl ArticleExtractor for ArticleTagExtractor {
    fn extract(&self, html: &str) -> Option<ExtractedArticle> {
        let doc = Html::parse_document(html);
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| doc.select(&sel).next())
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let content_html = ["article", "main"].iter().find_map(|tag| {
            let sel = Selector::parse(tag).ok()?;
            doc.select(&sel).next().map(|node| node.inner_html())
        })?;
        if content_html.trim().is_empty() {
            return None;
        }

        Some(ExtractedArticle {
            title,
            content_html,
        })
    }
}
