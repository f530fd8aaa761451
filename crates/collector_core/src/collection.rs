use url::Url;

/// Bucket label used when an entry's `saved_at` cannot be parsed.
pub const UNKNOWN_DATE: &str = "Unknown Date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSource {
    pub url: String,
    pub title: String,
}

/// Metadata attached to an entry produced by collective refinement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInfo {
    pub prompt: String,
    pub sources: Vec<BatchSource>,
}

/// One saved page capture. `saved_at` is an ISO 8601 timestamp supplied by
/// the caller; the core never reads wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub url: String,
    pub title: String,
    pub markdown: String,
    pub saved_at: String,
    pub batch: Option<BatchInfo>,
}

/// Insertion-ordered, unique-by-url set of entries. Always persisted as one
/// whole value.
pub type Collection = Vec<Entry>;

/// Merge new entries into the collection: an existing entry with the same url
/// is replaced in place (position preserved, all fields overwritten),
/// otherwise the entry is appended.
pub fn merge_entries(collection: &mut Collection, new_entries: Vec<Entry>) {
    for entry in new_entries {
        match collection.iter_mut().find(|e| e.url == entry.url) {
            Some(existing) => *existing = entry,
            None => collection.push(entry),
        }
    }
}

/// Remove the entry with the given url. Returns whether anything was removed.
pub fn remove_entry(collection: &mut Collection, url: &str) -> bool {
    let before = collection.len();
    collection.retain(|e| e.url != url);
    collection.len() != before
}

/// Replace an entry's markdown after a manual edit. The timestamp is left
/// untouched so the entry stays in its original date group.
pub fn edit_entry_markdown(collection: &mut Collection, url: &str, markdown: String) -> bool {
    match collection.iter_mut().find(|e| e.url == url) {
        Some(entry) => {
            entry.markdown = markdown;
            true
        }
        None => false,
    }
}

/// Seed data installed when the collection key is absent from the store.
pub fn example_collection(now_iso: &str) -> Collection {
    let example = |url: &str, title: &str, markdown: &str| Entry {
        url: url.to_string(),
        title: title.to_string(),
        markdown: markdown.to_string(),
        saved_at: now_iso.to_string(),
        batch: None,
    };
    vec![
        example(
            "https://example.com/page1",
            "Example Page 1",
            "## Example Markdown 1",
        ),
        example(
            "https://example.net/page4",
            "Example Page 4",
            "## Example Markdown 4",
        ),
        example(
            "https://example.com/page2",
            "Example Page 2",
            "## Example Markdown 2",
        ),
    ]
}

/// Extracts the registrable part of a url's hostname ("docs.example.com" ->
/// "example.com"). Returns `None` for unparseable urls or urls without a host.
pub fn core_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return Some(host.to_string());
    }
    Some(labels[labels.len() - 2..].join("."))
}

/// Groups entries by the calendar date of `saved_at` (ISO `YYYY-MM-DD`),
/// newest group first, entries within a group newest first. Entries whose
/// timestamp does not parse are collected under [`UNKNOWN_DATE`] at the end.
pub fn group_by_saved_date(collection: &[Entry]) -> Vec<(String, Vec<&Entry>)> {
    let mut groups: Vec<(String, Vec<&Entry>)> = Vec::new();
    for entry in collection {
        let date = saved_date(&entry.saved_at).unwrap_or_else(|| UNKNOWN_DATE.to_string());
        match groups.iter_mut().find(|(d, _)| *d == date) {
            Some((_, entries)) => entries.push(entry),
            None => groups.push((date, vec![entry])),
        }
    }
    // Newest date first, with the unknown bucket always last.
    groups.sort_by(|(a, _), (b, _)| match (a.as_str(), b.as_str()) {
        (UNKNOWN_DATE, UNKNOWN_DATE) => std::cmp::Ordering::Equal,
        (UNKNOWN_DATE, _) => std::cmp::Ordering::Greater,
        (_, UNKNOWN_DATE) => std::cmp::Ordering::Less,
        (a, b) => b.cmp(a),
    });
    for (_, entries) in &mut groups {
        entries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    }
    groups
}

/// First ten characters of an ISO 8601 timestamp, validated as `YYYY-MM-DD`.
fn saved_date(saved_at: &str) -> Option<String> {
    let date = saved_at.get(..10)?;
    let bytes = date.as_bytes();
    let digits_at = |range: std::ops::Range<usize>| {
        bytes[range].iter().all(|b| b.is_ascii_digit())
    };
    if digits_at(0..4) && bytes[4] == b'-' && digits_at(5..7) && bytes[7] == b'-' && digits_at(8..10)
    {
        Some(date.to_string())
    } else {
        None
    }
}
