use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// Settings for re-fetching a saved url. The 30 second request timeout is
/// the long-standing default for the fetch round-trip.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("request timed out")]
    Timeout,
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("could not decode the response as text")]
    Decode,
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: String,
    pub content_type: Option<String>,
}

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPageFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestPageFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

#[async_trait::async_trait]
impl PageFetcher for ReqwestPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|err| FetchError::InvalidUrl(err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::TooLarge {
                    max_bytes: self.settings.max_bytes,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::UnsupportedContentType(ct.to_string()));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if bytes.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Err(FetchError::TooLarge {
                    max_bytes: self.settings.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let html = decode_html(&bytes, content_type.as_deref()).ok_or(FetchError::Decode)?;
        Ok(FetchedPage {
            html,
            final_url,
            content_type,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    FetchError::Network(err.to_string())
}

/// Decode raw page bytes into UTF-8: BOM first, then the Content-Type header
/// charset, then statistical detection.
fn decode_html(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }
    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .or_else(|| part.trim().strip_prefix("Charset="))
            .map(|value| value.trim_matches(['"', '\'', ' ']).to_string())
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return None;
    }
    Some(text.into_owned())
}
