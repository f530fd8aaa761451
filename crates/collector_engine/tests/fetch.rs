use std::time::Duration;

use collector_engine::{FetchError, FetchSettings, PageFetcher, ReqwestPageFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetcher_returns_decoded_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let url = format!("{}/doc", server.uri());

    let page = fetcher.fetch(&url).await.expect("fetch ok");
    assert_eq!(page.html, "<html>ok</html>");
    assert_eq!(page.final_url, url);
    assert!(page.content_type.unwrap().starts_with("text/html"));
}

#[tokio::test]
async fn fetcher_decodes_a_declared_legacy_charset() {
    let server = MockServer::start().await;
    // "café" in iso-8859-1.
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"caf\xe9".to_vec(), "text/html; charset=ISO-8859-1"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let page = fetcher
        .fetch(&format!("{}/latin1", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(page.html, "café");
}

#[tokio::test]
async fn fetcher_strips_a_utf8_bom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bom"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"\xEF\xBB\xBFhello".to_vec(), "text/html"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let page = fetcher
        .fetch(&format!("{}/bom", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(page.html, "hello");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw("<html>slow</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestPageFetcher::new(settings).expect("client");
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestPageFetcher::new(settings).expect("client");
    let err = fetcher
        .fetch(&format!("{}/large", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::TooLarge { max_bytes: 10 });
}

#[tokio::test]
async fn fetcher_rejects_non_html_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"a":1}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let err = fetcher
        .fetch(&format!("{}/data", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::UnsupportedContentType("application/json".to_string())
    );
}

#[tokio::test]
async fn fetcher_rejects_invalid_urls() {
    let fetcher = ReqwestPageFetcher::new(FetchSettings::default()).expect("client");
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));
}
