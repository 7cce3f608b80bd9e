use std::time::Duration;

use courier_core::ImageRef;
use courier_engine::{fetch_images, FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn image(url: String, n: usize) -> ImageRef {
    ImageRef {
        original_url: url,
        local_id: format!("img-{n:03}"),
        preserve_link: false,
    }
}

#[tokio::test]
async fn page_fetch_returns_bytes_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/doc", server.uri());

    let output = fetcher.fetch_page(&url).await.expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.byte_len, 15);
    assert!(output
        .metadata
        .content_type
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(output.bytes, &b"<html>ok</html>"[..]);
}

#[tokio::test]
async fn missing_pages_are_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    for (route, expected) in [
        ("/gone", FailureKind::NotFound),
        ("/missing", FailureKind::NotFound),
        ("/broken", FailureKind::HttpStatus(503)),
    ] {
        let err = fetcher
            .fetch_page(&format!("{}{route}", server.uri()))
            .await
            .expect_err("status should fail");
        assert_eq!(err.kind, expected, "route {route}");
    }
}

#[tokio::test]
async fn slow_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>late</html>", "text/html")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(200),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch_page(&format!("{}/slow", server.uri()))
        .await
        .expect_err("should time out");
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn oversized_and_non_html_pages_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(64), "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG, "image/png"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 16,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);

    let err = fetcher
        .fetch_page(&format!("{}/big", server.uri()))
        .await
        .expect_err("too large");
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));

    let err = fetcher
        .fetch_page(&format!("{}/image", server.uri()))
        .await
        .expect_err("not html");
    assert!(matches!(err.kind, FailureKind::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn non_http_urls_are_invalid() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch_page("ftp://example.com/a").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
    let err = fetcher.fetch_page("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn image_batch_skips_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG, "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG, "application/octet-stream"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let refs = vec![
        image(format!("{}/a.png", server.uri()), 1),
        image(format!("{}/b.png", server.uri()), 2),
        image(format!("{}/c.bin", server.uri()), 3),
    ];

    let map = fetch_images(&fetcher, &refs).await;
    assert_eq!(map.len(), 2);
    assert!(map.contains_key("img-001"));
    assert!(!map.contains_key("img-002"));
    assert_eq!(map["img-003"].bytes, PNG);
    assert_eq!(map["img-001"].content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn slow_image_is_left_out_of_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG, "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PNG, "image/png")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        image_timeout: Duration::from_millis(200),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch_image(&format!("{}/slow.png", server.uri()))
        .await
        .expect_err("should time out");
    assert_eq!(err.kind, FailureKind::Timeout);

    let refs = vec![
        image(format!("{}/fast.png", server.uri()), 1),
        image(format!("{}/slow.png", server.uri()), 2),
    ];
    let map = fetch_images(&fetcher, &refs).await;
    assert_eq!(map.len(), 1);
    assert_eq!(map["img-001"].bytes, PNG);
    assert!(!map.contains_key("img-002"));
}
