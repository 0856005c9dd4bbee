//! Integration tests for the HTTP fetcher against a mock listing server.

use pyq::{
  config::FetchConfig,
  fetcher::{Fetcher, Listing},
  Config,
};
use wiremock::{
  matchers::{method, path},
  Mock, MockServer, ResponseTemplate,
};

/// An Apache autoindex page linking to `hrefs`.
fn autoindex(hrefs: &[&str]) -> String {
  let rows: String = hrefs
    .iter()
    .map(|href| format!("<tr><td><a href=\"{href}\">{href}</a></td><td>2019-05-01 10:00</td></tr>\n"))
    .collect();
  format!(
    "<html><head><title>Index</title></head><body><table>\n<tr><th><a \
     href=\"?C=N;O=D\">Name</a></th></tr>\n<tr><td><a href=\"../\">Parent \
     Directory</a></td></tr>\n{rows}</table></body></html>"
  )
}

fn fetcher(server: &MockServer) -> Fetcher {
  let config = Config::default()
    .with_base_url(&format!("{}/papers/", server.uri()))
    .with_fetch(FetchConfig { retry_delay_ms: 1, ..FetchConfig::default() });
  Fetcher::new(&config).expect("valid config")
}

async fn requests(server: &MockServer) -> usize {
  server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn test_lists_directories_and_pdfs() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/FE/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&[
      "2016/",
      "MATHS%20SEM%20I.pdf",
      "notes.txt",
      "/elsewhere/",
    ])))
    .mount(&server)
    .await;

  let entries = fetcher(&server).list("/FE/").await;
  let names: Vec<(&str, bool)> = entries.iter().map(|e| (e.name.as_str(), e.is_directory)).collect();
  assert_eq!(names, vec![("2016", true), ("MATHS SEM I.pdf", false)]);
  assert_eq!(entries[0].path, format!("{}/papers/FE/2016/", server.uri()));
}

#[tokio::test]
async fn test_not_found_is_empty() {
  let server = MockServer::start().await;
  let entries = fetcher(&server).list("/missing/").await;
  assert!(entries.is_empty());
}

#[tokio::test]
async fn test_error_status_is_empty_without_fallbacks() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/A&B/"))
    .respond_with(ResponseTemplate::new(403))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/papers/A%26B/"))
    .respond_with(ResponseTemplate::new(403))
    .mount(&server)
    .await;

  assert!(fetcher(&server).list("/A&B/").await.is_empty());
  assert_eq!(requests(&server).await, 1);
}

#[tokio::test]
async fn test_ampersand_is_encoded_first() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/A%26B/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&["x.pdf"])))
    .mount(&server)
    .await;

  let entries = fetcher(&server).list("/A&B/").await;
  assert_eq!(entries.len(), 1);
  assert_eq!(requests(&server).await, 1);
}

#[tokio::test]
async fn test_falls_back_to_original_spelling() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/A&B/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&["x.pdf"])))
    .mount(&server)
    .await;

  let entries = fetcher(&server).list("/A&B/").await;
  assert_eq!(entries.len(), 1);
  assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_falls_back_to_decoded_spelling() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/R&D/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&["y.pdf"])))
    .mount(&server)
    .await;

  let entries = fetcher(&server).list("/R%26D/").await;
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].name, "y.pdf");
}

#[tokio::test]
async fn test_empty_listing_tries_other_spellings() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/A%26B/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&[])))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/papers/A&B/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&["z.pdf"])))
    .mount(&server)
    .await;

  assert_eq!(fetcher(&server).list("/A&B/").await.len(), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/"))
    .respond_with(ResponseTemplate::new(503))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/papers/"))
    .respond_with(ResponseTemplate::new(200).set_body_string(autoindex(&["FE/"])))
    .mount(&server)
    .await;

  let entries = fetcher(&server).list("/").await;
  assert_eq!(entries.len(), 1);
  assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  assert!(fetcher(&server).list("/").await.is_empty());
  // One attempt plus the default two retries.
  assert_eq!(requests(&server).await, 3);
}

#[tokio::test]
async fn test_garbage_body_is_empty() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/papers/"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<<<a href= <td>>>"))
    .mount(&server)
    .await;

  assert!(fetcher(&server).list("/").await.is_empty());
}
