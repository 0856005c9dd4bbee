//! Directory listing retrieval and parsing.
//!
//! The remote source is an Apache-style autoindex server with no contract beyond "returns HTML
//! with anchor tags". The [`Fetcher`] therefore:
//!
//! - rewrites every target into an absolute URL under the configured base,
//! - percent-encodes `&` (listing servers tend to break on it) and falls back to the original and
//!   fully decoded spellings when the encoded one yields nothing,
//! - retries connection failures and 5xx responses with exponential backoff,
//! - scrapes anchors permissively and never fails: any error becomes an empty listing.
//!
//! # Examples
//!
//! ```no_run
//! use pyq::{fetcher::Fetcher, prelude::*, Config};
//!
//! # async fn example() -> Result<(), PyqError> {
//! let config = Config::default().with_base_url("http://papers.example.edu/");
//! let fetcher = Fetcher::new(&config)?;
//! for entry in fetcher.list("/FE/2016/").await {
//!   println!("{} {}", if entry.is_directory { "dir " } else { "file" }, entry.path);
//! }
//! # Ok(())
//! # }
//! ```

use super::*;

/// A single anchor from a listing page.
///
/// Transient: produced per fetch and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
  /// Percent-decoded last path segment, without a trailing slash
  pub name:         String,
  /// Whether the anchor pointed at a sub-directory
  pub is_directory: bool,
  /// Absolute URL of the entry
  pub path:         String,
}

/// Source of directory listings.
///
/// Implementations must never fail: an unreachable or unparsable listing is an empty one.
#[async_trait]
pub trait Listing: Send + Sync {
  /// Lists the entries of the directory at `url` (absolute, or relative to the base URL).
  async fn list(&self, url: &str) -> Vec<DirectoryEntry>;

  /// Root URL every listed path lives under.
  fn base_url(&self) -> &str;
}

/// HTTP implementation of [`Listing`].
#[derive(Debug, Clone)]
pub struct Fetcher {
  /// Shared HTTP client carrying the User-Agent and timeout
  client:   reqwest::Client,
  /// Base URL, always ending in `/`
  base_url: String,
  /// Retry and timeout settings
  config:   config::FetchConfig,
}

/// Outcome of fetching one URL spelling.
enum Attempt {
  /// The server answered with a listing page.
  Listing(Vec<DirectoryEntry>),
  /// 404, worth trying another spelling.
  NotFound,
  /// Any other failure; already logged.
  Failed,
}

lazy_static! {
  static ref ANCHOR: Regex =
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))[^>]*>(.*?)</a\s*>"#)
      .unwrap();
  static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
  static ref DOUBLE_SLASH: Regex = Regex::new(r"([^:/])/{2,}").unwrap();
}

impl Fetcher {
  /// Builds a fetcher for the base URL and HTTP settings in `config`.
  pub fn new(config: &Config) -> Result<Self> {
    config.validate()?;
    let client = reqwest::Client::builder()
      .user_agent(config.fetch.user_agent.clone())
      .timeout(config.fetch.timeout())
      .build()?;
    Ok(Self { client, base_url: normalize_base(&config.base_url), config: config.fetch.clone() })
  }

  /// Rewrites `target` into the absolute, encoded URL that is requested first.
  ///
  /// Rewrites, in order: prefix with the base URL, collapse doubled separators, encode `&`.
  pub fn resolve_url(&self, target: &str) -> String { encode_ampersands(&self.absolute(target)) }

  /// Absolute form of `target` without any encoding applied.
  fn absolute(&self, target: &str) -> String {
    let joined = if target.starts_with("http://") || target.starts_with("https://") {
      target.to_string()
    } else {
      format!("{}{}", self.base_url, target.trim_start_matches('/'))
    };
    collapse_slashes(&joined)
  }

  /// The spellings tried for `target`: encoded, original, fully decoded. Duplicates removed.
  fn candidates(&self, target: &str) -> Vec<String> {
    let original = self.absolute(target);
    let encoded = encode_ampersands(&original);
    let decoded = urlencoding::decode(&original)
      .map(|d| d.into_owned())
      .unwrap_or_else(|_| original.clone());

    let mut candidates = Vec::with_capacity(3);
    for candidate in [encoded, original, decoded] {
      if !candidates.contains(&candidate) {
        candidates.push(candidate);
      }
    }
    candidates
  }

  /// Fetches one URL spelling, retrying transient failures.
  async fn attempt(&self, url: &str) -> Attempt {
    let mut retries = 0;
    loop {
      match self.client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
          let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
              warn!("Failed to read listing body from {url}: {e}");
              return Attempt::Failed;
            },
          };
          trace!("Listing body from {url}: {} bytes", body.len());
          return match Url::parse(url) {
            Ok(current) => Attempt::Listing(parse_listing(&body, &current)),
            Err(e) => {
              warn!("Cannot resolve anchors against {url}: {e}");
              Attempt::Failed
            },
          };
        },
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
          debug!("Listing not found: {url}");
          return Attempt::NotFound;
        },
        Ok(response) if response.status().is_server_error() && retries < self.config.max_retries => {
          retries += 1;
          let delay = self.config.backoff(retries);
          warn!("{url} answered {}, retry {retries} in {delay:?}", response.status());
          tokio::time::sleep(delay).await;
        },
        Ok(response) => {
          warn!("{url} answered {}", response.status());
          return Attempt::Failed;
        },
        Err(e) if is_transient(&e) && retries < self.config.max_retries => {
          retries += 1;
          let delay = self.config.backoff(retries);
          warn!("Request to {url} failed ({e}), retry {retries} in {delay:?}");
          tokio::time::sleep(delay).await;
        },
        Err(e) => {
          error!("Request to {url} failed: {e}");
          return Attempt::Failed;
        },
      }
    }
  }
}

#[async_trait]
impl Listing for Fetcher {
  async fn list(&self, url: &str) -> Vec<DirectoryEntry> {
    let candidates = self.candidates(url);
    let last = candidates.len() - 1;
    for (index, candidate) in candidates.iter().enumerate() {
      match self.attempt(candidate).await {
        Attempt::Listing(entries) if !entries.is_empty() => {
          debug!("{} entries at {candidate}", entries.len());
          return entries;
        },
        Attempt::Listing(_) | Attempt::NotFound if index < last => {
          debug!("Nothing at {candidate}, trying {}", candidates[index + 1]);
        },
        Attempt::Listing(_) | Attempt::NotFound => {
          info!("Empty listing at {url}");
        },
        Attempt::Failed => break,
      }
    }
    Vec::new()
  }

  fn base_url(&self) -> &str { &self.base_url }
}

/// Connection problems and timeouts are worth retrying; malformed requests are not.
fn is_transient(e: &reqwest::Error) -> bool { e.is_timeout() || e.is_connect() || e.is_request() }

/// Ensures `base` ends with exactly one `/`.
pub fn normalize_base(base: &str) -> String { format!("{}/", base.trim_end_matches('/')) }

/// Collapses runs of `/` outside the scheme separator.
pub fn collapse_slashes(url: &str) -> String { DOUBLE_SLASH.replace_all(url, "$1/").into_owned() }

/// Percent-encodes `&` as `%26`.
pub fn encode_ampersands(url: &str) -> String { url.replace('&', "%26") }

/// Extracts directory and PDF entries from an autoindex page.
///
/// Parent-directory links, sort links and anything that resolves outside `current` are skipped.
/// Hrefs are resolved against `current`, so both relative and absolute listings work.
pub fn parse_listing(html: &str, current: &Url) -> Vec<DirectoryEntry> {
  let mut entries = Vec::new();
  let mut seen = HashSet::new();
  let current_path = current.path().to_string();

  for captures in ANCHOR.captures_iter(html) {
    let Some(href) = captures.get(1).or_else(|| captures.get(2)).or_else(|| captures.get(3))
    else {
      continue;
    };
    let href = href.as_str().trim().replace("&amp;", "&");
    let text = TAG.replace_all(captures.get(4).map_or("", |m| m.as_str()), "");
    let text = text.trim();

    if text.eq_ignore_ascii_case("Parent Directory")
      || text == ".."
      || href.starts_with('?')
      || href.starts_with('#')
      || href.starts_with("mailto:")
    {
      continue;
    }

    let Ok(resolved) = current.join(&href) else {
      trace!("Unresolvable href {href:?}");
      continue;
    };
    let path = resolved.path();
    // Only strict descendants of the current directory; guards against parent and sibling links.
    if resolved.host_str() != current.host_str()
      || !path.starts_with(&current_path)
      || path.len() <= current_path.len()
    {
      continue;
    }

    let is_directory = path.ends_with('/');
    if !is_directory && !path.to_ascii_lowercase().ends_with(".pdf") {
      continue;
    }

    let mut absolute = resolved.clone();
    absolute.set_query(None);
    absolute.set_fragment(None);
    let absolute = absolute.to_string();
    if !seen.insert(absolute.clone()) {
      continue;
    }

    let raw_name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let name = urlencoding::decode(raw_name).map(|n| n.into_owned()).unwrap_or_else(|_| raw_name.into());
    entries.push(DirectoryEntry { name, is_directory, path: absolute });
  }
  entries
}

#[cfg(test)]
mod tests {
  use super::*;

  const APACHE: &str = r#"
    <html><body><h1>Index of /FE/2016</h1>
    <table>
    <tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
    <tr><td><a href="/FE/">Parent Directory</a></td></tr>
    <tr><td><a href="DEC%202016/">DEC 2016/</a></td></tr>
    <tr><td><a href="FE-BTECH_PHYSICS_SEM%20I_DEC%202016.pdf">FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf</a></td></tr>
    <tr><td><a href="notes.txt">notes.txt</a></td></tr>
    <tr><td><A HREF='/FE/2016/MATHS.PDF'>MATHS.PDF</A></td></tr>
    <tr><td><a href="http://elsewhere.example/x.pdf">x.pdf</a></td></tr>
    </table></body></html>
  "#;

  fn fetcher() -> Fetcher {
    Fetcher::new(&Config::default().with_base_url("http://host/papers")).unwrap()
  }

  #[test]
  fn test_parse_listing() {
    let current = Url::parse("http://host/FE/2016/").unwrap();
    let entries = parse_listing(APACHE, &current);

    assert_eq!(entries.len(), 3, "{entries:#?}");
    assert_eq!(entries[0], DirectoryEntry {
      name:         "DEC 2016".into(),
      is_directory: true,
      path:         "http://host/FE/2016/DEC%202016/".into(),
    });
    assert_eq!(entries[1].name, "FE-BTECH_PHYSICS_SEM I_DEC 2016.pdf");
    assert!(!entries[1].is_directory);
    assert_eq!(entries[2].path, "http://host/FE/2016/MATHS.PDF");
  }

  #[test]
  fn test_parse_tolerates_garbage() {
    let current = Url::parse("http://host/").unwrap();
    assert!(parse_listing("<a href=>broken<a", &current).is_empty());
    assert!(parse_listing("", &current).is_empty());
    let unquoted = parse_listing("<a href=a.pdf>a</a>", &current);
    assert_eq!(unquoted.len(), 1);
  }

  #[test]
  fn test_resolve_url_rewrites() {
    let fetcher = fetcher();
    assert_eq!(fetcher.resolve_url("/FE//2016/"), "http://host/papers/FE/2016/");
    assert_eq!(fetcher.resolve_url("R&D/"), "http://host/papers/R%26D/");
    assert_eq!(fetcher.resolve_url("http://host/papers//x/"), "http://host/papers/x/");
  }

  #[test]
  fn test_candidates_order() {
    let fetcher = fetcher();
    assert_eq!(fetcher.candidates("A&B%20C/"), vec![
      "http://host/papers/A%26B%20C/".to_string(),
      "http://host/papers/A&B%20C/".to_string(),
      "http://host/papers/A&B C/".to_string(),
    ]);
    assert_eq!(fetcher.candidates("plain/").len(), 1);
  }
}
