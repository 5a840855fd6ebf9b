use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use webmind_common::SearchResult;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) webmind/0.1";

// --- PageFetcher trait ---

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a web page and reduce it to readable text. An empty string is
    /// a valid result meaning "nothing usable on the page"; hard failures
    /// (network, non-HTML, bad status) are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
    fn name(&self) -> &str;
}

/// Readability extraction of the main content as markdown.
fn extract_readable(html: &str, url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    transform_content_input(input, &config)
}

// --- Plain HTTP fetcher ---

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        info!("Using HttpFetcher (reqwest + Readability extraction)");
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        info!(url, fetcher = "http", "Fetching URL");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status} for {url}");
        }

        if let Some(content_type) = resp.headers().get(reqwest::header::CONTENT_TYPE) {
            let ct = content_type.to_str().unwrap_or_default();
            if !ct.contains("html") && !ct.contains("xml") && !ct.contains("text/plain") {
                anyhow::bail!("Unsupported content type '{ct}' for {url}");
            }
        }

        let html = resp.text().await.context("Failed to read response body")?;
        if html.is_empty() {
            warn!(url, fetcher = "http", "Empty response body");
            return Ok(String::new());
        }

        let text = extract_readable(&html, url);
        if text.trim().is_empty() {
            warn!(url, fetcher = "http", "Empty content after Readability extraction");
            return Ok(String::new());
        }

        info!(url, fetcher = "http", bytes = text.len(), "Fetched successfully");
        Ok(text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

// --- Browserless fetcher (rendered pages) ---

pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "Using BrowserlessFetcher");
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        info!(url, fetcher = "browserless", "Fetching URL");

        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .context("Browserless content request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            anyhow::bail!("Browserless error (status {status}): {message}");
        }

        let html = resp.text().await.context("Failed to read rendered HTML")?;
        if html.is_empty() {
            warn!(url, fetcher = "browserless", "Empty HTML response");
            return Ok(String::new());
        }

        let text = extract_readable(&html, url);
        if text.trim().is_empty() {
            warn!(
                url,
                fetcher = "browserless",
                "Empty content after Readability extraction"
            );
            return Ok(String::new());
        }

        info!(
            url,
            fetcher = "browserless",
            bytes = text.len(),
            "Fetched successfully"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run a web search and return up to `max_results` hits in provider
    /// order. An empty list is a valid result, not an error.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

// --- DuckDuckGo (HTML endpoint) ---

pub struct DdgSearcher {
    client: reqwest::Client,
}

impl DdgSearcher {
    pub fn new() -> Self {
        info!("Using DdgSearcher");
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for DdgSearcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull result URLs out of the DuckDuckGo HTML results page. Result links
/// are redirect URLs carrying the target in the `uddg` query parameter;
/// anything without that parameter (ads, navigation) is skipped.
pub(crate) fn parse_ddg_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let href_re = regex::Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex");

    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();

    for cap in href_re.captures_iter(html) {
        let raw = cap[1].replace("&amp;", "&");
        if !raw.contains("uddg=") {
            continue;
        }

        // Protocol-relative redirect links need a scheme before parsing.
        let absolute = if raw.starts_with("//") {
            format!("https:{raw}")
        } else {
            raw
        };
        let Ok(redirect) = url::Url::parse(&absolute) else {
            continue;
        };
        let Some(target) = redirect
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
        else {
            continue;
        };

        if target.is_empty() || !seen.insert(target.clone()) {
            continue;
        }

        results.push(SearchResult {
            url: target,
            title: String::new(),
            snippet: String::new(),
        });
        if results.len() >= max_results {
            break;
        }
    }

    results
}

#[async_trait]
impl WebSearcher for DdgSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!(query, max_results, "DuckDuckGo search");

        let resp = self
            .client
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)])
            .send()
            .await
            .context("DuckDuckGo request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("DuckDuckGo error (status {status})");
        }

        let html = resp.text().await.context("Failed to read search results")?;
        let results = parse_ddg_results(&html, max_results);

        info!(query, count = results.len(), "DuckDuckGo search complete");
        Ok(results)
    }
}

// --- Serper (Google Search) ---

pub struct SerperSearcher {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearcher {
    pub fn new(api_key: &str) -> Self {
        info!("Using SerperSearcher");
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

fn collect_serper_results(data: SerperResponse, max_results: usize) -> Vec<SearchResult> {
    data.organic
        .into_iter()
        .filter(|r| !r.link.is_empty())
        .map(|r| SearchResult {
            url: r.link,
            title: r.title,
            snippet: r.snippet,
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!(query, max_results, "Serper search");

        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let results = collect_serper_results(data, max_results);

        info!(query, count = results.len(), "Serper search complete");
        Ok(results)
    }
}
