//! Turning fetched pages into more work.
//!
//! A [`PageParser`] reads a [`Response`] and returns the requests it leads
//! to. The caller decides whether to feed them back into the pool; the pool
//! itself never follows links.

use crate::errors::{CrawlerError, Result};
use crate::http::{Request, Response};
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

/// Derives follow-up requests from a response.
pub trait PageParser: Send + Sync {
    /// Returns the requests found in `response`. Failed responses yield
    /// nothing.
    fn parse(&self, response: &Response) -> Vec<Request>;
}

/// Collects attribute values for CSS selectors, e.g. `href` of every `a`.
///
/// As a [`PageParser`] it resolves each value against the page's final URL
/// and turns every `http`/`https` result into a `GET` request. Fragments are
/// stripped; duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct AttributeCollector {
    selectors: Vec<(String, Selector, Vec<String>)>,
}

impl AttributeCollector {
    /// Creates a collector with no selectors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector for `a[href]`.
    pub fn links() -> Result<Self> {
        Self::new().select("a", &["href"])
    }

    /// Adds `attributes` to collect from elements matching `selector`.
    pub fn select(mut self, selector: &str, attributes: &[&str]) -> Result<Self> {
        let parsed = Selector::parse(selector).map_err(|e| CrawlerError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        self.selectors.push((
            selector.to_string(),
            parsed,
            attributes.iter().map(ToString::to_string).collect(),
        ));
        Ok(self)
    }

    /// Raw attribute values found in `html`, grouped by selector in
    /// registration order, document order within a selector.
    #[must_use]
    pub fn collect(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut values = Vec::new();
        for (_, selector, attributes) in &self.selectors {
            for element in document.select(selector) {
                for attribute in attributes {
                    if let Some(value) = element.value().attr(attribute) {
                        values.push(value.to_string());
                    }
                }
            }
        }
        values
    }
}

impl PageParser for AttributeCollector {
    fn parse(&self, response: &Response) -> Vec<Request> {
        let Some(page) = response.page().filter(|p| p.is_success()) else {
            return Vec::new();
        };

        let base = if page.final_url.is_empty() {
            response.request().target()
        } else {
            page.final_url.as_str()
        };
        let Ok(base) = Url::parse(base) else {
            debug!(base, "Cannot resolve links against base");
            return Vec::new();
        };

        self.collect(&page.text())
            .iter()
            .filter_map(|value| base.join(value.trim()).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .filter_map(|mut url| {
                url.set_fragment(None);
                Request::get(url.to_string()).ok()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{wait_until_idle, Crawler};
    use crate::http::FetchResult;
    use crate::testing::TestServer;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const PAGE: &str = r#"
        <html>
          <head><link href="/style.css"></head>
          <body>
            <a href="/a">A</a>
            <a href="b#top">B</a>
            <a>no href</a>
            <a href="mailto:someone@example.com">mail</a>
            <img src="/logo.png">
          </body>
        </html>"#;

    fn response(final_url: &str, body: &str) -> Response {
        let page = FetchResult {
            final_url: final_url.to_string(),
            content_type: Some("text/html".to_string()),
            ..FetchResult::new(200, body)
        };
        Response::new(Request::get(final_url).unwrap(), Duration::ZERO, Ok(page))
    }

    #[test]
    fn test_collect_attributes_in_selector_order() {
        let collector = AttributeCollector::new()
            .select("img", &["src"])
            .unwrap()
            .select("a", &["href"])
            .unwrap()
            .select("link", &["href"])
            .unwrap();

        assert_eq!(
            collector.collect(PAGE),
            vec!["/logo.png", "/a", "b#top", "mailto:someone@example.com", "/style.css"]
        );
    }

    #[test]
    fn test_invalid_selector() {
        let err = AttributeCollector::new().select("a[", &["href"]).unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidSelector { .. }));
    }

    #[test]
    fn test_parse_resolves_against_final_url() {
        let collector = AttributeCollector::links().unwrap();
        let requests = collector.parse(&response("http://example.com/dir/page", PAGE));

        let targets: Vec<&str> = requests.iter().map(Request::target).collect();
        assert_eq!(targets, vec!["http://example.com/a", "http://example.com/dir/b"]);
        assert!(requests.iter().all(|r| r.method() == "GET"));
    }

    #[test]
    fn test_parse_ignores_failed_responses() {
        let collector = AttributeCollector::links().unwrap();
        let request = Request::get("invalid").unwrap();
        let error = request.url().unwrap_err();
        let failed = Response::new(request, Duration::ZERO, Err(error));
        assert!(collector.parse(&failed).is_empty());

        let not_found = Response::new(
            Request::get("http://example.com").unwrap(),
            Duration::ZERO,
            Ok(FetchResult::new(404, PAGE)),
        );
        assert!(collector.parse(&not_found).is_empty());
    }

    #[tokio::test]
    async fn test_crawl_linked_site_until_idle() {
        let server = TestServer::with_pages([
            ("/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
            ("/a", r#"<a href="/c">c</a>"#),
            ("/b", "<p>leaf</p>"),
            ("/c", "<p>leaf</p>"),
        ])
        .await
        .unwrap();

        let crawler = Crawler::builder(2).with_capacities(10, 10).build().unwrap();
        let parser = AttributeCollector::links().unwrap();
        crawler.start().await;
        crawler.queue().push_request(Request::get(server.url("/")).unwrap()).await.unwrap();

        let follower = {
            let crawler = crawler.clone();
            tokio::spawn(async move {
                while let Some(response) = crawler.queue().pop_response().await {
                    for request in parser.parse(&response) {
                        if crawler.queue().push_request(request).await.is_err() {
                            return;
                        }
                    }
                }
            })
        };

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_until_idle(&crawler, 3, Duration::from_millis(100)),
        )
        .await
        .expect("crawl should go idle");
        follower.abort();

        let mut paths = server.paths();
        paths.sort();
        assert_eq!(paths, vec!["/", "/a", "/b", "/c"]);

        let snapshot = crawler.tracker().snapshot();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.responses, 4);
        assert_eq!(snapshot.errors, 0);
    }
}
