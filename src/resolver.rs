use tracing::{debug, info};

use crate::error::LookupError;
use crate::extract::{extract_detail, extract_list, Extraction};
use crate::fetcher::{Locator, PageSource};
use crate::record::NameRecord;

/// Two-stage lookup: search page, then the detail page when the matching row links to one.
pub struct Resolver<S> {
    source: S,
}

impl<S: PageSource> Resolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// `Ok(None)` when the registry has no exact entry for `query`.
    pub async fn resolve(&self, query: &str) -> Result<Option<NameRecord>, LookupError> {
        let page = self.source.fetch(&Locator::Query(query.to_string())).await?;
        debug!(query, url = %page.url, "list page fetched");

        let link = match extract_list(&page, query)? {
            Extraction::Record(record) => return Ok(Some(record)),
            Extraction::Detail(link) => link,
            Extraction::NotFound => {
                info!(query, "{} not found", query);
                return Ok(None);
            }
            Extraction::Ambiguous => {
                info!(query, "{} has no exact match", query);
                return Ok(None);
            }
        };

        debug!(query, target = %link.target, "following detail link");
        let page = self.source.fetch(&Locator::Path(link.target)).await?;

        extract_detail(&page).map(Some)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::extract::tests::{detail_page, empty_list_page, list_page};
    use crate::fetcher::Page;

    /// In-memory registry keyed by locator. Unknown locators answer 404,
    /// entries mapped to `None` answer 500.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pages: HashMap<Locator, Option<String>>,
        pub(crate) calls: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn query(mut self, name: &str, body: String) -> Self {
            self.pages.insert(Locator::Query(name.to_uppercase()), Some(body));
            self
        }

        pub(crate) fn path(mut self, target: &str, body: String) -> Self {
            self.pages.insert(Locator::Path(target.to_string()), Some(body));
            self
        }

        pub(crate) fn failing(mut self, name: &str) -> Self {
            self.pages.insert(Locator::Query(name.to_uppercase()), None);
            self
        }
    }

    #[async_trait]
    impl PageSource for StaticSource {
        async fn fetch(&self, locator: &Locator) -> Result<Page, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = match locator {
                Locator::Query(q) => Locator::Query(q.to_uppercase()),
                other => other.clone(),
            };
            let status = match self.pages.get(&key) {
                Some(Some(body)) => return Ok(Page::new(format!("{:?}", key), body.clone())),
                Some(None) => reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                None => reqwest::StatusCode::NOT_FOUND,
            };
            Err(LookupError::Transport {
                status,
                url: format!("{:?}", key),
            })
        }
    }

    #[tokio::test]
    async fn terminal_row_needs_one_fetch() {
        let source = StaticSource::default().query("anna", list_page(&[("Anna", "9000", None)]));
        let resolver = Resolver::new(source);

        let rec = resolver.resolve("Anna").await.unwrap().unwrap();
        assert_eq!(rec.name, "Anna");
        assert_eq!(rec.count, 9000);
        assert_eq!(resolver.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn linked_row_follows_detail_page() {
        let source = StaticSource::default()
            .query(
                "dans",
                list_page(&[
                    ("Bogdans", "512", Some("./index.php?name=1")),
                    ("Dans", "1480", Some("./index.php?name=2")),
                ]),
            )
            .path(
                "./index.php?name=2",
                detail_page(&[("Vārds", "Dans"), ("Sastopams", "1480"), ("Skaidrojums", "Daniēls")]),
            );
        let resolver = Resolver::new(source);

        let rec = resolver.resolve("Dans").await.unwrap().unwrap();
        assert_eq!(rec.name, "Dans");
        assert_eq!(rec.explanation.as_deref(), Some("Daniēls"));
        assert_eq!(resolver.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn not_found_is_none_not_error() {
        let source = StaticSource::default().query("xyz", empty_list_page());
        let resolver = Resolver::new(source);
        assert_eq!(resolver.resolve("xyz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn substring_only_is_none() {
        let source = StaticSource::default().query("dans", list_page(&[("Bogdans", "512", None)]));
        let resolver = Resolver::new(source);
        assert_eq!(resolver.resolve("Dans").await.unwrap(), None);
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let source = StaticSource::default().failing("dans");
        let resolver = Resolver::new(source);
        assert!(matches!(
            resolver.resolve("Dans").await,
            Err(LookupError::Transport { status, .. }) if status.as_u16() == 500
        ));
    }

    #[tokio::test]
    async fn broken_detail_page_is_error() {
        let source = StaticSource::default()
            .query("dans", list_page(&[("Dans", "1480", Some("./index.php?name=2"))]))
            .path("./index.php?name=2", detail_page(&[("Vārds", "Dans")]));
        let resolver = Resolver::new(source);
        assert!(matches!(
            resolver.resolve("Dans").await,
            Err(LookupError::MalformedRecord(_))
        ));
    }

    #[tokio::test]
    async fn blank_detail_name_never_becomes_a_record() {
        let source = StaticSource::default()
            .query("dans", list_page(&[("Dans", "1480", Some("./index.php?name=2"))]))
            .path("./index.php?name=2", detail_page(&[("Vārds", ""), ("Sastopams", "1480")]));
        let resolver = Resolver::new(source);
        assert!(matches!(
            resolver.resolve("Dans").await,
            Err(LookupError::MalformedRecord(_))
        ));
    }
}
