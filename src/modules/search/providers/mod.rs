//! Third-party book metadata providers, consulted when the local catalog has
//! too few matches.

pub mod google_books;
pub mod open_library;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use shelf_kernel::settings::ProviderSettings;
use thiserror::Error;

use crate::modules::books::models::ExternalBook;
use crate::utils::isbn;

pub use google_books::GoogleBooksProvider;
pub use open_library::OpenLibraryProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// A remote book metadata source.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Source tag stamped on every result, e.g. `OPEN_LIBRARY`
    fn name(&self) -> &'static str;

    /// Up to `limit` results for `query`, normalized to [`ExternalBook`].
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ExternalBook>, ProviderError>;

    /// A minimal request that must succeed for the provider to count as up.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// How one provider fared for a single lookup or health probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalApiHealthStatus {
    pub providers: Vec<ProviderStatus>,
    pub all_available: bool,
    pub checked_at: DateTime<Utc>,
}

impl ExternalApiHealthStatus {
    fn from_statuses(providers: Vec<ProviderStatus>) -> Self {
        Self {
            all_available: providers.iter().all(|p| p.available),
            providers,
            checked_at: Utc::now(),
        }
    }

    pub fn is_available(&self, provider: &str) -> Option<bool> {
        self.providers
            .iter()
            .find(|p| p.name == provider)
            .map(|p| p.available)
    }
}

/// Merged results of one lookup plus the per-provider statuses behind them.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub books: Vec<ExternalBook>,
    pub health: ExternalApiHealthStatus,
}

/// Fans a query out to every configured provider concurrently.
#[derive(Clone)]
pub struct ExternalLookup {
    providers: Vec<Arc<dyn MetadataProvider>>,
    timeout: Duration,
}

impl ExternalLookup {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Build the enabled providers sharing one HTTP client.
    pub fn from_settings(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        // The client timeout is a backstop; each call is also bounded below
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(timeout + Duration::from_millis(500))
            .build()?;

        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();
        if settings.open_library.enabled {
            providers.push(Arc::new(OpenLibraryProvider::new(
                client.clone(),
                &settings.open_library.base_url,
            )));
        }
        if settings.google_books.enabled {
            providers.push(Arc::new(GoogleBooksProvider::new(
                client,
                &settings.google_books.base_url,
                settings.google_books.api_key.clone(),
            )));
        }

        tracing::info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            timeout_ms = settings.timeout_ms,
            "external metadata providers configured"
        );
        Ok(Self::new(providers, timeout))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Query every provider once. Failures and timeouts contribute no results
    /// and are reported in the returned health snapshot.
    pub async fn search(&self, query: &str, limit: u32) -> LookupOutcome {
        let calls = self.providers.iter().map(|provider| async move {
            let (result, status) = self
                .timed(provider.name(), provider.search(query, limit))
                .await;
            (result.unwrap_or_default(), status)
        });

        let (batches, statuses): (Vec<_>, Vec<_>) = join_all(calls).await.into_iter().unzip();
        let books = merge(batches, limit as usize);

        tracing::debug!(query, results = books.len(), "external lookup finished");
        LookupOutcome {
            books,
            health: ExternalApiHealthStatus::from_statuses(statuses),
        }
    }

    /// Probe every provider concurrently.
    pub async fn health(&self) -> ExternalApiHealthStatus {
        let probes = self.providers.iter().map(|provider| async move {
            let (_, status) = self
                .timed(provider.name(), provider.health_check())
                .await;
            status
        });

        ExternalApiHealthStatus::from_statuses(join_all(probes).await)
    }

    async fn timed<T>(
        &self,
        name: &'static str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> (Option<T>, ProviderStatus) {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => (
                Some(value),
                ProviderStatus {
                    name: name.to_string(),
                    available: true,
                    response_time_ms,
                    error: None,
                },
            ),
            Err(err) => {
                tracing::warn!(provider = name, error = %err, response_time_ms, "provider call failed");
                (
                    None,
                    ProviderStatus {
                        name: name.to_string(),
                        available: false,
                        response_time_ms,
                        error: Some(err.to_string()),
                    },
                )
            }
        }
    }
}

/// Concatenate provider batches in order, dropping untitled results and later
/// duplicates by ISBN, then truncate to `limit`.
fn merge(batches: Vec<Vec<ExternalBook>>, limit: usize) -> Vec<ExternalBook> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|book| !book.title.trim().is_empty())
        .filter(|book| match book.isbn.as_deref().and_then(isbn::normalize) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .take(limit)
        .collect()
}

/// Pick a normalized ISBN from a provider's list, preferring ISBN-13.
pub(crate) fn prefer_isbn13<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let normalized: Vec<String> = candidates.into_iter().filter_map(isbn::normalize).collect();
    normalized
        .iter()
        .find(|isbn| isbn.len() == 13)
        .or_else(|| normalized.first())
        .cloned()
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
