//! Google Books volumes API client.

use async_trait::async_trait;
use serde::Deserialize;

use super::{non_blank, prefer_isbn13, MetadataProvider, ProviderError};
use crate::modules::books::models::ExternalBook;
use crate::utils::isbn;

pub const SOURCE: &str = "GOOGLE_BOOKS";
/// Largest `maxResults` the volumes endpoint accepts
pub const MAX_RESULTS: u32 = 40;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: Option<String>,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    page_count: Option<i32>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl Volume {
    fn into_external(self) -> Option<ExternalBook> {
        let info = self.volume_info;
        let title = non_blank(info.title)?;

        let isbn_of = |kind: &str| {
            info.industry_identifiers
                .iter()
                .filter(|id| id.kind == kind)
                .map(|id| id.identifier.as_str())
                .collect::<Vec<_>>()
        };
        let mut candidates = isbn_of("ISBN_13");
        candidates.extend(isbn_of("ISBN_10"));

        let cover = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|url| match url.strip_prefix("http://") {
                Some(rest) => format!("https://{rest}"),
                None => url,
            });

        Some(ExternalBook {
            title,
            author: non_blank(info.authors.into_iter().next()),
            isbn: prefer_isbn13(candidates),
            publisher: non_blank(info.publisher),
            publication_year: info
                .published_date
                .as_deref()
                .and_then(|date| date.get(..4))
                .and_then(|year| year.parse().ok()),
            page_count: info.page_count.filter(|pages| *pages > 0),
            description: non_blank(info.description),
            cover_image_url: cover,
            category: non_blank(info.categories.into_iter().next()),
            source: SOURCE.to_string(),
            external_id: self.id,
        })
    }
}

pub struct GoogleBooksProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    async fn fetch(&self, q: String, max_results: u32) -> Result<VolumesResponse, ProviderError> {
        let url = format!("{}/volumes", self.base_url);
        tracing::debug!(provider = SOURCE, %url, %q, max_results, "querying provider");

        let mut params = vec![("q", q), ("maxResults", max_results.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ExternalBook>, ProviderError> {
        let q = match isbn::normalize(query) {
            Some(isbn) => format!("isbn:{isbn}"),
            None => query.to_string(),
        };
        let max_results = limit.clamp(1, MAX_RESULTS);
        let response = self.fetch(q, max_results).await?;

        let books: Vec<_> = response
            .items
            .into_iter()
            .filter_map(Volume::into_external)
            .take(limit as usize)
            .collect();
        tracing::debug!(provider = SOURCE, query, results = books.len(), "provider search done");
        Ok(books)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.fetch("test".to_string(), 1).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_normalizes_to_external_book() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "iXn5U2IzVH0C",
            "volumeInfo": {
                "title": "The Great Gatsby",
                "authors": ["F. Scott Fitzgerald"],
                "publisher": "Simon and Schuster",
                "publishedDate": "2004-09-30",
                "description": "A classic.",
                "pageCount": 180,
                "categories": ["Fiction"],
                "industryIdentifiers": [
                    { "type": "ISBN_10", "identifier": "0743273567" },
                    { "type": "ISBN_13", "identifier": "9780743273565" }
                ],
                "imageLinks": { "thumbnail": "http://books.google.com/books/content?id=iXn5U2IzVH0C" }
            }
        }))
        .unwrap();

        let book = volume.into_external().unwrap();
        assert_eq!(book.isbn.as_deref(), Some("9780743273565"));
        assert_eq!(book.publication_year, Some(2004));
        assert_eq!(
            book.cover_image_url.as_deref(),
            Some("https://books.google.com/books/content?id=iXn5U2IzVH0C")
        );
        assert_eq!(book.external_id.as_deref(), Some("iXn5U2IzVH0C"));
        assert_eq!(book.source, SOURCE);
    }

    #[test]
    fn partial_date_and_missing_info() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "volumeInfo": { "title": "Notes", "publishedDate": "19" }
        }))
        .unwrap();
        let book = volume.into_external().unwrap();
        assert_eq!(book.publication_year, None);
        assert_eq!(book.author, None);

        let untitled: Volume = serde_json::from_value(serde_json::json!({ "id": "x" })).unwrap();
        assert!(untitled.into_external().is_none());
    }
}
