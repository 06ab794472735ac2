//! Open Library search API client.

use async_trait::async_trait;
use serde::Deserialize;

use super::{non_blank, prefer_isbn13, MetadataProvider, ProviderError};
use crate::modules::books::models::ExternalBook;
use crate::utils::isbn;

pub const SOURCE: &str = "OPEN_LIBRARY";
const COVER_URL: &str = "https://covers.openlibrary.org/b/id";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<Doc>,
}

#[derive(Debug, Deserialize)]
struct Doc {
    key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    isbn: Vec<String>,
    #[serde(default)]
    publisher: Vec<String>,
    first_publish_year: Option<i32>,
    number_of_pages_median: Option<i32>,
    #[serde(default)]
    subject: Vec<String>,
    cover_i: Option<i64>,
}

impl Doc {
    fn into_external(self) -> Option<ExternalBook> {
        let title = non_blank(self.title)?;
        Some(ExternalBook {
            title,
            author: non_blank(self.author_name.into_iter().next()),
            isbn: prefer_isbn13(self.isbn.iter().map(String::as_str)),
            publisher: non_blank(self.publisher.into_iter().next()),
            publication_year: self.first_publish_year,
            page_count: self.number_of_pages_median,
            description: None,
            cover_image_url: self.cover_i.map(|id| format!("{COVER_URL}/{id}-M.jpg")),
            category: non_blank(self.subject.into_iter().next()),
            source: SOURCE.to_string(),
            external_id: self.key,
        })
    }
}

pub struct OpenLibraryProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<SearchResponse, ProviderError> {
        let url = format!("{}/search.json", self.base_url);
        tracing::debug!(provider = SOURCE, %url, ?params, "querying provider");

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ExternalBook>, ProviderError> {
        let term = match isbn::normalize(query) {
            Some(isbn) => ("isbn", isbn),
            None => ("q", query.to_string()),
        };
        let response = self.fetch(&[term, ("limit", limit.to_string())]).await?;

        let books: Vec<_> = response
            .docs
            .into_iter()
            .filter_map(Doc::into_external)
            .take(limit as usize)
            .collect();
        tracing::debug!(provider = SOURCE, query, results = books.len(), "provider search done");
        Ok(books)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.fetch(&[("q", "test".to_string()), ("limit", "1".to_string())])
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_normalizes_to_external_book() {
        let doc: Doc = serde_json::from_value(serde_json::json!({
            "key": "/works/OL468431W",
            "title": "The Great Gatsby",
            "author_name": ["F. Scott Fitzgerald", "Someone Else"],
            "isbn": ["0743273567", "9780743273565"],
            "publisher": ["Scribner"],
            "first_publish_year": 1925,
            "number_of_pages_median": 180,
            "subject": ["Fiction", "Classics"],
            "cover_i": 8432047
        }))
        .unwrap();

        let book = doc.into_external().unwrap();
        assert_eq!(book.author.as_deref(), Some("F. Scott Fitzgerald"));
        assert_eq!(book.isbn.as_deref(), Some("9780743273565"));
        assert_eq!(book.category.as_deref(), Some("Fiction"));
        assert_eq!(
            book.cover_image_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/8432047-M.jpg")
        );
        assert_eq!(book.external_id.as_deref(), Some("/works/OL468431W"));
        assert_eq!(book.source, SOURCE);
    }

    #[test]
    fn untitled_doc_is_dropped() {
        let doc: Doc = serde_json::from_value(serde_json::json!({ "key": "/works/x" })).unwrap();
        assert!(doc.into_external().is_none());
    }
}
