use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::application::search::{SearchError, SearchIndex};
use crate::domain::entities::{PostId, SearchDocument};

use super::query;

/// Search index client talking to Elasticsearch's REST API.
#[derive(Clone, Debug)]
pub struct ElasticsearchIndex {
    client: Client,
    base: Url,
    index: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: SearchDocument,
}

impl ElasticsearchIndex {
    pub fn new(base: &str, index: &str, timeout: Duration) -> Result<Self, SearchError> {
        let mut base = Url::parse(base).map_err(SearchError::transport)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trellis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SearchError::transport)?;
        Ok(Self {
            client,
            base,
            index: index.to_string(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> Result<Url, SearchError> {
        self.base
            .join(&format!("{}/{path}", self.index))
            .map_err(SearchError::transport)
    }

    fn index_url(&self) -> Result<Url, SearchError> {
        self.base.join(&self.index).map_err(SearchError::transport)
    }

    async fn search(&self, body: Value) -> Result<Vec<SearchDocument>, SearchError> {
        let resp = self
            .client
            .post(self.url("_search")?)
            .json(&body)
            .send()
            .await
            .map_err(SearchError::transport)?;
        let resp = Self::ensure_success(resp).await?;
        let bytes = resp.bytes().await.map_err(SearchError::transport)?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes).map_err(SearchError::decode)?;
        Ok(parsed.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    async fn ensure_success(resp: Response) -> Result<Response, SearchError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        let resp = self
            .client
            .head(self.index_url()?)
            .send()
            .await
            .map_err(SearchError::transport)?;
        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status() != StatusCode::NOT_FOUND {
            return Self::ensure_success(resp).await.map(|_| ());
        }

        let resp = self
            .client
            .put(self.index_url()?)
            .json(&query::index_mapping())
            .send()
            .await
            .map_err(SearchError::transport)?;
        match Self::ensure_success(resp).await {
            Ok(_) => {
                info!(
                    target = "trellis::search",
                    index = %self.index,
                    "search index created"
                );
                Ok(())
            }
            // Another instance created it between our HEAD and PUT.
            Err(SearchError::Status { status: 400, body })
                if body.contains("resource_already_exists_exception") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError> {
        let resp = self
            .client
            .put(self.url(&format!("_doc/{}", document.id))?)
            .json(document)
            .send()
            .await
            .map_err(SearchError::transport)?;
        Self::ensure_success(resp).await.map(|_| ())
    }

    async fn delete(&self, id: PostId) -> Result<(), SearchError> {
        let resp = self
            .client
            .delete(self.url(&format!("_doc/{id}"))?)
            .send()
            .await
            .map_err(SearchError::transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(resp).await.map(|_| ())
    }

    async fn search_text(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchDocument>, SearchError> {
        self.search(query::full_text(query, max_results)).await
    }

    async fn search_by_tags(
        &self,
        tags: &[String],
        exclude_id: PostId,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, SearchError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.search(query::related_by_tags(tags, exclude_id, limit))
            .await
    }
}
