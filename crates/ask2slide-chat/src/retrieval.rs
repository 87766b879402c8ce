//! Client for the external hybrid-search service.
//!
//! Retrieval is best effort: every failure degrades to an empty result so a
//! message can still be answered without document context.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ask2slide_core::config::RetrievalConfig;
use ask2slide_core::error::Ask2SlideError;
use ask2slide_core::types::RetrievedSnippet;

/// Source of document snippets for a query within a knowledge base.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `limit` snippets for `query` within `scope`, best match first.
    async fn search(&self, query: &str, scope: &str, limit: usize) -> Vec<RetrievedSnippet>;
}

#[derive(Serialize)]
struct HybridSearchRequest<'a> {
    query: &'a str,
    kb_id: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct HybridSearchResponse {
    #[serde(default)]
    results: Vec<HybridSearchHit>,
}

#[derive(Deserialize)]
struct HybridSearchHit {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    filename: Option<String>,
}

/// HTTP retrieval client for `POST {base_url}/hybrid_search`.
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    client: reqwest::Client,
    base_url: String,
}

impl RetrievalClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self, Ask2SlideError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Ask2SlideError::Config(format!("Failed to build retrieval client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(
        &self,
        query: &str,
        scope: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedSnippet>, reqwest::Error> {
        let body = HybridSearchRequest {
            query,
            kb_id: scope,
            top_k: limit,
        };

        let resp = self
            .client
            .post(format!("{}/hybrid_search", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let data: HybridSearchResponse = resp.json().await?;
        Ok(into_snippets(data.results))
    }
}

#[async_trait]
impl Retriever for RetrievalClient {
    async fn search(&self, query: &str, scope: &str, limit: usize) -> Vec<RetrievedSnippet> {
        match self.fetch(query, scope, limit).await {
            Ok(snippets) => {
                debug!(kb_id = %scope, count = snippets.len(), "Retrieved snippets");
                snippets
            }
            Err(e) => {
                warn!(kb_id = %scope, error = %e, "Retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }
}

/// Keep hits that carry text, ranked by response order.
fn into_snippets(hits: Vec<HybridSearchHit>) -> Vec<RetrievedSnippet> {
    hits.into_iter()
        .filter_map(|hit| {
            let text = hit.text?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some((text, hit.score, hit.filename))
        })
        .enumerate()
        .map(|(i, (text, score, source))| RetrievedSnippet {
            text,
            rank: i + 1,
            score,
            source,
        })
        .collect()
}
