//! Chroma - HTTP client for a Chroma vector index.
//!
//! Construction is explicit and eager: `connect` verifies the server is
//! reachable and resolves the known collections, returning an error the
//! caller maps to an "unavailable" retriever state. The server performs
//! query-side embedding with its configured embedding function.

use crate::error::{Error, Result};
use crate::index::{RawHit, VectorIndex};
use crate::retriever::KNOWN_COLLECTIONS;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<HashMap<String, serde_json::Value>>>>,
}

/// HTTP-backed Chroma index client.
pub struct ChromaIndex {
    client: Client,
    base_url: String,
    /// name -> collection id, resolved at construction
    collections: Vec<(String, String)>,
}

impl ChromaIndex {
    /// Connect to a Chroma server and resolve the known collections.
    ///
    /// Fails when the server is unreachable. Finding zero known
    /// collections is not an error; the retriever degrades to
    /// "no documents found".
    pub async fn connect(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let url = format!("{base_url}/api/v1/collections");
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("chroma unreachable at {base_url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Unavailable(format!(
                "chroma returned HTTP {} listing collections",
                response.status()
            )));
        }

        let listed: Vec<CollectionInfo> = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        // Keep KNOWN_COLLECTIONS order so cross-collection tie-breaking
        // is deterministic.
        let collections: Vec<(String, String)> = KNOWN_COLLECTIONS
            .iter()
            .filter_map(|name| {
                listed
                    .iter()
                    .find(|info| info.name == *name)
                    .map(|info| ((*name).to_string(), info.id.clone()))
            })
            .collect();

        if collections.is_empty() {
            info!("Chroma reachable but no known collections found; retrieval will be empty");
        } else {
            info!(count = collections.len(), "Loaded Chroma collections");
        }

        Ok(Self {
            client,
            base_url,
            collections,
        })
    }
}

#[async_trait::async_trait]
impl VectorIndex for ChromaIndex {
    fn collections(&self) -> Vec<String> {
        self.collections.iter().map(|(name, _)| name.clone()).collect()
    }

    #[instrument(skip(self, text, filter))]
    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<RawHit>> {
        let Some((_, id)) = self.collections.iter().find(|(name, _)| name == collection) else {
            debug!(collection, "Collection not loaded");
            return Ok(Vec::new());
        };

        let url = format!("{}/api/v1/collections/{}/query", self.base_url, id);
        let mut body = serde_json::json!({
            "query_texts": [text],
            "n_results": top_k,
            "include": ["documents", "distances", "metadatas"],
        });
        if let Some(filter) = filter {
            body["where"] = filter.clone();
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("chroma query timed out for {collection}"))
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "chroma query returned HTTP {} for {collection}",
                response.status()
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let documents = parsed.documents.into_iter().next().unwrap_or_default();
        let distances = parsed.distances.into_iter().next().unwrap_or_default();
        let metadatas = parsed.metadatas.into_iter().next().unwrap_or_default();

        let hits = documents
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let metadata = metadatas
                    .get(i)
                    .cloned()
                    .flatten()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| {
                        let text = match v {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, text)
                    })
                    .collect();
                RawHit {
                    content,
                    distance: distances.get(i).copied().unwrap_or(1.0),
                    metadata,
                }
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_parsing() {
        let raw = serde_json::json!({
            "documents": [["CS101 covers programming basics."]],
            "distances": [[0.4]],
            "metadatas": [[{"source_file": "catalog.csv", "department": "Computer Science"}]],
        });
        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.documents[0].len(), 1);
        assert!((parsed.distances[0][0] - 0.4).abs() < f32::EPSILON);
        assert_eq!(
            parsed.metadatas[0][0].as_ref().unwrap()["source_file"],
            "catalog.csv"
        );
    }

    #[test]
    fn test_query_response_tolerates_missing_fields() {
        let parsed: QueryResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.documents.is_empty());
    }
}
