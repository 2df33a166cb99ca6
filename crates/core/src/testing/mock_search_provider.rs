//! Mock search provider for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::search::SearchProvider;

/// Mock implementation of the SearchProvider trait.
///
/// Returns configured results, optionally per term, and records every term
/// searched. `fail_next` makes the next search behave like a failed request.
#[derive(Debug)]
pub struct MockSearchProvider {
    /// Results returned for terms without a specific entry.
    results: Arc<RwLock<Vec<Value>>>,
    /// Results for specific terms.
    results_by_term: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    /// Recorded search terms.
    terms: Arc<RwLock<Vec<String>>>,
    /// If set, the next search returns nothing.
    fail_next: Arc<RwLock<bool>>,
}

impl Default for MockSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchProvider {
    /// Create a new mock provider with empty results.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            results_by_term: Arc::new(RwLock::new(HashMap::new())),
            terms: Arc::new(RwLock::new(Vec::new())),
            fail_next: Arc::new(RwLock::new(false)),
        }
    }

    /// Set the results returned for any term.
    pub async fn set_results(&self, results: Vec<Value>) {
        *self.results.write().await = results;
    }

    /// Set the results returned for one term.
    pub async fn set_results_for(&self, term: &str, results: Vec<Value>) {
        self.results_by_term
            .write()
            .await
            .insert(term.to_string(), results);
    }

    /// Make the next search fail.
    pub async fn fail_next(&self) {
        *self.fail_next.write().await = true;
    }

    /// Terms searched so far.
    pub async fn recorded_terms(&self) -> Vec<String> {
        self.terms.read().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, term: &str) -> Vec<Value> {
        self.terms.write().await.push(term.to_string());

        {
            let mut fail = self.fail_next.write().await;
            if *fail {
                *fail = false;
                return Vec::new();
            }
        }

        if let Some(results) = self.results_by_term.read().await.get(term) {
            return results.clone();
        }
        self.results.read().await.clone()
    }
}
