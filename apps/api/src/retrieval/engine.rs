//! Retrieval Engine — owns the published document/index snapshot and serves queries.
//!
//! State machine:
//!
//! ```text
//! Uninitialized ──┐
//!                 ├─► Rebuilding ─► Ready(snapshot)
//! Ready ──────────┘        └──────► Failed(reason)
//! ```
//!
//! A snapshot (documents + index) is built completely off to the side and then
//! published with a single write. Readers clone the `Arc` under a short read lock
//! and never observe documents and vectors from different builds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::RetrievalConfig;
use crate::models::resume::ResumeRecord;
use crate::retrieval::embedding::{EmbeddingError, EmbeddingProvider};
use crate::retrieval::index::{normalize_l2, FlatIndex, IndexError};
use crate::retrieval::prompts::{
    section_not_found, NOT_READY_CONTEXT, QUERY_FAILURE_CONTEXT, SECTION_KEYWORDS,
};
use crate::retrieval::synthesizer::synthesize;

/// Documents returned by keyword section lookup.
const SECTION_DOC_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("no documents generated from resume data")]
    EmptyDocumentSet,

    #[error("embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("embedding provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("rebuild superseded by a newer refresh")]
    Superseded,
}

/// One raw hit from diagnostic search.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub document: String,
    pub score: f32,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Uninitialized,
    Rebuilding,
    Ready,
    Failed,
}

/// Point-in-time view of the engine for health and admin surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub phase: EnginePhase,
    pub ready: bool,
    pub document_count: usize,
    pub dimension: Option<usize>,
    pub last_built_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// A fully built, immutable retrieval set. `documents[i]` ↔ `index` vector `i`.
#[derive(Debug)]
struct RetrievalSnapshot {
    documents: Vec<String>,
    index: FlatIndex,
    built_at: DateTime<Utc>,
}

#[derive(Debug)]
enum EngineState {
    Uninitialized,
    Rebuilding,
    Ready(Arc<RetrievalSnapshot>),
    Failed(String),
}

/// Retrieval-augmented context engine. One instance per process, shared by `Arc`.
pub struct RetrievalEngine {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    state: RwLock<EngineState>,
    /// Serializes rebuilds so two refreshes never embed concurrently.
    rebuild_lock: Mutex<()>,
    /// Generation of the most recently requested rebuild.
    requested: AtomicU64,
}

impl RetrievalEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self {
            provider,
            config,
            state: RwLock::new(EngineState::Uninitialized),
            rebuild_lock: Mutex::new(()),
            requested: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.read_state(), EngineState::Ready(_))
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.read_state();
        let (phase, snapshot, last_error) = match &*state {
            EngineState::Uninitialized => (EnginePhase::Uninitialized, None, None),
            EngineState::Rebuilding => (EnginePhase::Rebuilding, None, None),
            EngineState::Ready(s) => (EnginePhase::Ready, Some(s), None),
            EngineState::Failed(reason) => (EnginePhase::Failed, None, Some(reason.clone())),
        };
        EngineStatus {
            phase,
            ready: snapshot.is_some(),
            document_count: snapshot.map(|s| s.documents.len()).unwrap_or(0),
            dimension: snapshot.map(|s| s.index.dimension()),
            last_built_at: snapshot.map(|s| s.built_at),
            last_error,
        }
    }

    /// The currently published documents, empty when not ready.
    pub fn documents(&self) -> Vec<String> {
        self.snapshot()
            .map(|s| s.documents.clone())
            .unwrap_or_default()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Build lifecycle
    // ────────────────────────────────────────────────────────────────────────

    /// Builds and publishes a fresh snapshot from `record`.
    /// On failure the engine is left in `Failed` and the error is returned.
    pub async fn initialize(&self, record: &ResumeRecord) -> Result<usize, RetrievalError> {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.rebuild_lock.lock().await;
        self.rebuild(record, generation).await
    }

    /// Flips the engine to not-ready immediately, then rebuilds from `record`.
    ///
    /// Never returns an error: failures are logged and leave the engine not-ready
    /// rather than serving the previous index. Returns the resulting readiness.
    ///
    /// The rebuild runs on its own task, so it completes even if the caller
    /// is dropped once the engine has gone not-ready.
    pub async fn refresh(self: &Arc<Self>, record: &ResumeRecord) -> bool {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(EngineState::Rebuilding);

        let engine = Arc::clone(self);
        let record = record.clone();
        let rebuild = tokio::spawn(async move {
            let _guard = engine.rebuild_lock.lock().await;
            match engine.rebuild(&record, generation).await {
                Ok(count) => info!("Embeddings refreshed successfully ({count} documents)"),
                Err(RetrievalError::Superseded) => {
                    debug!("Refresh generation {generation} superseded before publish")
                }
                Err(e) => warn!("Refresh failed, retrieval stays not-ready: {e}"),
            }
        });

        if let Err(e) = rebuild.await {
            error!("Refresh task aborted: {e}");
            if generation == self.requested.load(Ordering::SeqCst) {
                self.set_state(EngineState::Failed(format!("refresh task aborted: {e}")));
            }
        }
        self.is_ready()
    }

    async fn rebuild(&self, record: &ResumeRecord, generation: u64) -> Result<usize, RetrievalError> {
        if generation != self.requested.load(Ordering::SeqCst) {
            return Err(RetrievalError::Superseded);
        }
        self.set_state(EngineState::Rebuilding);

        let result = self.build_snapshot(record).await;

        let mut state = self.write_state();
        if generation != self.requested.load(Ordering::SeqCst) {
            // A newer refresh already flipped the state; leave it to that build.
            return Err(RetrievalError::Superseded);
        }
        match result {
            Ok(snapshot) => {
                let count = snapshot.index.len();
                *state = EngineState::Ready(Arc::new(snapshot));
                info!("Vector index initialized with {count} documents");
                Ok(count)
            }
            Err(e) => {
                *state = EngineState::Failed(e.to_string());
                error!("Failed to initialize embeddings: {e}");
                Err(e)
            }
        }
    }

    async fn build_snapshot(&self, record: &ResumeRecord) -> Result<RetrievalSnapshot, RetrievalError> {
        let documents = synthesize(record);
        info!("Processed resume data into {} text chunks", documents.len());
        if documents.is_empty() {
            return Err(RetrievalError::EmptyDocumentSet);
        }

        let mut vectors = self.provider.embed(&documents).await?;
        if vectors.len() != documents.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: documents.len(),
                returned: vectors.len(),
            }
            .into());
        }
        for v in vectors.iter_mut() {
            normalize_l2(v);
        }
        let index = FlatIndex::build(vectors)?;

        Ok(RetrievalSnapshot {
            documents,
            index,
            built_at: Utc::now(),
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Queries
    // ────────────────────────────────────────────────────────────────────────

    /// Assembles bounded context for the generator. Never fails: not-ready and
    /// query-time errors come back as fixed fallback text.
    ///
    /// `side_context` (e.g. text the visitor selected) is prepended to the search
    /// string. Hits at or below the similarity threshold are dropped; the static
    /// personal paragraph always leads the result.
    pub async fn get_relevant_context(&self, query: &str, side_context: &str) -> String {
        let Some(snapshot) = self.snapshot() else {
            return NOT_READY_CONTEXT.to_string();
        };

        let search_query = if side_context.trim().is_empty() {
            query.to_string()
        } else {
            format!("{side_context} {query}")
        };

        let k = self.config.context_top_k.min(snapshot.documents.len());
        let hits = match self.search_snapshot(&snapshot, &search_query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Error getting relevant context: {e}");
                return QUERY_FAILURE_CONTEXT.to_string();
            }
        };

        let relevant: Vec<&str> = hits
            .iter()
            .filter(|(_, score)| *score > self.config.similarity_threshold)
            .map(|(id, _)| snapshot.documents[*id].as_str())
            .collect();

        info!(
            "Retrieved {} relevant documents for query: {}...",
            relevant.len(),
            preview(query)
        );

        assemble_context(&self.config.personal_context, &relevant)
    }

    /// Raw top-`limit` hits with scores and original positions, no threshold.
    /// Returns an empty list when not ready or on any query-time failure.
    pub async fn search_documents(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };

        let k = limit.min(snapshot.documents.len());
        match self.search_snapshot(&snapshot, query, k).await {
            Ok(hits) => hits
                .into_iter()
                .map(|(index, score)| SearchHit {
                    document: snapshot.documents[index].clone(),
                    score,
                    index,
                })
                .collect(),
            Err(e) => {
                error!("Error searching documents: {e}");
                Vec::new()
            }
        }
    }

    /// Keyword lookup without vector search: up to three documents, in original
    /// order, whose lowercased text contains any keyword for `section`.
    pub fn get_section_context(&self, section: &str) -> String {
        let Some(snapshot) = self.snapshot() else {
            return section_not_found(section);
        };

        let section_lower = section.trim().to_lowercase();
        let fallback = [section_lower.as_str()];
        let keywords: &[&str] = SECTION_KEYWORDS
            .iter()
            .find(|(name, _)| *name == section_lower)
            .map(|(_, kws)| *kws)
            .unwrap_or(&fallback[..]);

        let matched: Vec<&str> = snapshot
            .documents
            .iter()
            .filter(|doc| {
                let doc_lower = doc.to_lowercase();
                keywords.iter().any(|kw| doc_lower.contains(kw))
            })
            .take(SECTION_DOC_LIMIT)
            .map(String::as_str)
            .collect();

        if matched.is_empty() {
            section_not_found(section)
        } else {
            matched.join(" ")
        }
    }

    async fn search_snapshot(
        &self,
        snapshot: &RetrievalSnapshot,
        text: &str,
        k: usize,
    ) -> Result<Vec<(usize, f32)>, RetrievalError> {
        let query_vector = self.embed_query(text).await?;
        Ok(snapshot.index.search(&query_vector, k)?)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let batch = [text.to_string()];
        let timeout = self.config.query_timeout;
        let mut vectors = tokio::time::timeout(timeout, self.provider.embed(&batch))
            .await
            .map_err(|_| RetrievalError::Timeout(timeout))??;

        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                returned: vectors.len(),
            }
            .into());
        }
        let mut vector = vectors.remove(0);
        normalize_l2(&mut vector);
        Ok(vector)
    }

    // ────────────────────────────────────────────────────────────────────────
    // State access
    // ────────────────────────────────────────────────────────────────────────

    fn snapshot(&self) -> Option<Arc<RetrievalSnapshot>> {
        match &*self.read_state() {
            EngineState::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    fn set_state(&self, next: EngineState) {
        *self.write_state() = next;
    }

    // A panic while holding the lock cannot leave a half-written state: every
    // write is a single assignment of a complete value.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Personal paragraph first, then retrieved documents joined by single spaces.
fn assemble_context(personal_context: &str, documents: &[&str]) -> String {
    let personal_context = personal_context.trim();
    if documents.is_empty() {
        personal_context.to_string()
    } else {
        format!("{personal_context} {}", documents.join(" "))
    }
}

fn preview(query: &str) -> String {
    query.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Semaphore;

    use crate::retrieval::prompts::DEFAULT_PERSONAL_CONTEXT;

    /// Deterministic provider: each text gets the vector of the first pattern it
    /// contains, else `default`. Batches (len > 1) and single queries pass
    /// through separate gates so tests can hold either one open.
    struct StubEmbedder {
        patterns: Vec<(&'static str, Vec<f32>)>,
        default: Vec<f32>,
        fail_batches: AtomicBool,
        fail_queries: AtomicBool,
        query_delay: Option<Duration>,
        batch_gate: Semaphore,
        query_gate: Semaphore,
        query_calls: AtomicUsize,
        last_query: std::sync::Mutex<Option<String>>,
    }

    impl StubEmbedder {
        fn new(patterns: Vec<(&'static str, Vec<f32>)>, default: Vec<f32>) -> Self {
            Self {
                patterns,
                default,
                fail_batches: AtomicBool::new(false),
                fail_queries: AtomicBool::new(false),
                query_delay: None,
                batch_gate: Semaphore::new(1_000),
                query_gate: Semaphore::new(1_000),
                query_calls: AtomicUsize::new(0),
                last_query: std::sync::Mutex::new(None),
            }
        }

        fn uniform() -> Self {
            Self::new(vec![], vec![1.0, 0.0])
        }

        fn gated(mut self) -> Self {
            self.batch_gate = Semaphore::new(0);
            self.query_gate = Semaphore::new(0);
            self
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            self.patterns
                .iter()
                .find(|(pattern, _)| text.contains(pattern))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| self.default.clone())
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let is_query = batch.len() == 1;
            if is_query {
                self.query_calls.fetch_add(1, Ordering::SeqCst);
                *self.last_query.lock().unwrap() = Some(batch[0].clone());
                self.query_gate.acquire().await.unwrap().forget();
                if let Some(delay) = self.query_delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail_queries.load(Ordering::SeqCst) {
                    return Err(EmbeddingError::Malformed("query failure".to_string()));
                }
            } else {
                self.batch_gate.acquire().await.unwrap().forget();
                if self.fail_batches.load(Ordering::SeqCst) {
                    return Err(EmbeddingError::Api {
                        status: 503,
                        message: "unavailable".to_string(),
                    });
                }
            }
            Ok(batch.iter().map(|t| self.vector_for(t)).collect())
        }
    }

    fn engine_with(provider: Arc<StubEmbedder>) -> Arc<RetrievalEngine> {
        Arc::new(RetrievalEngine::new(provider, RetrievalConfig::default()))
    }

    fn record(value: serde_json::Value) -> ResumeRecord {
        serde_json::from_value(value).unwrap()
    }

    fn record_a() -> ResumeRecord {
        record(json!({
            "experience": [{"title": "ML Engineer", "company": "Acme"}],
            "skills": {"Languages": ["Rust"]}
        }))
    }

    fn record_b() -> ResumeRecord {
        record(json!({
            "experience": [{"title": "Data Scientist", "company": "Globex"}],
            "projects": [{"title": "Chess engine"}]
        }))
    }

    fn five_doc_record() -> ResumeRecord {
        record(json!({
            "experience": [{"company": "Acme"}, {"company": "Globex"}],
            "projects": [{"title": "Chess engine"}, {"title": "Resume bot"}],
            "core_competencies": ["MLOps"]
        }))
    }

    async fn wait_for_query_call(provider: &StubEmbedder, count: usize) {
        while provider.query_calls.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_new_engine_is_not_ready() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        assert!(!engine.is_ready());
        assert_eq!(engine.status().phase, EnginePhase::Uninitialized);
        assert_eq!(engine.get_relevant_context("hi", "").await, NOT_READY_CONTEXT);
        assert!(engine.search_documents("hi", 5).await.is_empty());
        assert_eq!(
            engine.get_section_context("education"),
            section_not_found("education")
        );
    }

    #[tokio::test]
    async fn test_initialize_publishes_parallel_structures() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        let count = engine.initialize(&five_doc_record()).await.unwrap();

        assert_eq!(count, 5);
        assert!(engine.is_ready());
        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.documents.len(), snapshot.index.len());
        assert_eq!(engine.documents(), synthesize(&five_doc_record()));

        let status = engine.status();
        assert_eq!(status.phase, EnginePhase::Ready);
        assert_eq!(status.document_count, 5);
        assert_eq!(status.dimension, Some(2));
        assert!(status.last_built_at.is_some());
    }

    #[tokio::test]
    async fn test_initialize_empty_record_fails_not_ready() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        let err = engine.initialize(&ResumeRecord::default()).await.unwrap_err();

        assert!(matches!(err, RetrievalError::EmptyDocumentSet));
        assert!(!engine.is_ready());
        let status = engine.status();
        assert_eq!(status.phase, EnginePhase::Failed);
        assert!(status.last_error.unwrap().contains("no documents"));
    }

    #[tokio::test]
    async fn test_initialize_provider_failure_stays_not_ready() {
        let provider = Arc::new(StubEmbedder::uniform());
        provider.fail_batches.store(true, Ordering::SeqCst);
        let engine = engine_with(provider);

        let err = engine.initialize(&record_a()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_initialize_rejects_inconsistent_dimensions() {
        let provider = Arc::new(StubEmbedder::new(vec![("Acme", vec![1.0, 0.0])], vec![1.0, 0.0, 0.0]));
        let engine = engine_with(provider);

        let err = engine.initialize(&record_a()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Index(IndexError::DimensionMismatch { .. })));
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn test_failed_refresh_does_not_serve_old_index() {
        let provider = Arc::new(StubEmbedder::uniform());
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        provider.fail_batches.store(true, Ordering::SeqCst);
        assert!(!engine.refresh(&record_b()).await);
        assert!(!engine.is_ready());
        assert!(engine.documents().is_empty());
        assert_eq!(engine.get_relevant_context("Acme", "").await, NOT_READY_CONTEXT);
    }

    #[tokio::test]
    async fn test_refresh_replaces_documents() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        engine.initialize(&record_a()).await.unwrap();

        assert!(engine.refresh(&record_b()).await);
        assert_eq!(engine.documents(), synthesize(&record_b()));
    }

    #[tokio::test]
    async fn test_refresh_reports_not_ready_while_rebuilding() {
        let provider = Arc::new(StubEmbedder::uniform().gated());
        provider.batch_gate.add_permits(1);
        provider.query_gate.add_permits(100);
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        let refreshing = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh(&record_b()).await })
        };
        while engine.is_ready() {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.status().phase, EnginePhase::Rebuilding);
        assert_eq!(engine.get_relevant_context("Acme", "").await, NOT_READY_CONTEXT);
        assert!(engine.search_documents("Acme", 5).await.is_empty());

        provider.batch_gate.add_permits(1);
        assert!(refreshing.await.unwrap());
        assert_eq!(engine.documents(), synthesize(&record_b()));
    }

    #[tokio::test]
    async fn test_refresh_completes_when_caller_is_dropped() {
        let provider = Arc::new(StubEmbedder::uniform().gated());
        provider.batch_gate.add_permits(1);
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        let caller = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh(&record_b()).await })
        };
        while engine.is_ready() {
            tokio::task::yield_now().await;
        }
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        provider.batch_gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !engine.is_ready() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("rebuild never published after caller was dropped");

        assert_eq!(engine.status().phase, EnginePhase::Ready);
        assert_eq!(engine.documents(), synthesize(&record_b()));
    }

    #[tokio::test]
    async fn test_in_flight_query_sees_only_old_snapshot() {
        let provider = Arc::new(StubEmbedder::uniform().gated());
        provider.batch_gate.add_permits(1);
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        let query = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.get_relevant_context("Where did he work?", "").await })
        };
        wait_for_query_call(&provider, 1).await;

        provider.batch_gate.add_permits(1);
        assert!(engine.refresh(&record_b()).await);

        provider.query_gate.add_permits(1);
        let context = query.await.unwrap();
        assert!(context.contains("Acme"), "context was {context}");
        assert!(!context.contains("Globex"));
    }

    #[tokio::test]
    async fn test_superseded_refresh_does_not_publish() {
        let provider = Arc::new(StubEmbedder::uniform().gated());
        provider.batch_gate.add_permits(1);
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh(&record_a()).await })
        };
        while engine.is_ready() {
            tokio::task::yield_now().await;
        }
        let second = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh(&record_b()).await })
        };
        while engine.requested.load(Ordering::SeqCst) < 3 {
            tokio::task::yield_now().await;
        }

        provider.batch_gate.add_permits(2);
        first.await.unwrap();
        assert!(second.await.unwrap());
        assert_eq!(engine.documents(), synthesize(&record_b()));
    }

    #[tokio::test]
    async fn test_context_threshold_filters_unrelated_documents() {
        let provider = Arc::new(StubEmbedder::new(
            vec![
                ("What degree", vec![0.82, 0.10, 0.563_559]),
                ("Education:", vec![1.0, 0.0, 0.0]),
                ("Skills in", vec![0.0, 1.0, 0.0]),
            ],
            vec![0.0, 0.0, 1.0],
        ));
        let engine = engine_with(provider);
        engine
            .initialize(&record(json!({
                "education": [{"degree": "MSc", "field": "Artificial Intelligence"}],
                "skills": {"Languages": ["Rust"]}
            })))
            .await
            .unwrap();

        let context = engine.get_relevant_context("What degree does he have?", "").await;
        assert!(context.starts_with(DEFAULT_PERSONAL_CONTEXT));
        assert!(context.contains("MSc in Artificial Intelligence"));
        assert!(!context.contains("Skills in Languages"));
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_excluded() {
        let provider = Arc::new(StubEmbedder::new(
            vec![
                ("probe", vec![0.5, 0.5, 0.5, 0.5]),
                ("Acme", vec![1.0, 0.0, 0.0, 0.0]),
            ],
            vec![0.0, 1.0, 0.0, 0.0],
        ));
        let config = RetrievalConfig {
            similarity_threshold: 0.5,
            ..RetrievalConfig::default()
        };
        let engine = RetrievalEngine::new(provider.clone(), config);
        engine.initialize(&record_a()).await.unwrap();

        // Both documents score exactly 0.5 against the probe.
        assert_eq!(
            engine.get_relevant_context("probe", "").await,
            DEFAULT_PERSONAL_CONTEXT
        );

        let lenient = RetrievalEngine::new(
            provider,
            RetrievalConfig {
                similarity_threshold: 0.499,
                ..RetrievalConfig::default()
            },
        );
        lenient.initialize(&record_a()).await.unwrap();
        let context = lenient.get_relevant_context("probe", "").await;
        assert!(context.contains("Acme"));
        assert!(context.contains("Skills in Languages"));
    }

    #[tokio::test]
    async fn test_context_never_empty_when_ready() {
        let provider = Arc::new(StubEmbedder::new(
            vec![("unrelated", vec![0.0, 1.0])],
            vec![1.0, 0.0],
        ));
        let engine = engine_with(provider);
        engine.initialize(&record_a()).await.unwrap();

        let context = engine.get_relevant_context("unrelated question", "").await;
        assert_eq!(context, DEFAULT_PERSONAL_CONTEXT);
    }

    #[tokio::test]
    async fn test_context_respects_top_k_and_score_order() {
        let provider = Arc::new(StubEmbedder::new(
            vec![
                ("question", vec![1.0, 0.0]),
                ("Acme", vec![0.6, 0.8]),
                ("Chess", vec![0.8, 0.6]),
                ("Globex", vec![1.0, 0.0]),
            ],
            vec![0.0, 1.0],
        ));
        let engine = engine_with(provider);
        engine.initialize(&five_doc_record()).await.unwrap();

        let context = engine.get_relevant_context("question", "").await;
        let globex = context.find("Globex").unwrap();
        let chess = context.find("Chess").unwrap();
        let acme = context.find("Acme").unwrap();
        assert!(globex < chess && chess < acme, "context was {context}");
        assert!(!context.contains("MLOps"), "only top 3 are considered");
    }

    #[tokio::test]
    async fn test_side_context_precedes_query() {
        let provider = Arc::new(StubEmbedder::uniform());
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        engine.get_relevant_context("What is this?", "Built pipelines").await;
        assert_eq!(
            provider.last_query.lock().unwrap().as_deref(),
            Some("Built pipelines What is this?")
        );

        engine.get_relevant_context("Plain", "  ").await;
        assert_eq!(provider.last_query.lock().unwrap().as_deref(), Some("Plain"));
    }

    #[tokio::test]
    async fn test_query_failure_returns_fallback() {
        let provider = Arc::new(StubEmbedder::uniform());
        let engine = engine_with(Arc::clone(&provider));
        engine.initialize(&record_a()).await.unwrap();

        provider.fail_queries.store(true, Ordering::SeqCst);
        assert_eq!(engine.get_relevant_context("Acme", "").await, QUERY_FAILURE_CONTEXT);
        assert!(engine.search_documents("Acme", 5).await.is_empty());
        assert!(engine.is_ready(), "query failures do not affect readiness");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout_returns_fallback() {
        let mut stub = StubEmbedder::uniform();
        stub.query_delay = Some(Duration::from_secs(60));
        let engine = RetrievalEngine::new(
            Arc::new(stub),
            RetrievalConfig {
                query_timeout: Duration::from_secs(1),
                ..RetrievalConfig::default()
            },
        );
        engine.initialize(&record_a()).await.unwrap();

        assert_eq!(engine.get_relevant_context("Acme", "").await, QUERY_FAILURE_CONTEXT);
    }

    #[tokio::test]
    async fn test_search_documents_returns_limit_in_score_order() {
        let provider = Arc::new(StubEmbedder::new(
            vec![
                ("projects", vec![1.0, 0.0]),
                ("Chess", vec![0.9, 0.1]),
                ("Resume bot", vec![0.7, 0.3]),
            ],
            vec![0.0, 1.0],
        ));
        let engine = engine_with(provider);
        engine.initialize(&five_doc_record()).await.unwrap();

        let hits = engine.search_documents("projects", 2).await;
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].document.contains("Chess"));
        assert_eq!(hits[0].index, 2);
        assert_eq!(hits[1].index, 3);
    }

    #[tokio::test]
    async fn test_search_documents_skips_threshold() {
        let provider = Arc::new(StubEmbedder::new(
            vec![("orthogonal", vec![0.0, 1.0])],
            vec![1.0, 0.0],
        ));
        let engine = engine_with(provider);
        engine.initialize(&five_doc_record()).await.unwrap();

        let hits = engine.search_documents("orthogonal", 10).await;
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.score.abs() < 1e-6));
        let indices: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_section_context_matches_keywords() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        engine
            .initialize(&record(json!({
                "education": [{"degree": "Bachelor's degree", "field": "Physics"}],
                "skills": {"Languages": ["Rust", "Go"]},
                "projects": [{"title": "Chess engine"}]
            })))
            .await
            .unwrap();

        assert_eq!(
            engine.get_section_context("Education"),
            "Education: Bachelor's degree in Physics."
        );
        assert_eq!(
            engine.get_section_context("certifications"),
            section_not_found("certifications")
        );
        assert!(engine.get_section_context("chess").contains("Chess engine"));
    }

    #[tokio::test]
    async fn test_section_context_caps_at_three_in_order() {
        let engine = engine_with(Arc::new(StubEmbedder::uniform()));
        engine
            .initialize(&record(json!({
                "experience": [
                    {"company": "A Corp"}, {"company": "B Corp"},
                    {"company": "C Corp"}, {"company": "D Corp"}
                ]
            })))
            .await
            .unwrap();

        // "work" matches every "Work Experience:" document.
        let context = engine.get_section_context("experience");
        assert!(context.contains("A Corp") && context.contains("B Corp") && context.contains("C Corp"));
        assert!(!context.contains("D Corp"));
        assert!(context.find("A Corp").unwrap() < context.find("C Corp").unwrap());
    }

    #[test]
    fn test_assemble_context() {
        assert_eq!(assemble_context("  Intro. ", &[]), "Intro.");
        assert_eq!(assemble_context("Intro.", &["a", "b"]), "Intro. a b");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let query = "é".repeat(60);
        assert_eq!(preview(&query).chars().count(), 50);
    }
}
