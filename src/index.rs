/// Knowledge Index Singleton (C1)
///
/// Owns the lazy, thread-safe lifecycle of the embedding model + vector
/// index described in spec §4.1 and §6. This crate does not implement the
/// embedding model or the index builder (out of scope, §1) — it implements
/// the singleton lifecycle around an abstract [`KnowledgeIndex`] trait, and
/// ships a [`NullIndex`] so the server has something to construct when no
/// real index is wired in (used by tests and by S5's "index files absent"
/// scenario).
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub source: Option<Vec<String>>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub metadata: SearchMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub source: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub ready: bool,
    pub document_count: usize,
    pub dimensions: usize,
    pub loaded_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("knowledge index unavailable")]
    Unavailable,
    #[error("invalid search parameter: {0}")]
    InvalidParam(String),
}

/// The external interface consumed (never implemented) by the protocol
/// core, per spec §6. Implementations must tolerate concurrent callers
/// (I4: "at most one constructor thread; all other callers observe a
/// fully-constructed handle" is enforced one level up, by [`IndexHandle`],
/// not by implementations of this trait).
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filters: SearchFilters,
    ) -> Result<Vec<SearchHit>, IndexError>;

    fn status(&self) -> IndexStatus;
}

/// Degrade target used when the backing index files are absent. `search`
/// always fails with `IndexUnavailable`; `status().ready` is always false.
/// This is a real, documented implementation choice (not a test mock): it
/// is what `IndexHandle` falls back to when construction fails, so the
/// process can still serve health, OAuth, and non-search tools per §4.1.
pub struct NullIndex;

#[async_trait]
impl KnowledgeIndex for NullIndex {
    async fn search(
        &self,
        _query: &str,
        _k: usize,
        _filters: SearchFilters,
    ) -> Result<Vec<SearchHit>, IndexError> {
        Err(IndexError::Unavailable)
    }

    fn status(&self) -> IndexStatus {
        IndexStatus {
            ready: false,
            document_count: 0,
            dimensions: 0,
            loaded_at: None,
        }
    }
}

/// Function pointer the entrypoint supplies to attempt construction of a
/// real index (mmap the on-disk index, load the embedding model). Kept as
/// a trait object factory rather than a concrete type so tests can supply
/// a fake constructor without touching disk.
pub type IndexFactory =
    Box<dyn Fn() -> Result<Arc<dyn KnowledgeIndex>, String> + Send + Sync>;

/// Process-scoped singleton wrapper. Construction is lazy and idempotent:
/// the first caller of [`IndexHandle::get_or_init`] runs `factory`;
/// concurrent callers block on the same one-shot completion (`OnceCell`)
/// and then share the result (I1, I4). There is no eviction, reload, or
/// hot-swap (§4.1: "redeploys replace the process").
pub struct IndexHandle {
    cell: OnceCell<Arc<dyn KnowledgeIndex>>,
    factory: IndexFactory,
}

pub type SharedIndex = Arc<IndexHandle>;

impl IndexHandle {
    pub fn new(factory: IndexFactory) -> SharedIndex {
        Arc::new(Self {
            cell: OnceCell::new(),
            factory,
        })
    }

    /// Construct (once) or return the already-constructed handle. Never
    /// returns an error: a failed load degrades to [`NullIndex`] so the
    /// rest of the server keeps working, per §4.1's "fails with
    /// `IndexUnavailable`... the process must still serve health, OAuth,
    /// and non-search tools."
    pub async fn get_or_init(&self) -> Arc<dyn KnowledgeIndex> {
        self.cell
            .get_or_init(|| async {
                match (self.factory)() {
                    Ok(index) => {
                        info!("knowledge index loaded");
                        index
                    }
                    Err(err) => {
                        warn!(error = %err, "knowledge index unavailable, degrading");
                        Arc::new(NullIndex) as Arc<dyn KnowledgeIndex>
                    }
                }
            })
            .await
            .clone()
    }

    /// Invoked once by the entrypoint so the first real query is fast.
    /// Preload failures log and degrade; they never abort startup (§4.1).
    pub async fn preload(&self) {
        let started = Instant::now();
        let index = self.get_or_init().await;
        let status = index.status();
        if status.ready {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "index preload complete");
        } else {
            warn!("index preload finished with index not ready; search tools will degrade");
        }
    }

    pub async fn status(&self) -> IndexStatus {
        self.get_or_init().await.status()
    }
}
