//! Store adapter contract.
//!
//! The replica depends on the durable store only through [`PolicyStore`]:
//! full scan, insert, delete by id, and a resubscribable change stream. Any
//! backend offering these with per-identifier commit ordering is valid.

mod memory;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use ladon_core::error::Result;
use ladon_core::{WireChange, WireRecord};

pub use memory::MemoryStore;

/// Open-ended change stream. An `Err` item or the end of the stream means the
/// subscription is gone; callers resubscribe to resume.
pub type ChangeStream = BoxStream<'static, Result<WireChange>>;

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Full, unordered snapshot of durable state.
    async fn scan_all(&self) -> Result<Vec<WireRecord>>;

    /// Create one record.
    async fn insert(&self, record: WireRecord) -> Result<()>;

    /// Delete by id. A missing id is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Subscribe to changes committed after this call.
    async fn subscribe_changes(&self) -> Result<ChangeStream>;
}
