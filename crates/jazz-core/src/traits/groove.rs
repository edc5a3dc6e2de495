//! Groove discovery seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GrooveContent, GrooveMetadata};

/// Supplies groove definitions from wherever they live on disk.
///
/// Jazz never parses groove files itself; it asks the provider.
#[async_trait]
pub trait GrooveProvider: Send + Sync {
    /// Metadata only. Ok(None) when no groove has this name.
    async fn get(&self, name: &str) -> Result<Option<GrooveMetadata>>;

    /// Metadata plus prompt content. Ok(None) when no groove has this name.
    async fn load(&self, name: &str) -> Result<Option<GrooveContent>>;
}
