use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{ModelError, ModelSpec, ProgressSink};

/// What a readiness probe found for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskState {
    Missing,
    Partial,
    Complete,
}

/// Where a loaded model lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    Directory(PathBuf),
    Daemon { endpoint: String },
}

/// A model that is ready for inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContainer {
    pub spec: ModelSpec,
    pub location: ModelLocation,
}

impl ModelContainer {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Fetches model weights and produces containers.
///
/// Implementations must check `cancel` between expensive steps and return
/// [`ModelError::Cancelled`] once it fires.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Inspects local state without transferring anything.
    async fn probe(&self, spec: &ModelSpec) -> DiskState;

    async fn load(
        &self,
        spec: &ModelSpec,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<ModelContainer, ModelError>;
}
