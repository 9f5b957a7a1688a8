//! Model download, caching and load management.

mod catalog;
mod error;
mod hub;
mod loader;
mod manager;
mod progress;

pub use catalog::{ModelCatalog, ModelKind, ModelSource, ModelSpec};
pub use error::ModelError;
pub use hub::{DEFAULT_HUB_URL, HubLoader};
pub use loader::{DiskState, ModelContainer, ModelLoader, ModelLocation};
pub use manager::{DEFAULT_MAX_LOADED_MODELS, ModelManager};
pub use progress::{DownloadStatus, DownloadTracker, ProgressEvent, ProgressSink};
