use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    DiskState, DownloadStatus, DownloadTracker, ModelCatalog, ModelContainer, ModelError,
    ModelLoader, ModelSpec, ProgressEvent, ProgressSink,
};

pub const DEFAULT_MAX_LOADED_MODELS: usize = 2;

type LoadResult = Result<Arc<ModelContainer>, ModelError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Loaded containers, least recently used first.
struct LoadedModels {
    capacity: usize,
    order: VecDeque<String>,
    containers: HashMap<String, Arc<ModelContainer>>,
}

impl LoadedModels {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            containers: HashMap::new(),
        }
    }

    fn get(&mut self, name: &str) -> Option<Arc<ModelContainer>> {
        let container = self.containers.get(name).cloned()?;
        self.touch(name);
        Some(container)
    }

    fn insert(&mut self, container: Arc<ModelContainer>) {
        let name = container.name().to_string();
        self.containers.insert(name.clone(), container);
        self.touch(&name);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                tracing::debug!(model = %evicted, "evicting loaded model");
                self.containers.remove(&evicted);
            }
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        self.order.retain(|n| n != name);
        self.containers.remove(name).is_some()
    }

    fn touch(&mut self, name: &str) {
        self.order.retain(|n| n != name);
        self.order.push_back(name.to_string());
    }
}

struct Inner {
    loader: Arc<dyn ModelLoader>,
    catalog: ModelCatalog,
    loaded: Mutex<LoadedModels>,
    in_flight: Mutex<HashMap<String, SharedLoad>>,
    readiness: RwLock<HashMap<String, bool>>,
    status: watch::Sender<DownloadStatus>,
    cancel: Mutex<CancellationToken>,
}

/// Owns loaded model containers and tracks which models are ready on disk.
///
/// Concurrent loads of one model share a single underlying load; every caller
/// receives the same container (or the same error).
#[derive(Clone)]
pub struct ModelManager {
    inner: Arc<Inner>,
}

impl ModelManager {
    pub fn new(loader: Arc<dyn ModelLoader>, catalog: ModelCatalog) -> Self {
        Self::with_capacity(loader, catalog, DEFAULT_MAX_LOADED_MODELS)
    }

    pub fn with_capacity(
        loader: Arc<dyn ModelLoader>,
        catalog: ModelCatalog,
        max_loaded_models: usize,
    ) -> Self {
        let (status, _) = watch::channel(DownloadStatus::default());
        Self {
            inner: Arc::new(Inner {
                loader,
                catalog,
                loaded: Mutex::new(LoadedModels::new(max_loaded_models)),
                in_flight: Mutex::new(HashMap::new()),
                readiness: RwLock::new(HashMap::new()),
                status,
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.inner.catalog
    }

    /// Probes every catalog model and caches the answers.
    pub async fn refresh_readiness(&self) {
        for spec in self.inner.catalog.specs() {
            self.refresh_model_readiness(spec).await;
        }
    }

    async fn refresh_model_readiness(&self, spec: &ModelSpec) -> DiskState {
        let state = self.inner.loader.probe(spec).await;
        self.inner
            .readiness
            .write()
            .await
            .insert(spec.name.clone(), state == DiskState::Complete);
        state
    }

    /// Cached readiness; never touches the disk.
    pub async fn is_ready(&self, name: &str) -> bool {
        self.inner
            .readiness
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.inner.loaded.lock().await.containers.contains_key(name)
    }

    pub fn status(&self) -> DownloadStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadStatus> {
        self.inner.status.subscribe()
    }

    /// Returns a loaded container, downloading and loading it if needed.
    pub async fn load(&self, name: &str) -> LoadResult {
        let spec = self.inner.catalog.get(name)?.clone();

        if let Some(container) = self.inner.loaded.lock().await.get(name) {
            return Ok(container);
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock().await;
            // A load may have finished between the two locks.
            if let Some(container) = self.inner.loaded.lock().await.get(name) {
                return Ok(container);
            }
            in_flight
                .entry(spec.name.clone())
                .or_insert_with(|| self.start_load(spec))
                .clone()
        };

        shared.await
    }

    /// Starts loading `name` in the background.
    pub fn download_model(&self, name: &str) -> Result<JoinHandle<LoadResult>, ModelError> {
        self.inner.catalog.get(name)?;
        let manager = self.clone();
        let name = name.to_string();
        Ok(tokio::spawn(async move { manager.load(&name).await }))
    }

    /// Cancels every download in progress.
    ///
    /// Loads observe the cancellation at their next step boundary and fail with
    /// [`ModelError::Cancelled`]; tracking state is reset immediately.
    pub async fn cancel_download(&self) {
        {
            let mut cancel = self.inner.cancel.lock().await;
            cancel.cancel();
            *cancel = CancellationToken::new();
        }
        self.inner.status.send_replace(DownloadStatus::default());
        tracing::info!("model download cancelled");
    }

    pub async fn unload(&self, name: &str) -> bool {
        self.inner.loaded.lock().await.remove(name)
    }

    pub async fn unload_all(&self) {
        let mut loaded = self.inner.loaded.lock().await;
        loaded.containers.clear();
        loaded.order.clear();
    }

    fn start_load(&self, spec: ModelSpec) -> SharedLoad {
        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run_load(spec).await });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(ModelError::Runtime(format!("load task failed: {e}"))))
        }
        .boxed()
        .shared()
    }

    async fn run_load(&self, spec: ModelSpec) -> LoadResult {
        let name = spec.name.clone();
        // Taken before the probe so a cancel issued while probing still applies.
        let cancel = self.inner.cancel.lock().await.child_token();
        let fresh = self.inner.loader.probe(&spec).await == DiskState::Missing;

        let started = {
            let _guard = self.inner.cancel.lock().await;
            let started = !cancel.is_cancelled();
            if started && fresh {
                self.inner.status.send_replace(DownloadStatus {
                    is_downloading: true,
                    downloading_model_name: Some(name.clone()),
                    ..DownloadStatus::default()
                });
            }
            started
        };

        let result = if started {
            tracing::info!(model = %name, fresh, "loading model");
            let progress = self.progress_sink(&name, fresh);
            self.inner.loader.load(&spec, progress, cancel).await
        } else {
            Err(ModelError::Cancelled)
        };

        if fresh {
            self.inner.status.send_if_modified(|status| {
                let ours = status.downloading_model_name.as_deref() == Some(name.as_str());
                if ours {
                    *status = DownloadStatus::default();
                }
                ours
            });
        }

        let outcome = match result {
            Ok(container) => {
                let container = Arc::new(container);
                self.inner.loaded.lock().await.insert(Arc::clone(&container));
                self.inner.readiness.write().await.insert(name.clone(), true);
                tracing::info!(model = %name, "model ready");
                Ok(container)
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(model = %name, "model load cancelled");
                } else {
                    tracing::warn!(model = %name, error = %e, "model load failed");
                }
                let state = self.refresh_model_readiness(&spec).await;
                tracing::debug!(model = %name, ?state, "readiness after failed load");
                Err(e)
            }
        };

        self.inner.in_flight.lock().await.remove(&name);
        outcome
    }

    fn progress_sink(&self, name: &str, publish: bool) -> ProgressSink {
        let tracker = Arc::new(std::sync::Mutex::new(DownloadTracker::new(Instant::now())));
        let status = self.inner.status.clone();
        let name = name.to_string();

        Arc::new(move |event: ProgressEvent| {
            let mut tracker = tracker.lock().unwrap_or_else(PoisonError::into_inner);
            let new_file = tracker.record(&event);
            let now = Instant::now();
            if publish && tracker.should_publish(now, new_file) {
                let snapshot = tracker.status(&name, now);
                status.send_if_modified(|current| {
                    // A cancelled download must not resurrect its status.
                    let ours = current.downloading_model_name.as_deref() == Some(name.as_str());
                    if ours {
                        *current = snapshot;
                    }
                    ours
                });
            }
        })
    }
}
