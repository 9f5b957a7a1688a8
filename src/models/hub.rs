//! On-device weights fetched from a HuggingFace-style file host.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, header};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::{
    DiskState, ModelContainer, ModelError, ModelLoader, ModelLocation, ModelSource, ModelSpec,
    ProgressEvent, ProgressSink,
};

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

const PART_SUFFIX: &str = ".part";

/// Downloads model files into `<models_dir>/<model name>/`.
///
/// Each file streams into a `.part` sibling which is renamed once complete,
/// so a file without the suffix is always whole. Interrupted downloads resume
/// with an HTTP range request.
pub struct HubLoader {
    client: Client,
    base_url: String,
    models_dir: PathBuf,
}

impl HubLoader {
    pub fn new(base_url: impl Into<String>, models_dir: impl Into<PathBuf>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("cliplens/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models_dir: models_dir.into(),
        }
    }

    pub fn model_dir(&self, spec: &ModelSpec) -> PathBuf {
        self.models_dir.join(spec.name.replace(['/', '\\', ':'], "_"))
    }

    async fn fetch_file(
        &self,
        repo: &str,
        file: &str,
        dir: &Path,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), ModelError> {
        let dest = dir.join(file);
        if let Ok(meta) = fs::metadata(&dest).await {
            tracing::debug!(file, "already on disk");
            progress(ProgressEvent {
                file_id: file.to_string(),
                completed: meta.len(),
                total: meta.len(),
            });
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let part = part_path(&dest);
        let offset = fs::metadata(&part).await.map(|m| m.len()).unwrap_or(0);

        let url = format!("{}/{repo}/resolve/main/{file}", self.base_url);
        let mut request = self.client.get(&url);
        if offset > 0 {
            request = request.header(header::RANGE, format!("bytes={offset}-"));
        }

        tracing::info!(file, url = %url, offset, "downloading model file");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Download(format!(
                "HTTP {status} while downloading {file}"
            )));
        }

        let resumed = status == StatusCode::PARTIAL_CONTENT;
        let mut completed = if resumed { offset } else { 0 };
        let total = response
            .content_length()
            .map_or(0, |len| len + completed);

        let mut out = if resumed {
            OpenOptions::new().append(true).open(&part).await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&part)
                .await?
        };

        progress(ProgressEvent {
            file_id: file.to_string(),
            completed,
            total,
        });

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    out.flush().await?;
                    return Err(ModelError::Cancelled);
                }
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            completed += chunk.len() as u64;
            progress(ProgressEvent {
                file_id: file.to_string(),
                completed,
                total: total.max(completed),
            });
        }

        out.flush().await?;
        drop(out);
        fs::rename(&part, &dest).await?;

        progress(ProgressEvent {
            file_id: file.to_string(),
            completed,
            total: completed,
        });
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for HubLoader {
    async fn probe(&self, spec: &ModelSpec) -> DiskState {
        let ModelSource::Hub { files, .. } = &spec.source else {
            return DiskState::Missing;
        };
        let dir = self.model_dir(spec);

        let mut complete = 0;
        let mut partial = false;
        for file in files {
            let dest = dir.join(file);
            if fs::try_exists(&dest).await.unwrap_or(false) {
                complete += 1;
            } else if fs::try_exists(part_path(&dest)).await.unwrap_or(false) {
                partial = true;
            }
        }

        if !files.is_empty() && complete == files.len() {
            DiskState::Complete
        } else if complete > 0 || partial {
            DiskState::Partial
        } else {
            DiskState::Missing
        }
    }

    async fn load(
        &self,
        spec: &ModelSpec,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<ModelContainer, ModelError> {
        let ModelSource::Hub { repo, files } = &spec.source else {
            return Err(ModelError::Download(format!(
                "{} is not a downloadable model",
                spec.name
            )));
        };

        if let Some(unsafe_file) = files.iter().find(|f| !is_safe_file_path(f)) {
            return Err(ModelError::Download(format!(
                "unsafe file path in model manifest: '{unsafe_file}'"
            )));
        }

        let dir = self.model_dir(spec);
        fs::create_dir_all(&dir).await?;

        for file in files {
            if cancel.is_cancelled() {
                return Err(ModelError::Cancelled);
            }
            self.fetch_file(repo, file, &dir, &progress, &cancel).await?;
        }

        Ok(ModelContainer {
            spec: spec.clone(),
            location: ModelLocation::Directory(dir),
        })
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Rejects absolute paths and any `..` component.
fn is_safe_file_path(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
