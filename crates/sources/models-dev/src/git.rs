//! Git flavor of the models.dev source.
//!
//! Keeps a shallow checkout of the models.dev repository in the cache
//! directory and copies provider logos out of it after a sync. It
//! contributes no catalog data of its own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::starmap_core::error::Error;
use crate::starmap_source::{FieldAuthority, Source, SourceConfig, SourceType, SyncContext};
use crate::starmap_types::{Model, Provider};

pub const SOURCE_NAME: &str = "models.dev-git";
pub const DEFAULT_REPO: &str = "https://github.com/sst/models.dev.git";

pub struct ModelsDevGitSource {
    repo_url: String,
    checkout_dir: Option<PathBuf>,
    offline: bool,
    git_available: bool,
    ensured: OnceCell<()>,
}

impl Default for ModelsDevGitSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelsDevGitSource {
    pub fn new() -> Self {
        Self {
            repo_url: DEFAULT_REPO.to_string(),
            checkout_dir: None,
            offline: false,
            git_available: false,
            ensured: OnceCell::new(),
        }
    }

    pub fn with_repo(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into();
        self
    }

    fn checkout_dir(&self) -> Result<&Path, Error> {
        self.checkout_dir
            .as_deref()
            .ok_or_else(|| Error::config("models.dev git source not configured"))
    }

    /// Clone the repository on first use, or fast-forward an existing
    /// checkout. Offline runs reuse whatever is on disk.
    async fn ensure_checkout(&self) -> Result<(), Error> {
        let dir = self.checkout_dir()?.to_path_buf();
        let repo_url = self.repo_url.clone();
        let offline = self.offline;
        self.ensured
            .get_or_try_init(|| async move {
                let exists = tokio::fs::metadata(dir.join(".git")).await.is_ok();
                if offline {
                    return if exists {
                        Ok(())
                    } else {
                        Err(Error::config("offline and no models.dev checkout on disk"))
                    };
                }
                let output = if exists {
                    tokio::process::Command::new("git")
                        .arg("-C")
                        .arg(&dir)
                        .args(["pull", "--ff-only", "--quiet"])
                        .output()
                        .await
                } else {
                    if let Some(parent) = dir.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| Error::process(format!("create checkout dir: {e}")))?;
                    }
                    tokio::process::Command::new("git")
                        .args(["clone", "--depth", "1", "--quiet"])
                        .arg(&repo_url)
                        .arg(&dir)
                        .output()
                        .await
                };
                match output {
                    Ok(out) if out.status.success() => Ok(()),
                    Ok(out) => Err(Error::sync(
                        SOURCE_NAME,
                        None,
                        std::io::Error::other(String::from_utf8_lossy(&out.stderr).into_owned()),
                    )),
                    Err(e) => Err(Error::sync(SOURCE_NAME, None, e)),
                }
            })
            .await
            .copied()
    }
}

#[async_trait]
impl Source for ModelsDevGitSource {
    fn source_type(&self) -> SourceType {
        SourceType::ModelsDevGit
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn configure(&mut self, config: &SourceConfig) -> Result<(), Error> {
        let base = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("dev", "agentstation", "starmap")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .ok_or_else(|| Error::config("no cache directory available"))?,
        };
        self.checkout_dir = Some(base.join("models.dev").join("repo"));
        self.offline = config.offline;
        self.git_available = std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.git_available && self.checkout_dir.is_some()
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(Self {
            repo_url: self.repo_url.clone(),
            checkout_dir: self.checkout_dir.clone(),
            offline: self.offline,
            git_available: self.git_available,
            ensured: OnceCell::new(),
        })
    }

    async fn fetch_provider(
        &self,
        _ctx: &SyncContext,
        _provider_id: &str,
    ) -> Result<Option<Provider>, Error> {
        Ok(None)
    }

    async fn fetch_models(
        &self,
        _ctx: &SyncContext,
        _provider_id: &str,
    ) -> Result<Vec<Model>, Error> {
        Ok(Vec::new())
    }

    fn field_authorities(&self) -> Vec<FieldAuthority> {
        Vec::new()
    }

    /// Copy `providers/<id>/logo.svg` files out of the checkout into `dest`
    /// as `<id>.svg`.
    async fn copy_provider_logos(&self, dest: &Path) -> Result<(), Error> {
        self.ensure_checkout().await?;
        let providers_dir = self.checkout_dir()?.join("providers");
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| Error::process(format!("create logo dir: {e}")))?;

        let mut entries = match tokio::fs::read_dir(&providers_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        let mut copied = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let logo = entry.path().join("logo.svg");
            if tokio::fs::metadata(&logo).await.is_ok() {
                let name = entry.file_name();
                let target = dest.join(format!("{}.svg", name.to_string_lossy()));
                if tokio::fs::copy(&logo, &target).await.is_ok() {
                    copied += 1;
                }
            }
        }
        tracing::debug!(copied, dest = %dest.display(), "copied provider logos");
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), Error> {
        Ok(())
    }
}
