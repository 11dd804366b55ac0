//! Locate the shop directory and open its order desk.

use anyhow::{Context as _, Result};
use orderdesk_core::clock::SystemClock;
use orderdesk_core::config::{
    self, PROJECT_DIR, ProjectConfig, RemoteTarget, resolve_data_dir, resolve_token,
};
use orderdesk_core::error::ErrorCode;
use orderdesk_core::lock::StoreLock;
use orderdesk_core::storage::FileStorage;
use orderdesk_core::sync::remote::{
    GitHubContents, HttpSnapshotSource, RepoFile, SnapshotSource,
};
use orderdesk_core::{OrderDesk, OrderStore, SyncReport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub type Desk = OrderDesk<FileStorage, SystemClock>;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("no {PROJECT_DIR}/ directory found in {} or any parent", start.display())]
    NotInitialized { start: PathBuf },
    #[error("no writable remote configured")]
    RemoteNotConfigured,
}

impl ProjectError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::RemoteNotConfigured => ErrorCode::RemoteNotConfigured,
        }
    }
}

#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

/// Walk up from `start` to the nearest directory containing `.orderdesk/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(PROJECT_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

impl Project {
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_project_root(start).ok_or_else(|| ProjectError::NotInitialized {
            start: start.to_path_buf(),
        })?;
        let config = config::load_project_config(&root)?;
        debug!(root = %root.display(), "project found");
        Ok(Self { root, config })
    }

    pub fn data_dir(&self) -> PathBuf {
        resolve_data_dir(&self.root, &self.config.storage)
    }

    /// Lock the data directory, load the store, and run the start-up sweep.
    ///
    /// The returned lock must be held for as long as the desk is used.
    pub fn open_desk(&self, token_flag: Option<&str>) -> Result<(StoreLock, Desk)> {
        let data_dir = self.data_dir();
        let lock = StoreLock::acquire(&data_dir, LOCK_TIMEOUT)?;
        let store = OrderStore::open(FileStorage::new(&data_dir), SystemClock)
            .with_context(|| format!("Failed to load orders from {}", data_dir.display()))?;
        let desk = OrderDesk::open(store, self.config.retention.policy())
            .context("Start-up retention sweep failed")?;
        let desk = self.attach_remote(desk, token_flag)?;
        Ok((lock, desk))
    }

    /// Whether any remote is configured.
    pub fn has_remote(&self) -> Result<bool> {
        Ok(self.config.remote.target()?.is_some())
    }

    /// Whether the configured remote accepts pushes.
    pub fn remote_is_writable(&self) -> Result<bool> {
        Ok(matches!(
            self.config.remote.target()?,
            Some(RemoteTarget::Repo(_))
        ))
    }

    fn contents(&self, file: RepoFile, token_flag: Option<&str>) -> GitHubContents {
        let remote = &self.config.remote;
        GitHubContents::new(
            file,
            resolve_token(token_flag.map(str::to_string)),
            remote.commit_message.clone(),
        )
        .with_timeout(remote.timeout())
    }

    /// The configured source, built without touching the data directory.
    pub fn remote_source(&self, token_flag: Option<&str>) -> Result<Option<Box<dyn SnapshotSource>>> {
        let timeout = self.config.remote.timeout();
        Ok(self.config.remote.target()?.map(|target| -> Box<dyn SnapshotSource> {
            match target {
                RemoteTarget::Url(url) => Box::new(HttpSnapshotSource::new(url).with_timeout(timeout)),
                RemoteTarget::Repo(file) => Box::new(self.contents(file, token_flag)),
            }
        }))
    }

    fn attach_remote(&self, desk: Desk, token_flag: Option<&str>) -> Result<Desk> {
        let timeout = self.config.remote.timeout();
        Ok(match self.config.remote.target()? {
            None => desk,
            Some(RemoteTarget::Url(url)) => {
                desk.with_source(HttpSnapshotSource::new(url).with_timeout(timeout))
            }
            Some(RemoteTarget::Repo(file)) => {
                let contents = self.contents(file, token_flag);
                desk.with_source(contents.clone()).with_sink(contents)
            }
        })
    }

    /// Pull, merge and optionally push, holding the data-directory lock only
    /// for the merge.
    ///
    /// The fetch happens before the lock is taken and the push after it is
    /// released, so a slow remote never blocks other `od` commands.
    pub fn sync(&self, token_flag: Option<&str>, push: bool) -> Result<SyncReport> {
        let fetched = self
            .remote_source(token_flag)?
            .map(|source| source.fetch());
        let (lock, desk) = self.open_desk(token_flag)?;
        let mut report = desk
            .pull(fetched)
            .context("Merged orders could not be saved")?;
        lock.release();
        if push {
            desk.push_after(&mut report);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_root_from_nested_directory() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).expect("project dir");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("nested");
        assert_eq!(find_project_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn remote_kinds_are_told_apart() {
        let mut project = Project {
            root: PathBuf::from("/shop"),
            config: ProjectConfig::default(),
        };
        assert!(!project.has_remote().expect("no remote"));
        assert!(project.remote_source(None).expect("no remote").is_none());

        project.config.remote.url = Some("http://127.0.0.1:9/orders.json".into());
        assert!(project.has_remote().expect("url remote"));
        assert!(!project.remote_is_writable().expect("url remote"));

        project.config.remote.owner = Some("shop".into());
        project.config.remote.repo = Some("pedidos".into());
        project.config.remote.path = Some("orders.json".into());
        assert!(project.remote_is_writable().expect("repo remote"));
    }

    #[test]
    fn missing_project_is_not_initialized() {
        let dir = TempDir::new().expect("tempdir");
        let err = Project::discover(dir.path()).expect_err("no project");
        let project = err.downcast_ref::<ProjectError>().expect("typed error");
        assert_eq!(project.code(), ErrorCode::NotInitialized);
    }
}
