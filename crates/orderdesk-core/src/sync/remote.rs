//! Remote snapshot transport.
//!
//! Two collaborators, both blocking:
//!
//! - [`SnapshotSource`]: fetch a snapshot together with the revision it was
//!   read at. Implemented by [`HttpSnapshotSource`] (plain GET of a JSON
//!   document) and by [`GitHubContents`] (repository contents API, base64
//!   payload).
//! - [`SnapshotSink`]: push a snapshot as the successor of a given revision.
//!   Implemented by [`GitHubContents`]; the PUT names the `sha` of the file
//!   the merge was based on, so a concurrent writer makes it fail instead of
//!   being overwritten.
//!
//! Every failure maps to [`OrderError::Transport`] or
//! [`OrderError::MalformedSnapshot`]; callers fall back to local-only.
//! Requests go through a [`ureq::Agent`] with connect, read and write
//! timeouts, so an unresponsive remote fails instead of hanging.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OrderError;
use crate::model::snapshot::Snapshot;

const USER_AGENT: &str = "orderdesk";

/// Per-request timeout unless a caller sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fetched snapshot and the revision it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub snapshot: Snapshot,
    /// Handle the next push must name. `None` when the remote holds no copy
    /// yet or does not version its document.
    pub revision: Option<String>,
}

impl From<Snapshot> for RemoteSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            revision: None,
        }
    }
}

/// Fetches a remote snapshot.
pub trait SnapshotSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`OrderError::Transport`] for network or status failures and
    /// [`OrderError::MalformedSnapshot`] for undecodable payloads.
    fn fetch(&self) -> Result<RemoteSnapshot, OrderError>;
}

/// Publishes a snapshot to the remote.
pub trait SnapshotSink: Send + Sync {
    /// Replace the remote copy at revision `base` (`None`: no copy yet).
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Transport`] if the upload fails or the remote
    /// has moved past `base`.
    fn push(&self, snapshot: &Snapshot, base: Option<&str>) -> Result<(), OrderError>;
}

impl<F> SnapshotSource for F
where
    F: Fn() -> Result<Snapshot, OrderError> + Send + Sync,
{
    fn fetch(&self) -> Result<RemoteSnapshot, OrderError> {
        self().map(RemoteSnapshot::from)
    }
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .build()
}

fn transport(context: &str, err: &ureq::Error) -> OrderError {
    match err {
        ureq::Error::Status(code, _) => OrderError::Transport(format!("{context}: HTTP {code}")),
        ureq::Error::Transport(inner) => OrderError::Transport(format!("{context}: {inner}")),
    }
}

/// The contents API answers 409 or 422 when `sha` is no longer current.
fn push_error(url: &str, err: &ureq::Error) -> OrderError {
    match err {
        ureq::Error::Status(409 | 422, _) => OrderError::Transport(format!(
            "{url}: remote changed since the last pull, sync again"
        )),
        other => transport(url, other),
    }
}

/// Read-only snapshot served as plain JSON at a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSnapshotSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: agent(DEFAULT_TIMEOUT),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent(timeout);
        self
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> Result<RemoteSnapshot, OrderError> {
        debug!(url = %self.url, "fetching remote snapshot");
        let response = self
            .agent
            .get(&self.url)
            .set("Accept", "application/json")
            .call()
            .map_err(|err| transport(&self.url, &err))?;
        let revision = response.header("ETag").map(str::to_string);
        let body = response
            .into_string()
            .map_err(|err| OrderError::Transport(format!("{}: {err}", self.url)))?;
        Ok(RemoteSnapshot {
            snapshot: Snapshot::from_json(body.as_bytes())?,
            revision,
        })
    }
}

/// Location of the snapshot file inside a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
}

impl RepoFile {
    /// Contents API URL, with `?ref=` when a branch is pinned.
    #[must_use]
    pub fn contents_url(&self, with_ref: bool) -> String {
        let base = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.path.trim_start_matches('/')
        );
        match (&self.branch, with_ref) {
            (Some(branch), true) => format!("{base}?ref={branch}"),
            _ => base,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Snapshot stored as a file in a repository, via the contents API.
///
/// A missing file reads as an empty snapshot with no revision, so the first
/// push of a new shop creates it.
#[derive(Debug, Clone)]
pub struct GitHubContents {
    file: RepoFile,
    token: Option<String>,
    commit_message: String,
    agent: ureq::Agent,
}

impl GitHubContents {
    #[must_use]
    pub fn new(file: RepoFile, token: Option<String>, commit_message: impl Into<String>) -> Self {
        Self {
            file,
            token,
            commit_message: commit_message.into(),
            agent: agent(DEFAULT_TIMEOUT),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent(timeout);
        self
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let mut request = self
            .agent
            .request(method, url)
            .set("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    /// Current file and its `sha`, or `None` if the file does not exist yet.
    fn read_contents(&self) -> Result<Option<ContentsResponse>, OrderError> {
        let url = self.file.contents_url(true);
        match self.request("GET", &url).call() {
            Ok(response) => response
                .into_json::<ContentsResponse>()
                .map(Some)
                .map_err(|err| OrderError::MalformedSnapshot(format!("{url}: {err}"))),
            Err(ureq::Error::Status(404, _)) => {
                debug!(%url, "remote snapshot file does not exist yet");
                Ok(None)
            }
            Err(err) => Err(transport(&url, &err)),
        }
    }
}

impl SnapshotSource for GitHubContents {
    fn fetch(&self) -> Result<RemoteSnapshot, OrderError> {
        match self.read_contents()? {
            Some(contents) => Ok(RemoteSnapshot {
                snapshot: decode_contents(&contents)?,
                revision: Some(contents.sha),
            }),
            None => Ok(RemoteSnapshot::default()),
        }
    }
}

impl SnapshotSink for GitHubContents {
    fn push(&self, snapshot: &Snapshot, base: Option<&str>) -> Result<(), OrderError> {
        let body = put_body(
            &self.commit_message,
            snapshot,
            base,
            self.file.branch.as_deref(),
        )?;
        let url = self.file.contents_url(false);
        self.request("PUT", &url)
            .send_json(body)
            .map_err(|err| push_error(&url, &err))?;
        debug!(%url, base = ?base, orders = snapshot.len(), "remote snapshot pushed");
        Ok(())
    }
}

fn decode_contents(contents: &ContentsResponse) -> Result<Snapshot, OrderError> {
    if contents.encoding != "base64" {
        return Err(OrderError::MalformedSnapshot(format!(
            "unsupported content encoding '{}'",
            contents.encoding
        )));
    }
    let packed: String = contents
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64
        .decode(packed)
        .map_err(|err| OrderError::MalformedSnapshot(format!("bad base64 content: {err}")))?;
    Snapshot::from_json(&bytes)
}

fn put_body<'a>(
    message: &'a str,
    snapshot: &Snapshot,
    sha: Option<&'a str>,
    branch: Option<&'a str>,
) -> Result<PutContents<'a>, OrderError> {
    Ok(PutContents {
        message,
        content: BASE64.encode(snapshot.to_json()?),
        sha,
        branch,
    })
}
