// tests/common.rs

#![allow(dead_code)] // Each integration test uses a different subset of these helpers.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use papersync::errors::GitError;
use papersync::git::RepositoryAccess;
use papersync::progress::StatusSink;
use papersync::provider::{CredentialStore, ProviderAuth};
use papersync::storage::ArtifactStore;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Helper function to get the binary command
pub fn papersync_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("papersync"))
}

/// What the fake worker answers to `POST /compile-from-git`.
#[derive(Clone, Debug)]
pub enum Reply {
    Pdf {
        body: Vec<u8>,
        dependencies: Option<String>,
    },
    Error {
        status: u16,
        content_type: &'static str,
        body: String,
    },
    /// Never answers within a test's lifetime.
    Hang,
}

impl Reply {
    pub fn pdf(dependencies: Option<&str>) -> Self {
        Reply::Pdf {
            body: b"%PDF-1.7 fake document".to_vec(),
            dependencies: dependencies.map(str::to_string),
        }
    }

    pub fn error(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Reply::Error {
            status,
            content_type,
            body: body.into(),
        }
    }
}

#[derive(Clone)]
pub struct WorkerState {
    reply: Arc<Reply>,
    pub compile_requests: Arc<Mutex<Vec<Value>>>,
    pub clear_requests: Arc<Mutex<Vec<Value>>>,
}

impl WorkerState {
    pub fn last_compile_request(&self) -> Value {
        self.compile_requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("worker received no compile request")
    }
}

async fn compile_handler(State(state): State<WorkerState>, Json(body): Json<Value>) -> Response {
    state.compile_requests.lock().unwrap().push(body);
    match state.reply.as_ref().clone() {
        Reply::Pdf { body, dependencies } => {
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/pdf");
            if let Some(deps) = dependencies {
                builder = builder.header("x-dependencies", deps);
            }
            builder.body(Body::from(body)).unwrap()
        }
        Reply::Error {
            status,
            content_type,
            body,
        } => Response::builder()
            .status(status)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap(),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

async fn clear_handler(State(state): State<WorkerState>, Json(body): Json<Value>) -> StatusCode {
    state.clear_requests.lock().unwrap().push(body);
    StatusCode::OK
}

/// Starts a fake compile worker on an ephemeral port and returns its base URL.
pub async fn spawn_worker(reply: Reply) -> (String, WorkerState) {
    let state = WorkerState {
        reply: Arc::new(reply),
        compile_requests: Arc::default(),
        clear_requests: Arc::default(),
    };
    let app = Router::new()
        .route("/compile-from-git", post(compile_handler))
        .route("/cache/clear", post(clear_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

/// A server that accepts connections and closes them without answering.
/// Returns its base URL and the number of connections accepted so far.
pub async fn spawn_dropping_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });
    (format!("http://{}", addr), accepted)
}

/// A server that answers every request with a 500 whose body is cut short.
pub async fn spawn_truncating_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

/// In-memory repository: clones are recorded, hashes come from a map.
#[derive(Default)]
pub struct FakeRepo {
    pub files: HashMap<String, String>,
    pub fail_clone: bool,
    pub clones: Mutex<Vec<Vec<String>>>,
}

impl FakeRepo {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            files: files
                .iter()
                .map(|(p, h)| (p.to_string(), h.to_string()))
                .collect(),
            ..Self::default()
        })
    }

    pub fn clone_count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }
}

#[async_trait]
impl RepositoryAccess for FakeRepo {
    async fn clone_full(
        &self,
        url: &str,
        work_dir: &Path,
        branch: Option<&str>,
        timeout: Duration,
    ) -> Result<(), GitError> {
        self.clone_sparse(url, work_dir, branch, &[], timeout).await
    }

    async fn clone_sparse(
        &self,
        _url: &str,
        _work_dir: &Path,
        _branch: Option<&str>,
        sparse_paths: &[String],
        _timeout: Duration,
    ) -> Result<(), GitError> {
        self.clones.lock().unwrap().push(sparse_paths.to_vec());
        if self.fail_clone {
            return Err(GitError::CommandFailed {
                stage: "clone",
                status: "exit status: 128".to_string(),
                stderr: "fatal: repository not found".to_string(),
            });
        }
        Ok(())
    }

    async fn read_blob_hash(&self, _work_dir: &Path, path: &str) -> Result<String, GitError> {
        self.files.get(path).cloned().ok_or_else(|| GitError::WorkTree {
            path: path.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Artifact store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub artifacts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn count(&self) -> usize {
        self.artifacts.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let mut artifacts = self.artifacts.lock().unwrap();
        let id = format!("artifact-{}", artifacts.len());
        assert_eq!(content_type, "application/pdf");
        artifacts.push((id.clone(), bytes));
        Ok(id)
    }
}

/// Status sink that records every published value.
#[derive(Default)]
pub struct RecordingSink {
    pub statuses: Mutex<Vec<Option<String>>>,
}

impl RecordingSink {
    pub fn history(&self) -> Vec<Option<String>> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Option<String>> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, status: Option<&str>) -> anyhow::Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .push(status.map(str::to_string));
        Ok(())
    }
}

/// Credential store with fixed answers for every identity.
#[derive(Default)]
pub struct StaticCredentials {
    pub github: Option<String>,
    pub overleaf: Option<ProviderAuth>,
}

#[async_trait]
impl CredentialStore for StaticCredentials {
    async fn github_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(self.github.clone())
    }
    async fn gitlab_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn overleaf_credentials(&self, _identity: &str) -> anyhow::Result<Option<ProviderAuth>> {
        Ok(self.overleaf.clone())
    }
}

/// Whether a `git` executable is available; git-backed tests return early without one.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Creates a committed git repository containing `files` (path, content).
pub fn setup_git_repo(
    files: &[(&str, &[u8])],
) -> Result<tempfile::TempDir, Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let repo_path = temp_dir.path();
    let repo = git2::Repository::init(repo_path)?;

    let mut index = repo.index()?;
    for (path, content) in files {
        let full = repo_path.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, content)?;
        index.add_path(Path::new(path))?;
    }
    index.write()?;
    let oid = index.write_tree()?;
    let tree = repo.find_tree(oid)?;

    let signature = git2::Signature::now("Test User", "test@example.com")?;
    repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])?;
    Ok(temp_dir)
}

/// `file://` URL for a local repository, so `--depth` and `--filter` are honored.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
