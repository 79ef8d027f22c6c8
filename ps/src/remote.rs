//! Remote plan store client
//!
//! Adapts the [`PlanStore`] contract onto one request/response exchange per
//! call against a counterpart server. Construction performs no I/O; the first
//! real call (or an explicit ping) is where an unreachable server surfaces as
//! `Transport`, never as `NotFound` or `AlreadyExists`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::api::{PlanStore, StoreResult};
use crate::entry::{PlanEntry, TopicEntry};
use crate::error::StoreError;
use crate::proto::{MAX_FRAME_BYTES, Request, Response, domain_error};

/// Default timeout for one exchange
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a plan store served over loopback or the network
#[derive(Debug, Clone)]
pub struct RemoteStore {
    addr: String,
    timeout: Duration,
}

impl RemoteStore {
    /// Create a client for `addr` (`host:port`). No connection is made here.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom exchange timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Connect, send one request, read one response
    async fn roundtrip(&self, request: &Request) -> StoreResult<Response> {
        debug!(addr = %self.addr, ?request, "store exchange");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| StoreError::Transport(format!("connect timeout: {}", self.addr)))?
            .map_err(|e| StoreError::Transport(format!("connect {}: {e}", self.addr)))?;

        let payload = serde_json::to_string(request)
            .map_err(|e| StoreError::Transport(format!("encode request: {e}")))?;

        tokio::time::timeout(self.timeout, async {
            stream.write_all(payload.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|_| StoreError::Transport("write timeout".to_string()))?
        .map_err(|e| StoreError::Transport(format!("write request: {e}")))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| StoreError::Transport("read timeout".to_string()))?
            .map_err(|e| StoreError::Transport(format!("read response: {e}")))?;

        if read == 0 {
            return Err(StoreError::Transport("server closed the connection".to_string()));
        }
        if read > MAX_FRAME_BYTES {
            return Err(StoreError::Transport(format!("response too large: {read} bytes")));
        }

        let response: Response = serde_json::from_str(line.trim())
            .map_err(|e| StoreError::Transport(format!("malformed response: {e}")))?;
        debug!(?response, "store exchange complete");
        Ok(response)
    }

    async fn expect_ok(&self, request: Request) -> StoreResult<()> {
        match self.roundtrip(&request).await? {
            Response::Ok => Ok(()),
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }

    async fn expect_entries(&self, request: Request) -> StoreResult<Vec<PlanEntry>> {
        match self.roundtrip(&request).await? {
            Response::Entries { entries } => Ok(entries),
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> StoreError {
    StoreError::Transport(format!("unexpected response: {response:?}"))
}

#[async_trait]
impl PlanStore for RemoteStore {
    async fn create(&self, project: &str, entry: &PlanEntry) -> StoreResult<()> {
        self.expect_ok(Request::Create {
            project: project.to_string(),
            entry: entry.clone(),
        })
        .await
    }

    async fn get(&self, project: &str, filename: &str) -> StoreResult<PlanEntry> {
        let request = Request::Get {
            project: project.to_string(),
            filename: filename.to_string(),
        };
        match self.roundtrip(&request).await? {
            Response::Entry { entry } => Ok(entry),
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }

    async fn update(&self, project: &str, filename: &str, entry: &PlanEntry) -> StoreResult<()> {
        self.expect_ok(Request::Update {
            project: project.to_string(),
            filename: filename.to_string(),
            entry: entry.clone(),
        })
        .await
    }

    async fn rename(&self, project: &str, old: &str, new: &str) -> StoreResult<()> {
        self.expect_ok(Request::Rename {
            project: project.to_string(),
            old: old.to_string(),
            new: new.to_string(),
        })
        .await
    }

    async fn list(&self, project: &str) -> StoreResult<Vec<PlanEntry>> {
        self.expect_entries(Request::List {
            project: project.to_string(),
        })
        .await
    }

    async fn list_by_status(&self, project: &str, statuses: &[String]) -> StoreResult<Vec<PlanEntry>> {
        self.expect_entries(Request::ListByStatus {
            project: project.to_string(),
            statuses: statuses.to_vec(),
        })
        .await
    }

    async fn list_by_topic(&self, project: &str, topic: &str) -> StoreResult<Vec<PlanEntry>> {
        self.expect_entries(Request::ListByTopic {
            project: project.to_string(),
            topic: topic.to_string(),
        })
        .await
    }

    async fn list_topics(&self, project: &str) -> StoreResult<Vec<TopicEntry>> {
        let request = Request::ListTopics {
            project: project.to_string(),
        };
        match self.roundtrip(&request).await? {
            Response::Topics { topics } => Ok(topics),
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }

    async fn create_topic(&self, project: &str, topic: &TopicEntry) -> StoreResult<()> {
        self.expect_ok(Request::CreateTopic {
            project: project.to_string(),
            topic: topic.clone(),
        })
        .await
    }

    async fn get_content(&self, project: &str, filename: &str) -> StoreResult<Option<String>> {
        let request = Request::GetContent {
            project: project.to_string(),
            filename: filename.to_string(),
        };
        match self.roundtrip(&request).await? {
            Response::Content { content } => Ok(content),
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }

    async fn set_content(&self, project: &str, filename: &str, content: &str) -> StoreResult<()> {
        self.expect_ok(Request::SetContent {
            project: project.to_string(),
            filename: filename.to_string(),
            content: content.to_string(),
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.roundtrip(&Request::Ping).await? {
            Response::Pong { version } => {
                debug!(version, "store server alive");
                Ok(())
            }
            Response::Err { kind, message } => Err(domain_error(kind, message)),
            other => Err(unexpected(&other)),
        }
    }

    async fn close(&self) -> StoreResult<()> {
        // Nothing held open between exchanges
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_performs_no_io() {
        // An address nothing listens on is fine until the first call
        let client = RemoteStore::new("127.0.0.1:1");
        assert_eq!(client.addr(), "127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport() {
        let client = RemoteStore::new("127.0.0.1:1").with_timeout(Duration::from_millis(200));
        let err = client.ping().await.unwrap_err();
        assert!(err.is_transport(), "got: {err}");

        let err = client.get("proj", "a.md").await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_not_found());
    }
}
