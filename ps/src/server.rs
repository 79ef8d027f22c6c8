//! Embedded plan store server
//!
//! Serves a [`LocalStore`] over a loopback TCP listener speaking the wire
//! protocol, so several same-host processes can share one engine through
//! [`RemoteStore`](crate::RemoteStore) instead of opening the database file
//! concurrently. Each inbound connection is handled on its own task; writes
//! serialize on the engine's connection lock.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{PlanStore, StoreResult};
use crate::error::StoreError;
use crate::local::LocalStore;
use crate::proto::{ErrorKind, MAX_FRAME_BYTES, PROTOCOL_VERSION, Request, Response};

/// Serves a local engine on a loopback address
pub struct EmbeddedServer {
    engine: Arc<LocalStore>,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EmbeddedServer {
    pub fn new(engine: LocalStore) -> Self {
        Self {
            engine: Arc::new(engine),
            running: None,
        }
    }

    /// Bound address while serving
    pub fn addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// Bind `127.0.0.1:port` (0 for an ephemeral port), spawn the accept
    /// loop, and return the bound address.
    pub async fn start(&mut self, port: u16) -> StoreResult<SocketAddr> {
        if self.running.is_some() {
            return Err(StoreError::Internal("server already started".to_string()));
        }

        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| StoreError::Internal(format!("bind 127.0.0.1:{port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| StoreError::Internal(format!("local addr: {e}")))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(accept_loop(listener, engine, shutdown_rx));

        info!(%addr, "embedded plan store serving");
        self.running = Some(Running {
            addr,
            shutdown_tx,
            handle,
        });
        Ok(addr)
    }

    /// Shut the listener down gracefully and close the engine. Repeated calls
    /// are no-ops.
    pub async fn stop(&mut self) -> StoreResult<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!(error = %e, "accept loop did not join cleanly");
        }
        self.engine.close().await?;
        info!(addr = %running.addr, "embedded plan store stopped");
        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, engine: Arc<LocalStore>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, engine).await {
                            debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
}

/// Handle one connection: requests are served line-by-line until EOF, so a
/// pipelining client works even though the stock client reconnects per call.
async fn serve_connection(stream: TcpStream, engine: Arc<LocalStore>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(());
        }
        if read > MAX_FRAME_BYTES {
            return Err(std::io::Error::other(format!("frame too large: {read} bytes")));
        }

        let response = match serde_json::from_str::<Request>(line.trim()) {
            Ok(request) => dispatch(&engine, request).await,
            Err(e) => Response::Err {
                kind: ErrorKind::InvalidInput,
                message: format!("malformed request: {e}"),
            },
        };

        let payload = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        write_half.write_all(payload.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        write_half.flush().await?;
    }
}

async fn dispatch(engine: &LocalStore, request: Request) -> Response {
    match request {
        Request::Create { project, entry } => match engine.create(&project, &entry).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::from(&e),
        },
        Request::Get { project, filename } => match engine.get(&project, &filename).await {
            Ok(entry) => Response::Entry { entry },
            Err(e) => Response::from(&e),
        },
        Request::Update {
            project,
            filename,
            entry,
        } => match engine.update(&project, &filename, &entry).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::from(&e),
        },
        Request::Rename { project, old, new } => match engine.rename(&project, &old, &new).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::from(&e),
        },
        Request::List { project } => match engine.list(&project).await {
            Ok(entries) => Response::Entries { entries },
            Err(e) => Response::from(&e),
        },
        Request::ListByStatus { project, statuses } => {
            match engine.list_by_status(&project, &statuses).await {
                Ok(entries) => Response::Entries { entries },
                Err(e) => Response::from(&e),
            }
        }
        Request::ListByTopic { project, topic } => match engine.list_by_topic(&project, &topic).await {
            Ok(entries) => Response::Entries { entries },
            Err(e) => Response::from(&e),
        },
        Request::ListTopics { project } => match engine.list_topics(&project).await {
            Ok(topics) => Response::Topics { topics },
            Err(e) => Response::from(&e),
        },
        Request::CreateTopic { project, topic } => match engine.create_topic(&project, &topic).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::from(&e),
        },
        Request::GetContent { project, filename } => match engine.get_content(&project, &filename).await {
            Ok(content) => Response::Content { content },
            Err(e) => Response::from(&e),
        },
        Request::SetContent {
            project,
            filename,
            content,
        } => match engine.set_content(&project, &filename, &content).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::from(&e),
        },
        Request::Ping => match engine.ping().await {
            Ok(()) => Response::Pong {
                version: PROTOCOL_VERSION.to_string(),
            },
            Err(e) => Response::from(&e),
        },
    }
}
