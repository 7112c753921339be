//! Host event bridge.
//!
//! The host runtime delivers lifecycle and fetch events as one JSON object
//! per line on stdin; the worker answers with one JSON reply per event on
//! stdout. Response bodies are base64 on the wire since raw bytes are not
//! valid JSON text. Every event is handled in its own task, and the loop
//! drains all in-flight tasks (and background revalidations) before
//! returning, so the host closing stdin never drops an in-flight response.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use outpost_core::{Request, StoredResponse};

use crate::engine::Engine;
use crate::lifecycle::{ActivationReport, InstallReport};

/// One host-delivered event.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Install { id: u64 },
    Activate { id: u64 },
    Fetch { id: u64, request: Request },
}

/// Response payload on the wire.
#[derive(Debug, Serialize)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body bytes, base64-encoded.
    pub body: String,
}

impl From<&StoredResponse> for WireResponse {
    fn from(entry: &StoredResponse) -> Self {
        Self { status: entry.status, headers: entry.headers.clone(), body: BASE64.encode(&entry.body) }
    }
}

/// One reply per event, matched by id.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<WireResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<InstallReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<ActivationReport>,
}

impl Reply {
    fn success(id: u64) -> Self {
        Self { id, ok: true, error: None, served_by: None, response: None, installed: None, activated: None }
    }

    fn failure(id: u64, err: impl ToString) -> Self {
        Self {
            id,
            ok: false,
            error: Some(err.to_string()),
            served_by: None,
            response: None,
            installed: None,
            activated: None,
        }
    }
}

async fn handle_event(engine: Arc<Engine>, event: HostEvent, replies: mpsc::UnboundedSender<Reply>) {
    let reply = match event {
        HostEvent::Install { id } => match engine.on_install().await {
            Ok(report) => Reply { installed: Some(report), ..Reply::success(id) },
            Err(err) => Reply::failure(id, err),
        },
        HostEvent::Activate { id } => match engine.on_activate().await {
            Ok(report) => Reply { activated: Some(report), ..Reply::success(id) },
            Err(err) => Reply::failure(id, err),
        },
        HostEvent::Fetch { id, request } => match engine.handle_fetch(&request).await {
            Ok(Some(served)) => Reply {
                served_by: Some(served.source.label()),
                response: Some(WireResponse::from(&served.response)),
                ..Reply::success(id)
            },
            Ok(None) => Reply { served_by: Some("bypass"), ..Reply::success(id) },
            Err(err) => Reply::failure(id, err),
        },
    };

    let _ = replies.send(reply);
}

/// Serve host events until the input stream closes.
///
/// Replies are written in completion order, not arrival order; the host
/// correlates them by id.
pub async fn serve<R, W>(engine: Arc<Engine>, input: R, output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(reply) = rx.recv().await {
            match serde_json::to_string(&reply) {
                Ok(mut line) => {
                    line.push('\n');
                    if output.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = output.flush().await;
                }
                Err(err) => tracing::error!(error = %err, "failed to serialize reply"),
            }
        }
    });

    let mut events = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<HostEvent>(&line) {
            Ok(event) => {
                events.spawn(handle_event(Arc::clone(&engine), event, tx.clone()));
            }
            Err(err) => tracing::warn!(error = %err, "ignoring malformed host event"),
        }
    }

    // input is gone; in-flight events still get their replies
    while events.join_next().await.is_some() {}
    engine.drain_background().await;

    drop(tx);
    writer.await?;

    Ok(())
}
