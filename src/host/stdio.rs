//! Stdin/stdout JSON bridge for the method channel.
//!
//! Reads newline-delimited JSON `MethodCall` messages, dispatches them
//! through the `MethodServer` router, and writes `MethodResponse` and
//! `EventEnvelope` messages as newline-delimited JSON.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::error::{NotifyError, Result};
use crate::host::channel::{MethodClient, method_channel};
use crate::host::contract::{ErrorBody, ErrorCode, MethodCall, MethodResponse};
use crate::host::plugin::MethodHandler;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// Request channel capacity for the bridge.
const REQUEST_CAPACITY: usize = 64;

/// Event broadcast channel capacity for the bridge.
const EVENT_CAPACITY: usize = 128;

/// Run the bridge over the process stdin/stdout until stdin closes.
pub async fn run_stdio_bridge<H: MethodHandler>(handler: H) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let output = BufWriter::new(tokio::io::stdout());
    run_bridge(handler, input, output).await
}

/// Run the bridge over arbitrary line-oriented streams.
///
/// Three tasks cooperate: the reader dispatches each call and writes its
/// response, the event forwarder writes broadcast events, and the server
/// runs the router. The bridge returns once the input reaches EOF.
pub async fn run_bridge<H, R, W>(handler: H, input: R, output: W) -> Result<()>
where
    H: MethodHandler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = method_channel(REQUEST_CAPACITY, EVENT_CAPACITY, handler);
    let writer = Arc::new(Mutex::new(output));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut *w, &json).await {
                            tracing::warn!(error = %e, "failed to write event; stopping event forwarder");
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to serialize event; skipping"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let reader_result = run_reader(client, input, Arc::clone(&writer)).await;

    // Dropping the client in `run_reader` closes the request channel, which
    // ends the server loop; the last event sender goes with it, so the
    // forwarder drains what is queued and stops.
    let _ = server_handle.await;
    let _ = event_handle.await;

    reader_result
}

async fn run_reader<R, W>(client: MethodClient, mut input: R, writer: Arc<Mutex<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = input
            .read_line(&mut line)
            .await
            .map_err(|e| NotifyError::Channel(format!("failed to read input: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MethodCall>(trimmed) {
            Ok(call) => match client.send(call).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "method dispatch failed");
                    MethodResponse::error(
                        "dispatch-error",
                        ErrorBody::new(ErrorCode::InvalidArgument, format!("dispatch failed: {e}")),
                    )
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse method call");
                MethodResponse::error(
                    "parse-error",
                    ErrorBody::new(
                        ErrorCode::InvalidArgument,
                        format!("failed to parse method call: {e}"),
                    ),
                )
            }
        };

        let json = serde_json::to_string(&response).map_err(|e| {
            NotifyError::Channel(format!("failed to serialize method response: {e}"))
        })?;
        let mut w = writer.lock().await;
        write_line(&mut *w, &json).await?;
    }

    Ok(())
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| NotifyError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| NotifyError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| NotifyError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
