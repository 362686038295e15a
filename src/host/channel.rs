//! Method channel and router between the host application and the plugin.

use crate::error::{NotifyError, Result};
use crate::host::contract::{EventEnvelope, MethodCall, MethodName, MethodResponse};
use crate::host::plugin::MethodHandler;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

/// Event emitted after a call that may have switched the active service.
pub const SERVICE_CHANGED_EVENT: &str = "service.active_changed";

struct PendingCall {
    call: MethodCall,
    response_tx: oneshot::Sender<MethodResponse>,
}

#[derive(Clone)]
pub struct MethodClient {
    request_tx: mpsc::Sender<PendingCall>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl MethodClient {
    /// Send a call and wait for its response.
    ///
    /// Envelope problems are answered with an error response rather than an
    /// `Err`; `Err` means the server is gone.
    pub async fn send(&self, call: MethodCall) -> Result<MethodResponse> {
        if let Err(error) = call.validate() {
            return Ok(MethodResponse::error(call.request_id, error));
        }

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(PendingCall { call, response_tx })
            .await
            .map_err(|e| NotifyError::Channel(format!("failed to send method call: {e}")))?;

        response_rx
            .await
            .map_err(|e| NotifyError::Channel(format!("method response dropped: {e}")))
    }

    /// Call `method` with a generated request id.
    pub async fn invoke(&self, method: MethodName, args: serde_json::Value) -> Result<MethodResponse> {
        self.send(MethodCall::new(uuid::Uuid::new_v4().to_string(), method, args))
            .await
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct MethodServer<H: MethodHandler> {
    request_rx: mpsc::Receiver<PendingCall>,
    event_tx: broadcast::Sender<EventEnvelope>,
    handler: H,
}

#[must_use]
pub fn method_channel<H: MethodHandler>(
    request_capacity: usize,
    event_capacity: usize,
    handler: H,
) -> (MethodClient, MethodServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));

    (
        MethodClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        MethodServer {
            request_rx,
            event_tx,
            handler,
        },
    )
}

impl<H: MethodHandler> MethodServer<H> {
    /// Serve calls one at a time until every client is dropped.
    pub async fn run(mut self) {
        while let Some(pending) = self.request_rx.recv().await {
            let response = self.route(&pending.call);
            let _ = pending.response_tx.send(response);
        }
        debug!("method channel closed");
    }

    /// Route one call to the handler.
    pub fn route(&self, call: &MethodCall) -> MethodResponse {
        match self.handler.handle(&call.method, &call.args) {
            Ok(result) => {
                if MethodName::parse(&call.method).is_some_and(MethodName::changes_service) {
                    self.emit_event(
                        SERVICE_CHANGED_EVENT,
                        serde_json::json!({
                            "request_id": call.request_id,
                            "method": call.method,
                            "service": self.handler.active_service().map(|s| s.as_str()),
                        }),
                    );
                }
                MethodResponse::ok(call.request_id.clone(), result)
            }
            Err(error) => {
                debug!(method = %call.method, code = %error.code, "method call rejected: {}", error.message);
                MethodResponse::error(call.request_id.clone(), error)
            }
        }
    }

    fn emit_event(&self, event: &str, payload: serde_json::Value) {
        let envelope =
            EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}
