//! Transport traits: `RpcTransport` for pull, `PushConnector` for push.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Request/response JSON-RPC transport (HTTP in production).
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn RpcTransport>`;
/// typed calls go through `call` on `dyn RpcTransport`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;
}

impl<'a> dyn RpcTransport + 'a {
    /// Call a method and deserialize the result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest::new(id, method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}

/// Opens push connections (WebSocket in production).
#[async_trait]
pub trait PushConnector: Send + Sync + 'static {
    /// Open a connection. `Ok` means the handshake completed.
    async fn connect(&self, url: &str) -> Result<Box<dyn PushSession>, TransportError>;
}

/// One open push connection carrying text frames.
#[async_trait]
pub trait PushSession: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` means the peer closed the connection.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection cleanly. Errors are swallowed.
    async fn close(&mut self);
}
