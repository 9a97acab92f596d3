//! Test doubles for the engine: a scripted push connector, a closure-backed
//! RPC transport and `Tipped` log fixtures.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use tipstream_core::error::TransportError;
use tipstream_core::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use tipstream_core::transport::{PushConnector, PushSession, RpcTransport};
use tipstream_core::types::StreamState;
use tipstream_core::{LogDecoder, StreamConfig};
use tipstream_evm::TipJarDecoder;

pub const CONTRACT: &str = "0x2222222222222222222222222222222222222222";
pub const WS_URL: &str = "wss://mock.invalid/ws";
pub const RPC_URL: &str = "https://mock.invalid/rpc";

pub fn config(max_ws_retries: u32) -> StreamConfig {
    StreamConfig {
        max_ws_retries,
        ..StreamConfig::new(CONTRACT, Some(WS_URL.into()), Some(RPC_URL.into()))
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub fn tx_hash(n: u64) -> String {
    format!("0x{n:064x}")
}

/// A `Tipped` log as a node would return it.
pub fn tipped_log(n: u64, from: &str, amount: u64, note: &str, timestamp: u64) -> Value {
    let data = DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(amount), 256),
        DynSolValue::String(note.into()),
        DynSolValue::Uint(U256::from(timestamp), 256),
    ])
    .abi_encode_params();
    json!({
        "address": CONTRACT,
        "topics": [
            TipJarDecoder::new().topic0(),
            format!("0x{:0>64}", from.trim_start_matches("0x")),
        ],
        "data": format!("0x{}", hex::encode(data)),
        "blockNumber": format!("{:#x}", 100 + n),
        "transactionHash": tx_hash(n),
        "logIndex": "0x0",
    })
}

pub fn simple_log(n: u64, note: &str) -> Value {
    tipped_log(n, "0x1111111111111111111111111111111111111111", 1_000, note, 1_000 + n)
}

/// An `eth_subscription` notification carrying `log`.
pub fn notification(log: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": { "subscription": "0xsub", "result": log },
    })
    .to_string()
}

// ─── Push ─────────────────────────────────────────────────────────────────────

enum Dial {
    Refuse(String),
    Accept(MockSession),
}

#[derive(Default)]
struct ConnectorInner {
    script: Mutex<VecDeque<Dial>>,
    dials: Mutex<Vec<Instant>>,
}

/// Push connector that follows a script; refuses once the script runs out.
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<ConnectorInner>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&self, reason: &str) {
        self.inner
            .script
            .lock()
            .unwrap()
            .push_back(Dial::Refuse(reason.into()));
    }

    /// Queue an accepted connection; the handle plays the server side.
    pub fn accept(&self) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.inner.script.lock().unwrap().push_back(Dial::Accept(MockSession {
            incoming: rx,
            sent: sent.clone(),
            closed: closed.clone(),
        }));
        SessionHandle { tx, sent, closed }
    }

    pub fn dials(&self) -> usize {
        self.inner.dials.lock().unwrap().len()
    }

    pub fn dial_times(&self) -> Vec<Instant> {
        self.inner.dials.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushConnector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn PushSession>, TransportError> {
        assert_eq!(url, WS_URL);
        self.inner.dials.lock().unwrap().push(Instant::now());
        let next = self.inner.script.lock().unwrap().pop_front();
        match next {
            Some(Dial::Accept(session)) => Ok(Box::new(session)),
            Some(Dial::Refuse(reason)) => Err(TransportError::WebSocket(reason)),
            None => Err(TransportError::WebSocket("connection refused".into())),
        }
    }
}

pub enum ServerFrame {
    Text(String),
    Error(String),
}

struct MockSession {
    incoming: mpsc::UnboundedReceiver<ServerFrame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PushSession for MockSession {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        match self.incoming.recv().await? {
            ServerFrame::Text(text) => Some(Ok(text)),
            ServerFrame::Error(reason) => Some(Err(TransportError::WebSocket(reason))),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Server side of an accepted mock connection. Dropping it closes the
/// connection from the server.
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<ServerFrame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn push(&self, text: String) {
        let _ = self.tx.send(ServerFrame::Text(text));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(ServerFrame::Error(reason.into()));
    }

    /// Frames the client sent, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|t| serde_json::from_str(t).unwrap())
            .collect()
    }

    /// `true` once the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the client's subscribe request and return its id.
    pub async fn subscription_id(&self) -> u64 {
        loop {
            if let Some(first) = self.sent().first() {
                return first["id"].as_u64().unwrap();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ─── Pull ─────────────────────────────────────────────────────────────────────

type Responder = dyn Fn(&str, usize) -> Result<Value, TransportError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RpcCall {
    pub method: String,
    pub params: Vec<Value>,
    pub started: Instant,
    pub finished: Option<Instant>,
}

struct RpcInner {
    responder: Box<Responder>,
    latency: Duration,
    calls: Mutex<Vec<RpcCall>>,
    per_method: Mutex<HashMap<String, usize>>,
}

/// RPC transport answering through a closure of `(method, nth call of method)`.
#[derive(Clone)]
pub struct MockRpc {
    inner: Arc<RpcInner>,
}

impl MockRpc {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self::with_latency(Duration::ZERO, responder)
    }

    pub fn with_latency<F>(latency: Duration, responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(RpcInner {
                responder: Box::new(responder),
                latency,
                calls: Mutex::new(Vec::new()),
                per_method: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Head at block 0x100; every cursor page returns `logs` and no cursor.
    pub fn serving(logs: Vec<Value>) -> Self {
        Self::new(move |method, _| match method {
            "eth_blockNumber" => Ok(json!("0x100")),
            _ => Ok(json!({ "logs": logs.clone(), "cursor": null })),
        })
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RpcCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }
}

pub fn rpc_error(code: i64, message: &str) -> TransportError {
    TransportError::Rpc(JsonRpcError {
        code,
        message: message.into(),
        data: None,
    })
}

#[async_trait]
impl RpcTransport for MockRpc {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let slot = {
            let mut calls = self.inner.calls.lock().unwrap();
            calls.push(RpcCall {
                method: req.method.clone(),
                params: req.params.clone(),
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };
        let nth = {
            let mut per_method = self.inner.per_method.lock().unwrap();
            let n = per_method.entry(req.method.clone()).or_insert(0);
            *n += 1;
            *n - 1
        };

        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        let result = (self.inner.responder)(&req.method, nth);
        self.inner.calls.lock().unwrap()[slot].finished = Some(Instant::now());
        result.map(|value| JsonRpcResponse::success(req.id, value))
    }

    fn url(&self) -> &str {
        RPC_URL
    }
}

// ─── Waiting ──────────────────────────────────────────────────────────────────

/// Wait (in simulated time) until `pred` holds for the published state.
pub async fn wait_for(
    rx: &mut watch::Receiver<StreamState>,
    pred: impl FnMut(&StreamState) -> bool,
) -> StreamState {
    tokio::time::timeout(Duration::from_secs(3_600), rx.wait_for(pred))
        .await
        .expect("timed out waiting for stream state")
        .expect("stream dropped")
        .clone()
}

/// Poll a condition every 10ms of simulated time.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(3_600), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never became true");
}
