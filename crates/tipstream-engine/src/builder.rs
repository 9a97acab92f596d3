//! Fluent builder API for tip streams.
//!
//! # Example
//!
//! ```rust,no_run
//! use tipstream_core::StreamConfig;
//! use tipstream_engine::TipStreamBuilder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TipStreamBuilder::new(StreamConfig::from_env()?)
//!     .with_default_transports()?
//!     .spawn();
//! let mut updates = stream.subscribe();
//! while updates.changed().await.is_ok() {
//!     println!("{}", updates.borrow().status);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use tipstream_core::config::StreamConfig;
use tipstream_core::decoder::LogDecoder;
use tipstream_core::error::TransportError;
use tipstream_core::mode::{TransportControls, TransportMode};
use tipstream_core::policy::{BackoffConfig, ReconnectBackoff};
use tipstream_core::transport::{PushConnector, RpcTransport};
use tipstream_core::types::LogFilter;
use tipstream_evm::TipJarDecoder;
use tipstream_http::HttpRpcClient;
use tipstream_ws::WsConnector;

use crate::engine::{DriverParts, TipStream};

/// Fluent builder for [`TipStream`].
pub struct TipStreamBuilder {
    config: StreamConfig,
    decoder: Arc<dyn LogDecoder>,
    push: Option<Arc<dyn PushConnector>>,
    rpc: Option<Arc<dyn RpcTransport>>,
    backoff: BackoffConfig,
    mode: TransportMode,
    modes: Option<watch::Receiver<TransportMode>>,
}

impl TipStreamBuilder {
    /// Start from a config. Mode defaults to the slider flag's default.
    pub fn new(config: StreamConfig) -> Self {
        Self {
            mode: config.slider.default_mode(),
            config,
            decoder: Arc::new(TipJarDecoder::new()),
            push: None,
            rpc: None,
            backoff: BackoffConfig::default(),
            modes: None,
        }
    }

    /// Replace the `Tipped` decoder.
    pub fn decoder(mut self, decoder: impl LogDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Set the push transport.
    pub fn push_connector(mut self, connector: impl PushConnector) -> Self {
        self.push = Some(Arc::new(connector));
        self
    }

    /// Set the pull transport.
    pub fn rpc_transport(mut self, rpc: impl RpcTransport) -> Self {
        self.rpc = Some(Arc::new(rpc));
        self
    }

    /// Set the pull transport from a shared handle.
    pub fn shared_rpc(mut self, rpc: Arc<dyn RpcTransport>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    /// Fill unset transports from the configured URLs: `HttpRpcClient` for
    /// `rpc_url`, `WsConnector` for `push_url`.
    pub fn with_default_transports(mut self) -> Result<Self, TransportError> {
        if self.rpc.is_none() {
            if let Some(url) = self.config.rpc_url.clone() {
                self.rpc = Some(Arc::new(HttpRpcClient::default_for(url)?));
            }
        }
        if self.push.is_none() && self.config.push_url.is_some() {
            self.push = Some(Arc::new(WsConnector::default()));
        }
        Ok(self)
    }

    /// Override the push reconnect backoff.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run in a fixed transport mode.
    pub fn mode(mut self, mode: TransportMode) -> Self {
        self.mode = mode;
        self.modes = None;
        self
    }

    /// Follow the mode selected through `controls`, restarting the connection
    /// cycle on every change.
    pub fn controls(mut self, controls: &TransportControls) -> Self {
        let mut rx = controls.subscribe();
        self.mode = *rx.borrow_and_update();
        self.modes = Some(rx);
        self
    }

    /// The filter the stream will follow, if a contract is configured.
    pub fn filter(&self) -> Option<LogFilter> {
        self.config
            .contract_address
            .as_ref()
            .map(|address| LogFilter::new(address.clone(), self.decoder.topic0()))
    }

    /// Spawn the stream on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> TipStream {
        let filter = self.filter();
        TipStream::spawn(DriverParts {
            config: self.config,
            filter,
            decoder: self.decoder,
            push: self.push,
            rpc: self.rpc,
            backoff: ReconnectBackoff::new(self.backoff),
            mode: self.mode,
            modes: self.modes,
        })
    }
}
