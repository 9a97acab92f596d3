//! Pull-path log poller.
//!
//! Each tick:
//! 1. refreshes the block window from `eth_blockNumber` when needed
//!    (first tick, then every [`HEAD_REFRESH_INTERVAL`]), keeping `fromBlock`
//!    within [`MAX_BLOCK_WINDOW`] of head
//! 2. drains up to `max_pages` pages of `eth_getLogsWithCursor`, or plain
//!    `eth_getLogs` once the node has rejected the cursor method
//! 3. advances `fromBlock` past the highest observed block once the cursor
//!    chain is exhausted

use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use tipstream_core::error::TransportError;
use tipstream_core::transport::RpcTransport;
use tipstream_core::types::{try_parse_hex_u64, LogFilter, RawLog};

/// How far behind head the poll window may start.
pub const MAX_BLOCK_WINDOW: u64 = 50_000;
/// How often the head block is re-resolved.
pub const HEAD_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CursorPage {
    #[serde(default)]
    logs: Vec<RawLog>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Poll state for one stream instance. Survives transport cycles.
#[derive(Debug)]
pub struct LogPoller {
    from_block: Option<u64>,
    cursor: Option<String>,
    highest_seen: Option<u64>,
    head_checked_at: Option<Instant>,
    cursor_supported: bool,
    max_pages: usize,
    next_id: u64,
}

impl LogPoller {
    pub fn new(max_pages: usize) -> Self {
        Self {
            from_block: None,
            cursor: None,
            highest_seen: None,
            head_checked_at: None,
            cursor_supported: true,
            max_pages: max_pages.max(1),
            next_id: chrono::Utc::now().timestamp_millis().unsigned_abs(),
        }
    }

    pub fn set_max_pages(&mut self, max_pages: usize) {
        self.max_pages = max_pages.max(1);
    }

    /// Next `fromBlock`, once the window has been resolved.
    pub fn from_block(&self) -> Option<u64> {
        self.from_block
    }

    /// Pending continuation cursor, if a cursor chain is mid-drain.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// `false` once the node has rejected `eth_getLogsWithCursor`.
    pub fn cursor_supported(&self) -> bool {
        self.cursor_supported
    }

    /// Record a block seen through any transport.
    pub fn observe_block(&mut self, block: u64) {
        self.highest_seen = Some(self.highest_seen.map_or(block, |h| h.max(block)));
    }

    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Run one poll tick, appending fetched logs to `out` in page order.
    ///
    /// Logs fetched before an error are still appended.
    pub async fn tick(
        &mut self,
        rpc: &dyn RpcTransport,
        filter: &LogFilter,
        out: &mut Vec<RawLog>,
    ) -> Result<(), TransportError> {
        self.refresh_window(rpc).await?;

        for _ in 0..self.max_pages {
            let from = self.from_block.unwrap_or(0);
            let page = self.fetch_page(rpc, filter, from).await?;

            // An empty page ends the chain even if the node returned a cursor.
            let more = !page.logs.is_empty();
            for log in &page.logs {
                self.observe_block(log.block_number_u64());
            }
            out.extend(page.logs);
            if !more && page.cursor.is_some() {
                tracing::debug!(from, "empty page carried a cursor; dropping it");
            }
            self.cursor = page.cursor.filter(|_| more);

            if self.cursor.is_none() {
                self.advance();
                break;
            }
        }
        Ok(())
    }

    async fn refresh_window(&mut self, rpc: &dyn RpcTransport) -> Result<(), TransportError> {
        if self.cursor.is_some() {
            return Ok(());
        }
        let stale = self
            .head_checked_at
            .map_or(true, |at| at.elapsed() >= HEAD_REFRESH_INTERVAL);
        if self.from_block.is_some() && !stale {
            return Ok(());
        }

        let id = self.next_id();
        let head: String = rpc.call(id, "eth_blockNumber", vec![]).await?;
        let head = try_parse_hex_u64(&head).ok_or_else(|| {
            TransportError::Other(format!("malformed eth_blockNumber result '{head}'"))
        })?;
        self.head_checked_at = Some(Instant::now());

        let floor = head.saturating_sub(MAX_BLOCK_WINDOW);
        let from = self.from_block.map_or(floor, |f| f.max(floor));
        tracing::debug!(head, from, "poll window refreshed");
        self.from_block = Some(from);
        Ok(())
    }

    async fn fetch_page(
        &mut self,
        rpc: &dyn RpcTransport,
        filter: &LogFilter,
        from: u64,
    ) -> Result<CursorPage, TransportError> {
        if self.cursor_supported {
            let id = self.next_id();
            let params = filter.range_params(from, self.cursor.as_deref());
            match rpc
                .call::<CursorPage>(id, "eth_getLogsWithCursor", vec![params])
                .await
            {
                Err(e) if e.is_method_unsupported() => {
                    tracing::info!(
                        url = %rpc.url(),
                        error = %e,
                        "eth_getLogsWithCursor unsupported, switching to eth_getLogs"
                    );
                    self.cursor_supported = false;
                    self.cursor = None;
                }
                other => return other,
            }
        }

        let id = self.next_id();
        let logs: Vec<RawLog> = rpc
            .call(id, "eth_getLogs", vec![filter.range_params(from, None)])
            .await?;
        Ok(CursorPage { logs, cursor: None })
    }

    fn advance(&mut self) {
        if let Some(highest) = self.highest_seen {
            let next = highest.saturating_add(1);
            self.from_block = Some(self.from_block.map_or(next, |f| f.max(next)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use tipstream_core::request::{JsonRpcRequest, JsonRpcResponse};

    use super::*;

    /// Replies from a script, one per call, recording requests.
    struct ScriptedRpc {
        replies: Mutex<VecDeque<JsonRpcResponse>>,
        requests: Mutex<Vec<JsonRpcRequest>>,
    }

    impl ScriptedRpc {
        fn new(replies: Vec<JsonRpcResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn methods(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.method.clone())
                .collect()
        }

        fn params(&self, n: usize) -> Value {
            self.requests.lock().unwrap()[n].params[0].clone()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedRpc {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            let id = req.id.clone();
            self.requests.lock().unwrap().push(req);
            let mut reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Other("script exhausted".into()))?;
            reply.id = id;
            Ok(reply)
        }

        fn url(&self) -> &str {
            "mock://rpc"
        }
    }

    fn ok(result: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(tipstream_core::RpcId::Null, result)
    }

    fn log_at(block: u64, index: u64) -> Value {
        json!({
            "topics": ["0xabc"],
            "data": "0x",
            "blockNumber": format!("{block:#x}"),
            "transactionHash": format!("0x{block:064x}"),
            "logIndex": format!("{index:#x}"),
        })
    }

    fn filter() -> LogFilter {
        LogFilter::new("0x2222222222222222222222222222222222222222", "0xabc")
    }

    #[tokio::test]
    async fn first_tick_bounds_window_and_advances() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10000")),
            ok(json!({"logs": [log_at(0xfff0, 0), log_at(0xfff5, 1)], "cursor": null})),
        ]);
        let mut poller = LogPoller::new(3);
        let mut out = Vec::new();
        poller.tick(&rpc, &filter(), &mut out).await.unwrap();

        assert_eq!(rpc.methods(), ["eth_blockNumber", "eth_getLogsWithCursor"]);
        assert_eq!(rpc.params(1)["fromBlock"], format!("{:#x}", 0x10000 - MAX_BLOCK_WINDOW));
        assert_eq!(out.len(), 2);
        assert_eq!(poller.from_block(), Some(0xfff6));
    }

    #[tokio::test]
    async fn follows_cursor_up_to_page_limit() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            ok(json!({"logs": [log_at(1, 0)], "cursor": "c1"})),
            ok(json!({"logs": [log_at(2, 0)], "cursor": "c2"})),
            // next tick resumes from c2, without a head refresh
            ok(json!({"logs": [log_at(3, 0)], "cursor": null})),
        ]);
        let mut poller = LogPoller::new(2);
        let mut out = Vec::new();

        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(poller.cursor(), Some("c2"));
        assert_eq!(rpc.params(2)["cursor"], "c1");
        assert_eq!(poller.from_block(), Some(0));

        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(rpc.params(3)["cursor"], "c2");
        assert_eq!(poller.cursor(), None);
        assert_eq!(poller.from_block(), Some(4));
    }

    #[tokio::test]
    async fn malformed_head_is_an_error() {
        let rpc = ScriptedRpc::new(vec![ok(json!("latest-ish"))]);
        let mut poller = LogPoller::new(3);
        let mut out = Vec::new();
        let err = poller.tick(&rpc, &filter(), &mut out).await.unwrap_err();
        assert!(matches!(err, TransportError::Other(ref msg) if msg.contains("eth_blockNumber")));
        assert_eq!(poller.from_block(), None);
        assert_eq!(rpc.methods(), ["eth_blockNumber"]);
    }

    #[tokio::test]
    async fn empty_page_clears_cursor() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            ok(json!({"logs": [], "cursor": "dangling"})),
        ]);
        let mut poller = LogPoller::new(3);
        let mut out = Vec::new();
        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(poller.cursor(), None);
        assert_eq!(rpc.methods().len(), 2);
    }

    #[tokio::test]
    async fn unsupported_cursor_method_falls_back_for_good() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            JsonRpcResponse::failure(tipstream_core::RpcId::Null, -32601, "the method eth_getLogsWithCursor does not exist"),
            ok(json!([log_at(5, 0)])),
            ok(json!([])),
        ]);
        let mut poller = LogPoller::new(3);
        let mut out = Vec::new();

        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        assert!(!poller.cursor_supported());
        assert_eq!(out.len(), 1);
        assert_eq!(poller.from_block(), Some(6));

        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        assert_eq!(
            rpc.methods(),
            ["eth_blockNumber", "eth_getLogsWithCursor", "eth_getLogs", "eth_getLogs"]
        );
        assert_eq!(rpc.params(3)["fromBlock"], "0x6");
    }

    #[tokio::test]
    async fn push_observed_blocks_advance_the_window() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            ok(json!({"logs": [], "cursor": null})),
        ]);
        let mut poller = LogPoller::new(1);
        poller.observe_block(9);
        poller.tick(&rpc, &filter(), &mut Vec::new()).await.unwrap();
        assert_eq!(poller.from_block(), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn head_is_refreshed_after_a_minute() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            ok(json!({"logs": [], "cursor": null})),
            ok(json!({"logs": [], "cursor": null})),
            ok(json!("0x20")),
            ok(json!({"logs": [], "cursor": null})),
        ]);
        let mut poller = LogPoller::new(1);
        let mut out = Vec::new();

        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        poller.tick(&rpc, &filter(), &mut out).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        poller.tick(&rpc, &filter(), &mut out).await.unwrap();

        let heads = rpc
            .methods()
            .iter()
            .filter(|m| m.as_str() == "eth_blockNumber")
            .count();
        assert_eq!(heads, 2);
    }

    #[tokio::test]
    async fn rpc_error_propagates() {
        let rpc = ScriptedRpc::new(vec![
            ok(json!("0x10")),
            JsonRpcResponse::failure(tipstream_core::RpcId::Null, -32000, "boom"),
        ]);
        let mut poller = LogPoller::new(1);
        let err = poller
            .tick(&rpc, &filter(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rpc(_)));
        assert!(poller.cursor_supported());
    }
}
