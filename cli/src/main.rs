//! TipStream CLI — run the MegaTip tip stream from the terminal.
//!
//! # Commands
//! ```text
//! tipstream watch       [--json] [--cautious]
//! tipstream stats       [--window-minutes <N>] [--duration-secs <S>]
//! tipstream decode-log  --topics <...> --data <hex>
//! tipstream mode        [normal|cautious]
//! tipstream topic
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use tipstream_core::mode::{FileModeStore, TransportControls, TransportMode};
use tipstream_core::{ChainDescriptor, LogDecoder, RawLog, StreamConfig};
use tipstream_evm::{abi, TipJarDecoder};
use tipstream_observability::{init_tracing, LogConfig};

mod cmd_watch;

#[derive(Parser)]
#[command(
    name = "tipstream",
    about = "Live view of MegaTip TipJar tips",
    long_about = "
TipStream CLI: follow Tipped events over WebSocket, falling back to
cursor-based HTTP polling when the push connection is unavailable.

ENVIRONMENT VARIABLES (NEXT_PUBLIC_ or PUBLIC_ prefix):
  TIPJAR_ADDRESS            TipJar contract address
  REALTIME_WS / RPC_WS      WebSocket endpoint for eth_subscribe
  RPC_HTTP                  HTTP JSON-RPC endpoint for polling
  TIPSTREAM_POLL_MS         Polling interval (default 10000)
  TIPSTREAM_MAX_WS_RETRIES  WebSocket attempts before polling (default 3)
  TRANSPORT_SLIDER_MODE     hidden | active-default | disabled-default

  TIPSTREAM_MODE_FILE       Persisted transport mode file
  RUST_LOG                  Log filter override
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream tips until Ctrl-C
    Watch {
        /// Print each tip as a JSON line
        #[arg(long)]
        json: bool,
        /// Force cautious mode (polling only) for this run
        #[arg(long)]
        cautious: bool,
    },

    /// Stream for a while, then print aggregate statistics
    Stats {
        /// Rate window in minutes
        #[arg(long, default_value_t = tipstream_engine::stats::DEFAULT_WINDOW_MINUTES)]
        window_minutes: u64,
        /// How long to collect tips before reporting
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,
    },

    /// Decode one Tipped log from raw topics + data
    #[command(name = "decode-log")]
    DecodeLog {
        /// topics[0] = event signature hash, topics[1] = indexed sender
        #[arg(long, num_args = 1..)]
        topics: Vec<String>,
        /// Non-indexed params (hex, 0x-prefixed)
        #[arg(long, default_value = "0x")]
        data: String,
        #[arg(long, default_value = "0x")]
        tx_hash: String,
        #[arg(long, default_value_t = 0)]
        log_index: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or set the persisted transport mode
    Mode {
        /// `normal` or `cautious`; omit to show the current mode
        mode: Option<String>,
    },

    /// Print the TipJar event signatures and their topic0 hashes
    Topic,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log = LogConfig::default();
    log.json = cli.log_json;
    if cli.verbose {
        log = log
            .component("tipstream-engine", "debug")
            .component("tipstream-ws", "debug")
            .component("tipstream-http", "debug");
    }
    init_tracing(&log).map_err(|e| anyhow!("tracing init: {e}"))?;

    match cli.command {
        Commands::Watch { json, cautious } => cmd_watch::watch(json, cautious).await,
        Commands::Stats {
            window_minutes,
            duration_secs,
        } => cmd_watch::stats(window_minutes, duration_secs).await,
        Commands::DecodeLog {
            topics,
            data,
            tx_hash,
            log_index,
            json,
        } => cmd_decode_log(topics, data, tx_hash, log_index, json),
        Commands::Mode { mode } => cmd_mode(mode.as_deref()),
        Commands::Topic => cmd_topic(),
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// `TIPSTREAM_MODE_FILE`, else `$HOME/.config/tipstream/state.json`.
pub(crate) fn mode_file() -> PathBuf {
    if let Some(path) = std::env::var_os("TIPSTREAM_MODE_FILE") {
        return PathBuf::from(path);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".config")
        .join("tipstream")
        .join("state.json")
}

pub(crate) fn controls(config: &StreamConfig) -> TransportControls {
    TransportControls::new(config.slider, Arc::new(FileModeStore::new(mode_file())))
}

// ─── Command implementations ─────────────────────────────────────────────────

fn cmd_decode_log(
    topics: Vec<String>,
    data: String,
    tx_hash: String,
    log_index: u32,
    as_json: bool,
) -> Result<()> {
    let raw = RawLog {
        topics,
        data,
        transaction_hash: Some(tx_hash),
        log_index: Some(format!("{log_index:#x}")),
        ..RawLog::default()
    };

    let tip = TipJarDecoder::new()
        .decode(&raw)
        .context("decode Tipped log")?
        .ok_or_else(|| anyhow!("log is not a Tipped event (topic0 mismatch)"))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&tip)?);
    } else {
        println!("Id:        {}", tip.id);
        println!("From:      {}", tip.from);
        println!("Amount:    {} ETH ({} wei)", tip.amount_eth, tip.amount_wei);
        println!("Note:      {}", tip.note);
        println!("Timestamp: {}", tip.timestamp);
        println!("Explorer:  {}", ChainDescriptor::megaeth_testnet().tx_url(&tip.tx_hash));
    }
    Ok(())
}

fn cmd_topic() -> Result<()> {
    let abi = abi::parse_abi().context("parse TipJar ABI")?;
    let tipped = abi::event(&abi, "Tipped").ok_or_else(|| anyhow!("TipJar ABI has no Tipped event"))?;
    println!("{}  {:#x}  (followed)", tipped.signature(), tipped.selector());

    for event in abi.events().filter(|e| e.name != "Tipped") {
        println!("{}  {:#x}", event.signature(), event.selector());
    }
    Ok(())
}

fn cmd_mode(requested: Option<&str>) -> Result<()> {
    let config = StreamConfig::from_env()?;
    let controls = controls(&config);

    let Some(requested) = requested else {
        println!("Mode:    {}", controls.mode());
        println!("Default: {}", controls.default_mode());
        println!(
            "Toggle:  {}",
            if controls.toggle_visible() { "visible" } else { "hidden" }
        );
        println!("File:    {}", mode_file().display());
        return Ok(());
    };

    let mode = TransportMode::parse(requested)
        .ok_or_else(|| anyhow!("unknown mode '{requested}' (expected normal or cautious)"))?;
    let applied = controls
        .set_mode(mode)
        .with_context(|| format!("save transport mode to {}", mode_file().display()))?;
    if !applied {
        bail!("transport mode toggle is hidden; set TRANSPORT_SLIDER_MODE to enable it");
    }
    println!("Transport mode set to {mode}");
    Ok(())
}
