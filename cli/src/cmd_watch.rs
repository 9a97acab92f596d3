//! `tipstream watch` / `tipstream stats` — run the engine against live endpoints.

use std::time::Duration;

use anyhow::{bail, Result};
use serde_json::json;

use tipstream_core::mode::TransportMode;
use tipstream_core::{StreamConfig, StreamState};
use tipstream_engine::{TipStats, TipStream, TipStreamBuilder};
use tipstream_observability::{StatusTracker, StreamChange};

fn spawn_stream(cautious: bool) -> Result<TipStream> {
    let config = StreamConfig::from_env()?;
    if config.contract_address.is_none() {
        bail!("no TipJar address configured; set NEXT_PUBLIC_TIPJAR_ADDRESS or PUBLIC_TIPJAR_ADDRESS");
    }

    let controls = crate::controls(&config);
    let builder = TipStreamBuilder::new(config);
    let builder = if cautious {
        builder.mode(TransportMode::Cautious)
    } else {
        builder.controls(&controls)
    };
    Ok(builder.with_default_transports()?.spawn())
}

pub async fn watch(as_json: bool, cautious: bool) -> Result<()> {
    let stream = spawn_stream(cautious)?;
    let mut updates = stream.subscribe();
    let mut tracker = StatusTracker::new();

    let snapshot = updates.borrow_and_update().clone();
    print_changes(&tracker.observe(&snapshot), as_json)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_changes(&tracker.observe(&snapshot), as_json)?;
            }
        }
    }

    stream.dispose().await;
    Ok(())
}

fn print_changes(changes: &[StreamChange], as_json: bool) -> Result<()> {
    for change in changes {
        match change {
            StreamChange::Status { to, error, .. } if as_json => {
                println!("{}", json!({ "status": to, "error": error }));
            }
            StreamChange::Status { to, error, .. } => match error {
                Some(error) => println!("[{to}] {error}"),
                None => println!("[{to}]"),
            },
            StreamChange::Error(error) if as_json => {
                println!("{}", json!({ "error": error }));
            }
            StreamChange::Error(error) => println!("  ! {error}"),
            StreamChange::NewTips(tips) => {
                for tip in tips {
                    if as_json {
                        println!("{}", serde_json::to_string(tip)?);
                    } else {
                        println!(
                            "  #{:<10} {} tipped {} ETH: {}",
                            tip.block_number, tip.from, tip.amount_eth, tip.note
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

pub async fn stats(window_minutes: u64, duration_secs: u64) -> Result<()> {
    let stream = spawn_stream(false)?;
    println!("Collecting tips for {duration_secs}s ...");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let state: StreamState = stream.state();
    stream.dispose().await;

    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let stats = TipStats::compute(&state.tips, now, window_minutes);

    println!("Status:          {}", state.status);
    if let Some(error) = &state.error {
        println!("Last error:      {error}");
    }
    println!("Tips:            {}", state.tips.len());
    println!("Total:           {} ETH", stats.total_eth);
    println!("Unique tippers:  {}", stats.unique_tippers);
    println!("Largest tip:     {} ETH", stats.largest_eth);
    println!(
        "Rate:            {:.2} tips/min ({} in the last {} min)",
        stats.tips_per_minute, stats.tips_in_window, stats.window_minutes
    );
    Ok(())
}
