//! Offline replay of recorded landmark frames.
//!
//! Usage: replay <frames.jsonl> [config.toml]
//!
//! Each line is either a `Frame` object or `{"values": [132 floats], ...}`.
//! Lines that fail to parse count as pose failures. The final session
//! snapshot is printed to stdout as JSON.

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use nordic_gait::config::Config;
use nordic_gait::logging;
use nordic_gait::pose::Frame;
use nordic_gait::runner::{drive, FrameEvent};
use nordic_gait::session::Session;

const DEFAULT_CONFIG: &str = "gait_server.toml";

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Frame(Frame),
    Flat {
        values: Vec<f64>,
        #[serde(default)]
        timestamp_ms: u64,
        #[serde(default)]
        media_time: Option<f64>,
    },
}

fn parse_line(line: &str) -> Result<Frame> {
    match serde_json::from_str::<ReplayLine>(line)? {
        ReplayLine::Frame(frame) => Ok(frame),
        ReplayLine::Flat {
            values,
            timestamp_ms,
            media_time,
        } => {
            let mut frame = Frame::from_flat(&values, timestamp_ms)?;
            frame.media_time = media_time;
            Ok(frame)
        }
    }
}

fn read_events(path: &str) -> Result<Vec<FrameEvent>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
    let mut events = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(frame) => events.push(FrameEvent::Frame(frame)),
            Err(e) => {
                warn!("line {}: {:#}", n + 1, e);
                events.push(FrameEvent::PoseFailed);
            }
        }
    }
    Ok(events)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => path,
        None => bail!("usage: replay <frames.jsonl> [config.toml]"),
    };
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;
    logging::init(&config.log)?;

    let events = read_events(&input)?;
    info!("Replaying {} events from {} ({} view)", events.len(), input, config.analysis.view);

    let mut session = Session::new(&config.analysis);
    let (tx, mut rx) = mpsc::channel(64);
    let runner = tokio::spawn(async move {
        let delivered = drive(&mut session, tokio_stream::iter(events), tx).await;
        (session, delivered)
    });

    let mut reports = 0usize;
    while rx.recv().await.is_some() {
        reports += 1;
    }
    let (session, delivered) = runner.await?;
    info!("{} frames analysed ({} reports received)", delivered, reports);

    let snapshot = serde_json::to_string_pretty(&session.snapshot())?;
    println!("{}", snapshot);
    Ok(())
}
