// ===============================
// src/recorder.rs
// ===============================
//
// JSONL journal of gateway traffic:
// - One line per inbound frame, outbound command and link change (append).
// - BufWriter; flush every 1s and/or every 1000 entries.
// - Creates the parent directory when missing.
// - On write failure, reopen once and carry on; if the file cannot be
//   opened at all the recorder stops and the dashboard keeps running.
//
// ENV: `RECORD_FILE=/path/to/oms.jsonl` (see config.rs).
//
use serde::Serialize;
use std::path::Path;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

use crate::codec::{ClientMessage, ServerMessage};

const FLUSH_EVERY_N_EVENTS: u32 = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "dir", rename_all = "snake_case")]
pub enum JournalEntry {
    In { ts_ms: u64, msg: ServerMessage },
    Out { ts_ms: u64, msg: ClientMessage },
    Link { ts_ms: u64, connected: bool },
}

async fn open_writer(path: &str) -> std::io::Result<BufWriter<fs::File>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

async fn write_line(writer: &mut BufWriter<fs::File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

pub async fn run(mut rx: mpsc::Receiver<JournalEntry>, path: String) {
    let mut writer = match open_writer(&path).await {
        Ok(w) => w,
        Err(e) => {
            error!(%path, error = %e, "recorder: open failed, journal disabled");
            return;
        }
    };
    info!(%path, "recorder: started");

    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut since_last_flush: u32 = 0;

    loop {
        tokio::select! {
            entry = rx.recv() => {
                let Some(entry) = entry else {
                    let _ = writer.flush().await;
                    info!("recorder: channel closed, stopped");
                    break;
                };
                let line = match serde_json::to_string(&entry) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(?e, "recorder: serialize error, skip entry");
                        continue;
                    }
                };

                if let Err(e) = write_line(&mut writer, &line).await {
                    error!(?e, "recorder: write failed, attempting reopen");
                    writer = match open_writer(&path).await {
                        Ok(w) => w,
                        Err(e2) => {
                            error!(error = %e2, "recorder: reopen failed, journal disabled");
                            return;
                        }
                    };
                    if let Err(e2) = write_line(&mut writer, &line).await {
                        error!(?e2, "recorder: write failed again after reopen, drop entry");
                        continue;
                    }
                }

                since_last_flush += 1;
                if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                    let _ = writer.flush().await;
                    since_last_flush = 0;
                }
            }

            _ = tick.tick() => {
                let _ = writer.flush().await;
                since_last_flush = 0;
            }
        }
    }
}
