// ===============================
// src/recorder.rs
// ===============================
//
// JSONL recorder untuk output analisis:
// - Tulis setiap Record ke file .jsonl, satu objek per baris.
//   File di-truncate tiap run: satu file = hasil satu analisis.
// - Bufer dengan BufWriter agar hemat syscall.
// - Flush tiap 1000 record dan saat channel ditutup.
// - Otomatis membuat parent directory jika belum ada.
//
// ENV: set `RECORD_FILE=/path/to/out.jsonl` agar aktif (lihat config.rs).
//
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
};
use tracing::{error, info};

use crate::domain::{PositionState, RealizedPnlEvent};
use crate::risk::SeriesPoint;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recorder: open {0} failed: {1}")]
    Open(String, #[source] std::io::Error),
    #[error("recorder: write failed: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Realized(RealizedPnlEvent),
    Position { symbol: String, state: PositionState },
    Series(SeriesPoint),
}

const FLUSH_EVERY_N_RECORDS: u32 = 1000;

async fn open_writer(path: &str) -> Result<BufWriter<tokio::fs::File>, RecorderError> {
    // Pastikan parent directory ada (kalau ada)
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| RecorderError::Open(path.to_string(), e))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| RecorderError::Open(path.to_string(), e))?;

    Ok(BufWriter::new(file))
}

/// Drain `rx` into `path` until every sender is dropped. Returns the number of lines written.
pub async fn run(mut rx: mpsc::Receiver<Record>, path: String) -> Result<u64, RecorderError> {
    info!(%path, "recorder: started");
    let mut writer = open_writer(&path).await?;
    let mut written: u64 = 0;
    let mut since_last_flush: u32 = 0;

    while let Some(rec) = rx.recv().await {
        let mut line = match serde_json::to_vec(&rec) {
            Ok(b) => b,
            Err(e) => {
                error!(?e, "recorder: serialize error, skip record");
                continue;
            }
        };
        line.push(b'\n');
        writer.write_all(&line).await?;
        written += 1;

        since_last_flush += 1;
        if since_last_flush >= FLUSH_EVERY_N_RECORDS {
            writer.flush().await?;
            since_last_flush = 0;
        }
    }

    // Channel closed: flush dan keluar
    writer.flush().await?;
    info!(%path, records = written, "recorder: channel closed, stopped");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run(rx, path.display().to_string()));

        tx.send(Record::Position { symbol: "AAPL".into(), state: PositionState::default() })
            .await
            .unwrap();
        tx.send(Record::Series(SeriesPoint {
            time: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            cumulative_pnl: 1.0,
            pnl_change: None,
            ret: 0.0,
            running_max: 1.0,
            drawdown: 0.0,
            drawdown_pct: Some(0.0),
        }))
        .await
        .unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap().unwrap(), 2);
        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            body.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record"], "position");
        assert_eq!(lines[0]["symbol"], "AAPL");
        assert_eq!(lines[1]["record"], "series");
        assert!(lines[1]["pnl_change"].is_null());
    }

    #[tokio::test]
    async fn rerun_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl").display().to_string();
        for _ in 0..2 {
            let (tx, rx) = mpsc::channel(4);
            let handle = tokio::spawn(run(rx, path.clone()));
            tx.send(Record::Position { symbol: "AAPL".into(), state: PositionState::default() })
                .await
                .unwrap();
            drop(tx);
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
