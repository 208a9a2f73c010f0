use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::{Duration, Instant},
};

use crate::gesture::{GestureEvent, SensorFrame, WristPosition};

use super::GestureSource;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayRecord {
    at_ms: u64,
    #[serde(default)]
    tracking_id: u64,
    #[serde(default)]
    gestures: Vec<GestureEvent>,
    #[serde(default)]
    wrist: Option<WristPosition>,
}

/// Plays back a recorded session, one JSON object per line, each stamped
/// with its offset from the start of playback.
pub struct ReplaySource {
    records: VecDeque<ReplayRecord>,
    started: Option<Instant>,
}

impl ReplaySource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open replay script {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("failed to read replay script")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(trimmed)
                .with_context(|| format!("invalid replay record on line {}", index + 1))?;
            records.push(record);
        }
        records.sort_by_key(|record| record.at_ms);

        Ok(Self {
            records: records.into(),
            started: None,
        })
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl GestureSource for ReplaySource {
    fn poll(&mut self, now: Instant) -> Option<SensorFrame> {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);

        let due = self
            .records
            .front()
            .map(|record| Duration::from_millis(record.at_ms) <= elapsed)
            .unwrap_or(false);
        if !due {
            return None;
        }

        self.records.pop_front().map(|record| SensorFrame {
            tracking_id: record.tracking_id,
            gestures: record.gestures,
            wrist: record.wrist,
            color: None,
        })
    }

    fn is_finished(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SCRIPT: &str = r#"
# attach, then perform the default pin
{"atMs": 0, "trackingId": 7}
{"atMs": 4300, "trackingId": 7, "gestures": [{"name": "ThumbUp_Left", "confidence": 0.99, "detected": true}]}
{"atMs": 2000, "trackingId": 7, "gestures": [{"name": "Stop_Left", "confidence": 0.95}]}
"#;

    #[test]
    fn yields_records_once_due_in_time_order() {
        let mut source = ReplaySource::from_reader(Cursor::new(SCRIPT)).unwrap();
        assert_eq!(source.remaining(), 3);

        let start = Instant::now();
        let first = source.poll(start).unwrap();
        assert_eq!(first.tracking_id, 7);
        assert!(first.gestures.is_empty());

        assert!(source.poll(start + Duration::from_millis(1999)).is_none());
        let second = source.poll(start + Duration::from_millis(2000)).unwrap();
        assert_eq!(second.gestures[0].name, "Stop_Left");
        assert!(!second.gestures[0].detected);

        let third = source.poll(start + Duration::from_millis(5000)).unwrap();
        assert_eq!(third.gestures[0].name, "ThumbUp_Left");
        assert!(source.is_finished());
        assert!(source.poll(start + Duration::from_millis(9000)).is_none());
    }

    #[test]
    fn reports_bad_lines() {
        let err = ReplaySource::from_reader(Cursor::new("{\"atMs\": 0}\nnot json\n"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
