//! Time series of page load measurements.
//!
//! Every sample is a JSON document named `<unix seconds>_<anything>.json`
//! holding numeric timing fields such as `total_time`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::TimingsConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: i64,
    /// `HH:MM` in the configured offset
    pub time: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

pub fn find_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|x| x == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn timestamp_of(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('_').next()?.parse().ok()
}

pub fn time_label(timestamp: i64, offset: FixedOffset) -> Option<String> {
    let time = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&offset);
    Some(time.format("%H:%M").to_string())
}

/// Reads every sample in `dir` that carries a numeric `key`, sorted by time.
pub fn load_series(dir: &Path, key: &str, offset: FixedOffset) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for path in find_json_files(dir)? {
        let Some(timestamp) = timestamp_of(&path) else {
            warn!(file = %path.display(), "file name does not start with a timestamp, skipped");
            continue;
        };
        let Some(time) = time_label(timestamp, offset) else {
            warn!(file = %path.display(), timestamp, "timestamp out of range, skipped");
            continue;
        };

        let data = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let value = match serde_json::from_slice::<Value>(&data) {
            Ok(json) => json.get(key).and_then(Value::as_f64),
            Err(e) => {
                warn!(file = %path.display(), "invalid JSON, skipped: {e}");
                continue;
            }
        };
        let Some(value) = value else {
            warn!(file = %path.display(), key, "no numeric field, skipped");
            continue;
        };

        samples.push(Sample {
            timestamp,
            time,
            value,
        });
    }

    samples.sort_by_key(|x| x.timestamp);
    Ok(samples)
}

pub fn summarize(samples: &[Sample]) -> Option<Summary> {
    let first = samples.first()?.value;
    let (min, max, sum) = samples.iter().fold((first, first, 0.0), |(min, max, sum), x| {
        (min.min(x.value), max.max(x.value), sum + x.value)
    });
    Some(Summary {
        count: samples.len(),
        min,
        max,
        mean: sum / samples.len() as f64,
    })
}

pub fn write_csv<W: io::Write>(writer: W, samples: &[Sample]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run(config: &TimingsConfig, output: Option<&Path>) -> Result<()> {
    let offset = config
        .utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .context("UTC offset must be within 24 hours")?;
    let samples = load_series(&config.json_dir, &config.key, offset)?;
    let Some(summary) = summarize(&samples) else {
        bail!(
            "no sample with a numeric {} field in {}",
            config.key,
            config.json_dir.display()
        );
    };
    info!(
        key = %config.key,
        count = summary.count,
        min = summary.min,
        max = summary.max,
        mean = summary.mean,
        "timing series"
    );

    match output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_csv(file, &samples)?;
            info!(path = %path.display(), "CSV written");
        }
        None => write_csv(io::stdout().lock(), &samples)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_plus_one() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn timestamps() {
        assert_eq!(
            timestamp_of(Path::new("data/1700000000_fandom.json")),
            Some(1700000000)
        );
        assert_eq!(timestamp_of(Path::new("1700000000.json")), Some(1700000000));
        assert_eq!(timestamp_of(Path::new("data/fandom_1700000000.json")), None);
    }

    #[test]
    fn labels() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(
            time_label(1700000000, utc_plus_one()).as_deref(),
            Some("23:13")
        );
        assert_eq!(
            time_label(0, FixedOffset::east_opt(0).unwrap()).as_deref(),
            Some("00:00")
        );
    }

    #[test]
    fn series() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, data: &str| fs::write(dir.path().join(name), data).unwrap();
        write("1700000600_page.json", r#"{"total_time": 1.5}"#);
        write("1700000000_page.json", r#"{"total_time": 0.5, "connect_time": 0.1}"#);
        write("1700000300_page.json", r#"{"connect_time": 0.2}"#);
        write("1700000900_page.json", r#"{"total_time": "#);
        write("notes_page.json", r#"{"total_time": 9.0}"#);
        write("1700001200_page.txt", r#"{"total_time": 9.0}"#);

        let samples = load_series(dir.path(), "total_time", utc_plus_one()).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample {
                    timestamp: 1700000000,
                    time: "23:13".to_owned(),
                    value: 0.5
                },
                Sample {
                    timestamp: 1700000600,
                    time: "23:23".to_owned(),
                    value: 1.5
                },
            ]
        );

        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.min, 0.5);
        assert_eq!(summary.max, 1.5);
        assert_eq!(summary.mean, 1.0);

        let mut out = Vec::new();
        write_csv(&mut out, &samples).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "timestamp,time,value\n1700000000,23:13,0.5\n1700000600,23:23,1.5\n"
        );
    }

    #[test]
    fn empty_series() {
        assert_eq!(summarize(&[]), None);

        let dir = tempfile::tempdir().unwrap();
        let config = TimingsConfig {
            json_dir: dir.path().to_owned(),
            ..Default::default()
        };
        assert!(run(&config, None).is_err());
    }

    #[test]
    fn offset_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1700000000_page.json"), r#"{"total_time": 1.0}"#).unwrap();

        for hours in [24, -24, 1_000_000, i32::MIN] {
            let config = TimingsConfig {
                json_dir: dir.path().to_owned(),
                utc_offset_hours: hours,
                ..Default::default()
            };
            let err = run(&config, None).unwrap_err();
            assert!(err.to_string().contains("within 24 hours"), "{err}");
        }
    }
}
