//! Geolocates the hops of a traceroute and stores them as a trajectory CSV.
//!
//! The hop list is produced elsewhere (one address per line, unresolved hops
//! shown as `*`). Each address is looked up against an ipinfo compatible API.

use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{config::LocateConfig, model::GeoPoint};

/// Subset of the ipinfo response we care about.
#[derive(Debug, Deserialize)]
struct IpInfo {
    /// `"lat,lon"`, missing for private and bogon addresses
    loc: Option<String>,
}

/// Unique addresses in order of first appearance.
pub fn parse_hops(input: &str) -> Vec<String> {
    let mut hops: Vec<String> = Vec::new();
    for line in input.lines() {
        let hop = line.replace('*', "").trim().to_owned();
        if hop.is_empty() || hops.contains(&hop) {
            continue;
        }
        hops.push(hop);
    }
    hops
}

pub fn parse_loc(loc: &str) -> Option<GeoPoint> {
    let (lat, lon) = loc.split_once(',')?;
    GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

pub async fn lookup(
    client: &reqwest::Client,
    config: &LocateConfig,
    ip: &str,
) -> Result<Option<GeoPoint>> {
    let url = format!("{}/{}/json", config.api_url.trim_end_matches('/'), ip);
    let mut request = client.get(&url);
    if let Some(token) = &config.token {
        request = request.query(&[("token", token)]);
    }

    let info: IpInfo = request
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("invalid response from {url}"))?;
    Ok(info.loc.as_deref().and_then(parse_loc))
}

pub fn write_csv<W: io::Write>(writer: W, rows: &[(String, GeoPoint)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["ip", "latitude", "longitude"])?;
    for (ip, point) in rows {
        writer.write_record([ip.as_str(), &point.lat().to_string(), &point.lon().to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn run(hops: &Path, config: &LocateConfig) -> Result<()> {
    let input = fs::read_to_string(hops)
        .with_context(|| format!("failed to read {}", hops.display()))?;
    let hops = parse_hops(&input);
    info!(count = hops.len(), "resolving hops");

    let client = reqwest::Client::new();
    let mut rows = Vec::new();
    for ip in hops {
        let result = lookup(&client, config, &ip).await;
        match result {
            Ok(Some(point)) => rows.push((ip, point)),
            Ok(None) => warn!(ip = %ip, "no location returned"),
            Err(e) => warn!(ip = %ip, "lookup failed: {e:#}"),
        }
    }

    if let Some(parent) = config.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = fs::File::create(&config.output)
        .with_context(|| format!("failed to create {}", config.output.display()))?;
    write_csv(file, &rows)?;
    info!(path = %config.output.display(), located = rows.len(), "CSV written");

    Ok(())
}
