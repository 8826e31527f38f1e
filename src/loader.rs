//! Coordinate loading from comma separated files.
//!
//! Files are expected to look like `ip,latitude,longitude`, but the column
//! names are matched loosely and rows that cannot produce a valid coordinate
//! are dropped instead of failing the whole file.

use std::{borrow::Cow, fs::File, io, path::Path};

use anyhow::{Context, Result};
use csv::ByteRecord;

use crate::model::{GeoPoint, Trajectory};

/// Header names accepted for the latitude column, checked in order.
pub const LATITUDE_NAMES: &[&str] = &["latitude", "lat", "y"];
/// Header names accepted for the longitude column, checked in order.
pub const LONGITUDE_NAMES: &[&str] = &["longitude", "lon", "lng", "x"];

/// Indices of the coordinate columns within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub lat: usize,
    pub lon: usize,
}

impl Columns {
    /// Resolves coordinate columns from a header row.
    ///
    /// Named matches win. Otherwise a row of three or more columns is read as
    /// `identifier,latitude,longitude` and a row of two as `latitude,longitude`.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        let names: Vec<String> = header
            .iter()
            .map(|x| x.as_ref().trim().to_lowercase())
            .collect();

        let lat = names.iter().position(|x| LATITUDE_NAMES.contains(&x.as_str()));
        let lon = names.iter().position(|x| LONGITUDE_NAMES.contains(&x.as_str()));

        match (lat, lon) {
            (Some(lat), Some(lon)) => Self { lat, lon },
            _ if names.len() == 2 => Self { lat: 0, lon: 1 },
            // also covers single column headers, whose rows may still be repairable
            _ => Self { lat: 1, lon: 2 },
        }
    }

    fn required_len(&self) -> usize {
        self.lat.max(self.lon) + 1
    }
}

/// Loads the trajectory stored in `path`, named after its file name.
pub fn load(path: &Path) -> Result<Trajectory> {
    let name = path
        .file_name()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read(name, file).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads a trajectory from any CSV source. Only I/O failures are errors.
pub fn read<R: io::Read>(name: impl Into<String>, reader: R) -> Result<Trajectory> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = reader.byte_records();

    let header = match records.next() {
        Some(record) => record?
            .iter()
            .map(|x| String::from_utf8_lossy(x).into_owned())
            .collect::<Vec<_>>(),
        None => return Ok(Trajectory::new(name, Vec::new())),
    };
    let columns = Columns::resolve(&header);

    let mut points = Vec::new();
    for result in records {
        let record = result?;
        if let Some(point) = parse_row(decode(&record), columns) {
            points.push(point);
        }
    }

    Ok(Trajectory::new(name, points))
}

fn decode(record: &ByteRecord) -> Vec<Cow<'_, str>> {
    record.iter().map(String::from_utf8_lossy).collect()
}

/// Extracts a point from a data row, or `None` if the row is unusable.
pub fn parse_row<S: AsRef<str>>(row: Vec<S>, columns: Columns) -> Option<GeoPoint> {
    let row: Vec<&str> = row.iter().map(|x| x.as_ref()).collect();
    let row = if row.len() < columns.required_len() {
        repair(&row)?
    } else {
        row
    };

    let lat = parse_coordinate(row.get(columns.lat)?)?;
    let lon = parse_coordinate(row.get(columns.lon)?)?;
    GeoPoint::new(lat, lon)
}

// `ip,"lat,lon"` as written by geolocation APIs that return a single loc field
fn repair<'a>(row: &[&'a str]) -> Option<Vec<&'a str>> {
    match *row {
        [id, loc] => {
            let (lat, lon) = loc.split_once(',')?;
            Some(vec![id, lat, lon])
        }
        _ => None,
    }
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|x| !x.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(data: &str) -> Vec<(f64, f64)> {
        read("test.csv", data.as_bytes())
            .unwrap()
            .points()
            .iter()
            .map(|p| (p.lat(), p.lon()))
            .collect()
    }

    #[test]
    fn resolve() {
        assert_eq!(
            Columns::resolve(&["ip", "latitude", "longitude"]),
            Columns { lat: 1, lon: 2 }
        );
        assert_eq!(
            Columns::resolve(&[" LON ", "Lat"]),
            Columns { lat: 1, lon: 0 }
        );
        // "x" and "y" are synonyms, so this maps y -> latitude
        assert_eq!(Columns::resolve(&["x", "y"]), Columns { lat: 1, lon: 0 });
        // only one axis named
        assert_eq!(
            Columns::resolve(&["latitude", "a", "b"]),
            Columns { lat: 1, lon: 2 }
        );
        assert_eq!(Columns::resolve(&["a", "b"]), Columns { lat: 0, lon: 1 });
        assert_eq!(Columns::resolve(&["a"]), Columns { lat: 1, lon: 2 });
        // first match wins
        assert_eq!(
            Columns::resolve(&["lat", "lon", "latitude", "longitude"]),
            Columns { lat: 0, lon: 1 }
        );
    }

    #[test]
    fn named_columns() {
        let data = "ip,latitude,longitude\n8.8.8.8,37.4,-122.1\n1.1.1.1,-33.86,151.2\n";
        assert_eq!(points(data), vec![(37.4, -122.1), (-33.86, 151.2)]);
    }

    #[test]
    fn unnamed_two_columns() {
        assert_eq!(points("a,b\n1.0,2.0\n"), vec![(1.0, 2.0)]);
    }

    #[test]
    fn xy_header() {
        // x is longitude and y is latitude
        assert_eq!(points("x,y\n1.0,2.0\n"), vec![(2.0, 1.0)]);
    }

    #[test]
    fn repair_split_loc() {
        let columns = Columns::resolve(&["ip", "latitude", "longitude"]);
        assert_eq!(
            parse_row(vec!["1.2.3.4", "48.85,2.35"], columns),
            GeoPoint::new(48.85, 2.35)
        );

        let data = "ip,latitude,longitude\n1.2.3.4,\"48.85,2.35\"\n";
        assert_eq!(points(data), vec![(48.85, 2.35)]);
    }

    #[test]
    fn short_rows() {
        let columns = Columns { lat: 1, lon: 2 };
        assert_eq!(parse_row(vec!["1.2.3.4"], columns), None);
        assert_eq!(parse_row(vec!["1.2.3.4", "48.85"], columns), None);
        assert_eq!(parse_row(Vec::<&str>::new(), columns), None);
    }

    #[test]
    fn invalid_values() {
        let data = "ip,latitude,longitude
a,nan,1.0
b,abc,1.0
c,1.0,
d,91.0,0.0
e,0.0,-180.01
f,inf,0.0
g, 10.5 , 20.5
";
        assert_eq!(points(data), vec![(10.5, 20.5)]);
    }

    #[test]
    fn bounds_inclusive() {
        let data = "ip,latitude,longitude\na,90,180\nb,-90,-180\n";
        assert_eq!(points(data), vec![(90.0, 180.0), (-90.0, -180.0)]);
    }

    #[test]
    fn roundtrip() {
        for (lat, lon) in [(0.0, 0.0), (45.123456, -73.5), (-89.999, 179.999)] {
            let data = format!("ip,latitude,longitude\nhop,{lat},{lon}\n");
            assert_eq!(points(&data), vec![(lat, lon)]);
        }
    }

    #[test]
    fn empty() {
        assert!(points("").is_empty());
        assert!(points("ip,latitude,longitude\n").is_empty());
        assert!(points("ip,latitude,longitude\n\n\n").is_empty());
    }

    #[test]
    fn invalid_utf8() {
        let mut data = b"ip,latitude,longitude\n".to_vec();
        data.extend_from_slice(b"\xff\xfe,1.0,2.0\n");
        data.extend_from_slice(b"b,\xff,2.0\n");
        let t = read("bytes.csv", &data[..]).unwrap();
        assert_eq!(t.points(), &[GeoPoint::new(1.0, 2.0).unwrap()]);
    }

    #[test]
    fn load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.csv");
        std::fs::write(&path, "ip,latitude,longitude\n8.8.8.8,37.4,-122.1\n").unwrap();

        let t = load(&path).unwrap();
        assert_eq!(t.name(), "route.csv");
        assert_eq!(t.len(), 1);

        assert!(load(&dir.path().join("missing.csv")).is_err());
    }
}
