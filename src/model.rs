use geo::{Distance, Haversine, Point};

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Returns `None` unless `lat` is within [-90, 90] and `lon` within [-180, 180].
    /// NaN fails both comparisons and is rejected as well.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            Some(Self { lat, lon })
        } else {
            None
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

// geo works in x/y, so longitude comes first
impl From<GeoPoint> for Point {
    fn from(value: GeoPoint) -> Self {
        Point::new(value.lon, value.lat)
    }
}

/// Ordered points loaded from one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    name: String,
    points: Vec<GeoPoint>,
}

impl Trajectory {
    pub fn new(name: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn start(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    /// Great-circle length of the path in meters.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| Haversine::distance(Point::from(pair[0]), Point::from(pair[1])))
            .sum()
    }
}
