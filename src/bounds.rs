use crate::model::{GeoPoint, Trajectory};

/// Axis aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: GeoPoint,
    max: GeoPoint,
}

impl BoundingBox {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Box covering every point of every trajectory, or `None` when there are no points at all.
    pub fn covering<'a>(trajectories: impl IntoIterator<Item = &'a Trajectory>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for point in trajectories.into_iter().flat_map(|x| x.points()) {
            match bounds.as_mut() {
                Some(b) => {
                    b.add(*point);
                }
                None => bounds = Some(Self::new(*point)),
            }
        }
        bounds
    }

    /// Grows the box to include `point`, returns whether it had to expand.
    pub fn add(&mut self, point: GeoPoint) -> bool {
        let (mut min_lat, mut min_lon) = (self.min.lat(), self.min.lon());
        let (mut max_lat, mut max_lon) = (self.max.lat(), self.max.lon());
        let mut expanded = false;
        if point.lat() > max_lat {
            max_lat = point.lat();
            expanded = true;
        } else if point.lat() < min_lat {
            min_lat = point.lat();
            expanded = true;
        }
        if point.lon() > max_lon {
            max_lon = point.lon();
            expanded = true;
        } else if point.lon() < min_lon {
            min_lon = point.lon();
            expanded = true;
        }

        if expanded {
            // every component comes from an already validated point
            if let (Some(min), Some(max)) = (
                GeoPoint::new(min_lat, min_lon),
                GeoPoint::new(max_lat, max_lon),
            ) {
                self.min = min;
                self.max = max;
            }
        }
        expanded
    }

    pub fn min(&self) -> GeoPoint {
        self.min
    }

    pub fn max(&self) -> GeoPoint {
        self.max
    }

    /// GeoJSON ordering: `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn to_bbox(self) -> Vec<f64> {
        vec![
            self.min.lon(),
            self.min.lat(),
            self.max.lon(),
            self.max.lat(),
        ]
    }
}
