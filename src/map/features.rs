use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::model::GeoPoint;

use super::MapPlan;

/// One line feature plus start and end point features per trajectory.
/// Single point trajectories only get the point features, a line needs two positions.
pub fn collection(plan: &MapPlan) -> FeatureCollection {
    let mut features = Vec::new();
    for (name, trajectory) in &plan.trajectories {
        let color = plan.color(name);
        if trajectory.len() >= 2 {
            features.push(feature(
                Value::LineString(trajectory.points().iter().map(|x| position(*x)).collect()),
                name,
                color,
                "trajectory",
            ));
        }
        if let (Some(start), Some(end)) = (trajectory.start(), trajectory.end()) {
            features.push(feature(Value::Point(position(start)), name, color, "start"));
            features.push(feature(Value::Point(position(end)), name, color, "end"));
        }
    }

    FeatureCollection {
        bbox: Some(plan.bounds.to_bbox()),
        features,
        foreign_members: None,
    }
}

fn feature(value: Value, name: &str, color: &str, kind: &str) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_owned(), json!(name));
    properties.insert("color".to_owned(), json!(color));
    properties.insert("kind".to_owned(), json!(kind));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

// GeoJSON positions are longitude first
fn position(point: GeoPoint) -> Vec<f64> {
    vec![point.lon(), point.lat()]
}
