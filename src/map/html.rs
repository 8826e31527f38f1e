use super::MapPlan;

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Trajectories</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
.legend { position: fixed; bottom: 18px; left: 18px; z-index: 1000; background: rgba(255,255,255,0.95);
  padding: 10px 12px; border: 1px solid #999; border-radius: 6px; box-shadow: 0 1px 4px rgba(0,0,0,0.2); }
.legend .title { font-weight: 600; margin-bottom: 6px; }
.legend .item { display: flex; align-items: center; margin-bottom: 4px; font-size: 12px; }
.legend .swatch { display: inline-block; width: 14px; height: 14px; border: 1px solid #333; margin-right: 6px; }
</style>
</head>
<body>
<div id="map"></div>
<div class="legend">
<div class="title">Trajectories</div>
__LEGEND__
</div>
<script>
const data = __GEOJSON__;
const escape = (s) => s.replace(/&/g, "&amp;").replace(/</g, "&lt;").replace(/>/g, "&gt;");
const map = L.map("map", { center: [20, 0], zoom: 2 });
L.control.scale().addTo(map);
L.tileLayer(__TILES__, { attribution: __ATTRIBUTION__, subdomains: "abcd", maxZoom: 19 }).addTo(map);

const groups = {};
for (const feature of data.features) {
  const { name, color, kind } = feature.properties;
  const label = escape(name);
  if (!(label in groups)) {
    groups[label] = L.featureGroup().addTo(map);
  }
  const group = groups[label];
  if (kind === "trajectory") {
    const latlngs = feature.geometry.coordinates.map(([lon, lat]) => [lat, lon]);
    L.polyline(latlngs, { color: color, weight: 3, opacity: 0.9 })
      .bindTooltip("Trajectory: " + label)
      .addTo(group);
  } else {
    const [lon, lat] = feature.geometry.coordinates;
    const start = kind === "start";
    L.circleMarker([lat, lon], {
      radius: 6,
      weight: 2,
      color: start ? "#1a7f37" : "#7f1a1a",
      fill: true,
      fillColor: start ? "#34c759" : "#ff3b30",
      fillOpacity: 1.0,
    })
      .bindTooltip((start ? "Start: " : "End: ") + label)
      .bindPopup((start ? "Start (" : "End (") + label + ")")
      .addTo(group);
  }
}
L.control.layers(null, groups, { collapsed: false }).addTo(map);

if (data.bbox) {
  const [west, south, east, north] = data.bbox;
  map.fitBounds([[south, west], [north, east]], { padding: [30, 30] });
}
</script>
</body>
</html>
"##;

/// Builds a standalone Leaflet page for `geojson`, which must be the
/// serialized feature collection of `plan`.
pub fn render(plan: &MapPlan, geojson: &str, tiles: &str, attribution: &str) -> String {
    let legend: Vec<String> = plan
        .trajectories
        .keys()
        .map(|name| {
            format!(
                r#"<div class="item"><span class="swatch" style="background:{}"></span><span>{}</span></div>"#,
                escape(plan.color(name)),
                escape(name)
            )
        })
        .collect();

    TEMPLATE
        .replace("__LEGEND__", &legend.join("\n"))
        .replace("__TILES__", &script_string(tiles))
        .replace("__ATTRIBUTION__", &script_string(attribution))
        .replace("__GEOJSON__", &script_safe(geojson))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// a JSON string literal is also a valid JavaScript one
fn script_string(s: &str) -> String {
    script_safe(&serde_json::Value::from(s).to_string())
}

// keeps embedded data from closing the surrounding script tag
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use crate::model::{GeoPoint, Trajectory};

    use super::*;

    fn plan(name: &str) -> MapPlan {
        MapPlan::new([Trajectory::new(
            name,
            vec![GeoPoint::new(1.0, 2.0).unwrap()],
        )])
        .unwrap()
    }

    #[test]
    fn legend() {
        let plan = plan("route.csv");
        let page = render(&plan, "{}", "https://tiles/{z}/{x}/{y}.png", "OSM");
        assert!(page.contains(&format!("background:{}", plan.color("route.csv"))));
        assert!(page.contains("<span>route.csv</span>"));
        assert!(page.contains(r#"L.tileLayer("https://tiles/{z}/{x}/{y}.png""#));
        assert!(!page.contains("__"));
    }

    #[test]
    fn escaping() {
        let plan = plan("<b>&.csv");
        let page = render(&plan, r#"{"name":"</script>"}"#, "t", "a");
        assert!(page.contains("<span>&lt;b&gt;&amp;.csv</span>"));
        assert!(page.contains(r#"const data = {"name":"<\/script>"};"#));
    }
}
