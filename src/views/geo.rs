//! Geographic view: activity markers, census overlay and map bounds.

use geo::{BoundingRect, Coord, LineString, MultiPoint, Point, Polygon};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MarkerConfig;
use crate::palette::{
    activity_color, scale_color, Rgba, AGE_SCALE, DENSITY_SCALE, EMPTY_BLEND_COLOR, INCOME_SCALE,
};
use crate::ActivityRecord;

// ============================================================================
// Markers
// ============================================================================

/// Animation class the map applies when a marker is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FadeHint {
    /// Fade in once and stay
    FadeIn,
    /// Pulse while playback runs
    FadeInOut,
}

impl FadeHint {
    pub fn for_playback(is_playing: bool) -> Self {
        if is_playing {
            FadeHint::FadeInOut
        } else {
            FadeHint::FadeIn
        }
    }
}

/// One circle marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub color: Rgba,
    pub popup: String,
    pub fade: FadeHint,
}

/// `sqrt(max(size, 1)) * scale`
pub fn marker_radius(activity_size: u32, scale: f64) -> f64 {
    (activity_size.max(1) as f64).sqrt() * scale
}

/// Popup body, one `Label: value` per line.
pub fn popup_text(record: &ActivityRecord) -> String {
    format!(
        "Date: {}\nActivity: {}\nSize: {}\nMaterial: {}",
        record.date,
        record.activity_type,
        record.activity_size,
        record.material_used.as_deref().unwrap_or("N/A")
    )
}

/// One marker per activity of the current date.
pub fn build_markers(
    activities: &[ActivityRecord],
    is_playing: bool,
    config: &MarkerConfig,
) -> Vec<Marker> {
    let fade = FadeHint::for_playback(is_playing);
    activities
        .iter()
        .map(|record| Marker {
            latitude: record.latitude,
            longitude: record.longitude,
            radius: marker_radius(record.activity_size, config.radius_scale),
            color: activity_color(&record.activity_type),
            popup: popup_text(record),
            fade,
        })
        .collect()
}

// ============================================================================
// Map bounds
// ============================================================================

/// Map bounds as `[lat, lng]` corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub ne: [f64; 2],
    pub sw: [f64; 2],
}

impl MapBounds {
    pub fn center(&self) -> [f64; 2] {
        [
            (self.ne[0] + self.sw[0]) / 2.0,
            (self.ne[1] + self.sw[1]) / 2.0,
        ]
    }
}

/// Bounding box of the markers, or `None` when there are none.
pub fn marker_bounds(markers: &[Marker]) -> Option<MapBounds> {
    let points: MultiPoint<f64> = markers
        .iter()
        .map(|m| Point::new(m.longitude, m.latitude))
        .collect();
    let rect = points.bounding_rect()?;
    Some(MapBounds {
        ne: [rect.max().y, rect.max().x],
        sw: [rect.min().y, rect.min().x],
    })
}

/// Where to centre the map: the markers' box, else the configured default.
pub fn map_center(markers: &[Marker], config: &MarkerConfig) -> [f64; 2] {
    marker_bounds(markers)
        .map(|b| b.center())
        .unwrap_or(config.default_center)
}

// ============================================================================
// Census overlay
// ============================================================================

/// Census variable shown under the markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Age,
    Density,
    Income,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [OverlayKind::Age, OverlayKind::Density, OverlayKind::Income];

    /// Query value and property key.
    pub fn as_str(self) -> &'static str {
        match self {
            OverlayKind::Age => "age",
            OverlayKind::Density => "density",
            OverlayKind::Income => "income",
        }
    }

    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            OverlayKind::Age => "Median Age",
            OverlayKind::Density => "Population Density",
            OverlayKind::Income => "Median Income",
        }
    }

    /// Value mapped to the darkest step.
    pub fn max_value(self) -> f64 {
        match self {
            OverlayKind::Age => 100.0,
            OverlayKind::Density => 10_000.0,
            OverlayKind::Income => 200_000.0,
        }
    }

    pub fn scale(self) -> &'static [Rgba] {
        match self {
            OverlayKind::Age => AGE_SCALE.as_slice(),
            OverlayKind::Density => DENSITY_SCALE.as_slice(),
            OverlayKind::Income => INCOME_SCALE.as_slice(),
        }
    }

    pub fn color_for(self, value: f64) -> Rgba {
        scale_color(self.scale(), value, self.max_value()).unwrap_or(EMPTY_BLEND_COLOR)
    }

    pub fn parse(value: &str) -> Option<Self> {
        OverlayKind::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overlay selection after clicking `clicked`: clicking the active overlay
/// turns it off.
pub fn toggle_overlay(current: Option<OverlayKind>, clicked: OverlayKind) -> Option<OverlayKind> {
    if current == Some(clicked) {
        None
    } else {
        Some(clicked)
    }
}

/// `/census-data` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CensusCollection {
    #[serde(default)]
    pub features: Vec<CensusFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CensusFeature {
    #[serde(default)]
    pub geometry: Option<CensusGeometry>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CensusGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

/// One shaded census tract.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPolygon {
    /// Outer ring, `x` = longitude, `y` = latitude
    pub polygon: Polygon<f64>,
    pub value: f64,
    pub color: Rgba,
    pub popup: String,
}

impl OverlayPolygon {
    /// Outer ring as `[lat, lng]` positions, as the map expects.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .coords()
            .map(|c| [c.y, c.x])
            .collect()
    }
}

fn outer_ring(coordinates: &serde_json::Value) -> Option<LineString<f64>> {
    let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(coordinates.clone()).ok()?;
    let outer = rings.into_iter().next()?;
    let coords: Vec<Coord<f64>> = outer
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect();
    if coords.is_empty() {
        None
    } else {
        Some(LineString::new(coords))
    }
}

/// Shade every `Polygon` feature by `properties[overlay]` (missing -> 0).
/// Other geometries are skipped.
pub fn build_overlay(collection: &CensusCollection, overlay: OverlayKind) -> Vec<OverlayPolygon> {
    let mut polygons = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            warn!("[CensusOverlay] Feature {} has no geometry", index);
            continue;
        };
        if geometry.kind != "Polygon" {
            warn!(
                "[CensusOverlay] Unsupported geometry type for feature {}: {}",
                index, geometry.kind
            );
            continue;
        }
        let Some(ring) = outer_ring(&geometry.coordinates) else {
            warn!("[CensusOverlay] Invalid geometry for feature {}", index);
            continue;
        };

        let value = feature
            .properties
            .get(overlay.as_str())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        polygons.push(OverlayPolygon {
            polygon: Polygon::new(ring, Vec::new()),
            value,
            color: overlay.color_for(value),
            popup: format!("{}: {}", overlay, value),
        });
    }

    polygons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_radius() {
        assert!((marker_radius(4, 5.4) - 10.8).abs() < 1e-9);
        assert!((marker_radius(0, 5.4) - 5.4).abs() < 1e-9);
    }

    #[test]
    fn test_build_markers() {
        let mut record = ActivityRecord::new("2023-07-01", "JYG", 9);
        record.latitude = 39.95;
        record.longitude = -75.16;
        let markers = build_markers(&[record], true, &MarkerConfig::default());

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].fade, FadeHint::FadeInOut);
        assert_eq!(markers[0].color, activity_color(&crate::ActivityType::Jyg));
        assert_eq!(
            markers[0].popup,
            "Date: 2023-07-01\nActivity: JYG\nSize: 9\nMaterial: N/A"
        );
    }

    #[test]
    fn test_bounds_and_center() {
        let config = MarkerConfig::default();
        assert_eq!(map_center(&[], &config), config.default_center);

        let mut a = ActivityRecord::new("2023-07-01", "JYG", 1);
        a.latitude = 40.0;
        a.longitude = -75.0;
        let mut b = a.clone();
        b.latitude = 39.0;
        b.longitude = -76.0;

        let markers = build_markers(&[a, b], false, &config);
        let bounds = marker_bounds(&markers).unwrap();
        assert_eq!(bounds.ne, [40.0, -75.0]);
        assert_eq!(bounds.sw, [39.0, -76.0]);
        assert_eq!(map_center(&markers, &config), [39.5, -75.5]);
    }

    #[test]
    fn test_overlay_polygons() {
        let json = r#"{"features": [
            {"geometry": {"type": "Polygon", "coordinates": [[[-75.1, 39.9], [-75.0, 39.9], [-75.0, 40.0], [-75.1, 39.9]]]},
             "properties": {"age": 50}},
            {"geometry": {"type": "MultiPolygon", "coordinates": []}, "properties": {"age": 10}},
            {"geometry": {"type": "Polygon", "coordinates": []}, "properties": {}},
            {"geometry": {"type": "Polygon", "coordinates": [[[-75.2, 39.8], [-75.1, 39.8], [-75.2, 39.8]]]},
             "properties": {}}
        ]}"#;
        let collection: CensusCollection = serde_json::from_str(json).unwrap();
        let polygons = build_overlay(&collection, OverlayKind::Age);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].positions()[0], [39.9, -75.1]);
        assert_eq!(polygons[0].color, Rgba::from_hex("#F08080").unwrap());
        assert_eq!(polygons[0].popup, "age: 50");
        assert_eq!(polygons[1].value, 0.0);
        assert_eq!(polygons[1].color, Rgba::from_hex("#FFA07A").unwrap());
    }

    #[test]
    fn test_toggle_overlay() {
        assert_eq!(toggle_overlay(None, OverlayKind::Income), Some(OverlayKind::Income));
        assert_eq!(toggle_overlay(Some(OverlayKind::Income), OverlayKind::Income), None);
        assert_eq!(
            toggle_overlay(Some(OverlayKind::Age), OverlayKind::Density),
            Some(OverlayKind::Density)
        );
        assert_eq!(OverlayKind::parse("density"), Some(OverlayKind::Density));
    }
}
