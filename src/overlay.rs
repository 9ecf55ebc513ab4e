//! Annotations drawn over the map: wind-direction cones and points of interest.

use std::f64::consts::PI;

use log::warn;
use serde::Deserialize;

use crate::config::FixedPoi;
use crate::data::geo::ProjectedPoint;
use crate::data::osm::{OsmDocument, Tags};
use crate::data::semantic::{FlowFrame, FlowIndicator, PoiKind, PointOfInterest, Rgb};
use crate::errors::{Error, Result};
use crate::etl::project::Projector;

/// Where the indicator grid is anchored when the caller has no better origin.
pub const DEFAULT_FLOW_ORIGIN: ProjectedPoint = ProjectedPoint { x: 0.0, y: -1.4 };

const STRONG_WIND: f64 = 10.0;
const MODERATE_WIND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    /// Meteorological direction in degrees.
    pub direction_deg: f64,
    pub speed: f64,
}

impl WindSample {
    fn color_and_scale(&self) -> (Rgb, f64) {
        if self.speed > STRONG_WIND {
            (Rgb(0xf55d5d), 0.5)
        } else if self.speed > MODERATE_WIND {
            (Rgb(0xf5c542), 0.4)
        } else {
            (Rgb(0x70c758), 0.3)
        }
    }
}

/// Hourly series as served by open-meteo; extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub wind_direction_10m: Vec<f64>,
    pub wind_speed_10m: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSeries {
    pub hourly: HourlySeries,
}

impl WeatherSeries {
    pub fn from_json(json: &str) -> Result<Self> {
        let series: WeatherSeries = serde_json::from_str(json)?;
        let hourly = &series.hourly;
        if hourly.wind_direction_10m.len() != hourly.time.len()
            || hourly.wind_speed_10m.len() != hourly.time.len() {
            return Err(Error::Serialization(format!(
                "hourly series lengths differ: {} times, {} directions, {} speeds",
                hourly.time.len(),
                hourly.wind_direction_10m.len(),
                hourly.wind_speed_10m.len(),
            )));
        }
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.hourly.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hourly.time.is_empty()
    }

    /// Sample for the given animation tick, or `None` once the series is exhausted.
    pub fn frame(&self, tick: usize) -> Option<(&str, WindSample)> {
        let hourly = &self.hourly;
        Some((
            hourly.time.get(tick)?.as_str(),
            WindSample {
                direction_deg: *hourly.wind_direction_10m.get(tick)?,
                speed: *hourly.wind_speed_10m.get(tick)?,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowGrid {
    pub columns: std::ops::Range<i32>,
    pub rows: std::ops::Range<i32>,
    pub spacing: f64,
    pub elevation: f64,
}

impl Default for FlowGrid {
    fn default() -> Self {
        FlowGrid {
            columns: -12..10,
            rows: -1..10,
            spacing: 0.4,
            elevation: 1.0,
        }
    }
}

pub fn flow_indicators(sample: &WindSample, origin: ProjectedPoint, grid: &FlowGrid) -> Vec<FlowIndicator> {
    let (color, scale) = sample.color_and_scale();
    let rotation_rad = sample.direction_deg * PI / 180.0;

    grid.columns.clone()
        .flat_map(|i| grid.rows.clone().map(move |j| (i, j)))
        .map(|(i, j)| FlowIndicator {
            position: ProjectedPoint::new(
                origin.x + f64::from(i) * grid.spacing,
                origin.y + f64::from(j) * grid.spacing,
            ),
            elevation: grid.elevation,
            rotation_rad,
            radius: scale / 7.0,
            height: scale * 3.0 / 7.0,
            color,
        })
        .collect()
}

/// One frame per entry of the series, in time order.
pub fn flow_frames(series: &WeatherSeries, origin: ProjectedPoint, grid: &FlowGrid) -> Vec<FlowFrame> {
    (0..series.len())
        .map_while(|tick| series.frame(tick))
        .map(|(time, sample)| FlowFrame {
            time: time.to_string(),
            indicators: flow_indicators(&sample, origin, grid),
        })
        .collect()
}

fn poi_kind(tags: &Tags) -> Option<PoiKind> {
    if tags.contains_key("shop") {
        Some(PoiKind::Shop)
    } else if tags.contains_key("entrance") {
        Some(PoiKind::EntryPoint)
    } else {
        None
    }
}

/// Tagged nodes of the document followed by the configured fixed markers.
/// Document markers are sorted by node id so the output does not depend on hash order.
pub fn points_of_interest(document: &OsmDocument, projector: &Projector, fixed: &[FixedPoi]) -> Vec<PointOfInterest> {
    let mut tagged: Vec<_> = document.nodes.values()
        .filter_map(|node| poi_kind(&node.tags).map(|kind| (node, kind)))
        .collect();
    tagged.sort_by(|(a, _), (b, _)| a.id.cmp(&b.id));

    tagged.into_iter()
        .filter_map(|(node, kind)| {
            let position = projector.project_node(node);
            if !position.is_finite() {
                warn!(node = node.id.as_str(); "Skipping point of interest outside the representable range");
                return None;
            }
            Some(PointOfInterest {
                kind,
                position,
                name: node.tags.get("name").cloned(),
            })
        })
        .chain(fixed.iter().map(|poi| PointOfInterest {
            kind: poi.kind,
            position: poi.position(),
            name: poi.name.clone(),
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::geo::{GeoBounds, OutputRange};
    use crate::data::osm::NodeRecord;

    const WEATHER: &str = r#"{
        "latitude": 52.52,
        "longitude": 13.41,
        "hourly": {
            "time": ["2024-06-01T00:00", "2024-06-01T01:00", "2024-06-01T02:00"],
            "temperature_2m": [14.1, 13.8, 13.5],
            "wind_speed_10m": [3.2, 7.5, 12.9],
            "wind_direction_10m": [90.0, 180.0, 270.0]
        }
    }"#;

    #[test]
    fn frames_follow_the_series() {
        let series = WeatherSeries::from_json(WEATHER).unwrap();
        assert_eq!(series.len(), 3);
        let (time, sample) = series.frame(1).unwrap();
        assert_eq!(time, "2024-06-01T01:00");
        assert_eq!(sample, WindSample { direction_deg: 180.0, speed: 7.5 });
        assert!(series.frame(3).is_none());
    }

    #[test]
    fn mismatched_series_is_rejected() {
        let json = r#"{"hourly": {"time": ["a", "b"], "wind_speed_10m": [1.0], "wind_direction_10m": [0.0, 1.0]}}"#;
        assert!(matches!(WeatherSeries::from_json(json), Err(Error::Serialization(_))));
    }

    #[test]
    fn indicator_style_depends_on_speed() {
        let grid = FlowGrid { columns: 0..1, rows: 0..1, ..FlowGrid::default() };
        let origin = ProjectedPoint::new(0.0, 0.0);

        let calm = flow_indicators(&WindSample { direction_deg: 0.0, speed: 5.0 }, origin, &grid).remove(0);
        assert_eq!(calm.color, Rgb(0x70c758));
        assert_eq!(calm.radius, 0.3 / 7.0);

        let breezy = flow_indicators(&WindSample { direction_deg: 0.0, speed: 10.0 }, origin, &grid).remove(0);
        assert_eq!(breezy.color, Rgb(0xf5c542));
        assert_eq!(breezy.height, 0.4 * 3.0 / 7.0);

        let stormy = flow_indicators(&WindSample { direction_deg: 180.0, speed: 10.5 }, origin, &grid).remove(0);
        assert_eq!(stormy.color, Rgb(0xf55d5d));
        assert!((stormy.rotation_rad - PI).abs() < 1e-12);
    }

    #[test]
    fn default_grid_covers_the_map() {
        let origin = ProjectedPoint::new(0.0, -1.4);
        let indicators = flow_indicators(&WindSample { direction_deg: 90.0, speed: 1.0 }, origin, &FlowGrid::default());
        assert_eq!(indicators.len(), 22 * 11);

        let first = &indicators[0];
        assert!((first.position.x - -4.8).abs() < 1e-9);
        assert!((first.position.y - -1.8).abs() < 1e-9);
        assert_eq!(first.elevation, 1.0);
        assert!(indicators.iter().all(|indicator| (indicator.rotation_rad - PI / 2.0).abs() < 1e-12));
    }

    #[test]
    fn one_frame_per_sample() {
        let series = WeatherSeries::from_json(WEATHER).unwrap();
        let frames = flow_frames(&series, ProjectedPoint::new(0.0, 0.0), &FlowGrid::default());
        let times: Vec<_> = frames.iter().map(|frame| frame.time.as_str()).collect();
        assert_eq!(times, vec!["2024-06-01T00:00", "2024-06-01T01:00", "2024-06-01T02:00"]);
        assert_eq!(frames[2].indicators[0].color, Rgb(0xf55d5d));
    }

    #[test]
    fn tagged_nodes_and_fixed_markers_become_pois() {
        let mut document = OsmDocument::default();
        for (id, lat, lon, key) in [("2", 10.0, 0.0, "entrance"), ("1", 0.0, 10.0, "shop"), ("3", 5.0, 5.0, "amenity")] {
            let mut tags = Tags::new();
            tags.insert(key.to_string(), "yes".to_string());
            document.nodes.insert(id.to_string(), NodeRecord { id: id.to_string(), lat, lon, tags });
        }
        let projector = Projector::new(GeoBounds::new(0.0, 10.0, 0.0, 10.0).unwrap(), OutputRange::default());
        let fixed = [FixedPoi { kind: PoiKind::Shop, x: -0.9, y: 1.4, name: Some("Kiosk".to_string()) }];

        let pois = points_of_interest(&document, &projector, &fixed);
        assert_eq!(pois, vec![
            PointOfInterest { kind: PoiKind::Shop, position: ProjectedPoint::new(5.0, -5.0), name: None },
            PointOfInterest { kind: PoiKind::EntryPoint, position: ProjectedPoint::new(-5.0, 5.0), name: None },
            PointOfInterest { kind: PoiKind::Shop, position: ProjectedPoint::new(-0.9, 1.4), name: Some("Kiosk".to_string()) },
        ]);
    }

    #[test]
    fn unprojectable_pois_are_skipped() {
        let mut document = OsmDocument::default();
        for (id, lat) in [("near", 0.5e-300), ("far", 1e10)] {
            let mut tags = Tags::new();
            tags.insert("shop".to_string(), "kiosk".to_string());
            document.nodes.insert(id.to_string(), NodeRecord { id: id.to_string(), lat, lon: 5.0, tags });
        }
        let projector = Projector::new(GeoBounds::new(0.0, 1e-300, 0.0, 10.0).unwrap(), OutputRange::default());

        let pois = points_of_interest(&document, &projector, &[]);
        assert_eq!(pois.len(), 1);
        assert!(pois[0].position.is_finite());
    }
}
