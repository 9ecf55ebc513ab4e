use crate::data::geo::{GeoBounds, OutputRange, ProjectedPoint};
use crate::data::osm::NodeRecord;

/// Linear remap of one axis. Written as a lerp so both ends of the source range land
/// exactly on the ends of the output range.
fn map_range(value: f64, source_min: f64, source_max: f64, range: &OutputRange) -> f64 {
    let t = (value - source_min) / (source_max - source_min);
    range.min * (1.0 - t) + range.max * t
}

/// Maps a geographic position into the planar output range: longitude to `x`,
/// latitude to `y`. Positions outside the bounds extrapolate linearly, so a position far
/// enough outside them can overflow; check `ProjectedPoint::is_finite` before use.
pub fn project(lat: f64, lon: f64, bounds: &GeoBounds, range: &OutputRange) -> ProjectedPoint {
    ProjectedPoint {
        x: map_range(lon, bounds.min_lon(), bounds.max_lon(), range),
        y: map_range(lat, bounds.min_lat(), bounds.max_lat(), range),
    }
}

/// Projection bound to a single document's region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    bounds: GeoBounds,
    range: OutputRange,
}

impl Projector {
    pub fn new(bounds: GeoBounds, range: OutputRange) -> Self {
        Projector { bounds, range }
    }

    pub fn project(&self, lat: f64, lon: f64) -> ProjectedPoint {
        project(lat, lon, &self.bounds, &self.range)
    }

    pub fn project_node(&self, node: &NodeRecord) -> ProjectedPoint {
        self.project(node.lat, node.lon)
    }

    pub fn range(&self) -> &OutputRange {
        &self.range
    }
}
