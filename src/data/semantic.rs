use std::fmt;

use serde::{Deserialize, Serialize};

use super::geo::{OutputRange, ProjectedPoint};

pub const MIN_LINE_POINTS: usize = 2;
pub const MIN_AREA_POINTS: usize = 3;

/// What a way is drawn as, decided from its tags alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    NotInterested,
    Area,
    Line,
}

impl Interest {
    pub fn min_points(&self) -> Option<usize> {
        match self {
            Interest::NotInterested => None,
            Interest::Area => Some(MIN_AREA_POINTS),
            Interest::Line => Some(MIN_LINE_POINTS),
        }
    }
}

/// 24-bit RGB fill color, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn r(&self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub fn g(&self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub fn b(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFeature {
    pub points: Vec<ProjectedPoint>,
}

/// Closed outline; the edge from the last point back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaFeature {
    pub outline: Vec<ProjectedPoint>,
    pub extrude_depth: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Line(LineFeature),
    Area(AreaFeature),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedNode { detail: String },
    MalformedWay { detail: String },
    UnresolvedNode { node_ref: String },
    /// The node lies so far outside the bounds that its projection overflows.
    NonFiniteProjection { node_ref: String },
    TooFewPoints { resolved: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub element: String,
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.as_deref().unwrap_or("<anonymous>");
        match &self.kind {
            DiagnosticKind::MalformedNode { detail } | DiagnosticKind::MalformedWay { detail } => {
                write!(f, "{} {} skipped: {}", self.element, id, detail)
            },
            DiagnosticKind::UnresolvedNode { node_ref } => {
                write!(f, "{} {} references missing node {}", self.element, id, node_ref)
            },
            DiagnosticKind::NonFiniteProjection { node_ref } => {
                write!(f, "{} {} has node {} outside the representable range", self.element, id, node_ref)
            },
            DiagnosticKind::TooFewPoints { resolved, required } => {
                write!(f, "{} {} has {} points, needs {}", self.element, id, resolved, required)
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub primitives: Vec<Primitive>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    Shop,
    EntryPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub kind: PoiKind,
    pub position: ProjectedPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowIndicator {
    pub position: ProjectedPoint,
    pub elevation: f64,
    pub rotation_rad: f64,
    pub radius: f64,
    pub height: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowFrame {
    pub time: String,
    pub indicators: Vec<FlowIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub source_digest: String,
    pub range: OutputRange,
    pub primitives: Vec<Primitive>,
    pub diagnostics: Vec<Diagnostic>,
    pub points_of_interest: Vec<PointOfInterest>,
    pub flow_frames: Vec<FlowFrame>,
}
