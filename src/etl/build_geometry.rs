use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::NodePolicy;
use crate::data::geo::ProjectedPoint;
use crate::data::osm::{NodeTable, WayRecord};
use crate::data::semantic::{AreaFeature, Diagnostic, DiagnosticKind, Interest, LineFeature, Primitive, Rgb};
use crate::etl::classify::classify;
use crate::etl::project::Projector;
use crate::etl::report;

/// Random fill colors for buildings. A fixed seed gives the same sequence every run.
pub struct BuildingPalette {
    rng: StdRng,
}

impl BuildingPalette {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        BuildingPalette { rng }
    }

    pub fn next_color(&mut self) -> Rgb {
        Rgb(self.rng.gen_range(0..=0x00ff_ffff))
    }
}

/// Turns classified ways into primitives for one document.
pub struct GeometryBuilder<'a> {
    nodes: &'a NodeTable,
    projector: Projector,
    extrude_depth: f64,
    policy: NodePolicy,
    palette: BuildingPalette,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(
        nodes: &'a NodeTable,
        projector: Projector,
        extrude_depth: f64,
        policy: NodePolicy,
        palette: BuildingPalette,
    ) -> Self {
        GeometryBuilder {
            nodes,
            projector,
            extrude_depth,
            policy,
            palette,
        }
    }

    fn way_diagnostic(way: &WayRecord, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic {
            element: "way".to_string(),
            id: way.id.clone(),
            kind,
        }
    }

    fn resolve_points(
        &self,
        way: &WayRecord,
        required: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<ProjectedPoint>> {
        let mut points = Vec::with_capacity(way.node_refs.len());
        for node_ref in &way.node_refs {
            let problem = match self.nodes.get(node_ref) {
                Some(node) => {
                    let point = self.projector.project_node(node);
                    if point.is_finite() {
                        points.push(point);
                        continue;
                    }
                    DiagnosticKind::NonFiniteProjection { node_ref: node_ref.clone() }
                },
                None => DiagnosticKind::UnresolvedNode { node_ref: node_ref.clone() },
            };
            // Unprojectable nodes follow the same policy as missing ones.
            report(diagnostics, Self::way_diagnostic(way, problem));
            if self.policy == NodePolicy::DropWay {
                return None;
            }
        }

        if points.len() < required {
            report(diagnostics, Self::way_diagnostic(
                way,
                DiagnosticKind::TooFewPoints { resolved: points.len(), required },
            ));
            return None;
        }
        Some(points)
    }

    /// Builds the primitive for one way, or nothing if the way is not drawn.
    ///
    /// Ways that are not of interest return before any node is resolved. Everything else
    /// that causes a way to be dropped or shortened is pushed onto `diagnostics`.
    pub fn build(&mut self, way: &WayRecord, diagnostics: &mut Vec<Diagnostic>) -> Option<Primitive> {
        let interest = classify(way);
        let required = interest.min_points()?;
        let points = self.resolve_points(way, required, diagnostics)?;

        match interest {
            Interest::Area => Some(Primitive::Area(AreaFeature {
                outline: points,
                extrude_depth: self.extrude_depth,
                color: self.palette.next_color(),
            })),
            Interest::Line => Some(Primitive::Line(LineFeature { points })),
            Interest::NotInterested => None,
        }
    }
}
