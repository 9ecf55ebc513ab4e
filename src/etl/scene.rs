use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str;

use log::info;

use crate::config::{SceneConfig, UserConfig};
use crate::data::osm::OsmDocument;
use crate::data::semantic::{Extraction, Scene};
use crate::digest::SourceDigest;
use crate::errors::Result;
use crate::etl::build_geometry::{BuildingPalette, GeometryBuilder};
use crate::etl::parse_osm::{self, ParsedOsm};
use crate::etl::project::Projector;
use crate::overlay::{self, FlowGrid, WeatherSeries, DEFAULT_FLOW_ORIGIN};

use super::Etl;

pub const ETL_NAME: &str = "scene";
pub const OUTPUT_FILE_NAME: &str = "scene.json";

pub struct PipelineRun {
    pub document: OsmDocument,
    pub projector: Projector,
    pub extraction: Extraction,
}

pub fn run_pipeline(raw: &str, config: &SceneConfig) -> Result<PipelineRun> {
    config.validate()?;
    let range = config.range()?;

    let ParsedOsm { document, mut diagnostics } = parse_osm::parse(raw)?;
    let bounds = parse_osm::extract_bounds(&document)?;
    let projector = Projector::new(bounds, range);

    let primitives = {
        let mut builder = GeometryBuilder::new(
            &document.nodes,
            projector,
            config.extrude_depth,
            config.node_policy,
            BuildingPalette::new(config.color_seed),
        );
        document.ways.iter()
            .filter_map(|way| builder.build(way, &mut diagnostics))
            .collect::<Vec<_>>()
    };

    info!(
        ways = document.ways.len(),
        primitives = primitives.len(),
        diagnostics = diagnostics.len();
        "Extracted map primitives"
    );

    Ok(PipelineRun {
        document,
        projector,
        extraction: Extraction { primitives, diagnostics },
    })
}

/// Converts a raw OSM document into primitives, in document order.
///
/// Fatal problems (unparseable document, missing or unusable bounds, invalid config) are
/// errors. Records that were skipped are returned as diagnostics next to the primitives.
pub fn extract(raw: &str, config: &SceneConfig) -> Result<Extraction> {
    Ok(run_pipeline(raw, config)?.extraction)
}

pub struct SceneInput {
    pub osm: Vec<u8>,
    pub weather: Option<Vec<u8>>,
}

pub struct SceneEtl<'a> {
    user_config: &'a UserConfig,
}

impl SceneEtl<'_> {
    pub fn new(user_config: &UserConfig) -> SceneEtl<'_> {
        SceneEtl { user_config }
    }

    pub fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    fn read_input(&self) -> Result<SceneInput> {
        let osm = parse_osm::read_osm_file(Path::new(&self.user_config.data_path))?;
        let weather = match &self.user_config.weather_path {
            Some(path) => Some(fs::read(path)?),
            None => None,
        };
        Ok(SceneInput { osm, weather })
    }

    /// A cached scene is only reused for the same document, weather series and settings.
    fn source_digest(&self, input: &SceneInput) -> Result<String> {
        let digest = SourceDigest::new()
            .bytes(&input.osm)
            .bytes(&[u8::from(input.weather.is_some())])
            .bytes(input.weather.as_deref().unwrap_or_default())
            .settings(&self.user_config.scene)?
            .settings(&self.user_config.points_of_interest)?;
        Ok(digest.finish())
    }

    pub(crate) fn cached_digest(dir: &Path) -> Option<String> {
        let file = File::open(Self::output_path(dir)).ok()?;
        let scene: Scene = serde_json::from_reader(BufReader::new(file)).ok()?;
        Some(scene.source_digest)
    }
}

impl Etl for SceneEtl<'_> {
    type Input = SceneInput;
    type Output = Scene;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        match Self::cached_digest(dir) {
            Some(digest) => Ok(digest == self.source_digest(&self.read_input()?)?),
            None => Ok(false),
        }
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        let path = Self::output_path(dir);
        if path.try_exists()? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        self.read_input()
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let source_digest = self.source_digest(&input)?;
        let raw = str::from_utf8(&input.osm)?;
        let PipelineRun { document, projector, extraction } = run_pipeline(raw, &self.user_config.scene)?;

        let points_of_interest = overlay::points_of_interest(
            &document,
            &projector,
            &self.user_config.points_of_interest,
        );
        let flow_frames = match &input.weather {
            Some(bytes) => {
                let series = WeatherSeries::from_json(str::from_utf8(bytes)?)?;
                overlay::flow_frames(&series, DEFAULT_FLOW_ORIGIN, &FlowGrid::default())
            },
            None => Vec::new(),
        };

        Ok(Scene {
            source_digest,
            range: *projector.range(),
            primitives: extraction.primitives,
            diagnostics: extraction.diagnostics,
            points_of_interest,
            flow_frames,
        })
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let output_file = File::create(Self::output_path(dir))?;
        serde_json::to_writer_pretty(BufWriter::new(output_file), &output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;
    use xz::write::XzEncoder;

    use super::*;
    use crate::config::NodePolicy;
    use crate::data::geo::ProjectedPoint;
    use crate::data::semantic::{DiagnosticKind, Primitive};
    use crate::errors::Error;

    const OSM_SAMPLE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6">
  <bounds minlat="0" maxlat="10" minlon="0" maxlon="10"/>
  <node id="A" lat="0" lon="0"/>
  <node id="B" lat="10" lon="10"/>
  <node id="C" lat="10" lon="0"/>
  <node id="S" lat="5" lon="5">
    <tag k="shop" v="convenience"/>
  </node>
  <way id="1">
    <nd ref="A"/>
    <nd ref="B"/>
    <nd ref="C"/>
    <tag k="building" v="yes"/>
  </way>
  <way id="2">
    <nd ref="A"/>
    <nd ref="X"/>
    <nd ref="B"/>
    <tag k="highway" v="service"/>
  </way>
  <way id="3">
    <nd ref="A"/>
    <nd ref="B"/>
    <tag k="natural" v="tree_row"/>
  </way>
</osm>
"#;

    #[test]
    fn building_becomes_area_in_output_range() {
        let extraction = extract(OSM_SAMPLE, &SceneConfig::seeded(3)).unwrap();
        match &extraction.primitives[0] {
            Primitive::Area(area) => assert_eq!(area.outline, vec![
                ProjectedPoint::new(-5.0, -5.0),
                ProjectedPoint::new(5.0, 5.0),
                ProjectedPoint::new(-5.0, 5.0),
            ]),
            other => panic!("expected an area, got {:?}", other),
        }
    }

    #[test]
    fn output_follows_document_order() {
        let extraction = extract(OSM_SAMPLE, &SceneConfig::seeded(3)).unwrap();
        assert_eq!(extraction.primitives.len(), 2);
        assert!(matches!(extraction.primitives[0], Primitive::Area(_)));
        assert!(matches!(extraction.primitives[1], Primitive::Line(_)));
        assert_eq!(
            extraction.diagnostics[0].kind,
            DiagnosticKind::UnresolvedNode { node_ref: "X".to_string() }
        );
    }

    #[test]
    fn same_input_same_output() {
        let config = SceneConfig::seeded(11);
        assert_eq!(extract(OSM_SAMPLE, &config).unwrap(), extract(OSM_SAMPLE, &config).unwrap());
    }

    #[test]
    fn drop_way_policy_removes_the_road() {
        let config = SceneConfig {
            node_policy: NodePolicy::DropWay,
            ..SceneConfig::seeded(3)
        };
        let extraction = extract(OSM_SAMPLE, &config).unwrap();
        assert_eq!(extraction.primitives.len(), 1);
    }

    #[test]
    fn range_and_depth_are_inputs() {
        let config = SceneConfig {
            out_min: 0.0,
            out_max: 100.0,
            extrude_depth: 3.5,
            ..SceneConfig::seeded(3)
        };
        let extraction = extract(OSM_SAMPLE, &config).unwrap();
        match &extraction.primitives[0] {
            Primitive::Area(area) => {
                assert_eq!(area.outline[1], ProjectedPoint::new(100.0, 100.0));
                assert_eq!(area.extrude_depth, 3.5);
            },
            other => panic!("expected an area, got {:?}", other),
        }
    }

    #[test]
    fn invalid_config_fails_before_parsing() {
        let config = SceneConfig { extrude_depth: -1.0, ..SceneConfig::default() };
        assert!(matches!(extract("not xml", &config), Err(Error::InvalidConfig(_))));
    }

    fn user_config(dir: &Path) -> UserConfig {
        let data_path = dir.join("sample.osm");
        fs::write(&data_path, OSM_SAMPLE).unwrap();
        let weather_path = dir.join("weather.json");
        fs::write(&weather_path, r#"{"hourly": {
            "time": ["2024-06-01T00:00", "2024-06-01T01:00"],
            "wind_speed_10m": [4.0, 11.0],
            "wind_direction_10m": [45.0, 90.0]
        }}"#).unwrap();

        UserConfig::from_json(&serde_json::json!({
            "data_path": data_path,
            "weather_path": weather_path,
            "scene": {"color_seed": 5},
            "points_of_interest": [{"kind": "entry_point", "x": -0.6, "y": 1.05}],
        }).to_string()).unwrap()
    }

    #[test]
    fn scene_etl_writes_and_reuses_scene() {
        let dir = tempdir().unwrap();
        let config = user_config(dir.path());
        let mut etl = SceneEtl::new(&config);

        assert!(!etl.is_cached(dir.path()).unwrap());
        etl.process(dir.path()).unwrap();
        assert!(etl.is_cached(dir.path()).unwrap());

        let scene: Scene = serde_json::from_str(&fs::read_to_string(SceneEtl::output_path(dir.path())).unwrap()).unwrap();
        assert_eq!(scene.primitives.len(), 2);
        assert_eq!(scene.points_of_interest.len(), 2);
        assert_eq!(scene.flow_frames.len(), 2);
        assert_eq!(scene.flow_frames[1].time, "2024-06-01T01:00");

        etl.clean(dir.path()).unwrap();
        assert!(!etl.is_cached(dir.path()).unwrap());
    }

    #[test]
    fn changed_document_invalidates_cache() {
        let dir = tempdir().unwrap();
        let config = user_config(dir.path());
        let mut etl = SceneEtl::new(&config);
        etl.process(dir.path()).unwrap();

        fs::write(&config.data_path, OSM_SAMPLE.replace("lat=\"10\" lon=\"10\"", "lat=\"9\" lon=\"9\"")).unwrap();
        assert!(!etl.is_cached(dir.path()).unwrap());
    }

    #[test]
    fn changed_settings_invalidate_cache() {
        let dir = tempdir().unwrap();
        let config = user_config(dir.path());
        SceneEtl::new(&config).process(dir.path()).unwrap();

        let mut reseeded = user_config(dir.path());
        reseeded.scene.color_seed = Some(6);
        assert!(!SceneEtl::new(&reseeded).is_cached(dir.path()).unwrap());

        let mut moved = user_config(dir.path());
        moved.points_of_interest.clear();
        assert!(!SceneEtl::new(&moved).is_cached(dir.path()).unwrap());

        assert!(SceneEtl::new(&user_config(dir.path())).is_cached(dir.path()).unwrap());
    }

    #[test]
    fn reads_xz_compressed_documents() {
        let dir = tempdir().unwrap();
        let data_path = dir.path().join("sample.osm.xz");
        let mut encoder = XzEncoder::new(File::create(&data_path).unwrap(), 6);
        encoder.write_all(OSM_SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let config = UserConfig::from_json(&serde_json::json!({
            "data_path": data_path,
            "scene": {"color_seed": 5},
        }).to_string()).unwrap();
        SceneEtl::new(&config).process(dir.path()).unwrap();

        let scene: Scene = serde_json::from_str(&fs::read_to_string(SceneEtl::output_path(dir.path())).unwrap()).unwrap();
        assert_eq!(scene.primitives.len(), 2);
        assert!(scene.flow_frames.is_empty());
        assert_eq!(scene.points_of_interest.len(), 1);
    }
}
