use std::{f32::consts::PI, fs::{self, File}, io::BufReader, path::{Path, PathBuf}};

use raqote::{DrawOptions, DrawTarget, LineCap, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};

use crate::{
    config::PreviewConfig,
    data::{
        geo::{OutputRange, ProjectedPoint},
        semantic::{Primitive, PointOfInterest, Scene},
    },
    digest::SourceDigest,
    errors::{Error, Result},
};

use super::{scene, Etl};

pub const ETL_NAME: &str = "draw_preview";
pub const OUTPUT_FILE_NAME: &str = "preview.png";
pub const DIGEST_FILE_NAME: &str = "preview.digest";

const ROAD_WIDTH: f32 = 2.0;
const POI_RADIUS: f32 = 4.0;

/// Top-down raster preview of a scene. Extrusion and flow indicators are not drawn.
pub struct DrawPreviewEtl<'a> {
    preview: &'a PreviewConfig,
}

pub struct RenderedPreview {
    pub target: DrawTarget,
    pub digest: String,
}

impl DrawPreviewEtl<'_> {
    pub fn new(preview: &PreviewConfig) -> DrawPreviewEtl<'_> {
        DrawPreviewEtl { preview }
    }

    pub fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    fn digest_path(dir: &Path) -> PathBuf {
        dir.join(DIGEST_FILE_NAME)
    }

    /// Ties a rendered preview to the scene it was drawn from and the canvas settings.
    fn digest(&self, scene_digest: &str) -> String {
        let theme = &self.preview.theme;
        [theme.background, theme.road, theme.poi].iter()
            .fold(
                SourceDigest::new()
                    .bytes(scene_digest.as_bytes())
                    .bytes(&self.preview.width_px.to_le_bytes())
                    .bytes(&self.preview.height_px.to_le_bytes()),
                |digest, color| digest.bytes(&[color.r, color.g, color.b, color.a]),
            )
            .finish()
    }

    /// Output range onto the canvas, y pointing up.
    fn to_pixels(&self, range: &OutputRange, point: &ProjectedPoint) -> (f32, f32) {
        let x = (point.x - range.min) / range.span() * f64::from(self.preview.width_px);
        let y = (range.max - point.y) / range.span() * f64::from(self.preview.height_px);
        (x as f32, y as f32)
    }

    fn stroke(width: f32) -> StrokeStyle {
        StrokeStyle {
            cap: LineCap::Round,
            join: LineJoin::Round,
            width,
            miter_limit: 2.0,
            dash_array: Vec::new(),
            dash_offset: 0.0,
        }
    }

    fn trace(&self, range: &OutputRange, points: &[ProjectedPoint], closed: bool) -> Option<raqote::Path> {
        let (first, rest) = points.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut pb = PathBuilder::new();
        let (x0, y0) = self.to_pixels(range, first);
        pb.move_to(x0, y0);

        for point in rest {
            let (x, y) = self.to_pixels(range, point);
            pb.line_to(x, y);
        }
        if closed {
            pb.close();
        }
        Some(pb.finish())
    }

    fn draw_primitive(&self, dt: &mut DrawTarget, range: &OutputRange, primitive: &Primitive) {
        let draw_options = DrawOptions::new();

        match primitive {
            Primitive::Line(line) => {
                if let Some(path) = self.trace(range, &line.points, false) {
                    dt.stroke(
                        &path,
                        &Source::Solid(self.preview.theme.road),
                        &Self::stroke(ROAD_WIDTH),
                        &draw_options,
                    );
                }
            },
            Primitive::Area(area) => {
                if let Some(path) = self.trace(range, &area.outline, true) {
                    let color = SolidSource::from_unpremultiplied_argb(
                        0xff, area.color.r(), area.color.g(), area.color.b(),
                    );
                    dt.fill(&path, &Source::Solid(color), &draw_options);
                }
            },
        }
    }

    fn draw_poi(&self, dt: &mut DrawTarget, range: &OutputRange, poi: &PointOfInterest) {
        let (x, y) = self.to_pixels(range, &poi.position);
        let mut pb = PathBuilder::new();
        pb.arc(x, y, POI_RADIUS, 0.0, 2.0 * PI);
        dt.fill(&pb.finish(), &Source::Solid(self.preview.theme.poi), &DrawOptions::new());
    }
}

impl Etl for DrawPreviewEtl<'_> {
    type Input = Scene;
    type Output = RenderedPreview;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        if !Self::output_path(dir).try_exists()? || !Self::digest_path(dir).try_exists()? {
            return Ok(false);
        }
        match scene::SceneEtl::cached_digest(dir) {
            Some(scene_digest) => Ok(fs::read_to_string(Self::digest_path(dir))? == self.digest(&scene_digest)),
            None => Ok(false),
        }
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        for path in [Self::output_path(dir), Self::digest_path(dir)] {
            if path.try_exists()? {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        let input_file = File::open(scene::SceneEtl::output_path(dir))?;
        Ok(serde_json::from_reader(BufReader::new(input_file))?)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let mut dt = DrawTarget::new(
            self.preview.width_px.try_into()?,
            self.preview.height_px.try_into()?,
        );
        dt.clear(self.preview.theme.background);

        for primitive in &input.primitives {
            self.draw_primitive(&mut dt, &input.range, primitive);
        }
        for poi in &input.points_of_interest {
            self.draw_poi(&mut dt, &input.range, poi);
        }
        Ok(RenderedPreview {
            target: dt,
            digest: self.digest(&input.source_digest),
        })
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        output.target.write_png(Self::output_path(dir))
            .map_err(|err| Error::Serialization(format!("couldn't write png: {}", err)))?;
        fs::write(Self::digest_path(dir), output.digest)?;
        Ok(())
    }
}
