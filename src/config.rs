use std::{fs::File, io::BufReader, path::Path};

use raqote::SolidSource;
use serde::{Deserialize, Serialize};

use crate::{
    data::{geo::{OutputRange, ProjectedPoint}, semantic::PoiKind},
    errors::{Error, Result},
};

pub const DEFAULT_EXTRUDE_DEPTH: f64 = 0.2;

/// What happens to a way when one of its node references cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePolicy {
    /// Drop the unresolved node and keep the remaining points.
    DropNode,
    /// Drop the whole way.
    DropWay,
}

pub const DEFAULT_NODE_POLICY: NodePolicy = NodePolicy::DropNode;

impl Default for NodePolicy {
    fn default() -> Self {
        DEFAULT_NODE_POLICY
    }
}

/// Tunables of the extraction pipeline. Passed explicitly to every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub out_min: f64,
    pub out_max: f64,
    pub extrude_depth: f64,
    pub node_policy: NodePolicy,
    /// Seed for building colors. `None` draws colors from entropy.
    pub color_seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let range = OutputRange::default();
        SceneConfig {
            out_min: range.min,
            out_max: range.max,
            extrude_depth: DEFAULT_EXTRUDE_DEPTH,
            node_policy: DEFAULT_NODE_POLICY,
            color_seed: None,
        }
    }
}

impl SceneConfig {
    pub fn seeded(seed: u64) -> Self {
        SceneConfig {
            color_seed: Some(seed),
            ..SceneConfig::default()
        }
    }

    pub fn range(&self) -> Result<OutputRange> {
        OutputRange::new(self.out_min, self.out_max)
    }

    pub fn validate(&self) -> Result<()> {
        self.range()?;
        if !self.extrude_depth.is_finite() || self.extrude_depth < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "extrude depth {} must be a non-negative number", self.extrude_depth
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPoi {
    pub kind: PoiKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl FixedPoi {
    pub fn position(&self) -> ProjectedPoint {
        ProjectedPoint::new(self.x, self.y)
    }
}

#[derive(Deserialize)]
pub struct Theme {
    #[serde(deserialize_with = "serialize_color::deserialize")]
    pub background: SolidSource,

    #[serde(deserialize_with = "serialize_color::deserialize")]
    pub road: SolidSource,

    #[serde(deserialize_with = "serialize_color::deserialize")]
    pub poi: SolidSource,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: SolidSource::from_unpremultiplied_argb(0xff, 0xff, 0xff, 0xff),
            road: SolidSource::from_unpremultiplied_argb(0xff, 0x00, 0x00, 0xff),
            poi: SolidSource::from_unpremultiplied_argb(0xff, 0xe6, 0x00, 0x00),
        }
    }
}

mod serialize_color {
    use raqote::SolidSource;
    use serde::{de, Deserializer};
    use serde::de::Visitor;

    struct ColorVisitor;

    impl<'de> Visitor<'de> for ColorVisitor {
        type Value = SolidSource;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a color string formatted as '#RRGGBBAA'")
        }

        fn visit_str<E>(self, string: &str) -> Result<Self::Value, E> where E: de::Error {
            if string.len() != 9 || !string.is_ascii() || !string.starts_with('#') {
                return Err(de::Error::invalid_value(de::Unexpected::Str(string), &self))
            }
            let r = parse_hex_byte(&self, &string[1..3])?;
            let g = parse_hex_byte(&self, &string[3..5])?;
            let b = parse_hex_byte(&self, &string[5..7])?;
            let a = parse_hex_byte(&self, &string[7..9])?;
            Ok(SolidSource::from_unpremultiplied_argb(a, r, g, b))
        }
    }

    fn parse_hex_byte<E>(visitor: &ColorVisitor, string: &str) -> Result<u8, E> where E: de::Error {
        u8::from_str_radix(string, 16).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(string), visitor)
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SolidSource, D::Error>
        where D: Deserializer<'de> {
        deserializer.deserialize_str(ColorVisitor)
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub width_px: u32,
    pub height_px: u32,
    pub theme: Theme,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            width_px: 1024,
            height_px: 1024,
            theme: Theme::default(),
        }
    }
}

#[derive(Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub weather_path: Option<String>,
    #[serde(default)]
    pub points_of_interest: Vec<FixedPoi>,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl UserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: UserConfig = serde_json::from_str(json)?;
        config.scene.validate()?;
        Ok(config)
    }
}

pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)?;
    let config: UserConfig = serde_json::from_reader(BufReader::new(file))?;
    config.scene.validate()?;
    Ok(config)
}
