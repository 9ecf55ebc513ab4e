use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::geo::GeoBounds;
use crate::data::osm::{NodeRecord, OsmDocument, Tags, WayRecord};
use crate::data::semantic::{Diagnostic, DiagnosticKind};
use crate::errors::{Error, Result};
use crate::etl::report;

const BOUNDS_FIELDS: [&str; 4] = ["minlat", "maxlat", "minlon", "maxlon"];

/// Parsed document together with the records that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedOsm {
    pub document: OsmDocument,
    pub diagnostics: Vec<Diagnostic>,
}

enum ParserState {
    Top,
    Node {
        id: Option<String>,
        node: std::result::Result<NodeRecord, String>,
    },
    Way {
        way: WayRecord,
        problem: Option<String>,
    },
}

struct FeatureParser {
    depth: usize,
    seen_root: bool,
    state: ParserState,
    output: ParsedOsm,
}

impl FeatureParser {
    fn new() -> Self {
        FeatureParser {
            depth: 0,
            seen_root: false,
            state: ParserState::Top,
            output: ParsedOsm::default(),
        }
    }

    fn attributes(el: &BytesStart) -> Result<HashMap<String, String>> {
        let mut attributes = HashMap::new();
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            let key = str::from_utf8(attribute.key.as_ref())?.to_string();
            let value = attribute.unescape_value()?.to_string();
            attributes.insert(key, value);
        }
        Ok(attributes)
    }

    fn parse_coordinate(attributes: &HashMap<String, String>, key: &str) -> std::result::Result<f64, String> {
        let value_str = attributes.get(key).ok_or_else(|| format!("missing '{}'", key))?;
        let value: f64 = value_str
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number: {}", key, value_str))?;
        if !value.is_finite() {
            return Err(format!("'{}' is not finite: {}", key, value_str));
        }
        Ok(value)
    }

    fn node_id(attributes: &HashMap<String, String>) -> Option<String> {
        attributes.get("id").filter(|id| !id.is_empty()).cloned()
    }

    fn parse_node(id: Option<String>, attributes: &HashMap<String, String>) -> std::result::Result<NodeRecord, String> {
        let id = id.ok_or_else(|| "missing 'id'".to_string())?;
        let lat = Self::parse_coordinate(attributes, "lat")?;
        let lon = Self::parse_coordinate(attributes, "lon")?;

        Ok(NodeRecord {
            id,
            lat,
            lon,
            tags: Tags::new(),
        })
    }

    fn parse_tag(attributes: &HashMap<String, String>) -> Option<(String, String)> {
        Some((attributes.get("k")?.clone(), attributes.get("v")?.clone()))
    }

    fn open(&mut self, el: &BytesStart, empty: bool) -> Result<()> {
        let name = el.name();
        let name = name.as_ref();

        if self.depth == 0 {
            if self.seen_root {
                return Err(Error::MalformedDocument("more than one root element".to_string()));
            }
            if name != b"osm" {
                return Err(Error::MalformedDocument(format!(
                    "expected <osm> root element, found <{}>",
                    String::from_utf8_lossy(name)
                )));
            }
            self.seen_root = true;
        } else if self.depth == 1 {
            match name {
                b"bounds" => {
                    // Only the first declaration counts.
                    if self.output.document.bounds.is_none() {
                        self.output.document.bounds = Some(Self::attributes(el)?);
                    }
                },
                b"node" => {
                    let attributes = Self::attributes(el)?;
                    let id = Self::node_id(&attributes);
                    let node = Self::parse_node(id.clone(), &attributes);
                    if empty {
                        self.finish_node(id, node);
                    } else {
                        self.state = ParserState::Node { id, node };
                    }
                },
                b"way" => {
                    let way = WayRecord {
                        id: Self::attributes(el)?.remove("id"),
                        ..WayRecord::default()
                    };
                    if empty {
                        self.finish_way(way, None);
                    } else {
                        self.state = ParserState::Way { way, problem: None };
                    }
                },
                _ => (),
            }
        } else if self.depth == 2 {
            match (&mut self.state, name) {
                (ParserState::Node { node, .. }, b"tag") => {
                    let attributes = Self::attributes(el)?;
                    match (node, Self::parse_tag(&attributes)) {
                        (Ok(node), Some((key, value))) => {
                            node.tags.insert(key, value);
                        },
                        (Ok(node), None) => {
                            debug!(node = node.id.as_str(); "Ignoring node tag without key or value");
                        },
                        (Err(_), _) => (),
                    }
                },
                (ParserState::Way { way, problem }, b"nd") => {
                    match Self::attributes(el)?.remove("ref") {
                        Some(node_ref) if !node_ref.is_empty() => way.node_refs.push(node_ref),
                        _ => {
                            problem.get_or_insert_with(|| "node reference without 'ref'".to_string());
                        },
                    }
                },
                (ParserState::Way { way, problem }, b"tag") => {
                    match Self::parse_tag(&Self::attributes(el)?) {
                        Some((key, value)) => {
                            way.tags.insert(key, value);
                        },
                        None => {
                            problem.get_or_insert_with(|| "tag without key or value".to_string());
                        },
                    }
                },
                _ => (),
            }
        }

        if !empty {
            self.depth += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 1 {
            match std::mem::replace(&mut self.state, ParserState::Top) {
                ParserState::Top => (),
                ParserState::Node { id, node } => self.finish_node(id, node),
                ParserState::Way { way, problem } => self.finish_way(way, problem),
            }
        }
    }

    fn finish_node(&mut self, id: Option<String>, node: std::result::Result<NodeRecord, String>) {
        match node {
            Ok(node) => {
                if let Some(previous) = self.output.document.nodes.insert(node.id.clone(), node) {
                    debug!(node = previous.id.as_str(); "Duplicate node id, keeping the last declaration");
                }
            },
            Err(detail) => report(&mut self.output.diagnostics, Diagnostic {
                element: "node".to_string(),
                id,
                kind: DiagnosticKind::MalformedNode { detail },
            }),
        }
    }

    fn finish_way(&mut self, way: WayRecord, problem: Option<String>) {
        match problem {
            None => self.output.document.ways.push(way),
            Some(detail) => report(&mut self.output.diagnostics, Diagnostic {
                element: "way".to_string(),
                id: way.id,
                kind: DiagnosticKind::MalformedWay { detail },
            }),
        }
    }

    fn finish(self) -> Result<ParsedOsm> {
        if !self.seen_root {
            return Err(Error::MalformedDocument("no <osm> element found".to_string()));
        }
        if self.depth != 0 {
            return Err(Error::MalformedDocument("document ends inside an open element".to_string()));
        }
        Ok(self.output)
    }
}

/// Parses an OSM XML document into its node table and way list.
///
/// Fails only when the input is not a well-formed `<osm>` document. Individual nodes and
/// ways that cannot be understood are skipped and returned as diagnostics.
pub fn parse(raw: &str) -> Result<ParsedOsm> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(true);
    let mut parser = FeatureParser::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => parser.open(&e, false)?,
            Event::Empty(e) => parser.open(&e, true)?,
            Event::End(_e) => parser.close(),
            // Declarations, comments and stray text carry nothing we draw.
            _ => (),
        }
    }
    parser.finish()
}

/// Reads the region covered by the document from its bounds declaration.
pub fn extract_bounds(document: &OsmDocument) -> Result<GeoBounds> {
    let raw = document.bounds.as_ref().ok_or(Error::MissingBounds)?;

    let mut values = [0.0_f64; 4];
    for (value, field) in values.iter_mut().zip(BOUNDS_FIELDS) {
        let value_str = raw.get(field).ok_or_else(|| Error::MalformedBounds {
            field: field.to_string(),
            reason: "attribute is missing".to_string(),
        })?;
        *value = value_str.trim().parse().map_err(|_| Error::MalformedBounds {
            field: field.to_string(),
            reason: format!("'{}' is not a number", value_str),
        })?;
    }
    let [min_lat, max_lat, min_lon, max_lon] = values;

    GeoBounds::new(min_lat, max_lat, min_lon, max_lon)
}

/// Reads an .osm file into memory, transparently decompressing `.xz` inputs.
pub fn read_osm_file(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut file_reader = BufReader::new(file);
    let mut bytes = Vec::new();

    if path.extension().is_some_and(|extension| extension == "xz") {
        XzDecoder::new(file_reader).read_to_end(&mut bytes)?;
    } else {
        file_reader.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}
