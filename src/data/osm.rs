use std::collections::HashMap;

/// Tags of a node or way. Keys are unique; a repeated key keeps its last value.
pub type Tags = HashMap<String, String>;

/// Node lookup table keyed by node id.
pub type NodeTable = HashMap<String, NodeRecord>;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WayRecord {
    /// Only used to identify the way in diagnostics.
    pub id: Option<String>,
    pub node_refs: Vec<String>,
    pub tags: Tags,
}

/// Map data as declared in the .osm file. The bounds declaration is kept raw and
/// only validated when the region is extracted from it.
#[derive(Debug, Clone, Default)]
pub struct OsmDocument {
    pub bounds: Option<HashMap<String, String>>,
    pub nodes: NodeTable,
    pub ways: Vec<WayRecord>,
}
