use crate::data::osm::{Tags, WayRecord};
use crate::data::semantic::Interest;

pub const BUILDING_KEY: &str = "building";
pub const HIGHWAY_KEY: &str = "highway";

/// Decides what a way is drawn as. Any `building` tag, even an empty one, wins over `highway`.
pub fn classify_tags(tags: &Tags) -> Interest {
    if tags.contains_key(BUILDING_KEY) {
        Interest::Area
    } else if tags.contains_key(HIGHWAY_KEY) {
        Interest::Line
    } else {
        Interest::NotInterested
    }
}

pub fn classify(way: &WayRecord) -> Interest {
    classify_tags(&way.tags)
}
