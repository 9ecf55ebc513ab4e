pub mod geo;
pub mod osm;
pub mod semantic;
