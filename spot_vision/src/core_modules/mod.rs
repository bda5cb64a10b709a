pub mod filters;
pub mod frame_source;
pub mod geometry;
pub mod region;
pub mod spot_analyzer;
pub mod status;
