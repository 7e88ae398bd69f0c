pub mod distance;
pub mod geo_fix;
pub mod remote_trip;
pub mod track_path;
