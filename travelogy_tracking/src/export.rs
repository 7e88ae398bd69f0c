//! Serialization of a finished (or still growing) track into the standard
//! interchange formats. Pure and synchronous; completely unrelated to the
//! tracking state machine.

use geo_types::Point;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use travelogy_lib::track_path::TrackPath;

pub const GEOJSON_MIME: &str = "application/geo+json";
pub const GPX_MIME: &str = "application/gpx+xml";

pub const GPX_CREATOR: &str = "Travelogy";

#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// A line needs at least two vertices. A single-point GPX would be
    /// structurally legal but useless as a track, so both formats share this
    /// floor.
    InsufficientPoints { have: usize },
    Write(String),
}

/// `FeatureCollection` with a single `LineString` feature. GeoJSON positions
/// are `[longitude, latitude]`, the reverse of the fix field order.
pub fn to_geojson(path: &TrackPath, trip_id: Option<&str>) -> Result<String, ExportError> {
    ensure_line(path)?;

    let coordinates: Vec<Vec<f64>> = path
        .iter()
        .map(|fix| vec![fix.longitude, fix.latitude])
        .collect();

    let mut properties = JsonObject::new();
    if let Some(trip_id) = trip_id {
        properties.insert("trip_id".to_string(), trip_id.into());
    }

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };

    let collection = FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    };

    Ok(GeoJson::from(collection).to_string())
}

/// Minimal GPX 1.1 document: one `trk`, one `trkseg`, one `trkpt` per fix.
pub fn to_gpx(path: &TrackPath, name: &str) -> Result<String, ExportError> {
    ensure_line(path)?;

    let mut segment = TrackSegment::new();
    segment.points = path
        .iter()
        // Waypoint::new takes an x/y point, so longitude first here too.
        .map(|fix| Waypoint::new(Point::new(fix.longitude, fix.latitude)))
        .collect();

    let mut track = Track::new();
    track.name = Some(name.to_string());
    track.segments.push(segment);

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some(GPX_CREATOR.to_string());
    gpx.tracks.push(track);

    let mut out = Vec::new();
    gpx::write(&gpx, &mut out).map_err(|err| ExportError::Write(err.to_string()))?;
    String::from_utf8(out).map_err(|err| ExportError::Write(err.to_string()))
}

fn ensure_line(path: &TrackPath) -> Result<(), ExportError> {
    if path.len() < 2 {
        return Err(ExportError::InsufficientPoints { have: path.len() });
    }
    Ok(())
}
