// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map feed of recent sightings around a point.

use crate::db::SightingStore;
use crate::error::AppError;
use crate::models::{Coordinates, Sighting};
use crate::time_utils::format_utc_rfc3339;
use geo::{Distance, Haversine, Point};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};

/// How many of the newest sightings are searched.
pub const NEARBY_SEARCH_WINDOW: u32 = 500;

/// Great-circle distance in meters.
pub fn distance_m(a: Coordinates, b: Coordinates) -> f64 {
    // geo points are (x = lng, y = lat)
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

/// Sightings within `radius_m` of `center`, nearest first.
pub fn within_radius(
    sightings: Vec<Sighting>,
    center: Coordinates,
    radius_m: f64,
) -> Vec<(Sighting, f64)> {
    let mut hits: Vec<(Sighting, f64)> = sightings
        .into_iter()
        .map(|s| {
            let d = distance_m(center, s.coordinates);
            (s, d)
        })
        .filter(|(_, d)| *d <= radius_m)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

fn to_feature(sighting: &Sighting, distance: f64) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("species".to_string(), sighting.species.clone().into());
    properties.insert(
        "sighting_url".to_string(),
        sighting.sighting_url.clone().into(),
    );
    properties.insert("user_id".to_string(), sighting.user_id.clone().into());
    properties.insert(
        "timestamp".to_string(),
        format_utc_rfc3339(sighting.timestamp).into(),
    );
    properties.insert("distance_m".to_string(), distance.round().into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            sighting.coordinates.lng,
            sighting.coordinates.lat,
        ]))),
        id: Some(Id::String(sighting.sighting_id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Build a GeoJSON FeatureCollection of recent sightings near `center`.
pub async fn nearby_sightings(
    store: &dyn SightingStore,
    center: Coordinates,
    radius_m: f64,
) -> Result<FeatureCollection, AppError> {
    let recent = store.recent_sightings(NEARBY_SEARCH_WINDOW).await?;
    let searched = recent.len();
    let hits = within_radius(recent, center, radius_m);

    tracing::debug!(
        lat = center.lat,
        lng = center.lng,
        radius_m,
        searched,
        found = hits.len(),
        "Nearby sightings"
    );

    Ok(FeatureCollection {
        bbox: None,
        features: hits.iter().map(|(s, d)| to_feature(s, *d)).collect(),
        foreign_members: None,
    })
}
