//! Technician proximity search engine
//!
//! Combines the technician directory with an external places provider.
//! Both sources are queried concurrently; the external call is
//! time-bounded and degrades to an empty list on failure, so a slow or
//! broken third party can never fail the search.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::warn;

use crate::db::queries;
use crate::error::{ServiceError, ServiceResult};
use crate::services::geo;
use crate::services::places::{PlaceResult, PlacesProvider};
use crate::types::{
    Coordinates, DirectoryHit, DirectoryTechnician, ExternalHit, SearchRequest, SearchResponse,
};

/// Search radius ceiling in kilometers
const MAX_RADIUS_KM: f64 = 100.0;

/// Per-source result ceiling
const MAX_LIMIT: usize = 50;

/// Provenance tag attached to external results
const EXTERNAL_SOURCE: &str = "places";

#[derive(Clone)]
pub struct SearchEngine {
    provider: Arc<dyn PlacesProvider>,
    external_timeout: Duration,
}

impl SearchEngine {
    pub fn new(provider: Arc<dyn PlacesProvider>, external_timeout: Duration) -> Self {
        Self {
            provider,
            external_timeout,
        }
    }

    pub async fn search(&self, pool: &PgPool, req: SearchRequest) -> ServiceResult<SearchResponse> {
        if !(-90.0..=90.0).contains(&req.latitude) || !(-180.0..=180.0).contains(&req.longitude) {
            return Err(ServiceError::Validation(
                "search center out of coordinate range".to_string(),
            ));
        }

        let center = Coordinates {
            lat: req.latitude,
            lng: req.longitude,
        };
        let radius_km = req.radius_km.clamp(1.0, MAX_RADIUS_KM);
        let limit = req.limit.clamp(1, MAX_LIMIT);
        let filter = req.query.trim();

        let directory_fut = queries::technician::search_directory(pool, filter);
        let external_fut = tokio::time::timeout(
            self.external_timeout,
            self.provider
                .search_nearby(filter, center, (radius_km * 1000.0) as u32),
        );

        let (directory_rows, external_outcome) = tokio::join!(directory_fut, external_fut);

        let directory = rank_directory(directory_rows?, &center, radius_km, limit);

        let external = match external_outcome {
            Ok(Ok(places)) => shape_external(places, &center, limit),
            Ok(Err(e)) => {
                warn!("External places lookup failed: {}", e);
                vec![]
            }
            Err(_) => {
                warn!(
                    "External places lookup timed out after {:?}",
                    self.external_timeout
                );
                vec![]
            }
        };

        Ok(SearchResponse {
            directory_technicians: directory,
            external_technicians: external,
            search_center_lat: center.lat,
            search_center_lng: center.lng,
            search_radius_km: radius_km,
        })
    }
}

/// Distance-filter, rank and truncate directory rows. The radius bound is
/// inclusive: a technician at exactly `radius_km` is part of the result.
fn rank_directory(
    rows: Vec<DirectoryTechnician>,
    center: &Coordinates,
    radius_km: f64,
    limit: usize,
) -> Vec<DirectoryHit> {
    let mut hits: Vec<DirectoryHit> = rows
        .into_iter()
        .filter_map(|row| {
            let location = Coordinates {
                lat: row.latitude,
                lng: row.longitude,
            };
            let distance = geo::haversine_distance(center, &location);
            if distance > radius_km {
                return None;
            }
            Some(DirectoryHit {
                id: row.id,
                name: row.name,
                surname: row.surname,
                location_name: row.location_name,
                latitude: row.latitude,
                longitude: row.longitude,
                service_types: row.service_types,
                experience_years: row.experience_years,
                is_verified: row.is_verified,
                rating: display_rating(row.avg_rating),
                distance_km: geo::round_km(distance),
                is_external: false,
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    hits.truncate(limit);
    hits
}

/// Normalize provider results into the technician-result shape, tagged
/// with provenance. The provider already enforced the radius.
fn shape_external(places: Vec<PlaceResult>, center: &Coordinates, limit: usize) -> Vec<ExternalHit> {
    places
        .into_iter()
        .take(limit)
        .map(|place| {
            let distance = geo::haversine_distance(center, &place.location);
            ExternalHit {
                id: format!("ext_{}", place.place_id),
                place_id: place.place_id,
                name: place.name,
                location_name: place.vicinity,
                latitude: place.location.lat,
                longitude: place.location.lng,
                rating: display_rating(place.rating),
                distance_km: geo::round_km(distance),
                is_external: true,
                external_source: EXTERNAL_SOURCE.to_string(),
            }
        })
        .collect()
}

fn display_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) => format!("{:.1}", r),
        None => "Not rated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const CENTER: Coordinates = Coordinates {
        lat: -26.2041,
        lng: 28.0473,
    };

    fn directory_row(lat: f64, lng: f64, rating: Option<f64>) -> DirectoryTechnician {
        DirectoryTechnician {
            id: Uuid::new_v4(),
            name: "Thandi".to_string(),
            surname: "Nkosi".to_string(),
            location_name: None,
            latitude: lat,
            longitude: lng,
            service_types: vec!["plumbing".to_string()],
            experience_years: Some(4),
            is_verified: true,
            avg_rating: rating,
        }
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let on_boundary = directory_row(CENTER.lat, CENTER.lng + 0.05, None);
        let boundary_km = geo::haversine_distance(
            &CENTER,
            &Coordinates {
                lat: on_boundary.latitude,
                lng: on_boundary.longitude,
            },
        );

        let included = rank_directory(
            vec![on_boundary.clone()],
            &CENTER,
            boundary_km,
            10,
        );
        assert_eq!(included.len(), 1);

        let excluded = rank_directory(vec![on_boundary], &CENTER, boundary_km - 0.01, 10);
        assert!(excluded.is_empty());
    }

    #[test]
    fn directory_results_sorted_by_distance_and_truncated() {
        let far = directory_row(CENTER.lat + 0.4, CENTER.lng, None);
        let near = directory_row(CENTER.lat + 0.01, CENTER.lng, None);
        let mid = directory_row(CENTER.lat + 0.1, CENTER.lng, None);

        let ranked = rank_directory(vec![far.clone(), near.clone(), mid], &CENTER, 100.0, 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, near.id);
        assert!(ranked[0].distance_km <= ranked[1].distance_km);
    }

    #[test]
    fn unrated_technician_shows_not_rated() {
        let ranked = rank_directory(
            vec![
                directory_row(CENTER.lat, CENTER.lng, None),
                directory_row(CENTER.lat, CENTER.lng, Some(4.25)),
            ],
            &CENTER,
            10.0,
            10,
        );

        let ratings: Vec<&str> = ranked.iter().map(|h| h.rating.as_str()).collect();
        assert!(ratings.contains(&"Not rated"));
        assert!(ratings.contains(&"4.2"));
    }

    #[test]
    fn external_hits_are_tagged_and_prefixed() {
        let places = vec![PlaceResult {
            place_id: "abc123".to_string(),
            name: "Joe's Plumbing".to_string(),
            vicinity: "12 Main Rd".to_string(),
            location: Coordinates {
                lat: CENTER.lat + 0.01,
                lng: CENTER.lng,
            },
            rating: None,
        }];

        let hits = shape_external(places, &CENTER, 10);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "ext_abc123");
        assert!(hits[0].is_external);
        assert_eq!(hits[0].external_source, "places");
        assert_eq!(hits[0].rating, "Not rated");
        assert!(hits[0].distance_km > 0.0);
    }

    #[test]
    fn external_hits_truncated_to_limit() {
        let places: Vec<PlaceResult> = (0..5)
            .map(|i| PlaceResult {
                place_id: format!("p{}", i),
                name: "Biz".to_string(),
                vicinity: "Somewhere".to_string(),
                location: CENTER,
                rating: Some(3.0),
            })
            .collect();

        assert_eq!(shape_external(places, &CENTER, 3).len(), 3);
    }

    #[test]
    fn distances_rounded_to_two_places() {
        let ranked = rank_directory(
            vec![directory_row(CENTER.lat + 0.013, CENTER.lng + 0.007, None)],
            &CENTER,
            50.0,
            10,
        );

        let km = ranked[0].distance_km;
        assert_eq!(geo::round_km(km), km);
    }
}
