//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Round a distance to two decimal places for display
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Total, count and average distance from one point to each of a set of
/// points. Used for technician distance statistics over completed bookings.
pub fn distance_summary(from: &Coordinates, points: &[Coordinates]) -> (f64, usize, f64) {
    let total: f64 = points
        .iter()
        .map(|p| haversine_distance(from, p))
        .sum();
    let count = points.len();
    let average = if count > 0 { total / count as f64 } else { 0.0 };
    (round_km(total), count, round_km(average))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_johannesburg_cape_town() {
        let johannesburg = Coordinates {
            lat: -26.2041,
            lng: 28.0473,
        };
        let cape_town = Coordinates {
            lat: -33.9249,
            lng: 18.4241,
        };

        let distance = haversine_distance(&johannesburg, &cape_town);

        // Johannesburg to Cape Town is approximately 1270 km
        assert!((distance - 1270.0).abs() < 5.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = Coordinates { lat: -26.2, lng: 28.05 };
        let b = Coordinates { lat: -29.85, lng: 31.02 };

        let ab = haversine_distance(&a, &b);
        let ba = haversine_distance(&b, &a);

        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let point = Coordinates { lat: -26.2, lng: 28.05 };
        let distance = haversine_distance(&point, &point);
        assert!(distance.abs() < 0.001);
    }

    #[test]
    fn rounding_to_two_places() {
        assert_eq!(round_km(3.14159), 3.14);
        assert_eq!(round_km(3.145), 3.15);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[test]
    fn summary_over_empty_set() {
        let home = Coordinates { lat: -26.2, lng: 28.05 };
        let (total, count, average) = distance_summary(&home, &[]);
        assert_eq!(total, 0.0);
        assert_eq!(count, 0);
        assert_eq!(average, 0.0);
    }

    #[test]
    fn summary_averages_distances() {
        let home = Coordinates { lat: 0.0, lng: 0.0 };
        let points = vec![
            Coordinates { lat: 0.0, lng: 1.0 },
            Coordinates { lat: 0.0, lng: 2.0 },
        ];

        let (total, count, average) = distance_summary(&home, &points);

        assert_eq!(count, 2);
        // One degree of longitude at the equator is ~111.19 km
        assert!((total - 333.58).abs() < 1.0);
        assert!((average - total / 2.0).abs() < 0.01);
    }
}
