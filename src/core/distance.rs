use crate::models::{BoundingBox, Location};

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate kilometers per degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance in kilometers between two coordinates in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Coarse box around a point, used to narrow the candidate query server-side
pub fn bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEGREE;
    // Longitude degrees shrink towards the poles
    let lon_delta = radius_km / (KM_PER_DEGREE * lat.to_radians().cos().abs().max(0.01));

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    (bbox.min_lat..=bbox.max_lat).contains(&lat) && (bbox.min_lon..=bbox.max_lon).contains(&lon)
}

/// The proximity hint stored on candidate locations
pub fn is_nearby(origin: &Location, candidate: &Location, max_distance_km: f64) -> bool {
    haversine_distance(origin.latitude, origin.longitude, candidate.latitude, candidate.longitude)
        <= max_distance_km
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(latitude: f64, longitude: f64) -> Location {
        Location {
            city: None,
            state: None,
            country: None,
            latitude,
            longitude,
            is_nearby: false,
        }
    }

    #[test]
    fn test_haversine_distance() {
        // Berlin to Munich is roughly 504 km
        let distance = haversine_distance(52.5200, 13.4050, 48.1351, 11.5820);
        assert!((distance - 504.0).abs() < 10.0, "Distance should be ~504km, got {}", distance);
    }

    #[test]
    fn test_bounding_box_contains_center() {
        let bbox = bounding_box(52.5200, 13.4050, 25.0);

        assert!(is_within_bounding_box(52.5200, 13.4050, &bbox));
        assert!(!is_within_bounding_box(48.1351, 11.5820, &bbox));

        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.45).abs() < 0.02, "Lat span should be ~0.45 degrees");
    }

    #[test]
    fn test_is_nearby() {
        let berlin = location(52.5200, 13.4050);
        let potsdam = location(52.3906, 13.0645);
        let munich = location(48.1351, 11.5820);

        assert!(is_nearby(&berlin, &potsdam, 50.0));
        assert!(!is_nearby(&berlin, &munich, 50.0));
    }
}
