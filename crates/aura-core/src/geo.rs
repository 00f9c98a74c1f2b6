/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two WGS84 coordinates,
/// via the haversine formula. Inputs are degrees, validated upstream
/// to lie within [-90, 90] / [-180, 180].
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance_for_identical_points() {
        assert_eq!(distance_meters(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
        assert_eq!(distance_meters(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(distance_meters(-90.0, 180.0, -90.0, 180.0), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let d1 = distance_meters(40.7128, -74.0060, 51.5007, -0.1246);
        let d2 = distance_meters(51.5007, -0.1246, 40.7128, -74.0060);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_known_distances() {
        // ~0.0054 degrees of longitude at NYC latitude
        let d = distance_meters(40.7128, -74.0006, 40.7128, -74.0060);
        assert_eq!(d.round(), 455.0);

        // ~0.001 degrees of latitude is ~111 meters anywhere
        let d = distance_meters(40.7128, -74.0060, 40.7138, -74.0060);
        assert!((d - 111.2).abs() < 0.5);

        // Big Ben to the Eiffel Tower, ~340.5 km
        let d = distance_meters(51.5007, -0.1246, 48.8584, 2.2945);
        assert!((d - 340_539.0).abs() < 100.0);
    }

    #[test]
    fn test_within_geofence() {
        // A few meters of drift stays well under a 100m radius
        let d = distance_meters(40.712800, -74.006000, 40.712805, -74.006010);
        assert!(d < 2.0);
    }
}
