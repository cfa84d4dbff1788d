use super::model::{BottleSample, GeoPoint};

/// Mean earth radius in km, spherical-earth approximation.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

// ---------------------------------------------------------------------------
// Great-circle distance
// ---------------------------------------------------------------------------

/// Haversine distance between two points, in km.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

// ---------------------------------------------------------------------------
// Sample selection
// ---------------------------------------------------------------------------

/// Mask of the samples within `max_dist_km` of the buoy (inclusive).
pub fn find_nearest(samples: &[BottleSample], buoy: GeoPoint, max_dist_km: f64) -> Vec<bool> {
    samples
        .iter()
        .map(|s| haversine_km(s.location, buoy) <= max_dist_km)
        .collect()
}

/// Samples within `max_dist_km` of the buoy whose depth lies in
/// `[buoy_depth - depth_tol, buoy_depth + depth_tol]`.
///
/// Samples without a recorded depth are dropped.
pub fn find_samples(
    samples: &[BottleSample],
    buoy: GeoPoint,
    buoy_depth: f64,
    max_dist_km: f64,
    depth_tol: f64,
) -> Vec<BottleSample> {
    let depth_min = buoy_depth - depth_tol;
    let depth_max = buoy_depth + depth_tol;
    let nearest = find_nearest(samples, buoy, max_dist_km);

    let selected: Vec<BottleSample> = samples
        .iter()
        .zip(nearest)
        .filter(|(s, near)| *near && s.depth >= depth_min && s.depth <= depth_max)
        .map(|(s, _)| s.clone())
        .collect();

    log::debug!(
        "{} of {} samples within {max_dist_km} km and {depth_min}..={depth_max} m",
        selected.len(),
        samples.len()
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample(latitude: f64, longitude: f64, depth: f64) -> BottleSample {
        BottleSample {
            location: GeoPoint::new(latitude, longitude),
            depth,
            metadata: BTreeMap::new(),
        }
    }

    /// Point due north of `origin` at exactly `km`.
    fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
        GeoPoint::new(origin.latitude + (km / EARTH_RADIUS_KM).to_degrees(), origin.longitude)
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "{d}");
    }

    #[test]
    fn distance_boundary_is_inclusive() {
        let buoy = GeoPoint::new(44.6393, -124.304);
        let max = 10.0;
        let at = north_of(buoy, max);
        // exact distance of the boundary point as computed, not the nominal 10 km
        let max_dist = haversine_km(at, buoy);
        let beyond = north_of(buoy, max + 1e-3);

        let samples = [
            sample(at.latitude, at.longitude, 7.0),
            sample(beyond.latitude, beyond.longitude, 7.0),
            sample(buoy.latitude, buoy.longitude, 7.0),
        ];
        assert_eq!(find_nearest(&samples, buoy, max_dist), vec![true, false, true]);
    }

    #[test]
    fn depth_boundary_is_inclusive() {
        let buoy = GeoPoint::new(44.6393, -124.304);
        let samples = [
            sample(buoy.latitude, buoy.longitude, 12.0),
            sample(buoy.latitude, buoy.longitude, 12.0 + 1e-9),
            sample(buoy.latitude, buoy.longitude, 2.0),
            sample(buoy.latitude, buoy.longitude, f64::NAN),
            sample(45.5, -124.304, 7.0),
        ];
        let kept = find_samples(&samples, buoy, 7.0, 10.0, 5.0);
        let depths: Vec<f64> = kept.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![12.0, 2.0]);
    }
}
