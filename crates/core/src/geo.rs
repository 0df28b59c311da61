//! Geodesic distance and flight time arithmetic.

/// Mean Earth radius used by the spherical fallback.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default flight rate, minutes per 100 km.
pub const MINUTES_PER_100_KM: f64 = 15.0;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
const VINCENTY_TOLERANCE: f64 = 1e-12;
const VINCENTY_MAX_ITERATIONS: usize = 200;

/// Distance in kilometres between two `(latitude, longitude)` points on the
/// WGS-84 ellipsoid.
pub fn distance_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    vincenty_km(from, to).unwrap_or_else(|| haversine_km(from, to))
}

/// Great-circle distance on a sphere of radius [`EARTH_RADIUS_KM`].
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Vincenty's inverse formula. Returns `None` when the iteration fails to
/// converge, which happens for nearly antipodal points.
fn vincenty_km(from: (f64, f64), to: (f64, f64)) -> Option<f64> {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    if lat1 == lat2 && lon1 == lon2 {
        return Some(0.0);
    }

    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos_sq_alpha == 0.
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - previous).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            let metres = WGS84_B * a * (sigma - delta_sigma);
            return Some(metres / 1000.0);
        }
    }

    None
}

/// Flight time in minutes for a hop of `distance_km` at the given rate.
pub fn flight_time_minutes(distance_km: f64, minutes_per_100km: f64) -> f64 {
    (distance_km / 100.0) * minutes_per_100km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_time_is_linear() {
        assert_eq!(flight_time_minutes(200.0, MINUTES_PER_100_KM), 30.0);
        assert_eq!(flight_time_minutes(0.0, MINUTES_PER_100_KM), 0.0);
        assert_eq!(flight_time_minutes(1000.0, 20.0), 200.0);
    }

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_km((60.0, 25.0), (60.0, 25.0)), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_at_sixty_north() {
        // Meridional degree at 60.5°N on WGS-84 is roughly 111.42 km.
        let d = distance_km((60.0, 25.0), (61.0, 25.0));
        assert!((d - 111.4).abs() < 0.2, "got {d}");
    }

    #[test]
    fn helsinki_to_oulu_matches_known_distance() {
        let d = distance_km((60.3172, 24.9633), (64.9301, 25.3546));
        assert!((d - 514.0).abs() < 3.0, "got {d}");
        let sphere = haversine_km((60.3172, 24.9633), (64.9301, 25.3546));
        assert!((d - sphere).abs() < 5.0);
    }

    #[test]
    fn antipodal_points_fall_back_to_sphere() {
        let d = distance_km((0.0, 0.0), (0.5, 179.7));
        assert!(d.is_finite());
        assert!(d > 19_000.0 && d < 20_100.0, "got {d}");
    }
}
