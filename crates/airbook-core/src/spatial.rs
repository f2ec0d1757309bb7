//! Spherical and local-planar math shared by the sampler and the coverer.

use crate::models::GeoPoint;

/// Mean earth radius used for great-circle math.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two [`GeoPoint`]s, ignoring altitude.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Bearing from point 1 to point 2 in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing. Returns `(lat, lon)` in degrees.
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Point at `fraction` of the way along the great circle from `a` to `b`.
///
/// Altitude is interpolated linearly. Antipodal endpoints have no unique great circle;
/// the caller rejects them before sampling.
pub fn intermediate_point(a: &GeoPoint, b: &GeoPoint, fraction: f64) -> GeoPoint {
    let altitude_m = a.altitude_m + (b.altitude_m - a.altitude_m) * fraction;
    let va = to_unit_vector(a);
    let vb = to_unit_vector(b);
    let dot = (va[0] * vb[0] + va[1] * vb[1] + va[2] * vb[2]).clamp(-1.0, 1.0);
    let omega = dot.acos();
    if omega.abs() < 1e-12 {
        return GeoPoint::new(a.lon, a.lat, altitude_m);
    }
    let sin_omega = omega.sin();
    let wa = ((1.0 - fraction) * omega).sin() / sin_omega;
    let wb = (fraction * omega).sin() / sin_omega;
    let v = [
        wa * va[0] + wb * vb[0],
        wa * va[1] + wb * vb[1],
        wa * va[2] + wb * vb[2],
    ];
    let (lat, lon) = from_unit_vector(v);
    GeoPoint::new(lon, lat, altitude_m)
}

fn to_unit_vector(p: &GeoPoint) -> [f64; 3] {
    let phi = p.lat.to_radians();
    let lambda = p.lon.to_radians();
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

fn from_unit_vector(v: [f64; 3]) -> (f64, f64) {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    (lat.to_degrees(), lon.to_degrees())
}

/// Local east/north frame in meters around a reference point.
///
/// Good enough for polygons and segments a few tens of kilometers across, which is
/// what bookings cover. Longitudes are unwrapped relative to the origin so rings
/// straddling the antimeridian stay contiguous.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin_lat: f64,
    origin_lon: f64,
    m_per_deg_lat: f64,
    m_per_deg_lon: f64,
}

impl LocalFrame {
    pub fn new(origin: &GeoPoint) -> Self {
        Self {
            origin_lat: origin.lat,
            origin_lon: origin.lon,
            m_per_deg_lat: meters_per_deg_lat(origin.lat),
            m_per_deg_lon: meters_per_deg_lon(origin.lat).max(1e-9),
        }
    }

    /// Frame centred on the mean of the given points.
    pub fn around(points: &[GeoPoint]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(&GeoPoint::flat(0.0, 0.0));
        };
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points
            .iter()
            .map(|p| first.lon + wrap_lon_delta(p.lon - first.lon))
            .sum::<f64>()
            / n;
        Self::new(&GeoPoint::flat(wrap_lon(lon), lat))
    }

    /// Project to `(east_m, north_m)`.
    pub fn project(&self, p: &GeoPoint) -> (f64, f64) {
        let east = wrap_lon_delta(p.lon - self.origin_lon) * self.m_per_deg_lon;
        let north = (p.lat - self.origin_lat) * self.m_per_deg_lat;
        (east, north)
    }
}

fn wrap_lon_delta(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Ray-casting point-in-polygon test on projected coordinates.
pub fn point_in_ring(ring: &[(f64, f64)], p: (f64, f64)) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > p.1) != (yj > p.1)) && (p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Fraction along segment `a -> b` of the point's perpendicular foot, clamped to [0, 1].
pub fn project_fraction(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let sx = b.0 - a.0;
    let sy = b.1 - a.1;
    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 1e-4 {
        return 0.0;
    }
    (((p.0 - a.0) * sx + (p.1 - a.1) * sy) / seg_len_sq).clamp(0.0, 1.0)
}

/// Distance from `p` to segment `a -> b` in projected meters.
pub fn distance_to_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let t = project_fraction(a, b, p);
    let cx = a.0 + t * (b.0 - a.0);
    let cy = a.1 + t * (b.1 - a.1);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

pub(crate) fn segments_intersect_2d(
    a1: (f64, f64),
    a2: (f64, f64),
    b1: (f64, f64),
    b2: (f64, f64),
) -> bool {
    // Tolerance in projected meters, absorbing projection round-off.
    const EPS_M: f64 = 1e-6;

    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS_M;
        let max = a.max(b) + EPS_M;
        value >= min && value <= max
    }

    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        within(p.0, q.0, r.0) && within(p.1, q.1, r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS_M && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS_M && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS_M && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS_M && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS_M && o2 < -EPS_M) || (o1 < -EPS_M && o2 > EPS_M);
    let b_crosses = (o3 > EPS_M && o4 < -EPS_M) || (o3 < -EPS_M && o4 > EPS_M);
    a_crosses && b_crosses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(50.9077, -1.392, 50.9077, -1.392);
        assert!(dist < 0.001);
    }

    #[test]
    fn intermediate_point_hits_endpoints_and_midpoint() {
        let a = GeoPoint::new(-1.3920021, 50.9076876, 100.0);
        let b = GeoPoint::new(-1.4546585, 50.9303594, 200.0);
        let start = intermediate_point(&a, &b, 0.0);
        let end = intermediate_point(&a, &b, 1.0);
        assert!(distance_m(&start, &a) < 1e-3);
        assert!(distance_m(&end, &b) < 1e-3);

        let mid = intermediate_point(&a, &b, 0.5);
        let total = distance_m(&a, &b);
        assert!((distance_m(&a, &mid) - total / 2.0).abs() < 0.01);
        assert!((mid.altitude_m - 150.0).abs() < 1e-9);
    }

    #[test]
    fn offset_by_bearing_round_trips_distance() {
        let (lat, lon) = offset_by_bearing(50.0, -1.0, 1_000.0, std::f64::consts::FRAC_PI_2);
        let dist = haversine_distance(50.0, -1.0, lat, lon);
        assert!((dist - 1_000.0).abs() < 0.5);
        let b = bearing(50.0, -1.0, lat, lon);
        assert!((b - std::f64::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn local_frame_unwraps_antimeridian() {
        let frame = LocalFrame::around(&[GeoPoint::flat(179.99, 0.0), GeoPoint::flat(-179.99, 0.0)]);
        let (e1, _) = frame.project(&GeoPoint::flat(179.99, 0.0));
        let (e2, _) = frame.project(&GeoPoint::flat(-179.99, 0.0));
        assert!((e2 - e1) > 0.0 && (e2 - e1) < 3_000.0);
    }

    #[test]
    fn point_in_ring_square() {
        let ring = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        assert!(point_in_ring(&ring, (5.0, 5.0)));
        assert!(!point_in_ring(&ring, (15.0, 5.0)));
    }

    #[test]
    fn segments_intersect_detects_crossing() {
        assert!(segments_intersect_2d(
            (0.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (10.0, 0.0)
        ));
        assert!(!segments_intersect_2d(
            (0.0, 0.0),
            (10.0, 0.0),
            (0.0, 5.0),
            (10.0, 5.0)
        ));
    }

    #[test]
    fn project_fraction_clamps() {
        assert_eq!(project_fraction((0.0, 0.0), (10.0, 0.0), (-5.0, 3.0)), 0.0);
        assert_eq!(project_fraction((0.0, 0.0), (10.0, 0.0), (15.0, 3.0)), 1.0);
        assert!((project_fraction((0.0, 0.0), (10.0, 0.0), (4.0, 3.0)) - 0.4).abs() < 1e-12);
        assert!((distance_to_segment((0.0, 0.0), (10.0, 0.0), (4.0, 3.0)) - 3.0).abs() < 1e-12);
    }
}
