//! Cube-face projections: unit vector <-> (face, u, v) <-> (s, t) <-> (i, j).
//!
//! Uses the quadratic st<->uv transform so cells of one level have close to equal
//! area across a face.

/// Leaf cells per face edge.
pub(crate) const MAX_SIZE: i64 = 1 << super::cell_id::MAX_LEVEL as u32;

pub(crate) type Xyz = (f64, f64, f64);

pub(crate) fn lat_lng_to_xyz(lat_deg: f64, lng_deg: f64) -> Xyz {
    let phi = lat_deg.to_radians();
    let theta = lng_deg.to_radians();
    let cos_phi = phi.cos();
    (theta.cos() * cos_phi, theta.sin() * cos_phi, phi.sin())
}

/// Returns `(lat, lng)` in degrees.
pub(crate) fn xyz_to_lat_lng((x, y, z): Xyz) -> (f64, f64) {
    let lat = z.atan2((x * x + y * y).sqrt());
    let lng = y.atan2(x);
    (lat.to_degrees(), lng.to_degrees())
}

/// Face whose axis has the largest absolute component.
pub(crate) fn xyz_to_face((x, y, z): Xyz) -> u8 {
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    let (axis, value) = if ax > ay {
        if ax > az {
            (0, x)
        } else {
            (2, z)
        }
    } else if ay > az {
        (1, y)
    } else {
        (2, z)
    };
    if value < 0.0 {
        axis + 3
    } else {
        axis
    }
}

pub(crate) fn valid_face_xyz_to_uv(face: u8, (x, y, z): Xyz) -> (f64, f64) {
    match face {
        0 => (y / x, z / x),
        1 => (-x / y, z / y),
        2 => (-x / z, -y / z),
        3 => (z / x, y / x),
        4 => (z / y, -x / y),
        _ => (-y / z, -x / z),
    }
}

pub(crate) fn xyz_to_face_uv(p: Xyz) -> (u8, f64, f64) {
    let face = xyz_to_face(p);
    let (u, v) = valid_face_xyz_to_uv(face, p);
    (face, u, v)
}

/// Not normalised.
pub(crate) fn face_uv_to_xyz(face: u8, u: f64, v: f64) -> Xyz {
    match face {
        0 => (1.0, u, v),
        1 => (-u, 1.0, v),
        2 => (-u, -v, 1.0),
        3 => (-1.0, -v, -u),
        4 => (v, -1.0, -u),
        _ => (v, u, -1.0),
    }
}

pub(crate) fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

pub(crate) fn st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (1.0 / 3.0) * (4.0 * s * s - 1.0)
    } else {
        (1.0 / 3.0) * (1.0 - 4.0 * (1.0 - s) * (1.0 - s))
    }
}

/// Leaf coordinate containing `s`, clamped to the face.
pub(crate) fn st_to_ij(s: f64) -> i64 {
    let scaled = (MAX_SIZE as f64 * s).floor() as i64;
    scaled.clamp(0, MAX_SIZE - 1)
}
