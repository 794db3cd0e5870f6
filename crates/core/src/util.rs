//! Vector helpers and the geometric quantities exposed to selections.
//!
//! All functions take plain `[f64; 3]` vectors. Callers are expected to hand
//! in minimum-image vectors (see [`crate::cell::UnitCell::wrap`]) when the
//! frame is periodic.

/// Squared norm of a vector.
#[inline(always)]
pub fn norm_squared(v: &[f64; 3]) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

#[inline(always)]
pub fn norm(v: &[f64; 3]) -> f64 {
    norm_squared(v).sqrt()
}

/// `a - b`, component-wise.
#[inline(always)]
pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline(always)]
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalized(v: &[f64; 3]) -> [f64; 3] {
    let len = norm(v);
    if len < 1e-20 {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Angle (radians) between the bond vectors `rij` and `rkj` meeting at the
/// vertex atom.
pub fn angle(rij: &[f64; 3], rkj: &[f64; 3]) -> f64 {
    let cos_theta = (dot(rij, rkj) / (norm(rij) * norm(rkj))).clamp(-1.0, 1.0);
    cos_theta.acos()
}

/// Dihedral angle (radians, in `[-pi, pi]`) defined by the three consecutive
/// bond vectors `b1 = j - i`, `b2 = k - j` and `b3 = m - k`.
pub fn dihedral(b1: &[f64; 3], b2: &[f64; 3], b3: &[f64; 3]) -> f64 {
    let n1 = cross(b1, b2);
    let n2 = cross(b2, b3);
    let m1 = cross(&n1, &normalized(b2));

    let x = dot(&n1, &n2);
    let y = dot(&m1, &n2);
    (-y).atan2(x)
}

/// Signed distance between atom `j` and the plane through atoms `i`, `k`
/// and `m`, from the vectors `rji = j - i`, `rik = k - i` and `rim = m - i`.
pub fn out_of_plane(rji: &[f64; 3], rik: &[f64; 3], rim: &[f64; 3]) -> f64 {
    let normal = normalized(&cross(rik, rim));
    dot(rji, &normal)
}
