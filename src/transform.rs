//! Rotations used to move between a composite's frame and a child's frame.

use nalgebra::{Matrix3, Vector3};

/// Counter-clockwise rotation about the z-axis by `phi` radians.
pub fn rot_z(phi: f64) -> Matrix3<f64> {
    let (s, c) = phi.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation that takes the direction `v` onto the z-axis.
///
/// Built as a rotation about z that brings `v` into the xz-plane followed by
/// a rotation about y. Directions along the z-axis, either sign, give the
/// identity, so angles measured about the axis are the same for `+z` and `-z`.
pub fn rotation_to_z(v: &Vector3<f64>) -> Matrix3<f64> {
    let sinz2 = v.x * v.x + v.y * v.y;
    if sinz2 <= 1e-15 {
        return Matrix3::identity();
    }
    let norm = v.norm();
    let sinz = sinz2.sqrt();
    let (cphi, sphi) = (v.x / sinz, v.y / sinz);
    let (cost, sint) = (v.z / norm, sinz / norm);
    let rz = Matrix3::new(cphi, sphi, 0.0, -sphi, cphi, 0.0, 0.0, 0.0, 1.0);
    let ry = Matrix3::new(cost, 0.0, -sint, 0.0, 1.0, 0.0, sint, 0.0, cost);
    ry * rz
}
