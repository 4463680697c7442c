//! Closed triangulated surfaces enclosing a single region.
//!
//! Queries are brute force over all triangles behind a bounding box reject.
//! Triangle normals come from the input and are assumed to point outward; no
//! watertightness check is made.

use std::fmt::Write;

use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData, OUTSIDE};
use crate::media::MediumTable;
use crate::stl::{Triangle, TriangleMeshSpec};

/// Margin added on every side of the bounding box.
const BBOX_MARGIN: f64 = 1e-8;
/// Rays closer than this to parallel with a triangle plane never hit it.
const PARALLEL_EPSILON: f64 = 1e-10;

/// Axis-aligned box around the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub(crate) fn around<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self { min, max }
    }

    pub(crate) fn expand(&mut self, delta: f64) {
        self.min -= Vector3::repeat(delta);
        self.max += Vector3::repeat(delta);
    }

    /// Strict containment; points on a face are outside.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] > self.min[i] && p[i] < self.max[i])
    }

    /// The point of the box closest to `p`.
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(p.coords.sup(&self.min.coords).inf(&self.max.coords))
    }

    /// Slab test for the ray `p + s v`, `s >= 0`.
    pub fn ray_intersects(&self, p: &Point3<f64>, v: &Vector3<f64>) -> bool {
        let mut tmin = 0.0_f64;
        let mut tmax = f64::INFINITY;
        for i in 0..3 {
            if v[i].abs() < PARALLEL_EPSILON {
                if p[i] < self.min[i] || p[i] > self.max[i] {
                    return false;
                }
            } else {
                let inv = 1.0 / v[i];
                let mut t1 = (self.min[i] - p[i]) * inv;
                let mut t2 = (self.max[i] - p[i]) * inv;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return false;
                }
            }
        }
        true
    }
}

/// Whether `p` lies in the half-space the triangle normal points into.
fn in_front_of(p: &Point3<f64>, tri: &Triangle) -> bool {
    tri.normal.dot(&(p - tri.a)) >= 0.0
}

/// Möller–Trumbore intersection of the ray `p + s v`, `s >= 0`, with a triangle.
pub fn ray_triangle_intersection(p: &Point3<f64>, v: &Vector3<f64>, tri: &Triangle) -> Option<f64> {
    let ab = tri.b - tri.a;
    let ac = tri.c - tri.a;
    let pvec = v.cross(&ac);
    let det = ab.dot(&pvec);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = p - tri.a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&ab);
    let w = v.dot(&qvec) * inv_det;
    if w < 0.0 || u + w > 1.0 {
        return None;
    }
    let dist = ac.dot(&qvec) * inv_det;
    (dist >= 0.0).then_some(dist)
}

/// Closest point of a triangle to `p`, by Voronoi region.
pub fn closest_point_on_triangle(p: &Point3<f64>, tri: &Triangle) -> Point3<f64> {
    let (a, b, c) = (tri.a, tri.b, tri.c);
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // face interior
    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    data: RegionData,
    triangles: Vec<Triangle>,
    bbox: BoundingBox,
}

impl TriangleMesh {
    /// A mesh from its triangles; at least one is required.
    pub fn new(name: &str, spec: TriangleMeshSpec) -> Result<Self> {
        if spec.is_empty() {
            return Err(GeometryError::NoTriangles);
        }
        let mut bbox = BoundingBox::around(
            spec.triangles
                .iter()
                .flat_map(|t| [&t.a, &t.b, &t.c]),
        );
        bbox.expand(BBOX_MARGIN);
        Ok(Self {
            data: RegionData::new(GeometryKind::TriangleMesh, name, 1).with_convex(false),
            triangles: spec.triangles,
            bbox,
        })
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }
}

impl GeometryQuery for TriangleMesh {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        if !self.bbox.contains(x) {
            return OUTSIDE;
        }
        let probe = Vector3::repeat(1.0).normalize();
        let mut nearest_interior = f64::INFINITY;
        let mut nearest_exterior = f64::INFINITY;
        for tri in &self.triangles {
            let Some(dist) = ray_triangle_intersection(x, &probe, tri) else {
                continue;
            };
            if in_front_of(x, tri) {
                nearest_exterior = nearest_exterior.min(dist);
            } else {
                nearest_interior = nearest_interior.min(dist);
            }
        }
        // no hits, or an outward face at or before the nearest inward one
        if nearest_exterior <= nearest_interior {
            OUTSIDE
        } else {
            0
        }
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        if !self.bbox.ray_intersects(x, u) {
            return None;
        }
        let inside = ireg != OUTSIDE;
        let tolerance = self.boundary_tolerance();
        let mut min_dist = f64::INFINITY;
        let mut nearest: Option<&Triangle> = None;
        for tri in &self.triangles {
            // exits only through faces seen from behind, entries from the front
            if in_front_of(x, tri) == inside {
                continue;
            }
            let Some(dist) = ray_triangle_intersection(x, u, tri) else {
                continue;
            };
            if dist > min_dist {
                continue;
            }
            // the bias keeps a particle that just crossed from seeing the same face at 0
            min_dist = dist + tolerance;
            nearest = Some(tri);
        }
        let tri = nearest?;
        if min_dist >= t {
            return None;
        }
        let normal = if tri.normal.dot(u) > 0.0 {
            -tri.normal
        } else {
            tri.normal
        };
        Some(if inside {
            Hit::exit(min_dist, normal)
        } else {
            Hit::new(0, min_dist, self.medium(0), normal)
        })
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        if ireg == OUTSIDE && !self.bbox.contains(x) {
            return (self.bbox.closest_point(x) - x).norm();
        }
        self.triangles
            .iter()
            .map(|tri| (closest_point_on_triangle(x, tri) - x).norm())
            .fold(f64::INFINITY, f64::min)
    }

    /// A straight line crosses each triangle at most once.
    fn max_step(&self) -> i32 {
        self.triangles.len() as i32 + 1
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let _ = writeln!(out, "{} triangles", self.triangles.len());
        let _ = writeln!(
            out,
            "bounding box: ({}, {}, {}) to ({}, {}, {})",
            self.bbox.min.x,
            self.bbox.min.y,
            self.bbox.min.z,
            self.bbox.max.x,
            self.bbox.max.y,
            self.bbox.max.z
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VACUUM;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Unit cube `[0, 1]^3` with outward normals, two triangles per face.
    fn cube_spec() -> TriangleMeshSpec {
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let quads = [
            ([p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)], -Vector3::z()),
            ([p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)], Vector3::z()),
            ([p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)], -Vector3::y()),
            ([p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)], Vector3::y()),
            ([p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)], -Vector3::x()),
            ([p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)], Vector3::x()),
        ];
        let triangles = quads
            .iter()
            .flat_map(|(q, n)| {
                [
                    Triangle::new(q[0], q[1], q[2], *n),
                    Triangle::new(q[0], q[2], q[3], *n),
                ]
            })
            .collect();
        TriangleMeshSpec::new(triangles)
    }

    fn cube() -> TriangleMesh {
        let mut mesh = TriangleMesh::new("cube", cube_spec()).unwrap();
        mesh.set_all_media(0);
        mesh
    }

    #[test]
    fn zero_triangles_is_fatal() {
        let err = TriangleMesh::new("empty", TriangleMeshSpec::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn closest_point_regions() {
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Vector3::z(),
        );
        let q = closest_point_on_triangle(&Point3::new(0.2, 0.2, 3.0), &tri);
        assert_relative_eq!(q, Point3::new(0.2, 0.2, 0.0));
        let q = closest_point_on_triangle(&Point3::new(-1.0, -1.0, 0.0), &tri);
        assert_relative_eq!(q, Point3::origin());
        let q = closest_point_on_triangle(&Point3::new(1.0, 1.0, 0.0), &tri);
        assert_relative_eq!(q, Point3::new(0.5, 0.5, 0.0));
        let q = closest_point_on_triangle(&Point3::new(0.5, -2.0, 1.0), &tri);
        assert_relative_eq!(q, Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn ray_parallel_to_triangle_misses() {
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Vector3::z(),
        );
        assert!(ray_triangle_intersection(&Point3::new(-1.0, 0.2, 0.0), &Vector3::x(), &tri)
            .is_none());
        assert!(ray_triangle_intersection(&Point3::new(0.2, 0.2, 1.0), &Vector3::z(), &tri)
            .is_none());
        let d = ray_triangle_intersection(&Point3::new(0.2, 0.2, 1.0), &-Vector3::z(), &tri);
        assert_relative_eq!(d.unwrap(), 1.0);
    }

    #[test]
    fn inside_by_ray_parity() {
        let mesh = cube();
        assert_eq!(mesh.is_where(&Point3::new(0.4, 0.5, 0.6)), 0);
        assert_eq!(mesh.is_where(&Point3::new(0.1, 0.9, 0.3)), 0);
        assert_eq!(mesh.is_where(&Point3::new(1.5, 0.5, 0.5)), OUTSIDE);
        // inside the box margin but in front of every face
        assert_eq!(mesh.is_where(&Point3::new(-0.5e-8, 0.3, 0.6)), OUTSIDE);
    }

    #[test]
    fn exit_and_entry_with_tolerance_bias() {
        let mesh = cube();
        let tol = mesh.boundary_tolerance();
        let hit = mesh
            .howfar(0, &Point3::new(0.5, 0.3, 0.6), &Vector3::x(), 10.0)
            .unwrap();
        assert_eq!((hit.region, hit.medium), (OUTSIDE, VACUUM));
        assert_relative_eq!(hit.distance, 0.5 + tol, epsilon = 1e-14);
        assert_relative_eq!(hit.normal, -Vector3::x());

        let hit = mesh
            .howfar(OUTSIDE, &Point3::new(0.3, 0.6, -1.0), &Vector3::z(), 10.0)
            .unwrap();
        assert_eq!((hit.region, hit.medium), (0, 0));
        assert_relative_eq!(hit.distance, 1.0 + tol, epsilon = 1e-14);
        assert_relative_eq!(hit.normal, -Vector3::z());

        // the biased step lands strictly past the face, so the same face is not hit again
        let landed = Point3::new(0.3, 0.6, -1.0) + Vector3::z() * hit.distance;
        assert_eq!(mesh.is_where(&landed), 0);
        let next = mesh.howfar(0, &landed, &Vector3::z(), 10.0).unwrap();
        assert_relative_eq!(next.distance, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn short_step_and_miss() {
        let mesh = cube();
        assert!(mesh
            .howfar(0, &Point3::new(0.5, 0.3, 0.6), &Vector3::x(), 0.25)
            .is_none());
        assert!(mesh
            .howfar(OUTSIDE, &Point3::new(2.0, 2.0, 2.0), &Vector3::x(), 1e6)
            .is_none());
    }

    #[test]
    fn hownear_inside_and_outside() {
        let mesh = cube();
        assert_relative_eq!(mesh.hownear(0, &Point3::new(0.5, 0.5, 0.2)), 0.2, epsilon = 1e-12);
        // outside the box, the box distance is a lower bound
        let near = mesh.hownear(OUTSIDE, &Point3::new(3.0, 0.5, 0.5));
        assert_relative_eq!(near, 2.0 - BBOX_MARGIN, epsilon = 1e-12);
    }

    #[test]
    fn random_points_agree_with_box() {
        let mesh = cube();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..2000 {
            let x = Point3::new(
                rng.random_range(-0.5..1.5),
                rng.random_range(-0.5..1.5),
                rng.random_range(-0.5..1.5),
            );
            let in_box = (0..3).all(|i| x[i] > 0.0 && x[i] < 1.0);
            assert_eq!(mesh.is_where(&x) == 0, in_box);
            assert_eq!(mesh.is_inside(&x), in_box);
        }
    }
}
