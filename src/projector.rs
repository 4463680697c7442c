//! Planes that carry a 2-D polygon: projection of 3-D points and directions
//! into the plane and lifting of 2-D vectors back out of it.
//!
//! The axis-aligned projectors are zero-sized; [`GeneralProjector`] holds an
//! orthonormal frame for an arbitrary plane. [`PlanarPolygon`] pairs a
//! projector with a [`Polygon2D`] and is what prisms and pyramids are built on.

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::GeometryKind;
use crate::polygon::Polygon2D;

/// Maximum distance of a polygon vertex from the plane through the first points.
pub const COPLANAR_TOLERANCE: f64 = 1e-6;

pub trait Projector: Clone + std::fmt::Debug + Send + Sync {
    const PRISM_KIND: GeometryKind;
    const PYRAMID_KIND: GeometryKind;

    /// Unit plane normal.
    fn normal(&self) -> Vector3<f64>;

    /// Signed distance of `x` from the plane.
    fn distance(&self, x: &Point3<f64>) -> f64;

    /// In-plane coordinates of the point `x`.
    fn project(&self, x: &Point3<f64>) -> Vector2<f64>;

    /// In-plane components of the direction `u`.
    fn project_direction(&self, u: &Vector3<f64>) -> Vector2<f64>;

    /// The 3-D vector with in-plane components `v`.
    fn lift(&self, v: &Vector2<f64>) -> Vector3<f64>;

    /// The point of the plane with in-plane coordinates `v`.
    fn point(&self, v: &Vector2<f64>) -> Point3<f64>;
}

/// The plane `x = 0`, with in-plane coordinates `(y, z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectorX;

/// The plane `y = 0`, with in-plane coordinates `(x, z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectorY;

/// The plane `z = 0`, with in-plane coordinates `(x, y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectorZ;

impl Projector for ProjectorX {
    const PRISM_KIND: GeometryKind = GeometryKind::PrismX;
    const PYRAMID_KIND: GeometryKind = GeometryKind::PyramidX;

    fn normal(&self) -> Vector3<f64> {
        Vector3::x()
    }
    fn distance(&self, x: &Point3<f64>) -> f64 {
        x.x
    }
    fn project(&self, x: &Point3<f64>) -> Vector2<f64> {
        Vector2::new(x.y, x.z)
    }
    fn project_direction(&self, u: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(u.y, u.z)
    }
    fn lift(&self, v: &Vector2<f64>) -> Vector3<f64> {
        Vector3::new(0.0, v.x, v.y)
    }
    fn point(&self, v: &Vector2<f64>) -> Point3<f64> {
        Point3::new(0.0, v.x, v.y)
    }
}

impl Projector for ProjectorY {
    const PRISM_KIND: GeometryKind = GeometryKind::PrismY;
    const PYRAMID_KIND: GeometryKind = GeometryKind::PyramidY;

    fn normal(&self) -> Vector3<f64> {
        Vector3::y()
    }
    fn distance(&self, x: &Point3<f64>) -> f64 {
        x.y
    }
    fn project(&self, x: &Point3<f64>) -> Vector2<f64> {
        Vector2::new(x.x, x.z)
    }
    fn project_direction(&self, u: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(u.x, u.z)
    }
    fn lift(&self, v: &Vector2<f64>) -> Vector3<f64> {
        Vector3::new(v.x, 0.0, v.y)
    }
    fn point(&self, v: &Vector2<f64>) -> Point3<f64> {
        Point3::new(v.x, 0.0, v.y)
    }
}

impl Projector for ProjectorZ {
    const PRISM_KIND: GeometryKind = GeometryKind::PrismZ;
    const PYRAMID_KIND: GeometryKind = GeometryKind::PyramidZ;

    fn normal(&self) -> Vector3<f64> {
        Vector3::z()
    }
    fn distance(&self, x: &Point3<f64>) -> f64 {
        x.z
    }
    fn project(&self, x: &Point3<f64>) -> Vector2<f64> {
        Vector2::new(x.x, x.y)
    }
    fn project_direction(&self, u: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(u.x, u.y)
    }
    fn lift(&self, v: &Vector2<f64>) -> Vector3<f64> {
        Vector3::new(v.x, v.y, 0.0)
    }
    fn point(&self, v: &Vector2<f64>) -> Point3<f64> {
        Point3::new(v.x, v.y, 0.0)
    }
}

/// An arbitrary plane with origin `xo` and in-plane axes `v1`, `v2`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralProjector {
    a: Vector3<f64>,
    xo: Point3<f64>,
    v1: Vector3<f64>,
    v2: Vector3<f64>,
    d: f64,
}

impl GeneralProjector {
    /// The plane through `x1`, `x2` and `x3`.
    ///
    /// The normal is `(x2 - x1) x (x3 - x1)`, the first in-plane axis points
    /// from `x1` to `x2` and `x1` is the origin of the in-plane coordinates.
    pub fn from_points(x1: &Point3<f64>, x2: &Point3<f64>, x3: &Point3<f64>) -> Result<Self> {
        let a = (x2 - x1).cross(&(x3 - x1));
        if a.norm_squared() < 1e-20 {
            return Err(GeometryError::invalid(
                "points",
                "the first points of the polygon are collinear",
            ));
        }
        let a = a.normalize();
        let v1 = (x2 - x1).normalize();
        let v2 = a.cross(&v1);
        Ok(Self {
            a,
            xo: *x1,
            v1,
            v2,
            d: a.dot(&x1.coords),
        })
    }
}

impl Projector for GeneralProjector {
    const PRISM_KIND: GeometryKind = GeometryKind::Prism;
    const PYRAMID_KIND: GeometryKind = GeometryKind::Pyramid;

    fn normal(&self) -> Vector3<f64> {
        self.a
    }
    fn distance(&self, x: &Point3<f64>) -> f64 {
        self.a.dot(&x.coords) - self.d
    }
    fn project(&self, x: &Point3<f64>) -> Vector2<f64> {
        let r = x - self.xo;
        Vector2::new(r.dot(&self.v1), r.dot(&self.v2))
    }
    fn project_direction(&self, u: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(u.dot(&self.v1), u.dot(&self.v2))
    }
    fn lift(&self, v: &Vector2<f64>) -> Vector3<f64> {
        self.v1 * v.x + self.v2 * v.y
    }
    fn point(&self, v: &Vector2<f64>) -> Point3<f64> {
        self.xo + self.lift(v)
    }
}

/// A polygon lying in the plane of a projector.
#[derive(Debug, Clone)]
pub struct PlanarPolygon<P: Projector> {
    polygon: Polygon2D,
    projector: P,
}

impl<P: Projector> PlanarPolygon<P> {
    pub fn new(polygon: Polygon2D, projector: P) -> Self {
        Self { polygon, projector }
    }

    /// Build from in-plane coordinates.
    pub fn from_2d(points: &[Vector2<f64>], projector: P, open: bool) -> Result<Self> {
        Ok(Self::new(Polygon2D::new(points, open)?, projector))
    }

    pub fn polygon(&self) -> &Polygon2D {
        &self.polygon
    }

    pub fn projector(&self) -> &P {
        &self.projector
    }

    pub fn is_convex(&self) -> bool {
        self.polygon.is_convex()
    }

    /// Number of edges.
    pub fn n(&self) -> usize {
        self.polygon.n()
    }

    /// Vertex `j` in 3-D.
    pub fn point(&self, j: usize) -> Point3<f64> {
        self.projector.point(&self.polygon.point(j))
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.projector.normal()
    }

    /// Inward normal of edge `j`, lying in the plane.
    pub fn edge_normal(&self, j: usize) -> Vector3<f64> {
        self.projector.lift(&self.polygon.normal(j))
    }

    pub fn distance(&self, x: &Point3<f64>) -> f64 {
        self.projector.distance(x)
    }

    /// Whether the projection of `x` onto the plane falls inside the polygon.
    pub fn is_inside_2d(&self, x: &Point3<f64>) -> bool {
        self.polygon.is_inside(&self.projector.project(x))
    }

    /// Distance from the projection of `x` to the polygon outline.
    pub fn hownear_2d(&self, inside: bool, x: &Point3<f64>) -> f64 {
        self.polygon.hownear(inside, &self.projector.project(x))
    }

    /// Lower bound on the distance from `x` to the polygon as a planar patch.
    pub fn hownear(&self, x: &Point3<f64>) -> f64 {
        let pos = self.projector.project(x);
        let t1 = self.projector.distance(x).abs();
        if self.polygon.is_inside(&pos) {
            return t1;
        }
        let t2 = self.polygon.hownear(true, &pos);
        (t1 * t1 + t2 * t2).sqrt()
    }

    /// Crossing of the side walls of the infinite prism over the polygon.
    ///
    /// Returns the distance and the lifted edge normal oriented against `u`.
    pub fn howfar_2d(
        &self,
        inside: bool,
        x: &Point3<f64>,
        u: &Vector3<f64>,
        t: f64,
    ) -> Option<(f64, Vector3<f64>)> {
        let dir = self.projector.project_direction(u);
        if dir.norm_squared() < 1e-16 {
            return None;
        }
        // the unnormalised in-plane direction keeps the 3-D line parameter
        let (tt, normal) = self
            .polygon
            .howfar(inside, &self.projector.project(x), &dir, t)?;
        Some((tt, self.projector.lift(&normal)))
    }

    /// Crossing of the polygon itself, approached from the side the plane
    /// normal points to when `inside` is set.
    pub fn howfar(&self, inside: bool, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<f64> {
        let up = self.normal().dot(u);
        if (inside && up >= 0.0) || (!inside && up <= 0.0) {
            return None;
        }
        let tt = -self.distance(x) / up;
        if tt <= t && self.is_inside_2d(&(x + u * tt)) {
            Some(tt)
        } else {
            None
        }
    }
}

impl PlanarPolygon<GeneralProjector> {
    /// A polygon from 3-D points that must lie in one plane.
    ///
    /// The plane passes through the first, second and last distinct points.
    pub fn from_3d(points: &[Point3<f64>], open: bool) -> Result<Self> {
        if points.len() < 3 {
            return Err(GeometryError::invalid(
                "points",
                format!("at least 3 points are required, got {}", points.len()),
            ));
        }
        let mut last = points[points.len() - 1];
        if (last - points[0]).norm_squared() <= COPLANAR_TOLERANCE && points.len() > 3 {
            last = points[points.len() - 2];
        }
        let projector = GeneralProjector::from_points(&points[0], &points[1], &last)?;
        if let Some(off) = points
            .iter()
            .map(|p| projector.distance(p))
            .find(|d| d.abs() > COPLANAR_TOLERANCE)
        {
            return Err(GeometryError::invalid(
                "points",
                format!("points are not on a plane (distance {off:e})"),
            ));
        }
        let points_2d: Vec<Vector2<f64>> = points.iter().map(|p| projector.project(p)).collect();
        Self::from_2d(&points_2d, projector, open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn axis_projectors_round_trip() {
        let x = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(ProjectorX.project(&x), Vector2::new(2.0, 3.0));
        assert_eq!(ProjectorY.project(&x), Vector2::new(1.0, 3.0));
        assert_eq!(ProjectorZ.point(&ProjectorZ.project(&x)), Point3::new(1.0, 2.0, 0.0));
        assert_eq!(ProjectorY.distance(&x), 2.0);
    }

    #[test]
    fn general_projector_frame() {
        let p = GeneralProjector::from_points(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        )
        .unwrap();
        let n = p.normal();
        assert_relative_eq!(n, Vector3::new(1.0, 1.0, 1.0).normalize(), epsilon = 1e-12);
        assert_relative_eq!(p.distance(&Point3::origin()), -1.0 / 3f64.sqrt(), epsilon = 1e-12);
        let x = Point3::new(0.2, 0.3, 0.5);
        assert_relative_eq!(p.distance(&x), 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.point(&p.project(&x)), x, epsilon = 1e-12);
        // directions are not shifted by the origin
        let u = Vector3::new(-1.0, 1.0, 0.0).normalize();
        assert_relative_eq!(p.lift(&p.project_direction(&u)), u, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_are_rejected() {
        assert!(GeneralProjector::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0)
        )
        .is_err());
    }

    #[test]
    fn non_planar_points_are_rejected() {
        let err = PlanarPolygon::from_3d(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.5),
                Point3::new(0.0, 1.0, 0.0),
            ],
            false,
        )
        .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn tilted_square_queries() {
        // unit square in the plane z = x
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let poly = PlanarPolygon::from_3d(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(s, 0.0, s),
                Point3::new(s, 1.0, s),
                Point3::new(0.0, 1.0, 0.0),
            ],
            false,
        )
        .unwrap();
        assert_eq!(poly.n(), 4);
        let centre = Point3::new(0.5 * s, 0.5, 0.5 * s);
        assert!(poly.is_inside_2d(&centre));
        let off = centre + poly.normal() * 2.0;
        assert_relative_eq!(poly.hownear(&off), 2.0, epsilon = 1e-12);
        let t = poly.howfar(poly.distance(&off) > 0.0, &off, &-poly.normal(), 10.0);
        assert_relative_eq!(t.unwrap(), 2.0, epsilon = 1e-12);
        // walls of the infinite prism, travelling along y
        let (t, n) = poly.howfar_2d(true, &centre, &Vector3::y(), 10.0).unwrap();
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        assert_relative_eq!(n, -Vector3::y(), epsilon = 1e-12);
    }
}
