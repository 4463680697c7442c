//! Planar polygons used as the cross-section of prisms and the base of pyramids.
//!
//! A [`Polygon2D`] is stored closed (the first point repeated at the end)
//! with one inward-pointing unit normal per edge. Edge `j` runs from point
//! `j` to point `j + 1` and its line is `{x : a_j . x = d_j}`, the inside of
//! the polygon lying on the side with `a_j . x >= d_j`.

use nalgebra::Vector2;

use crate::error::{GeometryError, Result};

/// Squared distance below which two consecutive points are merged.
const DUPLICATE_TOLERANCE: f64 = 1e-8;
/// Cross product magnitude below which three points are collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2D {
    /// Vertices, closed: `points[n] == points[0]`.
    points: Vec<Vector2<f64>>,
    /// Edge vectors `points[j + 1] - points[j]`.
    edges: Vec<Vector2<f64>>,
    /// Inward unit edge normals.
    normals: Vec<Vector2<f64>>,
    offsets: Vec<f64>,
    /// Whether edge `j` lies on the convex hull.
    hull_edge: Vec<bool>,
    min: Vector2<f64>,
    max: Vector2<f64>,
    convex: bool,
    open: bool,
}

/// Drop consecutive near-duplicates and collinear interior points, treating
/// the list as cyclic.
fn clean_points(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts: Vec<Vector2<f64>> = Vec::with_capacity(points.len());
    for p in points {
        match pts.last() {
            Some(last) if (p - last).norm_squared() <= DUPLICATE_TOLERANCE => {}
            _ => pts.push(*p),
        }
    }
    while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm_squared() <= DUPLICATE_TOLERANCE {
        pts.pop();
    }

    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let n = pts.len();
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let next = pts[(i + 1) % n];
            if cross(&(pts[i] - prev), &(next - prev)).abs() < COLLINEAR_TOLERANCE {
                pts.remove(i);
                changed = true;
                break;
            }
        }
    }
    pts
}

impl Polygon2D {
    /// Build a polygon from its vertices in either orientation.
    ///
    /// The list is closed automatically. With `open` set and exactly three
    /// points left after cleanup, the polygon is the infinite wedge between
    /// the rays from the second point through the first and the third.
    pub fn new(points: &[Vector2<f64>], open: bool) -> Result<Self> {
        let mut pts = clean_points(points);
        if pts.len() < 3 {
            return Err(GeometryError::invalid(
                "points",
                format!(
                    "a polygon needs at least 3 distinct, non-collinear points, got {}",
                    pts.len()
                ),
            ));
        }
        let n = pts.len();
        let area: f64 = (0..n).map(|j| cross(&pts[j], &pts[(j + 1) % n])).sum();
        let ccw = area > 0.0;
        pts.push(pts[0]);

        let edges: Vec<Vector2<f64>> = pts.windows(2).map(|w| w[1] - w[0]).collect();
        let normals: Vec<Vector2<f64>> = edges
            .iter()
            .map(|e| {
                let a = if ccw {
                    Vector2::new(-e.y, e.x)
                } else {
                    Vector2::new(e.y, -e.x)
                };
                a.normalize()
            })
            .collect();
        let offsets = normals.iter().zip(&pts).map(|(a, p)| a.dot(p)).collect();

        let mut min = pts[0];
        let mut max = pts[0];
        for p in &pts[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }

        let mut polygon = Self {
            points: pts,
            edges,
            normals,
            offsets,
            hull_edge: vec![true; n],
            min,
            max,
            convex: true,
            open: open && n == 3,
        };
        if n > 3 {
            for j in 0..n {
                let j1 = (j + 1) % n;
                let on_hull = (0..n)
                    .filter(|&i| i != j && i != j1)
                    .all(|i| polygon.inside_edge(j, &polygon.points[i]));
                if !on_hull {
                    polygon.convex = false;
                    polygon.hull_edge[j] = false;
                }
            }
        }
        Ok(polygon)
    }

    /// Number of edges.
    pub fn n(&self) -> usize {
        self.edges.len()
    }

    pub fn is_convex(&self) -> bool {
        self.convex
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Vertex `j`; `j == n()` is the closing copy of vertex 0.
    pub fn point(&self, j: usize) -> Vector2<f64> {
        self.points[j]
    }

    /// Inward unit normal of edge `j`.
    pub fn normal(&self, j: usize) -> Vector2<f64> {
        self.normals[j]
    }

    fn inside_edge(&self, j: usize, x: &Vector2<f64>) -> bool {
        self.normals[j].dot(x) >= self.offsets[j]
    }

    /// Edges that bound the polygon: both arms of an open triangle, else all.
    fn active_edges(&self) -> usize {
        if self.open {
            2
        } else {
            self.n()
        }
    }

    pub fn is_inside(&self, x: &Vector2<f64>) -> bool {
        if !self.open
            && (x.x < self.min.x || x.x > self.max.x || x.y < self.min.y || x.y > self.max.y)
        {
            return false;
        }
        if self.convex {
            return (0..self.active_edges()).all(|j| self.inside_edge(j, x));
        }
        // crossing number along +x
        let mut inside = false;
        for w in self.points.windows(2) {
            let (p, q) = (w[0], w[1]);
            if (p.y > x.y) != (q.y > x.y) {
                let xc = p.x + (x.y - p.y) / (q.y - p.y) * (q.x - p.x);
                if x.x < xc {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether the line `x + s u` hits the polygon outline within `t`.
    ///
    /// `inside` tells whether `x` is inside the polygon. On a hit returns the
    /// distance and the edge normal oriented against `u`.
    pub fn howfar(
        &self,
        inside: bool,
        x: &Vector2<f64>,
        u: &Vector2<f64>,
        t: f64,
    ) -> Option<(f64, Vector2<f64>)> {
        let mut t = t;
        let mut hit = None;
        if inside {
            for j in 0..self.active_edges() {
                let a = &self.normals[j];
                let up = u.dot(a);
                let xp = x.dot(a);
                if up >= 0.0 || xp <= self.offsets[j] {
                    continue;
                }
                let tt = (self.offsets[j] - xp) / up;
                if tt > t {
                    continue;
                }
                let on_edge = self.convex || self.hull_edge[j] || {
                    let lam = self.edges[j].dot(&(x - self.points[j] + u * tt));
                    lam >= 0.0 && lam < self.edges[j].norm_squared()
                };
                if on_edge {
                    t = tt;
                    hit = Some((tt, *a));
                }
            }
            return hit;
        }

        for j in 0..self.active_edges() {
            let a = &self.normals[j];
            let up = u.dot(a);
            let xp = x.dot(a);
            if up <= 0.0 || xp >= self.offsets[j] {
                continue;
            }
            let tt = (self.offsets[j] - xp) / up;
            if tt > t {
                continue;
            }
            let lam = self.edges[j].dot(&(x - self.points[j] + u * tt));
            let on_edge = match (self.open, j) {
                // the arm through the first point extends beyond it
                (true, 0) => lam < self.edges[0].norm_squared(),
                (true, _) => lam > 0.0,
                (false, _) => lam >= 0.0 && lam < self.edges[j].norm_squared(),
            };
            if on_edge {
                t = tt;
                hit = Some((tt, -a));
            }
        }
        hit
    }

    /// Lower bound on the distance from `x` to the outline.
    pub fn hownear(&self, _inside: bool, x: &Vector2<f64>) -> f64 {
        if self.open {
            return self.hownear_open(x);
        }
        let mut tperp = f64::INFINITY;
        let mut check_vertex = true;
        for j in 0..self.n() {
            let v = x - self.points[j];
            let lam = self.edges[j].dot(&v);
            if lam >= 0.0 && lam <= self.edges[j].norm_squared() {
                check_vertex = false;
                tperp = tperp.min((self.offsets[j] - x.dot(&self.normals[j])).abs());
            } else if lam < 0.0 && check_vertex {
                tperp = tperp.min(v.norm());
            } else {
                check_vertex = true;
            }
        }
        tperp
    }

    fn hownear_open(&self, x: &Vector2<f64>) -> f64 {
        let v = x - self.points[0];
        let lam = self.edges[0].dot(&v);
        let (mut tperp, check_vertex) = if lam <= self.edges[0].norm_squared() {
            ((self.offsets[0] - x.dot(&self.normals[0])).abs(), false)
        } else {
            (f64::INFINITY, true)
        };
        let v = x - self.points[1];
        if self.edges[1].dot(&v) >= 0.0 {
            tperp = tperp.min((self.offsets[1] - x.dot(&self.normals[1])).abs());
        } else if check_vertex {
            tperp = tperp.min(v.norm());
        }
        tperp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x, y)
    }

    fn square() -> Polygon2D {
        Polygon2D::new(&[v(0.0, 0.0), v(2.0, 0.0), v(2.0, 2.0), v(0.0, 2.0)], false).unwrap()
    }

    /// An L-shape missing the upper right quarter of a 2x2 square.
    fn ell() -> Polygon2D {
        Polygon2D::new(
            &[
                v(0.0, 0.0),
                v(2.0, 0.0),
                v(2.0, 1.0),
                v(1.0, 1.0),
                v(1.0, 2.0),
                v(0.0, 2.0),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn closes_and_cleans_points() {
        let p = Polygon2D::new(
            &[
                v(0.0, 0.0),
                v(1.0, 0.0),
                v(1.0, 0.0),
                v(2.0, 0.0),
                v(2.0, 2.0),
                v(0.0, 2.0),
                v(0.0, 0.0),
            ],
            false,
        )
        .unwrap();
        assert_eq!(p.n(), 4);
        assert!(p.is_convex());
        assert_eq!(p.point(4), p.point(0));
    }

    #[test]
    fn orientation_does_not_matter() {
        let cw = Polygon2D::new(&[v(0.0, 2.0), v(2.0, 2.0), v(2.0, 0.0), v(0.0, 0.0)], false)
            .unwrap();
        for p in [square(), cw] {
            assert!(p.is_inside(&v(1.0, 1.0)));
            assert!(!p.is_inside(&v(3.0, 1.0)));
            // inward normals point at the centre
            for j in 0..p.n() {
                let mid = (p.point(j) + p.point(j + 1)) * 0.5;
                assert!(p.normal(j).dot(&(v(1.0, 1.0) - mid)) > 0.0);
            }
        }
    }

    #[test]
    fn too_few_points_is_recoverable() {
        let err = Polygon2D::new(&[v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)], false).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn non_convex_inside_test() {
        let p = ell();
        assert!(!p.is_convex());
        assert!(p.is_inside(&v(0.5, 1.5)));
        assert!(p.is_inside(&v(1.5, 0.5)));
        assert!(!p.is_inside(&v(1.5, 1.5)));
    }

    #[test]
    fn howfar_from_inside_and_outside() {
        let p = square();
        let (t, n) = p.howfar(true, &v(1.0, 1.0), &v(1.0, 0.0), 10.0).unwrap();
        assert_relative_eq!(t, 1.0);
        assert_relative_eq!(n, v(-1.0, 0.0));
        assert!(p.howfar(true, &v(1.0, 1.0), &v(1.0, 0.0), 0.5).is_none());

        let (t, n) = p.howfar(false, &v(-1.0, 1.0), &v(1.0, 0.0), 10.0).unwrap();
        assert_relative_eq!(t, 1.0);
        assert_relative_eq!(n, v(-1.0, 0.0));
        // the line misses the finite edge
        assert!(p.howfar(false, &v(-1.0, 3.0), &v(1.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn howfar_in_the_notch() {
        let p = ell();
        // from the lower arm upward across the notch edge y = 1 at x = 1.5
        let (t, _) = p.howfar(true, &v(1.5, 0.5), &v(0.0, 1.0), 10.0).unwrap();
        assert_relative_eq!(t, 0.5);
        // from the notch, entering the left arm
        let (t, n) = p.howfar(false, &v(1.5, 1.5), &v(-1.0, 0.0), 10.0).unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(n, v(1.0, 0.0));
    }

    #[test]
    fn hownear_is_a_lower_bound() {
        let p = square();
        assert_relative_eq!(p.hownear(true, &v(0.5, 1.0)), 0.5);
        assert_relative_eq!(p.hownear(false, &v(3.0, 1.0)), 1.0);
        assert_relative_eq!(p.hownear(false, &v(3.0, 3.0)), 2f64.sqrt());
    }

    #[test]
    fn open_triangle_extends_to_infinity() {
        let p = Polygon2D::new(&[v(1.0, 1.0), v(0.0, 0.0), v(1.0, -1.0)], true).unwrap();
        assert!(p.is_open());
        assert!(p.is_inside(&v(100.0, 0.0)));
        assert!(!p.is_inside(&v(-0.5, 0.0)));
        assert!(!p.is_inside(&v(1.0, 2.0)));
        // entering far beyond the last point
        let (t, _) = p.howfar(false, &v(50.0, 60.0), &v(0.0, -1.0), 100.0).unwrap();
        assert_relative_eq!(t, 10.0, epsilon = 1e-12);
        assert_relative_eq!(p.hownear(true, &v(5.0, 0.0)), 5.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.hownear(false, &v(-1.0, 0.0)), 1.0, epsilon = 1e-12);
    }
}
