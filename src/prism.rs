//! Prisms: a polygon extruded along its plane normal.
//!
//! An open prism extends to infinity on both sides of the polygon plane. A
//! closed prism is cut by two planes parallel to the polygon at signed
//! distances `d1 <= d2`. Either way there is a single region, 0.

use std::fmt::Write;

use nalgebra::{Point3, Vector3};

use crate::geometry::{GeometryQuery, Hit, RegionData, OUTSIDE};
use crate::media::MediumTable;
use crate::projector::{PlanarPolygon, Projector};

#[derive(Debug, Clone)]
pub struct Prism<P: Projector> {
    data: RegionData,
    base: PlanarPolygon<P>,
    a: Vector3<f64>,
    /// Signed distances of the closing planes, `None` for an open prism.
    slab: Option<(f64, f64)>,
}

impl<P: Projector> Prism<P> {
    pub fn open(name: &str, base: PlanarPolygon<P>) -> Self {
        Self::build(name, base, None)
    }

    /// A prism closed at signed distances `d1` and `d2` from the polygon plane,
    /// in either order.
    pub fn closed(name: &str, base: PlanarPolygon<P>, d1: f64, d2: f64) -> Self {
        Self::build(name, base, Some((d1.min(d2), d1.max(d2))))
    }

    fn build(name: &str, base: PlanarPolygon<P>, slab: Option<(f64, f64)>) -> Self {
        let data = RegionData::new(P::PRISM_KIND, name, 1).with_convex(base.is_convex());
        Self {
            data,
            a: base.normal(),
            base,
            slab,
        }
    }

    pub fn base(&self) -> &PlanarPolygon<P> {
        &self.base
    }

    pub fn is_open(&self) -> bool {
        self.slab.is_none()
    }

    fn enter(&self, distance: f64, normal: Vector3<f64>) -> Hit {
        Hit::new(0, distance, self.medium(0), normal)
    }
}

impl<P: Projector> GeometryQuery for Prism<P> {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        if let Some((d1, d2)) = self.slab {
            let d = self.base.distance(x);
            if d < d1 || d > d2 {
                return OUTSIDE;
            }
        }
        if self.base.is_inside_2d(x) {
            0
        } else {
            OUTSIDE
        }
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        let inside = ireg == 0;
        let Some((d1, d2)) = self.slab else {
            let (tt, normal) = self.base.howfar_2d(inside, x, u, t)?;
            return Some(if inside {
                Hit::exit(tt, normal)
            } else {
                self.enter(tt, normal)
            });
        };

        let up = self.a.dot(u);
        let d = self.base.distance(x);
        if inside {
            let mut t = t;
            let mut hit = None;
            let tt = if up > 0.0 { (d2 - d) / up } else { (d1 - d) / up };
            if tt <= t {
                t = tt;
                hit = Some(Hit::exit(tt, if up > 0.0 { -self.a } else { self.a }));
            }
            if let Some((tt, normal)) = self.base.howfar_2d(true, x, u, t) {
                hit = Some(Hit::exit(tt, normal));
            }
            return hit;
        }

        // outside the slab: try the closing planes first
        if d < d1 || d > d2 {
            let tt = if d < d1 && up > 0.0 {
                (d1 - d) / up
            } else if d > d2 && up < 0.0 {
                (d2 - d) / up
            } else {
                f64::INFINITY
            };
            if tt < t && self.base.is_inside_2d(&(x + u * tt)) {
                return Some(self.enter(tt, if up > 0.0 { -self.a } else { self.a }));
            }
        }
        let (tt, normal) = self.base.howfar_2d(false, x, u, t)?;
        let d = self.base.distance(&(x + u * tt));
        (d >= d1 && d <= d2).then(|| self.enter(tt, normal))
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        let tperp = self.base.hownear_2d(ireg == 0, x);
        let Some((d1, d2)) = self.slab else {
            return tperp;
        };
        let d = self.base.distance(x);
        if ireg == 0 {
            return tperp.min(d2 - d).min(d - d1);
        }
        let t = if d < d1 {
            d1 - d
        } else if d > d2 {
            d - d2
        } else {
            return tperp;
        };
        if self.base.is_inside_2d(x) {
            t
        } else {
            (tperp * tperp + t * t).sqrt()
        }
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        match self.slab {
            Some((d1, d2)) => {
                let _ = writeln!(out, "closed between {d1} and {d2}");
            }
            None => {
                let _ = writeln!(out, "open");
            }
        }
        let _ = writeln!(out, "{} polygon points", self.base.n());
        out
    }
}
