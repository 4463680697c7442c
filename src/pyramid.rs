//! Pyramids: the solid swept by lines from a tip through a base polygon.
//!
//! A closed pyramid is bounded by the base polygon; an open one continues past
//! the base to infinity. Each side is the triangle spanned by one base edge
//! and the tip, stored in its own plane with a normal pointing into the solid.

use std::fmt::Write;

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryQuery, Hit, RegionData, DEFAULT_BOUNDARY_TOLERANCE, OUTSIDE};
use crate::media::MediumTable;
use crate::projector::{GeneralProjector, PlanarPolygon, Projector};

#[derive(Debug, Clone)]
pub struct Pyramid<P: Projector> {
    data: RegionData,
    base: PlanarPolygon<P>,
    tip: Point3<f64>,
    /// Base normal oriented toward the tip.
    a: Vector3<f64>,
    /// `+1` if the base plane normal points toward the tip, else `-1`.
    orientation: f64,
    /// Distance of the tip from the base plane, positive.
    d: f64,
    sides: Vec<PlanarPolygon<GeneralProjector>>,
    open: bool,
}

impl<P: Projector> Pyramid<P> {
    pub fn new(name: &str, base: PlanarPolygon<P>, tip: Point3<f64>, open: bool) -> Result<Self> {
        let kind = P::PYRAMID_KIND;
        let distance = base.distance(&tip);
        if distance.abs() < DEFAULT_BOUNDARY_TOLERANCE {
            return Err(GeometryError::TipTooCloseToBase {
                geometry: format!("{kind} `{name}`"),
                distance: distance.abs(),
            });
        }
        let orientation = distance.signum();

        let mut sides = Vec::with_capacity(base.n());
        for j in 0..base.n() {
            let v1 = base.point(j);
            let v2 = base.point(j + 1);
            let aj = base.edge_normal(j);
            let mut projector = GeneralProjector::from_points(&v1, &tip, &v2)?;
            if projector.normal().dot(&aj) < 0.0 {
                projector = GeneralProjector::from_points(&v2, &tip, &v1)?;
                if projector.normal().dot(&aj) < 0.0 {
                    return Err(GeometryError::InconsistentSideNormal {
                        geometry: format!("{kind} `{name}`"),
                        side: j,
                    });
                }
            }
            let corners: Vec<Vector2<f64>> = [v1, tip, v2]
                .iter()
                .map(|p| projector.project(p))
                .collect();
            sides.push(PlanarPolygon::from_2d(&corners, projector, open)?);
        }
        log::debug!("{kind} `{name}`: {} sides, tip at distance {}", sides.len(), distance);

        let data = RegionData::new(kind, name, 1).with_convex(base.is_convex());
        Ok(Self {
            data,
            a: base.normal() * orientation,
            orientation,
            d: distance.abs(),
            base,
            tip,
            sides,
            open,
        })
    }

    pub fn tip(&self) -> &Point3<f64> {
        &self.tip
    }

    pub fn base(&self) -> &PlanarPolygon<P> {
        &self.base
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Distance of `x` from the base plane, positive on the tip side.
    fn base_distance(&self, x: &Point3<f64>) -> f64 {
        self.orientation * self.base.distance(x)
    }
}

impl<P: Projector> GeometryQuery for Pyramid<P> {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        let xp = x - self.tip;
        let axp = self.a.dot(&xp);
        if axp >= 0.0 || (!self.open && self.d + axp < 0.0) {
            return OUTSIDE;
        }
        // where the line from the tip through x meets the base plane
        let on_base = self.tip + xp * (-self.d / axp);
        if self.base.is_inside_2d(&on_base) {
            0
        } else {
            OUTSIDE
        }
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        let mut t = t;
        let mut hit = None;
        if ireg == 0 {
            let convex = self.base.is_convex();
            for side in &self.sides {
                if (convex || side.is_inside_2d(x)) && side.distance(x) >= 0.0 {
                    if let Some(tt) = side.howfar(true, x, u, t) {
                        t = tt;
                        hit = Some(Hit::exit(tt, side.normal()));
                    }
                }
            }
            if !self.open {
                let up = self.a.dot(u);
                if up < 0.0 {
                    let tt = -self.base_distance(x) / up;
                    if tt <= t && self.base.is_inside_2d(&(x + u * tt)) {
                        hit = Some(Hit::exit(tt, self.a));
                    }
                }
            }
            return hit;
        }

        for side in &self.sides {
            let n = side.normal();
            let up = u.dot(&n);
            let xp = side.distance(x);
            if up > 0.0 && xp < 0.0 {
                let tt = -xp / up;
                if tt <= t && side.is_inside_2d(&(x + u * tt)) {
                    t = tt;
                    hit = Some(Hit::new(0, tt, self.medium(0), -n));
                }
            }
        }
        if !self.open {
            let up = self.a.dot(u);
            let xp = self.base_distance(x);
            if up > 0.0 && xp < 0.0 {
                let tt = -xp / up;
                if tt <= t && self.base.is_inside_2d(&(x + u * tt)) {
                    hit = Some(Hit::new(0, tt, self.medium(0), -self.a));
                }
            }
        }
        hit
    }

    /// Minimum distance to every face, computed face by face.
    fn hownear(&self, _ireg: i32, x: &Point3<f64>) -> f64 {
        let mut tperp = f64::INFINITY;
        for side in &self.sides {
            let t = side.hownear(x);
            if t < tperp {
                if t <= 0.0 {
                    return 0.0;
                }
                tperp = t;
            }
        }
        if !self.open {
            tperp = tperp.min(self.base.hownear(x));
        }
        tperp
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let _ = writeln!(
            out,
            "{} pyramid, tip at ({}, {}, {}), {} sides",
            if self.open { "open" } else { "closed" },
            self.tip.x,
            self.tip.y,
            self.tip.z,
            self.sides.len()
        );
        out
    }
}
