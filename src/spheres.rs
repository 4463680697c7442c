use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData, OUTSIDE, VACUUM};

/// Concentric spheres about `midpoint`; region 0 is the innermost sphere.
#[derive(Debug, Clone)]
pub struct Spheres {
    data: RegionData,
    midpoint: Point3<f64>,
    radii: Vec<f64>,
    radii2: Vec<f64>,
}

impl Spheres {
    pub fn new(name: &str, midpoint: Point3<f64>, radii: Vec<f64>) -> Result<Self> {
        if radii.is_empty() {
            return Err(GeometryError::NoRegions {
                geometry: name.to_string(),
            });
        }
        if radii[0] <= 0.0 || radii.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GeometryError::invalid(
                "radii",
                "radii must be positive and strictly increasing",
            ));
        }
        let nreg = radii.len() as i32;
        Ok(Self {
            data: RegionData::new(GeometryKind::Spheres, name, nreg).with_convex(nreg == 1),
            midpoint,
            radii2: radii.iter().map(|r| r * r).collect(),
            radii,
        })
    }

    pub fn midpoint(&self) -> &Point3<f64> {
        &self.midpoint
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    fn crossing(&self, region: i32) -> (i32, i32) {
        if region >= 0 && region < self.data.regions() {
            (region, self.medium(region))
        } else {
            (OUTSIDE, VACUUM)
        }
    }
}

impl GeometryQuery for Spheres {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        let r2 = (x - self.midpoint).norm_squared();
        // first radius enclosing the point
        match self.radii2.iter().position(|&big_r2| r2 < big_r2) {
            Some(ir) => ir as i32,
            None if r2 <= self.radii2[self.radii2.len() - 1] => self.radii2.len() as i32 - 1,
            None => OUTSIDE,
        }
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        let nreg = self.data.regions();
        let xp = x - self.midpoint;
        let aa = xp.dot(u);
        let aa2 = aa * aa;
        let bb2 = xp.norm_squared();

        let (d, next, rad) = if ireg >= 0 {
            let i = ireg as usize;
            let outward = |r2b2: f64| -> f64 {
                let tmp = aa2 + r2b2;
                let tmp = if tmp > 0.0 { tmp.sqrt() } else { 0.0 };
                // reduces round-off when aa2 dominates r2b2
                if aa > 0.0 {
                    r2b2 / (tmp + aa)
                } else {
                    tmp - aa
                }
            };
            if aa >= 0.0 || ireg == 0 {
                let r2b2 = self.radii2[i] - bb2;
                let d = if r2b2 <= 0.0 && aa > 0.0 { 1e-15 } else { outward(r2b2) };
                let next = if ireg + 1 >= nreg { OUTSIDE } else { ireg + 1 };
                (d, next, -self.radii[i])
            } else {
                let r2b2 = self.radii2[i - 1] - bb2;
                let tmp = aa2 + r2b2;
                if tmp <= 0.0 {
                    // misses the nested sphere
                    let r2b2 = self.radii2[i] - bb2;
                    let tmp = aa2 + r2b2;
                    let d = if tmp > 0.0 { tmp.sqrt() - aa } else { -aa };
                    let next = if ireg + 1 >= nreg { OUTSIDE } else { ireg + 1 };
                    (d, next, -self.radii[i])
                } else {
                    let d = -r2b2 / (tmp.sqrt() - aa);
                    (d, ireg - 1, self.radii[i - 1])
                }
            }
        } else {
            if aa >= 0.0 {
                return None;
            }
            let last = self.radii.len() - 1;
            let r2b2 = self.radii2[last] - bb2;
            let tmp = aa2 + r2b2;
            if tmp <= 0.0 {
                return None;
            }
            let d = -r2b2 / (tmp.sqrt() - aa);
            (d, nreg - 1, self.radii[last])
        };

        if d > t {
            return None;
        }
        let (region, medium) = self.crossing(next);
        let normal = (xp + u * d) / rad;
        Some(Hit::new(region, d, medium, normal))
    }

    /// A line crosses each sphere at most twice.
    fn max_step(&self) -> i32 {
        2 * self.data.regions()
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        let r = (x - self.midpoint).norm();
        if ireg >= 0 {
            let i = ireg as usize;
            let outer = self.radii[i] - r;
            if i > 0 {
                outer.min(r - self.radii[i - 1])
            } else {
                outer
            }
        } else {
            r - self.radii[self.radii.len() - 1]
        }
    }
}
