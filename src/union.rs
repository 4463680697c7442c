//! Union of independently defined geometries with an explicit priority order.
//!
//! Where children overlap, the child with the higher priority owns the
//! space. Children are kept sorted by decreasing priority, so "higher
//! priority" is simply "earlier in the list". Region `r` of child `j` is
//! global region `j * nmax + r`, with `nmax` the largest child region count.

use std::fmt::Write;

use log::warn;
use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData, SharedGeometry, OUTSIDE, VACUUM};
use crate::media::MediumTable;

#[derive(Debug)]
pub struct UnionGeometry {
    data: RegionData,
    /// Children in decreasing priority.
    children: Vec<SharedGeometry>,
    nmax: i32,
}

impl UnionGeometry {
    /// Union of `children`. With `priorities`, a larger number wins and ties
    /// keep the given order; without, earlier children win.
    pub fn new(
        name: &str,
        children: Vec<SharedGeometry>,
        priorities: Option<&[i32]>,
    ) -> Result<Self> {
        if children.is_empty() {
            return Err(GeometryError::NoRegions {
                geometry: name.to_string(),
            });
        }
        if children.len() == 1 {
            warn!("union `{}` is made of a single geometry", name);
        }
        let children = match priorities {
            Some(p) if p.len() == children.len() => {
                let mut ranked = children.into_iter().zip(p.iter().copied()).collect::<Vec<_>>();
                // stable, so equal priorities keep input order
                ranked.sort_by(|a, b| b.1.cmp(&a.1));
                ranked.into_iter().map(|(g, _)| g).collect()
            }
            Some(p) => {
                warn!(
                    "union `{}`: {} priorities for {} geometries, ignoring priorities",
                    name,
                    p.len(),
                    children.len()
                );
                children
            }
            None => children,
        };
        let nmax = children.iter().map(|g| g.regions()).max().unwrap_or(0);
        if nmax <= 0 {
            return Err(GeometryError::NoRegions {
                geometry: name.to_string(),
            });
        }
        let nreg = nmax * children.len() as i32;
        Ok(Self {
            data: RegionData::new(GeometryKind::Union, name, nreg).with_convex(false),
            children,
            nmax,
        })
    }

    /// Children in the order they are consulted.
    pub fn children(&self) -> &[SharedGeometry] {
        &self.children
    }

    fn split(&self, ireg: i32) -> (usize, i32) {
        let jg = ireg / self.nmax;
        (jg as usize, ireg - jg * self.nmax)
    }

    fn global(&self, jg: usize, local: i32) -> i32 {
        jg as i32 * self.nmax + local
    }
}

impl GeometryQuery for UnionGeometry {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        self.children
            .iter()
            .enumerate()
            .find_map(|(j, g)| {
                let local = g.is_where(x);
                (local >= 0).then(|| self.global(j, local))
            })
            .unwrap_or(OUTSIDE)
    }

    fn is_inside(&self, x: &Point3<f64>) -> bool {
        self.children.iter().any(|g| g.is_inside(x))
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        if ireg < 0 {
            // outside everything: nearest entry wins, first child on ties
            let mut best: Option<(usize, Hit)> = None;
            let mut t = t;
            for (j, g) in self.children.iter().enumerate() {
                if let Some(hit) = g.howfar(OUTSIDE, x, u, t) {
                    if hit.region >= 0 && best.map_or(true, |(_, b)| hit.distance < b.distance) {
                        t = hit.distance;
                        best = Some((j, hit));
                    }
                }
            }
            return best.map(|(j, hit)| Hit {
                region: self.global(j, hit.region),
                ..hit
            });
        }

        let (jg, local) = self.split(ireg);
        let step = self.children[jg].howfar(local, x, u, t);
        let mut t = step.map_or(t, |h| h.distance);
        let mut result = step.map(|h| (jg, h));

        // higher priority children must have been left behind, look for re-entry
        for (j, g) in self.children[..jg].iter().enumerate() {
            if let Some(hit) = g.howfar(OUTSIDE, x, u, t) {
                let replaces = match result {
                    Some((k, _)) if k != jg => hit.distance < t,
                    _ => true,
                };
                if hit.region >= 0 && replaces {
                    t = hit.distance;
                    result = Some((j, hit));
                }
            }
        }

        match result {
            None => None,
            Some((j, hit)) if hit.region >= 0 => Some(Hit {
                region: self.global(j, hit.region),
                medium: self.children[j].medium(hit.region),
                ..hit
            }),
            Some((_, exit)) => {
                // leaving jg: the first lower priority child containing the exit point
                let landing = x + u * exit.distance;
                let entered = self.children[jg + 1..]
                    .iter()
                    .enumerate()
                    .find_map(|(k, g)| {
                        let local = g.is_where(&landing);
                        (local >= 0).then_some((jg + 1 + k, local))
                    });
                Some(match entered {
                    Some((j, local)) => Hit {
                        region: self.global(j, local),
                        medium: self.children[j].medium(local),
                        ..exit
                    },
                    None => Hit {
                        region: OUTSIDE,
                        medium: VACUUM,
                        ..exit
                    },
                })
            }
        }
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        let (candidates, start) = if ireg >= 0 {
            let (jg, local) = self.split(ireg);
            let tmin = self.children[jg].hownear(local, x);
            if tmin <= 0.0 {
                return 0.0;
            }
            (&self.children[..jg], tmin)
        } else {
            (&self.children[..], 1e30)
        };
        let mut tmin = start;
        for g in candidates.iter().rev() {
            tmin = tmin.min(g.hownear(OUTSIDE, x));
            if tmin <= 0.0 {
                return 0.0;
            }
        }
        tmin
    }

    fn medium(&self, ireg: i32) -> i32 {
        if !self.data.is_real_region(ireg) {
            return VACUUM;
        }
        let (jg, local) = self.split(ireg);
        self.children[jg].medium(local)
    }

    fn relative_rho(&self, ireg: i32) -> f64 {
        if !self.data.is_real_region(ireg) {
            return 1.0;
        }
        let (jg, local) = self.split(ireg);
        self.children[jg].relative_rho(local)
    }

    fn has_rho_scaling(&self) -> bool {
        self.children.iter().any(|g| g.has_rho_scaling())
    }

    fn max_step(&self) -> i32 {
        1 + self.children.iter().map(|g| g.max_step()).sum::<i32>()
    }

    fn set_all_media(&mut self, _medium: i32) {
        warn!(
            "union `{}`: media are defined by the individual geometries, not the union",
            self.data.name
        );
    }

    fn set_medium(&mut self, _start: i32, _end: i32, _medium: i32, _delta: i32) {
        self.set_all_media(VACUUM);
    }

    fn set_relative_rho(&mut self, _start: i32, _end: i32, _rho: f64) {
        warn!(
            "union `{}`: relative densities are defined by the individual geometries",
            self.data.name
        );
    }

    fn label_regions(&self, label: &str) -> Vec<i32> {
        let mut regions = Vec::new();
        for (j, g) in self.children.iter().enumerate() {
            regions.extend(g.label_regions(label).into_iter().map(|r| self.global(j, r)));
        }
        regions.extend(self.data.label_regions(label));
        regions
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let _ = writeln!(out, "geometries:");
        for g in &self.children {
            let _ = writeln!(out, "  {} (type {})", g.name(), g.kind());
        }
        out
    }
}
