//! Radial replicator: `N` rotated copies of one geometry around an axis.
//!
//! Space around the axis is split into `N` equal wedges by a
//! [`SectorDivider`]. Wedge `j` holds a copy of the repeated geometry rotated
//! by `j * 2pi/N`, so queries in wedge `j` are rotated back into the frame of
//! wedge 0 and delegated. Region `j * ng + r` is region `r` of copy `j`; the
//! last region is everything not covered by any copy.

use std::f64::consts::PI;
use std::fmt::Write;

use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData, SharedGeometry, OUTSIDE, VACUUM};
use crate::iplanes::SectorDivider;
use crate::media::MediumTable;
use crate::transform::{rot_z, rotation_to_z};

#[derive(Debug)]
pub struct RadialRepeater {
    data: RegionData,
    sectors: SectorDivider,
    repeated: SharedGeometry,
    /// Per wedge, rotation from world into the wedge-0 frame.
    to_local: Vec<Matrix3<f64>>,
    xo: Point3<f64>,
    nrep: usize,
    ng: i32,
    first: f64,
}

impl RadialRepeater {
    /// `nrep` copies of `repeated` about the axis through `xo` along `axis`.
    /// `first` (radians) is the azimuth at the centre of wedge 0.
    pub fn new(
        name: &str,
        xo: Point3<f64>,
        axis: Vector3<f64>,
        nrep: usize,
        repeated: SharedGeometry,
        first: f64,
    ) -> Result<Self> {
        let ng = repeated.regions();
        if nrep < 2 {
            return Err(GeometryError::invalid(
                "number of repetitions",
                format!("need at least 2 repetitions, got {}", nrep),
            ));
        }
        if ng < 1 {
            return Err(GeometryError::NoRegions {
                geometry: name.to_string(),
            });
        }
        let dphi = 2.0 * PI / nrep as f64;
        let sectors = SectorDivider::uniform(
            &format!("{}_sectors", name),
            xo,
            axis,
            nrep,
            first - dphi / 2.0,
        )?;
        let ro = rotation_to_z(&axis);
        let to_local = (0..nrep)
            .map(|j| ro.transpose() * rot_z(-dphi * j as f64) * ro)
            .collect();
        let nreg = nrep as i32 * ng + 1;
        Ok(Self {
            data: RegionData::new(GeometryKind::RadialRepeater, name, nreg).with_convex(false),
            sectors,
            repeated,
            to_local,
            xo,
            nrep,
            ng,
            first,
        })
    }

    pub fn repeated(&self) -> &SharedGeometry {
        &self.repeated
    }

    pub fn repetitions(&self) -> usize {
        self.nrep
    }

    fn outside_region(&self) -> i32 {
        self.data.regions() - 1
    }

    fn split(&self, ireg: i32) -> (usize, i32) {
        let ir = ireg / self.ng;
        (ir as usize, ireg - ir * self.ng)
    }

    fn local_point(&self, ir: usize, x: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.to_local[ir] * (x - self.xo))
    }

    fn local_direction(&self, ir: usize, u: &Vector3<f64>) -> Vector3<f64> {
        self.to_local[ir] * u
    }

    fn world_normal(&self, ir: usize, n: &Vector3<f64>) -> Vector3<f64> {
        self.to_local[ir].transpose() * n
    }
}

impl GeometryQuery for RadialRepeater {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        let ir = self.sectors.is_where(x) as usize;
        let il = self.repeated.is_where(&self.local_point(ir, x));
        if il >= 0 {
            ir as i32 * self.ng + il
        } else {
            self.outside_region()
        }
    }

    fn is_inside(&self, _x: &Point3<f64>) -> bool {
        true
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        self.data.require_region("howfar", ireg);
        if ireg < self.outside_region() {
            let (ir, il) = self.split(ireg);
            let xp = self.local_point(ir, x);
            let up = self.local_direction(ir, u);
            let hit = self.repeated.howfar(il, &xp, &up, t)?;
            let normal = self.world_normal(ir, &hit.normal);
            return Some(if hit.region < 0 {
                Hit::new(self.outside_region(), hit.distance, self.data.default_medium(), normal)
            } else {
                Hit::new(hit.region + ir as i32 * self.ng, hit.distance, hit.medium, normal)
            });
        }

        // outside every copy: march wedge by wedge along the ray
        let mut ir = self.sectors.is_where(x);
        let mut t_left = t;
        let mut travelled = 0.0;
        let mut xtmp = *x;
        for _ in 0..=self.nrep {
            let w = ir as usize;
            let xp = self.local_point(w, &xtmp);
            let up = self.local_direction(w, u);
            if let Some(hit) = self.repeated.howfar(OUTSIDE, &xp, &up, t_left) {
                if hit.region >= 0 {
                    return Some(Hit::new(
                        ir * self.ng + hit.region,
                        travelled + hit.distance,
                        hit.medium,
                        self.world_normal(w, &hit.normal),
                    ));
                }
            }
            let next = self.sectors.howfar(ir, &xtmp, u, t_left)?;
            travelled += next.distance;
            t_left -= next.distance;
            xtmp += u * next.distance;
            ir = next.region;
        }
        None
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        self.data.require_region("hownear", ireg);
        if ireg < self.outside_region() {
            let (ir, il) = self.split(ireg);
            return self.repeated.hownear(il, &self.local_point(ir, x));
        }
        let ir = self.sectors.is_where(x) as usize;
        self.repeated.hownear(OUTSIDE, &self.local_point(ir, x))
    }

    fn medium(&self, ireg: i32) -> i32 {
        if !self.data.is_real_region(ireg) {
            return VACUUM;
        }
        if ireg == self.outside_region() {
            return self.data.default_medium();
        }
        let (_, il) = self.split(ireg);
        self.repeated.medium(il)
    }

    fn relative_rho(&self, ireg: i32) -> f64 {
        if !self.data.is_real_region(ireg) || ireg == self.outside_region() {
            return self.data.relative_rho(ireg);
        }
        let (_, il) = self.split(ireg);
        self.repeated.relative_rho(il)
    }

    fn max_step(&self) -> i32 {
        self.nrep as i32 * (self.repeated.max_step() + 1)
    }

    /// Labels of the repeated geometry in every copy, then labels on wedges,
    /// then labels set on the replicator itself.
    fn label_regions(&self, label: &str) -> Vec<i32> {
        let mut regions = Vec::new();
        let local = self.repeated.label_regions(label);
        for copy in 0..self.nrep as i32 {
            regions.extend(local.iter().map(|r| copy * self.ng + r));
        }
        for wedge in self.sectors.label_regions(label) {
            regions.extend((0..self.ng).map(|r| wedge * self.ng + r));
        }
        regions.extend(self.data.label_regions(label));
        regions
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let axis = self.sectors.axis();
        let _ = writeln!(
            out,
            "{} uniformly rotated replicas of geometry {} with phi_o = {} degrees",
            self.nrep,
            self.repeated.name(),
            self.first.to_degrees()
        );
        let _ = writeln!(
            out,
            "axis of rotation: xo = ({}, {}, {}) a = ({}, {}, {})",
            self.xo.x, self.xo.y, self.xo.z, axis.x, axis.y, axis.z
        );
        let _ = writeln!(
            out,
            "space is filled with {}",
            media.display_name(self.data.default_medium())
        );
        out
    }
}

impl RadialRepeater {
    /// Attach a label to whole wedges, as `"set repeater label"` does.
    pub fn add_wedge_label(&mut self, label: &str, wedges: &[i32]) {
        self.sectors.data_mut().add_label(label, wedges);
    }
}
