//! Sector divider: planes through a common axis cutting space into wedges.
//!
//! Wedge `j` lies between plane `j` and plane `j + 1` (cyclically) and every
//! point in space belongs to exactly one wedge, so this geometry has no
//! outside. It is used on its own and as the substrate of the
//! [`RadialRepeater`](crate::repeater::RadialRepeater).

use std::f64::consts::PI;
use std::fmt::Write;

use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData};
use crate::media::MediumTable;
use crate::transform::rotation_to_z;

/// The plane `{x : normal . x = offset}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// Plane with unit `normal` containing `point`.
    pub fn through(normal: Vector3<f64>, point: &Point3<f64>) -> Self {
        Self::new(normal, normal.dot(&point.coords))
    }

    /// Signed distance of `x` from the plane, positive on the side the normal points to.
    pub fn distance(&self, x: &Point3<f64>) -> f64 {
        self.normal.dot(&x.coords) - self.offset
    }
}

/// Intersecting planes sharing one axis.
#[derive(Debug, Clone)]
pub struct SectorDivider {
    data: RegionData,
    xo: Point3<f64>,
    axis: Vector3<f64>,
    planes: Vec<Plane>,
}

/// Normal of the plane at azimuth `phi` about `axis`, in world coordinates.
fn azimuth_normal(axis: &Vector3<f64>, phi: f64) -> Vector3<f64> {
    let (sphi, cphi) = phi.sin_cos();
    rotation_to_z(axis).transpose() * Vector3::new(-sphi, cphi, 0.0)
}

impl SectorDivider {
    fn from_plane_list(
        name: &str,
        xo: Point3<f64>,
        axis: Vector3<f64>,
        planes: Vec<Plane>,
    ) -> Result<Self> {
        if planes.is_empty() {
            return Err(GeometryError::NoRegions {
                geometry: name.to_string(),
            });
        }
        let nreg = planes.len() as i32;
        Ok(Self {
            data: RegionData::new(GeometryKind::SectorDivider, name, nreg),
            xo,
            axis,
            planes,
        })
    }

    /// Planes at the given azimuths, each doubled by its opposite half-plane,
    /// giving `2 * angles.len()` wedges.
    ///
    /// Angles must be strictly increasing and span less than a half turn.
    pub fn from_angles(
        name: &str,
        xo: Point3<f64>,
        axis: Vector3<f64>,
        angles: &[f64],
        degrees: bool,
    ) -> Result<Self> {
        let half_turn = if degrees { 180.0 } else { PI };
        for (index, pair) in angles.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(GeometryError::AnglesNotIncreasing {
                    geometry: name.to_string(),
                    index: index + 1,
                    angle: pair[1],
                });
            }
        }
        if let (Some(first), Some(last)) = (angles.first(), angles.last()) {
            let span = last - first;
            if span >= half_turn {
                return Err(GeometryError::AngleSpanTooLarge {
                    geometry: name.to_string(),
                    span: if degrees { span } else { span.to_degrees() },
                });
            }
        }
        let to_radians = if degrees { PI / 180.0 } else { 1.0 };
        let planes = angles
            .iter()
            .chain(angles.iter())
            .enumerate()
            .map(|(j, &phi)| {
                let phi = if j < angles.len() { phi } else { phi + half_turn };
                Plane::through(azimuth_normal(&axis, phi * to_radians), &xo)
            })
            .collect();
        Self::from_plane_list(name, xo, axis, planes)
    }

    /// Planes given directly by normal and offset.
    pub fn from_planes(
        name: &str,
        xo: Point3<f64>,
        axis: Vector3<f64>,
        normals: &[Vector3<f64>],
        offsets: &[f64],
    ) -> Result<Self> {
        if normals.len() != offsets.len() {
            return Err(GeometryError::invalid(
                "positions",
                format!(
                    "{} normals but {} positions",
                    normals.len(),
                    offsets.len()
                ),
            ));
        }
        let planes = normals
            .iter()
            .zip(offsets)
            .map(|(n, &d)| Plane::new(n.normalize(), d))
            .collect();
        Self::from_plane_list(name, xo, axis, planes)
    }

    /// `n` planes spaced uniformly around the axis, the first at azimuth
    /// `first` (radians).
    pub fn uniform(
        name: &str,
        xo: Point3<f64>,
        axis: Vector3<f64>,
        n: usize,
        first: f64,
    ) -> Result<Self> {
        let dphi = 2.0 * PI / n.max(1) as f64;
        let planes = (0..n)
            .map(|j| Plane::through(azimuth_normal(&axis, first + dphi * j as f64), &xo))
            .collect();
        Self::from_plane_list(name, xo, axis, planes)
    }

    pub fn axis_point(&self) -> &Point3<f64> {
        &self.xo
    }

    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    fn next(&self, j: usize) -> usize {
        if j + 1 >= self.planes.len() {
            0
        } else {
            j + 1
        }
    }
}

impl GeometryQuery for SectorDivider {
    fn data(&self) -> &RegionData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RegionData {
        &mut self.data
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        let n = self.planes.len();
        for j in 1..n {
            if self.planes[j - 1].distance(x) >= 0.0 && self.planes[j].distance(x) < 0.0 {
                return j as i32 - 1;
            }
        }
        n as i32 - 1
    }

    fn is_inside(&self, _x: &Point3<f64>) -> bool {
        true
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        self.data.require_region("howfar", ireg);
        let i = ireg as usize;
        let n = self.planes.len() as i32;
        let mut best: Option<Hit> = None;
        let mut t = t;

        // leaving through the lower plane
        let lower = &self.planes[i];
        let up = lower.normal.dot(u);
        if up < 0.0 {
            let t1 = -lower.distance(x) / up;
            if t1 <= t {
                t = t1;
                let inew = if ireg == 0 { n - 1 } else { ireg - 1 };
                best = Some(Hit::new(inew, t1, self.medium(inew), lower.normal));
            }
        }

        // leaving through the upper plane
        let j = self.next(i);
        let upper = &self.planes[j];
        let up = upper.normal.dot(u);
        if up > 0.0 {
            let t2 = -upper.distance(x) / up;
            if t2 < t {
                let inew = j as i32;
                best = Some(Hit::new(inew, t2, self.medium(inew), -upper.normal));
            }
        }
        best
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        self.data.require_region("hownear", ireg);
        let i = ireg as usize;
        let t1 = self.planes[i].distance(x);
        let t2 = -self.planes[self.next(i)].distance(x);
        t1.min(t2)
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let _ = writeln!(
            out,
            "axis: Xo = ({}, {}, {}) a = ({}, {}, {})",
            self.xo.x, self.xo.y, self.xo.z, self.axis.x, self.axis.y, self.axis.z
        );
        out
    }
}
