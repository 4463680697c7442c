//! The geometry query contract and the closed set of geometry variants.
//!
//! A transport loop only ever asks a geometry four things:
//! - `is_where`: the region containing a point, or [`OUTSIDE`].
//! - `howfar`: the first boundary crossed along a ray within a distance.
//! - `hownear`: a lower bound on the distance to any boundary.
//! - `medium`: the medium index filling a region, or [`VACUUM`].
//!
//! # Key Components
//! - [`GeometryQuery`]: the contract every variant implements.
//! - [`Geometry`]: the closed sum type over all variants, shared as [`SharedGeometry`].
//! - [`RegionData`]: region count, media, densities, labels and tolerance.
//! - [`Hit`]: the outcome of a successful `howfar`.

use std::fmt::Write;
use std::sync::Arc;

use itertools::Itertools;
use nalgebra::{Point3, Vector3};

use crate::iplanes::SectorDivider;
use crate::media::MediumTable;
use crate::prism::Prism;
use crate::projector::{GeneralProjector, ProjectorX, ProjectorY, ProjectorZ};
use crate::pyramid::Pyramid;
use crate::repeater::RadialRepeater;
use crate::spheres::Spheres;
use crate::tet_mesh::TetMeshGeometry;
use crate::triangle_mesh::TriangleMesh;
use crate::union::UnionGeometry;

/// Region index meaning "outside this geometry".
pub const OUTSIDE: i32 = -1;
/// Medium index meaning vacuum or undefined.
pub const VACUUM: i32 = -1;
/// Distance below which an intersection is treated as lying on the boundary.
pub const DEFAULT_BOUNDARY_TOLERANCE: f64 = 1e-10;

/// A boundary crossing found by `howfar`.
///
/// `normal` is a unit vector oriented against the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub region: i32,
    pub distance: f64,
    pub medium: i32,
    pub normal: Vector3<f64>,
}

impl Hit {
    pub fn new(region: i32, distance: f64, medium: i32, normal: Vector3<f64>) -> Self {
        Self {
            region,
            distance,
            medium,
            normal,
        }
    }

    /// A crossing into the region outside the geometry.
    pub fn exit(distance: f64, normal: Vector3<f64>) -> Self {
        Self::new(OUTSIDE, distance, VACUUM, normal)
    }
}

/// Compile-time registry of geometry type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    SectorDivider,
    RadialRepeater,
    Union,
    PrismX,
    PrismY,
    PrismZ,
    Prism,
    PyramidX,
    PyramidY,
    PyramidZ,
    Pyramid,
    TriangleMesh,
    TetMesh,
    Spheres,
}

impl GeometryKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            GeometryKind::SectorDivider => "EGS_IPlanes",
            GeometryKind::RadialRepeater => "EGS_RadialRepeater",
            GeometryKind::Union => "EGS_UnionGeometry",
            GeometryKind::PrismX => "EGS_PrismX",
            GeometryKind::PrismY => "EGS_PrismY",
            GeometryKind::PrismZ => "EGS_PrismZ",
            GeometryKind::Prism => "EGS_Prism",
            GeometryKind::PyramidX => "EGS_PyramidX",
            GeometryKind::PyramidY => "EGS_PyramidY",
            GeometryKind::PyramidZ => "EGS_PyramidZ",
            GeometryKind::Pyramid => "EGS_Pyramid",
            GeometryKind::TriangleMesh => "EGS_TriangleMesh",
            GeometryKind::TetMesh => "EGS_Mesh",
            GeometryKind::Spheres => "EGS_cSpheres",
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Region and medium bookkeeping shared by every geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionData {
    pub kind: GeometryKind,
    pub name: String,
    nreg: i32,
    default_medium: i32,
    region_media: Option<Vec<i32>>,
    relative_rho: Option<Vec<f64>>,
    labels: Vec<(String, Vec<i32>)>,
    pub boundary_tolerance: f64,
    pub convex: bool,
}

impl RegionData {
    pub fn new(kind: GeometryKind, name: impl Into<String>, nreg: i32) -> Self {
        Self {
            kind,
            name: name.into(),
            nreg,
            default_medium: VACUUM,
            region_media: None,
            relative_rho: None,
            labels: Vec::new(),
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE,
            convex: true,
        }
    }

    pub fn with_convex(mut self, convex: bool) -> Self {
        self.convex = convex;
        self
    }

    pub fn regions(&self) -> i32 {
        self.nreg
    }

    pub fn is_real_region(&self, ireg: i32) -> bool {
        ireg >= 0 && ireg < self.nreg
    }

    /// Medium in region `ireg`; [`VACUUM`] outside the geometry.
    pub fn medium(&self, ireg: i32) -> i32 {
        if !self.is_real_region(ireg) {
            return VACUUM;
        }
        match &self.region_media {
            Some(media) => media[ireg as usize],
            None => self.default_medium,
        }
    }

    pub fn default_medium(&self) -> i32 {
        self.default_medium
    }

    /// Fill every region with `medium`.
    pub fn set_all_media(&mut self, medium: i32) {
        self.default_medium = medium;
        if let Some(media) = &mut self.region_media {
            media.fill(medium);
        }
    }

    /// Assign `medium` to every `delta`-th region in `[start, end]`.
    pub fn set_medium(&mut self, start: i32, end: i32, medium: i32, delta: i32) {
        if self.nreg <= 1 {
            self.default_medium = medium;
            return;
        }
        if delta <= 0 {
            return;
        }
        let start = start.max(0);
        let end = end.min(self.nreg - 1);
        let default_medium = self.default_medium;
        let nreg = self.nreg as usize;
        let media = self
            .region_media
            .get_or_insert_with(|| vec![default_medium; nreg]);
        let mut j = start;
        while j <= end {
            media[j as usize] = medium;
            j += delta;
        }
    }

    pub fn relative_rho(&self, ireg: i32) -> f64 {
        match &self.relative_rho {
            Some(rho) if self.is_real_region(ireg) => rho[ireg as usize],
            _ => 1.0,
        }
    }

    pub fn has_rho_scaling(&self) -> bool {
        self.relative_rho.is_some()
    }

    pub fn set_relative_rho(&mut self, start: i32, end: i32, rho: f64) {
        let start = start.max(0);
        let end = end.min(self.nreg - 1);
        if end < start {
            return;
        }
        let nreg = self.nreg as usize;
        let values = self.relative_rho.get_or_insert_with(|| vec![1.0; nreg]);
        for j in start..=end {
            values[j as usize] = rho;
        }
    }

    /// Attach `label` to `regions`; regions outside the geometry are dropped.
    pub fn add_label(&mut self, label: &str, regions: &[i32]) {
        let valid = regions
            .iter()
            .copied()
            .filter(|&r| self.is_real_region(r))
            .collect::<Vec<_>>();
        match self.labels.iter_mut().find(|(name, _)| name == label) {
            Some((_, existing)) => existing.extend(valid),
            None => self.labels.push((label.to_string(), valid)),
        }
    }

    /// Sorted, deduplicated regions carrying `label`.
    pub fn label_regions(&self, label: &str) -> Vec<i32> {
        self.labels
            .iter()
            .filter(|(name, _)| name == label)
            .flat_map(|(_, regions)| regions.iter().copied())
            .sorted()
            .dedup()
            .collect()
    }

    /// Panic if a query that needs a region inside the geometry got a negative one.
    pub fn require_region(&self, operation: &str, ireg: i32) {
        if ireg < 0 {
            panic!(
                "{}::{}: geometry `{}` called with negative region {}; \
                 this geometry has no outside",
                self.kind, operation, self.name, ireg
            );
        }
    }

    pub fn describe(&self, media: &MediumTable) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "type = {}", self.kind);
        let _ = writeln!(out, "name = {}", self.name);
        let _ = writeln!(out, "number of regions = {}", self.nreg);
        match &self.region_media {
            None => {
                let _ = writeln!(out, "medium = {}", media.display_name(self.default_medium));
            }
            Some(region_media) => {
                let used = region_media.iter().copied().unique().sorted().collect_vec();
                let names = used.iter().map(|&m| media.display_name(m)).join(", ");
                let _ = writeln!(out, "media = {}", names);
            }
        }
        if self.has_rho_scaling() {
            let _ = writeln!(out, "relative densities are set");
        }
        out
    }
}

/// The capability set every geometry variant implements.
pub trait GeometryQuery {
    fn data(&self) -> &RegionData;

    fn data_mut(&mut self) -> &mut RegionData;

    /// Region containing `x`, or [`OUTSIDE`].
    fn is_where(&self, x: &Point3<f64>) -> i32;

    fn is_inside(&self, x: &Point3<f64>) -> bool {
        self.is_where(x) != OUTSIDE
    }

    /// First boundary crossed from region `ireg` at `x` along unit direction `u`
    /// within distance `t`. `None` leaves the particle in `ireg` with `t` untouched.
    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit>;

    /// Lower bound on the distance from `x` in region `ireg` to any boundary.
    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64;

    fn kind(&self) -> GeometryKind {
        self.data().kind
    }

    fn name(&self) -> &str {
        &self.data().name
    }

    fn regions(&self) -> i32 {
        self.data().regions()
    }

    fn is_convex(&self) -> bool {
        self.data().convex
    }

    fn boundary_tolerance(&self) -> f64 {
        self.data().boundary_tolerance
    }

    /// Upper bound on the boundary crossings along one straight ray.
    fn max_step(&self) -> i32 {
        self.regions() + 1
    }

    fn medium(&self, ireg: i32) -> i32 {
        self.data().medium(ireg)
    }

    fn relative_rho(&self, ireg: i32) -> f64 {
        self.data().relative_rho(ireg)
    }

    fn has_rho_scaling(&self) -> bool {
        self.data().has_rho_scaling()
    }

    fn set_all_media(&mut self, medium: i32) {
        self.data_mut().set_all_media(medium);
    }

    fn set_medium(&mut self, start: i32, end: i32, medium: i32, delta: i32) {
        self.data_mut().set_medium(start, end, medium, delta);
    }

    fn set_relative_rho(&mut self, start: i32, end: i32, rho: f64) {
        self.data_mut().set_relative_rho(start, end, rho);
    }

    fn set_boundary_tolerance(&mut self, tolerance: f64) {
        self.data_mut().boundary_tolerance = tolerance;
    }

    fn label_regions(&self, label: &str) -> Vec<i32> {
        self.data().label_regions(label)
    }

    fn describe(&self, media: &MediumTable) -> String {
        self.data().describe(media)
    }
}

/// Every geometry variant, dispatched by pattern matching.
#[derive(Debug)]
pub enum Geometry {
    SectorDivider(SectorDivider),
    RadialRepeater(RadialRepeater),
    Union(UnionGeometry),
    PrismX(Prism<ProjectorX>),
    PrismY(Prism<ProjectorY>),
    PrismZ(Prism<ProjectorZ>),
    Prism(Prism<GeneralProjector>),
    PyramidX(Pyramid<ProjectorX>),
    PyramidY(Pyramid<ProjectorY>),
    PyramidZ(Pyramid<ProjectorZ>),
    Pyramid(Pyramid<GeneralProjector>),
    TriangleMesh(TriangleMesh),
    TetMesh(TetMeshGeometry),
    Spheres(Spheres),
}

/// Geometries are shared between composites, never copied.
pub type SharedGeometry = Arc<Geometry>;

macro_rules! dispatch {
    ($self:expr, $g:ident => $body:expr) => {
        match $self {
            Geometry::SectorDivider($g) => $body,
            Geometry::RadialRepeater($g) => $body,
            Geometry::Union($g) => $body,
            Geometry::PrismX($g) => $body,
            Geometry::PrismY($g) => $body,
            Geometry::PrismZ($g) => $body,
            Geometry::Prism($g) => $body,
            Geometry::PyramidX($g) => $body,
            Geometry::PyramidY($g) => $body,
            Geometry::PyramidZ($g) => $body,
            Geometry::Pyramid($g) => $body,
            Geometry::TriangleMesh($g) => $body,
            Geometry::TetMesh($g) => $body,
            Geometry::Spheres($g) => $body,
        }
    };
}

impl GeometryQuery for Geometry {
    fn data(&self) -> &RegionData {
        dispatch!(self, g => g.data())
    }

    fn data_mut(&mut self) -> &mut RegionData {
        dispatch!(self, g => g.data_mut())
    }

    fn is_where(&self, x: &Point3<f64>) -> i32 {
        dispatch!(self, g => g.is_where(x))
    }

    fn is_inside(&self, x: &Point3<f64>) -> bool {
        dispatch!(self, g => g.is_inside(x))
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        dispatch!(self, g => g.howfar(ireg, x, u, t))
    }

    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        dispatch!(self, g => g.hownear(ireg, x))
    }

    fn max_step(&self) -> i32 {
        dispatch!(self, g => g.max_step())
    }

    fn medium(&self, ireg: i32) -> i32 {
        dispatch!(self, g => g.medium(ireg))
    }

    fn relative_rho(&self, ireg: i32) -> f64 {
        dispatch!(self, g => g.relative_rho(ireg))
    }

    fn has_rho_scaling(&self) -> bool {
        dispatch!(self, g => g.has_rho_scaling())
    }

    fn set_all_media(&mut self, medium: i32) {
        dispatch!(self, g => g.set_all_media(medium))
    }

    fn set_medium(&mut self, start: i32, end: i32, medium: i32, delta: i32) {
        dispatch!(self, g => g.set_medium(start, end, medium, delta))
    }

    fn set_relative_rho(&mut self, start: i32, end: i32, rho: f64) {
        dispatch!(self, g => g.set_relative_rho(start, end, rho))
    }

    fn set_boundary_tolerance(&mut self, tolerance: f64) {
        dispatch!(self, g => g.set_boundary_tolerance(tolerance))
    }

    fn label_regions(&self, label: &str) -> Vec<i32> {
        dispatch!(self, g => g.label_regions(label))
    }

    fn describe(&self, media: &MediumTable) -> String {
        dispatch!(self, g => g.describe(media))
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Geometry {
                fn from(g: $ty) -> Self {
                    Geometry::$variant(g)
                }
            }
        )*
    };
}

impl_from!(
    SectorDivider(SectorDivider),
    RadialRepeater(RadialRepeater),
    Union(UnionGeometry),
    PrismX(Prism<ProjectorX>),
    PrismY(Prism<ProjectorY>),
    PrismZ(Prism<ProjectorZ>),
    Prism(Prism<GeneralProjector>),
    PyramidX(Pyramid<ProjectorX>),
    PyramidY(Pyramid<ProjectorY>),
    PyramidZ(Pyramid<ProjectorZ>),
    Pyramid(Pyramid<GeneralProjector>),
    TriangleMesh(TriangleMesh),
    TetMesh(TetMeshGeometry),
    Spheres(Spheres),
);

#[cfg(test)]
mod tests {
    use super::*;

    fn data(nreg: i32) -> RegionData {
        RegionData::new(GeometryKind::Spheres, "test", nreg)
    }

    #[test]
    fn default_medium_is_vacuum() {
        let d = data(3);
        assert_eq!(d.medium(0), VACUUM);
        assert_eq!(d.medium(OUTSIDE), VACUUM);
        assert_eq!(d.relative_rho(2), 1.0);
        assert!(!d.has_rho_scaling());
    }

    #[test]
    fn set_medium_with_stride_and_clamping() {
        let mut d = data(6);
        d.set_all_media(0);
        d.set_medium(-3, 10, 1, 2);
        assert_eq!(
            (0..6).map(|r| d.medium(r)).collect::<Vec<_>>(),
            vec![1, 0, 1, 0, 1, 0]
        );
        // non-positive stride changes nothing
        d.set_medium(0, 5, 7, 0);
        assert_eq!(d.medium(1), 0);
    }

    #[test]
    fn set_medium_single_region_sets_default() {
        let mut d = data(1);
        d.set_medium(3, 4, 2, 1);
        assert_eq!(d.medium(0), 2);
    }

    #[test]
    fn relative_rho_range_is_clamped() {
        let mut d = data(4);
        d.set_relative_rho(2, 9, 0.5);
        assert!(d.has_rho_scaling());
        assert_eq!(d.relative_rho(1), 1.0);
        assert_eq!(d.relative_rho(3), 0.5);
        d.set_relative_rho(3, 2, 2.0);
        assert_eq!(d.relative_rho(2), 0.5);
    }

    #[test]
    fn labels_are_sorted_and_unique() {
        let mut d = data(5);
        d.add_label("target", &[3, 1, 7]);
        d.add_label("target", &[1, 0]);
        assert_eq!(d.label_regions("target"), vec![0, 1, 3]);
        assert!(d.label_regions("missing").is_empty());
    }

    #[test]
    #[should_panic(expected = "negative region")]
    fn negative_region_is_fatal() {
        data(2).require_region("howfar", -1);
    }

    #[test]
    fn type_names() {
        assert_eq!(GeometryKind::Union.type_name(), "EGS_UnionGeometry");
        assert_eq!(GeometryKind::PrismZ.to_string(), "EGS_PrismZ");
    }
}
