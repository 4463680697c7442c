//! Tetrahedral volume meshes: elements, neighbour table and the mesh geometry.
//!
//! Each element of a mesh is one region, with its own medium and relative
//! density. Transport inside the mesh hops from element to element through
//! the neighbour table; only boundary faces are ever tested from outside.
//!
//! # Key Components
//!
//! - [`Tetrahedron`]: four distinct node ids, with faces opposite each node
//! - [`TetrahedralMesh`]: elements, renumbered nodes and their neighbour table,
//!   exposed as flat arrays for downstream consumers
//! - [`TetMeshGeometry`]: the geometry variant over a mesh

use std::collections::BTreeMap;
use std::fmt::Write;

use itertools::Itertools;
use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};
use crate::geometry::{GeometryKind, GeometryQuery, Hit, RegionData, OUTSIDE};
use crate::media::MediumTable;
use crate::neighbours::{tetrahedron_neighbours, NONE};
use crate::stl::Triangle;
use crate::triangle_mesh::{closest_point_on_triangle, ray_triangle_intersection, BoundingBox};

/// Margin added on every side of the mesh bounding box.
const BBOX_MARGIN: f64 = 1e-8;

/// Three node ids of a tetrahedron face, sorted so that equality ignores order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Face([i64; 3]);

impl Face {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        let mut nodes = [a, b, c];
        nodes.sort_unstable();
        Self(nodes)
    }

    pub fn nodes(&self) -> [i64; 3] {
        self.0
    }
}

/// Four distinct node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tetrahedron {
    nodes: [i64; 4],
}

impl Tetrahedron {
    /// Fails with the fatal [`GeometryError::DuplicateNode`] if any id repeats.
    pub fn new(a: i64, b: i64, c: i64, d: i64) -> Result<Self> {
        let nodes = [a, b, c, d];
        if let Some(node) = nodes.iter().duplicates().next() {
            return Err(GeometryError::DuplicateNode(*node));
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> [i64; 4] {
        self.nodes
    }

    /// The face opposite node `f`.
    pub fn face(&self, f: usize) -> Face {
        let n = self.nodes;
        match f {
            0 => Face::new(n[1], n[2], n[3]),
            1 => Face::new(n[0], n[2], n[3]),
            2 => Face::new(n[0], n[1], n[3]),
            _ => Face::new(n[0], n[1], n[2]),
        }
    }

    pub fn faces(&self) -> [Face; 4] {
        [self.face(0), self.face(1), self.face(2), self.face(3)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshNode {
    pub tag: i64,
    pub position: Point3<f64>,
}

impl MeshNode {
    pub fn new(tag: i64, x: f64, y: f64, z: f64) -> Self {
        Self {
            tag,
            position: Point3::new(x, y, z),
        }
    }
}

/// A tetrahedron with its simulation properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshElement {
    pub tag: i64,
    pub tetrahedron: Tetrahedron,
    pub medium: i32,
    pub relative_rho: f64,
}

impl MeshElement {
    /// An element filled with vacuum at nominal density.
    pub fn new(tag: i64, tetrahedron: Tetrahedron) -> Self {
        Self {
            tag,
            tetrahedron,
            medium: -1,
            relative_rho: 1.0,
        }
    }

    pub fn with_medium(mut self, medium: i32) -> Self {
        self.medium = medium;
        self
    }

    pub fn with_relative_rho(mut self, rho: f64) -> Self {
        self.relative_rho = rho;
        self
    }
}

/// Elements over densely renumbered nodes, with their face neighbours.
///
/// **Context**: Mesh files number nodes arbitrarily, with gaps and sometimes
/// from 0. The neighbour builder wants indices `0..n`.
///
/// **How it Works**: Node tags are sorted and each node gets its rank as
/// index. Element connectivity is rewritten in those indices and the
/// neighbour table is built once, here.
#[derive(Debug, Clone, PartialEq)]
pub struct TetrahedralMesh {
    elements: Vec<MeshElement>,
    nodes: Vec<Point3<f64>>,
    connectivity: Vec<[usize; 4]>,
    neighbours: Vec<[i32; 4]>,
}

impl TetrahedralMesh {
    pub fn new(nodes: Vec<MeshNode>, elements: Vec<MeshElement>) -> Result<Self> {
        if elements.is_empty() {
            return Err(GeometryError::invalid("elements", "the mesh has no elements"));
        }
        let mut by_tag = BTreeMap::new();
        for node in &nodes {
            if by_tag.insert(node.tag, node.position).is_some() {
                return Err(GeometryError::invalid(
                    "nodes",
                    format!("node {} is defined twice", node.tag),
                ));
            }
        }
        let index: BTreeMap<i64, usize> = by_tag.keys().enumerate().map(|(i, &t)| (t, i)).collect();

        let connectivity = elements
            .iter()
            .map(|e| {
                let mut dense = [0usize; 4];
                for (slot, tag) in dense.iter_mut().zip(e.tetrahedron.nodes()) {
                    *slot = *index.get(&tag).ok_or_else(|| {
                        GeometryError::invalid(
                            "elements",
                            format!("element {} uses undefined node {}", e.tag, tag),
                        )
                    })?;
                }
                Ok(dense)
            })
            .collect::<Result<Vec<_>>>()?;

        let neighbours = tetrahedron_neighbours(&connectivity);
        log::debug!(
            "tetrahedral mesh: {} nodes, {} elements, {} boundary faces",
            by_tag.len(),
            elements.len(),
            neighbours.iter().flatten().filter(|&&n| n == NONE).count()
        );
        Ok(Self {
            elements,
            nodes: by_tag.into_values().collect(),
            connectivity,
            neighbours,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn elements(&self) -> &[MeshElement] {
        &self.elements
    }

    /// Corner positions of element `e`, in its node order.
    pub fn corners(&self, e: usize) -> [Point3<f64>; 4] {
        self.connectivity[e].map(|n| self.nodes[n])
    }

    pub fn neighbour_table(&self) -> &[[i32; 4]] {
        &self.neighbours
    }

    pub fn is_boundary_element(&self, e: usize) -> bool {
        self.neighbours[e].contains(&NONE)
    }

    /// Dense node indices, four per element.
    pub fn node_indices(&self) -> Vec<usize> {
        self.connectivity.iter().flatten().copied().collect()
    }

    /// Whether each element has at least one boundary face.
    pub fn boundaries(&self) -> Vec<bool> {
        (0..self.len()).map(|e| self.is_boundary_element(e)).collect()
    }

    /// Neighbour table flattened, four per element, [`NONE`] on boundary faces.
    pub fn neighbours(&self) -> Vec<i32> {
        self.neighbours.iter().flatten().copied().collect()
    }

    pub fn media(&self) -> Vec<i32> {
        self.elements.iter().map(|e| e.medium).collect()
    }

    pub fn relative_densities(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.relative_rho).collect()
    }

    /// Corner coordinates of every element, twelve values per element, times `scale`.
    pub fn coords(&self, scale: f64) -> Vec<f64> {
        self.connectivity
            .iter()
            .flatten()
            .flat_map(|&n| {
                let p = self.nodes[n].coords * scale;
                [p.x, p.y, p.z]
            })
            .collect()
    }

    pub fn element_tags(&self) -> Vec<i64> {
        self.elements.iter().map(|e| e.tag).collect()
    }

    /// Multiply every node coordinate by `factor`.
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if factor <= 0.0 {
            return Err(GeometryError::NonPositiveScale(factor));
        }
        for node in &mut self.nodes {
            node.coords *= factor;
        }
        Ok(())
    }

    /// Replace every element medium `m` by `f(m)`.
    pub fn map_media(&mut self, mut f: impl FnMut(i32) -> i32) {
        for element in &mut self.elements {
            element.medium = f(element.medium);
        }
    }
}

/// Plane of one element face, normal pointing into the element.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FacePlane {
    normal: Vector3<f64>,
    offset: f64,
}

impl FacePlane {
    /// Signed distance of `x`, positive on the element side.
    fn distance(&self, x: &Point3<f64>) -> f64 {
        self.normal.dot(&x.coords) - self.offset
    }
}

/// A face with no neighbour, stored as a triangle with outward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundaryFace {
    element: usize,
    triangle: Triangle,
}

#[derive(Debug, Clone)]
pub struct TetMeshGeometry {
    data: RegionData,
    mesh: TetrahedralMesh,
    planes: Vec<[FacePlane; 4]>,
    boundary: Vec<BoundaryFace>,
    bbox: BoundingBox,
}

impl TetMeshGeometry {
    pub fn new(name: &str, mesh: TetrahedralMesh) -> Result<Self> {
        let mut planes = Vec::with_capacity(mesh.len());
        let mut boundary = Vec::new();
        for e in 0..mesh.len() {
            let corners = mesh.corners(e);
            let mut element_planes = [FacePlane {
                normal: Vector3::zeros(),
                offset: 0.0,
            }; 4];
            for (f, plane) in element_planes.iter_mut().enumerate() {
                let [a, b, c] = face_corners(&corners, f);
                let mut normal = (b - a).cross(&(c - a)).try_normalize(0.0).ok_or_else(|| {
                    GeometryError::invalid(
                        "elements",
                        format!("element {} is degenerate", mesh.elements[e].tag),
                    )
                })?;
                if normal.dot(&(corners[f] - a)) < 0.0 {
                    normal = -normal;
                }
                *plane = FacePlane {
                    normal,
                    offset: normal.dot(&a.coords),
                };
                if mesh.neighbours[e][f] == NONE {
                    boundary.push(BoundaryFace {
                        element: e,
                        triangle: Triangle::new(a, b, c, -normal),
                    });
                }
            }
            planes.push(element_planes);
        }

        let mut bbox = BoundingBox::around(mesh.nodes.iter());
        bbox.expand(BBOX_MARGIN);

        let nreg = mesh.len() as i32;
        let mut data = RegionData::new(GeometryKind::TetMesh, name, nreg).with_convex(false);
        let media = mesh.media();
        if media.iter().all_equal() {
            data.set_all_media(media[0]);
        } else {
            for (e, &medium) in media.iter().enumerate() {
                data.set_medium(e as i32, e as i32, medium, 1);
            }
        }
        for (e, &rho) in mesh.relative_densities().iter().enumerate() {
            if rho != 1.0 {
                data.set_relative_rho(e as i32, e as i32, rho);
            }
        }
        log::debug!("{} `{}`: {} boundary faces", GeometryKind::TetMesh, name, boundary.len());

        Ok(Self {
            data,
            mesh,
            planes,
            boundary,
            bbox,
        })
    }

    pub fn mesh(&self) -> &TetrahedralMesh {
        &self.mesh
    }

    pub fn num_boundary_faces(&self) -> usize {
        self.boundary.len()
    }

    fn in_element(&self, e: usize, x: &Point3<f64>) -> bool {
        self.planes[e].iter().all(|p| p.distance(x) >= 0.0)
    }

    /// Distance from `x` in element `ireg` to the outer surface of the mesh
    /// along `u`, found by hopping through neighbours.
    pub fn howfar_to_outside(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>) -> f64 {
        let mut region = ireg;
        let mut position = *x;
        let mut total = 0.0;
        for _ in 0..self.max_step() {
            if region < 0 {
                break;
            }
            let Some(hit) = self.howfar(region, &position, u, f64::INFINITY) else {
                break;
            };
            total += hit.distance;
            position += u * hit.distance;
            region = hit.region;
        }
        total
    }
}

fn face_corners(corners: &[Point3<f64>; 4], f: usize) -> [Point3<f64>; 3] {
    match f {
        0 => [corners[1], corners[2], corners[3]],
        1 => [corners[0], corners[2], corners[3]],
        2 => [corners[0], corners[1], corners[3]],
        _ => [corners[0], corners[1], corners[2]],
    }
}

impl GeometryQuery for TetMeshGeometry {
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
        (0..self.mesh.len())
            .find(|&e| self.in_element(e, x))
            .map_or(OUTSIDE, |e| e as i32)
    }

    fn howfar(&self, ireg: i32, x: &Point3<f64>, u: &Vector3<f64>, t: f64) -> Option<Hit> {
        if ireg >= 0 {
            let e = ireg as usize;
            let mut t = t;
            let mut exit = None;
            for (f, plane) in self.planes[e].iter().enumerate() {
                let up = u.dot(&plane.normal);
                if up >= 0.0 {
                    continue;
                }
                let dist = (-plane.distance(x) / up).max(0.0);
                if dist < t {
                    t = dist;
                    exit = Some((f, dist));
                }
            }
            return exit.map(|(f, dist)| {
                let next = self.mesh.neighbours[e][f];
                let normal = self.planes[e][f].normal;
                if next == NONE {
                    Hit::exit(dist, normal)
                } else {
                    Hit::new(next, dist, self.medium(next), normal)
                }
            });
        }

        if !self.bbox.contains(x) && !self.bbox.ray_intersects(x, u) {
            return None;
        }
        let mut t = t;
        let mut hit = None;
        for face in &self.boundary {
            if u.dot(&face.triangle.normal) >= 0.0 {
                continue;
            }
            if let Some(dist) = ray_triangle_intersection(x, u, &face.triangle) {
                if dist < t {
                    t = dist;
                    let region = face.element as i32;
                    hit = Some(Hit::new(region, dist, self.medium(region), face.triangle.normal));
                }
            }
        }
        hit
    }

    /// Inside, the distance to the nearest face plane of the element, which
    /// never exceeds the true distance. Outside, the exact distance to the
    /// mesh surface.
    fn hownear(&self, ireg: i32, x: &Point3<f64>) -> f64 {
        if ireg >= 0 {
            return self.planes[ireg as usize]
                .iter()
                .map(|p| p.distance(x))
                .fold(f64::INFINITY, f64::min)
                .max(0.0);
        }
        self.boundary
            .iter()
            .map(|face| (x - closest_point_on_triangle(x, &face.triangle)).norm())
            .fold(f64::INFINITY, f64::min)
    }

    fn max_step(&self) -> i32 {
        (self.mesh.len() + self.boundary.len()) as i32 + 1
    }

    fn describe(&self, media: &MediumTable) -> String {
        let mut out = self.data.describe(media);
        let _ = writeln!(
            out,
            "{} nodes, {} boundary elements, {} boundary faces",
            self.mesh.num_nodes(),
            self.mesh.boundaries().iter().filter(|&&b| b).count(),
            self.boundary.len()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Unit cube as a central tetrahedron plus four corner ones. Node tag
    /// `10 k` sits at cube corner `k = x + 2y + 4z`.
    fn cube_mesh() -> TetrahedralMesh {
        let nodes = (0..8)
            .map(|k| MeshNode::new(10 * k, (k & 1) as f64, ((k >> 1) & 1) as f64, ((k >> 2) & 1) as f64))
            .collect();
        let elements = [[1, 2, 4, 7], [0, 1, 2, 4], [3, 1, 2, 7], [5, 1, 4, 7], [6, 2, 4, 7]]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let tet = Tetrahedron::new(10 * n[0], 10 * n[1], 10 * n[2], 10 * n[3]).unwrap();
                MeshElement::new(i as i64 + 100, tet).with_medium(i as i32 % 2)
            })
            .collect();
        TetrahedralMesh::new(nodes, elements).unwrap()
    }

    fn cube() -> TetMeshGeometry {
        TetMeshGeometry::new("cube", cube_mesh()).unwrap()
    }

    #[test]
    fn duplicate_node_is_fatal() {
        let err = Tetrahedron::new(1, 2, 3, 2).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "duplicate node 2");
        assert!(Tetrahedron::new(0, 1, 2, 3).is_ok());
    }

    #[test]
    fn faces_ignore_node_order() {
        let tet = Tetrahedron::new(4, 9, 1, 7).unwrap();
        assert_eq!(tet.face(0), Face::new(7, 1, 9));
        assert_eq!(tet.face(3).nodes(), [1, 4, 9]);
        assert_eq!(Tetrahedron::new(9, 1, 7, 2).unwrap().face(3), tet.face(0));
    }

    #[test]
    fn output_arrays() {
        let mesh = cube_mesh();
        assert_eq!(mesh.len(), 5);
        assert_eq!(mesh.num_nodes(), 8);
        // tags 0, 10, ... 70 become 0..8
        assert_eq!(&mesh.node_indices()[..4], &[1, 2, 4, 7]);
        assert_eq!(mesh.boundaries(), vec![false, true, true, true, true]);
        assert_eq!(&mesh.neighbours()[..8], &[4, 3, 2, 1, 0, NONE, NONE, NONE]);
        assert_eq!(mesh.media(), vec![0, 1, 0, 1, 0]);
        assert_eq!(mesh.relative_densities(), vec![1.0; 5]);
        assert_eq!(mesh.element_tags(), vec![100, 101, 102, 103, 104]);
        let coords = mesh.coords(2.0);
        assert_eq!(coords.len(), 60);
        // first corner of the first element is cube corner 1
        assert_eq!(&coords[..3], &[2.0, 0.0, 0.0]);
    }

    #[test]
    fn undefined_node_is_recoverable() {
        let nodes = vec![MeshNode::new(1, 0.0, 0.0, 0.0)];
        let tet = Tetrahedron::new(1, 2, 3, 4).unwrap();
        let err = TetrahedralMesh::new(nodes, vec![MeshElement::new(1, tet)]).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn classifies_points() {
        let g = cube();
        assert_eq!(g.regions(), 5);
        assert!(!g.is_convex());
        assert_eq!(g.is_where(&Point3::new(0.5, 0.5, 0.5)), 0);
        assert_eq!(g.is_where(&Point3::new(0.1, 0.1, 0.1)), 1);
        assert_eq!(g.is_where(&Point3::new(0.9, 0.9, 0.1)), 2);
        assert_eq!(g.is_where(&Point3::new(2.0, 0.0, 0.0)), OUTSIDE);
        assert_eq!(g.medium(1), 1);
        assert_eq!(g.medium(OUTSIDE), -1);
        assert_eq!(g.num_boundary_faces(), 12);
    }

    #[test]
    fn steps_into_neighbour() {
        let g = cube();
        let x = Point3::new(0.5, 0.5, 0.5);
        let u = Vector3::new(2.0, -1.0, 0.0).normalize();
        let hit = g.howfar(0, &x, &u, 10.0).unwrap();
        // crosses x - y + z = 1 into the corner element at (1, 0, 1)
        assert_eq!((hit.region, hit.medium), (3, 1));
        assert_relative_eq!(hit.distance, 5f64.sqrt() / 6.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal, Vector3::new(-1.0, 1.0, -1.0) / 3f64.sqrt(), epsilon = 1e-12);
        assert!(g.howfar(0, &x, &u, 0.1).is_none());

        let y = x + u * hit.distance;
        let hit = g.howfar(3, &y, &u, 10.0).unwrap();
        assert_eq!(hit.region, OUTSIDE);
        assert_relative_eq!(hit.distance, 5f64.sqrt() / 12.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal, -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn distance_to_outside() {
        let g = cube();
        let u = Vector3::new(2.0, -1.0, 0.0).normalize();
        let d = g.howfar_to_outside(0, &Point3::new(0.5, 0.5, 0.5), &u);
        assert_relative_eq!(d, 5f64.sqrt() / 4.0, epsilon = 1e-12);
        assert_eq!(g.howfar_to_outside(OUTSIDE, &Point3::origin(), &u), 0.0);
    }

    #[test]
    fn enters_through_boundary_face() {
        let g = cube();
        let hit = g
            .howfar(OUTSIDE, &Point3::new(-1.0, 0.3, 0.6), &Vector3::x(), 10.0)
            .unwrap();
        assert_eq!(hit.region, 1);
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal, -Vector3::x(), epsilon = 1e-12);
        assert!(g
            .howfar(OUTSIDE, &Point3::new(-1.0, 0.3, 0.6), &-Vector3::x(), 10.0)
            .is_none());
        assert!(g
            .howfar(OUTSIDE, &Point3::new(-1.0, 0.3, 0.6), &Vector3::x(), 0.5)
            .is_none());
    }

    #[test]
    fn hownear_inside_and_outside() {
        let g = cube();
        assert_relative_eq!(
            g.hownear(0, &Point3::new(0.5, 0.5, 0.5)),
            0.5 / 3f64.sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(g.hownear(OUTSIDE, &Point3::new(-1.0, 0.3, 0.6)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            g.hownear(OUTSIDE, &Point3::new(2.0, 2.0, 0.5)),
            2f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn random_points_are_consistent() {
        let g = cube();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..2000 {
            let x = Point3::new(
                rng.random_range(-0.5..1.5),
                rng.random_range(-0.5..1.5),
                rng.random_range(-0.5..1.5),
            );
            let u = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            )
            .normalize();
            let ir = g.is_where(&x);
            let inside_cube = (0..3).all(|i| x[i] > 0.0 && x[i] < 1.0);
            assert_eq!(ir != OUTSIDE, inside_cube);
            let near = g.hownear(ir, &x);
            if let Some(hit) = g.howfar(ir, &x, &u, 10.0) {
                assert!(near <= hit.distance + 1e-9);
                assert!(hit.normal.dot(&u) <= 0.0);
            }
            if ir != OUTSIDE {
                let d = g.howfar_to_outside(ir, &x, &u);
                assert_eq!(g.is_where(&(x + u * (d + 1e-7))), OUTSIDE);
            }
        }
    }
}
