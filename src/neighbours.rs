//! Face neighbours of simplex meshes.
//!
//! Two elements are neighbours when they share a face, i.e. all nodes of an
//! element except one. The search runs in two passes over a node-to-element
//! index, so each face is only compared against the few elements touching
//! one of its nodes instead of every element in the mesh.
//!
//! # Key Components
//!
//! - [`ElementsAroundPoints`]: compressed lists of the elements using each node
//! - [`element_neighbours`]: the neighbour table for any simplex
//! - [`tetrahedron_neighbours`] and [`triangle_neighbours`]

/// Marks a face with no neighbouring element, i.e. a boundary face.
pub const NONE: i32 = -1;

/// Elements sharing each node, stored in compressed row form.
///
/// **Context**: A neighbour search needs "all elements touching node `n`" in
/// constant time per element returned. A `Vec<Vec<usize>>` would do, but one
/// allocation per node is wasteful for large meshes.
///
/// **How it Works**: The elements touching node `n` are
/// `elements[offsets[n]..offsets[n + 1]]`. The offsets are built by counting
/// node uses, taking a running sum, scattering element indices with the
/// offsets as cursors and finally shifting the offsets back by one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementsAroundPoints {
    offsets: Vec<usize>,
    elements: Vec<usize>,
}

impl ElementsAroundPoints {
    /// Build the index for elements given as dense node indices in `0..num_nodes`.
    pub fn new<const N: usize>(elements: &[[usize; N]], num_nodes: usize) -> Self {
        let mut offsets = vec![0usize; num_nodes + 1];
        for element in elements {
            for &node in element {
                offsets[node + 1] += 1;
            }
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let mut around = vec![0usize; offsets[num_nodes]];
        for (i, element) in elements.iter().enumerate() {
            for &node in element {
                around[offsets[node]] = i;
                offsets[node] += 1;
            }
        }
        // each cursor now sits at the start of the next node's list
        for i in (1..offsets.len()).rev() {
            offsets[i] = offsets[i - 1];
        }
        offsets[0] = 0;

        Self {
            offsets,
            elements: around,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Elements using `node`, in ascending order.
    pub fn around(&self, node: usize) -> &[usize] {
        &self.elements[self.offsets[node]..self.offsets[node + 1]]
    }
}

/// Neighbour table of a simplex mesh with `N` nodes per element.
///
/// Slot `f` of element `e` holds the element across the face opposite node
/// `f` of `e`, or [`NONE`] for a boundary face. Node indices must be dense,
/// starting at 0.
///
/// **How it Works**: For each unresolved face, its nodes are flagged in a
/// membership array. Every other element touching the face's first node is
/// checked face by face; a face whose nodes are all flagged is the shared one.
/// Both directions are recorded at once, so the partner face is skipped later.
pub fn element_neighbours<const N: usize>(elements: &[[usize; N]]) -> Vec<[i32; N]> {
    let num_nodes = elements
        .iter()
        .flat_map(|e| e.iter().copied())
        .max()
        .map_or(0, |max| max + 1);
    let around = ElementsAroundPoints::new(elements, num_nodes);

    let mut neighbours = vec![[NONE; N]; elements.len()];
    let mut on_face = vec![false; num_nodes];

    for (i, element) in elements.iter().enumerate() {
        for f in 0..N {
            if neighbours[i][f] != NONE {
                continue;
            }
            let face_nodes = move || (0..N).filter(move |&k| k != f).map(move |k| element[k]);
            for node in face_nodes() {
                on_face[node] = true;
            }

            let first = element[if f == 0 { 1 } else { 0 }];
            'search: for &j in around.around(first) {
                if j == i {
                    continue;
                }
                let other = &elements[j];
                for jf in 0..N {
                    let shared = (0..N)
                        .filter(|&k| k != jf && on_face[other[k]])
                        .count();
                    if shared == N - 1 {
                        neighbours[i][f] = j as i32;
                        neighbours[j][jf] = i as i32;
                        break 'search;
                    }
                }
            }

            for node in face_nodes() {
                on_face[node] = false;
            }
        }
    }
    neighbours
}

/// Neighbours across the four faces of each tetrahedron.
pub fn tetrahedron_neighbours(elements: &[[usize; 4]]) -> Vec<[i32; 4]> {
    element_neighbours(elements)
}

/// Neighbours across the three edges of each triangle.
pub fn triangle_neighbours(elements: &[[usize; 3]]) -> Vec<[i32; 3]> {
    element_neighbours(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit cube split into a central tetrahedron and four corner ones.
    /// Cube corner `x + 2y + 4z` is node `x + 2y + 4z`.
    fn five_tet_cube() -> Vec<[usize; 4]> {
        vec![[1, 2, 4, 7], [0, 1, 2, 4], [3, 1, 2, 7], [5, 1, 4, 7], [6, 2, 4, 7]]
    }

    #[test]
    fn elements_around_points() {
        let around = ElementsAroundPoints::new(&five_tet_cube(), 8);
        assert_eq!(around.num_nodes(), 8);
        assert_eq!(around.around(0), &[1]);
        assert_eq!(around.around(1), &[0, 1, 2, 3]);
        assert_eq!(around.around(7), &[0, 2, 3, 4]);
        assert_eq!(around.around(6), &[4]);
    }

    #[test]
    fn unused_node_has_no_elements() {
        let around = ElementsAroundPoints::new(&[[0, 1, 3]], 4);
        assert!(around.around(2).is_empty());
        assert_eq!(around.around(3), &[0]);
    }

    #[test]
    fn disjoint_tetrahedra_have_no_neighbours() {
        let elements = [[0, 1, 2, 3], [4, 5, 6, 7]];
        assert_eq!(tetrahedron_neighbours(&elements), vec![[NONE; 4]; 2]);
    }

    #[test]
    fn two_tetrahedra_sharing_a_face() {
        let elements = [[1, 2, 3, 4], [1, 2, 3, 5]];
        let neighbours = tetrahedron_neighbours(&elements);
        // the shared face is opposite node 3 in both elements
        assert_eq!(neighbours[0], [NONE, NONE, NONE, 1]);
        assert_eq!(neighbours[1], [NONE, NONE, NONE, 0]);
    }

    #[test]
    fn node_order_does_not_matter() {
        let elements = [[0, 1, 2, 3], [2, 4, 0, 1]];
        let neighbours = tetrahedron_neighbours(&elements);
        assert_eq!(neighbours[0], [NONE, NONE, NONE, 1]);
        assert_eq!(neighbours[1], [NONE, 0, NONE, NONE]);
    }

    #[test]
    fn cube_centre_touches_every_corner() {
        let neighbours = tetrahedron_neighbours(&five_tet_cube());
        assert_eq!(neighbours[0], [4, 3, 2, 1]);
        for (corner, slots) in neighbours.iter().enumerate().skip(1) {
            // each corner tetrahedron meets the centre across the face opposite its corner node
            assert_eq!(slots[0], 0, "corner element {corner}");
            assert_eq!(slots[1..], [NONE; 3]);
        }
    }

    #[test]
    fn neighbour_relation_is_symmetric() {
        let elements = five_tet_cube();
        let neighbours = tetrahedron_neighbours(&elements);
        for (i, slots) in neighbours.iter().enumerate() {
            for &j in slots.iter().filter(|&&j| j != NONE) {
                assert!(neighbours[j as usize].contains(&(i as i32)));
            }
        }
    }

    #[test]
    fn triangle_strip() {
        // two triangles sharing the edge 1-2
        let neighbours = triangle_neighbours(&[[0, 1, 2], [1, 3, 2]]);
        assert_eq!(neighbours[0], [1, NONE, NONE]);
        assert_eq!(neighbours[1], [NONE, 0, NONE]);
    }

    #[test]
    fn empty_mesh() {
        assert!(tetrahedron_neighbours(&[]).is_empty());
    }
}
