//! TetGen `.node` / `.ele` mesh files.
//!
//! ```text
//! # file.node
//! num_nodes 3 num_attributes num_boundary_markers
//! tag x y z [attributes...] [boundary_marker]
//!
//! # file.ele
//! num_elements 4 1
//! tag n0 n1 n2 n3 medium_tag
//! ```
//!
//! Either file may be named; the other is found by swapping the extension.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::error::{GeometryError, Result};
use crate::tet_mesh::{MeshElement, MeshNode, TetrahedralMesh, Tetrahedron};

/// A mesh read from TetGen files.
///
/// Element media are indices into `media`, which holds one name per distinct
/// medium tag in ascending tag order.
#[derive(Debug, Clone)]
pub struct TetgenMesh {
    pub mesh: TetrahedralMesh,
    pub media: Vec<String>,
}

/// One row of an `.ele` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EleRow {
    pub tag: i64,
    pub nodes: [i64; 4],
    pub medium_tag: i64,
}

fn malformed(file: &str, reason: impl Into<String>) -> GeometryError {
    GeometryError::MalformedTetgen {
        file: file.to_string(),
        reason: reason.into(),
    }
}

/// Lines that carry data: trimmed, without blanks and `#` comments.
fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

fn parse_words<T: std::str::FromStr>(line: &str, count: usize, file: &str) -> Result<Vec<T>> {
    let words = line.split_whitespace().take(count).collect_vec();
    if words.len() < count {
        return Err(malformed(file, format!("expected {count} values in `{line}`")));
    }
    words
        .iter()
        .map(|w| w.parse::<T>().map_err(|_| malformed(file, format!("bad value `{w}`"))))
        .collect()
}

pub fn parse_node_file(text: &str, file: &str) -> Result<Vec<MeshNode>> {
    let mut lines = data_lines(text);
    let header = lines.next().ok_or_else(|| malformed(file, "missing header"))?;
    let header: Vec<i64> = parse_words(header, 2, file)?;
    if header[1] != 3 {
        return Err(malformed(file, "expected 3 coordinates per node"));
    }
    let count = usize::try_from(header[0]).map_err(|_| malformed(file, "negative node count"))?;

    let nodes = lines
        .take(count)
        .map(|line| {
            let tag: Vec<i64> = parse_words(line, 1, file)?;
            let v: Vec<f64> = parse_words(line, 4, file)?;
            Ok(MeshNode::new(tag[0], v[1], v[2], v[3]))
        })
        .collect::<Result<Vec<_>>>()?;
    if nodes.len() < count {
        return Err(malformed(
            file,
            format!("expected {count} nodes, found {}", nodes.len()),
        ));
    }
    Ok(nodes)
}

pub fn parse_ele_file(text: &str, file: &str) -> Result<Vec<EleRow>> {
    let mut lines = data_lines(text);
    let header = lines.next().ok_or_else(|| malformed(file, "missing header"))?;
    let header: Vec<i64> = parse_words(header, 3, file)?;
    if header[1] != 4 {
        return Err(malformed(file, "expected 4 nodes per tetrahedron"));
    }
    if header[2] != 1 {
        return Err(malformed(
            file,
            "expected exactly one attribute per element (the medium)",
        ));
    }
    let count =
        usize::try_from(header[0]).map_err(|_| malformed(file, "negative element count"))?;

    let rows = lines
        .take(count)
        .map(|line| {
            let v: Vec<i64> = parse_words(line, 6, file)?;
            Ok(EleRow {
                tag: v[0],
                nodes: [v[1], v[2], v[3], v[4]],
                medium_tag: v[5],
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if rows.len() < count {
        return Err(malformed(
            file,
            format!("expected {count} elements, found {}", rows.len()),
        ));
    }
    Ok(rows)
}

/// The `.node` and `.ele` paths for a path naming either one.
pub fn tetgen_paths(path: &Path) -> Result<(PathBuf, PathBuf)> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("node") => Ok((path.to_path_buf(), path.with_extension("ele"))),
        Some("ele") => Ok((path.with_extension("node"), path.to_path_buf())),
        _ => Err(malformed(
            &path.display().to_string(),
            "expected a `.node` or `.ele` file",
        )),
    }
}

/// Build a mesh from parsed rows.
///
/// `media` optionally names the distinct medium tags in ascending order;
/// without it tag `t` becomes `medium_t`.
pub fn build_mesh(
    nodes: Vec<MeshNode>,
    rows: &[EleRow],
    media: Option<&[String]>,
) -> Result<TetgenMesh> {
    let tags = rows.iter().map(|r| r.medium_tag).sorted().dedup().collect_vec();
    let names = match media {
        Some(names) if names.len() != tags.len() => {
            return Err(GeometryError::invalid(
                "media",
                format!("{} names given for {} medium tags", names.len(), tags.len()),
            ));
        }
        Some(names) => names.to_vec(),
        None => tags.iter().map(|t| format!("medium_{t}")).collect(),
    };

    let elements = rows
        .iter()
        .map(|r| {
            let [a, b, c, d] = r.nodes;
            let medium = tags.binary_search(&r.medium_tag).unwrap_or_default() as i32;
            Ok(MeshElement::new(r.tag, Tetrahedron::new(a, b, c, d)?).with_medium(medium))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TetgenMesh {
        mesh: TetrahedralMesh::new(nodes, elements)?,
        media: names,
    })
}

/// Read a TetGen mesh given the path of its `.node` or `.ele` file.
pub fn read_tetgen(path: impl AsRef<Path>, media: Option<&[String]>) -> Result<TetgenMesh> {
    let (node_path, ele_path) = tetgen_paths(path.as_ref())?;
    let read = |p: &Path| {
        std::fs::read_to_string(p)
            .map_err(|_| malformed(&p.display().to_string(), "does not exist or is not readable"))
    };
    let nodes = parse_node_file(&read(&node_path)?, &node_path.display().to_string())?;
    let rows = parse_ele_file(&read(&ele_path)?, &ele_path.display().to_string())?;
    log::debug!(
        "read {} nodes and {} elements from {}",
        nodes.len(),
        rows.len(),
        ele_path.display()
    );
    build_mesh(nodes, &rows, media)
}
