//! STL surface mesh files, ASCII and little-endian binary.
//!
//! Coordinates are stored as `f32` in both encodings and are read as `f32`
//! before widening, so an ASCII file and its binary conversion give the same
//! vertices bit for bit.

use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, Result};

/// Size of the binary header comment.
const BINARY_HEADER_LEN: usize = 80;
/// Normal, three vertices and the attribute field.
const BINARY_TRIANGLE_LEN: usize = 50;

/// One facet with the outward normal given by the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Point3<f64>,
    pub b: Point3<f64>,
    pub c: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Triangle {
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { a, b, c, normal }
    }
}

/// Triangles read from a mesh file, before a geometry is built from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMeshSpec {
    pub triangles: Vec<Triangle>,
}

impl TriangleMeshSpec {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Multiply every vertex coordinate by `factor`; normals are unchanged.
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if factor <= 0.0 {
            return Err(GeometryError::NonPositiveScale(factor));
        }
        for tri in &mut self.triangles {
            tri.a = Point3::from(tri.a.coords * factor);
            tri.b = Point3::from(tri.b.coords * factor);
            tri.c = Point3::from(tri.c.coords * factor);
        }
        Ok(())
    }
}

/// Read an STL file, choosing the encoding from the first five bytes.
pub fn read_stl(path: impl AsRef<Path>) -> Result<TriangleMeshSpec> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|_| GeometryError::UnreadableFile(file.clone()))?;
    if bytes.len() < 5 {
        return Err(GeometryError::MalformedStl(file));
    }
    let spec = if bytes.starts_with(b"solid") {
        parse_ascii(&String::from_utf8_lossy(&bytes), &file)?
    } else {
        parse_binary(&bytes, &file)?
    };
    log::debug!("read {} triangles from {}", spec.len(), file);
    Ok(spec)
}

fn parse_f32s<'a>(
    words: impl Iterator<Item = &'a str>,
    file: &str,
) -> Result<Vector3<f64>> {
    let values = words
        .take(3)
        .map(|w| w.parse::<f32>().map(f64::from))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| GeometryError::MalformedStl(file.to_string()))?;
    match values[..] {
        [x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(GeometryError::MalformedStl(file.to_string())),
    }
}

/// Parse the text of an ASCII STL file; the first line is the `solid` header.
pub fn parse_ascii(text: &str, file: &str) -> Result<TriangleMeshSpec> {
    let malformed = || GeometryError::MalformedStl(file.to_string());
    let mut lines = text.lines().skip(1).map(str::trim);

    let mut triangles = Vec::new();
    while let Some(line) = lines.next() {
        if line.starts_with("endsolid") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();
        if words.next() != Some("facet") || words.next() != Some("normal") {
            return Err(malformed());
        }
        let normal = parse_f32s(words, file)?;

        if lines.next() != Some("outer loop") {
            return Err(malformed());
        }
        let mut vertex = || -> Result<Point3<f64>> {
            let line = lines.next().ok_or_else(malformed)?;
            let mut words = line.split_whitespace();
            if words.next() != Some("vertex") {
                return Err(malformed());
            }
            Ok(Point3::from(parse_f32s(words, file)?))
        };
        let a = vertex()?;
        let b = vertex()?;
        let c = vertex()?;
        if lines.next() != Some("endloop") || lines.next() != Some("endfacet") {
            return Err(malformed());
        }
        triangles.push(Triangle::new(a, b, c, normal));
    }
    Ok(TriangleMeshSpec::new(triangles))
}

fn read_vector(chunk: &[u8]) -> Vector3<f64> {
    let f = |i: usize| {
        let mut word = [0u8; 4];
        word.copy_from_slice(&chunk[4 * i..4 * i + 4]);
        f64::from(f32::from_le_bytes(word))
    };
    Vector3::new(f(0), f(1), f(2))
}

/// Parse the bytes of a binary STL file, header included.
pub fn parse_binary(bytes: &[u8], file: &str) -> Result<TriangleMeshSpec> {
    let malformed = || GeometryError::MalformedStl(file.to_string());
    let count_bytes = bytes
        .get(BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4)
        .ok_or_else(malformed)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(count_bytes);
    let count = u32::from_le_bytes(word) as usize;
    if count == 0 {
        return Err(GeometryError::EmptyStl(file.to_string()));
    }

    let body = &bytes[BINARY_HEADER_LEN + 4..];
    if body.len() < count * BINARY_TRIANGLE_LEN {
        return Err(malformed());
    }
    let triangles = body
        .chunks_exact(BINARY_TRIANGLE_LEN)
        .take(count)
        .map(|chunk| {
            Triangle::new(
                Point3::from(read_vector(&chunk[12..24])),
                Point3::from(read_vector(&chunk[24..36])),
                Point3::from(read_vector(&chunk[36..48])),
                read_vector(&chunk[0..12]),
            )
        })
        .collect();
    Ok(TriangleMeshSpec::new(triangles))
}
