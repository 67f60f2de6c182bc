#![warn(missing_docs)]

//! ASCII PLY mesh loading for the kdray ray tracer.
//!
//! Parses the subset of the PLY format the bundled test models use:
//! `format ascii 1.0`, a `vertex` element with leading `x`/`y`/`z` float
//! properties, and a `face` element whose first property is a vertex
//! index list. Faces with more than three vertices are fan-triangulated.
//!
//! Geometry problems (too few vertices, out-of-range indices, malformed
//! numbers) surface here as [`PlyError`]s — the KD-tree core downstream
//! assumes clean triangles.

use std::fs;
use std::path::Path;

use kdray_math::{Point3, Rgb};
use kdray_tree::{Aabb, Triangle};
use thiserror::Error;

/// Errors that can occur while loading a PLY mesh.
#[derive(Error, Debug)]
pub enum PlyError {
    /// The file could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not an ASCII PLY file.
    #[error("not an ascii ply file: {0}")]
    BadHeader(String),

    /// A numeric field failed to parse.
    #[error("line {line}: malformed number `{token}`")]
    BadNumber {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// The file ended before all declared elements were read.
    #[error("unexpected end of file: expected {expected} more {element} lines")]
    Truncated {
        /// Element being read when input ran out.
        element: &'static str,
        /// How many lines were still expected.
        expected: usize,
    },

    /// A face referenced a vertex that does not exist.
    #[error("line {line}: vertex index {index} out of range ({count} vertices)")]
    IndexOutOfRange {
        /// 1-based line number.
        line: usize,
        /// The offending index.
        index: usize,
        /// Number of vertices declared.
        count: usize,
    },

    /// A face had fewer than three vertices.
    #[error("line {line}: face needs at least 3 vertices")]
    DegenerateFace {
        /// 1-based line number.
        line: usize,
    },
}

/// Result type for PLY loading.
pub type Result<T> = std::result::Result<T, PlyError>;

/// A loaded triangle mesh with its bounding box.
#[derive(Debug, Clone)]
pub struct TriMesh {
    /// The mesh triangles.
    pub tris: Vec<Triangle>,
    /// Tightest AABB enclosing the mesh.
    pub bounds: Aabb,
}

impl TriMesh {
    /// Build a mesh from triangles, computing its bounds.
    pub fn new(tris: Vec<Triangle>) -> Self {
        let bounds = Aabb::from_triangles(&tris);
        Self { tris, bounds }
    }

    /// Apply a base color to every triangle.
    pub fn set_color(&mut self, color: Rgb) {
        for tri in &mut self.tris {
            tri.set_color(color);
        }
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.tris.len()
    }

    /// Whether the mesh is empty.
    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }
}

/// Load a mesh from a PLY file on disk.
pub fn load(path: impl AsRef<Path>) -> Result<TriMesh> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| PlyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}

/// Parse a mesh from PLY text.
pub fn parse(text: &str) -> Result<TriMesh> {
    let mut lines = text.lines().enumerate();

    let (_, magic) = lines
        .next()
        .ok_or_else(|| PlyError::BadHeader("empty file".into()))?;
    if magic.trim() != "ply" {
        return Err(PlyError::BadHeader(format!(
            "missing `ply` magic, found `{}`",
            magic.trim()
        )));
    }

    // Header: collect element counts in declaration order.
    let mut num_vertices = 0usize;
    let mut num_faces = 0usize;
    for (lineno, raw) in lines.by_ref() {
        let line = raw.trim();
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                if tokens.next() != Some("ascii") {
                    return Err(PlyError::BadHeader(format!("unsupported format: {line}")));
                }
            }
            Some("element") => {
                let name = tokens.next().unwrap_or("");
                let count = parse_number::<usize>(tokens.next().unwrap_or(""), lineno)?;
                match name {
                    "vertex" => num_vertices = count,
                    "face" => num_faces = count,
                    // Other elements (edges, materials) are ignored.
                    _ => {}
                }
            }
            Some("end_header") => break,
            // comment, property, obj_info: skipped. Vertex properties are
            // assumed to start with x y z, which every bundled model does.
            _ => {}
        }
    }

    // Body: vertices, then faces.
    let mut vertices = Vec::with_capacity(num_vertices);
    for _ in 0..num_vertices {
        let Some((lineno, raw)) = lines.next() else {
            return Err(PlyError::Truncated {
                element: "vertex",
                expected: num_vertices - vertices.len(),
            });
        };
        let mut tokens = raw.split_whitespace();
        let mut coords = [0.0f64; 3];
        for c in coords.iter_mut() {
            *c = parse_number(tokens.next().unwrap_or(""), lineno)?;
        }
        vertices.push(Point3::new(coords[0], coords[1], coords[2]));
    }

    let mut tris = Vec::with_capacity(num_faces);
    for read in 0..num_faces {
        let Some((lineno, raw)) = lines.next() else {
            return Err(PlyError::Truncated {
                element: "face",
                expected: num_faces - read,
            });
        };
        let mut tokens = raw.split_whitespace();
        let count: usize = parse_number(tokens.next().unwrap_or(""), lineno)?;
        if count < 3 {
            return Err(PlyError::DegenerateFace { line: lineno + 1 });
        }
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            let index: usize = parse_number(tokens.next().unwrap_or(""), lineno)?;
            if index >= vertices.len() {
                return Err(PlyError::IndexOutOfRange {
                    line: lineno + 1,
                    index,
                    count: vertices.len(),
                });
            }
            indices.push(index);
        }
        // Fan triangulation around the first vertex.
        for i in 1..count - 1 {
            tris.push(Triangle::new([
                vertices[indices[0]],
                vertices[indices[i]],
                vertices[indices[i + 1]],
            ]));
        }
    }

    Ok(TriMesh::new(tris))
}

fn parse_number<T: std::str::FromStr>(token: &str, lineno: usize) -> Result<T> {
    token.parse().map_err(|_| PlyError::BadNumber {
        line: lineno + 1,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_FACE: &str = "\
ply
format ascii 1.0
comment a single quad
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";

    #[test]
    fn test_parse_quad_fan_triangulates() {
        let mesh = parse(CUBE_FACE).unwrap();
        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh.bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_parse_triangle() {
        let text = "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.len(), 1);
    }

    #[test]
    fn test_set_color() {
        let mut mesh = parse(CUBE_FACE).unwrap();
        mesh.set_color(Rgb::new(200.0, 10.0, 10.0));
        assert_eq!(mesh.tris[0].color, Rgb::new(200.0, 10.0, 10.0));
        assert_eq!(mesh.tris[0].ka, Rgb::new(20.0, 1.0, 1.0));
    }

    #[test]
    fn test_rejects_binary_format() {
        let text = "ply\nformat binary_little_endian 1.0\nend_header\n";
        assert!(matches!(parse(text), Err(PlyError::BadHeader(_))));
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(matches!(parse("obj\n"), Err(PlyError::BadHeader(_))));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let text = "\
ply
format ascii 1.0
element vertex 3
element face 1
end_header
0 0 0
1 0 0
0 1 0
3 0 1 9
";
        assert!(matches!(
            parse(text),
            Err(PlyError::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let text = "\
ply
format ascii 1.0
element vertex 3
end_header
0 0 0
";
        assert!(matches!(parse(text), Err(PlyError::Truncated { .. })));
    }

    #[test]
    fn test_rejects_malformed_number() {
        let text = "\
ply
format ascii 1.0
element vertex 1
end_header
0 zero 0
";
        assert!(matches!(parse(text), Err(PlyError::BadNumber { .. })));
    }
}
