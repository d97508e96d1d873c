//! A minimal binary-little-endian PLY reader (supplement: spec.md treats the
//! vertex stream as out of scope and depends only on [`VertexSource`], but a
//! complete repo needs at least one concrete source -- grounded on
//! `examples/original_source/parse_ply2.cpp`'s `load_ply`, which reads the
//! same `x/y/z/rot_*/scale_*/opacity/f_dc_*/f_rest_*` vertex properties via
//! `happly`). Only `float`/`float32` scalar properties are supported, which
//! covers every property this format's loader reads.

use std::collections::HashMap;
use std::io::Read;

use crate::error::LoadError;
use crate::vertex_source::VertexSource;

/// A PLY `vertex` element read fully into memory, one `Vec<f32>` per
/// property column.
pub struct PlyVertexSource {
    count: usize,
    columns: HashMap<String, Vec<f32>>,
}

struct PropertyDef {
    name: String,
    is_float: bool,
}

impl PlyVertexSource {
    /// Reads the `vertex` element of the PLY file at `path`.
    ///
    /// # Errors
    /// Returns [`LoadError::Io`] on any read failure, and
    /// [`LoadError::InvalidHeader`] if the file is not a binary-little-endian
    /// PLY with a `vertex` element, or uses a property type other than
    /// `float`/`float32`.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a PLY file already loaded into memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let header_end = find_header_end(bytes)
            .ok_or_else(|| LoadError::InvalidHeader("missing \"end_header\" line".to_string()))?;
        let header_text = std::str::from_utf8(&bytes[..header_end])
            .map_err(|_| LoadError::InvalidHeader("header is not valid UTF-8".to_string()))?;

        let (count, properties) = parse_header(header_text)?;

        let body = &bytes[header_end..];
        let columns = read_body(body, count, &properties)?;

        Ok(Self { count, columns })
    }
}

impl VertexSource for PlyVertexSource {
    fn count(&self) -> usize {
        self.count
    }

    fn property_f32(&self, name: &str) -> Option<&[f32]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// Returns the byte offset just past the `end_header\n` line, i.e. the start
/// of the binary vertex body.
fn find_header_end(bytes: &[u8]) -> Option<usize> {
    const MARKER: &[u8] = b"end_header\n";
    bytes
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .map(|pos| pos + MARKER.len())
}

fn parse_header(header: &str) -> Result<(usize, Vec<PropertyDef>), LoadError> {
    let mut lines = header.lines();
    let magic = lines.next().unwrap_or_default().trim();
    if magic != "ply" {
        return Err(LoadError::InvalidHeader(format!("expected \"ply\" magic, got {magic:?}")));
    }

    let mut format_is_binary_le = false;
    let mut vertex_count = None;
    let mut properties = Vec::new();
    let mut in_vertex_element = false;

    for line in lines {
        let line = line.trim();
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("format") => {
                format_is_binary_le = fields.next() == Some("binary_little_endian");
            }
            Some("element") => {
                let name = fields.next().unwrap_or_default();
                in_vertex_element = name == "vertex";
                if in_vertex_element {
                    let count: usize = fields
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| LoadError::InvalidHeader("malformed vertex element count".to_string()))?;
                    vertex_count = Some(count);
                }
            }
            Some("property") if in_vertex_element => {
                let ty = fields.next().unwrap_or_default();
                let name = fields.next().unwrap_or_default().to_string();
                let is_float = matches!(ty, "float" | "float32");
                if !is_float {
                    return Err(LoadError::InvalidHeader(format!(
                        "unsupported vertex property type {ty:?} for {name:?} (only float is supported)"
                    )));
                }
                properties.push(PropertyDef { name, is_float });
            }
            _ => {}
        }
    }

    if !format_is_binary_le {
        return Err(LoadError::InvalidHeader(
            "only \"binary_little_endian\" PLY files are supported".to_string(),
        ));
    }
    let count = vertex_count
        .ok_or_else(|| LoadError::InvalidHeader("missing \"vertex\" element".to_string()))?;

    Ok((count, properties))
}

fn read_body(
    mut body: &[u8],
    count: usize,
    properties: &[PropertyDef],
) -> Result<HashMap<String, Vec<f32>>, LoadError> {
    let mut columns: HashMap<String, Vec<f32>> =
        properties.iter().map(|p| (p.name.clone(), Vec::with_capacity(count))).collect();

    let mut buf = [0u8; 4];
    for _ in 0..count {
        for property in properties {
            debug_assert!(property.is_float, "non-float properties are rejected during header parsing");
            body.read_exact(&mut buf)?;
            let value = f32::from_le_bytes(buf);
            columns.get_mut(&property.name).expect("column allocated above").push(value);
        }
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_header(count: usize, names: &[&str]) -> Vec<u8> {
        let mut header = String::from("ply\nformat binary_little_endian 1.0\n");
        header.push_str(&format!("element vertex {count}\n"));
        for name in names {
            header.push_str(&format!("property float {name}\n"));
        }
        header.push_str("end_header\n");
        header.into_bytes()
    }

    #[test]
    fn reads_a_minimal_vertex_element() {
        let mut bytes = write_header(2, &["x", "y", "z"]);
        for row in [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]] {
            for v in row {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }

        let source = PlyVertexSource::from_bytes(&bytes).expect("valid ply");
        assert_eq!(source.count(), 2);
        assert_eq!(source.property_f32("x"), Some([1.0, 4.0].as_slice()));
        assert_eq!(source.property_f32("y"), Some([2.0, 5.0].as_slice()));
        assert_eq!(source.property_f32("z"), Some([3.0, 6.0].as_slice()));
        assert_eq!(source.property_f32("missing"), None);
    }

    #[test]
    fn rejects_ascii_format() {
        let bytes = b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n".to_vec();
        let err = PlyVertexSource::from_bytes(&bytes).expect_err("ascii should be rejected");
        assert!(matches!(err, LoadError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_non_float_properties() {
        let bytes =
            b"ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty uchar red\nend_header\n".to_vec();
        let err = PlyVertexSource::from_bytes(&bytes).expect_err("non-float property should be rejected");
        assert!(matches!(err, LoadError::InvalidHeader(_)));
    }

    #[test]
    fn rejects_missing_end_header() {
        let bytes = b"ply\nformat binary_little_endian 1.0\n".to_vec();
        let err = PlyVertexSource::from_bytes(&bytes).expect_err("missing end_header should be rejected");
        assert!(matches!(err, LoadError::InvalidHeader(_)));
    }
}
