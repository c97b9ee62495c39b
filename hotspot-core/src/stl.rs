/// STL parser for binary and ASCII files, including multi-solid ASCII
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending, space0},
    combinator::all_consuming,
    multi::{count, many0, many1},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use nalgebra::{Point3, Vector3};

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// A named solid; ASCII files may hold several, binary files hold one
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub name: String,
    pub mesh: Mesh,
}

/// Detect and parse an STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Vec<Solid>> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(solids) = parse_ascii_stl(text) {
                return Ok(solids);
            }
        }
    }

    parse_binary_stl(data).map(|solid| vec![solid])
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Solid> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ViewerError::parse("file too small to be a valid STL"));
    }
    let triangle_count = u32::from_le_bytes([
        data[HEADER_LEN],
        data[HEADER_LEN + 1],
        data[HEADER_LEN + 2],
        data[HEADER_LEN + 3],
    ]) as usize;
    let expected = triangle_count
        .checked_mul(FACET_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN + 4))
        .ok_or_else(|| ViewerError::parse("triangle count overflows"))?;
    if data.len() < expected {
        return Err(ViewerError::parse(format!(
            "unexpected end of file: {} triangles need {} bytes, got {}",
            triangle_count,
            expected,
            data.len()
        )));
    }

    let (_, (header, triangles)) = binary_body(data, triangle_count)
        .map_err(|e| ViewerError::parse(format!("failed to parse binary STL: {:?}", e)))?;

    Ok(Solid {
        name: header_name(header),
        mesh: Mesh {
            triangles,
        },
    })
}

fn binary_body(input: &[u8], triangle_count: usize) -> IResult<&[u8], (&[u8], Vec<Triangle>)> {
    let (input, header) = take(HEADER_LEN)(input)?;
    let (input, _) = le_u32(input)?;
    let (input, triangles) = count(binary_facet, triangle_count)(input)?;
    Ok((input, (header, triangles)))
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = binary_vector(input)?;
    let (input, corners) = count(binary_vector, 3)(input)?;
    // Attribute byte count
    let (input, _) = le_u16(input)?;
    Ok((input, facet_triangle((nx, ny, nz), &corners)))
}

/// Header text after a leading "solid", up to the first NUL
fn header_name(header: &[u8]) -> String {
    let text = header.split(|&b| b == 0).next().unwrap_or_default();
    String::from_utf8_lossy(text)
        .strip_prefix("solid")
        .map(|rest| rest.trim().to_string())
        .unwrap_or_default()
}

/// Parse an ASCII STL file made of one or more `solid` blocks
pub fn parse_ascii_stl(input: &str) -> Result<Vec<Solid>> {
    match all_consuming(terminated(many1(ascii_solid), multispace0))(input) {
        Ok((_, solids)) => Ok(solids),
        Err(e) => Err(ViewerError::parse(format!(
            "failed to parse ASCII STL: {:?}",
            e
        ))),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Solid> {
    let (input, name) = preceded(
        preceded(multispace0, tag("solid")),
        preceded(space0, not_line_ending),
    )(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(
        preceded(multispace0, tag("endsolid")),
        not_line_ending,
    )(input)?;

    Ok((
        input,
        Solid {
            name: name.trim().to_string(),
            mesh: Mesh { triangles },
        },
    ))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, corners) = count(
        preceded(preceded(multispace0, tag("vertex")), parse_vector3),
        3,
    )(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, facet_triangle(normal, &corners)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    tuple((
        delimited(multispace0, float, multispace1),
        terminated(float, multispace1),
        float,
    ))(input)
}

/// Build a triangle, falling back to the winding normal when the stored one is zero
fn facet_triangle(normal: (f32, f32, f32), corners: &[(f32, f32, f32)]) -> Triangle {
    let points: Vec<Point3<f32>> = corners
        .iter()
        .map(|&(x, y, z)| Point3::new(x, y, z))
        .collect();
    let stored = Vector3::new(normal.0, normal.1, normal.2);
    if stored.norm_squared() < f32::EPSILON {
        return Triangle::from_points(points[0], points[1], points[2]);
    }
    Triangle::new(
        Vertex::new(points[0], stored),
        Vertex::new(points[1], stored),
        Vertex::new(points[2], stored),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SOLIDS: &str = "solid Twitter
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid Twitter
solid
  facet normal 0 0 0
    outer loop
      vertex 0 0 1
      vertex 1 0 1
      vertex 0 1 1
    endloop
  endfacet
endsolid
";

    fn binary_stl(header: &[u8], triangles: u32) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[..header.len()].copy_from_slice(header);
        data.extend_from_slice(&triangles.to_le_bytes());
        for _ in 0..triangles {
            for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let solid = parse_binary_stl(&binary_stl(b"", 0)).unwrap();
        assert!(solid.mesh.is_empty());
        assert_eq!(solid.name, "");
    }

    #[test]
    fn test_parse_binary_named() {
        let solids = parse_stl(&binary_stl(b"solid GitHub", 2)).unwrap();
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].name, "GitHub");
        assert_eq!(solids[0].mesh.triangles.len(), 2);
        assert_eq!(solids[0].mesh.triangles[0].vertices[1].position, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_binary_truncated() {
        let mut data = binary_stl(b"", 2);
        data.truncate(data.len() - 10);
        assert!(parse_binary_stl(&data).is_err());
        assert!(parse_binary_stl(&[0u8; 20]).is_err());
    }

    #[test]
    fn test_parse_ascii_multi_solid() {
        let solids = parse_stl(TWO_SOLIDS.as_bytes()).unwrap();
        assert_eq!(solids.len(), 2);
        assert_eq!(solids[0].name, "Twitter");
        assert_eq!(solids[1].name, "");
        // Zero normal falls back to the winding normal
        let normal = solids[1].mesh.triangles[0].vertices[0].normal;
        assert!((normal - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_parse_ascii_rejects_garbage() {
        assert!(parse_ascii_stl("solid x\n facet nonsense\nendsolid").is_err());
    }
}
