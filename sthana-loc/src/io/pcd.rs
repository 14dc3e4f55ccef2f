//! PCD (Point Cloud Data) file support.
//!
//! Reads PCD v0.7 files with `DATA ascii` or `DATA binary`. Only `x`, `y`,
//! `z` and the optional `intensity` field are kept; every other field is
//! skipped. `binary_compressed` files are rejected.
//!
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z intensity
//! SIZE 4 4 4 4
//! TYPE F F F F
//! COUNT 1 1 1 1
//! WIDTH 2
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS 2
//! DATA ascii
//! 1.0 2.0 3.0 10
//! 4.0 5.0 6.0 20
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::core::types::{Point, PointCloud};

/// Error type for PCD parsing.
#[derive(Error, Debug)]
pub enum PcdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PCD header: {0}")]
    Header(String),

    #[error("Unsupported PCD content: {0}")]
    Unsupported(String),

    #[error("Invalid PCD data: {0}")]
    Data(String),
}

pub type Result<T> = std::result::Result<T, PcdError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Ascii,
    Binary,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    size: usize,
    kind: u8,
    count: usize,
}

#[derive(Debug)]
struct Header {
    fields: Vec<Field>,
    points: usize,
    format: DataFormat,
}

impl Header {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Byte stride of one binary point.
    fn stride(&self) -> usize {
        self.fields.iter().map(|f| f.size * f.count).sum()
    }
}

/// Read a PCD file into a cloud labelled `frame_id`.
pub fn read_pcd<P: AsRef<Path>>(
    path: P,
    frame_id: &str,
    timestamp_us: u64,
) -> Result<PointCloud> {
    let bytes = fs::read(path.as_ref())?;
    let points = parse_pcd(&bytes)?;
    log::debug!(
        "Read {} points from {}",
        points.len(),
        path.as_ref().display()
    );
    Ok(PointCloud::from_points(points, frame_id, timestamp_us))
}

/// Parse PCD content.
pub fn parse_pcd(bytes: &[u8]) -> Result<Vec<Point>> {
    let (header, body) = parse_header(bytes)?;

    let xyz = ["x", "y", "z"]
        .map(|axis| header.index_of(axis))
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| PcdError::Unsupported("fields x, y and z are required".to_string()))?;
    let intensity = header.index_of("intensity");

    match header.format {
        DataFormat::Ascii => parse_ascii(&header, body, &xyz, intensity),
        DataFormat::Binary => parse_binary(&header, body, &xyz, intensity),
    }
}

/// Write `cloud` as an ASCII PCD with fields `x y z intensity`.
pub fn write_pcd_ascii<P: AsRef<Path>>(path: P, cloud: &PointCloud) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(w, "VERSION 0.7")?;
    writeln!(w, "FIELDS x y z intensity")?;
    writeln!(w, "SIZE 4 4 4 4")?;
    writeln!(w, "TYPE F F F F")?;
    writeln!(w, "COUNT 1 1 1 1")?;
    writeln!(w, "WIDTH {}", cloud.len())?;
    writeln!(w, "HEIGHT 1")?;
    writeln!(w, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(w, "POINTS {}", cloud.len())?;
    writeln!(w, "DATA ascii")?;
    for p in cloud.iter() {
        writeln!(w, "{} {} {} {}", p.x, p.y, p.z, p.intensity)?;
    }
    w.flush()?;
    Ok(())
}

fn parse_header(bytes: &[u8]) -> Result<(Header, &[u8])> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<u8> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width: Option<usize> = None;
    let mut height: usize = 1;
    let mut points: Option<usize> = None;

    let mut offset = 0;
    while offset < bytes.len() {
        let end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| offset + i);
        let line = std::str::from_utf8(&bytes[offset..end])
            .map_err(|_| PcdError::Header("header is not valid UTF-8".to_string()))?
            .trim();
        offset = (end + 1).min(bytes.len());

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default().to_ascii_uppercase();
        let values: Vec<&str> = tokens.collect();

        match key.as_str() {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => names = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => sizes = parse_list(&key, &values)?,
            "TYPE" => {
                kinds = values
                    .iter()
                    .map(|s| match s.as_bytes() {
                        [k @ (b'F' | b'I' | b'U')] => Ok(*k),
                        _ => Err(PcdError::Header(format!("unknown TYPE '{}'", s))),
                    })
                    .collect::<Result<_>>()?
            }
            "COUNT" => counts = parse_list(&key, &values)?,
            "WIDTH" => width = Some(parse_single(&key, &values)?),
            "HEIGHT" => height = parse_single(&key, &values)?,
            "POINTS" => points = Some(parse_single(&key, &values)?),
            "DATA" => {
                let format = match values.first().copied() {
                    Some("ascii") => DataFormat::Ascii,
                    Some("binary") => DataFormat::Binary,
                    Some(other) => {
                        return Err(PcdError::Unsupported(format!("DATA {}", other)));
                    }
                    None => return Err(PcdError::Header("DATA without format".to_string())),
                };

                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if names.is_empty() || sizes.len() != names.len() || kinds.len() != names.len()
                {
                    return Err(PcdError::Header(
                        "FIELDS, SIZE and TYPE lengths differ".to_string(),
                    ));
                }
                if counts.len() != names.len() {
                    return Err(PcdError::Header(
                        "COUNT length differs from FIELDS".to_string(),
                    ));
                }

                let points = match (points, width) {
                    (Some(p), _) => p,
                    (None, Some(w)) => w * height,
                    (None, None) => {
                        return Err(PcdError::Header("missing POINTS and WIDTH".to_string()));
                    }
                };

                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(kinds)
                    .zip(counts)
                    .map(|(((name, size), kind), count)| Field {
                        name,
                        size,
                        kind,
                        count,
                    })
                    .collect();

                return Ok((
                    Header {
                        fields,
                        points,
                        format,
                    },
                    &bytes[offset..],
                ));
            }
            other => log::debug!("Ignoring PCD header key {}", other),
        }
    }

    Err(PcdError::Header("missing DATA line".to_string()))
}

fn parse_list(key: &str, values: &[&str]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse()
                .map_err(|_| PcdError::Header(format!("{} value '{}' is not an integer", key, v)))
        })
        .collect()
}

fn parse_single(key: &str, values: &[&str]) -> Result<usize> {
    match values {
        [v] => v
            .parse()
            .map_err(|_| PcdError::Header(format!("{} value '{}' is not an integer", key, v))),
        _ => Err(PcdError::Header(format!("{} expects one value", key))),
    }
}

fn parse_ascii(
    header: &Header,
    body: &[u8],
    xyz: &[usize],
    intensity: Option<usize>,
) -> Result<Vec<Point>> {
    let text = std::str::from_utf8(body)
        .map_err(|_| PcdError::Data("ASCII body is not valid UTF-8".to_string()))?;

    // Token index of each field's first element
    let mut columns = Vec::with_capacity(header.fields.len());
    let mut col = 0;
    for field in &header.fields {
        columns.push(col);
        col += field.count;
    }

    let mut points = Vec::with_capacity(header.points);
    for (line_no, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        if points.len() == header.points {
            break;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < col {
            return Err(PcdError::Data(format!(
                "point {} has {} values, expected {}",
                line_no,
                tokens.len(),
                col
            )));
        }

        let value = |field: usize| -> Result<f32> {
            let token = tokens[columns[field]];
            token.parse::<f32>().map_err(|_| {
                PcdError::Data(format!("point {}: '{}' is not a number", line_no, token))
            })
        };

        points.push(Point::new(
            value(xyz[0])?,
            value(xyz[1])?,
            value(xyz[2])?,
            intensity.map(value).transpose()?.unwrap_or(0.0),
        ));
    }

    if points.len() != header.points {
        return Err(PcdError::Data(format!(
            "expected {} points, found {}",
            header.points,
            points.len()
        )));
    }
    Ok(points)
}

fn parse_binary(
    header: &Header,
    body: &[u8],
    xyz: &[usize],
    intensity: Option<usize>,
) -> Result<Vec<Point>> {
    let stride = header.stride();
    let needed = stride * header.points;
    if body.len() < needed {
        return Err(PcdError::Data(format!(
            "binary body has {} bytes, expected {}",
            body.len(),
            needed
        )));
    }

    let mut offsets = Vec::with_capacity(header.fields.len());
    let mut off = 0;
    for field in &header.fields {
        offsets.push(off);
        off += field.size * field.count;
    }

    let read = |chunk: &[u8], field: usize| -> Result<f32> {
        let f = &header.fields[field];
        let start = offsets[field];
        read_scalar(&chunk[start..start + f.size], f.kind)
            .map(|v| v as f32)
            .ok_or_else(|| {
                PcdError::Unsupported(format!("field {} of type {}{}", f.name, f.kind as char, f.size))
            })
    };

    body[..needed]
        .chunks_exact(stride.max(1))
        .map(|chunk| {
            Ok(Point::new(
                read(chunk, xyz[0])?,
                read(chunk, xyz[1])?,
                read(chunk, xyz[2])?,
                intensity.map(|i| read(chunk, i)).transpose()?.unwrap_or(0.0),
            ))
        })
        .collect()
}

/// Little-endian scalar of PCD type `kind` and byte width `bytes.len()`.
fn read_scalar(bytes: &[u8], kind: u8) -> Option<f64> {
    Some(match (kind, bytes.len()) {
        (b'F', 4) => f32::from_le_bytes(bytes.try_into().ok()?) as f64,
        (b'F', 8) => f64::from_le_bytes(bytes.try_into().ok()?),
        (b'U', 1) => bytes[0] as f64,
        (b'U', 2) => u16::from_le_bytes(bytes.try_into().ok()?) as f64,
        (b'U', 4) => u32::from_le_bytes(bytes.try_into().ok()?) as f64,
        (b'I', 1) => bytes[0] as i8 as f64,
        (b'I', 2) => i16::from_le_bytes(bytes.try_into().ok()?) as f64,
        (b'I', 4) => i32::from_le_bytes(bytes.try_into().ok()?) as f64,
        _ => return None,
    })
}
