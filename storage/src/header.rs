//! Decode the fixed-size header shared by shapefile main (`.shp`) and index (`.shx`) files.
//!
//! # Format
//!
//! ```text
//! +-----------+--------------+-------------+---------+------------+-------------------+-------------------+
//! | file code | unused (x5)  | file length | version | shape type | Xmin Ymin Xmax Ymax | Zmin Zmax Mmin Mmax |
//! +-----------+--------------+-------------+---------+------------+-------------------+-------------------+
//! |  i32 (BE) |   i32 (BE)   |  i32 (BE)   | i32 (LE)|  i32 (LE)  |     f64 (LE)      |     f64 (LE)      |
//! +-----------+--------------+-------------+---------+------------+-------------------+-------------------+
//!     0-3         4-23          24-27        28-31      32-35          36-67               68-99
//! ```
//!
//! The file length is expressed in 16-bit words and covers the whole file, header included.
//!
//! Decoding never fails: any 100 bytes produce a [Header]. Values that do not match the format
//! (file code, version, shape type, impossible lengths) are reported to a [Warnings] sink instead.

use bytes::Buf;
use tracing::warn;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 100;

/// Expected value of the file code field.
pub const FILE_CODE: i32 = 9994;

/// Expected value of the version field.
pub const VERSION: i32 = 1000;

/// Receives non-fatal anomalies found while decoding a file.
pub trait Warnings {
    /// Report a single anomaly.
    fn warn(&mut self, message: &str);
}

/// A [Warnings] sink that emits each anomaly as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Warnings for Log {
    fn warn(&mut self, message: &str) {
        warn!(anomaly = message, "shapefile format anomaly");
    }
}

impl Warnings for Vec<String> {
    fn warn(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

impl<W: Warnings + ?Sized> Warnings for &mut W {
    fn warn(&mut self, message: &str) {
        (**self).warn(message);
    }
}

/// Geometry type of every record in a shapefile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    Polyline,
    Polygon,
    MultiPoint,
    PointZ,
    PolylineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolylineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
    /// A code the format does not define.
    Undefined(i32),
}

impl ShapeType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Null,
            1 => Self::Point,
            3 => Self::Polyline,
            5 => Self::Polygon,
            8 => Self::MultiPoint,
            11 => Self::PointZ,
            13 => Self::PolylineZ,
            15 => Self::PolygonZ,
            18 => Self::MultiPointZ,
            21 => Self::PointM,
            23 => Self::PolylineM,
            25 => Self::PolygonM,
            28 => Self::MultiPointM,
            31 => Self::MultiPatch,
            other => Self::Undefined(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Null => 0,
            Self::Point => 1,
            Self::Polyline => 3,
            Self::Polygon => 5,
            Self::MultiPoint => 8,
            Self::PointZ => 11,
            Self::PolylineZ => 13,
            Self::PolygonZ => 15,
            Self::MultiPointZ => 18,
            Self::PointM => 21,
            Self::PolylineM => 23,
            Self::PolygonM => 25,
            Self::MultiPointM => 28,
            Self::MultiPatch => 31,
            Self::Undefined(code) => *code,
        }
    }

    /// Whether records of this type carry Z values.
    pub fn has_z(&self) -> bool {
        matches!(
            self,
            Self::PointZ | Self::PolylineZ | Self::PolygonZ | Self::MultiPointZ | Self::MultiPatch
        )
    }

    /// Whether records of this type carry M (measure) values.
    pub fn has_m(&self) -> bool {
        self.has_z()
            || matches!(
                self,
                Self::PointM | Self::PolylineM | Self::PolygonM | Self::MultiPointM
            )
    }
}

/// Extent of all records, as declared by the header.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub min_m: f64,
    pub max_m: f64,
}

/// Decoded file header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
    pub file_code: i32,
    file_length: i32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub bounds: BoundingBox,
}

impl Header {
    /// Decode a header, reporting anomalies to `warnings`.
    pub fn decode<W: Warnings + ?Sized>(raw: &[u8; HEADER_SIZE], warnings: &mut W) -> Self {
        let mut buf = &raw[..];

        let file_code = buf.get_i32();
        if file_code != FILE_CODE {
            warnings.warn(&format!(
                "wrong file code, expected {FILE_CODE}, got {file_code}"
            ));
        }
        buf.advance(5 * 4);

        let file_length = buf.get_i32();
        if i64::from(file_length) * 2 < HEADER_SIZE as i64 {
            warnings.warn(&format!(
                "file length of {file_length} words is shorter than the header"
            ));
        }

        let version = buf.get_i32_le();
        if version != VERSION {
            warnings.warn(&format!("wrong version, expected {VERSION}, got {version}"));
        }

        let shape_type = ShapeType::from_code(buf.get_i32_le());
        if let ShapeType::Undefined(code) = shape_type {
            warnings.warn(&format!("unknown shape type {code}"));
        }

        let bounds = BoundingBox {
            min_x: buf.get_f64_le(),
            min_y: buf.get_f64_le(),
            max_x: buf.get_f64_le(),
            max_y: buf.get_f64_le(),
            min_z: buf.get_f64_le(),
            max_z: buf.get_f64_le(),
            min_m: buf.get_f64_le(),
            max_m: buf.get_f64_le(),
        };

        Self {
            file_code,
            file_length,
            version,
            shape_type,
            bounds,
        }
    }

    /// Declared length of the whole file in 16-bit words.
    pub fn file_length(&self) -> i32 {
        self.file_length
    }

    /// Declared length of the whole file in bytes.
    pub fn file_length_in_bytes(&self) -> i64 {
        i64::from(self.file_length) * 2
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::BufMut;
    use test_case::test_case;

    /// Encode a header the way a shapefile writer lays it out.
    pub(crate) fn encode(
        file_code: i32,
        file_length: i32,
        version: i32,
        shape_type: i32,
        bounds: BoundingBox,
    ) -> [u8; HEADER_SIZE] {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.put_i32(file_code);
        buf.put_bytes(0, 5 * 4);
        buf.put_i32(file_length);
        buf.put_i32_le(version);
        buf.put_i32_le(shape_type);
        for value in [
            bounds.min_x,
            bounds.min_y,
            bounds.max_x,
            bounds.max_y,
            bounds.min_z,
            bounds.max_z,
            bounds.min_m,
            bounds.max_m,
        ] {
            buf.put_f64_le(value);
        }
        buf.try_into().unwrap()
    }

    /// Encode a well-formed polygon header declaring `file_length` words.
    pub(crate) fn valid(file_length: i32) -> [u8; HEADER_SIZE] {
        encode(FILE_CODE, file_length, VERSION, 5, BoundingBox::default())
    }

    #[test]
    fn test_decode_valid() {
        let bounds = BoundingBox {
            min_x: -180.0,
            min_y: -90.0,
            max_x: 180.0,
            max_y: 90.0,
            min_z: 0.0,
            max_z: 8848.86,
            min_m: 0.0,
            max_m: 0.0,
        };
        let raw = encode(FILE_CODE, 58, VERSION, 15, bounds);

        let mut warnings: Vec<String> = Vec::new();
        let header = Header::decode(&raw, &mut warnings);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(header.file_code, FILE_CODE);
        assert_eq!(header.file_length(), 58);
        assert_eq!(header.file_length_in_bytes(), 116);
        assert_eq!(header.version, VERSION);
        assert_eq!(header.shape_type, ShapeType::PolygonZ);
        assert_eq!(header.bounds, bounds);
    }

    #[test]
    fn test_file_length_is_big_endian() {
        // 0x0102 words, little-endian decoding would yield 0x02010000
        let raw = valid(0x0102);
        let header = Header::decode(&raw, &mut Vec::<String>::new());
        assert_eq!(header.file_length(), 0x0102);
        assert_eq!(&raw[24..28], &[0, 0, 1, 2]);
    }

    #[test]
    fn test_decode_reports_anomalies() {
        let raw = encode(1234, 10, 999, 2, BoundingBox::default());

        let mut warnings: Vec<String> = Vec::new();
        let header = Header::decode(&raw, &mut warnings);
        assert_eq!(
            warnings,
            vec![
                "wrong file code, expected 9994, got 1234".to_string(),
                "file length of 10 words is shorter than the header".to_string(),
                "wrong version, expected 1000, got 999".to_string(),
                "unknown shape type 2".to_string(),
            ]
        );

        // Values are kept as found
        assert_eq!(header.file_code, 1234);
        assert_eq!(header.file_length(), 10);
        assert_eq!(header.version, 999);
        assert_eq!(header.shape_type, ShapeType::Undefined(2));
    }

    #[test]
    fn test_negative_length_does_not_overflow() {
        let raw = valid(i32::MIN);
        let mut warnings: Vec<String> = Vec::new();
        let header = Header::decode(&raw, &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(header.file_length_in_bytes(), i64::from(i32::MIN) * 2);
    }

    #[test]
    fn test_log_sink() {
        let raw = encode(0, 50, VERSION, 1, BoundingBox::default());
        let header = Header::decode(&raw, &mut Log);
        assert_eq!(header.file_code, 0);
    }

    #[test]
    fn test_dyn_sink() {
        let raw = encode(0, 50, VERSION, 1, BoundingBox::default());
        let mut collected: Vec<String> = Vec::new();
        let sink: &mut dyn Warnings = &mut collected;
        Header::decode(&raw, sink);
        assert_eq!(collected.len(), 1);
    }

    #[test_case(0, ShapeType::Null, false, false; "null")]
    #[test_case(1, ShapeType::Point, false, false; "point")]
    #[test_case(3, ShapeType::Polyline, false, false; "polyline")]
    #[test_case(5, ShapeType::Polygon, false, false; "polygon")]
    #[test_case(8, ShapeType::MultiPoint, false, false; "multipoint")]
    #[test_case(11, ShapeType::PointZ, true, true; "point z")]
    #[test_case(13, ShapeType::PolylineZ, true, true; "polyline z")]
    #[test_case(15, ShapeType::PolygonZ, true, true; "polygon z")]
    #[test_case(18, ShapeType::MultiPointZ, true, true; "multipoint z")]
    #[test_case(21, ShapeType::PointM, false, true; "point m")]
    #[test_case(23, ShapeType::PolylineM, false, true; "polyline m")]
    #[test_case(25, ShapeType::PolygonM, false, true; "polygon m")]
    #[test_case(28, ShapeType::MultiPointM, false, true; "multipoint m")]
    #[test_case(31, ShapeType::MultiPatch, true, true; "multipatch")]
    #[test_case(7, ShapeType::Undefined(7), false, false; "undefined")]
    fn test_shape_type(code: i32, expected: ShapeType, z: bool, m: bool) {
        let shape_type = ShapeType::from_code(code);
        assert_eq!(shape_type, expected);
        assert_eq!(shape_type.code(), code);
        assert_eq!(shape_type.has_z(), z);
        assert_eq!(shape_type.has_m(), m);
    }
}
