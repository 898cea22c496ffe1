//! Typed decoding of VLR / EVLR payloads.
//!
//! Payloads are dispatched by (user id, record id). There is no fallback for
//! unknown records: they abort the parse with an
//! [UnsupportedRecordError::VariableRecord].

use crate::las::helpers::{array_at, f64_at, read_las_string, split_nul_strings, u16_at};
use crate::las::{FramingError, ReadLasError, UnsupportedRecordError};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROJECTION_USER_ID: &str = "LASF_Projection";
pub const SPEC_USER_ID: &str = "LASF_Spec";
pub const LIBLAS_USER_ID: &str = "liblas";

/// Size of one entry of the classification lookup table.
const CLASSIFICATION_ENTRY_SIZE: usize = 16;
const CLASSIFICATION_ENTRIES: usize = 256;

/// Size of one extra bytes descriptor.
pub const EXTRA_BYTES_DESCRIPTOR_SIZE: usize = 192;

/// Decoder selected for a (user id, record id) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    GeoKeyDirectory,
    GeoDoubleParams,
    GeoAsciiParams,
    MathTransformWkt,
    CoordinateSystemWkt,
    ClassificationLookup,
    TextAreaDescription,
    ExtraBytes,
    Unsupported,
}

impl RecordKind {
    pub fn lookup(user_id: &str, record_id: u16) -> Self {
        match (user_id, record_id) {
            (PROJECTION_USER_ID, 34735) => RecordKind::GeoKeyDirectory,
            (PROJECTION_USER_ID, 34736) => RecordKind::GeoDoubleParams,
            (PROJECTION_USER_ID, 34737) => RecordKind::GeoAsciiParams,
            (PROJECTION_USER_ID, 2111) => RecordKind::MathTransformWkt,
            (PROJECTION_USER_ID, 2112) => RecordKind::CoordinateSystemWkt,
            (SPEC_USER_ID, 0) => RecordKind::ClassificationLookup,
            (SPEC_USER_ID, 3) => RecordKind::TextAreaDescription,
            (SPEC_USER_ID, 4) => RecordKind::ExtraBytes,
            (LIBLAS_USER_ID, 2112) => RecordKind::MathTransformWkt,
            _ => RecordKind::Unsupported,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoKeyDirectoryHeader {
    pub key_directory_version: u16,
    pub key_revision: u16,
    pub minor_revision: u16,
    pub number_of_keys: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub class_number: u8,
    pub description: String,
}

/// Data type of an extra bytes attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraBytesDataType {
    /// Opaque bytes. The options field holds the number of bytes.
    Undocumented,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    /// Codes 11 to 30 (fixed size arrays, deprecated in LAS 1.4 R14)
    Deprecated(u8),
    Reserved(u8),
}

impl ExtraBytesDataType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ExtraBytesDataType::Undocumented,
            1 => ExtraBytesDataType::U8,
            2 => ExtraBytesDataType::I8,
            3 => ExtraBytesDataType::U16,
            4 => ExtraBytesDataType::I16,
            5 => ExtraBytesDataType::U32,
            6 => ExtraBytesDataType::I32,
            7 => ExtraBytesDataType::U64,
            8 => ExtraBytesDataType::I64,
            9 => ExtraBytesDataType::F32,
            10 => ExtraBytesDataType::F64,
            11..=30 => ExtraBytesDataType::Deprecated(code),
            _ => ExtraBytesDataType::Reserved(code),
        }
    }

    /// Size of a single value, if the type is a scalar.
    pub fn size(&self) -> Option<usize> {
        match self {
            ExtraBytesDataType::U8 | ExtraBytesDataType::I8 => Some(1),
            ExtraBytesDataType::U16 | ExtraBytesDataType::I16 => Some(2),
            ExtraBytesDataType::U32 | ExtraBytesDataType::I32 | ExtraBytesDataType::F32 => Some(4),
            ExtraBytesDataType::U64 | ExtraBytesDataType::I64 | ExtraBytesDataType::F64 => Some(8),
            ExtraBytesDataType::Undocumented
            | ExtraBytesDataType::Deprecated(_)
            | ExtraBytesDataType::Reserved(_) => None,
        }
    }
}

/// One entry of the extra bytes VLR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraBytesDescriptor {
    pub data_type: ExtraBytesDataType,
    pub options: u8,
    pub name: String,
    pub no_data: [u8; 8],
    pub min: [u8; 8],
    pub max: [u8; 8],
    pub scale: f64,
    pub offset: f64,
    pub description: String,
}

impl ExtraBytesDescriptor {
    fn parse(bytes: &[u8]) -> Self {
        ExtraBytesDescriptor {
            data_type: ExtraBytesDataType::from_code(bytes[2]),
            options: bytes[3],
            name: read_las_string(&bytes[4..36]),
            no_data: array_at(bytes, 40),
            min: array_at(bytes, 64),
            max: array_at(bytes, 88),
            scale: f64_at(bytes, 112),
            offset: f64_at(bytes, 136),
            description: read_las_string(&bytes[160..192]),
        }
    }

    pub fn has_no_data(&self) -> bool {
        self.options & 0x01 != 0
    }

    pub fn has_min(&self) -> bool {
        self.options & 0x02 != 0
    }

    pub fn has_max(&self) -> bool {
        self.options & 0x04 != 0
    }

    pub fn has_scale(&self) -> bool {
        self.options & 0x08 != 0
    }

    pub fn has_offset(&self) -> bool {
        self.options & 0x10 != 0
    }

    /// Number of bytes the attribute occupies in each point.
    pub fn value_size(&self) -> Option<usize> {
        match self.data_type {
            ExtraBytesDataType::Undocumented => Some(self.options as usize),
            data_type => data_type.size(),
        }
    }

    /// Reads the attribute value at `byte_offset` within the extra bytes of
    /// a point, applying scale and offset if their option bits are set.
    ///
    /// Returns `None` for non-scalar types or if the extra bytes are too short.
    pub fn decode_value(&self, extra_bytes: &[u8], byte_offset: usize) -> Option<f64> {
        let size = self.data_type.size()?;
        let bytes = extra_bytes.get(byte_offset..byte_offset.checked_add(size)?)?;
        let raw = match self.data_type {
            ExtraBytesDataType::U8 => bytes[0] as f64,
            ExtraBytesDataType::I8 => bytes[0] as i8 as f64,
            ExtraBytesDataType::U16 => LittleEndian::read_u16(bytes) as f64,
            ExtraBytesDataType::I16 => LittleEndian::read_i16(bytes) as f64,
            ExtraBytesDataType::U32 => LittleEndian::read_u32(bytes) as f64,
            ExtraBytesDataType::I32 => LittleEndian::read_i32(bytes) as f64,
            ExtraBytesDataType::U64 => LittleEndian::read_u64(bytes) as f64,
            ExtraBytesDataType::I64 => LittleEndian::read_i64(bytes) as f64,
            ExtraBytesDataType::F32 => LittleEndian::read_f32(bytes) as f64,
            ExtraBytesDataType::F64 => LittleEndian::read_f64(bytes),
            _ => return None,
        };
        let mut value = raw;
        if self.has_scale() {
            value *= self.scale;
        }
        if self.has_offset() {
            value += self.offset;
        }
        Some(value)
    }
}

/// A decoded VLR / EVLR payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrsTag {
    GeoKeyDirectory {
        header: GeoKeyDirectoryHeader,
        keys: Vec<GeoKeyEntry>,
    },
    /// Values keyed by their absolute position in the file.
    GeoDoubleParams(BTreeMap<u64, f64>),
    /// Strings keyed by their absolute position in the file.
    GeoAsciiParams(BTreeMap<u64, String>),
    MathTransformWkt(Vec<String>),
    CoordinateSystemWkt(Vec<String>),
    TextAreaDescription(Vec<String>),
    ClassificationLookup(Vec<ClassificationEntry>),
    ExtraBytes(Vec<ExtraBytesDescriptor>),
}

/// Decodes the payload of a variable length record.
///
/// `payload_offset` is the absolute file offset of the first payload byte.
pub fn decode(
    user_id: &str,
    record_id: u16,
    payload: &[u8],
    payload_offset: u64,
) -> Result<CrsTag, ReadLasError> {
    let tag = match RecordKind::lookup(user_id, record_id) {
        RecordKind::GeoKeyDirectory => decode_geo_key_directory(payload, payload_offset)?,
        RecordKind::GeoDoubleParams => {
            CrsTag::GeoDoubleParams(decode_geo_double_params(payload, payload_offset))
        }
        RecordKind::GeoAsciiParams => {
            CrsTag::GeoAsciiParams(decode_geo_ascii_params(payload, payload_offset))
        }
        RecordKind::MathTransformWkt => CrsTag::MathTransformWkt(split_nul_strings(payload)),
        RecordKind::CoordinateSystemWkt => {
            CrsTag::CoordinateSystemWkt(split_nul_strings(payload))
        }
        RecordKind::TextAreaDescription => {
            CrsTag::TextAreaDescription(split_nul_strings(payload))
        }
        RecordKind::ClassificationLookup => {
            CrsTag::ClassificationLookup(decode_classification_lookup(payload, payload_offset)?)
        }
        RecordKind::ExtraBytes => {
            CrsTag::ExtraBytes(decode_extra_bytes(payload, payload_offset)?)
        }
        RecordKind::Unsupported => {
            return Err(UnsupportedRecordError::VariableRecord {
                user_id: user_id.to_string(),
                record_id,
                offset: payload_offset,
            }
            .into());
        }
    };
    Ok(tag)
}

fn check_payload_len(payload: &[u8], offset: u64, expected: usize) -> Result<(), FramingError> {
    if payload.len() < expected {
        return Err(FramingError::PayloadTooShort {
            offset,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn decode_geo_key_directory(payload: &[u8], offset: u64) -> Result<CrsTag, FramingError> {
    check_payload_len(payload, offset, 8)?;
    let header = GeoKeyDirectoryHeader {
        key_directory_version: u16_at(payload, 0),
        key_revision: u16_at(payload, 2),
        minor_revision: u16_at(payload, 4),
        number_of_keys: u16_at(payload, 6),
    };
    check_payload_len(payload, offset, 8 + 8 * header.number_of_keys as usize)?;

    let keys = payload[8..]
        .chunks_exact(8)
        .take(header.number_of_keys as usize)
        .map(|entry| GeoKeyEntry {
            key_id: u16_at(entry, 0),
            tiff_tag_location: u16_at(entry, 2),
            count: u16_at(entry, 4),
            value_offset: u16_at(entry, 6),
        })
        .collect();
    Ok(CrsTag::GeoKeyDirectory { header, keys })
}

/// Reads an f64 at every 4 byte step of the payload, as long as all 8 bytes
/// are inside the payload.
fn decode_geo_double_params(payload: &[u8], offset: u64) -> BTreeMap<u64, f64> {
    (0..payload.len())
        .step_by(4)
        .take_while(|pos| pos + 8 <= payload.len())
        .map(|pos| (offset + pos as u64, f64_at(payload, pos)))
        .collect()
}

/// Non-empty NUL separated strings, keyed by their tracked position.
///
/// A kept string advances the position by its length plus the terminator,
/// a dropped empty chunk by two bytes.
fn decode_geo_ascii_params(payload: &[u8], offset: u64) -> BTreeMap<u64, String> {
    let mut params = BTreeMap::new();
    let mut position = offset;
    let mut chunks = payload.split(|byte| *byte == 0).peekable();
    while let Some(chunk) = chunks.next() {
        if !chunk.is_empty() {
            params.insert(position, String::from_utf8_lossy(chunk).into_owned());
            position += chunk.len() as u64 + 1;
        } else if chunks.peek().is_some() {
            position += 2;
        }
    }
    params
}

fn decode_classification_lookup(
    payload: &[u8],
    offset: u64,
) -> Result<Vec<ClassificationEntry>, FramingError> {
    check_payload_len(
        payload,
        offset,
        CLASSIFICATION_ENTRIES * CLASSIFICATION_ENTRY_SIZE,
    )?;
    let entries = payload
        .chunks_exact(CLASSIFICATION_ENTRY_SIZE)
        .take(CLASSIFICATION_ENTRIES)
        .map(|entry| ClassificationEntry {
            class_number: entry[0],
            description: read_las_string(&entry[1..]),
        })
        .collect();
    Ok(entries)
}

fn decode_extra_bytes(
    payload: &[u8],
    offset: u64,
) -> Result<Vec<ExtraBytesDescriptor>, FramingError> {
    let remainder = payload.len() % EXTRA_BYTES_DESCRIPTOR_SIZE;
    if remainder != 0 {
        return Err(FramingError::PayloadTooShort {
            offset,
            expected: payload.len() - remainder + EXTRA_BYTES_DESCRIPTOR_SIZE,
            actual: payload.len(),
        });
    }
    let descriptors = payload
        .chunks_exact(EXTRA_BYTES_DESCRIPTOR_SIZE)
        .map(ExtraBytesDescriptor::parse)
        .collect();
    Ok(descriptors)
}
