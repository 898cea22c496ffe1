//! The public header block.

use crate::geometry::coordinate_system::CoordinateSystem;
use crate::io::RandomAccessSource;
use crate::las::helpers::{array_at, f64_at, read_las_string, u16_at, u32_at, u64_at};
use crate::las::point::PointFormat;
use crate::las::{FormatError, FramingError, ReadLasError, UnsupportedRecordError};
use log::trace;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const LAS_FILE_SIGNATURE: &[u8; 4] = b"LASF";

/// Size of the header up to and including the bounding box (LAS 1.1, 1.2).
pub const LEGACY_HEADER_SIZE: usize = 227;

/// LAS 1.3 adds the start of the waveform data packet record.
pub const LAS_1_3_HEADER_SIZE: usize = 235;

/// LAS 1.4 adds the EVLR location and the 64 bit point counts.
pub const LAS_1_4_HEADER_SIZE: usize = 375;

/// Bit 7 of the point data record format marks compressed (LAZ) point data.
const COMPRESSION_BIT: u8 = 0x80;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LasVersion {
    V1_1,
    V1_2,
    V1_3,
    V1_4,
}

impl LasVersion {
    pub fn new(major: u8, minor: u8) -> Option<Self> {
        match (major, minor) {
            (1, 1) => Some(LasVersion::V1_1),
            (1, 2) => Some(LasVersion::V1_2),
            (1, 3) => Some(LasVersion::V1_3),
            (1, 4) => Some(LasVersion::V1_4),
            _ => None,
        }
    }

    pub fn minor(&self) -> u8 {
        match self {
            LasVersion::V1_1 => 1,
            LasVersion::V1_2 => 2,
            LasVersion::V1_3 => 3,
            LasVersion::V1_4 => 4,
        }
    }

    /// Minimal size of a header of this version.
    pub fn header_size(&self) -> usize {
        match self {
            LasVersion::V1_1 | LasVersion::V1_2 => LEGACY_HEADER_SIZE,
            LasVersion::V1_3 => LAS_1_3_HEADER_SIZE,
            LasVersion::V1_4 => LAS_1_4_HEADER_SIZE,
        }
    }
}

impl Display for LasVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "1.{}", self.minor())
    }
}

/// The validated public header block.
///
/// Fields that do not exist in the file's header (e.g. the 64 bit point
/// count in a LAS 1.2 file) are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub file_source_id: u16,
    pub global_encoding: u16,
    pub project_id: [u8; 16],
    pub version: LasVersion,
    pub system_identifier: [u8; 32],
    pub generating_software: [u8; 32],
    pub file_creation_day_of_year: u16,
    pub file_creation_year: u16,
    pub header_size: u16,
    pub offset_to_point_data: u32,
    pub number_of_variable_length_records: u32,
    pub point_data_record_format: u8,
    pub point_data_record_length: u16,
    pub legacy_number_of_point_records: u32,
    pub legacy_number_of_points_by_return: [u32; 5],
    pub x_scale_factor: f64,
    pub y_scale_factor: f64,
    pub z_scale_factor: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub z_offset: f64,
    pub max_x: f64,
    pub min_x: f64,
    pub max_y: f64,
    pub min_y: f64,
    pub max_z: f64,
    pub min_z: f64,
    pub start_of_waveform_data_packet_record: u64,
    pub start_of_first_evlr: u64,
    pub number_of_evlrs: u32,
    pub number_of_point_records: u64,
    pub number_of_points_by_return: [u64; 15],
}

impl Header {
    /// Reads and validates the header at the start of `source`.
    pub fn read_from<S: RandomAccessSource + ?Sized>(source: &S) -> Result<Self, ReadLasError> {
        // legacy part first, it contains the actual header size
        let prefix_len = source.size().min(LEGACY_HEADER_SIZE as u64) as usize;
        let prefix = source.read_exact_at(0, prefix_len)?;
        check_identity(&prefix)?;
        if prefix.len() < LEGACY_HEADER_SIZE {
            return Err(FramingError::HeaderTooShort {
                header_size: prefix.len(),
                required: LEGACY_HEADER_SIZE,
            }
            .into());
        }

        let header_size = u16_at(&prefix, 94) as usize;
        let bytes = if header_size > prefix.len() {
            source.read_exact_at(0, header_size)?
        } else {
            prefix
        };
        Self::parse(&bytes)
    }

    /// Decodes a header from its raw bytes.
    ///
    /// Validates (in this order) the signature, the version and the
    /// compression bit, then checks that the header is long enough for
    /// its version.
    pub fn parse(bytes: &[u8]) -> Result<Self, ReadLasError> {
        let version = check_identity(bytes)?;

        let header_size = if bytes.len() >= LEGACY_HEADER_SIZE {
            u16_at(bytes, 94) as usize
        } else {
            bytes.len()
        };
        let required = version.header_size();
        if header_size < required || bytes.len() < required {
            return Err(FramingError::HeaderTooShort {
                header_size: header_size.min(bytes.len()),
                required,
            }
            .into());
        }

        let mut project_id = [0; 16];
        project_id.copy_from_slice(&bytes[8..24]);
        let mut legacy_number_of_points_by_return = [0; 5];
        for (i, count) in legacy_number_of_points_by_return.iter_mut().enumerate() {
            *count = u32_at(bytes, 111 + 4 * i);
        }

        let mut header = Header {
            file_source_id: u16_at(bytes, 4),
            global_encoding: u16_at(bytes, 6),
            project_id,
            version,
            system_identifier: array_at(bytes, 26),
            generating_software: array_at(bytes, 58),
            file_creation_day_of_year: u16_at(bytes, 90),
            file_creation_year: u16_at(bytes, 92),
            header_size: header_size as u16,
            offset_to_point_data: u32_at(bytes, 96),
            number_of_variable_length_records: u32_at(bytes, 100),
            point_data_record_format: bytes[104],
            point_data_record_length: u16_at(bytes, 105),
            legacy_number_of_point_records: u32_at(bytes, 107),
            legacy_number_of_points_by_return,
            x_scale_factor: f64_at(bytes, 131),
            y_scale_factor: f64_at(bytes, 139),
            z_scale_factor: f64_at(bytes, 147),
            x_offset: f64_at(bytes, 155),
            y_offset: f64_at(bytes, 163),
            z_offset: f64_at(bytes, 171),
            max_x: f64_at(bytes, 179),
            min_x: f64_at(bytes, 187),
            max_y: f64_at(bytes, 195),
            min_y: f64_at(bytes, 203),
            max_z: f64_at(bytes, 211),
            min_z: f64_at(bytes, 219),
            start_of_waveform_data_packet_record: 0,
            start_of_first_evlr: 0,
            number_of_evlrs: 0,
            number_of_point_records: 0,
            number_of_points_by_return: [0; 15],
        };

        // newer fields, whenever the header is large enough to contain them
        let available = header_size.min(bytes.len());
        if available >= LAS_1_3_HEADER_SIZE {
            header.start_of_waveform_data_packet_record = u64_at(bytes, 227);
        }
        if available >= LAS_1_4_HEADER_SIZE {
            header.start_of_first_evlr = u64_at(bytes, 235);
            header.number_of_evlrs = u32_at(bytes, 243);
            header.number_of_point_records = u64_at(bytes, 247);
            for (i, count) in header.number_of_points_by_return.iter_mut().enumerate() {
                *count = u64_at(bytes, 255 + 8 * i);
            }
        }

        trace!("Parsed header: {header:?}");
        Ok(header)
    }

    /// Number of point records: the 64 bit count for LAS 1.4, the legacy
    /// 32 bit count otherwise.
    pub fn point_count(&self) -> u64 {
        if self.version == LasVersion::V1_4 {
            self.number_of_point_records
        } else {
            self.legacy_number_of_point_records as u64
        }
    }

    /// Number of EVLRs. Files before LAS 1.4 have none, regardless of what
    /// the header field says.
    pub fn evlr_count(&self) -> u32 {
        if self.version == LasVersion::V1_4 {
            self.number_of_evlrs
        } else {
            0
        }
    }

    pub fn point_format(&self) -> Result<PointFormat, UnsupportedRecordError> {
        PointFormat::from_id(self.point_data_record_format)
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::from_las_transform(
            Vector3::new(self.x_scale_factor, self.y_scale_factor, self.z_scale_factor),
            Vector3::new(self.x_offset, self.y_offset, self.z_offset),
        )
    }

    /// (min, max) of the bounding box stored in the header.
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        (
            Point3::new(self.min_x, self.min_y, self.min_z),
            Point3::new(self.max_x, self.max_y, self.max_z),
        )
    }

    pub fn system_identifier(&self) -> String {
        read_las_string(&self.system_identifier)
    }

    pub fn generating_software(&self) -> String {
        read_las_string(&self.generating_software)
    }

    /// Global encoding bit 0: GPS times are standard GPS time, not GPS week time.
    pub fn has_standard_gps_time(&self) -> bool {
        self.global_encoding & 0x01 != 0
    }

    /// Global encoding bit 4: the CRS is stored as WKT rather than GeoTIFF keys.
    pub fn has_wkt_crs(&self) -> bool {
        self.global_encoding & 0x10 != 0
    }
}

/// Signature, version and compression checks.
fn check_identity(bytes: &[u8]) -> Result<LasVersion, ReadLasError> {
    let signature = &bytes[..bytes.len().min(4)];
    if signature != LAS_FILE_SIGNATURE {
        return Err(FormatError::BadSignature {
            found: String::from_utf8_lossy(signature).into_owned(),
        }
        .into());
    }

    if bytes.len() < 26 {
        return Err(FramingError::HeaderTooShort {
            header_size: bytes.len(),
            required: LEGACY_HEADER_SIZE,
        }
        .into());
    }
    let (major, minor) = (bytes[24], bytes[25]);
    let version =
        LasVersion::new(major, minor).ok_or(FormatError::UnsupportedVersion { major, minor })?;

    // a header this short is rejected by the size check of the caller
    if let Some(&point_data_record_format) = bytes.get(104) {
        if point_data_record_format & COMPRESSION_BIT != 0 {
            return Err(FormatError::CompressedUnsupported {
                point_data_record_format,
            }
            .into());
        }
    }
    Ok(version)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::las::test_utils::LasBuilder;

    fn header_bytes(builder: &LasBuilder) -> Vec<u8> {
        let data = builder.build();
        data[..builder.header_size() as usize].to_vec()
    }

    #[test]
    fn test_parse_legacy_header() {
        let mut builder = LasBuilder::new(1, 2, 3);
        builder.scale = [0.01, 0.02, 0.03];
        builder.offset = [100.0, 200.0, 300.0];
        builder.point_count = Some(7);
        let header = Header::parse(&header_bytes(&builder)).unwrap();

        assert_eq!(header.version, LasVersion::V1_2);
        assert_eq!(header.header_size, 227);
        assert_eq!(header.offset_to_point_data, 227);
        assert_eq!(header.point_data_record_format, 3);
        assert_eq!(header.point_data_record_length, 34);
        assert_eq!(header.legacy_number_of_point_records, 7);
        assert_eq!(header.point_count(), 7);
        assert_eq!(header.x_scale_factor, 0.01);
        assert_eq!(header.z_offset, 300.0);
        assert_eq!(header.system_identifier(), "lasdecode test");
        assert_eq!(header.point_format().unwrap(), PointFormat::Format3);
        assert_eq!(
            header.coordinate_system().scale(),
            &Vector3::new(0.01, 0.02, 0.03)
        );
    }

    #[test]
    fn test_parse_las14_header() {
        let mut builder = LasBuilder::new(1, 4, 6);
        builder.point_count = Some(5_000_000_000);
        builder.evlr_count = Some(2);
        builder.start_of_first_evlr = Some(1 << 33);
        let header = Header::parse(&header_bytes(&builder)).unwrap();

        assert_eq!(header.version, LasVersion::V1_4);
        assert_eq!(header.header_size, 375);
        assert_eq!(header.point_count(), 5_000_000_000);
        assert_eq!(header.legacy_number_of_point_records, 0);
        assert_eq!(header.evlr_count(), 2);
        assert_eq!(header.start_of_first_evlr, 1 << 33);
    }

    #[test]
    fn test_legacy_version_has_no_evlrs() {
        let mut builder = LasBuilder::new(1, 2, 0);
        builder.header_size = Some(375);
        builder.evlr_count = Some(4);
        let header = Header::parse(&header_bytes(&builder)).unwrap();
        assert_eq!(header.number_of_evlrs, 4);
        assert_eq!(header.evlr_count(), 0);
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = header_bytes(&LasBuilder::new(1, 2, 0));
        bytes[..4].copy_from_slice(b"LASX");
        let err = Header::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Format(FormatError::BadSignature { ref found }) if found == "LASX"
        ));
    }

    #[test]
    fn test_signature_is_checked_first() {
        // wrong signature, wrong version and compressed at the same time
        let mut bytes = header_bytes(&LasBuilder::new(2, 0, 0x81));
        bytes[0] = b'X';
        let err = Header::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Format(FormatError::BadSignature { .. })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        for (major, minor) in [(1, 0), (1, 5), (2, 0)] {
            let bytes = header_bytes(&LasBuilder::new(major, minor, 0x80));
            let err = Header::parse(&bytes).unwrap_err();
            assert!(matches!(
                err,
                ReadLasError::Format(FormatError::UnsupportedVersion { major: a, minor: b })
                    if a == major && b == minor
            ));
        }
    }

    #[test]
    fn test_compressed() {
        let bytes = header_bytes(&LasBuilder::new(1, 4, 0x86));
        let err = Header::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Format(FormatError::CompressedUnsupported {
                point_data_record_format: 0x86
            })
        ));
    }

    #[test]
    fn test_header_too_short_for_version() {
        let mut builder = LasBuilder::new(1, 4, 0);
        builder.header_size = Some(235);
        let err = Header::parse(&header_bytes(&builder)).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Framing(FramingError::HeaderTooShort {
                header_size: 235,
                required: 375
            })
        ));
    }

    #[test]
    fn test_read_from_short_source() {
        let bytes: &[u8] = b"LASF";
        let err = Header::read_from(bytes).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Framing(FramingError::HeaderTooShort { header_size: 4, .. })
        ));

        let bytes: &[u8] = b"PK\x03\x04";
        let err = Header::read_from(bytes).unwrap_err();
        assert!(matches!(
            err,
            ReadLasError::Format(FormatError::BadSignature { .. })
        ));
    }

    #[test]
    fn test_read_from_with_user_bytes() {
        // header larger than required, the extra bytes are skipped
        let mut builder = LasBuilder::new(1, 3, 1);
        builder.header_size = Some(300);
        let data = builder.build();
        let header = Header::read_from(data.as_slice()).unwrap();
        assert_eq!(header.version, LasVersion::V1_3);
        assert_eq!(header.header_size, 300);
        assert_eq!(header.offset_to_point_data, 300);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(LasVersion::V1_1.to_string(), "1.1");
        assert_eq!(LasVersion::new(1, 4).unwrap().to_string(), "1.4");
        assert_eq!(LasVersion::new(1, 0), None);
    }
}
