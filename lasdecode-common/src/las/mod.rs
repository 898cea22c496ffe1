//! Decoder for uncompressed LAS 1.1 - 1.4 files.
//!
//! A file is decoded in a fixed sequence: public header, VLRs, point records,
//! EVLRs. The first error aborts the whole parse.

pub mod crs;
pub mod header;
mod helpers;
pub mod point;
pub mod vlr;

#[cfg(test)]
pub(crate) mod test_utils;

use crate::geometry::projector::{project, OutputRow};
use crate::io::{FileSource, IoError, RandomAccessSource, ReadError};
use header::Header;
use log::debug;
use point::PointRecord;
use std::path::Path;
use thiserror::Error;
use vlr::{read_evlrs, read_vlrs, VariableRecord};

pub use helpers::read_las_string;

#[derive(Error, Debug, Clone)]
pub enum ReadLasError {
    #[error("Could not open LAS file: {0}")]
    Open(IoError),
    #[error(transparent)]
    Io(#[from] ReadError),
    #[error("Bad LAS file: {0}")]
    Format(#[from] FormatError),
    #[error("Bad LAS file layout: {0}")]
    Framing(#[from] FramingError),
    #[error("Unsupported LAS content: {0}")]
    Unsupported(#[from] UnsupportedRecordError),
}

/// The file is not a LAS file this decoder can read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("File signature is {found:?}, expected \"LASF\".")]
    BadSignature { found: String },
    #[error("LAS version {major}.{minor} is not supported.")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("Point data record format {point_data_record_format:#04x} is compressed. Compressed (*.laz) files are not supported.")]
    CompressedUnsupported { point_data_record_format: u8 },
}

/// The declared sizes and offsets of the file do not add up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("After reading the VLRs the offset is {offset}, but the header declares the point data at offset {expected}.")]
    VlrRegionMismatch { offset: u64, expected: u64 },
    #[error("Declared point stride too small for format {format}: {stride} bytes, but at least {required} bytes are required.")]
    StrideTooSmall { format: u8, stride: u16, required: u16 },
    #[error("Header is {header_size} bytes long, but this version requires at least {required} bytes.")]
    HeaderTooShort { header_size: usize, required: usize },
    #[error("Record payload at offset {offset} is {actual} bytes long, expected at least {expected} bytes.")]
    PayloadTooShort {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

/// Content that is well-formed, but has no decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedRecordError {
    #[error("Point data record format {format_id} is not defined.")]
    PointFormat { format_id: u8 },
    #[error("No decoder for record {record_id} of user {user_id:?} (at offset {offset}).")]
    VariableRecord {
        user_id: String,
        record_id: u16,
        offset: u64,
    },
}

/// A fully decoded LAS file.
#[derive(Debug, Clone)]
pub struct LasFile {
    pub header: Header,
    pub vlrs: Vec<VariableRecord>,
    pub points: Vec<PointRecord>,
    pub evlrs: Vec<VariableRecord>,
}

impl LasFile {
    /// Decodes the LAS file at the given path.
    ///
    /// The file is closed again before this returns, on success and on error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReadLasError> {
        let source = FileSource::open(path).map_err(ReadLasError::Open)?;
        Self::read_from(&source)
    }

    pub fn read_from<S: RandomAccessSource + ?Sized>(source: &S) -> Result<Self, ReadLasError> {
        let header = Header::read_from(source)?;
        debug!(
            "LAS {} header: point format {}, stride {}, {} points, {} VLRs",
            header.version,
            header.point_data_record_format,
            header.point_data_record_length,
            header.point_count(),
            header.number_of_variable_length_records,
        );

        let vlrs = read_vlrs(source, &header)?;
        let points = point::read_points(
            source,
            header.offset_to_point_data as u64,
            header.point_data_record_length,
            header.point_data_record_format,
            header.point_count(),
        )?;
        let evlrs = read_evlrs(source, &header)?;
        debug!(
            "Decoded {} VLRs, {} points, {} EVLRs",
            vlrs.len(),
            points.len(),
            evlrs.len()
        );

        Ok(LasFile {
            header,
            vlrs,
            points,
            evlrs,
        })
    }

    /// Projects every point into world coordinates.
    pub fn output_rows(&self) -> impl ExactSizeIterator<Item = OutputRow> + '_ {
        self.points
            .iter()
            .map(|point| project(point, &self.header))
    }
}
