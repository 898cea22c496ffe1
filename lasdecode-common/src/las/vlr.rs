//! Framing of variable length records (VLRs) and extended variable length
//! records (EVLRs).

use crate::io::RandomAccessSource;
use crate::las::crs::{self, CrsTag};
use crate::las::header::Header;
use crate::las::helpers::{read_las_string, u16_at, u64_at};
use crate::las::{FramingError, ReadLasError};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

pub const VLR_HEADER_SIZE: usize = 54;
pub const EVLR_HEADER_SIZE: usize = 60;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableRecordType {
    /// Between the header and the point data, 16 bit payload length.
    Vlr,
    /// After the point data (LAS 1.4), 64 bit payload length.
    Evlr,
}

impl VariableRecordType {
    pub fn header_size(&self) -> usize {
        match self {
            VariableRecordType::Vlr => VLR_HEADER_SIZE,
            VariableRecordType::Evlr => EVLR_HEADER_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecordHeader {
    pub reserved: u16,
    pub user_id: String,
    pub record_id: u16,
    /// Payload length, not including the record header.
    pub record_length: u64,
    pub description: String,
}

impl VariableRecordHeader {
    fn parse(bytes: &[u8], record_type: VariableRecordType) -> Self {
        let (record_length, description_at) = match record_type {
            VariableRecordType::Vlr => (u16_at(bytes, 20) as u64, 22),
            VariableRecordType::Evlr => (u64_at(bytes, 20), 28),
        };
        VariableRecordHeader {
            reserved: u16_at(bytes, 0),
            user_id: read_las_string(&bytes[2..18]),
            record_id: u16_at(bytes, 18),
            record_length,
            description: read_las_string(&bytes[description_at..description_at + 32]),
        }
    }
}

/// A framed record whose payload has not been decoded yet.
#[derive(Debug, Clone)]
pub struct RawVariableRecord {
    pub header: VariableRecordHeader,
    pub payload: Vec<u8>,
    /// Absolute offset of the first payload byte.
    pub payload_offset: u64,
    /// Absolute offset of the next record.
    pub next_offset: u64,
}

/// A record header together with its decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub header: VariableRecordHeader,
    pub tag: CrsTag,
}

impl RawVariableRecord {
    pub fn decode(self) -> Result<VariableRecord, ReadLasError> {
        let tag = crs::decode(
            &self.header.user_id,
            self.header.record_id,
            &self.payload,
            self.payload_offset,
        )?;
        Ok(VariableRecord {
            header: self.header,
            tag,
        })
    }
}

/// Iterates over `count` back to back records.
///
/// After the first error, the iterator yields nothing.
pub struct VariableRecords<'a, S: ?Sized> {
    source: &'a S,
    record_type: VariableRecordType,
    offset: u64,
    remaining: u64,
}

impl<'a, S: RandomAccessSource + ?Sized> VariableRecords<'a, S> {
    pub fn new(source: &'a S, start: u64, count: u64, record_type: VariableRecordType) -> Self {
        VariableRecords {
            source,
            record_type,
            offset: start,
            remaining: count,
        }
    }

    /// Offset of the next record, or the end of the last one.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_next(&mut self) -> Result<RawVariableRecord, ReadLasError> {
        let header_size = self.record_type.header_size();
        let header_bytes = self.source.read_exact_at(self.offset, header_size)?;
        let header = VariableRecordHeader::parse(&header_bytes, self.record_type);

        let payload_offset = self.offset.saturating_add(header_size as u64);
        let payload = self
            .source
            .read_exact_at(payload_offset, header.record_length as usize)?;
        let next_offset = payload_offset.saturating_add(header.record_length);
        trace!(
            "{:?} at offset {}: user {:?}, record {}, {} bytes",
            self.record_type,
            self.offset,
            header.user_id,
            header.record_id,
            header.record_length
        );

        self.offset = next_offset;
        Ok(RawVariableRecord {
            header,
            payload,
            payload_offset,
            next_offset,
        })
    }
}

impl<S: RandomAccessSource + ?Sized> Iterator for VariableRecords<'_, S> {
    type Item = Result<RawVariableRecord, ReadLasError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.read_next();
        self.remaining = if result.is_ok() {
            self.remaining - 1
        } else {
            0
        };
        Some(result)
    }
}

/// Reads and decodes the VLRs.
///
/// The VLRs must end exactly where the point data begins.
pub fn read_vlrs<S: RandomAccessSource + ?Sized>(
    source: &S,
    header: &Header,
) -> Result<Vec<VariableRecord>, ReadLasError> {
    let mut records = VariableRecords::new(
        source,
        header.header_size as u64,
        header.number_of_variable_length_records as u64,
        VariableRecordType::Vlr,
    );
    let mut vlrs = Vec::new();
    for raw in &mut records {
        vlrs.push(raw?.decode()?);
    }

    let expected = header.offset_to_point_data as u64;
    if records.offset() != expected {
        return Err(FramingError::VlrRegionMismatch {
            offset: records.offset(),
            expected,
        }
        .into());
    }
    debug!("Read {} VLRs, point data starts at {expected}", vlrs.len());
    Ok(vlrs)
}

/// Reads and decodes the EVLRs. Files before LAS 1.4 have none.
pub fn read_evlrs<S: RandomAccessSource + ?Sized>(
    source: &S,
    header: &Header,
) -> Result<Vec<VariableRecord>, ReadLasError> {
    let count = header.evlr_count() as u64;
    if count == 0 {
        return Ok(Vec::new());
    }
    debug!(
        "Reading {count} EVLRs at offset {}",
        header.start_of_first_evlr
    );
    VariableRecords::new(
        source,
        header.start_of_first_evlr,
        count,
        VariableRecordType::Evlr,
    )
    .map(|raw| raw?.decode())
    .collect()
}
