//! Point data records, formats 0 to 10.

pub mod flags;

use crate::io::{RandomAccessSource, ReadError};
use crate::las::{FramingError, ReadLasError, UnsupportedRecordError};
use byteorder::{LittleEndian, ReadBytesExt};
use flags::{Classification, PulseFlags, ScanAngle};
use log::{debug, trace};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Number of points that are loaded from the source with a single read.
pub const POINTS_PER_BATCH: u64 = 50_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointFormat {
    Format0,
    Format1,
    Format2,
    Format3,
    Format4,
    Format5,
    Format6,
    Format7,
    Format8,
    Format9,
    Format10,
}

impl PointFormat {
    pub fn from_id(format_id: u8) -> Result<Self, UnsupportedRecordError> {
        let format = match format_id {
            0 => PointFormat::Format0,
            1 => PointFormat::Format1,
            2 => PointFormat::Format2,
            3 => PointFormat::Format3,
            4 => PointFormat::Format4,
            5 => PointFormat::Format5,
            6 => PointFormat::Format6,
            7 => PointFormat::Format7,
            8 => PointFormat::Format8,
            9 => PointFormat::Format9,
            10 => PointFormat::Format10,
            _ => return Err(UnsupportedRecordError::PointFormat { format_id }),
        };
        Ok(format)
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Size of a record without extra bytes.
    pub fn canonical_size(&self) -> u16 {
        match self {
            PointFormat::Format0 => 20,
            PointFormat::Format1 => 28,
            PointFormat::Format2 => 26,
            PointFormat::Format3 => 34,
            PointFormat::Format4 => 57,
            PointFormat::Format5 => 63,
            PointFormat::Format6 => 30,
            PointFormat::Format7 => 36,
            PointFormat::Format8 => 38,
            PointFormat::Format9 => 59,
            PointFormat::Format10 => 67,
        }
    }

    /// Formats 6-10 have the wide base layout (two flag bytes, 16 bit scan angle).
    pub fn is_extended(&self) -> bool {
        self.id() >= 6
    }

    pub fn has_gps_time(&self) -> bool {
        !matches!(self, PointFormat::Format0 | PointFormat::Format2)
    }

    pub fn has_color(&self) -> bool {
        matches!(
            self,
            PointFormat::Format2
                | PointFormat::Format3
                | PointFormat::Format5
                | PointFormat::Format7
                | PointFormat::Format8
                | PointFormat::Format10
        )
    }

    pub fn has_nir(&self) -> bool {
        matches!(self, PointFormat::Format8 | PointFormat::Format10)
    }

    pub fn has_waveform(&self) -> bool {
        matches!(
            self,
            PointFormat::Format4 | PointFormat::Format5 | PointFormat::Format9 | PointFormat::Format10
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformPacket {
    pub descriptor_index: u8,
    pub byte_offset: u64,
    pub packet_size: u32,
    pub return_point_location: f32,
    pub dx: f32,
    pub dy: f32,
    pub dz: f32,
}

/// A single decoded point.
///
/// The optional groups are populated exactly when `format` has them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub format: PointFormat,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,
    pub flags: PulseFlags,
    pub classification: Classification,
    pub scan_angle: ScanAngle,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: Option<f64>,
    pub color: Option<Color>,
    pub nir: Option<u16>,
    pub waveform: Option<WaveformPacket>,
    /// Bytes of the record past the canonical size of the format.
    pub extra_bytes: Vec<u8>,
}

impl PointRecord {
    /// The raw, unscaled position.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }
}

/// Decodes a single record.
///
/// `record` is the full record, including the extra bytes.
pub fn decode_record(format: PointFormat, record: &[u8]) -> std::io::Result<PointRecord> {
    let mut rd = record;
    let x = rd.read_i32::<LittleEndian>()?;
    let y = rd.read_i32::<LittleEndian>()?;
    let z = rd.read_i32::<LittleEndian>()?;
    let intensity = rd.read_u16::<LittleEndian>()?;

    let (flags, classification, scan_angle, user_data, point_source_id, gps_time) =
        if format.is_extended() {
            let returns = rd.read_u8()?;
            let flags = PulseFlags::Extended(returns, rd.read_u8()?);
            let classification = Classification(rd.read_u8()?);
            let user_data = rd.read_u8()?;
            let scan_angle = ScanAngle::Scaled(rd.read_i16::<LittleEndian>()?);
            let point_source_id = rd.read_u16::<LittleEndian>()?;
            let gps_time = rd.read_f64::<LittleEndian>()?;
            (flags, classification, scan_angle, user_data, point_source_id, Some(gps_time))
        } else {
            let flags = PulseFlags::Basic(rd.read_u8()?);
            let classification = Classification(rd.read_u8()?);
            let scan_angle = ScanAngle::Rank(rd.read_i8()?);
            let user_data = rd.read_u8()?;
            let point_source_id = rd.read_u16::<LittleEndian>()?;
            let gps_time = if format.has_gps_time() {
                Some(rd.read_f64::<LittleEndian>()?)
            } else {
                None
            };
            (flags, classification, scan_angle, user_data, point_source_id, gps_time)
        };

    let color = if format.has_color() {
        Some(Color {
            red: rd.read_u16::<LittleEndian>()?,
            green: rd.read_u16::<LittleEndian>()?,
            blue: rd.read_u16::<LittleEndian>()?,
        })
    } else {
        None
    };
    let nir = if format.has_nir() {
        Some(rd.read_u16::<LittleEndian>()?)
    } else {
        None
    };
    let waveform = if format.has_waveform() {
        Some(WaveformPacket {
            descriptor_index: rd.read_u8()?,
            byte_offset: rd.read_u64::<LittleEndian>()?,
            packet_size: rd.read_u32::<LittleEndian>()?,
            return_point_location: rd.read_f32::<LittleEndian>()?,
            dx: rd.read_f32::<LittleEndian>()?,
            dy: rd.read_f32::<LittleEndian>()?,
            dz: rd.read_f32::<LittleEndian>()?,
        })
    } else {
        None
    };

    let mut extra_bytes = Vec::with_capacity(rd.len());
    rd.read_to_end(&mut extra_bytes)?;

    Ok(PointRecord {
        format,
        x,
        y,
        z,
        intensity,
        flags,
        classification,
        scan_angle,
        user_data,
        point_source_id,
        gps_time,
        color,
        nir,
        waveform,
        extra_bytes,
    })
}

/// Streams the point records of a file.
///
/// Records are loaded in batches of [POINTS_PER_BATCH]. After the first
/// error, the reader yields nothing.
pub struct PointReader<'a, S: ?Sized> {
    source: &'a S,
    format: PointFormat,
    offset: u64,
    stride: u16,
    count: u64,
    next_index: u64,
    batch: Vec<u8>,
    batch_start_index: u64,
}

impl<'a, S: RandomAccessSource + ?Sized> PointReader<'a, S> {
    /// Validates the point format and stride. Nothing is read yet.
    pub fn new(
        source: &'a S,
        offset: u64,
        stride: u16,
        format_id: u8,
        count: u64,
    ) -> Result<Self, ReadLasError> {
        let format = PointFormat::from_id(format_id)?;
        let required = format.canonical_size();
        if stride < required {
            return Err(FramingError::StrideTooSmall {
                format: format_id,
                stride,
                required,
            }
            .into());
        }
        debug!(
            "Reading {count} points of format {format_id} at offset {offset}, {} extra bytes per point",
            stride - required
        );
        Ok(PointReader {
            source,
            format,
            offset,
            stride,
            count,
            next_index: 0,
            batch: Vec::new(),
            batch_start_index: 0,
        })
    }

    pub fn format(&self) -> PointFormat {
        self.format
    }

    fn points_in_batch(&self) -> u64 {
        self.batch.len() as u64 / self.stride as u64
    }

    fn load_batch(&mut self) -> Result<(), ReadError> {
        let nr_points = (self.count - self.next_index).min(POINTS_PER_BATCH);
        let offset = self
            .offset
            .saturating_add(self.next_index.saturating_mul(self.stride as u64));
        let length = (nr_points * self.stride as u64) as usize;
        trace!("Loading {nr_points} points ({length} bytes) at offset {offset}");
        self.batch = self.source.read_exact_at(offset, length)?;
        self.batch_start_index = self.next_index;
        Ok(())
    }
}

impl<S: RandomAccessSource + ?Sized> Iterator for PointReader<'_, S> {
    type Item = Result<PointRecord, ReadLasError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.count {
            return None;
        }
        if self.next_index >= self.batch_start_index + self.points_in_batch() {
            if let Err(e) = self.load_batch() {
                self.next_index = self.count;
                return Some(Err(e.into()));
            }
        }

        let stride = self.stride as usize;
        let start = (self.next_index - self.batch_start_index) as usize * stride;
        let record = &self.batch[start..start + stride];
        let result = decode_record(self.format, record).map_err(|e| {
            let offset = self.offset + self.next_index * stride as u64;
            ReadLasError::from(ReadError::new(offset, stride, e))
        });
        self.next_index += 1;
        if result.is_err() {
            self.next_index = self.count;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next_index) as usize;
        (remaining, Some(remaining))
    }
}

/// Decodes `count` point records of the given format, starting at `offset`.
///
/// Record `i` starts at `offset + i * stride`.
pub fn read_points<S: RandomAccessSource + ?Sized>(
    source: &S,
    offset: u64,
    stride: u16,
    format_id: u8,
    count: u64,
) -> Result<Vec<PointRecord>, ReadLasError> {
    PointReader::new(source, offset, stride, format_id, count)?.collect()
}
