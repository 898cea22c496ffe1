//! Builds synthetic LAS files in memory.

use crate::las::point::PointFormat;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

pub struct LasBuilder {
    pub major: u8,
    pub minor: u8,
    pub format: u8,
    pub vlrs: Vec<Vec<u8>>,
    pub evlrs: Vec<Vec<u8>>,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub header_size: Option<u16>,
    pub offset_to_point_data: Option<u32>,
    pub point_data_record_length: Option<u16>,
    pub point_count: Option<u64>,
    pub evlr_count: Option<u32>,
    pub start_of_first_evlr: Option<u64>,
    points: Vec<u8>,
    nr_points: u64,
}

impl LasBuilder {
    pub fn new(major: u8, minor: u8, format: u8) -> Self {
        LasBuilder {
            major,
            minor,
            format,
            vlrs: Vec::new(),
            evlrs: Vec::new(),
            scale: [0.001; 3],
            offset: [0.0; 3],
            header_size: None,
            offset_to_point_data: None,
            point_data_record_length: None,
            point_count: None,
            evlr_count: None,
            start_of_first_evlr: None,
            points: Vec::new(),
            nr_points: 0,
        }
    }

    pub fn header_size(&self) -> u16 {
        self.header_size.unwrap_or(match (self.major, self.minor) {
            (1, 3) => 235,
            (1, 4) => 375,
            _ => 227,
        })
    }

    pub fn add_point(&mut self, record: &[u8]) {
        self.points.extend_from_slice(record);
        self.nr_points += 1;
    }

    pub fn build(&self) -> Vec<u8> {
        let header_size = self.header_size() as usize;
        let is_las14 = (self.major, self.minor) == (1, 4);
        let vlr_len: usize = self.vlrs.iter().map(Vec::len).sum();
        let offset_to_point_data = self
            .offset_to_point_data
            .unwrap_or((header_size + vlr_len) as u32);
        let record_length = self.point_data_record_length.unwrap_or_else(|| {
            PointFormat::from_id(self.format & 0x7F)
                .map(|format| format.canonical_size())
                .unwrap_or(20)
        });
        let point_count = self.point_count.unwrap_or(self.nr_points);

        let mut header = vec![0_u8; header_size.max(375)];
        header[0..4].copy_from_slice(b"LASF");
        header[24] = self.major;
        header[25] = self.minor;
        put_str(&mut header[26..58], "lasdecode test");
        put_str(&mut header[58..90], "lasdecode");
        LittleEndian::write_u16(&mut header[90..92], 123);
        LittleEndian::write_u16(&mut header[92..94], 2024);
        LittleEndian::write_u16(&mut header[94..96], header_size as u16);
        LittleEndian::write_u32(&mut header[96..100], offset_to_point_data);
        LittleEndian::write_u32(&mut header[100..104], self.vlrs.len() as u32);
        header[104] = self.format;
        LittleEndian::write_u16(&mut header[105..107], record_length);
        if !is_las14 {
            LittleEndian::write_u32(&mut header[107..111], point_count as u32);
        }
        for axis in 0..3 {
            let at = 131 + 8 * axis;
            LittleEndian::write_f64(&mut header[at..at + 8], self.scale[axis]);
            let at = 155 + 8 * axis;
            LittleEndian::write_f64(&mut header[at..at + 8], self.offset[axis]);
        }
        LittleEndian::write_u64(&mut header[247..255], point_count);

        let mut data = header;
        data.truncate(header_size);
        for vlr in &self.vlrs {
            data.extend_from_slice(vlr);
        }
        if data.len() < offset_to_point_data as usize {
            data.resize(offset_to_point_data as usize, 0);
        }
        data.extend_from_slice(&self.points);

        let start_of_first_evlr = self.start_of_first_evlr.unwrap_or(data.len() as u64);
        if !self.evlrs.is_empty() {
            data.resize(start_of_first_evlr as usize, 0);
            for evlr in &self.evlrs {
                data.extend_from_slice(evlr);
            }
        }
        if header_size >= 375 {
            let evlr_count = self.evlr_count.unwrap_or(self.evlrs.len() as u32);
            LittleEndian::write_u64(&mut data[235..243], start_of_first_evlr);
            LittleEndian::write_u32(&mut data[243..247], evlr_count);
        }
        data
    }
}

fn put_str(field: &mut [u8], value: &str) {
    field[..value.len()].copy_from_slice(value.as_bytes());
}

fn encode_record_header(data: &mut Vec<u8>, user_id: &str, record_id: u16) {
    data.write_u16::<LittleEndian>(0).unwrap();
    let mut user_id_field = [0; 16];
    put_str(&mut user_id_field, user_id);
    data.extend_from_slice(&user_id_field);
    data.write_u16::<LittleEndian>(record_id).unwrap();
}

fn description_field(description: &str) -> [u8; 32] {
    let mut field = [0; 32];
    put_str(&mut field, description);
    field
}

pub fn encode_vlr(user_id: &str, record_id: u16, description: &str, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    encode_record_header(&mut data, user_id, record_id);
    data.write_u16::<LittleEndian>(payload.len() as u16).unwrap();
    data.extend_from_slice(&description_field(description));
    data.extend_from_slice(payload);
    data
}

pub fn encode_evlr(user_id: &str, record_id: u16, description: &str, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    encode_record_header(&mut data, user_id, record_id);
    data.write_u64::<LittleEndian>(payload.len() as u64).unwrap();
    data.extend_from_slice(&description_field(description));
    data.extend_from_slice(payload);
    data
}

/// A format 0 record with the given raw position and all other fields zero.
pub fn format0_point(x: i32, y: i32, z: i32) -> Vec<u8> {
    let mut data = Vec::with_capacity(20);
    data.write_i32::<LittleEndian>(x).unwrap();
    data.write_i32::<LittleEndian>(y).unwrap();
    data.write_i32::<LittleEndian>(z).unwrap();
    data.resize(20, 0);
    data
}
