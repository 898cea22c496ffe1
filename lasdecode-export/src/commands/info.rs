use crate::cli::InfoOptions;
use anyhow::{Context, Result};
use lasdecode_common::geometry::coordinate_system::CoordinateSystem;
use lasdecode_common::las::vlr::VariableRecord;
use lasdecode_common::las::LasFile;
use lasdecode_common::nalgebra::Point3;
use log::info;
use serde::Serialize;
use std::io::Write;

/// Json summary of a las file.
#[derive(Debug, Serialize)]
pub struct LasInfo<'a> {
    pub version: String,
    pub file_source_id: u16,
    pub system_identifier: String,
    pub generating_software: String,
    pub file_creation_day_of_year: u16,
    pub file_creation_year: u16,
    pub header_size: u16,
    pub offset_to_point_data: u32,
    pub point_data_record_format: u8,
    pub point_data_record_length: u16,
    pub number_of_point_records: u64,
    pub coordinate_system: CoordinateSystem,
    pub bounds_min: Point3<f64>,
    pub bounds_max: Point3<f64>,
    pub standard_gps_time: bool,
    pub wkt_crs: bool,
    pub vlrs: &'a [VariableRecord],
    pub evlrs: &'a [VariableRecord],
}

impl<'a> LasInfo<'a> {
    pub fn new(las: &'a LasFile) -> Self {
        let header = &las.header;
        let (bounds_min, bounds_max) = header.bounds();
        LasInfo {
            version: header.version.to_string(),
            file_source_id: header.file_source_id,
            system_identifier: header.system_identifier(),
            generating_software: header.generating_software(),
            file_creation_day_of_year: header.file_creation_day_of_year,
            file_creation_year: header.file_creation_year,
            header_size: header.header_size,
            offset_to_point_data: header.offset_to_point_data,
            point_data_record_format: header.point_data_record_format,
            point_data_record_length: header.point_data_record_length,
            number_of_point_records: header.point_count(),
            coordinate_system: header.coordinate_system(),
            bounds_min,
            bounds_max,
            standard_gps_time: header.has_standard_gps_time(),
            wkt_crs: header.has_wkt_crs(),
            vlrs: &las.vlrs,
            evlrs: &las.evlrs,
        }
    }
}

pub fn info(options: InfoOptions) -> Result<()> {
    let las = LasFile::from_path(&options.input_file)
        .with_context(|| format!("Failed to decode {}", options.input_file.display()))?;
    info!(
        "Decoded {}: {} VLRs, {} points, {} EVLRs",
        options.input_file.display(),
        las.vlrs.len(),
        las.points.len(),
        las.evlrs.len()
    );

    let stdout = std::io::stdout();
    write_info(&LasInfo::new(&las), stdout.lock(), options.pretty)?;
    Ok(())
}

pub fn write_info<W: Write>(las_info: &LasInfo, mut writer: W, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, las_info)?;
    } else {
        serde_json::to_writer(&mut writer, las_info)?;
    }
    writeln!(writer)?;
    Ok(())
}
