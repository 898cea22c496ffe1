use crate::las::header::Header;
use crate::las::point::{Color, PointRecord};
use serde::{Deserialize, Serialize};

/// A point in world coordinates, with 8 bit color.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
    #[serde(rename = "R")]
    pub r: u16,
    #[serde(rename = "G")]
    pub g: u16,
    #[serde(rename = "B")]
    pub b: u16,
}

/// Projects a point into world coordinates, using the scale and offset of the header.
pub fn project(point: &PointRecord, header: &Header) -> OutputRow {
    let position = header
        .coordinate_system()
        .decode_position(point.position())
        .map(|v| round_decimals(v, 3));
    let color = point.color.map(normalize_color).unwrap_or_default();
    OutputRow {
        x: position.x,
        y: position.y,
        z: position.z,
        r: color.red,
        g: color.green,
        b: color.blue,
    }
}

/// Rounds half away from zero.
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Colors that already fit into 8 bits are kept, 16 bit colors are scaled
/// down by dropping the low byte of every channel.
pub fn normalize_color(color: Color) -> Color {
    if (color.red | color.green | color.blue) <= 0xFF {
        color
    } else {
        Color {
            red: color.red >> 8,
            green: color.green >> 8,
            blue: color.blue >> 8,
        }
    }
}
