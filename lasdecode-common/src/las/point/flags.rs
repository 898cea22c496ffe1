//! Views on the bit-packed bytes of a point record.

use serde::{Deserialize, Serialize};

/// The packed return / scan flags of a point.
///
/// Formats 0-5 pack everything into a single byte, formats 6-10 use two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PulseFlags {
    Basic(u8),
    Extended(u8, u8),
}

impl PulseFlags {
    pub fn return_number(&self) -> u8 {
        match *self {
            PulseFlags::Basic(byte) => byte & 0x07,
            PulseFlags::Extended(byte, _) => byte & 0x0F,
        }
    }

    pub fn number_of_returns(&self) -> u8 {
        match *self {
            PulseFlags::Basic(byte) => (byte >> 3) & 0x07,
            PulseFlags::Extended(byte, _) => (byte >> 4) & 0x0F,
        }
    }

    pub fn scan_direction_flag(&self) -> u8 {
        match *self {
            PulseFlags::Basic(byte) => (byte >> 6) & 0x01,
            PulseFlags::Extended(_, byte) => (byte >> 4) & 0x03,
        }
    }

    pub fn edge_of_flight_line(&self) -> u8 {
        match *self {
            PulseFlags::Basic(byte) => (byte >> 7) & 0x01,
            PulseFlags::Extended(_, byte) => (byte >> 6) & 0x03,
        }
    }

    /// Classification flags (synthetic, key-point, withheld, overlap).
    ///
    /// Only the extended layout has them in the flags. For formats 0-5, the
    /// first three live in the classification byte instead.
    pub fn classification_flags(&self) -> Option<u8> {
        match *self {
            PulseFlags::Basic(_) => None,
            PulseFlags::Extended(_, byte) => Some(byte & 0x0F),
        }
    }
}

/// The raw classification byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification(pub u8);

impl Classification {
    pub fn class_code(&self) -> u8 {
        self.0 & 0x1F
    }

    pub fn class(&self) -> AsprsClass {
        AsprsClass::from_code(self.class_code())
    }

    pub fn is_synthetic(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn is_key_point(&self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn is_withheld(&self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// ASPRS standard point classes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsprsClass {
    CreatedNeverClassified,
    Unclassified,
    Ground,
    LowVegetation,
    MediumVegetation,
    HighVegetation,
    Building,
    LowPoint,
    ModelKeyPoint,
    Water,
    Rail,
    RoadSurface,
    Overlap,
    WireGuard,
    WireConductor,
    TransmissionTower,
    WireStructureConnector,
    BridgeDeck,
    HighNoise,
    OverheadStructure,
    IgnoredGround,
    Snow,
    TemporalExclusion,
    /// Reserved or user defined
    Other(u8),
}

impl AsprsClass {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AsprsClass::CreatedNeverClassified,
            1 => AsprsClass::Unclassified,
            2 => AsprsClass::Ground,
            3 => AsprsClass::LowVegetation,
            4 => AsprsClass::MediumVegetation,
            5 => AsprsClass::HighVegetation,
            6 => AsprsClass::Building,
            7 => AsprsClass::LowPoint,
            8 => AsprsClass::ModelKeyPoint,
            9 => AsprsClass::Water,
            10 => AsprsClass::Rail,
            11 => AsprsClass::RoadSurface,
            12 => AsprsClass::Overlap,
            13 => AsprsClass::WireGuard,
            14 => AsprsClass::WireConductor,
            15 => AsprsClass::TransmissionTower,
            16 => AsprsClass::WireStructureConnector,
            17 => AsprsClass::BridgeDeck,
            18 => AsprsClass::HighNoise,
            19 => AsprsClass::OverheadStructure,
            20 => AsprsClass::IgnoredGround,
            21 => AsprsClass::Snow,
            22 => AsprsClass::TemporalExclusion,
            other => AsprsClass::Other(other),
        }
    }
}

/// Scan angle, as stored in the point record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanAngle {
    /// Formats 0-5: whole degrees
    Rank(i8),
    /// Formats 6-10: units of 0.006 degrees
    Scaled(i16),
}

impl ScanAngle {
    pub fn degrees(&self) -> f32 {
        match *self {
            ScanAngle::Rank(rank) => rank as f32,
            ScanAngle::Scaled(scaled) => scaled as f32 * 0.006,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_basic_flags() {
        let flags = PulseFlags::Basic(0b1010_0011);
        assert_eq!(flags.return_number(), 3);
        assert_eq!(flags.number_of_returns(), 4);
        assert_eq!(flags.scan_direction_flag(), 0);
        assert_eq!(flags.edge_of_flight_line(), 1);
        assert_eq!(flags.classification_flags(), None);

        let flags = PulseFlags::Basic(0b0100_1001);
        assert_eq!(flags.return_number(), 1);
        assert_eq!(flags.number_of_returns(), 1);
        assert_eq!(flags.scan_direction_flag(), 1);
        assert_eq!(flags.edge_of_flight_line(), 0);
    }

    #[test]
    fn test_extended_flags() {
        let flags = PulseFlags::Extended(0xF2, 0b1001_0101);
        assert_eq!(flags.return_number(), 2);
        assert_eq!(flags.number_of_returns(), 15);
        assert_eq!(flags.classification_flags(), Some(0b0101));
        assert_eq!(flags.scan_direction_flag(), 1);
        assert_eq!(flags.edge_of_flight_line(), 2);

        let flags = PulseFlags::Extended(0x00, 0xF0);
        assert_eq!(flags.scan_direction_flag(), 3);
        assert_eq!(flags.edge_of_flight_line(), 3);
        assert_eq!(flags.classification_flags(), Some(0));
    }

    #[test]
    fn test_classification_byte() {
        let classification = Classification(0b1010_0010);
        assert_eq!(classification.class_code(), 2);
        assert_eq!(classification.class(), AsprsClass::Ground);
        assert!(classification.is_synthetic());
        assert!(!classification.is_key_point());
        assert!(classification.is_withheld());

        let classification = Classification(0x5F);
        assert_eq!(classification.class_code(), 31);
        assert_eq!(classification.class(), AsprsClass::Other(31));
        assert!(classification.is_key_point());
        assert!(!classification.is_synthetic());
    }

    #[test]
    fn test_asprs_classes() {
        assert_eq!(AsprsClass::from_code(0), AsprsClass::CreatedNeverClassified);
        assert_eq!(AsprsClass::from_code(9), AsprsClass::Water);
        assert_eq!(AsprsClass::from_code(22), AsprsClass::TemporalExclusion);
        assert_eq!(AsprsClass::from_code(23), AsprsClass::Other(23));
    }

    #[test]
    fn test_scan_angle() {
        assert_eq!(ScanAngle::Rank(-12).degrees(), -12.0);
        assert!((ScanAngle::Scaled(15000).degrees() - 90.0).abs() < 1e-3);
        assert!((ScanAngle::Scaled(-5000).degrees() + 30.0).abs() < 1e-3);
    }
}
