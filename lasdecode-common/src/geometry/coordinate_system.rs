use nalgebra::{vector, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// The coordinate system is used to convert between
/// the stored integer coordinates and actual "world coordinates".
#[derive(Debug, Clone, PartialEq, Copy, Serialize, Deserialize)]
pub struct CoordinateSystem {
    scale: Vector3<f64>,
    offset: Vector3<f64>,
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::new_identity()
    }
}

impl CoordinateSystem {
    /// Construct a new coordinate system with unit scale and no offset
    pub fn new_identity() -> Self {
        CoordinateSystem {
            scale: vector![1.0, 1.0, 1.0],
            offset: vector![0.0, 0.0, 0.0],
        }
    }

    /// Construct a new coordinate system with the given scale and offset
    pub fn from_las_transform(scale: Vector3<f64>, offset: Vector3<f64>) -> Self {
        CoordinateSystem { scale, offset }
    }

    pub fn scale(&self) -> &Vector3<f64> {
        &self.scale
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    /// `offset + raw * scale`, per axis.
    pub fn decode_position(&self, pos: Point3<i32>) -> Point3<f64> {
        let pos_f64 = pos.map(f64::from).coords;
        (self.offset + pos_f64.component_mul(&self.scale)).into()
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::coordinate_system::CoordinateSystem;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn int_position_decode_las() {
        let coordinate_system = CoordinateSystem::from_las_transform(
            Vector3::new(0.01, 0.01, 0.01),
            Vector3::new(5.0, 5.0, 5.0),
        );
        let global = coordinate_system.decode_position(Point3::new(-200, 1, 2));
        assert_eq!(global, Point3::new(3.0, 5.01, 5.02));
    }

    #[test]
    fn axes_are_independent() {
        let coordinate_system = CoordinateSystem::from_las_transform(
            Vector3::new(1.0, 0.5, 0.25),
            Vector3::new(0.0, 10.0, -10.0),
        );
        let global = coordinate_system.decode_position(Point3::new(4, 4, 4));
        assert_eq!(global, Point3::new(4.0, 12.0, -9.0));
    }

    #[test]
    fn identity() {
        let global = CoordinateSystem::default().decode_position(Point3::new(i32::MIN, 0, i32::MAX));
        assert_eq!(global, Point3::new(-2147483648.0, 0.0, 2147483647.0));
    }
}
