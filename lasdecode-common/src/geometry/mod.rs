pub mod coordinate_system;
pub mod projector;
