#![deny(unused_must_use)]

pub mod geometry;
pub mod io;
pub mod las;

pub use nalgebra;
