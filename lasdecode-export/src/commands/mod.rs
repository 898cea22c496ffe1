pub mod info;
pub mod txt;
