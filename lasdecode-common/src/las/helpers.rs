use byteorder::{ByteOrder, LittleEndian};

/// Reads a fixed-width, NUL padded string field.
///
/// The value is the first non-empty NUL separated chunk, so leading padding is
/// skipped as well. Invalid utf-8 is replaced.
pub fn read_las_string(las_str: &[u8]) -> String {
    las_str
        .split(|byte| *byte == 0)
        .find(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .unwrap_or_default()
}

/// Splits a payload at NUL bytes, dropping empty chunks.
pub fn split_nul_strings(payload: &[u8]) -> Vec<String> {
    payload
        .split(|byte| *byte == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Copies a fixed size array out of `bytes` at `offset`.
///
/// The caller guarantees that `bytes` is long enough.
pub fn array_at<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut array = [0; N];
    array.copy_from_slice(&bytes[offset..offset + N]);
    array
}

pub fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&bytes[offset..offset + 2])
}

pub fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&bytes[offset..offset + 4])
}

pub fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    LittleEndian::read_u64(&bytes[offset..offset + 8])
}

pub fn f64_at(bytes: &[u8], offset: usize) -> f64 {
    LittleEndian::read_f64(&bytes[offset..offset + 8])
}
