//! Lookup tables for the HEALPix base faces and bit interleaving.
//!
//! The spread/compress tables are built on first use and never mutated, so any
//! number of threads can read them without synchronization.

use once_cell::sync::Lazy;

/// Ring index (in units of nside) of the southernmost corner of each base face.
pub(crate) const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];

/// Longitude index (in units of π/4) of the centre of each base face.
pub(crate) const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Offsets of the eight neighbours in face coordinates: SW, W, NW, N, NE, E, SE, S.
pub(crate) const XOFFSET: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
pub(crate) const YOFFSET: [i64; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

/// Face reached when stepping off a face edge.
///
/// Rows are indexed by the crossing direction (S, SE, E, SW, centre, NE, W, NW, N),
/// columns by the current face. `-1` marks a corner where no face exists.
pub(crate) const FACEARRAY: [[i8; 12]; 9] = [
    [8, 9, 10, 11, -1, -1, -1, -1, 10, 11, 8, 9],
    [5, 6, 7, 4, 8, 9, 10, 11, 9, 10, 11, 8],
    [-1, -1, -1, -1, 5, 6, 7, 4, -1, -1, -1, -1],
    [4, 5, 6, 7, 11, 8, 9, 10, 11, 8, 9, 10],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    [1, 2, 3, 0, 0, 1, 2, 3, 5, 6, 7, 4],
    [-1, -1, -1, -1, 7, 4, 5, 6, -1, -1, -1, -1],
    [3, 0, 1, 2, 3, 0, 1, 2, 4, 5, 6, 7],
    [2, 3, 0, 1, -1, -1, -1, -1, 0, 1, 2, 3],
];

/// Coordinate flips needed after crossing into a neighbouring face.
///
/// Bit 0 mirrors x, bit 1 mirrors y, bit 2 swaps x and y. Columns are the face
/// row (north, equatorial, south).
pub(crate) const SWAPARRAY: [[u8; 3]; 9] = [
    [0, 0, 3],
    [0, 0, 6],
    [0, 0, 0],
    [0, 0, 5],
    [0, 0, 0],
    [5, 0, 0],
    [0, 0, 0],
    [6, 0, 0],
    [3, 0, 0],
];

/// Spreads the 8 bits of a byte into the even bit positions of a `u16`.
static SPREAD_TABLE: Lazy<[u16; 256]> = Lazy::new(|| {
    let mut table = [0u16; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        let mut spread = 0u16;
        for bit in 0..8 {
            spread |= (((value >> bit) & 1) as u16) << (2 * bit);
        }
        *entry = spread;
    }
    table
});

/// Gathers the even bits of a byte into a nibble.
static COMPRESS_TABLE: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0u8; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        let mut compressed = 0u8;
        for bit in 0..4 {
            compressed |= (((value >> (2 * bit)) & 1) as u8) << bit;
        }
        *entry = compressed;
    }
    table
});

/// Interleaves the bits of `v` with zeros: bit `i` moves to bit `2i`.
#[inline]
pub(crate) fn spread_bits(v: u32) -> u64 {
    let table = &*SPREAD_TABLE;
    let mut result = 0u64;
    for byte in 0..4 {
        let chunk = ((v >> (8 * byte)) & 0xff) as usize;
        result |= (table[chunk] as u64) << (16 * byte);
    }
    result
}

/// Inverse of [`spread_bits`]: collects the even bits of `v`.
#[inline]
pub(crate) fn compress_bits(v: u64) -> u32 {
    let table = &*COMPRESS_TABLE;
    let mut result = 0u32;
    for byte in 0..8 {
        let chunk = ((v >> (8 * byte)) & 0xff) as usize;
        result |= (table[chunk] as u32) << (4 * byte);
    }
    result
}
