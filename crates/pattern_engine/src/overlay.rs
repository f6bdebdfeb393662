//! Seven-segment frame counter burned into the top-left corner
//!
//! Segment numbering: 0 top, 1 upper-left, 2 upper-right, 3 middle,
//! 4 lower-left, 5 lower-right, 6 bottom. Each digit occupies a 20x20 cell
//! starting at (2, 2) with a zeroed background.

use contracts::FrameBuffer;

use crate::samples::{read_raw, write_raw_xy};

const CELL: u32 = 20;
const ORIGIN_X: u32 = 2;
const ORIGIN_Y: u32 = 2;

/// Lit segments per digit
const SEVEN_SEGMENT_RULES: [u8; 10] = [
    1 | 2 | 4 | 16 | 32 | 64,
    4 | 32,
    1 | 4 | 8 | 16 | 64,
    1 | 4 | 8 | 32 | 64,
    2 | 4 | 8 | 32,
    1 | 2 | 8 | 32 | 64,
    2 | 8 | 16 | 32 | 64,
    1 | 4 | 32,
    127,
    1 | 2 | 4 | 8 | 32 | 64,
];
const HORIZONTAL: [bool; 7] = [true, false, false, true, false, false, true];
const X_OFFSET: [u32; 7] = [0, 0, 1, 0, 0, 1, 0];
const Y_OFFSET: [u32; 7] = [0, 0, 0, 1, 1, 1, 2];

fn cell_origin(position: usize) -> (u32, u32) {
    (position as u32 * CELL + ORIGIN_X, ORIGIN_Y)
}

fn segment_start(x_base: u32, y_base: u32, segment: usize) -> (u32, u32) {
    (
        x_base + X_OFFSET[segment] * 16,
        y_base + Y_OFFSET[segment] * 8 + 1,
    )
}

/// Draw `number` with segments set to `lit_raw`
pub(crate) fn draw(buffer: &mut FrameBuffer, number: u64, lit_raw: u64) {
    for (position, ch) in number.to_string().chars().enumerate() {
        let digit = ch.to_digit(10).unwrap_or(0) as usize;
        let (x_base, y_base) = cell_origin(position);

        for y in y_base..y_base + CELL {
            for x in x_base..x_base + CELL {
                write_raw_xy(buffer, x, y, 0);
            }
        }

        for segment in 0..7 {
            if SEVEN_SEGMENT_RULES[digit] & (1 << segment) == 0 {
                continue;
            }
            let (x_start, y_start) = segment_start(x_base, y_base, segment);
            let (len, dx, dy) = if HORIZONTAL[segment] { (16, 1, 0) } else { (8, 0, 1) };
            for step in 0..len {
                write_raw_xy(buffer, x_start + step * dx, y_start + step * dy, lit_raw);
            }
        }
    }
}

fn raw_at(buffer: &FrameBuffer, x: u32, y: u32) -> Option<u64> {
    (x < buffer.width() && y < buffer.height())
        .then(|| read_raw(buffer, y as usize * buffer.width() as usize + x as usize))
}

/// Read back the counter drawn by the overlay
///
/// Returns `None` when no digit cell is found at the origin.
pub fn decode_frame_number(buffer: &FrameBuffer) -> Option<u64> {
    let mut number: Option<u64> = None;

    for position in 0.. {
        match decode_digit(buffer, position) {
            Some(digit) => number = Some(number.unwrap_or(0) * 10 + digit),
            None => break,
        }
    }

    number
}

fn decode_digit(buffer: &FrameBuffer, position: usize) -> Option<u64> {
    let (x_base, y_base) = cell_origin(position);
    // two background points that no segment touches
    if raw_at(buffer, x_base + 8, y_base + 5)? != 0 || raw_at(buffer, x_base + 10, y_base + 13)? != 0
    {
        return None;
    }

    let mut mask = 0u8;
    for segment in 0..7 {
        let (x_start, y_start) = segment_start(x_base, y_base, segment);
        let (x, y) = if HORIZONTAL[segment] {
            (x_start + 8, y_start)
        } else {
            (x_start, y_start + 4)
        };
        if raw_at(buffer, x, y)? != 0 {
            mask |= 1 << segment;
        }
    }

    SEVEN_SEGMENT_RULES
        .iter()
        .position(|rule| *rule == mask)
        .map(|digit| digit as u64)
}
