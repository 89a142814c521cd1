// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard Helvetica with WinAnsi encoding. Every PDF reader ships it, so it
// needs no font program and works when no outline font can be loaded.

use unicode_normalization::UnicodeNormalization;

pub const BASE_FONT: &str = "Helvetica";
pub const ASCENT: i16 = 718;
pub const DESCENT: i16 = -207;
pub const UNITS_PER_EM: u16 = 1000;
pub const DEFAULT_WIDTH: u16 = 556;

/// AFM advance widths for printable ASCII, 0x20 through 0x7E.
#[rustfmt::skip]
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0' .. '?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@' .. 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P' .. '_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`' .. 'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p' .. '~'
];

/// WinAnsi 0x80..=0x9F. `None` marks codes left undefined by the encoding.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

/// WinAnsi byte for a character, if the encoding has one.
pub fn encode_char(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|c| *c == Some(ch))
            .map(|i| 0x80 + i as u8),
    }
}

/// Character for a WinAnsi byte.
pub fn decode_byte(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
        0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize],
        b'\t' | b'\n' | b'\r' => Some(' '),
        _ => None,
    }
}

/// Advance width (1000 units per em) of the character behind a WinAnsi byte.
///
/// Accented Latin-1 letters take the width of their base letter.
pub fn width_of(byte: u8) -> u16 {
    if (0x20..=0x7E).contains(&byte) {
        return ASCII_WIDTHS[(byte - 0x20) as usize];
    }
    match decode_byte(byte) {
        Some('\u{A0}') => ASCII_WIDTHS[0],
        Some('—') | Some('…') | Some('‰') => 1000,
        Some('–') => 556,
        Some('‘') | Some('’') | Some('‚') => 222,
        Some('“') | Some('”') | Some('„') => 333,
        Some(ch) => ch
            .nfd()
            .next()
            .filter(|base| (0x20..=0x7E).contains(&(*base as u32)))
            .map(|base| ASCII_WIDTHS[(base as u32 - 0x20) as usize])
            .unwrap_or(DEFAULT_WIDTH),
        None => DEFAULT_WIDTH,
    }
}
