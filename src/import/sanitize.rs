// src/import/sanitize.rs

/// Cleans one spreadsheet text cell for persistence.
///
/// * strips ASCII control characters (0x00-0x08, 0x0B, 0x0C, 0x0E-0x1F,
///   0x7F) while keeping tab/newline and every printable Unicode symbol
///   (mathematical notation, currency signs, fraction glyphs, sub/super
///   scripts pass through untouched),
/// * normalizes curly double and single quotes to their straight ASCII
///   equivalents,
/// * trims surrounding whitespace.
///
/// Input is already valid UTF-8 here; byte-level coercion happens when the
/// file is decoded (see `reader::decode_to_utf8`).
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            c if is_stripped_control(c) => {}
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(
        c,
        '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}' | '\u{007F}'
    )
}
