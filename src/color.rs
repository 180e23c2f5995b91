use palette::{Hsl, IntoColor, Srgb};

use crate::data::codes::CATEGORY_RANGE;

// ---------------------------------------------------------------------------
// Colour palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Product colour swatches
// ---------------------------------------------------------------------------

const SWATCHES: [(u8, u8, u8); 14] = [
    (0xf5, 0xf5, 0xdc), // beige
    (0x1a, 0x1a, 0x1a), // black
    (0x1f, 0x5f, 0xbf), // blue
    (0x8b, 0x5a, 0x2b), // brown
    (0x80, 0x00, 0x20), // burgundy
    (0x80, 0x80, 0x80), // gray
    (0x2e, 0x8b, 0x57), // green
    (0x00, 0x00, 0x80), // navy blue
    (0xc0, 0x7f, 0xc0), // of many colors
    (0x80, 0x80, 0x00), // olive
    (0xff, 0xb6, 0xc1), // pink
    (0xd0, 0x20, 0x20), // red
    (0x8a, 0x2b, 0xe2), // violet
    (0xff, 0xff, 0xff), // white
];

/// Swatch for a product colour code, grey for unknown codes.
pub fn swatch(colour: i64) -> Srgb<u8> {
    usize::try_from(colour)
        .ok()
        .and_then(|c| c.checked_sub(1))
        .and_then(|i| SWATCHES.get(i))
        .map(|&(r, g, b)| Srgb::new(r, g, b))
        .unwrap_or_else(|| Srgb::new(0x80, 0x80, 0x80))
}

/// Series colour for a product category, one palette hue per category code.
pub fn category_colour(category: i64) -> Srgb<u8> {
    let palette = generate_palette(*CATEGORY_RANGE.end() as usize);
    usize::try_from(category)
        .ok()
        .and_then(|c| c.checked_sub(1))
        .and_then(|i| palette.get(i).copied())
        .unwrap_or_else(|| Srgb::new(0x80, 0x80, 0x80))
}

pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}
