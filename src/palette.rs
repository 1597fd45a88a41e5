use egui::Color32;

/// Swatches offered in the side panel, in display order.
pub const PEN_COLORS: [&str; 12] = [
    "#000000", "#ffffff", "#ee3333", "#e64980", "#be4bdb", "#893200",
    "#228be6", "#3333ee", "#40c057", "#00aa00", "#fab005", "#fd7e14",
];

/// Stroke color before the user picks a swatch.
pub const DEFAULT_PEN: Color32 = Color32::WHITE;

/// Canvas backdrop painted behind the (transparent) ink buffer.
pub const CANVAS_BACKDROP: Color32 = Color32::from_rgb(0x18, 0x18, 0x1b);

/// Parse `#rrggbb` (the leading `#` is optional) into an opaque color.
pub fn parse_hex(s: &str) -> Option<Color32> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

/// The parsed swatch list.
pub fn swatches() -> Vec<Color32> {
    PEN_COLORS.iter().filter_map(|h| parse_hex(h)).collect()
}
