// Pixel-art catalog: 5x5 wind glyphs and 8x8 animated icons
//
// Bitmaps are stored one byte per row, most significant used bit leftmost.

/// 8x8 icon, bit 7 is the leftmost column.
pub type Icon = [u8; 8];

/// 5x5 glyph, bit 4 is the leftmost column.
pub type SmallGlyph = [u8; 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Sun,
    Cloud,
    Rain,
    Snow,
    Lightning,
    Fog,
    Airplane,
}

const SUN: [Icon; 2] = [
    [0x18, 0x00, 0x3C, 0xBD, 0xBD, 0x3C, 0x00, 0x18],
    [0x81, 0x42, 0x3C, 0x3C, 0x3C, 0x3C, 0x42, 0x81],
];

const CLOUD: [Icon; 1] = [[0x00, 0x1C, 0x3E, 0x7F, 0xFF, 0x7E, 0x00, 0x00]];

// Precipitation overlays only use the rows under the cloud.
const RAIN: [Icon; 3] = [
    [0, 0, 0, 0, 0, 0x44, 0x11, 0x44],
    [0, 0, 0, 0, 0, 0x22, 0x88, 0x22],
    [0, 0, 0, 0, 0, 0x11, 0x44, 0x11],
];

const SNOW: [Icon; 2] = [
    [0, 0, 0, 0, 0, 0x42, 0x00, 0x24],
    [0, 0, 0, 0, 0, 0x24, 0x00, 0x42],
];

const LIGHTNING: [Icon; 2] = [[0, 0, 0, 0, 0, 0x10, 0x18, 0x08], [0; 8]];

const FOG: [Icon; 2] = [
    [0x00, 0xFC, 0x00, 0x3F, 0x00, 0xFC, 0x00, 0x3F],
    [0x00, 0x3F, 0x00, 0xFC, 0x00, 0x3F, 0x00, 0xFC],
];

const AIRPLANE: [Icon; 1] = [[0x18, 0x18, 0x3C, 0xFF, 0x18, 0x18, 0x3C, 0x00]];

/// Arrows for the eight compass points, clockwise from north.
const ARROWS: [SmallGlyph; 8] = [
    [0b00100, 0b01110, 0b10101, 0b00100, 0b00100],
    [0b01111, 0b00011, 0b00101, 0b01001, 0b10000],
    [0b00100, 0b00010, 0b11111, 0b00010, 0b00100],
    [0b10000, 0b01001, 0b00101, 0b00011, 0b01111],
    [0b00100, 0b00100, 0b10101, 0b01110, 0b00100],
    [0b00001, 0b10010, 0b10100, 0b11000, 0b11110],
    [0b00100, 0b01000, 0b11111, 0b01000, 0b00100],
    [0b11110, 0b11000, 0b10100, 0b10010, 0b00001],
];

/// Neutral ring used when a value is variable or missing.
pub const PLACEHOLDER_RING: SmallGlyph = [0b01110, 0b10001, 0b10001, 0b10001, 0b01110];

/// Animation frames for an icon. Always at least one.
pub fn icon_frames(kind: IconKind) -> &'static [Icon] {
    match kind {
        IconKind::Sun => &SUN,
        IconKind::Cloud => &CLOUD,
        IconKind::Rain => &RAIN,
        IconKind::Snow => &SNOW,
        IconKind::Lightning => &LIGHTNING,
        IconKind::Fog => &FOG,
        IconKind::Airplane => &AIRPLANE,
    }
}

/// Arrow pointing the way the wind blows, for a wind reported *from* `direction_deg`.
pub fn wind_arrow(direction_deg: u16) -> SmallGlyph {
    let downwind = (u32::from(direction_deg) + 180) % 360;
    let sector = ((downwind + 22) % 360) / 45;
    ARROWS[sector as usize]
}
