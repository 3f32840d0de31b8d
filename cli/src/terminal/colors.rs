use colored::Color;

pub const PRIMARY: Color = Color::TrueColor {
    r: 129,
    g: 161,
    b: 193,
};
pub const SECONDARY: Color = Color::TrueColor {
    r: 180,
    g: 142,
    b: 173,
};
pub const ACCENT: Color = Color::TrueColor {
    r: 235,
    g: 203,
    b: 139,
};
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor {
    r: 216,
    g: 222,
    b: 233,
};
pub const REMOTE_LOG: Color = Color::TrueColor {
    r: 143,
    g: 150,
    b: 163,
};
pub const PUBLIC_ADDR: Color = Color::TrueColor {
    r: 136,
    g: 192,
    b: 208,
};
pub const MESH_ADDR: Color = Color::TrueColor {
    r: 163,
    g: 190,
    b: 140,
};
