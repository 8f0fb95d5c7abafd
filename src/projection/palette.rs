//! Deterministic series colours.

/// Line colours, cycled by series index.
const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

/// Colours of the Factual Error / Lie / Propaganda threshold lines.
pub const THRESHOLD_COLORS: [&str; 3] = ["green", "orange", "red"];

fn rgba(index: usize, alpha: f32) -> String {
    let (r, g, b) = PALETTE[index % PALETTE.len()];
    format!("rgba({}, {}, {}, {})", r, g, b, alpha)
}

/// Opaque colour for series `index`.
pub fn color_for(index: usize) -> String {
    rgba(index, 1.0)
}

/// Translucent fill matching [`color_for`].
pub fn fill_for(index: usize) -> String {
    rgba(index, 0.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_stable_and_cycles() {
        assert_eq!(color_for(0), "rgba(31, 119, 180, 1)");
        assert_eq!(color_for(0), color_for(PALETTE.len()));
        assert_ne!(color_for(0), color_for(1));
        assert_eq!(fill_for(2), "rgba(44, 160, 44, 0.2)");
    }
}
