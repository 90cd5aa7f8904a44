use crate::map::DARKNESS_FULL_BRIGHT;

/// Translucent overlay for squares outside the map or remembered from earlier
/// visits.
pub const FOG_OF_WAR_COLOR: [u8; 4] = [0, 0, 128, 128];

/// Alpha of the overlay for a fully dark square, in tenths of the level range.
pub const MAX_DARKNESS_ALPHA_TENTHS: u32 = 7;

/// Overlay colors for every darkness level, built once per compositor.
#[derive(Debug, Clone)]
pub struct DarknessPalette {
    colors: [[u8; 4]; 256],
}

impl Default for DarknessPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl DarknessPalette {
    pub fn new() -> Self {
        let mut colors = [[0u8; 4]; 256];
        for (level, color) in colors.iter_mut().enumerate() {
            let shade = u32::from(DARKNESS_FULL_BRIGHT).saturating_sub(level as u32);
            let alpha = (shade * MAX_DARKNESS_ALPHA_TENTHS + 5) / 10;
            *color = [0, 0, 0, alpha.min(255) as u8];
        }
        Self { colors }
    }

    /// Returns `None` for full bright; levels above full bright count as full bright.
    pub fn color(&self, level: u16) -> Option<[u8; 4]> {
        if level >= DARKNESS_FULL_BRIGHT {
            return None;
        }
        Some(self.colors[level as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_bright_has_no_overlay() {
        let palette = DarknessPalette::new();
        assert_eq!(palette.color(255), None);
        assert_eq!(palette.color(400), None);
    }

    #[test]
    fn alpha_grows_as_level_drops() {
        let palette = DarknessPalette::new();
        let mut previous = 0u8;
        for level in (0..255u16).rev() {
            let color = palette.color(level).expect("overlay below full bright");
            assert_eq!(&color[..3], &[0, 0, 0]);
            assert!(color[3] >= previous, "level={level}");
            previous = color[3];
        }
        assert_eq!(palette.color(0), Some([0, 0, 0, 179]));
        assert_eq!(palette.color(254), Some([0, 0, 0, 1]));
    }

    #[test]
    fn fog_is_translucent_blue() {
        assert_eq!(FOG_OF_WAR_COLOR, [0, 0, 128, 128]);
    }
}
