//! Player colors. A color is both a player's identity marker and the
//! content of an occupied board cell.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Lime,
    Green,
    Blue,
    Pink,
    Purple,
}

impl Color {
    /// Every color in declaration order. The roster capacity matches its length.
    pub const ALL: [Color; 8] = [
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Lime,
        Color::Green,
        Color::Blue,
        Color::Pink,
        Color::Purple,
    ];

    /// Display value used by clients when painting pieces
    pub fn hex(self) -> &'static str {
        match self {
            Color::Red => "#E74C3C",
            Color::Orange => "#E67E22",
            Color::Yellow => "#F1C40F",
            Color::Lime => "#2ECC71",
            Color::Green => "#27AE60",
            Color::Blue => "#3498DB",
            Color::Pink => "#F472D0",
            Color::Purple => "#9B59B6",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Lime => "lime",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Pink => "pink",
            Color::Purple => "purple",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_colors_are_distinct() {
        let unique: HashSet<Color> = Color::ALL.iter().copied().collect();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_hex_values() {
        assert_eq!(Color::Red.hex(), "#E74C3C");
        assert_eq!(Color::Purple.hex(), "#9B59B6");

        for color in Color::ALL {
            let hex = color.hex();
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Color::Lime.to_string(), "lime");
        assert_eq!(Color::Blue.to_string(), "blue");
    }
}
