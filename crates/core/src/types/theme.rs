//! Storefront themes.
//!
//! A theme is a presentation variant: it picks a CSS class and a product card
//! skin. Checkout behavior never depends on it.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The nine visual themes a store can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Default,
    Fashion,
    Electronics,
    Beauty,
    Jewelry,
    Watches,
    Furniture,
    Cars,
    Perfume,
}

/// Product card layout used by a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardSkin {
    /// Image on top, details and button below.
    Classic,
    /// Details and button overlaid on the image on hover.
    Overlay,
    /// Text-forward card with a thin image and an inline link.
    Minimal,
    /// Bordered card with a separate detail block.
    Boxed,
}

impl Theme {
    pub const ALL: [Self; 9] = [
        Self::Default,
        Self::Fashion,
        Self::Electronics,
        Self::Beauty,
        Self::Jewelry,
        Self::Watches,
        Self::Furniture,
        Self::Cars,
        Self::Perfume,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Fashion => "fashion",
            Self::Electronics => "electronics",
            Self::Beauty => "beauty",
            Self::Jewelry => "jewelry",
            Self::Watches => "watches",
            Self::Furniture => "furniture",
            Self::Cars => "cars",
            Self::Perfume => "perfume",
        }
    }

    /// Parse a theme slug from store props, falling back to [`Theme::Default`].
    #[must_use]
    pub fn from_slug_or_default(slug: &str) -> Self {
        slug.parse().unwrap_or_default()
    }

    #[must_use]
    pub const fn card_skin(self) -> CardSkin {
        match self {
            Self::Default | Self::Electronics => CardSkin::Classic,
            Self::Fashion | Self::Beauty | Self::Perfume => CardSkin::Overlay,
            Self::Jewelry | Self::Watches => CardSkin::Minimal,
            Self::Furniture | Self::Cars => CardSkin::Boxed,
        }
    }

    /// CSS class applied to `<body>`.
    #[must_use]
    pub fn css_class(self) -> String {
        format!("theme-{}", self.slug())
    }
}

impl CardSkin {
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Overlay => "overlay",
            Self::Minimal => "minimal",
            Self::Boxed => "boxed",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        // Accept hyphenated slugs as well.
        let wanted = wanted.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|theme| theme.slug() == wanted)
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_roundtrip() {
        for theme in Theme::ALL {
            assert_eq!(theme.slug().parse::<Theme>().unwrap(), theme);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Jewelry".parse::<Theme>().unwrap(), Theme::Jewelry);
        assert_eq!(" CARS ".parse::<Theme>().unwrap(), Theme::Cars);
    }

    #[test]
    fn test_unknown_falls_back() {
        assert_eq!(Theme::from_slug_or_default("bakery"), Theme::Default);
        assert_eq!(Theme::from_slug_or_default(""), Theme::Default);
    }

    #[test]
    fn test_css_class() {
        assert_eq!(Theme::Perfume.css_class(), "theme-perfume");
    }

    #[test]
    fn test_every_theme_has_a_skin() {
        let skins: Vec<_> = Theme::ALL.iter().map(|t| t.card_skin()).collect();
        assert!(skins.contains(&CardSkin::Classic));
        assert!(skins.contains(&CardSkin::Overlay));
        assert!(skins.contains(&CardSkin::Minimal));
        assert!(skins.contains(&CardSkin::Boxed));
    }
}
