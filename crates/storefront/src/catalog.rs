//! Colour and size variants offered on the purchase form.

use rafal_core::{ColorHex, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;

/// A named colour swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorOption {
    pub name: &'static str,
    pub hex: &'static str,
}

impl ColorOption {
    #[must_use]
    pub fn color_hex(&self) -> ColorHex {
        ColorHex::or_black(Some(self.hex)).unwrap_or_default()
    }
}

/// The colours and sizes available for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Variants {
    pub colors: &'static [ColorOption],
    pub sizes: &'static [&'static str],
}

/// The buyer's current colour and size choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub color: Option<ColorOption>,
    pub size: Option<&'static str>,
}

impl Selection {
    /// The colour to submit; black when nothing is selected.
    #[must_use]
    pub fn color_hex(&self) -> ColorHex {
        self.color.map_or_else(ColorHex::black, |c| c.color_hex())
    }
}

const fn color(name: &'static str, hex: &'static str) -> ColorOption {
    ColorOption { name, hex }
}

const BLACK: ColorOption = color("Black", "#000000");
const WHITE: ColorOption = color("White", "#ffffff");
const PINK: ColorOption = color("Pink", "#ffc0cb");
const SILVER: ColorOption = color("Silver", "#c0c0c0");
const BLUE: ColorOption = color("Blue", "#0000ff");
const RED: ColorOption = color("Red", "#ff0000");

const STANDARD: &[&str] = &["Standard"];

static VARIANTS: [Variants; 8] = [
    Variants {
        colors: &[BLACK, WHITE, PINK],
        sizes: STANDARD,
    },
    Variants {
        colors: &[SILVER, BLACK],
        sizes: &["5L", "7L"],
    },
    Variants {
        colors: &[BLUE, WHITE],
        sizes: STANDARD,
    },
    Variants {
        colors: &[RED, BLACK, WHITE],
        sizes: &["1.5L", "2L"],
    },
    Variants {
        colors: &[SILVER, BLACK],
        sizes: &["12 Cup", "15 Cup"],
    },
    Variants {
        colors: &[RED, BLUE],
        sizes: STANDARD,
    },
    Variants {
        colors: &[SILVER, BLACK],
        sizes: &["25L", "30L"],
    },
    Variants {
        colors: &[SILVER, WHITE],
        sizes: &["1.7L"],
    },
];

/// Variants for a product, or `None` when it has no colour or size choice.
#[must_use]
pub fn variants(product_id: ProductId) -> Option<&'static Variants> {
    let index = usize::try_from(product_id.as_i64().checked_sub(1)?).ok()?;
    VARIANTS.get(index)
}

/// The first colour and first size, which the form starts with.
#[must_use]
pub fn default_selection(product_id: ProductId) -> Selection {
    variants(product_id).map_or(
        Selection {
            color: None,
            size: None,
        },
        |v| Selection {
            color: v.colors.first().copied(),
            size: v.sizes.first().copied(),
        },
    )
}

/// Surcharge shown on the purchase form for premium finishes and larger
/// capacities.
#[must_use]
pub fn price_adjustment(selection: &Selection) -> Decimal {
    let mut extra = Decimal::ZERO;
    if selection
        .color
        .is_some_and(|c| matches!(c.name, "Pink" | "White"))
    {
        extra += Decimal::from(50);
    }
    if selection
        .size
        .is_some_and(|s| matches!(s, "7L" | "15 Cup" | "30L"))
    {
        extra += Decimal::from(100);
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_products() {
        let kettle = variants(ProductId::new(4));
        assert!(kettle.is_some_and(|v| v.colors.len() == 3 && v.sizes == ["1.5L", "2L"]));
        assert!(variants(ProductId::new(8)).is_some_and(|v| v.sizes == ["1.7L"]));
    }

    #[test]
    fn test_unknown_products() {
        assert!(variants(ProductId::new(0)).is_none());
        assert!(variants(ProductId::new(9)).is_none());
        assert!(variants(ProductId::new(-3)).is_none());

        let selection = default_selection(ProductId::new(42));
        assert_eq!(selection.color, None);
        assert_eq!(selection.color_hex().as_str(), "#000000");
    }

    #[test]
    fn test_default_selection() {
        let selection = default_selection(ProductId::new(2));
        assert_eq!(selection.color.map(|c| c.name), Some("Silver"));
        assert_eq!(selection.size, Some("5L"));
        assert_eq!(selection.color_hex().as_str(), "#c0c0c0");
    }

    #[test]
    fn test_price_adjustment() {
        let base = default_selection(ProductId::new(2));
        assert_eq!(price_adjustment(&base), Decimal::ZERO);

        let upgraded = Selection {
            color: Some(WHITE),
            size: Some("7L"),
        };
        assert_eq!(price_adjustment(&upgraded), Decimal::from(150));
    }
}
