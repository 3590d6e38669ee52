//! Catalog rules: field validation, search filters, and the default
//! assortment used to bootstrap an empty store.

use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::types::Quantity;

/// Maximum length for sweet names and categories.
pub const MAX_LABEL_LEN: usize = 100;

/// Largest price the catalog stores (`NUMERIC(10, 2)`): 99999999.99, as the
/// 96-bit mantissa 9_999_999_999 split into 32-bit words.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Validate a name or category label.
pub fn validate_label(field: &str, value: &str) -> Result<(), CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_LABEL_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<(), CoreError> {
    if price > MAX_PRICE {
        return Err(CoreError::Validation(format!(
            "Price must not exceed {MAX_PRICE}, got {price}"
        )));
    }
    if price < Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "Price must not be negative, got {price}"
        )));
    }
    if price.scale() > 2 && price.round_dp(2) != price {
        return Err(CoreError::Validation(format!(
            "Price must have at most two decimal places, got {price}"
        )));
    }
    Ok(())
}

pub fn validate_stock(quantity: Quantity) -> Result<(), CoreError> {
    if quantity < 0 {
        return Err(CoreError::Validation(format!(
            "Quantity must not be negative, got {quantity}"
        )));
    }
    Ok(())
}

/// Validate a price range filter. Either bound may be absent.
pub fn validate_price_range(
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
) -> Result<(), CoreError> {
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            return Err(CoreError::Validation(format!(
                "min_price ({min}) must not exceed max_price ({max})"
            )));
        }
    }
    Ok(())
}

/// Escape `%`, `_` and `\` so user input can be embedded in an `ILIKE`
/// pattern as a literal substring.
pub fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// One row of the default assortment.
#[derive(Debug, Clone, Copy)]
pub struct SeedSweet {
    pub name: &'static str,
    pub category: &'static str,
    pub price_cents: i64,
    pub quantity: Quantity,
}

impl SeedSweet {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }
}

const fn seed(
    name: &'static str,
    category: &'static str,
    price_cents: i64,
    quantity: Quantity,
) -> SeedSweet {
    SeedSweet {
        name,
        category,
        price_cents,
        quantity,
    }
}

/// Default assortment inserted when the catalog is empty at startup.
pub const DEFAULT_CATALOG: &[SeedSweet] = &[
    seed("Gummy Bears", "Gummies", 499, 20),
    seed("Chocolate Truffles", "Chocolate", 699, 15),
    seed("Lollipops", "Hard Candy", 199, 50),
    seed("Marshmallows", "Soft Candy", 349, 25),
    seed("Licorice Strips", "Licorice", 299, 30),
    seed("Caramel Cubes", "Caramel", 549, 18),
    seed("Jelly Beans", "Gummies", 399, 40),
    seed("Peppermint Bark", "Chocolate", 799, 12),
    seed("Rock Candy", "Hard Candy", 449, 22),
    seed("Toffees", "Candy", 599, 19),
    seed("Swedish Fish", "Gummies", 449, 35),
    seed("Butterscotch Drops", "Hard Candy", 249, 45),
    seed("Fudge Squares", "Chocolate", 649, 14),
    seed("Taffy Assortment", "Soft Candy", 599, 20),
    seed("Cotton Candy", "Spun Sugar", 399, 28),
    seed("Sour Gummy Worms", "Gummies", 349, 32),
    seed("Chocolate Covered Cherries", "Chocolate", 749, 11),
    seed("Jawbreaker", "Hard Candy", 99, 60),
    seed("Candy Corn", "Seasonal", 299, 38),
    seed("Malt Balls", "Chocolate", 599, 25),
];

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn labels_must_be_non_blank() {
        assert!(validate_label("name", "Toffees").is_ok());
        assert_matches!(validate_label("name", "   "), Err(CoreError::Validation(_)));
        let long = "x".repeat(MAX_LABEL_LEN + 1);
        assert_matches!(validate_label("name", &long), Err(CoreError::Validation(_)));
    }

    #[test]
    fn price_rules() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from_str("4.99").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("4.990").unwrap()).is_ok());
        assert_matches!(
            validate_price(Decimal::from_str("-0.01").unwrap()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_price(Decimal::from_str("1.999").unwrap()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn price_must_fit_the_stored_column() {
        assert_eq!(MAX_PRICE, Decimal::from_str("99999999.99").unwrap());
        assert!(validate_price(MAX_PRICE).is_ok());
        assert_matches!(
            validate_price(Decimal::from_str("100000000.00").unwrap()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn price_range_must_be_ordered() {
        let one = Some(Decimal::ONE);
        let two = Some(Decimal::TWO);
        assert!(validate_price_range(one, two).is_ok());
        assert!(validate_price_range(None, two).is_ok());
        assert_matches!(
            validate_price_range(two, one),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("gum"), "%gum%");
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }

    #[test]
    fn default_catalog_is_valid() {
        assert_eq!(DEFAULT_CATALOG.len(), 20);
        for item in DEFAULT_CATALOG {
            validate_label("name", item.name).unwrap();
            validate_label("category", item.category).unwrap();
            validate_price(item.price()).unwrap();
            validate_stock(item.quantity).unwrap();
        }
        assert_eq!(DEFAULT_CATALOG[0].price(), Decimal::from_str("4.99").unwrap());
    }
}
