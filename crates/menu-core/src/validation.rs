//! Field sanitization and validation for menu input.
//!
//! Everything here is pure. Rejections come back as values; callers decide
//! what to tell the operator.

use std::collections::HashSet;

use menu_shared::constants::{
    MAX_DESCRIPTION_LENGTH, MAX_ITEM_NAME_LENGTH, MAX_PRICE_CENTS, MIN_ITEM_NAME_LENGTH,
    MIN_PRICE_CENTS,
};
use menu_shared::utils::slugify;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::domain::{Catalog, Price};
use crate::error::ValidationError;

/// A complete tag, or an unterminated `<...` running to the end of input.
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").expect("static regex"));

const NAME_PUNCTUATION: &[char] = &['-', '.', ',', '&', '\''];

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c.is_whitespace() || NAME_PUNCTUATION.contains(&c)
}

pub fn strip_markup(raw: &str) -> String {
    MARKUP.replace_all(raw, "").into_owned()
}

/// Strips markup, drops characters outside the allowed set and trims.
pub fn sanitize_name(raw: &str) -> String {
    strip_markup(raw)
        .trim()
        .chars()
        .filter(|c| is_name_char(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (MIN_ITEM_NAME_LENGTH..=MAX_ITEM_NAME_LENGTH).contains(&len) && name.chars().all(is_name_char)
}

/// Strips markup, trims and silently truncates to the description limit.
pub fn sanitize_description(raw: &str) -> String {
    let stripped = strip_markup(raw);
    let trimmed = stripped.trim();
    match trimmed.char_indices().nth(MAX_DESCRIPTION_LENGTH) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Rounds half away from zero at the cent. The value is first snapped to
/// six decimal places of a cent so binary representation error
/// (`24.995 * 100 == 2499.4999…`) does not decide the rounding direction.
pub fn round_to_cents(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value * 100.0;
    let snapped = (scaled * 1e6).round() / 1e6;
    Some(snapped.round() as i64)
}

/// Parses a submitted price and rounds it to cents.
pub fn validate_price(raw: &str) -> Result<Price, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidPrice)?;
    validate_price_value(value)
}

pub fn validate_price_value(value: f64) -> Result<Price, ValidationError> {
    let cents = round_to_cents(value).ok_or(ValidationError::InvalidPrice)?;
    if cents < i64::from(MIN_PRICE_CENTS) || cents > i64::from(MAX_PRICE_CENTS) {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(Price::from_cents(cents as u32))
}

/// True iff an active category with this id exists.
pub fn is_valid_category(category_id: &str, catalog: &Catalog) -> bool {
    catalog
        .category(category_id)
        .map(|c| c.active)
        .unwrap_or(false)
}

/// Checks what every stored catalog must satisfy: unique non-empty ids,
/// markup-free names and descriptions, prices inside the allowed range.
/// Returns the first violation found.
pub fn check_catalog(catalog: &Catalog) -> Result<(), String> {
    let mut category_ids = HashSet::new();
    let mut item_ids = HashSet::new();

    for category in &catalog.categories {
        if category.id.is_empty() || !category_ids.insert(category.id.as_str()) {
            return Err(format!("duplicate or empty category id '{}'", category.id));
        }
        if category.name.trim().is_empty() || MARKUP.is_match(&category.name) {
            return Err(format!("category {} has an invalid name", category.id));
        }

        for item in &category.items {
            if item.id.is_empty() || !item_ids.insert(item.id.as_str()) {
                return Err(format!("duplicate or empty item id '{}'", item.id));
            }
            if !is_valid_name(&item.name) {
                return Err(format!("item {} has an invalid name", item.id));
            }
            if MARKUP.is_match(&item.description)
                || item.description.chars().count() > MAX_DESCRIPTION_LENGTH
            {
                return Err(format!("item {} has an invalid description", item.id));
            }
            if !item.price.is_within_bounds() {
                return Err(format!("item {} has an out-of-range price {}", item.id, item.price));
            }
        }
    }
    Ok(())
}

/// Slug of the name plus a random suffix, e.g. `grilled-steak-3f9a1c07`.
pub fn generate_item_id(name: &str) -> String {
    let slug = slugify(name);
    let slug = if slug.is_empty() { "item".to_string() } else { slug };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Item};

    #[test]
    fn test_check_catalog() {
        let mut catalog = Catalog::with_default_categories();
        assert!(check_catalog(&catalog).is_ok());

        let steak = Item::new(
            "steak-1".to_string(),
            "Steak".to_string(),
            "Grilled".to_string(),
            Price::from_cents(2500),
            1,
        )
        .unwrap();
        catalog.category_mut("mains").unwrap().items.push(steak.clone());
        assert!(check_catalog(&catalog).is_ok());

        let mut free = catalog.clone();
        free.find_item_mut("steak-1").unwrap().price = Price::from_cents(0);
        assert!(check_catalog(&free).unwrap_err().contains("price"));

        let mut pricey = catalog.clone();
        pricey.find_item_mut("steak-1").unwrap().price = Price::from_cents(100_000);
        assert!(check_catalog(&pricey).is_err());

        let mut tagged = catalog.clone();
        tagged.find_item_mut("steak-1").unwrap().name = "<b>Free</b>".to_string();
        assert!(check_catalog(&tagged).unwrap_err().contains("name"));

        let mut scripted = catalog.clone();
        scripted.find_item_mut("steak-1").unwrap().description = "<script>x</script>".to_string();
        assert!(check_catalog(&scripted).is_err());

        let mut twice = catalog.clone();
        twice.category_mut("sides").unwrap().items.push(steak);
        assert!(check_catalog(&twice).unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_sanitize_name_strips_markup() {
        assert_eq!(sanitize_name("  <b>Fish</b> & Chips "), "Fish & Chips");
        assert_eq!(sanitize_name("Steak<script>alert(1)</script>"), "Steakalert1");
        assert_eq!(sanitize_name("Chef's Special!!"), "Chef's Special");
        assert_eq!(sanitize_name("Soup <unclosed"), "Soup");
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("Fish & Chips"));
        assert!(is_valid_name("Crème Brûlée"));
        assert!(is_valid_name("No. 5, House-made"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(&"a".repeat(101)));
        assert!(is_valid_name(&"a".repeat(100)));
        assert!(!is_valid_name("Steak <b>"));
        assert!(!is_valid_name("Steak!"));
    }

    #[test]
    fn test_sanitize_description_truncates() {
        let long = "x".repeat(600);
        assert_eq!(sanitize_description(&long).chars().count(), 500);

        let accented = "é".repeat(501);
        assert_eq!(sanitize_description(&accented).chars().count(), 500);

        assert_eq!(sanitize_description(" <p>Grilled</p> "), "Grilled");
    }

    #[test]
    fn test_validate_price_bounds() {
        assert_eq!(validate_price("0.01").unwrap().cents(), 1);
        assert_eq!(validate_price("999.99").unwrap().cents(), 99_999);
        assert_eq!(validate_price(" 12.5 ").unwrap().cents(), 1250);

        for bad in ["0", "-1", "0.004", "1000", "999.995", "NaN", "inf", "abc", ""] {
            assert_eq!(validate_price(bad), Err(ValidationError::InvalidPrice), "{}", bad);
        }
    }

    #[test]
    fn test_validate_price_rounds_half_up() {
        assert_eq!(validate_price("24.999").unwrap().cents(), 2500);
        assert_eq!(validate_price("24.995").unwrap().cents(), 2500);
        assert_eq!(validate_price("24.994").unwrap().cents(), 2499);
        assert_eq!(validate_price("0.005").unwrap().cents(), 1);
        assert_eq!(validate_price("1.005").unwrap().cents(), 101);
        assert_eq!(validate_price("999.994").unwrap().cents(), 99_999);
    }

    #[test]
    fn test_validate_price_accepts_iff_rounded_in_range() {
        let mut value = -0.5_f64;
        while value < 1001.0 {
            let rounded = round_to_cents(value).unwrap();
            let accepted = validate_price_value(value).is_ok();
            assert_eq!(accepted, (1..=99_999).contains(&rounded), "value {}", value);
            value += 0.137;
        }
        assert!(validate_price_value(f64::NAN).is_err());
        assert!(validate_price_value(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_is_valid_category() {
        let mut catalog = Catalog::with_default_categories();
        assert!(is_valid_category("mains", &catalog));
        assert!(!is_valid_category("drinks", &catalog));

        let mut closed = Category::new("brunch", "Brunch", None, 4);
        closed.active = false;
        catalog.categories.push(closed);
        assert!(!is_valid_category("brunch", &catalog));
    }

    #[test]
    fn test_generate_item_id() {
        let id = generate_item_id("Grilled  Steak!");
        assert!(id.starts_with("grilled-steak-"));
        assert_eq!(id.len(), "grilled-steak-".len() + 8);

        assert!(generate_item_id("&&").starts_with("item-"));
        assert_ne!(generate_item_id("Steak"), generate_item_id("Steak"));
    }
}
