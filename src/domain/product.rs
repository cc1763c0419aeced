//! Product records, creation drafts and partial updates.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use utoipa::ToSchema;

/// Digits allowed before the decimal point by the `NUMERIC(10,2)` price column.
const PRICE_INTEGER_DIGITS: u32 = 8;
const PRICE_SCALE: u32 = 2;

/// A catalog product as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Decimal string with at most two fractional digits.
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    /// Blob reference of the product image.
    pub image_path: Option<String>,
    /// Unit-length image embedding.
    pub embedding: Option<Vec<f32>>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

/// Validated fields of a product that is about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl NewProduct {
    pub fn new(name: &str, description: Option<&str>, price: Decimal) -> Result<Self, String> {
        Ok(Self {
            name: validate_name(name)?,
            description: normalize_description(description),
            price: validate_price(price)?,
        })
    }
}

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    /// Overwrites `target` when the field is set.
    pub fn apply_to(&self, target: &mut T)
    where
        T: Clone,
    {
        if let Patch::Set(v) = self {
            *target = v.clone();
        }
    }
}

/// Field-by-field update of a product; image replacement travels separately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPatch {
    pub name: Patch<String>,
    /// `Set(None)` clears the description.
    pub description: Patch<Option<String>>,
    pub price: Patch<Decimal>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        !self.name.is_set() && !self.description.is_set() && !self.price.is_set()
    }

    /// Normalizes set fields and rejects invalid ones.
    pub fn validated(self) -> Result<Self, String> {
        let name = match self.name {
            Patch::Set(name) => Patch::Set(validate_name(&name)?),
            Patch::Unset => Patch::Unset,
        };
        let description = match self.description {
            Patch::Set(d) => Patch::Set(normalize_description(d.as_deref())),
            Patch::Unset => Patch::Unset,
        };
        let price = match self.price {
            Patch::Set(p) => Patch::Set(validate_price(p)?),
            Patch::Unset => Patch::Unset,
        };
        Ok(Self {
            name,
            description,
            price,
        })
    }

    pub fn apply_to(&self, product: &mut Product) {
        self.name.apply_to(&mut product.name);
        self.description.apply_to(&mut product.description);
        self.price.apply_to(&mut product.price);
    }
}

/// Raw uploaded image plus the metadata the client declared for it.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    /// True when the declared content type is in the `image/*` family.
    pub fn has_image_media_type(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    /// File extension for the stored blob, sniffed from the bytes.
    pub fn extension(&self) -> Option<&'static str> {
        image::guess_format(&self.bytes)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
    }
}

pub fn validate_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    Ok(name.to_string())
}

pub fn validate_price(price: Decimal) -> Result<Decimal, String> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(format!("price must be non-negative, got {}", price));
    }
    let normalized = price.normalize();
    if normalized.scale() > PRICE_SCALE {
        return Err(format!(
            "price must have at most {} decimal places, got {}",
            PRICE_SCALE, price
        ));
    }
    if normalized.trunc() >= Decimal::from(10u64.pow(PRICE_INTEGER_DIGITS)) {
        return Err(format!("price {} exceeds the supported range", price));
    }
    let mut price = normalized.abs();
    price.rescale(PRICE_SCALE);
    Ok(price)
}

/// Parses a form-submitted price such as `"19.99"`.
pub fn parse_price(raw: &str) -> Result<Decimal, String> {
    let price = Decimal::from_str(raw.trim()).map_err(|_| format!("invalid price '{}'", raw))?;
    validate_price(price)
}

fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: 1,
            name: "Lamp".to_string(),
            description: Some("Desk lamp".to_string()),
            price: Decimal::new(1999, 2),
            image_path: Some("a.png".to_string()),
            embedding: Some(vec![1.0, 0.0]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parse_price_accepts_two_decimals() {
        assert_eq!(parse_price("19.99").unwrap().to_string(), "19.99");
        assert_eq!(parse_price(" 5 ").unwrap().to_string(), "5.00");
        assert_eq!(parse_price("0").unwrap().to_string(), "0.00");
        assert_eq!(parse_price("1.500").unwrap().to_string(), "1.50");
    }

    #[test]
    fn parse_price_rejects_invalid_values() {
        assert!(parse_price("-1").is_err());
        assert!(parse_price("1.999").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("100000000").is_err());
    }

    #[test]
    fn new_product_trims_and_validates() {
        let p = NewProduct::new("  Lamp ", Some("   "), Decimal::new(5, 0)).unwrap();
        assert_eq!(p.name, "Lamp");
        assert_eq!(p.description, None);
        assert!(NewProduct::new("   ", None, Decimal::ZERO).is_err());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut product = sample_product();
        let patch = ProductPatch {
            price: Patch::Set(Decimal::new(500, 2)),
            ..Default::default()
        };
        patch.apply_to(&mut product);
        assert_eq!(product.price, Decimal::new(500, 2));
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.description.as_deref(), Some("Desk lamp"));
        assert_eq!(product.embedding, Some(vec![1.0, 0.0]));
    }

    #[test]
    fn patch_can_clear_description() {
        let mut product = sample_product();
        let patch = ProductPatch {
            description: Patch::Set(Some(String::new())),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.description, Patch::Set(None));
        patch.apply_to(&mut product);
        assert_eq!(product.description, None);
    }

    #[test]
    fn patch_rejects_blank_name() {
        let patch = ProductPatch {
            name: Patch::Set("  ".to_string()),
            ..Default::default()
        };
        assert!(patch.validated().is_err());
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn media_type_check() {
        assert!(ImageUpload::new(vec![1u8], Some("image/png")).has_image_media_type());
        assert!(ImageUpload::new(vec![1u8], Some("IMAGE/JPEG")).has_image_media_type());
        assert!(!ImageUpload::new(vec![1u8], Some("text/plain")).has_image_media_type());
        assert!(!ImageUpload::new(vec![1u8], None).has_image_media_type());
    }
}
