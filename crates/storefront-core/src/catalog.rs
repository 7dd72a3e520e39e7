//! Product catalog input.
//!
//! Digital products carry the asset locator and download limit that
//! entitlements are later checked against. A physical product never has
//! either, so both are dropped when `is_digital` is false.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Product;
use crate::validation::{
    validate_download_limit, validate_name, validate_non_negative_cents, validate_optional_text,
    ValidationResult,
};

fn default_true() -> bool {
    true
}

/// Product fields supplied by the store operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub is_digital: bool,
    #[serde(default)]
    pub download_limit: Option<i64>,
    #[serde(default)]
    pub asset_locator: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Checks product invariants and normalizes free text.
pub fn validate_product_draft(mut draft: ProductDraft) -> ValidationResult<ProductDraft> {
    draft.name = validate_name("name", &draft.name, 200)?;
    draft.description = validate_optional_text("description", draft.description.as_deref(), 5000)?;
    validate_non_negative_cents("price_cents", draft.price_cents)?;

    if draft.is_digital {
        validate_download_limit(draft.download_limit)?;
        draft.asset_locator =
            validate_optional_text("asset_locator", draft.asset_locator.as_deref(), 500)?;
    } else {
        draft.download_limit = None;
        draft.asset_locator = None;
    }

    Ok(draft)
}

impl ProductDraft {
    pub fn into_product(self, id: String, tenant_id: String, now: DateTime<Utc>) -> Product {
        Product {
            id,
            tenant_id,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            is_digital: self.is_digital,
            download_limit: self.download_limit,
            asset_locator: self.asset_locator,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_to(self, existing: &Product, now: DateTime<Utc>) -> Product {
        Product {
            created_at: existing.created_at,
            ..self.into_product(existing.id.clone(), existing.tenant_id.clone(), now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "  Field Guide ".to_string(),
            description: Some("   ".to_string()),
            price_cents: 1500,
            is_digital: true,
            download_limit: Some(3),
            asset_locator: Some("guides/field-guide.pdf".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn test_normalizes_digital_product() {
        let d = validate_product_draft(draft()).unwrap();
        assert_eq!(d.name, "Field Guide");
        assert_eq!(d.description, None);
        assert_eq!(d.download_limit, Some(3));
        assert_eq!(d.asset_locator.as_deref(), Some("guides/field-guide.pdf"));
    }

    #[test]
    fn test_physical_product_drops_download_fields() {
        let d = validate_product_draft(ProductDraft {
            is_digital: false,
            download_limit: Some(0),
            ..draft()
        })
        .unwrap();
        assert_eq!(d.download_limit, None);
        assert_eq!(d.asset_locator, None);
    }

    #[test]
    fn test_rejects_bad_fields() {
        let err = validate_product_draft(ProductDraft {
            price_cents: -1,
            ..draft()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::MustNotBeNegative { .. }));

        let err = validate_product_draft(ProductDraft {
            download_limit: Some(0),
            ..draft()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::MustBePositive { .. }));

        let err = validate_product_draft(ProductDraft {
            name: " ".to_string(),
            ..draft()
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::required("name"));
    }

    #[test]
    fn test_apply_keeps_identity() {
        let now = Utc::now();
        let original = validate_product_draft(draft())
            .unwrap()
            .into_product("p1".to_string(), "t1".to_string(), now);
        let later = now + chrono::Duration::minutes(5);
        let updated = ProductDraft {
            price_cents: 2000,
            ..draft()
        }
        .apply_to(&original, later);

        assert_eq!(updated.id, "p1");
        assert_eq!(updated.tenant_id, "t1");
        assert_eq!(updated.created_at, now);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.price_cents, 2000);
    }
}
