//! Batch domain models and request validation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lotkeeper_core::{BatchId, Quantity, QuantityError, UpsertOutcome};

/// Maximum length of a product code.
pub const MAX_CODE_LENGTH: usize = 50;
/// Maximum length of a lot number.
pub const MAX_LOT_LENGTH: usize = 50;
/// Maximum length of a product name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Wire format for expiry dates.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// A stored product batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch ID.
    pub id: BatchId,
    /// Product family code.
    pub code: String,
    /// Product display name.
    pub name: String,
    /// Lot number within the code.
    pub lot: String,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Units on hand.
    pub quantity: i32,
    /// When the batch was created or last received more units.
    pub registered_at: DateTime<Utc>,
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upserted {
    /// The batch after the write.
    pub batch: Batch,
    /// Whether the row was inserted or merged.
    pub outcome: UpsertOutcome,
}

/// Stock aggregated over every lot of one product code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSummary {
    /// Product family code.
    pub code: String,
    /// One of the names recorded for the code. Which one is unspecified.
    pub name: String,
    /// Sum of quantities over the code's batches.
    pub total_quantity: i64,
    /// Number of batches with this code.
    pub batch_count: i64,
}

impl CodeSummary {
    /// Aggregate batches per code, ordered by code.
    ///
    /// The name kept for a code is the smallest one in byte order.
    #[must_use]
    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Vec<Self> {
        let mut groups: BTreeMap<&str, Self> = BTreeMap::new();

        for batch in batches {
            let entry = groups.entry(batch.code.as_str()).or_insert_with(|| Self {
                code: batch.code.clone(),
                name: batch.name.clone(),
                total_quantity: 0,
                batch_count: 0,
            });
            if batch.name < entry.name {
                entry.name.clone_from(&batch.name);
            }
            entry.total_quantity += i64::from(batch.quantity);
            entry.batch_count += 1;
        }

        groups.into_values().collect()
    }
}

/// Validated input for creating or merging a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    pub code: String,
    pub name: String,
    pub lot: String,
    pub expiry: NaiveDate,
    pub quantity: Quantity,
}

/// Validated partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub quantity: Option<Quantity>,
}

impl BatchPatch {
    /// Apply the patch to a batch in place.
    pub fn apply_to(&self, batch: &mut Batch) {
        if let Some(code) = &self.code {
            batch.code.clone_from(code);
        }
        if let Some(name) = &self.name {
            batch.name.clone_from(name);
        }
        if let Some(lot) = &self.lot {
            batch.lot.clone_from(lot);
        }
        if let Some(expiry) = self.expiry {
            batch.expiry = expiry;
        }
        if let Some(quantity) = self.quantity {
            batch.quantity = quantity.get();
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Errors found while validating a batch request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    /// A required field was absent or null.
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    /// A field was present but unusable.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Quantity as sent by clients: a JSON integer or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuantityField {
    Number(i64),
    Text(String),
}

impl QuantityField {
    fn validate(&self) -> Result<Quantity, InputError> {
        let parsed = match self {
            Self::Number(n) => Quantity::new(*n),
            Self::Text(s) => Quantity::parse(s),
        };
        parsed.map_err(|e: QuantityError| InputError::Invalid {
            field: "quantity",
            reason: e.to_string(),
        })
    }
}

/// Raw body of a create-or-merge request.
///
/// Every field is optional here so a missing field produces an
/// [`InputError`] naming it instead of a generic deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub lot: Option<String>,
    pub expiry: Option<String>,
    pub quantity: Option<QuantityField>,
}

impl BatchRequest {
    /// Validate into a [`NewBatch`].
    ///
    /// # Errors
    ///
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<NewBatch, InputError> {
        let code = required(self.code.as_deref(), "code", MAX_CODE_LENGTH)?;
        let name = required(self.name.as_deref(), "name", MAX_NAME_LENGTH)?;
        let lot = required(self.lot.as_deref(), "lot", MAX_LOT_LENGTH)?;
        let expiry = parse_expiry(self.expiry.as_deref().ok_or(InputError::Missing("expiry"))?)?;
        let quantity = self
            .quantity
            .as_ref()
            .ok_or(InputError::Missing("quantity"))?
            .validate()?;

        Ok(NewBatch {
            code,
            name,
            lot,
            expiry,
            quantity,
        })
    }
}

/// Raw body of a partial update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchPatchRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub lot: Option<String>,
    pub expiry: Option<String>,
    pub quantity: Option<QuantityField>,
}

impl BatchPatchRequest {
    /// Validate into a [`BatchPatch`]. Absent fields stay `None`.
    ///
    /// # Errors
    ///
    /// Returns the first malformed field.
    pub fn validate(&self) -> Result<BatchPatch, InputError> {
        Ok(BatchPatch {
            code: self
                .code
                .as_deref()
                .map(|v| text_field(v, "code", MAX_CODE_LENGTH))
                .transpose()?,
            name: self
                .name
                .as_deref()
                .map(|v| text_field(v, "name", MAX_NAME_LENGTH))
                .transpose()?,
            lot: self
                .lot
                .as_deref()
                .map(|v| text_field(v, "lot", MAX_LOT_LENGTH))
                .transpose()?,
            expiry: self.expiry.as_deref().map(parse_expiry).transpose()?,
            quantity: self
                .quantity
                .as_ref()
                .map(QuantityField::validate)
                .transpose()?,
        })
    }
}

fn required(value: Option<&str>, field: &'static str, max: usize) -> Result<String, InputError> {
    text_field(value.ok_or(InputError::Missing(field))?, field, max)
}

fn text_field(value: &str, field: &'static str, max: usize) -> Result<String, InputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InputError::Invalid {
            field,
            reason: "cannot be empty".to_string(),
        });
    }
    if trimmed.chars().count() > max {
        return Err(InputError::Invalid {
            field,
            reason: format!("must be at most {max} characters"),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_expiry(value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), EXPIRY_FORMAT).map_err(|_| InputError::Invalid {
        field: "expiry",
        reason: format!("expected a calendar date as YYYY-MM-DD, got {value:?}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> BatchRequest {
        serde_json::from_value(serde_json::json!({
            "code": "A1",
            "name": "Paracetamol 500mg",
            "lot": "L1",
            "expiry": "2027-03-31",
            "quantity": 10
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_full_request() {
        let batch = request().validate().unwrap();
        assert_eq!(batch.code, "A1");
        assert_eq!(batch.lot, "L1");
        assert_eq!(batch.expiry, NaiveDate::from_ymd_opt(2027, 3, 31).unwrap());
        assert_eq!(batch.quantity.get(), 10);
    }

    #[test]
    fn test_quantity_as_numeric_string() {
        let mut req = request();
        req.quantity = Some(QuantityField::Text("7".to_string()));
        assert_eq!(req.validate().unwrap().quantity.get(), 7);
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut req = request();
        req.lot = None;
        assert_eq!(req.validate(), Err(InputError::Missing("lot")));
    }

    #[test]
    fn test_blank_code_rejected() {
        let mut req = request();
        req.code = Some("   ".to_string());
        assert!(matches!(
            req.validate(),
            Err(InputError::Invalid { field: "code", .. })
        ));
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        let mut req = request();
        req.code = Some("  A1 ".to_string());
        assert_eq!(req.validate().unwrap().code, "A1");
    }

    #[test]
    fn test_overlong_name_rejected() {
        let mut req = request();
        req.name = Some("x".repeat(MAX_NAME_LENGTH + 1));
        assert!(matches!(
            req.validate(),
            Err(InputError::Invalid { field: "name", .. })
        ));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        for bad in ["31/03/2027", "2027-02-30", "soon"] {
            let mut req = request();
            req.expiry = Some(bad.to_string());
            assert!(
                matches!(req.validate(), Err(InputError::Invalid { field: "expiry", .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_negative_and_non_numeric_quantity_rejected() {
        let mut req = request();
        req.quantity = Some(QuantityField::Number(-1));
        assert!(matches!(
            req.validate(),
            Err(InputError::Invalid { field: "quantity", .. })
        ));

        req.quantity = Some(QuantityField::Text("lots".to_string()));
        assert!(matches!(
            req.validate(),
            Err(InputError::Invalid { field: "quantity", .. })
        ));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let patch: BatchPatchRequest =
            serde_json::from_value(serde_json::json!({ "quantity": "3" })).unwrap();
        let patch = patch.validate().unwrap();
        assert!(patch.code.is_none());
        assert_eq!(patch.quantity.unwrap().get(), 3);
        assert!(patch.name.is_none() && patch.lot.is_none() && patch.expiry.is_none());
    }

    #[test]
    fn test_patch_apply() {
        let mut batch = Batch {
            id: BatchId::new(1),
            code: "A1".to_string(),
            name: "Old".to_string(),
            lot: "L1".to_string(),
            expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            quantity: 4,
            registered_at: Utc::now(),
        };
        let patch = BatchPatch {
            name: Some("New".to_string()),
            quantity: Some(Quantity::new(9).unwrap()),
            ..BatchPatch::default()
        };
        patch.apply_to(&mut batch);
        assert_eq!(batch.name, "New");
        assert_eq!(batch.quantity, 9);
        assert_eq!(batch.code, "A1");
    }
}
