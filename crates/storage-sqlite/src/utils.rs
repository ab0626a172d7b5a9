//! Helpers shared by the SQLite repositories.

use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use salesflow_core::errors::{DatabaseError, Error, Result};
use salesflow_core::store::{
    Collection, DocumentQuery, HookKind, HookPayload, HookRegistry, PipelineDocument,
};
use uuid::Uuid;

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Uses the caller-supplied id when present, otherwise generates one.
pub(crate) fn new_id(requested: Option<String>) -> String {
    requested
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Decimals are stored as their exact text form.
pub(crate) fn decimal_to_text(value: Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn decimal_from_text(text: &str) -> Result<Decimal> {
    Ok(Decimal::from_str(text.trim())?)
}

pub(crate) fn not_found(kind: &str, id: &str) -> Error {
    Error::Database(DatabaseError::NotFound(format!("{} {}", kind, id)))
}

/// Fires the post-create hooks for a committed insert.
pub(crate) fn fire_created(hooks: &HookRegistry, collection: Collection, doc: PipelineDocument) {
    hooks.fire(collection, HookKind::PostCreate, HookPayload::Created(doc));
}

/// Fires the post-update hooks for a committed update. Update hooks only
/// carry the query; the hook re-reads the document it needs.
pub(crate) fn fire_updated(hooks: &HookRegistry, collection: Collection, id: &str) {
    hooks.fire(
        collection,
        HookKind::PostUpdate,
        HookPayload::Updated(DocumentQuery::new(collection, id)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_is_exact() {
        let text = decimal_to_text(dec!(1250.500));
        assert_eq!(text, "1250.5");
        assert_eq!(decimal_from_text(&text).unwrap(), dec!(1250.5));
    }

    #[test]
    fn test_decimal_from_garbage_is_validation_error() {
        let err = decimal_from_text("twelve").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_new_id_keeps_requested_id() {
        assert_eq!(new_id(Some("lead-1".to_string())), "lead-1");
        assert_ne!(new_id(Some("  ".to_string())), "  ");
        assert!(!new_id(None).is_empty());
    }
}
