//! Model name normalization service
//!
//! Normalizes model names to a canonical form so that per-model totals
//! from different exports land under the same key.

use crate::types::UNMAPPED_MODEL;

/// Normalize a raw `Model` cell.
///
/// Transformations:
/// - Trim and collapse internal whitespace: "  Model   X " → "Model X"
/// - Blank or missing → "unmapped"
///
/// # Examples
/// ```
/// use perfrollup::services::normalizer::normalize_model_name;
///
/// assert_eq!(normalize_model_name(Some("  Model   X ")), "Model X");
/// assert_eq!(normalize_model_name(Some("   ")), "unmapped");
/// assert_eq!(normalize_model_name(None), "unmapped");
/// ```
pub fn normalize_model_name(model: Option<&str>) -> String {
    let collapsed = model
        .map(|m| m.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    if collapsed.is_empty() {
        return UNMAPPED_MODEL.to_string();
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize_model_name(Some("  Model A  ")), "Model A");
    }

    #[test]
    fn test_collapses_internal_whitespace() {
        assert_eq!(normalize_model_name(Some("Model\t  A")), "Model A");
    }

    #[test]
    fn test_blank_is_unmapped() {
        assert_eq!(normalize_model_name(Some("")), "unmapped");
        assert_eq!(normalize_model_name(Some(" \t ")), "unmapped");
    }

    #[test]
    fn test_missing_is_unmapped() {
        assert_eq!(normalize_model_name(None), "unmapped");
    }

    #[test]
    fn test_already_normalized() {
        assert_eq!(normalize_model_name(Some("Model X")), "Model X");
    }
}
