//! Field-by-field merging of configuration tiers.
//!
//! Mappings merge recursively, anything else in the higher tier replaces the
//! lower tier outright. Lists are replaced, never concatenated.

use serde_json::Value;

/// Merge `overlay` onto `base`. A null overlay means "not specified" and keeps `base`.
///
/// ```
/// use serde_json::json;
/// use inspection_lineage::config::deep_merge;
///
/// let merged = deep_merge(
///     json!({ "engine": { "page_size": 1000, "max_chain_depth": 32 } }),
///     json!({ "engine": { "page_size": 200 } }),
/// );
/// assert_eq!(merged, json!({ "engine": { "page_size": 200, "max_chain_depth": 32 } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold a list of tiers, lowest priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_overlay_keeps_base() {
        let merged = deep_merge(json!({ "page_size": 5 }), Value::Null);
        assert_eq!(merged, json!({ "page_size": 5 }));
    }

    #[test]
    fn test_nested_fields_survive() {
        let merged = deep_merge_all([
            json!({ "store": { "db_path": "a.db" }, "engine": { "page_size": 1000 } }),
            json!({ "engine": { "dedup_policy": "root_wins" } }),
            json!({ "engine": { "page_size": 10 } }),
        ]);
        assert_eq!(
            merged,
            json!({
                "store": { "db_path": "a.db" },
                "engine": { "page_size": 10, "dedup_policy": "root_wins" }
            })
        );
    }

    #[test]
    fn test_scalar_replaces_mapping() {
        let merged = deep_merge(json!({ "engine": { "page_size": 1 } }), json!({ "engine": 3 }));
        assert_eq!(merged, json!({ "engine": 3 }));
    }
}
