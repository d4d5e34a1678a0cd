//! Ecommerce item conversion
//!
//! Piwik PRO expects purchased items as an array of positional tuples:
//!
//! ```text
//! [id, name, [category1..category5], price, quantity, brand, variant, {dimension: value}]
//! ```

use serde_json::{Map, Value};

use crate::models::value::{is_truthy, to_text};

/// Prefix of per-item custom dimension attributes
const DIMENSION_PREFIX: &str = "dimension";

/// Category attributes, in level order
const CATEGORY_FIELDS: [&str; 5] = [
    "item_category",
    "item_category2",
    "item_category3",
    "item_category4",
    "item_category5",
];

/// Convert a list of generic item records into the positional encoding
///
/// Returns `None` unless `items` is an array. Entries that are not objects
/// are skipped.
pub fn convert_items(items: &Value) -> Option<Value> {
    let items = items.as_array()?;
    Some(Value::Array(
        items
            .iter()
            .filter_map(Value::as_object)
            .map(convert_item)
            .collect(),
    ))
}

fn convert_item(item: &Map<String, Value>) -> Value {
    let field = |key: &str| item.get(key).cloned().unwrap_or(Value::Null);

    let id = item
        .get("item_id")
        .filter(|id| !id.is_null())
        .map(|id| Value::String(to_text(id)))
        .unwrap_or(Value::Null);

    let categories: Vec<Value> = CATEGORY_FIELDS
        .iter()
        .filter_map(|key| item.get(*key))
        .filter(|level| is_truthy(level))
        .cloned()
        .collect();

    let dimensions: Map<String, Value> = item
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(DIMENSION_PREFIX)
                .map(|suffix| (suffix.to_string(), value.clone()))
        })
        .collect();

    Value::Array(vec![
        id,
        field("item_name"),
        Value::Array(categories),
        field("price"),
        field("quantity"),
        field("item_brand"),
        field("item_variant"),
        Value::Object(dimensions),
    ])
}
