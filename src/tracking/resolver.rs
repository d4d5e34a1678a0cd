//! Parameter resolution
//!
//! Builds the outbound parameter set from the tag configuration and the
//! generic event. Every field follows the same precedence: explicit
//! configuration, then the event's vendor-prefixed field, then the event's
//! generic field. A field with no source is left unset.

use serde_json::{json, Map, Value};

use super::ecommerce::convert_items;
use super::visitor::resolve_visitor_id;
use super::{LIBRARY_NAME, LIBRARY_NAME_PARAM, LIBRARY_VERSION, LIBRARY_VERSION_PARAM};
use crate::models::value::{is_present, to_text};
use crate::models::{AnonymizationMode, CustomVariable, EventRecord, ParameterSet, TagConfig};

/// A tracking parameter and the generic event key it falls back to
struct FieldSource {
    param: &'static str,
    generic: Option<&'static str>,
}

const fn field(param: &'static str, generic: Option<&'static str>) -> FieldSource {
    FieldSource { param, generic }
}

/// Parameters resolved with the plain precedence rule
const FIELD_SOURCES: &[FieldSource] = &[
    field("idsite", None),
    field("url", Some("page_location")),
    field("urlref", Some("page_referrer")),
    field("uid", Some("user_id")),
    field("ua", Some("user_agent")),
    field("lang", Some("language")),
    field("res", Some("screen_resolution")),
    field("cip", Some("ip_override")),
    field("e_c", None),
    field("e_a", None),
    field("e_n", None),
    field("e_v", None),
    field("search", Some("search_term")),
    field("search_count", None),
    field("idgoal", None),
    field("revenue", Some("value")),
    field("ec_id", Some("transaction_id")),
    field("ec_st", None),
    field("ec_tx", Some("tax")),
    field("ec_sh", Some("shipping")),
    field("ec_dt", None),
];

/// Resolve the complete parameter set for one event
///
/// The returned set never contains `null` values.
pub fn resolve_parameters(config: &TagConfig, event: &EventRecord) -> ParameterSet {
    let mut params = ParameterSet::new();

    for (param, value) in event.vendor_fields() {
        params.set(param, value.clone());
    }

    for source in FIELD_SOURCES {
        params.set_opt(source.param, resolve_field(config, event, source));
    }

    params.set("rec", recording_flag(config, event));
    params.set("uia", anonymization_flag(config, event));
    params.set_opt("action_name", resolve_action_name(config, event));
    params.set_opt("_id", resolve_visitor_id(config, event).map(Value::String));
    params.set_opt("search_cat", resolve_search_categories(config, event));
    params.set_opt("ec_items", resolve_ecommerce_items(config, event));
    params.set_opt(
        "cvar",
        resolve_custom_variables(&config.event_custom_variables, event.vendor("cvar")),
    );
    params.set_opt(
        "_cvar",
        resolve_custom_variables(&config.session_custom_variables, event.vendor("_cvar")),
    );

    for dimension in &config.custom_dimensions {
        params.set(dimension.param_name(), dimension.value.clone());
    }

    params.set(LIBRARY_NAME_PARAM, LIBRARY_NAME);
    params.set(LIBRARY_VERSION_PARAM, LIBRARY_VERSION);

    for param in config.parameter_overrides.iter().filter(|p| !p.name.is_empty()) {
        params.set(param.name.clone(), param.value.clone());
    }

    params.purge();
    params
}

fn resolve_field(config: &TagConfig, event: &EventRecord, source: &FieldSource) -> Option<Value> {
    if let Some(explicit) = config.explicit(source.param) {
        return Some(Value::String(explicit.to_string()));
    }
    event
        .vendor(source.param)
        .filter(|v| is_present(v))
        .or_else(|| source.generic.and_then(|key| event.get(key)).filter(|v| is_present(v)))
        .cloned()
}

/// `rec`, enabled unless switched off
fn recording_flag(config: &TagConfig, event: &EventRecord) -> Value {
    match config.record {
        Some(record) => json!(u8::from(record)),
        None => event.vendor("rec").filter(|v| is_present(v)).cloned().unwrap_or(json!(1)),
    }
}

/// `uia`, 0 unless the visitor is flagged anonymous
fn anonymization_flag(config: &TagConfig, event: &EventRecord) -> Value {
    match config.anonymization {
        AnonymizationMode::Anonymous => json!(1),
        AnonymizationMode::Identified => json!(0),
        AnonymizationMode::Event => {
            event.vendor("uia").filter(|v| is_present(v)).cloned().unwrap_or(json!(0))
        },
    }
}

/// Page views fall back to the page title
fn resolve_action_name(config: &TagConfig, event: &EventRecord) -> Option<Value> {
    if let Some(explicit) = config.explicit("action_name") {
        return Some(Value::String(explicit.to_string()));
    }
    if let Some(name) = event.vendor("action_name").filter(|v| is_present(v)) {
        return Some(name.clone());
    }
    if event.is_page_view() {
        return event.get("page_title").filter(|v| is_present(v)).cloned();
    }
    None
}

fn resolve_search_categories(config: &TagConfig, event: &EventRecord) -> Option<Value> {
    if !config.search_categories.is_empty() {
        let categories = Value::from(config.search_categories.clone());
        return Some(Value::String(categories.to_string()));
    }
    event.vendor("search_cat").map(|v| Value::String(to_text(v)))
}

/// First candidate with a non-empty encoding wins: configured items, the
/// pre-formatted vendor field, then the generic `items` list. A list that
/// converts to no items counts as empty.
fn resolve_ecommerce_items(config: &TagConfig, event: &EventRecord) -> Option<Value> {
    let configured = || config.ecommerce_items.as_ref().and_then(encode_items);
    let preformatted = || event.vendor("ec_items").map(to_text).filter(|json| !json.is_empty());
    let generic = || event.get("items").and_then(encode_items);

    configured().or_else(preformatted).or_else(generic).map(Value::String)
}

fn encode_items(items: &Value) -> Option<String> {
    convert_items(items)
        .filter(|converted| converted.as_array().is_some_and(|list| !list.is_empty()))
        .map(|converted| converted.to_string())
}

/// Custom variables as `{"<id>": [name, value]}` JSON text
fn resolve_custom_variables(
    configured: &[CustomVariable],
    inherited: Option<&Value>,
) -> Option<Value> {
    let variables = if !configured.is_empty() {
        configured
            .iter()
            .map(|var| (var.id.clone(), json!([var.name, var.value])))
            .collect::<Map<String, Value>>()
    } else {
        match inherited? {
            Value::Array(records) => custom_variables_from_records(records),
            other => return Some(Value::String(to_text(other))),
        }
    };
    Some(Value::String(Value::Object(variables).to_string()))
}

fn custom_variables_from_records(records: &[Value]) -> Map<String, Value> {
    records
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|record| {
            let id = record.get("id").filter(|id| is_present(id))?;
            let name = record.get("name").cloned().unwrap_or(Value::Null);
            let value = record.get("value").cloned().unwrap_or(Value::Null);
            Some((to_text(id), json!([name, value])))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventBuilder;
    use crate::models::{CustomDimension, ParameterOverride};

    fn config() -> TagConfig {
        TagConfig::new("shop")
    }

    #[test]
    fn test_config_wins_over_event() {
        let mut config = config();
        config.site_id = Some("site-config".to_string());
        config.page_url = Some("https://config.example/".to_string());

        let event = EventBuilder::new()
            .vendor("idsite", "site-event")
            .vendor("url", "https://vendor.example/")
            .field("page_location", "https://generic.example/")
            .build();

        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get_str("idsite"), Some("site-config"));
        assert_eq!(params.get_str("url"), Some("https://config.example/"));
    }

    #[test]
    fn test_vendor_field_wins_over_generic() {
        let event = EventBuilder::new()
            .vendor("url", "https://vendor.example/")
            .field("page_location", "https://generic.example/")
            .field("page_referrer", "https://ref.example/")
            .build();

        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get_str("url"), Some("https://vendor.example/"));
        assert_eq!(params.get_str("urlref"), Some("https://ref.example/"));
    }

    #[test]
    fn test_empty_config_value_falls_through() {
        let mut config = config();
        config.user_id = Some(String::new());
        let event = EventBuilder::new().field("user_id", "user-42").build();

        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get_str("uid"), Some("user-42"));
    }

    #[test]
    fn test_absent_fields_are_not_emitted() {
        let params = resolve_parameters(&config(), &EventBuilder::new().build());

        for key in ["idsite", "url", "uid", "action_name", "_id", "search_cat", "ec_items", "cvar"] {
            assert!(!params.contains_key(key), "{key} should be absent");
        }
        assert_eq!(params.get("rec"), Some(&json!(1)));
        assert_eq!(params.get("uia"), Some(&json!(0)));
    }

    #[test]
    fn test_event_values_keep_their_type() {
        let event = EventBuilder::new()
            .field("value", 0)
            .field("tax", 1.25)
            .vendor("e_v", 3)
            .build();

        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get("revenue"), Some(&json!(0)));
        assert_eq!(params.get("ec_tx"), Some(&json!(1.25)));
        assert_eq!(params.get("e_v"), Some(&json!(3)));
    }

    #[test]
    fn test_action_name_precedence() {
        let page_view = EventBuilder::page_view().field("page_title", "Home");

        let params = resolve_parameters(&config(), &page_view.build());
        assert_eq!(params.get_str("action_name"), Some("Home"));

        let event = EventBuilder::page_view()
            .field("page_title", "Home")
            .vendor("action_name", "Landing")
            .build();
        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get_str("action_name"), Some("Landing"));

        let mut config = config();
        config.action_name = Some("Configured".to_string());
        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get_str("action_name"), Some("Configured"));
    }

    #[test]
    fn test_page_title_only_used_for_page_views() {
        let event = EventBuilder::new()
            .field("event_name", "add_to_cart")
            .field("page_title", "Cart")
            .build();

        let params = resolve_parameters(&config(), &event);
        assert!(!params.contains_key("action_name"));
    }

    #[test]
    fn test_recording_and_anonymization_flags() {
        let event = EventBuilder::new().vendor("rec", 0).vendor("uia", 1).build();

        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get("rec"), Some(&json!(0)));
        assert_eq!(params.get("uia"), Some(&json!(1)));

        let mut config = config();
        config.record = Some(true);
        config.anonymization = AnonymizationMode::Identified;
        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get("rec"), Some(&json!(1)));
        assert_eq!(params.get("uia"), Some(&json!(0)));

        config.anonymization = AnonymizationMode::Anonymous;
        let params = resolve_parameters(&config, &EventBuilder::new().build());
        assert_eq!(params.get("uia"), Some(&json!(1)));
    }

    #[test]
    fn test_visitor_id_is_hashed() {
        let event = EventBuilder::new().field("client_id", "abc").build();
        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get_str("_id"), Some("ba7816bf8f01cfea"));
    }

    #[test]
    fn test_search_categories() {
        let mut config = config();
        config.search_categories = vec!["shoes".to_string(), "bags".to_string()];
        let event = EventBuilder::new().vendor("search_cat", json!(["ignored"])).build();

        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get_str("search_cat"), Some(r#"["shoes","bags"]"#));

        let params = resolve_parameters(&TagConfig::new("shop"), &event);
        assert_eq!(params.get_str("search_cat"), Some(r#"["ignored"]"#));

        let event = EventBuilder::new().vendor("search_cat", json!([])).build();
        let params = resolve_parameters(&TagConfig::new("shop"), &event);
        assert_eq!(params.get_str("search_cat"), Some("[]"));
    }

    #[test]
    fn test_ecommerce_items_candidates() {
        let generic_items = json!([{"item_id": "generic"}]);
        let event = EventBuilder::new()
            .vendor("ec_items", r#"[["vendor"]]"#)
            .field("items", generic_items.clone())
            .build();

        let mut config = config();
        config.ecommerce_items = Some(json!([{"item_id": "configured"}]));
        let params = resolve_parameters(&config, &event);
        assert_eq!(
            params.get_str("ec_items"),
            Some(r#"[["configured",null,[],null,null,null,null,{}]]"#)
        );

        let params = resolve_parameters(&TagConfig::new("shop"), &event);
        assert_eq!(params.get_str("ec_items"), Some(r#"[["vendor"]]"#));

        let event = EventBuilder::new().vendor("ec_items", "").field("items", generic_items).build();
        let params = resolve_parameters(&TagConfig::new("shop"), &event);
        assert_eq!(
            params.get_str("ec_items"),
            Some(r#"[["generic",null,[],null,null,null,null,{}]]"#)
        );
    }

    #[test]
    fn test_malformed_items_are_absent() {
        let mut config = config();
        config.ecommerce_items = Some(json!({"item_id": "not-a-list"}));
        let event = EventBuilder::new().field("items", "not-a-list").build();

        let params = resolve_parameters(&config, &event);
        assert!(!params.contains_key("ec_items"));
    }

    #[test]
    fn test_configured_items_without_products_fall_through() {
        let event = EventBuilder::new().field("items", json!([{"item_id": "g"}])).build();
        let expected = r#"[["g",null,[],null,null,null,null,{}]]"#;

        for configured in [json!([]), json!(["junk", 7, null])] {
            let mut config = config();
            config.ecommerce_items = Some(configured);
            let params = resolve_parameters(&config, &event);
            assert_eq!(params.get_str("ec_items"), Some(expected));
        }

        let event = EventBuilder::new().field("items", json!(["junk"])).build();
        let params = resolve_parameters(&config(), &event);
        assert!(!params.contains_key("ec_items"));
    }

    #[test]
    fn test_custom_variables() {
        let mut config = config();
        config.event_custom_variables = vec![
            CustomVariable {
                id: "1".to_string(),
                name: "plan".to_string(),
                value: "pro".to_string(),
            },
            CustomVariable {
                id: "2".to_string(),
                name: "seats".to_string(),
                value: "5".to_string(),
            },
        ];
        let event = EventBuilder::new()
            .vendor("cvar", r#"{"9":["ignored","x"]}"#)
            .vendor("_cvar", json!([{"id": 3, "name": "country", "value": "PL"}, "junk"]))
            .build();

        let params = resolve_parameters(&config, &event);
        assert_eq!(
            params.get_str("cvar"),
            Some(r#"{"1":["plan","pro"],"2":["seats","5"]}"#)
        );
        assert_eq!(params.get_str("_cvar"), Some(r#"{"3":["country","PL"]}"#));

        let params = resolve_parameters(&TagConfig::new("shop"), &event);
        assert_eq!(params.get_str("cvar"), Some(r#"{"9":["ignored","x"]}"#));
    }

    #[test]
    fn test_custom_dimensions_override_event() {
        let mut config = config();
        config.custom_dimensions = vec![CustomDimension {
            index: 4,
            value: "gold".to_string(),
        }];
        let event = EventBuilder::new()
            .vendor("dimension4", "silver")
            .vendor("dimension5", "kept")
            .build();

        let params = resolve_parameters(&config, &event);
        assert_eq!(params.get_str("dimension4"), Some("gold"));
        assert_eq!(params.get_str("dimension5"), Some("kept"));
    }

    #[test]
    fn test_library_identity() {
        let event = EventBuilder::new().vendor("ts_n", "spoofed").build();
        let params = resolve_parameters(&config(), &event);
        assert_eq!(params.get_str("ts_n"), Some(LIBRARY_NAME));
        assert_eq!(params.get_str("ts_v"), Some(LIBRARY_VERSION));
    }

    #[test]
    fn test_overrides_replace_anything() {
        let mut config = config();
        config.site_id = Some("site-config".to_string());
        config.parameter_overrides = vec![
            ParameterOverride {
                name: "idsite".to_string(),
                value: "site-override".to_string(),
            },
            ParameterOverride {
                name: "ts_n".to_string(),
                value: "custom".to_string(),
            },
        ];

        let params = resolve_parameters(&config, &EventBuilder::new().vendor("idsite", "x").build());
        assert_eq!(params.get_str("idsite"), Some("site-override"));
        assert_eq!(params.get_str("ts_n"), Some("custom"));
    }

    #[test]
    fn test_no_null_values_survive() {
        let event = EventBuilder::page_view()
            .vendor("custom_param", Value::Null)
            .vendor("other", "")
            .field("page_title", Value::Null)
            .field("user_id", Value::Null)
            .build();

        let params = resolve_parameters(&config(), &event);
        assert!(params.iter().all(|(_, value)| !value.is_null()));
        assert_eq!(params.get_str("other"), Some(""));
    }
}
