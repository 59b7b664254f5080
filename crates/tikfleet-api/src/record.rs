// RouterOS REST record type
//
// The REST API renders every menu entry as a flat JSON object whose values
// are (almost always) strings, including booleans ("true"/"false") and
// numbers. Records are kept as ordered string maps; typed interpretation
// happens in `tikfleet-core::convert`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Error;

/// One menu entry as returned by the REST API, `.id` included.
pub type Record = BTreeMap<String, String>;

/// Key RouterOS uses for the internal record identifier (`*1`, `*2A`, ...).
pub const ID_KEY: &str = ".id";

/// Normalize a REST response body into a list of records.
///
/// Menus return arrays; singleton menus (`/system/identity`,
/// `/system/resource`) return one object, which becomes a one-element list.
pub fn records_from_value(value: Value) -> Result<Vec<Record>, Error> {
    match value {
        Value::Array(items) => items.into_iter().map(record_from_value).collect(),
        Value::Object(_) => Ok(vec![record_from_value(value)?]),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::Deserialization {
            message: "expected a JSON array or object".into(),
            body: other.to_string(),
        }),
    }
}

fn record_from_value(value: Value) -> Result<Record, Error> {
    let Value::Object(map) = value else {
        return Err(Error::Deserialization {
            message: "expected a JSON object for a menu entry".into(),
            body: value.to_string(),
        });
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| stringify(value).map(|v| (key, v)))
        .collect())
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_body_becomes_records() {
        let records = records_from_value(json!([
            { ".id": "*1", "name": "ether1", "disabled": "false" },
            { ".id": "*2", "name": "wlan1", "disabled": "true" }
        ]))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], "wlan1");
        assert_eq!(records[1][ID_KEY], "*2");
    }

    #[test]
    fn singleton_object_becomes_one_record() {
        let records = records_from_value(json!({ "name": "core-rtr" })).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "core-rtr");
    }

    #[test]
    fn non_string_values_are_stringified_and_nulls_dropped() {
        let records =
            records_from_value(json!([{ "running": true, "mtu": 1500, "comment": null }])).unwrap();
        assert_eq!(records[0]["running"], "true");
        assert_eq!(records[0]["mtu"], "1500");
        assert!(!records[0].contains_key("comment"));
    }

    #[test]
    fn scalar_body_is_rejected() {
        let err = records_from_value(json!("nope")).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
