//! Loop-template path rewriting.
//!
//! `/selected/{item.id}` with item `{"id": 42}` becomes `/selected/42`.
//! Substitution runs `{item.field}` first, then `{index}`, then bare
//! `{item}`. Only one level of field access is supported; values are
//! spliced verbatim (no pointer escaping).

use crate::value::DataValue;

const ITEM_FIELD_OPEN: &str = "{item.";
const INDEX: &str = "{index}";
const ITEM: &str = "{item}";

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether the template contains anything `interpolate` would rewrite.
pub fn has_placeholders(template: &str) -> bool {
    template.contains(ITEM_FIELD_OPEN) || template.contains(INDEX) || template.contains(ITEM)
}

pub fn interpolate(template: &str, item: &DataValue, index: usize) -> String {
    if !has_placeholders(template) {
        return template.to_string();
    }
    let out = replace_item_fields(template, item);
    let out = out.replace(INDEX, &index.to_string());
    if out.contains(ITEM) {
        out.replace(ITEM, &item.display_string())
    } else {
        out
    }
}

fn replace_item_fields(template: &str, item: &DataValue) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(ITEM_FIELD_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + ITEM_FIELD_OPEN.len()..];
        let field_len = after
            .char_indices()
            .find(|(_, c)| !is_word_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        let field = &after[..field_len];
        if field.is_empty() || !after[field_len..].starts_with('}') {
            // Not a `{item.word}` placeholder; keep the opening text literally.
            out.push_str(ITEM_FIELD_OPEN);
            rest = after;
            continue;
        }
        let value = item.field(field).map(DataValue::display_string);
        out.push_str(value.as_deref().unwrap_or(""));
        rest = &after[field_len + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dv(v: serde_json::Value) -> DataValue {
        DataValue::from(v)
    }

    #[test]
    fn replaces_item_fields_and_index() {
        assert_eq!(
            interpolate("/selected/{item.id}", &dv(json!({"id": "42"})), 3),
            "/selected/42"
        );
        assert_eq!(interpolate("/rows/{index}", &dv(json!({})), 5), "/rows/5");
        assert_eq!(
            interpolate("/u/{item.id}/{index}/{item.id}", &dv(json!({"id": 7})), 1),
            "/u/7/1/7"
        );
    }

    #[test]
    fn missing_and_null_fields_become_empty() {
        let item = dv(json!({"a": null}));
        assert_eq!(interpolate("/x/{item.a}/{item.b}", &item, 0), "/x//");
        assert_eq!(interpolate("/x/{item.id}", &dv(json!("scalar")), 0), "/x/");
    }

    #[test]
    fn bare_item_uses_string_conversion() {
        assert_eq!(interpolate("/tags/{item}", &dv(json!("red")), 0), "/tags/red");
        assert_eq!(interpolate("/n/{item}", &dv(json!(2.0)), 0), "/n/2");
    }

    #[test]
    fn nested_field_access_is_left_alone() {
        let item = dv(json!({"a": {"b": 1}}));
        assert_eq!(interpolate("/x/{item.a.b}", &item, 0), "/x/{item.a.b}");
        assert_eq!(interpolate("/x/{item.}", &item, 0), "/x/{item.}");
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert!(!has_placeholders("/plain/path"));
        assert_eq!(interpolate("/plain/path", &DataValue::Null, 9), "/plain/path");
    }
}
