use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

/// Format a `key=value` map as a selector string for listing.
pub fn labels_to_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Convert a LabelSelector (match_labels and match_expressions) to a selector string.
///
/// Returns `None` for a selector with no requirements.
pub fn selector_to_string(selector: &LabelSelector) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(labels) = &selector.match_labels
        && !labels.is_empty()
    {
        parts.push(labels_to_selector(labels));
    }

    if let Some(expressions) = &selector.match_expressions {
        for expr in expressions {
            let values = expr
                .values
                .as_ref()
                .map(|v| v.join(","))
                .unwrap_or_default();
            let part = match expr.operator.as_str() {
                "In" => format!("{} in ({})", expr.key, values),
                "NotIn" => format!("{} notin ({})", expr.key, values),
                "Exists" => expr.key.clone(),
                "DoesNotExist" => format!("!{}", expr.key),
                other => format!("{} {} ({})", expr.key, other.to_lowercase(), values),
            };
            parts.push(part);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}
