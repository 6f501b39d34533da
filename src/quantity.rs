//! Just enough of the Kubernetes quantity grammar to compare usage against
//! allocatable capacity.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

const DECIMAL_SUFFIXES: [(&str, f64); 9] = [
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a quantity string (`250m`, `2`, `128974848`, `1Gi`, `1.5G`, `1e3`) to its base value.
pub fn parse(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }
    for (suffix, factor) in DECIMAL_SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }
    text.parse::<f64>().ok()
}

pub fn parse_quantity(quantity: &Quantity) -> Option<f64> {
    parse(&quantity.0)
}

/// `used / allocatable` as a percentage with two decimals, or `None` when not computable.
pub fn usage_percent(used: &str, allocatable: &Quantity) -> Option<String> {
    let used = parse(used)?;
    let allocatable = parse_quantity(allocatable)?;
    if allocatable <= 0.0 {
        return None;
    }
    Some(format!("{:.2}%", used * 100.0 / allocatable))
}
