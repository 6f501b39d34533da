use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::io::Write;

use crate::cluster::ResourceView;
use crate::table::print_table;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// Aligned columns plus extra detail
    Wide,
    /// Raw objects as pretty-printed JSON
    Json,
    /// Raw objects as YAML
    Yaml,
}

/// Render a collection of one kind in the requested format.
///
/// An empty collection prints `No <kind> found.` regardless of the format.
pub fn render_collection<K: ResourceView, W: Write>(
    items: &[K],
    format: OutputFormat,
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    if items.is_empty() {
        writeln!(out, "No {} found.", K::KIND.plural())?;
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(items)?)?;
        }
        OutputFormat::Yaml => {
            write!(out, "{}", serde_yaml::to_string(items)?)?;
        }
        OutputFormat::Table | OutputFormat::Wide => {
            let wide = format == OutputFormat::Wide;
            let rows: Vec<Vec<String>> = items.iter().map(|item| item.row(wide, now)).collect();
            print_table(out, &K::headers(wide), &rows)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Namespace;
    use kube::api::ObjectMeta;

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn render(items: &[Namespace], format: OutputFormat) -> String {
        let mut out = Vec::new();
        render_collection(items, format, Utc::now(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_collection_in_every_format() {
        for format in [
            OutputFormat::Table,
            OutputFormat::Wide,
            OutputFormat::Json,
            OutputFormat::Yaml,
        ] {
            assert_eq!(render(&[], format), "No namespaces found.\n");
        }
    }

    #[test]
    fn test_table_output() {
        let text = render(&[namespace("kube-system")], OutputFormat::Table);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("NAME"));
        assert!(lines.next().unwrap().starts_with("---"));
        assert!(lines.next().unwrap().starts_with("kube-system"));
    }

    #[test]
    fn test_json_output_is_a_list() {
        let text = render(&[namespace("a"), namespace("b")], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["metadata"]["name"], "b");
    }

    #[test]
    fn test_yaml_output() {
        let text = render(&[namespace("a")], OutputFormat::Yaml);
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(value[0]["metadata"]["name"].as_str(), Some("a"));
    }

    #[test]
    fn test_node_listing_renders_node_table() {
        use k8s_openapi::api::core::v1::Node;

        let mut out = Vec::new();
        render_collection::<Node, _>(&[], OutputFormat::Table, Utc::now(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No nodes found.\n");

        let node = Node {
            metadata: ObjectMeta {
                name: Some("ip-10-0-0-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut out = Vec::new();
        render_collection(&[node], OutputFormat::Table, Utc::now(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("NAME"));
        lines.next();
        assert!(lines.next().unwrap().starts_with("ip-10-0-0-1"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(
            OutputFormat::from_str("yaml", true).unwrap(),
            OutputFormat::Yaml
        );
        assert_eq!(
            OutputFormat::from_str("WIDE", true).unwrap(),
            OutputFormat::Wide
        );
        assert!(OutputFormat::from_str("xml", true).is_err());
    }
}
