//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization, plus table rows for
//! collections and the cloud entry point catalog.

use chrono::{DateTime, Utc};
use tabled::{Table, Tabled};

use crate::entry_point::CloudEntryPoint;
use crate::pagination::SearchPage;
use crate::value::Value;

/// Common resource attributes shown first, in this order.
const HEADER_KEYS: &[&str] = &["id", "name", "description", "resourceURI", "created", "updated"];

/// Width of the key column in key-value output.
const KEY_WIDTH: usize = 16;

/// Trait for human-readable key-value output.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Value {
    fn pretty_print(&self) -> String {
        let Some(entries) = self.as_mapping() else {
            return render_scalar(self);
        };

        let header = match self.get_str("id") {
            Some(id) => format!("Resource: {id}"),
            None => "Document".to_string(),
        };
        let divider = "─".repeat(header.len().max(30));
        let mut lines = vec![header, divider];

        let ordered = HEADER_KEYS
            .iter()
            .filter_map(|key| entries.get_key_value(*key))
            .chain(
                entries
                    .iter()
                    .filter(|(key, _)| !HEADER_KEYS.contains(&key.as_str())),
            );

        for (key, value) in ordered {
            if key == "id" {
                continue;
            }
            let label = format!("{key}:");
            lines.push(format!("{label:<KEY_WIDTH$}{}", render_field(key, value)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for CloudEntryPoint {
    fn pretty_print(&self) -> String {
        let header = format!("Cloud entry point: {}", self.base_uri());
        let divider = "─".repeat(header.len().max(30));
        let rows: Vec<CollectionRow> = self.collections().map(CollectionRow::from).collect();

        let mut lines = vec![header, divider];
        if rows.is_empty() {
            lines.push("(no collections)".to_string());
        } else {
            lines.push(Table::new(rows).to_string());
        }
        lines.join("\n")
    }
}

impl PrettyPrint for SearchPage {
    fn pretty_print(&self) -> String {
        let rows: Vec<ResourceRow> = self.iter().map(ResourceRow::from).collect();
        let mut lines = Vec::new();

        if rows.is_empty() {
            lines.push("(no resources)".to_string());
        } else {
            lines.push(Table::new(rows).to_string());
        }

        let shown = self.len();
        let summary = match (self.count, self.first) {
            (Some(total), Some(first)) if shown > 0 => {
                format!("Resources {}-{} of {total}", first, first + shown as u64 - 1)
            }
            (Some(total), _) => format!("{shown} of {total} resources"),
            (None, _) if self.has_more => format!("{shown} resources (more available)"),
            (None, _) => format!("{shown} resources"),
        };
        lines.push(String::new());
        lines.push(summary);
        lines.join("\n")
    }
}

/// Catalog row: collection name and href.
#[derive(Tabled)]
pub struct CollectionRow {
    pub collection: String,
    pub href: String,
}

impl From<(&str, &str)> for CollectionRow {
    fn from((collection, href): (&str, &str)) -> Self {
        Self {
            collection: collection.to_string(),
            href: href.to_string(),
        }
    }
}

/// Summary row for one resource of a search result.
#[derive(Tabled)]
pub struct ResourceRow {
    pub id: String,
    pub name: String,
    pub updated: String,
}

impl From<&Value> for ResourceRow {
    fn from(resource: &Value) -> Self {
        Self {
            id: resource.get_str("id").unwrap_or_default().to_string(),
            name: resource.get_str("name").unwrap_or_default().to_string(),
            updated: resource
                .get_str("updated")
                .or_else(|| resource.get_str("created"))
                .map(format_timestamp)
                .unwrap_or_default(),
        }
    }
}

/// Render an RFC 3339 timestamp for display; other text passes through.
#[must_use]
pub fn format_timestamp(text: &str) -> String {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| {
            ts.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        })
        .unwrap_or_else(|_| text.to_string())
}

fn render_field(key: &str, value: &Value) -> String {
    match value {
        Value::String(text) if matches!(key, "created" | "updated") => format_timestamp(text),
        Value::Sequence(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Sequence(_) | Value::Mapping(_) => value.to_string(),
        scalar => render_scalar(scalar),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Sequence(_) | Value::Mapping(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn credential() -> Value {
        Value::mapping([
            ("updated", Value::from("2024-03-01T10:15:30.000Z")),
            ("id", Value::from("credential/123")),
            ("name", Value::from("my key")),
            ("tags", Value::from(vec!["ssh", "test"])),
        ])
    }

    #[test]
    fn test_resource_pretty_print_format() {
        let output = credential().pretty_print();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Resource: credential/123");
        assert!(lines[2].starts_with("name:"));
        assert!(lines[3].contains("2024-03-01 10:15:30 UTC"));
        assert!(output.contains("ssh, test"));
    }

    #[test]
    fn test_scalar_pretty_print() {
        assert_eq!(Value::Null.pretty_print(), "-");
        assert_eq!(Value::from("done").pretty_print(), "done");
    }

    #[test]
    fn test_format_timestamp_passthrough() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_entry_point_table() {
        let endpoint = Url::parse("https://nuv.la/api/cloud-entry-point").unwrap();
        let document = Value::mapping([
            ("baseURI", Value::from("https://nuv.la/api/")),
            ("credentials", Value::mapping([("href", "credential")])),
        ]);
        let cep = CloudEntryPoint::from_document(&endpoint, document).unwrap();

        let output = cep.pretty_print();
        assert!(output.starts_with("Cloud entry point: https://nuv.la/api/"));
        assert!(output.contains("credentials"));
        assert!(output.contains("collection"));
    }

    #[test]
    fn test_search_page_summary() {
        let document = Value::mapping([
            ("count", Value::from(3)),
            ("credentials", Value::from(vec![credential()])),
        ]);
        let page = SearchPage::from_document(document, Some("credentials"), Some(1), Some(1));

        let output = page.pretty_print();
        assert!(output.contains("credential/123"));
        assert!(output.ends_with("Resources 1-1 of 3"));
    }
}
