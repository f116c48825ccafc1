//! Search parameters and paged collection results.

use serde::Serialize;

use crate::error::Result;
use crate::value::Value;

/// Collection members that never hold the resources themselves.
const METADATA_KEYS: &[&str] = &["operations", "acl"];

/// One window of a collection search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// The resources in this window.
    pub resources: Vec<Value>,
    /// Total number of matching resources, as reported by the server.
    pub count: Option<u64>,
    /// First requested position (1-indexed), if a window was requested.
    pub first: Option<u64>,
    /// Last requested position (inclusive), if a window was requested.
    pub last: Option<u64>,
    /// Whether resources exist beyond this window.
    pub has_more: bool,
    /// The rest of the collection document (`count`, `acl`, `operations`, ...).
    pub metadata: Value,
}

impl SearchPage {
    /// Split a collection document into its resources and metadata.
    ///
    /// The resources are read from `collection_key` when given (e.g.
    /// `credentials`); otherwise from the first sequence member that is not
    /// collection metadata.
    #[must_use]
    pub fn from_document(
        mut document: Value,
        collection_key: Option<&str>,
        first: Option<u64>,
        last: Option<u64>,
    ) -> Self {
        let count = document.get("count").and_then(Value::as_u64);

        let resources = document
            .as_mapping_mut()
            .and_then(|map| {
                let key = match collection_key {
                    Some(key) if map.contains_key(key) => key.to_string(),
                    _ => map
                        .iter()
                        .find(|(k, v)| {
                            v.as_sequence().is_some() && !METADATA_KEYS.contains(&k.as_str())
                        })
                        .map(|(k, _)| k.clone())?,
                };
                map.shift_remove(&key)
            })
            .and_then(|v| match v {
                Value::Sequence(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default();

        let has_more = match (count, last) {
            (Some(total), Some(last)) => last < total,
            (Some(total), None) => {
                let offset = first.map_or(0, |f| f.saturating_sub(1));
                offset.saturating_add(resources.len() as u64) < total
            }
            (None, Some(last)) => {
                let size = last.saturating_sub(first.unwrap_or(1)).saturating_add(1);
                resources.len() as u64 >= size
            }
            (None, None) => false,
        };

        Self {
            resources,
            count,
            first,
            last,
            has_more,
            metadata: document,
        }
    }

    /// Returns true if this window has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the number of resources in this window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns an iterator over the resources in this window.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.resources.iter()
    }
}

impl IntoIterator for SearchPage {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchPage {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

/// CIMI query parameters for collection searches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchParams {
    /// Filter expression, e.g. `name='my key'`.
    #[serde(rename = "$filter", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// First position of the window (1-indexed).
    #[serde(rename = "$first", skip_serializing_if = "Option::is_none")]
    pub first: Option<u64>,
    /// Last position of the window (inclusive).
    #[serde(rename = "$last", skip_serializing_if = "Option::is_none")]
    pub last: Option<u64>,
    /// Ordering, e.g. `created:desc`.
    #[serde(rename = "$orderby", skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
    /// Comma-separated attributes to return.
    #[serde(rename = "$select", skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    /// Aggregation expression, e.g. `count:id`.
    #[serde(rename = "$aggregation", skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    /// Comma-separated references to expand.
    #[serde(rename = "$expand", skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
}

impl SearchParams {
    /// Search params for a specific window.
    #[must_use]
    pub fn for_window(first: u64, last: u64) -> Self {
        Self::default().with_window(first, last)
    }

    #[must_use]
    pub fn with_window(mut self, first: u64, last: u64) -> Self {
        self.first = Some(first);
        self.last = Some(last);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    #[must_use]
    pub fn with_orderby(mut self, orderby: &str) -> Self {
        self.orderby = Some(orderby.to_string());
        self
    }

    #[must_use]
    pub fn with_select(mut self, select: &str) -> Self {
        self.select = Some(select.to_string());
        self
    }

    /// Convert into request options.
    pub fn to_options(&self) -> Result<Value> {
        Value::from_serializable(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> Value {
        Value::mapping([("id", id)])
    }

    fn collection(count: u64, ids: &[&str]) -> Value {
        Value::mapping([
            ("id", Value::from("credential")),
            ("count", Value::from(count)),
            (
                "operations",
                Value::from(vec![Value::mapping([("rel", "add"), ("href", "credential")])]),
            ),
            (
                "credentials",
                Value::Sequence(ids.iter().map(|id| resource(id)).collect()),
            ),
        ])
    }

    #[test]
    fn test_page_extracts_resources_by_key() {
        let page = SearchPage::from_document(
            collection(2, &["credential/1", "credential/2"]),
            Some("credentials"),
            None,
            None,
        );
        assert_eq!(page.len(), 2);
        assert_eq!(page.count, Some(2));
        assert!(!page.has_more);
        assert!(page.metadata.get("credentials").is_none());
        assert!(page.metadata.get("operations").is_some());
    }

    #[test]
    fn test_page_skips_operations_without_key() {
        let page = SearchPage::from_document(collection(1, &["credential/1"]), None, None, None);
        assert_eq!(page.resources, vec![resource("credential/1")]);
    }

    #[test]
    fn test_page_has_more_with_count() {
        // Window 1..=100 of 250
        let page = SearchPage::from_document(collection(250, &["a"; 100]), None, Some(1), Some(100));
        assert!(page.has_more);

        // Window 201..=300 of 250
        let page = SearchPage::from_document(collection(250, &["a"; 50]), None, Some(201), Some(300));
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_has_more_without_count() {
        let mut document = collection(0, &["a"; 10]);
        let _ = document.as_mapping_mut().unwrap().shift_remove("count");

        let page = SearchPage::from_document(document.clone(), None, Some(1), Some(10));
        assert!(page.has_more);

        let page = SearchPage::from_document(document, None, Some(1), Some(20));
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_offset_near_max_does_not_overflow() {
        let page = SearchPage::from_document(
            collection(10, &["a", "b"]),
            None,
            Some(u64::MAX),
            None,
        );
        assert!(!page.has_more);

        let mut document = collection(0, &["a"]);
        let _ = document.as_mapping_mut().unwrap().shift_remove("count");
        let page = SearchPage::from_document(document, None, Some(0), Some(u64::MAX));
        assert!(!page.has_more);
    }

    #[test]
    fn test_empty_collection() {
        let page = SearchPage::from_document(collection(0, &[]), Some("credentials"), None, None);
        assert!(page.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_search_params_use_cimi_names() {
        let options = SearchParams::for_window(1, 10)
            .with_filter("name='x'")
            .to_options()
            .unwrap();
        assert_eq!(options.get_str("$filter"), Some("name='x'"));
        assert_eq!(options.get("$first").and_then(Value::as_u64), Some(1));
        assert_eq!(options.get("$last").and_then(Value::as_u64), Some(10));
        assert!(options.get("$orderby").is_none());
    }
}
