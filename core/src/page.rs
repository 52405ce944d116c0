//! Paging parameters and the two backend conventions for sending them.
//!
//! Python services take `ifPage`, `where` (a JSON-encoded filter), `page`
//! and `pageSize`. Java services use separate endpoints for paged and
//! unpaged queries (the paged one ends in `/page`) and take `page.pn`,
//! `page.size` and one `search.<field>` key per filter entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Suffix of paged endpoints in the Java convention.
pub const JAVA_PAGE_SUFFIX: &str = "/page";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageParam {
    pub page: u32,
    pub page_size: u32,
    pub if_page: bool,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

impl Default for PageParam {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            if_page: true,
            filter: Map::new(),
        }
    }
}

impl PageParam {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    /// Query everything in one go.
    pub fn unpaged() -> Self {
        Self {
            if_page: false,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }
}

/// A backend family's paging convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Python,
    Java,
}

impl Dialect {
    /// Append this dialect's paging keys to `params` and return the rule to
    /// call, which may differ from `rule`.
    pub fn apply(
        self,
        rule: &str,
        page: &PageParam,
        params: &mut Vec<(String, String)>,
    ) -> Result<String, ClientError> {
        match self {
            Dialect::Python => {
                let filter = serde_json::to_string(&page.filter)
                    .map_err(|e| ClientError::Serialization(e.to_string()))?;
                params.push(("ifPage".to_string(), u8::from(page.if_page).to_string()));
                params.push(("where".to_string(), filter));
                if page.if_page {
                    params.push(("page".to_string(), page.page.to_string()));
                    params.push(("pageSize".to_string(), page.page_size.to_string()));
                }
                Ok(rule.to_string())
            }
            Dialect::Java => {
                let rule = if page.if_page {
                    params.push(("page.pn".to_string(), page.page.to_string()));
                    params.push(("page.size".to_string(), page.page_size.to_string()));
                    rule
                } else {
                    rule.strip_suffix(JAVA_PAGE_SUFFIX).unwrap_or(rule)
                };
                for (field, value) in &page.filter {
                    if let Some(value) = search_value(value) {
                        params.push((format!("search.{field}"), value));
                    }
                }
                Ok(rule.to_string())
            }
        }
    }
}

fn search_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(params: &[(String, String)]) -> Vec<&str> {
        params.iter().map(|(k, _)| k.as_str()).collect()
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn python_unpaged_sends_flag_and_where_only() {
        let mut params = Vec::new();
        let rule = Dialect::Python
            .apply("/orders", &PageParam::unpaged(), &mut params)
            .unwrap();
        assert_eq!(rule, "/orders");
        assert_eq!(keys(&params), vec!["ifPage", "where"]);
        assert_eq!(value(&params, "ifPage"), Some("0"));
        assert_eq!(value(&params, "where"), Some("{}"));
    }

    #[test]
    fn python_paged_encodes_filter_as_json() {
        let mut params = Vec::new();
        let page = PageParam::new(3, 50).with_filter("status", "open");
        Dialect::Python.apply("/orders", &page, &mut params).unwrap();
        assert_eq!(value(&params, "ifPage"), Some("1"));
        assert_eq!(value(&params, "page"), Some("3"));
        assert_eq!(value(&params, "pageSize"), Some("50"));
        let filter: Value = serde_json::from_str(value(&params, "where").unwrap()).unwrap();
        assert_eq!(filter, json!({"status": "open"}));
    }

    #[test]
    fn java_unpaged_strips_page_suffix() {
        let mut params = Vec::new();
        let rule = Dialect::Java
            .apply("/orders/page", &PageParam::unpaged(), &mut params)
            .unwrap();
        assert_eq!(rule, "/orders");
        assert!(params.is_empty());
    }

    #[test]
    fn java_only_strips_trailing_suffix() {
        let mut params = Vec::new();
        let rule = Dialect::Java
            .apply("/page/orders", &PageParam::unpaged(), &mut params)
            .unwrap();
        assert_eq!(rule, "/page/orders");
    }

    #[test]
    fn java_paged_sends_page_keys_and_search_prefix() {
        let mut params = Vec::new();
        let page = PageParam::new(2, 10)
            .with_filter("status", "open")
            .with_filter("qty", 5)
            .with_filter("deleted", Value::Null);
        let rule = Dialect::Java.apply("/orders/page", &page, &mut params).unwrap();
        assert_eq!(rule, "/orders/page");
        assert_eq!(value(&params, "page.pn"), Some("2"));
        assert_eq!(value(&params, "page.size"), Some("10"));
        assert_eq!(value(&params, "search.status"), Some("open"));
        assert_eq!(value(&params, "search.qty"), Some("5"));
        assert_eq!(value(&params, "search.deleted"), None);
    }
}
