//! Flattening of the payload shapes Strapi returns for media and relation
//! fields.
//!
//! Depending on the population mode and API version a field may come back
//! bare, wrapped in `{ "attributes": ... }`, wrapped in `{ "data": ... }`, or
//! both. Media and relation fields are unwrapped by separate functions: media
//! fields may legitimately hold several assets, while relation accessors only
//! ever resolve a single record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub formats: BTreeMap<String, MediaFormat>,
}

impl MediaAsset {
    fn from_url(url: &str) -> Self {
        Self {
            url: Some(url.to_owned()),
            ..Self::default()
        }
    }

    /// Reads a terminal asset object field by field, so a single oddly typed
    /// field never discards the whole asset.
    fn from_record(record: &Record) -> Self {
        let formats = record
            .get("formats")
            .and_then(Value::as_object)
            .map(|formats| {
                formats
                    .iter()
                    .filter_map(|(name, format)| {
                        let format = format.as_object()?;
                        Some((
                            name.clone(),
                            MediaFormat {
                                url: str_field(format, "url"),
                                width: format.get("width").and_then(Value::as_u64),
                                height: format.get("height").and_then(Value::as_u64),
                            },
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            url: str_field(record, "url"),
            alternative_text: str_field(record, "alternativeText"),
            caption: str_field(record, "caption"),
            name: str_field(record, "name"),
            width: record.get("width").and_then(Value::as_u64),
            height: record.get("height").and_then(Value::as_u64),
            formats,
        }
    }

    /// Preferred display URL before origin resolution: `large`, then
    /// `medium`, then the original upload.
    pub fn display_url(&self) -> Option<&str> {
        ["large", "medium"]
            .iter()
            .find_map(|name| self.formats.get(*name).and_then(|f| f.url.as_deref()))
            .or(self.url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}

/// Collects every media asset found in `value`, in order.
pub fn extract_media_items(value: &Value) -> Vec<MediaAsset> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(extract_media_items).collect(),
        Value::String(url) => vec![MediaAsset::from_url(url)],
        Value::Object(record) => {
            if let Some(inner) = record.get("attributes") {
                extract_media_items(inner)
            } else if let Some(inner) = record.get("data") {
                extract_media_items(inner)
            } else if record.contains_key("url") || record.contains_key("formats") {
                vec![MediaAsset::from_record(record)]
            } else {
                Vec::new()
            }
        }
        Value::Bool(_) | Value::Number(_) => Vec::new(),
    }
}

/// First media asset found in `value`.
pub fn first_media_item(value: &Value) -> Option<MediaAsset> {
    extract_media_items(value).into_iter().next()
}

/// Absolute display URL of `asset`, resolving relative upload paths
/// against the CMS origin.
pub fn media_url(asset: Option<&MediaAsset>, origin: &str) -> Option<String> {
    let url = asset?.display_url()?;
    Some(resolve_url(url, origin))
}

pub fn resolve_url(url: &str, origin: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_owned();
    }

    let origin = origin.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{origin}{url}")
    } else {
        format!("{origin}/{url}")
    }
}

/// Resolves a single-valued relation to its flat record.
///
/// A `data` array is a many-relation and yields `None`; this accessor
/// never picks an element out of it.
pub fn get_relation(value: &Value) -> Option<Record> {
    let record = value.as_object()?;

    let record = match record.get("data") {
        Some(Value::Null) | Some(Value::Array(_)) => return None,
        Some(data) => data.as_object()?,
        None => record,
    };

    match record.get("attributes") {
        Some(attributes) => attributes.as_object().cloned(),
        None => Some(record.clone()),
    }
}

/// Resolves a many-relation (a bare array or `{ "data": [...] }`) to its
/// flat records. Items that are not objects are skipped.
pub fn relation_list(value: &Value) -> Vec<Record> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(record) => match record.get("data") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let record = item.as_object()?;
            match record.get("attributes") {
                Some(attributes) => attributes.as_object().cloned(),
                None => Some(record.clone()),
            }
        })
        .collect()
}

/// First entry of a `{ "data": Entry | [Entry] | null }` response body.
pub fn response_entry(body: &Value) -> Option<Record> {
    let data = body.get("data")?;
    let entry = match data {
        Value::Array(entries) => entries.first()?,
        other => other,
    };
    let record = entry.as_object()?;

    match record.get("attributes") {
        Some(attributes) => attributes.as_object().cloned(),
        None => Some(record.clone()),
    }
}

/// All entries of a collection response body.
pub fn response_entries(body: &Value) -> Vec<Record> {
    body.get("data").map(relation_list).unwrap_or_default()
}

pub fn str_field(record: &Record, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ORIGIN: &str = "http://cms.local";

    fn asset(value: Value) -> MediaAsset {
        let mut items = extract_media_items(&value);
        assert_eq!(items.len(), 1, "expected one asset from {value}");
        items.remove(0)
    }

    #[test]
    fn all_wrapper_depths_normalize_identically() {
        let expected = vec![MediaAsset::from_url("/x.png")];
        for value in [
            json!({ "data": { "attributes": { "url": "/x.png" } } }),
            json!({ "attributes": { "url": "/x.png" } }),
            json!({ "url": "/x.png" }),
            json!({ "attributes": { "data": { "url": "/x.png" } } }),
        ] {
            assert_eq!(extract_media_items(&value), expected, "input: {value}");
        }
    }

    #[test]
    fn extraction_is_idempotent_on_flat_records() {
        let first = asset(json!({
            "url": "/x.png",
            "alternativeText": "An x",
            "formats": { "small": { "url": "/small_x.png", "width": 500 } }
        }));
        let again = asset(serde_json::to_value(&first).unwrap());
        assert_eq!(first, again);
    }

    #[test]
    fn arrays_flatten_and_drop_empties() {
        let value = json!({
            "data": [
                { "attributes": { "url": "/a.png" } },
                null,
                { "id": 3 },
                "/b.png",
                [{ "url": "/c.png" }]
            ]
        });
        let urls: Vec<_> = extract_media_items(&value)
            .into_iter()
            .filter_map(|a| a.url)
            .collect();
        assert_eq!(urls, vec!["/a.png", "/b.png", "/c.png"]);
    }

    #[test]
    fn unsupported_shapes_yield_nothing() {
        assert!(extract_media_items(&Value::Null).is_empty());
        assert!(extract_media_items(&json!(42)).is_empty());
        assert!(extract_media_items(&json!({ "data": null })).is_empty());
        assert!(extract_media_items(&json!({ "name": "no url" })).is_empty());
    }

    #[test]
    fn formats_only_object_is_terminal() {
        let found = asset(json!({ "formats": { "medium": { "url": "/m.png" } } }));
        assert_eq!(found.url, None);
        assert_eq!(media_url(Some(&found), ORIGIN).as_deref(), Some("http://cms.local/m.png"));
    }

    #[test]
    fn large_format_wins() {
        let found = asset(json!({
            "formats": { "large": { "url": "/a.png" }, "medium": { "url": "/b.png" } },
            "url": "/c.png"
        }));
        assert_eq!(media_url(Some(&found), ORIGIN).as_deref(), Some("http://cms.local/a.png"));
    }

    #[test]
    fn medium_then_root_fallback() {
        let medium = asset(json!({ "formats": { "medium": { "url": "/b.png" } }, "url": "/c.png" }));
        assert_eq!(media_url(Some(&medium), ORIGIN).as_deref(), Some("http://cms.local/b.png"));

        let root = asset(json!({ "formats": { "thumbnail": { "url": "/t.png" } }, "url": "/c.png" }));
        assert_eq!(media_url(Some(&root), ORIGIN).as_deref(), Some("http://cms.local/c.png"));
    }

    #[test]
    fn absolute_urls_are_not_prefixed() {
        for value in [
            json!({ "formats": { "large": { "url": "https://cdn.example/x.png" } } }),
            json!({ "formats": { "medium": { "url": "https://cdn.example/x.png" } } }),
            json!({ "url": "https://cdn.example/x.png" }),
        ] {
            let found = asset(value);
            assert_eq!(
                media_url(Some(&found), ORIGIN).as_deref(),
                Some("https://cdn.example/x.png")
            );
        }
    }

    #[test]
    fn media_url_of_nothing_is_none() {
        assert_eq!(media_url(None, ORIGIN), None);
        assert_eq!(media_url(Some(&MediaAsset::default()), ORIGIN), None);
    }

    #[test]
    fn relation_unwraps_each_depth() {
        let expected = json!({ "name": "Ada" });
        for value in [
            json!({ "data": { "attributes": { "name": "Ada" } } }),
            json!({ "data": { "name": "Ada" } }),
            json!({ "attributes": { "name": "Ada" } }),
            json!({ "name": "Ada" }),
        ] {
            let record = get_relation(&value).expect("relation");
            assert_eq!(Value::Object(record), expected, "input: {value}");
        }
    }

    #[test]
    fn relation_rejects_many_and_empty() {
        assert_eq!(get_relation(&json!({ "data": [{ "name": "a" }, { "name": "b" }] })), None);
        assert_eq!(get_relation(&json!({ "data": null })), None);
        assert_eq!(get_relation(&Value::Null), None);
        assert_eq!(get_relation(&json!("Ada")), None);
    }

    #[test]
    fn relation_list_accepts_bare_and_wrapped_arrays() {
        let bare = relation_list(&json!([{ "slug": "a" }, 7, { "attributes": { "slug": "b" } }]));
        let wrapped = relation_list(&json!({ "data": [{ "slug": "a" }, { "attributes": { "slug": "b" } }] }));
        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 2);
        assert!(relation_list(&json!({ "data": { "slug": "a" } })).is_empty());
    }

    #[test]
    fn response_entry_takes_first_of_collection() {
        let body = json!({ "data": [{ "title": "one" }, { "title": "two" }], "meta": {} });
        let entry = response_entry(&body).unwrap();
        assert_eq!(entry.get("title"), Some(&json!("one")));

        let single = json!({ "data": { "id": 1, "attributes": { "title": "about" } } });
        assert_eq!(response_entry(&single).unwrap().get("title"), Some(&json!("about")));

        assert_eq!(response_entry(&json!({ "data": [] })), None);
        assert_eq!(response_entry(&json!({ "data": null })), None);
    }
}
