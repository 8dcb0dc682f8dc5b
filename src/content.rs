use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::normalize::{
    MediaAsset, Record, extract_media_items, first_media_item, get_relation, relation_list,
    str_field,
};

/// One entry of a dynamic zone.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    RichText {
        body: Option<String>,
    },
    Quote {
        title: Option<String>,
        body: Option<String>,
    },
    Media {
        file: Option<MediaAsset>,
    },
    Slider {
        files: Vec<MediaAsset>,
    },
    Unknown {
        component: String,
        raw: Value,
    },
}

impl Block {
    pub fn from_value(value: &Value) -> Self {
        let component = value
            .get("__component")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(record) = value.as_object() else {
            return Self::unknown(component, value);
        };

        match component_tag(component) {
            "rich-text" => Self::RichText {
                body: raw_str_field(record, "body"),
            },
            "quote" => Self::Quote {
                title: str_field(record, "title"),
                body: raw_str_field(record, "body"),
            },
            "media" => Self::Media {
                file: record.get("file").and_then(first_media_item),
            },
            "slider" => Self::Slider {
                files: record
                    .get("files")
                    .map(extract_media_items)
                    .unwrap_or_default(),
            },
            _ => Self::unknown(component, value),
        }
    }

    fn unknown(component: &str, value: &Value) -> Self {
        Self::Unknown {
            component: component.to_owned(),
            raw: value.clone(),
        }
    }
}

/// `shared.rich-text` -> `rich-text`
pub fn component_tag(component: &str) -> &str {
    component
        .rsplit_once('.')
        .map_or(component, |(_, tag)| tag)
}

/// Blocks of an entry's dynamic zone. Anything but an array yields none.
pub fn blocks(record: &Record) -> Vec<Block> {
    match record.get("blocks") {
        Some(Value::Array(items)) => items.iter().map(Block::from_value).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<MediaAsset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRef {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover: Option<MediaAsset>,
    pub author: Option<Author>,
    pub category: Option<CategoryRef>,
    pub published_at: Option<DateTime<Utc>>,
    pub blocks: Vec<Block>,
}

impl Article {
    pub fn from_record(record: &Record) -> Self {
        let author = record.get("author").and_then(get_relation).map(|author| Author {
            name: str_field(&author, "name"),
            email: str_field(&author, "email"),
            avatar: author.get("avatar").and_then(first_media_item),
        });
        let category = record
            .get("category")
            .and_then(get_relation)
            .map(|category| CategoryRef {
                name: str_field(&category, "name"),
                slug: str_field(&category, "slug"),
            });

        Self {
            title: str_field(record, "title").unwrap_or_else(|| "Untitled".to_owned()),
            slug: str_field(record, "slug"),
            description: str_field(record, "description"),
            cover: record.get("cover").and_then(first_media_item),
            author,
            category,
            published_at: str_field(record, "publishedAt").and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            blocks: blocks(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct About {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl About {
    pub fn from_record(record: &Record) -> Self {
        Self {
            title: str_field(record, "title").unwrap_or_else(|| "About".to_owned()),
            blocks: blocks(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub articles: Vec<Article>,
}

impl Category {
    pub fn from_record(record: &Record) -> Self {
        Self {
            name: str_field(record, "name").unwrap_or_else(|| "Category".to_owned()),
            slug: str_field(record, "slug"),
            description: str_field(record, "description"),
            articles: record
                .get("articles")
                .map(relation_list)
                .unwrap_or_default()
                .iter()
                .map(Article::from_record)
                .collect(),
        }
    }
}

// Markdown bodies keep their whitespace; only all-blank bodies count as absent.
fn raw_str_field(record: &Record, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}
