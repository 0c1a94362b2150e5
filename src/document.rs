//! Record-map model: the block tree of one page as the service returns it.
//!
//! The service answers a page request with a *record map*: an object keyed
//! by block id whose values wrap a block (`{"role": ..., "value": {...}}`).
//! The map carries no traversal order of its own; the only ordering signal
//! is each block's `content` list.
//!
//! Parsing is deliberately lenient. A record whose `value` cannot be read as
//! a block is kept with `value: None` and later renders to the empty string,
//! so one odd block never fails the whole page. Only a response without a
//! block map at all is an error.

use crate::error::Notion2MdError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The block types the renderer knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Page,
    Header,
    SubHeader,
    SubSubHeader,
    Text,
    BulletedList,
    NumberedList,
    ToDo,
    Code,
    Quote,
    Divider,
    Image,
    Bookmark,
    /// Any other tag, kept verbatim.
    Unknown(String),
}

impl BlockType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "page" => BlockType::Page,
            "header" => BlockType::Header,
            "sub_header" => BlockType::SubHeader,
            "sub_sub_header" => BlockType::SubSubHeader,
            "text" => BlockType::Text,
            "bulleted_list" => BlockType::BulletedList,
            "numbered_list" => BlockType::NumberedList,
            "to_do" => BlockType::ToDo,
            "code" => BlockType::Code,
            "quote" => BlockType::Quote,
            "divider" => BlockType::Divider,
            "image" => BlockType::Image,
            "bookmark" => BlockType::Bookmark,
            other => BlockType::Unknown(other.to_string()),
        }
    }
}

/// One content block. Immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub id: String,
    /// Raw `type` tag; see [`Block::kind`].
    pub type_tag: String,
    /// Rich-text fields keyed by role (`title`, `caption`, `source`, ...).
    pub properties: Map<String, Value>,
    /// Child block ids in authored order.
    pub content: Vec<String>,
    /// Display hints (`display_source`, ...).
    pub format: Map<String, Value>,
}

impl Block {
    pub fn kind(&self) -> BlockType {
        BlockType::parse(&self.type_tag)
    }

    pub fn property(&self, role: &str) -> Option<&Value> {
        self.properties.get(role)
    }

    pub fn format_str(&self, key: &str) -> Option<&str> {
        self.format.get(key).and_then(Value::as_str)
    }

    /// Read a block out of a JSON value, or `None` when it is not an object.
    ///
    /// Fields with an unexpected shape fall back to their empty value.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let str_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let map_field = |key: &str| obj.get(key).and_then(Value::as_object).cloned().unwrap_or_default();

        let content = obj
            .get("content")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Block {
            id: str_field("id"),
            type_tag: str_field("type"),
            properties: map_field("properties"),
            content,
            format: map_field("format"),
        })
    }
}

/// A record-map entry: a block plus the caller's role on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockRecord {
    pub role: Option<String>,
    pub value: Option<Block>,
}

impl BlockRecord {
    pub fn new(block: Block) -> Self {
        Self {
            role: None,
            value: Some(block),
        }
    }

    fn from_value(value: &Value) -> Self {
        let role = value.get("role").and_then(Value::as_str).map(str::to_string);
        let mut inner = value.get("value");

        // Newer responses wrap the record once more: {"value": {"value": {...}, "role": ...}}.
        if let Some(v) = inner {
            if v.get("type").is_none() && v.get("value").map_or(false, Value::is_object) {
                inner = v.get("value");
            }
        }

        Self {
            role,
            value: inner.and_then(Block::from_value),
        }
    }
}

/// All blocks of one page, in the order the service listed them.
#[derive(Debug, Clone, Default)]
pub struct Document {
    records: Vec<(String, BlockRecord)>,
    index: HashMap<String, usize>,
}

impl Document {
    /// Build a document from `(id, record)` pairs, keeping their order.
    ///
    /// A repeated id replaces the earlier record in place.
    pub fn from_records(records: impl IntoIterator<Item = (String, BlockRecord)>) -> Self {
        let mut doc = Document::default();
        for (id, record) in records {
            if let Some(&pos) = doc.index.get(&id) {
                doc.records[pos].1 = record;
            } else {
                doc.index.insert(id.clone(), doc.records.len());
                doc.records.push((id, record));
            }
        }
        doc
    }

    /// Build a document from a block map (`{"<id>": {"value": {...}}, ...}`).
    ///
    /// Returns `None` when `block_map` is not an object.
    pub fn from_block_map(block_map: &Value) -> Option<Self> {
        let map = block_map.as_object()?;
        Some(Self::from_records(
            map.iter()
                .map(|(id, record)| (id.clone(), BlockRecord::from_value(record))),
        ))
    }

    /// Build a document from a full page-chunk response
    /// (`{"recordMap": {"block": {...}}}`).
    pub fn from_response(page_id: &str, response: &Value) -> Result<Self, Notion2MdError> {
        response
            .get("recordMap")
            .and_then(|rm| rm.get("block"))
            .and_then(Self::from_block_map)
            .ok_or_else(|| Notion2MdError::MissingBlockMap {
                page_id: page_id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BlockRecord> {
        self.index.get(id).map(|&i| &self.records[i].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Records in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BlockRecord)> {
        self.records.iter().map(|(id, r)| (id.as_str(), r))
    }
}
