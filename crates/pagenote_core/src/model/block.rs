//! Block domain model and the JSON payload boundary.
//!
//! # Responsibility
//! - Represent one ordered content unit of a page.
//! - Restrict payloads to JSON-representable values.
//! - Derive page summary and preview images from block content.
//!
//! # Invariants
//! - `sort_order` values of a page's blocks form a dense `0..n-1` sequence.
//! - `block_id` is unique within its page only.
//! - Payload key order survives a storage round trip.

use super::item::PageId;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Block type whose `text` contributes to the page summary.
pub const PARAGRAPH_BLOCK_TYPE: &str = "paragraph";
/// Block type scanned for preview image URLs.
pub const IMAGE_BLOCK_TYPE: &str = "image";

/// Open, order-preserving key/value payload of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockPayload(Map<String, Value>);

impl BlockPayload {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Accepts any JSON value; anything but an object becomes an empty payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Converts caller data at the boundary.
    ///
    /// Inputs that cannot be represented as a JSON object (non-string map
    /// keys, failing `Serialize` impls, scalars) are dropped to an empty
    /// payload instead of failing the write.
    pub fn from_serializable<T: Serialize + ?Sized>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::from_value(value),
            Err(err) => {
                warn!(
                    "event=block_payload_dropped module=model status=warn reason=unserializable error={}",
                    err
                );
                Self::default()
            }
        }
    }

    /// Parses a persisted payload; unreadable text degrades to empty.
    pub fn from_json_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(err) => {
                warn!(
                    "event=block_payload_dropped module=model status=warn reason=unparsable error={}",
                    err
                );
                Self::default()
            }
        }
    }

    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for BlockPayload {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Caller-supplied block as part of a composite page write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInput {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: BlockPayload,
}

impl BlockInput {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: BlockPayload) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
        }
    }
}

/// Persisted block row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub page_uuid: PageId,
    pub block_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: BlockPayload,
    pub sort_order: i64,
    /// Epoch ms.
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// Lays out inputs as rows with `sort_order` equal to their index.
pub fn layout_blocks(page_uuid: PageId, inputs: &[BlockInput], now_ms: i64) -> Vec<Block> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| Block {
            page_uuid,
            block_id: input.id.clone(),
            kind: input.kind.clone(),
            data: input.data.clone(),
            sort_order: index as i64,
            created_at: now_ms,
            deleted_at: None,
        })
        .collect()
}

/// Derives the page summary from ordered block inputs.
///
/// The first paragraph block carrying a string `text` wins; its text is
/// trimmed and cut to `max_chars` code points. Other block types never
/// contribute. Returns an empty string when nothing qualifies.
pub fn derive_summary(blocks: &[BlockInput], max_chars: usize) -> String {
    blocks
        .iter()
        .filter(|block| block.kind == PARAGRAPH_BLOCK_TYPE)
        .find_map(|block| block.data.get("text").and_then(Value::as_str))
        .map(|text| {
            let cut: String = text.trim().chars().take(max_chars).collect();
            cut.trim_end().to_string()
        })
        .unwrap_or_default()
}

/// Collects up to `max` image URLs from image blocks in order.
///
/// Supports `data.file.url` and the flat `data.url` shape.
pub fn extract_image_urls(blocks: &[Block], max: usize) -> Vec<String> {
    blocks
        .iter()
        .filter(|block| block.kind == IMAGE_BLOCK_TYPE)
        .filter_map(|block| image_url(&block.data))
        .take(max)
        .collect()
}

fn image_url(data: &BlockPayload) -> Option<String> {
    let url = match data.get("file").and_then(Value::as_object) {
        Some(file) => file.get("url").and_then(Value::as_str),
        None => data.get("url").and_then(Value::as_str),
    }?;
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        derive_summary, extract_image_urls, layout_blocks, BlockInput, BlockPayload,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn input(id: &str, kind: &str, data: serde_json::Value) -> BlockInput {
        BlockInput::new(id, kind, BlockPayload::from_value(data))
    }

    #[test]
    fn summary_uses_first_paragraph_only() {
        let blocks = vec![
            input("h", "header", json!({"text": "Heading"})),
            input("p0", "paragraph", json!({"other": 1})),
            input("p1", "paragraph", json!({"text": "  first words  "})),
            input("p2", "paragraph", json!({"text": "second"})),
        ];
        assert_eq!(derive_summary(&blocks, 100), "first words");
    }

    #[test]
    fn summary_truncates_on_code_points() {
        let text = "é".repeat(150);
        let blocks = vec![input("p", "paragraph", json!({ "text": text }))];
        let summary = derive_summary(&blocks, 100);
        assert_eq!(summary.chars().count(), 100);
    }

    #[test]
    fn summary_is_empty_without_paragraphs() {
        let blocks = vec![input("i", "image", json!({"url": "a.png"}))];
        assert_eq!(derive_summary(&blocks, 100), "");
    }

    #[test]
    fn image_urls_support_both_shapes_and_cap() {
        let page = Uuid::new_v4();
        let inputs: Vec<BlockInput> = (0..6)
            .map(|idx| {
                if idx % 2 == 0 {
                    input(&format!("b{idx}"), "image", json!({"file": {"url": format!("f{idx}.png")}}))
                } else {
                    input(&format!("b{idx}"), "image", json!({"url": format!("u{idx}.png")}))
                }
            })
            .chain([input("t", "paragraph", json!({"url": "ignored.png"}))])
            .collect();
        let blocks = layout_blocks(page, &inputs, 0);
        let urls = extract_image_urls(&blocks, 4);
        assert_eq!(urls, vec!["f0.png", "u1.png", "f2.png", "u3.png"]);
    }

    #[test]
    fn layout_assigns_dense_sort_order() {
        let inputs = vec![
            input("a", "paragraph", json!({})),
            input("b", "paragraph", json!({})),
        ];
        let blocks = layout_blocks(Uuid::new_v4(), &inputs, 7);
        let orders: Vec<i64> = blocks.iter().map(|block| block.sort_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn payload_boundary_drops_non_object_and_unserializable_input() {
        assert!(BlockPayload::from_value(json!([1, 2])).as_map().is_empty());

        let mut bad_keys: HashMap<(u8, u8), u8> = HashMap::new();
        bad_keys.insert((1, 2), 3);
        assert!(BlockPayload::from_serializable(&bad_keys).as_map().is_empty());

        assert!(BlockPayload::from_json_text("{not json").as_map().is_empty());
    }

    #[test]
    fn payload_preserves_key_order() {
        let payload = BlockPayload::from_json_text(r#"{"z":1,"a":{"y":[1,null,true],"b":"x"}}"#);
        let text = payload.to_json_text().unwrap();
        assert_eq!(text, r#"{"z":1,"a":{"y":[1,null,true],"b":"x"}}"#);
    }
}
