use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A literal fixed into a block field at authoring time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            FieldValue::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", format_num(*n)),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// One node of the editor's program graph. Edges are block ids into the
/// owning [`Workspace`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockInstance {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statements: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, rename = "topLevel")]
    pub top_level: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
}

impl BlockInstance {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn input(mut self, slot: impl Into<String>, block_id: impl Into<String>) -> Self {
        self.inputs.insert(slot.into(), block_id.into());
        self
    }

    pub fn statement(mut self, slot: impl Into<String>, head_id: impl Into<String>) -> Self {
        self.statements.insert(slot.into(), head_id.into());
        self
    }

    pub fn next(mut self, block_id: impl Into<String>) -> Self {
        self.next = Some(block_id.into());
        self
    }

    pub fn top_level_at(mut self, x: i64, y: i64) -> Self {
        self.top_level = true;
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field rendered as text, whatever literal kind it holds.
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(ToString::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockInstance>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, block: BlockInstance) -> &mut Self {
        self.blocks.insert(id.into(), block);
        self
    }

    pub fn get(&self, id: &str) -> Option<&BlockInstance> {
        self.blocks.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Heads of the top-level statement chains, ordered top-to-bottom then
    /// left-to-right, with the block id as the final tie-breaker.
    pub fn top_level_ids(&self) -> Vec<&str> {
        let mut ids = self
            .blocks
            .iter()
            .filter(|(_, block)| block.top_level)
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>();
        ids.sort_by(|a, b| self.sort_key(a).cmp(&self.sort_key(b)));
        ids
    }

    fn sort_key<'a>(&self, id: &'a str) -> (i64, i64, &'a str) {
        let block = self.blocks.get(id);
        let y = block.and_then(|b| b.y).unwrap_or(i64::MAX);
        let x = block.and_then(|b| b.x).unwrap_or(i64::MAX);
        (y, x, id)
    }
}

pub fn format_num(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_chains_sort_by_position_then_id() {
        let mut ws = Workspace::new();
        ws.insert("b", BlockInstance::new("tick").top_level_at(0, 10))
            .insert("a", BlockInstance::new("tick").top_level_at(50, 10))
            .insert("c", BlockInstance::new("tick").top_level_at(0, 0))
            .insert("d", BlockInstance::new("tick"));
        assert_eq!(ws.top_level_ids(), vec!["c", "b", "a"]);
    }

    #[test]
    fn field_values_deserialize_untagged() {
        let block: BlockInstance = serde_json::from_str(
            r#"{"type":"math_number","fields":{"NUM":3,"FLAG":true,"NAME":"x"}}"#,
        )
        .unwrap();
        assert_eq!(block.field_value("NUM"), Some(&FieldValue::Number(3.0)));
        assert_eq!(block.field_value("FLAG"), Some(&FieldValue::Bool(true)));
        assert_eq!(block.field_text("NAME").as_deref(), Some("x"));
        assert_eq!(block.field_text("NUM").as_deref(), Some("3"));
    }
}
