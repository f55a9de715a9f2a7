//! Container Module
//!
//! The DOM-like surface the batch renderer writes into.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

// == Row ==
/// One rendered item: its markup plus lookup attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub markup: String,
    pub attributes: BTreeMap<String, String>,
}

impl Row {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

// == Fragment ==
/// Off-screen group of rows appended to a container in one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fragment {
    rows: Vec<Row>,
}

impl Fragment {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// == Container ==
/// Host surface exposing "clear contents" and "append fragment".
pub trait Container {
    fn clear(&mut self);
    fn append(&mut self, fragment: Fragment);
}

// == Row Identity ==
/// Identifying attributes copied onto a rendered row for later lookup.
pub trait RowIdentity {
    fn row_id(&self) -> Option<String> {
        None
    }

    fn row_sku(&self) -> Option<String> {
        None
    }
}

/// Reads `id` and `sku` fields from JSON objects. Strings are copied as is,
/// numbers and booleans in their JSON text form; other types are ignored.
impl RowIdentity for Value {
    fn row_id(&self) -> Option<String> {
        json_attribute(self, "id")
    }

    fn row_sku(&self) -> Option<String> {
        json_attribute(self, "sku")
    }
}

fn json_attribute(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RowIdentity for String {}

impl RowIdentity for &str {}

// == Memory Container ==
/// In-memory container recording rows and operation counts.
#[derive(Debug, Default)]
pub struct MemoryContainer {
    rows: Vec<Row>,
    appends: usize,
    clears: usize,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Finds a row by its copied `id` attribute.
    pub fn find_by_id(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.attribute("id") == Some(id))
    }

    pub fn append_count(&self) -> usize {
        self.appends
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl Container for MemoryContainer {
    fn clear(&mut self) {
        self.rows.clear();
        self.clears += 1;
    }

    fn append(&mut self, fragment: Fragment) {
        self.rows.extend(fragment.into_rows());
        self.appends += 1;
    }
}
