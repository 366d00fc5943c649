//! Key/value state shared between the annotation layer and whatever UI
//! observes it. Every effective change notifies all listeners with the
//! top-level key that changed.
//!
//! A change is detected with [`is_equal`], which is deliberately loose: arrays
//! compare positionally, but an object only has to find each of its values
//! somewhere among the other operand's values. Nested arrays and objects are
//! never equal to anything, as if compared by identity.

use crate::prelude::HashMap;
use serde_json::{Map, Value};

/// Listener callback, called with the changed key
pub type StateListener = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct SharedState {
    values: HashMap<String, Value>,
    listeners: Vec<(ListenerId, StateListener)>,
    next_listener: u64,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener called after every effective change
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Stores `value` under `key`; `Value::Null` deletes it.
    /// Listeners run only when the value changed. Returns whether they ran.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        if changed(self.values.get(key), &value) {
            if value.is_null() {
                self.values.remove(key);
            } else {
                self.values.insert(key.to_string(), value);
            }
            self.notify(key);
            true
        } else {
            false
        }
    }

    /// Stores `value` under `key.field`, creating the `key` object if needed.
    /// A non-object value at `key` is replaced by an empty object first.
    pub fn set_field(&mut self, key: &str, field: &str, value: Value) -> bool {
        let entry = self
            .values
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            log::debug!("shared state key {} replaced by an object", key);
            *entry = Value::Object(Map::new());
        }
        let Value::Object(fields) = entry else {
            return false;
        };

        if !changed(fields.get(field), &value) {
            return false;
        }
        if value.is_null() {
            fields.remove(field);
        } else {
            fields.insert(field.to_string(), value);
        }
        self.notify(key);
        true
    }

    /// The value at `key`, `Value::Null` when absent
    pub fn get(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn get_field(&self, key: &str, field: &str) -> Value {
        self.values
            .get(key)
            .and_then(|v| v.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Whether `key` holds something other than null, `{}` or `[]`
    pub fn has(&self, key: &str) -> bool {
        has_value(self.values.get(key))
    }

    pub fn has_field(&self, key: &str, field: &str) -> bool {
        let top = self.values.get(key);
        has_value(top) && has_value(top.and_then(|v| v.get(field)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn notify(&self, key: &str) {
        for (_, listener) in &self.listeners {
            listener(key);
        }
    }
}

fn changed(current: Option<&Value>, value: &Value) -> bool {
    match current {
        Some(current) => !is_equal(current, value),
        // nothing stored never equals a new value, null included
        None => true,
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Change detection used by [`SharedState`]. Not symmetric.
pub fn is_equal(a: &Value, b: &Value) -> bool {
    match a {
        Value::Array(items) => arrays_equal(items, b),
        Value::Object(fields) => objects_equal(fields, b),
        _ => strict_equal(a, b),
    }
}

fn arrays_equal(a: &[Value], b: &Value) -> bool {
    match b {
        Value::Array(other) => {
            a.len() == other.len() && a.iter().zip(other).all(|(x, y)| strict_equal(x, y))
        }
        // strings have a length and indexable characters too
        Value::String(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::String(c.to_string())).collect();
            a.len() == chars.len() && a.iter().zip(&chars).all(|(x, y)| strict_equal(x, y))
        }
        _ => false,
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Value) -> bool {
    let candidates = enumerable_values(b);
    if a.is_empty() != candidates.is_empty() {
        return false;
    }
    a.values()
        .all(|value| candidates.iter().any(|candidate| strict_equal(value, candidate)))
}

/// What a `for ... in` walk over `value` would visit
fn enumerable_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(fields) => fields.values().cloned().collect(),
        Value::Array(items) => items.clone(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

fn strict_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}
