use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::path::{FieldPath, assign, resolve};

static EMPTY_VALUES: Value = Value::Null;

/// Read access to one form's current values.
pub trait FormValues {
    fn get_all_values(&self) -> &Value;

    fn get_value(&self, path: &FieldPath) -> Option<&Value> {
        resolve(self.get_all_values(), path.as_str())
    }

    /// Subset of the values covering `paths`, nested the same way as the
    /// snapshot. Unknown paths are left out so they read back as absent.
    fn get_values(&self, paths: &[FieldPath]) -> Value {
        let mut subset = Value::Object(Map::new());
        for path in paths {
            if let Some(value) = self.get_value(path) {
                assign(&mut subset, path, value.clone());
            }
        }
        subset
    }
}

impl FormValues for Value {
    fn get_all_values(&self) -> &Value {
        self
    }
}

/// Borrowed view of one form's values inside a [`FormStore`].
#[derive(Debug, Clone, Copy)]
pub struct FormSnapshot<'a> {
    values: &'a Value,
}

impl<'a> FormSnapshot<'a> {
    pub fn new(values: &'a Value) -> Self {
        Self { values }
    }

    /// Snapshot of a form that has no values yet; every path is absent.
    pub fn empty() -> FormSnapshot<'static> {
        FormSnapshot {
            values: &EMPTY_VALUES,
        }
    }
}

impl FormValues for FormSnapshot<'_> {
    fn get_all_values(&self) -> &Value {
        self.values
    }
}

/// Values of several forms, addressed by form name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormStore {
    forms: BTreeMap<String, Value>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding a single form.
    pub fn single(name: impl Into<String>, values: Value) -> Self {
        let mut store = Self::new();
        store.insert_form(name, values);
        store
    }

    /// Reads a state tree shaped as `{"form": {"<name>": {"values": {...}}}}`.
    ///
    /// Returns `None` when `state` does not have that shape. Forms without a
    /// `values` entry are registered with empty values.
    pub fn from_state(state: &Value) -> Option<Self> {
        let forms = state.get("form")?.as_object()?;
        let mut store = Self::new();
        for (name, form) in forms {
            let form = form.as_object()?;
            let values = form
                .get("values")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            store.insert_form(name.clone(), values);
        }
        Some(store)
    }

    pub fn insert_form(&mut self, name: impl Into<String>, values: Value) -> Option<Value> {
        self.forms.insert(name.into(), values)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.forms.contains_key(name)
    }

    pub fn form_names(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    /// Snapshot of `name`; unknown forms yield an empty snapshot.
    pub fn snapshot(&self, name: &str) -> FormSnapshot<'_> {
        match self.forms.get(name) {
            Some(values) => FormSnapshot::new(values),
            None => FormSnapshot::empty(),
        }
    }

    /// Writes `value` at `path` in form `name`, creating the form if needed.
    pub fn set_value(&mut self, name: &str, path: &FieldPath, value: Value) {
        let values = self
            .forms
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        assign(values, path, value);
    }

    /// State tree in the shape accepted by [`FormStore::from_state`].
    pub fn to_state(&self) -> Value {
        let forms = self
            .forms
            .iter()
            .map(|(name, values)| {
                let mut form = Map::new();
                form.insert("values".into(), values.clone());
                (name.clone(), Value::Object(form))
            })
            .collect::<Map<_, _>>();
        let mut state = Map::new();
        state.insert("form".into(), Value::Object(forms));
        Value::Object(state)
    }
}
