use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::dependency::{DependencyConfig, DependencyTarget, Expected, Predicate};
use crate::expr::Expr;

/// One control rendered when its conditional field is visible.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub add_label: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
}

/// A conditional field: its dependency plus the children it renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub id: String,
    #[serde(
        default,
        alias = "source",
        alias = "dependsOn",
        skip_serializing_if = "Option::is_none"
    )]
    pub depends_on: Option<DependencyTarget>,
    /// Expected value(s). An explicit `null` is an expected value, unlike a
    /// missing key.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Value>")]
    pub value: Option<Value>,
    /// Predicate given in place of an expected value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_matches: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub add_label: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDescriptor>,
    /// Passed through to every rendered child.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            depends_on: None,
            value: None,
            value_matches: None,
            resolve: None,
            label: None,
            add_label: false,
            children: Vec::new(),
            props: Map::new(),
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.depends_on.is_some()
            || self.value.is_some()
            || self.value_matches.is_some()
            || self.resolve.is_some()
    }

    /// Raw dependency configuration, or `None` for an unconditional field.
    pub fn dependency_config(&self) -> Option<DependencyConfig> {
        if !self.is_conditional() {
            return None;
        }

        let expected = match (&self.value, &self.value_matches) {
            (Some(value), _) => Some(Expected::Value(value.clone())),
            (None, Some(expr)) => Some(Expected::Predicate(Predicate::from_expr(expr.clone()))),
            (None, None) => None,
        };

        Some(DependencyConfig {
            target: self.depends_on.clone(),
            expected,
            predicate: self.resolve.clone().map(Predicate::from_expr),
        })
    }

    /// Children to render; a field without children renders itself.
    pub fn descriptors(&self) -> Cow<'_, [FieldDescriptor]> {
        if !self.children.is_empty() {
            return Cow::Borrowed(&self.children);
        }
        Cow::Owned(vec![FieldDescriptor {
            source: Some(self.id.clone()),
            label: self.label.clone(),
            add_label: self.add_label,
            props: Map::new(),
        }])
    }
}
