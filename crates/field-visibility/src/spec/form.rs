use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldSpec;

/// Class given to each rendered child when the form does not override it.
pub const DEFAULT_CLASS_TEMPLATE: &str = "aor-input-{{source}}";

/// Presentation hints for a form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormPresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    /// Handlebars template for the class of each rendered child. `source` is
    /// the child's source (or the field id) and `field` the field id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_template: Option<String>,
}

/// Top-level form definition: the fields whose visibility is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<FormPresentation>,
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn class_template(&self) -> &str {
        self.presentation
            .as_ref()
            .and_then(|presentation| presentation.class_template.as_deref())
            .unwrap_or(DEFAULT_CLASS_TEMPLATE)
    }
}
