use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::adapter::ClassTemplate;
use crate::dependency::DependencySpec;
use crate::expr::Expr;
use crate::spec::field::FieldSpec;
use crate::spec::form::FormSpec;

/// A single finding about a form's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub message: String,
    pub code: String,
}

/// Registration-time diagnostics for a form.
///
/// Errors make a field unusable (it will stay hidden); warnings describe
/// configuration that resolves but is likely unintended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

pub fn validate(spec: &FormSpec) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(template) = spec
        .presentation
        .as_ref()
        .and_then(|presentation| presentation.class_template.as_deref())
        && let Err(error) = ClassTemplate::new(template)
    {
        errors.push(issue(None, error.to_string(), "invalid_class_template"));
    }

    let mut seen = BTreeSet::new();
    for field in &spec.fields {
        if !seen.insert(field.id.as_str()) {
            errors.push(issue(
                Some(field),
                format!("duplicate field id '{}'", field.id),
                "duplicate_field",
            ));
        }

        check_patterns(field, field.resolve.as_ref(), "resolve", &mut errors);
        check_patterns(field, field.value_matches.as_ref(), "value_matches", &mut errors);

        if let Some(target) = &field.depends_on
            && target.paths().iter().any(|path| path.as_str() == field.id)
        {
            warnings.push(issue(
                Some(field),
                format!("field '{}' depends on its own value", field.id),
                "self_dependency",
            ));
        }

        let Some(config) = field.dependency_config() else {
            continue;
        };
        match DependencySpec::compile(config) {
            Ok(compiled) => {
                warnings.extend(
                    compiled
                        .warnings
                        .iter()
                        .map(|warning| issue(Some(field), warning.to_string(), warning.code())),
                );
            }
            Err(error) => errors.push(issue(Some(field), error.to_string(), "invalid_dependency")),
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_patterns(
    field: &FieldSpec,
    expr: Option<&Expr>,
    key: &str,
    errors: &mut Vec<ValidationIssue>,
) {
    if let Some(expr) = expr
        && let Err(error) = expr.check_patterns()
    {
        errors.push(issue(
            Some(field),
            format!("{key} has an invalid pattern: {error}"),
            "invalid_pattern",
        ));
    }
}

fn issue(field: Option<&FieldSpec>, message: impl Into<String>, code: &str) -> ValidationIssue {
    ValidationIssue {
        field_id: field.map(|field| field.id.clone()),
        message: message.into(),
        code: code.into(),
    }
}
