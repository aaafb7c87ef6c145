use serde_json::{Map, Value, json};

use crate::{
    adapter::{
        ClassTemplate, ConditionalFieldAdapter, FieldRenderer, LabelWrapper, RenderedField,
        TemplateError,
    },
    dependency::DependencyTarget,
    spec::{field::FieldDescriptor, form::FormSpec},
    store::FormValues,
    visibility::VisibilityResolver,
};

/// Field renderer producing JSON control descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFieldRenderer;

impl FieldRenderer for JsonFieldRenderer {
    type Output = Value;

    fn render_field(&mut self, field: &FieldDescriptor, props: &Map<String, Value>) -> Value {
        json!({
            "type": "input",
            "source": field.source,
            "props": props,
        })
    }
}

/// Wraps JSON controls in a labelled container.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLabelWrapper;

impl LabelWrapper<Value> for JsonLabelWrapper {
    fn wrap(&mut self, field: &FieldDescriptor, rendered: Value) -> Value {
        let label = field
            .label
            .clone()
            .or_else(|| field.source.clone())
            .unwrap_or_default();
        json!({
            "type": "labeled",
            "label": label,
            "input": rendered,
        })
    }
}

/// Describes a single conditional field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: Option<String>,
    pub depends_on: Option<DependencyTarget>,
    pub visible: bool,
    pub rendered: Vec<RenderedField<Value>>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub help: Option<String>,
    pub visible: usize,
    pub total: usize,
    pub fields: Vec<RenderField>,
}

/// Resolves visibility for every field of `spec` and renders the visible ones.
pub fn build_render_payload<S>(spec: &FormSpec, values: &S) -> Result<RenderPayload, TemplateError>
where
    S: FormValues + ?Sized,
{
    let resolver = VisibilityResolver::new(spec);
    let visibility = resolver.resolve_fields(values);
    let mut adapter = ConditionalFieldAdapter::new(JsonFieldRenderer)
        .with_label(JsonLabelWrapper)
        .with_class_template(ClassTemplate::new(spec.class_template())?);

    let fields = spec
        .fields
        .iter()
        .zip(visibility)
        .map(|(field, visible)| RenderField {
            id: field.id.clone(),
            label: field.label.clone(),
            depends_on: field.depends_on.clone(),
            visible,
            rendered: adapter.render(visible, field).into_fields(),
        })
        .collect::<Vec<_>>();

    let help = spec
        .presentation
        .as_ref()
        .and_then(|presentation| presentation.intro.clone())
        .or_else(|| spec.description.clone());

    Ok(RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        help,
        visible: fields.iter().filter(|field| field.visible).count(),
        total: fields.len(),
        fields,
    })
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            if let Some(label) = &field.label {
                map.insert("label".into(), Value::String(label.clone()));
            }
            if let Some(target) = &field.depends_on {
                map.insert("depends_on".into(), target_value(target));
            }
            map.insert("visible".into(), Value::Bool(field.visible));
            map.insert(
                "rendered".into(),
                Value::Array(
                    field
                        .rendered
                        .iter()
                        .map(|rendered| {
                            json!({
                                "index": rendered.index,
                                "class_name": rendered.class_name,
                                "output": rendered.output,
                            })
                        })
                        .collect(),
                ),
            );
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "help": payload.help,
        "progress": {
            "visible": payload.visible,
            "total": payload.total,
        },
        "fields": fields,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({})",
        payload.form_title, payload.form_id
    ));
    lines.push(format!(
        "Visible fields: {}/{}",
        payload.visible, payload.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    for field in &payload.fields {
        let mut entry = format!(
            " - {} [{}]",
            field.id,
            if field.visible { "shown" } else { "hidden" }
        );
        if let Some(target) = &field.depends_on {
            entry.push_str(&format!(" depends on {}", target_display(target)));
        }
        lines.push(entry);
        for rendered in &field.rendered {
            lines.push(format!("     {}", rendered.class_name));
        }
    }

    lines.join("\n")
}

fn target_value(target: &DependencyTarget) -> Value {
    match target {
        DependencyTarget::Path(path) => Value::String(path.to_string()),
        DependencyTarget::Paths(paths) => paths
            .iter()
            .map(|path| Value::String(path.to_string()))
            .collect(),
    }
}

fn target_display(target: &DependencyTarget) -> String {
    target
        .paths()
        .iter()
        .map(|path| path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
