use std::fmt;

use handlebars::Handlebars;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::warn;

use crate::spec::field::{FieldDescriptor, FieldSpec};
use crate::spec::form::DEFAULT_CLASS_TEMPLATE;

const CLASS_TEMPLATE_NAME: &str = "class";

/// Property key carrying the derived class of a rendered child.
pub const CLASS_NAME_PROP: &str = "class_name";

/// Renders one field control. Invoked only for visible fields.
pub trait FieldRenderer {
    type Output;

    fn render_field(&mut self, field: &FieldDescriptor, props: &Map<String, Value>)
    -> Self::Output;
}

/// Wraps a rendered control with its label.
pub trait LabelWrapper<O> {
    fn wrap(&mut self, field: &FieldDescriptor, rendered: O) -> O;
}

/// Leaves rendered controls as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabel;

impl<O> LabelWrapper<O> for NoLabel {
    fn wrap(&mut self, _field: &FieldDescriptor, rendered: O) -> O {
        rendered
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid class template: {0}")]
    Invalid(#[source] Box<handlebars::TemplateError>),
}

/// Handlebars template producing the addressing class of each child.
#[derive(Clone)]
pub struct ClassTemplate {
    source: String,
    registry: Handlebars<'static>,
}

impl ClassTemplate {
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(CLASS_TEMPLATE_NAME, template)
            .map_err(|error| TemplateError::Invalid(Box::new(error)))?;
        Ok(Self {
            source: template.to_string(),
            registry,
        })
    }

    /// Renders the class for one child. A template that fails at render time
    /// falls back to the default template.
    pub fn render(&self, source: &str, field_id: &str) -> String {
        let data = json!({ "source": source, "field": field_id });
        match self.registry.render(CLASS_TEMPLATE_NAME, &data) {
            Ok(class_name) => class_name,
            Err(error) if self.source != DEFAULT_CLASS_TEMPLATE => {
                warn!(template = %self.source, "class template failed: {error}");
                Self::default().render(source, field_id)
            }
            Err(error) => {
                warn!(template = %self.source, "default class template failed: {error}");
                source.to_string()
            }
        }
    }
}

impl Default for ClassTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_TEMPLATE).expect("default class template parses")
    }
}

impl fmt::Debug for ClassTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassTemplate").field(&self.source).finish()
    }
}

/// Output of one child of a visible conditional field.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField<O> {
    /// Position of the child in the field's descriptor list.
    pub index: usize,
    pub source: Option<String>,
    pub class_name: String,
    pub output: O,
}

/// What a conditional field renders to.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<O> {
    /// The field is hidden; the renderer was never called.
    Nothing,
    /// One entry per child, in input order.
    Group(Vec<RenderedField<O>>),
}

impl<O> Rendered<O> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Rendered::Nothing)
    }

    pub fn fields(&self) -> &[RenderedField<O>] {
        match self {
            Rendered::Nothing => &[],
            Rendered::Group(fields) => fields,
        }
    }

    pub fn into_fields(self) -> Vec<RenderedField<O>> {
        match self {
            Rendered::Nothing => Vec::new(),
            Rendered::Group(fields) => fields,
        }
    }
}

/// Renders the children of a conditional field, or nothing when hidden.
#[derive(Debug)]
pub struct ConditionalFieldAdapter<R, L = NoLabel> {
    renderer: R,
    label: L,
    classes: ClassTemplate,
}

impl<R: FieldRenderer> ConditionalFieldAdapter<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            label: NoLabel,
            classes: ClassTemplate::default(),
        }
    }
}

impl<R, L> ConditionalFieldAdapter<R, L>
where
    R: FieldRenderer,
    L: LabelWrapper<R::Output>,
{
    pub fn with_label<W>(self, label: W) -> ConditionalFieldAdapter<R, W>
    where
        W: LabelWrapper<R::Output>,
    {
        ConditionalFieldAdapter {
            renderer: self.renderer,
            label,
            classes: self.classes,
        }
    }

    pub fn with_class_template(mut self, classes: ClassTemplate) -> Self {
        self.classes = classes;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Renders every child of `field` when `show` is set.
    ///
    /// Each child receives the field's pass-through props overlaid with its
    /// own props and its derived class under [`CLASS_NAME_PROP`].
    pub fn render(&mut self, show: bool, field: &FieldSpec) -> Rendered<R::Output> {
        if !show {
            return Rendered::Nothing;
        }

        let rendered = field
            .descriptors()
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let source = descriptor.source.as_deref().unwrap_or(&field.id);
                let class_name = self.classes.render(source, &field.id);

                let mut props = field.props.clone();
                props.extend(descriptor.props.clone());
                props.insert(CLASS_NAME_PROP.into(), Value::String(class_name.clone()));

                let mut output = self.renderer.render_field(descriptor, &props);
                if field.add_label || descriptor.add_label {
                    output = self.label.wrap(descriptor, output);
                }

                RenderedField {
                    index,
                    source: descriptor.source.clone(),
                    class_name,
                    output,
                }
            })
            .collect();

        Rendered::Group(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct SpyRenderer {
        calls: Vec<(Option<String>, Map<String, Value>)>,
    }

    impl FieldRenderer for SpyRenderer {
        type Output = String;

        fn render_field(&mut self, field: &FieldDescriptor, props: &Map<String, Value>) -> String {
            self.calls.push((field.source.clone(), props.clone()));
            format!("input:{}", field.source.as_deref().unwrap_or("?"))
        }
    }

    struct Brackets;

    impl LabelWrapper<String> for Brackets {
        fn wrap(&mut self, field: &FieldDescriptor, rendered: String) -> String {
            format!("[{}] {}", field.label.as_deref().unwrap_or(""), rendered)
        }
    }

    fn child(source: &str) -> FieldDescriptor {
        FieldDescriptor {
            source: Some(source.into()),
            ..FieldDescriptor::default()
        }
    }

    #[test]
    fn hidden_field_never_calls_renderer() {
        let mut field = FieldSpec::new("email");
        field.children = vec![child("a"), child("b")];
        let mut adapter = ConditionalFieldAdapter::new(SpyRenderer::default());

        assert!(adapter.render(false, &field).is_nothing());
        assert!(adapter.renderer().calls.is_empty());
    }

    #[test]
    fn single_child_gets_source_class() {
        let mut field = FieldSpec::new("email");
        field.children = vec![child("aSource")];
        let mut adapter = ConditionalFieldAdapter::new(SpyRenderer::default());

        let rendered = adapter.render(true, &field);
        let fields = rendered.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].class_name, "aor-input-aSource");
        assert_eq!(fields[0].output, "input:aSource");
    }

    #[test]
    fn children_render_in_order_with_merged_props() {
        let mut field = FieldSpec::new("group");
        field.props.insert("resource".into(), json!("posts"));
        field.props.insert("variant".into(), json!("outlined"));
        let mut third = child("3");
        third.props.insert("variant".into(), json!("filled"));
        field.children = vec![child("1"), child("2"), third];
        let mut adapter = ConditionalFieldAdapter::new(SpyRenderer::default());

        let fields = adapter.render(true, &field).into_fields();
        assert_eq!(
            fields.iter().map(|field| field.output.as_str()).collect::<Vec<_>>(),
            ["input:1", "input:2", "input:3"]
        );
        assert_eq!(
            fields.iter().map(|field| field.index).collect::<Vec<_>>(),
            [0, 1, 2]
        );

        let calls = &adapter.renderer().calls;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1["resource"], "posts");
        assert_eq!(calls[0].1["variant"], "outlined");
        assert_eq!(calls[2].1["variant"], "filled");
        assert_eq!(calls[2].1[CLASS_NAME_PROP], "aor-input-3");
    }

    #[test]
    fn label_wrapper_applies_when_requested() {
        let mut field = FieldSpec::new("group");
        let mut labelled = child("name");
        labelled.add_label = true;
        labelled.label = Some("Name".into());
        field.children = vec![labelled, child("plain")];
        let mut adapter = ConditionalFieldAdapter::new(SpyRenderer::default()).with_label(Brackets);

        let fields = adapter.render(true, &field).into_fields();
        assert_eq!(fields[0].output, "[Name] input:name");
        assert_eq!(fields[1].output, "input:plain");
    }

    #[test]
    fn custom_class_template() {
        let mut field = FieldSpec::new("email");
        field.children = vec![child("address")];
        let template = ClassTemplate::new("{{field}}--{{source}}").expect("template");
        let mut adapter =
            ConditionalFieldAdapter::new(SpyRenderer::default()).with_class_template(template);

        let fields = adapter.render(true, &field).into_fields();
        assert_eq!(fields[0].class_name, "email--address");
    }

    #[test]
    fn invalid_class_template_is_rejected() {
        assert!(ClassTemplate::new("{{#if source}}unclosed").is_err());
    }

    #[test]
    fn childless_field_uses_field_id_as_source() {
        let field = FieldSpec::new("email");
        let mut adapter = ConditionalFieldAdapter::new(SpyRenderer::default());
        let fields = adapter.render(true, &field).into_fields();
        assert_eq!(fields[0].class_name, "aor-input-email");
    }

    #[test]
    fn default_class_template_uses_source() {
        assert_eq!(ClassTemplate::default().render("tags", "details"), "aor-input-tags");
    }

    #[test]
    fn failing_class_template_falls_back_to_default() {
        let template = ClassTemplate::new("{{shout source}}").expect("parses");
        assert_eq!(template.render("tags", "details"), "aor-input-tags");
    }
}
