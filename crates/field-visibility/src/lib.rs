#![allow(missing_docs)]

pub mod adapter;
pub mod dependency;
pub mod expr;
pub mod path;
pub mod render;
pub mod spec;
pub mod store;
pub mod truthy;
pub mod validate;
pub mod visibility;

pub use adapter::{
    ClassTemplate, ConditionalFieldAdapter, FieldRenderer, LabelWrapper, NoLabel, Rendered,
    RenderedField, TemplateError,
};
pub use dependency::{
    CompiledDependency, ConfigWarning, DependencyConfig, DependencyError, DependencySpec,
    DependencyTarget, Expected, Predicate, PredicateInput,
};
pub use expr::{CompiledExpr, Expr};
pub use path::{FieldPath, PathError, resolve};
pub use render::{
    JsonFieldRenderer, JsonLabelWrapper, RenderField, RenderPayload, build_render_payload,
    render_json_ui, render_text,
};
pub use spec::{FieldDescriptor, FieldSpec, FormPresentation, FormSpec};
pub use store::{FormSnapshot, FormStore, FormValues};
pub use truthy::{Truthy, is_truthy, strict_eq};
pub use validate::{ValidationIssue, ValidationReport, validate};
pub use visibility::{FieldGate, VisibilityMap, VisibilityResolver, evaluate, resolve_visibility};
