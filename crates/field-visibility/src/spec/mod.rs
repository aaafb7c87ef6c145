pub mod field;
pub mod form;

pub use field::{FieldDescriptor, FieldSpec};
pub use form::{DEFAULT_CLASS_TEMPLATE, FormPresentation, FormSpec};
