use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::expr::{CompiledExpr, Expr};
use crate::path::FieldPath;
use crate::truthy::Truthy;

/// The field path(s) whose values gate a conditional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DependencyTarget {
    Path(FieldPath),
    Paths(Vec<FieldPath>),
}

impl DependencyTarget {
    pub fn paths(&self) -> &[FieldPath] {
        match self {
            DependencyTarget::Path(path) => std::slice::from_ref(path),
            DependencyTarget::Paths(paths) => paths,
        }
    }
}

impl From<FieldPath> for DependencyTarget {
    fn from(path: FieldPath) -> Self {
        DependencyTarget::Path(path)
    }
}

impl From<Vec<FieldPath>> for DependencyTarget {
    fn from(paths: Vec<FieldPath>) -> Self {
        DependencyTarget::Paths(paths)
    }
}

/// What a predicate is called with; the shape follows the dependency variant.
#[derive(Debug, Clone, Copy)]
pub enum PredicateInput<'a> {
    /// The full values snapshot, for predicates without a dependency target.
    Snapshot(&'a Value),
    /// The value resolved at a single path (absent when missing) and the path.
    Path {
        value: Option<&'a Value>,
        path: &'a FieldPath,
    },
    /// The subset of the snapshot covering `paths`, keyed by path.
    Paths {
        values: &'a Value,
        paths: &'a [FieldPath],
    },
}

impl<'a> PredicateInput<'a> {
    /// First predicate argument: the snapshot, the resolved value, or the
    /// resolved subset.
    pub fn value(&self) -> Option<&'a Value> {
        match *self {
            PredicateInput::Snapshot(values) => Some(values),
            PredicateInput::Path { value, .. } => value,
            PredicateInput::Paths { values, .. } => Some(values),
        }
    }

    pub fn paths(&self) -> &'a [FieldPath] {
        match *self {
            PredicateInput::Snapshot(_) => &[],
            PredicateInput::Path { path, .. } => std::slice::from_ref(path),
            PredicateInput::Paths { paths, .. } => paths,
        }
    }

    /// Context document handed to [`Expr`] predicates.
    pub fn to_context(&self) -> Value {
        let mut ctx = Map::new();
        match *self {
            PredicateInput::Snapshot(values) => {
                ctx.insert("values".into(), values.clone());
            }
            PredicateInput::Path { value, path } => {
                if let Some(value) = value {
                    ctx.insert("value".into(), value.clone());
                }
                ctx.insert("path".into(), Value::String(path.to_string()));
            }
            PredicateInput::Paths { values, paths } => {
                ctx.insert("values".into(), values.clone());
                ctx.insert(
                    "paths".into(),
                    paths
                        .iter()
                        .map(|path| Value::String(path.to_string()))
                        .collect(),
                );
            }
        }
        Value::Object(ctx)
    }
}

type PredicateFn = dyn for<'a> Fn(PredicateInput<'a>) -> bool + Send + Sync;

/// A caller-supplied visibility rule. Results are coerced through [`Truthy`].
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    pub fn new<F, R>(predicate: F) -> Self
    where
        F: Fn(PredicateInput<'_>) -> R + Send + Sync + 'static,
        R: Truthy,
    {
        Self(Arc::new(move |input: PredicateInput<'_>| {
            predicate(input).is_truthy()
        }))
    }

    /// Wraps a serializable expression; its patterns are compiled here.
    pub fn from_expr(expr: Expr) -> Self {
        let expr = CompiledExpr::new(expr);
        Self(Arc::new(move |input: PredicateInput<'_>| {
            expr.evaluate(&input.to_context()).is_truthy()
        }))
    }

    pub fn test(&self, input: PredicateInput<'_>) -> bool {
        (self.0)(input)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl From<Expr> for Predicate {
    fn from(expr: Expr) -> Self {
        Predicate::from_expr(expr)
    }
}

/// Expected outcome attached to a dependency: a literal value (a list for
/// positional matching against several paths) or a predicate.
#[derive(Debug, Clone)]
pub enum Expected {
    Value(Value),
    Predicate(Predicate),
}

/// Raw per-field dependency configuration, before a variant is chosen.
#[derive(Debug, Clone, Default)]
pub struct DependencyConfig {
    pub target: Option<DependencyTarget>,
    pub expected: Option<Expected>,
    pub predicate: Option<Predicate>,
}

impl DependencyConfig {
    pub fn on(target: impl Into<DependencyTarget>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn predicate(predicate: Predicate) -> Self {
        Self {
            predicate: Some(predicate),
            ..Self::default()
        }
    }

    pub fn equals(mut self, expected: Value) -> Self {
        self.expected = Some(Expected::Value(expected));
        self
    }

    pub fn matching(mut self, predicate: Predicate) -> Self {
        self.expected = Some(Expected::Predicate(predicate));
        self
    }

    pub fn resolve(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// The normalized dependency of one conditional field.
#[derive(Debug, Clone)]
pub enum DependencySpec {
    GlobalPredicate(Predicate),
    SinglePath(FieldPath),
    SinglePathEquals {
        path: FieldPath,
        expected: Value,
    },
    SinglePathPredicate {
        path: FieldPath,
        predicate: Predicate,
    },
    MultiPath(Vec<FieldPath>),
    MultiPathEquals {
        paths: Vec<FieldPath>,
        expected: Vec<Value>,
    },
    MultiPathPredicate {
        paths: Vec<FieldPath>,
        predicate: Predicate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("dependency has neither a target path nor a predicate")]
    MissingTarget,
}

/// Configuration that compiles but was probably not what the author meant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error(
        "expected value {expected} does not pair with {paths} dependency paths; \
         falling back to checking every path is truthy"
    )]
    MismatchedExpectedValues { paths: usize, expected: String },
    #[error("list expected value {expected} is compared as a whole against single path '{path}'")]
    ListExpectedForSinglePath { path: String, expected: String },
    #[error("dependency target is an empty list; the field is always shown")]
    EmptyTargetList,
    #[error("expected value is ignored because a resolve predicate is set")]
    ExpectedValueIgnored,
    #[error("both a resolve predicate and a predicate expected value are set; using resolve")]
    ConflictingPredicates,
}

impl ConfigWarning {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigWarning::MismatchedExpectedValues { .. } => "mismatched_expected_values",
            ConfigWarning::ListExpectedForSinglePath { .. } => "list_expected_for_single_path",
            ConfigWarning::EmptyTargetList => "empty_target_list",
            ConfigWarning::ExpectedValueIgnored => "expected_value_ignored",
            ConfigWarning::ConflictingPredicates => "conflicting_predicates",
        }
    }
}

/// Outcome of [`DependencySpec::compile`].
#[derive(Debug, Clone)]
pub struct CompiledDependency {
    pub spec: DependencySpec,
    pub warnings: Vec<ConfigWarning>,
}

impl DependencySpec {
    /// Picks the variant for `config`. First match wins:
    ///
    /// 1. predicate without target: [`GlobalPredicate`](Self::GlobalPredicate)
    /// 2. path list with predicate: [`MultiPathPredicate`](Self::MultiPathPredicate)
    /// 3. single path with predicate: [`SinglePathPredicate`](Self::SinglePathPredicate)
    /// 4. path list with a same-length list value: [`MultiPathEquals`](Self::MultiPathEquals)
    /// 5. a predicate given as the expected value counts as the predicate above
    /// 6. single path with a value: [`SinglePathEquals`](Self::SinglePathEquals)
    /// 7. path list without value: [`MultiPath`](Self::MultiPath)
    /// 8. single path without value: [`SinglePath`](Self::SinglePath)
    ///
    /// A path list with any other value shape degrades to `MultiPath` and
    /// reports a warning.
    pub fn compile(config: DependencyConfig) -> Result<CompiledDependency, DependencyError> {
        let DependencyConfig {
            target,
            expected,
            predicate,
        } = config;
        let mut warnings = Vec::new();

        let (predicate, expected) = match (predicate, expected) {
            (Some(predicate), Some(Expected::Predicate(_))) => {
                warnings.push(ConfigWarning::ConflictingPredicates);
                (Some(predicate), None)
            }
            (Some(predicate), Some(Expected::Value(_))) => {
                warnings.push(ConfigWarning::ExpectedValueIgnored);
                (Some(predicate), None)
            }
            (None, Some(Expected::Predicate(predicate))) => (Some(predicate), None),
            (predicate, Some(Expected::Value(value))) => (predicate, Some(value)),
            (predicate, None) => (predicate, None),
        };

        if matches!(&target, Some(DependencyTarget::Paths(paths)) if paths.is_empty()) {
            warnings.push(ConfigWarning::EmptyTargetList);
        }

        let spec = match (target, predicate) {
            (None, Some(predicate)) => DependencySpec::GlobalPredicate(predicate),
            (None, None) => return Err(DependencyError::MissingTarget),
            (Some(DependencyTarget::Paths(paths)), Some(predicate)) => {
                DependencySpec::MultiPathPredicate { paths, predicate }
            }
            (Some(DependencyTarget::Path(path)), Some(predicate)) => {
                DependencySpec::SinglePathPredicate { path, predicate }
            }
            (Some(DependencyTarget::Paths(paths)), None) => match expected {
                Some(Value::Array(values)) if values.len() == paths.len() => {
                    DependencySpec::MultiPathEquals {
                        paths,
                        expected: values,
                    }
                }
                Some(other) => {
                    warnings.push(ConfigWarning::MismatchedExpectedValues {
                        paths: paths.len(),
                        expected: other.to_string(),
                    });
                    DependencySpec::MultiPath(paths)
                }
                None => DependencySpec::MultiPath(paths),
            },
            (Some(DependencyTarget::Path(path)), None) => match expected {
                Some(expected) => {
                    if expected.is_array() {
                        warnings.push(ConfigWarning::ListExpectedForSinglePath {
                            path: path.to_string(),
                            expected: expected.to_string(),
                        });
                    }
                    DependencySpec::SinglePathEquals { path, expected }
                }
                None => DependencySpec::SinglePath(path),
            },
        };

        Ok(CompiledDependency { spec, warnings })
    }

    /// Compiles `config`, reporting any configuration warnings through
    /// `tracing`.
    pub fn from_config(config: DependencyConfig) -> Result<Self, DependencyError> {
        let compiled = Self::compile(config)?;
        for warning in &compiled.warnings {
            warn!(code = warning.code(), "{warning}");
        }
        Ok(compiled.spec)
    }

    /// Paths read from the snapshot; empty for a global predicate.
    pub fn paths(&self) -> &[FieldPath] {
        match self {
            DependencySpec::GlobalPredicate(_) => &[],
            DependencySpec::SinglePath(path)
            | DependencySpec::SinglePathEquals { path, .. }
            | DependencySpec::SinglePathPredicate { path, .. } => std::slice::from_ref(path),
            DependencySpec::MultiPath(paths)
            | DependencySpec::MultiPathEquals { paths, .. }
            | DependencySpec::MultiPathPredicate { paths, .. } => paths,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DependencySpec::GlobalPredicate(_) => "global_predicate",
            DependencySpec::SinglePath(_) => "single_path",
            DependencySpec::SinglePathEquals { .. } => "single_path_equals",
            DependencySpec::SinglePathPredicate { .. } => "single_path_predicate",
            DependencySpec::MultiPath(_) => "multi_path",
            DependencySpec::MultiPathEquals { .. } => "multi_path_equals",
            DependencySpec::MultiPathPredicate { .. } => "multi_path_predicate",
        }
    }
}
