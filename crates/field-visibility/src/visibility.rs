use tracing::{debug, trace, warn};

use crate::dependency::{DependencySpec, PredicateInput};
use crate::spec::form::FormSpec;
use crate::store::FormValues;
use crate::truthy::{is_truthy, strict_eq};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Decides whether a field gated by `spec` is shown for the given values.
///
/// Missing data reads as absent and falls through the boolean logic; nothing
/// here fails.
pub fn evaluate<S>(values: &S, spec: &DependencySpec) -> bool
where
    S: FormValues + ?Sized,
{
    match spec {
        DependencySpec::GlobalPredicate(predicate) => {
            predicate.test(PredicateInput::Snapshot(values.get_all_values()))
        }
        DependencySpec::SinglePath(path) => is_truthy(values.get_value(path)),
        DependencySpec::SinglePathEquals { path, expected } => {
            strict_eq(values.get_value(path), expected)
        }
        DependencySpec::SinglePathPredicate { path, predicate } => {
            predicate.test(PredicateInput::Path {
                value: values.get_value(path),
                path,
            })
        }
        DependencySpec::MultiPath(paths) => {
            paths.iter().all(|path| is_truthy(values.get_value(path)))
        }
        DependencySpec::MultiPathEquals { paths, expected } => paths
            .iter()
            .zip(expected)
            .all(|(path, expected)| strict_eq(values.get_value(path), expected)),
        DependencySpec::MultiPathPredicate { paths, predicate } => {
            let subset = values.get_values(paths);
            predicate.test(PredicateInput::Paths {
                values: &subset,
                paths,
            })
        }
    }
}

/// How a registered field decides visibility.
#[derive(Debug, Clone)]
pub enum FieldGate {
    /// No dependency configured.
    Always,
    When(DependencySpec),
    /// Dependency configuration was rejected; the field stays hidden.
    Never,
}

impl FieldGate {
    pub fn is_open<S>(&self, values: &S) -> bool
    where
        S: FormValues + ?Sized,
    {
        match self {
            FieldGate::Always => true,
            FieldGate::When(spec) => evaluate(values, spec),
            FieldGate::Never => false,
        }
    }
}

/// Field dependencies of one form, compiled once at registration.
#[derive(Debug, Clone)]
pub struct VisibilityResolver {
    gates: Vec<(String, FieldGate)>,
}

impl VisibilityResolver {
    pub fn new(spec: &FormSpec) -> Self {
        let gates = spec
            .fields
            .iter()
            .map(|field| {
                let gate = match field.dependency_config() {
                    None => FieldGate::Always,
                    Some(config) => match DependencySpec::compile(config) {
                        Ok(compiled) => {
                            for warning in &compiled.warnings {
                                warn!(
                                    form = %spec.id,
                                    field = %field.id,
                                    code = warning.code(),
                                    "{warning}"
                                );
                            }
                            FieldGate::When(compiled.spec)
                        }
                        Err(error) => {
                            warn!(form = %spec.id, field = %field.id, "{error}; field is hidden");
                            FieldGate::Never
                        }
                    },
                };
                (field.id.clone(), gate)
            })
            .collect();
        Self { gates }
    }

    pub fn gate(&self, field_id: &str) -> Option<&FieldGate> {
        self.gates
            .iter()
            .find(|(id, _)| id == field_id)
            .map(|(_, gate)| gate)
    }

    /// Visibility of `field_id`. A duplicated id is open only when every
    /// field carrying it is open.
    pub fn is_visible<S>(&self, field_id: &str, values: &S) -> Option<bool>
    where
        S: FormValues + ?Sized,
    {
        let mut gates = self
            .gates
            .iter()
            .filter(|(id, _)| id == field_id)
            .peekable();
        gates.peek()?;
        Some(gates.all(|(_, gate)| gate.is_open(values)))
    }

    /// Visibility of each field in declaration order.
    pub fn resolve_fields<S>(&self, values: &S) -> Vec<bool>
    where
        S: FormValues + ?Sized,
    {
        self.gates
            .iter()
            .map(|(id, gate)| {
                let visible = gate.is_open(values);
                trace!(field = %id, visible, "resolved field visibility");
                visible
            })
            .collect()
    }

    pub fn resolve<S>(&self, values: &S) -> VisibilityMap
    where
        S: FormValues + ?Sized,
    {
        let mut map = VisibilityMap::new();
        for ((id, _), visible) in self.gates.iter().zip(self.resolve_fields(values)) {
            map.entry(id.clone())
                .and_modify(|shown| *shown &= visible)
                .or_insert(visible);
        }
        debug!(
            visible = map.values().filter(|visible| **visible).count(),
            total = map.len(),
            "resolved form visibility"
        );
        map
    }
}

pub fn resolve_visibility<S>(spec: &FormSpec, values: &S) -> VisibilityMap
where
    S: FormValues + ?Sized,
{
    VisibilityResolver::new(spec).resolve(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{DependencyConfig, Predicate};
    use crate::path::FieldPath;
    use serde_json::{Value, json};

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).expect("valid path")
    }

    fn spec(config: DependencyConfig) -> DependencySpec {
        DependencySpec::from_config(config).expect("compiles")
    }

    #[test]
    fn single_path_truthiness() {
        let dependency = spec(DependencyConfig::on(path("firstName")));
        assert!(!evaluate(&json!({ "lastName": "blublu" }), &dependency));
        assert!(evaluate(&json!({ "firstName": "blublu" }), &dependency));
        assert!(!evaluate(&json!({ "firstName": "" }), &dependency));
        assert!(!evaluate(&json!({ "firstName": 0 }), &dependency));
    }

    #[test]
    fn deep_single_path() {
        let dependency = spec(DependencyConfig::on(path("author.firstName")));
        assert!(!evaluate(&json!({ "author": { "lastName": "blublu" } }), &dependency));
        assert!(evaluate(&json!({ "author": { "firstName": "blublu" } }), &dependency));
    }

    #[test]
    fn single_path_equals() {
        let foo = spec(DependencyConfig::on(path("firstName")).equals(json!("foo")));
        let bar = spec(DependencyConfig::on(path("firstName")).equals(json!("bar")));
        let values = json!({ "firstName": "foo" });
        assert!(evaluate(&values, &foo));
        assert!(!evaluate(&values, &bar));
    }

    #[test]
    fn null_expected_matches_null_but_not_absent() {
        let dependency = spec(DependencyConfig::on(path("firstName")).equals(Value::Null));
        assert!(evaluate(&json!({ "firstName": null }), &dependency));
        assert!(!evaluate(&json!({}), &dependency));
    }

    #[test]
    fn single_path_predicate_gets_value_and_path() {
        let dependency = spec(
            DependencyConfig::on(path("firstName"))
                .resolve(Predicate::new(|input| input.value() == Some(&json!("foo")))),
        );
        assert!(!evaluate(&json!({ "firstName": "bar" }), &dependency));
        assert!(evaluate(&json!({ "firstName": "foo" }), &dependency));
    }

    #[test]
    fn multi_path_requires_every_value() {
        let dependency = spec(DependencyConfig::on(vec![path("firstName"), path("lastName")]));
        assert!(!evaluate(&json!({ "lastName": "blublu" }), &dependency));
        assert!(!evaluate(&json!({ "firstName": "blublu" }), &dependency));
        assert!(evaluate(
            &json!({ "firstName": "blublu", "lastName": "blublu" }),
            &dependency
        ));
    }

    #[test]
    fn multi_path_equals_is_positional() {
        let dependency = spec(DependencyConfig::on(vec![path("a"), path("b")]).equals(json!([1, 2])));
        assert!(evaluate(&json!({ "a": 1, "b": 2 }), &dependency));
        assert!(!evaluate(&json!({ "a": 2, "b": 1 }), &dependency));
    }

    #[test]
    fn multi_path_predicate_sees_nested_subset() {
        let dependency = spec(
            DependencyConfig::on(vec![path("author.firstName"), path("category")]).resolve(
                Predicate::new(|input| {
                    let values = input.value().cloned().unwrap_or(Value::Null);
                    values["author"]["firstName"] == "foo" && values["category"] == "bar"
                }),
            ),
        );
        assert!(!evaluate(
            &json!({ "category": "bar", "author": { "firstName": "bar" } }),
            &dependency
        ));
        assert!(evaluate(
            &json!({ "category": "bar", "author": { "firstName": "foo" } }),
            &dependency
        ));
    }

    #[test]
    fn global_predicate_result_is_used() {
        let hidden = spec(DependencyConfig::predicate(Predicate::new(|_| false)));
        let shown = spec(DependencyConfig::predicate(Predicate::new(|_| true)));
        assert!(!evaluate(&json!({}), &hidden));
        assert!(evaluate(&json!({}), &shown));
    }

    #[test]
    fn non_boolean_predicate_results_are_coerced() {
        let dependency = spec(DependencyConfig::predicate(Predicate::new(|input| {
            input.value().and_then(|values| values.get("count")).cloned()
        })));
        assert!(evaluate(&json!({ "count": 3 }), &dependency));
        assert!(!evaluate(&json!({ "count": 0 }), &dependency));
        assert!(!evaluate(&json!({}), &dependency));
    }

    #[test]
    fn resolver_maps_every_field() {
        let form: FormSpec = serde_json::from_value(json!({
            "id": "record-form",
            "title": "Record",
            "fields": [
                { "id": "always" },
                { "id": "email", "depends_on": "firstName" },
                { "id": "broken", "value": "foo" }
            ]
        }))
        .expect("form");
        let visibility = resolve_visibility(&form, &json!({ "firstName": "Ann" }));
        assert_eq!(
            visibility,
            VisibilityMap::from([
                ("always".into(), true),
                ("broken".into(), false),
                ("email".into(), true),
            ])
        );

        let resolver = VisibilityResolver::new(&form);
        assert_eq!(resolver.is_visible("email", &json!({})), Some(false));
        assert_eq!(resolver.is_visible("unknown", &json!({})), None);
        assert!(matches!(resolver.gate("broken"), Some(FieldGate::Never)));
    }

    #[test]
    fn duplicated_ids_stay_hidden_when_any_copy_is_hidden() {
        let form: FormSpec = serde_json::from_value(json!({
            "id": "record-form",
            "title": "Record",
            "fields": [
                { "id": "a", "depends_on": "missing" },
                { "id": "a" }
            ]
        }))
        .expect("form");
        let resolver = VisibilityResolver::new(&form);
        let values = json!({});

        assert_eq!(resolver.resolve_fields(&values), vec![false, true]);
        assert_eq!(resolver.resolve(&values), VisibilityMap::from([("a".into(), false)]));
        assert_eq!(resolver.is_visible("a", &values), Some(false));
    }
}
