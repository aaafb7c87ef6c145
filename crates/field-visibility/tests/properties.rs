use proptest::prelude::*;
use serde_json::{Map, Value, json};

use field_visibility::{DependencyConfig, DependencySpec, FieldPath, evaluate, resolve};

fn key() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9]{0,4}".prop_map(Value::String),
    ]
}

fn tree() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map(key(), inner, 0..4)
            .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
    })
}

fn object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(key(), tree(), 0..5)
        .prop_map(|entries| entries.into_iter().collect::<Map<_, _>>())
}

fn path(raw: &str) -> FieldPath {
    FieldPath::parse(raw).expect("valid path")
}

fn compile(config: DependencyConfig) -> DependencySpec {
    DependencySpec::compile(config).expect("compiles").spec
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

proptest! {
    #[test]
    fn absent_single_path_is_hidden(mut values in object(), name in key()) {
        values.remove(&name);
        let spec = compile(DependencyConfig::on(path(&name)));
        prop_assert!(!evaluate(&Value::Object(values), &spec));
    }

    #[test]
    fn single_path_follows_truthiness(mut values in object(), name in key(), value in tree()) {
        values.insert(name.clone(), value.clone());
        let spec = compile(DependencyConfig::on(path(&name)));
        prop_assert_eq!(evaluate(&Value::Object(values), &spec), truthy(&value));
    }

    #[test]
    fn single_path_equals_matches_exact_value(
        mut values in object(),
        name in key(),
        actual in scalar(),
        expected in scalar()
    ) {
        values.insert(name.clone(), actual.clone());
        let spec = compile(DependencyConfig::on(path(&name)).equals(expected.clone()));
        prop_assert_eq!(evaluate(&Value::Object(values), &spec), actual == expected);
    }

    #[test]
    fn numbers_never_equal_their_strings(n in any::<i64>()) {
        let spec = compile(DependencyConfig::on(path("count")).equals(json!(n.to_string())));
        let shown = evaluate(&json!({ "count": n }), &spec);
        prop_assert!(!shown);
    }

    #[test]
    fn multi_path_is_conjunction(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let names = (0..flags.len()).map(|index| format!("f{index}")).collect::<Vec<_>>();
        let values = names
            .iter()
            .zip(&flags)
            .map(|(name, flag)| (name.clone(), if *flag { json!("set") } else { json!("") }))
            .collect::<Map<_, _>>();
        let spec = compile(DependencyConfig::on(
            names.iter().map(|name| path(name)).collect::<Vec<_>>(),
        ));
        prop_assert_eq!(
            evaluate(&Value::Object(values), &spec),
            flags.iter().all(|flag| *flag)
        );
    }

    #[test]
    fn nested_resolution_finds_leaf(outer in key(), inner in key(), leaf in scalar()) {
        let tree = json!({ outer.clone(): { inner.clone(): leaf.clone() } });
        let dotted = format!("{outer}.{inner}");
        prop_assert_eq!(resolve(&tree, &dotted), Some(&leaf));
    }
}
