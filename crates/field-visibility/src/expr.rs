use std::collections::HashMap;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::truthy::{Truthy, strict_eq};

/// Lightweight expression AST used for serializable `resolve` predicates.
///
/// Paths are JSON pointers into the predicate context, e.g. `/value` for a
/// single-path dependency or `/values/author/firstName` for the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    LiteralBool { value: bool },
    Eq { left: String, right: String },
    Equals { path: String, value: Value },
    Truthy { path: String },
    Matches { path: String, pattern: String },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
    Var { path: String },
}

impl Expr {
    fn get_value<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
        ctx.pointer(path)
    }

    /// Evaluates the expression to a boolean if possible.
    pub fn evaluate(&self, ctx: &Value) -> Option<bool> {
        self.evaluate_with(ctx, None)
    }

    fn evaluate_with(&self, ctx: &Value, patterns: Option<&HashMap<String, Regex>>) -> Option<bool> {
        match self {
            Expr::LiteralBool { value } => Some(*value),
            Expr::Eq { left, right } => {
                let left_val = Self::get_value(ctx, left)?;
                let right_val = Self::get_value(ctx, right)?;
                Some(strict_eq(Some(left_val), right_val))
            }
            Expr::Equals { path, value } => Some(strict_eq(Self::get_value(ctx, path), value)),
            Expr::Truthy { path } => Some(Self::get_value(ctx, path).is_truthy()),
            Expr::Matches { path, pattern } => {
                let text = Self::get_value(ctx, path)?.as_str()?;
                match patterns {
                    Some(patterns) => Some(patterns.get(pattern)?.is_match(text)),
                    None => Some(Regex::new(pattern).ok()?.is_match(text)),
                }
            }
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate_with(ctx, patterns) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                for expr in expressions {
                    if let Some(true) = expr.evaluate_with(ctx, patterns) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Expr::Not { expression } => expression
                .evaluate_with(ctx, patterns)
                .map(|value| !value),
            Expr::Var { path } => Self::get_value(ctx, path).and_then(|v| v.as_bool()),
        }
    }

    /// Compiles every `matches` pattern in the tree, returning the first
    /// failure.
    pub fn check_patterns(&self) -> Result<(), regex::Error> {
        self.patterns()
            .into_iter()
            .try_for_each(|pattern| Regex::new(pattern).map(|_| ()))
    }

    /// Every `matches` pattern in the tree, depth first.
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Expr::Matches { pattern, .. } => vec![pattern.as_str()],
            Expr::And { expressions } | Expr::Or { expressions } => expressions
                .iter()
                .flat_map(|expression| expression.patterns())
                .collect(),
            Expr::Not { expression } => expression.patterns(),
            Expr::LiteralBool { .. }
            | Expr::Eq { .. }
            | Expr::Equals { .. }
            | Expr::Truthy { .. }
            | Expr::Var { .. } => Vec::new(),
        }
    }
}

/// An [`Expr`] with its `matches` patterns compiled up front.
///
/// Patterns that fail to compile are left out and evaluate to `None`, the
/// same outcome as [`Expr::evaluate`].
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    expr: Expr,
    patterns: HashMap<String, Regex>,
}

impl CompiledExpr {
    pub fn new(expr: Expr) -> Self {
        let patterns = expr
            .patterns()
            .into_iter()
            .filter_map(|pattern| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| (pattern.to_string(), regex))
            })
            .collect();
        Self { expr, patterns }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn compiled_patterns(&self) -> usize {
        self.patterns.len()
    }

    pub fn evaluate(&self, ctx: &Value) -> Option<bool> {
        self.expr.evaluate_with(ctx, Some(&self.patterns))
    }
}

impl From<Expr> for CompiledExpr {
    fn from(expr: Expr) -> Self {
        CompiledExpr::new(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_tagged_ops() {
        let expr: Expr = serde_json::from_value(json!({
            "op": "and",
            "expressions": [
                { "op": "equals", "path": "/values/author/firstName", "value": "foo" },
                { "op": "truthy", "path": "/values/category" }
            ]
        }))
        .expect("expr");
        let ctx = json!({ "values": { "author": { "firstName": "foo" }, "category": "bar" } });
        assert_eq!(expr.evaluate(&ctx), Some(true));
    }

    #[test]
    fn equals_treats_missing_as_false() {
        let expr = Expr::Equals {
            path: "/value".into(),
            value: json!("foo"),
        };
        assert_eq!(expr.evaluate(&json!({})), Some(false));
        assert_eq!(expr.evaluate(&json!({ "value": "foo" })), Some(true));
    }

    #[test]
    fn eq_requires_both_sides() {
        let expr = Expr::Eq {
            left: "/values/a".into(),
            right: "/values/b".into(),
        };
        assert_eq!(expr.evaluate(&json!({ "values": { "a": 1, "b": 1 } })), Some(true));
        assert_eq!(expr.evaluate(&json!({ "values": { "a": 1 } })), None);
    }

    #[test]
    fn matches_uses_regex() {
        let expr = Expr::Matches {
            path: "/value".into(),
            pattern: "^foo".into(),
        };
        assert_eq!(expr.evaluate(&json!({ "value": "foobar" })), Some(true));
        assert_eq!(expr.evaluate(&json!({ "value": "barfoo" })), Some(false));
        assert_eq!(expr.evaluate(&json!({ "value": 3 })), None);
    }

    #[test]
    fn check_patterns_reports_nested_failures() {
        let expr = Expr::Not {
            expression: Box::new(Expr::Or {
                expressions: vec![Expr::Matches {
                    path: "/value".into(),
                    pattern: "(".into(),
                }],
            }),
        };
        assert!(expr.check_patterns().is_err());
        assert!(Expr::LiteralBool { value: true }.check_patterns().is_ok());
    }

    #[test]
    fn compiled_expr_reuses_patterns() {
        let expr = Expr::Or {
            expressions: vec![
                Expr::Matches {
                    path: "/value".into(),
                    pattern: "^review".into(),
                },
                Expr::Matches {
                    path: "/value".into(),
                    pattern: "(".into(),
                },
            ],
        };
        let compiled = CompiledExpr::new(expr.clone());
        assert_eq!(compiled.compiled_patterns(), 1);

        for (ctx, expected) in [
            (json!({ "value": "reviewing" }), Some(true)),
            (json!({ "value": "draft" }), Some(false)),
        ] {
            assert_eq!(compiled.evaluate(&ctx), expected);
            assert_eq!(expr.evaluate(&ctx), expected);
        }
    }
}
