use serde_json::Value;

/// Boolean coercion with the usual falsy set: absent, `null`, `false`, `0`
/// and `""`. Every other value, including empty objects and arrays, is truthy.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::String(text) => !text.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

pub fn is_truthy(value: Option<&Value>) -> bool {
    value.is_truthy()
}

/// Type-sensitive equality between a resolved value and an expected one.
///
/// Absent never equals anything. Numbers compare by numeric value so `1` and
/// `1.0` match, but `"1"` and `1` do not. Containers compare element-wise.
pub fn strict_eq(actual: Option<&Value>, expected: &Value) -> bool {
    actual.is_some_and(|actual| values_eq(actual, expected))
}

fn values_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            if left.is_f64() || right.is_f64() {
                left.as_f64() == right.as_f64()
            } else {
                left == right
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| values_eq(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| values_eq(l, r)))
        }
        _ => left == right,
    }
}
