use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::Record;

/// Order records by a field or by an arbitrary function.
#[derive(Clone)]
pub enum Comparator {
    /// Ascending by the value of one field (see [`compare_values`]).
    Field(String),
    By(Rc<dyn Fn(&Record, &Record) -> Ordering>),
}

impl Comparator {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn by(compare: impl Fn(&Record, &Record) -> Ordering + 'static) -> Self {
        Self::By(Rc::new(compare))
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            Self::Field(name) => compare_values(a.get(name).as_ref(), b.get(name).as_ref()),
            Self::By(compare) => compare(a, b),
        }
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::By(_) => f.write_str("By(..)"),
        }
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over optional JSON values.
///
/// Missing and `null` sort first, then booleans, numbers (numerically),
/// strings (lexicographically), arrays and objects.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ (Value::Array(_) | Value::Object(_))), Some(y)) if rank(Some(x)) == rank(Some(y)) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
