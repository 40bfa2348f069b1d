use crate::error::{GroveMapError, Result};
use crate::record::Record;
use crate::view::View;

/// Scalar attribute payloads understood by the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Str(String),
    Float(f64),
}

/// The scalar kinds a leaf field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Str,
    Float,
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Str(_) => ScalarKind::Str,
            Scalar::Float(_) => ScalarKind::Float,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to the declared scalar kind. Numeric kinds cast into each
    /// other and parse from strings; everything renders into a string.
    pub fn coerce(self, kind: ScalarKind) -> Result<Scalar> {
        match (kind, self) {
            (ScalarKind::Int, Scalar::Int(v)) => Ok(Scalar::Int(v)),
            (ScalarKind::Int, Scalar::Float(v)) => Ok(Scalar::Int(v as i64)),
            (ScalarKind::Int, Scalar::Str(s)) => s.trim().parse::<i64>().map(Scalar::Int).map_err(
                |_| GroveMapError::TypeMismatch(format!("cannot read '{s}' as an integer")),
            ),
            (ScalarKind::Float, Scalar::Float(v)) => Ok(Scalar::Float(v)),
            (ScalarKind::Float, Scalar::Int(v)) => Ok(Scalar::Float(v as f64)),
            (ScalarKind::Float, Scalar::Str(s)) => s.trim().parse::<f64>().map(Scalar::Float).map_err(
                |_| GroveMapError::TypeMismatch(format!("cannot read '{s}' as a float")),
            ),
            (ScalarKind::Str, Scalar::Str(s)) => Ok(Scalar::Str(s)),
            (ScalarKind::Str, Scalar::Int(v)) => Ok(Scalar::Str(v.to_string())),
            (ScalarKind::Str, Scalar::Float(v)) => Ok(Scalar::Str(v.to_string())),
        }
    }
}

/// Exchange values passed to `set` and produced by bulk reads.
///
/// `Record` carries a whole group, `Seq`/`Map` carry bulk multi-group
/// assignments, and `View` is the payload of a link field.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Str(String),
    Float(f64),
    Array(Vec<f64>),
    Record(Record),
    Seq(Vec<Value>),
    Map(Vec<(i64, Value)>),
    View(View),
}

impl Value {
    /// Short name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::View(_) => "view",
        }
    }

    pub(crate) fn into_scalar(self) -> Option<Scalar> {
        match self {
            Value::Int(v) => Some(Scalar::Int(v)),
            Value::Str(v) => Some(Scalar::Str(v)),
            Value::Float(v) => Some(Scalar::Float(v)),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // views alias store locations; two views of one location are equal
            (Value::View(a), Value::View(b)) => a.path() == b.path(),
            _ => false,
        }
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Value {
        match v {
            Scalar::Int(v) => Value::Int(v),
            Scalar::Str(v) => Value::Str(v),
            Scalar::Float(v) => Value::Float(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Value {
        Value::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Value {
        Value::Record(v)
    }
}

impl From<View> for Value {
    fn from(v: View) -> Value {
        Value::View(v)
    }
}
