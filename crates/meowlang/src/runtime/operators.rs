use crate::diagnostics::Failure;
use crate::runtime::value::Value;

fn mismatch(verb: &str, a: &Value, b: &Value) -> Failure {
    Failure::hiss(format!(
        "Cannot {verb} {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

/// Addition on same-kind operands only: int+int, float+float,
/// string+string.
pub fn add(a: &Value, b: &Value) -> Result<Value, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{x}{y}"))),
        _ => Err(mismatch("add", a, b)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x - y)),
        _ => Err(mismatch("subtract", a, b)),
    }
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x * y)),
        _ => Err(mismatch("multiply", a, b)),
    }
}

pub fn div(a: &Value, b: &Value) -> Result<Value, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(Failure::hiss("Division by zero"));
            }
            Ok(Value::Int(x.wrapping_div(*y)))
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(Failure::hiss("Division by zero"));
            }
            Ok(Value::Float(x / y))
        }
        _ => Err(mismatch("divide", a, b)),
    }
}

/// Modulo on integers only.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(Failure::hiss("Division by zero"));
            }
            Ok(Value::Int(x.wrapping_rem(*y)))
        }
        _ => Err(mismatch("modulo", a, b)),
    }
}

pub fn negate(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::Int(x) => Ok(Value::Int(x.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => Err(Failure::hiss(format!("Cannot negate {}", v.type_name()))),
    }
}

/// Logical NOT operates on truthiness and never fails.
pub fn not(v: &Value) -> Value {
    Value::Bool(!v.is_truthy())
}

/// Equality between same-kind operands only: structural on primitives and
/// nil, element-wise recursive on lists and records (records also require
/// an identical type name). Cross-type comparisons fail.
pub fn equal(a: &Value, b: &Value) -> Result<Value, Failure> {
    raw_equal(a, b).map(Value::Bool)
}

fn raw_equal(a: &Value, b: &Value) -> Result<bool, Failure> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::List(x), Value::List(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for (item_a, item_b) in x.iter().zip(y.iter()) {
                if !raw_equal(item_a, item_b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Kitty(x), Value::Kitty(y)) => {
            if x.type_name != y.type_name || x.fields.len() != y.fields.len() {
                return Ok(false);
            }
            for (name, value) in &x.fields {
                match y.get_field(name) {
                    Some(other) if raw_equal(value, other)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        _ => Err(mismatch("compare", a, b)),
    }
}

pub fn not_equal(a: &Value, b: &Value) -> Result<Value, Failure> {
    raw_equal(a, b).map(|eq| Value::Bool(!eq))
}

macro_rules! ordered {
    ($name:ident, $op:tt) => {
        pub fn $name(a: &Value, b: &Value) -> Result<Value, Failure> {
            match (a, b) {
                (Value::Int(x), Value::Int(y)) => Ok(Value::Bool(x $op y)),
                (Value::Float(x), Value::Float(y)) => Ok(Value::Bool(x $op y)),
                _ => Err(mismatch("compare", a, b)),
            }
        }
    };
}

ordered!(less_than, <);
ordered!(greater_than, >);
ordered!(less_equal, <=);
ordered!(greater_equal, >=);
