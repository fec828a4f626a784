use crate::diagnostics::Failure;
use crate::runtime::value::Value;

pub(crate) fn require_args(name: &str, args: &[Value], count: usize) -> Result<(), Failure> {
    if args.len() < count {
        return Err(Failure::hiss(format!(
            "{name} requires {count} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

/// Length of a string (in bytes) or list.
pub fn len(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::Str(s) => Ok(Value::Int(s.len() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        _ => Err(Failure::hiss(format!(
            "Cannot get length of {}",
            v.type_name()
        ))),
    }
}

pub fn to_int(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::Int(x) => Ok(Value::Int(*x)),
        Value::Float(x) => Ok(Value::Int(*x as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        _ => Err(Failure::hiss(format!(
            "Cannot convert {} to Int",
            v.type_name()
        ))),
    }
}

pub fn to_float(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Int(x) => Ok(Value::Float(*x as f64)),
        _ => Err(Failure::hiss(format!(
            "Cannot convert {} to Float",
            v.type_name()
        ))),
    }
}

pub fn to_string(v: &Value) -> Value {
    Value::Str(v.to_string())
}

/// First element of a list, or nil when empty.
pub fn head(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::List(items) => Ok(items.first().cloned().unwrap_or(Value::Nil)),
        _ => Err(Failure::hiss("head requires a List")),
    }
}

/// All elements but the first; the empty list stays empty.
pub fn tail(v: &Value) -> Result<Value, Failure> {
    match v {
        Value::List(items) => {
            if items.len() <= 1 {
                return Ok(Value::list(Vec::new()));
            }
            Ok(Value::list(items[1..].to_vec()))
        }
        _ => Err(Failure::hiss("tail requires a List")),
    }
}

/// Appends a value, returning a new list.
pub fn append(list: &Value, item: &Value) -> Result<Value, Failure> {
    match list {
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len() + 1);
            out.extend(items.iter().cloned());
            out.push(item.clone());
            Ok(Value::list(out))
        }
        _ => Err(Failure::hiss("append requires a List")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn head_and_tail() {
        let xs = ints(&[10, 20, 30]);
        assert_eq!(head(&xs).unwrap(), Value::Int(10));
        assert_eq!(tail(&xs).unwrap(), ints(&[20, 30]));
        let empty = ints(&[]);
        assert_eq!(head(&empty).unwrap(), Value::Nil);
        assert_eq!(tail(&empty).unwrap(), ints(&[]));
        assert!(head(&Value::Int(1)).is_err());
    }

    #[test]
    fn append_copies() {
        let xs = ints(&[1, 2]);
        let ys = append(&xs, &Value::Int(3)).unwrap();
        assert_eq!(ys, ints(&[1, 2, 3]));
        assert_eq!(xs, ints(&[1, 2]));
    }

    #[test]
    fn conversions() {
        assert_eq!(to_int(&Value::Float(3.9)).unwrap(), Value::Int(3));
        assert_eq!(to_int(&Value::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(to_float(&Value::Int(2)).unwrap(), Value::Float(2.0));
        assert_eq!(to_string(&Value::Int(123)), Value::Str("123".into()));
        assert!(to_int(&Value::Str("4".into())).is_err());
    }

    #[test]
    fn len_counts_strings_and_lists() {
        assert_eq!(len(&Value::Str("meow".into())).unwrap(), Value::Int(4));
        assert_eq!(len(&ints(&[1, 2, 3])).unwrap(), Value::Int(3));
        assert!(len(&Value::Int(1)).is_err());
    }
}
