use crate::ast::{Expr, Param, Stmt};
use crate::diagnostics::Failure;
use crate::runtime::env::Environment;
use smol_str::SmolStr;
use std::fmt;
use std::rc::Rc;

/// A runtime value.
///
/// Containers sit behind `Rc` so cloning a value is cheap; the language has
/// no in-place container mutation, so sharing is unobservable.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    Furball(Rc<Furball>),
    Func(Rc<FuncValue>),
    List(Rc<Vec<Value>>),
    /// Insertion-ordered string-keyed map.
    Map(Rc<Vec<(String, Value)>>),
    Kitty(Rc<KittyValue>),
}

/// A caught failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Furball {
    pub message: String,
}

/// A user function or lambda value: name, parameters, body, and the
/// captured defining environment.
#[derive(Debug, Clone)]
pub struct FuncValue {
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub body: FuncBody,
    pub env: Environment,
}

#[derive(Debug, Clone)]
pub enum FuncBody {
    /// `meow` bodies: a statement block, returning via `bring`.
    Block(Rc<Vec<Stmt>>),
    /// `paw` bodies: a single expression.
    Expr(Rc<Expr>),
}

impl FuncValue {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A record (`kitty`) or collar instance. Fields keep declared order.
#[derive(Debug, Clone)]
pub struct KittyValue {
    pub type_name: SmolStr,
    pub fields: Vec<(SmolStr, Value)>,
}

impl KittyValue {
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    pub fn map(entries: Vec<(String, Value)>) -> Value {
        Value::Map(Rc::new(entries))
    }

    pub fn furball(message: impl Into<String>) -> Value {
        Value::Furball(Rc::new(Furball {
            message: message.into(),
        }))
    }

    /// The value's runtime type name as shown in diagnostics.
    pub fn type_name(&self) -> SmolStr {
        match self {
            Value::Int(_) => SmolStr::new_static("Int"),
            Value::Float(_) => SmolStr::new_static("Float"),
            Value::Str(_) => SmolStr::new_static("String"),
            Value::Bool(_) => SmolStr::new_static("Bool"),
            Value::Nil => SmolStr::new_static("Nil"),
            Value::Furball(_) => SmolStr::new_static("Furball"),
            Value::Func(_) => SmolStr::new_static("Func"),
            Value::List(_) => SmolStr::new_static("List"),
            Value::Map(_) => SmolStr::new_static("Map"),
            Value::Kitty(k) => k.type_name.clone(),
        }
    }

    /// Truthiness: nil and false are falsy, zero numbers are falsy, empty
    /// strings and containers are falsy, furballs are falsy, functions are
    /// always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Nil => false,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Furball(_) => false,
            Value::Func(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Map(items) => !items.is_empty(),
            Value::Kitty(_) => true,
        }
    }

    /// Serializes the value to JSON. Map keys are emitted in alphabetical
    /// order regardless of insertion order; record fields keep declared
    /// order. Functions and furballs are unserializable.
    pub fn to_json(&self) -> Result<String, Failure> {
        match self {
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(format_float(*v)),
            Value::Bool(v) => Ok(if *v { "true" } else { "false" }.to_owned()),
            Value::Nil => Ok("null".to_owned()),
            Value::Str(s) => Ok(json_quote(s)),
            Value::List(items) => {
                let parts: Result<Vec<String>, Failure> =
                    items.iter().map(Value::to_json).collect();
                Ok(format!("[{}]", parts?.join(",")))
            }
            Value::Map(items) => {
                let mut keys: Vec<&String> = items.iter().map(|(k, _)| k).collect();
                keys.sort();
                let mut parts = Vec::with_capacity(keys.len());
                for key in keys {
                    let value = items
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v)
                        .unwrap_or(&Value::Nil);
                    parts.push(format!("{}:{}", json_quote(key), value.to_json()?));
                }
                Ok(format!("{{{}}}", parts.join(",")))
            }
            Value::Kitty(kitty) => {
                let mut parts = Vec::with_capacity(kitty.fields.len());
                for (name, value) in &kitty.fields {
                    parts.push(format!("{}:{}", json_quote(name), value.to_json()?));
                }
                Ok(format!("{{{}}}", parts.join(",")))
            }
            Value::Func(_) | Value::Furball(_) => Err(Failure::hiss(format!(
                "cannot serialize {} to JSON",
                self.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Nil => write!(f, "catnap"),
            Value::Furball(e) => write!(f, "{}", e.message),
            Value::Func(func) => write!(f, "<meow {}>", func.name),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(items) => {
                write!(f, "{{")?;
                for (i, (key, value)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Kitty(kitty) => {
                write!(f, "{}{{", kitty.type_name)?;
                for (i, (name, value)) in kitty.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Structural equality for tests and pattern plumbing; the language-level
// `==` lives in `operators` and fails on cross-type comparison instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Furball(a), Value::Furball(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Kitty(a), Value::Kitty(b)) => {
                a.type_name == b.type_name && a.fields == b.fields
            }
            _ => false,
        }
    }
}

/// Formats a float the way Go's `%g` verb does for the values the language
/// produces: shortest decimal form, switching to exponent notation for
/// magnitudes below 1e-4 or at 1e21 and above.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }
    let abs = v.abs();
    if v != 0.0 && (abs < 1e-4 || abs >= 1e21) {
        let formatted = format!("{v:e}");
        // Rust renders `1e21`; match the `%g` shape `1e+21` with a
        // two-digit exponent.
        if let Some(idx) = formatted.find('e') {
            let (mantissa, exp) = formatted.split_at(idx);
            let exp = &exp[1..];
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(rest) => ('-', rest),
                None => ('+', exp),
            };
            return format!("{mantissa}e{sign}{digits:0>2}");
        }
        return formatted;
    }
    let mut out = format!("{v}");
    if out.ends_with(".0") {
        out.truncate(out.len() - 2);
    }
    out
}

fn json_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
