use smol_str::SmolStr;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A Meow type as resolved by the checker.
///
/// `Any` is an internal fallback used when a type cannot be inferred; it is
/// not part of the user-facing type system. Aliases are transparent,
/// collars and kitties are nominal.
#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Nil,
    Furball,
    Any,
    List(Box<Type>),
    Func(FuncType),
    Kitty(KittyType),
    Alias(AliasType),
    Collar(CollarType),
    Trick(TrickType),
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

#[derive(Debug, Clone)]
pub struct KittyField {
    pub name: SmolStr,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct KittyType {
    pub name: SmolStr,
    pub fields: Vec<KittyField>,
}

/// A transparent alias (`breed`). The underlying type lives behind a shared
/// handle so the checker's second pass can back-patch forward references
/// without rewalking earlier declarations.
#[derive(Debug, Clone)]
pub struct AliasType {
    pub name: SmolStr,
    pub underlying: Rc<RefCell<Type>>,
}

impl AliasType {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            underlying: Rc::new(RefCell::new(Type::Any)),
        }
    }
}

/// A nominal wrapper (`collar`): equal only by name, constructor takes one
/// value of the underlying type, exposes an implicit `.value` field.
#[derive(Debug, Clone)]
pub struct CollarType {
    pub name: SmolStr,
    pub underlying: Box<Type>,
}

#[derive(Debug, Clone)]
pub struct TrickMethodSig {
    pub name: SmolStr,
    pub params: Vec<Type>,
    pub ret: Type,
}

/// A structural interface (`trick`).
#[derive(Debug, Clone)]
pub struct TrickType {
    pub name: SmolStr,
    pub methods: Vec<TrickMethodSig>,
}

impl Type {
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// A simple scalar type: int, float, string, bool, nil.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Float | Type::String | Type::Bool | Type::Nil
        )
    }

    /// Resolves alias wrappers recursively, returning the underlying type.
    /// Alias cycles resolve to `Any`.
    pub fn unwrap(&self) -> Type {
        let mut current = self.clone();
        let mut seen: Vec<*const RefCell<Type>> = Vec::new();
        loop {
            match current {
                Type::Alias(alias) => {
                    let ptr = Rc::as_ptr(&alias.underlying);
                    if seen.contains(&ptr) {
                        return Type::Any;
                    }
                    seen.push(ptr);
                    let next = alias.underlying.borrow().clone();
                    current = next;
                }
                other => return other,
            }
        }
    }

    /// Type equality per the language rules: alias-transparent, `Any`
    /// absorbs everything, `list[any]` is covariant, kitties/collars/tricks
    /// compare by name.
    pub fn equals(&self, other: &Type) -> bool {
        let a = self.unwrap();
        let b = other.unwrap();
        match (&a, &b) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::String, Type::String)
            | (Type::Bool, Type::Bool)
            | (Type::Nil, Type::Nil)
            | (Type::Furball, Type::Furball) => true,
            (Type::List(x), Type::List(y)) => x.is_any() || y.is_any() || x.equals(y),
            (Type::Func(f), Type::Func(g)) => {
                f.params.len() == g.params.len()
                    && f.params.iter().zip(&g.params).all(|(p, q)| p.equals(q))
                    && f.ret.equals(&g.ret)
            }
            (Type::Kitty(k), Type::Kitty(o)) => k.name == o.name,
            (Type::Collar(c), Type::Collar(o)) => c.name == o.name,
            (Type::Trick(t), Type::Trick(o)) => t.name == o.name,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Nil => write!(f, "nil"),
            Type::Furball => write!(f, "furball"),
            Type::Any => write!(f, "any"),
            Type::List(elem) => write!(f, "list[{elem}]"),
            Type::Func(func) => {
                write!(f, "(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {}", func.ret)
            }
            Type::Kitty(k) => write!(f, "{}", k.name),
            Type::Alias(a) => write!(f, "{}", a.name),
            Type::Collar(c) => write!(f, "{}", c.name),
            Type::Trick(t) => write!(f, "{}", t.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, underlying: Type) -> Type {
        let a = AliasType::new(name);
        *a.underlying.borrow_mut() = underlying;
        Type::Alias(a)
    }

    #[test]
    fn aliases_are_transparent() {
        let score = alias("Score", Type::Int);
        assert!(score.equals(&Type::Int));
        assert!(Type::Int.equals(&score));
        let nested = alias("Points", score.clone());
        assert!(nested.equals(&Type::Int));
        assert!(nested.equals(&score));
    }

    #[test]
    fn alias_back_patching_through_the_shared_handle() {
        // breed A = B parsed before breed B = int: A's handle holds B's
        // alias, and patching B later is visible through A.
        let b = AliasType::new("B");
        let a = AliasType::new("A");
        *a.underlying.borrow_mut() = Type::Alias(b.clone());
        *b.underlying.borrow_mut() = Type::Int;
        assert!(Type::Alias(a).equals(&Type::Int));
    }

    #[test]
    fn alias_cycles_resolve_to_any() {
        let a = AliasType::new("A");
        let b = AliasType::new("B");
        *a.underlying.borrow_mut() = Type::Alias(b.clone());
        *b.underlying.borrow_mut() = Type::Alias(a.clone());
        assert!(matches!(Type::Alias(a).unwrap(), Type::Any));
    }

    #[test]
    fn collars_are_nominal() {
        let user = Type::Collar(CollarType {
            name: "UserId".into(),
            underlying: Box::new(Type::Int),
        });
        let order = Type::Collar(CollarType {
            name: "OrderId".into(),
            underlying: Box::new(Type::Int),
        });
        assert!(!user.equals(&order));
        assert!(!user.equals(&Type::Int));
        assert!(user.equals(&user.clone()));
    }

    #[test]
    fn any_absorbs() {
        assert!(Type::Any.equals(&Type::Int));
        assert!(Type::String.equals(&Type::Any));
    }

    #[test]
    fn list_covariance_on_any() {
        let ints = Type::List(Box::new(Type::Int));
        let anys = Type::List(Box::new(Type::Any));
        let strs = Type::List(Box::new(Type::String));
        assert!(ints.equals(&anys));
        assert!(anys.equals(&strs));
        assert!(!ints.equals(&strs));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::List(Box::new(Type::Int)).to_string(), "list[int]");
        let f = Type::Func(FuncType {
            params: vec![Type::Int, Type::String],
            ret: Box::new(Type::Bool),
        });
        assert_eq!(f.to_string(), "(int, string) bool");
    }
}
