use crate::ast::{Param, Stmt};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::rc::Rc;

/// A `learn` method body awaiting dispatch. Methods close over the global
/// environment; `self` is bound at call time.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub body: Rc<Vec<Stmt>>,
}

/// The `learn` method registry, keyed by `(type name, method name)`.
///
/// Rebuilt at the start of every interpreter run so playground evaluations
/// never leak methods into each other. A parallel evaluator would guard
/// this table with a read-write lock.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: HashMap<(SmolStr, SmolStr), Rc<MethodDef>>,
}

impl MethodRegistry {
    pub fn clear(&mut self) {
        self.methods.clear();
    }

    pub fn register(&mut self, type_name: SmolStr, method: MethodDef) {
        self.methods
            .insert((type_name, method.name.clone()), Rc::new(method));
    }

    pub fn lookup(&self, type_name: &str, method_name: &str) -> Option<Rc<MethodDef>> {
        self.methods
            .get(&(SmolStr::new(type_name), SmolStr::new(method_name)))
            .cloned()
    }
}
