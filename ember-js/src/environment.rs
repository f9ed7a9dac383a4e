//! Lexical environments.
//!
//! Each scope owns its bindings and a strong reference to its parent, so a
//! closure keeps the whole chain it was defined in alive. The global scope
//! is backed by the global object: `var` and function declarations made
//! there become properties of it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::error::{JsError, JsResult};
use crate::object::ObjectRef;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// Variable binding.
#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    /// `false` for `const`.
    mutable: bool,
    /// `let`/`const` are unusable until their declaration runs.
    initialized: bool,
}

struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
    parent: Option<Environment>,
    /// `this` for function and global scopes.
    this_value: Option<Value>,
    /// Object record backing the global scope.
    global_object: Option<ObjectRef>,
}

/// Variables visible in one scope, for debugger display.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot {
    pub kind: ScopeKind,
    pub variables: Vec<(String, Value)>,
}

/// Shared handle to a scope.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    fn from_scope(scope: Scope) -> Self {
        Environment(Rc::new(RefCell::new(scope)))
    }

    /// Create the global scope over `global_object`.
    pub fn global(global_object: ObjectRef) -> Self {
        Self::from_scope(Scope {
            kind: ScopeKind::Global,
            bindings: HashMap::new(),
            parent: None,
            this_value: Some(Value::Object(global_object.clone())),
            global_object: Some(global_object),
        })
    }

    /// Create a function scope whose parent is the closure's captured scope.
    pub fn function(parent: &Environment, this_value: Value) -> Self {
        Self::from_scope(Scope {
            kind: ScopeKind::Function,
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
            this_value: Some(this_value),
            global_object: None,
        })
    }

    /// Create a block scope nested in `self`.
    pub fn block(&self) -> Self {
        Self::from_scope(Scope {
            kind: ScopeKind::Block,
            bindings: HashMap::new(),
            parent: Some(self.clone()),
            this_value: None,
            global_object: None,
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.0.borrow().kind
    }

    pub fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Nearest function or global scope, where `var` declarations live.
    pub fn var_scope(&self) -> Environment {
        let mut scope = self.clone();
        loop {
            if scope.kind() != ScopeKind::Block {
                return scope;
            }
            match scope.parent() {
                Some(parent) => scope = parent,
                None => return scope,
            }
        }
    }

    /// Hoist a `var` or function name into the nearest function/global scope.
    /// Existing bindings (parameters, earlier declarations) keep their value.
    pub fn declare_var(&self, name: &str) -> JsResult<()> {
        let target = self.var_scope();
        let mut scope = target.0.borrow_mut();
        if let Some(global) = &scope.global_object {
            if !global.has_own_property(name) {
                global.set(name, Value::Undefined)?;
            }
            return Ok(());
        }
        scope.bindings.entry(name.to_string()).or_insert(Binding {
            value: Value::Undefined,
            mutable: true,
            initialized: true,
        });
        Ok(())
    }

    /// Create an uninitialized `let`/`const` binding in this scope.
    pub fn declare_lexical(&self, name: &str, mutable: bool) -> JsResult<()> {
        let mut scope = self.0.borrow_mut();
        if scope.bindings.contains_key(name) {
            return Err(JsError::syntax(format!(
                "Identifier '{}' has already been declared",
                name
            )));
        }
        scope.bindings.insert(
            name.to_string(),
            Binding {
                value: Value::Undefined,
                mutable,
                initialized: false,
            },
        );
        Ok(())
    }

    /// Create (or overwrite) an initialized mutable binding in this scope.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
                initialized: true,
            },
        );
    }

    /// Give a binding of this scope its first value.
    pub fn initialize(&self, name: &str, value: Value) -> JsResult<()> {
        let mut scope = self.0.borrow_mut();
        if let Some(binding) = scope.bindings.get_mut(name) {
            binding.value = value;
            binding.initialized = true;
            return Ok(());
        }
        if let Some(global) = &scope.global_object {
            return global.set(name, value);
        }
        scope.bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
                initialized: true,
            },
        );
        Ok(())
    }

    /// Resolve an identifier through the scope chain.
    pub fn get(&self, name: &str) -> JsResult<Value> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let s = scope.0.borrow();
                if let Some(binding) = s.bindings.get(name) {
                    if !binding.initialized {
                        return Err(JsError::reference(format!(
                            "Cannot access '{}' before initialization",
                            name
                        )));
                    }
                    return Ok(binding.value.clone());
                }
                if let Some(value) = s.global_object.as_ref().and_then(|g| g.lookup(name)) {
                    return Ok(value);
                }
                s.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return Err(JsError::reference(format!("{} is not defined", name))),
            }
        }
    }

    /// Whether the identifier resolves anywhere on the chain.
    pub fn has_binding(&self, name: &str) -> bool {
        let mut scope = self.clone();
        loop {
            let parent = {
                let s = scope.0.borrow();
                if s.bindings.contains_key(name)
                    || s.global_object.as_ref().map_or(false, |g| g.has_property(name))
                {
                    return true;
                }
                s.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return false,
            }
        }
    }

    /// Assign to an existing binding; an unresolvable name becomes a
    /// property of the global object.
    pub fn assign(&self, name: &str, value: Value) -> JsResult<()> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let mut s = scope.0.borrow_mut();
                if let Some(binding) = s.bindings.get_mut(name) {
                    if !binding.initialized {
                        return Err(JsError::reference(format!(
                            "Cannot access '{}' before initialization",
                            name
                        )));
                    }
                    if !binding.mutable {
                        return Err(JsError::type_error(format!(
                            "Assignment to constant variable '{}'",
                            name
                        )));
                    }
                    binding.value = value;
                    return Ok(());
                }
                if let Some(global) = &s.global_object {
                    return global.set(name, value);
                }
                s.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return Err(JsError::reference(format!("{} is not defined", name))),
            }
        }
    }

    /// `this` of the nearest function or global scope.
    pub fn this_value(&self) -> Value {
        let mut scope = self.clone();
        loop {
            let parent = {
                let s = scope.0.borrow();
                if let Some(this) = &s.this_value {
                    return this.clone();
                }
                s.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return Value::Undefined,
            }
        }
    }

    /// Initialized bindings of every scope from innermost to global.
    /// Builtins are skipped: only enumerable global properties are listed.
    pub fn snapshot(&self) -> Vec<ScopeSnapshot> {
        let mut snapshots = Vec::new();
        let mut cursor = Some(self.clone());
        while let Some(scope) = cursor {
            let s = scope.0.borrow();
            let mut variables: Vec<(String, Value)> = s
                .bindings
                .iter()
                .filter(|(_, b)| b.initialized)
                .map(|(name, b)| (name.clone(), b.value.clone()))
                .collect();
            variables.sort_by(|a, b| a.0.cmp(&b.0));
            if let Some(global) = &s.global_object {
                for key in global.own_enumerable_keys() {
                    let value = global.get(&key);
                    variables.push((key, value));
                }
            }
            snapshots.push(ScopeSnapshot {
                kind: s.kind,
                variables,
            });
            cursor = s.parent.clone();
        }
        snapshots
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.borrow();
        f.debug_struct("Environment")
            .field("kind", &s.kind)
            .field("bindings", &s.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::JsObject;

    fn global() -> Environment {
        Environment::global(ObjectRef::new(JsObject::new(None)))
    }

    #[test]
    fn test_inner_scope_sees_outer_bindings() {
        let env = global();
        env.declare_var("x").unwrap();
        env.initialize("x", Value::from(1)).unwrap();
        let block = env.block();
        assert_eq!(block.get("x").unwrap(), Value::from(1));
    }

    #[test]
    fn test_unknown_identifier_is_reference_error() {
        let err = global().get("nope").unwrap_err();
        assert!(matches!(err, JsError::Reference { .. }));
        assert_eq!(err.message(), "nope is not defined");
    }

    #[test]
    fn test_lexical_bindings_have_dead_zone_and_const() {
        let env = global().block();
        env.declare_lexical("c", false).unwrap();
        assert!(matches!(env.get("c"), Err(JsError::Reference { .. })));
        env.initialize("c", Value::from(3)).unwrap();
        assert_eq!(env.get("c").unwrap(), Value::from(3));
        assert!(matches!(env.assign("c", Value::from(4)), Err(JsError::Type { .. })));
        assert!(matches!(env.declare_lexical("c", true), Err(JsError::Syntax { .. })));
    }

    #[test]
    fn test_var_hoists_past_blocks() {
        let env = global();
        let func = Environment::function(&env, Value::Undefined);
        let block = func.block();
        block.declare_var("v").unwrap();
        assert!(func.0.borrow().bindings.contains_key("v"));
        assert!(!block.0.borrow().bindings.contains_key("v"));
    }

    #[test]
    fn test_global_vars_live_on_global_object() {
        let object = ObjectRef::new(JsObject::new(None));
        let env = Environment::global(object.clone());
        env.declare_var("g").unwrap();
        env.initialize("g", Value::from(7)).unwrap();
        assert_eq!(object.get("g"), Value::from(7));

        // Sloppy assignment to an unknown name creates a global property.
        env.block().assign("implicit", Value::from(1)).unwrap();
        assert_eq!(object.get("implicit"), Value::from(1));
    }

    #[test]
    fn test_this_resolves_to_nearest_function_scope() {
        let object = ObjectRef::new(JsObject::new(None));
        let env = Environment::global(object.clone());
        assert_eq!(env.block().this_value(), Value::Object(object));
        let func = Environment::function(&env, Value::from(5));
        assert_eq!(func.block().this_value(), Value::from(5));
    }
}
