use super::object::Object;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A chained mutable scope. Clones share the underlying bindings, so a
/// closure and the block that created it see each other's writes.
#[derive(Clone)]
pub struct Environment {
    env_ptr: Rc<RefCell<EnvironmentData>>,
}

struct EnvironmentData {
    values: HashMap<String, Object>,
    enclosing: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        let env_data = EnvironmentData {
            values: HashMap::new(),
            enclosing: None,
        };
        Environment {
            env_ptr: Rc::new(RefCell::new(env_data)),
        }
    }

    pub fn with_enclosing(env: &Environment) -> Self {
        let env_data = EnvironmentData {
            values: HashMap::new(),
            enclosing: Some(env.clone()),
        };
        Environment {
            env_ptr: Rc::new(RefCell::new(env_data)),
        }
    }

    pub fn define(&self, name: String, value: Object) {
        self.env_ptr.borrow_mut().values.insert(name, value);
    }

    /// Walks the chain outward. At each level a package-qualified binding
    /// wins over a bare one, so a file's own definitions shadow same-named
    /// globals from elsewhere.
    pub fn get(&self, name: &str, package: Option<&str>) -> Option<Object> {
        let data = self.env_ptr.borrow();

        if let Some(pkg) = package {
            if let Some(value) = data.values.get(&format!("{}.{}", pkg, name)) {
                return Some(value.clone());
            }
        }
        if let Some(value) = data.values.get(name) {
            return Some(value.clone());
        }

        data.enclosing
            .as_ref()
            .and_then(|outer| outer.get(name, package))
    }

    /// Looks only at this scope's own bindings.
    pub fn get_here(&self, name: &str) -> Option<Object> {
        self.env_ptr.borrow().values.get(name).cloned()
    }

    /// Writes to whichever scope owns the binding. An unbound name is
    /// defined in this scope.
    pub fn assign(&self, name: &str, package: Option<&str>, value: Object) {
        if self.try_assign(name, package, &value) {
            return;
        }
        let key = match package {
            Some(pkg) => format!("{}.{}", pkg, name),
            None => name.to_owned(),
        };
        self.define(key, value);
    }

    fn try_assign(&self, name: &str, package: Option<&str>, value: &Object) -> bool {
        let mut data = self.env_ptr.borrow_mut();

        if let Some(pkg) = package {
            let qualified = format!("{}.{}", pkg, name);
            if let Some(slot) = data.values.get_mut(&qualified) {
                *slot = value.clone();
                return true;
            }
        }
        if let Some(slot) = data.values.get_mut(name) {
            *slot = value.clone();
            return true;
        }

        match &data.enclosing {
            Some(outer) => outer.try_assign(name, package, value),
            None => false,
        }
    }

    /// Snapshot of this scope's own bindings, for class property copying.
    pub fn bindings(&self) -> Vec<(String, Object)> {
        self.env_ptr
            .borrow()
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Environment::new();
        env.define("a".to_owned(), Object::Integer(1));
        assert_eq!(env.get("a", None), Some(Object::Integer(1)));
        assert_eq!(env.get("b", None), None);
    }

    #[test]
    fn test_qualified_wins_over_bare() {
        let env = Environment::new();
        env.define("pi".to_owned(), Object::Integer(0));
        env.define("math.pi".to_owned(), Object::Integer(3));

        assert_eq!(env.get("pi", Some("math")), Some(Object::Integer(3)));
        assert_eq!(env.get("pi", None), Some(Object::Integer(0)));
    }

    #[test]
    fn test_outer_chain() {
        let outer = Environment::new();
        outer.define("x".to_owned(), Object::Integer(1));
        let inner = Environment::with_enclosing(&outer);

        assert_eq!(inner.get("x", None), Some(Object::Integer(1)));
        assert_eq!(inner.get_here("x"), None);
    }

    #[test]
    fn test_assign_updates_owning_scope() {
        let outer = Environment::new();
        outer.define("x".to_owned(), Object::Integer(1));
        let inner = Environment::with_enclosing(&outer);

        inner.assign("x", None, Object::Integer(2));
        assert_eq!(outer.get("x", None), Some(Object::Integer(2)));
        assert_eq!(inner.get_here("x"), None);
    }

    #[test]
    fn test_assign_unbound_defines_locally() {
        let outer = Environment::new();
        let inner = Environment::with_enclosing(&outer);

        inner.assign("fresh", None, Object::Integer(5));
        assert_eq!(inner.get_here("fresh"), Some(Object::Integer(5)));
        assert_eq!(outer.get("fresh", None), None);
    }
}
