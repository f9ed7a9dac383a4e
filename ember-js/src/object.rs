//! Object model.
//!
//! Objects are shared `Rc<RefCell<JsObject>>` handles. Property lookup
//! walks the prototype chain; assignment always creates or updates an own
//! property so a prototype's value is shadowed, never mutated. Properties
//! keep their insertion order.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::coerce::{array_index, number_to_string};
use crate::error::{JsError, JsResult};
use crate::function::Callable;
use crate::value::Value;

/// Property attributes.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    pub value: Value,
    /// Assignments to a non-writable property are ignored.
    pub writable: bool,
    /// Visible to `for-in` and `Object.keys`.
    pub enumerable: bool,
}

impl PropertyDescriptor {
    /// Create a data descriptor.
    pub fn data(value: Value, writable: bool, enumerable: bool) -> Self {
        PropertyDescriptor {
            value,
            writable,
            enumerable,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Property {
    pub key: String,
    pub descriptor: PropertyDescriptor,
}

/// Internal slots distinguishing exotic objects.
#[derive(Clone, Debug)]
pub enum ObjectKind {
    Ordinary,
    /// Dense element storage; holes read as `undefined`.
    Array(Vec<Value>),
    Function(Callable),
    Number(f64),
    Boolean(bool),
    String(String),
    /// Milliseconds since the Unix epoch, NaN for an invalid date.
    Date(f64),
    Error,
}

/// Object record.
pub struct JsObject {
    pub kind: ObjectKind,
    properties: Vec<Property>,
    prototype: Option<ObjectRef>,
}

impl JsObject {
    /// Create an ordinary object.
    pub fn new(prototype: Option<ObjectRef>) -> Self {
        Self::with_kind(ObjectKind::Ordinary, prototype)
    }

    pub fn with_kind(kind: ObjectKind, prototype: Option<ObjectRef>) -> Self {
        JsObject {
            kind,
            properties: Vec::new(),
            prototype,
        }
    }

    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    /// Look up an own property, including virtual element and length slots.
    pub fn get_own(&self, key: &str) -> Option<Value> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if key == "length" {
                    return Some(Value::from(elements.len()));
                }
                if let Some(index) = array_index(key) {
                    return elements.get(index).cloned();
                }
            }
            ObjectKind::String(s) => {
                if let Some(value) = string_slot(s, key) {
                    return Some(value);
                }
            }
            _ => {}
        }

        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.descriptor.value.clone())
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.get_own(key).is_some()
    }

    /// Create or update an own property.
    pub fn set(&mut self, key: &str, value: Value) -> JsResult<()> {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if key == "length" {
                let len = match value {
                    Value::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                        n as usize
                    }
                    _ => return Err(JsError::range("Invalid array length")),
                };
                elements.resize(len, Value::Undefined);
                return Ok(());
            }
            if let Some(index) = array_index(key) {
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                return Ok(());
            }
        }

        if let ObjectKind::String(s) = &self.kind {
            if string_slot(s, key).is_some() {
                return Ok(());
            }
        }

        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(prop) => {
                if prop.descriptor.writable {
                    prop.descriptor.value = value;
                }
            }
            None => self.properties.push(Property {
                key: key.to_string(),
                descriptor: PropertyDescriptor::data(value, true, true),
            }),
        }
        Ok(())
    }

    /// Define or redefine a property with explicit attributes.
    pub fn define_property(&mut self, key: &str, descriptor: PropertyDescriptor) {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if let Some(index) = array_index(key) {
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = descriptor.value;
                return;
            }
        }

        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(prop) => prop.descriptor = descriptor,
            None => self.properties.push(Property {
                key: key.to_string(),
                descriptor,
            }),
        }
    }

    /// Install a writable property, as builtins do for methods and constants.
    pub fn define(&mut self, key: &str, value: Value, enumerable: bool) {
        self.define_property(key, PropertyDescriptor::data(value, true, enumerable));
    }

    /// Remove an own property. Array elements become holes.
    pub fn delete(&mut self, key: &str) -> bool {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if let Some(index) = array_index(key) {
                if let Some(slot) = elements.get_mut(index) {
                    *slot = Value::Undefined;
                }
                return true;
            }
            if key == "length" {
                return false;
            }
        }

        if let Some(pos) = self.properties.iter().position(|p| p.key == key) {
            self.properties.remove(pos);
        }
        true
    }

    /// All own keys: element indices first, then properties in insertion order.
    pub fn own_keys(&self) -> Vec<String> {
        self.collect_keys(false)
    }

    /// Own enumerable keys in the order `for-in` visits them.
    pub fn own_enumerable_keys(&self) -> Vec<String> {
        self.collect_keys(true)
    }

    fn collect_keys(&self, enumerable_only: bool) -> Vec<String> {
        let mut keys: Vec<String> = match &self.kind {
            ObjectKind::Array(elements) => (0..elements.len()).map(|i| i.to_string()).collect(),
            ObjectKind::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        keys.extend(
            self.properties
                .iter()
                .filter(|p| !enumerable_only || p.descriptor.enumerable)
                .map(|p| p.key.clone()),
        );
        keys
    }

    /// Own property descriptor, if the property is stored (not virtual).
    pub fn descriptor(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.descriptor)
    }
}

/// Index and `length` slots of a string wrapper.
fn string_slot(s: &str, key: &str) -> Option<Value> {
    if key == "length" {
        return Some(Value::from(s.chars().count()));
    }
    array_index(key).and_then(|i| s.chars().nth(i).map(|c| Value::String(c.to_string())))
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<JsObject>>);

impl ObjectRef {
    pub fn new(object: JsObject) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.borrow().prototype.clone()
    }

    /// Replace the prototype, refusing to close a cycle.
    pub fn set_prototype(&self, prototype: Option<ObjectRef>) -> JsResult<()> {
        let mut cursor = prototype.clone();
        while let Some(obj) = cursor {
            if obj.ptr_eq(self) {
                return Err(JsError::type_error("Cyclic __proto__ value"));
            }
            cursor = obj.prototype();
        }
        self.borrow_mut().prototype = prototype;
        Ok(())
    }

    /// Property lookup through the prototype chain. Missing is `undefined`.
    pub fn get(&self, key: &str) -> Value {
        self.lookup(key).unwrap_or_default()
    }

    /// Property lookup through the prototype chain.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let obj = current.borrow();
                if let Some(value) = obj.get_own(key) {
                    return Some(value);
                }
                obj.prototype.clone()
            };
            current = next?;
        }
    }

    /// Assign an own property.
    pub fn set(&self, key: &str, value: Value) -> JsResult<()> {
        self.borrow_mut().set(key, value)
    }

    pub fn define(&self, key: &str, value: Value, enumerable: bool) {
        self.borrow_mut().define(key, value, enumerable);
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.borrow().has_own_property(key)
    }

    /// `key in obj`.
    pub fn has_property(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.borrow_mut().delete(key)
    }

    pub fn own_enumerable_keys(&self) -> Vec<String> {
        self.borrow().own_enumerable_keys()
    }

    pub fn is_callable(&self) -> bool {
        self.borrow().is_callable()
    }

    pub fn is_array(&self) -> bool {
        self.borrow().is_array()
    }

    pub fn callable(&self) -> Option<Callable> {
        match &self.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    /// Snapshot of array elements, or `None` for non-arrays.
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match &self.borrow().kind {
            ObjectKind::Array(elements) => Some(elements.clone()),
            _ => None,
        }
    }

    /// `true` when `proto` appears on this object's prototype chain.
    pub fn inherits_from(&self, proto: &ObjectRef) -> bool {
        let mut cursor = self.prototype();
        while let Some(obj) = cursor {
            if obj.ptr_eq(proto) {
                return true;
            }
            cursor = obj.prototype();
        }
        false
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(obj) = self.0.try_borrow() else {
            return write!(f, "[object <borrowed>]");
        };
        match &obj.kind {
            ObjectKind::Ordinary => write!(f, "[object Object]"),
            ObjectKind::Array(elements) => write!(f, "[object Array({})]", elements.len()),
            ObjectKind::Function(callable) => write!(f, "[function {}]", callable.name()),
            ObjectKind::Number(n) => write!(f, "[Number {}]", number_to_string(*n)),
            ObjectKind::Boolean(b) => write!(f, "[Boolean {}]", b),
            ObjectKind::String(s) => write!(f, "[String {:?}]", s),
            ObjectKind::Date(t) => write!(f, "[Date {}]", number_to_string(*t)),
            ObjectKind::Error => write!(f, "[object Error]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(JsObject::new(prototype))
    }

    #[test]
    fn test_lookup_walks_prototype_chain() {
        let base = plain(None);
        base.set("greeting", Value::from("hi")).unwrap();
        let derived = plain(Some(base.clone()));
        assert_eq!(derived.get("greeting"), Value::from("hi"));
        assert_eq!(derived.get("missing"), Value::Undefined);
        assert!(derived.has_property("greeting"));
        assert!(!derived.has_own_property("greeting"));
    }

    #[test]
    fn test_set_shadows_without_touching_prototype() {
        let proto = plain(None);
        proto.set("x", Value::from(1)).unwrap();
        let obj = plain(Some(proto.clone()));
        obj.set("x", Value::from(2)).unwrap();
        assert_eq!(obj.get("x"), Value::from(2));
        assert_eq!(proto.get("x"), Value::from(1));
    }

    #[test]
    fn test_enumeration_order_and_visibility() {
        let obj = plain(None);
        obj.set("b", Value::from(1)).unwrap();
        obj.set("a", Value::from(2)).unwrap();
        obj.define("hidden", Value::Null, false);
        obj.set("c", Value::from(3)).unwrap();
        assert_eq!(obj.own_enumerable_keys(), ["b", "a", "c"]);
        assert_eq!(obj.borrow().own_keys(), ["b", "a", "hidden", "c"]);
    }

    #[test]
    fn test_prototype_cycles_are_rejected() {
        let a = plain(None);
        let b = plain(Some(a.clone()));
        assert!(a.set_prototype(Some(b.clone())).is_err());
        assert!(a.set_prototype(Some(a.clone())).is_err());
        assert!(a.prototype().is_none());
    }

    #[test]
    fn test_array_elements_and_length() {
        let arr = ObjectRef::new(JsObject::with_kind(
            ObjectKind::Array(vec![Value::from(1), Value::from(2)]),
            None,
        ));
        assert_eq!(arr.get("length"), Value::from(2));
        arr.set("4", Value::from(5)).unwrap();
        assert_eq!(arr.get("length"), Value::from(5));
        assert_eq!(arr.get("3"), Value::Undefined);
        arr.set("length", Value::from(1)).unwrap();
        assert_eq!(arr.array_elements().unwrap(), vec![Value::from(1)]);
        assert!(arr.set("length", Value::from(-1.0)).is_err());
    }

    #[test]
    fn test_read_only_property_ignores_writes() {
        let obj = plain(None);
        obj.borrow_mut().define_property(
            "fixed",
            PropertyDescriptor::data(Value::from(1), false, true),
        );
        obj.set("fixed", Value::from(2)).unwrap();
        assert_eq!(obj.get("fixed"), Value::from(1));
    }

    #[test]
    fn test_delete_and_inherits_from() {
        let proto = plain(None);
        let obj = plain(Some(proto.clone()));
        obj.set("k", Value::Null).unwrap();
        assert!(obj.delete("k"));
        assert!(!obj.has_own_property("k"));
        assert!(obj.inherits_from(&proto));
        assert!(!proto.inherits_from(&obj));
    }
}
