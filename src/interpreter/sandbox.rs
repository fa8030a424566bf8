use super::types::{Capability, JsFunction, JsObject, ObjectData, PropertyDescriptor};
use crate::types::{JsString, JsSymbol, JsValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

pub(crate) const ERROR_TYPES: [&str; 7] = [
    "Error",
    "TypeError",
    "ReferenceError",
    "SyntaxError",
    "RangeError",
    "URIError",
    "EvalError",
];

/// Intrinsic objects of one interpreter, plus the identity set of built-ins guest code may not
/// modify.
pub struct Realm {
    pub object_prototype: JsObject,
    pub function_prototype: JsObject,
    pub array_prototype: JsObject,
    pub string_prototype: JsObject,
    pub number_prototype: JsObject,
    pub boolean_prototype: JsObject,
    pub symbol_prototype: JsObject,
    pub error_prototype: JsObject,
    pub date_prototype: JsObject,
    pub regexp_prototype: JsObject,
    pub map_prototype: JsObject,
    pub set_prototype: JsObject,
    pub weakmap_prototype: JsObject,
    pub weakset_prototype: JsObject,
    error_prototypes: FxHashMap<&'static str, JsObject>,
    pub eval_function: JsObject,
    pub function_constructor: JsObject,
    /// Global intrinsics in registration order.
    globals: Vec<(JsString, JsValue)>,
    protected: FxHashMap<usize, Rc<str>>,
    pub(crate) symbol_registry: FxHashMap<JsString, JsSymbol>,
}

fn object_with_proto(proto: &JsObject) -> JsObject {
    JsObject::from_data(ObjectData::with_proto(Some(proto.clone())))
}

fn capability(cap: Capability, function_prototype: &JsObject) -> JsObject {
    let mut data = ObjectData::with_proto(Some(function_prototype.clone()));
    data.class_name = "Function".to_string();
    data.callable = Some(JsFunction::Capability(cap));
    data.insert_property(
        "length".into(),
        PropertyDescriptor::data(JsValue::Number(1.0), false, false, true),
    );
    JsObject::from_data(data)
}

impl Realm {
    /// Creates every intrinsic prototype, empty and linked. The builtins module fills them.
    pub fn new() -> Self {
        let object_prototype = JsObject::new();
        let function_prototype = object_with_proto(&object_prototype);
        {
            let mut fp = function_prototype.borrow_mut();
            fp.class_name = "Function".to_string();
            fp.callable = Some(JsFunction::native("", 0, |_, _, _| Ok(JsValue::Undefined)));
        }
        let error_prototype = object_with_proto(&object_prototype);
        let mut error_prototypes = FxHashMap::default();
        error_prototypes.insert("Error", error_prototype.clone());
        for kind in &ERROR_TYPES[1..] {
            error_prototypes.insert(*kind, object_with_proto(&error_prototype));
        }
        let array_prototype = object_with_proto(&object_prototype);
        {
            let mut ap = array_prototype.borrow_mut();
            ap.class_name = "Array".to_string();
            ap.array_elements = Some(Vec::new());
        }
        let eval_function = capability(Capability::Eval, &function_prototype);
        let function_constructor = capability(Capability::Function, &function_prototype);
        Realm {
            array_prototype,
            string_prototype: object_with_proto(&object_prototype),
            number_prototype: object_with_proto(&object_prototype),
            boolean_prototype: object_with_proto(&object_prototype),
            symbol_prototype: object_with_proto(&object_prototype),
            date_prototype: object_with_proto(&object_prototype),
            regexp_prototype: object_with_proto(&object_prototype),
            map_prototype: object_with_proto(&object_prototype),
            set_prototype: object_with_proto(&object_prototype),
            weakmap_prototype: object_with_proto(&object_prototype),
            weakset_prototype: object_with_proto(&object_prototype),
            error_prototype,
            error_prototypes,
            eval_function,
            function_constructor,
            object_prototype,
            function_prototype,
            globals: Vec::new(),
            protected: FxHashMap::default(),
            symbol_registry: FxHashMap::default(),
        }
    }

    pub fn error_prototype_for(&self, kind: &str) -> JsObject {
        self.error_prototypes
            .get(kind)
            .unwrap_or(&self.error_prototype)
            .clone()
    }

    pub fn define_global(&mut self, name: &str, value: JsValue) {
        let name = JsString::from(name);
        match self.globals.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.globals.push((name, value)),
        }
    }

    pub fn globals(&self) -> &[(JsString, JsValue)] {
        &self.globals
    }

    /// Adds every object reachable from the registered globals to the protected set, labeled
    /// with the global it was reached from.
    pub fn seal(&mut self) {
        let mut seen = FxHashSet::default();
        let mut queue: Vec<(JsObject, Rc<str>)> = self
            .globals
            .iter()
            .filter_map(|(name, value)| match value {
                JsValue::Object(o) => Some((o.clone(), Rc::from(name.as_str()))),
                _ => None,
            })
            .collect();
        queue.push((self.object_prototype.clone(), Rc::from("Object")));
        queue.push((self.function_prototype.clone(), Rc::from("Function")));
        for (obj, label) in &queue {
            self.protected.insert(obj.addr(), label.clone());
        }
        while let Some((obj, label)) = queue.pop() {
            if !seen.insert(obj.addr()) {
                continue;
            }
            self.protected.entry(obj.addr()).or_insert_with(|| label.clone());
            let data = obj.borrow();
            let descriptors = data
                .properties
                .values()
                .chain(data.symbols.iter().map(|(_, d)| d));
            for desc in descriptors {
                for value in [&desc.value, &desc.get, &desc.set].into_iter().flatten() {
                    if let JsValue::Object(child) = value {
                        queue.push((child.clone(), label.clone()));
                    }
                }
            }
            if let Some(proto) = &data.prototype {
                queue.push((proto.clone(), label.clone()));
            }
        }
        tracing::debug!(objects = self.protected.len(), "sealed intrinsics");
    }

    pub fn is_protected(&self, obj: &JsObject) -> bool {
        self.protected.contains_key(&obj.addr())
    }

    pub fn protected_name(&self, obj: &JsObject) -> Option<&str> {
        self.protected.get(&obj.addr()).map(|s| &**s)
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealing_protects_reachable_intrinsics() {
        let mut realm = Realm::new();
        let ctor = JsObject::new();
        let proto = realm.array_prototype.clone();
        ctor.borrow_mut()
            .insert_builtin("prototype", JsValue::Object(proto.clone()));
        realm.define_global("Array", JsValue::Object(ctor.clone()));
        realm.seal();
        assert_eq!(realm.protected_name(&ctor), Some("Array"));
        assert!(realm.is_protected(&proto));
        assert!(realm.is_protected(&realm.object_prototype));
        assert!(!realm.is_protected(&JsObject::new()));
    }

    #[test]
    fn error_prototypes_chain_to_error() {
        let realm = Realm::new();
        let type_error = realm.error_prototype_for("TypeError");
        assert!(type_error.inherits_from(&realm.error_prototype));
        assert!(realm.error_prototype_for("Unknown").ptr_eq(&realm.error_prototype));
    }
}
