use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::EvalError;
use crate::interpreter::helpers::to_boolean;
use crate::interpreter::types::{JsObject, ObjectData, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol};

/// Class names `Object.prototype.toString` reports as the builtin tag.
const BUILTIN_TAGS: [&str; 9] = [
    "Array",
    "Function",
    "Error",
    "Boolean",
    "Number",
    "String",
    "Date",
    "RegExp",
    "Arguments",
];

impl Interpreter {
    pub(crate) fn setup_object(&mut self) {
        let proto = self.realm.object_prototype.clone();
        let ctor = self.install_constructor("Object", 1, &proto, |interp, this, args| {
            let value = arg(args, 0);
            if value.is_nullish() {
                return Ok(match interp.constructing_this(this) {
                    Some(instance) => JsValue::Object(instance),
                    None => JsValue::Object(interp.create_object()),
                });
            }
            interp.to_object(&value).map(JsValue::Object)
        });
        self.setup_object_statics(&ctor);
        self.setup_object_prototype(&proto);
    }

    fn setup_object_statics(&mut self, ctor: &JsObject) {
        self.install_methods(
            ctor,
            vec![
                method("keys", 1, |interp, _, args| {
                    let obj = interp.to_object(&arg(args, 0))?;
                    let keys = obj.borrow().own_enumerable_string_keys();
                    Ok(interp.create_array(keys.into_iter().map(JsValue::String).collect()))
                }),
                method("values", 1, |interp, _, args| {
                    let entries = interp.enumerable_own_entries(&arg(args, 0))?;
                    Ok(interp.create_array(entries.into_iter().map(|(_, v)| v).collect()))
                }),
                method("entries", 1, |interp, _, args| {
                    let entries = interp.enumerable_own_entries(&arg(args, 0))?;
                    let pairs = entries
                        .into_iter()
                        .map(|(k, v)| interp.create_array(vec![JsValue::String(k), v]))
                        .collect();
                    Ok(interp.create_array(pairs))
                }),
                method("assign", 2, |interp, _, args| {
                    let target = interp.to_object(&arg(args, 0))?;
                    interp.check_mutable(&target)?;
                    for source in args.iter().skip(1) {
                        interp.assign_properties(&target, source)?;
                    }
                    Ok(JsValue::Object(target))
                }),
                method("freeze", 1, |interp, _, args| {
                    let target = arg(args, 0);
                    if let JsValue::Object(obj) = &target {
                        interp.check_mutable(obj)?;
                        let mut guard = obj.borrow_mut();
                        let data = &mut *guard;
                        data.extensible = false;
                        data.frozen = true;
                        let descriptors = data
                            .properties
                            .values_mut()
                            .chain(data.symbols.iter_mut().map(|(_, d)| d));
                        for desc in descriptors {
                            desc.configurable = Some(false);
                            if desc.is_data_descriptor() {
                                desc.writable = Some(false);
                            }
                        }
                    }
                    Ok(target)
                }),
                method("isFrozen", 1, |_, _, args| {
                    let JsValue::Object(obj) = arg(args, 0) else {
                        return Ok(JsValue::Boolean(true));
                    };
                    let data = obj.borrow();
                    let elements_frozen = data.frozen
                        || data.array_elements.as_ref().is_none_or(|e| e.is_empty());
                    let frozen = !data.extensible
                        && elements_frozen
                        && data.properties.values().all(|d| {
                            !d.is_configurable() && (!d.is_data_descriptor() || !d.is_writable())
                        });
                    Ok(JsValue::Boolean(frozen))
                }),
                method("preventExtensions", 1, |interp, _, args| {
                    let target = arg(args, 0);
                    if let JsValue::Object(obj) = &target {
                        interp.check_mutable(obj)?;
                        obj.borrow_mut().extensible = false;
                    }
                    Ok(target)
                }),
                method("isExtensible", 1, |_, _, args| {
                    Ok(JsValue::Boolean(match arg(args, 0) {
                        JsValue::Object(obj) => obj.borrow().extensible,
                        _ => false,
                    }))
                }),
                method("create", 2, |interp, _, args| {
                    let proto = match arg(args, 0) {
                        JsValue::Object(p) => Some(p),
                        JsValue::Null => None,
                        other => {
                            return Err(interp.throw_type_error(&format!(
                                "Object prototype may only be an Object or null: {other}"
                            )));
                        }
                    };
                    let obj = JsObject::from_data(ObjectData::with_proto(proto));
                    let props = arg(args, 1);
                    if !props.is_undefined() {
                        interp.define_properties(&obj, &props)?;
                    }
                    Ok(JsValue::Object(obj))
                }),
                method("getPrototypeOf", 1, |interp, _, args| {
                    let obj = interp.to_object(&arg(args, 0))?;
                    Ok(obj.prototype().map_or(JsValue::Null, JsValue::Object))
                }),
                method("setPrototypeOf", 2, |interp, _, args| {
                    let target = arg(args, 0);
                    if target.is_nullish() {
                        return Err(interp.throw_type_error(
                            "Object.setPrototypeOf called on null or undefined",
                        ));
                    }
                    let proto = match arg(args, 1) {
                        JsValue::Object(p) => Some(p),
                        JsValue::Null => None,
                        other => {
                            return Err(interp.throw_type_error(&format!(
                                "Object prototype may only be an Object or null: {other}"
                            )));
                        }
                    };
                    let JsValue::Object(obj) = &target else {
                        return Ok(target);
                    };
                    interp.check_mutable(obj)?;
                    if let Some(p) = &proto
                        && (p.ptr_eq(obj) || p.inherits_from(obj))
                    {
                        return Err(interp.throw_type_error("Cyclic __proto__ value"));
                    }
                    obj.borrow_mut().prototype = proto;
                    Ok(target)
                }),
                method("defineProperty", 3, |interp, _, args| {
                    let target = arg(args, 0);
                    let JsValue::Object(obj) = &target else {
                        return Err(interp.throw_type_error("Object.defineProperty called on non-object"));
                    };
                    let key = interp.to_property_key(&arg(args, 1))?;
                    let desc = interp.to_property_descriptor(&arg(args, 2))?;
                    interp.define_property_or_throw(obj, key, desc)?;
                    Ok(target)
                }),
                method("defineProperties", 2, |interp, _, args| {
                    let target = arg(args, 0);
                    let JsValue::Object(obj) = &target else {
                        return Err(
                            interp.throw_type_error("Object.defineProperties called on non-object")
                        );
                    };
                    interp.define_properties(obj, &arg(args, 1))?;
                    Ok(target)
                }),
                method("getOwnPropertyNames", 1, |interp, _, args| {
                    let obj = interp.to_object(&arg(args, 0))?;
                    let names = obj
                        .borrow()
                        .own_keys()
                        .into_iter()
                        .filter_map(|k| k.as_string().cloned().map(JsValue::String))
                        .collect();
                    Ok(interp.create_array(names))
                }),
                method("getOwnPropertySymbols", 1, |interp, _, args| {
                    let obj = interp.to_object(&arg(args, 0))?;
                    let symbols = obj
                        .borrow()
                        .symbols
                        .iter()
                        .map(|(s, _)| JsValue::Symbol(s.clone()))
                        .collect();
                    Ok(interp.create_array(symbols))
                }),
                method("getOwnPropertyDescriptor", 2, |interp, _, args| {
                    let obj = interp.to_object(&arg(args, 0))?;
                    let key = interp.to_property_key(&arg(args, 1))?;
                    let desc = obj.borrow().get_own_property(&key);
                    Ok(match desc {
                        Some(desc) => JsValue::Object(interp.from_property_descriptor(&desc)),
                        None => JsValue::Undefined,
                    })
                }),
                method("fromEntries", 1, |interp, _, args| {
                    let entries = interp.iterate_to_vec(&arg(args, 0), "Object.fromEntries")?;
                    let obj = interp.create_object();
                    for entry in entries {
                        if !entry.is_object() {
                            return Err(interp.throw_type_error(&format!(
                                "Iterator value {entry} is not an entry object"
                            )));
                        }
                        let key = interp.get_named(&entry, "0")?;
                        let key = interp.to_property_key(&key)?;
                        let value = interp.get_named(&entry, "1")?;
                        obj.borrow_mut()
                            .define_own_property(key, PropertyDescriptor::data_default(value));
                    }
                    Ok(JsValue::Object(obj))
                }),
                method("is", 2, |_, _, args| {
                    Ok(JsValue::Boolean(arg(args, 0).same_value(&arg(args, 1))))
                }),
            ],
        );
    }

    fn setup_object_prototype(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("hasOwnProperty", 1, |interp, this, args| {
                    let key = interp.to_property_key(&arg(args, 0))?;
                    let obj = interp.to_object(this)?;
                    Ok(JsValue::Boolean(obj.has_own_property(&key)))
                }),
                method("isPrototypeOf", 1, |interp, this, args| {
                    let JsValue::Object(value) = arg(args, 0) else {
                        return Ok(JsValue::Boolean(false));
                    };
                    let obj = interp.to_object(this)?;
                    Ok(JsValue::Boolean(value.inherits_from(&obj)))
                }),
                method("propertyIsEnumerable", 1, |interp, this, args| {
                    let key = interp.to_property_key(&arg(args, 0))?;
                    let obj = interp.to_object(this)?;
                    let desc = obj.borrow().get_own_property(&key);
                    Ok(JsValue::Boolean(desc.is_some_and(|d| d.is_enumerable())))
                }),
                method("toString", 0, |interp, this, _| {
                    interp.object_to_string(this).map(JsValue::from)
                }),
                method("toLocaleString", 0, |interp, this, _| {
                    let to_string = interp.get_named(this, "toString")?;
                    interp.call_function(&to_string, this, &[])
                }),
                method("valueOf", 0, |interp, this, _| {
                    interp.to_object(this).map(JsValue::Object)
                }),
            ],
        );
    }

    /// `[object Tag]` text of `Object.prototype.toString`.
    pub(crate) fn object_to_string(&mut self, this: &JsValue) -> Result<String, EvalError> {
        let obj = match this {
            JsValue::Undefined => return Ok("[object Undefined]".to_string()),
            JsValue::Null => return Ok("[object Null]".to_string()),
            other => self.to_object(other)?,
        };
        let tag_key = PropertyKey::Symbol(JsSymbol::well_known(WellKnownSymbol::ToStringTag));
        if let JsValue::String(tag) = self.get(&JsValue::Object(obj.clone()), &tag_key)? {
            return Ok(format!("[object {tag}]"));
        }
        let data = obj.borrow();
        let tag = if data.callable.is_some() {
            "Function"
        } else if BUILTIN_TAGS.contains(&data.class_name.as_str()) {
            data.class_name.as_str()
        } else {
            "Object"
        };
        Ok(format!("[object {tag}]"))
    }

    /// Own enumerable string-keyed `(key, value)` pairs, read through getters.
    pub(crate) fn enumerable_own_entries(
        &mut self,
        value: &JsValue,
    ) -> Result<Vec<(JsString, JsValue)>, EvalError> {
        let obj = self.to_object(value)?;
        let keys = obj.borrow().own_enumerable_string_keys();
        let target = JsValue::Object(obj);
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get(&target, &PropertyKey::String(key.clone()))?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    /// `Object.assign` step for one source: own enumerable properties written with `[[Set]]`.
    fn assign_properties(&mut self, target: &JsObject, source: &JsValue) -> Result<(), EvalError> {
        if source.is_nullish() {
            return Ok(());
        }
        let source = self.to_object(source)?;
        let keys: Vec<PropertyKey> = {
            let data = source.borrow();
            data.own_keys()
                .into_iter()
                .filter(|k| data.get_own_property(k).is_some_and(|d| d.is_enumerable()))
                .collect()
        };
        let source = JsValue::Object(source);
        let target = JsValue::Object(target.clone());
        for key in keys {
            let value = self.get(&source, &key)?;
            self.put(&target, key, value)?;
        }
        Ok(())
    }

    fn define_properties(&mut self, obj: &JsObject, props: &JsValue) -> Result<(), EvalError> {
        let props = self.to_object(props)?;
        let keys: Vec<PropertyKey> = {
            let data = props.borrow();
            data.own_keys()
                .into_iter()
                .filter(|k| data.get_own_property(k).is_some_and(|d| d.is_enumerable()))
                .collect()
        };
        let props = JsValue::Object(props);
        let mut descriptors = Vec::with_capacity(keys.len());
        for key in keys {
            let desc_obj = self.get(&props, &key)?;
            descriptors.push((key, self.to_property_descriptor(&desc_obj)?));
        }
        for (key, desc) in descriptors {
            self.define_property_or_throw(obj, key, desc)?;
        }
        Ok(())
    }

    /// ToPropertyDescriptor: reads the descriptor fields present on `value`.
    pub(crate) fn to_property_descriptor(
        &mut self,
        value: &JsValue,
    ) -> Result<PropertyDescriptor, EvalError> {
        let JsValue::Object(obj) = value else {
            return Err(self.throw_type_error(&format!(
                "Property description must be an object: {value}"
            )));
        };
        let mut desc = PropertyDescriptor::default();
        let field = |interp: &mut Self, name: &str| -> Result<Option<JsValue>, EvalError> {
            if obj.has_property(&PropertyKey::from(name)) {
                interp.get_named(value, name).map(Some)
            } else {
                Ok(None)
            }
        };
        desc.enumerable = field(self, "enumerable")?.map(|v| to_boolean(&v));
        desc.configurable = field(self, "configurable")?.map(|v| to_boolean(&v));
        desc.value = field(self, "value")?;
        desc.writable = field(self, "writable")?.map(|v| to_boolean(&v));
        for (name, slot) in [("get", &mut desc.get), ("set", &mut desc.set)] {
            let accessor = field(self, name)?;
            if let Some(f) = &accessor
                && !f.is_undefined()
                && !matches!(f, JsValue::Object(o) if o.is_callable())
            {
                return Err(self.throw_type_error(&format!("{name}ter must be a function: {f}")));
            }
            *slot = accessor;
        }
        if (desc.get.is_some() || desc.set.is_some())
            && (desc.value.is_some() || desc.writable.is_some())
        {
            return Err(self.throw_type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    pub(crate) fn from_property_descriptor(&self, desc: &PropertyDescriptor) -> JsObject {
        let obj = self.create_object();
        {
            let mut data = obj.borrow_mut();
            if desc.is_accessor_descriptor() {
                data.insert_value("get", desc.get.clone().unwrap_or(JsValue::Undefined));
                data.insert_value("set", desc.set.clone().unwrap_or(JsValue::Undefined));
            } else {
                data.insert_value("value", desc.value.clone().unwrap_or(JsValue::Undefined));
                data.insert_value("writable", JsValue::Boolean(desc.is_writable()));
            }
            data.insert_value("enumerable", JsValue::Boolean(desc.is_enumerable()));
            data.insert_value("configurable", JsValue::Boolean(desc.is_configurable()));
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::JsValue;

    fn eval(src: &str) -> JsValue {
        let mut interp = Interpreter::with_options(
            &crate::types::JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap()
    }

    #[test]
    fn keys_follow_property_order() {
        let v = eval("Object.keys({b: 1, a: 2, 1: 3, 0: 4}).join(',')");
        assert_eq!(v.to_string(), "0,1,b,a");
    }

    #[test]
    fn frozen_objects_ignore_writes() {
        let v = eval("var o = Object.freeze({a: 1}); o.a = 2; o.b = 3; [o.a, o.b, Object.isFrozen(o)].join()");
        assert_eq!(v.to_string(), "1,,true");
        let v = eval("var a = Object.freeze([1]); a[0] = 5; a[0]");
        assert_eq!(v.to_string(), "1");
    }

    #[test]
    fn define_property_respects_attributes() {
        let v = eval(
            "var o = {}; Object.defineProperty(o, 'x', {value: 1}); o.x = 2; \
             [o.x, Object.keys(o).length, JSON.stringify(Object.getOwnPropertyDescriptor(o, 'x'))].join('|')",
        );
        assert_eq!(
            v.to_string(),
            r#"1|0|{"value":1,"writable":false,"enumerable":false,"configurable":false}"#
        );
    }

    #[test]
    fn to_string_tags() {
        let v = eval("var ts = ({}).toString; [ts.call([]), ts.call(null), ({}).toString(), ts.call(function () {})].join()");
        assert_eq!(v.to_string(), "[object Array],[object Null],[object Object],[object Function]");
    }
}
