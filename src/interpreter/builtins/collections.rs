//! `Map`, `Set`, `WeakMap` and `WeakSet`. Entries live in insertion order with tombstones, so
//! `forEach` sees entries added while it runs.

use super::{Method, arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::EvalError;
use crate::interpreter::types::{JsObject, PropertyDescriptor};
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol};

/// `-0` keys are stored as `+0`.
fn normalize_key(key: JsValue) -> JsValue {
    match key {
        JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
        other => other,
    }
}

fn position_in_map(entries: &[Option<(JsValue, JsValue)>], key: &JsValue) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.as_ref().is_some_and(|(k, _)| k.same_value_zero(key)))
}

fn position_in_set(values: &[Option<JsValue>], key: &JsValue) -> Option<usize> {
    values
        .iter()
        .position(|v| v.as_ref().is_some_and(|v| v.same_value_zero(key)))
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Map,
    Set,
    WeakMap,
    WeakSet,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Map => "Map",
            Kind::Set => "Set",
            Kind::WeakMap => "WeakMap",
            Kind::WeakSet => "WeakSet",
        }
    }

    fn keyed(self) -> bool {
        matches!(self, Kind::Map | Kind::WeakMap)
    }

    fn weak(self) -> bool {
        matches!(self, Kind::WeakMap | Kind::WeakSet)
    }
}

impl Interpreter {
    /// The receiver of a collection method, checked against `kind`.
    fn this_collection(&self, this: &JsValue, kind: Kind, method: &str) -> Result<JsObject, EvalError> {
        if let JsValue::Object(obj) = this {
            let data = obj.borrow();
            let matches = data.class_name == kind.name()
                && if kind.keyed() { data.map_data.is_some() } else { data.set_data.is_some() };
            if matches {
                return Ok(obj.clone());
            }
        }
        Err(self.throw_type_error(&format!(
            "Method {}.prototype.{method} called on incompatible receiver {this}",
            kind.name()
        )))
    }

    fn check_weak_key(&self, kind: Kind, key: &JsValue) -> Result<(), EvalError> {
        if kind.weak() && !key.is_object() {
            let what = if kind.keyed() { "weak map key" } else { "value in weak set" };
            return Err(self.throw_type_error(&format!("Invalid value used as {what}")));
        }
        Ok(())
    }

    fn map_set(&self, obj: &JsObject, key: JsValue, value: JsValue) {
        let key = normalize_key(key);
        let mut data = obj.borrow_mut();
        let Some(entries) = data.map_data.as_mut() else {
            return;
        };
        match position_in_map(entries, &key) {
            Some(i) => entries[i] = Some((key, value)),
            None => entries.push(Some((key, value))),
        }
    }

    fn set_add(&self, obj: &JsObject, value: JsValue) {
        let value = normalize_key(value);
        let mut data = obj.borrow_mut();
        if let Some(values) = data.set_data.as_mut()
            && position_in_set(values, &value).is_none()
        {
            values.push(Some(value));
        }
    }

    fn setup_collection(&mut self, kind: Kind, proto: &JsObject) {
        self.install_constructor(kind.name(), 0, proto, move |interp, this, args| {
            let Some(instance) = interp.constructing_this(this) else {
                return Err(interp.throw_type_error(&format!(
                    "Constructor {} requires 'new'",
                    kind.name()
                )));
            };
            {
                let mut data = instance.borrow_mut();
                data.class_name = kind.name().to_string();
                if kind.keyed() {
                    data.map_data = Some(Vec::new());
                } else {
                    data.set_data = Some(Vec::new());
                }
            }
            let source = arg(args, 0);
            if source.is_nullish() {
                return Ok(JsValue::Object(instance));
            }
            let items = interp.iterate_to_vec(&source, kind.name())?;
            for item in items {
                interp.budget.charge()?;
                if kind.keyed() {
                    if !item.is_object() {
                        return Err(interp.throw_type_error(&format!(
                            "Iterator value {item} is not an entry object"
                        )));
                    }
                    let key = interp.get_named(&item, "0")?;
                    let value = interp.get_named(&item, "1")?;
                    interp.check_weak_key(kind, &key)?;
                    interp.map_set(&instance, key, value);
                } else {
                    interp.check_weak_key(kind, &item)?;
                    interp.set_add(&instance, item);
                }
            }
            Ok(JsValue::Object(instance))
        });

        let mut table: Vec<Method> = vec![
            method("has", 1, move |interp, this, args| {
                let obj = interp.this_collection(this, kind, "has")?;
                let key = arg(args, 0);
                let data = obj.borrow();
                let found = match (&data.map_data, &data.set_data) {
                    (Some(entries), _) => position_in_map(entries, &key).is_some(),
                    (_, Some(values)) => position_in_set(values, &key).is_some(),
                    _ => false,
                };
                Ok(JsValue::Boolean(found))
            }),
            method("delete", 1, move |interp, this, args| {
                let obj = interp.this_collection(this, kind, "delete")?;
                let key = arg(args, 0);
                let mut data = obj.borrow_mut();
                let removed = if let Some(entries) = data.map_data.as_mut() {
                    position_in_map(entries, &key).map(|i| entries[i] = None).is_some()
                } else if let Some(values) = data.set_data.as_mut() {
                    position_in_set(values, &key).map(|i| values[i] = None).is_some()
                } else {
                    false
                };
                Ok(JsValue::Boolean(removed))
            }),
        ];
        if kind.keyed() {
            table.extend([
                method("get", 1, move |interp, this, args| {
                    let obj = interp.this_collection(this, kind, "get")?;
                    let key = arg(args, 0);
                    let data = obj.borrow();
                    let value = data.map_data.as_ref().and_then(|entries| {
                        position_in_map(entries, &key).and_then(|i| entries[i].as_ref().map(|(_, v)| v.clone()))
                    });
                    Ok(value.unwrap_or(JsValue::Undefined))
                }),
                method("set", 2, move |interp, this, args| {
                    let obj = interp.this_collection(this, kind, "set")?;
                    let key = arg(args, 0);
                    interp.check_weak_key(kind, &key)?;
                    interp.map_set(&obj, key, arg(args, 1));
                    Ok(this.clone())
                }),
            ]);
        } else {
            table.push(method("add", 1, move |interp, this, args| {
                let obj = interp.this_collection(this, kind, "add")?;
                let value = arg(args, 0);
                interp.check_weak_key(kind, &value)?;
                interp.set_add(&obj, value);
                Ok(this.clone())
            }));
        }
        if !kind.weak() {
            table.extend([
                method("clear", 0, move |interp, this, _| {
                    let obj = interp.this_collection(this, kind, "clear")?;
                    let mut data = obj.borrow_mut();
                    if let Some(entries) = data.map_data.as_mut() {
                        entries.clear();
                    }
                    if let Some(values) = data.set_data.as_mut() {
                        values.clear();
                    }
                    Ok(JsValue::Undefined)
                }),
                method("forEach", 1, move |interp, this, args| {
                    let obj = interp.this_collection(this, kind, "forEach")?;
                    let callback = arg(args, 0);
                    interp.require_callable(&callback, "forEach")?;
                    let this_arg = arg(args, 1);
                    let mut i = 0;
                    loop {
                        let entry = {
                            let data = obj.borrow();
                            match (&data.map_data, &data.set_data) {
                                (Some(entries), _) if i < entries.len() => Some(entries[i].clone()),
                                (_, Some(values)) if i < values.len() => {
                                    Some(values[i].clone().map(|v| (v.clone(), v)))
                                }
                                _ => None,
                            }
                        };
                        let Some(entry) = entry else {
                            break;
                        };
                        if let Some((key, value)) = entry {
                            interp.call_callback(&callback, &this_arg, &[value, key, this.clone()])?;
                        }
                        i += 1;
                    }
                    Ok(JsValue::Undefined)
                }),
                method("keys", 0, move |interp, this, _| interp.collection_list(this, kind, Listing::Keys)),
                method("values", 0, move |interp, this, _| {
                    interp.collection_list(this, kind, Listing::Values)
                }),
                method("entries", 0, move |interp, this, _| {
                    interp.collection_list(this, kind, Listing::Entries)
                }),
            ]);
        }
        self.install_methods(proto, table);
        if !kind.weak() {
            self.install_getter(proto, "size", move |interp, this, _| {
                let obj = interp.this_collection(this, kind, "size")?;
                let data = obj.borrow();
                let size = match (&data.map_data, &data.set_data) {
                    (Some(entries), _) => entries.iter().flatten().count(),
                    (_, Some(values)) => values.iter().flatten().count(),
                    _ => 0,
                };
                Ok(JsValue::Number(size as f64))
            });
        }
        proto.borrow_mut().insert_symbol(
            JsSymbol::well_known(WellKnownSymbol::ToStringTag),
            PropertyDescriptor::data(JsValue::String(JsString::from(kind.name())), false, false, true),
        );
    }

    /// Snapshot of the live entries as an array.
    fn collection_list(&mut self, this: &JsValue, kind: Kind, listing: Listing) -> Result<JsValue, EvalError> {
        let obj = self.this_collection(this, kind, listing.method())?;
        let pairs: Vec<(JsValue, JsValue)> = {
            let data = obj.borrow();
            match (&data.map_data, &data.set_data) {
                (Some(entries), _) => entries.iter().flatten().cloned().collect(),
                (_, Some(values)) => values.iter().flatten().map(|v| (v.clone(), v.clone())).collect(),
                _ => Vec::new(),
            }
        };
        let values = pairs
            .into_iter()
            .map(|(k, v)| match listing {
                Listing::Keys => k,
                Listing::Values => v,
                Listing::Entries => self.create_array(vec![k, v]),
            })
            .collect();
        Ok(self.create_array(values))
    }

    pub(crate) fn setup_collections(&mut self) {
        for (kind, proto) in [
            (Kind::Map, self.realm.map_prototype.clone()),
            (Kind::Set, self.realm.set_prototype.clone()),
            (Kind::WeakMap, self.realm.weakmap_prototype.clone()),
            (Kind::WeakSet, self.realm.weakset_prototype.clone()),
        ] {
            self.setup_collection(kind, &proto);
        }
    }
}

#[derive(Clone, Copy)]
enum Listing {
    Keys,
    Values,
    Entries,
}

impl Listing {
    fn method(self) -> &'static str {
        match self {
            Listing::Keys => "keys",
            Listing::Values => "values",
            Listing::Entries => "entries",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::JsObject;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> String {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap().to_string()
    }

    #[test]
    fn maps_keep_insertion_order() {
        assert_eq!(
            eval("var m = new Map([['b', 1], ['a', 2]]); m.set('c', 3).set('b', 4); m.keys().join() + '|' + m.values().join() + '|' + m.size"),
            "b,a,c|4,2,3|3"
        );
        assert_eq!(eval("var m = new Map(); m.set(NaN, 1); m.set(-0, 2); m.get(NaN) + m.get(0)"), "3");
        assert_eq!(eval("var m = new Map([[1, 'x']]); m.delete(1) + ',' + m.delete(1) + ',' + m.size"), "true,false,0");
    }

    #[test]
    fn sets_deduplicate() {
        assert_eq!(eval("var s = new Set([1, 2, 2, '2']); s.size + ':' + s.values().join()"), "3:1,2,2");
        assert_eq!(eval("[...new Set('aab')].join('')"), "ab");
        assert_eq!(eval("var s = new Set([1]); s.entries()[0].join('=')"), "1=1");
    }

    #[test]
    fn for_each_sees_additions() {
        assert_eq!(
            eval("var s = new Set([1]); var seen = []; s.forEach(v => { seen.push(v); if (v < 3) s.add(v + 1) }); seen.join()"),
            "1,2,3"
        );
    }

    #[test]
    fn weak_collections_require_objects() {
        assert_eq!(eval("var k = {}; var w = new WeakMap(); w.set(k, 1); w.get(k) + ',' + w.has({})"), "1,false");
        assert_eq!(eval("try { new WeakSet().add(1) } catch (e) { e.message }"), "Invalid value used as value in weak set");
        assert_eq!(eval("try { Map() } catch (e) { e.name }"), "TypeError");
        assert_eq!(eval("String(new Map())"), "[object Map]");
    }
}
