use super::{arg, method, relative_index};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{ErrorType, EvalError};
use crate::interpreter::helpers::to_boolean;
use crate::interpreter::types::{JsObject, PropertyKey};
use crate::types::{JsString, JsValue};

/// Reads the elements of `this` after ToObject.
fn elements(interp: &mut Interpreter, this: &JsValue) -> Result<Vec<JsValue>, EvalError> {
    let obj = interp.to_object(this)?;
    interp.array_like_to_vec(&JsValue::Object(obj))
}

/// Applies `f` to the elements of `this`: in place for arrays, read-modify-write through
/// `length` and indexed properties for other array-likes.
fn with_elements_mut<R>(
    interp: &mut Interpreter,
    this: &JsValue,
    f: impl FnOnce(&mut Vec<JsValue>) -> R,
) -> Result<R, EvalError> {
    let obj = interp.to_object(this)?;
    interp.check_mutable(&obj)?;
    if obj.borrow().frozen {
        return Err(interp.throw_type_error("Cannot modify a frozen array"));
    }
    if let Some(elems) = obj.borrow_mut().array_elements.as_mut() {
        return Ok(f(elems));
    }
    let target = JsValue::Object(obj);
    let mut elems = interp.array_like_to_vec(&target)?;
    let old_len = elems.len();
    let result = f(&mut elems);
    let new_len = elems.len();
    for (i, value) in elems.into_iter().enumerate() {
        interp.put(&target, index_key(i), value)?;
    }
    for i in new_len..old_len {
        interp.delete_property(&target, &index_key(i))?;
    }
    interp.put(&target, PropertyKey::from("length"), JsValue::Number(new_len as f64))?;
    Ok(result)
}

fn index_key(i: usize) -> PropertyKey {
    PropertyKey::from(JsString::from(i.to_string()))
}

/// Optional `fromIndex`-style argument resolved against `len`.
fn start_index(interp: &mut Interpreter, value: &JsValue, len: usize, default: usize) -> Result<usize, EvalError> {
    if value.is_undefined() {
        return Ok(default);
    }
    Ok(relative_index(interp.to_integer(value)?, len))
}

fn callback_arg(interp: &Interpreter, args: &[JsValue], name: &str) -> Result<JsValue, EvalError> {
    let callback = arg(args, 0);
    interp.require_callable(&callback, name)?;
    Ok(callback)
}

/// Stable merge sort whose comparison may fail.
fn merge_sort<F>(mut items: Vec<JsValue>, before: &mut F) -> Result<Vec<JsValue>, EvalError>
where
    F: FnMut(&JsValue, &JsValue) -> Result<bool, EvalError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, before)?;
    let right = merge_sort(right, before)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if before(l, r)? {
            merged.extend(left.next());
        } else {
            merged.extend(right.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn flatten_into(out: &mut Vec<JsValue>, values: Vec<JsValue>, depth: f64) {
    for value in values {
        match &value {
            JsValue::Object(obj) if depth >= 1.0 && obj.is_array() => {
                let inner = obj.array_elements().unwrap_or_default();
                flatten_into(out, inner, depth - 1.0);
            }
            _ => out.push(value),
        }
    }
}

impl Interpreter {
    pub(crate) fn setup_array(&mut self) {
        let proto = self.realm.array_prototype.clone();
        let ctor = self.install_constructor("Array", 1, &proto, |interp, this, args| {
            let elems = match args {
                [JsValue::Number(n)] => {
                    if *n < 0.0 || n.fract() != 0.0 || *n > u32::MAX as f64 {
                        return Err(interp.throw_error(ErrorType::RangeError, "Invalid array length"));
                    }
                    vec![JsValue::Undefined; *n as usize]
                }
                _ => args.to_vec(),
            };
            match interp.constructing_this(this) {
                Some(instance) => {
                    let mut data = instance.borrow_mut();
                    data.class_name = "Array".to_string();
                    data.array_elements = Some(elems);
                    drop(data);
                    Ok(JsValue::Object(instance))
                }
                None => Ok(interp.create_array(elems)),
            }
        });
        self.install_methods(
            &ctor,
            vec![
                method("isArray", 1, |_, _, args| {
                    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Object(o) if o.is_array())))
                }),
                method("of", 0, |interp, _, args| Ok(interp.create_array(args.to_vec()))),
                method("from", 1, |interp, _, args| {
                    let source = arg(args, 0);
                    let iterable = match &source {
                        JsValue::String(_) => true,
                        JsValue::Object(o) => {
                            let data = o.borrow();
                            data.array_elements.is_some()
                                || data.map_data.is_some()
                                || data.set_data.is_some()
                        }
                        JsValue::Undefined | JsValue::Null => {
                            return Err(interp.throw_type_error(&format!(
                                "{source} is not iterable"
                            )));
                        }
                        _ => false,
                    };
                    let values = if iterable {
                        interp.iterate_to_vec(&source, "Array.from")?
                    } else {
                        interp.array_like_to_vec(&source)?
                    };
                    let map_fn = arg(args, 1);
                    if map_fn.is_undefined() {
                        return Ok(interp.create_array(values));
                    }
                    interp.require_callable(&map_fn, "Array.from")?;
                    let this_arg = arg(args, 2);
                    let mut mapped = Vec::with_capacity(values.len());
                    for (i, value) in values.into_iter().enumerate() {
                        mapped.push(interp.call_callback(&map_fn, &this_arg, &[value, JsValue::Number(i as f64)])?);
                    }
                    Ok(interp.create_array(mapped))
                }),
            ],
        );
        self.setup_array_mutators(&proto);
        self.setup_array_iteration(&proto);
        self.setup_array_accessors(&proto);
    }

    fn setup_array_mutators(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("push", 1, |interp, this, args| {
                    let len = with_elements_mut(interp, this, |elems| {
                        elems.extend_from_slice(args);
                        elems.len()
                    })?;
                    Ok(JsValue::Number(len as f64))
                }),
                method("pop", 0, |interp, this, _| {
                    let last = with_elements_mut(interp, this, Vec::pop)?;
                    Ok(last.unwrap_or(JsValue::Undefined))
                }),
                method("shift", 0, |interp, this, _| {
                    let first = with_elements_mut(interp, this, |elems| {
                        (!elems.is_empty()).then(|| elems.remove(0))
                    })?;
                    Ok(first.unwrap_or(JsValue::Undefined))
                }),
                method("unshift", 1, |interp, this, args| {
                    let len = with_elements_mut(interp, this, |elems| {
                        elems.splice(0..0, args.iter().cloned());
                        elems.len()
                    })?;
                    Ok(JsValue::Number(len as f64))
                }),
                method("splice", 2, |interp, this, args| {
                    let len = elements(interp, this)?.len();
                    let start = start_index(interp, &arg(args, 0), len, 0)?;
                    let delete_count = match args.len() {
                        0 => 0,
                        1 => len - start,
                        _ => {
                            let n = interp.to_integer(&args[1])?;
                            n.clamp(0.0, (len - start) as f64) as usize
                        }
                    };
                    let items = args.get(2..).unwrap_or_default().to_vec();
                    let removed = with_elements_mut(interp, this, |elems| {
                        let end = (start + delete_count).min(elems.len());
                        let start = start.min(end);
                        elems.splice(start..end, items).collect::<Vec<_>>()
                    })?;
                    Ok(interp.create_array(removed))
                }),
                method("reverse", 0, |interp, this, _| {
                    with_elements_mut(interp, this, |elems| elems.reverse())?;
                    Ok(this.clone())
                }),
                method("fill", 1, |interp, this, args| {
                    let len = elements(interp, this)?.len();
                    let start = start_index(interp, &arg(args, 1), len, 0)?;
                    let end = start_index(interp, &arg(args, 2), len, len)?;
                    let value = arg(args, 0);
                    with_elements_mut(interp, this, |elems| {
                        for slot in elems.iter_mut().take(end).skip(start) {
                            *slot = value.clone();
                        }
                    })?;
                    Ok(this.clone())
                }),
                method("copyWithin", 2, |interp, this, args| {
                    let len = elements(interp, this)?.len();
                    let target = start_index(interp, &arg(args, 0), len, 0)?;
                    let start = start_index(interp, &arg(args, 1), len, 0)?;
                    let end = start_index(interp, &arg(args, 2), len, len)?;
                    with_elements_mut(interp, this, |elems| {
                        let count = end.saturating_sub(start).min(len - target);
                        let chunk: Vec<JsValue> = elems[start..start + count].to_vec();
                        for (i, value) in chunk.into_iter().enumerate() {
                            elems[target + i] = value;
                        }
                    })?;
                    Ok(this.clone())
                }),
                method("sort", 1, |interp, this, args| {
                    let compare = arg(args, 0);
                    if !compare.is_undefined() {
                        interp.require_callable(&compare, "Array.prototype.sort")?;
                    }
                    let values = elements(interp, this)?;
                    let sorted = interp.sort_values(values, &compare)?;
                    with_elements_mut(interp, this, |elems| *elems = sorted)?;
                    Ok(this.clone())
                }),
            ],
        );
    }

    fn setup_array_iteration(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("forEach", 1, |interp, this, args| {
                    let callback = callback_arg(interp, args, "Array.prototype.forEach")?;
                    let this_arg = arg(args, 1);
                    for (i, value) in elements(interp, this)?.into_iter().enumerate() {
                        interp.call_callback(&callback, &this_arg, &[value, JsValue::Number(i as f64), this.clone()])?;
                    }
                    Ok(JsValue::Undefined)
                }),
                method("map", 1, |interp, this, args| {
                    let callback = callback_arg(interp, args, "Array.prototype.map")?;
                    let this_arg = arg(args, 1);
                    let values = elements(interp, this)?;
                    let mut mapped = Vec::with_capacity(values.len());
                    for (i, value) in values.into_iter().enumerate() {
                        mapped.push(interp.call_callback(
                            &callback,
                            &this_arg,
                            &[value, JsValue::Number(i as f64), this.clone()],
                        )?);
                    }
                    Ok(interp.create_array(mapped))
                }),
                method("filter", 1, |interp, this, args| {
                    let callback = callback_arg(interp, args, "Array.prototype.filter")?;
                    let this_arg = arg(args, 1);
                    let mut kept = Vec::new();
                    for (i, value) in elements(interp, this)?.into_iter().enumerate() {
                        let keep = interp.call_callback(
                            &callback,
                            &this_arg,
                            &[value.clone(), JsValue::Number(i as f64), this.clone()],
                        )?;
                        if to_boolean(&keep) {
                            kept.push(value);
                        }
                    }
                    Ok(interp.create_array(kept))
                }),
                method("some", 1, |interp, this, args| {
                    let found = interp.array_find(this, args, false, "Array.prototype.some")?;
                    Ok(JsValue::Boolean(found.is_some()))
                }),
                method("every", 1, |interp, this, args| {
                    let callback = callback_arg(interp, args, "Array.prototype.every")?;
                    let this_arg = arg(args, 1);
                    for (i, value) in elements(interp, this)?.into_iter().enumerate() {
                        let ok = interp.call_callback(
                            &callback,
                            &this_arg,
                            &[value, JsValue::Number(i as f64), this.clone()],
                        )?;
                        if !to_boolean(&ok) {
                            return Ok(JsValue::Boolean(false));
                        }
                    }
                    Ok(JsValue::Boolean(true))
                }),
                method("find", 1, |interp, this, args| {
                    let found = interp.array_find(this, args, false, "Array.prototype.find")?;
                    Ok(found.map_or(JsValue::Undefined, |(_, v)| v))
                }),
                method("findIndex", 1, |interp, this, args| {
                    let found = interp.array_find(this, args, false, "Array.prototype.findIndex")?;
                    Ok(JsValue::Number(found.map_or(-1.0, |(i, _)| i as f64)))
                }),
                method("findLast", 1, |interp, this, args| {
                    let found = interp.array_find(this, args, true, "Array.prototype.findLast")?;
                    Ok(found.map_or(JsValue::Undefined, |(_, v)| v))
                }),
                method("findLastIndex", 1, |interp, this, args| {
                    let found = interp.array_find(this, args, true, "Array.prototype.findLastIndex")?;
                    Ok(JsValue::Number(found.map_or(-1.0, |(i, _)| i as f64)))
                }),
                method("reduce", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    interp.array_reduce(this, args, values.into_iter().enumerate().collect())
                }),
                method("reduceRight", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    interp.array_reduce(this, args, values.into_iter().enumerate().rev().collect())
                }),
                method("flatMap", 1, |interp, this, args| {
                    let callback = callback_arg(interp, args, "Array.prototype.flatMap")?;
                    let this_arg = arg(args, 1);
                    let mut mapped = Vec::new();
                    for (i, value) in elements(interp, this)?.into_iter().enumerate() {
                        mapped.push(interp.call_callback(
                            &callback,
                            &this_arg,
                            &[value, JsValue::Number(i as f64), this.clone()],
                        )?);
                    }
                    let mut out = Vec::with_capacity(mapped.len());
                    flatten_into(&mut out, mapped, 1.0);
                    Ok(interp.create_array(out))
                }),
            ],
        );
    }

    fn setup_array_accessors(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("at", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    let n = interp.to_integer(&arg(args, 0))?;
                    let idx = if n < 0.0 { values.len() as f64 + n } else { n };
                    if idx < 0.0 {
                        return Ok(JsValue::Undefined);
                    }
                    Ok(values.get(idx as usize).cloned().unwrap_or(JsValue::Undefined))
                }),
                method("concat", 1, |interp, this, args| {
                    let mut out = elements(interp, this)?;
                    for item in args {
                        match item {
                            JsValue::Object(o) if o.is_array() => {
                                out.extend(o.array_elements().unwrap_or_default());
                            }
                            other => out.push(other.clone()),
                        }
                    }
                    Ok(interp.create_array(out))
                }),
                method("slice", 2, |interp, this, args| {
                    let values = elements(interp, this)?;
                    let len = values.len();
                    let start = start_index(interp, &arg(args, 0), len, 0)?;
                    let end = start_index(interp, &arg(args, 1), len, len)?;
                    let slice = values.get(start..end.max(start)).unwrap_or_default().to_vec();
                    Ok(interp.create_array(slice))
                }),
                method("indexOf", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    let from = start_index(interp, &arg(args, 1), values.len(), 0)?;
                    let needle = arg(args, 0);
                    let found = values
                        .iter()
                        .enumerate()
                        .skip(from)
                        .find(|(_, v)| v.strict_equals(&needle));
                    Ok(JsValue::Number(found.map_or(-1.0, |(i, _)| i as f64)))
                }),
                method("lastIndexOf", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    if values.is_empty() {
                        return Ok(JsValue::Number(-1.0));
                    }
                    let last = values.len() - 1;
                    let from = match args.get(1) {
                        None => last,
                        Some(v) => {
                            let n = interp.to_integer(v)?;
                            if n < 0.0 {
                                let idx = values.len() as f64 + n;
                                if idx < 0.0 {
                                    return Ok(JsValue::Number(-1.0));
                                }
                                idx as usize
                            } else {
                                (n as usize).min(last)
                            }
                        }
                    };
                    let needle = arg(args, 0);
                    let found = (0..=from).rev().find(|&i| values[i].strict_equals(&needle));
                    Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
                }),
                method("includes", 1, |interp, this, args| {
                    let values = elements(interp, this)?;
                    let from = start_index(interp, &arg(args, 1), values.len(), 0)?;
                    let needle = arg(args, 0);
                    Ok(JsValue::Boolean(
                        values.iter().skip(from).any(|v| v.same_value_zero(&needle)),
                    ))
                }),
                method("join", 1, |interp, this, args| {
                    interp.array_join(this, &arg(args, 0)).map(JsValue::String)
                }),
                method("toString", 0, |interp, this, _| {
                    let join = interp.get_named(this, "join")?;
                    if matches!(&join, JsValue::Object(f) if f.is_callable()) {
                        return interp.call_function(&join, this, &[]);
                    }
                    interp.object_to_string(this).map(JsValue::from)
                }),
                method("toLocaleString", 0, |interp, this, _| {
                    interp.array_join(this, &JsValue::Undefined).map(JsValue::String)
                }),
                method("flat", 0, |interp, this, args| {
                    let depth = match arg(args, 0) {
                        JsValue::Undefined => 1.0,
                        d => interp.to_integer(&d)?,
                    };
                    let mut out = Vec::new();
                    flatten_into(&mut out, elements(interp, this)?, depth);
                    Ok(interp.create_array(out))
                }),
                method("keys", 0, |interp, this, _| {
                    let len = elements(interp, this)?.len();
                    Ok(interp.create_array((0..len).map(|i| JsValue::Number(i as f64)).collect()))
                }),
                method("values", 0, |interp, this, _| {
                    let values = elements(interp, this)?;
                    Ok(interp.create_array(values))
                }),
                method("entries", 0, |interp, this, _| {
                    let values = elements(interp, this)?;
                    let pairs = values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| interp.create_array(vec![JsValue::Number(i as f64), v]))
                        .collect();
                    Ok(interp.create_array(pairs))
                }),
                method("toReversed", 0, |interp, this, _| {
                    let mut values = elements(interp, this)?;
                    values.reverse();
                    Ok(interp.create_array(values))
                }),
                method("toSorted", 1, |interp, this, args| {
                    let compare = arg(args, 0);
                    if !compare.is_undefined() {
                        interp.require_callable(&compare, "Array.prototype.toSorted")?;
                    }
                    let values = elements(interp, this)?;
                    let sorted = interp.sort_values(values, &compare)?;
                    Ok(interp.create_array(sorted))
                }),
                method("toSpliced", 2, |interp, this, args| {
                    let mut values = elements(interp, this)?;
                    let len = values.len();
                    let start = start_index(interp, &arg(args, 0), len, 0)?;
                    let delete_count = match args.len() {
                        0 => 0,
                        1 => len - start,
                        _ => interp.to_integer(&args[1])?.clamp(0.0, (len - start) as f64) as usize,
                    };
                    let items = args.get(2..).unwrap_or_default().iter().cloned();
                    values.splice(start..start + delete_count, items);
                    Ok(interp.create_array(values))
                }),
                method("with", 2, |interp, this, args| {
                    let mut values = elements(interp, this)?;
                    let n = interp.to_integer(&arg(args, 0))?;
                    let idx = if n < 0.0 { values.len() as f64 + n } else { n };
                    if idx < 0.0 || idx >= values.len() as f64 {
                        return Err(interp.throw_error(ErrorType::RangeError, "Invalid index"));
                    }
                    values[idx as usize] = arg(args, 1);
                    Ok(interp.create_array(values))
                }),
            ],
        );
    }

    /// Shared walk of `find`, `findIndex`, `findLast`, `findLastIndex` and `some`.
    fn array_find(
        &mut self,
        this: &JsValue,
        args: &[JsValue],
        from_end: bool,
        name: &str,
    ) -> Result<Option<(usize, JsValue)>, EvalError> {
        let callback = callback_arg(self, args, name)?;
        let this_arg = arg(args, 1);
        let mut indexed: Vec<(usize, JsValue)> = elements(self, this)?.into_iter().enumerate().collect();
        if from_end {
            indexed.reverse();
        }
        for (i, value) in indexed {
            let hit = self.call_callback(
                &callback,
                &this_arg,
                &[value.clone(), JsValue::Number(i as f64), this.clone()],
            )?;
            if to_boolean(&hit) {
                return Ok(Some((i, value)));
            }
        }
        Ok(None)
    }

    fn array_reduce(
        &mut self,
        this: &JsValue,
        args: &[JsValue],
        indexed: Vec<(usize, JsValue)>,
    ) -> Result<JsValue, EvalError> {
        let callback = callback_arg(self, args, "Array.prototype.reduce")?;
        let mut items = indexed.into_iter();
        let mut acc = match args.get(1) {
            Some(initial) => initial.clone(),
            None => match items.next() {
                Some((_, first)) => first,
                None => {
                    return Err(self.throw_type_error("Reduce of empty array with no initial value"));
                }
            },
        };
        for (i, value) in items {
            acc = self.call_callback(
                &callback,
                &JsValue::Undefined,
                &[acc, value, JsValue::Number(i as f64), this.clone()],
            )?;
        }
        Ok(acc)
    }

    pub(crate) fn array_join(&mut self, this: &JsValue, separator: &JsValue) -> Result<JsString, EvalError> {
        let separator = match separator {
            JsValue::Undefined => JsString::from(","),
            other => self.to_js_string(other)?,
        };
        let addr = match this {
            JsValue::Object(o) => Some(o.addr()),
            _ => None,
        };
        if let Some(addr) = addr {
            if self.join_stack.contains(&addr) {
                return Ok(JsString::default());
            }
            self.join_stack.push(addr);
        }
        let result = self.join_elements(this, &separator);
        if addr.is_some() {
            self.join_stack.pop();
        }
        result
    }

    fn join_elements(&mut self, this: &JsValue, separator: &JsString) -> Result<JsString, EvalError> {
        let values = elements(self, this)?;
        let mut out = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                out.push_str(separator.as_str());
            }
            if !value.is_nullish() {
                out.push_str(self.to_js_string(value)?.as_str());
            }
        }
        Ok(JsString::from(out))
    }

    /// Sorts with `compare`, or by string order when it is undefined. `undefined` elements go
    /// last without being compared.
    pub(crate) fn sort_values(&mut self, values: Vec<JsValue>, compare: &JsValue) -> Result<Vec<JsValue>, EvalError> {
        let (defined, undefined): (Vec<JsValue>, Vec<JsValue>) =
            values.into_iter().partition(|v| !v.is_undefined());
        let mut sorted = if compare.is_undefined() {
            let mut keyed = Vec::with_capacity(defined.len());
            for value in defined {
                keyed.push((self.to_js_string(&value)?, value));
            }
            keyed.sort_by(|(a, _), (b, _)| a.as_str().encode_utf16().cmp(b.as_str().encode_utf16()));
            keyed.into_iter().map(|(_, v)| v).collect()
        } else {
            merge_sort(defined, &mut |a: &JsValue, b: &JsValue| {
                let order = self.call_callback(compare, &JsValue::Undefined, &[a.clone(), b.clone()])?;
                let n = self.to_number(&order)?;
                Ok(!(n > 0.0))
            })?
        };
        sorted.extend(undefined);
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::{JsObject, JsValue};
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> String {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        let value: JsValue = interp.evaluate(src).unwrap();
        value.to_string()
    }

    #[test]
    fn mutators_update_in_place() {
        assert_eq!(eval("var a = [1, 2]; a.push(3, 4); a.shift(); a.join('-')"), "2-3-4");
        assert_eq!(eval("var a = [1, 2, 3, 4]; var r = a.splice(1, 2, 'x'); a + '|' + r"), "1,x,4|2,3");
        assert_eq!(eval("[1, 2, 3].reverse().join()"), "3,2,1");
        assert_eq!(eval("[1, 2, 3, 4, 5].copyWithin(0, 3).join()"), "4,5,3,4,5");
    }

    #[test]
    fn sort_is_stable_and_puts_undefined_last() {
        assert_eq!(eval("[10, 9, 1, undefined, 2].sort().join()"), "1,10,2,9,");
        assert_eq!(
            eval("[{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}].sort((x, y) => x.k - y.k).map(o => o.v).join('')"),
            "bac"
        );
    }

    #[test]
    fn iteration_methods() {
        assert_eq!(eval("[1, 2, 3].map(x => x * 2).filter(x => x > 2).join()"), "4,6");
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval("['a', 'b'].reduceRight((a, b) => a + b, '')"), "ba");
        assert_eq!(eval("[5, 12, 8].findLastIndex(x => x > 6)"), "2");
        assert_eq!(eval("[[1, [2]], 3].flat(Infinity).join()"), "1,2,3");
    }

    #[test]
    fn cyclic_join_is_empty() {
        assert_eq!(eval("var a = [1]; a.push(a); a.join()"), "1,");
    }

    #[test]
    fn array_likes_and_from() {
        assert_eq!(eval("Array.from({length: 2, 0: 'x', 1: 'y'}).join()"), "x,y");
        assert_eq!(eval("Array.from('ab', c => c + c).join()"), "aa,bb");
        assert_eq!(eval("new Array(3).length"), "3");
        assert_eq!(eval("Array.isArray(Array.of(1))"), "true");
    }
}
