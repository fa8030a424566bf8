use super::error::{ErrorType, EvalError, InterruptError, Message};
use super::types::{JsFunction, JsObject, ObjectData, PropertyDescriptor, PropertyKey};
use super::Interpreter;
use crate::ast::{BinaryOperator, Position};
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol, number_ops};

pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = |prefix_lower: &str, prefix_upper: &str, radix: u32| {
        trimmed
            .strip_prefix(prefix_lower)
            .or_else(|| trimmed.strip_prefix(prefix_upper))
            .map(|digits| {
                if digits.is_empty() {
                    return f64::NAN;
                }
                digits.chars().try_fold(0.0_f64, |acc, c| {
                    c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
                })
                .unwrap_or(f64::NAN)
            })
    };
    if let Some(n) = radix("0x", "0X", 16)
        .or_else(|| radix("0o", "0O", 8))
        .or_else(|| radix("0b", "0B", 2))
    {
        return n;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub(crate) fn typeof_value(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::Object(o) if o.is_callable() => "function",
        JsValue::Object(_) => "object",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hint {
    Default,
    Number,
    String,
}

impl Hint {
    fn as_str(self) -> &'static str {
        match self {
            Hint::Default => "default",
            Hint::Number => "number",
            Hint::String => "string",
        }
    }
}

impl Interpreter {
    /// Charges one guard step and records `pos` as the last executed node.
    pub(crate) fn tick(&mut self, pos: Option<Position>) -> Result<(), EvalError> {
        self.budget.charge()?;
        if pos.is_some() {
            self.last_position = pos;
        }
        Ok(())
    }

    pub(crate) fn create_error(&self, kind: &str, message: &str) -> JsObject {
        let proto = self.realm.error_prototype_for(kind);
        let mut data = ObjectData::with_proto(Some(proto));
        data.class_name = "Error".to_string();
        data.insert_builtin("message", JsValue::from(message));
        JsObject::from_data(data)
    }

    pub(crate) fn throw_error(&self, kind: ErrorType, message: &str) -> EvalError {
        EvalError::Throw(JsValue::Object(self.create_error(kind.name(), message)))
    }

    pub(crate) fn throw_type_error(&self, message: &str) -> EvalError {
        self.throw_error(ErrorType::TypeError, message)
    }

    /// Raises a table message at `pos`: an interrupt or a catchable guest error.
    pub(crate) fn raise(&self, message: Message, arg: &str, pos: Option<Position>) -> EvalError {
        if message.interrupts() {
            return EvalError::Interrupt(InterruptError::new(message, arg, pos));
        }
        self.throw_error(message.error_type(), &message.render(arg, pos))
    }

    pub fn create_object(&self) -> JsObject {
        JsObject::from_data(ObjectData::with_proto(Some(self.realm.object_prototype.clone())))
    }

    pub fn create_array(&self, values: Vec<JsValue>) -> JsValue {
        let mut data = ObjectData::with_proto(Some(self.realm.array_prototype.clone()));
        data.class_name = "Array".to_string();
        data.array_elements = Some(values);
        JsValue::Object(JsObject::from_data(data))
    }

    pub(crate) fn create_arguments(&self, values: &[JsValue]) -> JsObject {
        let mut data = ObjectData::with_proto(Some(self.realm.object_prototype.clone()));
        data.class_name = "Arguments".to_string();
        data.array_elements = Some(values.to_vec());
        JsObject::from_data(data)
    }

    /// Wraps `func` in a function object with `name`, `length` and, for constructors built
    /// from source, a fresh `prototype`.
    pub fn create_function(&self, func: JsFunction) -> JsObject {
        let needs_prototype = matches!(&func, JsFunction::User(f) if !f.template.is_arrow);
        let name = func.name();
        let length = func.length();
        let mut data = ObjectData::with_proto(Some(self.realm.function_prototype.clone()));
        data.class_name = "Function".to_string();
        data.callable = Some(func);
        data.insert_property(
            "length".into(),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
        );
        data.insert_property(
            "name".into(),
            PropertyDescriptor::data(JsValue::from(name), false, false, true),
        );
        let obj = JsObject::from_data(data);
        if needs_prototype {
            let proto = self.create_object();
            proto
                .borrow_mut()
                .insert_builtin("constructor", JsValue::Object(obj.clone()));
            obj.borrow_mut().insert_property(
                "prototype".into(),
                PropertyDescriptor::data(JsValue::Object(proto), true, false, false),
            );
        }
        obj
    }

    pub(crate) fn hide_global(&self, value: JsValue) -> JsValue {
        match &value {
            JsValue::Object(o) if o.ptr_eq(&self.super_scope.borrow().data) => JsValue::Undefined,
            _ => value,
        }
    }

    pub(crate) fn to_primitive(&mut self, val: &JsValue, hint: Hint) -> Result<JsValue, EvalError> {
        let JsValue::Object(obj) = val else {
            return Ok(val.clone());
        };
        let to_prim = self.get(
            val,
            &PropertyKey::Symbol(JsSymbol::well_known(WellKnownSymbol::ToPrimitive)),
        )?;
        if !to_prim.is_nullish() {
            let result = self.call_function(&to_prim, val, &[JsValue::from(hint.as_str())])?;
            if result.is_object() {
                return Err(self.throw_type_error("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let string_first = match hint {
            Hint::String => true,
            Hint::Number => false,
            Hint::Default => obj.borrow().class_name == "Date",
        };
        let order = if string_first {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = self.get(val, &PropertyKey::from(name))?;
            if matches!(&method, JsValue::Object(m) if m.is_callable()) {
                let result = self.call_function(&method, val, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.throw_type_error("Cannot convert object to primitive value"))
    }

    pub(crate) fn to_number(&mut self, val: &JsValue) -> Result<f64, EvalError> {
        Ok(match val {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(b) => *b as u8 as f64,
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s.as_str()),
            JsValue::Symbol(_) => {
                return Err(self.throw_type_error("Cannot convert a Symbol value to a number"));
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Hint::Number)?;
                return self.to_number(&prim);
            }
        })
    }

    pub(crate) fn to_integer(&mut self, val: &JsValue) -> Result<f64, EvalError> {
        Ok(number_ops::to_integer_or_infinity(self.to_number(val)?))
    }

    pub(crate) fn to_js_string(&mut self, val: &JsValue) -> Result<JsString, EvalError> {
        Ok(match val {
            JsValue::String(s) => s.clone(),
            JsValue::Symbol(_) => {
                return Err(self.throw_type_error("Cannot convert a Symbol value to a string"));
            }
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Hint::String)?;
                return self.to_js_string(&prim);
            }
            other => JsString::from(other.to_string()),
        })
    }

    pub(crate) fn to_property_key(&mut self, val: &JsValue) -> Result<PropertyKey, EvalError> {
        match val {
            JsValue::Symbol(s) => Ok(PropertyKey::Symbol(s.clone())),
            JsValue::String(s) => Ok(PropertyKey::String(s.clone())),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, Hint::String)?;
                self.to_property_key(&prim)
            }
            other => Ok(PropertyKey::String(JsString::from(other.to_string()))),
        }
    }

    pub(crate) fn to_object(&mut self, val: &JsValue) -> Result<JsObject, EvalError> {
        let (proto, class_name) = match val {
            JsValue::Object(o) => return Ok(o.clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.throw_type_error(&format!(
                    "Cannot convert {val} to object"
                )));
            }
            JsValue::Boolean(_) => (self.realm.boolean_prototype.clone(), "Boolean"),
            JsValue::Number(_) => (self.realm.number_prototype.clone(), "Number"),
            JsValue::String(_) => (self.realm.string_prototype.clone(), "String"),
            JsValue::Symbol(_) => (self.realm.symbol_prototype.clone(), "Symbol"),
        };
        let mut data = ObjectData::with_proto(Some(proto));
        data.class_name = class_name.to_string();
        data.primitive_value = Some(val.clone());
        Ok(JsObject::from_data(data))
    }

    fn prototype_for_primitive(&self, val: &JsValue) -> Option<JsObject> {
        Some(match val {
            JsValue::Boolean(_) => self.realm.boolean_prototype.clone(),
            JsValue::Number(_) => self.realm.number_prototype.clone(),
            JsValue::String(_) => self.realm.string_prototype.clone(),
            JsValue::Symbol(_) => self.realm.symbol_prototype.clone(),
            _ => return None,
        })
    }

    /// `[[Get]]` with `target` as the receiver; primitives read through their prototypes.
    pub(crate) fn get(&mut self, target: &JsValue, key: &PropertyKey) -> Result<JsValue, EvalError> {
        let holder = match target {
            JsValue::Object(o) => o.clone(),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.throw_type_error(&format!(
                    "Cannot read properties of {target} (reading '{key}')"
                )));
            }
            JsValue::String(s) => {
                if key.is("length") {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Some(idx) = key.as_string().and_then(JsString::as_index) {
                    if idx < s.len() {
                        return Ok(JsValue::String(s.slice_utf16(idx, idx + 1)));
                    }
                    return Ok(JsValue::Undefined);
                }
                self.realm.string_prototype.clone()
            }
            other => match self.prototype_for_primitive(other) {
                Some(proto) => proto,
                None => return Ok(JsValue::Undefined),
            },
        };
        match holder.lookup(key) {
            None => Ok(JsValue::Undefined),
            Some(desc) if desc.is_accessor_descriptor() => match desc.get {
                Some(getter @ JsValue::Object(_)) => self.call_function(&getter, target, &[]),
                _ => Ok(JsValue::Undefined),
            },
            Some(desc) => Ok(desc.value.unwrap_or(JsValue::Undefined)),
        }
    }

    pub(crate) fn get_named(&mut self, target: &JsValue, name: &str) -> Result<JsValue, EvalError> {
        self.get(target, &PropertyKey::from(name))
    }

    /// Fails when `obj` is a protected built-in.
    pub(crate) fn check_mutable(&self, obj: &JsObject) -> Result<(), EvalError> {
        match self.realm.protected_name(obj) {
            Some(name) => Err(self.raise(
                Message::BuiltInPrototypeChange,
                name,
                self.last_position,
            )),
            None => Ok(()),
        }
    }

    /// `[[Set]]`: the single write path for guest property assignment.
    pub(crate) fn put(
        &mut self,
        target: &JsValue,
        key: PropertyKey,
        value: JsValue,
    ) -> Result<(), EvalError> {
        let obj = match target {
            JsValue::Object(o) => o.clone(),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.throw_type_error(&format!(
                    "Cannot set properties of {target} (setting '{key}')"
                )));
            }
            _ => return Ok(()),
        };
        self.check_mutable(&obj)?;
        if key.is("__proto__") {
            return Ok(());
        }
        match obj.lookup(&key) {
            Some(desc) if desc.is_accessor_descriptor() => {
                if let Some(setter @ JsValue::Object(_)) = desc.set {
                    self.call_function(&setter, target, &[value])?;
                }
                Ok(())
            }
            Some(desc) if !desc.is_writable() => Ok(()),
            Some(_) if obj.has_own_property(&key) => {
                let update = PropertyDescriptor {
                    value: Some(value),
                    ..Default::default()
                };
                obj.borrow_mut().define_own_property(key, update);
                Ok(())
            }
            _ => {
                let mut data = obj.borrow_mut();
                if data.extensible {
                    data.define_own_property(key, PropertyDescriptor::data_default(value));
                }
                Ok(())
            }
        }
    }

    /// `[[DefineOwnProperty]]` that throws when the object refuses the change.
    pub(crate) fn define_property_or_throw(
        &mut self,
        obj: &JsObject,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<(), EvalError> {
        self.check_mutable(obj)?;
        if key.is("__proto__") {
            return Ok(());
        }
        let label = key.to_string();
        if obj.borrow_mut().define_own_property(key, desc) {
            Ok(())
        } else {
            Err(self.throw_type_error(&format!("Cannot redefine property: {label}")))
        }
    }

    pub(crate) fn delete_property(
        &mut self,
        target: &JsValue,
        key: &PropertyKey,
    ) -> Result<bool, EvalError> {
        match target {
            JsValue::Object(obj) => {
                self.check_mutable(obj)?;
                Ok(obj.borrow_mut().delete(key))
            }
            JsValue::Undefined | JsValue::Null => Err(self.throw_type_error(&format!(
                "Cannot convert {target} to object"
            ))),
            _ => Ok(true),
        }
    }

    pub(crate) fn loose_equals(&mut self, left: &JsValue, right: &JsValue) -> Result<bool, EvalError> {
        use JsValue::*;
        Ok(match (left, right) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Number(a), String(b)) => number_ops::equal(*a, string_to_number(b.as_str())),
            (String(a), Number(b)) => number_ops::equal(string_to_number(a.as_str()), *b),
            (Boolean(b), _) => {
                return self.loose_equals(&Number(*b as u8 as f64), right);
            }
            (_, Boolean(b)) => {
                return self.loose_equals(left, &Number(*b as u8 as f64));
            }
            (Object(_), Number(_) | String(_) | Symbol(_)) => {
                let prim = self.to_primitive(left, Hint::Default)?;
                return self.loose_equals(&prim, right);
            }
            (Number(_) | String(_) | Symbol(_), Object(_)) => {
                let prim = self.to_primitive(right, Hint::Default)?;
                return self.loose_equals(left, &prim);
            }
            _ => left.strict_equals(right),
        })
    }

    /// Abstract relational comparison `left < right`; `None` when either side is NaN.
    pub(crate) fn less_than(
        &mut self,
        left: &JsValue,
        right: &JsValue,
    ) -> Result<Option<bool>, EvalError> {
        let lp = self.to_primitive(left, Hint::Number)?;
        let rp = self.to_primitive(right, Hint::Number)?;
        if let (JsValue::String(a), JsValue::String(b)) = (&lp, &rp) {
            return Ok(Some(a.as_str().encode_utf16().lt(b.as_str().encode_utf16())));
        }
        let ln = self.to_number(&lp)?;
        let rn = self.to_number(&rp)?;
        Ok(number_ops::less_than(ln, rn))
    }

    pub(crate) fn add_values(&mut self, left: &JsValue, right: &JsValue) -> Result<JsValue, EvalError> {
        let lp = self.to_primitive(left, Hint::Default)?;
        let rp = self.to_primitive(right, Hint::Default)?;
        if lp.is_string() || rp.is_string() {
            let ls = self.to_js_string(&lp)?;
            let rs = self.to_js_string(&rp)?;
            return Ok(JsValue::from(format!("{ls}{rs}")));
        }
        Ok(JsValue::Number(self.to_number(&lp)? + self.to_number(&rp)?))
    }

    pub(crate) fn binary_op(
        &mut self,
        op: &BinaryOperator,
        left: &JsValue,
        right: &JsValue,
    ) -> Result<JsValue, EvalError> {
        use BinaryOperator as B;
        let numeric = |interp: &mut Self, f: fn(f64, f64) -> f64| -> Result<JsValue, EvalError> {
            let l = interp.to_number(left)?;
            let r = interp.to_number(right)?;
            Ok(JsValue::Number(f(l, r)))
        };
        match op {
            B::Eq => Ok(JsValue::Boolean(self.loose_equals(left, right)?)),
            B::NotEq => Ok(JsValue::Boolean(!self.loose_equals(left, right)?)),
            B::StrictEq => Ok(JsValue::Boolean(left.strict_equals(right))),
            B::StrictNotEq => Ok(JsValue::Boolean(!left.strict_equals(right))),
            B::Lt => Ok(JsValue::Boolean(self.less_than(left, right)? == Some(true))),
            B::Gt => Ok(JsValue::Boolean(self.less_than(right, left)? == Some(true))),
            B::LtEq => Ok(JsValue::Boolean(self.less_than(right, left)? == Some(false))),
            B::GtEq => Ok(JsValue::Boolean(self.less_than(left, right)? == Some(false))),
            B::Add => self.add_values(left, right),
            B::Sub => numeric(self, |a, b| a - b),
            B::Mul => numeric(self, |a, b| a * b),
            B::Div => numeric(self, |a, b| a / b),
            B::Mod => numeric(self, number_ops::remainder),
            B::Exp => numeric(self, number_ops::exponentiate),
            B::LShift => numeric(self, number_ops::left_shift),
            B::RShift => numeric(self, number_ops::signed_right_shift),
            B::URShift => numeric(self, number_ops::unsigned_right_shift),
            B::BitAnd => numeric(self, number_ops::bitwise_and),
            B::BitOr => numeric(self, number_ops::bitwise_or),
            B::BitXor => numeric(self, number_ops::bitwise_xor),
            B::In => {
                let JsValue::Object(obj) = right else {
                    return Err(self.throw_type_error(&format!(
                        "Cannot use 'in' operator to search for '{left}' in {right}"
                    )));
                };
                let key = self.to_property_key(left)?;
                Ok(JsValue::Boolean(obj.has_property(&key)))
            }
            B::Instanceof => Ok(JsValue::Boolean(self.instance_of(left, right)?)),
            B::Other(op) => Err(self.raise(Message::BinaryOperator, op, self.last_position)),
        }
    }

    pub(crate) fn instance_of(&mut self, value: &JsValue, target: &JsValue) -> Result<bool, EvalError> {
        let JsValue::Object(ctor) = target else {
            return Err(self.throw_type_error("Right-hand side of 'instanceof' is not an object"));
        };
        let has_instance = ctor.lookup(&PropertyKey::Symbol(JsSymbol::well_known(
            WellKnownSymbol::HasInstance,
        )));
        if let Some(method) = has_instance.and_then(|d| d.value)
            && method.is_object()
        {
            let result = self.call_function(&method, target, std::slice::from_ref(value))?;
            return Ok(to_boolean(&result));
        }
        let bound_target = match &ctor.borrow().callable {
            None => None,
            Some(JsFunction::Bound { target, .. }) => Some(target.clone()),
            Some(_) => Some(ctor.clone()),
        };
        let Some(ctor) = bound_target else {
            return Err(self.throw_type_error("Right-hand side of 'instanceof' is not callable"));
        };
        if !ctor.ptr_eq(match target {
            JsValue::Object(o) => o,
            _ => &ctor,
        }) {
            return self.instance_of(value, &JsValue::Object(ctor));
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let proto = self.get_named(target, "prototype")?;
        let JsValue::Object(proto) = proto else {
            return Err(self.throw_type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        Ok(obj.inherits_from(&proto))
    }

    /// Elements produced by spreading `value`.
    pub(crate) fn iterate_to_vec(&mut self, value: &JsValue, label: &str) -> Result<Vec<JsValue>, EvalError> {
        match value {
            JsValue::String(s) => Ok(s
                .as_str()
                .chars()
                .map(|c| JsValue::from(c.to_string()))
                .collect()),
            JsValue::Object(obj) => {
                let data = obj.borrow();
                if let Some(elems) = &data.array_elements {
                    return Ok(elems.clone());
                }
                if let Some(entries) = &data.map_data
                    && data.class_name == "Map"
                {
                    let pairs: Vec<(JsValue, JsValue)> = entries.iter().flatten().cloned().collect();
                    drop(data);
                    return Ok(pairs
                        .into_iter()
                        .map(|(k, v)| self.create_array(vec![k, v]))
                        .collect());
                }
                if let Some(values) = &data.set_data
                    && data.class_name == "Set"
                {
                    return Ok(values.iter().flatten().cloned().collect());
                }
                if let Some(JsValue::String(s)) = &data.primitive_value {
                    let s = s.clone();
                    drop(data);
                    return self.iterate_to_vec(&JsValue::String(s), label);
                }
                drop(data);
                Err(self.raise(Message::NotIterable, label, self.last_position))
            }
            _ => Err(self.raise(Message::NotIterable, label, self.last_position)),
        }
    }

    /// Reads `length` and indexed elements of an array-like object.
    pub(crate) fn array_like_to_vec(&mut self, value: &JsValue) -> Result<Vec<JsValue>, EvalError> {
        match value {
            JsValue::Undefined | JsValue::Null => Ok(Vec::new()),
            JsValue::Object(obj) => {
                if let Some(elems) = obj.array_elements() {
                    return Ok(elems);
                }
                let len = self.get_named(value, "length")?;
                let len = self.to_integer(&len)?.clamp(0.0, u32::MAX as f64) as usize;
                let mut out = Vec::with_capacity(len.min(1 << 16));
                for i in 0..len {
                    self.budget.charge()?;
                    out.push(self.get(value, &PropertyKey::from(JsString::from(i.to_string())))?);
                }
                Ok(out)
            }
            JsValue::String(_) => self.iterate_to_vec(value, ""),
            _ => Ok(Vec::new()),
        }
    }

    /// Copies own enumerable properties of `source` onto `target`, as object spread and
    /// `Object.assign` do. Nullish sources copy nothing.
    pub(crate) fn copy_data_properties(
        &mut self,
        target: &JsObject,
        source: &JsValue,
    ) -> Result<(), EvalError> {
        let source = match source {
            JsValue::Undefined | JsValue::Null => return Ok(()),
            JsValue::Object(obj) => obj.clone(),
            primitive => self.to_object(primitive)?,
        };
        let keys: Vec<PropertyKey> = {
            let data = source.borrow();
            data.own_keys()
                .into_iter()
                .filter(|k| data.get_own_property(k).is_some_and(|d| d.is_enumerable()))
                .collect()
        };
        let source = JsValue::Object(source);
        for key in keys {
            let value = self.get(&source, &key)?;
            target
                .borrow_mut()
                .define_own_property(key, PropertyDescriptor::data_default(value));
        }
        Ok(())
    }

    /// Host-facing text for an uncaught guest value: `Name: message` for error objects.
    pub(crate) fn describe_thrown(&self, value: &JsValue) -> String {
        if let JsValue::Object(obj) = value
            && obj.borrow().class_name == "Error"
        {
            let name = obj.get("name");
            let message = obj.get("message");
            let name = if name.is_undefined() { "Error".to_string() } else { name.to_string() };
            return match message {
                JsValue::Undefined => name,
                m if m.to_string().is_empty() => name,
                m => format!("{name}: {m}"),
            };
        }
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_numbers() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("0x").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(!to_boolean(&JsValue::from("")));
        assert!(to_boolean(&JsValue::from("0")));
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(!to_boolean(&JsValue::Number(-0.0)));
        assert!(to_boolean(&JsValue::Object(JsObject::new())));
    }

    #[test]
    fn typeof_names() {
        assert_eq!(typeof_value(&JsValue::Null), "object");
        assert_eq!(typeof_value(&JsValue::Undefined), "undefined");
        assert_eq!(typeof_value(&JsValue::from(1.0)), "number");
        assert_eq!(typeof_value(&JsValue::Object(JsObject::new())), "object");
    }

    #[test]
    fn loose_equality_coerces() {
        let mut interp = Interpreter::new();
        assert!(interp.loose_equals(&JsValue::Null, &JsValue::Undefined).unwrap());
        assert!(interp.loose_equals(&JsValue::from("1"), &JsValue::from(1.0)).unwrap());
        assert!(interp.loose_equals(&JsValue::Boolean(true), &JsValue::from(1.0)).unwrap());
        assert!(!interp.loose_equals(&JsValue::Null, &JsValue::from(0.0)).unwrap());
    }

    #[test]
    fn addition_concatenates_strings() {
        let mut interp = Interpreter::new();
        let v = interp.add_values(&JsValue::from("a"), &JsValue::from(1.0)).unwrap();
        assert_eq!(v.as_js_string().map(|s| s.to_string()), Some("a1".to_string()));
        let arr = interp.create_array(vec![JsValue::from(1.0), JsValue::from(2.0)]);
        let v = interp.add_values(&arr, &JsValue::from("")).unwrap();
        assert_eq!(v.as_js_string().map(|s| s.to_string()), Some("1,2".to_string()));
    }
}
