use super::{arg, method};
use crate::interpreter::error::{Error, ErrorType, EvalError};
use crate::interpreter::types::{JsObject, PropertyDescriptor, PropertyKey};
use crate::interpreter::Interpreter;
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol, number_ops};
use serde_json::Value;

/// Settings of one `JSON.stringify` call.
struct Serializer {
    replacer: Option<JsValue>,
    allow: Option<Vec<JsString>>,
    gap: String,
    indent: String,
    stack: Vec<usize>,
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

impl Interpreter {
    pub(crate) fn setup_json(&mut self) {
        let json = self.install_namespace(
            "JSON",
            vec![
                method("parse", 2, |interp, _, args| {
                    let text = interp.to_js_string(&arg(args, 0))?;
                    let parsed: Value = serde_json::from_str(text.as_str()).map_err(|e| {
                        interp.throw_error(ErrorType::SyntaxError, &format!("JSON.parse: {e}"))
                    })?;
                    let value = interp.from_json(&parsed);
                    match arg(args, 1) {
                        reviver @ JsValue::Object(_) if reviver.as_object().is_some_and(JsObject::is_callable) => {
                            let root = interp.create_object();
                            root.borrow_mut().insert_value("", value);
                            interp.internalize(&JsValue::Object(root), JsString::from(""), &reviver)
                        }
                        _ => Ok(value),
                    }
                }),
                method("stringify", 3, |interp, _, args| {
                    let text = interp.json_stringify(&arg(args, 0), &arg(args, 1), &arg(args, 2))?;
                    Ok(text.map_or(JsValue::Undefined, JsValue::from))
                }),
            ],
        );
        json.borrow_mut().insert_symbol(
            JsSymbol::well_known(WellKnownSymbol::ToStringTag),
            PropertyDescriptor::data(JsValue::from("JSON"), false, false, true),
        );
    }

    /// Builds a guest value from parsed JSON.
    pub fn from_json(&self, value: &Value) -> JsValue {
        match value {
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Boolean(*b),
            Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => JsValue::from(s.as_str()),
            Value::Array(items) => self.create_array(items.iter().map(|v| self.from_json(v)).collect()),
            Value::Object(map) => {
                let obj = self.create_object();
                {
                    let mut data = obj.borrow_mut();
                    for (key, v) in map {
                        data.define_own_property(
                            PropertyKey::from(key.as_str()),
                            PropertyDescriptor::data_default(self.from_json(v)),
                        );
                    }
                }
                JsValue::Object(obj)
            }
        }
    }

    /// Converts a guest value to JSON the way `JSON.stringify` sees it. Values with no JSON form
    /// become `null`.
    pub fn to_json(&mut self, value: &JsValue) -> Result<Value, Error> {
        let text = self
            .json_stringify(value, &JsValue::Undefined, &JsValue::Undefined)
            .map_err(|e| self.surface(e))?;
        match text {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Value::Null),
        }
    }

    fn internalize(&mut self, holder: &JsValue, key: JsString, reviver: &JsValue) -> Result<JsValue, EvalError> {
        let value = self.get(holder, &PropertyKey::from(key.clone()))?;
        if let JsValue::Object(obj) = &value {
            let keys: Vec<JsString> = obj.borrow().own_enumerable_string_keys();
            for k in keys {
                let revived = self.internalize(&value, k.clone(), reviver)?;
                if revived.is_undefined() {
                    obj.borrow_mut().delete(&PropertyKey::from(k));
                } else {
                    obj.borrow_mut()
                        .define_own_property(PropertyKey::from(k), PropertyDescriptor::data_default(revived));
                }
            }
        }
        self.call_function(reviver, holder, &[JsValue::String(key), value])
    }

    pub(crate) fn json_stringify(
        &mut self,
        value: &JsValue,
        replacer: &JsValue,
        space: &JsValue,
    ) -> Result<Option<String>, EvalError> {
        let mut serializer = Serializer {
            replacer: None,
            allow: None,
            gap: String::new(),
            indent: String::new(),
            stack: Vec::new(),
        };
        if let JsValue::Object(obj) = replacer {
            if obj.is_callable() {
                serializer.replacer = Some(replacer.clone());
            } else if obj.is_array() {
                let mut allow = Vec::new();
                for item in self.array_like_to_vec(replacer)? {
                    let name = match &item {
                        JsValue::String(s) => Some(s.clone()),
                        JsValue::Number(_) => Some(self.to_js_string(&item)?),
                        _ => None,
                    };
                    if let Some(name) = name
                        && !allow.contains(&name)
                    {
                        allow.push(name);
                    }
                }
                serializer.allow = Some(allow);
            }
        }
        let space = match space {
            JsValue::Object(o) => o.borrow().primitive_value.clone().unwrap_or(JsValue::Undefined),
            other => other.clone(),
        };
        serializer.gap = match space {
            JsValue::Number(n) => " ".repeat(number_ops::to_integer_or_infinity(n).clamp(0.0, 10.0) as usize),
            JsValue::String(s) => s.as_str().chars().take(10).collect(),
            _ => String::new(),
        };
        let root = self.create_object();
        root.borrow_mut().insert_value("", value.clone());
        self.serialize_property(&mut serializer, &JsValue::Object(root), JsString::from(""), value.clone())
    }

    fn serialize_property(
        &mut self,
        ser: &mut Serializer,
        holder: &JsValue,
        key: JsString,
        mut value: JsValue,
    ) -> Result<Option<String>, EvalError> {
        self.budget.charge()?;
        if value.is_object() {
            let to_json = self.get_named(&value, "toJSON")?;
            if to_json.as_object().is_some_and(JsObject::is_callable) {
                value = self.call_function(&to_json, &value, &[JsValue::String(key.clone())])?;
            }
        }
        if let Some(replacer) = ser.replacer.clone() {
            value = self.call_function(&replacer, holder, &[JsValue::String(key), value])?;
        }
        if let JsValue::Object(obj) = &value {
            let unwrapped = {
                let data = obj.borrow();
                match (&data.primitive_value, data.class_name.as_str()) {
                    (Some(p), "Number" | "String" | "Boolean") => Some(p.clone()),
                    _ => None,
                }
            };
            if let Some(primitive) = unwrapped {
                value = match primitive {
                    JsValue::Number(_) => JsValue::Number(self.to_number(&value)?),
                    JsValue::String(_) => JsValue::String(self.to_js_string(&value)?),
                    other => other,
                };
            }
        }
        Ok(match &value {
            JsValue::Null => Some("null".to_string()),
            JsValue::Boolean(b) => Some(b.to_string()),
            JsValue::String(s) => Some(quote(s.as_str())),
            JsValue::Number(n) if n.is_finite() => Some(number_ops::to_string(*n)),
            JsValue::Number(_) => Some("null".to_string()),
            JsValue::Object(obj) if !obj.is_callable() => {
                if ser.stack.contains(&obj.addr()) {
                    return Err(self.throw_type_error("Converting circular structure to JSON"));
                }
                ser.stack.push(obj.addr());
                let outer = ser.indent.clone();
                ser.indent.push_str(&ser.gap.clone());
                let result = if obj.is_array() {
                    self.serialize_array(ser, &value, &outer)
                } else {
                    self.serialize_object(ser, obj, &value, &outer)
                };
                ser.indent = outer;
                ser.stack.pop();
                Some(result?)
            }
            _ => None,
        })
    }

    fn serialize_array(&mut self, ser: &mut Serializer, value: &JsValue, outer: &str) -> Result<String, EvalError> {
        let items = self.array_like_to_vec(value)?;
        let mut parts = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let part = self.serialize_property(ser, value, JsString::from(i.to_string()), item)?;
            parts.push(part.unwrap_or_else(|| "null".to_string()));
        }
        Ok(wrap(ser, '[', ']', parts, outer))
    }

    fn serialize_object(
        &mut self,
        ser: &mut Serializer,
        obj: &JsObject,
        value: &JsValue,
        outer: &str,
    ) -> Result<String, EvalError> {
        let keys = match &ser.allow {
            Some(allow) => allow.clone(),
            None => obj.borrow().own_enumerable_string_keys(),
        };
        let separator = if ser.gap.is_empty() { ":" } else { ": " };
        let mut parts = Vec::new();
        for key in keys {
            let item = self.get(value, &PropertyKey::from(key.clone()))?;
            if let Some(text) = self.serialize_property(ser, value, key.clone(), item)? {
                parts.push(format!("{}{separator}{text}", quote(key.as_str())));
            }
        }
        Ok(wrap(ser, '{', '}', parts, outer))
    }
}

fn wrap(ser: &Serializer, open: char, close: char, parts: Vec<String>, outer: &str) -> String {
    if parts.is_empty() {
        return format!("{open}{close}");
    }
    if ser.gap.is_empty() {
        return format!("{open}{}{close}", parts.join(","));
    }
    let inner = &ser.indent;
    format!("{open}\n{inner}{}\n{outer}{close}", parts.join(&format!(",\n{inner}")))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::{EvalOptions, Interpreter};
    use crate::types::{JsObject, JsValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval(src: &str) -> String {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap().to_string()
    }

    #[test]
    fn stringify_forms() {
        assert_eq!(eval("JSON.stringify({b: 1, a: [1, 'x', null, undefined], f() {}})"), r#"{"b":1,"a":[1,"x",null,null]}"#);
        assert_eq!(eval("JSON.stringify({a: [1]}, null, 2)"), "{\n  \"a\": [\n    1\n  ]\n}");
        assert_eq!(eval("JSON.stringify({a: 1, b: 2}, ['b'])"), r#"{"b":2}"#);
        assert_eq!(eval("JSON.stringify({a: 1, b: 'x'}, (k, v) => typeof v === 'number' ? v * 2 : v)"), r#"{"a":2,"b":"x"}"#);
        assert_eq!(eval("JSON.stringify(NaN) + JSON.stringify('q\"')"), "null\"q\\\"\"");
        assert_eq!(eval("JSON.stringify(undefined) === undefined"), "true");
    }

    #[test]
    fn stringify_calls_to_json_and_detects_cycles() {
        assert_eq!(eval("JSON.stringify({ toJSON() { return 7 } })"), "7");
        assert_eq!(
            eval("var o = {}; o.self = o; try { JSON.stringify(o) } catch (e) { e.message }"),
            "Converting circular structure to JSON"
        );
    }

    #[test]
    fn parse_with_reviver() {
        assert_eq!(eval("JSON.parse('{\"z\": 1, \"a\": [true]}').a[0]"), "true");
        assert_eq!(eval("Object.keys(JSON.parse('{\"z\": 1, \"a\": 2}')).join()"), "z,a");
        assert_eq!(
            eval("JSON.parse('{\"a\": 1, \"b\": 2}', (k, v) => k === 'a' ? undefined : v).a"),
            "undefined"
        );
        assert_eq!(eval("try { JSON.parse('{') } catch (e) { e.name }"), "SyntaxError");
    }

    #[test]
    fn host_conversions() {
        let mut interp = Interpreter::new();
        let value = interp.from_json(&json!({"n": 1.5, "list": [1, "two"]}));
        assert_eq!(interp.to_json(&value).unwrap(), json!({"n": 1.5, "list": [1, "two"]}));
        assert_eq!(interp.to_json(&JsValue::Undefined).unwrap(), json!(null));
    }
}
