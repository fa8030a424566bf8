use super::regexp::{RegexMatch, expand_replacement, find_at};
use super::{arg, method, relative_index};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{ErrorType, EvalError};
use crate::interpreter::types::{JsObject, PropertyKey};
use crate::types::{JsString, JsValue, number_ops};
use std::cmp::Ordering;

/// Longest string `repeat` and `padStart`/`padEnd` will build, in UTF-16 units.
const MAX_STRING_LENGTH: usize = 1 << 28;

pub(crate) fn is_ecma_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

fn units_to_string(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// Every match of a global expression, advancing past empty matches.
fn all_matches(re: &regex::Regex, text: &str, len: usize) -> Vec<RegexMatch> {
    let mut found = Vec::new();
    let mut from = 0;
    while from <= len {
        let Some(m) = find_at(re, text, from) else {
            break;
        };
        from = if m.end == m.start { m.end + 1 } else { m.end };
        found.push(m);
    }
    found
}

/// Literal occurrences of `search` in `units`, as matches without captures.
fn literal_matches(units: &[u16], search: &[u16], all: bool) -> Vec<RegexMatch> {
    let as_match = |start: usize| RegexMatch {
        start,
        end: start + search.len(),
        groups: vec![Some(units_to_string(search))],
        names: Vec::new(),
    };
    let mut found = Vec::new();
    let mut from = 0;
    while from + search.len() <= units.len() {
        let hit = (from..=units.len() - search.len()).find(|&i| units[i..i + search.len()] == *search);
        let Some(start) = hit else {
            break;
        };
        found.push(as_match(start));
        if !all {
            break;
        }
        from = start + search.len().max(1);
    }
    found
}

impl Interpreter {
    pub(crate) fn setup_string(&mut self) {
        let proto = self.realm.string_prototype.clone();
        {
            let mut data = proto.borrow_mut();
            data.class_name = "String".to_string();
            data.primitive_value = Some(JsValue::from(""));
        }
        let ctor = self.install_constructor("String", 1, &proto, |interp, this, args| {
            let value = match args.first() {
                None => JsString::default(),
                Some(JsValue::Symbol(sym)) if interp.constructing_this(this).is_none() => {
                    JsString::from(sym.descriptive_string())
                }
                Some(v) => interp.to_js_string(v)?,
            };
            match interp.constructing_this(this) {
                Some(instance) => {
                    let mut data = instance.borrow_mut();
                    data.class_name = "String".to_string();
                    data.primitive_value = Some(JsValue::String(value));
                    drop(data);
                    Ok(JsValue::Object(instance))
                }
                None => Ok(JsValue::String(value)),
            }
        });
        self.install_methods(
            &ctor,
            vec![
                method("fromCharCode", 1, |interp, _, args| {
                    let mut units = Vec::with_capacity(args.len());
                    for a in args {
                        units.push(number_ops::to_uint32(interp.to_number(a)?) as u16);
                    }
                    Ok(JsValue::from(units_to_string(&units)))
                }),
                method("fromCodePoint", 1, |interp, _, args| {
                    let mut out = String::new();
                    for a in args {
                        let n = interp.to_number(a)?;
                        let ch = (n.fract() == 0.0 && (0.0..=1_114_111.0).contains(&n))
                            .then(|| char::from_u32(n as u32))
                            .flatten();
                        match ch {
                            Some(c) => out.push(c),
                            None if n.fract() == 0.0 && (0xD800 as f64..=0xDFFF as f64).contains(&n) => {
                                out.push(char::REPLACEMENT_CHARACTER);
                            }
                            None => {
                                return Err(interp.throw_error(
                                    ErrorType::RangeError,
                                    &format!("Invalid code point {}", number_ops::to_string(n)),
                                ));
                            }
                        }
                    }
                    Ok(JsValue::from(out))
                }),
                method("raw", 1, |interp, _, args| {
                    let strings = arg(args, 0);
                    let raw = interp.get_named(&strings, "raw")?;
                    let parts = interp.array_like_to_vec(&raw)?;
                    let mut out = String::new();
                    for (i, part) in parts.iter().enumerate() {
                        out.push_str(interp.to_js_string(part)?.as_str());
                        if i + 1 < parts.len()
                            && let Some(sub) = args.get(i + 1)
                        {
                            out.push_str(interp.to_js_string(sub)?.as_str());
                        }
                    }
                    Ok(JsValue::from(out))
                }),
            ],
        );
        self.setup_string_accessors(&proto);
        self.setup_string_transforms(&proto);
        self.setup_string_patterns(&proto);
    }

    /// `this` of a String.prototype method as a string.
    fn this_string(&mut self, this: &JsValue, name: &str) -> Result<JsString, EvalError> {
        if this.is_nullish() {
            return Err(self.throw_type_error(&format!(
                "String.prototype.{name} called on null or undefined"
            )));
        }
        self.to_js_string(this)
    }

    /// Search-string argument that must not be a RegExp.
    fn search_string(&mut self, value: &JsValue, name: &str) -> Result<JsString, EvalError> {
        if self.regex_of(value).is_some() {
            return Err(self.throw_type_error(&format!(
                "First argument to String.prototype.{name} must not be a regular expression"
            )));
        }
        self.to_js_string(value)
    }

    fn setup_string_accessors(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("charAt", 1, |interp, this, args| {
                    let s = interp.this_string(this, "charAt")?;
                    let pos = interp.to_integer(&arg(args, 0))?;
                    if pos < 0.0 || pos >= s.len() as f64 {
                        return Ok(JsValue::from(""));
                    }
                    let pos = pos as usize;
                    Ok(JsValue::String(s.slice_utf16(pos, pos + 1)))
                }),
                method("charCodeAt", 1, |interp, this, args| {
                    let s = interp.this_string(this, "charCodeAt")?;
                    let pos = interp.to_integer(&arg(args, 0))?;
                    let units = s.to_utf16();
                    if pos < 0.0 || pos >= units.len() as f64 {
                        return Ok(JsValue::Number(f64::NAN));
                    }
                    Ok(JsValue::Number(units[pos as usize] as f64))
                }),
                method("codePointAt", 1, |interp, this, args| {
                    let s = interp.this_string(this, "codePointAt")?;
                    let pos = interp.to_integer(&arg(args, 0))?;
                    let units = s.to_utf16();
                    if pos < 0.0 || pos >= units.len() as f64 {
                        return Ok(JsValue::Undefined);
                    }
                    let pos = pos as usize;
                    let code = match char::decode_utf16(units[pos..].iter().copied()).next() {
                        Some(Ok(c)) => c as u32,
                        _ => units[pos] as u32,
                    };
                    Ok(JsValue::Number(code as f64))
                }),
                method("at", 1, |interp, this, args| {
                    let s = interp.this_string(this, "at")?;
                    let n = interp.to_integer(&arg(args, 0))?;
                    let idx = if n < 0.0 { s.len() as f64 + n } else { n };
                    if idx < 0.0 || idx >= s.len() as f64 {
                        return Ok(JsValue::Undefined);
                    }
                    let idx = idx as usize;
                    Ok(JsValue::String(s.slice_utf16(idx, idx + 1)))
                }),
                method("indexOf", 1, |interp, this, args| {
                    let s = interp.this_string(this, "indexOf")?;
                    let search = interp.to_js_string(&arg(args, 0))?;
                    let from = interp.to_integer(&arg(args, 1))?.clamp(0.0, s.len() as f64) as usize;
                    Ok(JsValue::Number(s.index_of(&search, from).map_or(-1.0, |i| i as f64)))
                }),
                method("lastIndexOf", 1, |interp, this, args| {
                    let s = interp.this_string(this, "lastIndexOf")?;
                    let search = interp.to_js_string(&arg(args, 0))?;
                    let pos = interp.to_number(&arg(args, 1))?;
                    let from = if pos.is_nan() {
                        s.len()
                    } else {
                        number_ops::to_integer_or_infinity(pos).clamp(0.0, s.len() as f64) as usize
                    };
                    Ok(JsValue::Number(s.last_index_of(&search, from).map_or(-1.0, |i| i as f64)))
                }),
                method("includes", 1, |interp, this, args| {
                    let s = interp.this_string(this, "includes")?;
                    let search = interp.search_string(&arg(args, 0), "includes")?;
                    let from = interp.to_integer(&arg(args, 1))?.clamp(0.0, s.len() as f64) as usize;
                    Ok(JsValue::Boolean(s.index_of(&search, from).is_some()))
                }),
                method("startsWith", 1, |interp, this, args| {
                    let s = interp.this_string(this, "startsWith")?;
                    let search = interp.search_string(&arg(args, 0), "startsWith")?;
                    let start = interp.to_integer(&arg(args, 1))?.clamp(0.0, s.len() as f64) as usize;
                    let units = s.to_utf16();
                    let needle = search.to_utf16();
                    Ok(JsValue::Boolean(
                        units.get(start..start + needle.len()).is_some_and(|w| w == needle.as_slice()),
                    ))
                }),
                method("endsWith", 1, |interp, this, args| {
                    let s = interp.this_string(this, "endsWith")?;
                    let search = interp.search_string(&arg(args, 0), "endsWith")?;
                    let end = match arg(args, 1) {
                        JsValue::Undefined => s.len(),
                        v => interp.to_integer(&v)?.clamp(0.0, s.len() as f64) as usize,
                    };
                    let units = s.to_utf16();
                    let needle = search.to_utf16();
                    let ok = end >= needle.len() && units[end - needle.len()..end] == needle[..];
                    Ok(JsValue::Boolean(ok))
                }),
                method("slice", 2, |interp, this, args| {
                    let s = interp.this_string(this, "slice")?;
                    let len = s.len();
                    let start = relative_index(interp.to_integer(&arg(args, 0))?, len);
                    let end = match arg(args, 1) {
                        JsValue::Undefined => len,
                        v => relative_index(interp.to_integer(&v)?, len),
                    };
                    Ok(JsValue::String(s.slice_utf16(start, end)))
                }),
                method("substring", 2, |interp, this, args| {
                    let s = interp.this_string(this, "substring")?;
                    let len = s.len() as f64;
                    let start = interp.to_integer(&arg(args, 0))?.clamp(0.0, len) as usize;
                    let end = match arg(args, 1) {
                        JsValue::Undefined => len as usize,
                        v => interp.to_integer(&v)?.clamp(0.0, len) as usize,
                    };
                    Ok(JsValue::String(s.slice_utf16(start.min(end), start.max(end))))
                }),
                method("substr", 2, |interp, this, args| {
                    let s = interp.this_string(this, "substr")?;
                    let len = s.len();
                    let start = relative_index(interp.to_integer(&arg(args, 0))?, len);
                    let count = match arg(args, 1) {
                        JsValue::Undefined => len - start,
                        v => interp.to_integer(&v)?.clamp(0.0, (len - start) as f64) as usize,
                    };
                    Ok(JsValue::String(s.slice_utf16(start, start + count)))
                }),
                method("localeCompare", 1, |interp, this, args| {
                    let s = interp.this_string(this, "localeCompare")?;
                    let other = interp.to_js_string(&arg(args, 0))?;
                    Ok(JsValue::Number(match s.as_str().cmp(other.as_str()) {
                        Ordering::Less => -1.0,
                        Ordering::Equal => 0.0,
                        Ordering::Greater => 1.0,
                    }))
                }),
                method("toString", 0, |interp, this, _| interp.this_string_value(this, "toString")),
                method("valueOf", 0, |interp, this, _| interp.this_string_value(this, "valueOf")),
            ],
        );
    }

    fn this_string_value(&self, this: &JsValue, name: &str) -> Result<JsValue, EvalError> {
        match this {
            JsValue::String(_) => Ok(this.clone()),
            JsValue::Object(o) => match &o.borrow().primitive_value {
                Some(s @ JsValue::String(_)) => Ok(s.clone()),
                _ => Err(self.throw_type_error(&format!(
                    "String.prototype.{name} requires that 'this' be a String"
                ))),
            },
            _ => Err(self.throw_type_error(&format!(
                "String.prototype.{name} requires that 'this' be a String"
            ))),
        }
    }

    fn setup_string_transforms(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("toUpperCase", 0, |interp, this, _| {
                    let s = interp.this_string(this, "toUpperCase")?;
                    Ok(JsValue::from(s.as_str().to_uppercase()))
                }),
                method("toLowerCase", 0, |interp, this, _| {
                    let s = interp.this_string(this, "toLowerCase")?;
                    Ok(JsValue::from(s.as_str().to_lowercase()))
                }),
                method("toLocaleUpperCase", 0, |interp, this, _| {
                    let s = interp.this_string(this, "toLocaleUpperCase")?;
                    Ok(JsValue::from(s.as_str().to_uppercase()))
                }),
                method("toLocaleLowerCase", 0, |interp, this, _| {
                    let s = interp.this_string(this, "toLocaleLowerCase")?;
                    Ok(JsValue::from(s.as_str().to_lowercase()))
                }),
                method("trim", 0, |interp, this, _| {
                    let s = interp.this_string(this, "trim")?;
                    Ok(JsValue::from(s.as_str().trim_matches(is_ecma_whitespace)))
                }),
                method("trimStart", 0, |interp, this, _| {
                    let s = interp.this_string(this, "trimStart")?;
                    Ok(JsValue::from(s.as_str().trim_start_matches(is_ecma_whitespace)))
                }),
                method("trimEnd", 0, |interp, this, _| {
                    let s = interp.this_string(this, "trimEnd")?;
                    Ok(JsValue::from(s.as_str().trim_end_matches(is_ecma_whitespace)))
                }),
                method("padStart", 2, |interp, this, args| {
                    let s = interp.this_string(this, "padStart")?;
                    interp.pad_string(s, args, true)
                }),
                method("padEnd", 2, |interp, this, args| {
                    let s = interp.this_string(this, "padEnd")?;
                    interp.pad_string(s, args, false)
                }),
                method("repeat", 1, |interp, this, args| {
                    let s = interp.this_string(this, "repeat")?;
                    let n = interp.to_integer(&arg(args, 0))?;
                    if n < 0.0 || n.is_infinite() {
                        return Err(interp.throw_error(
                            ErrorType::RangeError,
                            &format!("Invalid count value: {}", number_ops::to_string(n)),
                        ));
                    }
                    if s.len() as f64 * n > MAX_STRING_LENGTH as f64 {
                        return Err(interp.throw_error(ErrorType::RangeError, "Invalid string length"));
                    }
                    Ok(JsValue::from(s.as_str().repeat(n as usize)))
                }),
                method("concat", 1, |interp, this, args| {
                    let mut out = interp.this_string(this, "concat")?.to_string();
                    for a in args {
                        out.push_str(interp.to_js_string(a)?.as_str());
                    }
                    Ok(JsValue::from(out))
                }),
                method("normalize", 0, |interp, this, args| {
                    let s = interp.this_string(this, "normalize")?;
                    let form = match arg(args, 0) {
                        JsValue::Undefined => JsString::from("NFC"),
                        f => interp.to_js_string(&f)?,
                    };
                    if !matches!(form.as_str(), "NFC" | "NFD" | "NFKC" | "NFKD") {
                        return Err(interp.throw_error(
                            ErrorType::RangeError,
                            "The normalization form should be one of NFC, NFD, NFKC, NFKD.",
                        ));
                    }
                    Ok(JsValue::String(s))
                }),
            ],
        );
    }

    fn pad_string(&mut self, s: JsString, args: &[JsValue], at_start: bool) -> Result<JsValue, EvalError> {
        let target = self.to_integer(&arg(args, 0))?;
        let fill = match arg(args, 1) {
            JsValue::Undefined => JsString::from(" "),
            f => self.to_js_string(&f)?,
        };
        let len = s.len();
        if target <= len as f64 || fill.is_empty() {
            return Ok(JsValue::String(s));
        }
        if target > MAX_STRING_LENGTH as f64 {
            return Err(self.throw_error(ErrorType::RangeError, "Invalid string length"));
        }
        let needed = target as usize - len;
        let fill_units = fill.to_utf16();
        let padding: Vec<u16> = fill_units.iter().copied().cycle().take(needed).collect();
        let padding = units_to_string(&padding);
        Ok(JsValue::from(if at_start {
            format!("{padding}{s}")
        } else {
            format!("{s}{padding}")
        }))
    }

    fn setup_string_patterns(&mut self, proto: &JsObject) {
        self.install_methods(
            proto,
            vec![
                method("split", 2, |interp, this, args| {
                    let s = interp.this_string(this, "split")?;
                    let limit = match arg(args, 1) {
                        JsValue::Undefined => u32::MAX as usize,
                        l => number_ops::to_uint32(interp.to_number(&l)?) as usize,
                    };
                    let parts = interp.split_string(&s, &arg(args, 0), limit)?;
                    Ok(interp.create_array(parts))
                }),
                method("replace", 2, |interp, this, args| {
                    let s = interp.this_string(this, "replace")?;
                    interp.replace_string(&s, args, false).map(JsValue::from)
                }),
                method("replaceAll", 2, |interp, this, args| {
                    let s = interp.this_string(this, "replaceAll")?;
                    interp.replace_string(&s, args, true).map(JsValue::from)
                }),
                method("match", 1, |interp, this, args| {
                    let s = interp.this_string(this, "match")?;
                    let pattern = interp.pattern_regexp(&arg(args, 0), "")?;
                    let Some(data) = interp.regex_of(&pattern) else {
                        return Ok(JsValue::Null);
                    };
                    if !data.flags.contains('g') {
                        return Ok(match interp.regexp_exec(&pattern, &s)? {
                            Some(m) => interp.match_to_array(&m, &s),
                            None => JsValue::Null,
                        });
                    }
                    let found = all_matches(&data.compiled, s.as_str(), s.len());
                    interp.put(&pattern, PropertyKey::from("lastIndex"), JsValue::Number(0.0))?;
                    if found.is_empty() {
                        return Ok(JsValue::Null);
                    }
                    let values = found.iter().map(|m| JsValue::from(m.matched())).collect();
                    Ok(interp.create_array(values))
                }),
                method("matchAll", 1, |interp, this, args| {
                    let s = interp.this_string(this, "matchAll")?;
                    let pattern = arg(args, 0);
                    if let Some(data) = interp.regex_of(&pattern)
                        && !data.flags.contains('g')
                    {
                        return Err(interp.throw_type_error(
                            "String.prototype.matchAll called with a non-global RegExp argument",
                        ));
                    }
                    let pattern = interp.pattern_regexp(&pattern, "g")?;
                    let Some(data) = interp.regex_of(&pattern) else {
                        return Ok(interp.create_array(Vec::new()));
                    };
                    let found = all_matches(&data.compiled, s.as_str(), s.len());
                    let values = found.iter().map(|m| interp.match_to_array(m, &s)).collect();
                    Ok(interp.create_array(values))
                }),
                method("search", 1, |interp, this, args| {
                    let s = interp.this_string(this, "search")?;
                    let pattern = interp.pattern_regexp(&arg(args, 0), "")?;
                    let found = interp
                        .regex_of(&pattern)
                        .and_then(|data| find_at(&data.compiled, s.as_str(), 0));
                    Ok(JsValue::Number(found.map_or(-1.0, |m| m.start as f64)))
                }),
            ],
        );
    }

    /// `value` itself when it is a RegExp, otherwise a new RegExp built from its string form.
    fn pattern_regexp(&mut self, value: &JsValue, flags: &str) -> Result<JsValue, EvalError> {
        if self.regex_of(value).is_some() {
            return Ok(value.clone());
        }
        let source = match value {
            JsValue::Undefined => JsString::from("(?:)"),
            other => self.to_js_string(other)?,
        };
        self.create_regexp(source.as_str(), flags)
    }

    fn split_string(&mut self, s: &JsString, separator: &JsValue, limit: usize) -> Result<Vec<JsValue>, EvalError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let units = s.to_utf16();
        let piece = |from: usize, to: usize| JsValue::from(units_to_string(&units[from..to]));
        if let Some(data) = self.regex_of(separator) {
            let size = units.len();
            if size == 0 {
                return Ok(match find_at(&data.compiled, s.as_str(), 0) {
                    Some(_) => Vec::new(),
                    None => vec![JsValue::String(s.clone())],
                });
            }
            let mut out = Vec::new();
            let mut p = 0;
            let mut q = 0;
            while q < size {
                self.budget.charge()?;
                let Some(m) = find_at(&data.compiled, s.as_str(), q) else {
                    break;
                };
                if m.start >= size {
                    break;
                }
                if m.end == p || m.end == m.start && m.start == p {
                    q = m.start.max(q) + 1;
                    continue;
                }
                out.push(piece(p, m.start));
                if out.len() == limit {
                    return Ok(out);
                }
                for capture in m.captures() {
                    out.push(capture.clone().map_or(JsValue::Undefined, JsValue::from));
                    if out.len() == limit {
                        return Ok(out);
                    }
                }
                p = m.end;
                q = p;
            }
            out.push(piece(p, size));
            return Ok(out);
        }
        if separator.is_undefined() {
            return Ok(vec![JsValue::String(s.clone())]);
        }
        let sep = self.to_js_string(separator)?.to_utf16();
        if sep.is_empty() {
            return Ok((0..units.len().min(limit)).map(|i| piece(i, i + 1)).collect());
        }
        let mut out = Vec::new();
        let mut start = 0;
        for m in literal_matches(&units, &sep, true) {
            out.push(piece(start, m.start));
            if out.len() == limit {
                return Ok(out);
            }
            start = m.end;
        }
        out.push(piece(start, units.len()));
        Ok(out)
    }

    fn replace_string(&mut self, s: &JsString, args: &[JsValue], all: bool) -> Result<String, EvalError> {
        let pattern = arg(args, 0);
        let replacement = arg(args, 1);
        let units = s.to_utf16();
        let matches = match self.regex_of(&pattern) {
            Some(data) => {
                let global = data.flags.contains('g');
                if all && !global {
                    return Err(self.throw_type_error("replaceAll must be called with a global RegExp"));
                }
                if global {
                    self.put(&pattern, PropertyKey::from("lastIndex"), JsValue::Number(0.0))?;
                    all_matches(&data.compiled, s.as_str(), units.len())
                } else {
                    self.regexp_exec(&pattern, s)?.into_iter().collect()
                }
            }
            None => {
                let search = self.to_js_string(&pattern)?.to_utf16();
                literal_matches(&units, &search, all)
            }
        };
        let callable = matches!(&replacement, JsValue::Object(o) if o.is_callable());
        let template = if callable {
            None
        } else {
            Some(self.to_js_string(&replacement)?)
        };
        let mut out = String::new();
        let mut last = 0;
        for m in &matches {
            self.budget.charge()?;
            out.push_str(&units_to_string(&units[last..m.start]));
            let text = match &template {
                Some(template) => {
                    let before = units_to_string(&units[..m.start]);
                    let after = units_to_string(&units[m.end.min(units.len())..]);
                    expand_replacement(template.as_str(), m, &before, &after)
                }
                None => {
                    let mut call_args: Vec<JsValue> = m
                        .groups
                        .iter()
                        .map(|g| g.clone().map_or(JsValue::Undefined, JsValue::from))
                        .collect();
                    call_args.push(JsValue::Number(m.start as f64));
                    call_args.push(JsValue::String(s.clone()));
                    if m.has_names() {
                        let groups = self.match_to_array(m, s);
                        call_args.push(self.get_named(&groups, "groups")?);
                    }
                    let result = self.call_function(&replacement, &JsValue::Undefined, &call_args)?;
                    self.to_js_string(&result)?.to_string()
                }
            };
            out.push_str(&text);
            last = m.end;
        }
        out.push_str(&units_to_string(&units[last.min(units.len())..]));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::is_ecma_whitespace;
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
    fn whitespace_table() {
        assert!(is_ecma_whitespace('\u{FEFF}'));
        assert!(is_ecma_whitespace('\u{2003}'));
        assert!(!is_ecma_whitespace('x'));
    }

    #[test]
    fn slicing_counts_utf16_units() {
        assert_eq!(eval("'😀abc'.length"), "5");
        assert_eq!(eval("'hello'.slice(-3, -1)"), "ll");
        assert_eq!(eval("'hello'.substring(3, 1)"), "el");
        assert_eq!(eval("'abc'.at(-1) + 'abc'.charAt(5) + 'abc'.charCodeAt(0)"), "c97");
    }

    #[test]
    fn split_with_strings_and_patterns() {
        assert_eq!(eval("'a,b,,c'.split(',').length"), "4");
        assert_eq!(eval("'abc'.split('').join('|')"), "a|b|c");
        assert_eq!(eval("'a1b22c'.split(/\\d+/).join('|')"), "a|b|c");
        assert_eq!(eval("'a1b'.split(/(\\d)/).join('|')"), "a|1|b");
        assert_eq!(eval("'a,b,c'.split(',', 2).join('|')"), "a|b");
    }

    #[test]
    fn replace_forms() {
        assert_eq!(eval("'aaa'.replace('a', 'b')"), "baa");
        assert_eq!(eval("'aaa'.replaceAll('a', 'b')"), "bbb");
        assert_eq!(eval("'john smith'.replace(/(\\w+) (\\w+)/, '$2 $1')"), "smith john");
        assert_eq!(eval("'a-b-c'.replace(/-/g, (m, i) => i)"), "a1b3c");
    }

    #[test]
    fn match_and_search() {
        assert_eq!(eval("'x1y22'.match(/\\d+/g).join()"), "1,22");
        assert_eq!(eval("'x1y22'.match(/y(\\d+)/)[1]"), "22");
        assert_eq!(eval("'x1y22'.search(/y/)"), "2");
        assert_eq!(eval("'abc'.match(/z/)"), "null");
    }

    #[test]
    fn padding_and_repeat() {
        assert_eq!(eval("'5'.padStart(3, '0') + '|' + 'ab'.padEnd(5, 'xy')"), "005|abxyx");
        assert_eq!(eval("'ab'.repeat(3)"), "ababab");
        assert_eq!(eval("'  hi \\n'.trim()"), "hi");
    }
}
