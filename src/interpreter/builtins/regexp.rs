use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{ErrorType, EvalError};
use crate::interpreter::types::{JsObject, ObjectData, PropertyDescriptor, PropertyKey, RegexData};
use crate::types::{JsString, JsValue};
use std::rc::Rc;

const FLAGS: &str = "dgimsuvy";

/// Rewrites JS-only escapes into `regex` syntax. `\d` and `\w` keep their ASCII meaning.
fn translate_pattern(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' if !in_class => {
                in_class = true;
                out.push(c);
                i += 1;
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
                i += 1;
            }
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                i += 2;
                match (next, in_class) {
                    ('d', false) => out.push_str("[0-9]"),
                    ('d', true) => out.push_str("0-9"),
                    ('D', false) => out.push_str("[^0-9]"),
                    ('w', false) => out.push_str("[0-9A-Za-z_]"),
                    ('w', true) => out.push_str("0-9A-Za-z_"),
                    ('W', false) => out.push_str("[^0-9A-Za-z_]"),
                    ('v', _) => out.push_str("\\x0B"),
                    ('0', _) if !chars.get(i).is_some_and(char::is_ascii_digit) => {
                        out.push_str("\\x00");
                    }
                    ('c', _) if chars.get(i).is_some_and(char::is_ascii_alphabetic) => {
                        out.push_str(&format!("\\x{:02X}", chars[i] as u32 % 32));
                        i += 1;
                    }
                    ('/', _) => out.push('/'),
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '(' if !in_class && chars.get(i + 1) == Some(&'?') && chars.get(i + 2) == Some(&'<') => {
                if matches!(chars.get(i + 3), Some('=' | '!')) {
                    out.push_str("(?<");
                } else {
                    out.push_str("(?P<");
                }
                i += 3;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

pub(crate) fn compile_regex(source: &str, flags: &str) -> Result<regex::Regex, String> {
    let valid = flags.chars().all(|f| FLAGS.contains(f))
        && flags.chars().enumerate().all(|(i, f)| !flags[..i].contains(f));
    if !valid {
        return Err(format!("Invalid flags supplied to RegExp constructor '{flags}'"));
    }
    regex::RegexBuilder::new(&translate_pattern(source))
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| {
            let detail = e.to_string();
            let reason = detail.lines().last().unwrap_or_default().trim().to_string();
            format!("Invalid regular expression: /{source}/{flags}: {reason}")
        })
}

/// Byte offset of UTF-16 index `index` in `s`, rounded up to a char boundary.
pub(crate) fn byte_offset(s: &str, index: usize) -> usize {
    let mut units = 0;
    for (byte, c) in s.char_indices() {
        if units >= index {
            return byte;
        }
        units += c.len_utf16();
    }
    s.len()
}

pub(crate) fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// One match with UTF-16 positions, the way guest code sees them.
pub(crate) struct RegexMatch {
    pub start: usize,
    pub end: usize,
    /// Group 0 is the whole match.
    pub groups: Vec<Option<String>>,
    pub names: Vec<Option<String>>,
}

impl RegexMatch {
    pub fn matched(&self) -> &str {
        self.groups.first().and_then(|g| g.as_deref()).unwrap_or_default()
    }

    pub fn captures(&self) -> &[Option<String>] {
        self.groups.get(1..).unwrap_or_default()
    }

    pub fn has_names(&self) -> bool {
        self.names.iter().any(Option::is_some)
    }
}

/// First match starting at or after UTF-16 index `from`.
pub(crate) fn find_at(re: &regex::Regex, text: &str, from: usize) -> Option<RegexMatch> {
    let offset = byte_offset(text, from);
    let caps = re.captures_at(text, offset)?;
    let whole = caps.get(0)?;
    let start = utf16_len(&text[..whole.start()]);
    Some(RegexMatch {
        start,
        end: start + utf16_len(whole.as_str()),
        groups: (0..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
            .collect(),
        names: re.capture_names().map(|n| n.map(str::to_string)).collect(),
    })
}

/// Expands `$$`, `$&`, `` $` ``, `$'`, `$n`, `$nn` and `$<name>` in a replacement string.
pub(crate) fn expand_replacement(template: &str, m: &RegexMatch, before: &str, after: &str) -> String {
    let captures = m.captures();
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars[i + 1] {
            '$' => {
                out.push('$');
                i += 2;
            }
            '&' => {
                out.push_str(m.matched());
                i += 2;
            }
            '`' => {
                out.push_str(before);
                i += 2;
            }
            '\'' => {
                out.push_str(after);
                i += 2;
            }
            d if d.is_ascii_digit() => {
                let one = d as usize - '0' as usize;
                let two = chars
                    .get(i + 2)
                    .filter(|c| c.is_ascii_digit())
                    .map(|c| one * 10 + (*c as usize - '0' as usize));
                match two {
                    Some(n) if n >= 1 && n <= captures.len() => {
                        out.push_str(captures[n - 1].as_deref().unwrap_or_default());
                        i += 3;
                    }
                    _ if one >= 1 && one <= captures.len() => {
                        out.push_str(captures[one - 1].as_deref().unwrap_or_default());
                        i += 2;
                    }
                    _ => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            '<' if m.has_names() => {
                let rest: String = chars[i + 2..].iter().collect();
                match rest.find('>') {
                    Some(end) => {
                        let name = &rest[..end];
                        let value = m
                            .names
                            .iter()
                            .position(|n| n.as_deref() == Some(name))
                            .and_then(|idx| m.groups.get(idx).cloned().flatten());
                        out.push_str(value.as_deref().unwrap_or_default());
                        i += 2 + rest[..end].chars().count() + 1;
                    }
                    None => {
                        out.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

impl Interpreter {
    pub(crate) fn setup_regexp(&mut self) {
        let proto = self.realm.regexp_prototype.clone();
        self.install_constructor("RegExp", 2, &proto, |interp, this, args| {
            let (source, default_flags) = match &arg(args, 0) {
                JsValue::Object(o) if o.borrow().regex.is_some() => {
                    let data = o.borrow().regex.clone();
                    data.map(|d| (d.source.clone(), d.flags.clone())).unwrap_or_default()
                }
                JsValue::Undefined => ("(?:)".to_string(), String::new()),
                other => (interp.to_js_string(other)?.to_string(), String::new()),
            };
            let flags = match arg(args, 1) {
                JsValue::Undefined => default_flags,
                f => interp.to_js_string(&f)?.to_string(),
            };
            let data = interp.regex_data(&source, &flags)?;
            let target = interp
                .constructing_this(this)
                .unwrap_or_else(|| JsObject::from_data(ObjectData::with_proto(Some(interp.realm.regexp_prototype.clone()))));
            init_regexp(&target, data);
            Ok(JsValue::Object(target))
        });
        self.install_methods(
            &proto,
            vec![
                method("exec", 1, |interp, this, args| {
                    let input = interp.to_js_string(&arg(args, 0))?;
                    let found = interp.regexp_exec(this, &input)?;
                    Ok(match found {
                        Some(m) => interp.match_to_array(&m, &input),
                        None => JsValue::Null,
                    })
                }),
                method("test", 1, |interp, this, args| {
                    let input = interp.to_js_string(&arg(args, 0))?;
                    Ok(JsValue::Boolean(interp.regexp_exec(this, &input)?.is_some()))
                }),
                method("toString", 0, |interp, this, _| {
                    let source = interp.get_named(this, "source")?;
                    let flags = interp.get_named(this, "flags")?;
                    Ok(JsValue::from(format!("/{source}/{flags}")))
                }),
            ],
        );
        self.install_getter(&proto, "source", |interp, this, _| {
            let data = interp.this_regex(this, "source")?;
            Ok(JsValue::from(if data.source.is_empty() { "(?:)" } else { data.source.as_str() }))
        });
        self.install_getter(&proto, "flags", |interp, this, _| {
            let data = interp.this_regex(this, "flags")?;
            let mut flags: Vec<char> = data.flags.chars().collect();
            flags.sort_unstable();
            Ok(JsValue::from(flags.into_iter().collect::<String>()))
        });
        for (name, flag) in [
            ("global", 'g'),
            ("ignoreCase", 'i'),
            ("multiline", 'm'),
            ("dotAll", 's'),
            ("unicode", 'u'),
            ("sticky", 'y'),
            ("hasIndices", 'd'),
        ] {
            self.install_getter(&proto, name, move |interp, this, _| {
                let data = interp.this_regex(this, name)?;
                Ok(JsValue::Boolean(data.flags.contains(flag)))
            });
        }
    }

    fn regex_data(&self, source: &str, flags: &str) -> Result<Rc<RegexData>, EvalError> {
        let compiled = compile_regex(source, flags)
            .map_err(|msg| self.throw_error(ErrorType::SyntaxError, &msg))?;
        Ok(Rc::new(RegexData {
            source: source.to_string(),
            flags: flags.to_string(),
            compiled,
        }))
    }

    /// Creates a RegExp object, as regex literals do.
    pub(crate) fn create_regexp(&mut self, source: &str, flags: &str) -> Result<JsValue, EvalError> {
        let data = self.regex_data(source, flags)?;
        let obj = JsObject::from_data(ObjectData::with_proto(Some(self.realm.regexp_prototype.clone())));
        init_regexp(&obj, data);
        Ok(JsValue::Object(obj))
    }

    pub(crate) fn regex_of(&self, value: &JsValue) -> Option<Rc<RegexData>> {
        match value {
            JsValue::Object(o) => o.borrow().regex.clone(),
            _ => None,
        }
    }

    fn this_regex(&self, this: &JsValue, name: &str) -> Result<Rc<RegexData>, EvalError> {
        self.regex_of(this).ok_or_else(|| {
            self.throw_type_error(&format!(
                "RegExp.prototype.{name} getter called on non-RegExp object"
            ))
        })
    }

    /// RegExpBuiltinExec: honors and updates `lastIndex` for global and sticky expressions.
    pub(crate) fn regexp_exec(
        &mut self,
        this: &JsValue,
        input: &JsString,
    ) -> Result<Option<RegexMatch>, EvalError> {
        let data = self.this_regex(this, "exec")?;
        let uses_last_index = data.flags.contains('g') || data.flags.contains('y');
        let from = if uses_last_index {
            let last = self.get_named(this, "lastIndex")?;
            self.to_integer(&last)?.max(0.0) as usize
        } else {
            0
        };
        let found = if from > input.len() {
            None
        } else {
            find_at(&data.compiled, input.as_str(), from)
                .filter(|m| !data.flags.contains('y') || m.start == from)
        };
        if uses_last_index {
            let next = found.as_ref().map_or(0, |m| m.end);
            self.put(this, PropertyKey::from("lastIndex"), JsValue::Number(next as f64))?;
        }
        Ok(found)
    }

    /// Match array with `index`, `input` and `groups`.
    pub(crate) fn match_to_array(&self, m: &RegexMatch, input: &JsString) -> JsValue {
        let values = m
            .groups
            .iter()
            .map(|g| g.clone().map_or(JsValue::Undefined, JsValue::from))
            .collect();
        let array = self.create_array(values);
        if let JsValue::Object(obj) = &array {
            let groups = if m.has_names() {
                let groups = JsObject::from_data(ObjectData::with_proto(None));
                for (name, value) in m.names.iter().zip(&m.groups) {
                    if let Some(name) = name {
                        groups.borrow_mut().insert_value(
                            name.as_str(),
                            value.clone().map_or(JsValue::Undefined, JsValue::from),
                        );
                    }
                }
                JsValue::Object(groups)
            } else {
                JsValue::Undefined
            };
            let mut data = obj.borrow_mut();
            data.insert_value("index", JsValue::Number(m.start as f64));
            data.insert_value("input", JsValue::String(input.clone()));
            data.insert_value("groups", groups);
        }
        array
    }
}

fn init_regexp(obj: &JsObject, data: Rc<RegexData>) {
    let mut target = obj.borrow_mut();
    target.class_name = "RegExp".to_string();
    target.regex = Some(data);
    target.insert_property(
        "lastIndex".into(),
        PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translates_ascii_classes() {
        assert_eq!(translate_pattern(r"\d+\w"), "[0-9]+[0-9A-Za-z_]");
        assert_eq!(translate_pattern(r"[\d.]"), "[0-9.]");
        assert_eq!(translate_pattern(r"(?<year>\d{4})"), "(?P<year>[0-9]{4})");
        assert_eq!(translate_pattern(r"a\/b"), "a/b");
    }

    #[test]
    fn rejects_bad_flags_and_patterns() {
        assert!(compile_regex("a", "gg").is_err());
        assert!(compile_regex("a", "x").is_err());
        assert!(compile_regex("(a", "").unwrap_err().starts_with("Invalid regular expression: /(a/"));
        assert!(compile_regex("a", "gimsuy").is_ok());
    }

    #[test]
    fn matches_report_utf16_positions() {
        let re = compile_regex("b", "").unwrap();
        let m = find_at(&re, "😀ab", 0).unwrap();
        assert_eq!((m.start, m.end), (3, 4));
        assert_eq!(byte_offset("😀ab", 2), 4);
    }

    #[test]
    fn replacement_patterns() {
        let re = compile_regex(r"(\w+) (?<last>\w+)", "").unwrap();
        let m = find_at(&re, "john smith", 0).unwrap();
        assert_eq!(expand_replacement("$2, $1 ($<last>) $$ $&", &m, "", ""), "smith, john (smith) $ john smith");
    }
}
