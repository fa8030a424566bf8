use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::EvalError;
use crate::types::JsValue;

const URI_RESERVED: &str = ";/?:@&=+$,#";
const URI_UNESCAPED_MARKS: &str = "-_.!~*'()";

fn is_uri_unescaped(c: char) -> bool {
    c.is_ascii_alphanumeric() || URI_UNESCAPED_MARKS.contains(c)
}

fn trim_start_ws(s: &str) -> &str {
    s.trim_start_matches(super::string::is_ecma_whitespace)
}

pub(crate) fn parse_int(input: &str, radix: i32) -> f64 {
    let s = trim_start_ws(input);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut radix = radix;
    let mut digits = s;
    if radix == 0 || radix == 16 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            digits = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let mut result = 0.0;
    let mut found = false;
    for ch in digits.chars() {
        let Some(d) = ch.to_digit(radix as u32) else {
            break;
        };
        found = true;
        result = result * radix as f64 + d as f64;
    }
    if !found {
        return f64::NAN;
    }
    if negative { -result } else { result }
}

pub(crate) fn parse_float(input: &str) -> f64 {
    let s = trim_start_ws(input);
    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(prefix) {
            return value;
        }
    }
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut seen_digit = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        seen_digit |= frac_end > end + 1;
        end = frac_end;
    }
    if !seen_digit {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

fn encode_uri(s: &str, keep: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_uri_unescaped(c) || keep.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}

fn hex_byte(bytes: &[u8], at: usize) -> Option<u8> {
    let pair = bytes.get(at + 1..at + 3)?;
    u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

/// Decodes `%XX` runs; escapes of characters in `preserve` stay encoded.
fn decode_uri(s: &str, preserve: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let first = hex_byte(bytes, i)?;
        if first < 0x80 {
            if preserve.contains(first as char) {
                out.extend_from_slice(&bytes[i..i + 3]);
            } else {
                out.push(first);
            }
            i += 3;
            continue;
        }
        let width = match first {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return None,
        };
        let mut sequence = vec![first];
        for k in 1..width {
            let at = i + 3 * k;
            if bytes.get(at) != Some(&b'%') {
                return None;
            }
            sequence.push(hex_byte(bytes, at)?);
        }
        out.extend_from_slice(std::str::from_utf8(&sequence).ok()?.as_bytes());
        i += 3 * width;
    }
    String::from_utf8(out).ok()
}

fn escape(s: &str) -> String {
    let mut out = String::new();
    for unit in s.encode_utf16() {
        match char::from_u32(unit as u32) {
            Some(c) if c.is_ascii_alphanumeric() || "@*_+-./".contains(c) => out.push(c),
            _ if unit <= 0xFF => out.push_str(&format!("%{unit:02X}")),
            _ => out.push_str(&format!("%u{unit:04X}")),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let units: Vec<u16> = s.encode_utf16().collect();
    let hex = |range: &[u16]| {
        let text = String::from_utf16(range).ok()?;
        u16::from_str_radix(&text, 16).ok().filter(|_| text.chars().all(|c| c.is_ascii_hexdigit()))
    };
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        if units[i] == b'%' as u16 {
            if units.get(i + 1) == Some(&(b'u' as u16))
                && let Some(code) = units.get(i + 2..i + 6).and_then(hex)
            {
                out.push(code);
                i += 6;
                continue;
            }
            if let Some(code) = units.get(i + 1..i + 3).and_then(hex) {
                out.push(code);
                i += 3;
                continue;
            }
        }
        out.push(units[i]);
        i += 1;
    }
    String::from_utf16_lossy(&out)
}

impl Interpreter {
    fn uri_error(&self) -> EvalError {
        EvalError::Throw(JsValue::Object(self.create_error("URIError", "URI malformed")))
    }

    pub(crate) fn setup_global_functions(&mut self) {
        let table = vec![
            method("parseInt", 2, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                let radix = crate::types::number_ops::to_int32(interp.to_number(&arg(args, 1))?);
                Ok(JsValue::Number(parse_int(s.as_str(), radix)))
            }),
            method("parseFloat", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                Ok(JsValue::Number(parse_float(s.as_str())))
            }),
            method("isNaN", 1, |interp, _, args| {
                Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
            }),
            method("isFinite", 1, |interp, _, args| {
                Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
            }),
            method("encodeURI", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                Ok(JsValue::from(encode_uri(s.as_str(), URI_RESERVED)))
            }),
            method("encodeURIComponent", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                Ok(JsValue::from(encode_uri(s.as_str(), "")))
            }),
            method("decodeURI", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                decode_uri(s.as_str(), URI_RESERVED)
                    .map(JsValue::from)
                    .ok_or_else(|| interp.uri_error())
            }),
            method("decodeURIComponent", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                decode_uri(s.as_str(), "").map(JsValue::from).ok_or_else(|| interp.uri_error())
            }),
            method("escape", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                Ok(JsValue::from(escape(s.as_str())))
            }),
            method("unescape", 1, |interp, _, args| {
                let s = interp.to_js_string(&arg(args, 0))?;
                Ok(JsValue::from(unescape(s.as_str())))
            }),
        ];
        let holder = self.create_object();
        self.install_methods(&holder, table);
        let number = self
            .realm
            .globals()
            .iter()
            .find(|(name, _)| name.as_str() == "Number")
            .and_then(|(_, value)| value.as_object().cloned());
        let installed: Vec<_> = holder
            .borrow()
            .property_order
            .iter()
            .filter_map(|name| holder.borrow().get_property_value(name.as_str()).map(|v| (name.clone(), v)))
            .collect();
        for (name, value) in installed {
            if let Some(number) = &number
                && matches!(name.as_str(), "parseInt" | "parseFloat")
            {
                number.borrow_mut().insert_builtin(name.clone(), value.clone());
            }
            self.realm.define_global(name.as_str(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsObject;
    use crate::interpreter::EvalOptions;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> String {
        let mut interp = Interpreter::with_options(
            &JsObject::new(),
            EvalOptions::default().with_default_parser().with_max_steps(100_000),
        );
        interp.evaluate(src).unwrap().to_string()
    }

    #[test]
    fn integers_parse_prefixes() {
        assert_eq!(parse_int("  42px", 0), 42.0);
        assert_eq!(parse_int("0x1F", 0), 31.0);
        assert_eq!(parse_int("-101", 2), -5.0);
        assert_eq!(parse_int("z", 36), 35.0);
        assert!(parse_int("abc", 10).is_nan());
        assert!(parse_int("1", 37).is_nan());
    }

    #[test]
    fn floats_take_longest_prefix() {
        assert_eq!(parse_float("3.14abc"), 3.14);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("1e3x"), 1000.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("-Infinityx"), f64::NEG_INFINITY);
        assert!(parse_float("e5").is_nan());
    }

    #[test]
    fn uri_round_trip() {
        assert_eq!(encode_uri("a b/é", URI_RESERVED), "a%20b/%C3%A9");
        assert_eq!(encode_uri("a b/é", ""), "a%20b%2F%C3%A9");
        assert_eq!(decode_uri("a%20b%2F%C3%A9", "").as_deref(), Some("a b/é"));
        assert_eq!(decode_uri("%2F%20", URI_RESERVED).as_deref(), Some("%2F "));
        assert_eq!(decode_uri("%E0%A4%A", ""), None);
    }

    #[test]
    fn annex_b_escape() {
        assert_eq!(escape("a b\u{0100}"), "a%20b%u0100");
        assert_eq!(unescape("a%20b%u0100%zz"), "a b\u{0100}%zz");
    }

    #[test]
    fn globals_from_guest() {
        assert_eq!(eval("parseInt('08') + parseFloat('1.5e1')"), "23");
        assert_eq!(eval("isNaN('x') && isFinite('12')"), "true");
        assert_eq!(eval("Number.parseInt === parseInt"), "true");
        assert_eq!(eval("try { decodeURIComponent('%') } catch (e) { e.name }"), "URIError");
    }
}
