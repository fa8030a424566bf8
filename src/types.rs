use std::borrow::Borrow;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub use crate::interpreter::types::JsObject;

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    Object(JsObject),
}

/// Immutable shared string. Lengths and indices are counted in UTF-16 code units, the way
/// guest code observes them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<str>);

impl JsString {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self(Rc::from(s))
    }

    pub fn from_utf16(units: &[u16]) -> Self {
        Self::from(String::from_utf16_lossy(units))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        if self.0.is_ascii() {
            self.0.len()
        } else {
            self.0.encode_utf16().count()
        }
    }

    pub fn to_utf16(&self) -> Vec<u16> {
        self.0.encode_utf16().collect()
    }

    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let units = self.to_utf16();
        let needle = search.to_utf16();
        if needle.is_empty() {
            return if from <= units.len() { Some(from) } else { None };
        }
        if from + needle.len() > units.len() {
            return None;
        }
        (from..=(units.len() - needle.len())).find(|&i| units[i..i + needle.len()] == needle[..])
    }

    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let units = self.to_utf16();
        let needle = search.to_utf16();
        if needle.is_empty() {
            return Some(from.min(units.len()));
        }
        if needle.len() > units.len() {
            return None;
        }
        let max_start = from.min(units.len() - needle.len());
        (0..=max_start)
            .rev()
            .find(|&i| units[i..i + needle.len()] == needle[..])
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        if self.0.is_ascii() {
            let s = start.min(self.0.len());
            let e = end.min(self.0.len());
            return if s >= e {
                JsString::from_str("")
            } else {
                JsString::from_str(&self.0[s..e])
            };
        }
        let units = self.to_utf16();
        let s = start.min(units.len());
        let e = end.min(units.len());
        if s >= e {
            return JsString::from_str("");
        }
        JsString::from_utf16(&units[s..e])
    }

    /// Canonical array index (`"0"`, `"17"`, never `"01"`).
    pub fn as_index(&self) -> Option<usize> {
        let s = self.as_str();
        if s.is_empty() || s.len() > 10 || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u64>()
            .ok()
            .filter(|&n| n < u32::MAX as u64)
            .map(|n| n as usize)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Default for JsString {
    fn default() -> Self {
        Self::from_str("")
    }
}

impl Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        Self(Rc::from(s))
    }
}

thread_local! {
    static NEXT_SYMBOL_ID: Cell<u64> = const { Cell::new(WellKnownSymbol::COUNT + 1) };
}

/// Symbols compare by identity; the description is only for display.
#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl JsSymbol {
    pub fn new(description: Option<JsString>) -> Self {
        let id = NEXT_SYMBOL_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self { id, description }
    }

    pub fn well_known(symbol: WellKnownSymbol) -> Self {
        Self {
            id: symbol as u64,
            description: Some(JsString::from(format!("Symbol.{}", symbol.name()))),
        }
    }

    pub fn descriptive_string(&self) -> String {
        match &self.description {
            Some(desc) => format!("Symbol({desc})"),
            None => "Symbol()".to_string(),
        }
    }
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellKnownSymbol {
    Iterator = 1,
    AsyncIterator,
    HasInstance,
    ToPrimitive,
    ToStringTag,
}

impl WellKnownSymbol {
    const COUNT: u64 = 5;

    pub const ALL: [WellKnownSymbol; 5] = [
        WellKnownSymbol::Iterator,
        WellKnownSymbol::AsyncIterator,
        WellKnownSymbol::HasInstance,
        WellKnownSymbol::ToPrimitive,
        WellKnownSymbol::ToStringTag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WellKnownSymbol::Iterator => "iterator",
            WellKnownSymbol::AsyncIterator => "asyncIterator",
            WellKnownSymbol::HasInstance => "hasInstance",
            WellKnownSymbol::ToPrimitive => "toPrimitive",
            WellKnownSymbol::ToStringTag => "toStringTag",
        }
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, JsValue::Symbol(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, JsValue::Number(n) if n.is_nan())
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_js_string(&self) -> Option<&JsString> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Identity for objects and symbols, `SameValue` for primitives.
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
            _ => self.strict_equals(other),
        }
    }

    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(*a, *b),
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
            _ => self.strict_equals(other),
        }
    }
}

/// Host-side equality is `SameValue`: `NaN` equals itself and `0` differs from `-0`.
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        let n = to_int32(x);
        f64::from(!n)
    }

    pub fn exponentiate(base: f64, exp: f64) -> f64 {
        if exp.is_nan() || ((base == 1.0 || base == -1.0) && exp.is_infinite()) {
            return f64::NAN;
        }
        base.powf(exp)
    }

    pub fn remainder(x: f64, y: f64) -> f64 {
        x % y
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_uint32(x).wrapping_shr(shift))
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    pub fn equal(x: f64, y: f64) -> bool {
        if x.is_nan() || y.is_nan() {
            return false;
        }
        x == y
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    /// `Number.prototype.toString(radix)` for radix other than 10.
    pub fn to_string_radix(x: f64, radix: u32) -> String {
        if radix == 10 || !x.is_finite() {
            return to_string(x);
        }
        let negative = x < 0.0;
        let mut int_part = x.abs().trunc();
        let mut frac = x.abs() - int_part;
        let mut digits = Vec::new();
        if int_part == 0.0 {
            digits.push('0');
        }
        while int_part >= 1.0 {
            let d = (int_part % radix as f64) as u32;
            digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
            int_part = (int_part / radix as f64).trunc();
        }
        digits.reverse();
        let mut out: String = digits.into_iter().collect();
        if frac > 0.0 {
            out.push('.');
            let mut count = 0;
            while frac > 0.0 && count < 52 {
                frac *= radix as f64;
                let d = frac.trunc() as u32;
                out.push(std::char::from_digit(d, radix).unwrap_or('0'));
                frac -= d as f64;
                count += 1;
            }
        }
        if negative { format!("-{out}") } else { out }
    }

    pub fn to_int32(x: f64) -> i32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        (x.trunc() as i64 as u32) as i32
    }

    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        x.trunc() as i64 as u32
    }

    pub fn to_integer_or_infinity(x: f64) -> f64 {
        if x.is_nan() || x == 0.0 {
            return 0.0;
        }
        if x.is_infinite() {
            return x;
        }
        x.trunc()
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => write!(f, "{}", s.descriptive_string()),
            JsValue::Object(o) => write!(f, "{}", o.debug_summary()),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_index_of() {
        let s = JsString::from_str("hello world");
        let search = JsString::from_str("world");
        assert_eq!(s.index_of(&search, 0), Some(6));
        assert_eq!(s.index_of(&search, 7), None);

        let empty = JsString::from_str("");
        assert_eq!(s.index_of(&empty, 5), Some(5));
    }

    #[test]
    fn js_string_last_index_of() {
        let s = JsString::from_str("abcabc");
        let search = JsString::from_str("abc");
        assert_eq!(s.last_index_of(&search, 5), Some(3));
        assert_eq!(s.last_index_of(&search, 2), Some(0));
    }

    #[test]
    fn js_string_counts_utf16_units() {
        let s = JsString::from_str("a😀b");
        assert_eq!(s.len(), 4);
        assert_eq!(s.slice_utf16(1, 3).as_str(), "😀");
        assert_eq!(s.slice_utf16(3, 4).as_str(), "b");
    }

    #[test]
    fn canonical_indices() {
        assert_eq!(JsString::from_str("0").as_index(), Some(0));
        assert_eq!(JsString::from_str("42").as_index(), Some(42));
        assert_eq!(JsString::from_str("042").as_index(), None);
        assert_eq!(JsString::from_str("-1").as_index(), None);
        assert_eq!(JsString::from_str("length").as_index(), None);
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = JsSymbol::new(Some("x".into()));
        let b = JsSymbol::new(Some("x".into()));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(
            JsSymbol::well_known(WellKnownSymbol::Iterator),
            JsSymbol::well_known(WellKnownSymbol::Iterator)
        );
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
    }

    #[test]
    fn number_radix_strings() {
        assert_eq!(number_ops::to_string_radix(255.0, 16), "ff");
        assert_eq!(number_ops::to_string_radix(-5.0, 2), "-101");
        assert_eq!(number_ops::to_string_radix(0.5, 2), "0.1");
    }

    #[test]
    fn number_same_value() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value_zero(0.0, -0.0));
    }

    #[test]
    fn to_int32_basics() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(f64::INFINITY), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(4294967296.0 + 5.0), 5);
    }

    #[test]
    fn bitwise_and_shift_ops() {
        assert_eq!(number_ops::bitwise_and(15.0, 9.0), 9.0);
        assert_eq!(number_ops::bitwise_or(15.0, 9.0), 15.0);
        assert_eq!(number_ops::bitwise_xor(15.0, 9.0), 6.0);
        assert_eq!(number_ops::bitwise_not(0.0), -1.0);
        assert_eq!(number_ops::left_shift(1.0, 4.0), 16.0);
        assert_eq!(number_ops::signed_right_shift(-16.0, 2.0), -4.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
    }

    #[test]
    fn strict_equality_of_primitives() {
        assert!(JsValue::from(1.0).strict_equals(&JsValue::from(1.0)));
        assert!(!JsValue::Number(f64::NAN).strict_equals(&JsValue::Number(f64::NAN)));
        assert!(JsValue::Number(f64::NAN).same_value(&JsValue::Number(f64::NAN)));
        assert!(!JsValue::from("1").strict_equals(&JsValue::from(1.0)));
    }

    #[test]
    fn display_values() {
        assert_eq!(format!("{}", JsValue::Undefined), "undefined");
        assert_eq!(format!("{}", JsValue::Null), "null");
        assert_eq!(format!("{}", JsValue::Boolean(true)), "true");
        assert_eq!(format!("{}", JsValue::Number(42.0)), "42");
        assert_eq!(format!("{}", JsValue::from("hi")), "hi");
    }
}
