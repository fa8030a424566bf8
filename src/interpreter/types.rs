use super::Interpreter;
use super::error::EvalError;
use super::scope::ScopeRef;
use super::signal::Closure;
use crate::ast::Position;
use crate::types::{JsString, JsSymbol, JsValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError>>;

/// Binds one parameter or declaration pattern against a value in the current scope.
pub type Binder = Rc<dyn Fn(&mut Interpreter, JsValue) -> Result<(), EvalError>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        matches!(self, PropertyKey::String(s) if s.as_str() == name)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(s: JsSymbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{}", s.descriptive_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(get: Option<JsValue>, set: Option<JsValue>, enumerable: bool) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get.unwrap_or(JsValue::Undefined)),
            set: Some(set.unwrap_or(JsValue::Undefined)),
            enumerable: Some(enumerable),
            configurable: Some(true),
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.writable == Some(true)
    }

    pub fn is_enumerable(&self) -> bool {
        self.enumerable == Some(true)
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable == Some(true)
    }

    /// Fills absent attributes with the defaults `Object.defineProperty` uses for a new property.
    fn completed(mut self) -> Self {
        if self.is_accessor_descriptor() {
            self.get.get_or_insert(JsValue::Undefined);
            self.set.get_or_insert(JsValue::Undefined);
        } else {
            self.value.get_or_insert(JsValue::Undefined);
            self.writable.get_or_insert(false);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
        self
    }

    /// Overlays the attributes present in `update` onto `self`.
    fn merged(mut self, update: PropertyDescriptor) -> Self {
        if update.is_accessor_descriptor() && self.is_data_descriptor() {
            self.value = None;
            self.writable = None;
        } else if update.is_data_descriptor() && self.is_accessor_descriptor() {
            self.get = None;
            self.set = None;
        }
        if update.value.is_some() {
            self.value = update.value;
        }
        if update.writable.is_some() {
            self.writable = update.writable;
        }
        if update.get.is_some() {
            self.get = update.get;
        }
        if update.set.is_some() {
            self.set = update.set;
        }
        if update.enumerable.is_some() {
            self.enumerable = update.enumerable;
        }
        if update.configurable.is_some() {
            self.configurable = update.configurable;
        }
        self.completed()
    }
}

/// A compiled function body plus everything a call needs, built once per function node.
pub struct FunctionTemplate {
    pub name: JsString,
    /// Whether the call scope binds the function's own name to itself.
    pub self_binding: bool,
    pub params: Vec<(Binder, bool)>,
    pub body: Closure,
    pub hoisted: Rc<Hoisted>,
    pub is_arrow: bool,
    pub length: usize,
    pub source: Option<Rc<str>>,
    pub position: Option<Position>,
}

/// Declarations collected from one function or program body.
#[derive(Default)]
pub struct Hoisted {
    pub vars: Vec<JsString>,
    pub funcs: Vec<(JsString, Rc<FunctionTemplate>)>,
    pub lexical: LexFrame,
    pub uses_arguments: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexKind {
    Let,
    Const,
}

/// Lexical names declared directly in one block-like construct.
#[derive(Clone, Debug, Default)]
pub struct LexFrame {
    pub names: Vec<(JsString, LexKind)>,
}

impl LexFrame {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|(n, _)| n.as_str() == name)
    }
}

pub struct UserFunction {
    pub template: Rc<FunctionTemplate>,
    pub scope: ScopeRef,
    /// `this` captured by an arrow function at creation.
    pub this_value: Option<JsValue>,
}

pub struct ClassField {
    pub key: PropertyKey,
    pub init: Option<Closure>,
    pub is_arrow: bool,
}

pub struct ClassFunction {
    pub name: JsString,
    pub constructor: Option<JsObject>,
    pub parent: Option<JsObject>,
    pub fields: Vec<ClassField>,
    pub scope: ScopeRef,
    pub source: Option<Rc<str>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Eval,
    Function,
}

#[derive(Clone)]
pub enum JsFunction {
    User(Rc<UserFunction>),
    /// Name, arity, body, and whether `new` is allowed.
    Native(String, usize, NativeFn, bool),
    Class(Rc<ClassFunction>),
    Bound {
        target: JsObject,
        this: JsValue,
        args: Vec<JsValue>,
    },
    Capability(Capability),
}

impl JsFunction {
    pub fn native(
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError> + 'static,
    ) -> Self {
        JsFunction::Native(name.to_string(), arity, Rc::new(f), false)
    }

    pub fn constructor(
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, EvalError> + 'static,
    ) -> Self {
        JsFunction::Native(name.to_string(), arity, Rc::new(f), true)
    }

    pub fn name(&self) -> String {
        match self {
            JsFunction::User(f) => f.template.name.to_string(),
            JsFunction::Native(name, ..) => name.clone(),
            JsFunction::Class(c) => c.name.to_string(),
            JsFunction::Bound { target, .. } => {
                let inner = target.borrow().callable.as_ref().map(|f| f.name());
                format!("bound {}", inner.unwrap_or_default())
            }
            JsFunction::Capability(Capability::Eval) => "eval".to_string(),
            JsFunction::Capability(Capability::Function) => "Function".to_string(),
        }
    }

    pub fn length(&self) -> usize {
        match self {
            JsFunction::User(f) => f.template.length,
            JsFunction::Native(_, arity, ..) => *arity,
            JsFunction::Class(c) => c
                .constructor
                .as_ref()
                .and_then(|ctor| ctor.borrow().callable.as_ref().map(|f| f.length()))
                .unwrap_or(0),
            JsFunction::Bound { target, args, .. } => {
                let inner = target.borrow().callable.as_ref().map_or(0, |f| f.length());
                inner.saturating_sub(args.len())
            }
            JsFunction::Capability(_) => 1,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            JsFunction::User(f) => !f.template.is_arrow,
            JsFunction::Native(.., ctor) => *ctor,
            JsFunction::Class(_) => true,
            JsFunction::Bound { target, .. } => target.is_constructor(),
            JsFunction::Capability(cap) => *cap == Capability::Function,
        }
    }

    pub fn source_text(&self) -> String {
        let source = match self {
            JsFunction::User(f) => f.template.source.clone(),
            JsFunction::Class(c) => c.source.clone(),
            _ => None,
        };
        match source {
            Some(text) => text.to_string(),
            None => format!("function {}() {{ [native code] }}", self.name()),
        }
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsFunction::User(func) => write!(f, "JsFunction::User({:?})", func.template.name),
            JsFunction::Native(name, arity, ..) => {
                write!(f, "JsFunction::Native({name:?}, {arity})")
            }
            JsFunction::Class(c) => write!(f, "JsFunction::Class({:?})", c.name),
            JsFunction::Bound { .. } => write!(f, "JsFunction::Bound"),
            JsFunction::Capability(cap) => write!(f, "JsFunction::Capability({cap:?})"),
        }
    }
}

pub struct RegexData {
    pub source: String,
    pub flags: String,
    pub compiled: regex::Regex,
}

pub struct ObjectData {
    pub properties: FxHashMap<JsString, PropertyDescriptor>,
    pub property_order: Vec<JsString>,
    pub symbols: Vec<(JsSymbol, PropertyDescriptor)>,
    pub prototype: Option<JsObject>,
    pub callable: Option<JsFunction>,
    pub array_elements: Option<Vec<JsValue>>,
    pub class_name: String,
    pub extensible: bool,
    /// Set by `Object.freeze`; makes array elements and `length` read-only too.
    pub frozen: bool,
    pub primitive_value: Option<JsValue>,
    pub map_data: Option<Vec<Option<(JsValue, JsValue)>>>,
    pub set_data: Option<Vec<Option<JsValue>>>,
    pub regex: Option<Rc<RegexData>>,
}

/// Indices past this distance from the end of an array are stored as plain properties.
const MAX_ARRAY_GAP: usize = 1 << 20;

impl Default for ObjectData {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectData {
    pub fn new() -> Self {
        Self {
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            symbols: Vec::new(),
            prototype: None,
            callable: None,
            array_elements: None,
            class_name: "Object".to_string(),
            extensible: true,
            frozen: false,
            primitive_value: None,
            map_data: None,
            set_data: None,
            regex: None,
        }
    }

    pub fn with_proto(prototype: Option<JsObject>) -> Self {
        Self {
            prototype,
            ..Self::new()
        }
    }

    fn string_primitive(&self) -> Option<&JsString> {
        match &self.primitive_value {
            Some(JsValue::String(s)) if self.class_name == "String" => Some(s),
            _ => None,
        }
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let name = match key {
            PropertyKey::Symbol(sym) => {
                return self
                    .symbols
                    .iter()
                    .find(|(s, _)| s == sym)
                    .map(|(_, d)| d.clone());
            }
            PropertyKey::String(name) => name,
        };
        if let Some(elems) = &self.array_elements {
            if name.as_str() == "length" {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(elems.len() as f64),
                    !self.frozen,
                    false,
                    false,
                ));
            }
            if let Some(idx) = name.as_index()
                && idx < elems.len()
            {
                return Some(PropertyDescriptor::data(
                    elems[idx].clone(),
                    !self.frozen,
                    true,
                    !self.frozen,
                ));
            }
        }
        if let Some(s) = self.string_primitive() {
            if name.as_str() == "length" {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(s.len() as f64),
                    false,
                    false,
                    false,
                ));
            }
            if let Some(idx) = name.as_index()
                && idx < s.len()
            {
                return Some(PropertyDescriptor::data(
                    JsValue::String(s.slice_utf16(idx, idx + 1)),
                    false,
                    true,
                    false,
                ));
            }
        }
        self.properties.get(name).cloned()
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Own value of a data property, ignoring accessors.
    pub fn get_property_value(&self, key: &str) -> Option<JsValue> {
        self.get_own_property(&PropertyKey::from(key))
            .and_then(|d| d.value)
    }

    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let name = match key {
            PropertyKey::Symbol(sym) => {
                if let Some(slot) = self.symbols.iter_mut().find(|(s, _)| *s == sym) {
                    if !slot.1.is_configurable() && !compatible(&slot.1, &desc) {
                        return false;
                    }
                    slot.1 = slot.1.clone().merged(desc);
                    return true;
                }
                if !self.extensible {
                    return false;
                }
                self.symbols.push((sym, desc.completed()));
                return true;
            }
            PropertyKey::String(name) => name,
        };
        if self.array_elements.is_some() {
            if self.frozen && (name.as_str() == "length" || name.as_index().is_some()) {
                return false;
            }
            if name.as_str() == "length" {
                if let Some(JsValue::Number(n)) = desc.value {
                    if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
                        return false;
                    }
                    self.set_length(n as usize);
                }
                return !desc.is_accessor_descriptor();
            }
            if let Some(idx) = name.as_index()
                && !self.properties.contains_key(&name)
            {
                let len = self.array_elements.as_ref().map_or(0, Vec::len);
                if desc.is_accessor_descriptor() {
                    return false;
                }
                if idx < len + MAX_ARRAY_GAP {
                    if idx >= len && !self.extensible {
                        return false;
                    }
                    let value = desc.value.unwrap_or(JsValue::Undefined);
                    self.set_element(idx, value);
                    return true;
                }
            }
        }
        if self.string_primitive().is_some()
            && (name.as_str() == "length"
                || name
                    .as_index()
                    .is_some_and(|i| self.string_primitive().is_some_and(|s| i < s.len())))
        {
            return false;
        }
        match self.properties.get(&name) {
            Some(current) => {
                if !current.is_configurable() && !compatible(current, &desc) {
                    return false;
                }
                let merged = current.clone().merged(desc);
                self.properties.insert(name, merged);
            }
            None => {
                if !self.extensible {
                    return false;
                }
                self.property_order.push(name.clone());
                self.properties.insert(name, desc.completed());
            }
        }
        true
    }

    pub fn set_element(&mut self, idx: usize, value: JsValue) {
        if let Some(elems) = &mut self.array_elements {
            if idx >= elems.len() {
                elems.resize(idx + 1, JsValue::Undefined);
            }
            elems[idx] = value;
        }
    }

    pub fn set_length(&mut self, len: usize) {
        if let Some(elems) = &mut self.array_elements {
            elems.resize(len, JsValue::Undefined);
        }
    }

    pub fn insert_value(&mut self, key: impl Into<JsString>, value: JsValue) {
        self.insert_property(key.into(), PropertyDescriptor::data_default(value));
    }

    /// Writable, configurable, non-enumerable: the shape of built-in methods.
    pub fn insert_builtin(&mut self, key: impl Into<JsString>, value: JsValue) {
        self.insert_property(key.into(), PropertyDescriptor::data(value, true, false, true));
    }

    pub fn insert_property(&mut self, key: JsString, desc: PropertyDescriptor) {
        if self.array_elements.is_some()
            && let Some(idx) = key.as_index()
            && desc.is_data_descriptor()
        {
            let len = self.array_elements.as_ref().map_or(0, Vec::len);
            if idx < len + MAX_ARRAY_GAP {
                self.set_element(idx, desc.value.unwrap_or(JsValue::Undefined));
                return;
            }
        }
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn insert_symbol(&mut self, sym: JsSymbol, desc: PropertyDescriptor) {
        if let Some(slot) = self.symbols.iter_mut().find(|(s, _)| *s == sym) {
            slot.1 = desc;
        } else {
            self.symbols.push((sym, desc));
        }
    }

    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match key {
            PropertyKey::Symbol(sym) => {
                if let Some(pos) = self.symbols.iter().position(|(s, _)| s == sym) {
                    if !self.symbols[pos].1.is_configurable() {
                        return false;
                    }
                    self.symbols.remove(pos);
                }
                true
            }
            PropertyKey::String(name) => {
                let frozen = self.frozen;
                if let Some(elems) = &mut self.array_elements {
                    if name.as_str() == "length" || (frozen && name.as_index().is_some()) {
                        return false;
                    }
                    if let Some(idx) = name.as_index()
                        && idx < elems.len()
                    {
                        if idx + 1 == elems.len() {
                            elems.pop();
                        } else {
                            elems[idx] = JsValue::Undefined;
                        }
                        return true;
                    }
                }
                if self.string_primitive().is_some() && self.has_own_property(key) {
                    return false;
                }
                match self.properties.get(name) {
                    Some(desc) if !desc.is_configurable() => false,
                    Some(_) => {
                        self.properties.remove(name);
                        self.property_order.retain(|k| k != name);
                        true
                    }
                    None => true,
                }
            }
        }
    }

    /// Own keys in property-enumeration order: integer indices ascending, then strings in
    /// insertion order, then symbols.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::new();
        let mut indexed: Vec<(usize, &JsString)> = Vec::new();
        if let Some(elems) = &self.array_elements {
            keys.extend((0..elems.len()).map(|i| PropertyKey::from(JsString::from(i.to_string()))));
        }
        if let Some(s) = self.string_primitive() {
            keys.extend((0..s.len()).map(|i| PropertyKey::from(JsString::from(i.to_string()))));
        }
        for k in &self.property_order {
            if let Some(idx) = k.as_index() {
                indexed.push((idx, k));
            }
        }
        indexed.sort_by_key(|(i, _)| *i);
        keys.extend(indexed.into_iter().map(|(_, k)| PropertyKey::from(k.clone())));
        if self.array_elements.is_some() || self.string_primitive().is_some() {
            keys.push(PropertyKey::from("length"));
        }
        keys.extend(
            self.property_order
                .iter()
                .filter(|k| k.as_index().is_none())
                .map(|k| PropertyKey::from(k.clone())),
        );
        keys.extend(self.symbols.iter().map(|(s, _)| PropertyKey::from(s.clone())));
        keys
    }

    pub fn own_enumerable_string_keys(&self) -> Vec<JsString> {
        self.own_keys()
            .into_iter()
            .filter_map(|k| match k {
                PropertyKey::String(s) => Some(s),
                PropertyKey::Symbol(_) => None,
            })
            .filter(|k| {
                self.get_own_property(&PropertyKey::from(k.clone()))
                    .is_some_and(|d| d.is_enumerable())
            })
            .collect()
    }

    pub fn is_array(&self) -> bool {
        self.class_name == "Array" && self.array_elements.is_some()
    }
}

/// Whether `desc` may be applied to the non-configurable property `current`.
fn compatible(current: &PropertyDescriptor, desc: &PropertyDescriptor) -> bool {
    if desc.configurable == Some(true) {
        return false;
    }
    if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
        return false;
    }
    if current.is_data_descriptor() {
        if desc.is_accessor_descriptor() {
            return false;
        }
        if !current.is_writable() {
            if desc.writable == Some(true) {
                return false;
            }
            if let (Some(new), Some(old)) = (&desc.value, &current.value)
                && !new.same_value(old)
            {
                return false;
            }
        }
        return true;
    }
    if desc.is_data_descriptor() {
        return false;
    }
    let same = |a: &Option<JsValue>, b: &Option<JsValue>| match (a, b) {
        (Some(a), Some(b)) => a.same_value(b),
        _ => true,
    };
    same(&desc.get, &current.get) && same(&desc.set, &current.set)
}

/// Shared handle to a heap object. Equality is identity.
#[derive(Clone)]
pub struct JsObject(Rc<RefCell<ObjectData>>);

impl JsObject {
    /// A plain object with no prototype.
    pub fn new() -> Self {
        Self::from_data(ObjectData::new())
    }

    pub fn from_data(data: ObjectData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub fn borrow(&self) -> Ref<'_, ObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn is_callable(&self) -> bool {
        self.borrow().callable.is_some()
    }

    pub fn is_constructor(&self) -> bool {
        self.borrow()
            .callable
            .as_ref()
            .is_some_and(JsFunction::is_constructor)
    }

    pub fn is_array(&self) -> bool {
        self.borrow().is_array()
    }

    pub fn prototype(&self) -> Option<JsObject> {
        self.borrow().prototype.clone()
    }

    /// Finds `key` on this object or its prototype chain.
    pub fn lookup(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let mut current = Some(self.clone());
        let mut seen = FxHashSet::default();
        while let Some(obj) = current {
            if !seen.insert(obj.addr()) {
                return None;
            }
            if let Some(desc) = obj.borrow().get_own_property(key) {
                return Some(desc);
            }
            current = obj.prototype();
        }
        None
    }

    pub fn has_property(&self, key: &PropertyKey) -> bool {
        self.lookup(key).is_some()
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.borrow().has_own_property(key)
    }

    /// Whether `proto` appears on this object's prototype chain.
    pub fn inherits_from(&self, proto: &JsObject) -> bool {
        let mut current = self.prototype();
        let mut depth = 0;
        while let Some(obj) = current {
            if obj.ptr_eq(proto) {
                return true;
            }
            depth += 1;
            if depth > 10_000 {
                return false;
            }
            current = obj.prototype();
        }
        false
    }

    /// Enumerable string keys of this object and its prototypes, shadowed names once.
    pub fn enumerable_keys_with_proto(&self) -> Vec<JsString> {
        let mut seen = FxHashSet::default();
        let mut keys = Vec::new();
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            let data = obj.borrow();
            for k in data.own_keys() {
                let PropertyKey::String(name) = k else {
                    continue;
                };
                let enumerable = data
                    .get_own_property(&PropertyKey::from(name.clone()))
                    .is_some_and(|d| d.is_enumerable());
                if seen.insert(name.clone()) && enumerable {
                    keys.push(name);
                }
            }
            current = data.prototype.clone();
            if current.as_ref().is_some_and(|p| p.ptr_eq(self)) {
                break;
            }
        }
        keys
    }

    /// Host-side read of a data property along the prototype chain. Getters are not run.
    pub fn get(&self, key: &str) -> JsValue {
        self.lookup(&PropertyKey::from(key))
            .and_then(|d| d.value)
            .unwrap_or(JsValue::Undefined)
    }

    /// Host-side write of an own enumerable data property.
    pub fn set(&self, key: &str, value: impl Into<JsValue>) {
        self.borrow_mut().insert_value(key, value.into());
    }

    /// Own enumerable string keys, in enumeration order.
    pub fn keys(&self) -> Vec<String> {
        self.borrow()
            .own_enumerable_string_keys()
            .into_iter()
            .map(|k| k.to_string())
            .collect()
    }

    pub fn array_elements(&self) -> Option<Vec<JsValue>> {
        self.borrow().array_elements.clone()
    }

    pub(crate) fn debug_summary(&self) -> String {
        let data = self.borrow();
        if let Some(func) = &data.callable {
            return format!("[Function: {}]", func.name());
        }
        if let Some(elems) = &data.array_elements
            && data.class_name == "Array"
        {
            return format!("[Array({})]", elems.len());
        }
        format!("[object {}]", data.class_name)
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for JsObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => write!(f, "JsObject({} @ {:#x})", data.class_name, self.addr()),
            Err(_) => write!(f, "JsObject(<borrowed> @ {:#x})", self.addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(values: &[f64]) -> JsObject {
        let mut data = ObjectData::new();
        data.class_name = "Array".to_string();
        data.array_elements = Some(values.iter().map(|n| JsValue::Number(*n)).collect());
        JsObject::from_data(data)
    }

    #[test]
    fn keys_follow_enumeration_order() {
        let obj = JsObject::new();
        obj.set("b", 1.0);
        obj.set("2", 2.0);
        obj.set("a", 3.0);
        obj.set("1", 4.0);
        assert_eq!(obj.keys(), vec!["1", "2", "b", "a"]);
    }

    #[test]
    fn array_length_is_virtual() {
        let arr = array(&[1.0, 2.0, 3.0]);
        assert_eq!(arr.get("length").as_number(), Some(3.0));
        arr.borrow_mut()
            .define_own_property("length".into(), PropertyDescriptor::data_default(JsValue::Number(1.0)));
        assert_eq!(arr.array_elements().map(|e| e.len()), Some(1));
        arr.set("4", 9.0);
        assert_eq!(arr.get("length").as_number(), Some(5.0));
        assert!(arr.get("2").is_undefined());
    }

    #[test]
    fn non_configurable_properties_resist_redefinition() {
        let obj = JsObject::new();
        let frozen = PropertyDescriptor::data(JsValue::Number(1.0), false, true, false);
        assert!(obj.borrow_mut().define_own_property("x".into(), frozen));
        let change = PropertyDescriptor {
            value: Some(JsValue::Number(2.0)),
            ..Default::default()
        };
        assert!(!obj.borrow_mut().define_own_property("x".into(), change));
        assert!(!obj.borrow_mut().delete(&"x".into()));
        assert_eq!(obj.get("x").as_number(), Some(1.0));
    }

    #[test]
    fn partial_descriptors_merge() {
        let obj = JsObject::new();
        obj.set("x", 1.0);
        let hide = PropertyDescriptor {
            enumerable: Some(false),
            ..Default::default()
        };
        assert!(obj.borrow_mut().define_own_property("x".into(), hide));
        assert!(obj.keys().is_empty());
        assert_eq!(obj.get("x").as_number(), Some(1.0));
    }

    #[test]
    fn prototype_chain_lookup_and_enumeration() {
        let proto = JsObject::new();
        proto.set("inherited", true);
        let mut data = ObjectData::with_proto(Some(proto.clone()));
        data.insert_value("own", JsValue::Boolean(true));
        let obj = JsObject::from_data(data);
        assert!(obj.has_property(&"inherited".into()));
        assert!(!obj.has_own_property(&"inherited".into()));
        assert!(obj.inherits_from(&proto));
        let keys: Vec<String> = obj
            .enumerable_keys_with_proto()
            .into_iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["own", "inherited"]);
    }

    #[test]
    fn symbol_keys_live_beside_strings() {
        let obj = JsObject::new();
        let sym = JsSymbol::new(Some("tag".into()));
        obj.borrow_mut().define_own_property(
            PropertyKey::from(sym.clone()),
            PropertyDescriptor::data_default(JsValue::Number(7.0)),
        );
        assert!(obj.keys().is_empty());
        let desc = obj.lookup(&PropertyKey::from(sym)).and_then(|d| d.value);
        assert_eq!(desc.and_then(|v| v.as_number()), Some(7.0));
    }
}
