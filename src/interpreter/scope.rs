use super::types::{JsObject, LexFrame, LexKind, ObjectData, PropertyKey};
use crate::types::JsString;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// Built-in registry; its data object stands in for the host global.
    Super,
    /// Fresh object whose prototype is the caller's `root_context`.
    Root,
    /// The caller's bindings object.
    Global,
    Function,
    Block,
    With,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexRecord {
    pub initialized: bool,
    pub kind: LexKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    /// The declaration's own initializing write, allowed inside the dead zone.
    Initialize,
}

/// Resolution reached a `let`/`const` binding before its declaration ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uninitialized(pub JsString);

pub struct Scope {
    pub data: JsObject,
    pub parent: Option<ScopeRef>,
    pub kind: ScopeKind,
    pub label_stack: Vec<JsString>,
    pub lex_declared: Option<FxHashMap<JsString, LexRecord>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeRef>, data: JsObject) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            data,
            parent,
            kind,
            label_stack: Vec::new(),
            lex_declared: None,
        }))
    }

    /// A scope with a fresh data object and fresh dead-zone records for every name in `frame`.
    pub fn with_frame(kind: ScopeKind, parent: ScopeRef, frame: &LexFrame) -> ScopeRef {
        let scope = Scope::new(kind, Some(parent), JsObject::from_data(ObjectData::new()));
        scope.borrow_mut().declare_frame(frame);
        scope
    }

    pub fn declare_frame(&mut self, frame: &LexFrame) {
        if frame.is_empty() {
            return;
        }
        let records = self.lex_declared.get_or_insert_with(FxHashMap::default);
        for (name, kind) in &frame.names {
            records.insert(
                name.clone(),
                LexRecord {
                    initialized: false,
                    kind: *kind,
                },
            );
        }
    }

    pub fn lex_record(&self, name: &str) -> Option<LexRecord> {
        self.lex_declared.as_ref()?.get(name).copied()
    }

    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(record) = self.lex_declared.as_mut().and_then(|r| r.get_mut(name)) {
            record.initialized = true;
        }
    }

    fn holds(&self, name: &str) -> bool {
        let key = PropertyKey::from(name);
        match self.kind {
            ScopeKind::With | ScopeKind::Root => self.data.has_property(&key),
            _ => self.data.has_own_property(&key),
        }
    }

    /// Copy of a loop-body scope for the next iteration: same parent, same records, own values
    /// copied so closures from the previous iteration keep theirs.
    pub fn fork(scope: &ScopeRef) -> ScopeRef {
        let current = scope.borrow();
        let data = ObjectData::new();
        let copy = JsObject::from_data(data);
        {
            let source = current.data.borrow();
            let mut target = copy.borrow_mut();
            for key in &source.property_order {
                if let Some(desc) = source.properties.get(key) {
                    target.insert_property(key.clone(), desc.clone());
                }
            }
        }
        Rc::new(RefCell::new(Scope {
            data: copy,
            parent: current.parent.clone(),
            kind: current.kind,
            label_stack: current.label_stack.clone(),
            lex_declared: current.lex_declared.clone(),
        }))
    }
}

/// Finds the scope that binds `name`, walking from `start` to the root. Unbound names resolve to
/// the global scope so reads can report them and loose writes can create them there.
pub fn resolve(start: &ScopeRef, name: &str, access: Access) -> Result<ScopeRef, Uninitialized> {
    let mut current = Some(start.clone());
    let mut global: Option<ScopeRef> = None;
    let mut last = start.clone();
    while let Some(scope) = current {
        let next = {
            let s = scope.borrow();
            if let Some(record) = s.lex_record(name) {
                if record.initialized || access == Access::Initialize {
                    return Ok(scope.clone());
                }
                return Err(Uninitialized(JsString::from_str(name)));
            }
            if s.holds(name) {
                return Ok(scope.clone());
            }
            if s.kind == ScopeKind::Global && global.is_none() {
                global = Some(scope.clone());
            }
            s.parent.clone()
        };
        last = scope;
        current = next;
    }
    Ok(global.unwrap_or(last))
}

/// Nearest enclosing scope of `kind`.
pub fn nearest(start: &ScopeRef, kind: ScopeKind) -> Option<ScopeRef> {
    let mut current = Some(start.clone());
    while let Some(scope) = current {
        if scope.borrow().kind == kind {
            return Some(scope);
        }
        current = scope.borrow().parent.clone();
    }
    None
}

/// Nearest function or global scope, where `var` declarations land.
pub fn variable_scope(start: &ScopeRef) -> ScopeRef {
    let mut current = start.clone();
    loop {
        let parent = {
            let s = current.borrow();
            if matches!(s.kind, ScopeKind::Function | ScopeKind::Global) {
                return current.clone();
            }
            s.parent.clone()
        };
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsValue;

    fn frame(names: &[(&str, LexKind)]) -> LexFrame {
        LexFrame {
            names: names.iter().map(|(n, k)| (JsString::from_str(n), *k)).collect(),
        }
    }

    fn chain() -> (ScopeRef, ScopeRef) {
        let global_data = JsObject::new();
        global_data.set("g", 1.0);
        let global = Scope::new(ScopeKind::Global, None, global_data);
        let block = Scope::with_frame(
            ScopeKind::Block,
            global.clone(),
            &frame(&[("x", LexKind::Let)]),
        );
        (global, block)
    }

    #[test]
    fn unbound_names_fall_back_to_global() {
        let (global, block) = chain();
        let found = resolve(&block, "missing", Access::Read).unwrap();
        assert!(Rc::ptr_eq(&found, &global));
        let found = resolve(&block, "g", Access::Read).unwrap();
        assert!(Rc::ptr_eq(&found, &global));
    }

    #[test]
    fn dead_zone_blocks_reads_but_not_initialization() {
        let (_, block) = chain();
        assert_eq!(
            resolve(&block, "x", Access::Read).err(),
            Some(Uninitialized(JsString::from_str("x")))
        );
        assert!(resolve(&block, "x", Access::Write).is_err());
        let found = resolve(&block, "x", Access::Initialize).unwrap();
        assert!(Rc::ptr_eq(&found, &block));
        block.borrow_mut().mark_initialized("x");
        assert!(resolve(&block, "x", Access::Read).is_ok());
    }

    #[test]
    fn block_data_without_record_still_binds() {
        let (_, block) = chain();
        block.borrow().data.set("caught", JsValue::Null);
        let found = resolve(&block, "caught", Access::Read).unwrap();
        assert!(Rc::ptr_eq(&found, &block));
    }

    #[test]
    fn fork_copies_values_and_records() {
        let (_, block) = chain();
        block.borrow_mut().mark_initialized("x");
        block.borrow().data.set("x", 1.0);
        let copy = Scope::fork(&block);
        copy.borrow().data.set("x", 2.0);
        assert_eq!(block.borrow().data.get("x").as_number(), Some(1.0));
        assert_eq!(copy.borrow().lex_record("x").map(|r| r.initialized), Some(true));
    }

    #[test]
    fn with_scope_consults_prototypes() {
        let (global, _) = chain();
        let proto = JsObject::new();
        proto.set("inherited", 1.0);
        let target = JsObject::from_data(ObjectData::with_proto(Some(proto)));
        let with = Scope::new(ScopeKind::With, Some(global), target);
        let found = resolve(&with, "inherited", Access::Read).unwrap();
        assert!(Rc::ptr_eq(&found, &with));
        assert!(Rc::ptr_eq(&variable_scope(&with), &nearest(&with, ScopeKind::Global).unwrap()));
    }
}
