use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::EvalError;
use crate::interpreter::types::PropertyDescriptor;
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol};

impl Interpreter {
    fn this_symbol(&self, this: &JsValue, name: &str) -> Result<JsSymbol, EvalError> {
        let found = match this {
            JsValue::Symbol(s) => Some(s.clone()),
            JsValue::Object(o) => match &o.borrow().primitive_value {
                Some(JsValue::Symbol(s)) => Some(s.clone()),
                _ => None,
            },
            _ => None,
        };
        found.ok_or_else(|| {
            self.throw_type_error(&format!("Symbol.prototype.{name} requires that 'this' be a Symbol"))
        })
    }

    pub(crate) fn setup_symbol(&mut self) {
        let proto = self.realm.symbol_prototype.clone();
        proto.borrow_mut().class_name = "Symbol".to_string();
        let ctor = self.install_constructor("Symbol", 0, &proto, |interp, this, args| {
            if interp.constructing_this(this).is_some() {
                return Err(interp.throw_type_error("Symbol is not a constructor"));
            }
            let description = match arg(args, 0) {
                JsValue::Undefined => None,
                d => Some(interp.to_js_string(&d)?),
            };
            Ok(JsValue::Symbol(JsSymbol::new(description)))
        });
        for symbol in WellKnownSymbol::ALL {
            self.install_constant(&ctor, symbol.name(), JsValue::Symbol(JsSymbol::well_known(symbol)));
        }
        self.install_methods(
            &ctor,
            vec![
                method("for", 1, |interp, _, args| {
                    let key = interp.to_js_string(&arg(args, 0))?;
                    let symbol = interp
                        .realm
                        .symbol_registry
                        .entry(key.clone())
                        .or_insert_with(|| JsSymbol::new(Some(key)))
                        .clone();
                    Ok(JsValue::Symbol(symbol))
                }),
                method("keyFor", 1, |interp, _, args| {
                    let JsValue::Symbol(sym) = arg(args, 0) else {
                        return Err(interp.throw_type_error("Symbol.keyFor requires a symbol"));
                    };
                    let key = interp
                        .realm
                        .symbol_registry
                        .iter()
                        .find(|(_, registered)| **registered == sym)
                        .map(|(key, _)| key.clone());
                    Ok(key.map_or(JsValue::Undefined, JsValue::String))
                }),
            ],
        );
        self.install_methods(
            &proto,
            vec![
                method("toString", 0, |interp, this, _| {
                    let sym = interp.this_symbol(this, "toString")?;
                    Ok(JsValue::from(sym.descriptive_string()))
                }),
                method("valueOf", 0, |interp, this, _| {
                    interp.this_symbol(this, "valueOf").map(JsValue::Symbol)
                }),
            ],
        );
        self.install_getter(&proto, "description", |interp, this, _| {
            let sym = interp.this_symbol(this, "description")?;
            Ok(sym.description.map_or(JsValue::Undefined, JsValue::String))
        });
        proto.borrow_mut().insert_symbol(
            JsSymbol::well_known(WellKnownSymbol::ToStringTag),
            PropertyDescriptor::data(JsValue::String(JsString::from("Symbol")), false, false, true),
        );
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
    fn symbols_are_unique_unless_registered() {
        assert_eq!(eval("Symbol('a') === Symbol('a')"), "false");
        assert_eq!(eval("Symbol.for('a') === Symbol.for('a')"), "true");
        assert_eq!(eval("Symbol.keyFor(Symbol.for('k')) + ':' + Symbol.keyFor(Symbol('k'))"), "k:undefined");
    }

    #[test]
    fn description_and_string_form() {
        assert_eq!(eval("Symbol('d').description + ' ' + Symbol('d').toString()"), "d Symbol(d)");
        assert_eq!(eval("String(Symbol.iterator)"), "Symbol(Symbol.iterator)");
        assert_eq!(eval("try { new Symbol() } catch (e) { e.name }"), "TypeError");
    }

    #[test]
    fn symbol_keyed_properties() {
        assert_eq!(eval("var s = Symbol(); var o = {}; o[s] = 1; o[s] + Object.keys(o).length"), "1");
    }
}
