use super::{Method, arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::ErrorType;
use crate::interpreter::types::PropertyDescriptor;
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol, number_ops};

fn js_round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn js_sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn unary(name: &'static str, op: fn(f64) -> f64) -> Method {
    method(name, 1, move |interp, _, args| {
        let x = interp.to_number(&arg(args, 0))?;
        Ok(JsValue::Number(op(x)))
    })
}

/// Uniform double in `[0, 1)` from 53 random bits.
fn random_unit() -> Result<f64, getrandom::Error> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes)?;
    let bits = u64::from_le_bytes(bytes) >> 11;
    Ok(bits as f64 / (1u64 << 53) as f64)
}

impl Interpreter {
    pub(crate) fn setup_math(&mut self) {
        let mut table: Vec<Method> = vec![
            unary("abs", f64::abs),
            unary("ceil", f64::ceil),
            unary("floor", f64::floor),
            unary("round", js_round),
            unary("trunc", f64::trunc),
            unary("sign", js_sign),
            unary("sqrt", f64::sqrt),
            unary("cbrt", f64::cbrt),
            unary("exp", f64::exp),
            unary("expm1", f64::exp_m1),
            unary("log", f64::ln),
            unary("log1p", f64::ln_1p),
            unary("log2", f64::log2),
            unary("log10", f64::log10),
            unary("sin", f64::sin),
            unary("cos", f64::cos),
            unary("tan", f64::tan),
            unary("asin", f64::asin),
            unary("acos", f64::acos),
            unary("atan", f64::atan),
            unary("sinh", f64::sinh),
            unary("cosh", f64::cosh),
            unary("tanh", f64::tanh),
            unary("asinh", f64::asinh),
            unary("acosh", f64::acosh),
            unary("atanh", f64::atanh),
            unary("fround", |x| x as f32 as f64),
            unary("clz32", |x| number_ops::to_uint32(x).leading_zeros() as f64),
        ];
        table.extend([
            method("max", 2, |interp, _, args| {
                let mut result = f64::NEG_INFINITY;
                for a in args {
                    let n = interp.to_number(a)?;
                    if n.is_nan() || result.is_nan() {
                        result = f64::NAN;
                    } else if n > result || (n == 0.0 && result == 0.0 && result.is_sign_negative()) {
                        result = n;
                    }
                }
                Ok(JsValue::Number(result))
            }),
            method("min", 2, |interp, _, args| {
                let mut result = f64::INFINITY;
                for a in args {
                    let n = interp.to_number(a)?;
                    if n.is_nan() || result.is_nan() {
                        result = f64::NAN;
                    } else if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
                        result = n;
                    }
                }
                Ok(JsValue::Number(result))
            }),
            method("pow", 2, |interp, _, args| {
                let base = interp.to_number(&arg(args, 0))?;
                let exp = interp.to_number(&arg(args, 1))?;
                Ok(JsValue::Number(number_ops::exponentiate(base, exp)))
            }),
            method("atan2", 2, |interp, _, args| {
                let y = interp.to_number(&arg(args, 0))?;
                let x = interp.to_number(&arg(args, 1))?;
                Ok(JsValue::Number(y.atan2(x)))
            }),
            method("hypot", 2, |interp, _, args| {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(interp.to_number(a)?);
                }
                if values.iter().any(|n| n.is_infinite()) {
                    return Ok(JsValue::Number(f64::INFINITY));
                }
                Ok(JsValue::Number(values.iter().map(|n| n * n).sum::<f64>().sqrt()))
            }),
            method("imul", 2, |interp, _, args| {
                let a = number_ops::to_int32(interp.to_number(&arg(args, 0))?);
                let b = number_ops::to_int32(interp.to_number(&arg(args, 1))?);
                Ok(JsValue::Number(a.wrapping_mul(b) as f64))
            }),
            method("random", 0, |interp, _, _| {
                random_unit().map(JsValue::Number).map_err(|e| {
                    interp.throw_error(ErrorType::Error, &format!("Math.random failed: {e}"))
                })
            }),
        ]);
        let math = self.install_namespace("Math", table);
        for (name, value) in [
            ("PI", std::f64::consts::PI),
            ("E", std::f64::consts::E),
            ("LN2", std::f64::consts::LN_2),
            ("LN10", std::f64::consts::LN_10),
            ("LOG2E", std::f64::consts::LOG2_E),
            ("LOG10E", std::f64::consts::LOG10_E),
            ("SQRT2", std::f64::consts::SQRT_2),
            ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ] {
            self.install_constant(&math, name, JsValue::Number(value));
        }
        let mut data = math.borrow_mut();
        data.class_name = "Math".to_string();
        data.insert_symbol(
            JsSymbol::well_known(WellKnownSymbol::ToStringTag),
            PropertyDescriptor::data(JsValue::String(JsString::from("Math")), false, false, true),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{js_round, random_unit};
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
    fn rounding_follows_half_up() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert!(js_round(-0.2).is_sign_negative());
    }

    #[test]
    fn random_stays_in_unit_interval() {
        for _ in 0..100 {
            let r = random_unit().unwrap();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn math_from_guest() {
        assert_eq!(eval("Math.max(1, 5, 3) + Math.min(4, 2)"), "7");
        assert_eq!(eval("Math.max()"), "-Infinity");
        assert_eq!(eval("Math.max(1, NaN)"), "NaN");
        assert_eq!(eval("Math.hypot(3, 4) + Math.imul(3, 4)"), "17");
        assert_eq!(eval("Math.PI > 3.14 && Math.PI < 3.15"), "true");
        assert_eq!(eval("String(Math)"), "[object Math]");
    }
}
