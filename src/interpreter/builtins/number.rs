use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{ErrorType, EvalError};
use crate::interpreter::helpers::to_boolean;
use crate::types::{JsValue, number_ops};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn sign_of(negative: bool) -> &'static str {
    if negative { "-" } else { "" }
}

fn exponent_suffix(e: i32) -> String {
    if e >= 0 { format!("e+{e}") } else { format!("e{e}") }
}

/// `toFixed`: ties round away from zero, unlike Rust's formatter.
fn format_fixed(n: f64, digits: usize) -> String {
    if n.abs() >= 1e21 {
        return number_ops::to_string(n);
    }
    let x = n.abs();
    let scale = 10f64.powi(digits as i32);
    let scaled = x * scale;
    let body = if scaled.fract() == 0.5 && scaled < MAX_SAFE_INTEGER && scaled / scale == x {
        let units = format!("{:0>width$}", scaled.ceil() as u64, width = digits + 1);
        if digits == 0 {
            units
        } else {
            let (int, frac) = units.split_at(units.len() - digits);
            format!("{int}.{frac}")
        }
    } else {
        format!("{x:.digits$}")
    };
    format!("{}{body}", sign_of(n < 0.0))
}

/// Mantissa with `digits` fraction digits and its decimal exponent, for a positive finite `x`.
fn scientific_parts(x: f64, digits: usize) -> (String, i32) {
    let e = x.log10().floor() as i32;
    let mantissa = format!("{:.digits$}", x / 10f64.powi(e));
    match mantissa.parse::<f64>() {
        Ok(m) if m >= 10.0 => (format!("{:.digits$}", x / 10f64.powi(e + 1)), e + 1),
        Ok(m) if m < 1.0 => (format!("{:.digits$}", x / 10f64.powi(e - 1)), e - 1),
        _ => (mantissa, e),
    }
}

fn format_exponential(n: f64, fraction_digits: Option<usize>) -> String {
    let negative = n < 0.0;
    let x = n.abs();
    if x == 0.0 {
        let zeros = fraction_digits.filter(|f| *f > 0).map(|f| format!(".{}", "0".repeat(f)));
        return format!("{}0{}e+0", sign_of(negative), zeros.unwrap_or_default());
    }
    let (mantissa, e) = match fraction_digits {
        Some(f) => scientific_parts(x, f),
        None => {
            // Shortest round-trip digits, as ryu renders them.
            let (full, e) = scientific_parts(x, 17);
            let shortest = number_ops::to_string(x);
            let digits: String = shortest
                .chars()
                .take_while(|c| *c != 'e')
                .filter(char::is_ascii_digit)
                .collect();
            let digits = digits.trim_start_matches('0').trim_end_matches('0');
            match digits.len() {
                0 => (full, e),
                1 => (digits.to_string(), e),
                _ => (format!("{}.{}", &digits[..1], &digits[1..]), e),
            }
        }
    };
    format!("{}{mantissa}{}", sign_of(negative), exponent_suffix(e))
}

fn format_precision(n: f64, precision: usize) -> String {
    let negative = n < 0.0;
    let x = n.abs();
    if x == 0.0 {
        let zeros = if precision > 1 {
            format!(".{}", "0".repeat(precision - 1))
        } else {
            String::new()
        };
        return format!("{}0{zeros}", sign_of(negative));
    }
    let (mantissa, e) = scientific_parts(x, precision - 1);
    if e < -6 || e >= precision as i32 {
        return format!("{}{mantissa}{}", sign_of(negative), exponent_suffix(e));
    }
    let frac_digits = (precision as i32 - e - 1).max(0) as usize;
    format!("{}{}", sign_of(negative), format_fixed(x, frac_digits))
}

impl Interpreter {
    fn this_number(&self, this: &JsValue, name: &str) -> Result<f64, EvalError> {
        let found = match this {
            JsValue::Number(n) => Some(*n),
            JsValue::Object(o) => {
                let data = o.borrow();
                match &data.primitive_value {
                    Some(JsValue::Number(n)) if data.class_name == "Number" => Some(*n),
                    _ => None,
                }
            }
            _ => None,
        };
        found.ok_or_else(|| {
            self.throw_type_error(&format!("Number.prototype.{name} requires that 'this' be a Number"))
        })
    }

    /// Digit-count argument of `toFixed` and friends, checked against `min..=100`.
    fn digits_arg(&mut self, value: &JsValue, min: f64, name: &str) -> Result<usize, EvalError> {
        let f = self.to_integer(value)?;
        if !(min..=100.0).contains(&f) {
            return Err(self.throw_error(
                ErrorType::RangeError,
                &format!("{name}() argument must be between {min} and 100"),
            ));
        }
        Ok(f as usize)
    }

    pub(crate) fn setup_number(&mut self) {
        let proto = self.realm.number_prototype.clone();
        {
            let mut data = proto.borrow_mut();
            data.class_name = "Number".to_string();
            data.primitive_value = Some(JsValue::Number(0.0));
        }
        let ctor = self.install_constructor("Number", 1, &proto, |interp, this, args| {
            let n = match args.first() {
                Some(v) => interp.to_number(v)?,
                None => 0.0,
            };
            match interp.constructing_this(this) {
                Some(instance) => {
                    {
                        let mut data = instance.borrow_mut();
                        data.class_name = "Number".to_string();
                        data.primitive_value = Some(JsValue::Number(n));
                    }
                    Ok(JsValue::Object(instance))
                }
                None => Ok(JsValue::Number(n)),
            }
        });
        for (name, value) in [
            ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
            ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("EPSILON", f64::EPSILON),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ] {
            self.install_constant(&ctor, name, JsValue::Number(value));
        }
        self.install_methods(
            &ctor,
            vec![
                method("isFinite", 1, |_, _, args| {
                    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
                }),
                method("isNaN", 1, |_, _, args| {
                    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
                }),
                method("isInteger", 1, |_, _, args| {
                    Ok(JsValue::Boolean(
                        matches!(arg(args, 0), JsValue::Number(n) if n.is_finite() && n.trunc() == n),
                    ))
                }),
                method("isSafeInteger", 1, |_, _, args| {
                    Ok(JsValue::Boolean(matches!(
                        arg(args, 0),
                        JsValue::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
                    )))
                }),
            ],
        );
        self.install_methods(
            &proto,
            vec![
                method("toString", 1, |interp, this, args| {
                    let n = interp.this_number(this, "toString")?;
                    let radix = match arg(args, 0) {
                        JsValue::Undefined => 10.0,
                        r => interp.to_integer(&r)?,
                    };
                    if !(2.0..=36.0).contains(&radix) {
                        return Err(interp.throw_error(
                            ErrorType::RangeError,
                            "toString() radix must be between 2 and 36",
                        ));
                    }
                    Ok(JsValue::from(number_ops::to_string_radix(n, radix as u32)))
                }),
                method("toLocaleString", 0, |interp, this, _| {
                    let n = interp.this_number(this, "toLocaleString")?;
                    Ok(JsValue::from(number_ops::to_string(n)))
                }),
                method("valueOf", 0, |interp, this, _| {
                    interp.this_number(this, "valueOf").map(JsValue::Number)
                }),
                method("toFixed", 1, |interp, this, args| {
                    let n = interp.this_number(this, "toFixed")?;
                    let digits = interp.digits_arg(&arg(args, 0), 0.0, "toFixed")?;
                    if !n.is_finite() {
                        return Ok(JsValue::from(number_ops::to_string(n)));
                    }
                    Ok(JsValue::from(format_fixed(n, digits)))
                }),
                method("toExponential", 1, |interp, this, args| {
                    let n = interp.this_number(this, "toExponential")?;
                    let fraction = arg(args, 0);
                    let digits = if fraction.is_undefined() {
                        None
                    } else {
                        Some(interp.to_integer(&fraction)?)
                    };
                    if !n.is_finite() {
                        return Ok(JsValue::from(number_ops::to_string(n)));
                    }
                    let digits = match digits {
                        Some(f) if !(0.0..=100.0).contains(&f) => {
                            return Err(interp.throw_error(
                                ErrorType::RangeError,
                                "toExponential() argument must be between 0 and 100",
                            ));
                        }
                        f => f.map(|f| f as usize),
                    };
                    Ok(JsValue::from(format_exponential(n, digits)))
                }),
                method("toPrecision", 1, |interp, this, args| {
                    let n = interp.this_number(this, "toPrecision")?;
                    let precision = arg(args, 0);
                    if precision.is_undefined() || !n.is_finite() {
                        return Ok(JsValue::from(number_ops::to_string(n)));
                    }
                    let digits = interp.digits_arg(&precision, 1.0, "toPrecision")?;
                    Ok(JsValue::from(format_precision(n, digits)))
                }),
            ],
        );
    }

    pub(crate) fn setup_boolean(&mut self) {
        let proto = self.realm.boolean_prototype.clone();
        {
            let mut data = proto.borrow_mut();
            data.class_name = "Boolean".to_string();
            data.primitive_value = Some(JsValue::Boolean(false));
        }
        self.install_constructor("Boolean", 1, &proto, |interp, this, args| {
            let b = to_boolean(&arg(args, 0));
            match interp.constructing_this(this) {
                Some(instance) => {
                    {
                        let mut data = instance.borrow_mut();
                        data.class_name = "Boolean".to_string();
                        data.primitive_value = Some(JsValue::Boolean(b));
                    }
                    Ok(JsValue::Object(instance))
                }
                None => Ok(JsValue::Boolean(b)),
            }
        });
        fn this_boolean(interp: &Interpreter, this: &JsValue, name: &str) -> Result<bool, EvalError> {
            let found = match this {
                JsValue::Boolean(b) => Some(*b),
                JsValue::Object(o) => {
                    let data = o.borrow();
                    match &data.primitive_value {
                        Some(JsValue::Boolean(b)) if data.class_name == "Boolean" => Some(*b),
                        _ => None,
                    }
                }
                _ => None,
            };
            found.ok_or_else(|| {
                interp.throw_type_error(&format!(
                    "Boolean.prototype.{name} requires that 'this' be a Boolean"
                ))
            })
        }
        self.install_methods(
            &proto,
            vec![
                method("toString", 0, |interp, this, _| {
                    this_boolean(interp, this, "toString").map(|b| JsValue::from(if b { "true" } else { "false" }))
                }),
                method("valueOf", 0, |interp, this, _| {
                    this_boolean(interp, this, "valueOf").map(JsValue::Boolean)
                }),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{format_exponential, format_fixed, format_precision};
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
    fn fixed_rounds_ties_up() {
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(1.005, 2), "1.00");
        assert_eq!(format_fixed(-1.5, 1), "-1.5");
        assert_eq!(format_fixed(1e21, 2), "1e+21");
    }

    #[test]
    fn exponential_and_precision() {
        assert_eq!(format_exponential(123456.0, Some(2)), "1.23e+5");
        assert_eq!(format_exponential(0.00015, None), "1.5e-4");
        assert_eq!(format_exponential(0.0, Some(1)), "0.0e+0");
        assert_eq!(format_precision(123.456, 4), "123.5");
        assert_eq!(format_precision(0.000123, 2), "0.00012");
        assert_eq!(format_precision(123456.0, 2), "1.2e+5");
    }

    #[test]
    fn number_methods_from_guest() {
        assert_eq!(eval("(255).toString(16) + ' ' + (3.14159).toFixed(2)"), "ff 3.14");
        assert_eq!(eval("Number.isInteger(5.0) && !Number.isInteger('5')"), "true");
        assert_eq!(eval("Number('  42 ') + 1"), "43");
        assert_eq!(eval("typeof new Number(1) + ' ' + new Number(7).valueOf()"), "object 7");
    }

    #[test]
    fn range_errors() {
        assert_eq!(
            eval("try { (1).toFixed(101) } catch (e) { e.name }"),
            "RangeError"
        );
        assert_eq!(eval("try { (1).toString(1) } catch (e) { e.message }"), "toString() radix must be between 2 and 36");
    }

    #[test]
    fn booleans() {
        assert_eq!(eval("Boolean('') + ' ' + new Boolean(false).toString() + ' ' + typeof Boolean(1)"), "false false boolean");
    }
}
