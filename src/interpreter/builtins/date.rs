use super::{arg, method};
use crate::interpreter::Interpreter;
use crate::interpreter::error::{ErrorType, EvalError};
use crate::interpreter::helpers::Hint;
use crate::types::JsValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;
const MAX_TIME: f64 = 8.64e15;
const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Broken-down time: year, month (0-based), day, hour, minute, second, millisecond, weekday.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Fields([f64; 8]);

impl Fields {
    fn year(&self) -> f64 {
        self.0[0]
    }

    fn get(&self, i: usize) -> f64 {
        self.0[i]
    }
}

fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (yoe + era * 400 + i64::from(m <= 2), m, d)
}

fn make_day(year: f64, month: f64, date: f64) -> f64 {
    if !(year.is_finite() && month.is_finite() && date.is_finite()) {
        return f64::NAN;
    }
    let (year, month, date) = (year.trunc(), month.trunc(), date.trunc());
    let y = year + (month / 12.0).floor();
    if y.abs() > 400_000.0 {
        return f64::NAN;
    }
    let m = month.rem_euclid(12.0);
    days_from_civil(y as i64, m as i64 + 1, 1) as f64 + date - 1.0
}

fn make_time(hour: f64, min: f64, sec: f64, ms: f64) -> f64 {
    if !(hour.is_finite() && min.is_finite() && sec.is_finite() && ms.is_finite()) {
        return f64::NAN;
    }
    hour.trunc() * 3_600_000.0 + min.trunc() * 60_000.0 + sec.trunc() * 1000.0 + ms.trunc()
}

fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > MAX_TIME {
        return f64::NAN;
    }
    t.trunc() + 0.0
}

/// Time value from the first seven fields.
fn compose(f: &[f64; 7]) -> f64 {
    make_day(f[0], f[1], f[2]) * MS_PER_DAY + make_time(f[3], f[4], f[5], f[6])
}

fn decompose(t: f64) -> Fields {
    let day = (t / MS_PER_DAY).floor();
    let in_day = (t - day * MS_PER_DAY) as i64;
    let (y, m, d) = civil_from_days(day as i64);
    Fields([
        y as f64,
        (m - 1) as f64,
        d as f64,
        (in_day / 3_600_000) as f64,
        (in_day / 60_000 % 60) as f64,
        (in_day / 1000 % 60) as f64,
        (in_day % 1000) as f64,
        (day as i64 + 4).rem_euclid(7) as f64,
    ])
}

/// Offset of the host time zone from UTC at UTC time `t`, in milliseconds.
fn local_offset(t: f64) -> f64 {
    use chrono::Local;
    match Utc.timestamp_millis_opt(t as i64).single() {
        Some(dt) => Local.offset_from_utc_datetime(&dt.naive_utc()).local_minus_utc() as f64 * 1000.0,
        None => 0.0,
    }
}

fn local_time(t: f64) -> f64 {
    t + local_offset(t)
}

/// UTC time value of a local wall-clock time.
fn utc_from_local(local: f64) -> f64 {
    use chrono::Local;
    if !local.is_finite() {
        return f64::NAN;
    }
    let offset = Utc
        .timestamp_millis_opt(local as i64)
        .single()
        .and_then(|dt| Local.offset_from_local_datetime(&dt.naive_utc()).earliest())
        .map(|o| o.local_minus_utc() as f64 * 1000.0);
    local - offset.unwrap_or_else(|| local_offset(local))
}

fn now() -> f64 {
    Utc::now().timestamp_millis() as f64
}

fn pad_year(y: f64) -> String {
    if (0.0..=9999.0).contains(&y) {
        format!("{:04}", y as i64)
    } else if y < 0.0 {
        format!("-{:06}", (-y) as i64)
    } else {
        format!("+{:06}", y as i64)
    }
}

fn offset_suffix(offset_ms: f64) -> String {
    let minutes = (offset_ms / 60_000.0) as i64;
    let sign = if minutes < 0 { '-' } else { '+' };
    format!("GMT{sign}{:02}{:02}", minutes.abs() / 60, minutes.abs() % 60)
}

fn iso_string(t: f64) -> String {
    let f = decompose(t);
    format!(
        "{}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        pad_year(f.year()),
        f.get(1) as i64 + 1,
        f.get(2) as i64,
        f.get(3) as i64,
        f.get(4) as i64,
        f.get(5) as i64,
        f.get(6) as i64
    )
}

fn date_part(f: &Fields) -> String {
    let year = f.year();
    let year = if year < 0.0 { format!("-{:06}", (-year) as i64) } else { format!("{:04}", year as i64) };
    format!(
        "{} {} {:02} {year}",
        DAY_NAMES[f.get(7) as usize],
        MONTH_NAMES[f.get(1) as usize],
        f.get(2) as i64
    )
}

fn time_part(f: &Fields) -> String {
    format!("{:02}:{:02}:{:02}", f.get(3) as i64, f.get(4) as i64, f.get(5) as i64)
}

fn date_to_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".to_string();
    }
    let f = decompose(local_time(t));
    format!("{} {} {}", date_part(&f), time_part(&f), offset_suffix(local_offset(t)))
}

fn utc_string(t: f64) -> String {
    let f = decompose(t);
    format!(
        "{}, {:02} {} {} {} GMT",
        DAY_NAMES[f.get(7) as usize],
        f.get(2) as i64,
        MONTH_NAMES[f.get(1) as usize],
        pad_year(f.year()).trim_start_matches('+'),
        time_part(&f)
    )
}

fn locale_date(f: &Fields) -> String {
    format!("{}/{}/{}", f.get(1) as i64 + 1, f.get(2) as i64, f.year() as i64)
}

fn locale_time(f: &Fields) -> String {
    let hour = f.get(3) as i64;
    let (h12, meridiem) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{h12}:{:02}:{:02} {meridiem}", f.get(4) as i64, f.get(5) as i64)
}

/// `Date.parse`: ISO forms first, then the formats `toString` and `toUTCString` produce.
fn parse_date(text: &str) -> f64 {
    let s = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return dt.timestamp_millis() as f64;
        }
    }
    if let Some(date) = s.strip_suffix('Z')
        && let Ok(naive) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M")
    {
        return naive.and_utc().timestamp_millis() as f64;
    }
    let date_only = match s.len() {
        4 => s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
        7 => NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok(),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
    };
    if let Some(date) = date_only.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        return date.and_utc().timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return utc_from_local(naive.and_utc().timestamp_millis() as f64);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.timestamp_millis() as f64;
    }
    let without_zone_name = s.split(" (").next().unwrap_or(s);
    if let Ok(dt) = DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z") {
        return dt.timestamp_millis() as f64;
    }
    for format in ["%B %d, %Y", "%b %d, %Y", "%m/%d/%Y", "%a %b %d %Y"] {
        if let Some(naive) = NaiveDate::parse_from_str(s, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return utc_from_local(naive.and_utc().timestamp_millis() as f64);
        }
    }
    f64::NAN
}

/// Getters: name, UTC name, field index.
const GETTERS: [(&str, &str, usize); 8] = [
    ("getFullYear", "getUTCFullYear", 0),
    ("getMonth", "getUTCMonth", 1),
    ("getDate", "getUTCDate", 2),
    ("getHours", "getUTCHours", 3),
    ("getMinutes", "getUTCMinutes", 4),
    ("getSeconds", "getUTCSeconds", 5),
    ("getMilliseconds", "getUTCMilliseconds", 6),
    ("getDay", "getUTCDay", 7),
];

/// Setters: name, UTC name, first field written, how many arguments it takes.
const SETTERS: [(&str, &str, usize, usize); 7] = [
    ("setFullYear", "setUTCFullYear", 0, 3),
    ("setMonth", "setUTCMonth", 1, 2),
    ("setDate", "setUTCDate", 2, 1),
    ("setHours", "setUTCHours", 3, 4),
    ("setMinutes", "setUTCMinutes", 4, 3),
    ("setSeconds", "setUTCSeconds", 5, 2),
    ("setMilliseconds", "setUTCMilliseconds", 6, 1),
];

impl Interpreter {
    fn this_time(&self, this: &JsValue) -> Result<f64, EvalError> {
        if let JsValue::Object(obj) = this {
            let data = obj.borrow();
            if data.class_name == "Date"
                && let Some(JsValue::Number(t)) = &data.primitive_value
            {
                return Ok(*t);
            }
        }
        Err(self.throw_type_error("this is not a Date object."))
    }

    fn store_time(&self, this: &JsValue, t: f64) -> JsValue {
        if let JsValue::Object(obj) = this {
            obj.borrow_mut().primitive_value = Some(JsValue::Number(t));
        }
        JsValue::Number(t)
    }

    /// Reads up to seven numeric arguments as date fields, defaulting the rest.
    fn date_fields(&mut self, args: &[JsValue]) -> Result<[f64; 7], EvalError> {
        let mut fields = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        for (i, a) in args.iter().take(7).enumerate() {
            fields[i] = self.to_number(a)?;
        }
        let year = fields[0];
        if year.is_finite() && (0.0..=99.0).contains(&year.trunc()) {
            fields[0] = 1900.0 + year.trunc();
        }
        Ok(fields)
    }

    pub(crate) fn setup_date(&mut self) {
        let proto = self.realm.date_prototype.clone();
        let ctor = self.install_constructor("Date", 7, &proto, |interp, this, args| {
            let Some(instance) = interp.constructing_this(this) else {
                return Ok(JsValue::from(date_to_string(now())));
            };
            let t = match args {
                [] => now(),
                [value] => {
                    let existing = match value {
                        JsValue::Object(o) if o.borrow().class_name == "Date" => {
                            interp.this_time(value).ok()
                        }
                        _ => None,
                    };
                    match existing {
                        Some(t) => t,
                        None => match interp.to_primitive(value, Hint::Default)? {
                            JsValue::String(s) => parse_date(s.as_str()),
                            prim => interp.to_number(&prim)?,
                        },
                    }
                }
                _ => utc_from_local(compose(&interp.date_fields(args)?)),
            };
            let mut data = instance.borrow_mut();
            data.class_name = "Date".to_string();
            data.primitive_value = Some(JsValue::Number(time_clip(t)));
            drop(data);
            Ok(JsValue::Object(instance))
        });
        self.install_methods(
            &ctor,
            vec![
                method("now", 0, |_, _, _| Ok(JsValue::Number(now()))),
                method("parse", 1, |interp, _, args| {
                    let s = interp.to_js_string(&arg(args, 0))?;
                    Ok(JsValue::Number(time_clip(parse_date(s.as_str()))))
                }),
                method("UTC", 7, |interp, _, args| {
                    let mut fields = interp.date_fields(args)?;
                    if args.is_empty() {
                        fields[0] = f64::NAN;
                    }
                    Ok(JsValue::Number(time_clip(compose(&fields))))
                }),
            ],
        );

        let mut table = Vec::new();
        for (local_name, utc_name, field) in GETTERS {
            for (name, utc) in [(local_name, false), (utc_name, true)] {
                table.push(method(name, 0, move |interp, this, _| {
                    let t = interp.this_time(this)?;
                    if t.is_nan() {
                        return Ok(JsValue::Number(f64::NAN));
                    }
                    let t = if utc { t } else { local_time(t) };
                    Ok(JsValue::Number(decompose(t).get(field)))
                }));
            }
        }
        for (local_name, utc_name, first, count) in SETTERS {
            for (name, utc) in [(local_name, false), (utc_name, true)] {
                table.push(method(name, count, move |interp, this, args| {
                    let t = interp.this_time(this)?;
                    let base = if t.is_nan() {
                        if first != 0 {
                            return Ok(JsValue::Number(f64::NAN));
                        }
                        0.0
                    } else if utc {
                        t
                    } else {
                        local_time(t)
                    };
                    let current = decompose(base);
                    let mut fields = [0.0; 7];
                    fields.copy_from_slice(&current.0[..7]);
                    for i in 0..count.min(args.len().max(1)) {
                        fields[first + i] = interp.to_number(&arg(args, i))?;
                    }
                    let composed = compose(&fields);
                    let t = time_clip(if utc { composed } else { utc_from_local(composed) });
                    Ok(interp.store_time(this, t))
                }));
            }
        }
        table.extend([
            method("getTime", 0, |interp, this, _| interp.this_time(this).map(JsValue::Number)),
            method("valueOf", 0, |interp, this, _| interp.this_time(this).map(JsValue::Number)),
            method("setTime", 1, |interp, this, args| {
                interp.this_time(this)?;
                let t = time_clip(interp.to_number(&arg(args, 0))?);
                Ok(interp.store_time(this, t))
            }),
            method("getTimezoneOffset", 0, |interp, this, _| {
                let t = interp.this_time(this)?;
                if t.is_nan() {
                    return Ok(JsValue::Number(f64::NAN));
                }
                Ok(JsValue::Number(-local_offset(t) / 60_000.0))
            }),
            method("toISOString", 0, |interp, this, _| {
                let t = interp.this_time(this)?;
                if t.is_nan() {
                    return Err(interp.throw_error(ErrorType::RangeError, "Invalid time value"));
                }
                Ok(JsValue::from(iso_string(t)))
            }),
            method("toJSON", 1, |interp, this, _| {
                let prim = interp.to_primitive(this, Hint::Number)?;
                if matches!(prim, JsValue::Number(n) if !n.is_finite()) {
                    return Ok(JsValue::Null);
                }
                let to_iso = interp.get_named(this, "toISOString")?;
                interp.call_function(&to_iso, this, &[])
            }),
            method("toString", 0, |interp, this, _| {
                interp.this_time(this).map(|t| JsValue::from(date_to_string(t)))
            }),
            method("toUTCString", 0, |interp, this, _| {
                let t = interp.this_time(this)?;
                Ok(JsValue::from(if t.is_nan() { "Invalid Date".to_string() } else { utc_string(t) }))
            }),
            method("toDateString", 0, |interp, this, _| {
                interp.format_local(this, |f, _| date_part(f))
            }),
            method("toTimeString", 0, |interp, this, _| {
                interp.format_local(this, |f, t| format!("{} {}", time_part(f), offset_suffix(local_offset(t))))
            }),
            method("toLocaleDateString", 0, |interp, this, _| {
                interp.format_local(this, |f, _| locale_date(f))
            }),
            method("toLocaleTimeString", 0, |interp, this, _| {
                interp.format_local(this, |f, _| locale_time(f))
            }),
            method("toLocaleString", 0, |interp, this, _| {
                interp.format_local(this, |f, _| format!("{}, {}", locale_date(f), locale_time(f)))
            }),
        ]);
        self.install_methods(&proto, table);
    }

    fn format_local(
        &self,
        this: &JsValue,
        render: impl Fn(&Fields, f64) -> String,
    ) -> Result<JsValue, EvalError> {
        let t = self.this_time(this)?;
        if t.is_nan() {
            return Ok(JsValue::from("Invalid Date"));
        }
        Ok(JsValue::from(render(&decompose(local_time(t)), t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::EvalOptions;
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
    fn civil_day_arithmetic() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
        assert_eq!(make_day(2020.0, 13.0, 1.0), days_from_civil(2021, 2, 1) as f64);
    }

    #[test]
    fn iso_and_utc_strings() {
        assert_eq!(iso_string(0.0), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso_string(1_579_046_400_123.0), "2020-01-15T00:00:00.123Z");
        assert_eq!(utc_string(0.0), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(decompose(-1.0).get(0), 1969.0);
    }

    #[test]
    fn parses_common_formats() {
        assert_eq!(parse_date("2020-01-15"), 1_579_046_400_000.0);
        assert_eq!(parse_date("2020-01-15T00:00:00.123Z"), 1_579_046_400_123.0);
        assert_eq!(parse_date("2020-01-15T01:00:00+01:00"), 1_579_046_400_000.0);
        assert_eq!(parse_date("Wed, 15 Jan 2020 00:00:00 GMT"), 1_579_046_400_000.0);
        assert!(parse_date("not a date").is_nan());
    }

    #[test]
    fn dates_from_guest() {
        assert_eq!(eval("Date.UTC(2020, 0, 15)"), "1579046400000");
        assert_eq!(eval("new Date(Date.UTC(2020, 0, 15)).toISOString()"), "2020-01-15T00:00:00.000Z");
        assert_eq!(eval("var d = new Date(2020, 1, 29, 10, 30); [d.getFullYear(), d.getMonth(), d.getDate(), d.getHours(), d.getMinutes()].join()"), "2020,1,29,10,30");
        assert_eq!(eval("var d = new Date(0); d.setUTCFullYear(2000); d.getUTCFullYear()"), "2000");
        assert_eq!(eval("String(new Date(NaN))"), "Invalid Date");
        assert_eq!(eval("JSON.stringify({d: new Date(0)})"), r#"{"d":"1970-01-01T00:00:00.000Z"}"#);
        assert_eq!(eval("typeof Date()"), "string");
        assert_eq!(eval("new Date(8.64e15 + 1).getTime()"), "NaN");
    }
}
