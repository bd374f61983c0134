//! Implicit typing of plain scalars.
//!
//! Every schema maps the text of an untagged plain scalar to one of the core kinds. Quoted and
//! block scalars never go through here; they are strings.

use yamrt_common::Version;

pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Schema {
    /// YAML 1.2 core schema.
    #[default]
    Core,
    Yaml11,
    /// YAML 1.1 without the single letter booleans (`y`, `n`, ...).
    Yaml11Pyyaml,
    /// RFC 8259 literals only.
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Null,
    Bool(bool),
    Int(i64),
    /// Integer that does not fit `i64`, kept as written.
    BigInt(String),
    Float(f64),
    Str,
}

impl Resolved {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Resolved::Null => NULL_TAG,
            Resolved::Bool(_) => BOOL_TAG,
            Resolved::Int(_) | Resolved::BigInt(_) => INT_TAG,
            Resolved::Float(_) => FLOAT_TAG,
            Resolved::Str => STR_TAG,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    /// Out of range integers become [`Resolved::BigInt`] instead of strings.
    pub big_int_placeholder: bool,
    /// Reject leading zeros in JSON integers.
    pub strict_json_numbers: bool,
}

impl Schema {
    #[must_use]
    pub fn for_version(version: Version) -> Schema {
        if version <= Version::V1_1 {
            Schema::Yaml11
        } else {
            Schema::Core
        }
    }

    #[must_use]
    pub fn resolve(self, value: &str) -> Resolved {
        self.resolve_with(value, ResolveOptions::default())
    }

    pub fn resolve_with(self, value: &str, opts: ResolveOptions) -> Resolved {
        match self {
            Schema::Core => resolve_core(value, opts),
            Schema::Yaml11 => resolve_yaml11(value, opts, true),
            Schema::Yaml11Pyyaml => resolve_yaml11(value, opts, false),
            Schema::Json => resolve_json(value, opts),
        }
    }

    /// Tag a plain scalar with this text receives.
    #[must_use]
    pub fn implicit_tag(self, value: &str) -> &'static str {
        self.resolve(value).tag()
    }

    /// Resolves `value` as the kind named by an explicit core `tag`.
    ///
    /// Returns `None` when the text cannot be read as that kind or the tag is not a scalar
    /// tag of the core family.
    pub fn resolve_tagged(self, tag: &str, value: &str, opts: ResolveOptions) -> Option<Resolved> {
        match tag {
            STR_TAG => Some(Resolved::Str),
            NULL_TAG => match self.resolve_with(value, opts) {
                Resolved::Null => Some(Resolved::Null),
                _ if value.is_empty() => Some(Resolved::Null),
                _ => None,
            },
            BOOL_TAG => match self.resolve_with(value, opts) {
                b @ Resolved::Bool(_) => Some(b),
                _ => None,
            },
            INT_TAG => match self.resolve_with(value, opts) {
                i @ (Resolved::Int(_) | Resolved::BigInt(_)) => Some(i),
                _ => None,
            },
            FLOAT_TAG => match self.resolve_with(value, opts) {
                f @ Resolved::Float(_) => Some(f),
                Resolved::Int(i) => Some(Resolved::Float(i as f64)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn split_sign(value: &str) -> (&str, &str) {
    match value.as_bytes().first() {
        Some(b'-') => ("-", &value[1..]),
        Some(b'+') => ("", &value[1..]),
        _ => ("", value),
    }
}

fn all_digits(s: &str, radix: u32) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_digit(radix))
}

fn int_or_big(sign: &str, digits: &str, radix: u32, original: &str, opts: ResolveOptions) -> Resolved {
    let text = format!("{sign}{digits}");
    match i64::from_str_radix(&text, radix) {
        Ok(i) => Resolved::Int(i),
        Err(_) if opts.big_int_placeholder => Resolved::BigInt(original.to_string()),
        Err(_) => Resolved::Str,
    }
}

fn special_float(value: &str) -> Option<f64> {
    match value.as_bytes() {
        b".inf" | b".Inf" | b".INF" | b"+.inf" | b"+.Inf" | b"+.INF" => Some(f64::INFINITY),
        b"-.inf" | b"-.Inf" | b"-.INF" => Some(f64::NEG_INFINITY),
        b".nan" | b".NaN" | b".NAN" => Some(f64::NAN),
        _ => None,
    }
}

/// `([eE][-+]?[0-9]+)?` with the sign made mandatory when `sign_required`.
fn valid_exponent(exp: &str, sign_required: bool) -> bool {
    let (sign, digits) = match exp.as_bytes().first() {
        Some(b'-' | b'+') => (true, &exp[1..]),
        _ => (false, exp),
    };
    (sign || !sign_required) && all_digits(digits, 10)
}

fn resolve_core(value: &str, opts: ResolveOptions) -> Resolved {
    match value.as_bytes() {
        b"" | b"~" | b"null" | b"Null" | b"NULL" => return Resolved::Null,
        b"true" | b"True" | b"TRUE" => return Resolved::Bool(true),
        b"false" | b"False" | b"FALSE" => return Resolved::Bool(false),
        [b'0', b'o', rest @ ..] if all_digits(&value[2..], 8) && !rest.is_empty() => {
            return int_or_big("", &value[2..], 8, value, opts);
        }
        [b'0', b'x', rest @ ..] if all_digits(&value[2..], 16) && !rest.is_empty() => {
            return int_or_big("", &value[2..], 16, value, opts);
        }
        _ => {}
    }
    let (sign, body) = split_sign(value);
    if all_digits(body, 10) {
        return int_or_big(sign, body, 10, value, opts);
    }
    if let Some(f) = special_float(value) {
        return Resolved::Float(f);
    }
    if is_core_float(body) {
        if let Ok(f) = value.parse::<f64>() {
            return Resolved::Float(f);
        }
    }
    Resolved::Str
}

/// `(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?` without the sign.
fn is_core_float(body: &str) -> bool {
    let (mantissa, exp) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    if let Some(exp) = exp {
        if !valid_exponent(exp, false) {
            return false;
        }
    }
    match mantissa.split_once('.') {
        Some(("", frac)) => all_digits(frac, 10),
        Some((int, frac)) => all_digits(int, 10) && (frac.is_empty() || all_digits(frac, 10)),
        None => all_digits(mantissa, 10),
    }
}

fn resolve_yaml11(value: &str, opts: ResolveOptions, single_letter_bools: bool) -> Resolved {
    match value.as_bytes() {
        b"" | b"~" | b"null" | b"Null" | b"NULL" => return Resolved::Null,
        b"yes" | b"Yes" | b"YES" | b"true" | b"True" | b"TRUE" | b"on" | b"On" | b"ON" => {
            return Resolved::Bool(true)
        }
        b"no" | b"No" | b"NO" | b"false" | b"False" | b"FALSE" | b"off" | b"Off" | b"OFF" => {
            return Resolved::Bool(false)
        }
        b"y" | b"Y" if single_letter_bools => return Resolved::Bool(true),
        b"n" | b"N" if single_letter_bools => return Resolved::Bool(false),
        _ => {}
    }
    if let Some(f) = special_float(value) {
        return Resolved::Float(f);
    }

    let (sign, body) = split_sign(value);
    let strip = |s: &str| s.replace('_', "");

    match body.as_bytes() {
        [b'0', b'b', ..] if underscored_digits(&body[2..], 2) => {
            return int_or_big(sign, &strip(&body[2..]), 2, value, opts);
        }
        [b'0', b'x', ..] if underscored_digits(&body[2..], 16) => {
            return int_or_big(sign, &strip(&body[2..]), 16, value, opts);
        }
        [b'0', rest @ ..] if !rest.is_empty() && rest.iter().all(|b| matches!(b, b'0'..=b'7' | b'_')) => {
            let digits = strip(&body[1..]);
            if digits.is_empty() {
                return Resolved::Int(0);
            }
            return int_or_big(sign, &digits, 8, value, opts);
        }
        _ => {}
    }

    if body == "0"
        || (body.as_bytes().first().is_some_and(|b| matches!(b, b'1'..=b'9'))
            && body.bytes().all(|b| b.is_ascii_digit() || b == b'_'))
    {
        return int_or_big(sign, &strip(body), 10, value, opts);
    }

    if let Some(int) = sexagesimal_int(body) {
        return match sign {
            "-" => Resolved::Int(-int),
            _ => Resolved::Int(int),
        };
    }

    if let Some(f) = yaml11_float(body) {
        return Resolved::Float(if sign == "-" { -f } else { f });
    }
    Resolved::Str
}

/// `[digits_]+` holding at least one digit.
fn underscored_digits(s: &str, radix: u32) -> bool {
    s.chars().any(|c| c.is_digit(radix)) && s.chars().all(|c| c == '_' || c.is_digit(radix))
}

/// Base 60 groups (`[0-5]?[0-9]`) after a leading decimal run.
fn sexagesimal_parts(body: &str) -> Option<Vec<&str>> {
    let mut parts = body.split(':');
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return None;
    }
    let valid_group = |g: &str| match g.as_bytes() {
        [d] => d.is_ascii_digit(),
        [a, b] => matches!(a, b'0'..=b'5') && b.is_ascii_digit(),
        _ => false,
    };
    if rest.iter().all(|g| valid_group(g)) {
        let mut all = vec![head];
        all.extend(rest);
        Some(all)
    } else {
        None
    }
}

fn sexagesimal_int(body: &str) -> Option<i64> {
    let parts = sexagesimal_parts(body)?;
    let head = parts.first()?;
    if !(head.as_bytes().first().is_some_and(|b| matches!(b, b'1'..=b'9'))
        && head.bytes().all(|b| b.is_ascii_digit() || b == b'_'))
    {
        return None;
    }
    let mut total: i64 = 0;
    for part in parts {
        let n: i64 = part.replace('_', "").parse().ok()?;
        total = total.checked_mul(60)?.checked_add(n)?;
    }
    Some(total)
}

fn yaml11_float(body: &str) -> Option<f64> {
    // Sexagesimal: [0-9][0-9_]*(:[0-5]?[0-9])+\.[0-9_]*
    if body.contains(':') {
        let (int_part, frac) = body.split_once('.')?;
        if !frac.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
            return None;
        }
        let parts = sexagesimal_parts(int_part)?;
        let head = parts.first()?;
        if !(head.as_bytes().first().is_some_and(u8::is_ascii_digit)
            && head.bytes().all(|b| b.is_ascii_digit() || b == b'_'))
        {
            return None;
        }
        let mut total = 0f64;
        for part in parts {
            total = total * 60.0 + part.replace('_', "").parse::<f64>().ok()?;
        }
        let frac = frac.replace('_', "");
        if !frac.is_empty() {
            total += format!("0.{frac}").parse::<f64>().ok()?;
        }
        return Some(total);
    }

    // ([0-9][0-9_]*)?\.[0-9_]*([eE][-+][0-9]+)?
    let (mantissa, exp) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    if let Some(exp) = exp {
        if !valid_exponent(exp, true) {
            return None;
        }
    }
    let (int, frac) = mantissa.split_once('.')?;
    let digit_or_underscore = |s: &str| s.bytes().all(|b| b.is_ascii_digit() || b == b'_');
    if !int.is_empty() && !int.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if !digit_or_underscore(int) || !digit_or_underscore(frac) {
        return None;
    }
    let int = int.replace('_', "");
    let frac = frac.replace('_', "");
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    let mut text = format!("{}.{}", if int.is_empty() { "0" } else { &int }, frac);
    if let Some(exp) = exp {
        text.push('e');
        text.push_str(exp);
    }
    text.parse::<f64>().ok()
}

fn resolve_json(value: &str, opts: ResolveOptions) -> Resolved {
    match value {
        "null" => return Resolved::Null,
        "true" => return Resolved::Bool(true),
        "false" => return Resolved::Bool(false),
        _ => {}
    }
    let (sign, body) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let leading_zero_ok = |int: &str| {
        !(opts.strict_json_numbers && int.len() > 1 && int.starts_with('0'))
    };

    if all_digits(body, 10) {
        if !leading_zero_ok(body) {
            return Resolved::Str;
        }
        return int_or_big(sign, body, 10, value, opts);
    }

    let (mantissa, exp) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    if let Some(exp) = exp {
        if !valid_exponent(exp, false) {
            return Resolved::Str;
        }
    }
    let (int, frac) = match mantissa.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (mantissa, None),
    };
    if !all_digits(int, 10) || !leading_zero_ok(int) {
        return Resolved::Str;
    }
    if let Some(frac) = frac {
        if !all_digits(frac, 10) {
            return Resolved::Str;
        }
    }
    value.parse::<f64>().map_or(Resolved::Str, Resolved::Float)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", Resolved::Null)]
    #[case("~", Resolved::Null)]
    #[case("NULL", Resolved::Null)]
    #[case("True", Resolved::Bool(true))]
    #[case("yes", Resolved::Str)]
    #[case("0o17", Resolved::Int(15))]
    #[case("0x1F", Resolved::Int(31))]
    #[case("-42", Resolved::Int(-42))]
    #[case("+7", Resolved::Int(7))]
    #[case("1_000", Resolved::Str)]
    #[case("1.5", Resolved::Float(1.5))]
    #[case(".5", Resolved::Float(0.5))]
    #[case("1.", Resolved::Float(1.0))]
    #[case("1e3", Resolved::Float(1000.0))]
    #[case("-.inf", Resolved::Float(f64::NEG_INFINITY))]
    #[case("1:20", Resolved::Str)]
    #[case("hello", Resolved::Str)]
    fn core_schema(#[case] input: &str, #[case] expected: Resolved) {
        assert_eq!(Schema::Core.resolve(input), expected);
    }

    #[rstest]
    #[case("y", Resolved::Bool(true))]
    #[case("Off", Resolved::Bool(false))]
    #[case("0o17", Resolved::Str)]
    #[case("017", Resolved::Int(15))]
    #[case("0b1010", Resolved::Int(10))]
    #[case("0x_FF", Resolved::Int(255))]
    #[case("1_000", Resolved::Int(1000))]
    #[case("190:20:30", Resolved::Int(685_230))]
    #[case("-1:30", Resolved::Int(-90))]
    #[case("1.5", Resolved::Float(1.5))]
    #[case("1_0.5", Resolved::Float(10.5))]
    #[case("1.0e+3", Resolved::Float(1000.0))]
    #[case("1.0e3", Resolved::Str)]
    #[case("1e+3", Resolved::Str)]
    #[case(".", Resolved::Str)]
    #[case("1:30.5", Resolved::Float(90.5))]
    fn yaml11_schema(#[case] input: &str, #[case] expected: Resolved) {
        assert_eq!(Schema::Yaml11.resolve(input), expected);
    }

    #[test]
    fn pyyaml_drops_single_letter_bools() {
        assert_eq!(Schema::Yaml11Pyyaml.resolve("y"), Resolved::Str);
        assert_eq!(Schema::Yaml11Pyyaml.resolve("yes"), Resolved::Bool(true));
    }

    #[rstest]
    #[case("null", Resolved::Null)]
    #[case("Null", Resolved::Str)]
    #[case("", Resolved::Str)]
    #[case("-0", Resolved::Int(0))]
    #[case("01", Resolved::Int(1))]
    #[case("1.25e2", Resolved::Float(125.0))]
    #[case(".5", Resolved::Str)]
    #[case("+1", Resolved::Str)]
    fn json_schema(#[case] input: &str, #[case] expected: Resolved) {
        assert_eq!(Schema::Json.resolve(input), expected);
    }

    #[test]
    fn strict_json_rejects_leading_zeros() {
        let opts = ResolveOptions {
            strict_json_numbers: true,
            ..Default::default()
        };
        assert_eq!(Schema::Json.resolve_with("01", opts), Resolved::Str);
        assert_eq!(Schema::Json.resolve_with("0", opts), Resolved::Int(0));
        assert_eq!(Schema::Json.resolve_with("01.5", opts), Resolved::Str);
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(
            Schema::Core.resolve("9223372036854775807"),
            Resolved::Int(i64::MAX)
        );
        assert_eq!(Schema::Core.resolve("9223372036854775808"), Resolved::Str);
        let opts = ResolveOptions {
            big_int_placeholder: true,
            ..Default::default()
        };
        assert_eq!(
            Schema::Core.resolve_with("9223372036854775808", opts),
            Resolved::BigInt("9223372036854775808".to_string())
        );
        assert_eq!(
            Schema::Core.resolve("-9223372036854775808"),
            Resolved::Int(i64::MIN)
        );
    }

    #[test]
    fn nan_resolves_to_float() {
        assert!(matches!(Schema::Core.resolve(".NaN"), Resolved::Float(f) if f.is_nan()));
    }

    #[test]
    fn tagged_resolution() {
        let opts = ResolveOptions::default();
        assert_eq!(
            Schema::Core.resolve_tagged(STR_TAG, "12", opts),
            Some(Resolved::Str)
        );
        assert_eq!(
            Schema::Core.resolve_tagged(FLOAT_TAG, "12", opts),
            Some(Resolved::Float(12.0))
        );
        assert_eq!(Schema::Core.resolve_tagged(INT_TAG, "abc", opts), None);
        assert_eq!(Schema::Core.implicit_tag("0x10"), INT_TAG);
    }
}
