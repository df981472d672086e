//! Pure arithmetic and typecast kernel.
//!
//! Everything here mirrors runtime LSL (Mono) semantics so that constant
//! folding is observationally safe: 32-bit wrapping integers, 32-bit
//! floats, C-style integer division and remainder, cross product for
//! `vector % vector`, length-based list equality, and the exact string
//! formatting rules for casts (`%f` with six decimals for a lone float,
//! five decimals for components of a vector or rotation cast to string,
//! six decimals again inside list-to-string conversions).
//!
//! Operations that would raise a runtime error (division by zero) or
//! whose result is not predictable at compile time return
//! [`CantCompute`], and the caller leaves the expression unfolded.

use crate::types::{Type, Value};

/// The computation cannot be performed at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CantCompute;

pub type ArithResult = Result<Value, CantCompute>;

/// LSL truthiness, as used by `if`/`while` conditions.
pub fn cond(v: &Value) -> bool {
    match v {
        Value::Integer(i) => *i != 0,
        // NaN is truthy here: it's not equal to zero.
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Key(k) => is_valid_key(k),
        Value::Vector(v) => *v != [0.0; 3],
        Value::Rotation(r) => *r != [0.0, 0.0, 0.0, 1.0],
        Value::List(l) => !l.is_empty(),
    }
}

/// A key is truthy only when it is a well-formed UUID other than the
/// null key.
pub fn is_valid_key(k: &str) -> bool {
    const NULL_KEY: &str = "00000000-0000-0000-0000-000000000000";
    if k.len() != 36 || k == NULL_KEY {
        return false;
    }
    let bytes = k.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

/// Unary minus.
pub fn neg(v: &Value) -> ArithResult {
    Ok(match v {
        Value::Integer(i) => Value::Integer(i.wrapping_neg()),
        Value::Float(f) => Value::Float(-f),
        Value::Vector(v) => Value::Vector([-v[0], -v[1], -v[2]]),
        Value::Rotation(r) => Value::Rotation([-r[0], -r[1], -r[2], -r[3]]),
        _ => return Err(CantCompute),
    })
}

fn as_f32(v: &Value) -> Option<f32> {
    match v {
        Value::Integer(i) => Some(*i as f32),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn quat_mul(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [
        a[3] * b[0] + a[0] * b[3] + a[1] * b[2] - a[2] * b[1],
        a[3] * b[1] + a[1] * b[3] + a[2] * b[0] - a[0] * b[2],
        a[3] * b[2] + a[2] * b[3] + a[0] * b[1] - a[1] * b[0],
        a[3] * b[3] - a[0] * b[0] - a[1] * b[1] - a[2] * b[2],
    ]
}

fn quat_conj(q: [f32; 4]) -> [f32; 4] {
    [-q[0], -q[1], -q[2], q[3]]
}

fn rotate_vec(v: [f32; 3], q: [f32; 4]) -> [f32; 3] {
    let u = [q[0], q[1], q[2]];
    let s = q[3];
    let c1 = cross(u, v);
    let t = [c1[0] + s * v[0], c1[1] + s * v[1], c1[2] + s * v[2]];
    let c2 = cross(u, t);
    [
        v[0] + 2.0 * c2[0],
        v[1] + 2.0 * c2[1],
        v[2] + 2.0 * c2[2],
    ]
}

/// Addition. `key + key` and other unsupported pairs error out; the
/// parser never produces them, but the kernel stays total.
pub fn add(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Value::Integer(x.wrapping_add(*y)),
        (Value::Str(x), Value::Str(y)) => Value::Str(format!("{x}{y}")),
        (Value::Vector(x), Value::Vector(y)) => {
            Value::Vector([x[0] + y[0], x[1] + y[1], x[2] + y[2]])
        }
        (Value::Rotation(x), Value::Rotation(y)) => {
            Value::Rotation([x[0] + y[0], x[1] + y[1], x[2] + y[2], x[3] + y[3]])
        }
        (Value::List(x), Value::List(y)) => {
            let mut out = x.clone();
            out.extend(y.iter().cloned());
            Value::List(out)
        }
        (Value::List(x), y) => {
            let mut out = x.clone();
            out.push(y.clone());
            Value::List(out)
        }
        (x, Value::List(y)) => {
            let mut out = Vec::with_capacity(y.len() + 1);
            out.push(x.clone());
            out.extend(y.iter().cloned());
            Value::List(out)
        }
        _ => match (as_f32(a), as_f32(b)) {
            (Some(x), Some(y)) => Value::Float(x + y),
            _ => return Err(CantCompute),
        },
    })
}

/// Subtraction over integer/float/vector/rotation.
pub fn sub(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Value::Integer(x.wrapping_sub(*y)),
        (Value::Vector(x), Value::Vector(y)) => {
            Value::Vector([x[0] - y[0], x[1] - y[1], x[2] - y[2]])
        }
        (Value::Rotation(x), Value::Rotation(y)) => {
            Value::Rotation([x[0] - y[0], x[1] - y[1], x[2] - y[2], x[3] - y[3]])
        }
        _ => match (as_f32(a), as_f32(b)) {
            (Some(x), Some(y)) => Value::Float(x - y),
            _ => return Err(CantCompute),
        },
    })
}

/// Multiplication, including dot product and rotation application.
pub fn mul(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Value::Integer(x.wrapping_mul(*y)),
        (Value::Vector(x), Value::Vector(y)) => {
            Value::Float(x[0] * y[0] + x[1] * y[1] + x[2] * y[2])
        }
        (Value::Vector(v), Value::Rotation(q)) => Value::Vector(rotate_vec(*v, *q)),
        (Value::Rotation(x), Value::Rotation(y)) => Value::Rotation(quat_mul(*x, *y)),
        (Value::Vector(v), _) => match as_f32(b) {
            Some(f) => Value::Vector([v[0] * f, v[1] * f, v[2] * f]),
            None => return Err(CantCompute),
        },
        (_, Value::Vector(v)) => match as_f32(a) {
            Some(f) => Value::Vector([v[0] * f, v[1] * f, v[2] * f]),
            None => return Err(CantCompute),
        },
        _ => match (as_f32(a), as_f32(b)) {
            (Some(x), Some(y)) => Value::Float(x * y),
            _ => return Err(CantCompute),
        },
    })
}

/// Division. Division by integer zero or float zero is a runtime error,
/// so it is never folded.
pub fn div(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Err(CantCompute);
            }
            Value::Integer(x.wrapping_div(*y))
        }
        (Value::Vector(v), Value::Rotation(q)) => {
            Value::Vector(rotate_vec(*v, quat_conj(*q)))
        }
        (Value::Rotation(x), Value::Rotation(y)) => {
            Value::Rotation(quat_mul(*x, quat_conj(*y)))
        }
        (Value::Vector(v), y) => match as_f32(y) {
            Some(f) if f != 0.0 => Value::Vector([v[0] / f, v[1] / f, v[2] / f]),
            _ => return Err(CantCompute),
        },
        _ => match (as_f32(a), as_f32(b)) {
            (Some(x), Some(y)) if y != 0.0 => Value::Float(x / y),
            _ => return Err(CantCompute),
        },
    })
}

/// Remainder for integers, cross product for vectors.
pub fn modulo(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Err(CantCompute);
            }
            Value::Integer(x.wrapping_rem(*y))
        }
        (Value::Vector(x), Value::Vector(y)) => Value::Vector(cross(*x, *y)),
        _ => return Err(CantCompute),
    })
}

/// Shifts and bitwise operators, integers only.
pub fn shl(a: i32, b: i32) -> i32 {
    a.wrapping_shl(b as u32)
}

pub fn shr(a: i32, b: i32) -> i32 {
    a.wrapping_shr(b as u32)
}

/// Equality. Lists compare by length, the way the runtime does.
pub fn eq(a: &Value, b: &Value) -> ArithResult {
    Ok(match (a, b) {
        // Integer-integer comparisons must not round through f32.
        (Value::Integer(x), Value::Integer(y)) => Value::Integer((x == y) as i32),
        (Value::List(x), Value::List(y)) => Value::Integer((x.len() == y.len()) as i32),
        (Value::Str(x), Value::Str(y)) | (Value::Key(x), Value::Key(y)) => {
            Value::Integer((x == y) as i32)
        }
        (Value::Str(x), Value::Key(y)) | (Value::Key(x), Value::Str(y)) => {
            Value::Integer((x == y) as i32)
        }
        (Value::Vector(x), Value::Vector(y)) => Value::Integer((x == y) as i32),
        (Value::Rotation(x), Value::Rotation(y)) => Value::Integer((x == y) as i32),
        _ => match (as_f32(a), as_f32(b)) {
            (Some(x), Some(y)) => Value::Integer((x == y) as i32),
            _ => return Err(CantCompute),
        },
    })
}

/// Inequality. For lists this is the length difference, not a boolean.
pub fn ne(a: &Value, b: &Value) -> ArithResult {
    if let (Value::List(x), Value::List(y)) = (a, b) {
        return Ok(Value::Integer((x.len() as i32).wrapping_sub(y.len() as i32)));
    }
    match eq(a, b)? {
        Value::Integer(i) => Ok(Value::Integer((i == 0) as i32)),
        _ => Err(CantCompute),
    }
}

/// Ordered comparison over integers and floats.
pub fn compare(op: Ordering, a: &Value, b: &Value) -> ArithResult {
    let (x, y) = match (as_f32(a), as_f32(b)) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(CantCompute),
    };
    // Integer-integer comparisons must not round through f32.
    if let (Value::Integer(i), Value::Integer(j)) = (a, b) {
        let r = match op {
            Ordering::Lt => i < j,
            Ordering::Le => i <= j,
            Ordering::Gt => i > j,
            Ordering::Ge => i >= j,
        };
        return Ok(Value::Integer(r as i32));
    }
    let r = match op {
        Ordering::Lt => x < y,
        Ordering::Le => x <= y,
        Ordering::Gt => x > y,
        Ordering::Ge => x >= y,
    };
    Ok(Value::Integer(r as i32))
}

/// Which ordered comparison to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ordering {
    Lt,
    Le,
    Gt,
    Ge,
}

/// Format a float the way `(string)` does for a lone float or a list
/// element: six decimals.
pub fn format_float(f: f32) -> String {
    format!("{f:.6}")
}

fn format_vec_components(c: &[f32], decimals: usize) -> String {
    let parts: Vec<String> = c.iter().map(|f| format!("{f:.decimals$}")).collect();
    format!("<{}>", parts.join(", "))
}

/// String conversion of a single value. `in_list` selects the list
/// formatting rules (six decimals for vector/rotation components instead
/// of five).
pub fn value_to_string(v: &Value, in_list: bool) -> String {
    let decimals = if in_list { 6 } else { 5 };
    match v {
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(s) | Value::Key(s) => s.clone(),
        Value::Vector(c) => format_vec_components(c, decimals),
        Value::Rotation(c) => format_vec_components(c, decimals),
        Value::List(l) => l.iter().map(|e| value_to_string(e, true)).collect(),
    }
}

fn parse_int_prefix(s: &str) -> i32 {
    let s = s.trim_start();
    let (neg, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut acc: u32 = 0;
    let mut digits = rest;
    let hex = digits.len() > 1
        && digits.as_bytes()[0] == b'0'
        && (digits.as_bytes()[1] | 0x20) == b'x';
    if hex {
        digits = &digits[2..];
        for &b in digits.as_bytes() {
            let d = match (b as char).to_digit(16) {
                Some(d) => d,
                None => break,
            };
            acc = acc.wrapping_mul(16).wrapping_add(d);
        }
    } else {
        for &b in digits.as_bytes() {
            let d = match (b as char).to_digit(10) {
                Some(d) => d,
                None => break,
            };
            acc = acc.wrapping_mul(10).wrapping_add(d);
        }
    }
    let v = acc as i32;
    if neg {
        v.wrapping_neg()
    } else {
        v
    }
}

fn parse_float_prefix(s: &str) -> f32 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] | 0x20) == b'e' {
        let mut e = end + 1;
        if e < bytes.len() && (bytes[e] == b'-' || bytes[e] == b'+') {
            e += 1;
        }
        if e < bytes.len() && bytes[e].is_ascii_digit() {
            while e < bytes.len() && bytes[e].is_ascii_digit() {
                e += 1;
            }
            end = e;
        }
    }
    s[..end].parse::<f32>().unwrap_or(0.0)
}

fn parse_vec_components<const N: usize>(s: &str) -> Option<[f32; N]> {
    let s = s.trim_start();
    let s = s.strip_prefix('<')?;
    let mut out = [0.0f32; N];
    let mut rest = s;
    for (i, slot) in out.iter_mut().enumerate() {
        let end = if i + 1 == N {
            rest.find('>').unwrap_or(rest.len())
        } else {
            rest.find(',')?
        };
        let field = rest[..end].trim();
        if field.is_empty() {
            return None;
        }
        *slot = parse_float_prefix(field);
        rest = rest.get(end + 1..).unwrap_or("");
    }
    Some(out)
}

/// LSL typecast of a constant value. `in_list` is set when the result
/// will be placed inside a list (it changes float formatting).
pub fn typecast(v: &Value, to: Type, in_list: bool) -> ArithResult {
    if v.ty() == to {
        return Ok(v.clone());
    }
    Ok(match (v, to) {
        (_, Type::List) => Value::List(vec![v.clone()]),
        (Value::Integer(i), Type::Float) => Value::Float(*i as f32),
        (Value::Float(f), Type::Integer) => Value::Integer(*f as i32),
        (Value::Integer(_), Type::String)
        | (Value::Float(_), Type::String)
        | (Value::Vector(_), Type::String)
        | (Value::Rotation(_), Type::String)
        | (Value::List(_), Type::String) => Value::Str(value_to_string(v, in_list)),
        (Value::Key(k), Type::String) => Value::Str(k.clone()),
        (Value::Str(s), Type::Key) => Value::Key(s.clone()),
        (Value::Str(s), Type::Integer) => Value::Integer(parse_int_prefix(s)),
        (Value::Str(s), Type::Float) => Value::Float(parse_float_prefix(s)),
        (Value::Str(s), Type::Vector) => {
            Value::Vector(parse_vec_components::<3>(s).unwrap_or([0.0; 3]))
        }
        (Value::Str(s), Type::Rotation) => {
            Value::Rotation(parse_vec_components::<4>(s).unwrap_or([0.0, 0.0, 0.0, 1.0]))
        }
        _ => return Err(CantCompute),
    })
}
