//! phpser/encode - `serialize()` for `SerValue`.
//!
//! Floats are written with Rust's shortest round-trip formatting; PHP reads both that
//! and its own `1.0E+25` style. INF / -INF / NAN use PHP's spelling.

use super::{SerKey, SerValue};

/// Placeholder written over empty fields: the encoding of `""`.
pub fn empty_string_placeholder() -> String {
    String::from_utf8_lossy(&serialize_str(b"")).into_owned()
}

/// `s:<byte len>:"<bytes>";`
pub fn serialize_str(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 16);
    write_str(&mut out, b's', s);
    out
}

pub fn serialize(v: &SerValue) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, v);
    out
}

fn write_str(out: &mut Vec<u8>, tag: u8, s: &[u8]) {
    out.push(tag);
    out.extend_from_slice(format!(":{}:\"", s.len()).as_bytes());
    out.extend_from_slice(s);
    out.extend_from_slice(b"\";");
}

fn write_key(out: &mut Vec<u8>, k: &SerKey) {
    match k {
        SerKey::Int(i) => out.extend_from_slice(format!("i:{};", i).as_bytes()),
        SerKey::Str(s) => write_str(out, b's', s),
    }
}

fn write_members(out: &mut Vec<u8>, items: &[(SerKey, SerValue)]) {
    out.extend_from_slice(format!("{}:{{", items.len()).as_bytes());
    for (k, v) in items {
        write_key(out, k);
        write_value(out, v);
    }
    out.push(b'}');
}

fn write_value(out: &mut Vec<u8>, v: &SerValue) {
    match v {
        SerValue::Null => out.extend_from_slice(b"N;"),
        SerValue::Bool(b) => out.extend_from_slice(if *b { b"b:1;" } else { b"b:0;" }),
        SerValue::Int(i) => out.extend_from_slice(format!("i:{};", i).as_bytes()),
        SerValue::Float(f) => {
            let body = if f.is_nan() {
                "NAN".to_string()
            } else if f.is_infinite() {
                (if *f > 0.0 { "INF" } else { "-INF" }).to_string()
            } else {
                format!("{}", f)
            };
            out.extend_from_slice(format!("d:{};", body).as_bytes());
        }
        SerValue::Str(s) => write_str(out, b's', s),
        SerValue::Array(items) => {
            out.extend_from_slice(b"a:");
            write_members(out, items);
        }
        SerValue::Object { class, props } => {
            out.extend_from_slice(format!("O:{}:\"{}\":", class.len(), class).as_bytes());
            write_members(out, props);
        }
        SerValue::Custom { class, data } => {
            out.extend_from_slice(
                format!("C:{}:\"{}\":{}:{{", class.len(), class, data.len()).as_bytes(),
            );
            out.extend_from_slice(data);
            out.push(b'}');
        }
        SerValue::Enum { class, case } => {
            let payload = format!("{}:{}", class, case);
            write_str(out, b'E', payload.as_bytes());
        }
        SerValue::Ref(id) => out.extend_from_slice(format!("r:{};", id).as_bytes()),
        SerValue::RefHard(id) => out.extend_from_slice(format!("R:{};", id).as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phpser::unserialize;

    #[test]
    fn placeholder_is_php_empty_string() {
        assert_eq!(empty_string_placeholder(), "s:0:\"\";");
        assert_eq!(unserialize(empty_string_placeholder().as_bytes()).unwrap(), SerValue::str(""));
    }

    #[test]
    fn matches_php_output() {
        let v = SerValue::Array(vec![
            (SerKey::Int(0), SerValue::Bool(true)),
            (SerKey::Str(b"price".to_vec()), SerValue::Float(9.5)),
            (
                SerKey::Str(b"o".to_vec()),
                SerValue::Object {
                    class: "stdClass".to_string(),
                    props: vec![],
                },
            ),
        ]);
        assert_eq!(
            serialize(&v),
            b"a:3:{i:0;b:1;s:5:\"price\";d:9.5;s:1:\"o\";O:8:\"stdClass\":0:{}}".to_vec()
        );
        assert_eq!(serialize(&SerValue::Float(f64::NEG_INFINITY)), b"d:-INF;".to_vec());
        assert_eq!(serialize_str("é".as_bytes()), "s:2:\"é\";".as_bytes().to_vec());
    }
}
