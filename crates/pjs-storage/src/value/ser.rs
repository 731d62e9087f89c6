//! Serialization of value trees: `serde::Serialize` and compact JSON
//! through `Display`

use std::fmt::{self, Write};

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{Array, Inner, JsonString, Object, Scalar, Value};

impl Serialize for Value<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.inner {
            Inner::Scalar(Scalar::Null, _) => serializer.serialize_unit(),
            Inner::Scalar(Scalar::Bool(b), _) => serializer.serialize_bool(*b),
            Inner::Scalar(Scalar::Int64(n), _) => serializer.serialize_i64(*n),
            Inner::Scalar(Scalar::Uint64(n), _) => serializer.serialize_u64(*n),
            Inner::Scalar(Scalar::Double(n), _) => serializer.serialize_f64(*n),
            Inner::String(s) => s.serialize(serializer),
            Inner::Array(a) => a.serialize(serializer),
            Inner::Object(o) => o.serialize(serializer),
        }
    }
}

impl Serialize for JsonString<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Serialize for Array<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for Object<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn write_escaped(out: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    out.write_char('"')?;
    let mut start = 0;
    for (i, byte) in s.bytes().enumerate() {
        let escape = match byte {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x08 => "\\b",
            0x0c => "\\f",
            0x00..=0x1f => "",
            _ => continue,
        };
        out.write_str(&s[start..i])?;
        if escape.is_empty() {
            write!(out, "\\u{byte:04x}")?;
        } else {
            out.write_str(escape)?;
        }
        start = i + 1;
    }
    out.write_str(&s[start..])?;
    out.write_char('"')
}

fn write_number(out: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() {
        // Debug keeps a fractional part so the kind survives a reparse
        write!(out, "{n:?}")
    } else {
        out.write_str("null")
    }
}

impl fmt::Display for Value<'_> {
    /// Compact JSON text. Non-finite doubles are written as `null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Scalar(Scalar::Null, _) => f.write_str("null"),
            Inner::Scalar(Scalar::Bool(b), _) => write!(f, "{b}"),
            Inner::Scalar(Scalar::Int64(n), _) => write!(f, "{n}"),
            Inner::Scalar(Scalar::Uint64(n), _) => write!(f, "{n}"),
            Inner::Scalar(Scalar::Double(n), _) => write_number(f, *n),
            Inner::String(s) => write_escaped(f, s),
            Inner::Array(a) => fmt::Display::fmt(a, f),
            Inner::Object(o) => fmt::Display::fmt(o, f),
        }
    }
}

impl fmt::Display for Array<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            fmt::Display::fmt(value, f)?;
        }
        f.write_char(']')
    }
}

impl fmt::Display for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write_escaped(f, key)?;
            f.write_char(':')?;
            fmt::Display::fmt(value, f)?;
        }
        f.write_char('}')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageHandle;

    fn sample() -> Value<'static> {
        let storage = StorageHandle::default();
        let mut object = Object::new_in(storage.clone());
        object.insert("name", Value::string_in("a\"b\n\u{1}", storage.clone()).unwrap()).unwrap();
        let mut list = Array::new_in(storage.clone());
        list.push(Value::from_i64(-1, storage.clone())).unwrap();
        list.push(Value::from_u64(u64::MAX, storage.clone())).unwrap();
        list.push(Value::from_f64(2.0, storage.clone())).unwrap();
        list.push(Value::from_bool(true, storage.clone())).unwrap();
        list.push(Value::null(storage.clone())).unwrap();
        object.insert("list", list.into()).unwrap();
        object.into()
    }

    #[test]
    fn test_display_compact_json() {
        assert_eq!(
            sample().to_string(),
            r#"{"name":"a\"b\n\u0001","list":[-1,18446744073709551615,2.0,true,null]}"#
        );
    }

    #[test]
    fn test_display_non_finite_as_null() {
        let v = Value::from_f64(f64::NAN, StorageHandle::default());
        assert_eq!(v.to_string(), "null");
    }

    #[test]
    fn test_serialize_matches_serde_json() {
        let value = sample();
        let via_serde = serde_json::to_value(&value).unwrap();
        assert_eq!(via_serde["list"][1], serde_json::json!(u64::MAX));
        assert_eq!(via_serde["name"], "a\"b\n\u{1}");

        let reparsed: serde_json::Value = serde_json::from_str(&value.to_string()).unwrap();
        assert_eq!(reparsed, via_serde);
    }
}
