//! The decoded bencode value tree.

/// A single bencoded value.
///
/// Dictionaries preserve the order their keys were decoded in; canonical
/// key ordering is applied at encode time, so `Dict` is a plain pair list
/// rather than a sorted map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(Vec<(Vec<u8>, Value)>),
}

impl Value {
    /// Returns the raw bytes if this value is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the entries if this value is a dictionary.
    pub fn as_dict(&self) -> Option<&[(Vec<u8>, Value)]> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a dictionary entry by raw key bytes.
    ///
    /// Returns `None` when this value is not a dictionary or the key is
    /// absent.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Renders a byte string as text, replacing invalid UTF-8 sequences.
    ///
    /// Display fields in torrents (name, announce) are not guaranteed to
    /// be valid UTF-8; encoding noise must never make them unreadable.
    pub fn to_text_lossy(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_lookup_by_raw_key() {
        let value = Value::Dict(vec![
            (b"name".to_vec(), Value::Bytes(b"show".to_vec())),
            (b"length".to_vec(), Value::Int(42)),
        ]);
        assert_eq!(value.get(b"length"), Some(&Value::Int(42)));
        assert_eq!(value.get(b"missing"), None);
    }

    #[test]
    fn test_get_on_non_dict_is_none() {
        assert_eq!(Value::Int(1).get(b"info"), None);
        assert_eq!(Value::List(vec![]).get(b"info"), None);
    }

    #[test]
    fn test_to_text_lossy_replaces_invalid_utf8() {
        let value = Value::Bytes(vec![0xff, 0xfe, b'o', b'k']);
        let text = value.to_text_lossy().unwrap();
        assert!(text.ends_with("ok"));
        assert!(text.contains('\u{fffd}'));
    }
}
