//! Bencode decoding and canonical encoding.
//!
//! Decoding is a single left-to-right recursive descent with no
//! backtracking. Every helper takes the shared buffer plus the offset it
//! should start at and returns the decoded value together with the first
//! unconsumed offset, so there is no shared mutable cursor and concurrent
//! decodes of different buffers cannot interfere.

use super::{BencodeError, Value};

/// Decodes a complete bencoded buffer into a [`Value`] tree.
///
/// The buffer must contain exactly one top-level value; trailing bytes
/// are rejected.
pub fn decode(buf: &[u8]) -> Result<Value, BencodeError> {
    let (value, next) = decode_at(buf, 0)?;
    if next != buf.len() {
        return Err(BencodeError::TrailingBytes(next));
    }
    Ok(value)
}

/// Encodes a [`Value`] tree into canonical bencode.
///
/// Dictionary keys are sorted lexicographically by raw byte value. This
/// is a correctness requirement, not cosmetics: the info hash downstream
/// must match what every compliant encoder produces for the same logical
/// torrent.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn decode_at(buf: &[u8], at: usize) -> Result<(Value, usize), BencodeError> {
    match buf.get(at) {
        None => Err(BencodeError::UnexpectedEnd(at)),
        Some(b'i') => decode_int(buf, at),
        Some(b'l') => decode_list(buf, at),
        Some(b'd') => decode_dict(buf, at),
        Some(b'0'..=b'9') => {
            let (bytes, next) = decode_bytes(buf, at)?;
            Ok((Value::Bytes(bytes), next))
        }
        Some(&other) => Err(BencodeError::InvalidPrefix(other, at)),
    }
}

fn decode_int(buf: &[u8], at: usize) -> Result<(Value, usize), BencodeError> {
    // `i<decimal>e`, the terminator must appear before end-of-buffer.
    let start = at + 1;
    let end = find_byte(buf, start, b'e').ok_or(BencodeError::UnexpectedEnd(at))?;
    let literal =
        std::str::from_utf8(&buf[start..end]).map_err(|_| BencodeError::InvalidInteger(at))?;
    let value: i64 = literal
        .parse()
        .map_err(|_| BencodeError::InvalidInteger(at))?;
    Ok((Value::Int(value), end + 1))
}

fn decode_bytes(buf: &[u8], at: usize) -> Result<(Vec<u8>, usize), BencodeError> {
    // `<length>:<bytes>`, the declared length may not walk past the end.
    let colon = find_byte(buf, at, b':').ok_or(BencodeError::UnexpectedEnd(at))?;
    let literal =
        std::str::from_utf8(&buf[at..colon]).map_err(|_| BencodeError::InvalidInteger(at))?;
    let len: usize = literal
        .parse()
        .map_err(|_| BencodeError::InvalidInteger(at))?;
    let start = colon + 1;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or(BencodeError::LengthOutOfBounds(at))?;
    Ok((buf[start..end].to_vec(), end))
}

fn decode_list(buf: &[u8], at: usize) -> Result<(Value, usize), BencodeError> {
    let mut items = Vec::new();
    let mut cursor = at + 1;
    loop {
        match buf.get(cursor) {
            None => return Err(BencodeError::UnexpectedEnd(cursor)),
            Some(b'e') => return Ok((Value::List(items), cursor + 1)),
            Some(_) => {
                let (item, next) = decode_at(buf, cursor)?;
                items.push(item);
                cursor = next;
            }
        }
    }
}

fn decode_dict(buf: &[u8], at: usize) -> Result<(Value, usize), BencodeError> {
    let mut entries = Vec::new();
    let mut cursor = at + 1;
    loop {
        match buf.get(cursor) {
            None => return Err(BencodeError::UnexpectedEnd(cursor)),
            Some(b'e') => return Ok((Value::Dict(entries), cursor + 1)),
            Some(b'0'..=b'9') => {
                let (key, next) = decode_bytes(buf, cursor)?;
                let (value, next) = decode_at(buf, next)?;
                entries.push((key, value));
                cursor = next;
            }
            Some(_) => return Err(BencodeError::NonStringKey(cursor)),
        }
    }
}

fn find_byte(buf: &[u8], from: usize, needle: u8) -> Option<usize> {
    buf[from.min(buf.len())..]
        .iter()
        .position(|&b| b == needle)
        .map(|pos| from + pos)
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(entries) => {
            let mut ordered: Vec<&(Vec<u8>, Value)> = entries.iter().collect();
            ordered.sort_by(|a, b| a.0.cmp(&b.0));
            out.push(b'd');
            for (key, value) in ordered {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(value, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_int() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Int(42));
        assert_eq!(decode(b"i-7e").unwrap(), Value::Int(-7));
        assert_eq!(decode(b"i0e").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(decode(b"4:spam").unwrap(), Value::Bytes(b"spam".to_vec()));
        assert_eq!(decode(b"0:").unwrap(), Value::Bytes(Vec::new()));
    }

    #[test]
    fn test_decode_nested() {
        let value = decode(b"d4:listl4:spami3ee3:numi-1ee").unwrap();
        assert_eq!(
            value,
            Value::Dict(vec![
                (
                    b"list".to_vec(),
                    Value::List(vec![Value::Bytes(b"spam".to_vec()), Value::Int(3)]),
                ),
                (b"num".to_vec(), Value::Int(-1)),
            ])
        );
    }

    #[test]
    fn test_decode_preserves_on_disk_key_order() {
        // Keys out of canonical order decode fine; ordering is only
        // enforced when re-encoding.
        let value = decode(b"d1:bi1e1:ai2ee").unwrap();
        assert_eq!(
            value.as_dict().unwrap()[0],
            (b"b".to_vec(), Value::Int(1))
        );
    }

    #[test]
    fn test_unterminated_int_fails() {
        assert_eq!(decode(b"i42"), Err(BencodeError::UnexpectedEnd(0)));
    }

    #[test]
    fn test_unterminated_list_fails() {
        assert_eq!(decode(b"li1e"), Err(BencodeError::UnexpectedEnd(4)));
    }

    #[test]
    fn test_unterminated_dict_fails() {
        assert_eq!(decode(b"d1:ai1e"), Err(BencodeError::UnexpectedEnd(7)));
    }

    #[test]
    fn test_string_length_past_end_fails() {
        assert_eq!(decode(b"9:abc"), Err(BencodeError::LengthOutOfBounds(0)));
    }

    #[test]
    fn test_non_string_dict_key_fails() {
        assert_eq!(decode(b"di1ei2ee"), Err(BencodeError::NonStringKey(1)));
    }

    #[test]
    fn test_invalid_prefix_fails() {
        assert_eq!(decode(b"x"), Err(BencodeError::InvalidPrefix(b'x', 0)));
    }

    #[test]
    fn test_trailing_bytes_fail() {
        assert_eq!(decode(b"i1etrailing"), Err(BencodeError::TrailingBytes(3)));
    }

    #[test]
    fn test_garbage_integer_fails() {
        assert_eq!(decode(b"iabce"), Err(BencodeError::InvalidInteger(0)));
        assert_eq!(decode(b"ie"), Err(BencodeError::InvalidInteger(0)));
    }

    #[test]
    fn test_round_trip_nested_structure() {
        // Keys already in canonical order: decoding an encoded value
        // reproduces it exactly.
        let value = Value::Dict(vec![
            (b"empty".to_vec(), Value::Bytes(Vec::new())),
            (
                b"files".to_vec(),
                Value::List(vec![
                    Value::Dict(vec![
                        (b"length".to_vec(), Value::Int(1024)),
                        (
                            b"path".to_vec(),
                            Value::List(vec![Value::Bytes(b"a/b".to_vec())]),
                        ),
                    ]),
                    Value::Int(-99),
                ]),
            ),
            (b"name".to_vec(), Value::Bytes(vec![0xff, 0x00, 0x01])),
        ]);
        assert_eq!(decode(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn test_round_trip_normalizes_unsorted_dicts() {
        let unsorted = Value::Dict(vec![
            (b"b".to_vec(), Value::Int(2)),
            (b"a".to_vec(), Value::Int(1)),
        ]);
        let round_tripped = decode(&encode(&unsorted)).unwrap();
        assert_eq!(
            round_tripped,
            Value::Dict(vec![
                (b"a".to_vec(), Value::Int(1)),
                (b"b".to_vec(), Value::Int(2)),
            ])
        );
        // A second pass is a fixed point.
        assert_eq!(decode(&encode(&round_tripped)).unwrap(), round_tripped);
    }

    #[test]
    fn test_encode_sorts_keys_regardless_of_insertion_order() {
        let forward = Value::Dict(vec![
            (b"alpha".to_vec(), Value::Int(1)),
            (b"beta".to_vec(), Value::Int(2)),
        ]);
        let backward = Value::Dict(vec![
            (b"beta".to_vec(), Value::Int(2)),
            (b"alpha".to_vec(), Value::Int(1)),
        ]);
        assert_eq!(encode(&forward), encode(&backward));
        assert_eq!(encode(&forward), b"d5:alphai1e4:betai2ee".to_vec());
    }

    #[test]
    fn test_keys_sort_by_raw_byte_value() {
        // 'Z' (0x5a) sorts before 'a' (0x61): byte order, not collation.
        let value = Value::Dict(vec![
            (b"a".to_vec(), Value::Int(1)),
            (b"Z".to_vec(), Value::Int(2)),
        ]);
        assert_eq!(encode(&value), b"d1:Zi2e1:ai1ee".to_vec());
    }

    #[test]
    fn test_reencoding_compliant_buffer_is_identity() {
        let compliant = b"d5:alphai1e4:betal3:onei2eee".to_vec();
        let value = decode(&compliant).unwrap();
        assert_eq!(encode(&value), compliant);
    }
}
