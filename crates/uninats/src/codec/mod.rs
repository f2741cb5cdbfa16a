mod error;

pub use error::{DecodeError, EncodeError};

use bytes::{Bytes, BytesMut};
use prost::{Message, Name};

/// A protobuf message that can travel through a [`crate::Client`].
///
/// The `Default` value is the blank instance decoding starts from, and
/// [`Name::full_name`] is the type identifier sent alongside the payload.
pub trait TypedMessage: Message + Name + Default + Clone + Send + Sync + 'static {
    /// Checks constraints protobuf itself cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the violated constraint.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Encodes a message.
///
/// # Errors
///
/// Returns an error if the message fails validation or cannot be encoded.
pub fn encode<M: TypedMessage>(message: &M) -> Result<Bytes, EncodeError> {
    encode_with_limit(message, None)
}

/// Encodes a message, rejecting encodings larger than `limit` bytes.
///
/// # Errors
///
/// Returns an error if the message fails validation, cannot be encoded, or
/// is too large.
pub fn encode_with_limit<M: TypedMessage>(
    message: &M,
    limit: Option<usize>,
) -> Result<Bytes, EncodeError> {
    message
        .validate()
        .map_err(|reason| EncodeError::Invalid {
            type_name: M::full_name(),
            reason,
        })?;

    let size = message.encoded_len();
    if let Some(max) = limit {
        if size > max {
            return Err(EncodeError::TooLarge { size, max });
        }
    }

    let mut buffer = BytesMut::with_capacity(size);
    message.encode(&mut buffer)?;

    Ok(buffer.freeze())
}

/// Decodes a message of type `M`.
///
/// Unknown fields are skipped.
///
/// # Errors
///
/// Returns an error if the bytes are malformed or encode an incompatible type.
pub fn decode<M: TypedMessage>(bytes: &[u8]) -> Result<M, DecodeError> {
    Ok(M::decode(bytes)?)
}

/// Decodes a message of type `M`, checking the type named by its header.
///
/// # Errors
///
/// Returns `DecodeError::TypeMismatch` if `type_name` names another type, or
/// any error from [`decode`].
pub fn decode_typed<M: TypedMessage>(
    bytes: &[u8],
    type_name: Option<&str>,
) -> Result<M, DecodeError> {
    if let Some(actual) = type_name {
        let expected = M::full_name();
        if actual != expected {
            return Err(DecodeError::TypeMismatch {
                expected,
                actual: actual.to_string(),
            });
        }
    }

    decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Message)]
    struct Fruit {
        #[prost(string, tag = "1")]
        name: String,

        #[prost(int64, tag = "2")]
        weight: i64,
    }

    impl Name for Fruit {
        const NAME: &'static str = "Fruit";
        const PACKAGE: &'static str = "test.codec";
    }

    impl TypedMessage for Fruit {
        fn validate(&self) -> Result<(), String> {
            if self.name.is_empty() {
                return Err("name is required".to_string());
            }
            Ok(())
        }
    }

    #[derive(Clone, PartialEq, Message)]
    struct Counter {
        #[prost(uint64, tag = "1")]
        count: u64,
    }

    impl Name for Counter {
        const NAME: &'static str = "Counter";
        const PACKAGE: &'static str = "test.codec";
    }

    impl TypedMessage for Counter {}

    fn apple() -> Fruit {
        Fruit {
            name: "Apple".to_string(),
            weight: 180,
        }
    }

    #[test]
    fn test_round_trip() {
        let bytes = encode(&apple()).unwrap();
        let decoded: Fruit = decode(&bytes).unwrap();

        assert_eq!(decoded, apple());
    }

    #[test]
    fn test_empty_message_encodes_to_nothing() {
        let bytes = encode(&Counter::default()).unwrap();

        assert!(bytes.is_empty());
        assert_eq!(decode::<Counter>(&bytes).unwrap(), Counter::default());
    }

    #[test]
    fn test_validation_failure() {
        let result = encode(&Fruit::default());

        assert_eq!(
            result,
            Err(EncodeError::Invalid {
                type_name: "test.codec.Fruit".to_string(),
                reason: "name is required".to_string(),
            })
        );
    }

    #[test]
    fn test_size_limit() {
        let size = apple().encoded_len();

        assert!(encode_with_limit(&apple(), Some(size)).is_ok());
        assert_eq!(
            encode_with_limit(&apple(), Some(size - 1)),
            Err(EncodeError::TooLarge {
                size,
                max: size - 1
            })
        );
    }

    #[test]
    fn test_truncated_input() {
        let bytes = encode(&apple()).unwrap();
        let result = decode::<Fruit>(&bytes[..bytes.len() - 2]);

        assert!(matches!(result, Err(DecodeError::Protobuf(_))));
    }

    #[test]
    fn test_wire_type_mismatch() {
        // Field 1 as a length-delimited string cannot be read as a varint.
        let bytes = encode(&apple()).unwrap();
        let result = decode::<Counter>(&bytes);

        assert!(matches!(result, Err(DecodeError::Protobuf(_))));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let bytes = encode(&Counter { count: 3 }).unwrap();
        let mut extended = bytes.to_vec();
        // Field 9, varint 1.
        extended.extend_from_slice(&[0x48, 0x01]);

        assert_eq!(decode::<Counter>(&extended).unwrap(), Counter { count: 3 });
    }

    #[test]
    fn test_type_header_mismatch() {
        let bytes = encode(&apple()).unwrap();

        assert!(decode_typed::<Fruit>(&bytes, Some("test.codec.Fruit")).is_ok());
        assert!(decode_typed::<Fruit>(&bytes, None).is_ok());
        assert_eq!(
            decode_typed::<Fruit>(&bytes, Some("test.codec.Counter")),
            Err(DecodeError::TypeMismatch {
                expected: "test.codec.Fruit".to_string(),
                actual: "test.codec.Counter".to_string(),
            })
        );
    }
}
