//! Property tests for lossless encoding and the wire format.

use proptest::prelude::*;
use tokenwire::{from_base64, pack, to_base64, unpack, Tokenizer};

const DEFINITION: &str = include_str!("fixtures/tokenizer.json");
const ENDOFTEXT: u32 = 118;

fn create_tokenizer() -> Tokenizer {
    Tokenizer::from_json_str(DEFINITION).unwrap()
}

proptest! {
    #[test]
    fn prop_encode_decode_roundtrip(text in "[ -~\n\té ü世界🦀]{0,64}") {
        let tokenizer = create_tokenizer();
        let tokens = tokenizer.encode(&text).unwrap();
        prop_assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn prop_encode_is_deterministic(text in "[ -~\n\t]{0,64}") {
        let tokenizer = create_tokenizer();
        prop_assert_eq!(tokenizer.encode(&text).unwrap(), tokenizer.encode(&text).unwrap());
    }

    #[test]
    fn prop_special_token_is_atomic(prefix in "[a-z ]{0,16}", suffix in "[a-z ]{0,16}") {
        let tokenizer = create_tokenizer();
        let text = format!("{prefix}<|endoftext|>{suffix}");
        let tokens = tokenizer.encode(&text).unwrap();
        prop_assert_eq!(tokens.iter().filter(|&&id| id == ENDOFTEXT).count(), 1);
        prop_assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn prop_pack_roundtrip(ids in prop::collection::vec(0u32..=65535, 0..128)) {
        let bytes = pack(&ids).unwrap();
        prop_assert_eq!(bytes.len(), ids.len() * 2);
        prop_assert_eq!(unpack(&bytes).unwrap(), ids);
    }

    #[test]
    fn prop_base64_roundtrip(ids in prop::collection::vec(0u32..=65535, 0..128)) {
        let encoded = to_base64(&ids).unwrap();
        prop_assert_eq!(encoded.len() % 4, 0);
        prop_assert_eq!(from_base64(&encoded).unwrap(), ids);
    }

    #[test]
    fn prop_wide_ids_rejected(id in 65536u32..) {
        prop_assert!(pack(&[id]).is_err());
    }
}
