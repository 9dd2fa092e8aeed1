//! Integration tests for the u16 little-endian wire format and its base64 form.

use tokenwire::{from_base64, pack, to_base64, unpack, Tokenizer, TokenizerError, TransportError};

const DEFINITION: &str = include_str!("fixtures/tokenizer.json");

#[test]
fn test_pack_layout() {
    let bytes = pack(&[1, 256, 65535]).unwrap();
    assert_eq!(bytes, vec![0x01, 0x00, 0x00, 0x01, 0xFF, 0xFF]);
    assert_eq!(unpack(&bytes).unwrap(), vec![1, 256, 65535]);
}

#[test]
fn test_pack_out_of_range() {
    assert_eq!(
        pack(&[5, 65536]),
        Err(TransportError::OutOfRange { id: 65536, index: 1 })
    );
}

#[test]
fn test_unpack_odd_length() {
    assert_eq!(unpack(&[0x01, 0x00, 0x02]), Err(TransportError::OddLength(3)));
}

#[test]
fn test_base64_known_values() {
    assert_eq!(to_base64(&[1, 256]).unwrap(), "AQAAAQ==");
    assert_eq!(from_base64("AQAAAQ==").unwrap(), vec![1, 256]);
    assert_eq!(to_base64(&[]).unwrap(), "");
    assert!(from_base64("").unwrap().is_empty());
}

#[test]
fn test_base64_rejects_garbage() {
    assert!(matches!(from_base64("not base64!"), Err(TransportError::Base64(_))));
    assert_eq!(from_base64("AQID"), Err(TransportError::OddLength(3)));
}

#[test]
fn test_tokenizer_wire_roundtrip() {
    let tokenizer = create_tokenizer();
    let text = "the end of the abc<|endoftext|>hello 世界";

    let encoded = tokenizer.text_to_base64(text).unwrap();
    assert_eq!(encoded.len() % 4, 0);
    assert_eq!(
        from_base64(&encoded).unwrap(),
        tokenizer.encode(text).unwrap()
    );
    assert_eq!(tokenizer.base64_to_text(&encoded).unwrap(), text);
}

#[test]
fn test_tokenizer_wire_errors() {
    let tokenizer = create_tokenizer();

    // 0xFFFF is not a token in the fixture.
    assert!(matches!(
        tokenizer.base64_to_text("//8="),
        Err(TokenizerError::UnknownId { id: 65535, index: 0 })
    ));
    assert!(matches!(
        tokenizer.base64_to_text("AQID"),
        Err(TokenizerError::Transport(TransportError::OddLength(3)))
    ));
}

fn create_tokenizer() -> Tokenizer {
    Tokenizer::from_json_str(DEFINITION).unwrap()
}
