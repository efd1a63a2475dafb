use serialized_to_json::classify::{classify, classify_bytes, is_json, Classification};
use serialized_to_json::phpser::{empty_string_placeholder, serialize, SerKey, SerValue};
use serialized_to_json::Value;

#[test]
fn json_documents_are_valid_json() {
    let docs = [
        "{\"qty\":1,\"options\":{\"color\":\"red\"}}",
        "[]",
        "[1,2.5,\"x\",null,true]",
        "\"plain string\"",
        "42",
        "-0.5e3",
        "false",
        "null",
        "\n  {\"a\": [ ]}\t",
    ];
    for d in docs {
        assert_eq!(classify(&Value::text(d)), Classification::ValidJson, "{d}");
    }
}

#[test]
fn legacy_payloads_are_valid_legacy() {
    let order_item = SerValue::Array(vec![
        (SerKey::Str(b"info_buyRequest".to_vec()), SerValue::Array(vec![
            (SerKey::Str(b"qty".to_vec()), SerValue::Float(2.0)),
            (SerKey::Str(b"product".to_vec()), SerValue::str("1337")),
        ])),
        (SerKey::Int(7), SerValue::Bool(false)),
    ]);
    let samples = vec![
        serialize(&order_item),
        serialize(&SerValue::str("O'Reilly \"quoted\"")),
        serialize(&SerValue::Null),
        empty_string_placeholder().into_bytes(),
        b"O:8:\"stdClass\":1:{s:3:\"foo\";s:3:\"bar\";}".to_vec(),
    ];
    for s in samples {
        assert_eq!(
            classify_bytes(&s),
            Classification::ValidLegacySerialized,
            "{}",
            String::from_utf8_lossy(&s)
        );
    }
}

#[test]
fn placeholder_is_the_serialized_empty_string() {
    assert_eq!(empty_string_placeholder(), "s:0:\"\";");
    assert!(!is_json(empty_string_placeholder().as_bytes()));
}

#[test]
fn empties_are_empty() {
    for v in [Value::Null, Value::Missing, Value::text(""), Value::Blob(vec![])] {
        assert_eq!(classify(&v), Classification::Empty, "{v:?}");
    }
}

#[test]
fn neither_format_is_invalid_with_parser_text() {
    let cases = [
        ("hello", "unserialize(): Error at offset 0 of 5 bytes"),
        ("a:1:{i:0;}", "unserialize(): Error at offset 9 of 10 bytes"),
        ("i:1;i:2;", "unserialize(): Extra data starting at offset 4 of 8 bytes"),
        ("{\"a\":", "unserialize(): Error at offset 0 of 5 bytes"),
    ];
    for (input, reason) in cases {
        assert_eq!(
            classify(&Value::text(input)),
            Classification::Invalid(reason.to_string()),
            "{input}"
        );
    }
}

#[test]
fn classify_is_idempotent() {
    let inputs = ["", "0", "a:0:{}", "junk", "{\"k\":[1]}", "s:5:\"short\";"];
    for s in inputs {
        let v = Value::text(s);
        let first = classify(&v);
        for _ in 0..3 {
            assert_eq!(classify(&v), first, "{s}");
        }
    }
}

#[test]
fn out_of_range_numbers_are_still_json() {
    for d in ["1e400", "-1e400", "[1e999, 2]", "123456789012345678901234567890"] {
        assert_eq!(classify_bytes(d.as_bytes()), Classification::ValidJson, "{d}");
    }
}

#[test]
fn nesting_up_to_512_levels_is_json() {
    let nested = |n: usize| "[".repeat(n) + &"]".repeat(n);
    assert_eq!(classify_bytes(nested(200).as_bytes()), Classification::ValidJson);
    assert_eq!(classify_bytes(nested(512).as_bytes()), Classification::ValidJson);
    // json_decode gives up past 512; such a value is not serialized either
    assert!(matches!(
        classify_bytes(nested(513).as_bytes()),
        Classification::Invalid(_)
    ));
}

#[test]
fn json_requires_utf8() {
    assert!(!is_json(b"\"\xff\""));
    assert!(is_json("\"caf\u{e9}\"".as_bytes()));
}
