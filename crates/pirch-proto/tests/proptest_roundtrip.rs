//! Property-based tests for tokenizing and the line codec.
//!
//! Uses proptest to generate random lines and argument lists and verify
//! that:
//! 1. Tokenizing never panics and never invents bytes
//! 2. Encoded messages decode back to the same arguments (roundtrip)
//! 3. Decoded lines re-encode byte for byte
//! 4. Case mappings behave like a lowercase fold

use std::sync::Arc;

use bytes::Bytes;
use pirch_proto::{
    tokenize, ArgumentDescriptor, CaseMapping, Command, CommandRegistry, Connection, Entity,
    EntityRef, MessageCodec, Value,
};
use proptest::prelude::*;

#[derive(Debug)]
struct Name(Bytes);

impl Entity for Name {
    fn to_wire(&self) -> Bytes {
        self.0.clone()
    }
}

struct Conn {
    me: EntityRef,
}

impl Connection for Conn {
    fn resolve_entity(&self, token: &[u8]) -> EntityRef {
        Arc::new(Name(Bytes::copy_from_slice(token)))
    }

    fn local_peer(&self) -> EntityRef {
        Arc::new(Name(Bytes::from_static(b"irc.example.net")))
    }

    fn local_self(&self) -> EntityRef {
        self.me.clone()
    }
}

fn codec() -> MessageCodec {
    MessageCodec::new(
        Arc::new(CommandRegistry::with_builtins()),
        Arc::new(Conn {
            me: Arc::new(Name(Bytes::from_static(b"me"))),
        }),
    )
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// Command token: a word or a three digit numeric.
fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z]{3,10}").expect("valid regex"),
        prop::string::string_regex("[0-9]{3}").expect("valid regex"),
    ]
}

/// Middle argument: non-empty, no space, no leading colon.
fn middle_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^ :\r\n\0][^ \r\n\0]{0,15}").expect("valid regex")
}

/// Trailing argument: anything but line terminators.
fn trailing_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(" ".to_string()),
        Just(":".to_string()),
        Just("::".to_string()),
        Just(": trailing".to_string()),
        prop::string::string_regex("[^\r\n]{0,60}").expect("valid regex"),
    ]
}

/// Origin token: a server name or nick!user@host.
fn origin_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex"),
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,8}![a-z]{1,9}@[a-z.]{1,20}")
            .expect("valid regex"),
    ]
}

fn args_strategy() -> impl Strategy<Value = Vec<String>> {
    (
        prop::collection::vec(middle_strategy(), 0..8),
        prop::option::of(trailing_strategy()),
    )
        .prop_map(|(mut middles, trailing)| {
            middles.extend(trailing);
            middles
        })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn tokenize_never_panics(line in prop::collection::vec(any::<u8>(), 0..200)) {
        for token in tokenize(&line) {
            prop_assert!(token.len() <= line.len());
        }
    }

    #[test]
    fn tokenize_splits_middles(middles in prop::collection::vec(middle_strategy(), 1..10)) {
        let line = middles.join("  ");
        let tokens: Vec<&[u8]> = tokenize(line.as_bytes()).collect();
        let expected: Vec<&[u8]> = middles.iter().map(|m| m.as_bytes()).collect();
        prop_assert_eq!(tokens, expected);
    }

    #[test]
    fn encode_decode_roundtrip(
        command in command_strategy(),
        args in args_strategy(),
        origin in prop::option::of(origin_strategy()),
    ) {
        let codec = codec();
        let values = args
            .iter()
            .enumerate()
            .map(|(i, v)| (i as isize, v.clone()));
        let mut msg = codec.message(command.as_bytes(), values).unwrap();
        if let Some(origin) = &origin {
            msg = msg.with_origin(Arc::new(Name(Bytes::from(origin.clone()))));
        }

        let line = codec.encode(&msg).unwrap();
        let decoded = codec.decode(line.clone()).unwrap();

        prop_assert_eq!(decoded.command().token().as_ref(), command.as_bytes());
        let wire: Vec<Vec<u8>> = decoded
            .args()
            .iter()
            .map(|v| v.map(|b| b.to_vec()).unwrap_or_default())
            .collect();
        let expected: Vec<Vec<u8>> = args.iter().map(|a| a.as_bytes().to_vec()).collect();
        prop_assert_eq!(wire, expected);

        match &origin {
            Some(origin) => {
                let origin_wire = decoded.origin().to_wire();
                prop_assert_eq!(origin_wire.as_ref(), origin.as_bytes());
            }
            None => {
                let origin_wire = decoded.origin().to_wire();
                prop_assert_eq!(origin_wire.as_ref(), &b"irc.example.net"[..]);
            }
        }
        prop_assert_eq!(decoded.encode().unwrap(), line);
    }

    #[test]
    fn named_roundtrip(
        channel in middle_strategy(),
        key in prop::option::of(middle_strategy()),
        text in trailing_strategy(),
    ) {
        let codec = codec();
        codec
            .registry()
            .register(
                Command::new("TOPICX")
                    .with_argument(ArgumentDescriptor::raw("channel", 0).unwrap())
                    .unwrap()
                    .with_argument(ArgumentDescriptor::raw("key", 1).unwrap())
                    .unwrap()
                    .with_argument(ArgumentDescriptor::raw("text", -1).unwrap())
                    .unwrap(),
            )
            .unwrap();

        let mut values = vec![("channel", channel.clone()), ("text", text.clone())];
        if let Some(key) = &key {
            values.push(("key", key.clone()));
        }
        let msg = codec.message(b"TOPICX", values).unwrap();
        let decoded = codec.decode(codec.encode(&msg).unwrap()).unwrap();

        prop_assert_eq!(decoded.get("channel").unwrap(), Value::from(channel));
        prop_assert_eq!(decoded.get("text").unwrap(), Value::from(text));
        if let Some(key) = key {
            prop_assert_eq!(decoded.get("key").unwrap(), Value::from(key));
        }
    }

    #[test]
    fn decode_reencodes_exactly(line in "[^\r\n]{0,120}") {
        let codec = codec();
        if let Some(msg) = codec.decode(Bytes::from(line.clone())) {
            let encoded = msg.encode().unwrap();
            prop_assert_eq!(encoded.as_ref(), line.as_bytes());
        }
    }

    #[test]
    fn casemap_is_a_fold(s in "[ -~]{0,40}") {
        for mapping in CaseMapping::ALL {
            let lower = mapping.to_lower_str(&s);
            prop_assert_eq!(mapping.to_lower_str(&lower), lower.clone());
            prop_assert!(mapping.equals(s.as_bytes(), lower.as_bytes()));
            prop_assert_eq!(lower.len(), s.len());
        }
    }
}
