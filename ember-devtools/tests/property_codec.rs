//! Property 3: codec round-trip
//!
//! For any protocol message, decoding its encoding yields the same message,
//! and the encoded object carries the registered discriminator in `type`.

use ember_devtools::protocol::*;
use ember_devtools::MessageRegistry;
use ember_js::ConsoleLevel;
use proptest::prelude::*;

fn arb_location() -> impl Strategy<Value = Location> {
    ("[a-z]{1,8}\\.js", 1usize..500, 1usize..120).prop_map(|(url, line, column)| Location {
        url,
        line,
        column,
    })
}

fn arb_reason() -> impl Strategy<Value = PauseReason> {
    prop_oneof![
        Just(PauseReason::Breakpoint),
        Just(PauseReason::Step),
        Just(PauseReason::DebuggerStatement),
        Just(PauseReason::Exception),
        Just(PauseReason::PauseRequest),
        Just(PauseReason::Entry),
    ]
}

fn arb_level() -> impl Strategy<Value = ConsoleLevel> {
    prop_oneof![
        Just(ConsoleLevel::Log),
        Just(ConsoleLevel::Info),
        Just(ConsoleLevel::Warn),
        Just(ConsoleLevel::Error),
        Just(ConsoleLevel::Debug),
    ]
}

const TEXT: &str = ".{0,24}";

fn arb_command() -> impl Strategy<Value = Message> {
    prop_oneof![
        (1usize..1000, proptest::option::of(1usize..200))
            .prop_map(|(line, column)| Message::SetBreakpoint(SetBreakpoint { line, column })),
        any::<u32>().prop_map(|id| Message::RemoveBreakpoint(RemoveBreakpoint { id })),
        Just(Message::Resume),
        Just(Message::Pause),
        Just(Message::StepInto),
        Just(Message::StepOver),
        Just(Message::StepOut),
        prop_oneof![
            Just(PauseOnExceptions::None),
            Just(PauseOnExceptions::Uncaught),
            Just(PauseOnExceptions::All),
        ]
        .prop_map(|mode| Message::SetPauseOnExceptions(SetPauseOnExceptions { mode })),
        Just(Message::GetScope),
        Just(Message::Terminate),
    ]
}

fn arb_event() -> impl Strategy<Value = Message> {
    let text = TEXT;
    let lifecycle = prop_oneof![
        (any::<u32>(), text).prop_map(|(protocol_version, engine_version)| {
            Message::Hello(Hello {
                protocol_version,
                engine_version,
            })
        }),
        (any::<u32>(), text, 1usize..1000, 0usize..100_000).prop_map(
            |(script_id, url, line_count, length)| Message::ScriptParsed(ScriptParsed {
                script_id,
                url,
                line_count,
                length,
            })
        ),
        (any::<u32>(), 1usize..1000, proptest::option::of(1usize..200)).prop_map(
            |(id, line, column)| Message::BreakpointSet(BreakpointSet { id, line, column })
        ),
        any::<u32>().prop_map(|id| Message::BreakpointRemoved(BreakpointRemoved { id })),
        Just(Message::Resumed),
        (proptest::option::of(text), proptest::option::of(text)).prop_map(|(result, error)| {
            Message::ExecutionFinished(ExecutionFinished { result, error })
        }),
    ];
    let inspection = prop_oneof![
        (
            arb_reason(),
            arb_location(),
            prop::collection::vec(("[a-z]{0,8}", arb_location()), 0..4),
            prop::collection::vec(any::<u32>(), 0..3),
        )
            .prop_map(|(reason, location, frames, hit_breakpoints)| {
                Message::Paused(Paused {
                    reason,
                    location,
                    call_stack: frames
                        .into_iter()
                        .map(|(function_name, location)| StackFrame {
                            function_name,
                            location,
                        })
                        .collect(),
                    hit_breakpoints,
                })
            }),
        prop::collection::vec(("[a-z_]{1,8}", "[a-z]{4,9}", text), 0..5).prop_map(|vars| {
            Message::Scope(ScopeVariables {
                variables: vars
                    .into_iter()
                    .map(|(name, kind, value)| Variable { name, kind, value })
                    .collect(),
            })
        }),
        (arb_level(), text).prop_map(|(level, text)| Message::ConsoleMessage(ConsoleEntry {
            level,
            text
        })),
        (text, text, proptest::option::of(arb_location()), any::<bool>()).prop_map(
            |(name, message, location, caught)| Message::ExceptionThrown(ExceptionThrown {
                name,
                message,
                location,
                caught,
            })
        ),
        text.prop_map(Message::protocol_error),
    ];
    prop_oneof![lifecycle, inspection]
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![arb_command(), arb_event()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn messages_round_trip(message in arb_message()) {
        let text = message.encode().unwrap();
        let decoded = Message::decode(&text).unwrap();
        prop_assert_eq!(&decoded, &message);

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let tag = json.get("type").and_then(|t| t.as_str()).unwrap();
        prop_assert_eq!(tag, message.type_name());
        prop_assert!(MessageRegistry::global().contains(tag));
    }

    #[test]
    fn unregistered_tags_are_rejected(tag in "[a-zA-Z]{1,16}") {
        prop_assume!(!MessageRegistry::global().contains(&tag));
        let text = serde_json::json!({ "type": tag }).to_string();
        let is_unknown = matches!(Message::decode(&text), Err(CodecError::UnknownSubtype(ref t)) if *t == tag);
        prop_assert!(is_unknown);
    }
}

#[test]
fn every_registered_type_has_a_variant() {
    let fieldless = |name: &str| serde_json::json!({ "type": name });
    for name in MessageRegistry::global().type_names() {
        match Message::from_json(fieldless(name)) {
            Ok(message) => assert_eq!(message.type_name(), name),
            // Variants with required fields reject an empty payload, but
            // they are still found by name.
            Err(err) => assert!(
                matches!(err, CodecError::InvalidFields { type_name, .. } if type_name == name),
                "{}: {}",
                name,
                err
            ),
        }
    }
}
