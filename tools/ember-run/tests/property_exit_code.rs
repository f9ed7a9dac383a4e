//! Property 4: Exit code contract
//!
//! For any `RunError` variant, `code()` returns 1 or 2. Infrastructure
//! errors map to 2, script failures map to 1, and only script failures
//! carry a source location.

use std::path::PathBuf;

use ember_devtools::TransportError;
use ember_js::ConfigError;
use ember_run::error::RunError;
use proptest::prelude::*;

/// Strategy that produces an arbitrary `RunError` variant.
///
/// Script failures are produced by really lexing, parsing or running a
/// broken script so their payloads are genuine.
fn arb_run_error() -> impl Strategy<Value = RunError> {
    (0..=7u8, "[a-z]{1,8}").prop_map(|(tag, s)| match tag {
        // Infrastructure errors (exit code 2)
        0 => RunError::FileNotFound {
            path: PathBuf::from(format!("{s}.js")),
        },
        1 => RunError::Config(ConfigError::Invalid(s)),
        2 => RunError::Transport(TransportError::Disconnected),
        3 => RunError::Io(std::io::Error::other(s)),
        4 => RunError::Json(serde_json::from_str::<serde_json::Value>(&format!("[{s}")).unwrap_err()),

        // Script errors (exit code 1)
        5 => RunError::Script {
            error: ember_js::eval(&format!("throw '{s}';")).unwrap_err(),
            console: Vec::new(),
        },
        6 => RunError::Parse(ember_js::parser::parse(&format!("var {s} = ;"), "prop.js").unwrap_err()),
        _ => RunError::Lex(ember_js::lexer::tokenize(&format!("'{s}")).unwrap_err()),
    })
}

fn is_infrastructure(err: &RunError) -> bool {
    matches!(
        err,
        RunError::FileNotFound { .. }
            | RunError::Config(_)
            | RunError::Transport(_)
            | RunError::Io(_)
            | RunError::Json(_)
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn exit_code_matches_category(err in arb_run_error()) {
        let code = err.code();
        prop_assert!(code == 1 || code == 2);
        if is_infrastructure(&err) {
            prop_assert_eq!(code, 2);
            prop_assert!(err.location().is_none());
        } else {
            prop_assert_eq!(code, 1);
            prop_assert!(err.location().is_some());
        }
    }

    #[test]
    fn error_message_is_never_empty(err in arb_run_error()) {
        prop_assert!(!err.to_string().is_empty());
    }
}
