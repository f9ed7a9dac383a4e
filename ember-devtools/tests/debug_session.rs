//! A client driving a debug session over an in-process channel.

use std::thread::{self, JoinHandle};

use ember_devtools::protocol::{Paused, RemoveBreakpoint, SetBreakpoint, SetPauseOnExceptions};
use ember_devtools::{
    ChannelTransport, DebugSession, Message, PauseOnExceptions, PauseReason, Transport,
};
use ember_js::{ConsoleLevel, Interpreter};

const PROGRAM: &str = "\
function square(n) {
  var result = n * n;
  return result;
}
var total = 0;
for (var i = 1; i <= 3; i++) {
  total += square(i);
}
console.log('total', total);
";

struct Client {
    transport: ChannelTransport,
    engine: Option<JoinHandle<Result<String, String>>>,
}

impl Client {
    /// Start `source` on an engine thread. `setup` runs before the first
    /// statement, so breakpoints set there are in place from the start.
    fn launch(source: &'static str, setup: impl FnOnce(&mut ChannelTransport)) -> Self {
        let (mut transport, server) = ChannelTransport::pair();
        setup(&mut transport);
        let engine = thread::spawn(move || {
            let mut interp = Interpreter::new();
            interp.set_debug_hook(Box::new(DebugSession::new(server)));
            interp
                .run_named(source, "program.js")
                .map(|value| ember_js::coerce::to_string(&value))
                .map_err(|err| err.to_string())
        });
        Client {
            transport,
            engine: Some(engine),
        }
    }

    fn send(&mut self, message: Message) {
        self.transport.send(&message).unwrap();
    }

    /// Next event, skipping the ones every run produces.
    fn event(&mut self) -> Message {
        loop {
            match self.transport.receive().unwrap() {
                Message::Hello(_)
                | Message::ScriptParsed(_)
                | Message::BreakpointSet(_)
                | Message::Resumed => continue,
                other => return other,
            }
        }
    }

    fn paused(&mut self) -> Paused {
        match self.event() {
            Message::Paused(paused) => paused,
            other => panic!("expected paused, got {:?}", other),
        }
    }

    fn finish(mut self) -> (Result<String, String>, Vec<Message>) {
        let result = self.engine.take().unwrap().join().unwrap();
        let rest = std::iter::from_fn(|| self.transport.try_receive().ok().flatten()).collect();
        (result, rest)
    }
}

fn breakpoint(line: usize) -> Message {
    Message::SetBreakpoint(SetBreakpoint { line, column: None })
}

#[test]
fn pauses_at_breakpoint_and_reports_scope() {
    let mut client = Client::launch(PROGRAM, |t| t.send(&breakpoint(2)).unwrap());

    let paused = client.paused();
    assert_eq!(paused.reason, PauseReason::Breakpoint);
    assert_eq!(paused.hit_breakpoints, vec![1]);
    assert_eq!(paused.location.line, 2);
    assert_eq!(paused.location.url, "program.js");
    let functions: Vec<&str> = paused
        .call_stack
        .iter()
        .map(|frame| frame.function_name.as_str())
        .collect();
    assert_eq!(functions, vec!["square", "(global)"]);
    assert_eq!(paused.call_stack[1].location.line, 7);

    client.send(Message::GetScope);
    let Message::Scope(scope) = client.event() else {
        panic!("expected scope");
    };
    let n = scope.variables.iter().find(|v| v.name == "n").unwrap();
    assert_eq!(n.value, "1");
    let total = scope.variables.iter().find(|v| v.name == "total").unwrap();
    assert_eq!(total.value, "0");

    // Each loop iteration hits the breakpoint again.
    client.send(Message::Resume);
    assert_eq!(client.paused().location.line, 2);
    client.send(Message::RemoveBreakpoint(RemoveBreakpoint { id: 1 }));
    assert_eq!(
        client.event(),
        Message::BreakpointRemoved(ember_devtools::protocol::BreakpointRemoved { id: 1 })
    );
    client.send(Message::Resume);

    let (result, rest) = client.finish();
    assert!(result.is_ok());
    assert!(rest.iter().any(|m| matches!(
        m,
        Message::ConsoleMessage(entry) if entry.level == ConsoleLevel::Log && entry.text == "total 14"
    )));
    assert!(matches!(rest.last(), Some(Message::ExecutionFinished(f)) if f.error.is_none()));
}

#[test]
fn step_over_does_not_enter_calls() {
    let mut client = Client::launch(PROGRAM, |t| t.send(&breakpoint(7)).unwrap());
    assert_eq!(client.paused().location.line, 7);

    client.send(Message::StepOver);
    let stepped = client.paused();
    assert_eq!(stepped.reason, PauseReason::Step);
    // Back at the loop body for the next iteration, never inside `square`.
    assert_eq!(stepped.location.line, 7);
    assert_eq!(stepped.call_stack.len(), 1);

    client.send(Message::RemoveBreakpoint(RemoveBreakpoint { id: 1 }));
    client.event();
    client.send(Message::Resume);
    assert!(client.finish().0.is_ok());
}

#[test]
fn step_into_then_out() {
    let mut client = Client::launch(PROGRAM, |t| t.send(&breakpoint(7)).unwrap());
    client.paused();

    client.send(Message::StepInto);
    let inside = client.paused();
    assert_eq!(inside.location.line, 2);
    assert_eq!(inside.call_stack[0].function_name, "square");

    client.send(Message::StepOut);
    let outside = client.paused();
    assert_eq!(outside.call_stack.len(), 1);

    client.send(Message::Terminate);
    let (result, _) = client.finish();
    assert!(result.unwrap_err().contains("Terminated"));
}

#[test]
fn pause_on_uncaught_exceptions_only() {
    let source = "\
try { throw new Error('handled'); } catch (e) {}
var obj = null;
obj.field;
";
    let mut client = Client::launch(source, |t| {
        t.send(&Message::SetPauseOnExceptions(SetPauseOnExceptions {
            mode: PauseOnExceptions::Uncaught,
        }))
        .unwrap();
    });

    let Message::ExceptionThrown(first) = client.event() else {
        panic!("expected exception");
    };
    assert!(first.caught);
    assert_eq!(first.message, "handled");

    let Message::ExceptionThrown(second) = client.event() else {
        panic!("expected exception");
    };
    assert!(!second.caught);
    assert_eq!(second.name, "TypeError");
    assert_eq!(second.location.as_ref().map(|l| l.line), Some(3));

    let paused = client.paused();
    assert_eq!(paused.reason, PauseReason::Exception);
    assert_eq!(paused.location.line, 3);
    client.send(Message::Resume);

    let (result, rest) = client.finish();
    assert!(result.unwrap_err().contains("TypeError"));
    assert!(matches!(rest.last(), Some(Message::ExecutionFinished(f)) if f.error.is_some()));
}

#[test]
fn invalid_commands_get_protocol_errors() {
    let mut client = Client::launch("debugger;", |t| {
        t.send_raw(r#"{"type": "bogus"}"#).unwrap();
    });
    let Message::ProtocolError(error) = client.event() else {
        panic!("expected protocol error");
    };
    assert!(error.message.contains("bogus"));

    client.paused();
    client.send(Message::Pause);
    assert!(matches!(client.event(), Message::ProtocolError(_)));
    client.send(Message::RemoveBreakpoint(RemoveBreakpoint { id: 42 }));
    let Message::ProtocolError(error) = client.event() else {
        panic!("expected protocol error");
    };
    assert_eq!(error.message, "unknown breakpoint id 42");
    client.send(Message::Resume);
    assert!(client.finish().0.is_ok());
}
