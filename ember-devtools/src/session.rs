//! Debug session: the engine's [`DebugHook`] speaking the protocol.
//!
//! The session reports engine events over its transport and services
//! commands. While running it only polls for commands before each
//! statement. While paused it blocks on the transport until told to
//! resume, step or terminate.
//!
//! If the client disconnects, the session detaches: breakpoints are
//! dropped and the script runs to completion.

use ember_js::builtin::global::inspect;
use ember_js::coerce::type_of;
use ember_js::{
    ConsoleLevel, DebugAction, DebugFrame, DebugHook, ScriptInfo, ThrownError, Value,
};

use crate::debugger::{Debugger, PauseDecision, StepAction};
use crate::protocol::{
    BreakpointRemoved, BreakpointSet, ConsoleEntry, ExceptionThrown, ExecutionFinished, Hello,
    Location, Message, PauseReason, Paused, ScopeVariables, ScriptId, ScriptParsed, StackFrame,
    Variable, PROTOCOL_VERSION,
};
use crate::transport::{Transport, TransportError};

/// Outcome of handling one command.
enum Flow {
    Stay,
    Abort,
}

/// A debugger attached to one interpreter.
pub struct DebugSession<T: Transport> {
    transport: T,
    debugger: Debugger,
    next_script_id: ScriptId,
    detached: bool,
}

impl<T: Transport> DebugSession<T> {
    /// Start a session, greeting the client with `hello`.
    pub fn new(transport: T) -> Self {
        let mut session = Self {
            transport,
            debugger: Debugger::new(),
            next_script_id: 1,
            detached: false,
        };
        session.send(Message::Hello(Hello {
            protocol_version: PROTOCOL_VERSION,
            engine_version: ember_js::VERSION.to_string(),
        }));
        session
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// Breakpoints and modes set here apply before any command arrives.
    pub fn debugger_mut(&mut self) -> &mut Debugger {
        &mut self.debugger
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    fn send(&mut self, message: Message) {
        if self.detached {
            return;
        }
        if let Err(err) = self.transport.send(&message) {
            log::warn!("[devtools] cannot send {}: {}", message, err);
            self.detach();
        }
    }

    fn detach(&mut self) {
        if !self.detached {
            log::warn!("[devtools] client disconnected, continuing without debugger");
        }
        self.detached = true;
        self.debugger.clear();
    }

    fn report_bad_message(&mut self, err: TransportError) {
        match err {
            TransportError::Codec(err) => {
                log::warn!("[devtools] {}", err);
                self.send(Message::protocol_error(err.to_string()));
            }
            other => {
                log::debug!("[devtools] transport: {}", other);
                self.detach();
            }
        }
    }

    /// Service every command that arrived while the script was running.
    fn drain_commands(&mut self) -> DebugAction {
        while !self.detached {
            match self.transport.try_receive() {
                Ok(Some(message)) => {
                    if let Flow::Abort = self.handle_running(message) {
                        return DebugAction::Abort;
                    }
                }
                Ok(None) => break,
                Err(err) => self.report_bad_message(err),
            }
        }
        DebugAction::Continue
    }

    fn handle_running(&mut self, message: Message) -> Flow {
        match message {
            Message::Pause => {
                self.debugger.request_pause(PauseReason::PauseRequest);
                Flow::Stay
            }
            Message::Terminate => Flow::Abort,
            m @ (Message::Resume
            | Message::StepInto
            | Message::StepOver
            | Message::StepOut
            | Message::GetScope) => {
                self.send(Message::protocol_error(format!(
                    "'{}' requires a paused script",
                    m.type_name()
                )));
                Flow::Stay
            }
            other => self.handle_configuration(other),
        }
    }

    /// Commands valid in any state.
    fn handle_configuration(&mut self, message: Message) -> Flow {
        match message {
            Message::SetBreakpoint(request) => {
                let breakpoint = self.debugger.set_breakpoint(request.line, request.column);
                self.send(Message::BreakpointSet(BreakpointSet {
                    id: breakpoint.id,
                    line: breakpoint.line,
                    column: breakpoint.column,
                }));
            }
            Message::RemoveBreakpoint(request) => {
                if self.debugger.remove_breakpoint(request.id) {
                    self.send(Message::BreakpointRemoved(BreakpointRemoved { id: request.id }));
                } else {
                    self.send(Message::protocol_error(format!(
                        "unknown breakpoint id {}",
                        request.id
                    )));
                }
            }
            Message::SetPauseOnExceptions(request) => {
                self.debugger.set_pause_on_exceptions(request.mode);
            }
            other => {
                self.send(Message::protocol_error(format!(
                    "'{}' is not a command",
                    other.type_name()
                )));
            }
        }
        Flow::Stay
    }

    /// Report a stop and block until the client lets execution go on.
    fn pause(&mut self, decision: PauseDecision, frame: &DebugFrame<'_>) -> DebugAction {
        if self.detached {
            return DebugAction::Continue;
        }
        let location = &frame.location;
        self.debugger
            .enter_pause(location.line, location.column, frame.call_depth);
        log::debug!("[devtools] paused at {} ({:?})", location, decision.reason);

        let call_stack = frame.stack_trace().iter().map(StackFrame::from).collect();
        self.send(Message::Paused(Paused {
            reason: decision.reason,
            location: Location::from(location),
            call_stack,
            hit_breakpoints: decision.hit_breakpoints,
        }));

        loop {
            if self.detached {
                self.debugger.resume(None, frame.call_depth);
                return DebugAction::Continue;
            }
            let message = match self.transport.receive() {
                Ok(message) => message,
                Err(err) => {
                    self.report_bad_message(err);
                    continue;
                }
            };

            let step = match message {
                Message::Resume => None,
                Message::StepInto => Some(StepAction::StepInto),
                Message::StepOver => Some(StepAction::StepOver),
                Message::StepOut => Some(StepAction::StepOut),
                Message::GetScope => {
                    let variables = scope_variables(frame);
                    self.send(Message::Scope(ScopeVariables { variables }));
                    continue;
                }
                Message::Terminate => {
                    self.debugger.resume(None, frame.call_depth);
                    return DebugAction::Abort;
                }
                Message::Pause => {
                    self.send(Message::protocol_error("already paused"));
                    continue;
                }
                other => {
                    self.handle_configuration(other);
                    continue;
                }
            };

            self.debugger.resume(step, frame.call_depth);
            self.send(Message::Resumed);
            return DebugAction::Continue;
        }
    }
}

/// Visible variables, innermost binding first for shadowed names.
fn scope_variables(frame: &DebugFrame<'_>) -> Vec<Variable> {
    frame
        .variables()
        .into_iter()
        .map(|(name, value)| Variable {
            name,
            kind: type_of(&value).to_string(),
            value: inspect(&value),
        })
        .collect()
}

impl<T: Transport> DebugHook for DebugSession<T> {
    fn script_parsed(&mut self, script: &ScriptInfo) {
        let script_id = self.next_script_id;
        self.next_script_id += 1;
        self.send(Message::ScriptParsed(ScriptParsed {
            script_id,
            url: script.name.clone(),
            line_count: script.line_count,
            length: script.length,
        }));
    }

    fn before_statement(&mut self, frame: &DebugFrame<'_>) -> DebugAction {
        if self.drain_commands() == DebugAction::Abort {
            return DebugAction::Abort;
        }
        let location = &frame.location;
        match self
            .debugger
            .check_statement(location.line, location.column, frame.call_depth)
        {
            Some(decision) => self.pause(decision, frame),
            None => DebugAction::Continue,
        }
    }

    fn debugger_statement(&mut self, frame: &DebugFrame<'_>) -> DebugAction {
        let decision = PauseDecision {
            reason: PauseReason::DebuggerStatement,
            hit_breakpoints: Vec::new(),
        };
        self.pause(decision, frame)
    }

    fn exception_thrown(
        &mut self,
        error: &ThrownError,
        caught: bool,
        frame: &DebugFrame<'_>,
    ) -> DebugAction {
        self.send(Message::ExceptionThrown(ExceptionThrown {
            name: error.name.clone(),
            message: error.message.clone(),
            location: error.source_info.as_ref().map(Location::from),
            caught,
        }));
        if !self.debugger.should_pause_on_exception(caught) {
            return DebugAction::Continue;
        }
        let decision = PauseDecision {
            reason: PauseReason::Exception,
            hit_breakpoints: Vec::new(),
        };
        self.pause(decision, frame)
    }

    fn console_message(&mut self, level: ConsoleLevel, text: &str) {
        self.send(Message::ConsoleMessage(ConsoleEntry {
            level,
            text: text.to_string(),
        }));
    }

    fn script_finished(&mut self, result: Result<&Value, &ThrownError>) {
        let finished = match result {
            Ok(value) => ExecutionFinished {
                result: Some(inspect(value)),
                error: None,
            },
            Err(err) => ExecutionFinished {
                result: None,
                error: Some(err.to_string()),
            },
        };
        self.send(Message::ExecutionFinished(finished));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use ember_js::Interpreter;

    use crate::protocol::SetBreakpoint;
    use crate::transport::ChannelTransport;

    /// Run `source` under a session on another thread; `client` drives it.
    fn run_debugged(
        source: &'static str,
        client: impl FnOnce(&mut ChannelTransport),
    ) -> Result<Value, String> {
        let (mut client_end, server_end) = ChannelTransport::pair();
        let engine = thread::spawn(move || {
            let mut interp = Interpreter::new();
            interp.set_debug_hook(Box::new(DebugSession::new(server_end)));
            interp
                .run_named(source, "test.js")
                .map(|value| inspect(&value))
                .map_err(|err| err.to_string())
        });
        client(&mut client_end);
        engine
            .join()
            .unwrap()
            .map(Value::from)
    }

    fn next_event(client: &mut ChannelTransport) -> Message {
        loop {
            match client.receive().unwrap() {
                Message::ScriptParsed(_) | Message::Hello(_) => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn test_debugger_statement_pauses_until_resume() {
        let result = run_debugged("var a = 1;\ndebugger;\na + 1", |client| {
            let Message::Paused(paused) = next_event(client) else {
                panic!("expected pause");
            };
            assert_eq!(paused.reason, PauseReason::DebuggerStatement);
            assert_eq!(paused.location.line, 2);
            assert_eq!(paused.call_stack.len(), 1);

            client.send(&Message::GetScope).unwrap();
            let Message::Scope(scope) = next_event(client) else {
                panic!("expected scope");
            };
            let a = scope.variables.iter().find(|v| v.name == "a").unwrap();
            assert_eq!((a.kind.as_str(), a.value.as_str()), ("number", "1"));

            client.send(&Message::Resume).unwrap();
            assert_eq!(next_event(client), Message::Resumed);
        });
        assert_eq!(result, Ok(Value::from("2")));
    }

    #[test]
    fn test_terminate_aborts_the_script() {
        let result = run_debugged("debugger;\nvar never = 1;", |client| {
            assert!(matches!(next_event(client), Message::Paused(_)));
            client.send(&Message::Terminate).unwrap();
        });
        assert!(result.unwrap_err().contains("Terminated"));
    }

    #[test]
    fn test_commands_that_need_a_pause_are_rejected_while_running() {
        let (mut client, server) = ChannelTransport::pair();
        client.send(&Message::StepOver).unwrap();
        client
            .send(&Message::SetBreakpoint(SetBreakpoint {
                line: 99,
                column: None,
            }))
            .unwrap();

        let mut interp = Interpreter::new();
        interp.set_debug_hook(Box::new(DebugSession::new(server)));
        interp.run("1 + 1").unwrap();

        let events: Vec<Message> = std::iter::from_fn(|| client.try_receive().unwrap()).collect();
        let types: Vec<&str> = events.iter().map(Message::type_name).collect();
        assert_eq!(
            types,
            vec!["hello", "scriptParsed", "protocolError", "breakpointSet", "executionFinished"]
        );
    }

    #[test]
    fn test_disconnected_client_detaches() {
        let (client, server) = ChannelTransport::pair();
        drop(client);
        let mut interp = Interpreter::new();
        interp.set_debug_hook(Box::new(DebugSession::new(server)));
        assert_eq!(interp.run("debugger; 5").unwrap(), Value::from(5));
    }
}
