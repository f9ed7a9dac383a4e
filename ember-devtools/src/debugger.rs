//! Debugger state: breakpoints, stepping and exception pausing.
//!
//! The state machine knows nothing about transports. The session asks it
//! whether to stop before each statement and on each exception.

use std::collections::BTreeMap;

use crate::protocol::{BreakpointId, PauseOnExceptions, PauseReason};

/// A line breakpoint, optionally narrowed to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub line: usize,
    pub column: Option<usize>,
}

impl Breakpoint {
    fn matches(&self, line: usize, column: usize) -> bool {
        self.line == line && self.column.map_or(true, |c| c == column)
    }
}

/// Step action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Stop at the very next statement.
    StepInto,
    /// Stop at the next statement not inside a deeper call.
    StepOver,
    /// Stop once the current function has returned.
    StepOut,
}

/// A step in progress, with the call depth it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    action: StepAction,
    depth: usize,
}

/// Where execution last stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stop {
    line: usize,
    column: usize,
    depth: usize,
}

/// Debugger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerState {
    Running,
    Paused,
}

/// Reason and breakpoints of a decision to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseDecision {
    pub reason: PauseReason,
    pub hit_breakpoints: Vec<BreakpointId>,
}

/// Script debugger.
#[derive(Debug)]
pub struct Debugger {
    state: DebuggerState,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_breakpoint_id: BreakpointId,
    exception_pause_mode: PauseOnExceptions,
    step: Option<Step>,
    /// Set by a `pause` command or stop-on-entry.
    pause_request: Option<PauseReason>,
    /// Statements later on the line of the last stop do not re-trigger its
    /// breakpoints.
    last_stop: Option<Stop>,
}

impl Debugger {
    pub fn new() -> Self {
        Self {
            state: DebuggerState::Running,
            breakpoints: BTreeMap::new(),
            next_breakpoint_id: 1,
            exception_pause_mode: PauseOnExceptions::None,
            step: None,
            pause_request: None,
            last_stop: None,
        }
    }

    pub fn state(&self) -> DebuggerState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == DebuggerState::Paused
    }

    /// Set a breakpoint.
    pub fn set_breakpoint(&mut self, line: usize, column: Option<usize>) -> Breakpoint {
        let id = self.next_breakpoint_id;
        self.next_breakpoint_id += 1;
        let breakpoint = Breakpoint { id, line, column };
        self.breakpoints.insert(id, breakpoint.clone());
        log::debug!("[debugger] breakpoint {} at line {}", id, line);
        breakpoint
    }

    /// Remove a breakpoint. Returns `false` if the ID is unknown.
    pub fn remove_breakpoint(&mut self, id: BreakpointId) -> bool {
        self.breakpoints.remove(&id).is_some()
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Drop every breakpoint and pending step.
    pub fn clear(&mut self) {
        self.breakpoints.clear();
        self.step = None;
        self.pause_request = None;
        self.exception_pause_mode = PauseOnExceptions::None;
    }

    pub fn set_pause_on_exceptions(&mut self, mode: PauseOnExceptions) {
        self.exception_pause_mode = mode;
    }

    pub fn pause_on_exceptions(&self) -> PauseOnExceptions {
        self.exception_pause_mode
    }

    /// Stop before the next statement.
    pub fn request_pause(&mut self, reason: PauseReason) {
        self.pause_request = Some(reason);
    }

    /// Leave the paused state, optionally stepping from `depth`.
    pub fn resume(&mut self, step: Option<StepAction>, depth: usize) {
        self.state = DebuggerState::Running;
        self.step = step.map(|action| Step { action, depth });
    }

    /// Enter the paused state at a statement.
    pub fn enter_pause(&mut self, line: usize, column: usize, depth: usize) {
        self.state = DebuggerState::Paused;
        self.step = None;
        self.pause_request = None;
        self.last_stop = Some(Stop {
            line,
            column,
            depth,
        });
    }

    /// Decide whether to stop before the statement at `line:column`, running
    /// at call depth `depth`.
    pub fn check_statement(&mut self, line: usize, column: usize, depth: usize) -> Option<PauseDecision> {
        if let Some(reason) = self.pause_request {
            return Some(PauseDecision {
                reason,
                hit_breakpoints: Vec::new(),
            });
        }

        if let Some(step) = self.step {
            let arrived = match step.action {
                StepAction::StepInto => true,
                StepAction::StepOver => depth <= step.depth,
                StepAction::StepOut => depth < step.depth,
            };
            if arrived {
                return Some(PauseDecision {
                    reason: PauseReason::Step,
                    hit_breakpoints: Vec::new(),
                });
            }
        }

        let same_line_as_stop = match self.last_stop {
            Some(stop) if stop.line == line => stop.depth == depth && column > stop.column,
            Some(_) => {
                self.last_stop = None;
                false
            }
            None => false,
        };
        if same_line_as_stop {
            return None;
        }

        let hits: Vec<BreakpointId> = self
            .breakpoints
            .values()
            .filter(|bp| bp.matches(line, column))
            .map(|bp| bp.id)
            .collect();
        if hits.is_empty() {
            return None;
        }
        Some(PauseDecision {
            reason: PauseReason::Breakpoint,
            hit_breakpoints: hits,
        })
    }

    /// Whether an exception should pause execution.
    pub fn should_pause_on_exception(&self, caught: bool) -> bool {
        match self.exception_pause_mode {
            PauseOnExceptions::None => false,
            PauseOnExceptions::Uncaught => !caught,
            PauseOnExceptions::All => true,
        }
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints() {
        let mut debugger = Debugger::new();
        let bp = debugger.set_breakpoint(10, None);
        assert_eq!(bp.id, 1);
        assert_eq!(debugger.set_breakpoint(12, Some(5)).id, 2);

        let hit = debugger.check_statement(10, 3, 0).unwrap();
        assert_eq!(hit.reason, PauseReason::Breakpoint);
        assert_eq!(hit.hit_breakpoints, vec![1]);

        assert!(debugger.check_statement(12, 1, 0).is_none());
        assert!(debugger.check_statement(12, 5, 0).is_some());

        assert!(debugger.remove_breakpoint(1));
        assert!(!debugger.remove_breakpoint(1));
        assert!(debugger.check_statement(10, 3, 0).is_none());
    }

    #[test]
    fn test_later_statements_on_a_stopped_line_do_not_stop_again() {
        let mut debugger = Debugger::new();
        debugger.set_breakpoint(4, None);
        assert!(debugger.check_statement(4, 1, 0).is_some());
        debugger.enter_pause(4, 1, 0);
        debugger.resume(None, 0);

        // `if (x) { y(); }` runs `y();` on the same line.
        assert!(debugger.check_statement(4, 10, 0).is_none());
        // A loop coming back to the line stops again.
        assert!(debugger.check_statement(4, 1, 0).is_some());
        // So does reaching the line after visiting another one.
        assert!(debugger.check_statement(5, 1, 0).is_none());
        assert!(debugger.check_statement(4, 10, 0).is_some());
    }

    #[test]
    fn test_step_over_skips_deeper_calls() {
        let mut debugger = Debugger::new();
        debugger.enter_pause(1, 1, 0);
        debugger.resume(Some(StepAction::StepOver), 0);
        assert!(debugger.check_statement(7, 3, 1).is_none());
        let decision = debugger.check_statement(2, 1, 0).unwrap();
        assert_eq!(decision.reason, PauseReason::Step);
    }

    #[test]
    fn test_step_into_and_out() {
        let mut debugger = Debugger::new();
        debugger.enter_pause(1, 1, 0);
        debugger.resume(Some(StepAction::StepInto), 0);
        assert!(debugger.check_statement(7, 3, 1).is_some());

        debugger.enter_pause(7, 3, 1);
        debugger.resume(Some(StepAction::StepOut), 1);
        assert!(debugger.check_statement(8, 3, 1).is_none());
        assert!(debugger.check_statement(2, 1, 0).is_some());
    }

    #[test]
    fn test_pause_request() {
        let mut debugger = Debugger::new();
        debugger.request_pause(PauseReason::Entry);
        assert_eq!(debugger.check_statement(1, 1, 0).unwrap().reason, PauseReason::Entry);
        debugger.enter_pause(1, 1, 0);
        assert!(debugger.is_paused());
        debugger.resume(None, 0);
        assert!(debugger.check_statement(2, 1, 0).is_none());
    }

    #[test]
    fn test_exception_pause() {
        let mut debugger = Debugger::new();
        assert!(!debugger.should_pause_on_exception(false));

        debugger.set_pause_on_exceptions(PauseOnExceptions::Uncaught);
        assert!(debugger.should_pause_on_exception(false));
        assert!(!debugger.should_pause_on_exception(true));

        debugger.set_pause_on_exceptions(PauseOnExceptions::All);
        assert!(debugger.should_pause_on_exception(true));
        assert_eq!(debugger.pause_on_exceptions(), PauseOnExceptions::All);
    }
}
