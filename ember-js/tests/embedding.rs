//! Host embedding: native functions, globals, console capture, config and
//! the debug hook.

use std::cell::RefCell;
use std::rc::Rc;

use ember_js::{
    ConsoleLevel, DebugAction, DebugFrame, DebugHook, EngineConfig, ExecutionContext, Interpreter,
    JsError, JsResult, ScriptError, ScriptInfo, ThrownError, Value,
};

fn host_add(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let a = interp.to_number(&ctx.arg(0))?;
    let b = interp.to_number(&ctx.arg(1))?;
    Ok(Value::Number(a + b))
}

fn host_fail(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Err(JsError::type_error(format!("rejected {} arguments", ctx.arg_count())))
}

fn host_call_back(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    interp.call_function(&ctx.arg(0), &Value::Undefined, &[Value::from(20)])
}

#[test]
fn native_functions_are_callable_from_script() {
    let mut interp = Interpreter::new();
    interp.define_native_function("add", 2, host_add);
    assert_eq!(interp.run("add(2, '3')").unwrap(), Value::from(5));
    assert_eq!(interp.run("add.length + ':' + add.name").unwrap(), Value::from("2:add"));
    assert_eq!(
        interp.run("String(add)").unwrap(),
        Value::from("function add() { [native code] }")
    );
}

#[test]
fn native_errors_are_catchable_in_script() {
    let mut interp = Interpreter::new();
    interp.define_native_function("fail", 0, host_fail);
    let result = interp
        .run("try { fail(1, 2); } catch (e) { e.name + ': ' + e.message }")
        .unwrap();
    assert_eq!(result, Value::from("TypeError: rejected 2 arguments"));
}

#[test]
fn natives_can_call_back_into_script() {
    let mut interp = Interpreter::new();
    interp.define_native_function("callBack", 1, host_call_back);
    let result = interp
        .run("var seen; callBack(function (x) { seen = x; return x * 2; }) + seen")
        .unwrap();
    assert_eq!(result, Value::from(60));
}

#[test]
fn globals_persist_between_runs() {
    let mut interp = Interpreter::new();
    interp.define_global("limit", Value::from(3));
    interp.run("var total = limit * 2; function twice(x) { return x * 2; }").unwrap();
    assert_eq!(interp.get_global("total"), Value::from(6));

    let twice = interp.get_global("twice");
    assert!(twice.is_function());
    let result = interp
        .call_function(&twice, &Value::Undefined, &[Value::from(21)])
        .unwrap();
    assert_eq!(result, Value::from(42));
    assert_eq!(interp.get_global("missing"), Value::Undefined);
}

#[test]
fn construct_from_the_host() {
    let mut interp = Interpreter::new();
    interp.run("function Box(v) { this.v = v; }").unwrap();
    let ctor = interp.get_global("Box");
    let instance = interp.construct(&ctor, &[Value::from("inside")]).unwrap();
    assert_eq!(
        interp.get_property(&instance, "v").unwrap(),
        Value::from("inside")
    );
    assert!(interp.instance_of(&instance, &ctor).unwrap());
}

#[test]
fn console_output_is_captured_in_order() {
    let mut interp = Interpreter::new();
    interp
        .run("console.log('one'); console.error('two', 2); console.info({k: [1]});")
        .unwrap();
    let output = interp.take_console_output();
    let lines: Vec<(ConsoleLevel, &str)> = output
        .iter()
        .map(|message| (message.level, message.text.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            (ConsoleLevel::Log, "one"),
            (ConsoleLevel::Error, "two 2"),
            (ConsoleLevel::Info, "{ k: [ 1 ] }"),
        ]
    );
    assert!(interp.take_console_output().is_empty());
}

#[test]
fn config_limits_call_depth_and_names_scripts() {
    let config = EngineConfig::from_toml_str("max_call_depth = 8\nscript_name = \"inline.js\"\n")
        .unwrap();
    let mut interp = Interpreter::with_config(config);
    assert_eq!(
        interp.run("function d(n) { return n ? d(n - 1) : 'ok'; } d(5)").unwrap(),
        Value::from("ok")
    );
    let err = interp.run("d(50)").unwrap_err();
    let info = err.source_info().expect("location");
    assert_eq!(info.filename, "inline.js");
    assert!(err.to_string().starts_with("Uncaught RangeError"), "{}", err);
}

#[test]
fn deep_recursion_runs_on_a_small_worker_thread() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut interp = Interpreter::new();
            // Each level re-enters the engine from the native `map`.
            let bottom = interp
                .run("function f(n) { return n ? [n - 1].map(f)[0] : 'bottom'; } f(120)")
                .unwrap();
            assert_eq!(bottom, Value::from("bottom"));

            let err = interp
                .run("function g(n) { return [n].map(g)[0]; } g(0)")
                .unwrap_err();
            assert!(err.to_string().starts_with("Uncaught RangeError"), "{}", err);

            let negations = format!("{}1{}", "-(".repeat(300), ")".repeat(300));
            assert_eq!(interp.run(&negations).unwrap(), Value::from(1));

            let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
            let err = interp.run(&parens).unwrap_err();
            assert!(matches!(err, ScriptError::Parse(_)), "{}", err);
        })
        .unwrap();
    worker.join().unwrap();
}

#[test]
fn same_seed_gives_same_random_sequence() {
    let sequence = |seed: u64| {
        let mut interp = Interpreter::with_config(EngineConfig {
            random_seed: seed,
            ..Default::default()
        });
        interp.run("[Math.random(), Math.random(), Math.random()].join()").unwrap()
    };
    assert_eq!(sequence(7), sequence(7));
    assert_ne!(sequence(7), sequence(8));
}

// ── Debug hook ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Parsed(String, usize),
    Statement(usize, usize),
    Debugger(usize, Vec<String>),
    Exception(String, bool),
    Console(String),
    Finished(bool),
}

#[derive(Default)]
struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
    abort_at_line: Option<usize>,
}

impl DebugHook for Recorder {
    fn script_parsed(&mut self, script: &ScriptInfo) {
        self.events
            .borrow_mut()
            .push(Event::Parsed(script.name.clone(), script.line_count));
    }

    fn before_statement(&mut self, frame: &DebugFrame<'_>) -> DebugAction {
        self.events
            .borrow_mut()
            .push(Event::Statement(frame.location.line, frame.call_depth));
        if self.abort_at_line == Some(frame.location.line) {
            return DebugAction::Abort;
        }
        DebugAction::Continue
    }

    fn debugger_statement(&mut self, frame: &DebugFrame<'_>) -> DebugAction {
        let functions = frame
            .stack_trace()
            .into_iter()
            .map(|call| call.function_name)
            .collect();
        self.events
            .borrow_mut()
            .push(Event::Debugger(frame.location.line, functions));
        DebugAction::Continue
    }

    fn exception_thrown(
        &mut self,
        error: &ThrownError,
        caught: bool,
        _frame: &DebugFrame<'_>,
    ) -> DebugAction {
        self.events
            .borrow_mut()
            .push(Event::Exception(error.message.clone(), caught));
        DebugAction::Continue
    }

    fn console_message(&mut self, _level: ConsoleLevel, text: &str) {
        self.events.borrow_mut().push(Event::Console(text.to_string()));
    }

    fn script_finished(&mut self, result: Result<&Value, &ThrownError>) {
        self.events.borrow_mut().push(Event::Finished(result.is_ok()));
    }
}

fn record(source: &str, abort_at_line: Option<usize>) -> (Result<Value, ScriptError>, Vec<Event>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut interp = Interpreter::new();
    interp.set_debug_hook(Box::new(Recorder {
        events: events.clone(),
        abort_at_line,
    }));
    let result = interp.run_named(source, "hook.js");
    let events = events.borrow().clone();
    (result, events)
}

#[test]
fn hook_sees_statements_with_call_depth() {
    let source = "function f() {\n  return 1;\n}\nf();\n";
    let (result, events) = record(source, None);
    assert!(result.is_ok());
    assert_eq!(events.first(), Some(&Event::Parsed("hook.js".to_string(), 4)));
    assert!(events.contains(&Event::Statement(4, 0)));
    assert!(events.contains(&Event::Statement(2, 1)));
    assert_eq!(events.last(), Some(&Event::Finished(true)));
}

#[test]
fn hook_sees_debugger_statements_with_stack() {
    let source = "function inner() {\n  debugger;\n}\nfunction outer() { inner(); }\nouter();\n";
    let (_, events) = record(source, None);
    let stops: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::Debugger(..)))
        .collect();
    assert_eq!(
        stops,
        vec![&Event::Debugger(
            2,
            vec!["inner".to_string(), "outer".to_string(), "(global)".to_string()]
        )]
    );
}

#[test]
fn hook_reports_caught_and_uncaught_exceptions_once() {
    let source = "try { throw new Error('inner'); } catch (e) {}\nnull.x;\n";
    let (result, events) = record(source, None);
    assert!(result.is_err());
    let exceptions: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::Exception(..)))
        .collect();
    assert_eq!(
        exceptions,
        vec![
            &Event::Exception("inner".to_string(), true),
            &Event::Exception("Cannot read properties of null (reading 'x')".to_string(), false),
        ]
    );
    assert_eq!(events.last(), Some(&Event::Finished(false)));
}

#[test]
fn hook_receives_console_output() {
    let (_, events) = record("console.log('hi', 1);", None);
    assert!(events.contains(&Event::Console("hi 1".to_string())));
}

#[test]
fn hook_abort_terminates_the_script() {
    let source = "var a = 1;\nvar b = 2;\nvar c = 3;\n";
    let (result, events) = record(source, Some(2));
    let Err(ScriptError::Thrown(thrown)) = result else {
        panic!("expected termination");
    };
    assert_eq!(thrown.name, "Terminated");
    assert!(!events.contains(&Event::Statement(3, 0)));
}

#[test]
fn scopes_are_visible_to_the_hook() {
    struct Snapshot(Rc<RefCell<Vec<(String, Value)>>>);

    impl DebugHook for Snapshot {
        fn debugger_statement(&mut self, frame: &DebugFrame<'_>) -> DebugAction {
            *self.0.borrow_mut() = frame.variables();
            DebugAction::Continue
        }
    }

    let captured = Rc::new(RefCell::new(Vec::new()));
    let mut interp = Interpreter::new();
    interp.set_debug_hook(Box::new(Snapshot(captured.clone())));
    interp
        .run("var shadow = 'outer'; function f(arg) { let shadow = 'inner'; debugger; } f(5);")
        .unwrap();

    let variables = captured.borrow();
    let lookup = |name: &str| {
        variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
    };
    assert_eq!(lookup("shadow"), Some(Value::from("inner")));
    assert_eq!(lookup("arg"), Some(Value::from(5)));
}

#[test]
fn parse_errors_do_not_reach_the_hook() {
    let (result, events) = record("var = ;", None);
    assert!(matches!(result, Err(ScriptError::Parse(_))));
    assert!(events.is_empty());
}
