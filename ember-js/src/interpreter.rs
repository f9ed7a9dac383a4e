//! Tree-walking interpreter.
//!
//! `execute` runs statements and `evaluate` runs expressions; both take the
//! environment explicitly. Non-local control flow travels as a
//! [`Completion`], errors as `Err(JsError)`.

use std::rc::Rc;

use crate::ast::*;
use crate::builtin::{self, Intrinsics};
use crate::coerce;
use crate::config::EngineConfig;
use crate::debug::{
    ActiveCall, ConsoleLevel, ConsoleMessage, DebugAction, DebugFrame, DebugHook, ScriptInfo,
};
use crate::environment::{Environment, ScopeKind};
use crate::error::{JsError, JsResult, ScriptError, ThrownError};
use crate::function::{Callable, ExecutionContext, NativeFn, NativeFunction, ScriptFunction};
use crate::object::{JsObject, ObjectKind, ObjectRef};
use crate::parser::parse;
use crate::source::{Source, Span};
use crate::stack;
use crate::value::{Completion, Value};

/// Conversion preference for [`Interpreter::to_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// `valueOf` first.
    Number,
    /// `toString` first.
    String,
}

/// Assignable location produced from an identifier or member expression.
enum Reference {
    Binding { name: String, span: Span },
    Property { object: Value, key: String, span: Span },
}

/// Script interpreter. Owns the global object and all engine state.
pub struct Interpreter {
    global_object: ObjectRef,
    global_env: Environment,
    intrinsics: Intrinsics,
    config: EngineConfig,
    /// Active function calls.
    call_depth: usize,
    call_stack: Vec<ActiveCall>,
    /// Source of the code currently running.
    source: Rc<Source>,
    /// Span of the statement or call currently running.
    current_span: Span,
    /// `try` statements with a `catch` clause currently active.
    try_depth: usize,
    /// An error is propagating and has already been reported to the hook.
    unwinding: bool,
    debug_hook: Option<Box<dyn DebugHook>>,
    console: Vec<ConsoleMessage>,
    rng_state: u64,
    /// Arrays being joined, so cyclic arrays print as empty.
    active_joins: Vec<ObjectRef>,
}

impl Interpreter {
    /// Create an interpreter with default settings and all builtins installed.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let intrinsics = Intrinsics::new();
        let global_object = ObjectRef::new(JsObject::new(Some(
            intrinsics.object_prototype.clone(),
        )));
        let global_env = Environment::global(global_object.clone());

        let mut interp = Interpreter {
            global_object,
            global_env,
            intrinsics,
            call_depth: 0,
            call_stack: Vec::new(),
            source: Source::new(config.script_name.clone(), ""),
            current_span: Span::default(),
            try_depth: 0,
            unwinding: false,
            debug_hook: None,
            console: Vec::new(),
            rng_state: config.random_seed,
            active_joins: Vec::new(),
            config,
        };

        builtin::init(&mut interp);
        interp
    }

    pub fn global_object(&self) -> &ObjectRef {
        &self.global_object
    }

    pub fn global_env(&self) -> &Environment {
        &self.global_env
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of function calls currently active.
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Define a global variable visible to scripts.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.global_object.define(name, value, true);
    }

    /// Define a host function as a global.
    pub fn define_native_function(&mut self, name: &'static str, length: usize, func: NativeFn) {
        let function = self.create_function(Callable::Native(NativeFunction { name, length, func }));
        self.define_global(name, Value::Object(function));
    }

    /// Read a property of the global object. Missing is `undefined`.
    pub fn get_global(&self, name: &str) -> Value {
        self.global_object.get(name)
    }

    /// Install a debugger observer, replacing any previous one.
    pub fn set_debug_hook(&mut self, hook: Box<dyn DebugHook>) {
        self.debug_hook = Some(hook);
    }

    pub fn take_debug_hook(&mut self) -> Option<Box<dyn DebugHook>> {
        self.debug_hook.take()
    }

    /// Console output captured since the last call.
    pub fn take_console_output(&mut self) -> Vec<ConsoleMessage> {
        std::mem::take(&mut self.console)
    }

    // ── Running scripts ──────────────────────────────────────────────

    /// Run script text under the configured script name.
    pub fn run(&mut self, text: &str) -> Result<Value, ScriptError> {
        let name = self.config.script_name.clone();
        self.run_named(text, &name)
    }

    /// Run script text, reporting locations against `filename`.
    pub fn run_named(&mut self, text: &str, filename: &str) -> Result<Value, ScriptError> {
        let program = parse(text, filename)?;
        self.run_program(&program)
    }

    /// Run an already parsed program. The result is the value of the last
    /// statement that produces one.
    pub fn run_program(&mut self, program: &Program) -> Result<Value, ScriptError> {
        let info = ScriptInfo {
            name: program.source.name.clone(),
            line_count: program.source.line_count(),
            length: program.source.text.len(),
        };
        log::debug!("[ember-js] running {} ({} lines)", info.name, info.line_count);
        if let Some(hook) = self.debug_hook.as_mut() {
            hook.script_parsed(&info);
        }

        let saved_source = std::mem::replace(&mut self.source, program.source.clone());
        let saved_span = self.current_span;
        self.unwinding = false;

        let result = self.execute_program(program);
        let outcome = result.map_err(|err| self.thrown_error(err));

        self.source = saved_source;
        self.current_span = saved_span;
        self.unwinding = false;

        match &outcome {
            Ok(_) => log::debug!("[ember-js] {} completed", info.name),
            Err(err) => log::debug!("[ember-js] {} failed: {}", info.name, err),
        }
        if let Some(hook) = self.debug_hook.as_mut() {
            hook.script_finished(outcome.as_ref());
        }
        outcome.map_err(ScriptError::from)
    }

    fn execute_program(&mut self, program: &Program) -> JsResult<Value> {
        let env = self.global_env.clone();
        self.hoist_declarations(&program.body, &env)
            .map_err(|e| e.or_at(|| self.source.info(program.span)))?;

        match self.execute_statements(&program.body, &env)? {
            Completion::Normal(value) | Completion::Return(value) => Ok(value),
            Completion::Break => Err(JsError::syntax("Illegal break statement")),
            Completion::Continue => Err(JsError::syntax("Illegal continue statement")),
        }
    }

    /// Compile a function from parameter and body source, as the `Function`
    /// constructor does. The result closes over the global scope.
    pub fn compile_function(&mut self, params: &str, body: &str) -> JsResult<Value> {
        let text = format!("(function anonymous({}\n) {{\n{}\n}})", params, body);
        let program = parse(&text, "<function>").map_err(|err| {
            let message = err.to_string();
            JsError::syntax(message.trim_start_matches("SyntaxError: "))
        })?;

        let definition = match program.body.first() {
            Some(Statement::Expression(ExpressionStmt {
                expression: Expression::Function(definition),
                ..
            })) if program.body.len() == 1 => definition.clone(),
            _ => return Err(JsError::syntax("Invalid function body")),
        };

        let function = self.create_function(Callable::Script(ScriptFunction {
            definition,
            environment: self.global_env.clone(),
            source: program.source.clone(),
        }));
        Ok(Value::Object(function))
    }

    // ── Object creation ──────────────────────────────────────────────

    /// New ordinary object inheriting from `Object.prototype`.
    pub fn create_object(&self) -> ObjectRef {
        ObjectRef::new(JsObject::new(Some(self.intrinsics.object_prototype.clone())))
    }

    pub fn create_array(&self, elements: Vec<Value>) -> ObjectRef {
        ObjectRef::new(JsObject::with_kind(
            ObjectKind::Array(elements),
            Some(self.intrinsics.array_prototype.clone()),
        ))
    }

    /// Wrap a callable in a function object. Script functions also get a
    /// fresh `prototype` object for use with `new`.
    pub fn create_function(&self, callable: Callable) -> ObjectRef {
        let name = callable.name();
        let length = callable.length();
        let is_script = matches!(callable, Callable::Script(_));

        let function = ObjectRef::new(JsObject::with_kind(
            ObjectKind::Function(callable),
            Some(self.intrinsics.function_prototype.clone()),
        ));
        function.define("length", Value::from(length), false);
        function.define("name", Value::from(name), false);

        if is_script {
            let prototype = self.create_object();
            prototype.define("constructor", Value::Object(function.clone()), false);
            function.define("prototype", Value::Object(prototype), false);
        }
        function
    }

    /// Error object of the named constructor (`TypeError`, ...). Unknown
    /// names inherit from `Error.prototype` and carry their own `name`.
    pub fn create_error(&self, name: &str, message: &str) -> ObjectRef {
        let prototype = self.intrinsics.error_prototype_for(name).clone();
        let inherited_name = prototype.get("name");
        let error = ObjectRef::new(JsObject::with_kind(ObjectKind::Error, Some(prototype)));
        if inherited_name != Value::from(name) {
            error.define("name", Value::from(name), false);
        }
        if !message.is_empty() {
            error.define("message", Value::from(message), false);
        }
        error
    }

    fn create_closure(&self, definition: &Rc<FunctionDef>, env: &Environment) -> ObjectRef {
        self.create_function(Callable::Script(ScriptFunction {
            definition: definition.clone(),
            environment: env.clone(),
            source: self.source.clone(),
        }))
    }

    /// The script-visible value of an error: the thrown value itself, or a
    /// fresh Error object for engine errors.
    pub fn error_value(&self, err: &JsError) -> Value {
        match err {
            JsError::Thrown { value, .. } => value.clone(),
            other => Value::Object(self.create_error(other.name(), other.message())),
        }
    }

    fn thrown_error(&self, err: JsError) -> ThrownError {
        let source_info = err.location().cloned();
        match err {
            JsError::Thrown { value, .. } => {
                let (name, message) = match &value {
                    Value::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Error) => (
                        coerce::to_string(&obj.get("name")),
                        coerce::to_string(&obj.get("message")),
                    ),
                    other => (String::new(), coerce::to_string(other)),
                };
                ThrownError {
                    name,
                    message,
                    value,
                    source_info,
                }
            }
            JsError::Terminated => ThrownError {
                name: "Terminated".to_string(),
                message: "execution terminated by debugger".to_string(),
                value: Value::Undefined,
                source_info,
            },
            other => ThrownError {
                name: other.name().to_string(),
                message: other.message().to_string(),
                value: self.error_value(&other),
                source_info,
            },
        }
    }

    // ── Host services used by builtins ───────────────────────────────

    /// Record a line of console output.
    pub fn console_message(&mut self, level: ConsoleLevel, text: String) {
        log::info!("[console.{}] {}", level, text);
        if let Some(hook) = self.debug_hook.as_mut() {
            hook.console_message(level, &text);
        }
        if self.config.capture_console {
            self.console.push(ConsoleMessage { level, text });
        }
    }

    /// Next value of the `Math.random` generator, in `[0, 1)`.
    pub fn next_random(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Mark `array` as being joined. Returns `false` if it already is.
    pub fn enter_join(&mut self, array: &ObjectRef) -> bool {
        if self.active_joins.iter().any(|a| a.ptr_eq(array)) {
            return false;
        }
        self.active_joins.push(array.clone());
        true
    }

    pub fn exit_join(&mut self) {
        self.active_joins.pop();
    }

    // ── Debugger plumbing ────────────────────────────────────────────

    fn with_hook(
        &mut self,
        span: Span,
        env: &Environment,
        f: impl FnOnce(&mut dyn DebugHook, &DebugFrame<'_>) -> DebugAction,
    ) -> DebugAction {
        let Some(mut hook) = self.debug_hook.take() else {
            return DebugAction::Continue;
        };
        let frame = DebugFrame {
            location: self.source.info(span),
            call_depth: self.call_depth,
            calls: &self.call_stack,
            environment: env,
        };
        let action = f(hook.as_mut(), &frame);
        self.debug_hook = Some(hook);
        action
    }

    /// Locate an error at the statement it escaped from and, the first time
    /// it passes a statement boundary, report it to the hook.
    fn unwind(&mut self, err: JsError, span: Span, env: &Environment) -> JsError {
        if matches!(err, JsError::Terminated) {
            return err;
        }
        let err = err.or_at(|| self.source.info(span));
        if std::mem::replace(&mut self.unwinding, true) || self.debug_hook.is_none() {
            return err;
        }

        let thrown = self.thrown_error(err.clone());
        let caught = self.try_depth > 0;
        match self.with_hook(span, env, |hook, frame| {
            hook.exception_thrown(&thrown, caught, frame)
        }) {
            DebugAction::Abort => JsError::Terminated,
            DebugAction::Continue => err,
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    /// Hoist `var` names and function declarations of a function or script
    /// body, and create its top-level lexical bindings.
    fn hoist_declarations(&mut self, body: &[Statement], env: &Environment) -> JsResult<()> {
        let mut names = Vec::new();
        collect_var_names(body, &mut names);
        for name in &names {
            env.declare_var(name)?;
        }
        self.declare_block_scoped(body, env)
    }

    /// Lexical bindings (in their dead zone) and function declarations
    /// directly contained in `body`.
    fn declare_block_scoped(&mut self, body: &[Statement], env: &Environment) -> JsResult<()> {
        for stmt in body {
            match stmt {
                Statement::Variable(decl) if decl.kind != VariableKind::Var => {
                    for declarator in &decl.declarations {
                        env.declare_lexical(&declarator.name, decl.kind == VariableKind::Let)?;
                    }
                }
                Statement::Function(decl) => {
                    if let Some(name) = &decl.function.name {
                        let function = self.create_closure(&decl.function, env);
                        env.initialize(name, Value::Object(function))?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ── Statements ───────────────────────────────────────────────────

    /// Execute one statement.
    pub fn execute(&mut self, stmt: &Statement, env: &Environment) -> JsResult<Completion> {
        let span = stmt.span();
        self.current_span = span;

        if self.debug_hook.is_some()
            && !matches!(
                stmt,
                Statement::Empty(_) | Statement::Block(_) | Statement::Function(_)
            )
            && self.with_hook(span, env, |hook, frame| hook.before_statement(frame))
                == DebugAction::Abort
        {
            return Err(JsError::Terminated);
        }

        match stack::guarded(|| self.execute_statement(stmt, env)) {
            Err(err) => Err(self.unwind(err, span, env)),
            ok => ok,
        }
    }

    fn execute_statement(&mut self, stmt: &Statement, env: &Environment) -> JsResult<Completion> {
        match stmt {
            Statement::Empty(_) => Ok(Completion::empty()),
            Statement::Expression(s) => Ok(Completion::Normal(self.evaluate(&s.expression, env)?)),
            Statement::Block(block) => self.execute_block(&block.body, env),
            Statement::Variable(decl) => {
                self.execute_variable_declaration(decl, env)?;
                Ok(Completion::empty())
            }
            Statement::Function(decl) => {
                // Functions declared in blocks are also visible function-wide
                // once their declaration has run.
                if env.kind() == ScopeKind::Block {
                    if let Some(name) = &decl.function.name {
                        let value = env.get(name)?;
                        env.var_scope().assign(name, value)?;
                    }
                }
                Ok(Completion::empty())
            }
            Statement::If(s) => {
                if self.truthy(&s.test, env)? {
                    self.execute(&s.consequent, env)
                } else if let Some(alternate) = &s.alternate {
                    self.execute(alternate, env)
                } else {
                    Ok(Completion::empty())
                }
            }
            Statement::While(s) => {
                let mut last = Value::Undefined;
                while self.truthy(&s.test, env)? {
                    match self.execute(&s.body, env)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal(value) => last = value,
                        Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal(last))
            }
            Statement::DoWhile(s) => {
                let mut last = Value::Undefined;
                loop {
                    match self.execute(&s.body, env)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal(value) => last = value,
                        Completion::Continue => {}
                    }
                    if !self.truthy(&s.test, env)? {
                        break;
                    }
                }
                Ok(Completion::Normal(last))
            }
            Statement::For(s) => self.execute_for(s, env),
            Statement::ForIn(s) => self.execute_for_in(s, env),
            Statement::Switch(s) => self.execute_switch(s, env),
            Statement::Break(_) => Ok(Completion::Break),
            Statement::Continue(_) => Ok(Completion::Continue),
            Statement::Return(s) => {
                let value = match &s.argument {
                    Some(argument) => self.evaluate(argument, env)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Throw(s) => {
                let value = self.evaluate(&s.argument, env)?;
                Err(JsError::Thrown {
                    value,
                    at: Some(self.source.info(s.span)),
                })
            }
            Statement::Try(s) => self.execute_try(s, env),
            Statement::Debugger(span) => {
                match self.with_hook(*span, env, |hook, frame| hook.debugger_statement(frame)) {
                    DebugAction::Abort => Err(JsError::Terminated),
                    DebugAction::Continue => Ok(Completion::empty()),
                }
            }
        }
    }

    /// Run a statement list in order, stopping at the first abrupt completion.
    fn execute_statements(&mut self, body: &[Statement], env: &Environment) -> JsResult<Completion> {
        let mut last = Value::Undefined;
        for stmt in body {
            match self.execute(stmt, env)? {
                Completion::Normal(value) => {
                    if produces_value(stmt) {
                        last = value;
                    }
                }
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute_block(&mut self, body: &[Statement], env: &Environment) -> JsResult<Completion> {
        if !needs_scope(body) {
            return self.execute_statements(body, env);
        }
        let scope = env.block();
        self.declare_block_scoped(body, &scope)?;
        self.execute_statements(body, &scope)
    }

    fn execute_variable_declaration(&mut self, decl: &VariableDecl, env: &Environment) -> JsResult<()> {
        for declarator in &decl.declarations {
            match decl.kind {
                VariableKind::Var => {
                    if let Some(init) = &declarator.init {
                        let value = self.evaluate(init, env)?;
                        env.assign(&declarator.name, value)?;
                    }
                }
                VariableKind::Let | VariableKind::Const => {
                    let value = match &declarator.init {
                        Some(init) => self.evaluate(init, env)?,
                        None => Value::Undefined,
                    };
                    env.initialize(&declarator.name, value)?;
                }
            }
        }
        Ok(())
    }

    fn execute_for(&mut self, stmt: &ForStmt, env: &Environment) -> JsResult<Completion> {
        // `let`/`const` loop variables get a fresh copy per iteration so
        // closures created in the body see that iteration's value.
        let lexical: Vec<(String, bool)> = match &stmt.init {
            Some(ForInit::Variable(decl)) if decl.kind != VariableKind::Var => decl
                .declarations
                .iter()
                .map(|d| (d.name.clone(), decl.kind == VariableKind::Let))
                .collect(),
            _ => Vec::new(),
        };

        let mut scope = if lexical.is_empty() { env.clone() } else { env.block() };
        for (name, mutable) in &lexical {
            scope.declare_lexical(name, *mutable)?;
        }
        match &stmt.init {
            Some(ForInit::Variable(decl)) => self.execute_variable_declaration(decl, &scope)?,
            Some(ForInit::Expression(expr)) => {
                self.evaluate(expr, &scope)?;
            }
            None => {}
        }

        let mut last = Value::Undefined;
        loop {
            if let Some(test) = &stmt.test {
                if !self.truthy(test, &scope)? {
                    break;
                }
            }
            match self.execute(&stmt.body, &scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(value) => last = value,
                Completion::Continue => {}
            }
            if !lexical.is_empty() {
                let next = env.block();
                for (name, mutable) in &lexical {
                    next.declare_lexical(name, *mutable)?;
                    next.initialize(name, scope.get(name)?)?;
                }
                scope = next;
            }
            if let Some(update) = &stmt.update {
                self.evaluate(update, &scope)?;
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute_for_in(&mut self, stmt: &ForInStmt, env: &Environment) -> JsResult<Completion> {
        let target = self.evaluate(&stmt.right, env)?;
        let (keys, object) = match &target {
            Value::Object(obj) => (for_in_keys(obj), Some(obj.clone())),
            Value::String(s) => ((0..s.chars().count()).map(|i| i.to_string()).collect(), None),
            _ => (Vec::new(), None),
        };

        let mut last = Value::Undefined;
        for key in keys {
            // Properties deleted during the loop are not visited.
            if let Some(obj) = &object {
                if !obj.has_property(&key) {
                    continue;
                }
            }
            let scope = match &stmt.left {
                ForInTarget::Declaration {
                    kind: VariableKind::Var,
                    name,
                } => {
                    env.assign(name, Value::from(key))?;
                    env.clone()
                }
                ForInTarget::Declaration { kind, name } => {
                    let scope = env.block();
                    scope.declare_lexical(name, *kind == VariableKind::Let)?;
                    scope.initialize(name, Value::from(key))?;
                    scope
                }
                ForInTarget::Expression(expr) => {
                    let reference = self.evaluate_reference(expr, env)?;
                    self.put_reference(&reference, Value::from(key), env)?;
                    env.clone()
                }
            };
            match self.execute(&stmt.body, &scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(value) => last = value,
                Completion::Continue => {}
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute_switch(&mut self, stmt: &SwitchStmt, env: &Environment) -> JsResult<Completion> {
        let discriminant = self.evaluate(&stmt.discriminant, env)?;
        let scope = env.block();
        for case in &stmt.cases {
            self.declare_block_scoped(&case.consequent, &scope)?;
        }

        let mut start = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let value = self.evaluate(test, &scope)?;
                if coerce::strict_equals(&discriminant, &value) {
                    start = Some(index);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| stmt.cases.iter().position(|c| c.test.is_none())) else {
            return Ok(Completion::empty());
        };

        // Cases fall through until a `break`.
        let mut last = Value::Undefined;
        for case in &stmt.cases[start..] {
            for s in &case.consequent {
                match self.execute(s, &scope)? {
                    Completion::Normal(value) => {
                        if produces_value(s) {
                            last = value;
                        }
                    }
                    Completion::Break => return Ok(Completion::Normal(last)),
                    abrupt => return Ok(abrupt),
                }
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute_try(&mut self, stmt: &TryStmt, env: &Environment) -> JsResult<Completion> {
        let catches = stmt.handler.is_some();
        if catches {
            self.try_depth += 1;
        }
        let result = self.execute_block(&stmt.block.body, env);
        if catches {
            self.try_depth -= 1;
        }

        let result = match (result, &stmt.handler) {
            (Err(JsError::Terminated), _) => Err(JsError::Terminated),
            (Err(err), Some(handler)) => {
                self.unwinding = false;
                let scope = env.block();
                if let Some(param) = &handler.param {
                    scope.define(param, self.error_value(&err));
                }
                self.execute_block(&handler.body.body, &scope)
            }
            (result, _) => result,
        };

        let Some(finalizer) = &stmt.finalizer else {
            return result;
        };
        if matches!(result, Err(JsError::Terminated)) {
            return result;
        }
        let unwinding = std::mem::replace(&mut self.unwinding, false);
        match self.execute_block(&finalizer.body, env)? {
            Completion::Normal(_) => {
                self.unwinding = unwinding;
                result
            }
            // An abrupt `finally` discards the pending completion or error.
            abrupt => Ok(abrupt),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Evaluate an expression.
    pub fn evaluate(&mut self, expr: &Expression, env: &Environment) -> JsResult<Value> {
        stack::guarded(|| self.evaluate_expression(expr, env))
    }

    fn evaluate_expression(&mut self, expr: &Expression, env: &Environment) -> JsResult<Value> {
        match expr {
            Expression::Identifier(id) => env
                .get(&id.name)
                .map_err(|e| e.or_at(|| self.source.info(id.span))),
            Expression::Literal(literal) => Ok(match literal {
                Literal::Null(_) => Value::Null,
                Literal::Boolean(b, _) => Value::Boolean(*b),
                Literal::Number(n, _) => Value::Number(*n),
                Literal::String(s, _) => Value::String(s.clone()),
            }),
            Expression::This(_) => Ok(env.this_value()),
            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(match element {
                        Some(expr) => self.evaluate(expr, env)?,
                        None => Value::Undefined,
                    });
                }
                Ok(Value::Object(self.create_array(elements)))
            }
            Expression::Object(object) => self.evaluate_object(object, env),
            Expression::Function(definition) => Ok(self.evaluate_function(definition, env)),
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                self.get_property(&object, &key)
                    .map_err(|e| e.or_at(|| self.source.info(member.span)))
            }
            Expression::Call(call) => self.evaluate_call(call, env),
            Expression::New(new) => self.evaluate_new(new, env),
            Expression::Update(update) => self.evaluate_update(update, env),
            Expression::Unary(unary) => self.evaluate_unary(unary, env),
            Expression::Binary(binary) => {
                let left = self.evaluate(&binary.left, env)?;
                let right = self.evaluate(&binary.right, env)?;
                self.binary_operation(binary.operator, &left, &right)
                    .map_err(|e| e.or_at(|| self.source.info(binary.span)))
            }
            Expression::Logical(logical) => {
                let left = self.evaluate(&logical.left, env)?;
                let short_circuit = match logical.operator {
                    LogicalOp::And => !coerce::to_boolean(&left),
                    LogicalOp::Or => coerce::to_boolean(&left),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right, env)
                }
            }
            Expression::Conditional(cond) => {
                if self.truthy(&cond.test, env)? {
                    self.evaluate(&cond.consequent, env)
                } else {
                    self.evaluate(&cond.alternate, env)
                }
            }
            Expression::Assignment(assign) => self.evaluate_assignment(assign, env),
            Expression::Sequence(seq) => {
                let mut last = Value::Undefined;
                for expr in &seq.expressions {
                    last = self.evaluate(expr, env)?;
                }
                Ok(last)
            }
        }
    }

    fn truthy(&mut self, expr: &Expression, env: &Environment) -> JsResult<bool> {
        Ok(coerce::to_boolean(&self.evaluate(expr, env)?))
    }

    fn evaluate_object(&mut self, object: &ObjectExpr, env: &Environment) -> JsResult<Value> {
        let obj = self.create_object();
        for property in &object.properties {
            let value = self.evaluate(&property.value, env)?;
            if property.key == "__proto__" {
                match value {
                    Value::Object(proto) => obj.set_prototype(Some(proto))?,
                    Value::Null => obj.set_prototype(None)?,
                    _ => {}
                }
            } else {
                obj.set(&property.key, value)?;
            }
        }
        Ok(Value::Object(obj))
    }

    /// A named function expression can refer to itself by name, through a
    /// scope of its own between the closure and its surroundings.
    fn evaluate_function(&mut self, definition: &Rc<FunctionDef>, env: &Environment) -> Value {
        match &definition.name {
            Some(name) => {
                let scope = env.block();
                let function = self.create_closure(definition, &scope);
                scope.define(name, Value::Object(function.clone()));
                Value::Object(function)
            }
            None => Value::Object(self.create_closure(definition, env)),
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[Expression], env: &Environment) -> JsResult<Vec<Value>> {
        arguments.iter().map(|arg| self.evaluate(arg, env)).collect()
    }

    fn evaluate_call(&mut self, call: &CallExpr, env: &Environment) -> JsResult<Value> {
        // The receiver depends only on the syntactic form of the callee.
        let (function, this_value) = match call.callee.as_ref() {
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                let function = self
                    .get_property(&object, &key)
                    .map_err(|e| e.or_at(|| self.source.info(member.span)))?;
                (function, object)
            }
            callee => (
                self.evaluate(callee, env)?,
                Value::Object(self.global_object.clone()),
            ),
        };
        let arguments = self.evaluate_arguments(&call.arguments, env)?;

        let Some(callee) = function.as_object().filter(|f| f.is_callable()).cloned() else {
            let message = format!("{} is not a function", describe_callee(&call.callee));
            return Err(JsError::type_error(message).or_at(|| self.source.info(call.span)));
        };
        self.current_span = call.span;
        self.invoke(&callee, this_value, arguments, false)
            .map_err(|e| e.or_at(|| self.source.info(call.span)))
    }

    fn evaluate_new(&mut self, new: &NewExpr, env: &Environment) -> JsResult<Value> {
        let constructor = self.evaluate(&new.callee, env)?;
        let arguments = self.evaluate_arguments(&new.arguments, env)?;
        if !constructor.is_function() {
            let message = format!("{} is not a constructor", describe_callee(&new.callee));
            return Err(JsError::type_error(message).or_at(|| self.source.info(new.span)));
        }
        self.current_span = new.span;
        self.construct(&constructor, &arguments)
            .map_err(|e| e.or_at(|| self.source.info(new.span)))
    }

    /// Call `func` with an explicit receiver.
    pub fn call_function(&mut self, func: &Value, this_value: &Value, args: &[Value]) -> JsResult<Value> {
        match func.as_object() {
            Some(callee) if callee.is_callable() => {
                let callee = callee.clone();
                self.invoke(&callee, this_value.clone(), args.to_vec(), false)
            }
            _ => Err(JsError::type_error(format!(
                "{} is not a function",
                describe_value(func)
            ))),
        }
    }

    /// `new constructor(...args)`.
    pub fn construct(&mut self, constructor: &Value, args: &[Value]) -> JsResult<Value> {
        let Some(ctor) = constructor.as_object().filter(|c| c.is_callable()).cloned() else {
            return Err(JsError::type_error(format!(
                "{} is not a constructor",
                describe_value(constructor)
            )));
        };
        if let Some(Callable::Bound(bound)) = ctor.callable() {
            let mut arguments = bound.arguments.clone();
            arguments.extend_from_slice(args);
            return self.construct(&Value::Object(bound.target), &arguments);
        }

        let prototype = match ctor.get("prototype") {
            Value::Object(proto) => proto,
            _ => self.intrinsics.object_prototype.clone(),
        };
        let instance = Value::Object(ObjectRef::new(JsObject::new(Some(prototype))));
        let result = self.invoke(&ctor, instance.clone(), args.to_vec(), true)?;
        Ok(if result.is_object() { result } else { instance })
    }

    fn invoke(
        &mut self,
        callee: &ObjectRef,
        this_value: Value,
        arguments: Vec<Value>,
        is_construct: bool,
    ) -> JsResult<Value> {
        let Some(callable) = callee.callable() else {
            return Err(JsError::type_error("object is not a function"));
        };
        if self.call_depth >= self.config.max_call_depth {
            return Err(JsError::range("Maximum call stack size exceeded"));
        }

        let function_name = match callable.name() {
            name if name.is_empty() => "(anonymous)".to_string(),
            name => name,
        };
        log::trace!("[ember-js] call {} (depth {})", function_name, self.call_depth + 1);
        self.call_stack.push(ActiveCall {
            function_name,
            source: self.source.clone(),
            call_site: self.current_span,
        });
        self.call_depth += 1;

        let result = match &callable {
            Callable::Native(native) => {
                let ctx = ExecutionContext {
                    this_value,
                    arguments,
                    callee: Some(callee.clone()),
                    is_construct,
                };
                (native.func)(self, &ctx)
            }
            Callable::Script(function) => self.call_script_function(function, this_value, arguments),
            Callable::Bound(bound) => {
                let mut all_arguments = bound.arguments.clone();
                all_arguments.extend(arguments);
                let this_value = if is_construct {
                    this_value
                } else {
                    bound.this_value.clone()
                };
                self.invoke(&bound.target, this_value, all_arguments, is_construct)
            }
        };

        self.call_depth -= 1;
        self.call_stack.pop();
        result
    }

    fn call_script_function(
        &mut self,
        function: &ScriptFunction,
        this_value: Value,
        arguments: Vec<Value>,
    ) -> JsResult<Value> {
        let definition = &function.definition;
        let env = Environment::function(&function.environment, this_value);
        for (index, param) in definition.params.iter().enumerate() {
            env.define(param, arguments.get(index).cloned().unwrap_or_default());
        }
        if !definition.params.iter().any(|p| p == "arguments") {
            env.define("arguments", Value::Object(self.create_array(arguments)));
        }

        let saved_source = std::mem::replace(&mut self.source, function.source.clone());
        let saved_span = self.current_span;
        let result = self
            .hoist_declarations(&definition.body, &env)
            .and_then(|()| self.execute_statements(&definition.body, &env));
        self.source = saved_source;
        self.current_span = saved_span;

        match result? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn evaluate_update(&mut self, update: &UpdateExpr, env: &Environment) -> JsResult<Value> {
        let reference = self.evaluate_reference(&update.argument, env)?;
        let current = self.get_reference(&reference, env)?;
        let old = self.to_number(&current)?;
        let new = match update.operator {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_reference(&reference, Value::Number(new), env)?;
        Ok(Value::Number(if update.prefix { new } else { old }))
    }

    fn evaluate_unary(&mut self, unary: &UnaryExpr, env: &Environment) -> JsResult<Value> {
        match unary.operator {
            UnaryOp::Typeof => {
                if let Expression::Identifier(id) = unary.argument.as_ref() {
                    if !env.has_binding(&id.name) {
                        return Ok(Value::from("undefined"));
                    }
                }
                let value = self.evaluate(&unary.argument, env)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOp::Delete => match unary.argument.as_ref() {
                Expression::Member(member) => {
                    let object = self.evaluate(&member.object, env)?;
                    let key = self.property_key(&member.property, env)?;
                    match object {
                        Value::Object(obj) => Ok(Value::Boolean(obj.delete(&key))),
                        Value::Undefined | Value::Null => Err(JsError::type_error(
                            "Cannot convert undefined or null to object",
                        )
                        .or_at(|| self.source.info(unary.span))),
                        _ => Ok(Value::Boolean(true)),
                    }
                }
                Expression::Identifier(_) => Ok(Value::Boolean(false)),
                other => {
                    self.evaluate(other, env)?;
                    Ok(Value::Boolean(true))
                }
            },
            operator => {
                let value = self.evaluate(&unary.argument, env)?;
                Ok(match operator {
                    UnaryOp::Minus => Value::Number(-self.to_number(&value)?),
                    UnaryOp::Plus => Value::Number(self.to_number(&value)?),
                    UnaryOp::Not => Value::Boolean(!coerce::to_boolean(&value)),
                    UnaryOp::BitNot => {
                        Value::Number(!coerce::to_int32(self.to_number(&value)?) as f64)
                    }
                    UnaryOp::Void => Value::Undefined,
                    UnaryOp::Typeof | UnaryOp::Delete => Value::Undefined,
                })
            }
        }
    }

    fn evaluate_assignment(&mut self, assign: &AssignmentExpr, env: &Environment) -> JsResult<Value> {
        let reference = self.evaluate_reference(&assign.target, env)?;
        let value = match assign.operator.binary_op() {
            None => self.evaluate(&assign.value, env)?,
            Some(op) => {
                let current = self.get_reference(&reference, env)?;
                let operand = self.evaluate(&assign.value, env)?;
                self.binary_operation(op, &current, &operand)
                    .map_err(|e| e.or_at(|| self.source.info(assign.span)))?
            }
        };
        self.put_reference(&reference, value.clone(), env)?;
        Ok(value)
    }

    fn evaluate_reference(&mut self, expr: &Expression, env: &Environment) -> JsResult<Reference> {
        match expr {
            Expression::Identifier(id) => Ok(Reference::Binding {
                name: id.name.clone(),
                span: id.span,
            }),
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                Ok(Reference::Property {
                    object,
                    key,
                    span: member.span,
                })
            }
            other => Err(JsError::syntax("Invalid assignment target")
                .or_at(|| self.source.info(other.span()))),
        }
    }

    fn get_reference(&mut self, reference: &Reference, env: &Environment) -> JsResult<Value> {
        match reference {
            Reference::Binding { name, span } => {
                env.get(name).map_err(|e| e.or_at(|| self.source.info(*span)))
            }
            Reference::Property { object, key, span } => self
                .get_property(object, key)
                .map_err(|e| e.or_at(|| self.source.info(*span))),
        }
    }

    fn put_reference(&mut self, reference: &Reference, value: Value, env: &Environment) -> JsResult<()> {
        match reference {
            Reference::Binding { name, span } => env
                .assign(name, value)
                .map_err(|e| e.or_at(|| self.source.info(*span))),
            Reference::Property { object, key, span } => self
                .set_property(object, key, value)
                .map_err(|e| e.or_at(|| self.source.info(*span))),
        }
    }

    fn property_key(&mut self, property: &MemberProperty, env: &Environment) -> JsResult<String> {
        match property {
            MemberProperty::Named(name) => Ok(name.clone()),
            MemberProperty::Computed(expr) => {
                let key = self.evaluate(expr, env)?;
                self.to_property_key(&key)
            }
        }
    }

    // ── Property access ──────────────────────────────────────────────

    /// `target[key]` for any value. Primitives read from their prototype.
    pub fn get_property(&self, target: &Value, key: &str) -> JsResult<Value> {
        let object = match target {
            Value::Undefined | Value::Null => {
                return Err(JsError::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    target, key
                )))
            }
            Value::Object(obj) => {
                if key == "__proto__" {
                    return Ok(obj.prototype().map_or(Value::Null, Value::Object));
                }
                return Ok(obj.get(key));
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::from(s.chars().count()));
                }
                if let Some(index) = coerce::array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::String(c.to_string())));
                }
                &self.intrinsics.string_prototype
            }
            Value::Number(_) => &self.intrinsics.number_prototype,
            Value::Boolean(_) => &self.intrinsics.boolean_prototype,
        };
        Ok(object.get(key))
    }

    /// `target[key] = value`. Writes to primitives are ignored.
    pub fn set_property(&self, target: &Value, key: &str, value: Value) -> JsResult<()> {
        match target {
            Value::Undefined | Value::Null => Err(JsError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target, key
            ))),
            Value::Object(obj) if key == "__proto__" => match value {
                Value::Object(proto) => obj.set_prototype(Some(proto)),
                Value::Null => obj.set_prototype(None),
                _ => Ok(()),
            },
            Value::Object(obj) => obj.set(key, value),
            _ => Ok(()),
        }
    }

    // ── Conversions that may run script code ─────────────────────────

    /// Convert an object to a primitive through its `valueOf`/`toString`
    /// methods. Primitives are returned unchanged.
    pub fn to_primitive(&mut self, value: &Value, preferred: PreferredType) -> JsResult<Value> {
        let Value::Object(obj) = value else {
            return Ok(value.clone());
        };
        let order = match preferred {
            PreferredType::Number => ["valueOf", "toString"],
            PreferredType::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = obj.get(name);
            if method.is_function() {
                let result = self.call_function(&method, value, &[])?;
                if result.is_primitive() {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &Value) -> JsResult<f64> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, PreferredType::Number)?;
                Ok(coerce::to_number(&primitive))
            }
            other => Ok(coerce::to_number(other)),
        }
    }

    pub fn to_string(&mut self, value: &Value) -> JsResult<String> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, PreferredType::String)?;
                Ok(coerce::to_string(&primitive))
            }
            other => Ok(coerce::to_string(other)),
        }
    }

    /// Property name of a computed key.
    pub fn to_property_key(&mut self, value: &Value) -> JsResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => self.to_string(other),
        }
    }

    /// Wrap primitives in their wrapper objects.
    pub fn to_object(&self, value: &Value) -> JsResult<ObjectRef> {
        let (kind, prototype) = match value {
            Value::Undefined | Value::Null => {
                return Err(JsError::type_error(
                    "Cannot convert undefined or null to object",
                ))
            }
            Value::Object(obj) => return Ok(obj.clone()),
            Value::Boolean(b) => (ObjectKind::Boolean(*b), &self.intrinsics.boolean_prototype),
            Value::Number(n) => (ObjectKind::Number(*n), &self.intrinsics.number_prototype),
            Value::String(s) => (ObjectKind::String(s.clone()), &self.intrinsics.string_prototype),
        };
        Ok(ObjectRef::new(JsObject::with_kind(kind, Some(prototype.clone()))))
    }

    // ── Operators ────────────────────────────────────────────────────

    /// Apply a binary operator to evaluated operands.
    pub fn binary_operation(&mut self, op: BinaryOp, left: &Value, right: &Value) -> JsResult<Value> {
        let value = match op {
            BinaryOp::Add => return self.add(left, right),
            BinaryOp::Sub => Value::Number(self.to_number(left)? - self.to_number(right)?),
            BinaryOp::Mul => Value::Number(self.to_number(left)? * self.to_number(right)?),
            BinaryOp::Div => Value::Number(self.to_number(left)? / self.to_number(right)?),
            BinaryOp::Mod => Value::Number(self.to_number(left)? % self.to_number(right)?),
            BinaryOp::Exp => Value::Number(coerce::exponentiate(
                self.to_number(left)?,
                self.to_number(right)?,
            )),
            BinaryOp::Equal => Value::Boolean(self.loose_equals(left, right)?),
            BinaryOp::NotEqual => Value::Boolean(!self.loose_equals(left, right)?),
            BinaryOp::StrictEqual => Value::Boolean(coerce::strict_equals(left, right)),
            BinaryOp::StrictNotEqual => Value::Boolean(!coerce::strict_equals(left, right)),
            BinaryOp::LessThan => {
                let (l, r) = self.relational_operands(left, right)?;
                Value::Boolean(coerce::less_than(&l, &r) == Some(true))
            }
            BinaryOp::GreaterThan => {
                let (l, r) = self.relational_operands(left, right)?;
                Value::Boolean(coerce::less_than(&r, &l) == Some(true))
            }
            BinaryOp::LessEqual => {
                let (l, r) = self.relational_operands(left, right)?;
                Value::Boolean(coerce::less_than(&r, &l) == Some(false))
            }
            BinaryOp::GreaterEqual => {
                let (l, r) = self.relational_operands(left, right)?;
                Value::Boolean(coerce::less_than(&l, &r) == Some(false))
            }
            BinaryOp::LeftShift => {
                let (l, shift) = self.shift_operands(left, right)?;
                Value::Number(l.wrapping_shl(shift) as f64)
            }
            BinaryOp::RightShift => {
                let (l, shift) = self.shift_operands(left, right)?;
                Value::Number(l.wrapping_shr(shift) as f64)
            }
            BinaryOp::UnsignedRightShift => {
                let (l, shift) = self.shift_operands(left, right)?;
                Value::Number(((l as u32) >> shift) as f64)
            }
            BinaryOp::BitAnd => {
                let (l, r) = self.int32_operands(left, right)?;
                Value::Number((l & r) as f64)
            }
            BinaryOp::BitOr => {
                let (l, r) = self.int32_operands(left, right)?;
                Value::Number((l | r) as f64)
            }
            BinaryOp::BitXor => {
                let (l, r) = self.int32_operands(left, right)?;
                Value::Number((l ^ r) as f64)
            }
            BinaryOp::In => {
                let Value::Object(obj) = right else {
                    return Err(JsError::type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        left, right
                    )));
                };
                let key = self.to_property_key(left)?;
                Value::Boolean(obj.has_property(&key))
            }
            BinaryOp::Instanceof => Value::Boolean(self.instance_of(left, right)?),
        };
        Ok(value)
    }

    /// `+`: concatenation when either primitive operand is a string,
    /// numeric addition otherwise.
    fn add(&mut self, left: &Value, right: &Value) -> JsResult<Value> {
        let l = self.to_primitive(left, addition_hint(left))?;
        let r = self.to_primitive(right, addition_hint(right))?;
        if l.is_string() || r.is_string() {
            let mut text = coerce::to_string(&l);
            text.push_str(&coerce::to_string(&r));
            Ok(Value::String(text))
        } else {
            Ok(Value::Number(coerce::to_number(&l) + coerce::to_number(&r)))
        }
    }

    fn relational_operands(&mut self, left: &Value, right: &Value) -> JsResult<(Value, Value)> {
        let l = self.to_primitive(left, PreferredType::Number)?;
        let r = self.to_primitive(right, PreferredType::Number)?;
        Ok((l, r))
    }

    fn int32_operands(&mut self, left: &Value, right: &Value) -> JsResult<(i32, i32)> {
        let l = coerce::to_int32(self.to_number(left)?);
        let r = coerce::to_int32(self.to_number(right)?);
        Ok((l, r))
    }

    fn shift_operands(&mut self, left: &Value, right: &Value) -> JsResult<(i32, u32)> {
        let l = coerce::to_int32(self.to_number(left)?);
        let shift = coerce::to_uint32(self.to_number(right)?) & 31;
        Ok((l, shift))
    }

    /// `==`.
    pub fn loose_equals(&mut self, a: &Value, b: &Value) -> JsResult<bool> {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => Ok(x.ptr_eq(y)),
            (Value::Object(_), other) | (other, Value::Object(_)) if other.is_nullish() => Ok(false),
            (Value::Object(_), _) => {
                let primitive = self.to_primitive(a, PreferredType::Number)?;
                self.loose_equals(&primitive, b)
            }
            (_, Value::Object(_)) => {
                let primitive = self.to_primitive(b, PreferredType::Number)?;
                self.loose_equals(a, &primitive)
            }
            _ => Ok(coerce::loose_equals_primitive(a, b)),
        }
    }

    /// `value instanceof constructor`.
    pub fn instance_of(&mut self, value: &Value, constructor: &Value) -> JsResult<bool> {
        let Some(ctor) = constructor.as_object().filter(|c| c.is_callable()) else {
            return Err(JsError::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        };
        if let Some(Callable::Bound(bound)) = ctor.callable() {
            return self.instance_of(value, &Value::Object(bound.target));
        }
        let Value::Object(obj) = value else {
            return Ok(false);
        };
        let Value::Object(prototype) = ctor.get("prototype") else {
            return Err(JsError::type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        Ok(obj.inherits_from(&prototype))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Date objects convert to strings first when added.
fn addition_hint(value: &Value) -> PreferredType {
    match value {
        Value::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Date(_)) => PreferredType::String,
        _ => PreferredType::Number,
    }
}

/// Statements whose value becomes the completion value of a list.
fn produces_value(stmt: &Statement) -> bool {
    !matches!(
        stmt,
        Statement::Empty(_) | Statement::Variable(_) | Statement::Function(_) | Statement::Debugger(_)
    )
}

/// Whether a block has declarations that need a scope of their own.
fn needs_scope(body: &[Statement]) -> bool {
    body.iter().any(|stmt| match stmt {
        Statement::Variable(decl) => decl.kind != VariableKind::Var,
        Statement::Function(_) => true,
        _ => false,
    })
}

/// Names declared with `var`, and function names, anywhere in `body`
/// except inside nested functions.
fn collect_var_names(body: &[Statement], names: &mut Vec<String>) {
    for stmt in body {
        collect_statement_var_names(stmt, names);
    }
}

fn collect_statement_var_names(stmt: &Statement, names: &mut Vec<String>) {
    match stmt {
        Statement::Variable(decl) if decl.kind == VariableKind::Var => {
            names.extend(decl.declarations.iter().map(|d| d.name.clone()));
        }
        Statement::Function(decl) => names.extend(decl.function.name.clone()),
        Statement::Block(block) => collect_var_names(&block.body, names),
        Statement::If(s) => {
            collect_statement_var_names(&s.consequent, names);
            if let Some(alternate) = &s.alternate {
                collect_statement_var_names(alternate, names);
            }
        }
        Statement::While(s) => collect_statement_var_names(&s.body, names),
        Statement::DoWhile(s) => collect_statement_var_names(&s.body, names),
        Statement::For(s) => {
            if let Some(ForInit::Variable(decl)) = &s.init {
                if decl.kind == VariableKind::Var {
                    names.extend(decl.declarations.iter().map(|d| d.name.clone()));
                }
            }
            collect_statement_var_names(&s.body, names);
        }
        Statement::ForIn(s) => {
            if let ForInTarget::Declaration {
                kind: VariableKind::Var,
                name,
            } = &s.left
            {
                names.push(name.clone());
            }
            collect_statement_var_names(&s.body, names);
        }
        Statement::Switch(s) => {
            for case in &s.cases {
                collect_var_names(&case.consequent, names);
            }
        }
        Statement::Try(s) => {
            collect_var_names(&s.block.body, names);
            if let Some(handler) = &s.handler {
                collect_var_names(&handler.body.body, names);
            }
            if let Some(finalizer) = &s.finalizer {
                collect_var_names(&finalizer.body, names);
            }
        }
        _ => {}
    }
}

/// Enumerable property names of an object and its prototypes, own first,
/// without duplicates.
fn for_in_keys(obj: &ObjectRef) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut cursor = Some(obj.clone());
    while let Some(current) = cursor {
        for key in current.own_enumerable_keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        cursor = current.prototype();
    }
    keys
}

/// Source-like rendering of a callee for error messages.
fn describe_callee(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(id) => id.name.clone(),
        Expression::This(_) => "this".to_string(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Named(name) => format!("{}.{}", describe_callee(&member.object), name),
            MemberProperty::Computed(_) => format!("{}[...]", describe_callee(&member.object)),
        },
        Expression::Call(call) => format!("{}(...)", describe_callee(&call.callee)),
        _ => "expression".to_string(),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(obj) if obj.is_array() => "array".to_string(),
        Value::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_completion_value_is_last_expression() {
        assert_eq!(run("1; 2; var x = 3;"), Value::from(2));
        assert_eq!(run("if (true) { 'yes' } else { 'no' }"), Value::from("yes"));
    }

    #[test]
    fn test_for_let_creates_binding_per_iteration() {
        let result = run(
            "var fs = [];
             for (let i = 0; i < 3; i++) { fs.push(function () { return i; }); }
             fs[0]() + fs[1]() + fs[2]();",
        );
        assert_eq!(result, Value::from(3));
    }

    #[test]
    fn test_block_function_visible_after_declaration() {
        let result = run("if (true) { function f() { return 7; } } f();");
        assert_eq!(result, Value::from(7));
    }

    #[test]
    fn test_named_function_expression_sees_itself() {
        let result = run(
            "var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); };
             fact(5);",
        );
        assert_eq!(result, Value::from(120));
    }

    #[test]
    fn test_call_depth_limit_is_range_error() {
        let mut interp = Interpreter::with_config(EngineConfig {
            max_call_depth: 16,
            ..EngineConfig::default()
        });
        let err = interp.run("function f() { return f(); } f();").unwrap_err();
        match err {
            ScriptError::Thrown(thrown) => {
                assert_eq!(thrown.name, "RangeError");
                assert_eq!(thrown.message, "Maximum call stack size exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(interp.call_depth(), 0);
    }

    #[test]
    fn test_finally_overrides_completion() {
        let result = run("function f() { try { return 1; } finally { return 2; } } f();");
        assert_eq!(result, Value::from(2));
    }

    #[test]
    fn test_random_is_reproducible_per_seed() {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();
        let x = a.run("Math.random()").unwrap();
        assert_eq!(x, b.run("Math.random()").unwrap());
        let n = x.as_number().unwrap();
        assert!((0.0..1.0).contains(&n));
    }
}
