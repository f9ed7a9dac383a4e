//! Recursive-descent parser.
//!
//! Parses tokens into an Abstract Syntax Tree. Binary operators are handled
//! by precedence climbing; everything else has one method per production.
//! The first error aborts the parse.

use std::rc::Rc;

use crate::ast::*;
use crate::coerce::number_to_string;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::source::{Source, Span};
use crate::stack;
use crate::token::{Token, TokenKind};

type ParseResult<T> = Result<T, ParseError>;

/// Statements, expressions and unary operators nested deeper than this
/// are rejected.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Parse script text into a program.
pub fn parse(text: &str, filename: &str) -> ParseResult<Program> {
    Parser::new(Source::new(filename, text))?.parse_script()
}

/// Parser over a materialised token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: Rc<Source>,
    /// Nesting of function bodies; `return` is legal when non-zero.
    function_depth: usize,
    /// Loops enclosing the current statement inside the current function.
    loop_depth: usize,
    /// Loops and switches enclosing the current statement.
    breakable_depth: usize,
    /// While parsing a `for` initializer, `in` starts a for-in loop.
    no_in: bool,
    /// Recursion depth of the nesting productions.
    nesting: usize,
}

impl Parser {
    /// Tokenize `source` and create a parser over it.
    pub fn new(source: Rc<Source>) -> ParseResult<Self> {
        let tokens = Lexer::new(source.clone()).tokenize()?;
        Ok(Self::from_tokens(tokens, source))
    }

    /// Create a parser over tokens already produced from `source`.
    pub fn from_tokens(mut tokens: Vec<Token>, source: Rc<Source>) -> Self {
        if !tokens.last().map_or(false, Token::is_eof) {
            let end = source.text.len();
            let line = source.line_count();
            tokens.push(Token::new(TokenKind::Eof, "", Span::new(end, end, line, 1), false));
        }
        Parser {
            tokens,
            pos: 0,
            source,
            function_depth: 0,
            loop_depth: 0,
            breakable_depth: 0,
            no_in: false,
            nesting: 0,
        }
    }

    /// Parse the whole token stream as a script.
    pub fn parse_script(&mut self) -> ParseResult<Program> {
        let start = self.current_span();
        let mut body = Vec::new();

        while !self.is_eof() {
            body.push(self.parse_statement()?);
        }

        let end = if body.is_empty() { start } else { self.prev_span() };
        log::debug!(
            "[ember-js] parsed {} ({} top-level statements)",
            self.source.name,
            body.len()
        );

        Ok(Program {
            body,
            source: self.source.clone(),
            span: start.to(end),
        })
    }

    /// Parse a statement.
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.nested(Self::parse_statement_kind)
    }

    /// Run one level of a recursive production, counting it against
    /// `MAX_NESTING_DEPTH`.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                at: self.source.info(self.current_span()),
            });
        }
        self.nesting += 1;
        let result = stack::guarded(|| parse(self));
        self.nesting -= 1;
        result
    }

    fn parse_statement_kind(&mut self) -> ParseResult<Statement> {
        match &self.current().kind {
            TokenKind::Semicolon => {
                let span = self.current_span();
                self.advance();
                Ok(Statement::Empty(span))
            }
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::Variable(decl))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Break => self.parse_jump_statement(true),
            TokenKind::Continue => self.parse_jump_statement(false),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Debugger => {
                let span = self.current_span();
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Debugger(span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse a braced block.
    fn parse_block(&mut self) -> ParseResult<BlockStmt> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            body.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace, "'}'")?;

        Ok(BlockStmt {
            body,
            span: start.to(self.prev_span()),
        })
    }

    /// Parse `var`/`let`/`const` declarators, without the terminating semicolon.
    fn parse_variable_declaration(&mut self) -> ParseResult<VariableDecl> {
        let start = self.current_span();
        let kind = match &self.current().kind {
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => VariableKind::Var,
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current_span();
            let name = self.parse_identifier()?;

            let init = if self.check(&TokenKind::Assign) {
                self.advance();
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };

            // `for (const k in obj)` binds without an initializer.
            let heads_for_in = self.no_in && self.check(&TokenKind::In);
            if kind == VariableKind::Const && init.is_none() && !heads_for_in {
                return Err(ParseError::MissingInitializer {
                    at: self.source.info(decl_start),
                });
            }

            declarations.push(VariableDeclarator {
                name,
                init,
                span: decl_start.to(self.prev_span()),
            });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDecl {
            kind,
            declarations,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::Function, "'function'")?;
        let name = self.parse_identifier()?;
        let function = self.parse_function_rest(Some(name), start)?;
        Ok(Statement::Function(FunctionDecl {
            span: function.span,
            function,
        }))
    }

    /// Parse `(params) { body }` after the `function` keyword and name.
    fn parse_function_rest(&mut self, name: Option<String>, start: Span) -> ParseResult<Rc<FunctionDef>> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            params.push(self.parse_identifier()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma, "',' or ')'")?;
            }
        }
        self.expect(&TokenKind::RightParen, "')'")?;

        // Loop and switch context does not cross function boundaries.
        let saved = (self.loop_depth, self.breakable_depth, self.no_in);
        self.loop_depth = 0;
        self.breakable_depth = 0;
        self.no_in = false;
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        (self.loop_depth, self.breakable_depth, self.no_in) = saved;
        let body = body?;

        Ok(Rc::new(FunctionDef {
            name,
            params,
            body: body.body,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::If, "'if'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;

        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStmt {
            test,
            consequent,
            alternate,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::While, "'while'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Statement::While(WhileStmt {
            test,
            body,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_do_while_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::Do, "'do'")?;
        let body = Box::new(self.parse_loop_body()?);
        self.expect(&TokenKind::While, "'while'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }

        Ok(Statement::DoWhile(DoWhileStmt {
            body,
            test,
            span: start.to(self.prev_span()),
        }))
    }

    /// Parse `for (;;)` or `for (x in obj)`.
    fn parse_for_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::For, "'for'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;

        self.no_in = true;
        let init = self.parse_for_init();
        self.no_in = false;
        let init = init?;

        if self.check(&TokenKind::In) {
            return self.parse_for_in_rest(start, init);
        }

        self.expect(&TokenKind::Semicolon, "';'")?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "';'")?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen, "')'")?;

        let body = Box::new(self.parse_loop_body()?);

        Ok(Statement::For(ForStmt {
            init,
            test,
            update,
            body,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_for_init(&mut self) -> ParseResult<Option<ForInit>> {
        if self.check(&TokenKind::Semicolon) {
            Ok(None)
        } else if matches!(self.current().kind, TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            Ok(Some(ForInit::Variable(self.parse_variable_declaration()?)))
        } else {
            Ok(Some(ForInit::Expression(self.parse_expression()?)))
        }
    }

    fn parse_for_in_rest(&mut self, start: Span, init: Option<ForInit>) -> ParseResult<Statement> {
        let in_span = self.current_span();
        let left = match init {
            Some(ForInit::Variable(mut decl))
                if decl.declarations.len() == 1 && decl.declarations[0].init.is_none() =>
            {
                let declarator = decl.declarations.remove(0);
                ForInTarget::Declaration {
                    kind: decl.kind,
                    name: declarator.name,
                }
            }
            Some(ForInit::Expression(expr)) if expr.is_assignable() => ForInTarget::Expression(expr),
            _ => {
                return Err(ParseError::InvalidAssignmentTarget {
                    at: self.source.info(in_span),
                })
            }
        };
        self.expect(&TokenKind::In, "'in'")?;
        let right = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Statement::ForIn(ForInStmt {
            left,
            right,
            body,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_loop_body(&mut self) -> ParseResult<Statement> {
        self.loop_depth += 1;
        self.breakable_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        self.breakable_depth -= 1;
        body
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::Switch, "'switch'")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        self.breakable_depth += 1;
        let cases = self.parse_switch_cases();
        self.breakable_depth -= 1;
        let cases = cases?;

        self.expect(&TokenKind::RightBrace, "'}'")?;

        Ok(Statement::Switch(SwitchStmt {
            discriminant,
            cases,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_switch_cases(&mut self) -> ParseResult<Vec<SwitchCase>> {
        let mut cases = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            let start = self.current_span();
            let test = if self.check(&TokenKind::Default) {
                self.advance();
                None
            } else {
                self.expect(&TokenKind::Case, "'case' or 'default'")?;
                Some(self.parse_expression()?)
            };
            self.expect(&TokenKind::Colon, "':'")?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }

            cases.push(SwitchCase {
                test,
                consequent,
                span: start.to(self.prev_span()),
            });
        }
        Ok(cases)
    }

    /// Parse `break` or `continue`, rejecting them outside a loop (or switch).
    fn parse_jump_statement(&mut self, is_break: bool) -> ParseResult<Statement> {
        let span = self.current_span();
        let keyword = if is_break { "break" } else { "continue" };
        let legal = if is_break {
            self.breakable_depth > 0
        } else {
            self.loop_depth > 0
        };
        if !legal {
            return Err(ParseError::IllegalStatement {
                keyword: keyword.to_string(),
                at: self.source.info(span),
            });
        }
        self.advance();
        self.consume_semicolon()?;

        Ok(if is_break {
            Statement::Break(span)
        } else {
            Statement::Continue(span)
        })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        if self.function_depth == 0 {
            return Err(ParseError::IllegalStatement {
                keyword: "return".to_string(),
                at: self.source.info(start),
            });
        }
        self.advance();

        let argument = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;

        Ok(Statement::Return(ReturnStmt {
            argument,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_throw_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.advance();
        if self.current().newline_before {
            return Err(self.expected_expression());
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;

        Ok(Statement::Throw(ThrowStmt {
            argument,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_try_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        self.expect(&TokenKind::Try, "'try'")?;
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current_span();
            self.advance();
            let param = if self.check(&TokenKind::LeftParen) {
                self.advance();
                let name = self.parse_identifier()?;
                self.expect(&TokenKind::RightParen, "')'")?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: catch_start.to(self.prev_span()),
            })
        } else {
            None
        };

        let finalizer = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_expected("'catch' or 'finally'"));
        }

        Ok(Statement::Try(TryStmt {
            block,
            handler,
            finalizer,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let start = self.current_span();
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;

        Ok(Statement::Expression(ExpressionStmt {
            expression,
            span: start.to(self.prev_span()),
        }))
    }

    /// Parse an expression, including comma sequences.
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let first = self.parse_assignment_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(SequenceExpr {
            expressions,
            span: start.to(self.prev_span()),
        }))
    }

    /// Parse assignment expression (right-associative, lowest precedence).
    fn parse_assignment_expression(&mut self) -> ParseResult<Expression> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let left = self.parse_conditional_expression()?;

        let operator = match &self.current().kind {
            TokenKind::Assign => AssignmentOp::Assign,
            TokenKind::PlusAssign => AssignmentOp::AddAssign,
            TokenKind::MinusAssign => AssignmentOp::SubAssign,
            TokenKind::StarAssign => AssignmentOp::MulAssign,
            TokenKind::SlashAssign => AssignmentOp::DivAssign,
            TokenKind::PercentAssign => AssignmentOp::ModAssign,
            TokenKind::StarStarAssign => AssignmentOp::ExpAssign,
            TokenKind::LeftShiftAssign => AssignmentOp::LeftShiftAssign,
            TokenKind::RightShiftAssign => AssignmentOp::RightShiftAssign,
            TokenKind::UnsignedRightShiftAssign => AssignmentOp::UnsignedRightShiftAssign,
            TokenKind::AmpersandAssign => AssignmentOp::BitAndAssign,
            TokenKind::PipeAssign => AssignmentOp::BitOrAssign,
            TokenKind::CaretAssign => AssignmentOp::BitXorAssign,
            _ => return Ok(left),
        };

        if !left.is_assignable() {
            return Err(ParseError::InvalidAssignmentTarget {
                at: self.source.info(left.span()),
            });
        }
        self.advance();
        let value = self.parse_assignment_expression()?;

        Ok(Expression::Assignment(AssignmentExpr {
            operator,
            target: Box::new(left),
            value: Box::new(value),
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let test = self.parse_binary_expression(0)?;

        if !self.check(&TokenKind::Question) {
            return Ok(test);
        }
        self.advance();

        // `in` is unambiguous between `?` and `:`.
        let no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression();
        self.no_in = no_in;
        let consequent = consequent?;
        self.expect(&TokenKind::Colon, "':'")?;
        let alternate = self.parse_assignment_expression()?;

        Ok(Expression::Conditional(ConditionalExpr {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: start.to(self.prev_span()),
        }))
    }

    /// Parse binary and logical operators by precedence climbing.
    fn parse_binary_expression(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let start = self.current_span();
        let mut left = self.parse_unary_expression()?;

        loop {
            let Some((op, prec)) = self.binary_operator() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();

            // `**` is right-associative.
            let next_min = if matches!(op, Operator::Binary(BinaryOp::Exp)) {
                prec
            } else {
                prec + 1
            };
            let right = Box::new(self.parse_binary_expression(next_min)?);
            let span = start.to(self.prev_span());
            let left_box = Box::new(left);

            left = match op {
                Operator::Logical(operator) => Expression::Logical(LogicalExpr {
                    operator,
                    left: left_box,
                    right,
                    span,
                }),
                Operator::Binary(operator) => Expression::Binary(BinaryExpr {
                    operator,
                    left: left_box,
                    right,
                    span,
                }),
            };
        }

        Ok(left)
    }

    /// Operator and precedence of the current token, if it is binary.
    fn binary_operator(&self) -> Option<(Operator, u8)> {
        use Operator::{Binary, Logical};

        let entry = match &self.current().kind {
            TokenKind::PipePipe => (Logical(LogicalOp::Or), 4),
            TokenKind::AmpersandAmpersand => (Logical(LogicalOp::And), 5),
            TokenKind::Pipe => (Binary(BinaryOp::BitOr), 6),
            TokenKind::Caret => (Binary(BinaryOp::BitXor), 7),
            TokenKind::Ampersand => (Binary(BinaryOp::BitAnd), 8),
            TokenKind::Equal => (Binary(BinaryOp::Equal), 9),
            TokenKind::NotEqual => (Binary(BinaryOp::NotEqual), 9),
            TokenKind::StrictEqual => (Binary(BinaryOp::StrictEqual), 9),
            TokenKind::StrictNotEqual => (Binary(BinaryOp::StrictNotEqual), 9),
            TokenKind::LessThan => (Binary(BinaryOp::LessThan), 10),
            TokenKind::LessEqual => (Binary(BinaryOp::LessEqual), 10),
            TokenKind::GreaterThan => (Binary(BinaryOp::GreaterThan), 10),
            TokenKind::GreaterEqual => (Binary(BinaryOp::GreaterEqual), 10),
            TokenKind::Instanceof => (Binary(BinaryOp::Instanceof), 10),
            TokenKind::In if !self.no_in => (Binary(BinaryOp::In), 10),
            TokenKind::LeftShift => (Binary(BinaryOp::LeftShift), 11),
            TokenKind::RightShift => (Binary(BinaryOp::RightShift), 11),
            TokenKind::UnsignedRightShift => (Binary(BinaryOp::UnsignedRightShift), 11),
            TokenKind::Plus => (Binary(BinaryOp::Add), 12),
            TokenKind::Minus => (Binary(BinaryOp::Sub), 12),
            TokenKind::Star => (Binary(BinaryOp::Mul), 13),
            TokenKind::Slash => (Binary(BinaryOp::Div), 13),
            TokenKind::Percent => (Binary(BinaryOp::Mod), 13),
            TokenKind::StarStar => (Binary(BinaryOp::Exp), 14),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        self.nested(Self::parse_unary)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        let operator = match &self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let argument = self.parse_unary_expression()?;
                if !argument.is_assignable() {
                    return Err(ParseError::InvalidAssignmentTarget {
                        at: self.source.info(argument.span()),
                    });
                }
                return Ok(Expression::Update(UpdateExpr {
                    operator,
                    prefix: true,
                    argument: Box::new(argument),
                    span: start.to(self.prev_span()),
                }));
            }
            _ => return self.parse_postfix_expression(),
        };

        self.advance();
        let argument = self.parse_unary_expression()?;
        Ok(Expression::Unary(UnaryExpr {
            operator,
            argument: Box::new(argument),
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        let argument = self.parse_left_hand_side_expression()?;

        // A newline before `++` ends the statement instead.
        let operator = match &self.current().kind {
            _ if self.current().newline_before => return Ok(argument),
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(argument),
        };
        if !argument.is_assignable() {
            return Err(ParseError::InvalidAssignmentTarget {
                at: self.source.info(argument.span()),
            });
        }
        self.advance();

        Ok(Expression::Update(UpdateExpr {
            operator,
            prefix: false,
            argument: Box::new(argument),
            span: start.to(self.prev_span()),
        }))
    }

    /// Parse call, member and `new` expressions.
    fn parse_left_hand_side_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();

        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };

        loop {
            match &self.current().kind {
                TokenKind::Dot | TokenKind::LeftBracket => {
                    expr = self.parse_member_suffix(expr, start)?;
                }
                TokenKind::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call(CallExpr {
                        callee: Box::new(expr),
                        arguments,
                        span: start.to(self.prev_span()),
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// `new Callee(args)`; member accesses bind tighter than the argument list.
    fn parse_new_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::New, "'new'")?;

        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        while matches!(self.current().kind, TokenKind::Dot | TokenKind::LeftBracket) {
            callee = self.parse_member_suffix(callee, start)?;
        }

        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::New(NewExpr {
            callee: Box::new(callee),
            arguments,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_member_suffix(&mut self, object: Expression, start: Span) -> ParseResult<Expression> {
        let property = if self.check(&TokenKind::Dot) {
            self.advance();
            let name = self
                .current()
                .property_name()
                .ok_or_else(|| self.expected_identifier())?;
            self.advance();
            MemberProperty::Named(name)
        } else {
            self.expect(&TokenKind::LeftBracket, "'['")?;
            let no_in = std::mem::replace(&mut self.no_in, false);
            let property = self.parse_expression();
            self.no_in = no_in;
            let property = property?;
            self.expect(&TokenKind::RightBracket, "']'")?;
            MemberProperty::Computed(Box::new(property))
        };

        Ok(Expression::Member(MemberExpr {
            object: Box::new(object),
            property,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let span = self.current_span();

        let expr = match &self.current().kind {
            TokenKind::This => Expression::This(span),
            TokenKind::Null => Expression::Literal(Literal::Null(span)),
            TokenKind::True => Expression::Literal(Literal::Boolean(true, span)),
            TokenKind::False => Expression::Literal(Literal::Boolean(false, span)),
            TokenKind::Number(n) => Expression::Literal(Literal::Number(*n, span)),
            TokenKind::String(s) => Expression::Literal(Literal::String(s.clone(), span)),
            TokenKind::Identifier(name) => Expression::Identifier(Identifier {
                name: name.clone(),
                span,
            }),
            TokenKind::LeftParen => {
                self.advance();
                let no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_expression();
                self.no_in = no_in;
                let expr = expr?;
                self.expect(&TokenKind::RightParen, "')'")?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => return self.parse_array_expression(),
            TokenKind::LeftBrace => return self.parse_object_expression(),
            TokenKind::Function => {
                self.advance();
                let name = match &self.current().kind {
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                return Ok(Expression::Function(self.parse_function_rest(name, span)?));
            }
            _ => return Err(self.expected_expression()),
        };

        self.advance();
        Ok(expr)
    }

    fn parse_array_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBracket, "'['")?;
        let no_in = std::mem::replace(&mut self.no_in, false);

        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            if self.check(&TokenKind::Comma) {
                self.advance();
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment_expression()?));
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma, "',' or ']'")?;
            }
        }
        self.no_in = no_in;
        self.expect(&TokenKind::RightBracket, "']'")?;

        Ok(Expression::Array(ArrayExpr {
            elements,
            span: start.to(self.prev_span()),
        }))
    }

    fn parse_object_expression(&mut self) -> ParseResult<Expression> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        let no_in = std::mem::replace(&mut self.no_in, false);

        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            properties.push(self.parse_object_property()?);
            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma, "',' or '}'")?;
            }
        }
        self.no_in = no_in;
        self.expect(&TokenKind::RightBrace, "'}'")?;

        Ok(Expression::Object(ObjectExpr {
            properties,
            span: start.to(self.prev_span()),
        }))
    }

    /// `key: value`, shorthand `key`, or method `key(params) { body }`.
    fn parse_object_property(&mut self) -> ParseResult<ObjectProperty> {
        let start = self.current_span();
        let token = self.current().clone();
        let key = match &token.kind {
            TokenKind::String(s) => s.clone(),
            TokenKind::Number(n) => number_to_string(*n),
            _ => token.property_name().ok_or_else(|| ParseError::ExpectedPropertyName {
                found: token.kind.describe(),
                at: self.source.info(start),
            })?,
        };
        self.advance();

        let value = match &self.current().kind {
            TokenKind::Colon => {
                self.advance();
                self.parse_assignment_expression()?
            }
            TokenKind::LeftParen => {
                Expression::Function(self.parse_function_rest(Some(key.clone()), start)?)
            }
            _ if matches!(token.kind, TokenKind::Identifier(_)) => {
                Expression::Identifier(Identifier {
                    name: key.clone(),
                    span: start,
                })
            }
            _ => return Err(self.error_expected("':'")),
        };

        Ok(ObjectProperty {
            key,
            value,
            span: start.to(self.prev_span()),
        })
    }

    /// Parse a parenthesised argument list.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let no_in = std::mem::replace(&mut self.no_in, false);

        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            arguments.push(self.parse_assignment_expression()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma, "',' or ')'")?;
            }
        }
        self.no_in = no_in;
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(arguments)
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.expected_identifier())
        }
    }

    // Helper methods

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::default()
        }
    }

    fn is_eof(&self) -> bool {
        self.current().is_eof()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_expected(expected))
        }
    }

    /// True where a statement may end without an explicit semicolon.
    fn at_statement_end(&self) -> bool {
        let token = self.current();
        token.newline_before
            || matches!(
                token.kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            )
    }

    /// Consume a `;`, or accept its automatic insertion.
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error_expected("';'"))
        }
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        ParseError::Expected {
            expected: expected.to_string(),
            found: self.current().kind.describe(),
            at: self.source.info(self.current_span()),
        }
    }

    fn expected_expression(&self) -> ParseError {
        ParseError::ExpectedExpression {
            found: self.current().kind.describe(),
            at: self.source.info(self.current_span()),
        }
    }

    fn expected_identifier(&self) -> ParseError {
        ParseError::ExpectedIdentifier {
            found: self.current().kind.describe(),
            at: self.source.info(self.current_span()),
        }
    }
}

/// Binary-level operator found by precedence climbing.
#[derive(Clone, Copy)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Program {
        parse(text, "test.js").unwrap()
    }

    fn expression(text: &str) -> Expression {
        match parse_ok(text).body.remove(0) {
            Statement::Expression(stmt) => stmt.expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let Expression::Binary(add) = expression("1 + 2 * 3") else {
            panic!("expected binary expression");
        };
        assert_eq!(add.operator, BinaryOp::Add);
        assert!(matches!(*add.right, Expression::Binary(BinaryExpr { operator: BinaryOp::Mul, .. })));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let Expression::Binary(outer) = expression("2 ** 3 ** 2") else {
            panic!("expected binary expression");
        };
        assert!(matches!(*outer.left, Expression::Literal(Literal::Number(n, _)) if n == 2.0));
        assert!(matches!(*outer.right, Expression::Binary(_)));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let Expression::Assignment(outer) = expression("a = b = 1") else {
            panic!("expected assignment");
        };
        assert!(matches!(*outer.value, Expression::Assignment(_)));
    }

    #[test]
    fn test_logical_precedence() {
        let Expression::Logical(or) = expression("a || b && c") else {
            panic!("expected logical expression");
        };
        assert_eq!(or.operator, LogicalOp::Or);
        assert!(matches!(*or.right, Expression::Logical(LogicalExpr { operator: LogicalOp::And, .. })));
    }

    #[test]
    fn test_member_call_chain() {
        let Expression::Call(call) = expression("a.b[c](1, 2)") else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
        assert!(matches!(*call.callee, Expression::Member(MemberExpr { property: MemberProperty::Computed(_), .. })));
    }

    #[test]
    fn test_new_with_member_callee() {
        let Expression::New(new) = expression("new a.B(1)") else {
            panic!("expected new expression");
        };
        assert!(matches!(*new.callee, Expression::Member(_)));
        assert_eq!(new.arguments.len(), 1);
    }

    #[test]
    fn test_object_literal_forms() {
        let Expression::Object(obj) = expression("({ a: 1, 'b': 2, 3: 4, c, d() { return 1; }, if: 5 })") else {
            panic!("expected object literal");
        };
        let keys: Vec<_> = obj.properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "3", "c", "d", "if"]);
        assert!(matches!(obj.properties[4].value, Expression::Function(_)));
    }

    #[test]
    fn test_statements() {
        let program = parse_ok(
            "var a = 1, b; let c = 2; const d = 3;
             function f(x, y) { return x + y }
             if (a) b = 1; else b = 2;
             while (a) { break; }
             do { a--; } while (a > 0)
             for (var i = 0; i < 3; i++) continue;
             for (var k in obj) {}
             switch (a) { case 1: break; default: b = 0; }
             try { throw 1 } catch (e) {} finally {}
             debugger;",
        );
        assert_eq!(program.body.len(), 12);
        assert!(matches!(program.body[8], Statement::ForIn(_)));
    }

    #[test]
    fn test_asi_on_newline() {
        let program = parse_ok("a = 1\nb = 2\n");
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_return_with_newline_returns_undefined() {
        let program = parse_ok("function f() { return\n 1 }");
        let Statement::Function(decl) = &program.body[0] else {
            panic!("expected function");
        };
        assert!(matches!(decl.function.body[0], Statement::Return(ReturnStmt { argument: None, .. })));
    }

    #[test]
    fn test_unclosed_paren_reports_position() {
        let err = parse("(1 + 2", "test.js").unwrap_err();
        match err {
            ParseError::Expected { expected, found, at } => {
                assert_eq!(expected, "')'");
                assert_eq!(found, "end of input");
                assert_eq!((at.line, at.column), (1, 7));
                assert_eq!(at.filename, "test.js");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon_between_expressions() {
        let err = parse("a b", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::Expected { ref expected, .. } if expected == "';'"));
        assert_eq!(err.source_info().column, 3);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 = 2", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
    }

    #[test]
    fn test_expected_expression() {
        let err = parse("var x = ;", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::ExpectedExpression { .. }));
        assert_eq!(err.source_info().column, 9);
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        let err = parse("break;", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::IllegalStatement { ref keyword, .. } if keyword == "break"));
        assert!(parse("while (1) { function f() { continue; } }", "test.js").is_err());
        assert!(parse("return 1;", "test.js").is_err());
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = parse("const x;", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::MissingInitializer { .. }));
    }

    #[test]
    fn test_lex_errors_surface_through_parse() {
        let err = parse("var s = 'oops", "test.js").unwrap_err();
        assert!(matches!(err, ParseError::Lex(_)));
    }

    #[test]
    fn test_from_tokens() {
        let source = Source::new("pre.js", "x + 1");
        let tokens = Lexer::new(source.clone()).tokenize().unwrap();
        let program = Parser::from_tokens(tokens, source).parse_script().unwrap();
        assert_eq!(program.body.len(), 1);
        assert_eq!(program.source.name, "pre.js");
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let text = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse(&text, "deep.js").unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. }));
        assert_eq!(err.source_info().line, 1);
        assert!(err.to_string().starts_with("SyntaxError: nesting exceeds 1000 levels"));

        for text in [
            format!("{}true", "!".repeat(5_000)),
            format!("{}{}", "{".repeat(5_000), "}".repeat(5_000)),
            format!("{}0{}", "[".repeat(5_000), "]".repeat(5_000)),
            format!("x{}1", " = x".repeat(5_000)),
        ] {
            let err = parse(&text, "deep.js").unwrap_err();
            assert!(matches!(err, ParseError::NestingTooDeep { .. }), "{}", err);
        }
    }

    #[test]
    fn test_nesting_below_the_limit_parses() {
        let text = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(expression(&text), Expression::Literal(Literal::Number(n, _)) if n == 1.0));
        let text = format!("{}true", "!".repeat(400));
        assert!(matches!(expression(&text), Expression::Unary(_)));

        // The counter unwinds, so long flat sequences are unaffected.
        let text = "var a = 1;\n".repeat(5_000);
        assert_eq!(parse_ok(&text).body.len(), 5_000);
    }
}
