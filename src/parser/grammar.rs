//! Recursive-descent parser turning sortscript tokens into a [`Program`].

use super::ast::{BoolOp, CmpOp, Expr, FunctionDef, Param, Program, Stmt, StmtKind, UnaryOp};
use super::lexer::{BinOp, Lexer, Tok, Token};
use crate::error::{ScriptError, ScriptResult};
use std::rc::Rc;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    fn_depth: usize,
    loop_depth: usize,
    /// Depth of the expression being built, counted over unary operators,
    /// right-nested operands and left-folded operator chains.
    nesting: usize,
}

/// Deepest expression accepted; evaluation recurses once per level.
pub const MAX_EXPR_NESTING: usize = 1000;

/// Tokenize and parse a whole program.
pub fn parse_program(source: &str) -> ScriptResult<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Like [`parse_program`], but every reported line (statement lines and
/// syntax errors) is translated through `line_map`, which maps a 1-based
/// line of `source` to the line number to report.
pub fn parse_program_mapped(source: &str, line_map: &[usize]) -> ScriptResult<Program> {
    let tokens = Lexer::with_line_map(source, line_map.to_vec()).tokenize()?;
    Parser::new(tokens).parse_program()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            fn_depth: 0,
            loop_depth: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> &Tok {
        self.tokens
            .get(self.pos)
            .map(|t| &t.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn peek_next(&self) -> &Tok {
        self.tokens
            .get(self.pos + 1)
            .map(|t| &t.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, tok: &Tok) -> bool {
        self.peek() == tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.check(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> ScriptResult<T> {
        Err(ScriptError::syntax(message, self.line()))
    }

    /// Run `parse` one nesting level deeper.
    fn nested(&mut self, parse: fn(&mut Self) -> ScriptResult<Expr>) -> ScriptResult<Expr> {
        self.check_nesting(1)?;
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn check_nesting(&self, extra: usize) -> ScriptResult<()> {
        if self.nesting + extra > MAX_EXPR_NESTING {
            return self.error("too many nested expressions");
        }
        Ok(())
    }

    fn invalid<T>(&self) -> ScriptResult<T> {
        match self.peek() {
            Tok::Indent => self.error("unexpected indent"),
            Tok::Dedent => self.error("unindent does not match any outer indentation level"),
            _ => self.error("invalid syntax"),
        }
    }

    fn expect(&mut self, tok: &Tok) -> ScriptResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            self.invalid()
        }
    }

    fn expect_name(&mut self) -> ScriptResult<String> {
        match self.peek().clone() {
            Tok::Name(name) => {
                self.pos += 1;
                Ok(name)
            }
            _ => self.invalid(),
        }
    }

    pub fn parse_program(mut self) -> ScriptResult<Program> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::Eof => break,
                Tok::Newline => {
                    self.pos += 1;
                }
                _ => self.parse_statement(&mut body)?,
            }
        }
        Ok(Program { body })
    }

    /// Parse one statement line (possibly several `;`-separated simple
    /// statements) or one compound statement, appending to `out`.
    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> ScriptResult<()> {
        match self.peek() {
            Tok::If => out.push(self.parse_if()?),
            Tok::While => out.push(self.parse_while()?),
            Tok::For => out.push(self.parse_for()?),
            Tok::Def => out.push(self.parse_def()?),
            Tok::Indent => return self.error("unexpected indent"),
            Tok::Dedent => {
                return self.error("unindent does not match any outer indentation level")
            }
            _ => self.parse_simple_statements(out)?,
        }
        Ok(())
    }

    fn parse_simple_statements(&mut self, out: &mut Vec<Stmt>) -> ScriptResult<()> {
        loop {
            out.push(self.parse_small_statement()?);
            if self.eat(&Tok::Semi) {
                if matches!(self.peek(), Tok::Newline | Tok::Eof) {
                    break;
                }
                continue;
            }
            break;
        }
        match self.peek() {
            Tok::Newline => {
                self.pos += 1;
                Ok(())
            }
            Tok::Eof => Ok(()),
            _ => self.invalid(),
        }
    }

    fn parse_small_statement(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        let kind = match self.peek() {
            Tok::Pass => {
                self.pos += 1;
                StmtKind::Pass
            }
            Tok::Break => {
                if self.loop_depth == 0 {
                    return self.error("'break' outside loop");
                }
                self.pos += 1;
                StmtKind::Break
            }
            Tok::Continue => {
                if self.loop_depth == 0 {
                    return self.error("'continue' not properly in loop");
                }
                self.pos += 1;
                StmtKind::Continue
            }
            Tok::Return => {
                if self.fn_depth == 0 {
                    return self.error("'return' outside function");
                }
                self.pos += 1;
                if matches!(self.peek(), Tok::Newline | Tok::Semi | Tok::Eof) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_testlist()?))
                }
            }
            Tok::Global => {
                self.pos += 1;
                let mut names = vec![self.expect_name()?];
                while self.eat(&Tok::Comma) {
                    names.push(self.expect_name()?);
                }
                StmtKind::Global(names)
            }
            _ => self.parse_expr_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    fn parse_expr_statement(&mut self) -> ScriptResult<StmtKind> {
        let first = self.parse_testlist()?;

        if let Tok::AugAssign(op) = *self.peek() {
            if !matches!(first, Expr::Name(_) | Expr::Index { .. } | Expr::Slice { .. }) {
                return self.error("illegal expression for augmented assignment");
            }
            self.pos += 1;
            let value = self.parse_testlist()?;
            return Ok(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }

        if !self.check(&Tok::Assign) {
            return Ok(StmtKind::Expr(first));
        }

        let mut targets = vec![first];
        while self.eat(&Tok::Assign) {
            targets.push(self.parse_testlist()?);
        }
        let value = targets.pop().unwrap_or(Expr::NoneLit);
        if targets.iter().any(|t| !t.is_target()) {
            return self.error("cannot assign to expression");
        }
        Ok(StmtKind::Assign { targets, value })
    }

    /// `':' (simple statements | NEWLINE INDENT stmt+ DEDENT)`
    fn parse_block(&mut self, owner: &str, owner_line: usize) -> ScriptResult<Vec<Stmt>> {
        self.expect(&Tok::Colon)?;
        let mut body = Vec::new();
        if !self.eat(&Tok::Newline) {
            self.parse_simple_statements(&mut body)?;
            return Ok(body);
        }
        if !self.eat(&Tok::Indent) {
            return self.error(format!(
                "expected an indented block after {} on line {}",
                owner, owner_line
            ));
        }
        while !self.eat(&Tok::Dedent) {
            if self.check(&Tok::Eof) {
                break;
            }
            if self.eat(&Tok::Newline) {
                continue;
            }
            self.parse_statement(&mut body)?;
        }
        Ok(body)
    }

    fn parse_if(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        self.expect(&Tok::If)?;
        let mut branches = Vec::new();
        let cond = self.parse_test()?;
        let body = self.parse_block("'if' statement", line)?;
        branches.push((cond, body));

        let mut orelse = Vec::new();
        loop {
            let clause_line = self.line();
            if self.eat(&Tok::Elif) {
                let cond = self.parse_test()?;
                let body = self.parse_block("'elif' statement", clause_line)?;
                branches.push((cond, body));
            } else if self.eat(&Tok::Else) {
                orelse = self.parse_block("'else' statement", clause_line)?;
                break;
            } else {
                break;
            }
        }
        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            line,
        })
    }

    fn parse_loop_body(&mut self, owner: &str, line: usize) -> ScriptResult<(Vec<Stmt>, Vec<Stmt>)> {
        self.loop_depth += 1;
        let body = self.parse_block(owner, line);
        self.loop_depth -= 1;
        let body = body?;

        let else_line = self.line();
        let orelse = if self.eat(&Tok::Else) {
            self.parse_block("'else' statement", else_line)?
        } else {
            Vec::new()
        };
        Ok((body, orelse))
    }

    fn parse_while(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        self.expect(&Tok::While)?;
        let cond = self.parse_test()?;
        let (body, orelse) = self.parse_loop_body("'while' statement", line)?;
        Ok(Stmt {
            kind: StmtKind::While { cond, body, orelse },
            line,
        })
    }

    fn parse_for(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        self.expect(&Tok::For)?;

        let mut items = vec![self.parse_bitor()?];
        let mut tupled = false;
        while self.eat(&Tok::Comma) {
            tupled = true;
            if self.check(&Tok::In) {
                break;
            }
            items.push(self.parse_bitor()?);
        }
        let target = if tupled {
            Expr::Tuple(items)
        } else {
            items.pop().unwrap_or(Expr::NoneLit)
        };
        if !target.is_target() {
            return self.error("cannot assign to expression");
        }

        self.expect(&Tok::In)?;
        let iter = self.parse_testlist()?;
        let (body, orelse) = self.parse_loop_body("'for' statement", line)?;
        Ok(Stmt {
            kind: StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            line,
        })
    }

    fn parse_def(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        self.expect(&Tok::Def)?;
        let name = self.expect_name()?;
        self.expect(&Tok::LParen)?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check(&Tok::RParen) {
            let pname = self.expect_name()?;
            if params.iter().any(|p| p.name == pname) {
                return self.error(format!(
                    "duplicate argument '{}' in function definition",
                    pname
                ));
            }
            let default = if self.eat(&Tok::Assign) {
                Some(self.parse_test()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return self.error("non-default argument follows default argument");
                }
                None
            };
            params.push(Param {
                name: pname,
                default,
            });
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        self.expect(&Tok::RParen)?;

        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.fn_depth += 1;
        let body = self.parse_block("function definition", line);
        self.fn_depth -= 1;
        self.loop_depth = saved_loops;

        Ok(Stmt {
            kind: StmtKind::Def(Rc::new(FunctionDef {
                name,
                params,
                body: body?,
            })),
            line,
        })
    }

    // ---- expressions ----

    /// `test (',' test)* [',']`, producing a tuple when a comma is present.
    fn parse_testlist(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_test()?;
        if !self.check(&Tok::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Tok::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_test()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Tok::Name(_)
                | Tok::Int(_)
                | Tok::Float(_)
                | Tok::Str(_)
                | Tok::True
                | Tok::False
                | Tok::None
                | Tok::LParen
                | Tok::LBracket
                | Tok::Not
                | Tok::Tilde
                | Tok::Op(BinOp::Sub)
                | Tok::Op(BinOp::Add)
        )
    }

    pub fn parse_test(&mut self) -> ScriptResult<Expr> {
        let value = self.parse_or()?;
        if !self.check(&Tok::If) {
            return Ok(value);
        }
        self.pos += 1;
        let cond = self.parse_or()?;
        self.expect(&Tok::Else)?;
        let orelse = self.nested(Self::parse_test)?;
        Ok(Expr::IfExp {
            cond: Box::new(cond),
            then: Box::new(value),
            orelse: Box::new(orelse),
        })
    }

    fn parse_or(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_and()?;
        let mut chain = 0;
        while self.eat(&Tok::Or) {
            chain += 1;
            self.check_nesting(chain)?;
            let right = self.parse_and()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_not()?;
        let mut chain = 0;
        while self.eat(&Tok::And) {
            chain += 1;
            self.check_nesting(chain)?;
            let right = self.parse_not()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ScriptResult<Expr> {
        if self.eat(&Tok::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek() {
            Tok::Lt => CmpOp::Lt,
            Tok::Le => CmpOp::Le,
            Tok::Gt => CmpOp::Gt,
            Tok::Ge => CmpOp::Ge,
            Tok::Eq => CmpOp::Eq,
            Tok::Ne => CmpOp::Ne,
            Tok::In => CmpOp::In,
            Tok::Not if *self.peek_next() == Tok::In => {
                self.pos += 1;
                CmpOp::NotIn
            }
            Tok::Is if *self.peek_next() == Tok::Not => {
                self.pos += 1;
                CmpOp::IsNot
            }
            Tok::Is => CmpOp::Is,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> ScriptResult<Expr> {
        let first = self.parse_bitor()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.parse_bitor()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_binary_level(
        &mut self,
        ops: &[BinOp],
        next: fn(&mut Self) -> ScriptResult<Expr>,
    ) -> ScriptResult<Expr> {
        let mut left = next(self)?;
        let mut chain = 0;
        loop {
            let op = match self.peek() {
                Tok::Op(op) if ops.contains(op) => *op,
                _ => break,
            };
            chain += 1;
            self.check_nesting(chain)?;
            self.pos += 1;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(&[BinOp::BitOr], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(&[BinOp::BitXor], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(&[BinOp::BitAnd], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(&[BinOp::Shl, BinOp::Shr], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(&[BinOp::Add, BinOp::Sub], Self::parse_term)
    }

    fn parse_term(&mut self) -> ScriptResult<Expr> {
        self.parse_binary_level(
            &[BinOp::Mul, BinOp::Div, BinOp::FloorDiv, BinOp::Mod],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> ScriptResult<Expr> {
        let op = match self.peek() {
            Tok::Op(BinOp::Sub) => Some(UnaryOp::Neg),
            Tok::Op(BinOp::Add) => Some(UnaryOp::Pos),
            Tok::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.nested(Self::parse_factor)?;
            // fold negative literals
            if let (UnaryOp::Neg, Expr::Int(v)) = (op, &operand) {
                return Ok(Expr::Int(v.wrapping_neg()));
            }
            if let (UnaryOp::Neg, Expr::Float(v)) = (op, &operand) {
                return Ok(Expr::Float(-v));
            }
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ScriptResult<Expr> {
        let base = self.parse_primary()?;
        if self.check(&Tok::Op(BinOp::Pow)) {
            self.pos += 1;
            let exponent = self.nested(Self::parse_factor)?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                Tok::LParen => {
                    self.pos += 1;
                    let (args, kwargs) = self.parse_call_args()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                Tok::LBracket => {
                    self.pos += 1;
                    expr = self.parse_subscript(expr)?;
                }
                Tok::Dot => {
                    self.pos += 1;
                    let method = self.expect_name()?;
                    if !self.eat(&Tok::LParen) {
                        return self.error("attribute access is only supported for method calls");
                    }
                    let (args, kwargs) = self.parse_call_args()?;
                    expr = Expr::MethodCall {
                        object: Box::new(expr),
                        method,
                        args,
                        kwargs,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// After `(`: positional then keyword arguments, up to and including `)`.
    fn parse_call_args(&mut self) -> ScriptResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.check(&Tok::RParen) {
            if let (Tok::Name(name), Tok::Assign) = (self.peek().clone(), self.peek_next().clone()) {
                self.pos += 2;
                if kwargs.iter().any(|(k, _)| *k == name) {
                    return self.error(format!("keyword argument repeated: {}", name));
                }
                kwargs.push((name, self.parse_test()?));
            } else {
                if !kwargs.is_empty() {
                    return self.error("positional argument follows keyword argument");
                }
                args.push(self.parse_test()?);
            }
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        self.expect(&Tok::RParen)?;
        Ok((args, kwargs))
    }

    /// After `[`: either an index or a slice, up to and including `]`.
    fn parse_subscript(&mut self, object: Expr) -> ScriptResult<Expr> {
        let lower = if self.check(&Tok::Colon) {
            None
        } else {
            let index = self.parse_testlist()?;
            if self.eat(&Tok::RBracket) {
                return Ok(Expr::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                });
            }
            Some(Box::new(index))
        };

        self.expect(&Tok::Colon)?;
        let upper = if matches!(self.peek(), Tok::Colon | Tok::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let step = if self.eat(&Tok::Colon) && !self.check(&Tok::RBracket) {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        self.expect(&Tok::RBracket)?;
        Ok(Expr::Slice {
            object: Box::new(object),
            lower,
            upper,
            step,
        })
    }

    fn parse_atom(&mut self) -> ScriptResult<Expr> {
        match self.advance() {
            Tok::Name(name) => Ok(Expr::Name(name)),
            Tok::Int(v) => Ok(Expr::Int(v)),
            Tok::Float(v) => Ok(Expr::Float(v)),
            Tok::Str(first) => {
                let mut text = first;
                while let Tok::Str(next) = self.peek().clone() {
                    self.pos += 1;
                    text.push_str(&next);
                }
                Ok(Expr::Str(Rc::from(text)))
            }
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::None => Ok(Expr::NoneLit),
            Tok::LParen => {
                if self.eat(&Tok::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.parse_test()?;
                if self.eat(&Tok::RParen) {
                    return Ok(inner);
                }
                let mut items = vec![inner];
                while self.eat(&Tok::Comma) {
                    if self.check(&Tok::RParen) {
                        break;
                    }
                    items.push(self.parse_test()?);
                }
                self.expect(&Tok::RParen)?;
                Ok(Expr::Tuple(items))
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                while !self.check(&Tok::RBracket) {
                    items.push(self.parse_test()?);
                    if !self.eat(&Tok::Comma) {
                        break;
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Expr::List(items))
            }
            Tok::LBrace => self.error("dict and set literals are not supported"),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                self.invalid()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tuple_swap_as_single_assignment() {
        let program = parse_program("arr[0], arr[1] = arr[1], arr[0]\n").unwrap();
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets.len(), 1);
                assert!(matches!(&targets[0], Expr::Tuple(items) if items.len() == 2));
                assert!(matches!(value, Expr::Tuple(items) if items.len() == 2));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn missing_block_reports_owner() {
        let err = parse_program("for i in range(3):\nx = 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected an indented block after 'for' statement on line 1 (<string>, line 2)"
        );
    }

    #[test]
    fn stray_indent_is_rejected() {
        let err = parse_program("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.to_string(), "unexpected indent (<string>, line 2)");
    }

    #[test]
    fn return_outside_function() {
        let err = parse_program("return 1\n").unwrap_err();
        assert!(err.to_string().starts_with("'return' outside function"));
    }

    #[test]
    fn deep_expressions_are_rejected() {
        let ok = format!("x = {}1\n", "-".repeat(MAX_EXPR_NESTING));
        assert!(parse_program(&ok).is_ok());

        let unary = format!("x = {}1\n", "not ".repeat(50_000));
        let err = parse_program(&unary).unwrap_err();
        assert_eq!(err.to_string(), "too many nested expressions (<string>, line 1)");

        let chain = format!("x = 1{}\n", " + 1".repeat(50_000));
        assert!(parse_program(&chain).is_err());
    }
}
