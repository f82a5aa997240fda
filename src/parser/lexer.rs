//! Tokenizer for sortscript.
//!
//! Produces `Indent`/`Dedent`/`Newline` tokens from leading whitespace the
//! usual offside-rule way. Newlines inside brackets, blank lines and comment
//! lines produce no tokens.

use crate::error::{ScriptError, ScriptResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    // keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Not,
    And,
    Or,
    Is,
    Break,
    Continue,
    Pass,
    Global,
    True,
    False,
    None,
    // punctuation and operators
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semi,
    Assign,
    AugAssign(BinOp),
    Op(BinOp),
    Tilde,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// A token with the 1-based line of the text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

fn keyword(word: &str) -> Option<Tok> {
    let tok = match word {
        "def" => Tok::Def,
        "return" => Tok::Return,
        "if" => Tok::If,
        "elif" => Tok::Elif,
        "else" => Tok::Else,
        "while" => Tok::While,
        "for" => Tok::For,
        "in" => Tok::In,
        "not" => Tok::Not,
        "and" => Tok::And,
        "or" => Tok::Or,
        "is" => Tok::Is,
        "break" => Tok::Break,
        "continue" => Tok::Continue,
        "pass" => Tok::Pass,
        "global" => Tok::Global,
        "True" => Tok::True,
        "False" => Tok::False,
        "None" => Tok::None,
        _ => return None,
    };
    Some(tok)
}

/// Deepest bracket nesting accepted.
pub const MAX_BRACKET_DEPTH: usize = 200;

/// Deepest block nesting accepted.
pub const MAX_INDENT_LEVELS: usize = 100;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    indents: Vec<usize>,
    /// Open bracket nesting; layout is suspended while positive.
    depth: usize,
    tokens: Vec<Token>,
    line_map: Vec<usize>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_line_map(source, Vec::new())
    }

    /// Report line `n` of `source` as `line_map[n - 1]`. Lines past the end
    /// of the map are reported unchanged.
    pub fn with_line_map(source: &str, line_map: Vec<usize>) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            indents: vec![0],
            depth: 0,
            tokens: Vec::new(),
            line_map,
        }
    }

    fn reported_line(&self, line: usize) -> usize {
        self.line_map.get(line - 1).copied().unwrap_or(line)
    }

    fn syntax_error(&self, message: impl Into<String>, line: usize) -> ScriptError {
        ScriptError::syntax(message, self.reported_line(line))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, tok: Tok) {
        let line = self.reported_line(self.line);
        self.tokens.push(Token { tok, line });
    }

    fn last_is_layout(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.tok),
            None | Some(Tok::Newline) | Some(Tok::Indent) | Some(Tok::Dedent)
        )
    }

    pub fn tokenize(mut self) -> ScriptResult<Vec<Token>> {
        let mut at_line_start = true;

        while self.pos < self.chars.len() {
            if at_line_start && self.depth == 0 {
                if !self.handle_indentation()? {
                    continue;
                }
                at_line_start = false;
            }

            let Some(ch) = self.peek() else { break };
            match ch {
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        if !self.last_is_layout() {
                            self.push(Tok::Newline);
                        }
                        at_line_start = true;
                    }
                    self.line += 1;
                }
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 3;
                    self.line += 1;
                }
                '"' | '\'' => self.read_string(ch)?,
                c if c.is_ascii_digit() => self.read_number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
                c if c == '_' || c.is_alphabetic() => self.read_word(),
                _ => self.read_punct()?,
            }
        }

        if !self.last_is_layout() {
            self.push(Tok::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(self.tokens)
    }

    /// Measure leading whitespace of a logical line and emit layout tokens.
    /// Returns false when the line is blank or a comment and was consumed.
    fn handle_indentation(&mut self) -> ScriptResult<bool> {
        let mut width = 0usize;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(false);
            }
            Some('\r') if self.peek_at(1) == Some('\n') || self.peek_at(1).is_none() => {
                self.pos += 1;
                if self.peek() == Some('\n') {
                    self.pos += 1;
                    self.line += 1;
                }
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.pos += 1;
                    self.line += 1;
                }
                return Ok(false);
            }
            _ => {}
        }

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            if self.indents.len() > MAX_INDENT_LEVELS {
                return Err(self.syntax_error("too many levels of indentation", self.line));
            }
            self.indents.push(width);
            self.push(Tok::Indent);
        } else if width < current {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.push(Tok::Dedent);
            }
            if self.indents.last().copied() != Some(width) {
                return Err(self.syntax_error(
                    "unindent does not match any outer indentation level",
                    self.line,
                ));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_word(&mut self) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == '_' || c.is_alphanumeric())
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let tok = keyword(&word).unwrap_or(Tok::Name(word));
        self.push(tok);
    }

    fn read_number(&mut self) -> ScriptResult<()> {
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.pos += 1;
            } else if c == '.' && !is_float {
                is_float = true;
                self.pos += 1;
            } else if (c == 'e' || c == 'E')
                && self
                    .peek_at(1)
                    .is_some_and(|n| n.is_ascii_digit() || n == '+' || n == '-')
            {
                is_float = true;
                self.pos += 2;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if self.peek().is_some_and(|c| c == '_' || c.is_alphabetic()) {
            return Err(self.syntax_error("invalid decimal literal", self.line));
        }
        let tok = if is_float {
            text.parse::<f64>()
                .map(Tok::Float)
                .map_err(|_| self.syntax_error("invalid syntax", self.line))?
        } else {
            match text.parse::<i64>() {
                Ok(v) => Tok::Int(v),
                Err(_) => return Err(ScriptError::Overflow),
            }
        };
        self.push(tok);
        Ok(())
    }

    fn read_string(&mut self, quote: char) -> ScriptResult<()> {
        let start_line = self.line;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.syntax_error(
                    "unterminated string literal",
                    start_line,
                ));
            };
            self.pos += 1;
            match ch {
                '\n' => {
                    return Err(self.syntax_error(
                        "unterminated string literal",
                        start_line,
                    ))
                }
                c if c == quote => break,
                '\\' => {
                    let Some(esc) = self.peek() else { continue };
                    self.pos += 1;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        '\n' => self.line += 1,
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
        self.push(Tok::Str(out));
        Ok(())
    }

    fn read_punct(&mut self) -> ScriptResult<()> {
        let c = self.peek().unwrap_or('\0');
        let n1 = self.peek_at(1);
        let n2 = self.peek_at(2);

        // three-character operators first
        let three = match (c, n1, n2) {
            ('*', Some('*'), Some('=')) => Some(Tok::AugAssign(BinOp::Pow)),
            ('/', Some('/'), Some('=')) => Some(Tok::AugAssign(BinOp::FloorDiv)),
            ('<', Some('<'), Some('=')) => Some(Tok::AugAssign(BinOp::Shl)),
            ('>', Some('>'), Some('=')) => Some(Tok::AugAssign(BinOp::Shr)),
            _ => None,
        };
        if let Some(tok) = three {
            self.pos += 3;
            self.push(tok);
            return Ok(());
        }

        let two = match (c, n1) {
            ('*', Some('*')) => Some(Tok::Op(BinOp::Pow)),
            ('/', Some('/')) => Some(Tok::Op(BinOp::FloorDiv)),
            ('<', Some('<')) => Some(Tok::Op(BinOp::Shl)),
            ('>', Some('>')) => Some(Tok::Op(BinOp::Shr)),
            ('=', Some('=')) => Some(Tok::Eq),
            ('!', Some('=')) => Some(Tok::Ne),
            ('<', Some('=')) => Some(Tok::Le),
            ('>', Some('=')) => Some(Tok::Ge),
            ('+', Some('=')) => Some(Tok::AugAssign(BinOp::Add)),
            ('-', Some('=')) => Some(Tok::AugAssign(BinOp::Sub)),
            ('*', Some('=')) => Some(Tok::AugAssign(BinOp::Mul)),
            ('/', Some('=')) => Some(Tok::AugAssign(BinOp::Div)),
            ('%', Some('=')) => Some(Tok::AugAssign(BinOp::Mod)),
            ('&', Some('=')) => Some(Tok::AugAssign(BinOp::BitAnd)),
            ('|', Some('=')) => Some(Tok::AugAssign(BinOp::BitOr)),
            ('^', Some('=')) => Some(Tok::AugAssign(BinOp::BitXor)),
            _ => None,
        };
        if let Some(tok) = two {
            self.pos += 2;
            self.push(tok);
            return Ok(());
        }

        let tok = match c {
            '(' | '[' | '{' => {
                if self.depth >= MAX_BRACKET_DEPTH {
                    return Err(self.syntax_error("too many nested parentheses", self.line));
                }
                self.depth += 1;
                match c {
                    '(' => Tok::LParen,
                    '[' => Tok::LBracket,
                    _ => Tok::LBrace,
                }
            }
            ')' | ']' | '}' => {
                if self.depth == 0 {
                    return Err(self.syntax_error(
                        format!("unmatched '{}'", c),
                        self.line,
                    ));
                }
                self.depth -= 1;
                match c {
                    ')' => Tok::RParen,
                    ']' => Tok::RBracket,
                    _ => Tok::RBrace,
                }
            }
            ',' => Tok::Comma,
            ':' => Tok::Colon,
            '.' => Tok::Dot,
            ';' => Tok::Semi,
            '=' => Tok::Assign,
            '+' => Tok::Op(BinOp::Add),
            '-' => Tok::Op(BinOp::Sub),
            '*' => Tok::Op(BinOp::Mul),
            '/' => Tok::Op(BinOp::Div),
            '%' => Tok::Op(BinOp::Mod),
            '&' => Tok::Op(BinOp::BitAnd),
            '|' => Tok::Op(BinOp::BitOr),
            '^' => Tok::Op(BinOp::BitXor),
            '~' => Tok::Tilde,
            '<' => Tok::Lt,
            '>' => Tok::Gt,
            other => {
                return Err(self.syntax_error(
                    format!("invalid character '{}'", other),
                    self.line,
                ))
            }
        };
        self.pos += 1;
        self.push(tok);
        Ok(())
    }
}

pub fn tokenize(source: &str) -> ScriptResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn indentation_produces_layout_tokens() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert_eq!(
            toks,
            vec![
                Tok::If,
                Tok::Name("x".into()),
                Tok::Colon,
                Tok::Newline,
                Tok::Indent,
                Tok::Name("y".into()),
                Tok::Assign,
                Tok::Int(1),
                Tok::Newline,
                Tok::Dedent,
                Tok::Name("z".into()),
                Tok::Assign,
                Tok::Int(2),
                Tok::Newline,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        let toks = kinds("a = [1,\n     2]\n");
        assert!(!toks[..toks.len() - 2].contains(&Tok::Newline));
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indentation() {
        let toks = kinds("def f():\n\n        # note\n    return 1\n");
        assert_eq!(toks.iter().filter(|t| **t == Tok::Indent).count(), 1);
    }

    #[test]
    fn bad_dedent_is_a_syntax_error() {
        let err = tokenize("if x:\n        a = 1\n    b = 2\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unindent does not match any outer indentation level (<string>, line 3)"
        );
    }

    #[test]
    fn operators_and_literals() {
        let toks = kinds("x //= 2 ** 3.5 != 'a\\n'");
        assert_eq!(
            toks[..6],
            [
                Tok::Name("x".into()),
                Tok::AugAssign(BinOp::FloorDiv),
                Tok::Int(2),
                Tok::Op(BinOp::Pow),
                Tok::Float(3.5),
                Tok::Ne,
            ]
        );
        assert_eq!(toks[6], Tok::Str("a\n".into()));
    }

    #[test]
    fn bracket_nesting_is_capped() {
        let ok = format!("x = {}1{}\n", "(".repeat(MAX_BRACKET_DEPTH), ")".repeat(MAX_BRACKET_DEPTH));
        assert!(tokenize(&ok).is_ok());

        let deep = format!("x = [{}1{}]\n", "(".repeat(60_000), ")".repeat(60_000));
        let err = tokenize(&deep).unwrap_err();
        assert_eq!(err.to_string(), "too many nested parentheses (<string>, line 1)");
    }

    #[test]
    fn indentation_depth_is_capped() {
        let mut src = String::new();
        for level in 0..=MAX_INDENT_LEVELS {
            src.push_str(&" ".repeat(level));
            src.push_str("if x:\n");
        }
        src.push_str(&" ".repeat(MAX_INDENT_LEVELS + 1));
        src.push_str("pass\n");
        let err = tokenize(&src).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("too many levels of indentation (<string>, line {})", MAX_INDENT_LEVELS + 2)
        );
    }
}
