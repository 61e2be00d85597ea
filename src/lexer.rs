//! A hand-written, character-at-a-time lexer exposing a pull `current()`/
//! `advance()` cursor rather than an eager token vector. `Token`/`TokenKind`
//! follow the shape of the teacher's `crates/syntax/src/lexer.rs`
//! (`Token { kind, span }`, a separate `TokenKind` enum); the indentation
//! state machine, the keyword table, and the string-escape rules are
//! ported from `lexer.cpp`'s `CheckAtIndent`/`ReadWord`/`ReadString`. Not
//! built on `logos` (see the dependency ledger): the dedent-per-call
//! contract needs a residual counter carried across `advance()` calls,
//! which doesn't fit a stateless one-token-per-regex-match lexer.

use std::collections::VecDeque;

use span::Span;

use crate::error::{LexError, LexResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Number(i64),
  String(String),
  Id(String),
  Char(char),
  Class,
  Return,
  If,
  Else,
  Def,
  Print,
  And,
  Or,
  Not,
  None,
  True,
  False,
  Eq,
  NotEq,
  LessOrEq,
  GreaterOrEq,
  Newline,
  Indent,
  Dedent,
  Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
}

impl PartialEq for Token {
  /// Two tokens are equal iff their kinds are equal; spans are excluded so
  /// a hand-built expected token doesn't need to know real source offsets.
  fn eq(&self, other: &Self) -> bool {
    self.kind == other.kind
  }
}

fn is_id_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_id_continue(c: char) -> bool {
  is_id_start(c) || c.is_ascii_digit()
}

fn keyword(text: &str) -> Option<TokenKind> {
  Some(match text {
    "class" => TokenKind::Class,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "def" => TokenKind::Def,
    "print" => TokenKind::Print,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "None" => TokenKind::None,
    "True" => TokenKind::True,
    "False" => TokenKind::False,
    _ => return None,
  })
}

pub struct Lexer<'src> {
  src: &'src str,
  pos: usize,
  indent: usize,
  pending: VecDeque<TokenKind>,
  emitted_any: bool,
  last_kind: TokenKind,
  eof_queued: bool,
  current: Token,
}

impl<'src> Lexer<'src> {
  pub fn new(src: &'src str) -> LexResult<Self> {
    let indent = src.bytes().take_while(|&b| b == b' ').count();
    let mut lexer = Lexer {
      src,
      pos: 0,
      indent,
      pending: VecDeque::new(),
      emitted_any: false,
      last_kind: TokenKind::Eof,
      eof_queued: false,
      current: Token {
        kind: TokenKind::Eof,
        span: Span { start: 0, end: 0 },
      },
    };
    lexer.current = lexer.next_token()?;
    Ok(lexer)
  }

  pub fn current(&self) -> &Token {
    &self.current
  }

  pub fn advance(&mut self) -> LexResult<&Token> {
    self.current = self.next_token()?;
    Ok(&self.current)
  }

  fn peek(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  fn span_from(&self, start: usize) -> Span {
    Span { start, end: self.pos }
  }

  fn zero_span(&self) -> Span {
    Span {
      start: self.pos,
      end: self.pos,
    }
  }

  fn tok(&self, kind: TokenKind, span: Span) -> Token {
    Token { kind, span }
  }

  fn next_token(&mut self) -> LexResult<Token> {
    loop {
      if let Some(kind) = self.pending.pop_front() {
        return Ok(self.tok(kind, self.zero_span()));
      }
      self.skip_spaces_and_line_comment();
      match self.peek() {
        None => return self.drain_eof_sequence(),
        Some('\n') => {
          self.bump();
          self.resolve_line_break()?;
          continue;
        }
        Some(ch) => {
          let start = self.pos;
          let token = self.scan_real_token(ch, start)?;
          self.emitted_any = true;
          self.last_kind = token.kind.clone();
          return Ok(token);
        }
      }
    }
  }

  fn skip_spaces_and_line_comment(&mut self) {
    loop {
      match self.peek() {
        Some(' ') => {
          self.bump();
        }
        Some('#') => self.skip_line_comment(),
        _ => break,
      }
    }
  }

  fn skip_line_comment(&mut self) {
    while let Some(c) = self.peek() {
      if c == '\n' {
        break;
      }
      self.bump();
    }
  }

  /// Looks ahead past any blank or comment-only lines to find the leading
  /// space count of the next real content line, consuming everything it
  /// skips over (but not the content line's own leading spaces... actually
  /// it does consume those too, leaving `pos` at the first non-space
  /// character). Returns `None` if end-of-input is reached first.
  fn measure_and_consume_blank_lines(&mut self) -> Option<usize> {
    loop {
      let mut n = 0usize;
      while self.peek() == Some(' ') {
        self.bump();
        n += 1;
      }
      match self.peek() {
        None => return None,
        Some('\n') => {
          self.bump();
          continue;
        }
        Some('#') => {
          self.skip_line_comment();
          match self.peek() {
            Some('\n') => {
              self.bump();
              continue;
            }
            None => return None,
            _ => unreachable!("skip_line_comment stops only at '\\n' or end of input"),
          }
        }
        Some(_) => return Some(n),
      }
    }
  }

  fn resolve_line_break(&mut self) -> LexResult<()> {
    let next_indent = self.measure_and_consume_blank_lines();
    let suppress_newline = !self.emitted_any || self.last_kind == TokenKind::Newline;
    if !suppress_newline {
      self.pending.push_back(TokenKind::Newline);
      self.last_kind = TokenKind::Newline;
    }
    if let Some(n) = next_indent {
      log::trace!("indent {} -> {}", self.indent, n);
      if n > self.indent {
        if n - self.indent != 2 {
          return Err(LexError::BadIndent { span: self.zero_span() });
        }
        self.indent = n;
        self.pending.push_back(TokenKind::Indent);
        self.last_kind = TokenKind::Indent;
      } else if n < self.indent {
        let step = self.indent - n;
        if step % 2 != 0 {
          return Err(LexError::BadIndent { span: self.zero_span() });
        }
        for _ in 0..step / 2 {
          self.pending.push_back(TokenKind::Dedent);
        }
        self.indent = n;
        self.last_kind = TokenKind::Dedent;
      }
    }
    Ok(())
  }

  /// Reached end-of-input: emits, across however many calls it takes, a
  /// trailing `Newline` (unless one was already just emitted), one
  /// `Dedent` per outstanding indent level, and finally `Eof`, which is
  /// then returned forever after.
  fn drain_eof_sequence(&mut self) -> LexResult<Token> {
    if !self.eof_queued {
      self.eof_queued = true;
      if self.emitted_any && self.last_kind != TokenKind::Newline {
        self.pending.push_back(TokenKind::Newline);
      }
      while self.indent > 0 {
        self.pending.push_back(TokenKind::Dedent);
        self.indent -= 2;
      }
      self.pending.push_back(TokenKind::Eof);
    }
    let kind = self.pending.pop_front().unwrap_or(TokenKind::Eof);
    Ok(self.tok(kind, self.zero_span()))
  }

  fn scan_real_token(&mut self, ch: char, start: usize) -> LexResult<Token> {
    if is_id_start(ch) {
      return Ok(self.scan_ident_or_keyword(start));
    }
    if ch.is_ascii_digit() {
      return self.scan_number(start);
    }
    if ch == '"' || ch == '\'' {
      return self.scan_string(ch, start);
    }
    match ch {
      '+' | '-' | '*' | '/' | '(' | ')' | '.' | ',' | ':' => {
        self.bump();
        Ok(self.tok(TokenKind::Char(ch), self.span_from(start)))
      }
      '=' => {
        self.bump();
        self.scan_two_char(start, '=', TokenKind::Eq, TokenKind::Char('='))
      }
      '>' => {
        self.bump();
        self.scan_two_char(start, '=', TokenKind::GreaterOrEq, TokenKind::Char('>'))
      }
      '<' => {
        self.bump();
        self.scan_two_char(start, '=', TokenKind::LessOrEq, TokenKind::Char('<'))
      }
      '!' => {
        self.bump();
        if self.peek() == Some('=') {
          self.bump();
          Ok(self.tok(TokenKind::NotEq, self.span_from(start)))
        } else {
          Err(LexError::DanglingBang { span: self.span_from(start) })
        }
      }
      other => {
        self.bump();
        Err(LexError::UnexpectedChar {
          span: self.span_from(start),
          ch: other,
        })
      }
    }
  }

  fn scan_two_char(&mut self, start: usize, expect: char, two: TokenKind, one: TokenKind) -> LexResult<Token> {
    if self.peek() == Some(expect) {
      self.bump();
      Ok(self.tok(two, self.span_from(start)))
    } else {
      Ok(self.tok(one, self.span_from(start)))
    }
  }

  fn scan_ident_or_keyword(&mut self, start: usize) -> Token {
    while let Some(c) = self.peek() {
      if is_id_continue(c) {
        self.bump();
      } else {
        break;
      }
    }
    let text = &self.src[start..self.pos];
    let kind = keyword(text).unwrap_or_else(|| TokenKind::Id(text.to_string()));
    self.tok(kind, self.span_from(start))
  }

  fn scan_number(&mut self, start: usize) -> LexResult<Token> {
    while let Some(c) = self.peek() {
      if c.is_ascii_digit() {
        self.bump();
      } else {
        break;
      }
    }
    let text = &self.src[start..self.pos];
    let value: i64 = text
      .parse()
      .map_err(|_| LexError::NumberOverflow { span: self.span_from(start) })?;
    Ok(self.tok(TokenKind::Number(value), self.span_from(start)))
  }

  fn scan_string(&mut self, quote: char, start: usize) -> LexResult<Token> {
    self.bump();
    let mut value = String::new();
    loop {
      match self.peek() {
        None => return Err(LexError::UnterminatedString { span: self.span_from(start) }),
        Some(c) if c == quote => {
          self.bump();
          break;
        }
        Some('\\') => {
          let esc_start = self.pos;
          self.bump();
          match self.peek() {
            Some('"') => {
              value.push('"');
              self.bump();
            }
            Some('\'') => {
              value.push('\'');
              self.bump();
            }
            Some('t') => {
              value.push('\t');
              self.bump();
            }
            Some('n') => {
              value.push('\n');
              self.bump();
            }
            Some(other) => {
              self.bump();
              return Err(LexError::UnknownEscape {
                span: self.span_from(esc_start),
                ch: other,
              });
            }
            None => return Err(LexError::UnterminatedString { span: self.span_from(start) }),
          }
        }
        Some(c) => {
          value.push(c);
          self.bump();
        }
      }
    }
    Ok(self.tok(TokenKind::String(value), self.span_from(start)))
  }
}
