//! Hand-written lexer. The tokenizer is deliberately not grammar-driven
//! (see `DESIGN.md`): a handful of lexical rules here are order-sensitive
//! in a way a declarative grammar expresses only indirectly — a comment
//! block is consumed before the end-of-file check runs, a lone `-` not
//! followed by a digit is a lexical error rather than the start of some
//! other token, and a second `.` inside a number literal is a lexical
//! error rather than silently truncating the literal.

use crate::error::{AssembleError, Location};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    LabelDef(String),
    LabelRef(String),
    Ident(String),
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

/// A saved cursor position, used for the single token of lookahead the
/// parser needs to decide where one instruction's operand list ends and
/// the next statement begins.
#[derive(Clone, Copy)]
pub struct Mark(usize, u32);

pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pos, self.line)
    }

    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.0;
        self.line = mark.1;
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    /// Skips whitespace and `#`-to-end-of-line comments. Loops rather than
    /// alternating a single whitespace pass with a single comment pass, so
    /// that two comment lines stacked on top of each other (or a comment
    /// immediately followed by more whitespace) are all consumed before
    /// the next token starts.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, AssembleError> {
        self.skip_trivia();
        let line = self.line;

        let b = match self.peek() {
            None => return Ok(Token { kind: TokenKind::Eof, line }),
            Some(b) => b,
        };

        if b == b'"' {
            return self.read_string(line);
        }
        if b == b'-' || b.is_ascii_digit() {
            return self.read_number(line);
        }
        if b.is_ascii_alphabetic() || b == b'$' {
            return self.read_identifier(line);
        }

        self.bump();
        Err(AssembleError::IllegalCharacter(Location::new(line), b as char))
    }

    fn read_number(&mut self, line: u32) -> Result<Token, AssembleError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.bump();
        }

        let mut has_digit = false;
        let mut dot_seen = false;
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_digit() => {
                    has_digit = true;
                    self.bump();
                }
                Some(b'.') => {
                    if dot_seen {
                        return Err(AssembleError::MalformedNumber(Location::new(line)));
                    }
                    dot_seen = true;
                    self.bump();
                }
                _ => break,
            }
        }

        if !has_digit {
            // Either a lone `-`, or a lone `.` with nothing else: both are
            // lexical errors rather than a zero-length number.
            return Err(AssembleError::MalformedNumber(Location::new(line)));
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("a number literal is composed only of ASCII bytes");
        let value: f64 = text
            .parse()
            .map_err(|_| AssembleError::MalformedNumber(Location::new(line)))?;
        Ok(Token { kind: TokenKind::Number(value), line })
    }

    fn read_identifier(&mut self, line: u32) -> Result<Token, AssembleError> {
        let start = self.pos;
        let is_label_ref = self.peek() == Some(b'$');
        self.bump();
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'$' || b == b'_' {
                self.bump();
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("an identifier is composed only of ASCII bytes")
            .to_owned();

        if self.peek() == Some(b':') {
            self.bump();
            return Ok(Token { kind: TokenKind::LabelDef(text), line });
        }

        if is_label_ref {
            return Ok(Token {
                kind: TokenKind::LabelRef(text[1..].to_owned()),
                line,
            });
        }

        Ok(Token { kind: TokenKind::Ident(text), line })
    }

    fn read_string(&mut self, line: u32) -> Result<Token, AssembleError> {
        self.bump(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(AssembleError::UnterminatedString(Location::new(line))),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    None => return Err(AssembleError::UnterminatedString(Location::new(line))),
                    Some(escaped) => bytes.push(escaped),
                },
                Some(b) => bytes.push(b),
            }
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| AssembleError::InvalidUtf8InString(Location::new(line)))?;
        Ok(Token { kind: TokenKind::Str(text), line })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(source: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = tokenizer.next_token().unwrap();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn abutting_comments_are_both_consumed() {
        assert_eq!(tokens("#one\n#two\nNOP"), vec![TokenKind::Ident("NOP".to_owned()), TokenKind::Eof]);
    }

    #[test]
    fn eof_after_trailing_comment_with_no_newline() {
        assert_eq!(tokens("NOP # trailing, no newline"), vec![TokenKind::Ident("NOP".to_owned()), TokenKind::Eof]);
    }

    #[test]
    fn label_definition_and_reference() {
        assert_eq!(
            tokens("START: $START"),
            vec![
                TokenKind::LabelDef("START".to_owned()),
                TokenKind::LabelRef("START".to_owned()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn negative_and_fractional_numbers() {
        assert_eq!(
            tokens("-3.5 2"),
            vec![TokenKind::Number(-3.5), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn lone_minus_is_an_error() {
        let mut tokenizer = Tokenizer::new("- NOP");
        assert!(matches!(tokenizer.next_token(), Err(AssembleError::MalformedNumber(_))));
    }

    #[test]
    fn second_dot_is_an_error() {
        let mut tokenizer = Tokenizer::new("1.2.3");
        assert!(matches!(tokenizer.next_token(), Err(AssembleError::MalformedNumber(_))));
    }

    #[test]
    fn string_escapes_copy_the_next_byte_verbatim() {
        assert_eq!(tokens(r#""a\"b""#), vec![TokenKind::Str("a\"b".to_owned()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut tokenizer = Tokenizer::new("\"abc");
        assert!(matches!(tokenizer.next_token(), Err(AssembleError::UnterminatedString(_))));
    }

    #[test]
    fn illegal_character_is_reported() {
        let mut tokenizer = Tokenizer::new("@");
        assert!(matches!(tokenizer.next_token(), Err(AssembleError::IllegalCharacter(_, '@'))));
    }

    #[test]
    fn mark_and_reset_replay_the_same_token() {
        let mut tokenizer = Tokenizer::new("ADD SUB");
        let mark = tokenizer.mark();
        let first = tokenizer.next_token().unwrap();
        tokenizer.reset(mark);
        let replayed = tokenizer.next_token().unwrap();
        assert_eq!(first, replayed);
    }
}
