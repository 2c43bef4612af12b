//! Tokenizer for Leben-80 assembly source.

use crate::asm::error::{AsmError, AsmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Mnemonic, register name, or label. Starts with a letter, `@`, or `?`.
    Identifier,
    /// Numeric literal; the radix is carried by the lexeme (`H`/`Q` suffix,
    /// `0x` prefix, decimal otherwise).
    Number,
    Comma,
    Colon,
    Newline,
    Eof,
}

pub struct Lexer<'src> {
    src: &'src str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Lexer {
            src,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    /// Tokenizes the whole source. A `Newline` token separates lines; the
    /// stream always ends with `Eof`.
    pub fn tokenize(mut self) -> AsmResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> AsmResult<Token> {
        self.skip_ignorable();
        let (line, column) = (self.line, self.column + 1);
        let Some(ch) = self.peek_char() else {
            return Ok(self.make_token(TokenKind::Eof, String::new(), line, column));
        };

        match ch {
            '\n' | '\r' => {
                self.consume_newline();
                Ok(self.make_token(TokenKind::Newline, String::new(), line, column))
            }
            ',' => {
                self.advance(ch);
                Ok(self.make_token(TokenKind::Comma, ",".to_string(), line, column))
            }
            ':' => {
                self.advance(ch);
                Ok(self.make_token(TokenKind::Colon, ":".to_string(), line, column))
            }
            ch if ch.is_ascii_digit() => {
                let lexeme = self.consume_while(|c| c.is_ascii_alphanumeric());
                Ok(self.make_token(TokenKind::Number, lexeme, line, column))
            }
            ch if is_ident_start(ch) => {
                let lexeme = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '@' || c == '?');
                Ok(self.make_token(TokenKind::Identifier, lexeme, line, column))
            }
            other => Err(AsmError::new(
                line,
                column,
                format!("unexpected character '{other}'"),
            )),
        }
    }

    fn make_token(&self, kind: TokenKind, lexeme: String, line: usize, column: usize) -> Token {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }

    fn skip_ignorable(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == ' ' || ch == '\t' {
                self.advance(ch);
            } else if ch == ';' {
                // Comment runs to end of line; the newline itself is a token.
                while let Some(ch) = self.peek_char() {
                    if ch == '\n' || ch == '\r' {
                        break;
                    }
                    self.advance(ch);
                }
            } else {
                break;
            }
        }
    }

    fn consume_newline(&mut self) {
        if self.peek_char() == Some('\r') {
            self.advance('\r');
        }
        if self.peek_char() == Some('\n') {
            self.advance('\n');
        }
        self.line += 1;
        self.column = 0;
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.offset;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.advance(ch);
        }
        self.src[start..self.offset].to_string()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        self.column += 1;
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '@' || ch == '?'
}

/// Parses a numeric lexeme into its value: `0x`/`0X` prefix or `H` suffix for
/// hexadecimal, `Q` suffix for octal, decimal otherwise. Returns `None` for
/// malformed digits or values beyond 16 bits.
pub fn parse_number(lexeme: &str) -> Option<u16> {
    let upper = lexeme.to_ascii_uppercase();
    let (digits, radix) = if let Some(rest) = upper.strip_prefix("0X") {
        (rest, 16)
    } else if let Some(rest) = upper.strip_suffix('H') {
        (rest, 16)
    } else if let Some(rest) = upper.strip_suffix('Q') {
        (rest, 8)
    } else {
        (upper.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    let value = u32::from_str_radix(digits, radix).ok()?;
    u16::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .expect("tokenizes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_instruction_line() {
        let tokens = Lexer::new("START: MVI A, 0FFH ; load accumulator\n")
            .tokenize()
            .expect("tokenizes");
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, ["START", ":", "MVI", "A", ",", "0FFH", "", ""]);
        assert_eq!(
            kinds("START: MVI A, 0FFH\n"),
            [
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("NOP\n  HLT").tokenize().expect("tokenizes");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        let hlt = tokens.iter().find(|t| t.lexeme == "HLT").expect("HLT token");
        assert_eq!((hlt.line, hlt.column), (2, 3));
    }

    #[test]
    fn comments_do_not_swallow_newlines() {
        assert_eq!(
            kinds("NOP ; comment\nHLT"),
            [
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_stray_punctuation() {
        let err = Lexer::new("MVI A, #5").tokenize().expect_err("stray '#'");
        assert_eq!(err.line, 1);
        assert!(err.message.contains('#'));
    }

    #[test]
    fn number_radices() {
        assert_eq!(parse_number("255"), Some(255));
        assert_eq!(parse_number("0FFH"), Some(0xFF));
        assert_eq!(parse_number("1AH"), Some(0x1A));
        assert_eq!(parse_number("17Q"), Some(0o17));
        assert_eq!(parse_number("0x2400"), Some(0x2400));
        assert_eq!(parse_number("10000H"), None, "17-bit value rejected");
        assert_eq!(parse_number("19Q"), None, "9 is not an octal digit");
    }
}
