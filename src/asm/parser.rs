//! Line-oriented statement parser: turns the token stream into labelled
//! statements for the two-pass assembler.

use crate::asm::error::{AsmError, AsmResult};
use crate::asm::lexer::{Lexer, Token, TokenKind, parse_number};

/// A symbol or numeric operand with its source position. Whether a symbol is
/// a register name or a label reference depends on the mnemonic and is
/// decided by the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    Symbol(String),
    Number(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub label: Option<Token>,
    pub body: Option<LineBody>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineBody {
    /// Instruction or directive: mnemonic plus comma-separated operands.
    Statement {
        mnemonic: Token,
        operands: Vec<Operand>,
    },
    /// `NAME EQU value` constant definition.
    Equate { name: Token, value: Operand },
}

/// Parses source text into lines. Empty lines (and comment-only lines) yield
/// no entry.
pub fn parse_source(source: &str) -> AsmResult<Vec<SourceLine>> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut lines = Vec::new();
    let mut cursor = 0usize;
    while cursor < tokens.len() {
        let (line, next) = parse_line(&tokens, cursor)?;
        if line.label.is_some() || line.body.is_some() {
            lines.push(line);
        }
        if next == cursor {
            break; // Eof
        }
        cursor = next;
    }
    Ok(lines)
}

fn parse_line(tokens: &[Token], mut cursor: usize) -> AsmResult<(SourceLine, usize)> {
    let mut line = SourceLine {
        label: None,
        body: None,
    };

    // Optional `NAME:` label.
    if tokens[cursor].kind == TokenKind::Identifier
        && tokens.get(cursor + 1).is_some_and(|t| t.kind == TokenKind::Colon)
    {
        line.label = Some(tokens[cursor].clone());
        cursor += 2;
    }

    match tokens[cursor].kind {
        TokenKind::Newline => return Ok((line, cursor + 1)),
        TokenKind::Eof => return Ok((line, cursor)),
        TokenKind::Identifier => {}
        _ => {
            let token = &tokens[cursor];
            return Err(AsmError::new(
                token.line,
                token.column,
                format!("expected a mnemonic, found '{}'", token.lexeme),
            ));
        }
    }

    // `NAME EQU value` puts the defined name in mnemonic position.
    if tokens
        .get(cursor + 1)
        .is_some_and(|t| t.kind == TokenKind::Identifier && t.lexeme.eq_ignore_ascii_case("EQU"))
    {
        let name = tokens[cursor].clone();
        let (value, next) = parse_operand(tokens, cursor + 2)?;
        let end = expect_line_end(tokens, next)?;
        line.body = Some(LineBody::Equate { name, value });
        return Ok((line, end));
    }

    let mnemonic = tokens[cursor].clone();
    cursor += 1;
    let mut operands = Vec::new();
    if !matches!(tokens[cursor].kind, TokenKind::Newline | TokenKind::Eof) {
        loop {
            let (operand, next) = parse_operand(tokens, cursor)?;
            operands.push(operand);
            cursor = next;
            if tokens[cursor].kind == TokenKind::Comma {
                cursor += 1;
            } else {
                break;
            }
        }
    }
    let end = expect_line_end(tokens, cursor)?;
    line.body = Some(LineBody::Statement { mnemonic, operands });
    Ok((line, end))
}

fn parse_operand(tokens: &[Token], cursor: usize) -> AsmResult<(Operand, usize)> {
    let token = &tokens[cursor];
    let kind = match token.kind {
        TokenKind::Identifier => OperandKind::Symbol(token.lexeme.clone()),
        TokenKind::Number => {
            let value = parse_number(&token.lexeme).ok_or_else(|| {
                AsmError::new(
                    token.line,
                    token.column,
                    format!("invalid numeric literal '{}'", token.lexeme),
                )
            })?;
            OperandKind::Number(value)
        }
        _ => {
            return Err(AsmError::new(
                token.line,
                token.column,
                format!("expected an operand, found '{}'", token.lexeme),
            ));
        }
    };
    Ok((
        Operand {
            kind,
            line: token.line,
            column: token.column,
        },
        cursor + 1,
    ))
}

fn expect_line_end(tokens: &[Token], cursor: usize) -> AsmResult<usize> {
    match tokens[cursor].kind {
        TokenKind::Newline => Ok(cursor + 1),
        TokenKind::Eof => Ok(cursor),
        _ => {
            let token = &tokens[cursor];
            Err(AsmError::new(
                token.line,
                token.column,
                format!("unexpected '{}' at end of statement", token.lexeme),
            ))
        }
    }
}
