//! The `.ts` token-stream format that sits between the scanner and the
//! compiler.
//!
//! One record per line: `text \t KIND \t id \t line`. The reader also accepts
//! the shorter `text \t KIND \t line` form; the line number is always the last
//! column.

use std::fmt::Write;

use crate::{CompileError, CompileResult, Token, TokenKind};

pub fn write_token_stream(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        let Some(id) = token.kind.id() else {
            continue;
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            token.text,
            token.kind.name(),
            id,
            token.line
        );
    }
    out
}

/// Parse a token stream, appending the `Eof` sentinel the parser relies on
/// for lookahead.
pub fn read_token_stream(text: &str) -> CompileResult<Vec<Token>> {
    let mut tokens = vec![];
    let mut last_line = 1;

    for (index, record) in text.lines().enumerate() {
        let record_no = index + 1;
        if record.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = record.split('\t').collect();
        if columns.len() < 3 {
            return Err(CompileError::InvalidTokenStream { record: record_no });
        }
        let kind = TokenKind::from_name(columns[1])
            .ok_or(CompileError::InvalidTokenStream { record: record_no })?;
        let line = columns[columns.len() - 1]
            .trim()
            .parse::<usize>()
            .map_err(|_| CompileError::InvalidTokenStream { record: record_no })?;

        last_line = line;
        tokens.push(Token::new(columns[0], kind, line));
    }
    tokens.push(Token::eof(last_line));

    Ok(tokens)
}
