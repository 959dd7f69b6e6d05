//! A compiler from a small Pascal subset to CASL II assembly.
//!
//! The pipeline runs one pass at a time and stops at the first error:
//! - `tokenizer` scans source text into tokens (`token_stream` stores them).
//! - `parser` builds the `ast` with two-token lookahead at most.
//! - `sema` checks scopes and types.
//! - `codegen` emits CASL II, and `runtime` supplies the library it calls.

type P<T> = Box<T>;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod runtime;
pub mod sema;
pub mod token_stream;
pub mod tokenizer;

pub use codegen::*;
pub use error::{CompileError, CompileResult};
pub use parser::*;
pub use sema::*;
pub use token_stream::*;
pub use tokenizer::*;

/// Parse and check a token stream, returning the tree both passes accepted.
pub fn analyze(tokens: Vec<Token>) -> CompileResult<ast::Program> {
    let program = Parser::new(tokens).parse()?;
    Checker::new().check(&program)?;
    Ok(program)
}

/// Compile a token stream into CASL II, followed by `library`.
pub fn compile_tokens(tokens: Vec<Token>, library: &str) -> CompileResult<String> {
    let program = analyze(tokens)?;
    let mut asm = generate(&program)?;
    runtime::append(&mut asm, library);
    Ok(asm)
}

/// Compile Pascal source text with the bundled runtime library.
pub fn compile_source(source: &str) -> CompileResult<String> {
    compile_tokens(tokenize(source)?, runtime::LIBRARY)
}
