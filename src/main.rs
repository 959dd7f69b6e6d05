use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use pcc::error::{InputNotFoundSnafu, IoSnafu, NotADirectorySnafu};
use pcc::{
    analyze, ast, generate, read_token_stream, runtime, tokenize, write_token_stream,
    CompileResult, Token,
};
use snafu::{ensure, OptionExt, ResultExt};

#[derive(Parser)]
#[command(name = "pcc", version, about = "Compile a Pascal subset to CASL II")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a source file into a token stream
    Lexer { input: PathBuf, output: PathBuf },
    /// Compile a token stream into CASL II
    Compiler {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        options: Options,
    },
    /// Scan and compile, writing <stem>.ts and <stem>.cas into OUTDIR
    All {
        input: PathBuf,
        outdir: PathBuf,
        #[command(flatten)]
        options: Options,
    },
}

#[derive(Args)]
struct Options {
    /// Runtime library to append instead of the bundled one
    #[arg(long, value_name = "LIB")]
    runtime: Option<PathBuf>,
    /// Print the syntax tree before generating code
    #[arg(long)]
    dump_ast: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> CompileResult<()> {
    match command {
        Command::Lexer { input, output } => {
            let tokens = tokenize(&read_input(&input)?)?;
            write_output(&output, &write_token_stream(&tokens))
        }
        Command::Compiler {
            input,
            output,
            options,
        } => {
            let tokens = read_token_stream(&read_input(&input)?)?;
            let asm = compile(tokens, &options)?;
            write_output(&output, &asm)
        }
        Command::All {
            input,
            outdir,
            options,
        } => {
            ensure!(outdir.is_dir(), NotADirectorySnafu { path: &outdir });
            let stem = input
                .file_stem()
                .context(InputNotFoundSnafu { path: &input })?
                .to_string_lossy()
                .into_owned();

            let tokens = tokenize(&read_input(&input)?)?;
            write_output(
                &outdir.join(format!("{stem}.ts")),
                &write_token_stream(&tokens),
            )?;
            let asm = compile(tokens, &options)?;
            write_output(&outdir.join(format!("{stem}.cas")), &asm)
        }
    }
}

fn compile(tokens: Vec<Token>, options: &Options) -> CompileResult<String> {
    let library = match &options.runtime {
        Some(path) => {
            let library = read_input(path)?;
            let missing = runtime::missing_routines(&library);
            if !missing.is_empty() {
                eprintln!(
                    "warning: {} does not define {}",
                    path.display(),
                    missing.join(", ")
                );
            }
            library
        }
        None => runtime::LIBRARY.to_string(),
    };

    let program = analyze(tokens)?;
    if options.dump_ast {
        print!("{}", ast::dump(&program));
    }

    let mut asm = generate(&program)?;
    runtime::append(&mut asm, &library);
    Ok(asm)
}

fn read_input(path: &Path) -> CompileResult<String> {
    ensure!(path.is_file(), InputNotFoundSnafu { path });
    fs::read_to_string(path).context(IoSnafu { path })
}

// Only called once the whole artifact is in memory, so a failed pass never
// leaves a partial file behind.
fn write_output(path: &Path, text: &str) -> CompileResult<()> {
    let file = File::create(path).context(IoSnafu { path })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .context(IoSnafu { path })?;
    writer.flush().context(IoSnafu { path })
}
