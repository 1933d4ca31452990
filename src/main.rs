//! Lotus CLI (spec §6 "External interfaces")
//!
//! `lotus [flags] <input.lts>`. A flat `#[derive(Parser)]` struct —
//! unlike the teacher's `seqc`, which exposes `Build`/`Lint`/`Test`
//! subcommands, spec §6 describes a single invocation shape, so there
//! is nothing to subcommand.

use clap::Parser as ClapParser;
use lotus::{CompilerConfig, OutputMode};
use std::path::PathBuf;
use std::process::{Command, ExitCode};

#[derive(ClapParser)]
#[command(name = "lotus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ahead-of-time compiler for the Lotus systems language", long_about = None)]
struct Cli {
    /// Input .lts source file
    input: PathBuf,

    /// Output path (default: a.out, or <input>.s with -S)
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Emit assembly text instead of invoking the assembler
    #[arg(short = 'S')]
    emit_asm: bool,

    /// Verbose logging of phases to stderr
    #[arg(short = 'v')]
    verbose: bool,

    /// Execute the produced binary after a successful build
    #[arg(long = "run")]
    run: bool,

    /// Include search path for `use` imports (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Print the token stream and exit
    #[arg(long = "dump-tokens")]
    dump_tokens: bool,

    /// Print the AST, fully parenthesized, and exit
    #[arg(long = "dump-ast")]
    dump_ast: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("lotus: failed to read '{}': {}", cli.input.display(), e);
            return ExitCode::from(1);
        }
    };

    if cli.dump_tokens {
        return match lotus::Lexer::tokenize(&source) {
            Ok(tokens) => {
                for tok in tokens {
                    println!("{:?} {:?} {}", tok.kind, tok.lexeme, tok.pos);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e.render(&cli.input));
                ExitCode::from(1)
            }
        };
    }

    if cli.dump_ast {
        return match lotus::parse_source(&source) {
            Ok(program) => {
                for func in program.functions() {
                    println!("fn {}", func.name);
                    for stmt in &func.body {
                        if let lotus::ast::Stmt::ExprStatement { expr, .. } = stmt {
                            println!("  {}", expr.to_parenthesized_string());
                        }
                    }
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e.render(&cli.input));
                ExitCode::from(1)
            }
        };
    }

    let mut config = CompilerConfig::new().with_verbose(cli.verbose);
    if cli.emit_asm {
        config = config.with_output_mode(OutputMode::AssemblyOnly);
    }
    for dir in &cli.include {
        config = match config.with_include_path(dir) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("lotus: {}", e);
                return ExitCode::from(2);
            }
        };
    }

    let output_path = cli.output.unwrap_or_else(|| {
        if cli.emit_asm {
            cli.input.with_extension("s")
        } else {
            PathBuf::from("a.out")
        }
    });

    if let Err(e) = lotus::compile_file_with_config(&cli.input, &output_path, &config) {
        eprintln!("{}", e.render(&cli.input));
        return ExitCode::from(1);
    }

    if cli.run {
        match Command::new(&output_path).status() {
            Ok(status) => {
                let code = status.code().unwrap_or(1);
                return ExitCode::from(code as u8);
            }
            Err(e) => {
                eprintln!("lotus: failed to execute '{}': {}", output_path.display(), e);
                return ExitCode::from(1);
            }
        }
    }

    ExitCode::SUCCESS
}
