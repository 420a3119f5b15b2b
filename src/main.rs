//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las fases del proceso de compilación y expone
//! una CLI. El estado del proceso al terminar refleja el veredicto:
//! cero para una traducción válida, distinto de cero si se reportó al
//! menos un error.

use anyhow::Context;
use clap::{self, Arg};
use cplc::{
    error::Diagnostics,
    lex::Lexer,
    parse::{self, Verdict},
    source,
};

use std::{
    fs::File,
    io::{self, BufReader, Write},
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::App::new("CPL compiler")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .required(true)
                .value_name("FILE")
                .help("Instruction listing output ('-' for stdout)"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").unwrap();
    let output = args.value_of("output").unwrap();

    let reader = File::open(input)
        .map(BufReader::new)
        .with_context(|| format!("Failed to open for reading: {}", input))?;

    // Front end: caracteres a tokens
    let (start, chars) = source::consume(reader, input);
    let tokens = match Lexer::new(start.clone(), chars).try_exhaustive() {
        Ok(tokens) => tokens,

        // Con errores léxicos no hay flujo de tokens que traducir
        Err(errors) => {
            eprint!("{}", Diagnostics::from(errors).kind("Lexical error"));
            std::process::exit(1);
        }
    };

    // Traducción de una sola pasada
    let translation = parse::translate(tokens, start);

    if !translation.errors.is_empty() {
        eprint!("{}", Diagnostics::from(translation.errors));
    }

    // El listado se escribe aunque el veredicto sea inválido, siempre
    // que la generación no haya sido abandonada
    if let Some(code) = &translation.code {
        match output {
            "-" => {
                let stdout = io::stdout();
                write!(stdout.lock(), "{}", code).context("Failed to emit to stdout")?;
            }

            path => {
                let mut file = File::create(path)
                    .with_context(|| format!("Failed to open for writing: {}", path))?;

                write!(file, "{}", code)
                    .with_context(|| format!("Failed to emit to file: {}", path))?;
            }
        }
    }

    if let Verdict::Invalid = translation.verdict {
        std::process::exit(1);
    }

    Ok(())
}
