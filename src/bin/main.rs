use std::{error::Error, fmt, fs, path::PathBuf, process::ExitCode};

use decafc::{
    codegen, parser,
    token::Spanned,
    type_checker,
    util::fmt::{error::excerpt, tree},
};

const USAGE: &str = "usage: decafc <input.decaf> [--show-ast] [--emit-ir]";

struct Options {
    input: PathBuf,
    show_ast: bool,
    emit_ir: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let options = parse_args()?;
    let src = fs::read_to_string(&options.input)?;

    let tokens = &mut Vec::with_capacity(1024);
    let mut program = match parser::parse_program(&src, tokens) {
        Ok(program) => program,
        Err(errors) => return Err(report(&src, &errors).into()),
    };
    if let Err(errors) = type_checker::check(&mut program) {
        return Err(report(&src, &errors).into());
    }

    if options.show_ast {
        print!("{}", tree::print_user_classes_string(&program));
    }

    let code = codegen::absmc::generate(&program)?;
    let code_path = options.input.with_extension("ami");
    fs::write(&code_path, code.to_string())?;
    println!("wrote {}", code_path.display());

    if options.emit_ir {
        let ir = codegen::ir::generate(&program)?;
        let ir_path = options.input.with_extension("ir");
        fs::write(&ir_path, ir.to_string())?;
        println!("wrote {}", ir_path.display());
    }
    Ok(())
}

fn parse_args() -> Result<Options, String> {
    let mut input = None;
    let mut show_ast = false;
    let mut emit_ir = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--show-ast" => show_ast = true,
            "--emit-ir" => emit_ir = true,
            _ if arg.starts_with('-') => return Err(format!("unknown option {arg}\n{USAGE}")),
            _ if input.is_some() => return Err(USAGE.into()),
            _ => input = Some(PathBuf::from(arg)),
        }
    }
    let Some(input) = input else {
        return Err(USAGE.into());
    };
    Ok(Options {
        input,
        show_ast,
        emit_ir,
    })
}

/// Prints each diagnostic with a source excerpt and returns the summary
/// line for the final error.
fn report<E: fmt::Display>(src: &str, errors: &[Spanned<E>]) -> String {
    for error in errors {
        eprintln!("error: {error:#}");
        eprintln!("{}", excerpt(src, error.span));
    }
    let plural = if errors.len() == 1 { "" } else { "s" };
    format!("aborting due to {} previous error{plural}", errors.len())
}
