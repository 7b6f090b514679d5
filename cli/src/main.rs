use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ArgParser, ValueEnum};
use ucl::{emit, validate, EmitKind, Parser};

// sysexits(3) conventions
const EX_DATAERR: u8 = 65;
const EX_NOINPUT: u8 = 66;
const EX_OSERR: u8 = 71;
const EX_CANTCREAT: u8 = 73;
const EX_IOERR: u8 = 74;

#[derive(ArgParser, Debug)]
#[command(name = "ucl", version, about = "Convert and validate UCL documents")]
struct Args {
    /// Input file; reads stdin when omitted.
    #[arg(long = "in", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted.
    #[arg(long = "out", value_name = "PATH")]
    output: Option<PathBuf>,

    /// JSON schema (draft v4) to validate the document against.
    #[arg(long = "schema", value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Output format.
    #[arg(long = "format", value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Ucl,
    Json,
    #[value(name = "compact_json")]
    CompactJson,
    Yaml,
}

impl From<Format> for EmitKind {
    fn from(format: Format) -> Self {
        match format {
            Format::Ucl => EmitKind::Config,
            Format::Json => EmitKind::Json,
            Format::CompactJson => EmitKind::JsonCompact,
            Format::Yaml => EmitKind::Yaml,
        }
    }
}

struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("ucl: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}

fn run(args: &Args) -> Result<(), Failure> {
    let mut parser = Parser::new();
    match &args.input {
        Some(path) => parser
            .add_file(path)
            .map_err(|err| input_failure(err, path))?,
        None => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .map_err(|err| Failure::new(EX_IOERR, format!("cannot read stdin: {err}")))?;
            parser
                .add_chunk(&data)
                .map_err(|err| Failure::new(EX_DATAERR, err.to_string()))?;
        }
    }
    let document = parser
        .get_object()
        .map_err(|err| Failure::new(EX_DATAERR, err.to_string()))?;

    if let Some(schema_path) = &args.schema {
        let data = fs::read(schema_path).map_err(|err| {
            Failure::new(
                EX_NOINPUT,
                format!("cannot read {}: {err}", schema_path.display()),
            )
        })?;
        let mut schema_parser = Parser::new();
        schema_parser
            .add_chunk(&data)
            .and_then(|_| schema_parser.get_object())
            .map_err(|err| {
                Failure::new(
                    EX_DATAERR,
                    format!("invalid schema {}: {err}", schema_path.display()),
                )
            })
            .and_then(|schema| {
                validate(&schema, &document)
                    .map_err(|err| Failure::new(EX_DATAERR, format!("validation failed: {err}")))
            })?;
    }

    let rendered = emit(&document, args.format.into());
    match &args.output {
        Some(path) => {
            let mut file = fs::File::create(path).map_err(|err| {
                Failure::new(
                    EX_CANTCREAT,
                    format!("cannot create {}: {err}", path.display()),
                )
            })?;
            write_out(&mut file, &rendered)
                .map_err(|err| Failure::new(EX_IOERR, format!("cannot write output: {err}")))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_out(&mut handle, &rendered)
                .map_err(|err| Failure::new(EX_IOERR, format!("cannot write output: {err}")))?;
        }
    }
    Ok(())
}

fn write_out(writer: &mut dyn Write, rendered: &str) -> io::Result<()> {
    writer.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn input_failure(err: ucl::Error, path: &std::path::Path) -> Failure {
    let code = match err.kind {
        ucl::ErrorKind::Io => {
            if path.exists() {
                EX_OSERR
            } else {
                EX_NOINPUT
            }
        }
        _ => EX_DATAERR,
    };
    Failure::new(code, format!("{}: {err}", path.display()))
}
