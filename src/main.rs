use clap::{Args, Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use wascope::error::ErrorSink;
use wascope::features::Features;
use wascope::parser::module::Module;
use wascope::wat::lexer::Lexer;
use wascope::wat::token::TokenKind;

#[derive(Parser)]
#[command(name = "wascope")]
#[command(about = "WebAssembly inspection toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FeatureFlags {
    /// Enable every optional feature
    #[arg(long)]
    enable_all: bool,

    /// Enable mutable globals
    #[arg(long)]
    enable_mutable_globals: bool,

    /// Enable sign extension operators
    #[arg(long)]
    enable_sign_extension: bool,

    /// Enable saturating float-to-int conversions
    #[arg(long)]
    enable_saturating_float_to_int: bool,

    /// Enable multi-value blocks and functions
    #[arg(long)]
    enable_multi_value: bool,

    /// Enable reference types
    #[arg(long)]
    enable_reference_types: bool,

    /// Enable bulk memory operations
    #[arg(long)]
    enable_bulk_memory: bool,

    /// Enable SIMD
    #[arg(long)]
    enable_simd: bool,

    /// Enable threads and atomics
    #[arg(long)]
    enable_threads: bool,

    /// Enable tail calls
    #[arg(long)]
    enable_tail_call: bool,

    /// Enable exception handling
    #[arg(long)]
    enable_exceptions: bool,

    /// Enable 64-bit memories
    #[arg(long)]
    enable_memory64: bool,
}

impl FeatureFlags {
    fn features(&self) -> Features {
        if self.enable_all {
            return Features::all();
        }
        let mut features = Features::none();
        let flags = [
            (self.enable_mutable_globals, Features::MUTABLE_GLOBALS),
            (self.enable_sign_extension, Features::SIGN_EXTENSION),
            (
                self.enable_saturating_float_to_int,
                Features::SATURATING_FLOAT_TO_INT,
            ),
            (self.enable_multi_value, Features::MULTI_VALUE),
            (self.enable_reference_types, Features::REFERENCE_TYPES),
            (self.enable_bulk_memory, Features::BULK_MEMORY),
            (self.enable_simd, Features::SIMD),
            (self.enable_threads, Features::THREADS),
            (self.enable_tail_call, Features::TAIL_CALL),
            (self.enable_exceptions, Features::EXCEPTIONS),
            (self.enable_memory64, Features::MEMORY64),
        ];
        for (enabled, feature) in flags {
            if enabled {
                features.enable(feature);
            }
        }
        features
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Dump module structure (defaults to detailed view)
    Dump {
        /// Path to the WebAssembly module
        file: String,

        /// Show only section headers
        #[arg(long)]
        header: bool,

        #[command(flatten)]
        features: FeatureFlags,
    },

    /// Tokenize a text format file and print the tokens
    Lex {
        /// Path to the text format source
        file: String,

        /// Include whitespace and comment tokens
        #[arg(long)]
        trivia: bool,
    },

    /// Validate a module and report diagnostics
    Validate {
        /// Path to the WebAssembly module
        file: String,

        #[command(flatten)]
        features: FeatureFlags,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            file,
            header,
            features,
        } => dump(&file, header, features.features()),
        Commands::Lex { file, trivia } => lex(&file, trivia),
        Commands::Validate { file, features } => validate(&file, features.features()),
    }
}

fn read_file(file: &str) -> Result<Vec<u8>, ExitCode> {
    fs::read(file).map_err(|e| {
        eprintln!("error reading {file}: {e}");
        ExitCode::FAILURE
    })
}

fn print_diagnostics(sink: &ErrorSink) {
    for diagnostic in sink.to_vec() {
        eprintln!("{diagnostic}");
    }
}

fn dump(file: &str, header: bool, features: Features) -> ExitCode {
    let bytes = match read_file(file) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };
    let sink = ErrorSink::new();
    let module = Module::parse(&bytes, features, &sink);

    if header {
        print!("{}", module.to_header_string());
    } else {
        print!("{}", module.to_details_string());
    }

    print_diagnostics(&sink);
    if sink.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn lex(file: &str, trivia: bool) -> ExitCode {
    let bytes = match read_file(file) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };
    let sink = ErrorSink::new();
    for token in Lexer::tokenize(&bytes) {
        if token.kind.is_trivia() && !trivia {
            continue;
        }
        let invalid_kind = match token.kind {
            TokenKind::InvalidChar => Some(wascope::ErrorKind::InvalidChar),
            TokenKind::InvalidText => Some(wascope::ErrorKind::InvalidText),
            TokenKind::InvalidBlockComment => Some(wascope::ErrorKind::InvalidBlockComment),
            TokenKind::InvalidLineComment => Some(wascope::ErrorKind::InvalidLineComment),
            _ => None,
        };
        if let Some(kind) = invalid_kind {
            sink.report(wascope::Error::new(
                kind,
                token.location,
                format!("{:?}", String::from_utf8_lossy(token.text(&bytes))),
            ));
        }
        println!(
            "{:>6}..{:<6} {:24} {}",
            token.location.start,
            token.location.end,
            format!("{:?}", token.kind),
            String::from_utf8_lossy(token.text(&bytes)).escape_debug()
        );
    }
    print_diagnostics(&sink);
    if sink.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate(file: &str, features: Features) -> ExitCode {
    let bytes = match read_file(file) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };
    let sink = ErrorSink::new();
    let module = Module::parse(&bytes, features, &sink);
    wascope::validate::validate(&module, features, &sink);

    print_diagnostics(&sink);
    if sink.is_empty() {
        println!("{file}: ok");
        ExitCode::SUCCESS
    } else {
        eprintln!("{file}: {} diagnostics", sink.len());
        ExitCode::FAILURE
    }
}
