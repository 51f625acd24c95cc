//! Command-line front end.
//!
//! Parses each input, reports diagnostics, and prints the re-serialized
//! tree, a debug dump of it, or the entries of a properties document.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use xmlette::serial::{serialize_with_options, SerializeOptions};
use xmlette::{Document, NodeId, Properties};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmlette -- parse, check, and pretty-print markup documents.
#[derive(Parser, Debug)]
#[command(name = "xmlette", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Files to process (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// Print the full error report on failure and enable debug logging.
    #[arg(long)]
    verbose: bool,

    /// Do not output the result tree.
    #[arg(long)]
    noout: bool,

    // -- Output options ----------------------------------------------------
    /// Indentation string used for each nesting level.
    #[arg(long, value_name = "STR", default_value = "  ")]
    indent: String,

    /// Start the output with an `<?xml ...?>` declaration.
    #[arg(long)]
    declaration: bool,

    /// Treat the input as a properties document and print `key=value` lines.
    #[arg(long)]
    properties: bool,

    /// Save output to the given file instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    output: Option<String>,

    // -- Debug options -----------------------------------------------------
    /// Print a debug representation of the document tree.
    #[arg(long)]
    debug: bool,

    /// Print timing information for reading, parsing and serializing.
    #[arg(long)]
    timing: bool,
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut worst_exit = EXIT_SUCCESS;
    for file in &cli.files {
        worst_exit = worst_exit.max(process_file(&cli, file));
    }
    ExitCode::from(worst_exit)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("xmlette=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "xmlette=warn".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, filename: &str) -> u8 {
    // -- Read input --------------------------------------------------------
    let start_read = Instant::now();

    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_FAILURE;
        }
    };

    if cli.timing {
        let elapsed = start_read.elapsed();
        eprintln!("Reading file {filename} took {elapsed:?}");
    }

    // -- Parse -------------------------------------------------------------
    let start_parse = Instant::now();

    let doc = match Document::parse_bytes(&input) {
        Ok(doc) => doc,
        Err(err) => {
            if cli.verbose {
                eprintln!("{filename}: {}", err.report());
            } else {
                eprintln!("{filename}: {err}");
            }
            return EXIT_FAILURE;
        }
    };

    if cli.timing {
        let elapsed = start_parse.elapsed();
        eprintln!("Parsing took {elapsed:?}");
    }

    // -- Debug tree --------------------------------------------------------
    if cli.debug {
        return write_output(cli, &format_debug_tree(&doc));
    }

    // -- Properties --------------------------------------------------------
    if cli.properties {
        return match Properties::from_document(&doc) {
            Ok(props) => write_output(cli, &format_properties(&props)),
            Err(e) => {
                eprintln!("{filename}: {e}");
                EXIT_FAILURE
            }
        };
    }

    // -- Serialization / output --------------------------------------------
    if cli.noout {
        return EXIT_SUCCESS;
    }

    let start_serial = Instant::now();
    let options = SerializeOptions::default()
        .indent_str(&cli.indent)
        .declaration(cli.declaration);
    let mut text = serialize_with_options(&doc, &options);
    text.push('\n');
    let exit = write_output(cli, &text);

    if cli.timing {
        let elapsed = start_serial.elapsed();
        eprintln!("Serializing took {elapsed:?}");
    }
    exit
}

// ---------------------------------------------------------------------------
// Input reading
// ---------------------------------------------------------------------------

/// Reads raw input from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

// ---------------------------------------------------------------------------
// Debug and properties output
// ---------------------------------------------------------------------------

/// Formats the tree as an indented dump, one line per element, attribute
/// and value.
fn format_debug_tree(doc: &Document) -> String {
    let mut output = String::new();
    format_debug_element(doc, doc.root(), 0, &mut output);
    output
}

fn format_debug_element(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}ELEMENT {}", doc.name(id));
    for attr in doc.attributes(id) {
        let _ = writeln!(out, "{indent}  ATTRIBUTE {}={}", attr.name(), attr.value());
    }
    if !doc.value(id).is_empty() {
        let _ = writeln!(out, "{indent}  VALUE {}", doc.value(id).replace('\n', "\\n"));
    }
    for child in doc.children(id) {
        format_debug_element(doc, child, depth + 1, out);
    }
}

fn format_properties(props: &Properties) -> String {
    let mut output = String::new();
    for (key, value) in props.iter() {
        let _ = writeln!(output, "{key}={value}");
    }
    output
}

// ---------------------------------------------------------------------------
// Output writing
// ---------------------------------------------------------------------------

/// Writes output to stdout or to the file specified by --output.
fn write_output(cli: &Cli, content: &str) -> u8 {
    if let Some(ref output_file) = cli.output {
        if let Err(e) = fs::write(output_file, content) {
            eprintln!("{output_file}: failed to write: {e}");
            return EXIT_FAILURE;
        }
    } else {
        print!("{content}");
        let _ = io::stdout().flush();
    }
    EXIT_SUCCESS
}
