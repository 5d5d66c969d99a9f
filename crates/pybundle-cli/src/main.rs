//! Pybundle command-line interface
//!
//! Bundles a Python script, module folder, and optionally a venv into a
//! single native binary, or generates an equivalent buildable Java
//! project.

use clap::{Parser, Subcommand};
use pybundle_core::{
    build_native, create_java_bindings, create_polyglot_app, BuildRequest, GraalPyHome,
    TargetKind, Versions,
};
use std::io::Write;
use std::path::PathBuf;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Parser)]
#[command(name = "pybundle")]
#[command(about = "Bundle Python applications into native executables", long_about = None)]
#[command(version)]
struct Cli {
    /// Print actions as they are performed
    #[arg(long, global = true)]
    verbose: bool,

    /// Keep temporary build files for debugging
    #[arg(long, global = true)]
    keep_temp: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a standalone binary from the Python code directly
    Native {
        /// Python file or module folder to run
        #[arg(short, long)]
        module: PathBuf,
        /// Python venv to bundle
        #[arg(long)]
        venv: Option<PathBuf>,
        /// Output filename for the binary
        #[arg(short, long)]
        output: PathBuf,
        /// Optimize the binary for size, not speed
        #[arg(long = "size-opt")]
        size_opt: bool,
        /// Extra arguments to pass to the native-image build command
        #[arg(short = 'N', value_name = "<arg>")]
        ni_args: Vec<String>,
    },

    /// Create a buildable Java project from the Python code
    JavaBindings {
        /// Python file or module folder to run
        #[arg(short, long)]
        module: PathBuf,
        /// Python venv to bundle
        #[arg(long)]
        venv: Option<PathBuf>,
        /// The directory to write the Java project to
        #[arg(short, long)]
        output_directory: PathBuf,
    },

    /// Create a buildable polyglot Java/Python project skeleton
    PolyglotApp {
        /// The directory to write the Java project to
        #[arg(short, long)]
        output_directory: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(message) => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
            let _ = writeln!(stdout, "{}", message);
            let _ = stdout.reset();
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let request = match cli.command {
        Commands::Native {
            module,
            venv,
            output,
            size_opt,
            ni_args,
        } => BuildRequest::native(module, venv, output, size_opt, ni_args),
        Commands::JavaBindings {
            module,
            venv,
            output_directory,
        } => BuildRequest::java_bindings(module, venv, output_directory),
        Commands::PolyglotApp { output_directory } => BuildRequest::polyglot_app(output_directory),
    }
    .verbose(cli.verbose)
    .keep_temp(cli.keep_temp);

    let versions = Versions::from_env();
    let home = GraalPyHome::from_env()?;

    match request.kind {
        TargetKind::NativeExecutable => {
            let binary = build_native(&request, &home, &versions)?;
            Ok(format!("Created native executable {}", binary.display()))
        }
        TargetKind::JavaBindings => {
            create_java_bindings(&request, &home, &versions)?;
            Ok(format!(
                "Created Java bindings project in {}",
                request.output.display()
            ))
        }
        TargetKind::PolyglotApp => {
            create_polyglot_app(&request, &home, &versions)?;
            Ok(format!(
                "Created polyglot application project in {}",
                request.output.display()
            ))
        }
    }
}
