use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use similar::TextDiff;
use tracing_subscriber::EnvFilter;
use typeshell::{compile_with_options, dump_ast, AstFormat, CompileOptions, Config, Error};

#[derive(Parser)]
#[command(name = "typeshell")]
#[command(about = "Compile typed scripts to bash")]
#[command(version)]
struct Cli {
    /// Log more (repeat for trace output)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: typeshell.toml in the working directory)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file to a bash script
    Compile {
        /// Source file
        file: PathBuf,

        /// Output file (default: the source path with a .sh extension)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Print the script instead of writing a file
        #[arg(long = "stdout", conflicts_with = "output")]
        stdout: bool,

        /// Print the parsed AST instead of compiling
        #[arg(long = "emit-ast", value_enum)]
        emit_ast: Option<AstOutput>,

        /// First line of the generated script
        #[arg(long = "shebang")]
        shebang: Option<String>,

        /// Reject native shell lines outside of bash { } blocks
        #[arg(long = "strict")]
        strict: bool,
    },

    /// Format a source file
    Format {
        /// Source file
        file: PathBuf,

        /// Exit with status 1 and print a diff if the file is not formatted
        #[arg(long = "check", conflicts_with = "in_place")]
        check: bool,

        /// Write the formatted source back to the file
        #[arg(long = "in-place")]
        in_place: bool,
    },

    /// Compile a source file and run it with bash
    Run {
        /// Source file
        file: PathBuf,

        /// Arguments passed to the script
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AstOutput {
    Json,
    Yaml,
}

impl From<AstOutput> for AstFormat {
    fn from(output: AstOutput) -> Self {
        match output {
            AstOutput::Json => AstFormat::Json,
            AstOutput::Yaml => AstFormat::Yaml,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Config::discover(cli.config.as_deref(), Path::new(".")).and_then(|config| run(cli.command, config));
    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(exit_code(&e));
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// 2 for errors in the source, 1 for everything else.
fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Parse(_) | Error::Compile(_) => 2,
        Error::Io(_) | Error::Config(_) | Error::Serialize(_) => 1,
    }
}

fn run(command: Command, config: Config) -> Result<i32, Error> {
    match command {
        Command::Compile { file, output, stdout, emit_ast, shebang, strict } => {
            let source = read_source(&file)?;
            let program = typeshell::Parser::new().strict(strict || config.parse.strict).parse(&source)?;
            if let Some(format) = emit_ast {
                println!("{}", dump_ast(&program, format.into())?.trim_end());
                return Ok(0);
            }

            let mut options: CompileOptions = config.compile;
            if let Some(shebang) = shebang {
                options.shebang = shebang;
            }
            let script = compile_with_options(&program, &options)?;
            if stdout {
                print!("{}", script);
                return Ok(0);
            }

            let output = output.unwrap_or_else(|| file.with_extension("sh"));
            if output == file {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("output would overwrite the source file {}", file.display()),
                )));
            }
            write_script(&output, &script)?;
            tracing::info!(path = %output.display(), bytes = script.len(), "wrote script");
            println!("✅ Compiled {} -> {}", file.display(), output.display());
            Ok(0)
        }
        Command::Format { file, check, in_place } => {
            let source = read_source(&file)?;
            let formatted = typeshell::format(&source)?;
            if check {
                if formatted == source {
                    return Ok(0);
                }
                let name = file.display().to_string();
                let diff = TextDiff::from_lines(&source, &formatted);
                print!("{}", diff.unified_diff().header(&name, &format!("{} (formatted)", name)));
                return Ok(1);
            }
            if in_place {
                if formatted != source {
                    std::fs::write(&file, &formatted)?;
                    tracing::info!(path = %file.display(), "formatted");
                }
                return Ok(0);
            }
            print!("{}", formatted);
            Ok(0)
        }
        Command::Run { file, args } => {
            let source = read_source(&file)?;
            let program = typeshell::Parser::new().strict(config.parse.strict).parse(&source)?;
            let script = compile_with_options(&program, &config.compile)?;

            let mut temp = tempfile::Builder::new().prefix("typeshell-").suffix(".sh").tempfile()?;
            temp.write_all(script.as_bytes())?;
            temp.flush()?;
            tracing::debug!(path = %temp.path().display(), "running compiled script");

            let status = process::Command::new("bash").arg(temp.path()).args(&args).status()?;
            Ok(status.code().unwrap_or(1))
        }
    }
}

fn read_source(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("Cannot read {}: {}", path.display(), e)))
    })
}

/// Write the script and mark it executable.
fn write_script(path: &Path, script: &str) -> Result<(), Error> {
    std::fs::write(path, script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = std::fs::metadata(path)?.permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions)?;
    }
    Ok(())
}
