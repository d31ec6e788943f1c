use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use oxyrel::render::{DEFAULT_WIDTH, render_outcome};
use oxyrel::{Outcome, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "oxyrel",
    about = "In-memory relational store with primary and foreign keys"
)]
struct Cli {
    /// Command file to run before reading from stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// File the catalog snapshot is written to on exit
    #[arg(long)]
    backup: Option<PathBuf>,

    /// Field width of rendered tables
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Prints every result of a batch to `out`. Returns true once `exit` was seen.
fn report(
    out: &mut impl Write,
    width: usize,
    results: Vec<oxyrel::Result<Outcome>>,
) -> io::Result<bool> {
    let mut exit = false;
    for result in results {
        match result {
            Ok(Outcome::Exit) => exit = true,
            Ok(outcome) => out.write_all(render_outcome(&outcome, width).as_bytes())?,
            Err(err) => eprintln!("error: {err}"),
        }
    }
    out.flush()?;
    Ok(exit)
}

fn run(cli: Cli) -> io::Result<()> {
    let mut session = Session::new(SessionConfig {
        width: cli.width,
        backup: cli.backup,
    });

    let mut exit = false;
    if let Some(script) = cli.script {
        let result = session.load(script);
        exit = report(&mut io::stdout().lock(), cli.width, vec![result])?;
    }

    // Statements may span lines; an empty line submits them.
    let interactive = io::stdin().is_terminal();
    let mut buffer = String::new();
    let mut lines = io::stdin().lock().lines();
    while !exit {
        if interactive && buffer.is_empty() {
            print!("oxyrel> ");
            io::stdout().flush()?;
        }
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    continue;
                }
            }
            None => exit = true,
        }
        if !buffer.trim().is_empty() {
            let results = session.run(&buffer);
            exit |= report(&mut io::stdout().lock(), cli.width, results)?;
        }
        buffer.clear();
    }

    print!("{}", session.finish());
    io::stdout().flush()
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "terminal i/o failed");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_report_writes_outcomes_and_sees_exit() {
        let mut out = Vec::new();
        let exit = report(
            &mut out,
            DEFAULT_WIDTH,
            vec![Ok(Outcome::Created("t".into())), Ok(Outcome::Exit)],
        )
        .unwrap();

        assert!(exit);
        assert_eq!(String::from_utf8(out).unwrap(), "created table t\n");
    }

    #[test]
    fn test_report_propagates_write_errors() {
        let err = report(
            &mut BrokenPipe,
            DEFAULT_WIDTH,
            vec![Ok(Outcome::Dropped("t".into()))],
        )
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
