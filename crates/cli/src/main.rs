use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};

use catalog_app::utils::isbn;
use catalog_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Author and book catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Offline ISBN utilities; no database or configuration needed.
    #[command(subcommand)]
    Isbn(IsbnCommand),
    /// Apply pending schema migrations to the configured database.
    Migrate,
    /// Run the HTTP service.
    Serve,
}

#[derive(Debug, Subcommand)]
enum IsbnCommand {
    /// Print random ISBNs with valid check characters, one per line.
    Generate(GenerateArgs),
    /// Check each ISBN; exits non-zero if any is invalid.
    Validate {
        #[arg(required = true)]
        isbns: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// How many distinct ISBNs to print.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    count: u32,
    /// Generate ISBN-10 instead of ISBN-13.
    #[arg(long, conflicts_with = "group")]
    isbn10: bool,
    /// Registration group digit for ISBN-13 (0-9).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    group: Option<u8>,
    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Isbn(command) => Ok(run_isbn(command)),
        Command::Migrate => {
            let settings = load_settings()?;
            catalog_app::migrate(&settings)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            let settings = load_settings()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(catalog_app::serve(settings))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    let settings = Settings::load().context("failed to load catalog settings")?;
    catalog_telemetry::init(&settings.telemetry);
    Ok(settings)
}

fn run_isbn(command: IsbnCommand) -> ExitCode {
    match command {
        IsbnCommand::Generate(args) => {
            for value in generate(&args) {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        IsbnCommand::Validate { isbns } => {
            let mut all_valid = true;
            for input in &isbns {
                let valid = isbn::validate(input);
                all_valid &= valid;
                println!("{input}\t{}", if valid { "valid" } else { "invalid" });
            }
            if all_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn generate(args: &GenerateArgs) -> Vec<String> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let count = args.count as usize;

    if args.isbn10 {
        isbn::generate_distinct(&mut rng, count, |rng| Some(isbn::generate_isbn10(rng)))
    } else {
        // the group was range-checked by clap, so generation cannot fail
        isbn::generate_distinct(&mut rng, count, |rng| {
            isbn::generate_isbn13(rng, args.group).ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let args = GenerateArgs {
            count: 3,
            isbn10: false,
            group: Some(5),
            seed: Some(99),
        };
        let first = generate(&args);
        assert_eq!(first, generate(&args));
        assert!(first.iter().all(|value| value.starts_with("978-5-")));
    }
}
