use clap::{Parser, Subcommand};
#[cfg(not(test))]
use xtask::*;

#[derive(Parser)]
#[command(author, version, about = "Development tasks for omnifft")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Build,
    Test,
    Clippy,
    Fmt,
    /// fmt, then clippy
    Analyze,
    /// `cargo test` once per feature set
    Matrix,
    /// Run every demo program
    Demos,
}

#[cfg(not(test))]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = detect_config();

    match cli.command {
        Commands::Build => run_all([build_command(&cfg)]),
        Commands::Test => run_all([test_command(&cfg)]),
        Commands::Clippy => run_all([clippy_command()]),
        Commands::Fmt => run_all([fmt_command()]),
        Commands::Analyze => run_all([fmt_command(), clippy_command()]),
        Commands::Matrix => run_all(matrix_commands()),
        Commands::Demos => run_all(
            DEMOS
                .iter()
                .map(|(name, features)| demo_command(name, features)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matrix_command() {
        let cli = Cli::parse_from(["xtask", "matrix"]);
        match cli.command {
            Commands::Matrix => {}
            _ => panic!("parsed wrong command"),
        }
    }
}
