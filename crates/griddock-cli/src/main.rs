mod error;
mod logging;

use clap::{ArgAction, Args, Parser, Subcommand};
use error::Result;
use griddock::core::models::ligand::Ligand;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "griddock CLI - inspection tooling for the griddock ligand kinematics and scoring core.",
    help_template = HELP_TEMPLATE,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Mirror logs into a file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a ligand and report its frame tree and interaction topology.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Ligand in PDBQT format.
    #[arg(short, long)]
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    match cli.command {
        Commands::Inspect(args) => inspect(&args.input),
    }
}

fn inspect(input: &std::path::Path) -> Result<()> {
    let ligand = Ligand::from_path(input)?;

    println!("ligand: {}", input.display());
    println!("  frames:              {}", ligand.num_frames);
    println!("  heavy atoms:         {}", ligand.num_heavy_atoms);
    println!(
        "  torsions:            {} ({} active)",
        ligand.num_torsions, ligand.num_active_torsions
    );
    println!("  interacting pairs:   {}", ligand.pairs.len());
    println!(
        "  coarse atom types:   {}",
        ligand
            .xs_types()
            .iter()
            .map(|t| format!("{t:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  flexibility penalty: {:.4}",
        ligand.flexibility_penalty_factor
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn atom_line(serial: usize, ad: &str, x: f64, y: f64, z: f64) -> String {
        format!(
            "ATOM  {:>5} {:<4} LIG A   1    {:8.3}{:8.3}{:8.3}  0.00  0.00    +0.000 {:<2}",
            serial, ad, x, y, z, ad
        )
    }

    #[test]
    fn inspect_succeeds_on_a_valid_ligand() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "ROOT\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0)
        )
        .unwrap();
        assert!(inspect(file.path()).is_ok());
    }

    #[test]
    fn inspect_surfaces_parse_failures() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "ROOT\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "Xx", 0.0, 0.0, 0.0)
        )
        .unwrap();
        assert!(inspect(file.path()).is_err());
    }

    #[test]
    fn cli_parses_the_inspect_subcommand() {
        let cli = Cli::try_parse_from(["griddock", "inspect", "-i", "ligand.pdbqt", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Inspect(args) => assert_eq!(args.input, PathBuf::from("ligand.pdbqt")),
        }
    }
}
