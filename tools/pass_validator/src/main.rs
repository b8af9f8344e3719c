use clap::Parser;
use pass_validator_core::validator::checklist::{checklist_v1, evaluate_checklist, CheckOutcome};
use pass_validator_core::{PassValidator, TrustAnchorConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Validates a PassKit archive and prints a JSON report.
///
/// Exits 0 when every blocker check passes, 1 otherwise.
#[derive(Parser, Debug)]
#[command(name = "pass_validator", version, about)]
struct Cli {
    /// JSON file overriding the default trust anchors.
    #[arg(long, value_name = "FILE")]
    trust_config: Option<PathBuf>,

    /// Path to the .pkpass archive.
    pass: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("validator error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = match &cli.trust_config {
        Some(path) => TrustAnchorConfig::from_json_slice(&std::fs::read(path)?)?,
        None => TrustAnchorConfig::default(),
    };
    let validator = PassValidator::new(config)?;

    let bytes = std::fs::read(&cli.pass)?;
    tracing::info!(path = %cli.pass.display(), bytes = bytes.len(), "validating pass");
    let result = validator.validate(&bytes)?;

    let checklist = checklist_v1()?;
    let report = evaluate_checklist(&result, &checklist);
    let out = serde_json::json!({
        "result": result,
        "checklistVersion": report.checklist_version,
        "overall": report.overall,
        "checks": report.checks,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(report.overall == CheckOutcome::PASS)
}
