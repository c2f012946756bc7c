//! Model Training - Entry Point
//!
//! Generates synthetic readings (or reads them from `--data <file>`), trains
//! every candidate model and writes the selected one as the artifact the
//! prediction service loads.
//!
//! Usage: `train-model [config] [--data <file>]`

use anyhow::{bail, Context, Result};
use model_training::{prepare_dataset, LoggingConfig, Trainer, TrainingConfig, TrainingSet};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level: Level = config
        .level
        .parse()
        .with_context(|| format!("invalid log level '{}'", config.level))?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("failed to set tracing subscriber")
}

/// Command line: optional config name and `--data <file>`
struct Args {
    config_file: Option<String>,
    data: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        config_file: None,
        data: None,
    };
    while let Some(arg) = args.next() {
        if arg == "--data" {
            let Some(path) = args.next() else {
                bail!("--data needs a file path");
            };
            parsed.data = Some(PathBuf::from(path));
        } else if arg.starts_with("--") {
            bail!("unknown option '{arg}'");
        } else if parsed.config_file.is_none() {
            parsed.config_file = Some(arg);
        } else {
            bail!("unexpected argument '{arg}'");
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = TrainingConfig::load(args.config_file.as_deref().or(Some("entrenamiento")))
        .context("failed to load training settings")?;
    init_logging(&config.logging)?;

    info!("=== Predictive Maintenance Training v{} ===", env!("CARGO_PKG_VERSION"));

    let data =
        prepare_dataset(&config, args.data.as_deref()).context("failed to prepare data set")?;

    let set = TrainingSet::from_readings(&data, config.features)?;
    let outcome = Trainer::new(config.trainer.clone())?.train(&set)?;

    for candidate in &outcome.candidates {
        let m = &candidate.metrics;
        let c = &candidate.confusion;
        info!(
            "{}: AUC={:.4} accuracy={:.4} cv={:.4}±{:.4} precision={:.3} recall={:.3} f1={:.3}",
            candidate.model_name,
            m.auc,
            m.accuracy,
            m.cv_mean,
            m.cv_std,
            c.precision(),
            c.recall(),
            c.f1()
        );
        info!(
            "  confusion: TN={} FP={} FN={} TP={}",
            c.true_negative, c.false_positive, c.false_negative, c.true_positive
        );
    }

    let artifact = outcome.into_artifact()?;
    artifact
        .save(&config.artifact_path)
        .with_context(|| format!("failed to save {}", config.artifact_path.display()))?;
    info!(
        "Saved {} to {}",
        artifact.model_name,
        config.artifact_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_config_and_data() {
        let parsed = args(&["local", "--data", "data/planta.json"]).unwrap();
        assert_eq!(parsed.config_file.as_deref(), Some("local"));
        assert_eq!(parsed.data, Some(PathBuf::from("data/planta.json")));

        let parsed = args(&[]).unwrap();
        assert!(parsed.config_file.is_none());
        assert!(parsed.data.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_args() {
        assert!(args(&["--data"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["a", "b"]).is_err());
    }
}
