use clap::{Args, Parser, Subcommand};

use lclstream_engine::{BatchPipelineParameters, PipelineConfig, StageConfig};

use crate::error::StageError;

#[derive(Parser)]
#[command(name = "lclstream-stage", about = "Event record processing stage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a processing pipeline over an NDJSON event stream
    Run(RunArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Path to TOML config file. Without it the no-op pipeline runs
    #[arg(long, env = "LCLSTREAM_CONFIG")]
    pub config: Option<String>,

    /// Input NDJSON file ("-" = stdin)
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Output NDJSON file ("-" = stdout)
    #[arg(long, default_value = "-")]
    pub output: String,

    /// Batch events in groups of N, overriding the configured pipeline
    #[arg(long)]
    pub batch_size: Option<i64>,

    /// Maximum input line length in bytes (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_line_length: usize,
}

impl RunArgs {
    /// Effective stage configuration: config file (if any), then CLI overrides.
    pub fn stage_config(&self) -> Result<StageConfig, StageError> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!(config = %path, "loading configuration");
                StageConfig::load(path)?
            }
            None => StageConfig::default(),
        };
        if let Some(batch_size) = self.batch_size {
            config.pipeline = PipelineConfig::Batch(BatchPipelineParameters { batch_size });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(config: Option<String>, batch_size: Option<i64>) -> RunArgs {
        RunArgs {
            config,
            input: "-".into(),
            output: "-".into(),
            batch_size,
            max_line_length: 0,
        }
    }

    #[test]
    fn no_config_means_noop() {
        let config = args(None, None).stage_config().unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn batch_size_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ntype = \"noop\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = args(Some(path.clone()), None).stage_config().unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());

        let config = args(Some(path), Some(16)).stage_config().unwrap();
        assert_eq!(
            config.pipeline,
            PipelineConfig::Batch(BatchPipelineParameters { batch_size: 16 })
        );
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(args(Some("/nonexistent/stage.toml".into()), None)
            .stage_config()
            .is_err());
    }

    #[test]
    fn parses_run_command() {
        let cli = Cli::try_parse_from([
            "lclstream-stage",
            "run",
            "--input",
            "events.ndjson",
            "--batch-size",
            "8",
        ])
        .unwrap();
        let Commands::Run(run) = cli.command;
        assert_eq!(run.input, "events.ndjson");
        assert_eq!(run.output, "-");
        assert_eq!(run.batch_size, Some(8));
    }
}
