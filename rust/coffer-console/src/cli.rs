use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::Config;

#[derive(Debug, Parser)]
#[command(name = "coffer")]
#[command(bin_name = "coffer")]
#[command(about = "Browse and write a bucket with temporary credentials", long_about = None)]
pub struct CofferCli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Object store endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Signing region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Bucket to operate on
    #[arg(short, long, global = true)]
    pub bucket: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the signed-in identity
    Identity,
    /// List objects in the bucket
    List {
        /// Maximum number of objects to show
        #[arg(long)]
        max_keys: Option<usize>,
    },
    /// Write a timestamped test object and list the bucket again
    Upload,
    /// Interactive session
    Shell,
}

impl CofferCli {
    /// Apply flag overrides on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Command::List {
            max_keys: Some(max_keys),
        } = self.command
        {
            config.max_keys = max_keys;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_global_flags_after_command() {
        let cli = CofferCli::try_parse_from([
            "coffer",
            "list",
            "--bucket",
            "photos",
            "--max-keys",
            "5",
            "--endpoint",
            "http://127.0.0.1:9000",
        ])
        .unwrap();

        assert_eq!(cli.command, Command::List { max_keys: Some(5) });
        assert_eq!(cli.log_level, tracing::Level::WARN);

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.bucket, "photos");
        assert_eq!(config.max_keys, 5);
        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn it_parses_log_level() {
        let cli = CofferCli::try_parse_from(["coffer", "--log-level", "debug", "identity"]).unwrap();

        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn it_rejects_unknown_log_level() {
        assert!(CofferCli::try_parse_from(["coffer", "--log-level", "loud", "identity"]).is_err());
    }

    #[test]
    fn it_requires_a_command() {
        assert!(CofferCli::try_parse_from(["coffer"]).is_err());
    }
}
