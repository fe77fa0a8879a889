//! The `glimpse models` command for inspecting model artifacts.
//!
//! Glimpse does not download anything: the backbone, decoder and tokenizer
//! are exported from a training run and dropped into the model directory.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use glimpse_core::Config;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List the artifacts the server loads at startup
    List {
        /// Also print BLAKE3 checksums of installed files
        #[arg(long)]
        checksums: bool,
    },

    /// Show model directory path
    Path,
}

/// One file the captioner needs.
pub struct Artifact {
    pub role: &'static str,
    pub path: PathBuf,
}

impl Artifact {
    /// File size in bytes, or `None` if the file is missing.
    pub fn size(&self) -> Option<u64> {
        std::fs::metadata(&self.path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }
}

/// The backbone, decoder and tokenizer named in the config.
pub fn artifacts(config: &Config) -> Vec<Artifact> {
    vec![
        Artifact {
            role: "backbone",
            path: config.backbone_path(),
        },
        Artifact {
            role: "decoder",
            path: config.decoder_path(),
        },
        Artifact {
            role: "tokenizer",
            path: config.tokenizer_path(),
        },
    ]
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::List { checksums } => {
            println!("Model directory: {}\n", config.model_dir().display());

            let mut missing = 0;
            for artifact in artifacts(&config) {
                let name = artifact
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match artifact.size() {
                    Some(bytes) => {
                        println!(
                            "  {:10} {:30} ready ({:.1} MB)",
                            artifact.role,
                            name,
                            bytes as f64 / (1024.0 * 1024.0)
                        );
                        if checksums {
                            println!("  {:10} blake3 {}", "", file_checksum(&artifact.path)?);
                        }
                    }
                    None => {
                        missing += 1;
                        println!("  {:10} {:30} not installed", artifact.role, name);
                    }
                }
            }

            if missing > 0 {
                println!(
                    "\n{missing} artifact(s) missing. Copy them into the model directory \
                     or point general.model_dir at an existing export."
                );
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Streaming BLAKE3 checksum of a file, hex-encoded.
fn file_checksum(path: &Path) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Cannot open {}: {e}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifacts_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().to_path_buf();
        std::fs::write(dir.path().join(&config.model.tokenizer), b"{}").unwrap();

        let found = artifacts(&config);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].role, "backbone");
        assert_eq!(found[0].size(), None);
        assert_eq!(found[2].size(), Some(2));
    }

    #[test]
    fn test_file_checksum_matches_blake3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.onnx");
        std::fs::write(&path, b"hello glimpse").unwrap();

        let expected = blake3::hash(b"hello glimpse").to_hex().to_string();
        assert_eq!(file_checksum(&path).unwrap(), expected);
    }

    #[test]
    fn test_file_checksum_missing_file() {
        assert!(file_checksum(Path::new("/nonexistent/decoder.onnx")).is_err());
    }
}
