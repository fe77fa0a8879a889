//! The `glimpse caption` command: caption a local image without the server.

use std::path::PathBuf;

use clap::Args;
use glimpse_core::{Captioner, Config, ImageDecoder};
use serde::Serialize;

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Image file to caption
    pub image: PathBuf,

    /// Print only the caption text instead of JSON
    #[arg(long)]
    pub plain: bool,
}

#[derive(Debug, Serialize)]
struct CaptionOutput {
    caption: String,
    image_path: String,
    steps: usize,
    stop: String,
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, config: Config) -> anyhow::Result<()> {
    let decoded = ImageDecoder::new(config.limits.clone())
        .decode(&args.image)
        .await?;

    let caption = tokio::task::spawn_blocking(move || {
        let captioner = Captioner::load(&config)?;
        captioner.caption(&decoded.image)
    })
    .await??;

    if args.plain {
        println!("{}", caption.text);
    } else {
        let output = CaptionOutput {
            caption: caption.text,
            image_path: args.image.display().to_string(),
            steps: caption.steps,
            stop: caption.stop.to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
