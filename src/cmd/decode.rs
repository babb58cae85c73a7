//! The `decode` subcommand.

use clap::Args;

use crate::{data_url::decode_data_url, io::write_output, prelude::*};

/// Decode command line arguments.
#[derive(Debug, Args)]
pub struct DecodeOpts {
    /// The `data:` URL to decode.
    #[clap(value_name = "URL")]
    pub url: String,

    /// The output path to write the decoded JSON to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `decode` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_decode(opts: &DecodeOpts) -> Result<()> {
    let payload = decode_data_url(&opts.url).context("failed to parse data URL")?;
    let json =
        serde_json::to_string_pretty(&payload).context("failed to serialize payload")?;
    write_output(opts.output_path.as_deref(), &json).await
}
