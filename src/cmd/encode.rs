//! The `encode` subcommand.

use clap::Args;

use crate::{data_url::data_url, io::write_output, prelude::*};

/// Encode command line arguments.
#[derive(Debug, Args)]
pub struct EncodeOpts {
    /// The file to encode.
    #[clap(value_name = "PATH")]
    pub input_path: PathBuf,

    /// Override the MIME type, which is normally guessed from the extension.
    #[clap(long)]
    pub mime_type: Option<String>,
}

/// Guess a MIME type from a file name.
fn guess_mime_type(path: &Path) -> String {
    // Older MIME tables disagree about Markdown, so pin it down.
    let ext = path.extension().and_then(|ext| ext.to_str());
    if matches!(ext, Some("md" | "markdown")) {
        return "text/markdown".to_owned();
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_owned()
}

/// The `encode` subcommand.
#[instrument(level = "debug", skip_all, fields(path = %opts.input_path.display()))]
pub async fn cmd_encode(opts: &EncodeOpts) -> Result<()> {
    let data = tokio::fs::read(&opts.input_path).await.with_context(|| {
        format!("Failed to read file at path: {:?}", opts.input_path)
    })?;
    let mime_type = match &opts.mime_type {
        Some(mime_type) => mime_type.clone(),
        None => guess_mime_type(&opts.input_path),
    };
    debug!(%mime_type, bytes = data.len(), "Encoding file");
    write_output(None, &data_url(&mime_type, &data)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_mime_types_from_extensions() {
        assert_eq!(guess_mime_type(Path::new("input.md")), "text/markdown");
        assert_eq!(guess_mime_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            guess_mime_type(Path::new("no_extension")),
            "application/octet-stream"
        );
    }
}
