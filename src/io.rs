//! Output helpers.

use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt as _},
};

use crate::prelude::*;

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `text` to either standard output or a file, followed by a newline
/// if it doesn't already end with one.
pub async fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    let mut wtr = create_writer(path).await?;
    wtr.write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    if !text.ends_with('\n') {
        wtr.write_all(b"\n")
            .await
            .context("Failed to write newline to output")?;
    }
    wtr.flush().await.context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_files_with_trailing_newline() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello").await?;
        assert_eq!(tokio::fs::read_to_string(&path).await?, "hello\n");
        write_output(Some(&path), "bye\n").await?;
        assert_eq!(tokio::fs::read_to_string(&path).await?, "bye\n");
        Ok(())
    }
}
