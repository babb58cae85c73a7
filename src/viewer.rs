//! Putting it all together: pick an attachment, load it, render it.

use crate::{
    attachment::AttachmentManifest,
    loader::{Fetcher, LoadError, load_attachment_text},
    prelude::*,
    render::MarkdownRenderer,
    surface::{RenderSurface, View},
};

/// Render the Markdown attachment from `manifest` onto `surface`.
///
/// Failures are shown on the surface *and* returned, so that callers can
/// still produce a page while reporting the error. We don't log them here;
/// that's up to the caller.
#[instrument(level = "debug", skip_all, fields(name = %name))]
pub async fn render_attachment(
    manifest: &AttachmentManifest,
    name: &str,
    view: View,
    fetcher: &dyn Fetcher,
    renderer: &MarkdownRenderer,
    surface: &mut dyn RenderSurface,
) -> Result<(), LoadError> {
    surface.show(view);
    let result = async {
        let attachment = manifest.markdown_attachment(name)?;
        debug!(name = %attachment.name, "Loading attachment");
        load_attachment_text(&attachment.url, fetcher).await
    }
    .await;

    match result {
        Ok(markdown) => {
            surface.set_output(renderer.render(&markdown));
            surface.set_source(&markdown);
            Ok(())
        }
        Err(err) => {
            surface.set_error(&err.to_string());
            Err(err)
        }
    }
}
