//! The `render` subcommand.

use clap::Args;

use crate::{
    attachment::{AttachmentManifest, DEFAULT_ATTACHMENT_NAME},
    io::write_output,
    loader::{FetchOpts, HttpFetcher},
    prelude::*,
    render::{DEFAULT_THEME, MarkdownRenderer},
    surface::{HtmlPage, View},
    ui::Ui,
    viewer::render_attachment,
};

/// Render command line arguments.
#[derive(Debug, Args)]
pub struct RenderOpts {
    /// A `data:` or `http(s)` URL for the Markdown attachment.
    #[clap(value_name = "URL", required_unless_present = "manifest_path")]
    pub url: Option<String>,

    /// A JSON or TOML file listing attachments, instead of a single URL.
    #[clap(long = "manifest", value_name = "PATH", conflicts_with = "url")]
    pub manifest_path: Option<PathBuf>,

    /// The attachment to render. Falls back to the first attachment if no
    /// attachment has this name.
    #[clap(long, default_value = DEFAULT_ATTACHMENT_NAME)]
    pub name: String,

    /// Which tab to show when the page opens.
    #[clap(long, value_enum, default_value_t = View::default())]
    pub view: View,

    /// The syntax highlighting theme for code blocks.
    #[clap(long, env = "MD_ATTACHMENT_THEME", default_value = DEFAULT_THEME)]
    pub theme: String,

    #[clap(flatten)]
    pub fetch_opts: FetchOpts,

    /// The output path to write the HTML page to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `render` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_render(ui: Ui, opts: &RenderOpts) -> Result<()> {
    let manifest = match (&opts.url, &opts.manifest_path) {
        (_, Some(path)) => AttachmentManifest::from_path(path).await?,
        (Some(url), None) => AttachmentManifest::from_url(url.as_str()),
        (None, None) => return Err(anyhow!("expected a URL or --manifest")),
    };

    let renderer = MarkdownRenderer::new(&opts.theme)?;
    let fetcher = HttpFetcher::new(ui, &opts.fetch_opts)?;
    let mut page = HtmlPage::new(opts.name.as_str(), renderer.css()?);

    // Write the page even if loading failed, since it shows the error.
    let result = render_attachment(
        &manifest,
        &opts.name,
        opts.view,
        &fetcher,
        &renderer,
        &mut page,
    )
    .await;
    let document = page.into_document()?;
    write_output(opts.output_path.as_deref(), &document).await?;

    result.context("failed to load attachment")
}
