use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod attachment;
mod cmd;
mod data_url;
mod io;
mod loader;
mod prelude;
mod render;
mod surface;
mod ui;
mod viewer;

/// Render a Markdown attachment as an HTML page.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - MD_ATTACHMENT_THEME (optional): Code highlighting theme.
  - MD_ATTACHMENT_TIMEOUT (optional): Fetch timeout, in seconds.
  - MD_ATTACHMENT_USER_AGENT (optional): User-Agent for fetches.
  - RUST_LOG (optional): Log filter, such as "debug".

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Render a Markdown attachment as an HTML page.
    Render(cmd::render::RenderOpts),
    /// Decode a `data:` URL and print it as JSON.
    Decode(cmd::decode::DecodeOpts),
    /// Encode a file as a `data:` URL.
    Encode(cmd::encode::EncodeOpts),
    /// Print schemas for input and output formats.
    Schema(cmd::schema::SchemaOpts),
}

impl Cmd {
    /// Are we using stdout for output?
    fn using_stdout_for_output(&self) -> bool {
        match self {
            Cmd::Render(opts) => opts.output_path.is_none(),
            Cmd::Decode(opts) => opts.output_path.is_none(),
            Cmd::Encode(_) => true,
            Cmd::Schema(opts) => opts.output_path.is_none(),
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);
    tracing_subscriber::registry().with(subscriber).init();

    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    if opts.subcmd.using_stdout_for_output() {
        ui.hide_progress_bars();
    }

    match &opts.subcmd {
        Cmd::Render(render_opts) => cmd::render::cmd_render(ui, render_opts).await,
        Cmd::Decode(decode_opts) => cmd::decode::cmd_decode(decode_opts).await,
        Cmd::Encode(encode_opts) => cmd::encode::cmd_encode(encode_opts).await,
        Cmd::Schema(schema_opts) => cmd::schema::cmd_schema(schema_opts).await,
    }
}
