//! Where rendered attachments end up.
//!
//! [`RenderSurface`] is the small capability the viewer needs from a page: two
//! panes and a way to pick which one is visible. [`HtmlPage`] implements it by
//! filling in a standalone HTML document.

use clap::ValueEnum;
use handlebars::{Handlebars, html_escape};

use crate::prelude::*;

/// The page template. The source pane is escaped by Handlebars; the output
/// pane and stylesheet are trusted HTML.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}}</title>
<style>
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 56rem; padding: 1rem; }
.tabs { display: flex; gap: 0.25rem; border-bottom: 1px solid #ccc; margin-bottom: 1rem; }
.tab { background: none; border: 1px solid transparent; border-bottom: none; padding: 0.5rem 1rem; cursor: pointer; }
.tab.active { border-color: #ccc; background: #fff; font-weight: bold; }
.pane.hidden { display: none; }
#markdown-source { white-space: pre-wrap; font-family: ui-monospace, monospace; }
pre.code { padding: 0.75rem; overflow-x: auto; }
.error { color: #b00020; }
{{{css}}}
</style>
</head>
<body>
<nav class="tabs">
<button class="tab{{#unless show_source}} active{{/unless}}" data-pane="markdown-output">Rendered</button>
<button class="tab{{#if show_source}} active{{/if}}" data-pane="markdown-source">Source</button>
</nav>
<main>
<article id="markdown-output" class="pane{{#if show_source}} hidden{{/if}}">
{{{output}}}
</article>
<pre id="markdown-source" class="pane{{#unless show_source}} hidden{{/unless}}">{{source}}</pre>
</main>
<script>
document.querySelectorAll(".tab").forEach(function (tab) {
  tab.addEventListener("click", function () {
    document.querySelectorAll(".tab").forEach(function (t) {
      t.classList.toggle("active", t === tab);
    });
    document.querySelectorAll(".pane").forEach(function (pane) {
      pane.classList.toggle("hidden", pane.id !== tab.dataset.pane);
    });
  });
});
</script>
</body>
</html>
"#;

/// Which pane is visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum View {
    /// The rendered HTML.
    #[default]
    Rendered,
    /// The raw Markdown text.
    Source,
}

/// Something we can display a rendered attachment on.
pub trait RenderSurface {
    /// Replace the rendered pane with trusted HTML.
    fn set_output(&mut self, html: String);

    /// Replace the source pane with raw text.
    fn set_source(&mut self, text: &str);

    /// Replace the rendered pane with an error message.
    fn set_error(&mut self, message: &str) {
        self.set_output(format!(
            "<p class=\"error\">Error: {}</p>",
            html_escape(message)
        ));
    }

    /// Choose which pane is visible.
    fn show(&mut self, view: View);
}

/// A standalone HTML page with "rendered" and "source" tabs.
#[derive(Debug, Default)]
pub struct HtmlPage {
    title: String,
    css: String,
    output: String,
    source: String,
    view: View,
}

impl HtmlPage {
    /// Create an empty page.
    pub fn new(title: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            css: css.into(),
            ..Self::default()
        }
    }

    /// Produce the final HTML document.
    pub fn into_document(self) -> Result<String> {
        let handlebars = Handlebars::new();
        let bindings = json!({
            "title": self.title,
            "css": self.css,
            "output": self.output,
            "source": self.source,
            "show_source": self.view == View::Source,
        });
        handlebars
            .render_template(PAGE_TEMPLATE, &bindings)
            .context("failed to render HTML page")
    }
}

impl RenderSurface for HtmlPage {
    fn set_output(&mut self, html: String) {
        self.output = html;
    }

    fn set_source(&mut self, text: &str) {
        self.source = text.to_owned();
    }

    fn show(&mut self, view: View) {
        self.view = view;
    }
}
