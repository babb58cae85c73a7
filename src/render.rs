//! Markdown to HTML, with syntax highlighting for fenced code blocks.
//!
//! Highlighted code uses CSS classes rather than inline styles, so the page
//! only needs one stylesheet per theme. See [`MarkdownRenderer::css`].

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use syntect::{
    highlighting::{Theme, ThemeSet},
    html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use handlebars::html_escape;

use crate::prelude::*;

/// The theme we use unless told otherwise.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Renders Markdown as HTML.
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl MarkdownRenderer {
    /// Create a renderer using one of `syntect`'s built-in themes.
    pub fn new(theme_name: &str) -> Result<Self> {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(theme_name).ok_or_else(|| {
            let known = theme_set.themes.keys().cloned().collect::<Vec<_>>();
            anyhow!(
                "unknown theme {theme_name:?}, expected one of: {}",
                known.join(", ")
            )
        })?;
        Ok(Self { syntax_set, theme })
    }

    /// CSS for our code highlighting classes.
    pub fn css(&self) -> Result<String> {
        css_for_theme_with_class_style(&self.theme, ClassStyle::Spaced)
            .context("failed to generate CSS for theme")
    }

    /// Render `markdown` as an HTML fragment.
    #[instrument(level = "debug", skip_all, fields(len = markdown.len()))]
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(markdown, options);

        // Swap each code block's events for a single chunk of highlighted HTML.
        let mut events = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;
        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_owned()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, buffer)) = code_block.take() {
                        let highlighted = self.highlight(lang.as_deref(), &buffer);
                        events.push(Event::Html(CowStr::from(highlighted)));
                    }
                }
                Event::Text(text) => match &mut code_block {
                    Some((_, buffer)) => buffer.push_str(&text),
                    None => events.push(Event::Text(text)),
                },
                event => events.push(event),
            }
        }

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        output
    }

    fn syntax_for(&self, lang: Option<&str>) -> &SyntaxReference {
        lang.and_then(|lang| {
            self.syntax_set
                .find_syntax_by_token(lang)
                .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
        })
        .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    /// Highlight one code block. Falls back to escaped plain text if `syntect`
    /// chokes on it.
    fn highlight(&self, lang: Option<&str>, code: &str) -> String {
        let syntax = self.syntax_for(lang);
        let class = match lang {
            Some(lang) => format!(" class=\"language-{}\"", html_escape(lang)),
            None => String::new(),
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::Spaced,
        );
        let mut highlighted = true;
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                warn!(?lang, "failed to highlight code block: {err}");
                highlighted = false;
                break;
            }
        }
        let body = if highlighted {
            generator.finalize()
        } else {
            html_escape(code)
        };
        format!("<pre class=\"code\"><code{class}>{body}</code></pre>\n")
    }
}
