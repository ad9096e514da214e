//! Message rendering
//!
//! User turns render as literal text. Assistant turns are parsed as
//! markdown: fenced code blocks with a recognized language tag get
//! syntax highlighting, everything else in a fence (and inline code)
//! stays unstyled monospace.

use crate::conversation::{Message, Role};
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;

/// Lazy-initialized syntect highlighting assets.
struct HighlightAssets {
    syntax_set: SyntaxSet,
    theme: Theme,
}

fn highlight_assets() -> &'static HighlightAssets {
    static ASSETS: OnceLock<HighlightAssets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get("base16-eighties.dark")
            .cloned()
            .unwrap_or_else(|| {
                theme_set
                    .themes
                    .values()
                    .next()
                    .cloned()
                    .expect("syntect ships with at least one theme")
            });
        HighlightAssets { syntax_set, theme }
    })
}

/// Map a syntect RGBA color to a ratatui terminal color.
fn syntect_color_to_ratatui(c: syntect::highlighting::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Render one message as terminal lines.
pub fn message_lines(msg: &Message) -> Vec<Line<'static>> {
    match msg.role {
        Role::User => user_lines(&msg.text),
        Role::Assistant => assistant_lines(&msg.text),
    }
}

/// User turns are literal: no markup interpretation at all.
pub fn user_lines(text: &str) -> Vec<Line<'static>> {
    text.lines()
        .map(|line| Line::from(Span::raw(line.to_string())))
        .collect()
}

/// Assistant turns are markdown.
pub fn assistant_lines(text: &str) -> Vec<Line<'static>> {
    let mut r = Renderer::default();
    let mut code_lang: Option<Option<String>> = None;
    let mut code_buf = String::new();

    for event in Parser::new(text) {
        match event {
            MdEvent::Start(Tag::CodeBlock(kind)) => {
                r.start_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(tag) if !tag.is_empty() => {
                        Some(tag.split_whitespace().next().unwrap_or("").to_string())
                    }
                    _ => None,
                };
                code_lang = Some(lang);
                code_buf.clear();
            }
            MdEvent::End(TagEnd::CodeBlock) => {
                if let Some(lang) = code_lang.take() {
                    r.emit_code_block(lang.as_deref(), &code_buf);
                }
            }
            MdEvent::Text(t) => {
                if code_lang.is_some() {
                    code_buf.push_str(&t);
                } else {
                    r.push_text(&t);
                }
            }
            // Inline code: unstyled monospace.
            MdEvent::Code(t) => r.spans.push(Span::raw(t.into_string())),

            MdEvent::Start(Tag::Paragraph) => r.start_block(),
            MdEvent::End(TagEnd::Paragraph) => r.flush_line(),

            MdEvent::Start(Tag::Heading { .. }) => {
                r.start_block();
                r.heading = true;
            }
            MdEvent::End(TagEnd::Heading(_)) => {
                r.flush_line();
                r.heading = false;
            }

            MdEvent::Start(Tag::Item) => {
                r.flush_pending();
                r.spans
                    .push(Span::styled("• ", Style::default().fg(Color::Cyan)));
            }
            MdEvent::End(TagEnd::Item) => r.flush_pending(),

            MdEvent::Start(Tag::Strong) => r.strong = true,
            MdEvent::End(TagEnd::Strong) => r.strong = false,
            MdEvent::Start(Tag::Emphasis) => r.emphasis = true,
            MdEvent::End(TagEnd::Emphasis) => r.emphasis = false,

            MdEvent::SoftBreak | MdEvent::HardBreak => r.flush_line(),

            MdEvent::Rule => {
                r.start_block();
                r.lines.push(Line::from(Span::styled(
                    "────────────────────",
                    Style::default().fg(Color::DarkGray),
                )));
            }

            _ => {}
        }
    }

    r.flush_pending();
    r.lines
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    strong: bool,
    emphasis: bool,
    heading: bool,
}

impl Renderer {
    fn inline_style(&self) -> Style {
        let mut style = Style::default();
        if self.heading {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
        if self.strong {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.emphasis {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }

    fn push_text(&mut self, text: &str) {
        self.spans
            .push(Span::styled(text.to_string(), self.inline_style()));
    }

    /// End the current line.
    fn flush_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    /// End the current line only if it has content.
    fn flush_pending(&mut self) {
        if !self.spans.is_empty() {
            self.flush_line();
        }
    }

    /// Start a new block element: finish any open line and separate from
    /// the previous block with a blank line.
    fn start_block(&mut self) {
        self.flush_pending();
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn emit_code_block(&mut self, lang: Option<&str>, code: &str) {
        // A single trailing newline inside the fence is presentation noise;
        // all other whitespace is preserved verbatim.
        let code = code.strip_suffix('\n').unwrap_or(code);

        let assets = highlight_assets();
        let syntax = lang.and_then(|l| assets.syntax_set.find_syntax_by_token(l));

        match syntax {
            Some(syntax) => {
                let mut highlighter = HighlightLines::new(syntax, &assets.theme);
                for line in code.split('\n') {
                    match highlighter.highlight_line(line, &assets.syntax_set) {
                        Ok(ranges) => self.lines.push(highlighted_line(&ranges)),
                        Err(_) => self.lines.push(Line::from(Span::raw(line.to_string()))),
                    }
                }
            }
            // No recognized language tag: unstyled monospace.
            None => {
                for line in code.split('\n') {
                    self.lines.push(Line::from(Span::raw(line.to_string())));
                }
            }
        }
    }
}

fn highlighted_line(ranges: &[(syntect::highlighting::Style, &str)]) -> Line<'static> {
    let spans: Vec<Span<'static>> = ranges
        .iter()
        .map(|(style, text)| {
            let mut s = Style::default().fg(syntect_color_to_ratatui(style.foreground));
            if style.font_style.contains(FontStyle::BOLD) {
                s = s.add_modifier(Modifier::BOLD);
            }
            if style.font_style.contains(FontStyle::ITALIC) {
                s = s.add_modifier(Modifier::ITALIC);
            }
            Span::styled((*text).to_string(), s)
        })
        .collect();
    Line::from(spans)
}
