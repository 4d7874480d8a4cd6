use crate::font::FontStyle;
use crate::types::{Color, Pt, Size};

/// Drawing primitive recorded for later serialization. Coordinates are
/// measured from the top-left corner of the page, y growing downwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Non-rendered metadata used for page-aware reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetLineWidth(Pt),
    SetFontStyle(FontStyle),
    SetFontSize(Pt),
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    Fill,
    Stroke,
    FillStroke,
    // `y` is the text baseline.
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.commands.iter().filter_map(move |cmd| match cmd {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn command_count(&self) -> usize {
        self.pages.iter().map(|page| page.commands.len()).sum()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    line_width: Pt,
    font_size: Pt,
    font_style: FontStyle,
}

impl GraphicsState {
    fn initial() -> Self {
        Self {
            fill_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font_size: Pt::from_f32(12.0),
            font_style: FontStyle::Regular,
        }
    }
}

/// Accumulates drawing commands page by page, dropping redundant state changes.
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            current_state: GraphicsState::initial(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_font_style(&mut self, style: FontStyle) {
        if self.current_state.font_style == style {
            return;
        }
        self.current_state.font_style = style;
        self.current.commands.push(Command::SetFontStyle(style));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn fill_stroke(&mut self) {
        self.current.commands.push(Command::FillStroke);
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(current);
        self.current_state = GraphicsState::initial();
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Closes the open page and returns every page drawn so far.
    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_dropped() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_style(FontStyle::Bold);
        canvas.set_font_style(FontStyle::Bold);
        canvas.set_fill_color(Color::gray(230));
        canvas.set_fill_color(Color::gray(230));
        canvas.set_font_size(Pt::from_f32(12.0));
        let doc = canvas.finish();
        assert_eq!(
            doc.pages[0].commands,
            vec![
                Command::SetFontStyle(FontStyle::Bold),
                Command::SetFillColor(Color::gray(230)),
            ]
        );
    }

    #[test]
    fn show_page_resets_graphics_state() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_style(FontStyle::Bold);
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "one");
        canvas.show_page();
        canvas.set_font_style(FontStyle::Bold);
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "two");
        let doc = canvas.finish();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].commands[0], Command::SetFontStyle(FontStyle::Bold));
        assert!(doc.pages[1].contains_text("two"));
        assert!(!doc.pages[1].contains_text("one"));
    }

    #[test]
    fn finish_always_yields_a_page() {
        let doc = Canvas::new(Size::letter()).finish();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.command_count(), 0);
    }
}
