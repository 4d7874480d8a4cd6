use crate::canvas::{Canvas, Document};
use crate::error::Result;
use crate::font::{FontMetrics, FontStyle};
use crate::page_data::{PageFooterSpec, apply_page_footer};
use crate::pdf::{PdfOptions, document_to_pdf};
use crate::types::{Color, Margins, Pt, Size, TextAlign};
use crate::wrap::LineWrapper;
use std::sync::Arc;
use tracing::debug;

/// Where the cursor goes after a single-line cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLn {
    /// Stay on the line, right of the cell.
    Right,
    /// Start of the next line at the left margin.
    NextLine,
    /// Directly below the cell.
    Below,
}

/// How the finished bytes are handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Inline,
    Download { filename: String },
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub delivery: Delivery,
    pub page_count: usize,
}

impl RenderedPdf {
    pub fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    /// Value for the `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        match &self.delivery {
            Delivery::Inline => "inline".to_string(),
            Delivery::Download { filename } => format!("attachment; filename=\"{filename}\""),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match &self.delivery {
            Delivery::Inline => None,
            Delivery::Download { filename } => Some(filename),
        }
    }
}

/// Page geometry used by the sink.
#[derive(Debug, Clone, Copy)]
pub struct SinkLayout {
    pub page_size: Size,
    pub margins: Margins,
    pub cell_margin: Pt,
    pub line_width: Pt,
}

/// Cursor-driven drawing surface that turns cells into canvas commands.
pub struct DocumentSink {
    canvas: Canvas,
    metrics: Arc<FontMetrics>,
    layout: SinkLayout,
    x: Pt,
    y: Pt,
    last_height: Pt,
    font_style: FontStyle,
    font_size: Pt,
    fill_color: Color,
    text_color: Color,
    page_open: bool,
    // Re-emitted at the top of every page opened after it was set.
    sticky_meta: Vec<(String, String)>,
}

impl DocumentSink {
    pub fn new(metrics: Arc<FontMetrics>, layout: SinkLayout) -> Self {
        Self {
            canvas: Canvas::new(layout.page_size),
            metrics,
            layout,
            x: layout.margins.left,
            y: layout.margins.top,
            last_height: Pt::ZERO,
            font_style: FontStyle::Regular,
            font_size: Pt::from_f32(12.0),
            fill_color: Color::gray(255),
            text_color: Color::BLACK,
            page_open: false,
            sticky_meta: Vec::new(),
        }
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn layout(&self) -> &SinkLayout {
        &self.layout
    }

    pub fn page_count(&self) -> usize {
        self.canvas.page_count() + usize::from(self.page_open)
    }

    pub fn add_page(&mut self) {
        if self.page_open {
            self.canvas.show_page();
        }
        self.page_open = true;
        self.x = self.layout.margins.left;
        self.y = self.layout.margins.top;
        for (key, value) in &self.sticky_meta {
            self.canvas.meta(key.clone(), value.clone());
        }
        self.canvas.set_line_width(self.layout.line_width);
        self.canvas.set_font_style(self.font_style);
        self.canvas.set_font_size(self.font_size);
        debug!(page = self.page_count(), "page opened");
    }

    /// Records `key=value` on the current page and on every later page
    /// until the key is set again.
    pub fn page_meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if self.page_open {
            self.canvas.meta(key.clone(), value.clone());
        }
        match self.sticky_meta.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.sticky_meta.push((key, value)),
        }
    }

    pub fn clear_page_meta(&mut self) {
        self.sticky_meta.clear();
    }

    pub fn set_font(&mut self, style: FontStyle, size: Pt) {
        self.font_style = style;
        self.font_size = size;
        if self.page_open {
            self.canvas.set_font_style(style);
            self.canvas.set_font_size(size);
        }
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.fill_color = color;
    }

    pub fn string_width(&self, text: &str) -> Pt {
        self.metrics.width(self.font_style, text, self.font_size)
    }

    /// Wrapper bound to the current font and cell margin.
    pub fn wrapper(&self) -> LineWrapper<'_> {
        LineWrapper::new(
            self.metrics.face(self.font_style),
            self.font_size,
            self.layout.cell_margin,
        )
    }

    pub fn get_x(&self) -> Pt {
        self.x
    }

    pub fn get_y(&self) -> Pt {
        self.y
    }

    pub fn set_x(&mut self, x: Pt) {
        self.x = x;
    }

    /// Moves to `y` and back to the left margin.
    pub fn set_y(&mut self, y: Pt) {
        self.x = self.layout.margins.left;
        self.y = y;
    }

    pub fn set_xy(&mut self, x: Pt, y: Pt) {
        self.set_y(y);
        self.x = x;
    }

    /// Line break; `None` reuses the height of the last cell.
    pub fn ln(&mut self, height: Option<Pt>) {
        self.x = self.layout.margins.left;
        self.y += height.unwrap_or(self.last_height);
    }

    /// Lowest y a cell may reach before the bottom margin.
    pub fn page_break_trigger(&self) -> Pt {
        self.layout.page_size.height - self.layout.margins.bottom
    }

    /// Whether a block of `height` fits below the cursor on the current page.
    pub fn fits(&self, height: Pt) -> bool {
        self.y + height <= self.page_break_trigger()
    }

    /// Full usable height between the top and bottom margins.
    pub fn body_height(&self) -> Pt {
        self.page_break_trigger() - self.layout.margins.top
    }

    /// Resolves a zero width to the space left before the right margin.
    pub fn resolve_width(&self, width: Pt) -> Pt {
        if width == Pt::ZERO {
            self.layout.page_size.width - self.layout.margins.right - self.x
        } else {
            width
        }
    }

    pub fn rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, border: bool, fill: bool) {
        if !border && !fill {
            return;
        }
        if fill {
            self.canvas.set_fill_color(self.fill_color);
        }
        self.canvas.draw_rect(x, y, width, height);
        match (fill, border) {
            (true, true) => self.canvas.fill_stroke(),
            (true, false) => self.canvas.fill(),
            _ => self.canvas.stroke(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn cell(
        &mut self,
        width: Pt,
        height: Pt,
        text: &str,
        border: bool,
        ln: CellLn,
        align: TextAlign,
        fill: bool,
    ) {
        let width = self.resolve_width(width);
        self.rect(self.x, self.y, width, height, border, fill);
        if !text.is_empty() {
            let text_width = self.string_width(text);
            let margin = self.layout.cell_margin;
            let dx = match align {
                TextAlign::Left => margin,
                TextAlign::Right => width - margin - text_width,
                TextAlign::Center => (width - text_width) / 2,
            };
            let baseline = self.y + height / 2 + self.font_size * 3 / 10;
            self.canvas.set_fill_color(self.text_color);
            self.canvas.draw_string(self.x + dx, baseline, text);
        }
        self.last_height = height;
        match ln {
            CellLn::Right => self.x += width,
            CellLn::NextLine => {
                self.x = self.layout.margins.left;
                self.y += height;
            }
            CellLn::Below => self.y += height,
        }
    }

    /// Wrapped text block; each wrapped line is one cell of `line_height`.
    /// Returns the number of lines drawn. The cursor ends below the block at
    /// the left margin.
    pub fn multi_cell(
        &mut self,
        width: Pt,
        line_height: Pt,
        text: &str,
        border: bool,
        align: TextAlign,
        fill: bool,
    ) -> usize {
        let width = self.resolve_width(width);
        let lines = self.wrapper().wrap(width, text);
        let block_height = line_height * lines.len() as i32;
        self.rect(self.x, self.y, width, block_height, border, fill);
        for line in &lines {
            self.cell(width, line_height, line, false, CellLn::Below, align, false);
        }
        self.x = self.layout.margins.left;
        lines.len()
    }

    /// Closes the document: footers are applied now that the page total is known.
    pub fn finish(self, footer: Option<&PageFooterSpec>) -> Document {
        let SinkLayout { margins, .. } = self.layout;
        let metrics = self.metrics;
        let mut doc = if self.page_open || self.canvas.page_count() > 0 {
            self.canvas.finish()
        } else {
            Document {
                page_size: self.layout.page_size,
                pages: Vec::new(),
            }
        };
        if let Some(spec) = footer {
            apply_page_footer(&mut doc, spec, &metrics, margins.left, margins.right);
        }
        doc
    }

    pub fn finalize(
        self,
        footer: Option<&PageFooterSpec>,
        options: &PdfOptions,
        delivery: Delivery,
    ) -> Result<RenderedPdf> {
        let metrics = Arc::clone(&self.metrics);
        let doc = self.finish(footer);
        let bytes = document_to_pdf(&doc, &metrics, options)?;
        Ok(RenderedPdf {
            bytes,
            delivery,
            page_count: doc.page_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;

    fn sink() -> DocumentSink {
        DocumentSink::new(
            Arc::new(FontMetrics::helvetica()),
            SinkLayout {
                page_size: Size::a4(),
                margins: Margins::all_mm(10.0),
                cell_margin: Pt::from_mm(1.0),
                line_width: Pt::from_mm(0.2),
            },
        )
    }

    fn strings(doc: &Document, page: usize) -> Vec<(Pt, Pt, String)> {
        doc.pages[page]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { x, y, text } => Some((*x, *y, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn cell_advances_cursor_by_ln_mode() {
        let mut s = sink();
        s.add_page();
        let left = s.get_x();
        let top = s.get_y();
        s.cell(Pt::from_mm(40.0), Pt::from_mm(8.0), "a", false, CellLn::Right, TextAlign::Left, false);
        assert_eq!(s.get_x(), left + Pt::from_mm(40.0));
        assert_eq!(s.get_y(), top);
        s.cell(Pt::from_mm(40.0), Pt::from_mm(8.0), "b", false, CellLn::NextLine, TextAlign::Left, false);
        assert_eq!(s.get_x(), left);
        assert_eq!(s.get_y(), top + Pt::from_mm(8.0));
        s.ln(Some(Pt::from_mm(5.0)));
        assert_eq!(s.get_y(), top + Pt::from_mm(8.0) + Pt::from_mm(5.0));
    }

    #[test]
    fn zero_width_cell_spans_to_right_margin() {
        let mut s = sink();
        s.add_page();
        let width = s.resolve_width(Pt::ZERO);
        assert_eq!(width, Size::a4().width - Pt::from_mm(10.0) - Pt::from_mm(10.0));
    }

    #[test]
    fn right_aligned_text_ends_at_cell_margin() {
        let mut s = sink();
        s.add_page();
        s.set_font(FontStyle::Regular, Pt::from_f32(9.0));
        let width = Pt::from_mm(25.0);
        s.cell(width, Pt::from_mm(6.0), "$25.00", true, CellLn::Right, TextAlign::Right, false);
        let doc = s.finish(None);
        let (x, _, text) = strings(&doc, 0).remove(0);
        let text_width = FontMetrics::helvetica().width(FontStyle::Regular, &text, Pt::from_f32(9.0));
        let expected_right = Pt::from_mm(10.0) + width - Pt::from_mm(1.0);
        assert!(((x + text_width).to_f32() - expected_right.to_f32()).abs() < 0.01);
    }

    #[test]
    fn filled_cell_restores_text_color() {
        let mut s = sink();
        s.add_page();
        s.set_fill_color(Color::gray(230));
        s.cell(Pt::from_mm(50.0), Pt::from_mm(7.0), "Item", true, CellLn::Right, TextAlign::Left, true);
        let doc = s.finish(None);
        let commands = &doc.pages[0].commands;
        let fill_pos = commands
            .iter()
            .position(|c| *c == Command::SetFillColor(Color::gray(230)))
            .expect("fill color");
        let black_pos = commands
            .iter()
            .position(|c| *c == Command::SetFillColor(Color::BLACK))
            .expect("text color");
        let text_pos = commands
            .iter()
            .position(|c| matches!(c, Command::DrawString { .. }))
            .expect("text");
        assert!(fill_pos < black_pos && black_pos < text_pos);
        assert!(commands.contains(&Command::FillStroke));
    }

    #[test]
    fn multi_cell_draws_one_line_per_wrap() {
        let mut s = sink();
        s.add_page();
        s.set_font(FontStyle::Regular, Pt::from_f32(9.0));
        let top = s.get_y();
        let text = "Approval: Yes\nPurchased: 06/01/2025\nComment: lane ropes";
        let drawn = s.multi_cell(Pt::from_mm(75.0), Pt::from_mm(6.0), text, false, TextAlign::Left, false);
        assert_eq!(drawn, 3);
        assert_eq!(s.get_y(), top + Pt::from_mm(6.0) * 3);
        let doc = s.finish(None);
        let lines: Vec<String> = strings(&doc, 0).into_iter().map(|(_, _, t)| t).collect();
        assert_eq!(lines, vec!["Approval: Yes", "Purchased: 06/01/2025", "Comment: lane ropes"]);
    }

    #[test]
    fn page_meta_follows_onto_later_pages() {
        let mut s = sink();
        s.add_page();
        s.page_meta("account", "100-200");
        s.add_page();
        s.page_meta("account", "300-400");
        s.add_page();
        let doc = s.finish(None);
        let values: Vec<Vec<&str>> = doc
            .pages
            .iter()
            .map(|page| page.meta_values("account").collect())
            .collect();
        assert_eq!(values, vec![vec!["100-200"], vec!["100-200", "300-400"], vec!["300-400"]]);
    }

    #[test]
    fn cleared_page_meta_stops_repeating() {
        let mut s = sink();
        s.add_page();
        s.page_meta("account", "100-200");
        s.clear_page_meta();
        s.add_page();
        let doc = s.finish(None);
        assert_eq!(doc.pages[1].meta_values("account").count(), 0);
    }

    #[test]
    fn finish_without_pages_is_empty() {
        let doc = sink().finish(Some(&PageFooterSpec::default()));
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn download_delivery_sets_attachment_header() {
        let rendered = RenderedPdf {
            bytes: Vec::new(),
            delivery: Delivery::Download {
                filename: "budget-report-2025-01-31.pdf".to_string(),
            },
            page_count: 0,
        };
        assert_eq!(
            rendered.content_disposition(),
            "attachment; filename=\"budget-report-2025-01-31.pdf\""
        );
        assert_eq!(rendered.filename(), Some("budget-report-2025-01-31.pdf"));
    }
}
