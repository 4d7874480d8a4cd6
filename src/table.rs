use crate::font::{FontMetrics, FontStyle};
use crate::sink::{CellLn, DocumentSink};
use crate::types::{Color, Pt, TextAlign};
use crate::wrap::LineWrapper;
use tracing::{debug, warn};

/// How a column lays out its text inside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Word-wrapped, left aligned, may span several lines.
    Wrapped,
    /// One line of text; counts as a single line for row height.
    Single(TextAlign),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub title: String,
    pub width: Pt,
    pub header_align: TextAlign,
    pub kind: CellKind,
}

impl Column {
    pub fn wrapped(title: impl Into<String>, width_mm: f32) -> Self {
        Self {
            title: title.into(),
            width: Pt::from_mm(width_mm),
            header_align: TextAlign::Left,
            kind: CellKind::Wrapped,
        }
    }

    /// Single-line column with a centered header.
    pub fn single(title: impl Into<String>, width_mm: f32, align: TextAlign) -> Self {
        Self {
            title: title.into(),
            width: Pt::from_mm(width_mm),
            header_align: TextAlign::Center,
            kind: CellKind::Single(align),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableStyle {
    pub header_style: FontStyle,
    pub header_size: Pt,
    pub header_height: Pt,
    pub header_fill: Color,
    pub body_style: FontStyle,
    pub body_size: Pt,
    pub line_height: Pt,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            header_style: FontStyle::Bold,
            header_size: Pt::from_f32(10.0),
            header_height: Pt::from_mm(7.0),
            header_fill: Color::gray(230),
            body_style: FontStyle::Regular,
            body_size: Pt::from_f32(9.0),
            line_height: Pt::from_mm(6.0),
        }
    }
}

/// One measured row: the column texts and the height they need.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub texts: Vec<String>,
    pub lines: Vec<usize>,
    pub height: Pt,
}

pub struct Table {
    columns: Vec<Column>,
    style: TableStyle,
}

impl Table {
    pub fn new(columns: Vec<Column>, style: TableStyle) -> Self {
        Self { columns, style }
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    pub fn width(&self) -> Pt {
        self.columns.iter().map(|col| col.width).sum()
    }

    /// Line count per column and the resulting row height. Missing texts
    /// count as empty cells.
    pub fn measure(&self, metrics: &FontMetrics, cell_margin: Pt, texts: &[String]) -> TableRow {
        let wrapper = LineWrapper::new(
            metrics.face(self.style.body_style),
            self.style.body_size,
            cell_margin,
        );
        let texts: Vec<String> = (0..self.columns.len())
            .map(|idx| texts.get(idx).cloned().unwrap_or_default())
            .collect();
        let lines: Vec<usize> = self
            .columns
            .iter()
            .zip(&texts)
            .map(|(col, text)| match col.kind {
                CellKind::Wrapped => wrapper.line_count(col.width, text),
                CellKind::Single(_) => 1,
            })
            .collect();
        let tallest = lines.iter().copied().max().unwrap_or(1).max(1);
        TableRow {
            texts,
            lines,
            height: self.style.line_height * tallest as i32,
        }
    }

    /// Gray title band across all columns; the cursor ends at the start of
    /// the next line.
    pub fn draw_header(&self, sink: &mut DocumentSink) {
        sink.set_font(self.style.header_style, self.style.header_size);
        sink.set_fill_color(self.style.header_fill);
        let last = self.columns.len().saturating_sub(1);
        for (idx, col) in self.columns.iter().enumerate() {
            let ln = if idx == last { CellLn::NextLine } else { CellLn::Right };
            sink.cell(
                col.width,
                self.style.header_height,
                &col.title,
                true,
                ln,
                col.header_align,
                true,
            );
        }
    }

    /// Draws one synchronized row and returns its height.
    ///
    /// Borders are drawn first at the full row height, then every column's
    /// text from the shared row origin. A row that does not fit below the
    /// cursor moves to a new page under a repeated header band.
    pub fn draw_row(&self, sink: &mut DocumentSink, texts: &[String]) -> Pt {
        let row = self.measure(sink.metrics(), sink.layout().cell_margin, texts);

        if !sink.fits(row.height) && sink.get_y() > sink.layout().margins.top {
            warn!(
                height_mm = row.height.to_mm(),
                page = sink.page_count(),
                "row does not fit; continuing on a new page"
            );
            sink.add_page();
            self.draw_header(sink);
        }
        if row.height > sink.body_height() {
            debug!(height_mm = row.height.to_mm(), "row is taller than the page body");
        }

        sink.set_font(self.style.body_style, self.style.body_size);
        let x0 = sink.get_x();
        let y0 = sink.get_y();

        for col in &self.columns {
            sink.cell(col.width, row.height, "", true, CellLn::Right, TextAlign::Left, false);
        }

        let mut offset = Pt::ZERO;
        for (col, text) in self.columns.iter().zip(&row.texts) {
            sink.set_xy(x0 + offset, y0);
            match col.kind {
                CellKind::Wrapped => {
                    sink.multi_cell(
                        col.width,
                        self.style.line_height,
                        text,
                        false,
                        TextAlign::Left,
                        false,
                    );
                }
                CellKind::Single(align) => {
                    sink.cell(
                        col.width,
                        self.style.line_height,
                        text,
                        false,
                        CellLn::Right,
                        align,
                        false,
                    );
                }
            }
            offset += col.width;
        }

        sink.set_xy(x0, y0 + row.height);
        row.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Command, Document};
    use crate::sink::SinkLayout;
    use crate::types::{Margins, Size};
    use std::sync::Arc;

    fn sink() -> DocumentSink {
        let mut sink = DocumentSink::new(
            Arc::new(FontMetrics::helvetica()),
            SinkLayout {
                page_size: Size::a4(),
                margins: Margins {
                    top: Pt::from_mm(10.0),
                    right: Pt::from_mm(10.0),
                    bottom: Pt::from_mm(20.0),
                    left: Pt::from_mm(10.0),
                },
                cell_margin: Pt::from_mm(1.0),
                line_width: Pt::from_mm(0.2),
            },
        );
        sink.add_page();
        sink
    }

    fn standard_table() -> Table {
        Table::new(
            vec![
                Column::wrapped("Item", 50.0),
                Column::single("Qty", 15.0, TextAlign::Center),
                Column::single("Price", 25.0, TextAlign::Right),
                Column::single("Cost", 25.0, TextAlign::Right),
                Column::wrapped("Details", 75.0),
            ],
            TableStyle::default(),
        )
    }

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn rects(doc: &Document, page: usize) -> Vec<(Pt, Pt)> {
        doc.pages[page]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawRect { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn row_height_follows_tallest_column() {
        let table = standard_table();
        let metrics = FontMetrics::helvetica();
        let row = table.measure(
            &metrics,
            Pt::from_mm(1.0),
            &texts(&["Pool Float", "10", "$2.50", "$25.00", "Approval: Yes\nPurchased: 06/01/2025\nComment: blue"]),
        );
        assert_eq!(row.lines, vec![1, 1, 1, 1, 3]);
        assert_eq!(row.height, Pt::from_mm(6.0) * 3);
    }

    #[test]
    fn empty_row_is_one_line_high() {
        let table = standard_table();
        let row = table.measure(&FontMetrics::helvetica(), Pt::from_mm(1.0), &[]);
        assert_eq!(row.texts.len(), 5);
        assert_eq!(row.height, Pt::from_mm(6.0));
    }

    #[test]
    fn appending_text_never_lowers_row_height() {
        let table = standard_table();
        let metrics = FontMetrics::helvetica();
        let margin = Pt::from_mm(1.0);
        let mut item = String::new();
        let mut previous = Pt::ZERO;
        for word in "Heavy duty lane rope with stainless steel hardware and floats"
            .split(' ')
            .chain(["\n(https://example.com/catalog/lane-rope-25m)", "\nnote"])
        {
            item.push_str(word);
            item.push(' ');
            let row = table.measure(&metrics, margin, &texts(&[&item, "1", "", "", "Approval: No"]));
            assert!(row.height >= previous, "height dropped at {item:?}");
            previous = row.height;
        }
        assert!(previous > Pt::from_mm(6.0));
    }

    #[test]
    fn borders_span_full_row_and_cursor_ends_below() {
        let table = standard_table();
        let mut s = sink();
        let x0 = s.get_x();
        let y0 = s.get_y();
        let height = table.draw_row(
            &mut s,
            &texts(&["Pool Float\n(https://shop.example)", "10", "$2.50", "$25.00", "Approval: Yes"]),
        );
        assert_eq!(height, Pt::from_mm(6.0) * 2);
        assert_eq!(s.get_x(), x0);
        assert_eq!(s.get_y(), y0 + height);

        let doc = s.finish(None);
        let borders = rects(&doc, 0);
        assert_eq!(borders.len(), 5);
        assert!(borders.iter().all(|(_, h)| *h == height));
        let drawn: Vec<&str> = doc.pages[0].texts().collect();
        assert_eq!(
            drawn,
            vec!["Pool Float", "(https://shop.example)", "10", "$2.50", "$25.00", "Approval: Yes"]
        );
    }

    #[test]
    fn header_band_is_filled_and_bordered() {
        let table = standard_table();
        let mut s = sink();
        let y0 = s.get_y();
        table.draw_header(&mut s);
        assert_eq!(s.get_y(), y0 + Pt::from_mm(7.0));
        let doc = s.finish(None);
        let fills = doc.pages[0]
            .commands
            .iter()
            .filter(|cmd| **cmd == Command::FillStroke)
            .count();
        assert_eq!(fills, 5);
        assert!(doc.pages[0].contains_text("Details"));
    }

    #[test]
    fn row_that_does_not_fit_moves_to_new_page_with_header() {
        let table = standard_table();
        let mut s = sink();
        let near_bottom = s.page_break_trigger() - Pt::from_mm(4.0);
        s.set_y(near_bottom);
        table.draw_row(&mut s, &texts(&["Lifeguard chair", "1", "$900.00", "$900.00", "Approval: No"]));
        assert_eq!(s.page_count(), 2);
        let doc = s.finish(None);
        assert!(!doc.pages[0].contains_text("Lifeguard chair"));
        assert!(doc.pages[1].contains_text("Item"));
        assert!(doc.pages[1].contains_text("Lifeguard chair"));
    }

    #[test]
    fn narrow_column_degrades_to_characters() {
        let table = Table::new(vec![Column::wrapped("X", 3.0)], TableStyle::default());
        let row = table.measure(&FontMetrics::helvetica(), Pt::from_mm(1.0), &texts(&["WWWW"]));
        assert_eq!(row.lines, vec![5]);
    }
}
