use crate::font::FontFace;
use crate::types::Pt;
use std::borrow::Cow;

/// Greedy word wrapper for one face at one size.
///
/// Both the height pre-pass (`line_count`) and the draw pass (`wrap`) walk the
/// same [`LineSpans`] scanner, so a row never allocates fewer lines than it
/// later draws.
#[derive(Clone, Copy)]
pub struct LineWrapper<'a> {
    face: &'a FontFace,
    font_size: Pt,
    cell_margin: Pt,
}

impl<'a> LineWrapper<'a> {
    pub fn new(face: &'a FontFace, font_size: Pt, cell_margin: Pt) -> Self {
        Self {
            face,
            font_size,
            cell_margin,
        }
    }

    /// Width left for glyphs once both cell margins are removed.
    pub fn usable_width(&self, column_width: Pt) -> Pt {
        (column_width - self.cell_margin * 2).max(Pt::ZERO)
    }

    /// Number of lines `text` occupies in a column; always at least one.
    pub fn line_count(&self, column_width: Pt, text: &str) -> usize {
        let cleaned = strip_carriage_returns(text);
        self.spans(column_width, &cleaned).count()
    }

    pub fn wrap(&self, column_width: Pt, text: &str) -> Vec<String> {
        let cleaned = strip_carriage_returns(text);
        self.spans(column_width, &cleaned)
            .map(str::to_string)
            .collect()
    }

    fn spans<'t>(&self, column_width: Pt, text: &'t str) -> LineSpans<'a, 't> {
        LineSpans::new(
            self.face,
            self.font_size,
            self.usable_width(column_width),
            text,
        )
    }
}

fn strip_carriage_returns(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace('\r', ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Iterator over the byte ranges of wrapped lines.
pub(crate) struct LineSpans<'a, 't> {
    face: &'a FontFace,
    text: &'t str,
    // Overflow test: units * size_milli > limit_milli_units.
    size_milli: i128,
    limit: i128,
    pos: usize,
    line_start: usize,
    last_space: Option<usize>,
    units: i128,
    done: bool,
}

impl<'a, 't> LineSpans<'a, 't> {
    pub(crate) fn new(face: &'a FontFace, font_size: Pt, usable: Pt, text: &'t str) -> Self {
        // A single trailing newline closes the last line rather than opening a new one.
        let text = text.strip_suffix('\n').unwrap_or(text);
        Self {
            face,
            text,
            size_milli: font_size.to_milli_i64().max(0) as i128,
            limit: usable.to_milli_i64().max(0) as i128 * 1000,
            pos: 0,
            line_start: 0,
            last_space: None,
            units: 0,
            done: false,
        }
    }

    fn reset_line(&mut self) {
        self.line_start = self.pos;
        self.last_space = None;
        self.units = 0;
    }
}

impl<'t> Iterator for LineSpans<'_, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        if self.done {
            return None;
        }
        let text = self.text;
        while let Some(ch) = text[self.pos..].chars().next() {
            let ch_len = ch.len_utf8();
            if ch == '\n' {
                let line = &text[self.line_start..self.pos];
                self.pos += ch_len;
                self.reset_line();
                return Some(line);
            }
            if ch == ' ' {
                self.last_space = Some(self.pos);
            }
            self.units += self.face.char_units(ch) as i128;
            if self.units * self.size_milli > self.limit {
                let line = match self.last_space {
                    Some(space) => {
                        let line = &text[self.line_start..space];
                        self.pos = space + 1;
                        line
                    }
                    None => {
                        // A line holds at least one character so the scan always advances.
                        if self.pos == self.line_start {
                            self.pos += ch_len;
                        }
                        &text[self.line_start..self.pos]
                    }
                };
                // A break that consumes the last character still opens an
                // empty final line; row heights count it.
                self.reset_line();
                return Some(line);
            }
            self.pos += ch_len;
        }
        self.done = true;
        Some(&text[self.line_start..])
    }
}
