use crate::canvas::{Command, Document};
use crate::font::{FontMetrics, FontStyle};
use crate::types::{Color, Pt};
use std::collections::BTreeMap;

/// Footer drawn on every page once the final page count is known.
#[derive(Debug, Clone)]
pub struct PageFooterSpec {
    pub template: String,
    pub font_style: FontStyle,
    pub font_size: Pt,
    pub color: Color,
    /// Distance from the bottom edge to the top of the footer band.
    pub y_from_bottom: Pt,
    pub band_height: Pt,
}

impl Default for PageFooterSpec {
    fn default() -> Self {
        Self {
            template: "Page {page}/{pages}".to_string(),
            font_style: FontStyle::Italic,
            font_size: Pt::from_f32(8.0),
            color: Color::BLACK,
            y_from_bottom: Pt::from_mm(15.0),
            band_height: Pt::from_mm(10.0),
        }
    }
}

/// Meta values recorded on each page, keyed by meta key in command order.
#[derive(Debug, Clone, Default)]
pub struct PageDataContext {
    pub page_count: usize,
    pub pages: Vec<BTreeMap<String, Vec<String>>>,
}

pub fn compute_page_data_context(doc: &Document) -> PageDataContext {
    let pages = doc
        .pages
        .iter()
        .map(|page| {
            let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for cmd in &page.commands {
                if let Command::Meta { key, value } = cmd {
                    values.entry(key.clone()).or_default().push(value.clone());
                }
            }
            values
        })
        .collect();
    PageDataContext {
        page_count: doc.pages.len(),
        pages,
    }
}

/// Expands `{page}`, `{pages}` and `{every:<meta key>}` tokens. Unknown
/// tokens are kept verbatim.
pub fn substitute_placeholders(
    template: &str,
    page_number: usize,
    page_count: usize,
    ctx: Option<&PageDataContext>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start + 1..];

        let Some(end) = rest.find('}') else {
            // Unclosed token; keep as-is.
            out.push('{');
            out.push_str(rest);
            return out;
        };

        let token = &rest[..end];
        match resolve_token(token, page_number, page_count, ctx) {
            Some(rep) => out.push_str(&rep),
            None => {
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_token(
    token: &str,
    page_number: usize,
    page_count: usize,
    ctx: Option<&PageDataContext>,
) -> Option<String> {
    match token.trim() {
        "page" => return Some(page_number.to_string()),
        "pages" => return Some(page_count.to_string()),
        _ => {}
    }
    let (kind, key) = token.split_once(':')?;
    if kind.trim() != "every" {
        return None;
    }
    let values = ctx?.pages.get(page_number.checked_sub(1)?)?.get(key.trim())?;
    Some(values.join(","))
}

/// Appends the footer to every page of `doc`, centered between the side margins.
pub fn apply_page_footer(
    doc: &mut Document,
    spec: &PageFooterSpec,
    metrics: &FontMetrics,
    left_margin: Pt,
    right_margin: Pt,
) {
    let total_pages = doc.pages.len();
    if total_pages == 0 {
        return;
    }
    let ctx = compute_page_data_context(doc);
    let band_width = doc.page_size.width - left_margin - right_margin;
    let top = doc.page_size.height - spec.y_from_bottom;
    // Baseline placement matches single-line cells: mid band plus 30% of the font size.
    let baseline = top + spec.band_height / 2 + spec.font_size * 3 / 10;

    for (idx0, page) in doc.pages.iter_mut().enumerate() {
        let page_number = idx0 + 1;
        let text = substitute_placeholders(&spec.template, page_number, total_pages, Some(&ctx));
        let text_width = metrics.width(spec.font_style, &text, spec.font_size);
        let x = left_margin + (band_width - text_width) / 2;

        page.commands.push(Command::SetFillColor(spec.color));
        page.commands.push(Command::SetFontStyle(spec.font_style));
        page.commands.push(Command::SetFontSize(spec.font_size));
        page.commands.push(Command::DrawString {
            x,
            y: baseline,
            text,
        });
    }
}
