use crate::canvas::{Command, Document, Page};
use crate::error::Result;
use crate::font::{FontMetrics, FontStyle, encode_win_ansi};
use crate::types::{Color, Pt};
use lopdf::content::{Content, Operation};
use lopdf::{Document as LoDocument, Object as LoObject, StringFormat, dictionary};
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: String,
    /// Flate-compress content streams.
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            version: "1.4".to_string(),
            title: None,
            author: None,
            creator: format!("budget_report {}", env!("CARGO_PKG_VERSION")),
            compress: true,
        }
    }
}

fn font_key(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Regular => "F1",
        FontStyle::Bold => "F2",
        FontStyle::Italic => "F3",
    }
}

fn real(value: Pt) -> LoObject {
    LoObject::Real(value.to_f32())
}

fn color_operands(color: Color) -> Vec<LoObject> {
    vec![
        LoObject::Real(color.r),
        LoObject::Real(color.g),
        LoObject::Real(color.b),
    ]
}

/// Serializes the recorded pages into a PDF byte stream.
pub fn document_to_pdf(
    document: &Document,
    metrics: &FontMetrics,
    options: &PdfOptions,
) -> Result<Vec<u8>> {
    let mut doc = LoDocument::with_version(options.version.as_str());
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for (style, face) in metrics.faces() {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font_key(style), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut hasher = Sha256::new();
    let mut kids: Vec<LoObject> = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = render_page(page, document.page_size.height);
        let encoded = content.encode()?;
        hasher.update(&encoded);
        let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count,
            "Kids" => kids,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                real(document.page_size.width),
                real(document.page_size.height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Producer" => LoObject::string_literal(options.creator.as_str()),
    };
    if let Some(title) = &options.title {
        info.set("Title", LoObject::string_literal(title.as_str()));
    }
    if let Some(author) = &options.author {
        info.set("Author", LoObject::string_literal(author.as_str()));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    // Content-derived file identifier: identical layouts produce identical IDs.
    let digest = hasher.finalize();
    let file_id = digest[..16].to_vec();
    doc.trailer.set(
        "ID",
        vec![
            LoObject::String(file_id.clone(), StringFormat::Hexadecimal),
            LoObject::String(file_id, StringFormat::Hexadecimal),
        ],
    );

    if options.compress {
        doc.compress();
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    debug!(pages = page_count, bytes = out.len(), "pdf serialized");
    Ok(out)
}

fn render_page(page: &Page, page_height: Pt) -> Content {
    let mut operations = Vec::with_capacity(page.commands.len());
    let mut font_style = FontStyle::Regular;
    let mut font_size = Pt::from_f32(12.0);

    for cmd in &page.commands {
        match cmd {
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => {
                operations.push(Operation::new("rg", color_operands(*color)));
            }
            Command::SetLineWidth(width) => {
                operations.push(Operation::new("w", vec![real(*width)]));
            }
            Command::SetFontStyle(style) => font_style = *style,
            Command::SetFontSize(size) => font_size = *size,
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                operations.push(Operation::new(
                    "re",
                    vec![real(*x), real(page_height - *y), real(*width), real(-*height)],
                ));
            }
            Command::Fill => operations.push(Operation::new("f", vec![])),
            Command::Stroke => operations.push(Operation::new("S", vec![])),
            Command::FillStroke => operations.push(Operation::new("B", vec![])),
            Command::DrawString { x, y, text } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![LoObject::Name(font_key(font_style).as_bytes().to_vec()), real(font_size)],
                ));
                operations.push(Operation::new("Td", vec![real(*x), real(page_height - *y)]));
                operations.push(Operation::new(
                    "Tj",
                    vec![LoObject::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
        }
    }

    Content { operations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::Size;

    fn sample_document() -> Document {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_style(FontStyle::Bold);
        canvas.set_font_size(Pt::from_f32(14.0));
        canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(72.0), "Budget: 2025");
        canvas.draw_rect(Pt::from_f32(28.0), Pt::from_f32(100.0), Pt::from_f32(100.0), Pt::from_f32(20.0));
        canvas.stroke();
        canvas.show_page();
        canvas.draw_string(Pt::from_f32(72.0), Pt::from_f32(72.0), "Second");
        canvas.finish()
    }

    #[test]
    fn writes_one_pdf_page_per_document_page() {
        let metrics = FontMetrics::helvetica();
        let bytes = document_to_pdf(&sample_document(), &metrics, &PdfOptions::default())
            .expect("pdf");
        assert!(bytes.starts_with(b"%PDF-1.4"));
        let parsed = LoDocument::load_mem(&bytes).expect("parse");
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn identical_layouts_get_identical_ids() {
        let metrics = FontMetrics::helvetica();
        let options = PdfOptions::default();
        let a = document_to_pdf(&sample_document(), &metrics, &options).expect("pdf");
        let b = document_to_pdf(&sample_document(), &metrics, &options).expect("pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn text_is_flipped_into_pdf_space_with_active_font() {
        let page = &sample_document().pages[0];
        let content = render_page(page, Size::a4().height);
        let tf = content
            .operations
            .iter()
            .find(|op| op.operator == "Tf")
            .expect("Tf");
        assert!(matches!(&tf.operands[0], LoObject::Name(name) if name.as_slice() == b"F2"));
        let td = content
            .operations
            .iter()
            .find(|op| op.operator == "Td")
            .expect("Td");
        let expected_y = (Size::a4().height - Pt::from_f32(72.0)).to_f32();
        let LoObject::Real(y) = td.operands[1] else {
            panic!("Td operand is not a real");
        };
        assert!((y - expected_y).abs() < 0.001);
    }

    #[test]
    fn rectangles_extend_downwards_from_their_top_edge() {
        let page = &sample_document().pages[0];
        let content = render_page(page, Size::a4().height);
        let re = content
            .operations
            .iter()
            .find(|op| op.operator == "re")
            .expect("re");
        let LoObject::Real(top) = re.operands[1] else {
            panic!("re y is not a real");
        };
        let LoObject::Real(height) = re.operands[3] else {
            panic!("re height is not a real");
        };
        let expected_top = (Size::a4().height - Pt::from_f32(100.0)).to_f32();
        assert!((top - expected_top).abs() < 0.001);
        assert!((height + 20.0).abs() < 0.001);
    }
}
