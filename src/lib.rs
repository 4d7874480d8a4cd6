mod book;
mod canvas;
mod error;
mod font;
mod metrics;
mod model;
mod page_data;
mod pdf;
mod pdfinspect;
mod report;
mod sink;
mod table;
mod types;
mod wrap;

pub use book::{
    AccountForm, BudgetBook, ItemRow, ListFilter, RowKey, Selection, SortColumn, SortOrder,
};
pub use canvas::{Canvas, Command, Document, Page};
pub use error::{ReportError, Result};
pub use font::{FontFace, FontMetrics, FontStyle};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use model::{
    AccountSnapshot, BudgetAccount, LineItem, LineItemKind, StaffingItem, StandardItem,
    format_currency,
};
pub use page_data::{
    PageDataContext, PageFooterSpec, compute_page_data_context, substitute_placeholders,
};
pub use pdf::PdfOptions;
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path,
};
pub use report::{
    ACCOUNT_META_KEY, ReportComposer, staffing_details, standard_details, standard_item_text,
};
pub use sink::{CellLn, Delivery, DocumentSink, RenderedPdf, SinkLayout};
pub use table::{CellKind, Column, Table, TableRow, TableStyle};
pub use types::{Color, Margins, Pt, Size, TextAlign};
pub use wrap::LineWrapper;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Width of the item tables; the printable area must be at least this wide.
pub const TABLE_WIDTH_MM: f32 = 190.0;

/// Report geometry and document settings. Lengths are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Left, top and right margin.
    pub margin_mm: f32,
    /// Distance from the bottom edge at which content moves to a new page.
    pub bottom_margin_mm: f32,
    pub cell_margin_mm: f32,
    pub line_height_mm: f32,
    pub line_width_mm: f32,
    pub currency_symbol: String,
    /// `None` disables the page footer.
    pub footer_template: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub compress: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
            bottom_margin_mm: 20.0,
            cell_margin_mm: 1.0,
            line_height_mm: 6.0,
            line_width_mm: 0.2,
            currency_symbol: "$".to_string(),
            footer_template: Some("Page {page}/{pages}".to_string()),
            title: None,
            author: None,
            compress: true,
        }
    }
}

impl ReportOptions {
    fn validate(&self) -> Result<()> {
        let lengths = [
            ("page_width_mm", self.page_width_mm),
            ("page_height_mm", self.page_height_mm),
            ("margin_mm", self.margin_mm),
            ("bottom_margin_mm", self.bottom_margin_mm),
            ("cell_margin_mm", self.cell_margin_mm),
            ("line_height_mm", self.line_height_mm),
            ("line_width_mm", self.line_width_mm),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(ReportError::InvalidConfiguration(format!(
                    "{name} must be a finite, non-negative length (got {value})"
                )));
            }
        }
        if self.line_height_mm <= 0.0 {
            return Err(ReportError::InvalidConfiguration(
                "line_height_mm must be greater than zero".to_string(),
            ));
        }
        let printable_width = self.page_width_mm - 2.0 * self.margin_mm;
        if printable_width + 0.01 < TABLE_WIDTH_MM {
            return Err(ReportError::InvalidConfiguration(format!(
                "printable width {printable_width:.1} mm cannot hold {TABLE_WIDTH_MM} mm tables"
            )));
        }
        // Section caption, header band and one row must share a page.
        let body_height = self.page_height_mm - self.margin_mm - self.bottom_margin_mm;
        let min_body = 10.0 + 7.0 + self.line_height_mm;
        if body_height < min_body {
            return Err(ReportError::InvalidConfiguration(format!(
                "page body {body_height:.1} mm is shorter than the {min_body:.1} mm a table needs"
            )));
        }
        Ok(())
    }

    fn sink_layout(&self) -> SinkLayout {
        let margin = Pt::from_mm(self.margin_mm);
        SinkLayout {
            page_size: Size::from_mm(self.page_width_mm, self.page_height_mm),
            margins: Margins {
                top: margin,
                right: margin,
                bottom: Pt::from_mm(self.bottom_margin_mm),
                left: margin,
            },
            cell_margin: Pt::from_mm(self.cell_margin_mm),
            line_width: Pt::from_mm(self.line_width_mm),
        }
    }
}

/// `budget-report-YYYY-MM-DD.pdf`
pub fn download_filename(date: NaiveDate) -> String {
    format!("budget-report-{}.pdf", date.format("%Y-%m-%d"))
}

impl Delivery {
    /// Download named after today's local date.
    pub fn download_today() -> Self {
        Delivery::Download {
            filename: download_filename(chrono::Local::now().date_naive()),
        }
    }
}

/// Configured report generator. Cheap to clone and safe to share between
/// threads; every build owns its own sink.
#[derive(Clone)]
pub struct BudgetReport {
    metrics: Arc<FontMetrics>,
    options: ReportOptions,
    layout: SinkLayout,
    footer: Option<PageFooterSpec>,
    pdf_options: PdfOptions,
}

pub struct BudgetReportBuilder {
    options: ReportOptions,
}

impl BudgetReport {
    pub fn builder() -> BudgetReportBuilder {
        BudgetReportBuilder::new()
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    fn compose(&self, accounts: &[AccountSnapshot]) -> Result<DocumentSink> {
        if accounts.is_empty() {
            return Err(ReportError::Selection("no accounts to render".to_string()));
        }
        let mut sink = DocumentSink::new(Arc::clone(&self.metrics), self.layout);
        let composer = ReportComposer::new(
            self.options.currency_symbol.as_str(),
            Pt::from_mm(self.options.line_height_mm),
        );
        composer.render(&mut sink, accounts)?;
        Ok(sink)
    }

    /// Lays out every account without serializing, footers included.
    pub fn layout(&self, accounts: &[AccountSnapshot]) -> Result<Document> {
        Ok(self.compose(accounts)?.finish(self.footer.as_ref()))
    }

    /// Renders all accounts into one PDF. Any failure aborts the whole batch.
    pub fn render(&self, accounts: &[AccountSnapshot], delivery: Delivery) -> Result<RenderedPdf> {
        let sink = self.compose(accounts)?;
        let rendered = sink.finalize(self.footer.as_ref(), &self.pdf_options, delivery)?;
        info!(
            accounts = accounts.len(),
            pages = rendered.page_count,
            bytes = rendered.bytes.len(),
            "budget report rendered"
        );
        Ok(rendered)
    }

    /// Like [`BudgetReport::render`], also reporting per-page counts and timings.
    pub fn render_with_metrics(
        &self,
        accounts: &[AccountSnapshot],
        delivery: Delivery,
    ) -> Result<(RenderedPdf, DocumentMetrics)> {
        let started = Instant::now();
        let document = self.layout(accounts)?;
        let layout_ms = started.elapsed().as_secs_f64() * 1000.0;

        let started = Instant::now();
        let bytes = pdf::document_to_pdf(&document, &self.metrics, &self.pdf_options)?;
        let serialize_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut metrics = DocumentMetrics::from_document(&document);
        metrics.account_count = accounts.len();
        metrics.layout_ms = layout_ms;
        metrics.serialize_ms = serialize_ms;
        metrics.total_bytes = bytes.len();

        info!(
            accounts = accounts.len(),
            pages = document.page_count(),
            bytes = bytes.len(),
            layout_ms,
            serialize_ms,
            "budget report rendered"
        );
        let rendered = RenderedPdf {
            bytes,
            delivery,
            page_count: document.page_count(),
        };
        Ok((rendered, metrics))
    }
}

impl Default for BudgetReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetReportBuilder {
    pub fn new() -> Self {
        Self {
            options: ReportOptions::default(),
        }
    }

    /// Starts from a complete option set, e.g. one loaded from JSON.
    pub fn options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn page_size_mm(mut self, width: f32, height: f32) -> Self {
        self.options.page_width_mm = width;
        self.options.page_height_mm = height;
        self
    }

    pub fn letter(self) -> Self {
        self.page_size_mm(215.9, 279.4)
    }

    pub fn margin_mm(mut self, value: f32) -> Self {
        self.options.margin_mm = value;
        self
    }

    pub fn bottom_margin_mm(mut self, value: f32) -> Self {
        self.options.bottom_margin_mm = value;
        self
    }

    pub fn cell_margin_mm(mut self, value: f32) -> Self {
        self.options.cell_margin_mm = value;
        self
    }

    pub fn line_height_mm(mut self, value: f32) -> Self {
        self.options.line_height_mm = value;
        self
    }

    pub fn currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.options.currency_symbol = symbol.into();
        self
    }

    /// Footer template; `{page}` and `{pages}` are replaced per page.
    pub fn page_footer(mut self, template: impl Into<String>) -> Self {
        self.options.footer_template = Some(template.into());
        self
    }

    pub fn no_page_footer(mut self) -> Self {
        self.options.footer_template = None;
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.options.title = Some(title.into());
        self
    }

    pub fn document_author(mut self, author: impl Into<String>) -> Self {
        self.options.author = Some(author.into());
        self
    }

    pub fn compress(mut self, enabled: bool) -> Self {
        self.options.compress = enabled;
        self
    }

    pub fn build(self) -> Result<BudgetReport> {
        self.options.validate()?;
        let footer = self
            .options
            .footer_template
            .as_ref()
            .filter(|template| !template.is_empty())
            .map(|template| PageFooterSpec {
                template: template.clone(),
                ..PageFooterSpec::default()
            });
        let pdf_options = PdfOptions {
            title: self.options.title.clone(),
            author: self.options.author.clone(),
            compress: self.options.compress,
            ..PdfOptions::default()
        };
        Ok(BudgetReport {
            metrics: Arc::new(FontMetrics::helvetica()),
            layout: self.options.sink_layout(),
            options: self.options,
            footer,
            pdf_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn report_can_be_shared_between_threads() {
        assert_send_sync::<BudgetReport>();
    }

    #[test]
    fn download_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).expect("date");
        assert_eq!(download_filename(date), "budget-report-2025-01-31.pdf");
        let Delivery::Download { filename } = Delivery::download_today() else {
            panic!("expected download");
        };
        assert!(filename.starts_with("budget-report-") && filename.ends_with(".pdf"));
    }

    #[test]
    fn default_options_build() {
        let report = BudgetReport::builder().build().expect("build");
        assert_eq!(report.options(), &ReportOptions::default());
        assert!(BudgetReport::builder().letter().build().is_ok());
    }

    #[test]
    fn narrow_pages_are_rejected() {
        let err = BudgetReport::builder()
            .page_size_mm(148.0, 210.0)
            .build()
            .err()
            .expect("too narrow");
        assert!(matches!(err, ReportError::InvalidConfiguration(_)));
    }

    #[test]
    fn bad_lengths_are_rejected() {
        assert!(BudgetReport::builder().line_height_mm(0.0).build().is_err());
        assert!(BudgetReport::builder().margin_mm(f32::NAN).build().is_err());
        assert!(BudgetReport::builder().bottom_margin_mm(280.0).build().is_err());
    }

    #[test]
    fn options_load_from_partial_json() {
        let options: ReportOptions =
            serde_json::from_str(r#"{"currency_symbol":"EUR ","footer_template":null}"#)
                .expect("options");
        assert_eq!(options.currency_symbol, "EUR ");
        assert_eq!(options.footer_template, None);
        assert_eq!(options.line_height_mm, 6.0);
    }

    #[test]
    fn empty_account_list_is_a_selection_error() {
        let report = BudgetReport::builder().build().expect("build");
        assert!(matches!(
            report.layout(&[]),
            Err(ReportError::Selection(_))
        ));
    }
}
