use crate::error::Result;
use crate::font::FontStyle;
use crate::model::{
    AccountSnapshot, BudgetAccount, StaffingItem, StandardItem, format_count, format_currency,
    format_quantity,
};
use crate::sink::{CellLn, DocumentSink};
use crate::table::{Column, Table, TableStyle};
use crate::types::{Color, Pt, TextAlign};
use rust_decimal::Decimal;
use tracing::{debug, warn};

pub const STANDARD_CAPTION: &str = "Standard Items";
pub const STAFFING_CAPTION: &str = "Staffing Costs";
pub const TOTAL_LABEL: &str = "Total Estimated Cost for Account";
pub const SIGNATURE_LINE: &str = "___________________________";
/// Page meta key carrying the account number of every page.
pub const ACCOUNT_META_KEY: &str = "account";

const FIELD_HEIGHT_MM: f32 = 8.0;
const LABEL_WIDTH_MM: f32 = 40.0;
const VALUE_WIDTH_MM: f32 = 55.0;
const SECOND_LABEL_WIDTH_MM: f32 = 35.0;
const SECOND_VALUE_WIDTH_MM: f32 = 60.0;
const SECTION_GAP_MM: f32 = 5.0;
const TOTAL_AMOUNT_WIDTH_MM: f32 = 25.0;
const SIGNATURE_GAP_MM: f32 = 20.0;

pub fn standard_columns() -> Vec<Column> {
    vec![
        Column::wrapped("Item", 50.0),
        Column::single("Qty", 15.0, TextAlign::Center),
        Column::single("Price", 25.0, TextAlign::Right),
        Column::single("Cost", 25.0, TextAlign::Right),
        Column::wrapped("Details", 75.0),
    ]
}

pub fn staffing_columns() -> Vec<Column> {
    vec![
        Column::wrapped("Position/Role", 45.0),
        Column::single("Weeks", 15.0, TextAlign::Center),
        Column::single("Days/Wk", 15.0, TextAlign::Center),
        Column::single("Hrs/Day", 15.0, TextAlign::Center),
        Column::single("# Staff", 15.0, TextAlign::Center),
        Column::single("Rate", 20.0, TextAlign::Right),
        Column::single("Cost", 25.0, TextAlign::Right),
        Column::wrapped("Details", 40.0),
    ]
}

/// Item name, with the link on its own line when present.
pub fn standard_item_text(item: &StandardItem) -> String {
    match item.link.as_deref().filter(|link| !link.is_empty()) {
        Some(link) => format!("{}\n({link})", item.name),
        None => item.name.clone(),
    }
}

/// Approval always, then purchase date and comment when set.
pub fn standard_details(item: &StandardItem) -> String {
    let mut details = format!("Approval: {}", yes_no(item.approved));
    if let Some(date) = item.purchased_on {
        details.push_str(&format!("\nPurchased: {}", date.format("%m/%d/%Y")));
    }
    if !item.comment.is_empty() {
        details.push_str(&format!("\nComment: {}", item.comment));
    }
    details
}

/// Comment first when present, then approval.
pub fn staffing_details(item: &StaffingItem) -> String {
    let approval = format!("Approval: {}", yes_no(item.approved));
    if item.comment.is_empty() {
        approval
    } else {
        format!("Comment: {}\n{approval}", item.comment)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Lays out one page group per account onto a [`DocumentSink`].
pub struct ReportComposer {
    currency_symbol: String,
    standard: Table,
    staffing: Table,
}

impl ReportComposer {
    pub fn new(currency_symbol: impl Into<String>, line_height: Pt) -> Self {
        let style = TableStyle {
            line_height,
            ..TableStyle::default()
        };
        Self {
            currency_symbol: currency_symbol.into(),
            standard: Table::new(standard_columns(), style.clone()),
            staffing: Table::new(staffing_columns(), style),
        }
    }

    fn money(&self, amount: Decimal) -> String {
        format_currency(amount, &self.currency_symbol)
    }

    /// Renders every account in order, each starting on a fresh page.
    pub fn render(&self, sink: &mut DocumentSink, accounts: &[AccountSnapshot]) -> Result<()> {
        for snapshot in accounts {
            self.render_account(sink, snapshot)?;
        }
        Ok(())
    }

    /// Returns the grand total drawn for the account. Amounts outside the
    /// `Decimal` range fail before anything is drawn.
    pub fn render_account(
        &self,
        sink: &mut DocumentSink,
        snapshot: &AccountSnapshot,
    ) -> Result<Decimal> {
        let grand_total = snapshot.total_cost()?;
        let account = &snapshot.account;
        sink.clear_page_meta();
        sink.add_page();
        sink.page_meta(ACCOUNT_META_KEY, account.account_number.as_str());
        debug!(
            account = %account.account_number,
            items = snapshot.items.len(),
            "composing account"
        );

        self.title(sink, account);
        self.header_block(sink, account);

        let standard: Vec<&StandardItem> = snapshot.standard_items().collect();
        if !standard.is_empty() {
            self.caption(sink, STANDARD_CAPTION);
            self.standard.draw_header(sink);
            for item in &standard {
                // Every cost was checked by `total_cost`.
                let cost = item.cost().unwrap_or_default();
                let texts = [
                    standard_item_text(item),
                    format_count(item.quantity),
                    self.money(item.price.unwrap_or(Decimal::ZERO)),
                    self.money(cost),
                    standard_details(item),
                ];
                self.standard.draw_row(sink, &texts);
            }
            sink.ln(Some(Pt::from_mm(SECTION_GAP_MM)));
            debug!(rows = standard.len(), "standard items drawn");
        }

        let staffing: Vec<&StaffingItem> = snapshot.staffing_items().collect();
        if !staffing.is_empty() {
            self.caption(sink, STAFFING_CAPTION);
            self.staffing.draw_header(sink);
            for item in &staffing {
                let cost = item.cost().unwrap_or_default();
                let texts = [
                    item.name.clone(),
                    format_count(item.weeks),
                    format_count(item.days),
                    format_quantity(item.hours),
                    format_count(item.staff_count),
                    self.money(item.rate.unwrap_or(Decimal::ZERO)),
                    self.money(cost),
                    staffing_details(item),
                ];
                self.staffing.draw_row(sink, &texts);
            }
            sink.ln(Some(Pt::from_mm(SECTION_GAP_MM)));
            debug!(rows = staffing.len(), "staffing items drawn");
        }

        self.total_row(sink, grand_total);
        self.signature_block(sink, account);
        Ok(grand_total)
    }

    fn title(&self, sink: &mut DocumentSink, account: &BudgetAccount) {
        sink.set_font(FontStyle::Bold, Pt::from_f32(14.0));
        let title = format!("Budget: {}", account.budget_year);
        sink.cell(
            Pt::ZERO,
            Pt::from_mm(10.0),
            &title,
            false,
            CellLn::NextLine,
            TextAlign::Center,
            false,
        );
        sink.ln(Some(Pt::from_mm(SECTION_GAP_MM)));
    }

    fn header_block(&self, sink: &mut DocumentSink, account: &BudgetAccount) {
        field(
            sink,
            LABEL_WIDTH_MM,
            "Account Number: ",
            VALUE_WIDTH_MM,
            &account.account_number,
            CellLn::Right,
        );
        field(
            sink,
            SECOND_LABEL_WIDTH_MM,
            "Account Title: ",
            SECOND_VALUE_WIDTH_MM,
            &account.title,
            CellLn::NextLine,
        );
        field(
            sink,
            LABEL_WIDTH_MM,
            "Year End Estimate: ",
            VALUE_WIDTH_MM,
            &self.money(account.year_end_estimate),
            CellLn::Right,
        );
        field(
            sink,
            SECOND_LABEL_WIDTH_MM,
            "Proposed Budget: ",
            SECOND_VALUE_WIDTH_MM,
            &self.money(account.proposed_budget),
            CellLn::NextLine,
        );
        field(
            sink,
            LABEL_WIDTH_MM,
            "Location Name: ",
            VALUE_WIDTH_MM,
            &account.location_name,
            CellLn::NextLine,
        );
        sink.ln(Some(Pt::from_mm(SECTION_GAP_MM)));
    }

    fn caption(&self, sink: &mut DocumentSink, caption: &str) {
        let height = Pt::from_mm(10.0);
        // Keep the caption with the header band and at least one row.
        let style = self.standard.style();
        ensure_room(sink, height + style.header_height + style.line_height);
        sink.set_font(FontStyle::Bold, Pt::from_f32(12.0));
        sink.cell(Pt::ZERO, height, caption, false, CellLn::NextLine, TextAlign::Left, false);
    }

    fn total_row(&self, sink: &mut DocumentSink, total: Decimal) {
        let height = Pt::from_mm(FIELD_HEIGHT_MM);
        ensure_room(sink, height);
        sink.set_font(FontStyle::Bold, Pt::from_f32(12.0));
        sink.set_fill_color(Color::gray(230));
        let amount_width = Pt::from_mm(TOTAL_AMOUNT_WIDTH_MM);
        sink.cell(
            self.standard.width() - amount_width,
            height,
            TOTAL_LABEL,
            true,
            CellLn::Right,
            TextAlign::Right,
            true,
        );
        sink.cell(
            amount_width,
            height,
            &self.money(total),
            true,
            CellLn::NextLine,
            TextAlign::Right,
            true,
        );
    }

    fn signature_block(&self, sink: &mut DocumentSink, account: &BudgetAccount) {
        let gap = Pt::from_mm(SIGNATURE_GAP_MM);
        let height = Pt::from_mm(FIELD_HEIGHT_MM);
        if sink.fits(gap + height) {
            sink.ln(Some(gap));
        } else {
            ensure_room(sink, gap + height);
        }
        field(
            sink,
            SECOND_LABEL_WIDTH_MM,
            "Prepared By: ",
            SECOND_VALUE_WIDTH_MM,
            &account.prepared_by,
            CellLn::Right,
        );
        field(
            sink,
            SECOND_LABEL_WIDTH_MM,
            "Approved By: ",
            SECOND_VALUE_WIDTH_MM,
            SIGNATURE_LINE,
            CellLn::NextLine,
        );
    }
}

/// Bold label cell followed by a regular value cell, both one field high.
fn field(
    sink: &mut DocumentSink,
    label_mm: f32,
    label: &str,
    value_mm: f32,
    value: &str,
    ln: CellLn,
) {
    let height = Pt::from_mm(FIELD_HEIGHT_MM);
    sink.set_font(FontStyle::Bold, Pt::from_f32(10.0));
    sink.cell(Pt::from_mm(label_mm), height, label, false, CellLn::Right, TextAlign::Left, false);
    sink.set_font(FontStyle::Regular, Pt::from_f32(10.0));
    sink.cell(Pt::from_mm(value_mm), height, value, false, ln, TextAlign::Left, false);
}

/// Starts a continuation page when `height` no longer fits below the cursor.
fn ensure_room(sink: &mut DocumentSink, height: Pt) {
    if !sink.fits(height) && sink.get_y() > sink.layout().margins.top {
        warn!(page = sink.page_count(), "block does not fit; continuing on a new page");
        sink.add_page();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Document;
    use crate::font::FontMetrics;
    use crate::model::{LineItem, LineItemKind};
    use crate::sink::SinkLayout;
    use crate::types::{Margins, Size};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn sink() -> DocumentSink {
        DocumentSink::new(
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
        )
    }

    fn account(number: &str) -> BudgetAccount {
        BudgetAccount {
            id: 1,
            budget_year: 2025,
            title: "Aquatics".to_string(),
            account_number: number.to_string(),
            location_name: "North Pool".to_string(),
            year_end_estimate: dec!(1200),
            proposed_budget: dec!(25000),
            prepared_by: "J. Smith".to_string(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .expect("date"),
        }
    }

    fn pool_float() -> StandardItem {
        StandardItem {
            name: "Pool Float".to_string(),
            link: None,
            quantity: Some(10),
            price: Some(dec!(2.50)),
            comment: String::new(),
            purchased_on: None,
            approved: true,
        }
    }

    fn lifeguard() -> StaffingItem {
        StaffingItem {
            name: "Lifeguard".to_string(),
            weeks: Some(12),
            days: Some(6),
            hours: Some(dec!(8.00)),
            rate: Some(dec!(18.00)),
            staff_count: Some(2),
            comment: String::new(),
            approved: false,
        }
    }

    fn compose(snapshots: &[AccountSnapshot]) -> Document {
        let mut s = sink();
        ReportComposer::new("$", Pt::from_mm(6.0))
            .render(&mut s, snapshots)
            .expect("render");
        s.finish(None)
    }

    #[test]
    fn both_tables_span_the_full_table_width() {
        let style = TableStyle::default();
        for columns in [standard_columns(), staffing_columns()] {
            let width = Table::new(columns, style.clone()).width();
            assert!((width.to_mm() - crate::TABLE_WIDTH_MM).abs() < 0.01);
        }
    }

    #[test]
    fn standard_details_follow_fixed_order() {
        let mut item = pool_float();
        assert_eq!(standard_details(&item), "Approval: Yes");
        item.purchased_on = NaiveDate::from_ymd_opt(2025, 6, 1);
        item.comment = "blue".to_string();
        assert_eq!(
            standard_details(&item),
            "Approval: Yes\nPurchased: 06/01/2025\nComment: blue"
        );
    }

    #[test]
    fn staffing_details_put_comment_first() {
        let mut item = lifeguard();
        assert_eq!(staffing_details(&item), "Approval: No");
        item.comment = "certified".to_string();
        assert_eq!(staffing_details(&item), "Comment: certified\nApproval: No");
    }

    #[test]
    fn item_link_goes_on_second_line() {
        let mut item = pool_float();
        assert_eq!(standard_item_text(&item), "Pool Float");
        item.link = Some("https://shop.example/float".to_string());
        assert_eq!(standard_item_text(&item), "Pool Float\n(https://shop.example/float)");
        item.link = Some(String::new());
        assert_eq!(standard_item_text(&item), "Pool Float");
    }

    #[test]
    fn both_tables_and_grand_total_on_one_page() {
        let snapshot = AccountSnapshot::new(
            account("100-200"),
            vec![
                LineItem {
                    id: 1,
                    account_id: 1,
                    kind: LineItemKind::Standard(pool_float()),
                },
                LineItem {
                    id: 2,
                    account_id: 1,
                    kind: LineItemKind::Staffing(lifeguard()),
                },
            ],
        );
        let mut s = sink();
        let total = ReportComposer::new("$", Pt::from_mm(6.0))
            .render_account(&mut s, &snapshot)
            .expect("render");
        assert_eq!(total, dec!(20761));
        let doc = s.finish(None);
        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        for text in [
            "Budget: 2025",
            STANDARD_CAPTION,
            STAFFING_CAPTION,
            "$25.00",
            "$20,736.00",
            "$20,761.00",
            "$1,200.00",
            "$25,000.00",
            TOTAL_LABEL,
            SIGNATURE_LINE,
            "J. Smith",
        ] {
            assert!(page.contains_text(text), "missing {text}");
        }
        assert!(page.texts().any(|t| t == "8.00"));
        assert_eq!(page.meta_values(ACCOUNT_META_KEY).collect::<Vec<_>>(), vec!["100-200"]);
    }

    #[test]
    fn account_without_items_has_no_table_band() {
        let doc = compose(&[AccountSnapshot::new(account("100-200"), Vec::new())]);
        let page = &doc.pages[0];
        assert!(!page.contains_text(STANDARD_CAPTION));
        assert!(!page.contains_text(STAFFING_CAPTION));
        assert!(!page.contains_text("Details"));
        assert!(page.contains_text("$0.00"));
        assert!(page.contains_text("Prepared By:"));
    }

    #[test]
    fn each_account_starts_a_page() {
        let doc = compose(&[
            AccountSnapshot::new(account("100-200"), Vec::new()),
            AccountSnapshot::new(account("300-400"), Vec::new()),
            AccountSnapshot::new(account("500-600"), Vec::new()),
        ]);
        assert_eq!(doc.page_count(), 3);
        let numbers: Vec<&str> = doc
            .pages
            .iter()
            .flat_map(|page| page.meta_values(ACCOUNT_META_KEY))
            .collect();
        assert_eq!(numbers, vec!["100-200", "300-400", "500-600"]);
    }

    #[test]
    fn long_tables_continue_on_pages_of_the_same_account() {
        let items: Vec<LineItem> = (1..=60)
            .map(|id| LineItem {
                id,
                account_id: 1,
                kind: LineItemKind::Standard(pool_float()),
            })
            .collect();
        let doc = compose(&[AccountSnapshot::new(account("100-200"), items)]);
        assert!(doc.page_count() > 1);
        for page in &doc.pages {
            assert_eq!(page.meta_values(ACCOUNT_META_KEY).collect::<Vec<_>>(), vec!["100-200"]);
        }
        let last = doc.pages.last().expect("page");
        assert!(last.contains_text("$1,500.00"));
        assert!(last.contains_text(SIGNATURE_LINE));
    }

    #[test]
    fn out_of_range_costs_fail_before_drawing() {
        let mut item = lifeguard();
        item.weeks = Some(2_147_483_647);
        item.days = Some(2_147_483_647);
        item.staff_count = Some(2_147_483_647);
        item.hours = Some(dec!(99999999.99));
        item.rate = Some(dec!(9999999999999.99));
        let snapshot = AccountSnapshot::new(
            account("100-200"),
            vec![LineItem {
                id: 1,
                account_id: 1,
                kind: LineItemKind::Staffing(item),
            }],
        );
        let mut s = sink();
        let err = ReportComposer::new("$", Pt::from_mm(6.0))
            .render_account(&mut s, &snapshot)
            .expect_err("overflow");
        assert!(matches!(err, crate::error::ReportError::InvalidInput(_)));
        assert_eq!(s.page_count(), 0);
    }
}
