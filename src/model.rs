use crate::error::{ReportError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// One yearly budget account as stored by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAccount {
    pub id: u32,
    pub budget_year: i32,
    pub title: String,
    pub account_number: String,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub year_end_estimate: Decimal,
    #[serde(default)]
    pub proposed_budget: Decimal,
    #[serde(default)]
    pub prepared_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub comment: String,
    /// `None` when nothing was purchased yet. The stored sentinel
    /// `0000-00-00` and empty strings both load as `None`.
    #[serde(default, deserialize_with = "purchase_date")]
    pub purchased_on: Option<NaiveDate>,
    #[serde(default)]
    pub approved: bool,
}

impl StandardItem {
    /// quantity x price, nulls count as zero. `None` when the product
    /// overflows.
    pub fn cost(&self) -> Option<Decimal> {
        Decimal::from(self.quantity.unwrap_or(0))
            .checked_mul(self.price.unwrap_or(Decimal::ZERO))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingItem {
    /// Position or role.
    pub name: String,
    #[serde(default)]
    pub weeks: Option<i64>,
    /// Days per week.
    #[serde(default)]
    pub days: Option<i64>,
    /// Hours per day.
    #[serde(default)]
    pub hours: Option<Decimal>,
    /// Hourly rate.
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub staff_count: Option<i64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
}

impl StaffingItem {
    /// weeks x days x hours x rate x headcount, nulls count as zero. `None`
    /// when the product overflows.
    pub fn cost(&self) -> Option<Decimal> {
        Decimal::from(self.weeks.unwrap_or(0))
            .checked_mul(Decimal::from(self.days.unwrap_or(0)))?
            .checked_mul(self.hours.unwrap_or(Decimal::ZERO))?
            .checked_mul(self.rate.unwrap_or(Decimal::ZERO))?
            .checked_mul(Decimal::from(self.staff_count.unwrap_or(0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum LineItemKind {
    Standard(StandardItem),
    Staffing(StaffingItem),
}

impl LineItemKind {
    pub fn cost(&self) -> Option<Decimal> {
        match self {
            LineItemKind::Standard(item) => item.cost(),
            LineItemKind::Staffing(item) => item.cost(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LineItemKind::Standard(item) => &item.name,
            LineItemKind::Staffing(item) => &item.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: u32,
    pub account_id: u32,
    #[serde(flatten)]
    pub kind: LineItemKind,
}

/// Read-only view of one account and its items in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub account: BudgetAccount,
    pub items: Vec<LineItem>,
}

impl AccountSnapshot {
    /// Items are sorted by id so the report follows creation order.
    pub fn new(account: BudgetAccount, mut items: Vec<LineItem>) -> Self {
        items.sort_by_key(|item| item.id);
        Self { account, items }
    }

    pub fn standard_items(&self) -> impl Iterator<Item = &StandardItem> {
        self.items.iter().filter_map(|item| match &item.kind {
            LineItemKind::Standard(standard) => Some(standard),
            LineItemKind::Staffing(_) => None,
        })
    }

    pub fn staffing_items(&self) -> impl Iterator<Item = &StaffingItem> {
        self.items.iter().filter_map(|item| match &item.kind {
            LineItemKind::Staffing(staffing) => Some(staffing),
            LineItemKind::Standard(_) => None,
        })
    }

    /// Sum of every item cost. Fails with [`ReportError::InvalidInput`] when
    /// a cost or the running total leaves the `Decimal` range.
    pub fn total_cost(&self) -> Result<Decimal> {
        checked_total(self.items.iter().map(|item| &item.kind))
    }
}

/// Adds up item costs without panicking on overflow.
pub(crate) fn checked_total<'a>(
    kinds: impl IntoIterator<Item = &'a LineItemKind>,
) -> Result<Decimal> {
    kinds.into_iter().try_fold(Decimal::ZERO, |total, kind| {
        kind.cost()
            .and_then(|cost| total.checked_add(cost))
            .ok_or_else(|| {
                ReportError::InvalidInput(format!("cost of item {:?} is out of range", kind.name()))
            })
    })
}

fn purchase_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("0000-00-00") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Two decimals with comma thousands grouping, symbol first: `$20,736.00`.
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let body = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{symbol}{sign}{}.{frac_part}", group_digits(int_part, ','))
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

/// Integer multiplier as printed in a table cell; null prints empty.
pub fn format_count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Decimal multiplier at its stored precision of two places (`8.00`).
pub fn format_quantity(value: Option<Decimal>) -> String {
    value
        .map(|v| {
            let rounded = v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.2}")
        })
        .unwrap_or_default()
}
