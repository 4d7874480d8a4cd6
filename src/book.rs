use crate::error::{ReportError, Result};
use crate::model::{AccountSnapshot, BudgetAccount, LineItem, LineItemKind, checked_total};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Which accounts a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Account(u32),
    /// Every account of the year, ordered by account number.
    Year(i32),
}

impl Selection {
    /// Parses request parameters: `accountId=<id>`, or `accountId=all` with
    /// `budgetYear=<year>`.
    pub fn from_params(account_id: &str, budget_year: Option<&str>) -> Result<Self> {
        let account_id = account_id.trim();
        if account_id == "all" {
            let raw = budget_year.map(str::trim).unwrap_or_default();
            let year = raw
                .parse::<i32>()
                .ok()
                .filter(|year| *year != 0)
                .ok_or_else(|| {
                    ReportError::Selection(format!("invalid budget year for bulk export: {raw:?}"))
                })?;
            return Ok(Selection::Year(year));
        }
        account_id
            .parse::<u32>()
            .ok()
            .filter(|id| *id != 0)
            .map(Selection::Account)
            .ok_or_else(|| ReportError::Selection(format!("invalid account id: {account_id:?}")))
    }
}

/// Identity of a submitted item row: a stored item or a placeholder for a
/// row added in the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Existing(u32),
    New(String),
}

impl RowKey {
    /// Numeric keys refer to stored items, anything else is a new row.
    pub fn parse(key: &str) -> Self {
        match key.trim().parse::<u32>() {
            Ok(id) if id > 0 => RowKey::Existing(id),
            _ => RowKey::New(key.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemRow {
    pub key: RowKey,
    pub kind: LineItemKind,
}

/// Submitted add/edit form for one account and its item rows.
#[derive(Debug, Clone)]
pub struct AccountForm {
    /// `None` creates a new account.
    pub id: Option<u32>,
    pub budget_year: i32,
    pub title: String,
    pub account_number: String,
    pub location_name: String,
    pub year_end_estimate: Decimal,
    pub proposed_budget: Decimal,
    pub prepared_by: String,
    pub items: Vec<ItemRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortColumn {
    Title,
    Year,
    Location,
    ProposedBudget,
    #[default]
    AccountNumber,
}

impl SortColumn {
    /// Unknown names fall back to the account number.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "account_title" | "title" => SortColumn::Title,
            "budget_year" | "year" => SortColumn::Year,
            "location_name" | "location" => SortColumn::Location,
            "proposed_budget" => SortColumn::ProposedBudget,
            _ => SortColumn::AccountNumber,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub year: Option<i32>,
    pub location: Option<String>,
    pub order_by: SortColumn,
    pub order: SortOrder,
}

/// In-memory account store with JSON persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetBook {
    #[serde(default)]
    accounts: Vec<BudgetAccount>,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    locations: BTreeSet<String>,
    #[serde(default)]
    next_account_id: u32,
    #[serde(default)]
    next_item_id: u32,
}

impl BudgetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let book: BudgetBook = serde_json::from_str(json)?;
        for item in &book.items {
            if book.account(item.account_id).is_none() {
                return Err(ReportError::InvalidInput(format!(
                    "item {} belongs to unknown account {}",
                    item.id, item.account_id
                )));
            }
        }
        for account in &book.accounts {
            checked_total(book.items_for(account.id).into_iter().map(|item| &item.kind))?;
        }
        Ok(book)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let book = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            accounts = book.accounts.len(),
            items = book.items.len(),
            "book loaded"
        );
        Ok(book)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn accounts(&self) -> &[BudgetAccount] {
        &self.accounts
    }

    pub fn account(&self, id: u32) -> Option<&BudgetAccount> {
        self.accounts.iter().find(|account| account.id == id)
    }

    /// Items of one account in creation order.
    pub fn items_for(&self, account_id: u32) -> Vec<&LineItem> {
        let mut items: Vec<&LineItem> = self
            .items
            .iter()
            .filter(|item| item.account_id == account_id)
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    pub fn snapshot(&self, account_id: u32) -> Option<AccountSnapshot> {
        let account = self.account(account_id)?.clone();
        let items = self.items_for(account_id).into_iter().cloned().collect();
        Some(AccountSnapshot::new(account, items))
    }

    /// Resolves a selection into report input. Fails when nothing matches.
    pub fn select(&self, selection: &Selection) -> Result<Vec<AccountSnapshot>> {
        let snapshots: Vec<AccountSnapshot> = match *selection {
            Selection::Account(id) => self.snapshot(id).into_iter().collect(),
            Selection::Year(year) => {
                let mut accounts: Vec<&BudgetAccount> = self
                    .accounts
                    .iter()
                    .filter(|account| account.budget_year == year)
                    .collect();
                accounts.sort_by(|a, b| compare_by(SortColumn::AccountNumber, a, b));
                accounts
                    .into_iter()
                    .filter_map(|account| self.snapshot(account.id))
                    .collect()
            }
        };
        if snapshots.is_empty() {
            return Err(ReportError::Selection(match selection {
                Selection::Account(id) => format!("no account found with id {id}"),
                Selection::Year(year) => format!("no accounts found for budget year {year}"),
            }));
        }
        Ok(snapshots)
    }

    /// Registered location names in alphabetical order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(String::as_str)
    }

    pub fn register_location(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.locations.insert(name.to_string());
        }
    }

    pub fn list(&self, filter: &ListFilter) -> Vec<&BudgetAccount> {
        let mut accounts: Vec<&BudgetAccount> = self
            .accounts
            .iter()
            .filter(|account| filter.year.is_none_or(|year| account.budget_year == year))
            .filter(|account| {
                filter
                    .location
                    .as_deref()
                    .filter(|location| !location.is_empty())
                    .is_none_or(|location| account.location_name == location)
            })
            .collect();
        accounts.sort_by(|a, b| {
            let ord = compare_by(filter.order_by, a, b);
            match filter.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        accounts
    }

    /// Inserts or updates an account and reconciles its items with the
    /// submitted rows. Returns the account id.
    pub fn save_account(&mut self, form: AccountForm, now: NaiveDateTime) -> Result<u32> {
        // Rejected rows must not leave a half-saved account behind.
        checked_total(
            form.items
                .iter()
                .map(|row| &row.kind)
                .filter(|kind| !kind.name().trim().is_empty()),
        )?;
        let location_name = form.location_name.trim().to_string();
        let account_id = match form.id {
            Some(id) => {
                let account = self
                    .accounts
                    .iter_mut()
                    .find(|account| account.id == id)
                    .ok_or_else(|| ReportError::InvalidInput(format!("account {id} not found")))?;
                account.budget_year = form.budget_year;
                account.title = form.title.trim().to_string();
                account.account_number = form.account_number.trim().to_string();
                account.location_name = location_name.clone();
                account.year_end_estimate = form.year_end_estimate;
                account.proposed_budget = form.proposed_budget;
                account.prepared_by = form.prepared_by.trim().to_string();
                id
            }
            None => {
                let id = self.allocate_account_id();
                self.accounts.push(BudgetAccount {
                    id,
                    budget_year: form.budget_year,
                    title: form.title.trim().to_string(),
                    account_number: form.account_number.trim().to_string(),
                    location_name: location_name.clone(),
                    year_end_estimate: form.year_end_estimate,
                    proposed_budget: form.proposed_budget,
                    prepared_by: form.prepared_by.trim().to_string(),
                    created_at: now,
                });
                id
            }
        };
        self.register_location(&location_name);

        let existing: BTreeSet<u32> = self
            .items
            .iter()
            .filter(|item| item.account_id == account_id)
            .map(|item| item.id)
            .collect();
        let mut kept: BTreeSet<u32> = BTreeSet::new();

        for row in form.items {
            let mut kind = row.kind;
            let name = kind.name().trim().to_string();
            if name.is_empty() {
                continue;
            }
            match &mut kind {
                LineItemKind::Standard(item) => item.name = name,
                LineItemKind::Staffing(item) => item.name = name,
            }
            match row.key {
                RowKey::Existing(id) if existing.contains(&id) && !kept.contains(&id) => {
                    if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
                        item.kind = kind;
                    }
                    kept.insert(id);
                }
                _ => {
                    let id = self.allocate_item_id();
                    self.items.push(LineItem {
                        id,
                        account_id,
                        kind,
                    });
                    kept.insert(id);
                }
            }
        }

        let before = self.items.len();
        self.items
            .retain(|item| item.account_id != account_id || kept.contains(&item.id));
        debug!(
            account_id,
            kept = kept.len(),
            removed = before - self.items.len(),
            "account saved"
        );
        Ok(account_id)
    }

    /// Removes an account together with its items.
    pub fn delete_account(&mut self, id: u32) -> Result<()> {
        let before = self.accounts.len();
        self.accounts.retain(|account| account.id != id);
        if self.accounts.len() == before {
            return Err(ReportError::InvalidInput(format!("account {id} not found")));
        }
        self.items.retain(|item| item.account_id != id);
        Ok(())
    }

    /// Copies one account into `new_year`. Returns the new account id.
    pub fn duplicate_account(&mut self, id: u32, new_year: i32, now: NaiveDateTime) -> Result<u32> {
        if new_year == 0 {
            return Err(ReportError::InvalidInput(
                "missing information for duplication".to_string(),
            ));
        }
        let source = self
            .account(id)
            .cloned()
            .ok_or_else(|| ReportError::InvalidInput(format!("original account {id} not found")))?;
        let copy = BudgetAccount {
            budget_year: new_year,
            ..source
        };
        let new_id = self.copy_account(id, copy, now);
        info!(source = id, new_id, new_year, "account duplicated");
        Ok(new_id)
    }

    /// Copies every account of `from` into `to`. Returns the new ids.
    pub fn duplicate_year(&mut self, from: i32, to: i32, now: NaiveDateTime) -> Result<Vec<u32>> {
        if from == 0 || to == 0 || from == to {
            return Err(ReportError::InvalidInput(
                "invalid source or destination year for bulk duplication".to_string(),
            ));
        }
        let sources: Vec<BudgetAccount> = self
            .accounts
            .iter()
            .filter(|account| account.budget_year == from)
            .cloned()
            .collect();
        if sources.is_empty() {
            return Err(ReportError::Selection(format!(
                "no accounts found for budget year {from}"
            )));
        }
        let ids: Vec<u32> = sources
            .into_iter()
            .map(|source| {
                let source_id = source.id;
                let copy = BudgetAccount {
                    budget_year: to,
                    ..source
                };
                self.copy_account(source_id, copy, now)
            })
            .collect();
        info!(from, to, accounts = ids.len(), "budget year duplicated");
        Ok(ids)
    }

    /// Copies the accounts of one location into another location of the same
    /// year. Returns the new ids.
    pub fn duplicate_location(
        &mut self,
        year: i32,
        from: &str,
        to: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<u32>> {
        let (from, to) = (from.trim(), to.trim());
        if year == 0 || from.is_empty() || to.is_empty() || from == to {
            return Err(ReportError::InvalidInput(
                "source and destination locations must differ".to_string(),
            ));
        }
        self.register_location(to);
        let sources: Vec<BudgetAccount> = self
            .accounts
            .iter()
            .filter(|account| account.budget_year == year && account.location_name == from)
            .cloned()
            .collect();
        if sources.is_empty() {
            return Err(ReportError::Selection(format!(
                "no accounts found for {from} in {year}"
            )));
        }
        let ids: Vec<u32> = sources
            .into_iter()
            .map(|source| {
                let source_id = source.id;
                let copy = BudgetAccount {
                    location_name: to.to_string(),
                    ..source
                };
                self.copy_account(source_id, copy, now)
            })
            .collect();
        info!(year, from, to, accounts = ids.len(), "location duplicated");
        Ok(ids)
    }

    /// Stores `copy` as a new account and copies the items of `source_id`
    /// with purchase state and approval cleared.
    fn copy_account(&mut self, source_id: u32, copy: BudgetAccount, now: NaiveDateTime) -> u32 {
        let new_id = self.allocate_account_id();
        self.accounts.push(BudgetAccount {
            id: new_id,
            year_end_estimate: Decimal::ZERO,
            created_at: now,
            ..copy
        });
        let kinds: Vec<LineItemKind> = self
            .items_for(source_id)
            .into_iter()
            .map(|item| reset_for_copy(item.kind.clone()))
            .collect();
        for kind in kinds {
            let id = self.allocate_item_id();
            self.items.push(LineItem {
                id,
                account_id: new_id,
                kind,
            });
        }
        new_id
    }

    fn allocate_account_id(&mut self) -> u32 {
        let max_used = self.accounts.iter().map(|a| a.id).max().unwrap_or(0);
        let id = self.next_account_id.max(max_used + 1);
        self.next_account_id = id + 1;
        id
    }

    fn allocate_item_id(&mut self) -> u32 {
        let max_used = self.items.iter().map(|i| i.id).max().unwrap_or(0);
        let id = self.next_item_id.max(max_used + 1);
        self.next_item_id = id + 1;
        id
    }
}

fn reset_for_copy(kind: LineItemKind) -> LineItemKind {
    match kind {
        LineItemKind::Standard(mut item) => {
            item.purchased_on = None;
            item.approved = false;
            LineItemKind::Standard(item)
        }
        LineItemKind::Staffing(mut item) => {
            item.approved = false;
            LineItemKind::Staffing(item)
        }
    }
}

fn compare_by(column: SortColumn, a: &BudgetAccount, b: &BudgetAccount) -> Ordering {
    match column {
        SortColumn::Title => collate(&a.title, &b.title),
        SortColumn::Year => a.budget_year.cmp(&b.budget_year),
        SortColumn::Location => collate(&a.location_name, &b.location_name),
        SortColumn::ProposedBudget => a.proposed_budget.cmp(&b.proposed_budget),
        SortColumn::AccountNumber => collate(&a.account_number, &b.account_number),
    }
}

/// Case-insensitive text order; byte order only breaks exact ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}
