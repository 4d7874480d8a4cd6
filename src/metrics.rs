use crate::canvas::{Command, Document};
use crate::report::ACCOUNT_META_KEY;

#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub command_count: usize,
    pub text_count: usize,
    /// Account numbers laid out on this page.
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub account_count: usize,
    pub layout_ms: f64,
    pub serialize_ms: f64,
    pub total_bytes: usize,
}

impl DocumentMetrics {
    pub(crate) fn from_document(doc: &Document) -> Self {
        let pages = doc
            .pages
            .iter()
            .enumerate()
            .map(|(idx, page)| PageMetrics {
                page_number: idx + 1,
                command_count: page.commands.len(),
                text_count: page
                    .commands
                    .iter()
                    .filter(|cmd| matches!(cmd, Command::DrawString { .. }))
                    .count(),
                accounts: page.meta_values(ACCOUNT_META_KEY).map(str::to_string).collect(),
            })
            .collect();
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages spent on `account_number`, continuation pages included.
    pub fn pages_for_account(&self, account_number: &str) -> usize {
        self.pages
            .iter()
            .filter(|page| page.accounts.iter().any(|a| a == account_number))
            .count()
    }
}
