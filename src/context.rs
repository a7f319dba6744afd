//! Per-page extraction context.
//!
//! Holds the injected configuration and collects diagnostics for one page
//! walk. Nothing here outlives the page, so workers never share state.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::config::Edition;
use crate::templates::TemplateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem noticed while walking a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable identifier of the check that fired (`unknown-section`, ...).
    pub code: &'static str,
    pub message: String,
    pub page: String,
    pub section: String,
    pub subsection: String,
}

pub struct ExtractContext<'a> {
    pub edition: &'a Edition,
    pub templates: &'a TemplateStore,
    pub page_title: String,
    section: RefCell<String>,
    subsection: RefCell<String>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    expansions: Cell<usize>,
    reported: RefCell<HashSet<(&'static str, String)>>,
}

/// Template expansions allowed while walking one page.
pub const MAX_PAGE_EXPANSIONS: usize = 5000;

impl<'a> ExtractContext<'a> {
    pub fn new(edition: &'a Edition, templates: &'a TemplateStore, page_title: &str) -> Self {
        ExtractContext {
            edition,
            templates,
            page_title: page_title.to_string(),
            section: RefCell::new(String::new()),
            subsection: RefCell::new(String::new()),
            diagnostics: RefCell::new(Vec::new()),
            expansions: Cell::new(0),
            reported: RefCell::new(HashSet::new()),
        }
    }

    /// Enter a language block.
    pub fn start_section(&self, name: &str) {
        *self.section.borrow_mut() = name.to_string();
        self.subsection.borrow_mut().clear();
    }

    /// Enter a heading inside the current language block.
    pub fn start_subsection(&self, name: &str) {
        *self.subsection.borrow_mut() = name.to_string();
    }

    pub fn debug(&self, code: &'static str, message: impl Into<String>) {
        self.record(Severity::Debug, code, message.into());
    }

    pub fn warning(&self, code: &'static str, message: impl Into<String>) {
        self.record(Severity::Warning, code, message.into());
    }

    /// Warn about `subject` at most once per page for each code.
    pub fn warning_once(&self, code: &'static str, subject: &str, message: impl Into<String>) {
        if self.reported.borrow_mut().insert((code, subject.to_string())) {
            self.warning(code, message);
        }
    }

    /// Count one template expansion against the page budget; false once
    /// the budget is spent.
    pub fn take_expansion(&self) -> bool {
        let used = self.expansions.get();
        if used >= MAX_PAGE_EXPANSIONS {
            return false;
        }
        self.expansions.set(used + 1);
        true
    }

    pub fn expansions(&self) -> usize {
        self.expansions.get()
    }

    pub fn error(&self, code: &'static str, message: impl Into<String>) {
        self.record(Severity::Error, code, message.into());
    }

    fn record(&self, severity: Severity, code: &'static str, message: String) {
        let section = self.section.borrow().clone();
        let subsection = self.subsection.borrow().clone();
        match severity {
            Severity::Debug => tracing::debug!(
                page = %self.page_title, %section, %subsection, code, "{}", message
            ),
            Severity::Warning => tracing::warn!(
                page = %self.page_title, %section, %subsection, code, "{}", message
            ),
            Severity::Error => tracing::error!(
                page = %self.page_title, %section, %subsection, code, "{}", message
            ),
        }
        self.diagnostics.borrow_mut().push(Diagnostic {
            severity,
            code,
            message,
            page: self.page_title.clone(),
            section,
            subsection,
        });
    }

    pub fn diagnostics_len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}
