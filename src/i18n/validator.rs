//! Translation quality validation.
//!
//! Compares a translated bundle against the canonical-language bundle for the
//! same namespace and reports structural problems. Nothing here blocks
//! loading; the report feeds tooling and the quality endpoint.

use crate::i18n::bundle::{Entry, TranslationBundle};
use crate::i18n::plural::{self, PluralCategory};
use crate::i18n::resolver::placeholders;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub language: String,
    pub namespace: String,

    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,

    /// Reference keys with a non-empty translation, as a percentage
    pub completeness: f64,
    pub reference_keys: usize,
    pub translated_keys: usize,
}

impl ValidationReport {
    fn new(translated: &TranslationBundle) -> Self {
        Self {
            language: translated.language.code().to_string(),
            namespace: translated.namespace.to_string(),
            errors: Vec::new(),
            warnings: Vec::new(),
            completeness: 100.0,
            reference_keys: 0,
            translated_keys: 0,
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for bundle quality.
pub struct TranslationValidator;

impl TranslationValidator {
    /// Validate `translated` against `reference`.
    ///
    /// Errors: missing keys, unbalanced `{{`/`}}`, incomplete plural objects.
    /// Warnings: extra keys, empty values, placeholder mismatches.
    pub fn validate(reference: &TranslationBundle, translated: &TranslationBundle) -> ValidationReport {
        let mut report = ValidationReport::new(translated);

        let reference_leaves: BTreeMap<String, &Entry> = reference.leaves().into_iter().collect();
        let translated_leaves: BTreeMap<String, &Entry> = translated.leaves().into_iter().collect();

        for (key, reference_entry) in &reference_leaves {
            match translated_leaves.get(key) {
                None => report.errors.push(format!("Missing key: {}", key)),
                Some(entry) => {
                    if is_empty(entry) {
                        report.warnings.push(format!("Empty value: {}", key));
                        continue;
                    }
                    report.translated_keys += 1;
                    if let (Some(expected), Some(actual)) = (reference_entry.as_text(), entry.as_text()) {
                        Self::check_placeholders(key, expected, actual, &mut report);
                    }
                }
            }
        }

        for (key, entry) in &translated_leaves {
            if !reference_leaves.contains_key(key) {
                report.warnings.push(format!("Extra key: {}", key));
            }
            if let Some(text) = entry.as_text() {
                if !braces_balanced(text) {
                    report
                        .errors
                        .push(format!("Unmatched braces in interpolation: {}", key));
                }
            }
        }

        Self::check_plurals(translated, &mut report);

        report.reference_keys = reference_leaves.len();
        report.completeness = if reference_leaves.is_empty() {
            100.0
        } else {
            report.translated_keys as f64 / reference_leaves.len() as f64 * 100.0
        };

        report
    }

    fn check_placeholders(key: &str, expected: &str, actual: &str, report: &mut ValidationReport) {
        let expected = placeholders(expected);
        let actual = placeholders(actual);
        for missing in expected.difference(&actual) {
            report.warnings.push(format!(
                "Missing interpolation parameter '{}' in: {}",
                missing, key
            ));
        }
        for extra in actual.difference(&expected) {
            report.warnings.push(format!(
                "Extra interpolation parameter '{}' in: {}",
                extra, key
            ));
        }
    }

    /// Every plural object needs `other`, and `one` where the language
    /// distinguishes a singular.
    fn check_plurals(bundle: &TranslationBundle, report: &mut ValidationReport) {
        let needs_one = plural::category(bundle.language, 1) == PluralCategory::One;
        let mut stack: Vec<(String, &BTreeMap<String, Entry>)> = vec![(String::new(), &bundle.entries)];

        while let Some((path, children)) = stack.pop() {
            if !children.is_empty() && children.keys().all(|k| plural::is_category_key(k)) {
                let keys: BTreeSet<&str> = children.keys().map(String::as_str).collect();
                let mut required = vec!["other"];
                if needs_one {
                    required.push("one");
                }
                for form in required {
                    if !keys.contains(form) {
                        report
                            .errors
                            .push(format!("Plural form '{}' missing in: {}", form, path));
                    }
                }
                continue;
            }

            for (key, child) in children {
                if let Entry::Node(grandchildren) = child {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    stack.push((child_path, grandchildren));
                }
            }
        }
    }
}

fn is_empty(entry: &Entry) -> bool {
    match entry {
        Entry::Text(text) => text.trim().is_empty(),
        Entry::List(items) => items.is_empty(),
        Entry::Node(children) => children.is_empty(),
    }
}

fn braces_balanced(text: &str) -> bool {
    text.matches("{{").count() == text.matches("}}").count()
}
