//! Field-level validation
//!
//! Checks a record's metadata against the current field definitions. Each
//! constraint family is a [`FieldRule`]; the [`Validator`] runs the chain for
//! every defined field that carries a non-blank value.

use crate::config::LockConfig;
use crate::core::{FieldId, FieldValue};
use crate::model::{FieldDefinition, FieldType, ListConstraints};
use im::OrdMap;
use log::warn;
use lru::LruCache;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("Value is required")]
    Required,

    #[error("Expected a {expected} value, got {actual}")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Value does not match pattern '{pattern}'")]
    PatternMismatch { pattern: String },

    #[error("Must be at least {min} characters")]
    TooShort { min: usize },

    #[error("Must be at most {max} characters")]
    TooLong { max: usize },

    #[error("Must be at least {min}")]
    BelowMinimum { min: f64 },

    #[error("Must be at most {max}")]
    AboveMaximum { max: f64 },

    #[error("'{value}' is not one of the allowed options")]
    NotAnOption { value: String },

    #[error("Must contain at least {min} items")]
    TooFewItems { min: usize },

    #[error("Must contain at most {max} items")]
    TooManyItems { max: usize },

    #[error("Duplicate item '{item}'")]
    DuplicateItem { item: String },

    #[error("Item {index}: {issue}")]
    Item {
        index: usize,
        issue: Box<ValidationIssue>,
    },
}

/// Issues per field. Fields without issues are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    issues: BTreeMap<FieldId, Vec<ValidationIssue>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_for(&self, field: &FieldId) -> &[ValidationIssue] {
        self.issues.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldId> {
        self.issues.keys()
    }

    pub fn issue_count(&self) -> usize {
        self.issues.values().map(Vec::len).sum()
    }
}

/// Compiled patterns, shared by every rule that matches text.
pub struct PatternCache {
    compiled: Mutex<LruCache<String, Option<Regex>>>,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            compiled: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `None` if the pattern itself does not compile; such a constraint is
    /// skipped rather than failing every value.
    pub fn is_match(&self, pattern: &str, text: &str) -> Option<bool> {
        let mut compiled = self
            .compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let regex = compiled.get_or_insert_ref(pattern, || match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("Ignoring invalid validation pattern '{}': {}", pattern, err);
                None
            }
        });
        regex.as_ref().map(|regex| regex.is_match(text))
    }
}

/// One constraint family (Chain of Responsibility)
pub trait FieldRule: Send + Sync {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    );
}

/// Value shape must match the definition's type tag
#[derive(Debug, Clone, Default)]
pub struct TypeRule;

impl FieldRule for TypeRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        _patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let matches = match definition.field_type {
            FieldType::Text | FieldType::Select => matches!(value, FieldValue::Text(_)),
            FieldType::Number => matches!(value, FieldValue::Number(_)),
            FieldType::Boolean => matches!(value, FieldValue::Boolean(_)),
            FieldType::List => matches!(value, FieldValue::TextList(_)),
        };
        if !matches {
            issues.push(ValidationIssue::WrongType {
                expected: definition.field_type.name(),
                actual: value.type_name(),
            });
        }
    }
}

/// Character-length bounds on text
#[derive(Debug, Clone, Default)]
pub struct LengthRule;

impl FieldRule for LengthRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        _patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(text) = value.as_str() else { return };
        let length = text.chars().count();
        let constraints = &definition.constraints;

        if let Some(min) = constraints.min_length {
            if length < min {
                issues.push(ValidationIssue::TooShort { min });
            }
        }
        if let Some(max) = constraints.max_length {
            if length > max {
                issues.push(ValidationIssue::TooLong { max });
            }
        }
    }
}

/// Regex constraint on text
#[derive(Debug, Clone, Default)]
pub struct PatternRule;

impl FieldRule for PatternRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let (Some(pattern), Some(text)) = (definition.constraints.pattern.as_deref(), value.as_str())
        else {
            return;
        };
        if patterns.is_match(pattern, text) == Some(false) {
            issues.push(ValidationIssue::PatternMismatch {
                pattern: pattern.to_string(),
            });
        }
    }
}

/// Numeric range
#[derive(Debug, Clone, Default)]
pub struct RangeRule;

impl FieldRule for RangeRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        _patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(number) = value.as_f64() else { return };
        let constraints = &definition.constraints;

        if let Some(min) = constraints.min {
            if number < min {
                issues.push(ValidationIssue::BelowMinimum { min });
            }
        }
        if let Some(max) = constraints.max {
            if number > max {
                issues.push(ValidationIssue::AboveMaximum { max });
            }
        }
    }
}

/// Enumerated options of select fields
#[derive(Debug, Clone, Default)]
pub struct OptionsRule;

impl FieldRule for OptionsRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        _patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let options = &definition.constraints.options;
        if definition.field_type != FieldType::Select || options.is_empty() {
            return;
        }
        if let Some(text) = value.as_str() {
            if !options.iter().any(|option| option == text) {
                issues.push(ValidationIssue::NotAnOption {
                    value: text.to_string(),
                });
            }
        }
    }
}

/// Item count, uniqueness and per-item constraints of list fields
#[derive(Debug, Clone, Default)]
pub struct ListRule;

impl FieldRule for ListRule {
    fn check(
        &self,
        definition: &FieldDefinition,
        value: &FieldValue,
        patterns: &PatternCache,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let (Some(list), Some(items)) = (definition.constraints.list.as_ref(), value.as_list())
        else {
            return;
        };

        if let Some(min) = list.min_items {
            if items.len() < min {
                issues.push(ValidationIssue::TooFewItems { min });
            }
        }
        if let Some(max) = list.max_items {
            if items.len() > max {
                issues.push(ValidationIssue::TooManyItems { max });
            }
        }
        if list.unique {
            let mut seen = HashSet::new();
            for item in items {
                if !seen.insert(item.as_str()) {
                    issues.push(ValidationIssue::DuplicateItem { item: item.clone() });
                }
            }
        }

        for (index, item) in items.iter().enumerate() {
            if let Some(issue) = check_list_item(list, item, patterns) {
                issues.push(ValidationIssue::Item {
                    index,
                    issue: Box::new(issue),
                });
            }
        }
    }
}

fn check_list_item(
    list: &ListConstraints,
    item: &str,
    patterns: &PatternCache,
) -> Option<ValidationIssue> {
    if let Some(max) = list.item_max_length {
        if item.chars().count() > max {
            return Some(ValidationIssue::TooLong { max });
        }
    }
    if let Some(pattern) = list.item_pattern.as_deref() {
        if patterns.is_match(pattern, item) == Some(false) {
            return Some(ValidationIssue::PatternMismatch {
                pattern: pattern.to_string(),
            });
        }
    }
    if !list.item_options.is_empty() && !list.item_options.iter().any(|option| option == item) {
        return Some(ValidationIssue::NotAnOption {
            value: item.to_string(),
        });
    }
    None
}

/// Runs the rule chain over a record's metadata.
pub struct Validator {
    rules: Vec<Box<dyn FieldRule>>,
    patterns: PatternCache,
}

impl Validator {
    pub fn new(regex_cache_capacity: usize) -> Self {
        Self {
            rules: vec![
                Box::new(TypeRule),
                Box::new(LengthRule),
                Box::new(PatternRule),
                Box::new(RangeRule),
                Box::new(OptionsRule),
                Box::new(ListRule),
            ],
            patterns: PatternCache::new(regex_cache_capacity),
        }
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self::new(config.regex_cache_capacity)
    }

    /// Appends a custom rule to the end of the chain.
    pub fn with_rule(mut self, rule: Box<dyn FieldRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(
        &self,
        metadata: &OrdMap<FieldId, Arc<FieldValue>>,
        definitions: &OrdMap<FieldId, Arc<FieldDefinition>>,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (field_id, definition) in definitions.iter() {
            if definition.deleted {
                continue;
            }

            let mut issues = Vec::new();
            match metadata.get(field_id) {
                Some(value) if !value.is_blank() => {
                    for rule in &self.rules {
                        rule.check(definition, value, &self.patterns, &mut issues);
                    }
                }
                _ => {
                    if definition.required {
                        issues.push(ValidationIssue::Required);
                    }
                }
            }

            if !issues.is_empty() {
                report.issues.insert(field_id.clone(), issues);
            }
        }

        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::from_config(&LockConfig::default())
    }
}
