use crate::bind::bind;
use crate::error::KbError;
use crate::rule::{parse_rule_xml, Rule};
use korr_core::{Alert, AlertTypeKey, HyperAlertBinding};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Knowledge-base rule cache (spec.md §4.6): insert-only, keyed by
/// `AlertTypeKey`, loaded lazily on first sight of a type-key. A type-key
/// with no rule file caches `None` rather than re-stat'ing the directory
/// on every subsequent alert of that type.
#[derive(Debug)]
pub struct KbIndex {
    rules_dir: PathBuf,
    cache: RwLock<HashMap<AlertTypeKey, Option<Rule>>>,
}

impl KbIndex {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn rule_for(&self, key: AlertTypeKey) -> Result<Option<Rule>, KbError> {
        if let Some(cached) = self.cache.read().get(&key) {
            return Ok(cached.clone());
        }

        let path = self.rules_dir.join(format!("{}.xml", key.rule_file_stem()));
        let path_str = path.display().to_string();

        let rule = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| KbError::Io {
                path: path_str.clone(),
                source,
            })?;
            Some(parse_rule_xml(&content, &path_str)?)
        } else {
            None
        };

        self.cache.write().insert(key, rule.clone());
        Ok(rule)
    }

    /// Bind the alert's type-key rule (if any) against its own header
    /// fields, producing the expanded pre/post predicate lists.
    pub fn bind_alert(&self, alert: &Alert) -> Result<Option<HyperAlertBinding>, KbError> {
        let rule = self.rule_for(alert.type_key)?;
        Ok(rule.map(|r| bind(&r, alert)))
    }
}
