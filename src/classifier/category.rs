//! Field categorization

use super::Classifier;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::debug;

impl<'a> Classifier<'a> {
    /// Functional category of a field path.
    ///
    /// Categories are tried in declaration order; the first one with a
    /// matching pattern wins. Unmatched paths get the default category.
    pub fn categorize(&self, field_path: &str) -> &'a str {
        let path_lower = field_path.to_lowercase();

        for category in self.rules.categories() {
            if let Some(pattern) = category.patterns.iter().find(|p| p.is_match(&path_lower)) {
                debug!(
                    field_path,
                    category = %category.name,
                    matched_pattern = pattern.as_str(),
                    "field categorized"
                );
                return &category.name;
            }
        }

        let default = self.rules.default_category();
        debug!(field_path, category = default, "field assigned to default category");
        default
    }

    /// Categorize several paths at once
    pub fn categorize_batch<'p, I>(&self, field_paths: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = &'p str>,
    {
        field_paths
            .into_iter()
            .map(|path| (path.to_string(), self.categorize(path).to_string()))
            .collect()
    }

    /// Description of a category, the default category included
    pub fn category_description(&self, category: &str) -> &'a str {
        let rules = self.rules.rules();
        if let Some(rule) = rules.categorization.categories.get(category) {
            return &rule.description;
        }
        if category == rules.categorization.default.name {
            return &rules.categorization.default.description;
        }
        "Unknown category"
    }

    /// Every category with its description, default last
    pub fn all_categories(&self) -> IndexMap<String, String> {
        let categorization = &self.rules.rules().categorization;
        let mut all: IndexMap<String, String> = categorization
            .categories
            .iter()
            .map(|(name, rule)| (name.clone(), rule.description.clone()))
            .collect();
        all.insert(
            categorization.default.name.clone(),
            categorization.default.description.clone(),
        );
        all
    }

    /// Raw patterns declared for a category
    pub fn category_patterns(&self, category: &str) -> &'a [String] {
        self.rules
            .rules()
            .categorization
            .categories
            .get(category)
            .map(|rule| rule.patterns.as_slice())
            .unwrap_or(&[])
    }
}

/// Count how many paths landed in each category
pub fn category_counts(categorized: &BTreeMap<String, String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for category in categorized.values() {
        *counts.entry(category.clone()).or_insert(0) += 1;
    }
    counts
}
