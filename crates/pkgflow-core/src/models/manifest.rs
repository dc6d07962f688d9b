use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::models::{CoreError, CoreErrorKind};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub categories: BTreeMap<String, PackageCategory>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackageCategory {
    pub description: String,
    pub priority: i32,
    pub packages: BTreeMap<String, PackageInfo>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    pub description: String,
    pub tags: Vec<String>,
    pub optional: bool,
}

impl PackageManifest {
    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(|error| {
            CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("invalid package manifest: {error}"),
            )
        })
    }

    /// Package names from the selected categories (all when `categories` is
    /// empty), ordered by category priority then name, first occurrence wins.
    pub fn resolve(
        &self,
        categories: &[String],
        include_optional: bool,
    ) -> Result<Vec<String>, CoreError> {
        if let Some(unknown) = categories
            .iter()
            .find(|name| !self.categories.contains_key(name.as_str()))
        {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("unknown package category '{unknown}'"),
            ));
        }

        let mut selected: Vec<(&String, &PackageCategory)> = self
            .categories
            .iter()
            .filter(|(name, _)| categories.is_empty() || categories.contains(name))
            .collect();
        selected.sort_by(|a, b| (a.1.priority, a.0).cmp(&(b.1.priority, b.0)));

        let mut seen = HashSet::new();
        let mut packages = Vec::new();
        for (_, category) in selected {
            for (name, info) in &category.packages {
                if info.optional && !include_optional {
                    continue;
                }
                if seen.insert(name.as_str()) {
                    packages.push(name.clone());
                }
            }
        }

        Ok(packages)
    }

    pub fn describe(&self, package: &str) -> Option<&PackageInfo> {
        self.categories
            .values()
            .find_map(|category| category.packages.get(package))
    }
}
