//! Fixed POI category catalog and the user's category toggles.
//!
//! Incoming POIs carry free-form category strings (lowercased by the backend
//! at ingestion time). Each catalog entry lists the raw strings it recognizes;
//! anything that matches no entry is "unknown" and is always displayed.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    Restaurant,
    Cafe,
    Museum,
    Park,
    Hotel,
}

#[derive(Serialize, Debug)]
pub struct CategoryDef {
    pub key: CategoryKey,
    pub label: &'static str,
    // first alias is the key itself
    pub aliases: &'static [&'static str],
}

pub static CATALOG: [CategoryDef; 5] = [
    CategoryDef {
        key: CategoryKey::Restaurant,
        label: "Restaurants",
        aliases: &["restaurant", "fast_food", "food_court", "bar", "pub"],
    },
    CategoryDef {
        key: CategoryKey::Cafe,
        label: "Cafés",
        aliases: &["cafe", "coffee shop", "bakery", "ice_cream"],
    },
    CategoryDef {
        key: CategoryKey::Museum,
        label: "Museums & Arts",
        aliases: &["museum", "gallery", "art_gallery", "theatre", "attraction"],
    },
    CategoryDef {
        key: CategoryKey::Park,
        label: "Parks",
        aliases: &["park", "garden", "nature_reserve", "viewpoint", "beach"],
    },
    CategoryDef {
        key: CategoryKey::Hotel,
        label: "Hotels",
        aliases: &["hotel", "hostel", "guest_house", "motel", "apartment"],
    },
];

lazy_static! {
    static ref ALIAS_INDEX: HashMap<&'static str, CategoryKey> = {
        let mut index = HashMap::new();
        for def in CATALOG.iter() {
            for alias in def.aliases {
                index.insert(*alias, def.key);
            }
        }
        index
    };
}

impl CategoryKey {
    pub fn as_str(&self) -> &'static str {
        self.def().aliases[0]
    }

    pub fn label(&self) -> &'static str {
        self.def().label
    }

    pub fn def(&self) -> &'static CategoryDef {
        // CATALOG is ordered like the enum
        &CATALOG[*self as usize]
    }

    pub fn all() -> impl Iterator<Item = CategoryKey> {
        CATALOG.iter().map(|d| d.key)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CategoryKey::all()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category key '{}'", s))
    }
}

/// Map a raw POI category string onto the catalog.
pub fn classify(raw: Option<&str>) -> Option<CategoryKey> {
    let normalized = raw?.trim().to_ascii_lowercase();
    ALIAS_INDEX.get(normalized.as_str()).copied()
}

/// The set of categories currently shown. Defaults to everything enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryFilter {
    enabled: BTreeSet<CategoryKey>,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self {
            enabled: CategoryKey::all().collect(),
        }
    }
}

impl CategoryFilter {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            enabled: BTreeSet::new(),
        }
    }

    pub fn is_enabled(&self, key: CategoryKey) -> bool {
        self.enabled.contains(&key)
    }

    pub fn set(&mut self, key: CategoryKey, enabled: bool) {
        if enabled {
            self.enabled.insert(key);
        } else {
            self.enabled.remove(&key);
        }
    }

    /// Flip one category, returning its new state.
    pub fn toggle(&mut self, key: CategoryKey) -> bool {
        let now_enabled = !self.is_enabled(key);
        self.set(key, now_enabled);
        now_enabled
    }

    pub fn enable_all(&mut self) {
        self.enabled = CategoryKey::all().collect();
    }

    pub fn all_enabled(&self) -> bool {
        self.enabled.len() == CATALOG.len()
    }

    pub fn enabled(&self) -> impl Iterator<Item = CategoryKey> + '_ {
        self.enabled.iter().copied()
    }

    /// Fail-open visibility: unknown or missing categories are always shown.
    pub fn admits(&self, raw_category: Option<&str>) -> bool {
        match classify(raw_category) {
            Some(key) => self.is_enabled(key),
            None => true,
        }
    }

    /// Category list for a search request. Empty means "no filter" and is
    /// sent whenever every catalog entry is enabled, so unknown categories
    /// keep coming back from the backend.
    pub fn request_categories(&self) -> Vec<String> {
        if self.all_enabled() {
            return Vec::new();
        }
        let mut out: Vec<String> = Vec::new();
        for key in self.enabled() {
            for alias in key.def().aliases {
                if !out.iter().any(|a| a == alias) {
                    out.push((*alias).to_string());
                }
            }
        }
        out
    }
}

/// Catalog entry as exposed to the page for building the filter panel.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryState {
    pub key: CategoryKey,
    pub label: &'static str,
    pub enabled: bool,
}

pub fn category_states(filter: &CategoryFilter) -> Vec<CategoryState> {
    CATALOG
        .iter()
        .map(|def| CategoryState {
            key: def.key,
            label: def.label,
            enabled: filter.is_enabled(def.key),
        })
        .collect()
}
