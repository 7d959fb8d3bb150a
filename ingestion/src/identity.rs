use database::ItemStore;
use needfinder_core::CoreError;
use std::collections::HashSet;
use tracing::info;

/// Identifiers already stored, plus everything accepted so far this run.
///
/// Loaded once from the store; only ever grows in memory afterwards.
#[derive(Debug, Default)]
pub struct IdentitySet {
    ids: HashSet<String>,
}

impl IdentitySet {
    pub async fn load(store: &dyn ItemStore) -> Result<Self, CoreError> {
        let ids = store.load_all_identifiers().await?;
        info!("Loaded {} existing identifiers", ids.len());
        Ok(Self { ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` when `id` was not seen before.
    pub fn insert_if_new(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<String> for IdentitySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_if_new() {
        let mut set: IdentitySet = vec!["a".to_string()].into_iter().collect();
        assert!(!set.insert_if_new("a"));
        assert!(set.insert_if_new("b"));
        assert!(!set.insert_if_new("b"));
        assert!(set.contains("b"));
        assert_eq!(set.len(), 2);
    }
}
