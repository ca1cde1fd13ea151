use gloo_storage::Storage;

use safenavi_shared::search::RecentSearches;

const BLOCKED_USERS_KEY: &str = "safety_blocked_users";
const RECENT_SEARCH_KEY: &str = "safety_recent_search";

/// Authors whose posts are never drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList(Vec<String>);

impl BlockList {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn load() -> Self {
        Self(gloo_storage::LocalStorage::get(BLOCKED_USERS_KEY).unwrap_or_default())
    }

    pub fn save(&self) {
        if let Err(e) = gloo_storage::LocalStorage::set(BLOCKED_USERS_KEY, &self.0) {
            web_sys::console::warn_1(&format!("failed to save block list: {e}").into());
        }
    }

    pub fn contains(&self, writer: &str) -> bool {
        self.0.iter().any(|name| name == writer)
    }

    /// Adds `writer`; `false` if it was already blocked or blank.
    pub fn block(&mut self, writer: &str) -> bool {
        let writer = writer.trim();
        if writer.is_empty() || self.contains(writer) {
            return false;
        }
        self.0.push(writer.to_string());
        true
    }
}

pub fn load_recent_searches() -> RecentSearches {
    RecentSearches::new(gloo_storage::LocalStorage::get(RECENT_SEARCH_KEY).unwrap_or_default())
}

pub fn save_recent_searches(recent: &RecentSearches) {
    let _ = gloo_storage::LocalStorage::set(RECENT_SEARCH_KEY, recent.keywords());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_idempotent() {
        let mut list = BlockList::default();
        assert!(list.block("악플러"));
        assert!(!list.block(" 악플러 "));
        assert!(!list.block("  "));
        assert!(list.contains("악플러"));
        assert!(!list.contains("다른사람"));
    }
}
