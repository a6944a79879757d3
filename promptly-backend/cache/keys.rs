use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::prompts::SortOrder;

/// How long a prompt list stays cached.
pub const LIST_TTL: Duration = Duration::from_secs(60);
/// How long an enhancement result stays cached.
pub const ENHANCE_TTL: Duration = Duration::from_secs(300);

const LIST_PREFIX: &str = "prompts:list";
const ENHANCE_PREFIX: &str = "prompts:enhance";

pub fn list_key(owner_id: &str, sort: SortOrder, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("{LIST_PREFIX}:{owner_id}:sort={}:tag={tag}", sort.as_str()),
        None => format!("{LIST_PREFIX}:{owner_id}:sort={}", sort.as_str()),
    }
}

/// The two untagged list keys for an owner.
pub fn canonical_list_keys(owner_id: &str) -> [String; 2] {
    [
        list_key(owner_id, SortOrder::Latest, None),
        list_key(owner_id, SortOrder::Oldest, None),
    ]
}

/// Every list key whose contents change when a prompt carrying `tags` is
/// created or deleted: the canonical keys plus both sort orders per tag.
pub fn invalidation_keys(owner_id: &str, tags: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = canonical_list_keys(owner_id).into();
    for tag in tags {
        for sort in [SortOrder::Latest, SortOrder::Oldest] {
            let key = list_key(owner_id, sort, Some(tag));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Per-owner key for an enhancement, derived from a SHA-256 digest of the
/// whole input so distinct prompts never share an entry.
pub fn enhance_key(owner_id: &str, prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    format!("{ENHANCE_PREFIX}:{owner_id}:{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_key_layout() {
        assert_eq!(
            list_key("u1", SortOrder::Latest, None),
            "prompts:list:u1:sort=latest"
        );
        assert_eq!(
            list_key("u1", SortOrder::Oldest, Some("creative")),
            "prompts:list:u1:sort=oldest:tag=creative"
        );
    }

    #[test]
    fn invalidation_covers_canonical_and_tag_keys() {
        let keys = invalidation_keys("u1", &["a".into(), "a".into(), "b".into()]);
        assert_eq!(
            keys,
            vec![
                "prompts:list:u1:sort=latest",
                "prompts:list:u1:sort=oldest",
                "prompts:list:u1:sort=latest:tag=a",
                "prompts:list:u1:sort=oldest:tag=a",
                "prompts:list:u1:sort=latest:tag=b",
                "prompts:list:u1:sort=oldest:tag=b",
            ]
        );
    }

    #[test]
    fn invalidation_without_tags_is_canonical_only() {
        assert_eq!(invalidation_keys("u1", &[]).len(), 2);
    }

    #[test]
    fn enhance_key_is_scoped_per_owner() {
        assert_ne!(enhance_key("u1", "same"), enhance_key("u2", "same"));
    }

    #[test]
    fn enhance_key_distinguishes_shared_prefixes() {
        let prefix = "x".repeat(200);
        let a = format!("{prefix} ending one");
        let b = format!("{prefix} ending two");
        assert_ne!(enhance_key("u1", &a), enhance_key("u1", &b));
    }

    #[test]
    fn enhance_key_has_bounded_length() {
        let key = enhance_key("u1", &"long ".repeat(10_000));
        assert_eq!(key.len(), "prompts:enhance:u1:".len() + 64);
    }
}
