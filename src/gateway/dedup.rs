//! Bounded id tracking: the message deduplicator and the reply tag set.
//!
//! The transport delivers the same logical message through overlapping
//! events, so every side-effecting path sits behind an atomic
//! check-and-record. Both structures are bounded two ways: a fixed capacity
//! with oldest-first eviction, and the gateway's periodic wholesale sweep.

use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

/// Insertion-ordered id set with capped size.
#[derive(Default)]
struct BoundedIds {
    set: HashSet<String>,
    order: VecDeque<String>,
}

impl BoundedIds {
    fn insert(&mut self, id: &str, capacity: usize) {
        if self.set.insert(id.to_string()) {
            self.order.push_back(id.to_string());
            while self.order.len() > capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.set.remove(&oldest);
                }
            }
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.set.remove(id) {
            self.order.retain(|x| x != id);
            true
        } else {
            false
        }
    }

    fn clear(&mut self) -> usize {
        let n = self.set.len();
        // Wholesale replacement: consumers never observe a half-cleared set.
        self.set = HashSet::new();
        self.order = VecDeque::new();
        n
    }
}

/// Exactly-once admission for logical messages.
///
/// A logical message is named by several alias candidates; if any alias was
/// seen before, the event is a duplicate delivery. On admission *all*
/// aliases are recorded, because a later duplicate may lead with a
/// different candidate field.
pub struct SeenSet {
    capacity: usize,
    inner: Mutex<BoundedIds>,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(BoundedIds::default()),
        }
    }

    /// Atomic check-and-record. Returns `true` exactly once per logical
    /// message. An event with no usable candidate cannot be deduplicated
    /// and is admitted.
    pub async fn should_process(&self, candidates: &[String]) -> bool {
        let mut inner = self.inner.lock().await;

        let usable: Vec<&String> = candidates.iter().filter(|c| !c.is_empty()).collect();
        if usable.iter().any(|c| inner.set.contains(c.as_str())) {
            return false;
        }
        for c in &usable {
            inner.insert(c, self.capacity);
        }
        true
    }

    /// Wholesale clear. Returns the number of ids dropped.
    pub async fn sweep(&self) -> usize {
        self.inner.lock().await.clear()
    }
}

/// Single-use markers for bot-authored messages.
///
/// An id is removed on its first successful lookup, so the set never grows
/// past the number of in-flight bot replies plus stragglers caught by the
/// sweep.
pub struct ReplyTagSet {
    capacity: usize,
    inner: Mutex<BoundedIds>,
}

impl ReplyTagSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(BoundedIds::default()),
        }
    }

    pub async fn tag(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.inner.lock().await.insert(id, self.capacity);
    }

    /// Returns `true` and removes the marker if any candidate is tagged.
    pub async fn consume(&self, candidates: &[String]) -> bool {
        let mut inner = self.inner.lock().await;
        for c in candidates {
            if inner.remove(c) {
                return true;
            }
        }
        false
    }

    pub async fn sweep(&self) -> usize {
        self.inner.lock().await.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_event_processed_duplicates_rejected() {
        let seen = SeenSet::new(100);
        assert!(seen.should_process(&ids(&["abc123"])).await);
        assert!(!seen.should_process(&ids(&["abc123"])).await);
    }

    #[tokio::test]
    async fn test_duplicate_detected_through_any_alias() {
        let seen = SeenSet::new(100);
        assert!(
            seen.should_process(&ids(&["abc123", "chat#abc123"]))
                .await
        );
        // Later event leads with the serialized alias only.
        assert!(!seen.should_process(&ids(&["chat#abc123"])).await);
        // Or with the bare id only.
        assert!(!seen.should_process(&ids(&["abc123"])).await);
    }

    #[tokio::test]
    async fn test_exactly_once_across_sequence() {
        let seen = SeenSet::new(100);
        let events = [
            ids(&["abc123", "chat#abc123"]),
            ids(&["abc123"]),
            ids(&["chat#abc123"]),
            ids(&["", "abc123"]),
        ];
        let admitted = {
            let mut n = 0;
            for e in &events {
                if seen.should_process(e).await {
                    n += 1;
                }
            }
            n
        };
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_empty_candidates_are_admitted() {
        let seen = SeenSet::new(100);
        // Nothing to key on: cannot dedup, must not drop.
        assert!(seen.should_process(&ids(&[""])).await);
        assert!(seen.should_process(&ids(&[""])).await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let seen = SeenSet::new(3);
        for i in 0..5 {
            assert!(seen.should_process(&ids(&[&format!("id{i}")])).await);
        }
        // id0 and id1 were evicted; they are admitted again.
        assert!(seen.should_process(&ids(&["id0"])).await);
        // id4 is still present.
        assert!(!seen.should_process(&ids(&["id4"])).await);
    }

    #[tokio::test]
    async fn test_sweep_clears_everything() {
        let seen = SeenSet::new(100);
        assert!(seen.should_process(&ids(&["abc123"])).await);
        assert_eq!(seen.sweep().await, 1);
        assert!(seen.should_process(&ids(&["abc123"])).await);
    }

    #[tokio::test]
    async fn test_tag_consumed_exactly_once() {
        let tags = ReplyTagSet::new(100);
        tags.tag("reply-1").await;
        assert!(tags.consume(&ids(&["reply-1"])).await);
        assert!(!tags.consume(&ids(&["reply-1"])).await);
    }

    #[tokio::test]
    async fn test_consume_matches_any_candidate() {
        let tags = ReplyTagSet::new(100);
        tags.tag("reply-1").await;
        assert!(tags.consume(&ids(&["other", "reply-1"])).await);
    }

    #[tokio::test]
    async fn test_untagged_id_not_consumed() {
        let tags = ReplyTagSet::new(100);
        assert!(!tags.consume(&ids(&["never-tagged"])).await);
    }

    #[tokio::test]
    async fn test_empty_id_never_tagged() {
        let tags = ReplyTagSet::new(100);
        tags.tag("").await;
        assert!(!tags.consume(&ids(&[""])).await);
    }
}
