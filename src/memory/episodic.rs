use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};

use super::traits::MemoryMatch;
use crate::constants::DEFAULT_MAX_EPISODES;

#[derive(Debug, Clone)]
struct Episode {
    content: String,
    metadata: Value,
}

/// Episodic memory for conversation history.
///
/// Retrieval ranks episodes by keyword overlap with the query; episodes that
/// share no word with the query never match. Holds at most `capacity`
/// episodes, dropping the oldest when full.
#[derive(Debug)]
pub struct EpisodicMemory {
    episodes: RwLock<VecDeque<Episode>>,
    capacity: usize,
}

impl Default for EpisodicMemory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_EPISODES)
    }
}

impl EpisodicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            episodes: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self, content: &str, metadata: Value) {
        if self.capacity == 0 {
            return;
        }
        let mut episodes = self.episodes.write();
        while episodes.len() >= self.capacity {
            episodes.pop_front();
        }
        episodes.push_back(Episode {
            content: content.to_string(),
            metadata,
        });
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Vec<MemoryMatch> {
        let query_words = words(query);

        let episodes = self.episodes.read();
        let mut scored: Vec<(usize, &Episode)> = episodes
            .iter()
            .filter_map(|episode| {
                let overlap = words(&episode.content).intersection(&query_words).count();
                (overlap > 0).then_some((overlap, episode))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .map(|(_, episode)| MemoryMatch {
                content: episode.content.clone(),
                metadata: episode.metadata.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.episodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.read().is_empty()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retrieves_by_keyword_overlap() {
        let memory = EpisodicMemory::new();
        memory.store(
            "User asked about supply chain optimization focusing on cost reduction",
            json!({}),
        );
        memory.store("Unrelated note about lunch", json!({}));

        let results = memory.retrieve("What did we discuss about supply chain?", 5);
        assert_eq!(results.len(), 2);
        assert!(results[0].content.to_lowercase().contains("cost reduction"));
    }

    #[test]
    fn test_no_overlap_no_match() {
        let memory = EpisodicMemory::new();
        memory.store("alpha beta", json!({"n": 1}));
        assert!(memory.retrieve("gamma", 5).is_empty());
    }

    #[test]
    fn test_respects_k_and_ranking() {
        let memory = EpisodicMemory::new();
        memory.store("gantt", json!({"rank": 3}));
        memory.store("gantt chart construction", json!({"rank": 1}));
        memory.store("gantt chart", json!({"rank": 2}));

        let results = memory.retrieve("gantt chart construction", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata["rank"], 1);
        assert_eq!(results[1].metadata["rank"], 2);
    }

    #[test]
    fn test_full_store_drops_oldest_first() {
        let memory = EpisodicMemory::with_capacity(3);
        for n in 0..1000 {
            memory.store(&format!("turn {n}"), json!({ "n": n }));
        }
        assert_eq!(memory.len(), 3);

        let kept: Vec<i64> = memory
            .retrieve("turn", 10)
            .iter()
            .filter_map(|m| m.metadata["n"].as_i64())
            .collect();
        assert_eq!(kept, vec![997, 998, 999]);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let memory = EpisodicMemory::with_capacity(0);
        memory.store("anything", json!({}));
        assert!(memory.is_empty());
    }
}
