use std::collections::{HashMap, HashSet};

use counter::Counter;

use crate::models::{CooccurrenceRecord, Document, PairKey, TokenDictionary};

/// Which documents contain which tokens.
///
/// Stored as one posting list per token id; each list holds ascending
/// document ordinals (positions in the training slice), with a token
/// recorded once per document however often it repeats there.
#[derive(Debug, Clone)]
pub struct CooccurrenceIndex {
    postings: Vec<Vec<usize>>,
    entries: usize,
}

impl CooccurrenceIndex {
    pub fn build(dictionary: &TokenDictionary, documents: &[Document]) -> Self {
        let mut postings = vec![Vec::new(); dictionary.len()];
        let mut entries = 0;

        for (ordinal, doc) in documents.iter().enumerate() {
            let mut seen = HashSet::new();
            for token in &doc.tokens {
                if !seen.insert(token.as_str()) {
                    continue;
                }
                if let Some(id) = dictionary.id(token) {
                    postings[id].push(ordinal);
                    entries += 1;
                }
            }
        }

        CooccurrenceIndex { postings, entries }
    }

    /// Ordinals of the documents containing `token_id`, ascending.
    pub fn documents_containing(&self, token_id: usize) -> &[usize] {
        self.postings.get(token_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of (document, token) memberships.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

/// Adjacent bigrams of one primary token, counted by document.
#[derive(Debug, Clone)]
pub struct Cooccurrences {
    pub counts: Counter<PairKey>,
    pub documents: HashMap<PairKey, Vec<usize>>,
}

impl Cooccurrences {
    pub fn new() -> Self {
        Cooccurrences {
            counts: Counter::new(),
            documents: HashMap::new(),
        }
    }

    /// Records sorted by descending document count, ties by ascending key.
    pub fn by_descending_frequency(&self) -> Vec<CooccurrenceRecord> {
        self.counts
            .most_common_ordered()
            .into_iter()
            .map(|(key, count)| {
                let documents = self.documents.get(&key).cloned().unwrap_or_default();
                CooccurrenceRecord {
                    key,
                    count,
                    documents,
                }
            })
            .collect()
    }
}

impl Default for Cooccurrences {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the bigrams formed by `primary` with its immediate left and
/// right neighbours in each of `ordinals` (documents known to contain it).
///
/// A bigram counts once per document no matter how many times the pattern
/// repeats inside that document.
pub fn ordered_cooccurrences(
    primary: &str,
    documents: &[Document],
    ordinals: &[usize],
) -> Cooccurrences {
    let mut result = Cooccurrences::new();

    for &ordinal in ordinals {
        let tokens = &documents[ordinal].tokens;
        let mut found: HashSet<PairKey> = HashSet::new();

        for (position, _) in tokens.iter().enumerate().filter(|(_, t)| t.as_str() == primary) {
            if let Some(next) = tokens.get(position + 1) {
                found.insert(PairKey::new(primary, next.as_str()));
            }
            if position > 0 {
                found.insert(PairKey::new(tokens[position - 1].as_str(), primary));
            }
        }

        for key in found {
            result.counts[&key] += 1;
            result.documents.entry(key).or_default().push(ordinal);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(tokens: &[&str]) -> Document {
        Document::new(0, 0.0, 0.0, tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn index_collapses_repeated_tokens() {
        let docs = vec![doc(&["a", "b", "a"]), doc(&["b"]), doc(&["c", "a"])];
        let dict = TokenDictionary::from_documents(&docs);
        let index = CooccurrenceIndex::build(&dict, &docs);

        assert_eq!(index.documents_containing(dict.id("a").unwrap()), &[0, 2]);
        assert_eq!(index.documents_containing(dict.id("b").unwrap()), &[0, 1]);
        assert_eq!(index.entries(), 5);
        assert!(index.documents_containing(99).is_empty());
    }

    #[test]
    fn repeated_pattern_counts_once_per_document() {
        let docs = vec![doc(&["a", "b", "a"])];
        let cooc = ordered_cooccurrences("a", &docs, &[0]);

        let keys: HashSet<PairKey> = cooc.counts.keys().cloned().collect();
        let expected: HashSet<PairKey> =
            [PairKey::new("a", "b"), PairKey::new("b", "a")].into_iter().collect();
        assert_eq!(keys, expected);
        assert_eq!(cooc.counts[&PairKey::new("a", "b")], 1);
        assert_eq!(cooc.counts[&PairKey::new("b", "a")], 1);
        assert_eq!(cooc.documents[&PairKey::new("a", "b")], vec![0]);
    }

    #[test]
    fn counts_across_documents_in_order() {
        let docs = vec![
            doc(&["heavy", "rain", "today"]),
            doc(&["rain", "today"]),
            doc(&["rain"]),
            doc(&["heavy", "rain"]),
            doc(&["rain", "today", "rain", "today"]),
        ];
        let cooc = ordered_cooccurrences("rain", &docs, &[0, 1, 2, 3, 4]);
        let records = cooc.by_descending_frequency();

        assert_eq!(records[0].key, PairKey::new("rain", "today"));
        assert_eq!(records[0].count, 3);
        assert_eq!(records[0].documents, vec![0, 1, 4]);
        assert_eq!(records[1].key, PairKey::new("heavy", "rain"));
        assert_eq!(records[1].count, 2);
        // "today rain" inside the last document
        assert_eq!(records[2].key, PairKey::new("today", "rain"));
        assert_eq!(records[2].count, 1);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn ties_break_by_key() {
        let docs = vec![doc(&["b", "x"]), doc(&["a", "x"])];
        let records = ordered_cooccurrences("x", &docs, &[0, 1]).by_descending_frequency();
        assert_eq!(records[0].key, PairKey::new("a", "x"));
        assert_eq!(records[1].key, PairKey::new("b", "x"));
    }

    #[test]
    fn lone_token_has_no_bigrams() {
        let docs = vec![doc(&["rain"])];
        assert!(ordered_cooccurrences("rain", &docs, &[0]).counts.is_empty());
    }
}
