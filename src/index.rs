use std::collections::HashMap;
use ndarray::Array2;
use tracing::{debug, warn};

use crate::error::{LdaError, LdaResult};
use crate::KEY_SEPARATOR;

/// Sits below every probability the estimator can write, so the first topic
/// scanned always replaces it unless its value is NaN.
const NO_PROBABILITY: f64 = -1.0;

/// Renders a `word:topic` or `topic:document` key. Words and document ids never
/// contain the separator, which keeps these keys unambiguous.
pub fn composite_key(first: &str, second: &str) -> String {
    format!("{}{}{}", first, KEY_SEPARATOR, second)
}


/// Read-only lookup of P(word | topic) and P(topic | document) for one loaded model.
///
/// Built once from the parsed files and never mutated afterwards, so a single
/// instance can be shared by any number of reader threads.
#[derive(Debug)]
pub struct ProbabilityIndex {
    vocabulary: Vec<String>,
    documents: Vec<String>,
    w2i: HashMap<String, usize>,
    d2i: HashMap<String, usize>,
    word_topic: HashMap<(usize, usize), f64>, // (word id, topic) -> P(word | topic)
    topic_doc: HashMap<(usize, usize), f64>,  // (topic, document id) -> P(topic | document)
    topic_count: usize,
    recorded_documents: usize, // documents [0, recorded_documents) have a theta row
}

impl ProbabilityIndex {

    /// Builds both lookups eagerly.
    ///
    /// `word_topic` is topics x words (every cell is stored), `topic_doc` is
    /// documents x topics and may have fewer rows than `documents`: documents
    /// past its last row have no recorded probabilities.
    pub fn build(vocabulary: Vec<String>,
        documents: Vec<String>,
        word_topic: &Array2<f64>,
        topic_doc: &Array2<f64>) -> LdaResult<ProbabilityIndex> {

        let (topic_count, n_words) = word_topic.dim();
        let (n_docs, n_doc_topics) = topic_doc.dim();

        if n_words != vocabulary.len() {
            return Err(LdaError::MatrixShapeMismatch {
                context: "word-topic columns vs vocabulary size".to_string(),
                expected: vocabulary.len(),
                found: n_words,
            });
        }
        if n_doc_topics != topic_count {
            return Err(LdaError::MatrixShapeMismatch {
                context: "topic-document columns vs word-topic rows".to_string(),
                expected: topic_count,
                found: n_doc_topics,
            });
        }
        if n_docs > documents.len() {
            return Err(LdaError::MatrixShapeMismatch {
                context: "topic-document rows vs document count".to_string(),
                expected: documents.len(),
                found: n_docs,
            });
        }

        let w2i = ProbabilityIndex::index_entries(&vocabulary, "vocabulary")?;
        let d2i = ProbabilityIndex::index_entries(&documents, "document list")?;

        let mut word_topic_map: HashMap<(usize, usize), f64> = HashMap::with_capacity(topic_count * n_words);
        for ((topic, word), prob) in word_topic.indexed_iter() {
            word_topic_map.insert((word, topic), *prob);
        }

        let mut topic_doc_map: HashMap<(usize, usize), f64> = HashMap::with_capacity(n_docs * topic_count);
        for ((doc, topic), prob) in topic_doc.indexed_iter() {
            topic_doc_map.insert((topic, doc), *prob);
        }

        if n_docs < documents.len() {
            warn!(documents = documents.len(), rows = n_docs, "some documents have no topic probabilities");
        }
        debug!(words = n_words, documents = documents.len(), topics = topic_count, "built probability index");

        Ok(Self {
            vocabulary,
            documents,
            w2i,
            d2i,
            word_topic: word_topic_map,
            topic_doc: topic_doc_map,
            topic_count,
            recorded_documents: n_docs,
        })
    }

    fn index_entries(entries: &[String], context: &str) -> LdaResult<HashMap<String, usize>> {

        let mut t2i: HashMap<String, usize> = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.contains(KEY_SEPARATOR) {
                return Err(LdaError::KeySeparatorCollision { entry: entry.to_owned(), context: context.to_string() });
            }
            if t2i.insert(entry.to_owned(), i).is_some() {
                return Err(LdaError::DuplicateEntry { entry: entry.to_owned(), context: context.to_string() });
            }
        }
        Ok(t2i)
    }

    /// P(word | topic). A stored model has every cell, a missing one reads as 0.0.
    pub fn word_topic_probability(&self, word: &str, topic: usize) -> LdaResult<f64> {

        let word_id = match self.w2i.get(word) {
            Some(i) => *i,
            None => return Err(LdaError::UnknownWord(word.to_string())),
        };
        if topic >= self.topic_count {
            return Err(LdaError::UnknownTopic { topic, topic_count: self.topic_count });
        }
        Ok(self.word_topic.get(&(word_id, topic)).copied().unwrap_or(0.0))
    }

    /// P(topic | document), 0.0 for any pair that was never recorded.
    pub fn topic_document_probability(&self, topic: usize, document: &str) -> f64 {
        self.d2i
            .get(document)
            .and_then(|doc| self.topic_doc.get(&(topic, *doc)))
            .copied()
            .unwrap_or(0.0)
    }

    /// The topic with the highest P(topic | document); on ties the lowest topic wins.
    ///
    /// `None` for documents without recorded probabilities and for models with no topics.
    pub fn most_likely_topic(&self, document: &str) -> Option<usize> {

        match self.d2i.get(document) {
            Some(doc) if *doc < self.recorded_documents => {},
            _ => return None,
        }

        let mut top_prob = NO_PROBABILITY;
        let mut max_index = None;
        for topic in 0..self.topic_count {
            let prob = self.topic_document_probability(topic, document);
            // strictly greater, an equal later topic does not take over
            if prob > top_prob {
                max_index = Some(topic);
                top_prob = prob;
            }
        }
        max_index
    }

    /// P(topic | document) for every topic, in topic order.
    pub fn topic_distribution(&self, document: &str) -> Vec<f64> {
        (0..self.topic_count)
            .map(|topic| self.topic_document_probability(topic, document))
            .collect()
    }

    /// Documents grouped by their most likely topic; entry `t` lists topic `t`'s documents.
    pub fn cluster_documents(&self) -> Vec<Vec<&str>> {
        let mut clusters: Vec<Vec<&str>> = vec![Vec::new(); self.topic_count];
        for doc in &self.documents {
            if let Some(topic) = self.most_likely_topic(doc) {
                clusters[topic].push(doc.as_str());
            }
        }
        clusters
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn topic_count(&self) -> usize {
        self.topic_count
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

}
