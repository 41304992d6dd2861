// ============================================================
// Layer 4 — Tagging Corpus Loader
// ============================================================
// Reads the word-per-row NER/POS CSV used to train the tagger:
//
//   Sentence #,Word,POS,Tag
//   Sentence: 1,Thousands,NNS,O
//   ,of,IN,O
//   ,London,NNP,B-geo
//   Sentence: 2,Families,NNS,O
//
// The sentence id only appears on a sentence's first word and
// is carried forward to the rows below it. The file is latin-1,
// so fields are decoded byte-by-byte rather than as UTF-8.
//
// After loading, POS and TAG vocabularies are built ONCE over
// the whole corpus and every sentence is converted to ids.

use std::{fs::File, io::Read, path::Path};

use crate::domain::error::{DataError, DataResult};
use crate::domain::label_vocab::LabelVocabulary;
use crate::domain::tagging::TaggedSentence;

const SENTENCE_COLUMN: &str = "Sentence #";
const WORD_COLUMN: &str = "Word";
const POS_COLUMN: &str = "POS";
const TAG_COLUMN: &str = "Tag";

/// A sentence with its labels still as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSentence {
    pub id: String,
    pub words: Vec<String>,
    pub pos: Vec<String>,
    pub tags: Vec<String>,
}

/// Sentences plus the two vocabularies built over them.
#[derive(Debug, Clone)]
pub struct TaggingCorpus {
    pub sentences: Vec<TaggedSentence>,
    pub pos_vocab: LabelVocabulary,
    pub tag_vocab: LabelVocabulary,
}

impl TaggingCorpus {
    /// Build vocabularies over every sentence, then encode labels.
    pub fn from_raw(raw: &[RawSentence]) -> DataResult<Self> {
        let pos_vocab = LabelVocabulary::build("pos", raw.iter().flat_map(|s| s.pos.iter()));
        let tag_vocab = LabelVocabulary::build("tag", raw.iter().flat_map(|s| s.tags.iter()));

        let sentences = raw
            .iter()
            .map(|s| {
                TaggedSentence::new(
                    s.words.clone(),
                    pos_vocab.encode_all(&s.pos)?,
                    tag_vocab.encode_all(&s.tags)?,
                )
            })
            .collect::<DataResult<Vec<_>>>()?;

        tracing::info!(
            "Tagging corpus: {} sentences, {} POS labels, {} tags",
            sentences.len(),
            pos_vocab.len(),
            tag_vocab.len()
        );

        Ok(Self {
            sentences,
            pos_vocab,
            tag_vocab,
        })
    }

    /// Every word in the corpus, for building a tokenizer vocabulary.
    pub fn texts(&self) -> Vec<String> {
        self.sentences.iter().map(|s| s.words().join(" ")).collect()
    }
}

pub fn load_tagging_csv(path: &Path) -> DataResult<Vec<RawSentence>> {
    let file = File::open(path).map_err(|e| DataError::io("opening tagging corpus", e))?;
    read_tagging_csv(file)
}

pub fn read_tagging_csv<R: Read>(reader: R) -> DataResult<Vec<RawSentence>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .byte_headers()
        .map_err(|e| DataError::csv("reading tagging corpus header", e))?
        .clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| latin1(h).trim() == name)
            .ok_or(DataError::MissingColumn(name))
    };
    let sentence_col = column(SENTENCE_COLUMN)?;
    let word_col = column(WORD_COLUMN)?;
    let pos_col = column(POS_COLUMN)?;
    let tag_col = column(TAG_COLUMN)?;

    let mut sentences: Vec<RawSentence> = Vec::new();
    let mut orphan_rows = 0usize;

    for record in rdr.byte_records() {
        let record = record.map_err(|e| DataError::csv("reading tagging corpus row", e))?;
        let field = |i: usize| record.get(i).map(latin1).unwrap_or_default();

        let sentence_id = field(sentence_col);
        if !sentence_id.trim().is_empty() {
            sentences.push(RawSentence {
                id: sentence_id.trim().to_string(),
                ..RawSentence::default()
            });
        }

        // Rows before the first sentence id have nothing to attach to.
        let Some(current) = sentences.last_mut() else {
            orphan_rows += 1;
            continue;
        };
        current.words.push(field(word_col));
        current.pos.push(field(pos_col));
        current.tags.push(field(tag_col));
    }

    if orphan_rows > 0 {
        tracing::warn!("Skipped {} rows preceding the first sentence id", orphan_rows);
    }
    Ok(sentences)
}

/// Latin-1 maps every byte straight to the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Sentence #,Word,POS,Tag\n\
                       Sentence: 1,Thousands,NNS,O\n\
                       ,of,IN,O\n\
                       ,London,NNP,B-geo\n\
                       Sentence: 2,Families,NNS,O\n\
                       ,left,VBD,O\n";

    #[test]
    fn test_forward_fills_sentence_ids() {
        let raw = read_tagging_csv(CSV.as_bytes()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].id, "Sentence: 1");
        assert_eq!(raw[0].words, vec!["Thousands", "of", "London"]);
        assert_eq!(raw[1].tags, vec!["O", "O"]);
    }

    #[test]
    fn test_decodes_latin1_bytes() {
        let mut bytes = b"Sentence #,Word,POS,Tag\nSentence: 1,".to_vec();
        bytes.extend_from_slice(&[b'C', 0xE9]);
        bytes.extend_from_slice(b"line,NNP,B-per\n");
        let raw = read_tagging_csv(bytes.as_slice()).unwrap();
        assert_eq!(raw[0].words[0], "Céline");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let err = read_tagging_csv("Sentence #,Word,POS\nS1,a,DT\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn("Tag")));
    }

    #[test]
    fn test_orphan_rows_are_dropped() {
        let csv = "Sentence #,Word,POS,Tag\n,stray,NN,O\nSentence: 1,ok,JJ,O\n";
        let raw = read_tagging_csv(csv.as_bytes()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].words, vec!["ok"]);
    }

    #[test]
    fn test_corpus_shares_one_vocabulary() {
        let raw = read_tagging_csv(CSV.as_bytes()).unwrap();
        let corpus = TaggingCorpus::from_raw(&raw).unwrap();

        assert_eq!(corpus.tag_vocab.len(), 2);
        let o = corpus.tag_vocab.id("O").unwrap();
        let geo = corpus.tag_vocab.id("B-geo").unwrap();
        assert_eq!(corpus.sentences[0].tag_labels(), &[o, o, geo]);
        assert_eq!(corpus.sentences[1].tag_labels(), &[o, o]);
        assert!(corpus.sentences[0].pos_labels().iter().all(|&id| id > 0));
    }
}
