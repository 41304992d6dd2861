// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a tokenizer.json, or builds a WordPiece one from the
// training texts when none exists yet.
//
// The vocabulary is written straight into HuggingFace JSON and
// loaded back with Tokenizer::from_file, which sidesteps the
// trainer/ModelWrapper type mismatch in tokenizers 0.15.
//
// Id layout follows bert-base-uncased so the sentinel ids used
// by the framer are real vocabulary entries:
//
//   0        [PAD]
//   1..=99   [unused0] … [unused98]
//   100      [UNK]
//   101      [CLS]
//   102      [SEP]
//   103      [MASK]
//   104..    single characters, then "##" + character,
//            then whole words by descending frequency
//
// Every character seen in the corpus gets a piece and a "##"
// continuation, so any corpus word can be spelled out; frequent
// words are kept whole.

use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::PathBuf,
};

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::infra::hf_tokenizer::HfTokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";
const SPECIAL_TOKENS: [(&str, u32); 5] = [
    ("[PAD]", 0),
    ("[UNK]", 100),
    ("[CLS]", 101),
    ("[SEP]", 102),
    ("[MASK]", 103),
];
const FIRST_FREE_ID: u32 = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self {
            dir: PathBuf::from(dir.into()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<HfTokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new WordPiece tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<HfTokenizer> {
        HfTokenizer::from_file(&self.path())
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<HfTokenizer> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create tokenizer directory '{}'", self.dir.display()))?;

        let vocab = wordpiece_vocab(texts, vocab_size);
        let size = vocab.len();
        let tokenizer_json = wordpiece_json(vocab);

        let tok_path = self.path();
        fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", tok_path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'", size, tok_path.display());
        self.load()
    }
}

/// Lowercased word pieces as BertPreTokenizer would see them:
/// runs of alphanumerics, with every other non-space character
/// standing alone.
fn pre_tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !c.is_whitespace() && !c.is_control() {
            out.push(c.to_string());
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Token → id map. Characters always make it in; whole words
/// fill whatever room `vocab_size` leaves after them.
fn wordpiece_vocab(texts: &[String], vocab_size: usize) -> HashMap<String, u32> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    let mut chars: BTreeSet<char> = BTreeSet::new();
    for text in texts {
        for word in pre_tokenize(text) {
            chars.extend(word.chars());
            *freq.entry(word).or_insert(0) += 1;
        }
    }

    let mut vocab: HashMap<String, u32> = HashMap::new();
    for (token, id) in SPECIAL_TOKENS {
        vocab.insert(token.to_string(), id);
    }
    for i in 1..100u32 {
        vocab.insert(format!("[unused{}]", i - 1), i);
    }

    let mut next_id = FIRST_FREE_ID;
    let mut push = |vocab: &mut HashMap<String, u32>, token: String| {
        if !vocab.contains_key(&token) {
            vocab.insert(token, next_id);
            next_id += 1;
        }
    };

    for c in &chars {
        push(&mut vocab, c.to_string());
    }
    for c in &chars {
        push(&mut vocab, format!("##{c}"));
    }

    // Most frequent first; ties broken alphabetically so the
    // same corpus always yields the same ids.
    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, _)| w.chars().count() > 1)
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (word, _) in words {
        if vocab.len() >= vocab_size {
            break;
        }
        push(&mut vocab, word);
    }

    vocab
}

fn wordpiece_json(vocab: HashMap<String, u32>) -> Value {
    let added_tokens: Vec<Value> = SPECIAL_TOKENS
        .iter()
        .map(|(content, id)| {
            json!({
                "id": id,
                "content": content,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "BertPreTokenizer"
        },
        "post_processor": null,
        "decoder": {
            "type": "WordPiece",
            "prefix": "##",
            "cleanup": true
        },
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_tokenize_splits_punctuation() {
        assert_eq!(pre_tokenize("Hello, World!"), vec!["hello", ",", "world", "!"]);
        assert!(pre_tokenize("   ").is_empty());
    }

    #[test]
    fn test_vocab_reserves_bert_ids() {
        let vocab = wordpiece_vocab(&["the cat".to_string()], 1000);
        assert_eq!(vocab["[PAD]"], 0);
        assert_eq!(vocab["[unused0]"], 1);
        assert_eq!(vocab["[UNK]"], 100);
        assert_eq!(vocab["[CLS]"], 101);
        assert_eq!(vocab["[SEP]"], 102);
        assert_eq!(vocab["[MASK]"], 103);
        assert!(vocab.contains_key("##t"));
        assert!(vocab.contains_key("cat"));
        assert!(vocab.values().all(|&id| id < vocab.len() as u32));
    }

    #[test]
    fn test_small_budget_keeps_characters_drops_words() {
        let texts = vec!["the the cat".to_string()];
        // 104 reserved, 5 characters, 5 continuations, 1 word
        let vocab = wordpiece_vocab(&texts, 104 + 10 + 1);
        assert!(vocab.contains_key("the"));
        assert!(!vocab.contains_key("cat"));
        assert!(vocab.contains_key("c"));
        assert!(vocab.contains_key("##a"));
    }

    #[test]
    fn test_build_then_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_string_lossy());
        let texts = vec!["The cat sat".to_string()];

        let built = store.load_or_build(&texts, 1000).unwrap();
        assert!(store.path().exists());

        // Second call must load, even with different texts.
        let loaded = store.load_or_build(&[], 10).unwrap();
        assert_eq!(built.vocab_size(), loaded.vocab_size());
    }
}
