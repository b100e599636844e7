use std::sync::Arc;

const SIMPLE_CHARS_PER_TOKEN: usize = 4;
const CODE_FENCE: &str = "```";

/// Type of tokenizer to use for estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// Word/punctuation counting heuristic with a code-fence surcharge
    #[default]
    Reference,
    /// Simple character-based tokenizer (~4 chars per token)
    Simple,
    /// `cl100k_base` BPE encoder (requires the `tiktoken` feature)
    Cl100k,
}

impl TokenizerKind {
    /// Creates a new tokenizer instance of this kind.
    ///
    /// `Cl100k` falls back to the reference heuristic when the encoder is not
    /// compiled in or fails to load.
    #[must_use]
    pub fn create(self) -> Arc<dyn TokenEstimator> {
        match self {
            Self::Reference => Arc::new(ReferenceTokenizer),
            Self::Simple => Arc::new(SimpleTokenizer),
            Self::Cl100k => bpe_or_reference(),
        }
    }
}

#[cfg(feature = "tiktoken")]
fn bpe_or_reference() -> Arc<dyn TokenEstimator> {
    match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Arc::new(BpeTokenizer { bpe }),
        Err(e) => {
            tracing::warn!("Failed to load cl100k_base encoder, using reference estimator: {e}");
            Arc::new(ReferenceTokenizer)
        }
    }
}

#[cfg(not(feature = "tiktoken"))]
fn bpe_or_reference() -> Arc<dyn TokenEstimator> {
    tracing::warn!("Built without the `tiktoken` feature, using reference estimator");
    Arc::new(ReferenceTokenizer)
}

/// Trait for estimating token counts in text.
///
/// Implementations must be deterministic: identical input always yields the
/// same count. The selector relies on this for reproducible selections.
pub trait TokenEstimator: Send + Sync {
    /// Estimates the number of tokens in the given text.
    fn estimate(&self, text: &str) -> usize;
}

/// Reference heuristic.
///
/// Counts runs of word characters and single punctuation characters as one
/// token each, then adds one token per code fence and half a token per
/// punctuation character.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReferenceTokenizer;

impl TokenEstimator for ReferenceTokenizer {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let (pieces, special_chars) = count_pieces(text);
        let code_fences = text.matches(CODE_FENCE).count();

        pieces
            .saturating_add(code_fences)
            .saturating_add(special_chars / 2)
    }
}

/// Simple character-based tokenizer.
///
/// Uses a heuristic of approximately 4 characters per token.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimpleTokenizer;

impl TokenEstimator for SimpleTokenizer {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count();
        char_count
            .saturating_add(SIMPLE_CHARS_PER_TOKEN - 1)
            .saturating_div(SIMPLE_CHARS_PER_TOKEN)
            .max(1)
    }
}

#[cfg(feature = "tiktoken")]
pub(crate) struct BpeTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl TokenEstimator for BpeTokenizer {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns `(word runs + punctuation chars, punctuation chars)`.
fn count_pieces(text: &str) -> (usize, usize) {
    let mut pieces = 0;
    let mut special = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_word_char(c) {
            if !in_word {
                pieces += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if !c.is_whitespace() {
                pieces += 1;
                special += 1;
            }
        }
    }

    (pieces, special)
}

/// Estimates the cost of the path manifest: every path on its own line.
pub fn estimate_structure<'a, I>(estimator: &dyn TokenEstimator, paths: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut manifest = String::new();
    for path in paths {
        manifest.push_str(path);
        manifest.push('\n');
    }
    estimator.estimate(&manifest)
}
