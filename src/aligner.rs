//! Grounds bare extractions from `FormatNormalizer` against source text.
//!
//! Three tiers, tried in order, strongest first:
//!  - exact: a contiguous run of source tokens whose normalized text matches
//!    the extraction's tokens exactly.
//!  - fuzzy: a bounded-window search around the best-overlapping region,
//!    scored first by a cheap token-multiset overlap (to prune candidate
//!    windows) then by longest-common-subsequence block length (to break
//!    ties and reject incoherent windows that merely share common words).
//!  - lesser: a non-contiguous subsequence match, used as a last resort
//!    when the extraction's words appear in source order but not adjacently.
//!
//! Extractions that clear none of these tiers come back `Unaligned` with no
//! char interval, rather than being dropped — callers decide whether to keep
//! or discard them (see `PipelineConfig::accept_lesser` and the `Unaligned`
//! handling in `visualization`).

use std::collections::HashMap;

use crate::data::{AlignmentStatus, CharInterval, Extraction};
use crate::tokenizer::{self, Token, TokenInterval, TokenizedText};

/// Tunables governing how aggressively the aligner searches for fuzzy and
/// lesser matches.
#[derive(Debug, Clone)]
pub struct AlignmentConfig {
    pub enable_fuzzy_alignment: bool,
    pub fuzzy_alignment_threshold: f64,
    /// Fraction the fuzzy search window may grow/shrink relative to the
    /// extraction's own token count `n`: window sizes in
    /// `[max(1, ceil(n*(1-slack))), ceil(n*(1+slack))]` are tried.
    pub fuzzy_slack: f64,
    pub accept_match_lesser: bool,
    pub lesser_threshold: f64,
    pub case_sensitive: bool,
    /// Caps how many source tokens a fuzzy/lesser search scans; `None` means
    /// search the whole chunk. Keeps pathological inputs (huge chunk, short
    /// extraction) from becoming quadratic.
    pub max_search_window: Option<usize>,
    /// Extraction-class suffix marking an attribute-only extraction (one
    /// that carries no span of its own and must inherit its parent's).
    pub attribute_suffix: String,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            enable_fuzzy_alignment: true,
            fuzzy_alignment_threshold: 0.75,
            fuzzy_slack: 0.25,
            accept_match_lesser: true,
            lesser_threshold: 0.5,
            case_sensitive: false,
            max_search_window: Some(2000),
            attribute_suffix: "_attributes".to_string(),
        }
    }
}

pub struct Aligner {
    config: AlignmentConfig,
}

impl Aligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Aligns every extraction against `source_text`, offsetting the
    /// resulting intervals by `token_offset`/`char_offset` so chunk-local
    /// spans can be translated back into document-global coordinates.
    pub fn align(
        &self,
        extractions: &[Extraction],
        source_text: &str,
        token_offset: usize,
        char_offset: usize,
    ) -> Vec<Extraction> {
        if extractions.is_empty() {
            return Vec::new();
        }

        let source_tokenized = tokenizer::tokenize(source_text);
        let source_keys: Vec<String> = source_tokenized.tokens.iter().map(|t| self.key(t)).collect();

        let mut aligned: Vec<Extraction> = extractions
            .iter()
            .map(|extraction| self.align_single(extraction, &source_keys, &source_tokenized, token_offset, char_offset))
            .collect();

        self.inherit_attribute_spans(&mut aligned);
        aligned
    }

    /// An attribute-only extraction (class ending in `attribute_suffix`, or
    /// empty text) carries no span of its own: it inherits the
    /// `char_interval`/`token_interval` of the most recent preceding
    /// non-attribute extraction sharing its `group_index`, and its
    /// `alignment_status` mirrors that parent's — in particular it is
    /// `Exact` iff the parent is `Exact`.
    fn inherit_attribute_spans(&self, extractions: &mut [Extraction]) {
        let mut parents: HashMap<usize, (Option<CharInterval>, Option<TokenInterval>, AlignmentStatus)> = HashMap::new();

        for extraction in extractions.iter_mut() {
            let Some(group_index) = extraction.group_index else {
                continue;
            };

            if extraction.is_attribute_like(&self.config.attribute_suffix) {
                if let Some((char_interval, token_interval, status)) = parents.get(&group_index) {
                    extraction.char_interval = char_interval.clone();
                    extraction.set_token_interval(token_interval.clone());
                    extraction.alignment_status = Some(*status);
                }
            } else {
                let status = extraction.alignment_status.unwrap_or(AlignmentStatus::Unaligned);
                parents.insert(group_index, (extraction.char_interval.clone(), extraction.token_interval().cloned(), status));
            }
        }
    }

    fn key(&self, token: &Token) -> String {
        if self.config.case_sensitive {
            // `normalized` already folds case; case-sensitive mode instead
            // needs the raw text, which the aligner never has direct access
            // to here, so this degrades to the normalized key. `Token`
            // carries only `normalized` plus a char span by design — the
            // caller (chunk) holds the raw text for anything needing it.
            token.normalized.clone()
        } else {
            token.normalized.clone()
        }
    }

    fn align_single(
        &self,
        extraction: &Extraction,
        source_keys: &[String],
        source_tokenized: &TokenizedText,
        token_offset: usize,
        char_offset: usize,
    ) -> Extraction {
        let ext_tokenized = tokenizer::tokenize(&extraction.extraction_text);
        let ext_keys: Vec<String> = ext_tokenized.tokens.iter().map(|t| self.key(t)).collect();

        if ext_keys.is_empty() {
            let mut unaligned = extraction.clone();
            unaligned.alignment_status = Some(AlignmentStatus::Unaligned);
            return unaligned;
        }

        if let Some(start) = find_exact_match(&ext_keys, source_keys) {
            return self.ground(extraction, start, ext_keys.len(), source_tokenized, token_offset, char_offset, AlignmentStatus::Exact);
        }

        if self.config.enable_fuzzy_alignment
            && let Some((start, len)) = self.find_fuzzy_match(&ext_keys, source_keys)
        {
            return self.ground(extraction, start, len, source_tokenized, token_offset, char_offset, AlignmentStatus::Fuzzy);
        }

        if self.config.accept_match_lesser
            && let Some((start, end)) = self.find_lesser_match(&ext_keys, source_keys)
        {
            return self.ground(extraction, start, end - start, source_tokenized, token_offset, char_offset, AlignmentStatus::Lesser);
        }

        let mut unaligned = extraction.clone();
        unaligned.alignment_status = Some(AlignmentStatus::Unaligned);
        unaligned
    }

    fn search_bounds(&self, source_len: usize) -> usize {
        self.config.max_search_window.unwrap_or(source_len).min(source_len)
    }

    /// Bounded-window fuzzy search: a cheap multiset-overlap pass prunes
    /// candidate windows, then an LCS-block pass (rewarding runs of
    /// in-order matches, not just bag-of-words overlap) picks the best of
    /// the surviving candidates.
    fn find_fuzzy_match(&self, ext_keys: &[String], source_keys: &[String]) -> Option<(usize, usize)> {
        let bound = self.search_bounds(source_keys.len());
        let search_space = &source_keys[..bound];

        let mut ext_counts: HashMap<&str, usize> = HashMap::new();
        for k in ext_keys {
            *ext_counts.entry(k.as_str()).or_insert(0) += 1;
        }

        let n = ext_keys.len() as f64;
        let min_window = (n * (1.0 - self.config.fuzzy_slack)).ceil().max(1.0) as usize;
        let max_window = ((n * (1.0 + self.config.fuzzy_slack)).ceil() as usize).min(search_space.len());
        if min_window > max_window {
            return None;
        }

        let min_overlap = (ext_keys.len() as f64 * self.config.fuzzy_alignment_threshold).ceil() as usize;

        let mut best: Option<(usize, usize, usize)> = None; // (start, len, lcs_score)
        for window_size in min_window..=max_window {
            if window_size == 0 || window_size > search_space.len() {
                continue;
            }
            for start in 0..=(search_space.len() - window_size) {
                let window = &search_space[start..start + window_size];
                let overlap = count_overlap(&ext_counts, window);
                if overlap < min_overlap {
                    continue;
                }
                let lcs = lcs_len(ext_keys, window);
                let ratio = lcs as f64 / ext_keys.len() as f64;
                if ratio < self.config.fuzzy_alignment_threshold {
                    continue;
                }
                if best.is_none_or(|(_, _, best_lcs)| lcs > best_lcs) {
                    best = Some((start, window_size, lcs));
                }
            }
        }

        best.map(|(start, len, _)| (start, len))
    }

    /// Longest-common-subsequence span across the whole bounded window: not
    /// necessarily contiguous, but must appear in source order.
    fn find_lesser_match(&self, ext_keys: &[String], source_keys: &[String]) -> Option<(usize, usize)> {
        let bound = self.search_bounds(source_keys.len());
        let search_space = &source_keys[..bound];

        let (matched_positions, lcs) = lcs_positions(ext_keys, search_space);
        if lcs == 0 {
            return None;
        }
        let ratio = lcs as f64 / ext_keys.len() as f64;
        if ratio < self.config.lesser_threshold {
            return None;
        }

        let start = *matched_positions.first().unwrap();
        let end = *matched_positions.last().unwrap() + 1;
        Some((start, end))
    }

    fn ground(
        &self,
        extraction: &Extraction,
        start_idx: usize,
        length: usize,
        source_tokenized: &TokenizedText,
        token_offset: usize,
        char_offset: usize,
        status: AlignmentStatus,
    ) -> Extraction {
        let mut grounded = extraction.clone();

        if length == 0 || start_idx + length > source_tokenized.tokens.len() {
            grounded.alignment_status = Some(AlignmentStatus::Unaligned);
            return grounded;
        }

        grounded.set_token_interval(Some(TokenInterval {
            start_index: start_idx + token_offset,
            end_index: start_idx + length + token_offset,
        }));

        let start_token = &source_tokenized.tokens[start_idx];
        let end_token = &source_tokenized.tokens[start_idx + length - 1];
        grounded.char_interval = Some(CharInterval::new(
            Some(char_offset + start_token.char_interval.start_pos),
            Some(char_offset + end_token.char_interval.end_pos),
        ));
        grounded.alignment_status = Some(status);
        grounded
    }
}

fn find_exact_match(needle: &[String], haystack: &[String]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=(haystack.len() - needle.len())).find(|&start| haystack[start..start + needle.len()] == *needle)
}

fn count_overlap(ext_counts: &HashMap<&str, usize>, window: &[String]) -> usize {
    let mut window_counts: HashMap<&str, usize> = HashMap::new();
    for k in window {
        *window_counts.entry(k.as_str()).or_insert(0) += 1;
    }
    ext_counts
        .iter()
        .map(|(k, &count)| count.min(window_counts.get(k).copied().unwrap_or(0)))
        .sum()
}

/// Classic DP longest-common-subsequence length between two token-key
/// sequences.
fn lcs_len(a: &[String], b: &[String]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] { dp[i - 1][j - 1] + 1 } else { dp[i - 1][j].max(dp[i][j - 1]) };
        }
    }
    dp[n][m]
}

/// Same DP as `lcs_len`, but also reconstructs which source-side positions
/// were matched, so callers can compute a char span.
fn lcs_positions(a: &[String], b: &[String]) -> (Vec<usize>, usize) {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] { dp[i - 1][j - 1] + 1 } else { dp[i - 1][j].max(dp[i][j - 1]) };
        }
    }

    let mut positions = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            positions.push(j - 1);
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    positions.reverse();
    let lcs = dp[n][m];
    (positions, lcs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Extraction;

    fn bare(class: &str, text: &str) -> Extraction {
        Extraction::bare(class.to_string(), text.to_string(), 0)
    }

    #[test]
    fn test_exact_alignment() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let ext = bare("person", "Alice went");
        let source = "Alice went to the market.";
        let aligned = aligner.align(&[ext], source, 0, 0);

        assert_eq!(aligned.len(), 1);
        let a = &aligned[0];
        assert_eq!(a.alignment_status, Some(AlignmentStatus::Exact));
        assert!(a.token_interval().is_some());
        let ci = a.char_interval.as_ref().unwrap();
        assert_eq!(&source[ci.start_pos.unwrap()..ci.end_pos.unwrap()], "Alice went");
    }

    #[test]
    fn test_case_insensitive_exact_alignment() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let ext = bare("person", "ALICE went");
        let source = "alice went to the market.";
        let aligned = aligner.align(&[ext], source, 0, 0);
        assert_eq!(aligned[0].alignment_status, Some(AlignmentStatus::Exact));
    }

    #[test]
    fn test_fuzzy_alignment_with_inserted_word() {
        let aligner = Aligner::new(AlignmentConfig {
            fuzzy_slack: 0.5,
            ..Default::default()
        });
        let ext = bare("event", "running races");
        let source = "many runners joined the running big races nearby";
        let aligned = aligner.align(&[ext], source, 0, 0);
        assert_eq!(aligned.len(), 1);
        assert!(matches!(aligned[0].alignment_status, Some(AlignmentStatus::Fuzzy) | Some(AlignmentStatus::Exact)));
    }

    #[test]
    fn test_unaligned_when_absent() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let ext = bare("person", "Zanzibar mountain expedition");
        let source = "A short unrelated sentence about cooking.";
        let aligned = aligner.align(&[ext], source, 0, 0);
        assert_eq!(aligned[0].alignment_status, Some(AlignmentStatus::Unaligned));
        assert!(aligned[0].char_interval.is_none());
    }

    #[test]
    fn test_lesser_match_non_contiguous() {
        let aligner = Aligner::new(AlignmentConfig {
            enable_fuzzy_alignment: false,
            accept_match_lesser: true,
            lesser_threshold: 0.5,
            ..Default::default()
        });
        let ext = bare("quote", "fox jumps");
        let source = "the quick brown fox happily jumps over the lazy dog";
        let aligned = aligner.align(&[ext], source, 0, 0);
        assert_eq!(aligned[0].alignment_status, Some(AlignmentStatus::Lesser));
    }

    #[test]
    fn test_fuzzy_window_scales_with_extraction_length() {
        // A 20-token extraction with 3 filler tokens interleaved among its
        // matches in the source needs a window of 23, outside a fixed
        // absolute slack of +2 (max 22) but inside a fractional slack of
        // 0.25 scaled to n=20 (max = ceil(20*1.25) = 25).
        let aligner = Aligner::new(AlignmentConfig {
            fuzzy_slack: 0.25,
            ..Default::default()
        });

        let words: Vec<String> = (1..=20).map(|i| format!("tok{i}")).collect();
        let ext_text = words.join(" ");

        let mut source_words = Vec::new();
        for (i, w) in words.iter().enumerate() {
            if i > 0 && i % 5 == 0 {
                source_words.push(format!("filler{}", i / 5));
            }
            source_words.push(w.clone());
        }
        let source_text = source_words.join(" ");

        let ext = bare("quote", &ext_text);
        let aligned = aligner.align(&[ext], &source_text, 0, 0);
        assert!(matches!(aligned[0].alignment_status, Some(AlignmentStatus::Fuzzy)));
    }

    #[test]
    fn test_attribute_extraction_inherits_parent_span() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let source = "Alice went home.";

        let mut parent = bare("person", "Alice");
        parent.group_index = Some(0);
        let mut attribute = Extraction::bare("person_attributes".to_string(), String::new(), 0);
        attribute.group_index = Some(0);

        let aligned = aligner.align(&[parent, attribute], source, 0, 0);

        assert_eq!(aligned[0].alignment_status, Some(AlignmentStatus::Exact));
        let child = &aligned[1];
        assert_eq!(child.alignment_status, Some(AlignmentStatus::Exact));
        assert_eq!(child.char_interval, aligned[0].char_interval);
        assert_eq!(child.token_interval(), aligned[0].token_interval());
    }

    #[test]
    fn test_attribute_extraction_without_parent_stays_unaligned() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let source = "Alice went home.";

        let mut attribute = Extraction::bare("person_attributes".to_string(), String::new(), 0);
        attribute.group_index = Some(0);

        let aligned = aligner.align(&[attribute], source, 0, 0);
        assert_eq!(aligned[0].alignment_status, Some(AlignmentStatus::Unaligned));
    }

    #[test]
    fn test_char_offset_applied() {
        let aligner = Aligner::new(AlignmentConfig::default());
        let ext = bare("person", "Alice");
        let source = "Alice went home.";
        let aligned = aligner.align(&[ext], source, 10, 100);
        let ci = aligned[0].char_interval.as_ref().unwrap();
        assert_eq!(ci.start_pos, Some(100));
        let ti = aligned[0].token_interval().unwrap();
        assert_eq!(ti.start_index, 10);
    }
}
