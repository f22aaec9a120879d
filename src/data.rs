use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::tokenizer::{TokenInterval, TokenizedText, tokenize};

/// Confidence label attached to a grounded extraction.
///
/// Ordering is strongest-first: `Exact > Fuzzy > Lesser > Unaligned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignmentStatus {
    Exact,
    Fuzzy,
    Lesser,
    Unaligned,
}

impl AlignmentStatus {
    fn rank(self) -> u8 {
        match self {
            AlignmentStatus::Exact => 3,
            AlignmentStatus::Fuzzy => 2,
            AlignmentStatus::Lesser => 1,
            AlignmentStatus::Unaligned => 0,
        }
    }
}

impl PartialOrd for AlignmentStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AlignmentStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlignmentStatus::Exact => write!(f, "exact"),
            AlignmentStatus::Fuzzy => write!(f, "fuzzy"),
            AlignmentStatus::Lesser => write!(f, "lesser"),
            AlignmentStatus::Unaligned => write!(f, "unaligned"),
        }
    }
}

impl TryFrom<&str> for AlignmentStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "exact" => Ok(AlignmentStatus::Exact),
            "fuzzy" => Ok(AlignmentStatus::Fuzzy),
            "lesser" => Ok(AlignmentStatus::Lesser),
            "unaligned" => Ok(AlignmentStatus::Unaligned),
            _ => Err(format!("Unknown alignment status: {}", s)),
        }
    }
}

/// Half-open character span `[start_pos, end_pos)` over a document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharInterval {
    pub start_pos: Option<usize>,
    pub end_pos: Option<usize>,
}

impl CharInterval {
    pub fn new(start_pos: Option<usize>, end_pos: Option<usize>) -> Self {
        Self { start_pos, end_pos }
    }

    /// `true` when both bounds are set and the interval is non-empty.
    pub fn is_resolved(&self) -> bool {
        matches!((self.start_pos, self.end_pos), (Some(s), Some(e)) if s < e)
    }
}

/// A dynamic attribute value attached to an extraction.
///
/// Covers the shapes a language model plausibly emits for an attribute: a
/// bare string, an ordered list of strings, a number, a bool, or null.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    List(Vec<String>),
    Num(f64),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => AttributeValue::Str(s.clone()),
            serde_json::Value::Array(arr) => {
                AttributeValue::List(arr.iter().map(json_to_plain_string).collect())
            }
            serde_json::Value::Number(n) => AttributeValue::Num(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Object(_) => AttributeValue::Str(value.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Str(s) => serde_json::Value::String(s.clone()),
            AttributeValue::List(items) => {
                serde_json::Value::Array(items.iter().map(|s| serde_json::Value::String(s.clone())).collect())
            }
            AttributeValue::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Null => serde_json::Value::Null,
        }
    }
}

fn json_to_plain_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub type AttributeMap = HashMap<String, AttributeValue>;

/// One structured record attributed to a span of source text.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub extraction_class: String,
    pub extraction_text: String,
    pub char_interval: Option<CharInterval>,
    pub alignment_status: Option<AlignmentStatus>,
    pub extraction_index: Option<usize>,
    pub group_index: Option<usize>,
    pub description: Option<String>,
    pub attributes: Option<AttributeMap>,
    token_interval: Option<TokenInterval>,
}

impl Extraction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extraction_class: String,
        extraction_text: String,
        token_interval: Option<TokenInterval>,
        char_interval: Option<CharInterval>,
        alignment_status: Option<AlignmentStatus>,
        extraction_index: Option<usize>,
        group_index: Option<usize>,
        description: Option<String>,
        attributes: Option<AttributeMap>,
    ) -> Self {
        Self {
            extraction_class,
            extraction_text,
            char_interval,
            token_interval,
            alignment_status,
            extraction_index,
            group_index,
            description,
            attributes,
        }
    }

    /// A bare, unaligned extraction as produced by the format normalizer,
    /// before the aligner has had a chance to ground it.
    pub fn bare(extraction_class: String, extraction_text: String, group_index: usize) -> Self {
        Self {
            extraction_class,
            extraction_text,
            char_interval: None,
            token_interval: None,
            alignment_status: None,
            extraction_index: None,
            group_index: Some(group_index),
            description: None,
            attributes: None,
        }
    }

    pub fn token_interval(&self) -> Option<&TokenInterval> {
        self.token_interval.as_ref()
    }

    pub fn set_token_interval(&mut self, value: Option<TokenInterval>) {
        self.token_interval = value;
    }

    /// True when the extraction carries no span of its own and should
    /// inherit its parent's: class ends with the configured attribute
    /// suffix, or the text is empty.
    pub fn is_attribute_like(&self, attribute_suffix: &str) -> bool {
        self.extraction_class.ends_with(attribute_suffix) || self.extraction_text.is_empty()
    }
}

/// Caller-owned, immutable input document.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub additional_context: Option<String>,
    document_id: Option<String>,
    tokenized_text: Option<TokenizedText>,
}

impl Document {
    pub fn new(text: String, document_id: Option<String>, additional_context: Option<String>) -> Self {
        Self {
            text,
            additional_context,
            document_id,
            tokenized_text: None,
        }
    }

    pub fn document_id(&mut self) -> String {
        if self.document_id.is_none() {
            self.document_id = Some(format!("doc_{}", &Uuid::new_v4().simple().to_string()[..8]));
        }
        self.document_id.clone().unwrap()
    }

    /// Returns the document id without generating one if unset.
    pub fn document_id_if_set(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn set_document_id(&mut self, value: Option<String>) {
        self.document_id = value;
    }

    pub fn tokenized_text(&mut self) -> &TokenizedText {
        if self.tokenized_text.is_none() {
            self.tokenized_text = Some(tokenize(&self.text));
        }
        self.tokenized_text.as_ref().unwrap()
    }

    pub fn set_tokenized_text(&mut self, value: TokenizedText) {
        self.tokenized_text = Some(value);
    }
}

/// A document plus the extractions grounded against it.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    pub extractions: Option<Vec<Extraction>>,
    pub text: Option<String>,
    document_id: Option<String>,
    tokenized_text: Option<TokenizedText>,
}

impl AnnotatedDocument {
    pub fn new(document_id: Option<String>, extractions: Option<Vec<Extraction>>, text: Option<String>) -> Self {
        Self {
            extractions,
            text,
            document_id,
            tokenized_text: None,
        }
    }

    pub fn document_id(&mut self) -> String {
        if self.document_id.is_none() {
            self.document_id = Some(format!("doc_{}", &Uuid::new_v4().simple().to_string()[..8]));
        }
        self.document_id.clone().unwrap()
    }

    pub fn set_document_id(&mut self, value: Option<String>) {
        self.document_id = value;
    }

    pub fn tokenized_text(&mut self) -> Option<&TokenizedText> {
        if self.tokenized_text.is_none()
            && let Some(ref text) = self.text
        {
            self.tokenized_text = Some(tokenize(text));
        }
        self.tokenized_text.as_ref()
    }

    pub fn set_tokenized_text(&mut self, value: TokenizedText) {
        self.tokenized_text = Some(value);
    }

    /// Sorts extractions by `(char_start, char_end)`, falling back to
    /// `extraction_index` for ties or unresolved intervals so emission
    /// order is preserved for unaligned extractions.
    pub fn sort_extractions(&mut self) {
        if let Some(extractions) = self.extractions.as_mut() {
            extractions.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        }
    }
}

fn sort_key(extraction: &Extraction) -> (usize, usize, usize) {
    let start = extraction
        .char_interval
        .as_ref()
        .and_then(|ci| ci.start_pos)
        .unwrap_or(usize::MAX);
    let end = extraction
        .char_interval
        .as_ref()
        .and_then(|ci| ci.end_pos)
        .unwrap_or(usize::MAX);
    let emission = extraction.extraction_index.unwrap_or(usize::MAX);
    (start, end, emission)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    Yaml,
    Json,
}

/// An extraction as it appears in a few-shot example: no intervals, just the
/// class/text/attributes the model is meant to imitate.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleExtraction {
    pub extraction_class: String,
    pub extraction_text: String,
    pub attributes: Option<AttributeMap>,
}

impl ExampleExtraction {
    pub fn new(extraction_class: String, extraction_text: String, attributes: Option<AttributeMap>) -> Self {
        Self {
            extraction_class,
            extraction_text,
            attributes,
        }
    }

    /// Widen into a full `Extraction` (no interval/status yet) so the
    /// aligner can be run against it during prompt validation.
    pub fn to_extraction(&self, group_index: usize) -> Extraction {
        Extraction::new(
            self.extraction_class.clone(),
            self.extraction_text.clone(),
            None,
            None,
            None,
            None,
            Some(group_index),
            None,
            self.attributes.clone(),
        )
    }
}

/// An `(input_text, expected_extractions)` pair used both for few-shot
/// prompting and for pre-flight alignment validation.
#[derive(Debug, Clone)]
pub struct ExampleData {
    pub text: String,
    pub extractions: Vec<ExampleExtraction>,
}

impl ExampleData {
    pub fn new(text: String, extractions: Vec<ExampleExtraction>) -> Self {
        Self { text, extractions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_char_interval_creation() {
        let interval = CharInterval::new(Some(0), Some(5));
        assert_eq!(interval.start_pos, Some(0));
        assert_eq!(interval.end_pos, Some(5));
        assert!(interval.is_resolved());
    }

    #[test]
    fn test_char_interval_unresolved() {
        assert!(!CharInterval::default().is_resolved());
        assert!(!CharInterval::new(Some(5), Some(5)).is_resolved());
    }

    #[test]
    fn test_document_id_generation() {
        let mut doc = Document::new("Hello World".to_string(), None, None);
        let id1 = doc.document_id();
        assert!(id1.starts_with("doc_"));
        let id2 = doc.document_id();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_document_id_setter() {
        let mut doc = Document::new("Hello".to_string(), None, None);
        doc.set_document_id(Some("custom_id".to_string()));
        assert_eq!(doc.document_id(), "custom_id".to_string());
    }

    #[test]
    fn test_tokenized_text_lazy_init() {
        let mut doc = Document::new("Hello World".to_string(), None, None);
        assert!(doc.tokenized_text.is_none());

        let tokens = doc.tokenized_text().tokens.clone();
        assert!(!tokens.is_empty());
        assert_eq!(tokens[0].index, 0);
        assert_eq!(tokens[0].token_type, crate::tokenizer::TokenType::Word);
        assert_eq!(tokens[0].char_interval.start_pos, 0);
        assert_eq!(tokens[0].char_interval.end_pos, 5);
    }

    #[test]
    fn test_annotated_document_generation() {
        let mut ann_doc = AnnotatedDocument::new(None, None, Some("Test Text".to_string()));
        let id = ann_doc.document_id();
        assert!(id.starts_with("doc_"));
    }

    #[test]
    fn test_extraction_with_attributes() {
        let mut attributes = HashMap::new();
        attributes.insert("key1".to_string(), AttributeValue::Str("value1".to_string()));
        attributes.insert(
            "key2".to_string(),
            AttributeValue::List(vec!["v1".to_string(), "v2".to_string()]),
        );

        let extraction = Extraction::new(
            "class1".to_string(),
            "text1".to_string(),
            None,
            None,
            Some(AlignmentStatus::Exact),
            Some(1),
            Some(2),
            Some("description".to_string()),
            Some(attributes),
        );

        assert_eq!(extraction.extraction_class, "class1");
        assert_eq!(extraction.extraction_text, "text1");
        assert_eq!(extraction.alignment_status, Some(AlignmentStatus::Exact));
    }

    #[test]
    fn test_example_data_creation() {
        let extraction = ExampleExtraction::new("class".to_string(), "text".to_string(), None);
        let example = ExampleData::new("Example text".to_string(), vec![extraction]);
        assert_eq!(example.text, "Example text");
        assert_eq!(example.extractions.len(), 1);
    }

    #[test]
    fn test_alignment_status_conversion_and_ordering() {
        let status_str = AlignmentStatus::Exact.to_string();
        assert_eq!(&status_str, "exact");

        let status = AlignmentStatus::try_from("fuzzy").unwrap();
        assert_eq!(status, AlignmentStatus::Fuzzy);

        assert!(AlignmentStatus::Exact > AlignmentStatus::Fuzzy);
        assert!(AlignmentStatus::Fuzzy > AlignmentStatus::Lesser);
        assert!(AlignmentStatus::Lesser > AlignmentStatus::Unaligned);
    }

    #[test]
    fn test_attribute_value_json_roundtrip() {
        let v = AttributeValue::from_json(&serde_json::json!(["a", "b"]));
        assert_eq!(v, AttributeValue::List(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(v.to_json(), serde_json::json!(["a", "b"]));

        let n = AttributeValue::from_json(&serde_json::json!(2.5));
        assert_eq!(n, AttributeValue::Num(2.5));
    }

    #[test]
    fn test_sort_extractions_by_char_start_then_emission() {
        let mut doc = AnnotatedDocument::new(
            None,
            Some(vec![
                Extraction::new(
                    "a".to_string(),
                    "x".to_string(),
                    None,
                    Some(CharInterval::new(Some(10), Some(20))),
                    Some(AlignmentStatus::Exact),
                    Some(0),
                    Some(0),
                    None,
                    None,
                ),
                Extraction::new(
                    "b".to_string(),
                    "y".to_string(),
                    None,
                    Some(CharInterval::new(Some(0), Some(5))),
                    Some(AlignmentStatus::Exact),
                    Some(1),
                    Some(1),
                    None,
                    None,
                ),
            ]),
            Some("0123456789".repeat(3)),
        );
        doc.sort_extractions();
        let extractions = doc.extractions.unwrap();
        assert_eq!(extractions[0].extraction_class, "b");
        assert_eq!(extractions[1].extraction_class, "a");
    }
}
