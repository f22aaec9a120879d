//! Turns raw language-model output text into bare, unaligned extractions.
//!
//! `FormatNormalizer` is tolerant of the handful of shapes a model plausibly
//! emits: a fenced or bare JSON/YAML document, wrapped under a configurable
//! key (default `"extractions"`), as a flat array, as a DeepSeek-style
//! per-category object with `_index`/`_attributes` suffix keys, or as a
//! nested `{category: [items]}` mapping. It does not ground extractions
//! against source text — that's `crate::aligner::Aligner`'s job.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

use crate::data::{AttributeMap, AttributeValue, Extraction};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Other: {0}")]
    Other(String),
}

pub type FormatResult<T> = Result<T, FormatError>;

const DEFAULT_EXTRACTIONS_KEY: &str = "extractions";

/// The language tag found on a fenced block's opening marker, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceHint {
    Json,
    Yaml,
}

/// Parses a single fenced or bare model response into bare extractions.
#[derive(Debug, Clone)]
pub struct FormatNormalizer {
    pub fence_output: bool,
    pub extraction_index_suffix: Option<String>,
    pub extraction_attributes_suffix: Option<String>,
    pub format_is_yaml: bool,
    pub wrapper_key: String,
}

impl Default for FormatNormalizer {
    fn default() -> Self {
        Self {
            fence_output: true,
            extraction_index_suffix: Some("_index".to_string()),
            extraction_attributes_suffix: Some("_attributes".to_string()),
            format_is_yaml: false,
            wrapper_key: DEFAULT_EXTRACTIONS_KEY.to_string(),
        }
    }
}

impl FormatNormalizer {
    pub fn new(
        fence_output: bool,
        extraction_index_suffix: Option<String>,
        extraction_attributes_suffix: Option<String>,
        format_is_yaml: bool,
    ) -> Self {
        Self {
            fence_output,
            extraction_index_suffix,
            extraction_attributes_suffix,
            format_is_yaml,
            wrapper_key: DEFAULT_EXTRACTIONS_KEY.to_string(),
        }
    }

    pub fn with_wrapper_key(mut self, wrapper_key: impl Into<String>) -> Self {
        self.wrapper_key = wrapper_key.into();
        self
    }

    /// Strips a leading `<think>...</think>` reasoning block some models
    /// emit before their actual answer.
    fn strip_think_tags(&self, input: &str) -> String {
        let mut text = input;
        while let Some(start) = text.find("<think>") {
            if let Some(end_rel) = text[start..].find("</think>") {
                let end = start + end_rel + "</think>".len();
                return format!("{}{}", &text[..start], self.strip_think_tags(&text[end..]));
            } else {
                break;
            }
        }
        text.to_string()
    }

    fn extract_and_parse_content(&self, input_string: &str) -> FormatResult<JsonValue> {
        if input_string.trim().is_empty() {
            return Err(FormatError::Parse("Input string must be a non-empty string.".to_string()));
        }

        let destripped = self.strip_think_tags(input_string);

        if self.fence_output {
            let (content, hint) = self.extract_fenced_content(&destripped)?;
            match hint {
                Some(FenceHint::Json) => Ok(serde_json::from_str(&content)?),
                Some(FenceHint::Yaml) => Ok(serde_yaml::from_str(&content)?),
                None => Self::parse_json_then_yaml(&content),
            }
        } else {
            let content = destripped.trim();
            if self.format_is_yaml {
                Ok(serde_yaml::from_str(content)?)
            } else {
                Ok(serde_json::from_str(content)?)
            }
        }
    }

    /// No language hint on the fence: try JSON first, then YAML, since a
    /// strict JSON parse rejects malformed input while YAML would often
    /// accept it, and JSON is a subset of YAML.
    fn parse_json_then_yaml(content: &str) -> FormatResult<JsonValue> {
        match serde_json::from_str(content) {
            Ok(value) => Ok(value),
            Err(_) => Ok(serde_yaml::from_str(content)?),
        }
    }

    /// Locates the fenced block and, when present, the language hint on its
    /// opening marker (` ```json `/` ```yaml `/` ```yml `). Falls back to a
    /// bare ` ``` ` fence with no hint when none of those tags appear.
    fn extract_fenced_content(&self, input_string: &str) -> FormatResult<(String, Option<FenceHint>)> {
        const HINTED_TAGS: [(&str, FenceHint); 3] = [("```yaml", FenceHint::Yaml), ("```yml", FenceHint::Yaml), ("```json", FenceHint::Json)];

        let earliest = HINTED_TAGS
            .iter()
            .filter_map(|&(tag, hint)| input_string.find(tag).map(|pos| (pos, tag, hint)))
            .min_by_key(|&(pos, _, _)| pos);

        if let Some((start, tag, hint)) = earliest
            && let Some(end) = input_string[start + tag.len()..].find("```")
        {
            let content_start = start + tag.len();
            let content_end = content_start + end;
            return Ok((input_string[content_start..content_end].trim().to_string(), Some(hint)));
        }

        // Fall back to a bare ``` fence (some models omit the language tag).
        if let Some(start) = input_string.find("```")
            && let Some(end) = input_string[start + 3..].find("```")
        {
            let content_start = start + 3;
            let content_end = content_start + end;
            return Ok((input_string[content_start..content_end].trim().to_string(), None));
        }

        Err(FormatError::Parse("Input string does not contain valid fence markers.".to_string()))
    }

    /// Normalizes the parsed JSON/YAML value into a list of flat
    /// `{key: value, ...}` groups, one per extraction (or per category item).
    fn string_to_extraction_data(&self, input_string: &str) -> FormatResult<Vec<HashMap<String, JsonValue>>> {
        let parsed = self.extract_and_parse_content(input_string)?;

        if let Some(array) = parsed.as_array() {
            let mut single_group = HashMap::new();
            for (index, item) in array.iter().enumerate() {
                let key = if array.len() == 1 { "text".to_string() } else { format!("text_{}", index) };
                if let Some(text) = item.as_str() {
                    single_group.insert(key, JsonValue::String(text.to_string()));
                } else {
                    single_group.insert(key, item.clone());
                }
            }
            return Ok(vec![single_group]);
        }

        if let Some(obj) = parsed.as_object() {
            if let Some(extractions) = obj.get(self.wrapper_key.as_str()) {
                let arr = extractions
                    .as_array()
                    .ok_or_else(|| FormatError::Parse(format!("The '{}' value must be a sequence (list).", self.wrapper_key)))?;

                if let Some(first_obj) = arr.first().and_then(|v| v.as_object()) {
                    let mut has_category_fields = false;
                    for key in first_obj.keys() {
                        if !key.ends_with("_attributes") && key != "extraction_class" && key != "extraction_text" {
                            has_category_fields = true;
                            break;
                        }
                    }

                    if has_category_fields {
                        return Ok(self.extract_category_fields(arr));
                    }
                }

                let mut result = Vec::with_capacity(arr.len());
                for item in arr {
                    if let Some(map) = item.as_object() {
                        let mut hm = HashMap::with_capacity(map.len());
                        for (k, v) in map {
                            hm.insert(k.clone(), v.clone());
                        }
                        result.push(hm);
                    } else if let Some(text) = item.as_str() {
                        let mut hm = HashMap::new();
                        hm.insert("text".to_string(), JsonValue::String(text.to_string()));
                        result.push(hm);
                    } else {
                        let mut hm = HashMap::new();
                        hm.insert("text".to_string(), item.clone());
                        result.push(hm);
                    }
                }
                return Ok(result);
            }

            let mut result = Vec::new();
            for (category, value) in obj {
                if let Some(array) = value.as_array() {
                    for item in array.iter() {
                        let mut extraction_map = HashMap::new();
                        extraction_map.insert("extraction_class".to_string(), JsonValue::String(category.clone()));
                        if let Some(text) = item.as_str() {
                            extraction_map.insert("extraction_text".to_string(), JsonValue::String(text.to_string()));
                        } else {
                            extraction_map.insert("extraction_text".to_string(), item.clone());
                        }
                        result.push(extraction_map);
                    }
                } else {
                    let mut extraction_map = HashMap::new();
                    extraction_map.insert("extraction_class".to_string(), JsonValue::String(category.clone()));
                    extraction_map.insert("extraction_text".to_string(), value.clone());
                    result.push(extraction_map);
                }
            }
            return Ok(result);
        }

        Err(FormatError::Parse(
            "Content must be an array, a mapping with a wrapper key, or a category-based mapping.".to_string(),
        ))
    }

    /// Handles the per-category shape some providers emit:
    /// `[{"characters": "text", "characters_attributes": {...}}, ...]`.
    fn extract_category_fields(&self, arr: &[JsonValue]) -> Vec<HashMap<String, JsonValue>> {
        let mut result = Vec::new();
        for item in arr {
            let Some(item_obj) = item.as_object() else { continue };
            for (key, value) in item_obj {
                let should_skip = key.ends_with("_attributes")
                    || self.extraction_index_suffix.as_deref().is_some_and(|suf| key.ends_with(suf));
                if should_skip {
                    continue;
                }

                let mut extraction_map = HashMap::new();
                extraction_map.insert("extraction_class".to_string(), JsonValue::String(key.clone()));
                extraction_map.insert("extraction_text".to_string(), value.clone());

                if let Some(index_suffix) = &self.extraction_index_suffix {
                    let index_key = format!("{}{}", key, index_suffix);
                    if let Some(index_value) = item_obj.get(&index_key) {
                        extraction_map.insert(format!("extraction_text{}", index_suffix), index_value.clone());
                    }
                }
                if let Some(attr_suffix) = &self.extraction_attributes_suffix {
                    let attr_key = format!("{}{}", key, attr_suffix);
                    if let Some(attr_value) = item_obj.get(&attr_key) {
                        extraction_map.insert(format!("extraction_text{}", attr_suffix), attr_value.clone());
                    }
                }

                result.push(extraction_map);
            }
        }
        result
    }

    fn extract_ordered_extractions_impl(&self, extraction_data: &[HashMap<String, JsonValue>]) -> FormatResult<Vec<Extraction>> {
        let mut processed = Vec::new();
        let mut default_index_counter = 0usize;
        let index_suffix = self.extraction_index_suffix.as_deref();
        let attributes_suffix = self.extraction_attributes_suffix.as_deref();

        for (group_index, group) in extraction_data.iter().enumerate() {
            if let Some(suf) = index_suffix {
                for (key, value) in group {
                    if key.ends_with(suf) && !value.is_number() {
                        return Err(FormatError::Other("Index values must be integers.".to_string()));
                    }
                }
            }

            if group.contains_key("extraction_class") && group.contains_key("extraction_text") {
                let extraction_class = group
                    .get("extraction_class")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| FormatError::Parse("extraction_class must be a string".to_string()))?;

                let extraction_text = convert_to_text(
                    group
                        .get("extraction_text")
                        .ok_or_else(|| FormatError::Parse("extraction_text is required".to_string()))?,
                )?;

                let extraction_index = get_extraction_index(group, "extraction_text", index_suffix, &mut default_index_counter)?;
                let attributes = get_attributes(group, "extraction_text", attributes_suffix)?;

                processed.push(Extraction::new(
                    extraction_class.to_string(),
                    extraction_text,
                    None,
                    None,
                    None,
                    Some(extraction_index),
                    Some(group_index),
                    None,
                    attributes,
                ));
            } else {
                for (key, value) in group {
                    if index_suffix.is_some_and(|suf| key.ends_with(suf)) {
                        continue;
                    }
                    if attributes_suffix.is_some_and(|suf| key.ends_with(suf)) {
                        continue;
                    }

                    let text_val = convert_to_text(value)?;
                    let extraction_index = get_extraction_index(group, key, index_suffix, &mut default_index_counter)?;
                    let attributes = get_attributes(group, key, attributes_suffix)?;

                    processed.push(Extraction::new(
                        key.clone(),
                        text_val,
                        None,
                        None,
                        None,
                        Some(extraction_index),
                        Some(group_index),
                        None,
                        attributes,
                    ));
                }
            }
        }

        processed.sort_by_key(|e| (e.extraction_index, e.group_index));
        Ok(processed)
    }

    /// Parse a single model response into bare, unaligned extractions ready
    /// for `Aligner::align`.
    pub fn parse_extractions_from_string(&self, input: &str) -> FormatResult<Vec<Extraction>> {
        let parsed = self.string_to_extraction_data(input)?;
        self.extract_ordered_extractions_impl(&parsed)
    }

    /// Same as `parse_extractions_from_string`, but swallows parse errors
    /// and returns an empty extraction list instead — used when a caller
    /// would rather skip a malformed chunk than fail the whole pass.
    pub fn resolve(&self, input_text: &str, suppress_parse_errors: bool) -> FormatResult<Vec<Extraction>> {
        match self.parse_extractions_from_string(input_text) {
            Ok(extractions) => Ok(extractions),
            Err(e) => {
                if suppress_parse_errors {
                    log::warn!("suppressing format parse error: {}", e);
                    Ok(Vec::new())
                } else {
                    Err(e)
                }
            }
        }
    }
}

fn convert_to_text(value: &JsonValue) -> FormatResult<String> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Null => Ok(String::new()),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(FormatError::Other("Extraction text must be string or number.".to_string()))
        }
    }
}

fn get_extraction_index(
    group: &HashMap<String, JsonValue>,
    key: &str,
    index_suffix: Option<&str>,
    default_counter: &mut usize,
) -> FormatResult<usize> {
    if let Some(suf) = index_suffix {
        let index_key = format!("{}{}", key, suf);
        if let Some(idx_val) = group.get(&index_key) {
            return idx_val.as_u64().map(|n| n as usize).ok_or_else(|| FormatError::Other("Index must be integer.".to_string()));
        }
    }

    *default_counter += 1;
    Ok(*default_counter)
}

fn get_attributes(group: &HashMap<String, JsonValue>, key: &str, attributes_suffix: Option<&str>) -> FormatResult<Option<AttributeMap>> {
    if let Some(suf) = attributes_suffix {
        let attr_key = format!("{}{}", key, suf);
        if let Some(v) = group.get(&attr_key) {
            return match v {
                JsonValue::Object(map) => {
                    let mut out = AttributeMap::new();
                    for (k, v) in map {
                        out.insert(k.clone(), AttributeValue::from_json(v));
                    }
                    Ok(Some(out))
                }
                JsonValue::Null => Ok(None),
                _ => Err(FormatError::Other("Attributes must be a mapping or null.".to_string())),
            };
        }
    }
    Ok(None)
}
