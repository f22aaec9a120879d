use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::data::{ AnnotatedDocument, AttributeValue, CharInterval, Extraction};
use crate::tokenizer::TokenInterval;

pub fn annotated_document_to_dict(adoc: &AnnotatedDocument) -> Value {
    if adoc.text.is_none() && adoc.extractions.is_none() {
        return Value::Object(Map::new());
    }

    let mut map = Map::new();

    // text
    if let Some(ref text) = adoc.text {
        map.insert("text".to_string(), Value::String(text.clone()));
    }

    // document_id
    map.insert(
        "document_id".to_string(),
        Value::String(adoc.clone().document_id()),
    );

    // extractions
    if let Some(ref extractions) = adoc.extractions {
        let mut ext_array = Vec::new();
        for ext in extractions {
            let mut ext_map = Map::new();
            ext_map.insert(
                "extraction_class".to_string(),
                Value::String(ext.extraction_class.clone()),
            );
            ext_map.insert(
                "extraction_text".to_string(),
                Value::String(ext.extraction_text.clone()),
            );

            // alignment_status
            if let Some(status) = &ext.alignment_status {
                ext_map.insert(
                    "alignment_status".to_string(),
                    Value::String(status.to_string()),
                );
            }

            // char_interval
            if let Some(ref char_interval) = ext.char_interval {
                let mut ci = Map::new();
                if let Some(start) = char_interval.start_pos {
                    ci.insert("start".to_string(), Value::Number(start.into()));
                }
                if let Some(end) = char_interval.end_pos {
                    ci.insert("end".to_string(), Value::Number(end.into()));
                }
                ext_map.insert("char_interval".to_string(), Value::Object(ci));
            }

            // token_interval
            if let Some(ref token_interval) = ext.token_interval() {
                let mut ti = Map::new();
                ti.insert(
                    "start".to_string(),
                    Value::Number(token_interval.start_index.into()),
                );
                ti.insert(
                    "end".to_string(),
                    Value::Number(token_interval.end_index.into()),
                );
                ext_map.insert("token_interval".to_string(), Value::Object(ti));
            }

            // attributes
            if let Some(ref attrs) = ext.attributes {
                let mut attr_map = Map::new();
                for (k, v) in attrs {
                    attr_map.insert(k.clone(), v.to_json());
                }
                ext_map.insert("attributes".to_string(), Value::Object(attr_map));
            }

            // group_index
            if let Some(group_index) = ext.group_index {
                ext_map.insert("group_index".to_string(), Value::Number(group_index.into()));
            }

            // description
            if let Some(ref description) = ext.description {
                ext_map.insert("description".to_string(), Value::String(description.clone()));
            }

            ext_array.push(Value::Object(ext_map));
        }
        map.insert("extractions".to_string(), Value::Array(ext_array));
    }

    Value::Object(map)
}

pub fn dict_to_annotated_document(value: &Value) -> AnnotatedDocument {
    if !value.is_object() {
        return AnnotatedDocument::new(None, None, None);
    }

    let map = value.as_object().unwrap();

    let document_id = map
        .get("document_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let text = map
        .get("text")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let extractions = map
        .get("extractions")
        .and_then(|v| v.as_array())
        .map(|extractions| {
            extractions
                .iter()
                .filter_map(|ext_val| {
                    let ext_obj = ext_val.as_object()?;

                    let extraction_class = ext_obj
                        .get("extraction_class")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    let extraction_text = ext_obj
                        .get("extraction_text")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();

                    // alignment_status
                    let alignment_status = ext_obj
                        .get("alignment_status")
                        .and_then(|v| v.as_str())
                        .and_then(|s| s.try_into().ok());

                    // char_interval
                    let char_interval = ext_obj.get("char_interval").and_then(|ci| {
                        let start = ci.get("start").and_then(|v| v.as_u64()).map(|x| x as usize);
                        let end = ci.get("end").and_then(|v| v.as_u64()).map(|x| x as usize);
                        Some(CharInterval::new(start, end))
                    });

                    // token_interval
                    let token_interval = ext_obj.get("token_interval").and_then(|ti| {
                        let start = ti.get("start").and_then(|v| v.as_u64()).map(|x| x as usize);
                        let end = ti.get("end").and_then(|v| v.as_u64()).map(|x| x as usize);
                        Some(TokenInterval {
                            start_index: start.unwrap(),
                            end_index: end.unwrap(),
                        })
                    });

                    // attributes
                    let attributes = ext_obj.get("attributes").and_then(|attrs| {
                        let obj = attrs.as_object()?;
                        let mut map = HashMap::new();
                        for (k, v) in obj {
                            map.insert(k.clone(), AttributeValue::from_json(v));
                        }
                        Some(map)
                    });

                    let group_index = ext_obj.get("group_index").and_then(|v| v.as_u64()).map(|x| x as usize);
                    let description = ext_obj
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());

                    Some(Extraction::new(
                        extraction_class,
                        extraction_text,
                        token_interval,
                        char_interval,
                        alignment_status,
                        None,
                        group_index,
                        description,
                        attributes,
                    ))
                })
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty());

    AnnotatedDocument::new(document_id, extractions, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        AlignmentStatus, AnnotatedDocument, AttributeValue, CharInterval, Extraction,
    };
    use crate::tokenizer::TokenInterval;
    use std::collections::HashMap;

    #[test]
    fn test_annotated_document_to_dict_and_back() {
        let char_interval = CharInterval::new(Some(0), Some(5));
        let token_interval = TokenInterval {
            start_index: 0,
            end_index: 2,
        };
        let mut attributes = HashMap::new();
        attributes.insert(
            "attr1".to_string(),
            AttributeValue::Str("value1".to_string()),
        );

        let extraction = Extraction::new(
            "class1".to_string(),
            "text1".to_string(),
            Some(token_interval.clone()),
            Some(char_interval.clone()),
            Some(AlignmentStatus::Exact),
            None,
            None,
            None,
            Some(attributes.clone()),
        );

        let adoc = AnnotatedDocument::new(
            Some("doc_1234".to_string()),
            Some(vec![extraction]),
            Some("hello".to_string()),
        );

        let dict = annotated_document_to_dict(&adoc);
        assert!(
            dict.get("document_id")
                .unwrap()
                .as_str()
                .unwrap()
                .starts_with("doc_")
        );

        let adoc_back = dict_to_annotated_document(&dict);

        assert_eq!(adoc_back.text.unwrap(), "hello".to_string());
        assert_eq!(adoc_back.extractions.unwrap().len(), 1);
    }

    #[test]
    fn test_empty_annotated_document() {
        let adoc = AnnotatedDocument::new(None, None, None);
        let dict = annotated_document_to_dict(&adoc);
        assert!(dict.as_object().unwrap().is_empty());

        dbg!(&adoc);
        dbg!(&dict);
        let adoc_back = dict_to_annotated_document(&dict);
        dbg!(&adoc_back);
        assert!(adoc_back.text.is_none());
        assert!(adoc_back.extractions.is_none());
    }
}
