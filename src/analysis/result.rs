// src/analysis/result.rs
use serde_json::Value;

/// Displayable projection of an analysis response. The service's body is
/// untrusted and partially shaped; every field here has a safe default so
/// the results view can never fail to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub id: String,
    pub status: String,
    pub summary: String,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    fn classify(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl ResultView {
    pub fn from_raw(raw: &Value) -> Self {
        let analysis = raw.get("analysisResult");

        Self {
            id: string_field(raw, "id"),
            status: string_field(raw, "status"),
            summary: analysis
                .and_then(|a| a.get("summary"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            entities: string_list(analysis.and_then(|a| a.get("entities"))),
            topics: string_list(analysis.and_then(|a| a.get("topics"))),
            sentiment: Sentiment::classify(
                analysis.and_then(|a| a.get("sentiment")).and_then(Value::as_str),
            ),
        }
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Accepts either a sequence or a comma-separated string; anything else is
/// an empty list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(display_item).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            s.split(',').map(|part| part.trim().to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn display_item(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_body_renders_with_defaults() {
        let view = ResultView::from_raw(&Value::Null);
        assert_eq!(view.id, "");
        assert_eq!(view.status, "");
        assert_eq!(view.summary, "");
        assert!(view.entities.is_empty());
        assert!(view.topics.is_empty());
        assert_eq!(view.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn missing_analysis_result_renders_with_defaults() {
        let view = ResultView::from_raw(&json!({ "id": "abc", "status": "completed" }));
        assert_eq!(view.id, "abc");
        assert_eq!(view.status, "completed");
        assert!(view.topics.is_empty());
        assert_eq!(view.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn comma_string_topics_split_into_tags() {
        let view = ResultView::from_raw(&json!({
            "analysisResult": { "topics": "a, b, c" }
        }));
        assert_eq!(view.topics, vec!["a", "b", "c"]);
    }

    #[test]
    fn comma_string_entities_split_and_trim() {
        let view = ResultView::from_raw(&json!({
            "analysisResult": { "entities": " Contoso ,  Fabrikam " }
        }));
        assert_eq!(view.entities, vec!["Contoso", "Fabrikam"]);
    }

    #[test]
    fn non_list_non_string_fields_default_to_empty() {
        let view = ResultView::from_raw(&json!({
            "analysisResult": { "topics": 42, "entities": { "nested": true } }
        }));
        assert!(view.topics.is_empty());
        assert!(view.entities.is_empty());
    }

    #[test]
    fn blank_string_list_is_empty() {
        let view = ResultView::from_raw(&json!({
            "analysisResult": { "topics": "   " }
        }));
        assert!(view.topics.is_empty());
    }

    #[test]
    fn array_items_keep_order_and_stringify_non_strings() {
        let view = ResultView::from_raw(&json!({
            "analysisResult": { "entities": ["Contoso", 7, true] }
        }));
        assert_eq!(view.entities, vec!["Contoso", "7", "true"]);
    }

    #[test]
    fn sentiment_classifies_case_insensitively() {
        for (raw, expected) in [
            (json!("POSITIVE"), Sentiment::Positive),
            (json!("Negative"), Sentiment::Negative),
            (json!("neutral"), Sentiment::Neutral),
            (json!("enthusiastic"), Sentiment::Neutral),
            (Value::Null, Sentiment::Neutral),
        ] {
            let view = ResultView::from_raw(&json!({ "analysisResult": { "sentiment": raw } }));
            assert_eq!(view.sentiment, expected);
        }
    }

    #[test]
    fn well_formed_body_maps_through() {
        let view = ResultView::from_raw(&json!({
            "id": "an-1",
            "status": "completed",
            "analysisResult": {
                "summary": "A fine document.",
                "entities": ["Contoso"],
                "topics": ["finance", "tech"],
                "sentiment": "positive"
            }
        }));
        assert_eq!(view.summary, "A fine document.");
        assert_eq!(view.entities, vec!["Contoso"]);
        assert_eq!(view.topics, vec!["finance", "tech"]);
        assert_eq!(view.sentiment, Sentiment::Positive);
    }
}
