use serde::{Deserialize, Serialize};

/// Per-call configuration, fixed for the session's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    /// Locale tag handed to the recognizer
    pub language: String,

    /// Transcript list limit; zero or negative means no limit
    #[serde(alias = "max_results")]
    pub max_results: i32,

    /// Stream partial results as events instead of resolving on the final one
    #[serde(alias = "partial_results")]
    pub partial_results: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            max_results: 5,
            partial_results: false,
        }
    }
}

/// Options as supplied by a caller, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub language: Option<String>,
    pub max_results: Option<i32>,
    pub partial_results: Option<bool>,
}

impl StartRequest {
    /// Fill missing fields from `defaults`
    pub fn resolve(self, defaults: &SessionOptions) -> SessionOptions {
        SessionOptions {
            language: self.language.unwrap_or_else(|| defaults.language.clone()),
            max_results: self.max_results.unwrap_or(defaults.max_results),
            partial_results: self.partial_results.unwrap_or(defaults.partial_results),
        }
    }
}

/// Keep the first `max_results` transcripts, or all of them when the limit
/// is not positive
pub fn truncate_matches(mut transcripts: Vec<String>, max_results: i32) -> Vec<String> {
    if max_results > 0 {
        transcripts.truncate(max_results as usize);
    }
    transcripts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcripts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t{}", i)).collect()
    }

    #[test]
    fn test_truncate_keeps_engine_order() {
        assert_eq!(truncate_matches(transcripts(7), 3), vec!["t0", "t1", "t2"]);
    }

    #[test]
    fn test_truncate_shorter_list_untouched() {
        assert_eq!(truncate_matches(transcripts(2), 5).len(), 2);
    }

    #[test]
    fn test_non_positive_limit_keeps_everything() {
        assert_eq!(truncate_matches(transcripts(4), 0).len(), 4);
        assert_eq!(truncate_matches(transcripts(4), -1).len(), 4);
    }

    #[test]
    fn test_start_request_resolves_missing_fields() {
        let request = StartRequest {
            language: Some("fr-FR".to_string()),
            ..Default::default()
        };
        let options = request.resolve(&SessionOptions::default());

        assert_eq!(options.language, "fr-FR");
        assert_eq!(options.max_results, 5);
        assert!(!options.partial_results);
    }
}
