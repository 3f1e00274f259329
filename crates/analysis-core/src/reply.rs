//! Parsing of raw model replies into [`AnalysisResult`].
//!
//! Models do not always honor the requested shape: list fields come back as
//! bare strings and the JSON is sometimes wrapped in a markdown fence. All of
//! that is absorbed here so consumers always see lists.

use serde::Deserialize;

use crate::error::AnalysisError;
use crate::types::AnalysisResult;

/// A field the model may return either as a string or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize to a list. A blank string becomes an empty list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(item) if item.trim().is_empty() => Vec::new(),
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items
                .into_iter()
                .filter(|item| !item.trim().is_empty())
                .collect(),
        }
    }
}

/// The reply object exactly as the model sent it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysisReply {
    pub summary: Option<String>,
    #[serde(alias = "key_findings")]
    pub key_findings: Option<OneOrMany>,
    pub recommendations: Option<OneOrMany>,
    #[serde(alias = "risk_factors")]
    pub risk_factors: Option<OneOrMany>,
}

impl RawAnalysisReply {
    /// Normalize into a result. The summary is required.
    pub fn normalize(self) -> Result<AnalysisResult, AnalysisError> {
        let summary = self
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AnalysisError::MalformedReply("missing summary".to_string()))?;

        Ok(AnalysisResult {
            summary,
            key_findings: self.key_findings.map(OneOrMany::into_vec).unwrap_or_default(),
            recommendations: self
                .recommendations
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
            risk_factors: self.risk_factors.map(OneOrMany::into_vec),
        })
    }
}

/// Parse the text content of a model reply.
pub fn parse_reply(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let content = strip_code_fence(content.trim());
    if content.is_empty() {
        return Err(AnalysisError::EmptyReply);
    }

    let raw: RawAnalysisReply = serde_json::from_str(content)
        .map_err(|e| AnalysisError::MalformedReply(e.to_string()))?;
    raw.normalize()
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_findings_become_single_item_list() {
        let result = parse_reply(
            r#"{"summary": "Hypothyroid pattern", "keyFindings": "TSH elevated", "recommendations": ["Selenium"]}"#,
        )
        .unwrap();
        assert_eq!(result.key_findings, vec!["TSH elevated".to_string()]);
        assert_eq!(result.recommendations, vec!["Selenium".to_string()]);
        assert!(result.risk_factors.is_none());
    }

    #[test]
    fn test_fenced_reply_is_accepted() {
        let result = parse_reply(
            "```json\n{\"summary\": \"ok\", \"key_findings\": [\"a\"], \"riskFactors\": \"b\"}\n```",
        )
        .unwrap();
        assert_eq!(result.key_findings, vec!["a".to_string()]);
        assert_eq!(result.risk_factors, Some(vec!["b".to_string()]));
    }

    #[test]
    fn test_malformed_replies_are_errors() {
        assert!(matches!(
            parse_reply("not json at all"),
            Err(AnalysisError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"keyFindings": []}"#),
            Err(AnalysisError::MalformedReply(_))
        ));
        assert!(matches!(parse_reply("   "), Err(AnalysisError::EmptyReply)));
    }
}
