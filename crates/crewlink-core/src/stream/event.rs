//! Push payload parsing
//!
//! Each default event on the query stream carries
//! `{"response": "...", "metadata": {"checkpoint_ns": "research_team:..."}}`.
//! The checkpoint namespace names the backend component that produced the
//! fragment and is what messages are grouped by.

use serde::Deserialize;

use crate::error::ParseError;

/// A push payload reduced to what the aggregator needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    /// Text fragment to append
    pub fragment: String,
    /// Grouping key: checkpoint namespace up to the first `:`
    pub sender_id: String,
    /// Display name of the originating component
    pub sender: String,
    /// Team label: sender without its `_team` suffix
    pub team: String,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    response: Option<String>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    checkpoint_ns: Option<String>,
}

/// Parse one push payload.
pub fn parse_event(data: &str) -> Result<ParsedEvent, ParseError> {
    let raw: RawPayload =
        serde_json::from_str(data).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let fragment = raw.response.ok_or(ParseError::MissingField("response"))?;
    let namespace = raw
        .metadata
        .ok_or(ParseError::MissingField("metadata"))?
        .checkpoint_ns
        .ok_or(ParseError::MissingField("metadata.checkpoint_ns"))?;

    let (sender_id, sender, team) = derive_sender(&namespace);
    Ok(ParsedEvent {
        fragment,
        sender_id,
        sender,
        team,
    })
}

/// Split a checkpoint namespace into (sender_id, sender, team).
pub fn derive_sender(namespace: &str) -> (String, String, String) {
    let sender = namespace.split(':').next().unwrap_or_default();
    let team = sender.split("_team").next().unwrap_or_default();
    (sender.to_string(), sender.to_string(), team.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research_team_event() {
        let event = parse_event(
            r#"{"response": "Searching", "metadata": {"checkpoint_ns": "research_team:step1", "langgraph_step": 3}}"#,
        )
        .unwrap();
        assert_eq!(event.fragment, "Searching");
        assert_eq!(event.sender_id, "research_team");
        assert_eq!(event.sender, "research_team");
        assert_eq!(event.team, "research");
    }

    #[test]
    fn test_derive_sender_without_team_suffix() {
        let (id, sender, team) = derive_sender("supervisor:abc:def");
        assert_eq!(id, "supervisor");
        assert_eq!(sender, "supervisor");
        assert_eq!(team, "supervisor");
    }

    #[test]
    fn test_derive_sender_without_colon() {
        let (id, _, team) = derive_sender("writing_team");
        assert_eq!(id, "writing_team");
        assert_eq!(team, "writing");
    }

    #[test]
    fn test_derive_sender_empty_namespace() {
        let (id, sender, team) = derive_sender("");
        assert!(id.is_empty() && sender.is_empty() && team.is_empty());
    }

    #[test]
    fn test_non_json_payload() {
        let err = parse_event("ERROR: super_team is None").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            parse_event(r#"{"metadata": {"checkpoint_ns": "a:b"}}"#).unwrap_err(),
            ParseError::MissingField("response")
        );
        assert_eq!(
            parse_event(r#"{"response": "x"}"#).unwrap_err(),
            ParseError::MissingField("metadata")
        );
        assert_eq!(
            parse_event(r#"{"response": "x", "metadata": {}}"#).unwrap_err(),
            ParseError::MissingField("metadata.checkpoint_ns")
        );
    }
}
