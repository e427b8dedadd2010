use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of interaction a scenario can expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fill,
    Click,
    Select,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Fill => "fill",
            ActionKind::Click => "click",
            ActionKind::Select => "select",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill" => Ok(ActionKind::Fill),
            "click" => Ok(ActionKind::Click),
            "select" => Ok(ActionKind::Select),
            other => Err(format!(
                "unknown action '{}' (expected fill, click or select)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub expected_action: ActionKind,
    pub expected_target: String,
    pub labels: Vec<String>,
}

impl ScenarioDefinition {
    /// True when every filter appears verbatim in this scenario's labels.
    pub fn has_labels(&self, filters: &[String]) -> bool {
        filters.iter().all(|f| self.labels.iter().any(|l| l == f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_any_case() {
        assert_eq!("FILL".parse::<ActionKind>().unwrap(), ActionKind::Fill);
        assert_eq!("Click".parse::<ActionKind>().unwrap(), ActionKind::Click);
        assert_eq!(" select ".parse::<ActionKind>().unwrap(), ActionKind::Select);
        assert!("hover".parse::<ActionKind>().is_err());
        assert!("".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_string(&ActionKind::Select).unwrap();
        assert_eq!(json, "\"select\"");
    }

    #[test]
    fn test_has_labels_is_exact_match() {
        let def = ScenarioDefinition {
            id: "x".into(),
            title: "x".into(),
            description: String::new(),
            expected_action: ActionKind::Click,
            expected_target: "#go".into(),
            labels: vec!["element=button".into(), "frame=main".into()],
        };
        assert!(def.has_labels(&[]));
        assert!(def.has_labels(&["element=button".into()]));
        assert!(!def.has_labels(&["element=butt".into()]));
        assert!(!def.has_labels(&["element=button".into(), "frame=iframe".into()]));
    }
}
