use serde::{Deserialize, Serialize};
use std::fmt;

/// Input hint attached to a variable value.
///
/// The kind only tells an editor which input widget to show. Substitution
/// treats every value as plain text regardless of its kind. Unknown tags are
/// preserved as [`VariableKind::Other`] so clients can introduce new hints
/// without a server change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableKind {
    #[default]
    Text,
    Number,
    Date,
    Url,
    Other(String),
}

impl VariableKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Url => "url",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for VariableKind {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Self::Text,
            "number" => Self::Number,
            "date" => Self::Date,
            "url" => Self::Url,
            _ => Self::Other(tag.trim().to_string()),
        }
    }
}

impl From<&str> for VariableKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<VariableKind> for String {
    fn from(kind: VariableKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
