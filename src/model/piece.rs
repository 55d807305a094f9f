use serde::{Deserialize, Deserializer, Serialize};

use super::quadrant::Quadrant;

/// Highest-importance priority rank.
pub const TOP_PRIORITY: u8 = 1;
/// Lowest-importance priority rank.
pub const BOTTOM_PRIORITY: u8 = 6;

/// Citation tying a piece back to the fragment that justifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grounding {
    pub fragment_id: String,
    /// One-line justification.
    #[serde(default)]
    pub rationale: String,
}

/// A short generated statement tagged with a quadrant and priority.
///
/// Lower `priority` means more important. A piece without `grounding` is
/// explicitly ungrounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub text: String,
    pub quadrant: Quadrant,
    #[serde(deserialize_with = "deserialize_priority")]
    pub priority: u8,
    #[serde(default)]
    pub grounding: Option<Grounding>,
}

impl Piece {
    /// Ungrounded piece. Use [`Piece::grounded_in`] to attach a citation.
    pub fn new(text: impl Into<String>, quadrant: Quadrant, priority: u8) -> Self {
        Self {
            text: text.into(),
            quadrant,
            priority: priority.clamp(TOP_PRIORITY, BOTTOM_PRIORITY),
            grounding: None,
        }
    }

    #[must_use]
    pub fn grounded_in(
        mut self,
        fragment_id: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        self.grounding = Some(Grounding {
            fragment_id: fragment_id.into(),
            rationale: rationale.into(),
        });
        self
    }

    /// Fragment this piece cites, if any.
    #[must_use]
    pub fn fragment_id(&self) -> Option<&str> {
        self.grounding.as_ref().map(|g| g.fragment_id.as_str())
    }

    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounding.is_some()
    }
}

/// Generators report priorities loosely; clamp like [`Piece::new`] does.
fn deserialize_priority<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    let clamped = raw.clamp(i64::from(TOP_PRIORITY), i64::from(BOTTOM_PRIORITY));
    Ok(u8::try_from(clamped).unwrap_or(BOTTOM_PRIORITY))
}
