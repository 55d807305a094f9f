//! The four fixed semantic buckets and a fixed-slot container keyed by them.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic bucket a fragment or piece belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quadrant {
    /// Structure: shape, layout, composition.
    #[serde(alias = "form")]
    Form,
    /// Movement: rhythm, flow, transitions.
    #[serde(alias = "motion")]
    Motion,
    /// Tone: mood, emotion, voice.
    #[serde(alias = "expression")]
    Expression,
    /// Purpose: audience, tasks, utility.
    #[serde(alias = "function")]
    Function,
}

impl Quadrant {
    /// Canonical iteration order. Every order-sensitive pass walks quadrants this way.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Form,
        Quadrant::Motion,
        Quadrant::Expression,
        Quadrant::Function,
    ];

    /// Lower-case label used in logs, metrics and the keyword table file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Quadrant::Form => "form",
            Quadrant::Motion => "motion",
            Quadrant::Expression => "expression",
            Quadrant::Function => "function",
        }
    }

    /// Position in [`Quadrant::ALL`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Quadrant::Form => 0,
            Quadrant::Motion => 1,
            Quadrant::Expression => 2,
            Quadrant::Function => 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label does not name one of the four quadrants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quadrant label: {0}")]
pub struct UnknownQuadrant(pub String);

impl FromStr for Quadrant {
    type Err = UnknownQuadrant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "form" => Ok(Quadrant::Form),
            "motion" => Ok(Quadrant::Motion),
            "expression" => Ok(Quadrant::Expression),
            "function" => Ok(Quadrant::Function),
            _ => Err(UnknownQuadrant(raw.to_string())),
        }
    }
}

/// One value per quadrant, always fully populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    default,
    deny_unknown_fields,
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct QuadrantMap<T> {
    pub form: T,
    pub motion: T,
    pub expression: T,
    pub function: T,
}

impl<T> QuadrantMap<T> {
    /// Build a map by evaluating `init` once per quadrant in canonical order.
    pub fn from_fn(mut init: impl FnMut(Quadrant) -> T) -> Self {
        Self {
            form: init(Quadrant::Form),
            motion: init(Quadrant::Motion),
            expression: init(Quadrant::Expression),
            function: init(Quadrant::Function),
        }
    }

    /// Iterate `(quadrant, value)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Quadrant, &T)> {
        Quadrant::ALL.into_iter().map(move |q| (q, &self[q]))
    }

    /// Apply `f` to every slot, keeping quadrant positions.
    pub fn map<U>(self, mut f: impl FnMut(Quadrant, T) -> U) -> QuadrantMap<U> {
        QuadrantMap {
            form: f(Quadrant::Form, self.form),
            motion: f(Quadrant::Motion, self.motion),
            expression: f(Quadrant::Expression, self.expression),
            function: f(Quadrant::Function, self.function),
        }
    }

    /// Borrowing variant of [`QuadrantMap::map`].
    pub fn map_ref<U>(&self, mut f: impl FnMut(Quadrant, &T) -> U) -> QuadrantMap<U> {
        QuadrantMap::from_fn(|q| f(q, &self[q]))
    }
}

impl<T> QuadrantMap<Vec<T>> {
    /// Total number of items across every quadrant.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.iter().map(|(_, items)| items.len()).sum()
    }
}

impl<T> Index<Quadrant> for QuadrantMap<T> {
    type Output = T;

    fn index(&self, quadrant: Quadrant) -> &T {
        match quadrant {
            Quadrant::Form => &self.form,
            Quadrant::Motion => &self.motion,
            Quadrant::Expression => &self.expression,
            Quadrant::Function => &self.function,
        }
    }
}

impl<T> IndexMut<Quadrant> for QuadrantMap<T> {
    fn index_mut(&mut self, quadrant: Quadrant) -> &mut T {
        match quadrant {
            Quadrant::Form => &mut self.form,
            Quadrant::Motion => &mut self.motion,
            Quadrant::Expression => &mut self.expression,
            Quadrant::Function => &mut self.function,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("form", Quadrant::Form)]
    #[case("MOTION", Quadrant::Motion)]
    #[case(" Expression ", Quadrant::Expression)]
    #[case("function", Quadrant::Function)]
    fn parses_labels_case_insensitively(#[case] raw: &str, #[case] expected: Quadrant) {
        assert_eq!(raw.parse::<Quadrant>().expect("known label"), expected);
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "texture".parse::<Quadrant>().unwrap_err();
        assert_eq!(err, UnknownQuadrant("texture".to_string()));
    }

    #[test]
    fn ordinal_matches_canonical_order() {
        for (idx, quadrant) in Quadrant::ALL.into_iter().enumerate() {
            assert_eq!(quadrant.ordinal(), idx);
        }
    }

    #[test]
    fn map_iterates_in_canonical_order() {
        let map = QuadrantMap::from_fn(Quadrant::ordinal);
        let seen: Vec<(Quadrant, usize)> = map.iter().map(|(q, v)| (q, *v)).collect();
        assert_eq!(
            seen,
            vec![
                (Quadrant::Form, 0),
                (Quadrant::Motion, 1),
                (Quadrant::Expression, 2),
                (Quadrant::Function, 3),
            ]
        );
    }

    #[test]
    fn serializes_quadrant_as_uppercase_label() {
        let json = serde_json::to_string(&Quadrant::Expression).expect("serialize");
        assert_eq!(json, "\"EXPRESSION\"");
        let parsed: Quadrant = serde_json::from_str("\"function\"").expect("alias accepted");
        assert_eq!(parsed, Quadrant::Function);
    }

    #[test]
    fn total_len_sums_every_slot() {
        let mut map: QuadrantMap<Vec<u8>> = QuadrantMap::default();
        map[Quadrant::Motion].push(1);
        map[Quadrant::Function].extend([2, 3]);
        assert_eq!(map.total_len(), 3);
    }
}
