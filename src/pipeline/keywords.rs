//! クアドラント判定用キーワードテーブル。
//!
//! 各クアドラントに primary / secondary の2段階キーワードを持たせ、
//! Aho-Corasick で部分文字列一致を一括検出する。
use std::{
    fs,
    path::{Path, PathBuf},
};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::{Quadrant, QuadrantMap};

/// キーワードテーブルを差し替える YAML ファイルのパス。
pub const KEYWORDS_PATH_ENV: &str = "QUADRANT_KEYWORDS_PATH";

/// 1クアドラント分のキーワード定義。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuadrantKeywords {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl QuadrantKeywords {
    fn from_static(primary: &[&str], secondary: &[&str]) -> Self {
        Self {
            primary: primary.iter().map(ToString::to_string).collect(),
            secondary: secondary.iter().map(ToString::to_string).collect(),
        }
    }

    /// 小文字化し、空要素と重複を除く。
    fn normalized(self) -> Self {
        fn clean(words: Vec<String>) -> Vec<String> {
            let mut out: Vec<String> = Vec::with_capacity(words.len());
            for word in words {
                let word = word.trim().to_lowercase();
                if !word.is_empty() && !out.contains(&word) {
                    out.push(word);
                }
            }
            out
        }
        Self {
            primary: clean(self.primary),
            secondary: clean(self.secondary),
        }
    }
}

/// primary/secondary それぞれで一致したキーワード数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordHits {
    pub primary: u32,
    pub secondary: u32,
}

/// 1クアドラント分の照合器。パターンは primary → secondary の順に並ぶ。
#[derive(Debug, Clone)]
struct QuadrantMatcher {
    ac: AhoCorasick,
    primary_len: usize,
    pattern_count: usize,
}

impl QuadrantMatcher {
    fn new(keywords: &QuadrantKeywords) -> Result<Self, aho_corasick::BuildError> {
        let patterns: Vec<&str> = keywords
            .primary
            .iter()
            .chain(keywords.secondary.iter())
            .map(String::as_str)
            .collect();
        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;
        Ok(Self {
            ac,
            primary_len: keywords.primary.len(),
            pattern_count: patterns.len(),
        })
    }

    /// 各キーワードは出現回数に関係なく1回だけ数える。
    fn hits(&self, lowered: &str) -> KeywordHits {
        let mut seen = vec![false; self.pattern_count];
        for mat in self.ac.find_overlapping_iter(lowered) {
            seen[mat.pattern().as_usize()] = true;
        }
        let primary = seen[..self.primary_len].iter().filter(|hit| **hit).count();
        let secondary = seen[self.primary_len..].iter().filter(|hit| **hit).count();
        KeywordHits {
            primary: u32::try_from(primary).unwrap_or(u32::MAX),
            secondary: u32::try_from(secondary).unwrap_or(u32::MAX),
        }
    }
}

/// クアドラント別キーワードマップとコンパイル済み照合器。
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: QuadrantMap<QuadrantKeywords>,
    matchers: QuadrantMap<QuadrantMatcher>,
}

static BUILTIN: Lazy<KeywordTable> = Lazy::new(|| {
    KeywordTable::new(builtin_entries()).expect("built-in keyword table compiles")
});

impl KeywordTable {
    /// 定義からテーブルを構築する。キーワードは小文字化される。
    ///
    /// # Errors
    /// 照合オートマトンの構築に失敗した場合は [`KeywordTableError::Build`] を返す。
    pub fn new(entries: QuadrantMap<QuadrantKeywords>) -> Result<Self, KeywordTableError> {
        let entries = entries.map(|_, keywords| keywords.normalized());
        let matchers = QuadrantMap {
            form: build_matcher(Quadrant::Form, &entries.form)?,
            motion: build_matcher(Quadrant::Motion, &entries.motion)?,
            expression: build_matcher(Quadrant::Expression, &entries.expression)?,
            function: build_matcher(Quadrant::Function, &entries.function)?,
        };
        Ok(Self { entries, matchers })
    }

    /// 組み込みのデフォルトテーブル。
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// YAML ファイルからテーブルを読み込む。記載のないクアドラントは空リストになる。
    ///
    /// # Errors
    /// 読み込み失敗時は [`KeywordTableError::Io`]、形式不正時は
    /// [`KeywordTableError::Deserialize`] を返す。
    pub fn load_from_path(path: &Path) -> Result<Self, KeywordTableError> {
        let contents = fs::read_to_string(path).map_err(|source| KeywordTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: QuadrantMap<QuadrantKeywords> =
            serde_yaml::from_str(&contents).map_err(|source| KeywordTableError::Deserialize {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(entries)
    }

    #[must_use]
    pub fn keywords(&self, quadrant: Quadrant) -> &QuadrantKeywords {
        &self.entries[quadrant]
    }

    /// 小文字化済みテキスト中で一致したキーワード数を返す。
    #[must_use]
    pub fn hits(&self, quadrant: Quadrant, lowered: &str) -> KeywordHits {
        self.matchers[quadrant].hits(lowered)
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn build_matcher(
    quadrant: Quadrant,
    keywords: &QuadrantKeywords,
) -> Result<QuadrantMatcher, KeywordTableError> {
    QuadrantMatcher::new(keywords).map_err(|source| KeywordTableError::Build { quadrant, source })
}

#[derive(Debug, thiserror::Error)]
pub enum KeywordTableError {
    #[error("failed to read keyword table at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse keyword table at {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to compile keywords for {quadrant}: {source}")]
    Build {
        quadrant: Quadrant,
        #[source]
        source: aho_corasick::BuildError,
    },
}

/// 組み込みキーワード定義。
///
/// 短いキーワードは他クアドラントの語に部分一致しないよう選んでいる。
#[must_use]
pub fn builtin_entries() -> QuadrantMap<QuadrantKeywords> {
    QuadrantMap {
        // Form - 構造、形状、構成
        form: QuadrantKeywords::from_static(
            &[
                "shape",
                "layout",
                "structure",
                "grid",
                "composition",
                "geometry",
                "proportion",
                "silhouette",
                "texture",
                "material",
                "pattern",
                "symmetry",
                "outline",
                "typography",
                "hierarchy",
            ],
            &[
                "edge",
                "volume",
                "surface",
                "contour",
                "density",
                "spacing",
                "margin",
                "column",
                "modular",
                "angular",
                "curve",
                "frame",
                "palette",
            ],
        ),
        // Motion - 動き、リズム、遷移
        motion: QuadrantKeywords::from_static(
            &[
                "motion",
                "movement",
                "animation",
                "rhythm",
                "flow",
                "transition",
                "momentum",
                "gesture",
                "tempo",
                "kinetic",
                "dynamic",
                "velocity",
                "choreograph",
                "scroll",
                "sequence",
            ],
            &[
                "drift",
                "swing",
                "rotate",
                "glide",
                "bounce",
                "shift",
                "loop",
                "pulse",
                "wave",
                "ripple",
                "slide",
                "fade",
                "sway",
                "cadence",
            ],
        ),
        // Expression - 感情、トーン、雰囲気
        expression: QuadrantKeywords::from_static(
            &[
                "mood",
                "tone",
                "sentiment",
                "feeling",
                "warmth",
                "voice",
                "atmosphere",
                "personality",
                "spirit",
                "attitude",
                "expressive",
                "nostalgi",
                "joy",
                "calm",
                "intimacy",
            ],
            &[
                "warm",
                "cool",
                "bold",
                "playful",
                "soft",
                "serene",
                "melanchol",
                "vibrant",
                "gentle",
                "quiet",
                "tender",
                "ceremonial",
                "elegant",
                "whimsical",
                "color",
            ],
        ),
        // Function - 目的、利用者、用途
        function: QuadrantKeywords::from_static(
            &[
                "audience",
                "mobile",
                "purpose",
                "user",
                "usability",
                "accessibility",
                "navigation",
                "use case",
                "task",
                "goal",
                "utility",
                "conversion",
                "onboarding",
                "interface",
                "checkout",
            ],
            &[
                "tool",
                "feature",
                "device",
                "button",
                "access",
                "practical",
                "efficient",
                "information",
                "support",
                "search",
                "booking",
                "platform",
                "desktop",
                "customer",
                "service",
            ],
        ),
    }
}
