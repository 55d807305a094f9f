use std::{env, path::PathBuf};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// 割り当て上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentLimits {
    /// 1フラグメントが属せるクアドラント数の上限。
    pub max_quadrants_per_fragment: usize,
    /// 1クアドラントに入るフラグメント数の上限。
    pub max_fragments_per_quadrant: usize,
    /// 補充パスで目指す最低フラグメント数。
    pub min_fragments_per_quadrant: usize,
}

impl Default for AssignmentLimits {
    fn default() -> Self {
        Self {
            max_quadrants_per_fragment: 2,
            max_fragments_per_quadrant: 6,
            min_fragments_per_quadrant: 2,
        }
    }
}

/// キーワード一致のスコア重み。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub primary: u32,
    pub secondary: u32,
    /// 画像フラグメントの FORM / EXPRESSION 加点。
    pub image_bonus: u32,
    /// パレット付き画像への追加加点。
    pub palette_bonus: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary: 3,
            secondary: 1,
            image_bonus: 2,
            palette_bonus: 1,
        }
    }
}

/// 多様性フィルタの設定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversityConfig {
    /// この値を超える bigram 類似度を近似重複とみなす。
    pub similarity_threshold: f64,
    /// 1フラグメントを根拠とするピース数の上限。`None` なら無効。
    pub fragment_quota: Option<usize>,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            fragment_quota: None,
        }
    }
}

/// セッションプールの設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// 1フラグメントあたりの配信上限。
    pub fragment_quota: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { fragment_quota: 2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    assignment: AssignmentLimits,
    scoring: ScoringWeights,
    diversity: DiversityConfig,
    pool: PoolConfig,
    keywords_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineConfig {
    /// 環境変数からエンジン設定を読み込み、検証する。
    ///
    /// 未設定の項目はデフォルト値を使う。
    ///
    /// # Errors
    /// 数値のパースに失敗した場合や、値が範囲外の場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let assignment = AssignmentLimits {
            max_quadrants_per_fragment: parse_positive_usize(
                "QUADRANT_MAX_CATEGORIES_PER_FRAGMENT",
                2,
            )?,
            max_fragments_per_quadrant: parse_positive_usize(
                "QUADRANT_MAX_FRAGMENTS_PER_CATEGORY",
                6,
            )?,
            min_fragments_per_quadrant: parse_usize("QUADRANT_MIN_FRAGMENTS_PER_CATEGORY", 2)?,
        };
        if assignment.min_fragments_per_quadrant > assignment.max_fragments_per_quadrant {
            return Err(ConfigError::Invalid {
                name: "QUADRANT_MIN_FRAGMENTS_PER_CATEGORY",
                source: anyhow::anyhow!(
                    "must not exceed QUADRANT_MAX_FRAGMENTS_PER_CATEGORY ({})",
                    assignment.max_fragments_per_quadrant
                ),
            });
        }

        let scoring = ScoringWeights {
            primary: parse_u32("QUADRANT_PRIMARY_WEIGHT", 3)?,
            secondary: parse_u32("QUADRANT_SECONDARY_WEIGHT", 1)?,
            image_bonus: parse_u32("QUADRANT_IMAGE_BONUS", 2)?,
            palette_bonus: parse_u32("QUADRANT_PALETTE_BONUS", 1)?,
        };

        let diversity = DiversityConfig {
            similarity_threshold: parse_unit_interval("DIVERSITY_SIMILARITY_THRESHOLD", 0.5)?,
            fragment_quota: parse_optional_positive_usize("DIVERSITY_FRAGMENT_QUOTA")?,
        };

        let pool = PoolConfig {
            fragment_quota: parse_positive_usize("POOL_FRAGMENT_QUOTA", 2)?,
        };

        let keywords_path = env::var(crate::pipeline::keywords::KEYWORDS_PATH_ENV)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            assignment,
            scoring,
            diversity,
            pool,
            keywords_path,
        })
    }

    #[must_use]
    pub fn assignment(&self) -> AssignmentLimits {
        self.assignment
    }

    #[must_use]
    pub fn scoring(&self) -> ScoringWeights {
        self.scoring
    }

    #[must_use]
    pub fn diversity(&self) -> DiversityConfig {
        self.diversity
    }

    #[must_use]
    pub fn pool(&self) -> PoolConfig {
        self.pool
    }

    #[must_use]
    pub fn keywords_path(&self) -> Option<&std::path::Path> {
        self.keywords_path.as_deref()
    }

    #[must_use]
    pub fn with_keywords_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.keywords_path = Some(path.into());
        self
    }
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_positive_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    if parsed == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        });
    }
    Ok(parsed)
}

fn parse_optional_positive_usize(name: &'static str) -> Result<Option<usize>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let parsed = raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            })?;
            if parsed == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    source: anyhow::anyhow!("must be greater than zero"),
                });
            }
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_unit_interval(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.trim().parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0.0 and 1.0"),
        });
    }
    Ok(parsed)
}
