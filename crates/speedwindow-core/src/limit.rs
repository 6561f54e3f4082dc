// ── Limit domain types ──
//
// Directions, transitions, raw configured values, and the immutable
// settings snapshot a single enforcement cycle works from.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Which way traffic flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

/// The two scheduled events. Each selects one nominal target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Transition {
    /// Enter the restricted window.
    Restricted,
    /// Leave it again.
    Normal,
}

/// A limit exactly as the operator configured it.
///
/// Values come from hand-edited TOML or environment variables, so a
/// quoted number or a stray word is possible. Nothing is parsed until an
/// enforcement cycle needs the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Default for LimitValue {
    fn default() -> Self {
        Self::Integer(0)
    }
}

impl From<i64> for LimitValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for LimitValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl LimitValue {
    /// Parse into KiB/s. Floats truncate toward zero; text must be a
    /// plain integer (surrounding whitespace is ignored).
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions, clippy::cast_precision_loss)]
    pub fn parse(&self) -> Result<i64, String> {
        match self {
            Self::Integer(n) => Ok(*n),
            Self::Float(x) => {
                let t = x.trunc();
                if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                    Ok(t as i64)
                } else {
                    Err(format!("{x} is out of range"))
                }
            }
            Self::Text(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
        }
    }
}

/// Per-direction limiter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    /// KiB/s while restricted; zero or negative means unlimited.
    #[serde(default)]
    pub restricted: LimitValue,
    /// KiB/s outside the window; zero or negative means unlimited.
    #[serde(default)]
    pub normal: LimitValue,
}

impl DirectionLimitConfig {
    pub fn target(&self, transition: Transition) -> &LimitValue {
        match transition {
            Transition::Restricted => &self.restricted,
            Transition::Normal => &self.normal,
        }
    }

    /// Effective limit for one direction: the transition's target when
    /// enabled, otherwise the live value untouched.
    pub fn resolve(
        &self,
        transition: Transition,
        direction: Direction,
        live: i64,
    ) -> Result<i64, CoreError> {
        if !self.enabled {
            return Ok(live);
        }
        let value = self.target(transition);
        value.parse().map_err(|reason| CoreError::InvalidLimitValue {
            transition,
            direction,
            value: value.to_string(),
            reason,
        })
    }
}

/// Immutable configuration snapshot for one enforcement cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementSettings {
    pub enabled: bool,
    pub notify: bool,
    /// Cron expression that enters the restricted window.
    pub restrict_cron: Option<String>,
    /// Cron expression that returns to normal limits.
    pub release_cron: Option<String>,
    pub upload: DirectionLimitConfig,
    pub download: DirectionLimitConfig,
    /// Names of the downloaders this limiter manages.
    pub services: BTreeSet<String>,
}

impl EnforcementSettings {
    pub fn any_direction_enabled(&self) -> bool {
        self.upload.enabled || self.download.enabled
    }

    pub fn direction(&self, direction: Direction) -> &DirectionLimitConfig {
        match direction {
            Direction::Download => &self.download,
            Direction::Upload => &self.upload,
        }
    }

    /// The cron expression driving a transition; blank counts as absent.
    pub fn schedule_for(&self, transition: Transition) -> Option<&str> {
        let cron = match transition {
            Transition::Restricted => self.restrict_cron.as_deref(),
            Transition::Normal => self.release_cron.as_deref(),
        };
        cron.map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Live limits as reported by a downloader, in KiB/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedLimits {
    pub download: i64,
    pub upload: i64,
}

/// Fully resolved limits to send to one downloader for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitPlan {
    pub download: i64,
    pub upload: i64,
}
