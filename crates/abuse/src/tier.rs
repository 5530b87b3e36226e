//! Escalation tiers.

use serde::{Deserialize, Serialize};

/// Abuse-protection escalation level. Ordered:
/// `Normal < Warn < Throttle < Block`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Normal,
    Warn,
    Throttle,
    Block,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warn => "WARN",
            Self::Throttle => "THROTTLE",
            Self::Block => "BLOCK",
        }
    }

    /// One step up. Saturates at `Block`; tiers are never skipped.
    pub fn escalated(&self) -> Tier {
        match self {
            Self::Normal => Self::Warn,
            Self::Warn => Self::Throttle,
            Self::Throttle | Self::Block => Self::Block,
        }
    }

    /// One step down. Saturates at `Normal`.
    pub fn relaxed(&self) -> Tier {
        match self {
            Self::Block => Self::Throttle,
            Self::Throttle => Self::Warn,
            Self::Warn | Self::Normal => Self::Normal,
        }
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_never_skips() {
        assert_eq!(Tier::Normal.escalated(), Tier::Warn);
        assert_eq!(Tier::Warn.escalated(), Tier::Throttle);
        assert_eq!(Tier::Throttle.escalated(), Tier::Block);
        assert_eq!(Tier::Block.escalated(), Tier::Block);
    }

    #[test]
    fn relaxation_never_skips() {
        assert_eq!(Tier::Block.relaxed(), Tier::Throttle);
        assert_eq!(Tier::Throttle.relaxed(), Tier::Warn);
        assert_eq!(Tier::Warn.relaxed(), Tier::Normal);
        assert_eq!(Tier::Normal.relaxed(), Tier::Normal);
    }
}
