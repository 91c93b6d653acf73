//! Target platforms and their presentation defaults

use serde::{Deserialize, Serialize};

/// Distribution platform the final asset is produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Youtube,
    Tiktok,
    Instagram,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
        }
    }

    /// Canvas aspect ratio for this platform
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Self::Youtube => "16:9",
            Self::Tiktok | Self::Instagram => "9:16",
            Self::Twitter => "1:1",
        }
    }

    /// Replacement call-to-action used when overlay text fails validation
    pub fn default_cta(&self) -> &'static str {
        match self {
            Self::Youtube => "Subscribe for more!",
            Self::Tiktok | Self::Instagram => "Follow for more!",
            Self::Twitter => "Share this video!",
        }
    }

    /// Replacement hook used when hook text fails validation
    pub fn default_hook(&self) -> &'static str {
        match self {
            Self::Youtube => "Watch this!",
            Self::Tiktok | Self::Instagram => "Wait for it...",
            Self::Twitter => "You need to see this.",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
