//! Backend selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hard ceiling on keys per batch delete call.
///
/// Both supported backends reject larger batch delete requests.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Entries requested per listing page.
pub const LIST_PAGE_SIZE: i32 = 1000;

/// The storage backends cloud-sweep can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Tencent Cloud Object Storage (COS)
    Tencent,
    /// Alibaba Cloud Object Storage Service (OSS)
    Aliyun,
}

impl ProviderKind {
    /// All supported providers.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Tencent, ProviderKind::Aliyun];

    /// The provider's short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tencent => "tencent",
            Self::Aliyun => "aliyun",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tencent" | "cos" => Ok(Self::Tencent),
            "aliyun" | "oss" => Ok(Self::Aliyun),
            other => Err(format!(
                "Unknown provider '{other}'. Expected one of: tencent, aliyun"
            )),
        }
    }
}
