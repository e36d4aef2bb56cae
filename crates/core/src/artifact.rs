//! Artifacts, the kind taxonomy, and upstream driver tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Upstream backend that produced or hosts an artifact.
///
/// The set is closed: adding a backend means adding a variant, and every
/// `match` over drivers has to be revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Buildkite,
    Circleci,
    Bintray,
}

impl Driver {
    /// All known drivers.
    pub const ALL: [Driver; 3] = [Driver::Buildkite, Driver::Circleci, Driver::Bintray];

    /// Parse a stored driver tag.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "buildkite" => Ok(Self::Buildkite),
            "circleci" => Ok(Self::Circleci),
            "bintray" => Ok(Self::Bintray),
            other => Err(crate::Error::UnknownDriver(other.to_string())),
        }
    }

    /// Get the stable string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buildkite => "buildkite",
            Self::Circleci => "circleci",
            Self::Bintray => "bintray",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact classification used for filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Unknown,
    /// iOS application archive.
    Ipa,
    /// Android package.
    Apk,
    /// macOS disk image.
    Dmg,
}

impl ArtifactKind {
    /// Numeric code stored in the entity store.
    pub fn code(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Ipa => 1,
            Self::Apk => 2,
            Self::Dmg => 3,
        }
    }

    /// Inverse of [`ArtifactKind::code`]. Unrecognised codes map to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Ipa,
            2 => Self::Apk,
            3 => Self::Dmg,
            _ => Self::Unknown,
        }
    }

    /// Parse a filter value, accepting either the numeric code or the name.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "unknown" => Ok(Self::Unknown),
            "1" | "ipa" => Ok(Self::Ipa),
            "2" | "apk" => Ok(Self::Apk),
            "3" | "dmg" => Ok(Self::Dmg),
            other => Err(crate::Error::UnknownArtifactKind(other.to_string())),
        }
    }

    /// Infer the kind from a file name or path.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ipa" => Self::Ipa,
            "apk" => Self::Apk,
            "dmg" => Self::Dmg,
            _ => Self::Unknown,
        }
    }
}

/// A downloadable output of a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Canonical entity id.
    pub id: String,
    /// Owning build (back-reference).
    pub build_id: String,
    pub kind: ArtifactKind,
    /// Raw driver tag as persisted. Parsed at dispatch time.
    pub driver: String,
    /// Upstream location. Never exposed to clients.
    pub download_url: String,
    /// Path of the file as reported upstream.
    pub local_path: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Artifact {
    /// Base name of the artifact's local path.
    pub fn file_name(&self) -> &str {
        self.local_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("")
    }
}
