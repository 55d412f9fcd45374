//! Artifacts from GitHub REST API.

use std::fmt::Display;

use serde::Deserialize;

use crate::{
    database::{Artifact, ArtifactId, RunId},
    error::ParseError,
};

/// Represents an artifact listing from GitHub REST API.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Artifacts {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub artifacts: Vec<RawArtifact>,
}

/// Represents an artifact from GitHub REST API.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawArtifact {
    pub id: Option<ArtifactId>,
    pub name: Option<String>,
    pub size_in_bytes: Option<u64>,
    #[serde(default)]
    pub expired: bool,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Display for RawArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.id.map_or_else(|| "?".to_owned(), |id| id.to_string()),
        )
    }
}

impl RawArtifact {
    /// Converts the listing entry into a stored [`Artifact`].
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the id, the name or the size is missing.
    pub fn to_artifact(&self, run_id: RunId, index: usize) -> Result<Artifact, ParseError> {
        let missing = |field| ParseError::MissingArtifactField {
            run_id,
            index,
            field,
        };

        Ok(Artifact {
            id: self.id.ok_or_else(|| missing("id"))?,
            name: self.name.clone().ok_or_else(|| missing("name"))?,
            size: self.size_in_bytes.ok_or_else(|| missing("size_in_bytes"))?,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            expires_at: self.expires_at.clone(),
        })
    }
}
