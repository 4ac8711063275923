//! The story generator contract.

use async_trait::async_trait;
use serde::Serialize;

use super::content::{StoryContent, StoryContext};

/// Why a generator served offline content instead of generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FallbackReason {
    /// The offline table is the configured source.
    Offline,
    /// No model was configured for the generator.
    NoModelConfigured,
    /// Every configured model failed, timed out or returned unusable output.
    AllModelsFailed {
        /// Number of models tried.
        attempts: usize,
    },
}

/// Where a segment came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContentSource {
    /// Written by the named model.
    Generated {
        /// Model identifier.
        model: String,
    },
    /// Served from the offline table.
    Fallback {
        /// Why the table was used.
        #[serde(flatten)]
        reason: FallbackReason,
    },
}

/// A segment together with its provenance. Degraded content is a normal,
/// typed result rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    /// The segment.
    pub content: StoryContent,
    /// Its provenance.
    pub source: ContentSource,
}

impl GeneratedContent {
    /// Content written by `model`.
    #[must_use]
    pub fn generated(content: StoryContent, model: impl Into<String>) -> Self {
        Self {
            content,
            source: ContentSource::Generated {
                model: model.into(),
            },
        }
    }

    /// Content served from the offline table.
    #[must_use]
    pub fn fallback(content: StoryContent, reason: FallbackReason) -> Self {
        Self {
            content,
            source: ContentSource::Fallback { reason },
        }
    }

    /// Whether the content came from the offline table.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ContentSource::Fallback { .. })
    }
}

/// Produces the next story segment.
///
/// Implementations must always return usable content: failures and timeouts
/// are absorbed internally and surface only as [`ContentSource::Fallback`].
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Writes the segment described by `context`.
    async fn generate(&self, context: &StoryContext) -> GeneratedContent;
}
