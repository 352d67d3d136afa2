/*!
 * Iteration resources: the sub-jobs of a translation.
 *
 * The first iteration is created by the service together with its
 * translation and carries no input. Follow-up iterations supply a corrected
 * WebVTT file (subtitles or metadata) to refine the output.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use super::status::{JobResource, ResourceStatus};
use super::validate_file_url;

/// What a supplied WebVTT file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebvttFileKind {
    MetadataJson,
    SourceLocaleSubtitle,
    TargetLocaleSubtitle,
}

impl WebvttFileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MetadataJson => "MetadataJson",
            Self::SourceLocaleSubtitle => "SourceLocaleSubtitle",
            Self::TargetLocaleSubtitle => "TargetLocaleSubtitle",
        }
    }
}

impl fmt::Display for WebvttFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebvttFileKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MetadataJson" => Ok(Self::MetadataJson),
            "SourceLocaleSubtitle" => Ok(Self::SourceLocaleSubtitle),
            "TargetLocaleSubtitle" => Ok(Self::TargetLocaleSubtitle),
            other => Err(ValidationError::UnknownWebvttFileKind(other.to_string())),
        }
    }
}

/// A WebVTT file handed to the service by URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebvttFile {
    pub kind: WebvttFileKind,
    pub url: String,
}

/// Input of a follow-up iteration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webvtt_file: Option<WebvttFile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_subtitle_in_video: Option<bool>,
}

impl IterationInput {
    /// Iteration driven by a WebVTT file
    pub fn with_webvtt(kind: WebvttFileKind, url: impl Into<String>) -> Self {
        Self {
            webvtt_file: Some(WebvttFile { kind, url: url.into() }),
            export_subtitle_in_video: None,
        }
    }

    /// Build from untyped parts, rejecting unknown file kinds
    pub fn parse(kind: &str, url: &str, export_subtitle_in_video: Option<bool>) -> Result<Self, ValidationError> {
        let kind = kind.parse::<WebvttFileKind>()?;
        let input = Self::with_webvtt(kind, url).export_subtitle_in_video(export_subtitle_in_video);
        input.validate()?;
        Ok(input)
    }

    pub fn export_subtitle_in_video(mut self, export: Option<bool>) -> Self {
        self.export_subtitle_in_video = export;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(file) = &self.webvtt_file {
            validate_file_url("webvttFileUrl", &file.url)?;
        }
        Ok(())
    }
}

/// Output URLs of a succeeded iteration; each is produced independently
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_video_file_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_locale_subtitle_webvtt_file_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_locale_subtitle_webvtt_file_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_json_webvtt_file_url: Option<String>,
}

impl IterationResult {
    /// `(label, url)` pairs for every produced output
    pub fn outputs(&self) -> Vec<(&'static str, &str)> {
        [
            ("Translated Video", &self.translated_video_file_url),
            ("Source Subtitles", &self.source_locale_subtitle_webvtt_file_url),
            ("Target Subtitles", &self.target_locale_subtitle_webvtt_file_url),
            ("Metadata", &self.metadata_json_webvtt_file_url),
        ]
        .into_iter()
        .filter_map(|(label, url)| url.as_deref().map(|u| (label, u)))
        .collect()
    }
}

/// A sub-job of a translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "IterationWire")]
pub struct Iteration {
    pub id: String,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<IterationInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<IterationResult>,
    pub created_date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IterationWire {
    id: String,
    status: ResourceStatus,
    #[serde(default)]
    input: Option<IterationInput>,
    #[serde(default)]
    result: Option<IterationResult>,
    created_date_time: DateTime<Utc>,
    #[serde(default)]
    last_action_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl From<IterationWire> for Iteration {
    fn from(wire: IterationWire) -> Self {
        // Results only exist on success, whatever the payload says.
        let result = if wire.status.is_succeeded() { wire.result } else { None };
        Self {
            id: wire.id,
            status: wire.status,
            input: wire.input,
            result,
            created_date_time: wire.created_date_time,
            last_action_date_time: wire.last_action_date_time,
            failure_reason: wire.failure_reason,
        }
    }
}

impl Iteration {
    /// Whether this is the auto-created first iteration
    pub fn is_initial(&self) -> bool {
        self.input.as_ref().is_none_or(|i| i.webvtt_file.is_none())
    }

    pub fn translated_video_url(&self) -> Option<&str> {
        self.result.as_ref()?.translated_video_file_url.as_deref()
    }
}

impl JobResource for Iteration {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}
