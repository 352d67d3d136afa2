/*!
 * Translation resources: the top-level video translation jobs.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::language_utils;
use super::iteration::Iteration;
use super::status::{JobResource, ResourceStatus};
use super::validate_file_url;

/// Default maximum characters per subtitle segment when the caller sets none
pub const DEFAULT_SUBTITLE_MAX_CHAR_COUNT: u32 = 32;

/// Smallest accepted `subtitleMaxCharCountPerSegment`
pub const MIN_SUBTITLE_MAX_CHAR_COUNT: u32 = 1;

/// Largest accepted `subtitleMaxCharCountPerSegment`
pub const MAX_SUBTITLE_MAX_CHAR_COUNT: u32 = 128;

/// Voice used for the translated speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoiceKind {
    #[default]
    PlatformVoice,
    PersonalVoice,
}

impl VoiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlatformVoice => "PlatformVoice",
            Self::PersonalVoice => "PersonalVoice",
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PlatformVoice" => Ok(Self::PlatformVoice),
            "PersonalVoice" => Ok(Self::PersonalVoice),
            other => Err(ValidationError::UnknownVoiceKind(other.to_string())),
        }
    }
}

/// Input of a translation, immutable once submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
    /// URL of the source video
    pub video_file_url: String,

    /// Locale spoken in the source video (e.g. "en-US")
    pub source_locale: String,

    /// Locale to translate into (e.g. "ja-JP")
    pub target_locale: String,

    pub voice_kind: VoiceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_max_char_count_per_segment: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_subtitle_in_video: Option<bool>,
}

impl TranslationInput {
    /// Create a new translation input with the required fields
    pub fn new(
        video_file_url: impl Into<String>,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
        voice_kind: VoiceKind,
    ) -> Self {
        Self {
            video_file_url: video_file_url.into(),
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
            voice_kind,
            speaker_count: None,
            subtitle_max_char_count_per_segment: None,
            export_subtitle_in_video: None,
        }
    }

    /// Set the number of speakers in the video
    pub fn speaker_count(mut self, count: u32) -> Self {
        self.speaker_count = Some(count);
        self
    }

    /// Set the maximum characters per subtitle segment
    pub fn subtitle_max_char_count_per_segment(mut self, count: u32) -> Self {
        self.subtitle_max_char_count_per_segment = Some(count);
        self
    }

    /// Burn subtitles into the output video
    pub fn export_subtitle_in_video(mut self, export: bool) -> Self {
        self.export_subtitle_in_video = Some(export);
        self
    }

    /// Check every field locally, before anything is sent
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_file_url("videoFileUrl", &self.video_file_url)?;
        language_utils::validate_locale("sourceLocale", &self.source_locale)?;
        language_utils::validate_locale("targetLocale", &self.target_locale)?;

        if let Some(count) = self.speaker_count {
            if count < 1 {
                return Err(ValidationError::SpeakerCount(count));
            }
        }

        if let Some(value) = self.subtitle_max_char_count_per_segment {
            if !(MIN_SUBTITLE_MAX_CHAR_COUNT..=MAX_SUBTITLE_MAX_CHAR_COUNT).contains(&value) {
                return Err(ValidationError::SubtitleMaxCharCount {
                    value,
                    min: MIN_SUBTITLE_MAX_CHAR_COUNT,
                    max: MAX_SUBTITLE_MAX_CHAR_COUNT,
                });
            }
        }

        Ok(())
    }
}

/// A top-level translation job as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: ResourceStatus,

    pub input: TranslationInput,

    pub created_date_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_date_time: Option<DateTime<Utc>>,

    /// Service snapshot of the most recent succeeded iteration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_succeeded_iteration: Option<Iteration>,

    /// Iterations in creation order, when the service reports them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iterations: Vec<Iteration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Translation {
    /// The most recent succeeded iteration.
    ///
    /// Resolves through `iterations` when the referenced iteration is listed
    /// there and falls back to the embedded snapshot otherwise.
    pub fn latest_succeeded(&self) -> Option<&Iteration> {
        let latest = self.latest_succeeded_iteration.as_ref()?;
        self.iterations
            .iter()
            .find(|it| it.id == latest.id)
            .or(Some(latest))
    }

    /// The auto-created first iteration, if listed
    pub fn first_iteration(&self) -> Option<&Iteration> {
        self.iterations.first()
    }

    pub fn iteration(&self, iteration_id: &str) -> Option<&Iteration> {
        self.iterations.iter().find(|it| it.id == iteration_id)
    }
}

impl JobResource for Translation {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ResourceStatus {
        self.status
    }
}

/// The list projection of a translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Translation")]
pub struct TranslationSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub status: ResourceStatus,
    pub source_locale: String,
    pub target_locale: String,
    pub voice_kind: VoiceKind,
    pub created_date_time: DateTime<Utc>,
    pub last_action_date_time: Option<DateTime<Utc>>,
}

impl From<Translation> for TranslationSummary {
    fn from(translation: Translation) -> Self {
        Self {
            id: translation.id,
            display_name: translation.display_name,
            status: translation.status,
            source_locale: translation.input.source_locale,
            target_locale: translation.input.target_locale,
            voice_kind: translation.input.voice_kind,
            created_date_time: translation.created_date_time,
            last_action_date_time: translation.last_action_date_time,
        }
    }
}

impl fmt::Display for TranslationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} -> {} ({}), created {}",
            self.id,
            self.status,
            self.source_locale,
            self.target_locale,
            self.voice_kind,
            self.created_date_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
