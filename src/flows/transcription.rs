//! Speech to text, and speech to a polished artisan story.

use super::media::DataUri;
use super::model::GenerativeModel;
use super::prompt::Prompt;
use crate::error::{Error, ModelError, Result, ValidationError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const TRANSCRIBE_PROMPT: Prompt = Prompt::new(
    "transcribe_audio",
    "Transcribe this audio recording. Return only the transcribed text.\n\nAudio: {{ media(audio_data_uri) }}",
);

const RAW_TRANSCRIPT_PROMPT: Prompt = Prompt::new(
    "raw_transcript",
    "Transcribe this audio recording to text:\n\n{{ media(audio_data_uri) }}",
);

const POLISH_PROMPT: Prompt = Prompt::new(
    "polish_story",
    r#"You are a cultural storyteller who helps artisans share their stories.
Below is the raw transcript of an artisan talking about their craft. Turn it into a well-structured, engaging cultural story.

Raw transcript: {{ raw_transcript }}"#,
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeAudioInput {
    /// `data:<mime>;base64,<payload>` recording.
    pub audio_data_uri: String,
}

impl TranscribeAudioInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        DataUri::parse("audio_data_uri", &self.audio_data_uri)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranscribeAudioOutput {
    /// The transcribed text from the audio.
    pub transcript: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
struct PolishedStory {
    /// The polished and well-structured cultural story.
    polished_story: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtisanStoryOutput {
    pub raw_transcript: String,
    pub polished_story: String,
}

/// An empty model response becomes the default value.
fn or_default<T: Default>(result: Result<T>) -> Result<T> {
    match result {
        Err(Error::Model(ModelError::EmptyResponse)) => Ok(T::default()),
        other => other,
    }
}

pub async fn transcribe_audio(
    model: &dyn GenerativeModel,
    input: &TranscribeAudioInput,
) -> Result<TranscribeAudioOutput> {
    input.validate()?;
    or_default(TRANSCRIBE_PROMPT.generate(model, input).await)
}

/// Two model calls: a plain transcription, then a polishing pass over it.
pub async fn transcribe_and_polish_story(
    model: &dyn GenerativeModel,
    input: &TranscribeAudioInput,
) -> Result<ArtisanStoryOutput> {
    input.validate()?;

    let raw_transcript = or_default(RAW_TRANSCRIPT_PROMPT.generate_text(model, input).await)?;
    let polished: PolishedStory = or_default(
        POLISH_PROMPT
            .generate(model, &serde_json::json!({ "raw_transcript": raw_transcript }))
            .await,
    )?;

    Ok(ArtisanStoryOutput {
        raw_transcript,
        polished_story: polished.polished_story,
    })
}
