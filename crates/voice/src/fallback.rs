use std::sync::Arc;

use {
    thiserror::Error,
    tracing::{debug, info, warn},
};

use crate::synth::{AudioFormat, SpeechSynthesizer, SynthesizeRequest};

/// Ordered output-format candidates. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct FormatPolicy {
    candidates: Vec<AudioFormat>,
}

impl FormatPolicy {
    pub fn new(candidates: Vec<AudioFormat>) -> anyhow::Result<Self> {
        if candidates.is_empty() {
            anyhow::bail!("format policy needs at least one candidate");
        }
        Ok(Self { candidates })
    }

    /// Voice-note native codec first, then progressively plainer encodings.
    #[must_use]
    pub fn default_ladder() -> Self {
        Self {
            candidates: vec![
                AudioFormat::OggOpus,
                AudioFormat::Mp3High,
                AudioFormat::Mp3Low,
                AudioFormat::Wav,
            ],
        }
    }

    /// Build a policy from config format names. An empty list means the
    /// default ladder; an unknown name is a startup error.
    pub fn from_names(names: &[String]) -> anyhow::Result<Self> {
        if names.is_empty() {
            return Ok(Self::default_ladder());
        }
        let candidates = names
            .iter()
            .map(|name| name.parse::<AudioFormat>().map_err(anyhow::Error::from))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Self::new(candidates)
    }

    #[must_use]
    pub fn candidates(&self) -> &[AudioFormat] {
        &self.candidates
    }
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self::default_ladder()
    }
}

/// What delivery needs from a successful synthesis: where to stream from
/// and which format won.
#[derive(Debug, Clone)]
pub struct SpokenReply {
    pub url: String,
    pub format: AudioFormat,
}

/// Why a whole synthesis turn failed.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Every candidate format failed; carries each attempt's error.
    #[error("all output formats failed: {}", summarize(.attempts))]
    AllFormatsFailed { attempts: Vec<(AudioFormat, String)> },
}

fn summarize(attempts: &[(AudioFormat, String)]) -> String {
    attempts
        .iter()
        .map(|(format, error)| format!("{format}: {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ordered-format synthesis: try each candidate in turn and stop at the
/// first success.
///
/// Any failure, including auth or network errors that would hit every
/// format alike, advances to the next candidate; there is no
/// short-circuit on error kind.
pub struct FallbackSynthesizer {
    provider: Arc<dyn SpeechSynthesizer>,
    policy: FormatPolicy,
}

impl FallbackSynthesizer {
    pub fn new(provider: Arc<dyn SpeechSynthesizer>, policy: FormatPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<SpokenReply, SynthesisError> {
        let mut attempts: Vec<(AudioFormat, String)> = Vec::new();

        for &format in self.policy.candidates() {
            let request = SynthesizeRequest {
                text: text.to_string(),
                voice_id: voice_id.map(str::to_string),
                output_format: format,
            };

            match self.provider.synthesize(&request).await {
                Ok(audio) => {
                    if attempts.is_empty() {
                        debug!(format = %format, "synthesis ok");
                    } else {
                        info!(
                            format = %format,
                            failed_attempts = attempts.len(),
                            "synthesis succeeded after format fallback"
                        );
                    }
                    return Ok(SpokenReply {
                        url: self.provider.stream_url(&audio),
                        format,
                    });
                },
                Err(e) => {
                    warn!(
                        provider = self.provider.name(),
                        format = %format,
                        error = %e,
                        "synthesis attempt failed, trying next format"
                    );
                    attempts.push((format, e.to_string()));
                },
            }
        }

        Err(SynthesisError::AllFormatsFailed { attempts })
    }
}
