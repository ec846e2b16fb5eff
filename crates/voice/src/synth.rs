use {async_trait::async_trait, thiserror::Error};

/// Output format candidates, in the order delivery prefers them.
///
/// The wire parameter strings are opaque to everything above the provider
/// client; nothing else in the service interprets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// Voice-note native codec.
    #[default]
    OggOpus,
    Mp3High,
    Mp3Low,
    Wav,
}

impl AudioFormat {
    /// The provider's output-format parameter value.
    #[must_use]
    pub fn wire_param(self) -> &'static str {
        match self {
            AudioFormat::OggOpus => "OGG_OPUS_22050_64",
            AudioFormat::Mp3High => "MP3_22050_128",
            AudioFormat::Mp3Low => "MP3_22050_64",
            AudioFormat::Wav => "WAV_22050_16",
        }
    }

    /// Config-facing name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::OggOpus => "ogg_opus",
            AudioFormat::Mp3High => "mp3_high",
            AudioFormat::Mp3Low => "mp3_low",
            AudioFormat::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a configured format name is not recognized.
#[derive(Debug, Error)]
#[error("unknown audio format: {0}")]
pub struct UnknownFormat(pub String);

impl std::str::FromStr for AudioFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ogg_opus" => Ok(AudioFormat::OggOpus),
            "mp3_high" => Ok(AudioFormat::Mp3High),
            "mp3_low" => Ok(AudioFormat::Mp3Low),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// One synthesis attempt.
#[derive(Debug, Clone, Default)]
pub struct SynthesizeRequest {
    pub text: String,
    /// Voice override; the provider's configured default when unset.
    pub voice_id: Option<String>,
    pub output_format: AudioFormat,
}

/// A synthesized clip, addressed by the provider's media id plus access
/// token. The pair is opaque, only meaningful together, and never cached
/// beyond the turn that produced it.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub media_id: String,
    pub token: String,
    pub format: AudioFormat,
}

/// Speech synthesis provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    async fn synthesize(&self, request: &SynthesizeRequest) -> anyhow::Result<SynthesizedAudio>;

    /// Playable URL for a clip on the provider's streaming endpoint.
    fn stream_url(&self, audio: &SynthesizedAudio) -> String;
}
