//! Speech synthesis: the provider trait, the UpliftAI client, and the
//! ordered format-fallback policy.

pub mod fallback;
pub mod synth;
pub mod uplift;

pub use {
    fallback::{FallbackSynthesizer, FormatPolicy, SpokenReply, SynthesisError},
    synth::{AudioFormat, SpeechSynthesizer, SynthesizeRequest, SynthesizedAudio, UnknownFormat},
    uplift::UpliftTts,
};
