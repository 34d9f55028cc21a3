//! Audio assembly stage
//!
//! Synthesizes every plan unit (two at a time, with a delay between
//! batches to respect provider rate limits), concatenates the MP3 buffers
//! in order, and optionally wraps the episode in intro/outro music. The
//! byte-concat works because each provider response is a self-framed MP3;
//! real mixing would need a decoder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use newscast_core::{Error, Result, SpeechRequest, SpeechSynthesizer, SynthesisPlan};

use crate::agent::{Agent, AgentContext};

/// Synthesis calls in flight at once.
const CONCURRENT_SYNTH: usize = 2;

/// Pause between synthesis batches.
const BATCH_DELAY: Duration = Duration::from_millis(500);

/// Assumed bitrate for duration estimation: 128 kbps ≈ 16 KB/s.
const BYTES_PER_SEC: f64 = 16_000.0;

/// Audio stage input snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInput {
    pub plan: SynthesisPlan,
    pub intro_music_key: Option<String>,
    pub outro_music_key: Option<String>,
}

/// Audio stage output. The raw audio is carried in memory to publication
/// and excluded from the persisted envelope.
#[derive(Debug, Clone, Serialize)]
pub struct AudioOutput {
    #[serde(skip)]
    pub audio: Bytes,
    pub total_bytes: u64,
    pub duration_sec: f64,
    pub units_synthesized: u32,
    /// Music keys actually applied.
    pub music: Vec<String>,
}

/// Audio stage agent.
pub struct AudioAgent {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl AudioAgent {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl Agent for AudioAgent {
    type Input = AudioInput;
    type Output = AudioOutput;

    fn name(&self) -> &'static str {
        "AudioAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &AudioInput) -> Result<AudioOutput> {
        if input.plan.is_empty() {
            return Err(Error::EmptyResult("synthesis plan is empty".into()));
        }

        let mut assembled = BytesMut::new();
        let mut music_applied = Vec::new();

        if let Some(key) = &input.intro_music_key {
            if let Some(music) = load_music(ctx, key).await {
                assembled.extend_from_slice(&music);
                music_applied.push(key.clone());
            }
        }

        let mut units_synthesized = 0u32;
        for (batch_index, batch) in input.plan.units.chunks(CONCURRENT_SYNTH).enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Fatal("run cancelled during synthesis".into()));
            }
            if batch_index > 0 {
                tokio::time::sleep(BATCH_DELAY).await;
            }
            let calls = batch.iter().map(|unit| {
                self.synthesizer.synthesize(SpeechRequest {
                    voice: unit.voice.clone(),
                    text: unit.text.clone(),
                    speed: unit.speed,
                })
            });
            // try_join_all preserves unit order within the batch.
            let buffers = futures::future::try_join_all(calls).await?;
            for buffer in buffers {
                if buffer.is_empty() {
                    return Err(Error::Fatal("synthesis returned an empty buffer".into()));
                }
                assembled.extend_from_slice(&buffer);
                units_synthesized += 1;
            }
        }

        if let Some(key) = &input.outro_music_key {
            if let Some(music) = load_music(ctx, key).await {
                assembled.extend_from_slice(&music);
                music_applied.push(key.clone());
            }
        }

        let audio = normalize_loudness(assembled.freeze());
        let total_bytes = audio.len() as u64;
        let duration_sec = total_bytes as f64 / BYTES_PER_SEC;
        tracing::info!(
            units = units_synthesized,
            bytes = total_bytes,
            duration_sec,
            "audio assembled"
        );
        Ok(AudioOutput {
            audio,
            total_bytes,
            duration_sec,
            units_synthesized,
            music: music_applied,
        })
    }
}

/// Music fetch failures are logged and skipped, never fatal.
async fn load_music(ctx: &AgentContext, key: &str) -> Option<Bytes> {
    match ctx.store.get(key).await {
        Ok(music) => Some(music),
        Err(err) => {
            tracing::warn!(key, error = %err, "music load failed, skipping");
            None
        }
    }
}

/// Placeholder loudness normalization. Identity until real DSP lands.
fn normalize_loudness(audio: Bytes) -> Bytes {
    audio
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscast_core::{SynthesisUnit, VoiceRole};
    use uuid::Uuid;

    /// Echoes the unit text back as bytes so order is observable.
    struct EchoSynth;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynth {
        async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes> {
            Ok(Bytes::from(format!("<{}>", request.text)))
        }
    }

    struct EmptySynth;

    #[async_trait]
    impl SpeechSynthesizer for EmptySynth {
        async fn synthesize(&self, _request: SpeechRequest) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn unit(text: &str) -> SynthesisUnit {
        SynthesisUnit {
            id: Uuid::new_v4(),
            role: VoiceRole::Host,
            voice: "shimmer".into(),
            text: text.into(),
            duration_sec_estimate: 1.0,
            speed: 0.95,
        }
    }

    fn plan(texts: &[&str]) -> SynthesisPlan {
        SynthesisPlan {
            units: texts.iter().map(|t| unit(t)).collect(),
        }
    }

    #[tokio::test]
    async fn concatenates_in_unit_order() {
        let agent = AudioAgent::new(Arc::new(EchoSynth));
        let ctx = crate::agent::test_support::context();
        let input = AudioInput {
            plan: plan(&["a", "b", "c", "d", "e"]),
            intro_music_key: None,
            outro_music_key: None,
        };
        let output = agent.process(&ctx, &input).await.unwrap();
        assert_eq!(&output.audio[..], b"<a><b><c><d><e>");
        assert_eq!(output.units_synthesized, 5);
        assert_eq!(output.total_bytes, 15);
        assert!((output.duration_sec - 15.0 / 16_000.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn empty_buffer_is_fatal() {
        let agent = AudioAgent::new(Arc::new(EmptySynth));
        let ctx = crate::agent::test_support::context();
        let input = AudioInput {
            plan: plan(&["a"]),
            intro_music_key: None,
            outro_music_key: None,
        };
        let err = agent.process(&ctx, &input).await.unwrap_err();
        assert!(matches!(err, Error::Fatal(_)));
    }

    #[tokio::test]
    async fn missing_music_is_skipped_not_fatal() {
        let agent = AudioAgent::new(Arc::new(EchoSynth));
        let ctx = crate::agent::test_support::context();
        let input = AudioInput {
            plan: plan(&["a"]),
            intro_music_key: Some("music/intro.mp3".into()),
            outro_music_key: Some("music/outro.mp3".into()),
        };
        let output = agent.process(&ctx, &input).await.unwrap();
        assert_eq!(&output.audio[..], b"<a>");
        assert!(output.music.is_empty());
    }

    #[tokio::test]
    async fn empty_plan_is_rejected() {
        let agent = AudioAgent::new(Arc::new(EchoSynth));
        let ctx = crate::agent::test_support::context();
        let input = AudioInput {
            plan: SynthesisPlan { units: vec![] },
            intro_music_key: None,
            outro_music_key: None,
        };
        assert!(agent.process(&ctx, &input).await.is_err());
    }
}
