//! Speech engine trait and event types.
//!
//! Engines receive fire-and-forget commands and report progress out of band
//! through a broadcast channel. Any number of consumers (the playback
//! controller, a highlighter) subscribe independently; dropping a receiver
//! unsubscribes it.

pub mod recording;

use tokio::sync::broadcast;

pub use recording::{CommandLog, RecordingEngine, SpeechCommand};

/// Identifies one speak command. Events for an older utterance are stale.
pub type UtteranceId = u64;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;

/// Rate bounds accepted by engines.
pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

/// Options applied to every utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    /// Playback rate multiplier (0.5-2.0, default 1.0)
    pub rate: f32,
    /// Preferred voice name; None uses the engine default
    pub voice: Option<String>,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            voice: None,
        }
    }
}

impl SpeechOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rate, clamped to the supported range.
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// A request to speak one chunk, starting part way in.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub chunk_index: usize,
    /// Full chunk text
    pub text: String,
    /// Char offset inside `text` to start from
    pub offset: usize,
    pub options: SpeechOptions,
}

/// Progress reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    /// A word starting at `char_index` (into the full chunk text) is being spoken.
    WordBoundary {
        utterance: UtteranceId,
        char_index: usize,
    },
    /// The utterance finished on its own.
    End { utterance: UtteranceId },
}

impl SpeechEvent {
    pub fn utterance(&self) -> UtteranceId {
        match self {
            SpeechEvent::WordBoundary { utterance, .. } | SpeechEvent::End { utterance } => {
                *utterance
            }
        }
    }
}

/// Speech engine trait - the playback controller drives any engine through this.
///
/// Commands never fail from the caller's point of view; engines log their own
/// problems. `cancel` must be safe to call when nothing is playing.
pub trait SpeechEngine: Send {
    /// Start speaking, replacing anything currently queued.
    fn speak(&mut self, utterance: &Utterance);

    fn pause(&mut self);

    fn resume(&mut self);

    fn cancel(&mut self);

    /// Subscribe to this engine's events.
    fn subscribe(&self) -> broadcast::Receiver<SpeechEvent>;

    /// Engine name for display.
    fn name(&self) -> &'static str;
}

/// Fan-out of speech events to subscribers.
#[derive(Debug, Clone)]
pub struct SpeechEventHub {
    sender: broadcast::Sender<SpeechEvent>,
}

impl Default for SpeechEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish to current subscribers. Having none is fine.
    pub fn publish(&self, event: SpeechEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.sender.subscribe()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_options_default() {
        let opts = SpeechOptions::default();
        assert_eq!(opts.rate, 1.0);
        assert!(opts.voice.is_none());
    }

    #[test]
    fn test_speech_options_clamping() {
        assert_eq!(SpeechOptions::new().with_rate(5.0).rate, 2.0);
        assert_eq!(SpeechOptions::new().with_rate(0.1).rate, 0.5);
        assert_eq!(SpeechOptions::new().with_rate(1.5).rate, 1.5);
    }

    #[test]
    fn test_hub_fans_out_to_each_subscriber() {
        let hub = SpeechEventHub::new();
        let mut controller = hub.subscribe();
        let mut highlighter = hub.subscribe();

        hub.publish(SpeechEvent::End { utterance: 3 });
        assert_eq!(controller.try_recv().unwrap(), SpeechEvent::End { utterance: 3 });
        assert_eq!(highlighter.try_recv().unwrap(), SpeechEvent::End { utterance: 3 });

        drop(highlighter);
        hub.publish(SpeechEvent::WordBoundary {
            utterance: 4,
            char_index: 2,
        });
        assert_eq!(controller.try_recv().unwrap().utterance(), 4);
    }

    #[test]
    fn test_publish_without_subscribers() {
        SpeechEventHub::new().publish(SpeechEvent::End { utterance: 1 });
    }
}
