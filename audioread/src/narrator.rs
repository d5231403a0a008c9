//! Console speech engine: "speaks" by printing words at a reading pace.

use audioread_core::speech::{SpeechEngine, SpeechEvent, SpeechEventHub, Utterance};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// An utterance being narrated, or paused part way.
struct Narration {
    utterance: Utterance,
    /// Char index of the last word reached
    progress: Arc<AtomicUsize>,
    task: JoinHandle<()>,
    paused: bool,
}

/// Prints each word of an utterance in turn, reporting word boundaries and
/// the end of the utterance like a real synthesizer would.
pub struct ConsoleNarrator {
    hub: SpeechEventHub,
    words_per_minute: u32,
    current: Option<Narration>,
}

impl ConsoleNarrator {
    /// Create a narrator. Must be used inside a tokio runtime.
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            hub: SpeechEventHub::new(),
            words_per_minute: words_per_minute.max(1),
            current: None,
        }
    }

    fn start(&mut self, utterance: Utterance) {
        let progress = Arc::new(AtomicUsize::new(utterance.offset));
        let delay = word_delay(self.words_per_minute, utterance.options.rate);
        if let Some(voice) = &utterance.options.voice {
            log::debug!("narrator: voice {} requested, using console", voice);
        }
        let task = tokio::spawn(narrate(
            utterance.clone(),
            self.hub.clone(),
            progress.clone(),
            delay,
        ));
        self.current = Some(Narration {
            utterance,
            progress,
            task,
            paused: false,
        });
    }
}

impl Drop for ConsoleNarrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl SpeechEngine for ConsoleNarrator {
    fn speak(&mut self, utterance: &Utterance) {
        self.cancel();
        self.start(utterance.clone());
    }

    fn pause(&mut self) {
        if let Some(narration) = &mut self.current {
            if !narration.paused {
                narration.task.abort();
                narration.paused = true;
            }
        }
    }

    fn resume(&mut self) {
        let Some(narration) = self.current.take_if(|n| n.paused) else {
            return;
        };
        let utterance = Utterance {
            offset: narration.progress.load(Ordering::Relaxed),
            ..narration.utterance
        };
        self.start(utterance);
    }

    fn cancel(&mut self) {
        if let Some(narration) = self.current.take() {
            narration.task.abort();
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.hub.subscribe()
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

async fn narrate(
    utterance: Utterance,
    hub: SpeechEventHub,
    progress: Arc<AtomicUsize>,
    delay: Duration,
) {
    for (char_index, word) in words_from(&utterance.text, utterance.offset) {
        progress.store(char_index, Ordering::Relaxed);
        hub.publish(SpeechEvent::WordBoundary {
            utterance: utterance.id,
            char_index,
        });
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{} ", word);
        let _ = stdout.flush();
        tokio::time::sleep(delay).await;
    }
    println!();
    hub.publish(SpeechEvent::End {
        utterance: utterance.id,
    });
}

/// Time per word at a given pace and rate.
fn word_delay(words_per_minute: u32, rate: f32) -> Duration {
    let words_per_second = words_per_minute.max(1) as f32 * rate.max(0.1) / 60.0;
    Duration::from_secs_f32(1.0 / words_per_second)
}

/// Words of `text` that start at or after char `from`, with their char index.
fn words_from(text: &str, from: usize) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut word_start: Option<(usize, usize)> = None;
    let mut in_word = false;

    for (char_index, (byte, c)) in text.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((start_char, start_byte)) = word_start.take() {
                words.push((start_char, &text[start_byte..byte]));
            }
            in_word = false;
        } else {
            // Words that began before `from` are skipped whole.
            if !in_word && char_index >= from {
                word_start = Some((char_index, byte));
            }
            in_word = true;
        }
    }
    if let Some((start_char, start_byte)) = word_start {
        words.push((start_char, &text[start_byte..]));
    }
    words
}
