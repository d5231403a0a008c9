//! Recording speech engine for testing
//!
//! Records every command it receives instead of producing audio. Tests drive
//! progress by publishing events through [`RecordingEngine::emit`] or by
//! handing events straight to the controller.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{SpeechEngine, SpeechEvent, SpeechEventHub, Utterance, UtteranceId};

/// A command as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechCommand {
    Speak {
        utterance: UtteranceId,
        chunk_index: usize,
        offset: usize,
        rate: f32,
    },
    Pause,
    Resume,
    Cancel,
}

/// Shared view of the commands a [`RecordingEngine`] received.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Arc<Mutex<Vec<SpeechCommand>>>,
}

impl CommandLog {
    fn push(&self, command: SpeechCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }

    /// All commands so far, oldest first.
    pub fn commands(&self) -> Vec<SpeechCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<SpeechCommand> {
        self.commands().pop()
    }

    /// Id of the most recent speak command.
    pub fn last_utterance(&self) -> Option<UtteranceId> {
        self.commands().iter().rev().find_map(|c| match c {
            SpeechCommand::Speak { utterance, .. } => Some(*utterance),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.commands().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A speech engine that only records commands.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    log: CommandLog,
    hub: SpeechEventHub,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting commands after the engine has been moved into a controller.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Handle for publishing events after the engine has been moved.
    pub fn hub(&self) -> SpeechEventHub {
        self.hub.clone()
    }

    pub fn emit(&self, event: SpeechEvent) {
        self.hub.publish(event);
    }
}

impl SpeechEngine for RecordingEngine {
    fn speak(&mut self, utterance: &Utterance) {
        self.log.push(SpeechCommand::Speak {
            utterance: utterance.id,
            chunk_index: utterance.chunk_index,
            offset: utterance.offset,
            rate: utterance.options.rate,
        });
    }

    fn pause(&mut self) {
        self.log.push(SpeechCommand::Pause);
    }

    fn resume(&mut self) {
        self.log.push(SpeechCommand::Resume);
    }

    fn cancel(&mut self) {
        self.log.push(SpeechCommand::Cancel);
    }

    fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.hub.subscribe()
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeechOptions;

    fn utterance(id: UtteranceId) -> Utterance {
        Utterance {
            id,
            chunk_index: 2,
            text: "Some text.".to_string(),
            offset: 5,
            options: SpeechOptions::default(),
        }
    }

    #[test]
    fn test_records_commands_in_order() {
        let mut engine = RecordingEngine::new();
        let log = engine.log();

        engine.speak(&utterance(7));
        engine.pause();
        engine.cancel();

        assert_eq!(
            log.commands(),
            vec![
                SpeechCommand::Speak {
                    utterance: 7,
                    chunk_index: 2,
                    offset: 5,
                    rate: 1.0
                },
                SpeechCommand::Pause,
                SpeechCommand::Cancel,
            ]
        );
        assert_eq!(log.last_utterance(), Some(7));
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let engine = RecordingEngine::new();
        let mut events = engine.subscribe();
        engine.emit(SpeechEvent::End { utterance: 9 });
        assert_eq!(events.recv().await.unwrap(), SpeechEvent::End { utterance: 9 });
    }
}
