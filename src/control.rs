//! The control path: note and parameter changes sent towards the render
//! thread.
//!
//! Control messages are small `Copy` values. Parameter names are interned
//! to `&'static str` before they are queued, so nothing on the way to the
//! render thread allocates. The manager drains pending messages at the start
//! of every block.

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::engine::EngineType;
use crate::manager::SynthesisMode;
#[cfg(feature = "rtrb")]
use crate::{
    error::{Result, SynthError},
    params,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
    /// Release every held voice through its envelope.
    AllNotesOff,
    /// Drop every voice at once.
    AllSoundOff,
    /// A manager parameter, or an engine parameter applied to every engine
    /// that declares it.
    SetParameter { name: &'static str, value: f64 },
    SetEngineParameter {
        engine: EngineType,
        name: &'static str,
        value: f64,
    },
    SetPrimaryEngine(EngineType),
    SetMode(SynthesisMode),
    SetLayerEnabled(EngineType, bool),
    SetLayerAmplitude(EngineType, f32),
    SetLayerPan(EngineType, f32),
    SetLayerSolo(EngineType, bool),
    SetLayerMute(EngineType, bool),
    SetSampleRate(f32),
    SetBufferSize(usize),
}

/// Anything the manager can pull control messages from.
pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        self.pop_front()
    }
}

/// Control-side handle to a [`SynthesisManager`](crate::manager::SynthesisManager)
/// running on another thread.
#[cfg(feature = "rtrb")]
pub struct SynthHandle {
    tx: Producer<ControlMessage>,
}

#[cfg(feature = "rtrb")]
impl SynthHandle {
    pub(crate) fn new(tx: Producer<ControlMessage>) -> Self {
        Self { tx }
    }

    /// Queue a message. Fails with [`SynthError::QueueFull`] when the render
    /// thread has fallen behind.
    pub fn send(&mut self, message: ControlMessage) -> Result<()> {
        self.tx.push(message).map_err(|_| SynthError::QueueFull)
    }

    pub fn note_on(&mut self, note: u8, velocity: f32) -> Result<()> {
        self.send(ControlMessage::NoteOn {
            note: note.min(127),
            velocity: velocity.clamp(0.0, 1.0),
        })
    }

    pub fn note_off(&mut self, note: u8) -> Result<()> {
        self.send(ControlMessage::NoteOff { note: note.min(127) })
    }

    pub fn all_notes_off(&mut self) -> Result<()> {
        self.send(ControlMessage::AllNotesOff)
    }

    pub fn all_sound_off(&mut self) -> Result<()> {
        self.send(ControlMessage::AllSoundOff)
    }

    /// Queue a parameter change. Names nothing declares are dropped here and
    /// return `Ok(false)`.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<bool> {
        match params::intern(name) {
            Some(name) => self
                .send(ControlMessage::SetParameter { name, value })
                .map(|_| true),
            None => Ok(false),
        }
    }

    pub fn set_engine_parameter(&mut self, engine: EngineType, name: &str, value: f64) -> Result<bool> {
        match params::intern(name) {
            Some(name) => self
                .send(ControlMessage::SetEngineParameter {
                    engine,
                    name,
                    value,
                })
                .map(|_| true),
            None => Ok(false),
        }
    }

    pub fn set_primary_engine(&mut self, engine: EngineType) -> Result<()> {
        self.send(ControlMessage::SetPrimaryEngine(engine))
    }

    pub fn set_mode(&mut self, mode: SynthesisMode) -> Result<()> {
        self.send(ControlMessage::SetMode(mode))
    }

    /// Free slots left in the queue.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }
}

#[cfg(all(test, feature = "rtrb"))]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    #[test]
    fn handle_queues_interned_messages() {
        let (tx, mut rx) = RingBuffer::new(8);
        let mut handle = SynthHandle::new(tx);

        handle.note_on(200, 1.5).unwrap();
        assert_eq!(handle.set_parameter("grainDensity", 40.0), Ok(true));
        assert_eq!(handle.set_parameter("noSuchThing", 1.0), Ok(false));

        assert_eq!(
            MessageReceiver::pop(&mut rx),
            Some(ControlMessage::NoteOn {
                note: 127,
                velocity: 1.0
            })
        );
        assert_eq!(
            MessageReceiver::pop(&mut rx),
            Some(ControlMessage::SetParameter {
                name: "grainDensity",
                value: 40.0
            })
        );
        assert_eq!(MessageReceiver::pop(&mut rx), None);
    }

    #[test]
    fn full_queue_is_reported() {
        let (tx, _rx) = RingBuffer::new(1);
        let mut handle = SynthHandle::new(tx);
        assert_eq!(handle.all_notes_off(), Ok(()));
        assert_eq!(handle.all_sound_off(), Err(SynthError::QueueFull));
        assert_eq!(handle.slots(), 0);
    }
}
