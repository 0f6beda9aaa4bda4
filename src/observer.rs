//! Event fan-out from the synthesis core to whoever is listening.
//!
//! Engines and the manager report what they did (notes started, voices
//! stolen, overload mitigation) as [`SynthEvent`] values. Listeners are plain
//! closures or, with the `rtrb` feature, the producer half of a ring buffer
//! whose consumer sits on a UI thread. Delivery never blocks: a full ring
//! drops the event.

#[cfg(feature = "rtrb")]
use rtrb::Producer;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::EngineType;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthEvent {
    NoteOn {
        engine: EngineType,
        note: u8,
        velocity: f32,
    },
    NoteOff {
        engine: EngineType,
        note: u8,
    },
    /// A voice was evicted to stay within the engine's polyphony.
    VoiceStolen {
        engine: EngineType,
        note: u8,
    },
    /// The CPU or voice threshold was exceeded and `engine`'s voices were
    /// reset.
    Overload {
        engine: EngineType,
        cpu_usage: f32,
        voice_count: usize,
    },
    PrimaryEngineChanged {
        from: EngineType,
        to: EngineType,
    },
    CrossfadeComplete {
        engine: EngineType,
    },
}

pub trait SynthObserver: Send {
    fn on_event(&mut self, event: &SynthEvent);
}

impl<F> SynthObserver for F
where
    F: FnMut(&SynthEvent) + Send,
{
    fn on_event(&mut self, event: &SynthEvent) {
        self(event)
    }
}

#[cfg(feature = "rtrb")]
impl SynthObserver for Producer<SynthEvent> {
    fn on_event(&mut self, event: &SynthEvent) {
        // a slow reader loses events rather than stalling the audio thread
        let _ = self.push(*event);
    }
}

/// Registered observers of one engine or manager.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Box<dyn SynthObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SynthObserver>) {
        self.observers.push(observer);
    }

    pub fn notify(&mut self, event: SynthEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn closures_receive_every_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut observers = Observers::new();
        observers.subscribe(Box::new(move |event: &SynthEvent| {
            sink.lock().unwrap().push(*event);
        }));

        let event = SynthEvent::NoteOff {
            engine: EngineType::Fm,
            note: 60,
        };
        observers.notify(event);
        observers.notify(event);

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn full_ring_drops_events() {
        let (producer, mut consumer) = rtrb::RingBuffer::<SynthEvent>::new(1);
        let mut observers = Observers::new();
        observers.subscribe(Box::new(producer));

        observers.notify(SynthEvent::CrossfadeComplete {
            engine: EngineType::Additive,
        });
        observers.notify(SynthEvent::CrossfadeComplete {
            engine: EngineType::Granular,
        });

        assert_eq!(
            consumer.pop().ok(),
            Some(SynthEvent::CrossfadeComplete {
                engine: EngineType::Additive
            })
        );
        assert!(consumer.pop().is_err());
    }
}
