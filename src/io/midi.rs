/// A decoded channel-voice MIDI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    /// Channel aftertouch.
    ChannelPressure { channel: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
}

/// Controller numbers with a fixed meaning.
pub mod cc {
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const ALL_NOTES_OFF: u8 = 123;
}

impl MidiEvent {
    /// Decode one three-byte (or two-byte, with `data2` ignored) message.
    ///
    /// Data bytes are masked to 7 bits. A note-on with velocity 0 decodes as
    /// a note-off. System and unsupported messages return `None`.
    pub fn parse(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let channel = status & 0x0F;
        let data1 = data1 & 0x7F;
        let data2 = data2 & 0x7F;

        match status & 0xF0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            }),
            0x90 if data2 == 0 => Some(MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: 0,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: data1,
                value: data2,
            }),
            0xC0 => Some(MidiEvent::ProgramChange {
                channel,
                program: data1,
            }),
            0xD0 => Some(MidiEvent::ChannelPressure {
                channel,
                value: data1,
            }),
            // 14-bit value centred on 8192
            0xE0 => Some(MidiEvent::PitchBend {
                channel,
                value: (((data2 as i16) << 7) | data1 as i16) - 8192,
            }),
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_notes() {
        assert_eq!(
            MidiEvent::parse(0x91, 60, 100),
            Some(MidiEvent::NoteOn {
                channel: 1,
                key: 60,
                velocity: 100
            })
        );
        assert_eq!(
            MidiEvent::parse(0x80, 60, 64),
            Some(MidiEvent::NoteOff {
                channel: 0,
                key: 60,
                velocity: 64
            })
        );
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        assert!(matches!(
            MidiEvent::parse(0x90, 64, 0),
            Some(MidiEvent::NoteOff { key: 64, .. })
        ));
    }

    #[test]
    fn pitch_bend_is_centred() {
        assert_eq!(
            MidiEvent::parse(0xE0, 0x00, 0x40),
            Some(MidiEvent::PitchBend {
                channel: 0,
                value: 0
            })
        );
        assert!(matches!(
            MidiEvent::parse(0xE0, 0x7F, 0x7F),
            Some(MidiEvent::PitchBend { value: 8191, .. })
        ));
    }

    #[test]
    fn channel_pressure_uses_the_first_data_byte() {
        let event = MidiEvent::parse(0xD5, 0x50, 0x7F);
        assert_eq!(
            event,
            Some(MidiEvent::ChannelPressure {
                channel: 5,
                value: 0x50
            })
        );
        assert_eq!(event.map(|e| e.channel()), Some(5));
    }

    #[test]
    fn system_messages_are_ignored() {
        assert_eq!(MidiEvent::parse(0xF8, 0, 0), None);
        assert_eq!(MidiEvent::parse(0x42, 0, 0), None);
    }
}
