use crate::{
    control::ControlMessage,
    io::{
        mapping::MidiMap,
        midi::{cc, MidiEvent},
    },
};

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
///
/// Evaluated in `f64` so every octave of A lands exactly on its frequency.
pub fn midi_note_to_freq(note: u8) -> f32 {
    (440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)) as f32
}

/// MIDI velocity 0..=127 onto 0.0..=1.0.
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}

/// Translate a MIDI event into a control message. `channel_filter` limits
/// which channel is listened to; `None` accepts every channel. Controllers,
/// pressure and the pitch wheel become parameter changes through `map`.
pub fn midi_to_control(
    midi: MidiEvent,
    channel_filter: Option<u8>,
    map: &MidiMap,
) -> Option<ControlMessage> {
    if channel_filter.is_some_and(|channel| channel != midi.channel()) {
        return None;
    }

    let (target, normalized) = match midi {
        MidiEvent::NoteOn { key, velocity, .. } => {
            return Some(ControlMessage::NoteOn {
                note: key,
                velocity: velocity_to_gain(velocity),
            })
        }
        MidiEvent::NoteOff { key, .. } => return Some(ControlMessage::NoteOff { note: key }),
        MidiEvent::ControlChange {
            controller: cc::ALL_SOUND_OFF,
            ..
        } => return Some(ControlMessage::AllSoundOff),
        MidiEvent::ControlChange {
            controller: cc::ALL_NOTES_OFF,
            ..
        } => return Some(ControlMessage::AllNotesOff),
        MidiEvent::ControlChange {
            controller, value, ..
        } => (map.cc_target(controller), value as f64 / 127.0),
        MidiEvent::ChannelPressure { value, .. } => (map.pressure_target(), value as f64 / 127.0),
        MidiEvent::PitchBend { value, .. } => {
            (map.pitch_bend_target(), (value as f64 / 8192.0 + 1.0) * 0.5)
        }
        MidiEvent::ProgramChange { .. } => return None,
    };

    let name = target?;
    let value = MidiMap::scale(name, normalized)?;
    Some(ControlMessage::SetParameter { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_frequencies_are_exact() {
        assert_eq!(midi_note_to_freq(69), 440.0);
        assert_eq!(midi_note_to_freq(57), 220.0);
        assert_eq!(midi_note_to_freq(81), 880.0);
        assert!((midi_note_to_freq(60) - 261.625_58).abs() < 1e-3);
    }

    #[test]
    fn channel_filter_applies() {
        let map = MidiMap::default();
        let event = MidiEvent::NoteOn {
            channel: 3,
            key: 60,
            velocity: 127,
        };
        assert_eq!(midi_to_control(event, Some(0), &map), None);
        assert_eq!(
            midi_to_control(event, Some(3), &map),
            Some(ControlMessage::NoteOn {
                note: 60,
                velocity: 1.0
            })
        );
        assert!(midi_to_control(event, None, &map).is_some());
    }

    fn cc(controller: u8, value: u8) -> MidiEvent {
        MidiEvent::ControlChange {
            channel: 0,
            controller,
            value,
        }
    }

    #[test]
    fn sound_off_and_notes_off_stay_distinct() {
        let map = MidiMap::default();
        assert_eq!(
            midi_to_control(cc(cc::ALL_SOUND_OFF, 0), None, &map),
            Some(ControlMessage::AllSoundOff)
        );
        assert_eq!(
            midi_to_control(cc(cc::ALL_NOTES_OFF, 0), None, &map),
            Some(ControlMessage::AllNotesOff)
        );
        // other mode messages do nothing
        assert_eq!(midi_to_control(cc(121, 0), None, &map), None);
    }

    #[test]
    fn mapped_controllers_scale_onto_parameters() {
        let map = MidiMap::default();
        assert_eq!(
            midi_to_control(cc(7, 127), None, &map),
            Some(ControlMessage::SetParameter {
                name: "masterAmplitude",
                value: 1.0
            })
        );
        assert_eq!(
            midi_to_control(cc(7, 0), None, &map),
            Some(ControlMessage::SetParameter {
                name: "masterAmplitude",
                value: 0.0
            })
        );
        assert_eq!(midi_to_control(cc(2, 64), None, &map), None);
        assert_eq!(midi_to_control(cc(7, 64), None, &MidiMap::empty()), None);
    }

    #[test]
    fn pressure_and_bend_follow_the_map() {
        let map = MidiMap::default();
        let pressure = MidiEvent::ChannelPressure {
            channel: 0,
            value: 127,
        };
        assert_eq!(
            midi_to_control(pressure, None, &map),
            Some(ControlMessage::SetParameter {
                name: "lfoDepth",
                value: 1.0
            })
        );

        let bend = |value| MidiEvent::PitchBend { channel: 0, value };
        let bent = |value| match midi_to_control(bend(value), None, &map) {
            Some(ControlMessage::SetParameter {
                name: "pitchBend",
                value,
            }) => value,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(bent(0), 0.0);
        assert_eq!(bent(-8192), -1.0);
        assert!((bent(8191) - 1.0).abs() < 1e-3);

        let mut unmapped = MidiMap::default();
        unmapped.map_pitch_bend(None);
        assert_eq!(midi_to_control(bend(4096), None, &unmapped), None);
    }

    #[test]
    fn program_changes_are_ignored() {
        let event = MidiEvent::ProgramChange {
            channel: 0,
            program: 4,
        };
        assert_eq!(midi_to_control(event, None, &MidiMap::default()), None);
    }
}
