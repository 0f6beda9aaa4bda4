//! Per-note state shared by every synthesis algorithm.
//!
//! A [`Voice`] carries the note bookkeeping every engine needs (pitch,
//! velocity, start time, release time) plus algorithm-specific state `S`.
//! Each engine owns its own [`VoiceBank`], so a voice can only ever be
//! processed by the algorithm that built it.

use std::collections::HashMap;

use crate::dsp::{Adsr, EnvelopeStage};
use crate::io::converter::midi_note_to_freq;

/// One sounding note.
#[derive(Debug, Clone)]
pub struct Voice<S> {
    note: u8,
    frequency: f32,
    velocity: f32,
    start_time: f64,
    released_at: Option<f64>,
    active: bool,
    /// Free-running phase in cycles for algorithms with a single oscillator.
    pub phase: f64,
    /// Per-voice gain, 1.0 unless an algorithm scales it.
    pub amplitude: f32,
    /// Output level (envelope × velocity × amplitude) at the end of the
    /// last rendered block.
    pub level: f32,
    stage: EnvelopeStage,
    overrides: HashMap<&'static str, f64>,
    pub state: S,
}

impl<S> Voice<S> {
    pub fn new(note: u8, velocity: f32, start_time: f64, state: S) -> Self {
        let note = note.min(127);
        Self {
            note,
            frequency: midi_note_to_freq(note),
            velocity: velocity.clamp(0.0, 1.0),
            start_time,
            released_at: None,
            active: true,
            phase: 0.0,
            amplitude: 1.0,
            level: 0.0,
            stage: EnvelopeStage::Attack,
            overrides: HashMap::new(),
            state,
        }
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    /// Fixed for the voice's lifetime.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn released_at(&self) -> Option<f64> {
        self.released_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and the key is still held.
    pub fn is_held(&self) -> bool {
        self.active && self.released_at.is_none()
    }

    /// Lift the gate; the voice keeps sounding through its release.
    pub fn release(&mut self, now: f64) {
        if self.released_at.is_none() {
            self.released_at = Some(now);
        }
    }

    /// Silence immediately. Inactive voices are dropped on the next prune.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.level = 0.0;
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.start_time
    }

    /// Seconds since note-on and (if released) since note-off at `now`.
    #[inline]
    pub fn envelope_times(&self, now: f64) -> (f32, Option<f32>) {
        let since_on = (now - self.start_time) as f32;
        let since_off = self.released_at.map(|off| (now - off) as f32);
        (since_on, since_off)
    }

    #[inline]
    pub fn envelope_level(&self, adsr: &Adsr, now: f64) -> f32 {
        let (since_on, since_off) = self.envelope_times(now);
        adsr.level(since_on, since_off)
    }

    /// Envelope stage as of the last [`update_level`](Self::update_level).
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Record the stage and output level at `now`. Called once per block,
    /// after the voice has rendered.
    pub fn update_level(&mut self, adsr: &Adsr, now: f64) {
        let (since_on, since_off) = self.envelope_times(now);
        self.stage = adsr.stage(since_on, since_off);
        self.level = adsr.level(since_on, since_off) * self.velocity * self.amplitude;
    }

    pub fn set_override(&mut self, name: &'static str, value: f64) {
        self.overrides.insert(name, value);
    }

    pub fn override_value(&self, name: &str) -> Option<f64> {
        self.overrides.get(name).copied()
    }
}

/// The active voice set of one engine, bounded by its polyphony limit.
#[derive(Debug)]
pub struct VoiceBank<S> {
    voices: Vec<Voice<S>>,
    max_voices: usize,
}

impl<S> VoiceBank<S> {
    pub fn new(max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
        }
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Change the limit, stealing the oldest voices if already above it.
    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.max_voices = max_voices.max(1);
        while self.voices.len() > self.max_voices {
            self.steal_oldest();
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Add a voice. At the limit the voice with the smallest start time is
    /// deactivated, removed and returned; ties go to the earliest inserted.
    pub fn push(&mut self, voice: Voice<S>) -> Option<Voice<S>> {
        let stolen = if self.voices.len() >= self.max_voices {
            self.steal_oldest()
        } else {
            None
        };
        self.voices.push(voice);
        stolen
    }

    fn steal_oldest(&mut self) -> Option<Voice<S>> {
        let index = self
            .voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.start_time.total_cmp(&b.start_time))
            .map(|(index, _)| index)?;

        let mut voice = self.voices.remove(index);
        voice.deactivate();
        Some(voice)
    }

    /// Release the first held voice playing `note`. Unknown notes are a no-op.
    pub fn release_note(&mut self, note: u8, now: f64) -> Option<&mut Voice<S>> {
        let voice = self.voices.iter_mut().find(|v| v.note == note && v.is_held())?;
        voice.release(now);
        Some(voice)
    }

    /// The most recently added voice.
    pub fn newest_mut(&mut self) -> Option<&mut Voice<S>> {
        self.voices.last_mut()
    }

    pub fn release_all(&mut self, now: f64) {
        for voice in &mut self.voices {
            voice.release(now);
        }
    }

    pub fn drop_inactive(&mut self) {
        self.voices.retain(Voice::is_active);
    }

    /// Remove every voice that is inactive, older than `max_lifetime`
    /// seconds, or past its attack and quieter than `silence_floor`.
    ///
    /// Held voices count too: a note played at velocity 0, or one that has
    /// decayed onto a zero sustain, gives its slot back.
    pub fn prune(&mut self, now: f64, max_lifetime: f64, silence_floor: f32) {
        self.voices.retain(|voice| {
            let silent = voice.stage != EnvelopeStage::Attack && voice.level < silence_floor;
            voice.active && voice.age(now) <= max_lifetime && !silent
        });
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Voice<S>> {
        self.voices.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Voice<S>> {
        self.voices.iter_mut()
    }
}

impl<'a, S> IntoIterator for &'a VoiceBank<S> {
    type Item = &'a Voice<S>;
    type IntoIter = std::slice::Iter<'a, Voice<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.voices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(note: u8, start: f64) -> Voice<()> {
        Voice::new(note, 1.0, start, ())
    }

    #[test]
    fn frequency_follows_equal_temperament() {
        assert_eq!(voice(69, 0.0).frequency(), 440.0);
        assert_eq!(voice(57, 0.0).frequency(), 220.0);
        assert_eq!(voice(81, 0.0).frequency(), 880.0);
    }

    #[test]
    fn never_exceeds_limit_and_steals_oldest() {
        let mut bank = VoiceBank::new(3);
        for (i, note) in [60, 62, 64].into_iter().enumerate() {
            assert!(bank.push(voice(note, i as f64)).is_none());
        }

        let stolen = bank.push(voice(65, 10.0)).unwrap();
        assert_eq!(stolen.note(), 60);
        assert!(!stolen.is_active());
        assert_eq!(bank.len(), 3);

        // later voice with an earlier start time is stolen first
        bank.push(voice(40, -1.0));
        let stolen = bank.push(voice(41, 11.0)).unwrap();
        assert_eq!(stolen.note(), 40);
    }

    #[test]
    fn equal_start_times_steal_in_insertion_order() {
        let mut bank = VoiceBank::new(2);
        bank.push(voice(60, 0.0));
        bank.push(voice(61, 0.0));
        assert_eq!(bank.push(voice(62, 0.0)).unwrap().note(), 60);
        assert_eq!(bank.push(voice(63, 0.0)).unwrap().note(), 61);
    }

    #[test]
    fn release_targets_first_held_voice_only() {
        let mut bank = VoiceBank::new(4);
        bank.push(voice(60, 0.0));
        bank.push(voice(60, 1.0));

        bank.release_note(60, 2.0);
        let released: Vec<_> = bank.iter().map(|v| v.released_at()).collect();
        assert_eq!(released, vec![Some(2.0), None]);

        bank.release_note(60, 3.0);
        assert_eq!(bank.iter().nth(1).unwrap().released_at(), Some(3.0));

        assert!(bank.release_note(99, 4.0).is_none());
    }

    #[test]
    fn prune_drops_dead_old_and_silent_voices() {
        let mut bank = VoiceBank::new(8);
        bank.push(voice(60, 0.0));
        bank.push(voice(61, 0.0));
        bank.push(voice(62, 5.0));
        bank.push(voice(63, 5.0));

        bank.iter_mut().for_each(|v| v.level = 0.5);
        bank.iter_mut().nth(1).unwrap().deactivate();
        let quiet = bank.iter_mut().nth(3).unwrap();
        quiet.release(6.0);
        quiet.stage = EnvelopeStage::Release;
        quiet.level = 0.0001;

        bank.prune(11.0, 10.0, 0.001);
        let notes: Vec<_> = bank.iter().map(Voice::note).collect();
        assert_eq!(notes, vec![62]);
    }

    #[test]
    fn silent_held_voices_are_pruned_after_attack() {
        let adsr = Adsr::new(0.01, 0.01, 0.0, 0.1);
        let mut bank = VoiceBank::new(4);
        bank.push(Voice::new(60, 0.0, 0.0, ()));
        bank.push(Voice::new(62, 1.0, 0.0, ()));

        // mid-attack: the velocity 0 note is silent but still starting
        bank.iter_mut().for_each(|v| v.update_level(&adsr, 0.005));
        bank.prune(0.005, 10.0, 0.001);
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.iter().next().unwrap().stage(), EnvelopeStage::Attack);

        // past the decay onto a zero sustain, both are silent while held
        bank.iter_mut().for_each(|v| v.update_level(&adsr, 0.5));
        assert!(bank.iter().all(Voice::is_held));
        bank.prune(0.5, 10.0, 0.001);
        assert!(bank.is_empty());
    }

    #[test]
    fn level_includes_velocity() {
        let adsr = Adsr::new(0.0, 0.0, 1.0, 0.1);
        let mut v = Voice::new(60, 0.5, 0.0, ());
        v.update_level(&adsr, 1.0);
        assert_eq!(v.stage(), EnvelopeStage::Sustain);
        assert!((v.level - 0.5).abs() < 1e-6);
    }
}
