use crate::dsp::{gain, mix};
use crate::engine::{EngineType, SynthEngine};
use crate::snapshot::LayerSnapshot;
use crate::MAX_BLOCK_SIZE;

/// One engine plus its mix state. The manager owns one per engine type and
/// never drops them, only enables and disables.
pub struct SynthesisLayer {
    engine: Box<dyn SynthEngine>,
    enabled: bool,
    amplitude: f32,
    pan: f32,
    muted: bool,
    solo: bool,
    buffer: Vec<f32>,
}

impl SynthesisLayer {
    pub fn new(engine: Box<dyn SynthEngine>) -> Self {
        Self {
            engine,
            enabled: false,
            amplitude: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
            buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine.engine_type()
    }

    pub fn engine(&self) -> &dyn SynthEngine {
        &*self.engine
    }

    pub fn engine_mut(&mut self) -> &mut dyn SynthEngine {
        &mut *self.engine
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling a layer silences its voices, so nothing stale resumes when
    /// it is enabled again.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.engine.reset_voices();
        }
        self.enabled = enabled;
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        if amplitude.is_finite() {
            self.amplitude = amplitude.clamp(0.0, 1.0);
        }
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        if pan.is_finite() {
            self.pan = pan.clamp(-1.0, 1.0);
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    /// Whether the layer renders, given whether any enabled layer is soloed.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        self.enabled && !self.muted && (self.solo || !any_solo)
    }

    /// Gain the layer's output is scaled by before summing.
    pub fn mix_gain(&self) -> f32 {
        self.amplitude * gain::pan_gain(self.pan)
    }

    /// Render `bus.len()` samples (at most [`MAX_BLOCK_SIZE`]) and add them
    /// into `bus` at the layer's gain.
    pub fn render_into(&mut self, bus: &mut [f32]) {
        let gain = self.mix_gain();
        let n = bus.len().min(self.buffer.len());
        let buffer = &mut self.buffer[..n];
        self.engine.process_into(buffer);
        mix::sum_scaled_in_place(&mut bus[..n], buffer, gain);
    }

    /// Render `frames` samples and throw them away. Muted and soloed-out
    /// layers still advance so their voices age, release and get pruned.
    pub fn advance(&mut self, frames: usize) {
        let n = frames.min(self.buffer.len());
        self.engine.process_into(&mut self.buffer[..n]);
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            enabled: self.enabled,
            amplitude: self.amplitude,
            pan: self.pan,
            muted: self.muted,
            solo: self.solo,
            engine: self.engine.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine;

    fn layer() -> SynthesisLayer {
        SynthesisLayer::new(engine::build(EngineType::Wavetable, &EngineConfig::default()))
    }

    #[test]
    fn solo_mutes_the_others() {
        let mut a = layer();
        a.set_enabled(true);
        assert!(a.is_audible(false));
        assert!(!a.is_audible(true));
        a.set_solo(true);
        assert!(a.is_audible(true));
        a.set_muted(true);
        assert!(!a.is_audible(true));
    }

    #[test]
    fn pan_law_attenuates() {
        let mut a = layer();
        a.set_amplitude(0.5);
        a.set_pan(-0.5);
        assert!((a.mix_gain() - 0.25).abs() < 1e-6);
        a.set_pan(7.0);
        assert_eq!(a.mix_gain(), 0.0);
    }

    #[test]
    fn advancing_moves_the_engine_clock() {
        let mut a = layer();
        a.set_enabled(true);
        a.advance(441);
        assert!((a.engine().time() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn disabling_clears_voices() {
        let mut a = layer();
        a.set_enabled(true);
        a.engine_mut().note_on(60, 1.0);
        assert_eq!(a.engine().voice_count(), 1);
        a.set_enabled(false);
        assert_eq!(a.engine().voice_count(), 0);
    }
}
