//! Which parameter each MIDI controller drives.
//!
//! Control changes, channel pressure and pitch bend carry a bare number; the
//! map turns that into a named parameter and scales the 7-bit (or 14-bit)
//! value onto the parameter's declared range. Controllers 120-127 are channel
//! mode messages and can never be remapped.

use crate::io::midi::MidiEvent;
use crate::params::{self, ParamSpec};

/// First controller number reserved for channel mode messages.
pub const FIRST_MODE_CONTROLLER: u8 = 120;

#[derive(Debug, Clone)]
pub struct MidiMap {
    controllers: [Option<&'static str>; 128],
    pressure: Option<&'static str>,
    pitch_bend: Option<&'static str>,
    learning: Option<&'static str>,
}

impl MidiMap {
    /// A map with nothing assigned.
    pub fn empty() -> Self {
        Self {
            controllers: [None; 128],
            pressure: None,
            pitch_bend: None,
            learning: None,
        }
    }

    /// Drive `name` from controller `cc`. Returns false for mode controllers
    /// and names nothing declares.
    pub fn map_cc(&mut self, cc: u8, name: &str) -> bool {
        if cc >= FIRST_MODE_CONTROLLER {
            return false;
        }
        match params::intern(name) {
            Some(name) => {
                self.controllers[cc as usize] = Some(name);
                true
            }
            None => false,
        }
    }

    pub fn unmap_cc(&mut self, cc: u8) {
        if let Some(slot) = self.controllers.get_mut(cc as usize) {
            *slot = None;
        }
    }

    pub fn cc_target(&self, cc: u8) -> Option<&'static str> {
        self.controllers.get(cc as usize).copied().flatten()
    }

    /// Route channel pressure to `name`, or nowhere with `None`.
    pub fn map_pressure(&mut self, name: Option<&str>) -> bool {
        Self::assign(&mut self.pressure, name)
    }

    pub fn pressure_target(&self) -> Option<&'static str> {
        self.pressure
    }

    /// Route the pitch wheel to `name`, or nowhere with `None`.
    pub fn map_pitch_bend(&mut self, name: Option<&str>) -> bool {
        Self::assign(&mut self.pitch_bend, name)
    }

    pub fn pitch_bend_target(&self) -> Option<&'static str> {
        self.pitch_bend
    }

    fn assign(slot: &mut Option<&'static str>, name: Option<&str>) -> bool {
        match name {
            None => {
                *slot = None;
                true
            }
            Some(name) => match params::intern(name) {
                Some(name) => {
                    *slot = Some(name);
                    true
                }
                None => false,
            },
        }
    }

    /// Bind `name` to whichever controller moves next.
    pub fn learn(&mut self, name: &str) -> bool {
        self.learning = params::intern(name);
        self.learning.is_some()
    }

    pub fn is_learning(&self) -> bool {
        self.learning.is_some()
    }

    pub fn cancel_learn(&mut self) {
        self.learning = None;
    }

    /// Finish a pending [`learn`](Self::learn) with `event`. The parameter
    /// moves off any controller it was on before. Returns true when the event
    /// was used up.
    pub fn capture(&mut self, event: &MidiEvent) -> bool {
        let (Some(name), MidiEvent::ControlChange { controller, .. }) = (self.learning, *event)
        else {
            return false;
        };
        if controller >= FIRST_MODE_CONTROLLER {
            return false;
        }

        for slot in self.controllers.iter_mut() {
            if *slot == Some(name) {
                *slot = None;
            }
        }
        self.controllers[controller as usize] = Some(name);
        self.learning = None;
        true
    }

    /// Scale `normalized` (0.0-1.0) onto the declared range of `name`.
    pub fn scale(name: &str, normalized: f64) -> Option<f64> {
        let spec: &ParamSpec = params::lookup(name)?;
        let normalized = normalized.clamp(0.0, 1.0);
        Some(spec.min + normalized * (spec.max - spec.min))
    }
}

/// Mod wheel to FM brightness, volume and pan to the master stage, pressure
/// to the wavetable LFO and the pitch wheel to `pitchBend`.
impl Default for MidiMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.controllers[1] = Some("modulationDepth");
        map.controllers[7] = Some("masterAmplitude");
        map.controllers[10] = Some("masterPan");
        map.pressure = Some("lfoDepth");
        map.pitch_bend = Some("pitchBend");
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(controller: u8, value: u8) -> MidiEvent {
        MidiEvent::ControlChange {
            channel: 0,
            controller,
            value,
        }
    }

    #[test]
    fn defaults_name_declared_parameters() {
        let map = MidiMap::default();
        for name in [
            map.cc_target(1),
            map.cc_target(7),
            map.cc_target(10),
            map.pressure_target(),
            map.pitch_bend_target(),
        ] {
            let name = name.unwrap();
            assert_eq!(params::intern(name), Some(name));
        }
        assert_eq!(map.cc_target(7), Some("masterAmplitude"));
        assert_eq!(map.cc_target(2), None);
    }

    #[test]
    fn mode_controllers_and_unknown_names_are_refused() {
        let mut map = MidiMap::empty();
        assert!(!map.map_cc(120, "attack"));
        assert!(!map.map_cc(74, "cutoffThatDoesNotExist"));
        assert!(map.map_cc(74, "morph"));
        assert_eq!(map.cc_target(74), Some("morph"));
        map.unmap_cc(74);
        assert_eq!(map.cc_target(74), None);
    }

    #[test]
    fn learn_binds_the_next_controller_once() {
        let mut map = MidiMap::default();
        assert!(map.learn("masterAmplitude"));
        assert!(!map.capture(&MidiEvent::PitchBend { channel: 0, value: 0 }));
        assert!(!map.capture(&cc(123, 0)));
        assert!(map.is_learning());

        assert!(map.capture(&cc(21, 64)));
        assert!(!map.is_learning());
        assert_eq!(map.cc_target(21), Some("masterAmplitude"));
        // moved, not copied
        assert_eq!(map.cc_target(7), None);
        assert!(!map.capture(&cc(22, 64)));
    }

    #[test]
    fn values_scale_onto_declared_range() {
        assert_eq!(MidiMap::scale("masterPan", 0.0), Some(-1.0));
        assert_eq!(MidiMap::scale("masterPan", 0.5), Some(0.0));
        assert_eq!(MidiMap::scale("modulationDepth", 1.0), Some(10.0));
        assert_eq!(MidiMap::scale("modulationDepth", 7.0), Some(10.0));
        assert_eq!(MidiMap::scale("nothing", 0.5), None);
    }
}
