//! Sound cues and audio backends
//!
//! The simulation only names cues; backends synthesize them. Playback is
//! best-effort: a failing backend never changes gameplay.

use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// Sound cue requested by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundCue {
    /// Blade cut; intensity is playback pitch
    Slice,
    /// Combo step or boss entrance; intensity scales pitch
    Combo,
    /// Entity launched
    Spawn,
    GameOver,
    /// Short click (lost life, menus)
    Ui,
    /// Register chime for milestones and time bonuses
    Checkout,
}

/// Audio collaborator
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue, intensity: f32) -> Result<(), ServiceError>;

    /// Master volume (0.0 - 1.0)
    fn set_volume(&mut self, _volume: f32) {}

    /// Resume a suspended context (browsers require a user gesture)
    fn resume(&mut self) {}
}

/// Silent backend for headless runs and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, cue: SoundCue, intensity: f32) -> Result<(), ServiceError> {
        log::trace!("audio: {cue:?} ({intensity:.2})");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, SoundCue};
    use crate::services::ServiceError;

    /// Procedural Web Audio backend - no sample files
    pub struct WebAudio {
        ctx: AudioContext,
        volume: f32,
    }

    impl WebAudio {
        pub fn new() -> Result<Self, ServiceError> {
            let ctx = AudioContext::new().map_err(|_| ServiceError::Unavailable)?;
            Ok(Self { ctx, volume: 0.3 })
        }

        /// Oscillator routed through a gain node to the speakers
        fn create_osc(
            &self,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Result<(OscillatorNode, GainNode), ServiceError> {
            let backend = |what: &str| ServiceError::Backend(what.to_string());
            let osc = self
                .ctx
                .create_oscillator()
                .map_err(|_| backend("create_oscillator"))?;
            let gain = self.ctx.create_gain().map_err(|_| backend("create_gain"))?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain)
                .map_err(|_| backend("connect oscillator"))?;
            gain.connect_with_audio_node(&self.ctx.destination())
                .map_err(|_| backend("connect gain"))?;
            Ok((osc, gain))
        }

        /// Frequency sweep with an exponential fade
        fn sweep(
            &self,
            osc_type: OscillatorType,
            from: f32,
            to: f32,
            level: f32,
            delay: f64,
            length: f64,
        ) -> Result<(), ServiceError> {
            let (osc, gain) = self.create_osc(from, osc_type)?;
            let t = self.ctx.current_time() + delay;

            gain.gain().set_value_at_time(level, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + length)
                .ok();
            osc.frequency().set_value_at_time(from, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(to.max(1.0), t + length)
                .ok();

            osc.start_with_when(t)
                .map_err(|_| ServiceError::Backend("start".to_string()))?;
            osc.stop_with_when(t + length).ok();
            Ok(())
        }
    }

    impl AudioSink for WebAudio {
        fn play(&mut self, cue: SoundCue, intensity: f32) -> Result<(), ServiceError> {
            let vol = self.volume;
            if vol <= 0.0 {
                return Ok(());
            }
            if self.ctx.state() == AudioContextState::Suspended {
                let _ = self.ctx.resume();
            }

            match cue {
                SoundCue::Slice => {
                    let pitch = intensity.max(0.1);
                    self.sweep(OscillatorType::Sawtooth, 1200.0 * pitch, 100.0 * pitch, vol * 0.7, 0.0, 0.15)?;
                    self.sweep(OscillatorType::Triangle, 600.0, 200.0, vol * 0.5, 0.05, 0.05)
                }
                SoundCue::Combo => {
                    let base = 400.0 + intensity * 50.0;
                    self.sweep(OscillatorType::Sine, base, base * 2.0, vol * 0.3, 0.0, 0.2)
                }
                SoundCue::Spawn => self.sweep(OscillatorType::Sine, 600.0, 300.0, vol * 0.2, 0.0, 0.05),
                SoundCue::GameOver => {
                    self.sweep(OscillatorType::Sine, 440.0, 220.0, vol * 0.3, 0.0, 0.5)?;
                    self.sweep(OscillatorType::Sine, 330.0, 165.0, vol * 0.2, 0.1, 0.5)
                }
                SoundCue::Ui => self.sweep(OscillatorType::Sine, 1000.0, 1000.0, vol * 0.15, 0.0, 0.03),
                SoundCue::Checkout => {
                    // Two-tone register chime
                    self.sweep(OscillatorType::Sine, 1320.0, 1320.0, vol * 0.4, 0.0, 0.12)?;
                    self.sweep(OscillatorType::Sine, 1760.0, 1760.0, vol * 0.4, 0.1, 0.25)
                }
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        fn resume(&mut self) {
            let _ = self.ctx.resume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_audio_accepts_every_cue() {
        let mut audio = NullAudio;
        for cue in [
            SoundCue::Slice,
            SoundCue::Combo,
            SoundCue::Spawn,
            SoundCue::GameOver,
            SoundCue::Ui,
            SoundCue::Checkout,
        ] {
            assert!(audio.play(cue, 1.0).is_ok());
        }
    }
}
