//! Renewable ramp controller: reconciles classified hardware conditions
//! with manual slider overrides, animating the solar/wind percentages.
//!
//! The lock discipline: only an explicit user edit arms the manual lock,
//! and only a hardware condition change clears it. The controller's own
//! tick writes are marked with a self-update flag so they are never
//! mistaken for user intent.

use crate::domain::{clamp_pct, EnergySource};
use crate::hardware::{HardwareEvent, SolarCondition, WindCondition};

/// Full-scale ramp timings, from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RampTimings {
    pub solar_up_secs: f64,
    pub solar_down_secs: f64,
    pub wind_secs: f64,
    pub tolerance_pct: f64,
}

impl Default for RampTimings {
    fn default() -> Self {
        Self {
            solar_up_secs: 10.0,
            solar_down_secs: 10.0,
            wind_secs: 10.0,
            tolerance_pct: 0.5,
        }
    }
}

fn full_scale_rate(secs: f64) -> f64 {
    100.0 / secs.max(0.1)
}

/// Ramp state for one renewable source.
#[derive(Debug, Clone, Copy)]
pub struct RampChannel {
    pub current_pct: f64,
    pub target_pct: f64,
    pub manual_lock: bool,
    pub auto_ramping: bool,
    up_pct_per_sec: f64,
    down_pct_per_sec: f64,
    tolerance_pct: f64,
}

impl RampChannel {
    fn new(initial_pct: f64, up_secs: f64, down_secs: f64, tolerance_pct: f64) -> Self {
        let initial = clamp_pct(initial_pct);
        Self {
            current_pct: initial,
            target_pct: initial,
            manual_lock: false,
            auto_ramping: false,
            up_pct_per_sec: full_scale_rate(up_secs),
            down_pct_per_sec: full_scale_rate(down_secs),
            tolerance_pct,
        }
    }

    /// An active hardware condition: start seeking `target`, overriding
    /// any earlier manual lock.
    fn engage(&mut self, target_pct: f64) {
        self.manual_lock = false;
        self.target_pct = clamp_pct(target_pct);
        self.auto_ramping = true;
    }

    /// Condition fell back to idle: freeze in place, do not snap back.
    fn freeze(&mut self) {
        self.auto_ramping = false;
        self.target_pct = self.current_pct;
    }

    fn manual_edit(&mut self, value_pct: f64) {
        self.current_pct = clamp_pct(value_pct);
        self.target_pct = self.current_pct;
        self.manual_lock = true;
        self.auto_ramping = false;
    }

    /// Resync with the slider after a redistribution moved it underneath
    /// us. Keeps the lock and any active target; an idle channel's frozen
    /// target follows the new position.
    fn sync_current(&mut self, value_pct: f64) {
        self.current_pct = clamp_pct(value_pct);
        if !self.auto_ramping {
            self.target_pct = self.current_pct;
        }
    }

    /// One time step toward the target, clamped so it never overshoots.
    /// Returns true when `current_pct` moved.
    fn step(&mut self, dt_secs: f64) -> bool {
        if !self.auto_ramping || self.manual_lock {
            return false;
        }
        let delta = self.target_pct - self.current_pct;
        if delta.abs() <= self.tolerance_pct {
            self.auto_ramping = false;
            return false;
        }
        let rate = if delta > 0.0 {
            self.up_pct_per_sec
        } else {
            self.down_pct_per_sec
        };
        let step = rate * dt_secs;
        self.current_pct = if delta > 0.0 {
            (self.current_pct + step).min(self.target_pct)
        } else {
            (self.current_pct - step).max(self.target_pct)
        };
        true
    }
}

/// State machine for both renewable channels.
#[derive(Debug)]
pub struct RampController {
    solar: RampChannel,
    wind: RampChannel,
    solar_condition: SolarCondition,
    wind_condition: WindCondition,
    self_update: bool,
}

impl RampController {
    pub fn new(initial_solar_pct: f64, initial_wind_pct: f64, timings: RampTimings) -> Self {
        Self {
            solar: RampChannel::new(
                initial_solar_pct,
                timings.solar_up_secs,
                timings.solar_down_secs,
                timings.tolerance_pct,
            ),
            wind: RampChannel::new(
                initial_wind_pct,
                timings.wind_secs,
                timings.wind_secs,
                timings.tolerance_pct,
            ),
            solar_condition: SolarCondition::Ambient,
            wind_condition: WindCondition::Stopped,
            self_update: false,
        }
    }

    pub fn solar(&self) -> &RampChannel {
        &self.solar
    }

    pub fn wind(&self) -> &RampChannel {
        &self.wind
    }

    /// Feed one classified hardware observation into the state machine.
    pub fn apply_event(&mut self, event: HardwareEvent) {
        match event {
            HardwareEvent::Solar(condition) => {
                let previous = self.solar_condition;
                self.solar_condition = condition;
                if previous == condition {
                    return;
                }
                match condition {
                    SolarCondition::Bright => self.solar.engage(100.0),
                    SolarCondition::Blocked => self.solar.engage(0.0),
                    SolarCondition::Ambient => self.solar.freeze(),
                }
            }
            HardwareEvent::Wind(condition) => {
                self.wind_condition = condition;
                // The rotor reports its condition periodically; Spinning
                // re-arms the ramp even without a state change.
                match condition {
                    WindCondition::Spinning => self.wind.engage(100.0),
                    WindCondition::Stopped => self.wind.freeze(),
                }
            }
        }
    }

    /// Register a slider edit. Only user edits arm the manual lock; writes
    /// originating from `tick` are ignored via the self-update flag, and
    /// non-renewable sources have no ramp channel.
    pub fn note_slider_edit(&mut self, source: EnergySource, value_pct: f64) {
        if self.self_update {
            return;
        }
        match source {
            EnergySource::Solar => self.solar.manual_edit(value_pct),
            EnergySource::Wind => self.wind.manual_edit(value_pct),
            _ => {}
        }
    }

    /// Adopt the sliders' actual positions. Editing one source can shrink
    /// the others through redistribution; without this the channels would
    /// ramp from a stale value and snap the sliders on the next tick.
    pub fn sync_slider_values(&mut self, solar_pct: f64, wind_pct: f64) {
        self.solar.sync_current(solar_pct);
        self.wind.sync_current(wind_pct);
    }

    /// Advance both channels by `dt_secs`, returning the sources whose
    /// percentage changed together with their new values.
    pub fn tick(&mut self, dt_secs: f64) -> Vec<(EnergySource, f64)> {
        self.self_update = true;
        let mut changed = Vec::new();
        if self.solar.step(dt_secs) {
            changed.push((EnergySource::Solar, self.solar.current_pct));
        }
        if self.wind.step(dt_secs) {
            changed.push((EnergySource::Wind, self.wind.current_pct));
        }
        self.self_update = false;
        changed
    }
}
