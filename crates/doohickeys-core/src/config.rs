//! Tuning constants for the propagation step.
//!
//! Every rate, threshold, and radius the step uses lives here, grouped by
//! subsystem. [`SimConfig::default`] reproduces the stock game balance. All
//! tables are `#[serde(default)]`, so a data file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};

use crate::part::AMBIENT_TEMPERATURE;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// Sub-tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    /// Degrees per second gained by a lit furnace.
    pub furnace_heating_rate: f64,
    pub furnace_max_temperature: f64,
    /// Degrees per second lost by an unlit furnace.
    pub furnace_cooling_rate: f64,
    /// Floor every part cools towards.
    pub ambient_temperature: f64,
    /// Fraction of the temperature gap crossing a rigid joint per second.
    pub conduction: f64,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            furnace_heating_rate: 50.0,
            furnace_max_temperature: 400.0,
            furnace_cooling_rate: 10.0,
            ambient_temperature: AMBIENT_TEMPERATURE,
            conduction: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    pub boiling_point: f64,
    /// Temperature span above boiling over which generation reaches
    /// `generation_rate`.
    pub generation_span: f64,
    pub generation_rate: f64,
    pub boiler_max_pressure: f64,
    /// Pressure per second a tank leaks.
    pub tank_leak_rate: f64,
    /// Fraction of the pressure gap crossing a pipe per second.
    pub flow_rate: f64,
    pub piston_threshold: f64,
    /// Stored energy per unit of pressure in a firing piston.
    pub piston_conversion: f64,
    /// Pressure per second a firing piston consumes.
    pub piston_consumption: f64,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            boiling_point: 100.0,
            generation_span: 300.0,
            generation_rate: 20.0,
            boiler_max_pressure: 150.0,
            tank_leak_rate: 0.5,
            flow_rate: 0.3,
            piston_threshold: 20.0,
            piston_conversion: 0.5,
            piston_consumption: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricalConfig {
    pub tesla_charge_rate: f64,
    pub tesla_max_charge: f64,
    /// Charge above which a coil throws an arc.
    pub tesla_discharge_threshold: f64,
    /// Manhattan radius, in cells, searched for an arc target.
    pub arc_radius: u32,
    /// Share of the coil's charge handed to the arc target.
    pub arc_transfer: f64,
    /// With no target in range, discharge into the ground instead of
    /// holding the charge.
    pub ground_arcs: bool,
    pub capacitor_leak_rate: f64,
    /// Fraction of the charge gap crossing a wire per second.
    pub flow_rate: f64,
    pub lamp_threshold: f64,
    pub coil_threshold: f64,
    /// Force numerator: `charge * coil_strength / distance^2`.
    pub coil_strength: f64,
    /// Squared world distance beyond which coils have no pull.
    pub coil_range_sq: f64,
    /// Squared world distance below which coils have no pull.
    pub coil_min_range_sq: f64,
}

impl Default for ElectricalConfig {
    fn default() -> Self {
        Self {
            tesla_charge_rate: 30.0,
            tesla_max_charge: 100.0,
            tesla_discharge_threshold: 80.0,
            arc_radius: 5,
            arc_transfer: 0.8,
            ground_arcs: true,
            capacitor_leak_rate: 1.0,
            flow_rate: 0.5,
            lamp_threshold: 30.0,
            coil_threshold: 20.0,
            coil_strength: 10.0,
            coil_range_sq: 10_000.0,
            coil_min_range_sq: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicalConfig {
    pub motor_speed: f64,
    /// Wound energy per second a running motor uses.
    pub motor_drain: f64,
    /// Speed per second an idle motor loses.
    pub motor_spin_down: f64,
    /// Maximum energy per second an armed spring releases.
    pub spring_release_rate: f64,
    /// Rotation speed per unit of released energy.
    pub spring_speed_factor: f64,
    pub flywheel_storage: f64,
    pub flywheel_release: f64,
    pub flywheel_drain: f64,
    /// Speed ratio from a small gear into a large one. The reverse link uses
    /// the reciprocal.
    pub small_to_large_ratio: f64,
    pub wheel_torque: f64,
    pub propeller_thrust: f64,
}

impl Default for MechanicalConfig {
    fn default() -> Self {
        Self {
            motor_speed: 100.0,
            motor_drain: 5.0,
            motor_spin_down: 20.0,
            spring_release_rate: 20.0,
            spring_speed_factor: 10.0,
            flywheel_storage: 0.01,
            flywheel_release: 0.5,
            flywheel_drain: 2.0,
            small_to_large_ratio: 0.5,
            wheel_torque: 0.1,
            propeller_thrust: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub bellows_strength: f64,
    pub bellows_range: f64,
    /// Only parts lighter than this are pushed by bellows.
    pub bellows_max_mass: f64,
    pub cannon_recoil: f64,
    pub cannon_muzzle_offset: f64,
    pub cannon_muzzle_velocity: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            bellows_strength: 500.0,
            bellows_range: 200.0,
            bellows_max_mass: 0.5,
            cannon_recoil: 1000.0,
            cannon_muzzle_offset: 40.0,
            cannon_muzzle_velocity: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionConfig {
    pub pressure_threshold: f64,
    /// Temperature at which flammable parts go off.
    pub ignition_temperature: f64,
    pub overcharge_threshold: f64,
    pub radius: f64,
    pub force: f64,
    /// Blast radius of flammable ordnance.
    pub ordnance_radius: f64,
    pub ordnance_force: f64,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            pressure_threshold: 120.0,
            ignition_temperature: 200.0,
            overcharge_threshold: 120.0,
            radius: 150.0,
            force: 1000.0,
            ordnance_radius: 300.0,
            ordnance_force: 2000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    /// Durability lost at the centre of a blast.
    pub blast_damage: f64,
    /// Falloff above which fragile parts are destroyed outright.
    pub fragile_falloff: f64,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            blast_damage: 30.0,
            fragile_falloff: 0.5,
        }
    }
}

/// Bounds applied to part state once per tick, after the resource stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_pressure: f64,
    pub max_charge: f64,
    pub max_temperature: f64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_pressure: 200.0,
            max_charge: 200.0,
            max_temperature: 1000.0,
        }
    }
}

/// Values sources are armed with when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    pub motor_energy: f64,
    pub spring_energy: f64,
    /// Countdown, in seconds, of every timer switch.
    pub timer_seconds: f64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            motor_energy: 100.0,
            spring_energy: 50.0,
            timer_seconds: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World units per grid cell.
    pub cell_size: f64,
    /// Upper bound on a scaled tick delta. `None` leaves it unbounded.
    /// The explicit diffusion steps overshoot past roughly a tenth of a
    /// second per tick.
    pub max_dt: Option<f64>,
    /// Sweeps the rotation relaxation may run per tick.
    pub relaxation_iteration_cap: u32,
    /// Relative error below which a gear pair counts as settled.
    pub relaxation_epsilon: f64,
    /// Per-kind capacity of the event bus ring buffers.
    pub event_buffer_capacity: usize,
    pub heat: HeatConfig,
    pub steam: SteamConfig,
    pub electrical: ElectricalConfig,
    pub mechanical: MechanicalConfig,
    pub triggers: TriggerConfig,
    pub explosions: ExplosionConfig,
    pub damage: DamageConfig,
    pub limits: LimitConfig,
    pub startup: StartupConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            max_dt: Some(0.1),
            relaxation_iteration_cap: 256,
            relaxation_epsilon: 1e-9,
            event_buffer_capacity: 1024,
            heat: HeatConfig::default(),
            steam: SteamConfig::default(),
            electrical: ElectricalConfig::default(),
            mechanical: MechanicalConfig::default(),
            triggers: TriggerConfig::default(),
            explosions: ExplosionConfig::default(),
            damage: DamageConfig::default(),
            limits: LimitConfig::default(),
            startup: StartupConfig::default(),
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "a finite, non-negative number",
            value,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "a finite, positive number",
            value,
        })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "between 0 and 1",
            value,
        })
    }
}

fn at_least(field: &'static str, value: f64, floor: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= floor {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "at least the ambient temperature",
            value,
        })
    }
}

impl SimConfig {
    /// Reject values the step cannot run with: NaN, infinities, negative
    /// rates and radii, zero cell size, fractions outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("cell_size", self.cell_size)?;
        if let Some(max_dt) = self.max_dt {
            positive("max_dt", max_dt)?;
        }
        if self.relaxation_iteration_cap == 0 {
            return Err(ConfigError::OutOfRange {
                field: "relaxation_iteration_cap",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        non_negative("relaxation_epsilon", self.relaxation_epsilon)?;

        let h = &self.heat;
        non_negative("heat.furnace_heating_rate", h.furnace_heating_rate)?;
        non_negative("heat.furnace_cooling_rate", h.furnace_cooling_rate)?;
        non_negative("heat.ambient_temperature", h.ambient_temperature)?;
        at_least(
            "heat.furnace_max_temperature",
            h.furnace_max_temperature,
            h.ambient_temperature,
        )?;
        non_negative("heat.conduction", h.conduction)?;

        let s = &self.steam;
        non_negative("steam.boiling_point", s.boiling_point)?;
        positive("steam.generation_span", s.generation_span)?;
        non_negative("steam.generation_rate", s.generation_rate)?;
        non_negative("steam.boiler_max_pressure", s.boiler_max_pressure)?;
        non_negative("steam.tank_leak_rate", s.tank_leak_rate)?;
        non_negative("steam.flow_rate", s.flow_rate)?;
        non_negative("steam.piston_threshold", s.piston_threshold)?;
        non_negative("steam.piston_conversion", s.piston_conversion)?;
        non_negative("steam.piston_consumption", s.piston_consumption)?;

        let e = &self.electrical;
        non_negative("electrical.tesla_charge_rate", e.tesla_charge_rate)?;
        non_negative("electrical.tesla_max_charge", e.tesla_max_charge)?;
        non_negative("electrical.tesla_discharge_threshold", e.tesla_discharge_threshold)?;
        fraction("electrical.arc_transfer", e.arc_transfer)?;
        non_negative("electrical.capacitor_leak_rate", e.capacitor_leak_rate)?;
        non_negative("electrical.flow_rate", e.flow_rate)?;
        non_negative("electrical.lamp_threshold", e.lamp_threshold)?;
        non_negative("electrical.coil_threshold", e.coil_threshold)?;
        non_negative("electrical.coil_strength", e.coil_strength)?;
        non_negative("electrical.coil_range_sq", e.coil_range_sq)?;
        non_negative("electrical.coil_min_range_sq", e.coil_min_range_sq)?;

        let m = &self.mechanical;
        non_negative("mechanical.motor_speed", m.motor_speed)?;
        non_negative("mechanical.motor_drain", m.motor_drain)?;
        non_negative("mechanical.motor_spin_down", m.motor_spin_down)?;
        non_negative("mechanical.spring_release_rate", m.spring_release_rate)?;
        non_negative("mechanical.spring_speed_factor", m.spring_speed_factor)?;
        non_negative("mechanical.flywheel_storage", m.flywheel_storage)?;
        non_negative("mechanical.flywheel_release", m.flywheel_release)?;
        non_negative("mechanical.flywheel_drain", m.flywheel_drain)?;
        positive("mechanical.small_to_large_ratio", m.small_to_large_ratio)?;
        non_negative("mechanical.wheel_torque", m.wheel_torque)?;
        non_negative("mechanical.propeller_thrust", m.propeller_thrust)?;

        let t = &self.triggers;
        non_negative("triggers.bellows_strength", t.bellows_strength)?;
        positive("triggers.bellows_range", t.bellows_range)?;
        non_negative("triggers.bellows_max_mass", t.bellows_max_mass)?;
        non_negative("triggers.cannon_recoil", t.cannon_recoil)?;
        non_negative("triggers.cannon_muzzle_offset", t.cannon_muzzle_offset)?;
        non_negative("triggers.cannon_muzzle_velocity", t.cannon_muzzle_velocity)?;

        let x = &self.explosions;
        non_negative("explosions.pressure_threshold", x.pressure_threshold)?;
        non_negative("explosions.ignition_temperature", x.ignition_temperature)?;
        non_negative("explosions.overcharge_threshold", x.overcharge_threshold)?;
        positive("explosions.radius", x.radius)?;
        non_negative("explosions.force", x.force)?;
        positive("explosions.ordnance_radius", x.ordnance_radius)?;
        non_negative("explosions.ordnance_force", x.ordnance_force)?;

        non_negative("damage.blast_damage", self.damage.blast_damage)?;
        fraction("damage.fragile_falloff", self.damage.fragile_falloff)?;

        let l = &self.limits;
        non_negative("limits.max_pressure", l.max_pressure)?;
        non_negative("limits.max_charge", l.max_charge)?;
        at_least("limits.max_temperature", l.max_temperature, h.ambient_temperature)?;

        let st = &self.startup;
        non_negative("startup.motor_energy", st.motor_energy)?;
        non_negative("startup.spring_energy", st.spring_energy)?;
        non_negative("startup.timer_seconds", st.timer_seconds)?;

        Ok(())
    }

    /// Scale, sanitise, and bound a host delta. Negative and NaN deltas
    /// become zero.
    pub fn scaled_dt(&self, dt: f64, speed: f64) -> f64 {
        let scaled = dt * speed;
        if !scaled.is_finite() {
            return if scaled == f64::INFINITY {
                self.max_dt.unwrap_or(0.0)
            } else {
                0.0
            };
        }
        let scaled = scaled.max(0.0);
        match self.max_dt {
            Some(max) => scaled.min(max),
            None => scaled,
        }
    }
}
