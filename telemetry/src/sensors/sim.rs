//! Simulated sensor suite
//!
//! Runs each sensor on its own thread at its configured rate and feeds a
//! [`ChannelSensorHub`](super::ChannelSensorHub). Values follow a simple
//! single-stage flight: pad hold, powered ascent, ballistic coast, then a
//! steady descent under parachute.
//!
//! ```text
//!  altitude
//!     │            ╭──╮ apogee
//!     │          ╭─╯  ╰──╮
//!     │        ╭─╯       ╰───╮  descent (8 m/s)
//!     │      ╭─╯ coast       ╰────╮
//!     │   ╭──╯                    ╰────╮
//!     │───╯ burn                       ╰──── landed
//!     └─────────────────────────────────────────► t
//!      hold
//! ```

use super::{BatterySource, MissionClock, Reading, SensorEvent, SensorFeed, adc_to_millivolts};
use crate::config::SensorsConfig;
use crate::error::{Error, Result};
use pygmy_packets::scale;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const GRAVITY: f32 = 9.80665;

/// Launch site used for the GNSS track
const PAD_LATITUDE: f64 = 47.986_8;
const PAD_LONGITUDE: f64 = -81.848_7;

/// Earth field at the pad in uT (body frame, vehicle vertical)
const EARTH_FIELD_UT: [f32; 3] = [18.0, -2.0, -48.0];

/// Gaussian jitter and fault injection for one simulated sensor
pub struct SensorNoise {
    rng: SmallRng,
    fault_rate: f32,
}

impl SensorNoise {
    /// Seed 0 draws from entropy; anything else is reproducible
    pub fn new(seed: u64, fault_rate: f32) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng, fault_rate }
    }

    /// `value` plus zero-mean noise with standard deviation `stddev`
    pub fn jitter(&mut self, value: f32, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return value;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        value + n * stddev
    }

    pub fn jitter3(&mut self, value: [f32; 3], stddev: f32) -> [f32; 3] {
        value.map(|v| self.jitter(v, stddev))
    }

    /// Whether this sample should fail
    pub fn fault(&mut self) -> bool {
        self.fault_rate > 0.0 && Uniform::new(0.0f32, 1.0).sample(&mut self.rng) < self.fault_rate
    }
}

/// Kinematic state at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightState {
    pub altitude_m: f32,
    pub vertical_speed_m_s: f32,
    /// Specific force along the vehicle axis (what an accelerometer reads)
    pub axial_accel_m_s2: f32,
    /// Roll rate about the vehicle axis
    pub roll_rate_rad_s: f32,
}

/// Single-stage flight profile
#[derive(Debug, Clone, Copy)]
pub struct FlightProfile {
    pub pad_hold_s: f32,
    pub burn_s: f32,
    pub thrust_accel_m_s2: f32,
    pub descent_rate_m_s: f32,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            pad_hold_s: 5.0,
            burn_s: 3.0,
            thrust_accel_m_s2: 60.0,
            descent_rate_m_s: 8.0,
        }
    }
}

impl FlightProfile {
    pub fn state_at(&self, t_s: f32) -> FlightState {
        let on_pad = FlightState {
            altitude_m: 0.0,
            vertical_speed_m_s: 0.0,
            axial_accel_m_s2: GRAVITY,
            roll_rate_rad_s: 0.0,
        };
        if t_s < self.pad_hold_s {
            return on_pad;
        }

        let a = self.thrust_accel_m_s2;
        let tb = t_s - self.pad_hold_s;
        if tb < self.burn_s {
            return FlightState {
                altitude_m: 0.5 * a * tb * tb,
                vertical_speed_m_s: a * tb,
                axial_accel_m_s2: a + GRAVITY,
                roll_rate_rad_s: 2.0 * tb / self.burn_s,
            };
        }

        let v0 = a * self.burn_s;
        let h0 = 0.5 * a * self.burn_s * self.burn_s;
        let tc = tb - self.burn_s;
        let to_apogee = v0 / GRAVITY;
        if tc < to_apogee {
            return FlightState {
                altitude_m: h0 + v0 * tc - 0.5 * GRAVITY * tc * tc,
                vertical_speed_m_s: v0 - GRAVITY * tc,
                axial_accel_m_s2: 0.0,
                roll_rate_rad_s: 2.0 * (-tc / 4.0).exp(),
            };
        }

        let apogee = h0 + v0 * v0 / (2.0 * GRAVITY);
        let altitude = apogee - self.descent_rate_m_s * (tc - to_apogee);
        if altitude <= 0.0 {
            return on_pad;
        }
        FlightState {
            altitude_m: altitude,
            vertical_speed_m_s: -self.descent_rate_m_s,
            axial_accel_m_s2: GRAVITY,
            roll_rate_rad_s: 0.0,
        }
    }
}

/// International standard atmosphere temperature at `altitude_m`
fn air_temperature_c(altitude_m: f32) -> f32 {
    15.0 - 0.0065 * altitude_m
}

fn seconds(clock_us: u64) -> f32 {
    clock_us as f32 / 1e6
}

fn failure(sensor: &'static str) -> Error {
    Error::SensorRead {
        sensor,
        reason: "simulated bus error".to_string(),
    }
}

/// Start one thread per enabled sensor.
///
/// Threads exit when `running` clears or the hub is dropped.
pub fn spawn_simulated(
    config: &SensorsConfig,
    clock: MissionClock,
    feed: &SensorFeed,
    running: Arc<AtomicBool>,
) -> Result<Vec<JoinHandle<()>>> {
    let profile = FlightProfile::default();
    let seed_for = |index: u64| {
        if config.seed == 0 {
            0
        } else {
            config.seed.wrapping_add(index)
        }
    };
    let fault_rate = config.fault_rate;
    let mut handles = Vec::new();

    let mut noise = SensorNoise::new(seed_for(1), fault_rate);
    handles.push(spawn_sensor(
        feed.for_sensor("baro"),
        config.baro_hz,
        Arc::clone(&running),
        move |now_us| {
            if noise.fault() {
                return Err(failure("baro"));
            }
            let state = profile.state_at(seconds(now_us));
            let pressure_pa = scale::pressure_at_pa(state.altitude_m);
            Ok(Reading::Baro {
                timestamp_us: now_us,
                pressure_hpa: noise.jitter(pressure_pa / 100.0, 0.02),
                temperature_c: noise.jitter(air_temperature_c(state.altitude_m), 0.05),
            })
        },
        clock,
    )?);

    let mut noise = SensorNoise::new(seed_for(2), fault_rate);
    handles.push(spawn_sensor(
        feed.for_sensor("accel"),
        config.accel_hz,
        Arc::clone(&running),
        move |now_us| {
            if noise.fault() {
                return Err(failure("accel"));
            }
            let state = profile.state_at(seconds(now_us));
            Ok(Reading::Accel {
                timestamp_us: now_us,
                m_s2: noise.jitter3([0.0, 0.0, state.axial_accel_m_s2], 0.05),
            })
        },
        clock,
    )?);

    let mut noise = SensorNoise::new(seed_for(3), fault_rate);
    handles.push(spawn_sensor(
        feed.for_sensor("gyro"),
        config.gyro_hz,
        Arc::clone(&running),
        move |now_us| {
            if noise.fault() {
                return Err(failure("gyro"));
            }
            let state = profile.state_at(seconds(now_us));
            Ok(Reading::Gyro {
                timestamp_us: now_us,
                rad_s: noise.jitter3([0.0, 0.0, state.roll_rate_rad_s], 0.005),
            })
        },
        clock,
    )?);

    let mut noise = SensorNoise::new(seed_for(4), fault_rate);
    handles.push(spawn_sensor(
        feed.for_sensor("mag"),
        config.mag_hz,
        Arc::clone(&running),
        move |now_us| {
            if noise.fault() {
                return Err(failure("mag"));
            }
            Ok(Reading::Mag {
                timestamp_us: now_us,
                micro_tesla: noise.jitter3(EARTH_FIELD_UT, 0.3),
            })
        },
        clock,
    )?);

    if config.gnss_hz > 0.0 {
        let mut noise = SensorNoise::new(seed_for(5), fault_rate);
        handles.push(spawn_sensor(
            feed.for_sensor("gnss"),
            config.gnss_hz,
            Arc::clone(&running),
            move |now_us| {
                if noise.fault() {
                    return Err(failure("gnss"));
                }
                let state = profile.state_at(seconds(now_us));
                // Weathercock drift to the east with altitude
                let drift_deg = state.altitude_m as f64 * 2e-6;
                Ok(Reading::Gnss {
                    timestamp_us: now_us,
                    latitude_deg: PAD_LATITUDE + noise.jitter(0.0, 2e-6) as f64,
                    longitude_deg: PAD_LONGITUDE + drift_deg + noise.jitter(0.0, 2e-6) as f64,
                })
            },
            clock,
        )?);
    }

    log::info!(
        "Simulated sensors: baro {} Hz, accel {} Hz, gyro {} Hz, mag {} Hz, gnss {} Hz",
        config.baro_hz,
        config.accel_hz,
        config.gyro_hz,
        config.mag_hz,
        config.gnss_hz
    );
    Ok(handles)
}

fn spawn_sensor<F>(
    feed: SensorFeed,
    rate_hz: f32,
    running: Arc<AtomicBool>,
    mut sample: F,
    clock: MissionClock,
) -> Result<JoinHandle<()>>
where
    F: FnMut(u64) -> SensorEvent + Send + 'static,
{
    let name = feed.name();
    let period = Duration::try_from_secs_f32(1.0 / rate_hz)
        .map_err(|e| Error::InvalidConfig(format!("{name} rate {rate_hz} Hz: {e}")))?;
    thread::Builder::new()
        .name(format!("sim-{name}"))
        .spawn(move || {
            let mut next = Instant::now();
            while running.load(Ordering::Relaxed) {
                next += period;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    // Fell behind; don't burst to catch up
                    next = now;
                }
                if !feed.push(sample(clock.now_us())) {
                    break;
                }
            }
            log::debug!("{} simulator exiting", feed.name());
        })
        .map_err(|e| Error::Other(format!("Failed to spawn {name} simulator: {e}")))
}

/// Battery read through a simulated 4.3 V full-scale ADC
pub struct SimBattery {
    clock: MissionClock,
    noise: SensorNoise,
    full_mv: f32,
    drain_mv_per_s: f32,
}

impl SimBattery {
    pub fn new(clock: MissionClock, seed: u64, fault_rate: f32) -> Self {
        Self {
            clock,
            noise: SensorNoise::new(seed, fault_rate),
            full_mv: 4100.0,
            drain_mv_per_s: 0.5,
        }
    }

    fn raw_sample(&mut self, now_us: u64) -> u32 {
        let mv = self.full_mv - self.drain_mv_per_s * seconds(now_us);
        let mv = self.noise.jitter(mv, 5.0).clamp(0.0, 4300.0);
        let counts = (mv * 32768.0 / 4300.0) as u32;
        counts.min(0x7FFF) << 16
    }
}

impl BatterySource for SimBattery {
    fn read(&mut self) -> Result<Reading> {
        if self.noise.fault() {
            return Err(failure("battery"));
        }
        let now_us = self.clock.now_us();
        let raw = self.raw_sample(now_us);
        Ok(Reading::Battery {
            timestamp_us: now_us,
            millivolts: adc_to_millivolts(raw),
        })
    }
}
