//! Soil-temperature modulation of process rates.

use tracing::warn;

/// Temperature response of a process, after Tjoelker et al. (2001).
///
/// With `c = 0, b = 1` the response is linear (thermal time); with
/// `c = 1, a = 0, b > 1` it is a Q10 exponential; with `c = 1, a < 0,
/// b > 0` it is bell-shaped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureResponse {
    /// Process value at the reference temperature.
    pub process_at_t_ref: f64,
    /// Reference temperature, °C.
    pub t_ref: f64,
    /// Linear coefficient.
    pub a: f64,
    /// Base coefficient (Q10 when `a = 0`).
    pub b: f64,
    /// Formalism switch, 0 or 1.
    pub c: f64,
}

impl Default for TemperatureResponse {
    fn default() -> Self {
        Self {
            process_at_t_ref: 1.0,
            t_ref: 0.0,
            a: -0.05,
            b: 3.0,
            c: 1.0,
        }
    }
}

impl TemperatureResponse {
    /// Process value at `soil_temperature` (°C), never negative.
    ///
    /// Unsupported `c` values and unstable parameter sets yield 0.
    pub fn modify(&self, soil_temperature: f64) -> f64 {
        let dt = soil_temperature - self.t_ref;
        let base = self.a * dt + self.b;
        if self.c != 0.0 && self.c != 1.0 {
            warn!(c = self.c, "temperature response only supports c = 0 or c = 1");
            return 0.0;
        }
        if self.c == 1.0 && base < 0.0 {
            warn!(soil_temperature, "temperature response unstable; process set to 0");
            return 0.0;
        }
        let modified =
            self.process_at_t_ref * base.powf(1.0 - self.c) * base.powf(self.c * dt / 10.0);
        modified.max(0.0)
    }
}
