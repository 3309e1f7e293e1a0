use std::f64::consts::PI;

use serde::Serialize;

/// Centre of the seasonal sinusoid.
pub const BASELINE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    /// Nov–Feb. Highest pollution.
    Winter,
    /// Mar–May.
    Summer,
    /// Jun–Sep. Rain washes particulates out.
    Monsoon,
    /// Oct.
    PostMonsoon,
}

impl Season {
    pub fn of_month(month: u32) -> Self {
        match month {
            11 | 12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            _ => Season::PostMonsoon,
        }
    }

    pub fn adjustment(self) -> f64 {
        match self {
            Season::Winter => 15.0,
            Season::Monsoon => -10.0,
            Season::Summer | Season::PostMonsoon => 5.0,
        }
    }
}

pub fn monthly_adjustment(month: u32) -> f64 {
    Season::of_month(month).adjustment()
}

/// `BASELINE + amplitude·sin(2π·day/period)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalShape {
    pub amplitude: f64,
    pub period_days: f64,
}

impl SeasonalShape {
    pub fn base_value(&self, day_of_year: u32) -> f64 {
        BASELINE + self.amplitude * (2.0 * PI * f64::from(day_of_year) / self.period_days).sin()
    }

    /// Additive: sinusoid plus the month's categorical offset.
    pub fn shaped(&self, day_of_year: u32, month: u32) -> f64 {
        self.base_value(day_of_year) + monthly_adjustment(month)
    }
}
