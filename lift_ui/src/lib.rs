#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Panel vocabulary: themes, page ids, VP/text addresses and the text
//! formatting the panel expects. No I/O happens here.

/// Panel colour theme, persisted as an integer (1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Primary,
    Alternate,
}

impl Theme {
    /// Decode the persisted value; anything unknown falls back to the default.
    pub fn from_stored(v: i32) -> Self {
        match v {
            2 => Theme::Alternate,
            _ => Theme::Primary,
        }
    }

    pub fn stored(self) -> i32 {
        match self {
            Theme::Primary => 1,
            Theme::Alternate => 2,
        }
    }

    #[inline]
    fn pick(self, primary: u16, alternate: u16) -> u16 {
        match self {
            Theme::Primary => primary,
            Theme::Alternate => alternate,
        }
    }
}

/// Page ids of the panel project.
pub mod pages {
    use super::Theme;

    /// Resting page; the host-connected variant shows the telemetry widgets.
    pub fn idle(theme: Theme, host_connected: bool) -> u16 {
        if host_connected {
            theme.pick(5, 1)
        } else {
            theme.pick(21, 18)
        }
    }

    pub fn moving(theme: Theme) -> u16 {
        theme.pick(16, 17)
    }

    pub fn calibrating(theme: Theme) -> u16 {
        theme.pick(15, 14)
    }

    pub fn preset_saved(theme: Theme) -> u16 {
        theme.pick(8, 4)
    }

    /// Confirmation page shown right after `theme` was selected.
    pub fn theme_applied(theme: Theme, host_connected: bool) -> u16 {
        match (theme, host_connected) {
            (Theme::Alternate, true) => 9,
            (Theme::Alternate, false) => 20,
            (Theme::Primary, true) => 10,
            (Theme::Primary, false) => 23,
        }
    }

    pub fn low_battery(theme: Theme) -> u16 {
        theme.pick(24, 25)
    }

    pub fn critical_battery(theme: Theme) -> u16 {
        theme.pick(26, 27)
    }
}

/// Text and VP addresses.
pub mod addr {
    pub const STEP_TEXT: u16 = 0x1000;
    pub const FINE_STEP_VP: u16 = 0x8100;
    pub const DEVICE_NAME: u16 = 0x1800;

    pub const SOC_TEXT: u16 = 0x2000;
    pub const CHARGE_WATTS: u16 = 0x4000;
    pub const DISCHARGE_WATTS: u16 = 0x6000;
    pub const BATTERY_ICON: u16 = 0x3100;
    pub const TEMP_MIN: u16 = 0x7000;
    pub const TEMP_MAX: u16 = 0x8000;
    pub const TEMP_AVG: u16 = 0x3000;

    /// Host metric cells in frame order: cpu load, cpu speed, ram used,
    /// ram percent, ram total, disk used, disk percent, disk total.
    pub const METRICS: [u16; 8] = [
        0x9000, 0x1100, 0x1400, 0x1200, 0x1500, 0x1600, 0x1300, 0x1700,
    ];
}

/// Width of the device-name field.
pub const DEVICE_NAME_LEN: usize = 20;

/// Placeholder shown when a battery poll was invalid.
pub const PLACEHOLDER: &str = "--     ";

/// Written to the idle power field (charge or discharge) of the pack panel.
pub const ZERO_FIELD: &str = "0           ";

/// Two-digit coarse step, e.g. `07`.
pub fn step_text(step: u8) -> String {
    format!("{step:02}")
}

/// Truncate or right-pad with spaces to exactly [`DEVICE_NAME_LEN`] chars,
/// so a shorter name fully overwrites a longer previous one.
pub fn padded_name(name: &str) -> String {
    let mut out: String = name.chars().take(DEVICE_NAME_LEN).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', DEVICE_NAME_LEN - len));
    out
}

/// One host metric, left aligned in a five character cell.
pub fn metric_cell(v: u8) -> String {
    format!("{v:<5}")
}

/// Rounded integer followed by blanks that clear stale digits.
pub fn rounded_text(v: f32) -> String {
    format!("{}     ", v.round() as i32)
}

/// Battery icon frame: 1..=5 by charge level, +5 while charging.
pub fn battery_icon(soc: f32, charging: bool) -> u16 {
    let level = (((soc - 1.0) / 20.0) + 1.0) as i32;
    let level = level.clamp(1, 5) as u16;
    if charging { level + 5 } else { level }
}

pub fn temp_text(t: i8) -> String {
    t.to_string()
}

pub fn temp_avg_text(t: f32) -> String {
    format!("{t:.1}")
}
