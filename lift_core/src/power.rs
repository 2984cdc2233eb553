//! Battery state-of-charge safety policy.
//!
//! - Below `lockout_soc` the lock bit is raised. Every motion path checks it
//!   before its own work, and the actuator driver refuses to wake while it
//!   is set.
//! - The lock clears once SOC is back at or above `lockout_soc`; the alert
//!   threshold is then resynchronised to the multiple of `alert_step` below
//!   the current SOC, without an alert.
//! - While unlocked, alerts only fire on a drop: the first time SOC falls
//!   under `first_alert_soc`, then each time it falls strictly below the last
//!   alert threshold minus one step. No step alerts fire in the band between
//!   the lockout level and the next multiple of `alert_step`; the lockout
//!   alert covers it.
use crate::config::PowerCfg;
use crate::shared::Flag;
use crate::util::{ceil_to_step, floor_to_step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocVerdict {
    /// Nothing to report.
    Steady,
    /// Low-battery alert.
    Alert,
    /// Lock engaged just now.
    Lockout,
    /// Lock released just now.
    Unlocked,
}

#[derive(Debug, Clone)]
pub struct PowerSafetyMonitor {
    cfg: PowerCfg,
    locked: Flag,
    last_alert: Option<f32>,
    prev_soc: Option<f32>,
}

impl PowerSafetyMonitor {
    pub fn new(cfg: PowerCfg, locked: Flag) -> Self {
        Self {
            cfg,
            locked,
            last_alert: None,
            prev_soc: None,
        }
    }

    pub fn observe(&mut self, soc: f32) -> SocVerdict {
        let prev = self.prev_soc.replace(soc);
        let c = &self.cfg;

        if soc < c.lockout_soc {
            if self.locked.get() {
                return SocVerdict::Steady;
            }
            self.locked.set(true);
            tracing::warn!(soc, "battery critical: motion locked out");
            return SocVerdict::Lockout;
        }

        if self.locked.get() {
            self.locked.set(false);
            self.last_alert = Some(floor_to_step(soc, c.alert_step));
            tracing::info!(soc, threshold = ?self.last_alert, "battery lockout cleared");
            return SocVerdict::Unlocked;
        }

        let dropping = prev.is_some_and(|p| soc < p);
        if !dropping || soc >= c.first_alert_soc {
            return SocVerdict::Steady;
        }

        match self.last_alert {
            Some(last) if last <= c.first_alert_soc => {
                let quiet_below = ceil_to_step(c.lockout_soc, c.alert_step);
                if soc < last - c.alert_step && soc >= quiet_below {
                    self.last_alert = Some(floor_to_step(soc, c.alert_step));
                    tracing::warn!(soc, "battery low");
                    SocVerdict::Alert
                } else {
                    SocVerdict::Steady
                }
            }
            _ => {
                self.last_alert = Some(c.first_alert_soc);
                tracing::warn!(soc, "battery below first alert level");
                SocVerdict::Alert
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    pub fn last_alert(&self) -> Option<f32> {
        self.last_alert
    }

    /// Poll period for the next cycle: fast while locked.
    pub fn poll_ms(&self) -> u64 {
        if self.is_locked() {
            self.cfg.fast_poll_ms
        } else {
            self.cfg.slow_poll_ms
        }
    }

    pub fn cfg(&self) -> &PowerCfg {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> PowerSafetyMonitor {
        PowerSafetyMonitor::new(PowerCfg::default(), Flag::new())
    }

    #[test]
    fn reference_sequence() {
        let mut m = monitor();
        let verdicts: Vec<_> = [40.0, 35.0, 29.0, 25.0, 3.0, 2.0, 5.0]
            .into_iter()
            .map(|s| m.observe(s))
            .collect();
        use SocVerdict::*;
        assert_eq!(
            verdicts,
            vec![Steady, Steady, Alert, Steady, Steady, Lockout, Unlocked]
        );
        assert!(!m.is_locked());
        assert_eq!(m.last_alert(), Some(5.0));
    }

    #[test]
    fn step_alerts_resync_to_multiple_of_five() {
        let mut m = monitor();
        m.observe(31.0);
        assert_eq!(m.observe(28.0), SocVerdict::Alert);
        assert_eq!(m.observe(24.0), SocVerdict::Alert);
        assert_eq!(m.last_alert(), Some(20.0));
        assert_eq!(m.observe(16.0), SocVerdict::Steady);
        assert_eq!(m.observe(14.0), SocVerdict::Alert);
    }

    #[test]
    fn charging_never_alerts() {
        let mut m = monitor();
        m.observe(10.0);
        for s in [12.0, 20.0, 28.0, 29.0] {
            assert_eq!(m.observe(s), SocVerdict::Steady);
        }
    }

    #[test]
    fn locked_polls_fast() {
        let mut m = monitor();
        assert_eq!(m.poll_ms(), 60_000);
        assert_eq!(m.observe(1.0), SocVerdict::Lockout);
        assert_eq!(m.observe(1.0), SocVerdict::Steady);
        assert!(m.is_locked());
        assert_eq!(m.poll_ms(), 5_000);
    }
}
