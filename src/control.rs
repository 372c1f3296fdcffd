//! Text commands for nudging the analyzer while it runs

use crate::audio::{ProcessingParams, ADJUST_STEP};

/// A parsed control command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Raise or lower the input gain by one step
    Gain(f64),

    /// Raise or lower the smoothing rate by one step
    Smoothing(f64),

    /// Stop capturing and exit
    Quit,
}

impl ControlCommand {
    /// Parse one input line: `g+`, `g-`, `s+`, `s-` or `q`
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "g+" | "v+" => Some(Self::Gain(ADJUST_STEP)),
            "g-" | "v-" => Some(Self::Gain(-ADJUST_STEP)),
            "s+" => Some(Self::Smoothing(ADJUST_STEP)),
            "s-" => Some(Self::Smoothing(-ADJUST_STEP)),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Apply a parameter change; returns false for `Quit`
    pub fn apply(self, params: &ProcessingParams) -> bool {
        match self {
            Self::Gain(delta) => {
                let gain = params.adjust_gain(delta);
                log::info!("Gain: {:.1}", gain);
                true
            }
            Self::Smoothing(delta) => {
                let rate = params.adjust_smoothing_rate(delta);
                log::info!("Smoothing rate: {:.1}", rate);
                true
            }
            Self::Quit => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_commands() {
        assert_eq!(ControlCommand::parse("g+"), Some(ControlCommand::Gain(0.5)));
        assert_eq!(ControlCommand::parse(" V- \n"), Some(ControlCommand::Gain(-0.5)));
        assert_eq!(ControlCommand::parse("s+"), Some(ControlCommand::Smoothing(0.5)));
        assert_eq!(ControlCommand::parse("Q"), Some(ControlCommand::Quit));
        assert_eq!(ControlCommand::parse("louder"), None);
        assert_eq!(ControlCommand::parse(""), None);
    }

    #[test]
    fn apply_nudges_params_with_clamping() {
        let params = ProcessingParams::new(0.5, 1.5).unwrap();

        assert!(ControlCommand::Gain(-0.5).apply(&params));
        assert!(ControlCommand::Gain(-0.5).apply(&params));
        assert_eq!(params.gain(), 0.0);

        assert!(ControlCommand::Smoothing(-0.5).apply(&params));
        assert!(ControlCommand::Smoothing(-0.5).apply(&params));
        assert_eq!(params.smoothing_rate(), 1.0);

        assert!(!ControlCommand::Quit.apply(&params));
    }
}
