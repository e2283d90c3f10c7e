//! Chaos command definitions: the fully-parsed, validated representation
//! of a single action the dispatcher can apply to a target set.

use std::time::Duration;

use thiserror::Error;

/// Network interface a netem command attaches its `tc` qdisc to.
pub const DEFAULT_INTERFACE: &str = "eth0";

#[derive(Debug, Clone, PartialEq)]
pub enum ChaosCommand {
    Kill {
        signal: String,
    },
    Stop {
        wait_seconds: u64,
    },
    Remove {
        force: bool,
        remove_links: bool,
        remove_volumes: bool,
    },
    Pause {
        duration: Duration,
    },
    NetemDelay {
        duration: Duration,
        interface: String,
        ip_filter: Option<String>,
        amount_ms: u64,
        variation_ms: u64,
        correlation_percent: u8,
    },
    NetemLoss {
        duration: Duration,
        interface: String,
        ip_filter: Option<String>,
        percent: u8,
    },
    NetemDuplicate {
        duration: Duration,
        interface: String,
        ip_filter: Option<String>,
        percent: u8,
    },
    NetemCorrupt {
        duration: Duration,
        interface: String,
        ip_filter: Option<String>,
        percent: u8,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("unrecognized signal: {0}")]
    UnknownSignal(String),
    #[error("percent must be between 0 and 100, got {0}")]
    PercentOutOfRange(u8),
    #[error("correlation must be between 0 and 100, got {0}")]
    CorrelationOutOfRange(u8),
    #[error("duration must be greater than zero")]
    ZeroDuration,
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("variation ({variation}) must not exceed amount ({amount})")]
    VariationExceedsAmount { variation: u64, amount: u64 },
    #[error("interface name must not be empty")]
    EmptyInterface,
    #[error("interface name {0:?} does not match [a-zA-Z]+[0-9]{{0,2}}")]
    InvalidInterface(String),
}

impl ChaosCommand {
    /// Checked before any target is resolved or any runtime call is made:
    /// a malformed command must fail the same way whether or not a
    /// single container ever matches.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ChaosCommand::Kill { signal } => {
                if !crate::container::is_recognized_signal(signal) {
                    return Err(ValidationError::UnknownSignal(signal.clone()));
                }
                Ok(())
            }
            ChaosCommand::Stop { .. } => Ok(()),
            ChaosCommand::Remove { .. } => Ok(()),
            ChaosCommand::Pause { duration } => check_duration(*duration),
            ChaosCommand::NetemDelay { duration, interface, amount_ms, variation_ms, correlation_percent, .. } => {
                check_duration(*duration)?;
                check_interface(interface)?;
                if *amount_ms == 0 {
                    return Err(ValidationError::ZeroAmount);
                }
                if *variation_ms > *amount_ms {
                    return Err(ValidationError::VariationExceedsAmount {
                        variation: *variation_ms,
                        amount: *amount_ms,
                    });
                }
                check_percent(*correlation_percent).map_err(|_| {
                    ValidationError::CorrelationOutOfRange(*correlation_percent)
                })
            }
            ChaosCommand::NetemLoss { duration, interface, percent, .. }
            | ChaosCommand::NetemDuplicate { duration, interface, percent, .. }
            | ChaosCommand::NetemCorrupt { duration, interface, percent, .. } => {
                check_duration(*duration)?;
                check_interface(interface)?;
                check_percent(*percent)
            }
        }
    }

    /// `true` for the four netem variants, which the dispatcher routes
    /// through the transient-disruption setup/hold/teardown sequence
    /// instead of applying and returning immediately.
    pub fn is_netem(&self) -> bool {
        matches!(
            self,
            ChaosCommand::NetemDelay { .. }
                | ChaosCommand::NetemLoss { .. }
                | ChaosCommand::NetemDuplicate { .. }
                | ChaosCommand::NetemCorrupt { .. }
        )
    }

    /// The transient-disruption duration this command must revert
    /// within, if any (Pause and every Netem kind). `Kill`/`Stop`/
    /// `Remove` return `None`: they complete immediately, with nothing
    /// to bound against the scheduler interval.
    pub fn transient_duration(&self) -> Option<Duration> {
        match self {
            ChaosCommand::Pause { duration }
            | ChaosCommand::NetemDelay { duration, .. }
            | ChaosCommand::NetemLoss { duration, .. }
            | ChaosCommand::NetemDuplicate { duration, .. }
            | ChaosCommand::NetemCorrupt { duration, .. } => Some(*duration),
            ChaosCommand::Kill { .. } | ChaosCommand::Stop { .. } | ChaosCommand::Remove { .. } => None,
        }
    }
}

fn check_duration(d: Duration) -> Result<(), ValidationError> {
    if d.is_zero() {
        Err(ValidationError::ZeroDuration)
    } else {
        Ok(())
    }
}

/// Interface names are restricted to `[a-zA-Z]+[0-9]{0,2}`, since the
/// name is later concatenated straight into a `tc` argv.
fn check_interface(interface: &str) -> Result<(), ValidationError> {
    if interface.trim().is_empty() {
        return Err(ValidationError::EmptyInterface);
    }

    let bytes = interface.as_bytes();
    let letters_end = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    let digits = &interface[letters_end..];

    let valid = letters_end > 0 && digits.len() <= 2 && digits.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidInterface(interface.to_string()))
    }
}

fn check_percent(p: u8) -> Result<(), ValidationError> {
    if p > 100 {
        Err(ValidationError::PercentOutOfRange(p))
    } else {
        Ok(())
    }
}
