use std::fmt;

use tracing::warn;

use crate::error::ExperimentError;

/// Where model math runs. Only the CPU path is built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
}

impl Device {
    /// Picks the device for a run. Asking for accelerated compute never fails:
    /// the request is logged as unavailable and the CPU is used instead.
    pub fn select(accelerated: bool) -> Device {
        if accelerated {
            let err = ExperimentError::DeviceUnavailable(
                "no accelerated backend is compiled in".to_string(),
            );
            warn!(error = %err, "falling back to cpu");
        }
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerated_request_falls_back() {
        assert_eq!(Device::select(true), Device::Cpu);
        assert_eq!(Device::select(false), Device::Cpu);
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }
}
