use serde::Serialize;

use crate::pins::PinId;

/// Outcome of a successful set-pin-state request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinReport {
    pub pin: PinId,
    pub on: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetPinResponse {
    pub success: bool,
    pub pin: u8,
    pub state: u8,
}

impl From<PinReport> for SetPinResponse {
    fn from(report: PinReport) -> Self {
        Self {
            success: true,
            pin: report.pin.number(),
            state: u8::from(report.on),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
}

impl ErrorResponse {
    pub fn new(error: &'static str) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpioStatus {
    pub gpio14: bool,
    pub gpio33: bool,
}

impl GpioStatus {
    pub fn get(&self, pin: PinId) -> bool {
        match pin {
            PinId::Gpio14 => self.gpio14,
            PinId::Gpio33 => self.gpio33,
        }
    }
}
