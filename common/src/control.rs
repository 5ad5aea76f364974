use embedded_hal::digital::{OutputPin, PinState};
use thiserror::Error;

use crate::{
    pins::PinId,
    query::coerce_int,
    types::{GpioStatus, PinReport},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("pin or state parameter missing")]
    MissingParameter,
    #[error("pin {0} is not controllable")]
    UnknownPin(i64),
    #[error("failed to drive GPIO{pin}: {detail}")]
    Output { pin: u8, detail: String },
}

impl ControlError {
    /// Text reported to the HTTP caller.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing parameters",
            Self::UnknownPin(_) => "Invalid pin",
            Self::Output { .. } => "Failed to drive pin",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingParameter | Self::UnknownPin(_) => 400,
            Self::Output { .. } => 500,
        }
    }
}

#[derive(Debug)]
struct ControlledPin<P> {
    id: PinId,
    line: P,
    on: bool,
}

impl<P: OutputPin> ControlledPin<P> {
    fn drive(&mut self, on: bool) -> Result<(), ControlError> {
        self.line
            .set_state(PinState::from(on))
            .map_err(|err| ControlError::Output {
                pin: self.id.number(),
                detail: format!("{err:?}"),
            })?;
        self.on = on;
        Ok(())
    }
}

/// Owns both controllable output lines and their last commanded level.
///
/// A state cell only changes after its line accepted the new level, so the
/// reported state always matches what is on the wire.
#[derive(Debug)]
pub struct GpioController<P> {
    gpio14: ControlledPin<P>,
    gpio33: ControlledPin<P>,
}

impl<P: OutputPin> GpioController<P> {
    /// Takes ownership of the lines and drives both LOW.
    pub fn new(gpio14: P, gpio33: P) -> Result<Self, ControlError> {
        let mut controller = Self {
            gpio14: ControlledPin {
                id: PinId::Gpio14,
                line: gpio14,
                on: false,
            },
            gpio33: ControlledPin {
                id: PinId::Gpio33,
                line: gpio33,
                on: false,
            },
        };

        for pin in PinId::ALL {
            controller.pin_mut(pin).drive(false)?;
        }
        Ok(controller)
    }

    pub fn set_pin(&mut self, pin: PinId, on: bool) -> Result<PinReport, ControlError> {
        self.pin_mut(pin).drive(on)?;
        Ok(PinReport { pin, on })
    }

    /// Set-pin-state from raw query values. Both values are coerced the
    /// lenient way: non-numeric text reads as 0, and only 1 means ON.
    pub fn apply_query(
        &mut self,
        pin: Option<&str>,
        state: Option<&str>,
    ) -> Result<PinReport, ControlError> {
        let (Some(pin), Some(state)) = (pin, state) else {
            return Err(ControlError::MissingParameter);
        };

        let number = coerce_int(pin);
        let Some(pin) = PinId::from_number(number) else {
            return Err(ControlError::UnknownPin(number));
        };

        self.set_pin(pin, coerce_int(state) == 1)
    }

    pub fn is_on(&self, pin: PinId) -> bool {
        self.pin(pin).on
    }

    pub fn status(&self) -> GpioStatus {
        GpioStatus {
            gpio14: self.gpio14.on,
            gpio33: self.gpio33.on,
        }
    }

    pub fn line(&self, pin: PinId) -> &P {
        &self.pin(pin).line
    }

    fn pin(&self, pin: PinId) -> &ControlledPin<P> {
        match pin {
            PinId::Gpio14 => &self.gpio14,
            PinId::Gpio33 => &self.gpio33,
        }
    }

    fn pin_mut(&mut self, pin: PinId) -> &mut ControlledPin<P> {
        match pin {
            PinId::Gpio14 => &mut self.gpio14,
            PinId::Gpio33 => &mut self.gpio33,
        }
    }
}
