use serde::{Deserialize, Serialize};

pub const GPIO_PIN_14: u8 = 14;
pub const GPIO_PIN_33: u8 = 33;

/// One of the two output lines exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinId {
    Gpio14,
    Gpio33,
}

impl PinId {
    pub const ALL: [PinId; 2] = [PinId::Gpio14, PinId::Gpio33];

    pub fn number(self) -> u8 {
        match self {
            Self::Gpio14 => GPIO_PIN_14,
            Self::Gpio33 => GPIO_PIN_33,
        }
    }

    pub fn from_number(number: i64) -> Option<Self> {
        match number {
            n if n == i64::from(GPIO_PIN_14) => Some(Self::Gpio14),
            n if n == i64::from(GPIO_PIN_33) => Some(Self::Gpio33),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gpio14 => "gpio14",
            Self::Gpio33 => "gpio33",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_registered_numbers_resolve() {
        assert_eq!(PinId::from_number(14), Some(PinId::Gpio14));
        assert_eq!(PinId::from_number(33), Some(PinId::Gpio33));
        assert_eq!(PinId::from_number(7), None);
        assert_eq!(PinId::from_number(99), None);
        assert_eq!(PinId::from_number(0), None);
        assert_eq!(PinId::from_number(-14), None);
    }

    #[test]
    fn numbers_match_labels() {
        for pin in PinId::ALL {
            assert_eq!(pin.label(), format!("gpio{}", pin.number()));
        }
    }
}
