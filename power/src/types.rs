use powerhub_signals::DecodeError;
use uuid::Uuid;

/// Declares a value enum carried by a provider as a raw `u32` code
macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl TryFrom<u32> for $name {
            type Error = DecodeError;

            fn try_from(code: u32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(DecodeError::unrecognized(stringify!($name), other)),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 { value as u32 }
        }
    };
}

coded_enum! {
    /// Whether the OS is limiting background work to save energy
    EnergySaverStatus {
        /// Energy saver is not available on this system
        Disabled = 0,
        Off = 1,
        On = 2,
    }
}

coded_enum! {
    /// Coarse battery state derived from the composite battery record
    BatteryStatus {
        NotPresent = 0,
        Discharging = 1,
        Idle = 2,
        Charging = 3,
    }
}

coded_enum! {
    /// Whether external power is connected and keeps up with consumption
    PowerSupplyStatus {
        NotPresent = 0,
        /// Connected, but the battery is still discharging
        Inadequate = 1,
        Adequate = 2,
    }
}

coded_enum! {
    PowerSourceStatus {
        Ac = 0,
        Dc = 1,
        /// A short-term source such as a UPS
        ShortTerm = 2,
    }
}

coded_enum! {
    DisplayStatus {
        Off = 0,
        On = 1,
        Dimmed = 2,
    }
}

coded_enum! {
    UserPresenceStatus {
        Present = 0,
        Absent = 1,
    }
}

coded_enum! {
    SystemAwayModeStatus {
        Exiting = 0,
        Entering = 1,
    }
}

/// The active power scheme, reported by the provider as a scheme GUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerSchemePersonality {
    HighPerformance,
    PowerSaver,
    Balanced,
}

impl PowerSchemePersonality {
    pub const HIGH_PERFORMANCE_SCHEME: Uuid = Uuid::from_u128(0x8c5e7fda_e8bf_4a96_9a85_a6e23a8c635c);
    pub const POWER_SAVER_SCHEME: Uuid = Uuid::from_u128(0xa1841308_3541_4fab_bc81_f71556f20b4a);
    pub const BALANCED_SCHEME: Uuid = Uuid::from_u128(0x381b4222_f694_41f0_9685_ff5bb260df2e);

    /// The well-known scheme GUID of this personality
    pub fn scheme(&self) -> Uuid {
        match self {
            Self::HighPerformance => Self::HIGH_PERFORMANCE_SCHEME,
            Self::PowerSaver => Self::POWER_SAVER_SCHEME,
            Self::Balanced => Self::BALANCED_SCHEME,
        }
    }
}

impl TryFrom<Uuid> for PowerSchemePersonality {
    type Error = DecodeError;

    fn try_from(scheme: Uuid) -> Result<Self, Self::Error> {
        match scheme {
            Self::HIGH_PERFORMANCE_SCHEME => Ok(Self::HighPerformance),
            Self::POWER_SAVER_SCHEME => Ok(Self::PowerSaver),
            Self::BALANCED_SCHEME => Ok(Self::Balanced),
            other => Err(DecodeError::unrecognized("power scheme", other)),
        }
    }
}
