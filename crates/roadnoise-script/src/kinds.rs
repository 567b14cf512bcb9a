//! Trigger and modulator kinds with their soundscript names.

use std::fmt;

macro_rules! kind_table {
    (
        $(#[$meta:meta])*
        $name:ident [$count:literal] {
            $($variant:ident => $script:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                #[doc = concat!("`", $script, "`")]
                $variant,
            )+
        }

        impl $name {
            /// Number of kinds.
            pub const COUNT: usize = $count;

            /// Every kind in table order.
            pub const ALL: [Self; $count] = [$(Self::$variant,)+];

            /// Name used in soundscripts.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $script,)+
                }
            }

            /// Look up a kind by its soundscript name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.into_iter().find(|k| k.name() == name)
            }

            /// Slot of this kind in lookup tables.
            #[must_use]
            pub const fn index(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

kind_table! {
    /// A discrete simulation event that starts, stops or fires sounds.
    TriggerKind [66] {
        Engine => "engine",
        Aeroengine1 => "aeroengine1",
        Aeroengine2 => "aeroengine2",
        Aeroengine3 => "aeroengine3",
        Aeroengine4 => "aeroengine4",
        Horn => "horn",
        Brake => "brake",
        Pump => "pump",
        Starter => "starter",
        TurboBov => "turbo_BOV",
        TurboWasteGate => "turbo_waste_gate",
        TurboBackFire => "turbo_back_fire",
        AlwaysOn => "always_on",
        Repair => "repair",
        Air => "air",
        GpwsApDisconnect => "gpws_ap_disconnect",
        Gpws10 => "gpws_10",
        Gpws20 => "gpws_20",
        Gpws30 => "gpws_30",
        Gpws40 => "gpws_40",
        Gpws50 => "gpws_50",
        Gpws100 => "gpws_100",
        GpwsPullUp => "gpws_pull_up",
        GpwsMinimums => "gpws_minimums",
        AirPurge => "air_purge",
        Shift => "shift",
        GearSlide => "gear_slide",
        Creak => "creak",
        Break => "break",
        Screetch => "screetch",
        ParkingBrake => "parking_brake",
        Afterburner1 => "afterburner1",
        Afterburner2 => "afterburner2",
        Afterburner3 => "afterburner3",
        Afterburner4 => "afterburner4",
        Afterburner5 => "afterburner5",
        Afterburner6 => "afterburner6",
        Afterburner7 => "afterburner7",
        Afterburner8 => "afterburner8",
        Aeroengine5 => "aeroengine5",
        Aeroengine6 => "aeroengine6",
        Aeroengine7 => "aeroengine7",
        Aeroengine8 => "aeroengine8",
        AoaHorn => "aoa_horn",
        Ignition => "ignition",
        ReverseGear => "reverse_gear",
        TurnSignal => "turn_signal",
        TurnSignalTick => "turn_signal_tick",
        TurnSignalWarnTick => "turn_signal_warn_tick",
        Antilock => "antilock",
        TractionControl => "tractioncontrol",
        AvionicChat01 => "avionic_chat_01",
        AvionicChat02 => "avionic_chat_02",
        AvionicChat03 => "avionic_chat_03",
        AvionicChat04 => "avionic_chat_04",
        AvionicChat05 => "avionic_chat_05",
        AvionicChat06 => "avionic_chat_06",
        AvionicChat07 => "avionic_chat_07",
        AvionicChat08 => "avionic_chat_08",
        AvionicChat09 => "avionic_chat_09",
        AvionicChat10 => "avionic_chat_10",
        AvionicChat11 => "avionic_chat_11",
        AvionicChat12 => "avionic_chat_12",
        AvionicChat13 => "avionic_chat_13",
        LinkedCommand => "linked_command",
        MainMenu => "main_menu",
    }
}

kind_table! {
    /// A continuous simulation signal driving gain or pitch.
    ModulatorKind [30] {
        EngineRpm => "engine_rpm",
        TurboRpm => "turbo_rpm",
        Aeroengine1Rpm => "aeroengine1_rpm",
        Aeroengine2Rpm => "aeroengine2_rpm",
        Aeroengine3Rpm => "aeroengine3_rpm",
        Aeroengine4Rpm => "aeroengine4_rpm",
        WheelSpeed => "wheel_speed_kmph",
        InjectorRatio => "injector_ratio",
        Torque => "torque_nm",
        GearboxRpm => "gearbox_rpm",
        Creak => "creak",
        Break => "break",
        Screetch => "screetch",
        PumpRpm => "pump_rpm",
        Aeroengine1Throttle => "aeroengine1_throttle",
        Aeroengine2Throttle => "aeroengine2_throttle",
        Aeroengine3Throttle => "aeroengine3_throttle",
        Aeroengine4Throttle => "aeroengine4_throttle",
        Aeroengine5Throttle => "aeroengine5_throttle",
        Aeroengine6Throttle => "aeroengine6_throttle",
        Aeroengine7Throttle => "aeroengine7_throttle",
        Aeroengine8Throttle => "aeroengine8_throttle",
        Aeroengine5Rpm => "aeroengine5_rpm",
        Aeroengine6Rpm => "aeroengine6_rpm",
        Aeroengine7Rpm => "aeroengine7_rpm",
        Aeroengine8Rpm => "aeroengine8_rpm",
        AirSpeed => "air_speed_knots",
        AngleOfAttack => "angle_of_attack_degree",
        LinkedCommandRate => "linked_command_rate",
        MusicVolume => "music_volume",
    }
}

/// Name that leaves a modulator slot unbound.
pub const MODULATOR_NONE: &str = "none";

/// Parse a modulator slot value. `Some(None)` for [`MODULATOR_NONE`],
/// `None` when the name is unknown.
#[must_use]
pub fn parse_modulator(name: &str) -> Option<Option<ModulatorKind>> {
    if name == MODULATOR_NONE {
        return Some(None);
    }
    ModulatorKind::from_name(name).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in TriggerKind::ALL {
            assert_eq!(TriggerKind::from_name(kind.name()), Some(kind));
        }
        for kind in ModulatorKind::ALL {
            assert_eq!(ModulatorKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_indices_are_dense() {
        for (i, kind) in TriggerKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(TriggerKind::MainMenu.index(), TriggerKind::COUNT - 1);
        assert_eq!(ModulatorKind::MusicVolume.index(), ModulatorKind::COUNT - 1);
    }

    #[test]
    fn test_script_spellings() {
        assert_eq!(TriggerKind::from_name("turbo_BOV"), Some(TriggerKind::TurboBov));
        assert_eq!(TriggerKind::from_name("turbo_bov"), None);
        assert_eq!(TriggerKind::from_name("antilock"), Some(TriggerKind::Antilock));
        assert_eq!(ModulatorKind::from_name("wheel_speed_kmph"), Some(ModulatorKind::WheelSpeed));
    }

    #[test]
    fn test_parse_modulator() {
        assert_eq!(parse_modulator("none"), Some(None));
        assert_eq!(parse_modulator("engine_rpm"), Some(Some(ModulatorKind::EngineRpm)));
        assert_eq!(parse_modulator("warp_drive"), None);
    }
}
