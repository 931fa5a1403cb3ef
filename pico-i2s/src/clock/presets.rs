//! System clock presets for the integer-divider clock modes.
//!
//! Each mode has one `clk_sys` per rate family, picked so that
//! `numerator / rate` is an integer PIO divider for every common rate of
//! that family:
//!
//! | Mode | 48 kHz family | 44.1 kHz family | Numerator | MCLK div |
//! |------|---------------|-----------------|-----------|----------|
//! | LowJitter | 147.5 MHz | 135.5 MHz | `6 * base` | 3 |
//! | LowJitterOverclock | 295 MHz | 271 MHz | `12 * base` | 6 |
//! | External | 49.152 MHz (GPIN1) | 45.1584 MHz (GPIN0) | `2 * base` | 1 |
//!
//! `base` is 192 000 for the 48 kHz family and 176 400 for 44.1 kHz.

use crate::config::ClockMode;
use crate::hal::SystemClockSource;

/// Standard master clock for the 48 kHz family (1024 x 48 kHz).
pub const MCLK_48K_HZ: u32 = 49_152_000;

/// Standard master clock for the 44.1 kHz family (1024 x 44.1 kHz).
pub const MCLK_44K1_HZ: u32 = 45_158_400;

/// GPIN carrying the 48 kHz family oscillator.
pub const GPIN1_PIN: u8 = 22;

/// GPIN carrying the 44.1 kHz family oscillator.
pub const GPIN0_PIN: u8 = 20;

const PLL_48K: (u32, u8, u8) = (1_770_000_000, 6, 1);
const PLL_44K1: (u32, u8, u8) = (1_626_000_000, 6, 1);

/// Whether `rate` belongs to the 48 kHz family.
///
/// Every multiple of 8 kHz does (8k, 16k, 32k as well as 48k x N); all
/// other rates are treated as 44.1 kHz family.
pub const fn is_48k_family(rate: u32) -> bool {
    rate % 8_000 == 0
}

/// `clk_sys` source for `mode` and family, `None` for [`ClockMode::Default`].
pub const fn system_clock(mode: ClockMode, family_48k: bool) -> Option<SystemClockSource> {
    let (vco_hz, post_div1, post_div2) = if family_48k { PLL_48K } else { PLL_44K1 };
    match mode {
        ClockMode::Default => None,
        ClockMode::LowJitter => Some(SystemClockSource::Pll {
            vco_hz,
            post_div1,
            post_div2,
            sys_div: 2,
        }),
        ClockMode::LowJitterOverclock => Some(SystemClockSource::Pll {
            vco_hz,
            post_div1,
            post_div2,
            sys_div: 1,
        }),
        ClockMode::External => Some(if family_48k {
            SystemClockSource::Gpin {
                pin: GPIN1_PIN,
                hz: MCLK_48K_HZ,
            }
        } else {
            SystemClockSource::Gpin {
                pin: GPIN0_PIN,
                hz: MCLK_44K1_HZ,
            }
        }),
    }
}

/// Multiplier of the family base rate giving the integer divider numerator.
pub const fn divider_multiplier(mode: ClockMode) -> u32 {
    match mode {
        ClockMode::Default => 0,
        ClockMode::LowJitter => 6,
        ClockMode::LowJitterOverclock => 12,
        ClockMode::External => 2,
    }
}

/// Integer master clock divider for the fixed system clocks.
pub const fn mclk_divider(mode: ClockMode) -> u16 {
    match mode {
        ClockMode::Default => 0,
        ClockMode::LowJitter => 3,
        ClockMode::LowJitterOverclock => 6,
        ClockMode::External => 1,
    }
}

/// Family base rate: 192 kHz or 176.4 kHz.
pub const fn family_base(family_48k: bool) -> u32 {
    if family_48k {
        192_000
    } else {
        176_400
    }
}

/// Standard master clock of the family.
pub const fn family_mclk_hz(family_48k: bool) -> u32 {
    if family_48k {
        MCLK_48K_HZ
    } else {
        MCLK_44K1_HZ
    }
}
