//! Per-channel digital volume.
//!
//! Gains are Q29 multipliers: `0x2000_0000` is unity and a sample is scaled
//! as `(sample as i64 * gain) >> 29`. Attenuation is quantized to 1 dB steps
//! over `-100..=0` dB through [`DB_TO_GAIN`].
//!
//! The two gains are plain atomics. Any context may change them while the
//! producer is packing; a block packed across an update may carry the old
//! gain on one channel and the new gain on the other, which is inaudible.

use core::sync::atomic::{AtomicI32, Ordering};

/// Unity gain in Q29.
pub const UNITY_GAIN: i32 = 0x2000_0000;

/// Fixed-point shift of the gain multipliers.
pub const GAIN_SHIFT: u32 = 29;

/// Quietest attenuation in dB; everything below clamps to it.
pub const MIN_DB: i16 = -100;

/// Q29 gain for `0..=100` dB of attenuation, 1 dB per entry.
pub static DB_TO_GAIN: [i32; 101] = [
    0x20000000, 0x1c8520af, 0x196b230b, 0x16a77dea, 0x1430cd74, 0x11feb33c, 0x1009b9cf, 0xe4b3b63,
    0xcbd4b3f, 0xb5aa19b, 0xa1e89b1, 0x904d1bd, 0x809bcc3, 0x729f5d9, 0x66284d5, 0x5b0c438,
    0x5125831, 0x4852697, 0x4074fcb, 0x3972853, 0x3333333, 0x2da1cde, 0x28ab6b4, 0x243f2fd,
    0x204e158, 0x1ccab86, 0x19a9294, 0x16dec56, 0x146211f, 0x122a9c2, 0x1030dc4, 0xe6e1c6,
    0xcdc613, 0xb76562, 0xa373ae, 0x91ad38, 0x81d59e, 0x73b70f, 0x672194, 0x5bea6e, 0x51eb85,
    0x4902e3, 0x411245, 0x39feb2, 0x33b022, 0x2e1127, 0x290ea8, 0x2497a2, 0x209ce9, 0x1d10f9,
    0x19e7c6, 0x171693, 0x1493ce, 0x1256f0, 0x10585e, 0xe9152, 0xcfbc3, 0xb924e, 0xa5028,
    0x9310b, 0x83126, 0x74d16, 0x681d3, 0x5ccab, 0x52b36, 0x49b50, 0x41b10, 0x3a8c3, 0x342e4,
    0x2e818, 0x2972d, 0x24f0e, 0x20ec7, 0x1d57e, 0x1a26f, 0x174ee, 0x14c60, 0x1283b, 0x10804,
    0xeb4d, 0xd1b7, 0xbae8, 0xa695, 0x9477, 0x8452, 0x75ee, 0x691b, 0x5dad, 0x537d, 0x4a68,
    0x4251, 0x3b1b, 0x34ad, 0x2ef3, 0x29d7, 0x254b, 0x213c, 0x1d9f, 0x1a66, 0x1787, 0x14f8,
];

/// Channel selector for volume changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    #[default]
    Both,
    Left,
    Right,
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    /// USB feature-unit channel numbers: 0 master, 1 left, 2 right.
    fn try_from(ch: u8) -> Result<Self, u8> {
        match ch {
            0 => Ok(Channel::Both),
            1 => Ok(Channel::Left),
            2 => Ok(Channel::Right),
            other => Err(other),
        }
    }
}

/// Gain for an attenuation in whole dB, clamped to `MIN_DB..=0`.
pub fn gain_for_db(db: i16) -> i32 {
    let index = db.clamp(MIN_DB, 0).unsigned_abs() as usize;
    DB_TO_GAIN[index]
}

/// Convert a USB audio volume (signed 8.8 dB) to whole dB.
///
/// Truncates toward zero, so `-1.5 dB` becomes `-1 dB`. Positive values
/// clamp to `0`.
pub fn usb_to_db(raw: i16) -> i16 {
    if raw >= 0 {
        return 0;
    }
    let whole = (raw.unsigned_abs() >> 8) as i16;
    -whole.min(-MIN_DB)
}

/// Convert a volume percentage to whole dB of attenuation.
///
/// `0` maps to `MIN_DB`, `100` (or more) to `0`, otherwise
/// `-20 * log10(percent / 100)` truncated toward zero.
pub fn percent_to_db(percent: u8) -> i16 {
    match percent {
        0 => MIN_DB,
        p if p >= 100 => 0,
        p => {
            let ratio = p as f32 / 100.0;
            let attenuation = -20.0 * libm::log10f(ratio);
            -(attenuation as i16).min(-MIN_DB)
        }
    }
}

/// Scale one left-justified sample by a Q29 gain.
#[inline(always)]
pub fn apply_gain(sample: i32, gain: i32) -> i32 {
    ((sample as i64 * gain as i64) >> GAIN_SHIFT) as i32
}

/// Left and right gains shared between the volume API and the packer.
pub struct Volume {
    left: AtomicI32,
    right: AtomicI32,
}

impl Volume {
    /// Both channels at unity gain.
    pub const fn new() -> Self {
        Volume {
            left: AtomicI32::new(UNITY_GAIN),
            right: AtomicI32::new(UNITY_GAIN),
        }
    }

    /// Set the attenuation of `channel` in whole dB (clamped to `-100..=0`).
    pub fn set_db(&self, db: i16, channel: Channel) {
        let gain = gain_for_db(db);
        match channel {
            Channel::Both => {
                self.left.store(gain, Ordering::Relaxed);
                self.right.store(gain, Ordering::Relaxed);
            }
            Channel::Left => self.left.store(gain, Ordering::Relaxed),
            Channel::Right => self.right.store(gain, Ordering::Relaxed),
        }
    }

    /// Set the attenuation of `channel` from a USB 8.8 dB value.
    pub fn set_usb(&self, raw: i16, channel: Channel) {
        self.set_db(usb_to_db(raw), channel);
    }

    /// Current `(left, right)` Q29 gains.
    pub fn gains(&self) -> (i32, i32) {
        (
            self.left.load(Ordering::Relaxed),
            self.right.load(Ordering::Relaxed),
        )
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_db_is_unity() {
        assert_eq!(gain_for_db(0), UNITY_GAIN);
        for s in [0, 1, -1, 0x4000 << 16, i32::MAX, i32::MIN] {
            assert_eq!(apply_gain(s, UNITY_GAIN), s);
        }
    }

    #[test]
    fn minus_100_db_silences_16_bit_audio() {
        let g = gain_for_db(-100);
        assert_eq!(g, 0x14f8);
        for s in [i16::MAX, i16::MIN, 0x4000, -0x4000] {
            let scaled = apply_gain((s as i32) << 16, g) >> 16;
            assert!(scaled == 0 || scaled == -1, "{s} -> {scaled}");
        }
    }

    #[test]
    fn table_is_monotonic() {
        for pair in DB_TO_GAIN.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn out_of_range_db_clamps() {
        assert_eq!(gain_for_db(6), UNITY_GAIN);
        assert_eq!(gain_for_db(-120), DB_TO_GAIN[100]);
        assert_eq!(gain_for_db(i16::MIN), DB_TO_GAIN[100]);
    }

    #[test]
    fn usb_volume_uses_magnitude() {
        assert_eq!(usb_to_db(0), 0);
        assert_eq!(usb_to_db(0x0100), 0);
        assert_eq!(usb_to_db(-0x0100), -1);
        assert_eq!(usb_to_db(-0x0180), -1);
        assert_eq!(usb_to_db(-0x0A00), -10);
        assert_eq!(usb_to_db(-0x7F00), -100);
        assert_eq!(usb_to_db(i16::MIN), -100);
    }

    #[test]
    fn percent_curve() {
        assert_eq!(percent_to_db(0), -100);
        assert_eq!(percent_to_db(100), 0);
        assert_eq!(percent_to_db(200), 0);
        assert_eq!(percent_to_db(50), -6);
        assert_eq!(percent_to_db(25), -12);
        assert_eq!(percent_to_db(75), -2);
        assert_eq!(percent_to_db(5), -26);
    }

    #[test]
    fn channel_selection() {
        let v = Volume::new();
        assert_eq!(v.gains(), (UNITY_GAIN, UNITY_GAIN));

        v.set_db(-20, Channel::Left);
        assert_eq!(v.gains(), (DB_TO_GAIN[20], UNITY_GAIN));

        v.set_usb(-0x0300, Channel::Right);
        assert_eq!(v.gains(), (DB_TO_GAIN[20], DB_TO_GAIN[3]));

        v.set_db(0, Channel::Both);
        assert_eq!(v.gains(), (UNITY_GAIN, UNITY_GAIN));
    }

    #[test]
    fn channel_from_usb_number() {
        assert_eq!(Channel::try_from(0), Ok(Channel::Both));
        assert_eq!(Channel::try_from(1), Ok(Channel::Left));
        assert_eq!(Channel::try_from(2), Ok(Channel::Right));
        assert_eq!(Channel::try_from(3), Err(3));
    }
}
