//! Combo scoring

/// Points for a slice landed at `combo` (already incremented).
///
/// A combo of 1 or less pays the base; above that the base is scaled by
/// `1 + (combo - 1) * multiplier` and floored.
pub fn combo_points(base: u32, combo: u32, multiplier: f32) -> u64 {
    if combo <= 1 {
        return base as u64;
    }
    let factor = 1.0 + (combo - 1) as f64 * multiplier as f64;
    (base as f64 * factor).floor().max(0.0) as u64
}

/// Pitch of the slice cue, rising with the combo
pub fn slice_pitch(combo: u32) -> f32 {
    0.9 + (combo as f32 * 0.05).min(0.3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slice_pays_base() {
        assert_eq!(combo_points(10, 0, 1.5), 10);
        assert_eq!(combo_points(10, 1, 1.5), 10);
    }

    #[test]
    fn test_combo_multiplier() {
        assert_eq!(combo_points(10, 2, 1.5), 25);
        assert_eq!(combo_points(10, 3, 1.5), 40);
        assert_eq!(combo_points(7, 3, 1.5), 28);
        // floor(10 * 1.25)
        assert_eq!(combo_points(10, 2, 0.25), 12);
    }

    #[test]
    fn test_slice_pitch_caps() {
        assert!((slice_pitch(0) - 0.9).abs() < 1e-6);
        assert!((slice_pitch(100) - 1.2).abs() < 1e-6);
    }
}
