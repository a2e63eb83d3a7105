//! Single distance measurement value.

use std::fmt;

/// Smallest distance the HC-SR04 reports reliably, in centimetres.
pub const MIN_DISTANCE_CM: f64 = 2.0;

/// Largest distance the HC-SR04 reports reliably, in centimetres.
pub const MAX_DISTANCE_CM: f64 = 400.0;

const MIN_TENTHS: u32 = 20;
const MAX_TENTHS: u32 = 4000;

/// Outcome of one measurement as seen by consumers.
///
/// A sample is either valid, carrying a distance inside
/// [`MIN_DISTANCE_CM`]..=[`MAX_DISTANCE_CM`] at one-decimal resolution, or
/// absent. There is no numeric placeholder for "no reading": a zero or
/// clamped value can never be mistaken for an obstacle at the range limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceSample {
    distance_cm: Option<f64>,
}

impl DistanceSample {
    /// The "no sample yet" value.
    pub const NONE: Self = Self { distance_cm: None };

    /// Build a valid sample from a distance in tenths of a centimetre.
    ///
    /// Returns `None` when the value is outside the sensor range.
    pub fn from_tenths(tenths: u32) -> Option<Self> {
        if (MIN_TENTHS..=MAX_TENTHS).contains(&tenths) {
            Some(Self {
                distance_cm: Some(f64::from(tenths) / 10.0),
            })
        } else {
            None
        }
    }

    /// The measured distance, if this sample is valid.
    pub fn distance_cm(&self) -> Option<f64> {
        self.distance_cm
    }

    /// Whether the sample carries a distance.
    pub fn is_valid(&self) -> bool {
        self.distance_cm.is_some()
    }
}

impl fmt::Display for DistanceSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distance_cm {
            Some(cm) => write!(f, "{cm:.1} cm"),
            None => write!(f, "no reading"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_invalid() {
        assert!(!DistanceSample::NONE.is_valid());
        assert_eq!(DistanceSample::NONE.distance_cm(), None);
        assert_eq!(DistanceSample::default(), DistanceSample::NONE);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        assert_eq!(DistanceSample::from_tenths(20).unwrap().distance_cm(), Some(2.0));
        assert_eq!(
            DistanceSample::from_tenths(4000).unwrap().distance_cm(),
            Some(400.0)
        );
        assert!(DistanceSample::from_tenths(19).is_none());
        assert!(DistanceSample::from_tenths(4001).is_none());
        assert!(DistanceSample::from_tenths(0).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(DistanceSample::from_tenths(172).unwrap().to_string(), "17.2 cm");
        assert_eq!(DistanceSample::NONE.to_string(), "no reading");
    }
}
