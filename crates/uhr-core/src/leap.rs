use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::InvalidLeapIndicator;

/// Leap-second status as reported by the upstream time reference.
///
/// Serialized on the wire as its two-bit NTP value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum LeapStatus {
    /// No leap second pending.
    #[default]
    NoWarning = 0,
    /// The last minute of the day has 61 seconds.
    AddSecond = 1,
    /// The last minute of the day has 59 seconds.
    DelSecond = 2,
    /// The reference itself is not synchronized.
    NotInSync = 3,
}

impl LeapStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a raw indicator onto the enumeration, falling back to
    /// [`LeapStatus::NoWarning`] for anything out of range.
    pub fn from_raw_lossy(raw: u8) -> Self {
        Self::try_from(raw).unwrap_or_default()
    }

    /// True for the two values that announce an actual leap second.
    pub fn is_announcement(self) -> bool {
        matches!(self, Self::AddSecond | Self::DelSecond)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoWarning => "no_warning",
            Self::AddSecond => "add_second",
            Self::DelSecond => "del_second",
            Self::NotInSync => "not_in_sync",
        }
    }
}

impl TryFrom<u8> for LeapStatus {
    type Error = InvalidLeapIndicator;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::NoWarning),
            1 => Ok(Self::AddSecond),
            2 => Ok(Self::DelSecond),
            3 => Ok(Self::NotInSync),
            other => Err(InvalidLeapIndicator(other)),
        }
    }
}

impl From<LeapStatus> for u8 {
    fn from(status: LeapStatus) -> Self {
        status.as_u8()
    }
}

impl fmt::Display for LeapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_indicators_map_to_variants() {
        assert_eq!(LeapStatus::try_from(0), Ok(LeapStatus::NoWarning));
        assert_eq!(LeapStatus::try_from(1), Ok(LeapStatus::AddSecond));
        assert_eq!(LeapStatus::try_from(2), Ok(LeapStatus::DelSecond));
        assert_eq!(LeapStatus::try_from(3), Ok(LeapStatus::NotInSync));
    }

    #[test]
    fn out_of_range_is_rejected_or_coerced() {
        assert_eq!(LeapStatus::try_from(4), Err(InvalidLeapIndicator(4)));
        assert_eq!(LeapStatus::from_raw_lossy(4), LeapStatus::NoWarning);
        assert_eq!(LeapStatus::from_raw_lossy(255), LeapStatus::NoWarning);
        assert_eq!(LeapStatus::from_raw_lossy(2), LeapStatus::DelSecond);
    }

    #[test]
    fn announcements() {
        assert!(LeapStatus::AddSecond.is_announcement());
        assert!(LeapStatus::DelSecond.is_announcement());
        assert!(!LeapStatus::NoWarning.is_announcement());
        assert!(!LeapStatus::NotInSync.is_announcement());
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&LeapStatus::NotInSync).unwrap(), "3");
        let parsed: LeapStatus = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, LeapStatus::AddSecond);
        assert!(serde_json::from_str::<LeapStatus>("7").is_err());
    }
}
