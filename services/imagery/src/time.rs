//! Modified Julian Date conversion for log output.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Convert a Modified Julian Date (days since 1858-11-17 UTC) to a UTC
/// timestamp, at millisecond precision.
pub fn mjd_to_datetime(mjd: f64) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1858, 11, 17)?.and_hms_opt(0, 0, 0)?;
    let millis = (mjd * 86_400_000.0).round() as i64;
    let naive = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_mjd_zero() {
        let dt = mjd_to_datetime(0.0).unwrap();
        assert_eq!(dt.to_rfc3339(), "1858-11-17T00:00:00+00:00");
    }

    #[test]
    fn test_fractional_day() {
        // MJD 60248.5 is 2023-10-31 12:00 UTC
        let dt = mjd_to_datetime(60248.5).unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-10-31T12:00:00+00:00");
    }
}
