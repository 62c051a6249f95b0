use chrono::NaiveDate;
use common::{BreakError, Result};

/// Parse a composite date key.
///
/// Accepts MODIS layer keys (`A2001001`, year then day-of-year) and ISO
/// dates (`2001-01-01`).
pub fn parse_modis_date(key: &str) -> Result<NaiveDate> {
    let key = key.trim();
    if let Some(digits) = key.strip_prefix('A') {
        if digits.len() == 7 && digits.bytes().all(|b| b.is_ascii_digit()) {
            let year: i32 = digits[..4]
                .parse()
                .map_err(|_| BreakError::InvalidDate(key.to_string()))?;
            let doy: u32 = digits[4..]
                .parse()
                .map_err(|_| BreakError::InvalidDate(key.to_string()))?;
            return NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
                BreakError::InvalidDate(format!("{key}: day {doy} does not exist in {year}"))
            });
        }
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|_| BreakError::InvalidDate(format!("unrecognised date key {key:?}")))
}

/// Parse every key, failing on the first bad one.
pub fn parse_modis_dates<S: AsRef<str>>(keys: &[S]) -> Result<Vec<NaiveDate>> {
    keys.iter().map(|k| parse_modis_date(k.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modis_key() {
        let d = parse_modis_date("A2001017").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2001, 1, 17).unwrap());
        let leap = parse_modis_date("A2004366").unwrap();
        assert_eq!(leap, NaiveDate::from_ymd_opt(2004, 12, 31).unwrap());
    }

    #[test]
    fn test_iso_date() {
        let d = parse_modis_date(" 2008-06-25 ").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2008, 6, 25).unwrap());
    }

    #[test]
    fn test_invalid_keys() {
        for key in ["A2001400", "A2003366", "A20010", "2001/01/01", "", "B2001001"] {
            let err = parse_modis_date(key).unwrap_err();
            assert!(matches!(err, BreakError::InvalidDate(_)), "{key}");
        }
    }

    #[test]
    fn test_parse_many() {
        let dates = parse_modis_dates(&["A2001001", "A2001017"]).unwrap();
        assert_eq!(dates.len(), 2);
        assert!(parse_modis_dates(&["A2001001", "junk"]).is_err());
    }
}
