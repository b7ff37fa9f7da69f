use std::time::{Duration, SystemTime};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::Error;

/// Parses an RCS date field (`YY.MM.DD.hh.mm.ss` or `YYYY.MM.DD.hh.mm.ss`)
/// into a UTC instant.
///
/// `rcsfile(5)` only ever wrote two-digit years until RCS grew Y2K-aware
/// four-digit years; a one- or two-digit leading field is assumed to be
/// `19xx`, matching how `co`/`rlog` have always interpreted it.
pub fn parse(input: &[u8]) -> Result<SystemTime, Error> {
    let raw = std::str::from_utf8(input)?;
    let malformed = || Error::MalformedDate(raw.to_string());

    let mut fields = raw.splitn(6, '.');
    let mut next = || fields.next().ok_or_else(malformed);

    let year_field = next()?;
    let month: u32 = next()?.parse().map_err(|_| malformed())?;
    let day: u32 = next()?.parse().map_err(|_| malformed())?;
    let hour: u32 = next()?.parse().map_err(|_| malformed())?;
    let minute: u32 = next()?.parse().map_err(|_| malformed())?;
    let second: u32 = next()?.parse().map_err(|_| malformed())?;

    let mut year: i32 = year_field.parse().map_err(|_| malformed())?;
    if year_field.len() <= 2 {
        year += 1900;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(malformed)?;
    let naive = NaiveDateTime::new(date, time);

    let secs = naive.timestamp();
    if secs < 0 {
        return Err(malformed());
    }

    Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_year_is_19xx() {
        let have = parse(b"21.08.20.17.34.26").unwrap();
        let want = parse(b"1921.08.20.17.34.26").unwrap();
        assert_eq!(have, want);
    }

    #[test]
    fn four_digit_year_roundtrips_through_chrono() {
        let have = parse(b"2021.08.20.17.34.26").unwrap();
        assert!(have > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(parse(b"2021.13.20.17.34.26").is_err());
        assert!(parse(b"2021.08.20.17.34").is_err());
    }
}
