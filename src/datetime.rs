//! Module containing functionality related to BSON DateTimes.
//! For more information, see the documentation for the [`DateTime`] type.

use std::fmt;

use time::{
    OffsetDateTime,
    PrimitiveDateTime,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::error::{Error, Result};

/// `YYYY-MM-DDTHH:MM:SS`, the part of an ISO-8601 date that is always emitted.
const ISO8601_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Offsets written without a colon, e.g. `1970-01-01T00:00:00.000+0000`.
const ISO8601_COMPACT_OFFSET: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
);

const ISO8601_COMPACT_OFFSET_NO_FRACTION: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

/// Dates without an offset are read as UTC, e.g. `1970-01-01T00:00:00.000`.
const ISO8601_LOCAL: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// The last millisecond of 9999-12-31, the latest instant with a four digit year.
const MAX_ISO8601_MILLIS: i64 = 253_402_300_799_999;

/// Struct representing a BSON datetime: a signed count of milliseconds since the Unix epoch.
/// Note: BSON datetimes have millisecond precision, and may precede the epoch.
///
/// ```
/// let dt = bsonjs::DateTime::parse_iso8601("1998-02-12T00:01:00.023Z")?;
/// assert_eq!(dt.timestamp_millis(), 887_241_660_023);
/// assert_eq!(dt.try_to_iso8601_string()?, "1998-02-12T00:01:00.023Z");
/// # Ok::<(), bsonjs::error::Error>(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone)]
pub struct DateTime(i64);

impl crate::DateTime {
    /// Makes a new [`DateTime`] from the number of non-leap milliseconds since
    /// January 1, 1970 0:00:00 UTC (aka "UNIX timestamp").
    pub const fn from_millis(date: i64) -> Self {
        Self(date)
    }

    /// Returns the number of non-leap-milliseconds since January 1, 1970 UTC.
    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    fn to_time_opt(self) -> Option<OffsetDateTime> {
        OffsetDateTime::UNIX_EPOCH.checked_add(time::Duration::milliseconds(self.0))
    }

    fn from_offset_datetime(dt: OffsetDateTime) -> Result<Self> {
        let millis = dt.unix_timestamp_nanos().div_euclid(1_000_000);
        i64::try_from(millis)
            .map(Self::from_millis)
            .map_err(|_| Error::invalid_datetime_value("date out of range"))
    }

    /// Whether relaxed extended JSON renders this date as an ISO-8601 string, i.e. whether it
    /// falls between the epoch and the end of year 9999.
    pub(crate) fn is_iso8601_representable(self) -> bool {
        (0..=MAX_ISO8601_MILLIS).contains(&self.0)
    }

    /// Convert this [`DateTime`] to an ISO-8601 string of the form `YYYY-MM-DDTHH:MM:SS[.mmm]Z`.
    /// The millisecond component is omitted when it is zero.
    pub fn try_to_iso8601_string(self) -> Result<String> {
        let dt = self
            .to_time_opt()
            .ok_or_else(|| Error::cannot_format_datetime(format!("date {} out of range", self.0)))?;
        let mut s = dt
            .format(ISO8601_SECONDS)
            .map_err(Error::cannot_format_datetime)?;
        let millis = self.0.rem_euclid(1000);
        if millis != 0 {
            s.push_str(&format!(".{millis:03}"));
        }
        s.push('Z');
        Ok(s)
    }

    /// Parses an RFC 3339 / ISO-8601 date, truncating it to millisecond precision.
    ///
    /// Offsets may be written either as `Z`, `+hh:mm`, or `+hhmm`.
    pub fn parse_iso8601(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref();
        let parsed = OffsetDateTime::parse(s, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(s, ISO8601_COMPACT_OFFSET))
            .or_else(|_| OffsetDateTime::parse(s, ISO8601_COMPACT_OFFSET_NO_FRACTION))
            .or_else(|_| {
                PrimitiveDateTime::parse(s, ISO8601_LOCAL)
                    .or_else(|_| PrimitiveDateTime::parse(s, ISO8601_SECONDS))
                    .map(PrimitiveDateTime::assume_utc)
            })
            .map_err(|e| Error::invalid_datetime_value(format!("{s:?}: {e}")))?;
        Self::from_offset_datetime(parsed)
    }
}

impl fmt::Debug for crate::DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tup = f.debug_tuple("DateTime");
        match self.to_time_opt() {
            Some(dt) => tup.field(&dt),
            _ => tup.field(&self.0),
        };
        tup.finish()
    }
}
