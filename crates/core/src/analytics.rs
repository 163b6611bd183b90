//! Dashboard time buckets.
//!
//! Aggregation queries only return buckets that contain data. The functions
//! here lay out the contiguous calendar range for a period and merge those
//! sparse samples into it, so empty days and months still appear at their
//! position with zero values.
//!
//! "Local" dates are taken in a fixed UTC offset configured for the store.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Days in the weekly series, today included.
pub const WEEKLY_BUCKETS: u32 = 7;
/// Months in the monthly series, the current month included.
pub const MONTHLY_BUCKETS: u32 = 6;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Dashboard query errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid period '{0}', expected 'weekly' or 'monthly'")]
    InvalidPeriod(String),
}

/// Series granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Trailing seven days.
    Weekly,
    /// Trailing six calendar months.
    #[default]
    Monthly,
}

impl std::str::FromStr for Period {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(DashboardError::InvalidPeriod(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Calendar position of a bucket. `day` is set for daily buckets only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

/// A non-empty bucket as returned by an order aggregation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSample {
    pub key: BucketKey,
    pub orders: i64,
    pub revenue: Decimal,
}

/// A non-empty bucket as returned by a registration aggregation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSample {
    pub key: BucketKey,
    pub users: i64,
}

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    #[serde(flatten)]
    pub key: BucketKey,
    pub orders: i64,
    pub revenue: Decimal,
    pub users: i64,
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub users: i64,
    pub products: i64,
    pub orders: i64,
    /// Sum over confirmed, shipped and delivered orders.
    pub revenue: Decimal,
}

/// Today's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub today_orders: i64,
    pub today_sales: Decimal,
}

/// The store's calendar date at `now`.
#[must_use]
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// UTC instant at which `date` starts in the store's offset.
#[must_use]
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    // A fixed offset has no gaps or folds, so the mapping is unique.
    offset
        .from_local_datetime(&local)
        .single()
        .map_or_else(|| local.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// `[start of today, start of tomorrow)` in UTC.
#[must_use]
pub fn today_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = local_date(now, offset);
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    (start_of_day(today, offset), start_of_day(tomorrow, offset))
}

/// Bucket keys for `period` ending at `today`, oldest first.
#[must_use]
pub fn bucket_keys(period: Period, today: NaiveDate) -> Vec<BucketKey> {
    match period {
        Period::Weekly => (0..WEEKLY_BUCKETS)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
            .map(|d| BucketKey {
                year: d.year(),
                month: d.month(),
                day: Some(d.day()),
            })
            .collect(),
        Period::Monthly => (0..MONTHLY_BUCKETS)
            .rev()
            .map(|back| {
                let (year, month) = shift_month(today.year(), today.month(), back);
                BucketKey {
                    year,
                    month,
                    day: None,
                }
            })
            .collect(),
    }
}

/// UTC instant where the oldest bucket of `period` starts.
#[must_use]
pub fn window_start(period: Period, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let today = local_date(now, offset);
    let first = match period {
        Period::Weekly => today
            .checked_sub_days(Days::new(u64::from(WEEKLY_BUCKETS - 1)))
            .unwrap_or(today),
        Period::Monthly => {
            let (year, month) = shift_month(today.year(), today.month(), MONTHLY_BUCKETS - 1);
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
        }
    };
    start_of_day(first, offset)
}

/// Chart label for a bucket: weekday for days, month for months.
#[must_use]
pub fn label(key: BucketKey) -> String {
    match key.day {
        Some(day) => NaiveDate::from_ymd_opt(key.year, key.month, day)
            .map(|d| d.weekday().to_string())
            .unwrap_or_default(),
        None => month_label(key.month).to_owned(),
    }
}

fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Merge sparse samples into the full calendar range for `period`.
///
/// Samples whose key falls outside the range are ignored.
#[must_use]
pub fn zero_fill(
    period: Period,
    today: NaiveDate,
    orders: &[OrderSample],
    users: &[UserSample],
) -> Vec<Bucket> {
    bucket_keys(period, today)
        .into_iter()
        .map(|key| {
            let (order_count, revenue) = orders
                .iter()
                .filter(|s| s.key == key)
                .fold((0, Decimal::ZERO), |(n, r), s| (n + s.orders, r + s.revenue));
            let users = users.iter().filter(|s| s.key == key).map(|s| s.users).sum();
            Bucket {
                label: label(key),
                key,
                orders: order_count,
                revenue,
                users,
            }
        })
        .collect()
}

/// `(year, month)` that lies `back` months before the given one.
fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + i32::try_from(month).unwrap_or(1) - 1 - i32::try_from(back).unwrap_or(0);
    let month = u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1;
    (index.div_euclid(12), month)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_is_seven_ascending_days() {
        let keys = bucket_keys(Period::Weekly, date(2026, 3, 2));
        assert_eq!(keys.len(), 7);
        assert_eq!(
            keys.first().copied(),
            Some(BucketKey {
                year: 2026,
                month: 2,
                day: Some(24)
            })
        );
        assert_eq!(
            keys.last().copied(),
            Some(BucketKey {
                year: 2026,
                month: 3,
                day: Some(2)
            })
        );
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_monthly_crosses_year_boundary() {
        let keys = bucket_keys(Period::Monthly, date(2026, 2, 15));
        let months: Vec<(i32, u32)> = keys.iter().map(|k| (k.year, k.month)).collect();
        assert_eq!(
            months,
            vec![
                (2025, 9),
                (2025, 10),
                (2025, 11),
                (2025, 12),
                (2026, 1),
                (2026, 2)
            ]
        );
        assert!(keys.iter().all(|k| k.day.is_none()));
    }

    #[test]
    fn test_zero_fill_without_data() {
        let buckets = zero_fill(Period::Weekly, date(2026, 10, 18), &[], &[]);
        assert_eq!(buckets.len(), 7);
        assert!(
            buckets
                .iter()
                .all(|b| b.orders == 0 && b.revenue.is_zero() && b.users == 0)
        );
        assert_eq!(buckets.last().unwrap().label, "Sun");
    }

    #[test]
    fn test_zero_fill_places_samples() {
        let today = date(2026, 10, 18);
        let orders = [
            OrderSample {
                key: BucketKey {
                    year: 2026,
                    month: 10,
                    day: Some(16),
                },
                orders: 3,
                revenue: Decimal::from(4500),
            },
            OrderSample {
                key: BucketKey {
                    year: 2026,
                    month: 9,
                    day: Some(1),
                },
                orders: 99,
                revenue: Decimal::from(1),
            },
        ];
        let users = [UserSample {
            key: BucketKey {
                year: 2026,
                month: 10,
                day: Some(18),
            },
            users: 2,
        }];

        let buckets = zero_fill(Period::Weekly, today, &orders, &users);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[4].label, "Fri");
        assert_eq!(buckets[4].orders, 3);
        assert_eq!(buckets[4].revenue, Decimal::from(4500));
        assert_eq!(buckets[6].users, 2);
        assert_eq!(buckets.iter().map(|b| b.orders).sum::<i64>(), 3);
    }

    #[test]
    fn test_month_labels() {
        let buckets = zero_fill(Period::Monthly, date(2026, 6, 30), &[], &[]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun"]);
    }

    #[test]
    fn test_local_day_uses_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        // 20:00 UTC on the 17th is already the 18th in IST
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 20, 0, 0).unwrap();
        assert_eq!(local_date(now, ist), date(2026, 10, 18));

        let (start, end) = today_bounds(now, ist);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 17, 18, 30, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 18, 18, 30, 0).unwrap());
    }

    #[test]
    fn test_window_start() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(
            window_start(Period::Weekly, now, utc),
            Utc.with_ymd_and_hms(2026, 2, 24, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window_start(Period::Monthly, now, utc),
            Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("weekly".parse::<Period>().unwrap(), Period::Weekly);
        assert_eq!(" Monthly ".parse::<Period>().unwrap(), Period::Monthly);
        assert!("yearly".parse::<Period>().is_err());
        assert_eq!(Period::default(), Period::Monthly);
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let totals = DashboardTotals::default();
        assert_eq!(
            serde_json::to_value(totals).unwrap(),
            serde_json::json!({"users": 0, "products": 0, "orders": 0, "revenue": "0"})
        );
    }
}
