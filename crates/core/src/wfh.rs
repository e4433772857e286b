//! Work-from-home epoch arithmetic.
//!
//! The epoch starts at 2020-03-03 19:15 server-local time. Elapsed time is
//! reported in seconds, as a `N days, H:MM:SS.ffffff` duration, and in a fixed
//! list of deliberately odd units.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Scale {
    Per(f64),
    Times(f64),
}

impl Scale {
    fn apply(self, seconds: f64) -> f64 {
        match self {
            Self::Per(divisor) => seconds / divisor,
            Self::Times(factor) => seconds * factor,
        }
    }
}

/// (display name, decimals, conversion from seconds), in display order.
const STRANGE_UNITS: [(&str, usize, Scale); 11] = [
    ("dog years", 2, Scale::Per(86_400.0 * 52.0)),
    ("hollow months", 2, Scale::Per(86_400.0 * 29.0)),
    ("fortnights", 1, Scale::Per(86_400.0 * 14.0)),
    ("kilowarhols", 1, Scale::Per(60.0 * 15_000.0)),
    ("weeks", 1, Scale::Per(86_400.0 * 7.0)),
    ("sols", 1, Scale::Per(86_400.0 + 2_375.0)),
    ("microcenturies", 0, Scale::Per(52.0 * 60.0 + 35.76)),
    ("Kermits", 1, Scale::Per(60.0 * 14.4)),
    ("moments", 0, Scale::Per(90.0)),
    ("millidays", 2, Scale::Per(86.4)),
    ("microfortnights", 2, Scale::Times(1.2096)),
];

#[derive(Clone, Debug, PartialEq)]
pub struct StrangeUnit {
    pub name: String,
    pub decimals: usize,
    pub value: f64,
}

impl StrangeUnit {
    /// Fixed-width line: name padded to 20, value right-aligned to 15 with
    /// thousands separators, wrapped in backticks for monospace rendering.
    pub fn render(&self) -> String {
        let label = format!("{}:", title_case(&self.name));
        let value = group_thousands(self.value, self.decimals);
        format!("`{label:<20} {value:>15}`")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WfhEpoch {
    pub elapsed: Duration,
    pub seconds: f64,
    pub units: Vec<StrangeUnit>,
}

impl WfhEpoch {
    pub fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 3, 3)
            .and_then(|date| date.and_hms_opt(19, 15, 0))
            .unwrap_or_default()
    }

    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(now: NaiveDateTime) -> Self {
        let elapsed = now - Self::start();
        let seconds = elapsed
            .num_microseconds()
            .map(|micros| micros as f64 / MICROS_PER_SECOND as f64)
            .unwrap_or_else(|| elapsed.num_seconds() as f64);

        let units = STRANGE_UNITS
            .iter()
            .map(|(name, decimals, scale)| StrangeUnit {
                name: (*name).to_string(),
                decimals: *decimals,
                value: scale.apply(seconds),
            })
            .collect();

        Self { elapsed, seconds, units }
    }

    pub fn seconds_text(&self) -> String {
        format!("{:.0}", self.seconds)
    }

    pub fn elapsed_text(&self) -> String {
        format_elapsed(self.elapsed)
    }

    pub fn unit_lines(&self) -> String {
        self.units.iter().map(StrangeUnit::render).collect::<Vec<_>>().join("\n")
    }
}

/// Renders a duration as `[N day[s], ]H:MM:SS[.ffffff]`, keeping the
/// time-of-day part non-negative and pushing the sign into the day count.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_micros = elapsed
        .num_microseconds()
        .unwrap_or_else(|| elapsed.num_seconds().saturating_mul(MICROS_PER_SECOND));
    let days = total_micros.div_euclid(MICROS_PER_DAY);
    let remainder = total_micros.rem_euclid(MICROS_PER_DAY);

    let seconds_of_day = remainder / MICROS_PER_SECOND;
    let micros = remainder % MICROS_PER_SECOND;
    let hours = seconds_of_day / 3_600;
    let minutes = (seconds_of_day % 3_600) / 60;
    let seconds = seconds_of_day % 60;

    let mut rendered = String::new();
    if days != 0 {
        let unit = if days.abs() == 1 { "day" } else { "days" };
        rendered.push_str(&format!("{days} {unit}, "));
    }
    rendered.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if micros != 0 {
        rendered.push_str(&format!(".{micros:06}"));
    }
    rendered
}

pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let digits = integer.as_bytes();
    let mut grouped = String::with_capacity(formatted.len() + digits.len() / 3 + 1);
    let nonzero = formatted.bytes().any(|byte| byte.is_ascii_digit() && byte != b'0');
    if value.is_sign_negative() && nonzero {
        grouped.push('-');
    }
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(char::from(*digit));
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
