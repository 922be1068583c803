use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use vegalite_common::escape::datum_access;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnitPart {
    Year,
    Quarter,
    Month,
    Day,
    Date,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeUnitPart {
    pub fn name(&self) -> &'static str {
        use TimeUnitPart::*;
        match self {
            Year => "year",
            Quarter => "quarter",
            Month => "month",
            Day => "day",
            Date => "date",
            Hours => "hours",
            Minutes => "minutes",
            Seconds => "seconds",
            Milliseconds => "milliseconds",
        }
    }

    pub fn is_date_part(&self) -> bool {
        matches!(
            self,
            TimeUnitPart::Year
                | TimeUnitPart::Quarter
                | TimeUnitPart::Month
                | TimeUnitPart::Day
                | TimeUnitPart::Date
        )
    }

    fn format_specifier(&self) -> &'static str {
        use TimeUnitPart::*;
        match self {
            Year => "%Y",
            Quarter => "Q%q",
            Month => "%b",
            Day => "%a",
            Date => "%d",
            Hours => "%H",
            Minutes => "%M",
            Seconds => "%S",
            Milliseconds => "%L",
        }
    }
}

// Longest names first so that "milliseconds" is not read as "minutes"
const PARTS_BY_NAME_LENGTH: [TimeUnitPart; 9] = [
    TimeUnitPart::Milliseconds,
    TimeUnitPart::Quarter,
    TimeUnitPart::Minutes,
    TimeUnitPart::Seconds,
    TimeUnitPart::Month,
    TimeUnitPart::Hours,
    TimeUnitPart::Year,
    TimeUnitPart::Date,
    TimeUnitPart::Day,
];

/// A possibly composite time unit such as `yearmonthdate` or `utchours`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeUnit {
    pub utc: bool,
    pub parts: Vec<TimeUnitPart>,
}

impl TimeUnit {
    pub fn parse(name: &str) -> Option<Self> {
        let (utc, mut rest) = match name.strip_prefix("utc") {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let mut parts = Vec::new();
        while !rest.is_empty() {
            let part = PARTS_BY_NAME_LENGTH
                .iter()
                .find(|p| rest.starts_with(p.name()))?;
            rest = &rest[part.name().len()..];
            parts.push(*part);
        }
        if parts.is_empty() {
            return None;
        }
        parts.sort();
        parts.dedup();
        Some(Self { utc, parts })
    }

    pub fn name(&self) -> String {
        let prefix = if self.utc { "utc" } else { "" };
        let parts: String = self.parts.iter().map(|p| p.name()).collect();
        format!("{prefix}{parts}")
    }

    pub fn contains(&self, part: TimeUnitPart) -> bool {
        self.parts.contains(&part)
    }

    /// Expression truncating `datum[field]` to this unit
    pub fn field_expr(&self, field: &str) -> String {
        let field_ref = datum_access(field);
        let utc = if self.utc { "utc" } else { "" };
        let part_expr = |part: TimeUnitPart| -> Option<String> {
            if !self.contains(part) {
                return None;
            }
            Some(match part {
                TimeUnitPart::Quarter => format!("({utc}quarter({field_ref})-1)"),
                _ => format!("{utc}{}({field_ref})", part.name()),
            })
        };

        let year = part_expr(TimeUnitPart::Year).unwrap_or_else(|| {
            // Jan 1 2006 is a Sunday, so day-of-week units stay aligned
            if self.contains(TimeUnitPart::Day) {
                "2006".to_string()
            } else {
                "2012".to_string()
            }
        });
        let month = match (part_expr(TimeUnitPart::Quarter), part_expr(TimeUnitPart::Month)) {
            (Some(q), None) => format!("{q}*3"),
            (Some(q), Some(m)) => format!("{q}*3+{m}"),
            (None, Some(m)) => m,
            (None, None) => "0".to_string(),
        };
        let date = match (part_expr(TimeUnitPart::Day), part_expr(TimeUnitPart::Date)) {
            (Some(d), _) => format!("{d}+1"),
            (None, Some(d)) => d,
            (None, None) => "1".to_string(),
        };
        let rest: Vec<String> = [
            TimeUnitPart::Hours,
            TimeUnitPart::Minutes,
            TimeUnitPart::Seconds,
            TimeUnitPart::Milliseconds,
        ]
        .into_iter()
        .map(|p| part_expr(p).unwrap_or_else(|| "0".to_string()))
        .collect();

        let func = if self.utc { "utc" } else { "datetime" };
        format!(
            "{func}({year}, {month}, {date}, {})",
            rest.join(", ")
        )
    }

    /// d3 time format matching the resolution of this unit
    pub fn format(&self) -> String {
        let date_parts: Vec<&str> = self
            .parts
            .iter()
            .filter(|p| p.is_date_part())
            .map(|p| p.format_specifier())
            .collect();
        let time_parts: Vec<&str> = self
            .parts
            .iter()
            .filter(|p| {
                matches!(
                    p,
                    TimeUnitPart::Hours | TimeUnitPart::Minutes | TimeUnitPart::Seconds
                )
            })
            .map(|p| p.format_specifier())
            .collect();
        let mut format = date_parts.join(" ");
        if !time_parts.is_empty() {
            if !format.is_empty() {
                format.push(' ');
            }
            format.push_str(&time_parts.join(":"));
        }
        if self.contains(TimeUnitPart::Milliseconds) {
            format.push_str(".%L");
        }
        format
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for TimeUnit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        TimeUnit::parse(&name)
            .ok_or_else(|| de::Error::custom(format!("Invalid time unit: {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(
        name,
        expected,
        case("year", vec![TimeUnitPart::Year]),
        case("yearmonthdate", vec![TimeUnitPart::Year, TimeUnitPart::Month, TimeUnitPart::Date]),
        case("minutesseconds", vec![TimeUnitPart::Minutes, TimeUnitPart::Seconds]),
        case("secondsmilliseconds", vec![TimeUnitPart::Seconds, TimeUnitPart::Milliseconds]),
        case("utcquarter", vec![TimeUnitPart::Quarter])
    )]
    fn test_parse_time_unit(name: &str, expected: Vec<TimeUnitPart>) {
        let unit = TimeUnit::parse(name).unwrap();
        assert_eq!(unit.parts, expected);
        assert_eq!(unit.name(), name);
    }

    #[test]
    fn test_invalid_time_unit() {
        assert!(TimeUnit::parse("fortnight").is_none());
        assert!(TimeUnit::parse("").is_none());
    }

    #[test]
    fn test_month_field_expr() {
        let unit = TimeUnit::parse("month").unwrap();
        assert_eq!(
            unit.field_expr("date"),
            r#"datetime(2012, month(datum["date"]), 1, 0, 0, 0, 0)"#
        );
    }

    #[test]
    fn test_utc_yearmonth_field_expr() {
        let unit = TimeUnit::parse("utcyearmonth").unwrap();
        assert_eq!(
            unit.field_expr("t"),
            r#"utc(utcyear(datum["t"]), utcmonth(datum["t"]), 1, 0, 0, 0, 0)"#
        );
    }
}
