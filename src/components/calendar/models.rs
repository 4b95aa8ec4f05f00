use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// A calendar timestamp as it appears in the feed, before normalization.
///
/// The three variants correspond to the three normalization rules: date-only
/// values become local midnight, floating values are read as UTC, and zoned
/// values convert directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStamp {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

/// One recognized RRULE part with its raw (comma-joined) value.
///
/// Parts outside this set are rejected when the rule text is parsed, so a
/// malformed feed cannot inject unknown keys into the expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePart {
    Freq(String),
    Until(String),
    Count(String),
    Interval(String),
    BySecond(String),
    ByMinute(String),
    ByHour(String),
    ByDay(String),
    ByMonthDay(String),
    ByYearDay(String),
    ByWeekNo(String),
    ByMonth(String),
    BySetPos(String),
    Wkst(String),
}

impl RulePart {
    /// Build a part from a `NAME=VALUE` pair, rejecting unrecognized names
    pub fn from_pair(name: &str, value: &str) -> Option<Self> {
        let value = value.to_string();
        match name.to_ascii_uppercase().as_str() {
            "FREQ" => Some(RulePart::Freq(value)),
            "UNTIL" => Some(RulePart::Until(value)),
            "COUNT" => Some(RulePart::Count(value)),
            "INTERVAL" => Some(RulePart::Interval(value)),
            "BYSECOND" => Some(RulePart::BySecond(value)),
            "BYMINUTE" => Some(RulePart::ByMinute(value)),
            "BYHOUR" => Some(RulePart::ByHour(value)),
            "BYDAY" => Some(RulePart::ByDay(value)),
            "BYMONTHDAY" => Some(RulePart::ByMonthDay(value)),
            "BYYEARDAY" => Some(RulePart::ByYearDay(value)),
            "BYWEEKNO" => Some(RulePart::ByWeekNo(value)),
            "BYMONTH" => Some(RulePart::ByMonth(value)),
            "BYSETPOS" => Some(RulePart::BySetPos(value)),
            "WKST" => Some(RulePart::Wkst(value)),
            _ => None,
        }
    }

    /// Canonical part name
    pub fn name(&self) -> &'static str {
        match self {
            RulePart::Freq(_) => "FREQ",
            RulePart::Until(_) => "UNTIL",
            RulePart::Count(_) => "COUNT",
            RulePart::Interval(_) => "INTERVAL",
            RulePart::BySecond(_) => "BYSECOND",
            RulePart::ByMinute(_) => "BYMINUTE",
            RulePart::ByHour(_) => "BYHOUR",
            RulePart::ByDay(_) => "BYDAY",
            RulePart::ByMonthDay(_) => "BYMONTHDAY",
            RulePart::ByYearDay(_) => "BYYEARDAY",
            RulePart::ByWeekNo(_) => "BYWEEKNO",
            RulePart::ByMonth(_) => "BYMONTH",
            RulePart::BySetPos(_) => "BYSETPOS",
            RulePart::Wkst(_) => "WKST",
        }
    }

    /// Raw value text
    pub fn value(&self) -> &str {
        match self {
            RulePart::Freq(v)
            | RulePart::Until(v)
            | RulePart::Count(v)
            | RulePart::Interval(v)
            | RulePart::BySecond(v)
            | RulePart::ByMinute(v)
            | RulePart::ByHour(v)
            | RulePart::ByDay(v)
            | RulePart::ByMonthDay(v)
            | RulePart::ByYearDay(v)
            | RulePart::ByWeekNo(v)
            | RulePart::ByMonth(v)
            | RulePart::BySetPos(v)
            | RulePart::Wkst(v) => v,
        }
    }
}

/// A recurrence rule reduced to its recognized parts, in feed order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceRule {
    parts: Vec<RulePart>,
}

impl RecurrenceRule {
    /// Parse RRULE text (`FREQ=DAILY;COUNT=5`), dropping unrecognized or
    /// malformed parts without error
    pub fn parse(raw: &str) -> Self {
        let parts = raw
            .split(';')
            .filter_map(|part| {
                let (name, value) = part.split_once('=')?;
                RulePart::from_pair(name.trim(), value.trim())
            })
            .collect();
        Self { parts }
    }

    /// True when no recognized parts survived
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[RulePart] {
        &self.parts
    }

    /// Reassemble the filtered rule as RRULE content text
    pub fn to_rule_string(&self) -> String {
        self.parts
            .iter()
            .map(|p| format!("{}={}", p.name(), p.value()))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// One VEVENT as extracted from the feed
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub title: String,
    pub start: EventStamp,
    pub end: Option<EventStamp>,
    pub rule: Option<RecurrenceRule>,
}

/// One concrete event instance in the reference zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Occurrence {
    /// Render to the output shape with RFC 3339 instants
    pub fn to_entry(&self) -> EventEntry {
        EventEntry {
            title: self.title.clone(),
            start: self.start.to_rfc3339(),
            end: self.end.to_rfc3339(),
        }
    }
}

/// The unit ultimately returned to the report assembler
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EventEntry {
    pub title: String,
    pub start: String,
    pub end: String,
}

/// Caller-supplied resolution interval, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_parse_keeps_recognized_parts_in_order() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,WE;COUNT=10");
        assert_eq!(
            rule.parts(),
            &[
                RulePart::Freq("WEEKLY".to_string()),
                RulePart::ByDay("MO,WE".to_string()),
                RulePart::Count("10".to_string()),
            ]
        );
        assert_eq!(rule.to_rule_string(), "FREQ=WEEKLY;BYDAY=MO,WE;COUNT=10");
    }

    #[test]
    fn rule_parse_drops_unknown_parts() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;X-EVIL=1;RSVP=TRUE");
        assert_eq!(rule.to_rule_string(), "FREQ=DAILY");
    }

    #[test]
    fn rule_parse_is_case_insensitive_on_names() {
        let rule = RecurrenceRule::parse("freq=daily;count=3");
        assert_eq!(rule.to_rule_string(), "FREQ=daily;COUNT=3");
    }

    #[test]
    fn rule_with_only_unknown_parts_is_empty() {
        let rule = RecurrenceRule::parse("BOGUS=1;ALSOBAD=2");
        assert!(rule.is_empty());
    }

    #[test]
    fn rule_parse_drops_parts_without_equals() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;GARBAGE");
        assert_eq!(rule.to_rule_string(), "FREQ=DAILY");
    }

    #[test]
    fn empty_rule_text_yields_empty_rule() {
        assert!(RecurrenceRule::parse("").is_empty());
    }
}
