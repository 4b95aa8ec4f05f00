use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use rrule::{RRule, Unvalidated};
use tracing::debug;

use super::models::{Occurrence, RecurrenceRule, Window};

/// Expand a recurring event into concrete occurrences inside the window.
///
/// The rule has already been reduced to its recognized parts; if nothing
/// survived, or the evaluator rejects the combination, the component
/// contributes zero occurrences. Both outcomes are recoverable per-component
/// conditions, never an error. Occurrence starts are enumerated in UTC
/// within the inclusive window; each occurrence keeps the original event's
/// duration and is emitted in the reference zone.
pub fn expand(
    title: &str,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    rule: &RecurrenceRule,
    window: &Window,
    tz: Tz,
) -> Vec<Occurrence> {
    if rule.is_empty() {
        return Vec::new();
    }

    let rule_text = rule.to_rule_string();
    let unvalidated = match rule_text.parse::<RRule<Unvalidated>>() {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(rule = %rule_text, error = %e, "unparseable recurrence rule, skipping component");
            return Vec::new();
        }
    };

    let dtstart = start.with_timezone(&rrule::Tz::UTC);
    let set = match unvalidated.build(dtstart) {
        Ok(set) => set,
        Err(e) => {
            debug!(rule = %rule_text, error = %e, "invalid recurrence rule combination, skipping component");
            return Vec::new();
        }
    };

    let window_start = window.start.with_timezone(&rrule::Tz::UTC);
    let window_end = window.end.with_timezone(&rrule::Tz::UTC);

    // Bounds are widened by a second and re-checked below so occurrences
    // landing exactly on a window edge are kept
    let set = set
        .after(window_start - Duration::seconds(1))
        .before(window_end + Duration::seconds(1));

    let duration = end - start;
    set.all(u16::MAX)
        .dates
        .into_iter()
        .filter(|occurrence| *occurrence >= window_start && *occurrence <= window_end)
        .map(|occurrence| {
            let occurrence_start = occurrence.with_timezone(&tz);
            Occurrence {
                title: title.to_string(),
                start: occurrence_start,
                end: occurrence_start + duration,
            }
        })
        .collect()
}
