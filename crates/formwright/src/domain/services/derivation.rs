//! Derivation Engine
//!
//! Computes derived field values from a snapshot. A single derived field is
//! evaluated by [`DerivationEngine::compute_one`]; [`DerivationEngine::recompute_all`]
//! repeats passes over every derived field until nothing changes or the pass
//! budget (`derived count + 2`) runs out, so cyclic references terminate.
//!
//! Evaluation never fails: a broken formula, a missing parent or an
//! unparsable date degrades the field to the empty string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use super::formula::{Environment, Formula, FormulaError, Value};
use crate::domain::aggregates::DerivedField;
use crate::domain::value_objects::{BuiltIn, FieldValue, Snapshot};

/// Mean Gregorian year in milliseconds (365.25 days)
pub const MS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0 * 1000.0;

static ISO_DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static pattern"));

/// Source of the evaluation instant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(instant) => *instant,
        }
    }
}

/// Result of a full recomputation
#[derive(Clone, Debug, PartialEq)]
pub struct RecomputeOutcome {
    pub snapshot: Snapshot,
    /// Passes actually run
    pub passes: usize,
    /// False when the budget ran out before a pass changed nothing
    pub converged: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DerivationEngine {
    clock: Clock,
}

impl DerivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// Engine that evaluates every formula at `instant`
    pub fn fixed_at(instant: DateTime<Utc>) -> Self {
        Self::with_clock(Clock::Fixed(instant))
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Value of one derived field given the current snapshot
    pub fn compute_one(&self, field: &DerivedField, snapshot: &Snapshot) -> FieldValue {
        compute_at(field, snapshot, self.clock.now())
    }

    /// Recompute every derived field until a fixed point or the pass budget
    pub fn recompute_all<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a DerivedField>,
        snapshot: &Snapshot,
    ) -> Snapshot {
        self.recompute_all_traced(fields, snapshot).snapshot
    }

    /// Like [`recompute_all`](Self::recompute_all), also reporting pass count
    /// and whether a fixed point was reached.
    pub fn recompute_all_traced<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a DerivedField>,
        snapshot: &Snapshot,
    ) -> RecomputeOutcome {
        let fields: Vec<&DerivedField> = fields.into_iter().collect();
        // One instant for the whole run, so `now` alone never makes a pass differ
        let instant = self.clock.now();
        let budget = fields.len() + 2;

        let mut current = snapshot.clone();
        for pass in 1..=budget {
            let mut next = current.clone();
            let mut changed = false;
            for field in &fields {
                let value = compute_at(field, &current, instant);
                if current.get(field.id.as_str()) != Some(&value) {
                    changed = true;
                }
                next.set(field.id.clone(), value);
            }
            current = next;

            if !changed {
                return RecomputeOutcome {
                    snapshot: current,
                    passes: pass,
                    converged: true,
                };
            }
        }

        tracing::debug!(
            fields = fields.len(),
            passes = budget,
            "derived values did not settle within the pass budget"
        );
        RecomputeOutcome {
            snapshot: current,
            passes: budget,
            converged: false,
        }
    }
}

fn compute_at(field: &DerivedField, snapshot: &Snapshot, now: DateTime<Utc>) -> FieldValue {
    match field.built_in {
        Some(BuiltIn::AgeFromDob) => age_from_dob(field, snapshot, now),
        Some(BuiltIn::Concat) => FieldValue::Text(
            field
                .parents_excluding_self()
                .map(|p| snapshot.value_or_empty(p.as_str()).to_display_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        None => match field.formula.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => {
                evaluate_formula(field, source, snapshot, now).unwrap_or_else(|e| {
                    tracing::warn!(
                        field = %field.id,
                        formula = source,
                        error = %e,
                        "derived field evaluation failed"
                    );
                    FieldValue::empty_text()
                })
            }
            _ => FieldValue::empty_text(),
        },
    }
}

fn age_from_dob(field: &DerivedField, snapshot: &Snapshot, now: DateTime<Utc>) -> FieldValue {
    let Some(parent) = field.parents_excluding_self().next() else {
        return FieldValue::empty_text();
    };
    let value = snapshot.value_or_empty(parent.as_str());
    if value.is_blank() {
        return FieldValue::empty_text();
    }
    match parse_date(&value) {
        Some(born) => {
            let elapsed = (now - born).num_milliseconds() as f64;
            FieldValue::Number((elapsed / MS_PER_YEAR).floor())
        }
        None => FieldValue::empty_text(),
    }
}

fn evaluate_formula(
    field: &DerivedField,
    source: &str,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) -> Result<FieldValue, FormulaError> {
    let formula = Formula::parse(source)?;

    let mut env = Environment::new();
    env.bind("now", Value::Number(now.timestamp_millis() as f64));
    for parent in field.parents_excluding_self() {
        env.bind(
            parent.as_str(),
            coerce(&snapshot.value_or_empty(parent.as_str())),
        );
    }

    Ok(match formula.evaluate(&env)? {
        Value::Number(n) => FieldValue::Number(n),
        Value::Text(s) => FieldValue::Text(s),
        Value::Bool(b) => FieldValue::Text(b.to_string()),
    })
}

/// Bind a parent value for formula use: ISO dates become epoch
/// milliseconds, numeric strings become numbers and blank values become `0`.
/// Anything else stays text.
fn coerce(value: &FieldValue) -> Value {
    if let FieldValue::Number(n) = value {
        return Value::Number(*n);
    }
    if let FieldValue::Text(s) = value {
        if ISO_DATE_PREFIX.is_match(s) {
            if let Some(date) = parse_date(value) {
                return Value::Number(date.timestamp_millis() as f64);
            }
        }
    }

    let text = value.to_display_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Number(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(text),
    }
}

/// Epoch milliseconds, RFC 3339, or a calendar date with optional time (UTC)
fn parse_date(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Number(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
        FieldValue::Text(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_2024() -> DerivationEngine {
        DerivationEngine::fixed_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_age_from_dob() {
        let engine = june_2024();
        let age = DerivedField::with_id("age")
            .parents(["dob"])
            .built_in(BuiltIn::AgeFromDob);

        let snapshot: Snapshot = [("dob", "2000-01-01")].into_iter().collect();
        assert_eq!(engine.compute_one(&age, &snapshot), FieldValue::Number(24.0));

        // birthday later in the year has not happened yet
        let snapshot: Snapshot = [("dob", "2000-06-02T00:00:00Z")].into_iter().collect();
        assert_eq!(engine.compute_one(&age, &snapshot), FieldValue::Number(23.0));

        let millis = Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        let snapshot: Snapshot = [("dob", millis as f64)].into_iter().collect();
        assert_eq!(engine.compute_one(&age, &snapshot), FieldValue::Number(34.0));
    }

    #[test]
    fn test_age_degrades_to_empty() {
        let engine = june_2024();
        let age = DerivedField::with_id("age")
            .parents(["dob"])
            .built_in(BuiltIn::AgeFromDob);

        for snapshot in [
            Snapshot::new(),
            [("dob", "")].into_iter().collect(),
            [("dob", "not a date")].into_iter().collect(),
        ] {
            assert_eq!(engine.compute_one(&age, &snapshot), FieldValue::empty_text());
        }

        let orphan = DerivedField::with_id("age").built_in(BuiltIn::AgeFromDob);
        assert_eq!(engine.compute_one(&orphan, &Snapshot::new()), FieldValue::empty_text());
    }

    #[test]
    fn test_concat_in_declared_order() {
        let engine = DerivationEngine::new();
        let full = DerivedField::with_id("full")
            .parents(["a", "b"])
            .built_in(BuiltIn::Concat);
        let snapshot: Snapshot = [("a", "John"), ("b", "Doe")].into_iter().collect();
        assert_eq!(engine.compute_one(&full, &snapshot), FieldValue::text("John Doe"));

        let reversed = full.clone().parents(["b", "a", "missing"]);
        assert_eq!(engine.compute_one(&reversed, &snapshot), FieldValue::text("Doe John "));
    }

    #[test]
    fn test_formula_binds_parents() {
        let engine = june_2024();
        let total = DerivedField::with_id("total")
            .parents(["price", "qty"])
            .formula("price * qty");
        let snapshot: Snapshot = [("price", "2.5"), ("qty", "4")].into_iter().collect();
        assert_eq!(engine.compute_one(&total, &snapshot), FieldValue::Number(10.0));

        let days = DerivedField::with_id("days")
            .parents(["start"])
            .formula("floor((now - start) / 86400000)");
        let snapshot: Snapshot = [("start", "2024-05-01")].into_iter().collect();
        assert_eq!(engine.compute_one(&days, &snapshot), FieldValue::Number(31.0));

        let greeting = DerivedField::with_id("greeting")
            .parents(["name"])
            .formula("'Hello ' & name");
        let snapshot: Snapshot = [("name", "Ada")].into_iter().collect();
        assert_eq!(engine.compute_one(&greeting, &snapshot), FieldValue::text("Hello Ada"));

        // blank and missing parents count as zero
        let sum = DerivedField::with_id("sum").parents(["a", "b", "c"]).formula("a + b + c");
        let snapshot: Snapshot = [("a", "5"), ("b", "  ")].into_iter().collect();
        assert_eq!(engine.compute_one(&sum, &snapshot), FieldValue::Number(5.0));
        let snapshot: Snapshot = [("price", "2.5"), ("qty", "")].into_iter().collect();
        assert_eq!(engine.compute_one(&total, &snapshot), FieldValue::Number(0.0));
        let picked = DerivedField::with_id("picked").parents(["tags"]).formula("tags * 2");
        let snapshot: Snapshot = [("tags", FieldValue::List(vec![]))].into_iter().collect();
        assert_eq!(engine.compute_one(&picked, &snapshot), FieldValue::Number(0.0));

        let adult = DerivedField::with_id("adult")
            .parents(["age"])
            .formula("age >= 18");
        let snapshot: Snapshot = [("age", 20.0)].into_iter().collect();
        assert_eq!(engine.compute_one(&adult, &snapshot), FieldValue::text("true"));
    }

    #[test]
    fn test_formula_failures_are_swallowed() {
        let engine = DerivationEngine::new();
        let snapshot: Snapshot = [("a", "text")].into_iter().collect();

        for source in ["a * 2", "undeclared + 1", "1 +", "1 / 0", "exec('rm')"] {
            let field = DerivedField::with_id("d").parents(["a"]).formula(source);
            assert_eq!(engine.compute_one(&field, &snapshot), FieldValue::empty_text());
        }

        let blank = DerivedField::with_id("d").formula("   ");
        assert_eq!(engine.compute_one(&blank, &snapshot), FieldValue::empty_text());

        let mut nothing = DerivedField::with_id("d");
        nothing.formula = None;
        assert_eq!(engine.compute_one(&nothing, &snapshot), FieldValue::empty_text());
    }

    #[test]
    fn test_oversized_formula_degrades_to_empty() {
        let engine = DerivationEngine::new();
        let snapshot = Snapshot::new();

        let long_sum = DerivedField::with_id("d").formula(vec!["1"; 10_000].join(" + "));
        assert_eq!(engine.compute_one(&long_sum, &snapshot), FieldValue::empty_text());

        let negations = DerivedField::with_id("d").formula(format!("{}1", "-".repeat(10_000)));
        assert_eq!(engine.compute_one(&negations, &snapshot), FieldValue::empty_text());

        let nots = DerivedField::with_id("d").formula(format!("{}1", "not ".repeat(10_000)));
        assert_eq!(engine.compute_one(&nots, &snapshot), FieldValue::empty_text());

        let parens = DerivedField::with_id("d")
            .formula(format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)));
        assert_eq!(engine.compute_one(&parens, &snapshot), FieldValue::empty_text());
    }

    #[test]
    fn test_self_reference_is_ignored() {
        let engine = DerivationEngine::new();
        let field = DerivedField::with_id("d").parents(["d"]).formula("d + 1");
        let snapshot: Snapshot = [("d", 1.0)].into_iter().collect();
        // `d` is not bound, so the formula fails instead of feeding on itself
        assert_eq!(engine.compute_one(&field, &snapshot), FieldValue::empty_text());
    }

    #[test]
    fn test_fixed_point_convergence() {
        let engine = DerivationEngine::new();
        let fields = [
            DerivedField::with_id("d1").parents(["d2"]).formula("d2 + 1"),
            DerivedField::with_id("d2").formula("3"),
        ];

        let starts: [Snapshot; 3] = [
            Snapshot::new(),
            [("d1", 100.0), ("d2", -7.0)].into_iter().collect(),
            [("d1", "x"), ("d2", "y")].into_iter().collect(),
        ];
        for start in starts {
            let outcome = engine.recompute_all_traced(&fields, &start);
            assert!(outcome.converged);
            assert!(outcome.passes <= fields.len() + 2);
            assert_eq!(outcome.snapshot.get("d1"), Some(&FieldValue::Number(4.0)));
            assert_eq!(outcome.snapshot.get("d2"), Some(&FieldValue::Number(3.0)));
        }
    }

    #[test]
    fn test_passes_read_previous_snapshot() {
        let engine = DerivationEngine::new();
        // d1 is listed first but depends on d2, so it lags one pass behind
        let fields = [
            DerivedField::with_id("d1").parents(["d2"]).formula("d2 * 10"),
            DerivedField::with_id("d2").parents(["x"]).formula("x + 1"),
        ];
        let start: Snapshot = [("x", 1.0)].into_iter().collect();

        let outcome = engine.recompute_all_traced(&fields, &start);
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.snapshot.get("d1"), Some(&FieldValue::Number(20.0)));
        assert_eq!(outcome.snapshot.get("x"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn test_cycle_terminates_within_budget() {
        let engine = DerivationEngine::new();
        let fields = [
            DerivedField::with_id("a").parents(["b"]).formula("b + 1"),
            DerivedField::with_id("b").parents(["a"]).formula("a + 1"),
        ];
        let start: Snapshot = [("a", 0.0), ("b", 0.0)].into_iter().collect();

        let first = engine.recompute_all_traced(&fields, &start);
        assert!(!first.converged);
        assert_eq!(first.passes, 4);
        assert_eq!(first.snapshot.get("a"), Some(&FieldValue::Number(4.0)));
        assert_eq!(first.snapshot.get("b"), Some(&FieldValue::Number(4.0)));

        // deterministic
        let second = engine.recompute_all(&fields, &start);
        assert_eq!(second, first.snapshot);
    }
}
