//! Workforce statistics.
//!
//! Pure functions over a [`DatasetAccessor`]. Averages return `0.0` when no
//! record carries a valid value for the field.

use super::accessor::{DatasetAccessor, Direction, GroupCounts};
use super::record::{Field, Record};

/// Number of records flagged active.
pub fn count_active_users(acc: &DatasetAccessor<'_>) -> usize {
    acc.count(Record::is_active)
}

pub fn count_by_org_role(acc: &DatasetAccessor<'_>) -> GroupCounts {
    acc.group_count(Field::OrgRole)
}

pub fn count_by_race(acc: &DatasetAccessor<'_>) -> GroupCounts {
    acc.group_count(Field::Race)
}

pub fn count_by_education_level(acc: &DatasetAccessor<'_>) -> GroupCounts {
    acc.group_count(Field::EducationLevel)
}

pub fn count_by_trade_specialty(acc: &DatasetAccessor<'_>) -> GroupCounts {
    acc.group_count(Field::TradeSpecialty)
}

pub fn count_by_gender(acc: &DatasetAccessor<'_>) -> GroupCounts {
    acc.group_count(Field::Gender)
}

/// Sum of all valid hours-worked values.
pub fn total_hours_worked(acc: &DatasetAccessor<'_>) -> f64 {
    acc.numeric_values(Field::HoursWorked).iter().sum()
}

pub fn average_hours_worked(acc: &DatasetAccessor<'_>) -> f64 {
    mean(&acc.numeric_values(Field::HoursWorked))
}

pub fn average_efficiency(acc: &DatasetAccessor<'_>) -> f64 {
    mean(&acc.numeric_values(Field::EfficiencyScore))
}

pub fn average_salary(acc: &DatasetAccessor<'_>) -> f64 {
    mean(&acc.numeric_values(Field::Salary))
}

pub fn average_wage(acc: &DatasetAccessor<'_>) -> f64 {
    mean(&acc.numeric_values(Field::Wage))
}

pub fn average_years_experience(acc: &DatasetAccessor<'_>) -> f64 {
    mean(&acc.numeric_values(Field::YearsExperience))
}

/// Records whose hours worked are strictly above/below `threshold`.
pub fn users_by_hours_worked<'a>(
    acc: &DatasetAccessor<'a>,
    threshold: f64,
    direction: Direction,
) -> Vec<&'a Record> {
    acc.filter_by_threshold(Field::HoursWorked, threshold, direction)
}

/// Records whose efficiency score is strictly above/below `threshold`.
pub fn users_by_efficiency<'a>(
    acc: &DatasetAccessor<'a>,
    threshold: f64,
    direction: Direction,
) -> Vec<&'a Record> {
    acc.filter_by_threshold(Field::EfficiencyScore, threshold, direction)
}

/// Full names of every record that has one, in record order.
pub fn list_full_names<'a>(acc: &DatasetAccessor<'a>) -> Vec<&'a str> {
    acc.texts(Field::FullName)
}

/// Full names of the given records; records without a name are skipped.
pub fn full_names<'a>(records: &[&'a Record]) -> Vec<&'a str> {
    records.iter().filter_map(|r| r.text(Field::FullName)).collect()
}

/// Arithmetic mean, `0.0` for an empty slice.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workforce::record::Dataset;

    fn person(name: &str) -> Record {
        Record {
            id: name.to_lowercase(),
            full_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn crew() -> Dataset {
        let mut ann = person("Ann");
        ann.active = Some("true".into());
        ann.gender = Some("F".into());
        ann.race = Some("Asian".into());
        ann.hours_worked = Some("10".into());
        ann.efficiency_score = Some("90".into());
        ann.salary = Some("50000".into());
        ann.years_experience = Some("4".into());

        let mut bob = person("Bob");
        bob.active = Some("false".into());
        bob.gender = Some("M".into());
        bob.hours_worked = Some("20".into());
        bob.efficiency_score = Some("70".into());
        bob.salary = Some("not disclosed".into());
        bob.wage = Some("22.50".into());

        let mut cat = person("Cat");
        cat.active = Some("true".into());
        cat.gender = Some("F".into());
        cat.race = Some("Black".into());
        cat.education_level = Some("Associate".into());
        cat.trade_specialty = Some("Electrical".into());
        cat.hours_worked = Some("30".into());
        cat.salary = Some("70000".into());
        cat.wage = Some("27.50".into());

        let mut anon = Record {
            id: "anon".into(),
            ..Default::default()
        };
        anon.hours_worked = Some("45".into());

        Dataset {
            name: "crew".into(),
            records: vec![ann, bob, cat, anon],
        }
    }

    #[test]
    fn test_active_count() {
        let ds = crew();
        assert_eq!(count_active_users(&DatasetAccessor::new(Some(&ds))), 2);
    }

    #[test]
    fn test_grouped_counts() {
        let ds = crew();
        let acc = DatasetAccessor::new(Some(&ds));
        assert_eq!(
            count_by_gender(&acc),
            vec![("F".to_string(), 2), ("M".to_string(), 1)]
        );
        assert_eq!(count_by_race(&acc).len(), 2);
        assert_eq!(count_by_education_level(&acc), vec![("Associate".to_string(), 1)]);
        assert_eq!(count_by_trade_specialty(&acc), vec![("Electrical".to_string(), 1)]);
        assert!(count_by_org_role(&acc).is_empty());
    }

    #[test]
    fn test_totals_and_averages() {
        let ds = crew();
        let acc = DatasetAccessor::new(Some(&ds));
        assert_eq!(total_hours_worked(&acc), 105.0);
        assert_eq!(average_hours_worked(&acc), 26.25);
        assert_eq!(average_efficiency(&acc), 80.0);
        // "not disclosed" is excluded, not treated as zero
        assert_eq!(average_salary(&acc), 60000.0);
        assert_eq!(average_wage(&acc), 25.0);
        assert_eq!(average_years_experience(&acc), 4.0);
    }

    #[test]
    fn test_averages_are_zero_without_values() {
        let empty = Dataset::default();
        let acc = DatasetAccessor::new(Some(&empty));
        assert_eq!(average_hours_worked(&acc), 0.0);
        assert_eq!(average_wage(&DatasetAccessor::new(None)), 0.0);
        assert!(!average_salary(&acc).is_nan());
    }

    #[test]
    fn test_threshold_lookups_and_names() {
        let ds = crew();
        let acc = DatasetAccessor::new(Some(&ds));

        let busy = users_by_hours_worked(&acc, 20.0, Direction::Greater);
        // "anon" matches but has no name to list
        assert_eq!(busy.len(), 2);
        assert_eq!(full_names(&busy), vec!["Cat"]);

        let slow = users_by_efficiency(&acc, 90.0, Direction::Less);
        assert_eq!(full_names(&slow), vec!["Bob"]);

        assert_eq!(list_full_names(&acc), vec!["Ann", "Bob", "Cat"]);
    }
}
