//! Keyword-rule query engine for workforce questions.
//!
//! A question is lowercased and checked against [`RULES`] top to bottom. The
//! first rule with any keyword contained in the question wins; rule order is
//! the tie-break, so specific phrasings sit above general ones. Threshold
//! rules additionally need a direction phrase followed by an integer, and are
//! skipped when either is missing.
//!
//! Every answer is a single deterministic sentence. When nothing matches, or
//! no dataset was resolved, the engine answers with [`CAPABILITY_RESPONSE`].

use super::accessor::{DatasetAccessor, Direction, GroupCounts};
use super::record::Dataset;
use super::stats;

/// Fallback answer when no rule applies.
pub const CAPABILITY_RESPONSE: &str = "I can help with listing users if the API data is provided. \
For now, I can only list all users with the current data.";

// ─── Rules ──────────────────────────────────────────────────────────────────

/// Analytic operation selected by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ActiveCount,
    CountByRole,
    CountByRace,
    CountByEducation,
    CountByTrade,
    CountByGender,
    ListNames,
    TotalHours,
    AverageHours,
    AverageEfficiency,
    AverageSalary,
    AverageWage,
    AverageExperience,
    UsersByHours,
    UsersByEfficiency,
}

/// How a rule extracts its threshold from the question, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThresholdSyntax {
    None,
    /// `more than N` / `less than N`
    PhrasePair,
    /// `above N` / `below N`
    SingleToken,
}

/// One `(keywords, operation)` entry of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub operation: Operation,
    pub keywords: &'static [&'static str],
    threshold: ThresholdSyntax,
}

const fn rule(operation: Operation, keywords: &'static [&'static str]) -> Rule {
    Rule {
        operation,
        keywords,
        threshold: ThresholdSyntax::None,
    }
}

/// Rule table in priority order.
pub const RULES: &[Rule] = &[
    rule(
        Operation::ActiveCount,
        &[
            "how many active users",
            "number of active users",
            "count active employees",
            "how many active employees",
        ],
    ),
    rule(
        Operation::CountByRole,
        &[
            "how many users in each role",
            "count users by role",
            "users per role",
            "role breakdown",
        ],
    ),
    rule(
        Operation::CountByRace,
        &["how many users of each race", "count users by race", "racial breakdown"],
    ),
    rule(
        Operation::CountByEducation,
        &[
            "how many users by education level",
            "count users by education",
            "educational breakdown",
        ],
    ),
    rule(
        Operation::CountByTrade,
        &[
            "how many users by trade specialty",
            "count users by trade",
            "trade breakdown",
        ],
    ),
    rule(
        Operation::CountByGender,
        &["how many users by gender", "count users by gender", "gender breakdown"],
    ),
    rule(
        Operation::ListNames,
        &["list all users", "show me all employees", "list users", "list employees"],
    ),
    rule(Operation::TotalHours, &["total hours worked", "sum of hours"]),
    rule(Operation::AverageHours, &["average hours worked", "mean hours"]),
    rule(Operation::AverageEfficiency, &["average efficiency", "mean efficiency"]),
    rule(Operation::AverageSalary, &["average salary", "mean salary"]),
    rule(Operation::AverageWage, &["average wage", "mean wage"]),
    rule(
        Operation::AverageExperience,
        &[
            "average years of experience",
            "mean years of experience",
            "average experience",
        ],
    ),
    Rule {
        operation: Operation::UsersByHours,
        keywords: &["users who worked more than", "users who worked less than"],
        threshold: ThresholdSyntax::PhrasePair,
    },
    Rule {
        operation: Operation::UsersByEfficiency,
        keywords: &["users with efficiency above", "users with efficiency below"],
        threshold: ThresholdSyntax::SingleToken,
    },
];

/// Result of matching one rule against a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryMatch {
    pub operation: Operation,
    pub threshold: Option<i64>,
    pub direction: Option<Direction>,
}

impl Rule {
    /// Match this rule against an already-lowercased question.
    fn try_match(&self, query: &str) -> Option<QueryMatch> {
        if !self.keywords.iter().any(|kw| query.contains(kw)) {
            return None;
        }

        let (threshold, direction) = match self.threshold {
            ThresholdSyntax::None => (None, None),
            ThresholdSyntax::PhrasePair => {
                let (t, d) = extract_phrase_threshold(query)?;
                (Some(t), Some(d))
            }
            ThresholdSyntax::SingleToken => {
                let (t, d) = extract_token_threshold(query)?;
                (Some(t), Some(d))
            }
        };

        Some(QueryMatch {
            operation: self.operation,
            threshold,
            direction,
        })
    }
}

/// Find the first rule matching `query` (case-insensitive).
pub fn match_query(query: &str) -> Option<QueryMatch> {
    let lower = query.to_lowercase();
    RULES.iter().find_map(|rule| rule.try_match(&lower))
}

// ─── Threshold extraction ───────────────────────────────────────────────────

/// `... more than N ...` / `... less than N ...`; the first phrase found decides.
fn extract_phrase_threshold(query: &str) -> Option<(i64, Direction)> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    for (i, pair) in tokens.windows(2).enumerate() {
        let direction = match pair {
            ["more", "than"] => Direction::Greater,
            ["less", "than"] => Direction::Less,
            _ => continue,
        };
        let threshold = tokens.get(i + 2).and_then(|t| parse_threshold(t))?;
        return Some((threshold, direction));
    }
    None
}

/// `... above N ...` / `... below N ...`; `below` wins when both appear.
fn extract_token_threshold(query: &str) -> Option<(i64, Direction)> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let position = |word: &str| tokens.iter().position(|t| *t == word);

    let (index, direction) = match (position("above"), position("below")) {
        (_, Some(i)) => (i, Direction::Less),
        (Some(i), None) => (i, Direction::Greater),
        (None, None) => return None,
    };
    let threshold = tokens.get(index + 1).and_then(|t| parse_threshold(t))?;
    Some((threshold, direction))
}

/// Leading-integer parse: optional sign, then at least one digit. Anything
/// after the digits (`%`, `?`, `hrs`, a decimal part) is ignored.
fn parse_threshold(token: &str) -> Option<i64> {
    let (sign, rest) = match token.as_bytes().first() {
        Some(b'-') => (-1, &token[1..]),
        Some(b'+') => (1, &token[1..]),
        _ => (1, token),
    };
    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|v| sign * v)
}

// ─── Answering ──────────────────────────────────────────────────────────────

/// Answer a workforce question against the resolved dataset.
pub fn answer(query: &str, dataset: Option<&Dataset>) -> String {
    let Some(dataset) = dataset else {
        tracing::debug!("no dataset resolved, returning capability response");
        return CAPABILITY_RESPONSE.to_string();
    };

    match match_query(query) {
        Some(m) => {
            tracing::info!(
                operation = ?m.operation,
                threshold = ?m.threshold,
                direction = ?m.direction,
                dataset = %dataset.name,
                records = dataset.len(),
                "workforce rule matched"
            );
            execute(&m, &DatasetAccessor::new(Some(dataset)))
        }
        None => {
            tracing::debug!("no workforce rule matched");
            CAPABILITY_RESPONSE.to_string()
        }
    }
}

/// Run the matched operation and render its sentence.
pub fn execute(m: &QueryMatch, acc: &DatasetAccessor<'_>) -> String {
    match m.operation {
        Operation::ActiveCount => {
            format!("There are {} active users.", stats::count_active_users(acc))
        }
        Operation::CountByRole => format!(
            "Here is the breakdown of users by organization role: {}.",
            join_counts(&stats::count_by_org_role(acc))
        ),
        Operation::CountByRace => format!(
            "Here is the racial breakdown of users: {}.",
            join_counts(&stats::count_by_race(acc))
        ),
        Operation::CountByEducation => format!(
            "Here is the breakdown of users by education level: {}.",
            join_counts(&stats::count_by_education_level(acc))
        ),
        Operation::CountByTrade => format!(
            "Here is the breakdown of users by trade specialty: {}.",
            join_counts(&stats::count_by_trade_specialty(acc))
        ),
        Operation::CountByGender => format!(
            "Here is the breakdown of users by gender: {}.",
            join_counts(&stats::count_by_gender(acc))
        ),
        Operation::ListNames => format!(
            "Here is a list of all users: {}.",
            join_names(&stats::list_full_names(acc))
        ),
        Operation::TotalHours => format!(
            "The total hours worked by the workforce is {}.",
            format_integer(stats::total_hours_worked(acc))
        ),
        Operation::AverageHours => format!(
            "The average hours worked per user is {}.",
            format_two_decimals(stats::average_hours_worked(acc))
        ),
        Operation::AverageEfficiency => format!(
            "The average efficiency score is {}.",
            format_two_decimals(stats::average_efficiency(acc))
        ),
        Operation::AverageSalary => {
            format!(
                "The average salary is {}.",
                format_two_decimals(stats::average_salary(acc))
            )
        }
        Operation::AverageWage => format!(
            "The average wage is {}.",
            format_two_decimals(stats::average_wage(acc))
        ),
        Operation::AverageExperience => format!(
            "The average years of experience is {}.",
            format_two_decimals(stats::average_years_experience(acc))
        ),
        Operation::UsersByHours => {
            let (Some(threshold), Some(direction)) = (m.threshold, m.direction) else {
                return CAPABILITY_RESPONSE.to_string();
            };
            let users = stats::users_by_hours_worked(acc, threshold as f64, direction);
            let word = match direction {
                Direction::Greater => "more",
                Direction::Less => "less",
            };
            format!(
                "Users who worked {word} than {threshold} hours: {}.",
                join_names(&stats::full_names(&users))
            )
        }
        Operation::UsersByEfficiency => {
            let (Some(threshold), Some(direction)) = (m.threshold, m.direction) else {
                return CAPABILITY_RESPONSE.to_string();
            };
            let users = stats::users_by_efficiency(acc, threshold as f64, direction);
            let word = match direction {
                Direction::Greater => "above",
                Direction::Less => "below",
            };
            format!(
                "Users with efficiency {word} {threshold}%: {}.",
                join_names(&stats::full_names(&users))
            )
        }
    }
}

// ─── Formatting ─────────────────────────────────────────────────────────────

/// `a: 1, b: 2` or `None` when empty.
fn join_counts(counts: &GroupCounts) -> String {
    if counts.is_empty() {
        return "None".to_string();
    }
    counts
        .iter()
        .map(|(k, n)| format!("{k}: {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `a, b, c` or `None` when empty.
fn join_names(names: &[&str]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

/// Render a sum as an integer (rounded half away from zero).
fn format_integer(value: f64) -> String {
    format!("{}", value.round() as i64)
}

/// Two decimals with exact ties rounded away from zero.
///
/// A double lies exactly halfway between two hundredths only when it is an
/// odd multiple of 1/8; those values are nudged outward before formatting.
fn format_two_decimals(value: f64) -> String {
    let eighths = value * 8.0;
    let is_tie = eighths.fract() == 0.0 && eighths % 2.0 != 0.0;
    if is_tie {
        format!("{:.2}", value + 0.001_f64.copysign(value))
    } else {
        format!("{:.2}", value)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
