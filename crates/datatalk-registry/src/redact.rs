//! Privacy Mode's column redactor.
//!
//! The rule table mirrors the highest-confidence branch of a
//! name-hint-based PII classifier: match a column's (lowercased) name
//! against a short list of hint substrings before ever looking at
//! values. A `Catalog` carries no row samples, only schema and
//! aggregate stats, so hint matching against the name is the only signal
//! available here — stats are aggregate numbers, not raw values, and are
//! stripped from a redacted column regardless of whether the match was
//! right, since a mean/min/max can itself leak a rough value range for
//! a small table.

use datatalk_core::{Catalog, ColumnMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiCategory {
    Email,
    Phone,
    Ssn,
    CreditCard,
    Name,
}

impl PiiCategory {
    fn label(&self) -> &'static str {
        match self {
            PiiCategory::Email => "EMAIL",
            PiiCategory::Phone => "PHONE",
            PiiCategory::Ssn => "SSN",
            PiiCategory::CreditCard => "CREDIT_CARD",
            PiiCategory::Name => "NAME",
        }
    }

    fn hints(&self) -> &'static [&'static str] {
        match self {
            PiiCategory::Email => &["email", "e_mail", "mail_address"],
            PiiCategory::Phone => &["phone", "mobile", "telephone", "cell_number"],
            PiiCategory::Ssn => &["ssn", "social_security", "national_id"],
            PiiCategory::CreditCard => &["credit_card", "card_number", "cc_number", "pan"],
            PiiCategory::Name => &["full_name", "first_name", "last_name", "customer_name"],
        }
    }
}

const CATEGORIES: [PiiCategory; 5] = [
    PiiCategory::Email,
    PiiCategory::Phone,
    PiiCategory::Ssn,
    PiiCategory::CreditCard,
    PiiCategory::Name,
];

fn classify_column_name(name: &str) -> Option<PiiCategory> {
    let lowered = name.to_ascii_lowercase();
    CATEGORIES
        .into_iter()
        .find(|category| category.hints().iter().any(|hint| lowered.contains(hint)))
}

/// Return a copy of `catalog` with PII-hinting column names replaced by
/// `PII_<CATEGORY>_<n>` placeholders and their stats dropped. Columns
/// with no matching hint pass through unchanged.
pub fn redact(catalog: &Catalog) -> Catalog {
    let mut seen_counts: std::collections::HashMap<&'static str, usize> =
        std::collections::HashMap::new();

    let columns = catalog
        .columns
        .iter()
        .map(|column| match classify_column_name(&column.name) {
            Some(category) => {
                let count = seen_counts.entry(category.label()).or_insert(0);
                *count += 1;
                ColumnMeta {
                    name: format!("PII_{}_{}", category.label(), count),
                    logical_type: column.logical_type,
                    nullable: column.nullable,
                    stats: None,
                }
            }
            None => column.clone(),
        })
        .collect();

    Catalog {
        dataset_id: catalog.dataset_id.clone(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{ColumnStats, LogicalType};

    fn column(name: &str, stats: Option<ColumnStats>) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            logical_type: LogicalType::Text,
            nullable: true,
            stats,
        }
    }

    #[test]
    fn redacts_columns_matching_a_pii_hint() {
        let catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![
                column("customer_email", None),
                column("amount", Some(ColumnStats::default())),
            ],
        };
        let redacted = redact(&catalog);
        assert_eq!(redacted.columns[0].name, "PII_EMAIL_1");
        assert!(redacted.columns[0].stats.is_none());
        assert_eq!(redacted.columns[1].name, "amount");
    }

    #[test]
    fn numbers_repeated_categories_independently() {
        let catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![
                column("home_phone", None),
                column("mobile_number", None),
            ],
        };
        let redacted = redact(&catalog);
        assert_eq!(redacted.columns[0].name, "PII_PHONE_1");
        assert_eq!(redacted.columns[1].name, "PII_PHONE_2");
    }

    #[test]
    fn strips_stats_even_on_a_credit_card_hinted_column() {
        let catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![column(
                "cc_number",
                Some(ColumnStats {
                    mean: Some(1.0),
                    ..Default::default()
                }),
            )],
        };
        let redacted = redact(&catalog);
        assert!(redacted.columns[0].stats.is_none());
        assert_eq!(redacted.columns[0].name, "PII_CREDIT_CARD_1");
    }

    #[test]
    fn leaves_unmatched_columns_untouched() {
        let catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![column("region", None)],
        };
        let redacted = redact(&catalog);
        assert_eq!(redacted.columns[0].name, "region");
    }
}
