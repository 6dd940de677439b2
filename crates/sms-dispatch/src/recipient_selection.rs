//! Recipient candidate selection from exported customer sale records.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dispatch_request::normalize_phone_number;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSaleRecord {
    pub id: i64,
    #[serde(rename = "customer_flg", default)]
    pub flag: Option<String>,
    pub sale_date: NaiveDate,
    #[serde(rename = "customer_name", default)]
    pub name: String,
    #[serde(rename = "customer_phone1", default)]
    pub phone1: Option<String>,
    #[serde(rename = "customer_phone2", default)]
    pub phone2: Option<String>,
    #[serde(rename = "customer_amount", default)]
    pub amount: i64,
    #[serde(rename = "customer_item", default)]
    pub item: Option<String>,
    #[serde(rename = "customer_address", default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientFilter {
    pub sale_date_from: Option<NaiveDate>,
    pub sale_date_to: Option<NaiveDate>,
    pub min_amount: Option<i64>,
    pub flag: Option<String>,
    pub name_contains: Option<String>,
    pub phone_contains: Option<String>,
}

impl RecipientFilter {
    pub fn matches(&self, record: &CustomerSaleRecord) -> bool {
        if self
            .sale_date_from
            .is_some_and(|from| record.sale_date < from)
        {
            return false;
        }
        if self.sale_date_to.is_some_and(|to| record.sale_date > to) {
            return false;
        }
        if self
            .min_amount
            .is_some_and(|min_amount| record.amount < min_amount)
        {
            return false;
        }
        if let Some(flag) = non_blank(self.flag.as_deref()) {
            if record.flag.as_deref().map(str::trim) != Some(flag) {
                return false;
            }
        }
        if let Some(name) = non_blank(self.name_contains.as_deref()) {
            if !contains_ignore_case(&record.name, name) {
                return false;
            }
        }
        if let Some(phone) = non_blank(self.phone_contains.as_deref()) {
            let needle = normalize_phone_number(phone);
            let hit = [record.phone1.as_deref(), record.phone2.as_deref()]
                .into_iter()
                .flatten()
                .any(|candidate| normalize_phone_number(candidate).contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Returns matching records, newest sale first and larger amounts first within a day.
pub fn filter_customer_records<'a>(
    records: &'a [CustomerSaleRecord],
    filter: &RecipientFilter,
) -> Vec<&'a CustomerSaleRecord> {
    let mut selected: Vec<&CustomerSaleRecord> = records
        .iter()
        .filter(|record| filter.matches(record))
        .collect();
    selected.sort_by(|left, right| {
        right
            .sale_date
            .cmp(&left.sale_date)
            .then_with(|| right.amount.cmp(&left.amount))
    });
    selected
}

/// Normalized primary phone numbers of the matching records, in selection order.
pub fn select_recipient_phones(
    records: &[CustomerSaleRecord],
    filter: &RecipientFilter,
) -> Vec<String> {
    filter_customer_records(records, filter)
        .into_iter()
        .filter_map(|record| record.phone1.as_deref())
        .map(normalize_phone_number)
        .filter(|phone| !phone.is_empty())
        .collect()
}

pub fn load_customer_records(path: &Path) -> Result<Vec<CustomerSaleRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read customer records {}", path.display()))?;
    serde_json::from_str::<Vec<CustomerSaleRecord>>(&raw)
        .with_context(|| format!("failed to parse customer records {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    fn record(id: i64, sale_date: &str, name: &str, phone1: &str, amount: i64) -> CustomerSaleRecord {
        CustomerSaleRecord {
            id,
            flag: Some("Y".to_string()),
            sale_date: date(sale_date),
            name: name.to_string(),
            phone1: Some(phone1.to_string()),
            phone2: None,
            amount,
            item: None,
            address: None,
        }
    }

    fn fixture() -> Vec<CustomerSaleRecord> {
        vec![
            record(1, "2024-03-01", "Kim Minsu", "010-1111-2222", 50_000),
            record(2, "2024-03-05", "Lee Jiwoo", "010-3333-4444", 120_000),
            record(3, "2024-03-05", "Park Kim", "010-5555-6666", 300_000),
            CustomerSaleRecord {
                flag: Some("N".to_string()),
                ..record(4, "2024-02-20", "Choi Yuna", " ", 900_000)
            },
        ]
    }

    #[test]
    fn unit_filter_orders_by_date_then_amount_descending() {
        let records = fixture();
        let ids: Vec<i64> = filter_customer_records(&records, &RecipientFilter::default())
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn unit_filter_applies_inclusive_date_range_and_min_amount() {
        let records = fixture();
        let filter = RecipientFilter {
            sale_date_from: Some(date("2024-03-01")),
            sale_date_to: Some(date("2024-03-05")),
            min_amount: Some(100_000),
            ..RecipientFilter::default()
        };
        let ids: Vec<i64> = filter_customer_records(&records, &filter)
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn unit_filter_matches_name_case_insensitively_and_phone_substring() {
        let records = fixture();
        let by_name = RecipientFilter {
            name_contains: Some("kim".to_string()),
            ..RecipientFilter::default()
        };
        assert_eq!(select_recipient_phones(&records, &by_name), vec!["01055556666", "01011112222"]);

        let by_phone = RecipientFilter {
            phone_contains: Some("3333-4".to_string()),
            ..RecipientFilter::default()
        };
        assert_eq!(select_recipient_phones(&records, &by_phone), vec!["01033334444"]);
    }

    #[test]
    fn unit_select_recipient_phones_skips_blank_numbers_and_filters_flag() {
        let records = fixture();
        let all = select_recipient_phones(&records, &RecipientFilter::default());
        assert_eq!(all.len(), 3);

        let flagged_n = RecipientFilter {
            flag: Some("N".to_string()),
            ..RecipientFilter::default()
        };
        assert!(select_recipient_phones(&records, &flagged_n).is_empty());
    }

    #[test]
    fn functional_load_customer_records_reads_exported_columns() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("customer_sales.json");
        let exported = json!([
            {
                "id": 7,
                "customer_flg": "Y",
                "sale_date": "2024-04-02",
                "customer_name": "Jung Hana",
                "customer_phone1": "010-7777-8888",
                "customer_phone2": null,
                "customer_amount": 75000,
                "customer_item": "gift set",
                "customer_address": "Seoul"
            }
        ]);
        std::fs::write(&path, exported.to_string()).expect("write records");

        let records = load_customer_records(&path).expect("load records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Jung Hana");
        assert_eq!(records[0].amount, 75_000);
        assert_eq!(records[0].sale_date, date("2024-04-02"));
    }

    #[test]
    fn regression_load_customer_records_reports_path_on_parse_failure() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{not json").expect("write");
        let error = load_customer_records(&path).expect_err("parse failure");
        assert!(format!("{error:#}").contains("broken.json"));
    }
}
