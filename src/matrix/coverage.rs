//! Concept list vs. matrix coverage

use crate::graph::ConceptId;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Comparison of an expected concept list with a matrix's labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Listed concepts the matrix has, in list order
    pub in_both: Vec<String>,
    /// Listed concepts the matrix lacks, in list order
    pub only_in_list: Vec<String>,
    /// Matrix labels the list does not mention, in matrix order
    pub only_in_matrix: Vec<String>,
}

/// Ids compare by value so `0138875005` and `138875005` match
fn key(label: &str) -> String {
    let label = label.trim();
    label
        .parse::<ConceptId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|_| label.to_string())
}

impl CoverageReport {
    pub fn compute<A: AsRef<str>, B: AsRef<str>>(list: &[A], matrix_labels: &[B]) -> Self {
        let listed: HashSet<String> = list.iter().map(|l| key(l.as_ref())).collect();
        let present: HashSet<String> = matrix_labels.iter().map(|l| key(l.as_ref())).collect();

        let (in_both, only_in_list) = list
            .iter()
            .map(|l| l.as_ref().trim().to_string())
            .partition(|l| present.contains(&key(l)));
        let only_in_matrix = matrix_labels
            .iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !listed.contains(&key(l)))
            .collect();

        Self {
            in_both,
            only_in_list,
            only_in_matrix,
        }
    }

    /// Percentage of the list present in the matrix
    pub fn coverage(&self) -> f64 {
        let total = self.in_both.len() + self.only_in_list.len();
        if total == 0 {
            return 100.0;
        }
        100.0 * self.in_both.len() as f64 / total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.only_in_list.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "in both:           {}", self.in_both.len())?;
        writeln!(f, "only in list:      {}", self.only_in_list.len())?;
        writeln!(f, "only in matrix:    {}", self.only_in_matrix.len())?;
        write!(f, "coverage:          {:.2}%", self.coverage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_split() {
        let list = ["22298006", "73211009", "38341003"];
        let labels = ["073211009", "22298006", "44054006"];
        let report = CoverageReport::compute(&list, &labels);

        assert_eq!(report.in_both, vec!["22298006", "73211009"]);
        assert_eq!(report.only_in_list, vec!["38341003"]);
        assert_eq!(report.only_in_matrix, vec!["44054006"]);
        assert!((report.coverage() - 200.0 / 3.0).abs() < 1e-9);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_empty_list_is_fully_covered() {
        let report = CoverageReport::compute::<&str, &str>(&[], &["1"]);
        assert_eq!(report.coverage(), 100.0);
        assert!(report.is_complete());
        assert!(report.to_string().contains("coverage:          100.00%"));
    }
}
