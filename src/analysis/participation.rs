//! Rep x queue participation matrix.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Weights keyed by rep name, then queue name. Absent cells read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipationMatrix {
    weights: BTreeMap<String, BTreeMap<String, i64>>,
}

impl ParticipationMatrix {
    /// Record `rep`'s weight in `queue`. A later insert for the same cell wins.
    pub fn insert(&mut self, rep: &str, queue: &str, weight: i64) {
        self.weights
            .entry(rep.to_string())
            .or_default()
            .insert(queue.to_string(), weight);
    }

    pub fn weight(&self, rep: &str, queue: &str) -> i64 {
        self.weights
            .get(rep)
            .and_then(|row| row.get(queue))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains_rep(&self, rep: &str) -> bool {
        self.weights.contains_key(rep)
    }

    #[cfg(test)]
    pub fn contains_queue(&self, queue: &str) -> bool {
        self.weights.values().any(|row| row.contains_key(queue))
    }

    /// Queue names `rep` has a cell for.
    pub fn queues_for<'a>(&'a self, rep: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.weights
            .get(rep)
            .into_iter()
            .flat_map(|row| row.keys().map(String::as_str))
    }

    pub fn remove_rep(&mut self, rep: &str) {
        self.weights.remove(rep);
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sales view: reps with a non-zero total across `queues`.
    pub fn sales_table(&self, queues: &[String]) -> ParticipationTable {
        self.table(queues, |_, row| row.iter().sum::<i64>() > 0)
    }

    /// CS view: only reps in `cs_users`.
    pub fn cs_table(&self, queues: &[String], cs_users: &BTreeSet<String>) -> ParticipationTable {
        self.table(queues, |rep, _| cs_users.contains(rep))
    }

    /// Project the matrix onto `queues`, keeping rows accepted by `keep`.
    ///
    /// Columns are reordered by descending column total; equal totals keep
    /// the order of `queues`.
    pub fn table<F>(&self, queues: &[String], keep: F) -> ParticipationTable
    where
        F: Fn(&str, &[i64]) -> bool,
    {
        let rows: Vec<ParticipationRow> = self
            .weights
            .keys()
            .map(|rep| ParticipationRow {
                rep: rep.clone(),
                weights: queues.iter().map(|q| self.weight(rep, q)).collect(),
            })
            .filter(|row| keep(&row.rep, &row.weights))
            .collect();

        let mut columns: Vec<(usize, i64)> = (0..queues.len())
            .map(|i| (i, rows.iter().map(|r| r.weights[i]).sum()))
            .collect();
        columns.sort_by_key(|(_, total)| std::cmp::Reverse(*total));

        ParticipationTable {
            queues: columns.iter().map(|(i, _)| queues[*i].clone()).collect(),
            rows: rows
                .into_iter()
                .map(|row| ParticipationRow {
                    weights: columns.iter().map(|(i, _)| row.weights[*i]).collect(),
                    rep: row.rep,
                })
                .collect(),
        }
    }
}

/// A rectangular slice of the matrix, ready to print.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParticipationTable {
    /// Column headers.
    pub queues: Vec<String>,
    pub rows: Vec<ParticipationRow>,
}

impl ParticipationTable {
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty() || self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipationRow {
    pub rep: String,
    /// One weight per column, 0 where the rep is not a member.
    pub weights: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ParticipationMatrix {
        let mut m = ParticipationMatrix::default();
        m.insert("Ada", "Inbound", 50);
        m.insert("Ada", "Outbound", 10);
        m.insert("Bo", "Outbound", 40);
        m.insert("Cy", "Renewals", 30);
        m
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_absent_cells_are_zero() {
        let m = matrix();
        assert_eq!(m.weight("Ada", "Inbound"), 50);
        assert_eq!(m.weight("Bo", "Inbound"), 0);
        assert_eq!(m.weight("Nobody", "Inbound"), 0);
    }

    #[test]
    fn test_queues_for_and_remove() {
        let mut m = matrix();
        assert_eq!(m.queues_for("Ada").collect::<Vec<_>>(), vec!["Inbound", "Outbound"]);
        assert_eq!(m.queues_for("Nobody").count(), 0);

        m.remove_rep("Ada");
        assert!(!m.contains_rep("Ada"));
        assert!(!m.contains_queue("Inbound"));
        assert!(m.contains_queue("Outbound"));
    }

    #[test]
    fn test_sales_table_drops_zero_rows_and_orders_columns() {
        let table = matrix().sales_table(&names(&["Inbound", "Outbound"]));

        // Outbound totals 50, Inbound 50: tie keeps input order
        assert_eq!(table.queues, names(&["Inbound", "Outbound"]));
        let reps: Vec<_> = table.rows.iter().map(|r| r.rep.as_str()).collect();
        assert_eq!(reps, vec!["Ada", "Bo"]);
        assert_eq!(table.rows[1].weights, vec![0, 40]);
    }

    #[test]
    fn test_columns_sorted_by_total() {
        let mut m = matrix();
        m.insert("Di", "Outbound", 5);
        let table = m.sales_table(&names(&["Inbound", "Outbound"]));

        assert_eq!(table.queues, names(&["Outbound", "Inbound"]));
        assert_eq!(table.rows[0].rep, "Ada");
        assert_eq!(table.rows[0].weights, vec![10, 50]);
    }

    #[test]
    fn test_cs_table_keeps_only_cs_users() {
        let cs_users: BTreeSet<String> = ["Cy".to_string()].into_iter().collect();
        let table = matrix().cs_table(&names(&["Renewals"]), &cs_users);

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].rep, "Cy");
        assert_eq!(table.rows[0].weights, vec![30]);
    }

    #[test]
    fn test_matrix_is_empty() {
        let mut m = ParticipationMatrix::default();
        assert!(m.is_empty());

        m.insert("Ada", "Inbound", 10);
        assert!(!m.is_empty());

        m.remove_rep("Ada");
        assert!(m.is_empty());
    }

    #[test]
    fn test_empty_table() {
        let table = matrix().sales_table(&[]);
        assert!(table.is_empty());
    }
}
