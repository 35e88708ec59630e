use crate::model::{NameMappings, Transaction};

/// For every candidate whose `description` is a key in `mappings`, records the description as
/// `original_description` and fills in the suggested description, budget and category. The
/// `description` itself is left alone. Returns how many candidates got a suggestion.
pub fn apply_mappings(candidates: &mut [Transaction], mappings: &NameMappings) -> usize {
    if mappings.is_empty() {
        return 0;
    }
    let mut applied = 0;
    for tx in candidates.iter_mut() {
        let Some(mapping) = mappings.get(&tx.description) else {
            continue;
        };
        tx.original_description = tx.description.clone();
        tx.suggested_description = mapping.new_name().to_string();
        tx.suggested_budget = mapping.budget_name().to_string();
        tx.suggested_category = mapping.category_name().to_string();
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, NameMapping, Status};

    fn batch() -> Vec<Transaction> {
        vec![
            Transaction::new("2023-10-05", "AMZN MKTP US", Amount::default(), "withdrawal"),
            Transaction::new("2023-10-06", "Payroll", Amount::default(), "deposit"),
            Transaction::error("oops", "Incomplete row: [\"oops\"]"),
        ]
    }

    #[test]
    fn test_apply_mappings() {
        let mappings: NameMappings = vec![
            NameMapping::new("AMZN MKTP US", "Amazon", "Household", "Shopping"),
            NameMapping::new("payroll", "Salary", "", "Income"),
        ]
        .into_iter()
        .collect();
        let mut txs = batch();

        assert_eq!(1, apply_mappings(&mut txs, &mappings));

        let amazon = &txs[0];
        assert_eq!("AMZN MKTP US", amazon.description());
        assert_eq!("AMZN MKTP US", amazon.original_description());
        assert_eq!("Amazon", amazon.suggested_description());
        assert_eq!("Household", amazon.suggested_budget());
        assert_eq!("Shopping", amazon.suggested_category());
        assert_eq!(Status::Pending, amazon.status());

        // matching is exact, so "payroll" does not match "Payroll"
        assert_eq!("", txs[1].original_description());
        assert_eq!("", txs[1].suggested_description());
        assert_eq!(Status::Error, txs[2].status());
    }

    #[test]
    fn test_empty_mappings_are_a_no_op() {
        let mut txs = batch();
        let before = txs.clone();
        assert_eq!(0, apply_mappings(&mut txs, &NameMappings::new()));
        assert_eq!(before, txs);
    }
}
