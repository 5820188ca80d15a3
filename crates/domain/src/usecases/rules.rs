//! Rule building - groups tagged accounts into cost category definitions

use std::collections::{HashMap, HashSet};

use crate::model::{AccountTagMap, CostCategoryDefinition, CostCategoryRule};

/// Build one definition per tag key, one rule per tag value.
///
/// Keys and values appear in the order they are first met while scanning
/// the map, so identical input always yields identical output.
pub fn build_definitions(accounts: &AccountTagMap) -> Vec<CostCategoryDefinition> {
    let mut definitions: Vec<CostCategoryDefinition> = Vec::new();
    // (key) -> definition position, (key, value) -> rule position
    let mut definition_at: HashMap<&str, usize> = HashMap::new();
    let mut rule_at: HashMap<(&str, &str), usize> = HashMap::new();
    let mut members: HashSet<(&str, &str, &str)> = HashSet::new();

    for (account_id, tags) in accounts.iter() {
        for tag in tags {
            let definition_index = *definition_at.entry(tag.key.as_str()).or_insert_with(|| {
                definitions.push(CostCategoryDefinition {
                    name: tag.key.clone(),
                    rules: Vec::new(),
                });
                definitions.len() - 1
            });
            let rules = &mut definitions[definition_index].rules;

            let rule_index = *rule_at
                .entry((tag.key.as_str(), tag.value.as_str()))
                .or_insert_with(|| {
                    rules.push(CostCategoryRule {
                        value: tag.value.clone(),
                        accounts: Vec::new(),
                    });
                    rules.len() - 1
                });

            if members.insert((tag.key.as_str(), tag.value.as_str(), account_id)) {
                rules[rule_index].accounts.push(account_id.to_string());
            }
        }
    }

    definitions
}
