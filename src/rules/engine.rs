use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::condition;
use super::error::RuleError;
use crate::config;
use crate::database::models::Rule;

/// Single workflow requirement produced by a rule action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Name of the rule that produced this requirement
    pub source_rule: String,
}

/// Aggregated output of a rule engine run over one business document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    pub steps: Vec<Requirement>,
    pub documents: Vec<Requirement>,
    pub tasks: Vec<Requirement>,
    /// Names of the rules whose conditions matched, in evaluation order
    pub matched_rules: Vec<String>,
}

/// Evaluates enabled rules against a business document and collects the
/// workflow requirements their actions declare. Rules run in ascending
/// priority order (ties broken by name); the first rule to require a key
/// wins, later duplicates are dropped.
pub struct RuleEngine;

impl RuleEngine {
    pub fn evaluate(rules: &[Rule], document: &Value) -> Result<Requirements, RuleError> {
        let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.enabled).collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));

        let mut out = Requirements::default();
        let mut seen: HashSet<(&'static str, String)> = HashSet::new();

        for rule in ordered {
            let matched = condition::evaluate(&rule.condition, document)?;
            if config::config().rules.debug_logging {
                tracing::debug!(rule = %rule.name, matched, "Evaluated rule condition");
            }
            if !matched {
                continue;
            }

            out.matched_rules.push(rule.name.clone());
            Self::collect_actions(rule, &mut out, &mut seen);
        }

        Ok(out)
    }

    fn collect_actions(rule: &Rule, out: &mut Requirements, seen: &mut HashSet<(&'static str, String)>) {
        let actions = match rule.actions.as_array() {
            Some(arr) => arr,
            None => {
                tracing::warn!(rule = %rule.name, "Rule actions are not an array, skipping");
                return;
            }
        };

        for action in actions {
            let kind = action.get("require").and_then(Value::as_str);
            let key = action.get("key").and_then(Value::as_str);
            let (kind, key) = match (kind, key) {
                (Some(k), Some(key)) => (k, key),
                _ => {
                    tracing::warn!(rule = %rule.name, "Malformed rule action, skipping");
                    continue;
                }
            };

            let bucket: (&'static str, &mut Vec<Requirement>) = match kind {
                "step" => ("step", &mut out.steps),
                "document" => ("document", &mut out.documents),
                "task" => ("task", &mut out.tasks),
                other => {
                    tracing::warn!(rule = %rule.name, kind = other, "Unknown requirement kind, skipping");
                    continue;
                }
            };

            // First rule to require a key wins
            if !seen.insert((bucket.0, key.to_string())) {
                continue;
            }

            let label = action
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(key)
                .to_string();

            bucket.1.push(Requirement {
                key: key.to_string(),
                label,
                meta: action.get("meta").cloned(),
                source_rule: rule.name.clone(),
            });
        }
    }
}

/// Validate an actions array on rule create/update. Evaluation tolerates
/// malformed actions, but writes reject them outright.
pub fn validate_actions(actions: &Value) -> Result<(), RuleError> {
    let arr = actions
        .as_array()
        .ok_or_else(|| RuleError::InvalidAction("actions must be an array".to_string()))?;

    if arr.is_empty() {
        return Err(RuleError::InvalidAction("actions must not be empty".to_string()));
    }

    for action in arr {
        let obj = action
            .as_object()
            .ok_or_else(|| RuleError::InvalidAction("each action must be an object".to_string()))?;

        match obj.get("require").and_then(Value::as_str) {
            Some("step") | Some("document") | Some("task") => {}
            Some(other) => {
                return Err(RuleError::InvalidAction(format!(
                    "unknown requirement kind '{}'",
                    other
                )))
            }
            None => {
                return Err(RuleError::InvalidAction(
                    "action is missing a 'require' kind".to_string(),
                ))
            }
        }

        match obj.get("key").and_then(Value::as_str) {
            Some(k) if !k.is_empty() => {}
            _ => {
                return Err(RuleError::InvalidAction(
                    "action is missing a non-empty 'key'".to_string(),
                ))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(name: &str, priority: i32, enabled: bool, condition: Value, actions: Value) -> Rule {
        Rule {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: name.to_string(),
            description: None,
            priority,
            enabled,
            condition,
            actions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn llc_doc() -> Value {
        json!({ "entity_type": "llc", "formation_state": "CA", "employee_count": 3 })
    }

    #[test]
    fn matching_rules_produce_requirements() {
        let rules = vec![
            rule(
                "llc-basics",
                10,
                true,
                json!({ "entity_type": "llc" }),
                json!([
                    { "require": "step", "key": "ein", "label": "Obtain EIN" },
                    { "require": "document", "key": "operating_agreement" }
                ]),
            ),
            rule(
                "ca-statement",
                20,
                true,
                json!({ "formation_state": "CA" }),
                json!([{ "require": "task", "key": "soi_filing", "label": "File Statement of Information" }]),
            ),
        ];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert_eq!(out.matched_rules, vec!["llc-basics", "ca-statement"]);
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].key, "ein");
        assert_eq!(out.documents[0].label, "operating_agreement"); // label defaults to key
        assert_eq!(out.tasks[0].source_rule, "ca-statement");
    }

    #[test]
    fn disabled_and_non_matching_rules_are_skipped() {
        let rules = vec![
            rule(
                "disabled",
                1,
                false,
                json!({}),
                json!([{ "require": "step", "key": "never" }]),
            ),
            rule(
                "corp-only",
                2,
                true,
                json!({ "entity_type": "c_corp" }),
                json!([{ "require": "step", "key": "bylaws" }]),
            ),
        ];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert!(out.steps.is_empty());
        assert!(out.matched_rules.is_empty());
    }

    #[test]
    fn first_rule_wins_on_duplicate_keys() {
        let rules = vec![
            rule(
                "later",
                20,
                true,
                json!({}),
                json!([{ "require": "step", "key": "ein", "label": "From later rule" }]),
            ),
            rule(
                "earlier",
                10,
                true,
                json!({}),
                json!([{ "require": "step", "key": "ein", "label": "From earlier rule" }]),
            ),
        ];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].label, "From earlier rule");
    }

    #[test]
    fn same_key_in_different_buckets_is_not_a_duplicate() {
        let rules = vec![rule(
            "both",
            1,
            true,
            json!({}),
            json!([
                { "require": "step", "key": "ein" },
                { "require": "document", "key": "ein" }
            ]),
        )];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.documents.len(), 1);
    }

    #[test]
    fn priority_ties_break_by_name() {
        let rules = vec![
            rule("zeta", 1, true, json!({}), json!([{ "require": "step", "key": "x", "label": "z" }])),
            rule("alpha", 1, true, json!({}), json!([{ "require": "step", "key": "x", "label": "a" }])),
        ];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert_eq!(out.steps[0].label, "a");
    }

    #[test]
    fn malformed_actions_are_skipped_at_evaluation() {
        let rules = vec![rule(
            "messy",
            1,
            true,
            json!({}),
            json!([
                { "require": "webhook", "key": "nope" },
                { "require": "step" },
                { "require": "step", "key": "ok" }
            ]),
        )];

        let out = RuleEngine::evaluate(&rules, &llc_doc()).unwrap();
        assert_eq!(out.steps.len(), 1);
        assert_eq!(out.steps[0].key, "ok");
    }

    #[test]
    fn validate_actions_rejects_bad_input() {
        assert!(validate_actions(&json!([])).is_err());
        assert!(validate_actions(&json!({ "require": "step" })).is_err());
        assert!(validate_actions(&json!([{ "require": "webhook", "key": "x" }])).is_err());
        assert!(validate_actions(&json!([{ "require": "step" }])).is_err());
        assert!(validate_actions(&json!([{ "require": "step", "key": "" }])).is_err());
        assert!(validate_actions(&json!([{ "require": "step", "key": "ein" }])).is_ok());
    }
}
