//! Policy composer (C6): merge N authority templates into one effective
//! authority (§4.3). Pure — never suspends, never fails except on an invalid
//! glob pattern encountered while applying the deny-wins filter.

use std::collections::{BTreeMap, BTreeSet};

use reaper_core::{glob, Authority, ExecutionLimits, ModelConfig, Policy, RateLimit, Result, ToolPolicy};

/// Compose the authorities of `policies` into one effective authority
/// (§4.3). An empty input fails closed to [`Authority::deny_all`].
pub fn compose(policies: &[Policy]) -> Result<Authority> {
    if policies.is_empty() {
        return Ok(Authority::deny_all());
    }

    let authorities: Vec<&Authority> = policies.iter().map(|p| &p.authority).collect();

    let mut composed = Authority {
        max_cost_total: compose_min(authorities.iter().map(|a| a.max_cost_total)),
        max_cost_per_call: compose_min(authorities.iter().map(|a| a.max_cost_per_call)),
        max_cognition_cost: compose_min(authorities.iter().map(|a| a.max_cognition_cost)),
        max_execution_cost: compose_min(authorities.iter().map(|a| a.max_execution_cost)),
        rate_limit: compose_rate_limit(authorities.iter().map(|a| a.rate_limit)),
        allowed_tools: compose_allowed_tools(&authorities),
        denied_tools: compose_denied_tools(&authorities),
        tool_policies: compose_tool_policies(&authorities),
        execution_limits: compose_execution_limits(&authorities),
        model_config: compose_model_config(&authorities),
    };

    apply_deny_wins(&mut composed)?;
    Ok(composed)
}

fn compose_min(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
}

fn compose_rate_limit(values: impl Iterator<Item = Option<RateLimit>>) -> Option<RateLimit> {
    values.flatten().fold(None, |acc, v| match acc {
        None => Some(v),
        Some(a) => Some(RateLimit {
            max_calls: a.max_calls.min(v.max_calls),
            window_ms: a.window_ms.min(v.window_ms),
        }),
    })
}

/// INTERSECTION of every policy's `allowed_tools` that defines one. A policy
/// with `None` (no whitelist) contributes nothing to the intersection; if
/// every defining policy agrees a pattern belongs, it survives.
fn compose_allowed_tools(authorities: &[&Authority]) -> Option<Vec<String>> {
    let defining: Vec<&Vec<String>> =
        authorities.iter().filter_map(|a| a.allowed_tools.as_ref()).collect();
    if defining.is_empty() {
        return None;
    }
    let mut iter = defining.into_iter();
    let mut intersection: BTreeSet<String> = iter.next().unwrap().iter().cloned().collect();
    for list in iter {
        let set: BTreeSet<String> = list.iter().cloned().collect();
        intersection = intersection.intersection(&set).cloned().collect();
    }
    Some(intersection.into_iter().collect())
}

fn compose_denied_tools(authorities: &[&Authority]) -> Vec<String> {
    let union: BTreeSet<String> =
        authorities.iter().flat_map(|a| a.denied_tools.iter().cloned()).collect();
    union.into_iter().collect()
}

fn compose_tool_policies(authorities: &[&Authority]) -> BTreeMap<String, ToolPolicy> {
    let mut tool_names: BTreeSet<&str> = BTreeSet::new();
    for a in authorities {
        tool_names.extend(a.tool_policies.keys().map(String::as_str));
    }

    let mut out = BTreeMap::new();
    for tool in tool_names {
        let defining: Vec<&ToolPolicy> =
            authorities.iter().filter_map(|a| a.tool_policies.get(tool)).collect();
        if defining.is_empty() {
            continue;
        }
        let allowed = defining.iter().all(|tp| tp.allowed);
        let cost = defining.iter().filter_map(|tp| tp.cost).fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.min(v)))
        });
        let rate_limit = compose_rate_limit(defining.iter().map(|tp| tp.rate_limit));
        out.insert(tool.to_string(), ToolPolicy { allowed, cost, rate_limit });
    }
    out
}

fn compose_execution_limits(authorities: &[&Authority]) -> Option<ExecutionLimits> {
    let defining: Vec<&ExecutionLimits> =
        authorities.iter().filter_map(|a| a.execution_limits.as_ref()).collect();
    if defining.is_empty() {
        return None;
    }
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for limits in &defining {
        keys.extend(limits.keys().map(String::as_str));
    }
    let mut out = ExecutionLimits::new();
    for key in keys {
        if let Some(min) =
            defining.iter().filter_map(|l| l.get(key)).fold(None, |acc, &v| Some(acc.map_or(v, |a: f64| a.min(v))))
        {
            out.insert(key.to_string(), min);
        }
    }
    Some(out)
}

fn compose_model_config(authorities: &[&Authority]) -> Option<ModelConfig> {
    let defining: Vec<&ModelConfig> =
        authorities.iter().filter_map(|a| a.model_config.as_ref()).collect();
    if defining.is_empty() {
        return None;
    }

    let allowed_models = {
        let lists: Vec<&Vec<String>> =
            defining.iter().filter_map(|mc| mc.allowed_models.as_ref()).collect();
        if lists.is_empty() {
            None
        } else {
            let mut iter = lists.into_iter();
            let mut intersection: BTreeSet<String> = iter.next().unwrap().iter().cloned().collect();
            for list in iter {
                let set: BTreeSet<String> = list.iter().cloned().collect();
                intersection = intersection.intersection(&set).cloned().collect();
            }
            Some(intersection.into_iter().collect())
        }
    };

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for mc in &defining {
        keys.extend(mc.limits.keys().map(String::as_str));
    }
    let mut limits = BTreeMap::new();
    for key in keys {
        if let Some(min) = defining
            .iter()
            .filter_map(|mc| mc.limits.get(key))
            .fold(None, |acc, &v| Some(acc.map_or(v, |a: f64| a.min(v))))
        {
            limits.insert(key.to_string(), min);
        }
    }

    Some(ModelConfig { allowed_models, limits })
}

/// Remove from `allowed_tools` any entry matching any `denied_tools` pattern
/// (§4.3, P4). Always the last composition step.
fn apply_deny_wins(authority: &mut Authority) -> Result<()> {
    for pattern in &authority.denied_tools {
        glob::validate_pattern(pattern)?;
    }
    if let Some(allowed) = &authority.allowed_tools {
        for pattern in allowed {
            glob::validate_pattern(pattern)?;
        }
    }

    if let Some(allowed) = authority.allowed_tools.take() {
        let filtered: Vec<String> = allowed
            .into_iter()
            .filter(|tool| !glob::matches_any(&authority.denied_tools, tool))
            .collect();
        authority.allowed_tools = Some(filtered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(authority: Authority) -> Policy {
        Policy {
            id: "policy-x".into(),
            version: 1,
            name: "x".into(),
            description: "".into(),
            authority,
            active: true,
        }
    }

    #[test]
    fn zero_policies_composes_to_deny_all() {
        let composed = compose(&[]).unwrap();
        assert_eq!(composed, Authority::deny_all());
    }

    #[test]
    fn numeric_budgets_compose_by_min() {
        let policies = vec![
            policy(Authority { max_cost_total: Some(10.0), ..Default::default() }),
            policy(Authority { max_cost_total: Some(5.0), ..Default::default() }),
        ];
        let composed = compose(&policies).unwrap();
        assert_eq!(composed.max_cost_total, Some(5.0));
    }

    #[test]
    fn allowed_tools_compose_by_intersection() {
        let policies = vec![
            policy(Authority {
                allowed_tools: Some(vec!["read_*".into(), "send_email".into()]),
                ..Default::default()
            }),
            policy(Authority { allowed_tools: Some(vec!["read_*".into()]), ..Default::default() }),
        ];
        let composed = compose(&policies).unwrap();
        assert_eq!(composed.allowed_tools, Some(vec!["read_*".to_string()]));
    }

    #[test]
    fn deny_wins_removes_matching_allowed_entries() {
        let policies = vec![
            policy(Authority {
                allowed_tools: Some(vec!["read_public".into(), "read_secret".into()]),
                denied_tools: vec!["read_secret".into()],
                ..Default::default()
            }),
        ];
        let composed = compose(&policies).unwrap();
        assert_eq!(composed.allowed_tools, Some(vec!["read_public".to_string()]));
    }

    #[test]
    fn composition_is_associative_for_min_fields() {
        let a = policy(Authority { max_cost_total: Some(10.0), ..Default::default() });
        let b = policy(Authority { max_cost_total: Some(5.0), ..Default::default() });
        let c = policy(Authority { max_cost_total: Some(7.0), ..Default::default() });

        let direct = compose(&[a.clone(), b.clone(), c.clone()]).unwrap();

        let ab = compose(&[a, b]).unwrap();
        let ab_policy = policy(ab);
        let staged = compose(&[ab_policy, c]).unwrap();

        assert_eq!(direct.max_cost_total, staged.max_cost_total);
    }

    #[test]
    fn undefined_allowed_tools_differs_from_empty_whitelist() {
        let undefined = compose(&[policy(Authority::default())]).unwrap();
        assert_eq!(undefined.allowed_tools, None);

        let empty = compose(&[policy(Authority {
            allowed_tools: Some(vec![]),
            ..Default::default()
        })])
        .unwrap();
        assert_eq!(empty.allowed_tools, Some(vec![]));
    }
}
