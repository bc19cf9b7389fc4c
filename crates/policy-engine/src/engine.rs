//! Pure policy engine (C11): given an action, a mandate's effective
//! authority, and the current runtime state, decide ALLOW or BLOCK. No I/O,
//! no mutation — callers that need to apply the decision go through the
//! two-phase executor (§4.5, §4.6).

use reaper_core::{
    glob, Action, ActionKind, BlockCode, Decision, Mandate, RuntimeState, AGENT_RATE_WINDOW_KEY,
};

/// Evaluate `action` against `mandate` and a snapshot of `state` as of `now`.
/// Checks run in the fixed order specified by §4.5; the first hit wins.
pub fn authorize(
    action: &Action,
    mandate: &Mandate,
    state: &RuntimeState,
    now: chrono::DateTime<chrono::Utc>,
) -> Decision {
    if state.seen_action_ids.contains(&action.id) {
        return Decision::block(BlockCode::Replay, "action ID already seen");
    }
    if state.killed {
        return Decision::block(BlockCode::Killed, "agent has been killed");
    }
    if now > mandate.expires_at {
        return Decision::block(BlockCode::Expired, "mandate has expired");
    }

    let authority = &mandate.authority;

    if let ActionKind::ToolCall { tool_name } = &action.kind {
        if glob::matches_any(&authority.denied_tools, tool_name) {
            return Decision::block(BlockCode::ToolDenied, format!("tool '{tool_name}' is denied"));
        }
        if let Some(allowed) = &authority.allowed_tools {
            if !allowed.is_empty() && !glob::matches_any(allowed, tool_name) {
                return Decision::block(
                    BlockCode::ToolNotAllowed,
                    format!("tool '{tool_name}' is not in the allowed set"),
                );
            }
            if allowed.is_empty() {
                return Decision::block(
                    BlockCode::ToolNotAllowed,
                    format!("tool '{tool_name}' denied by empty allow-list"),
                );
            }
        }

        if let Some(tool_policy) = authority.tool_policies.get(tool_name) {
            if !tool_policy.allowed {
                return Decision::block(BlockCode::ToolDenied, format!("tool '{tool_name}' disabled by policy"));
            }
            if let Some(max_per_call) = tool_policy.cost {
                if action.estimated_cost > max_per_call {
                    return Decision::block(
                        BlockCode::PerCallLimit,
                        format!("tool '{tool_name}' per-call cost ceiling exceeded"),
                    );
                }
            }
        }
    }

    if let Some(max_per_call) = authority.max_cost_per_call {
        if action.estimated_cost > max_per_call {
            return Decision::block(BlockCode::PerCallLimit, "per-call cost ceiling exceeded");
        }
    }

    if let Some(max_total) = authority.max_cost_total {
        if state.cumulative_cost + action.estimated_cost > max_total {
            return Decision::block(BlockCode::TotalBudget, "total budget ceiling exceeded");
        }
    }

    if let Some(rate_limit) = &authority.rate_limit {
        let count = state.rate_window_count(AGENT_RATE_WINDOW_KEY, now, rate_limit);
        if count >= rate_limit.max_calls {
            return Decision::block(BlockCode::RateLimit, "agent-level rate limit exceeded");
        }
    }

    if let Some(tool_name) = action.tool_name() {
        if let Some(tool_policy) = authority.tool_policies.get(tool_name) {
            if let Some(rate_limit) = &tool_policy.rate_limit {
                let count = state.rate_window_count(tool_name, now, rate_limit);
                if count >= rate_limit.max_calls {
                    return Decision::block(
                        BlockCode::RateLimit,
                        format!("per-tool rate limit exceeded for '{tool_name}'"),
                    );
                }
            }
        }
    }

    let remaining = authority
        .max_cost_total
        .map(|max| max - state.cumulative_cost - action.estimated_cost);
    Decision::allow("authorized", remaining)
}
