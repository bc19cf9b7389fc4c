mod client;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reaper_core::{Environment, NewAgent, NewPolicy, NewRule};
use reaper_cli::{context_json, parse_kv_pairs};
use serde_json::Value;

use client::ReaperClient;

#[derive(Parser)]
#[command(name = "reaper")]
#[command(about = "Reaper CLI - Policy and agent management")]
#[command(version = reaper_core::VERSION)]
struct Cli {
    /// Base URL of the reaper-platform service.
    #[arg(long, env = "REAPER_PLATFORM_URL", default_value = "http://127.0.0.1:8081")]
    platform_url: String,
    /// Base URL of the reaper-agent service, used only by `status`.
    #[arg(long, env = "REAPER_AGENT_URL", default_value = "http://127.0.0.1:8082")]
    agent_url: String,
    /// Bearer API key for operations that require an authenticated agent.
    #[arg(long, env = "REAPER_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Policy management commands
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// Rule management commands
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Agent management commands
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Mandate issuance and lookup
    Mandate {
        #[command(subcommand)]
        action: MandateAction,
    },
    /// Audit log queries
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    /// Platform and agent status and monitoring
    Status,
}

#[derive(Subcommand)]
enum PolicyAction {
    /// List all policies
    List {
        #[arg(long)]
        active: Option<bool>,
    },
    /// Create a new policy from an authority JSON file
    Create {
        name: String,
        description: String,
        #[arg(long)]
        authority_file: PathBuf,
    },
    /// Show a single policy, optionally at a specific version
    Get {
        id: String,
        #[arg(long)]
        version: Option<u64>,
    },
    /// Update an existing policy (always mints a new version)
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        authority_file: PathBuf,
    },
    /// Delete a policy, optionally a specific version
    Delete {
        id: String,
        #[arg(long)]
        version: Option<u64>,
    },
}

#[derive(Subcommand)]
enum RuleAction {
    /// List all rules
    List {
        #[arg(long)]
        active: Option<bool>,
    },
    /// Create a new rule from a conditions JSON file
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Show a single rule
    Get { id: String },
    /// Update an existing rule (always mints a new version)
    Update {
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a rule
    Delete { id: String },
}

#[derive(Subcommand)]
enum AgentAction {
    /// List all agents
    List,
    /// Register a new agent
    Create {
        name: String,
        #[arg(long)]
        owner: String,
        #[arg(long, default_value = "development")]
        environment: String,
        /// Repeatable `key=value` metadata pair.
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },
    /// Show agent details
    Show { id: String },
    /// Update an agent's name, owner, or environment
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        environment: Option<String>,
    },
    /// Soft-delete an agent
    Delete { id: String },
    /// Kill a running agent (requires the agent's own API key)
    Kill {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Clear an agent's kill flag (requires the agent's own API key)
    Resurrect { id: String },
    /// Show an agent's kill status
    KillStatus { id: String },
}

#[derive(Subcommand)]
enum MandateAction {
    /// Issue a mandate for the authenticated agent under a context
    Issue {
        /// Repeatable `key=value` context pair.
        #[arg(long = "ctx", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },
    /// Fetch a mandate by ID (owner-only)
    Get { id: String },
}

#[derive(Subcommand)]
enum AuditAction {
    /// Query the audit log for the authenticated agent
    Query {
        #[arg(long)]
        decision: Option<String>,
        #[arg(long = "type")]
        action_type: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ReaperClient::new(cli.platform_url.clone(), cli.api_key.clone());

    match cli.command {
        Commands::Policy { action } => handle_policy_action(&client, action).await,
        Commands::Rule { action } => handle_rule_action(&client, action).await,
        Commands::Agent { action } => handle_agent_action(&client, action).await,
        Commands::Mandate { action } => handle_mandate_action(&client, action).await,
        Commands::Audit { action } => handle_audit_action(&client, action).await,
        Commands::Status => handle_status(&client, &cli.agent_url).await,
    }
}

async fn handle_policy_action(client: &ReaperClient, action: PolicyAction) -> anyhow::Result<()> {
    match action {
        PolicyAction::List { active } => print_json(&client.list_policies(active).await?),
        PolicyAction::Create { name, description, authority_file } => {
            let authority = serde_json::from_str(&std::fs::read_to_string(authority_file)?)?;
            print_json(&client.create_policy(NewPolicy { name, description, authority }).await?);
        }
        PolicyAction::Get { id, version } => print_json(&client.get_policy(&id, version).await?),
        PolicyAction::Update { id, name, description, authority_file } => {
            let authority: Value = serde_json::from_str(&std::fs::read_to_string(authority_file)?)?;
            let body = serde_json::json!({ "name": name, "description": description, "authority": authority });
            print_json(&client.update_policy(&id, body).await?);
        }
        PolicyAction::Delete { id, version } => print_json(&client.delete_policy(&id, version).await?),
    }
    Ok(())
}

async fn handle_rule_action(client: &ReaperClient, action: RuleAction) -> anyhow::Result<()> {
    match action {
        RuleAction::List { active } => print_json(&client.list_rules(active).await?),
        RuleAction::Create { file } => {
            let new_rule: NewRule = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            print_json(&client.create_rule(new_rule).await?);
        }
        RuleAction::Get { id } => print_json(&client.get_rule(&id).await?),
        RuleAction::Update { id, file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            print_json(&client.update_rule(&id, body).await?);
        }
        RuleAction::Delete { id } => print_json(&client.delete_rule(&id).await?),
    }
    Ok(())
}

async fn handle_agent_action(client: &ReaperClient, action: AgentAction) -> anyhow::Result<()> {
    match action {
        AgentAction::List => print_json(&client.list_agents().await?),
        AgentAction::Create { name, owner, environment, metadata } => {
            let environment: Environment = environment.parse().map_err(anyhow::Error::msg)?;
            let new_agent =
                NewAgent { name, owning_principal: owner, environment, metadata: parse_kv_pairs(&metadata) };
            let result = client.create_agent(new_agent).await?;
            println!("agent created; store the API key now, it is never shown again:");
            print_json(&result);
        }
        AgentAction::Show { id } => print_json(&client.get_agent(&id).await?),
        AgentAction::Update { id, name, owner, environment } => {
            let environment = environment.map(|e| e.parse::<Environment>()).transpose().map_err(anyhow::Error::msg)?;
            let body = serde_json::json!({
                "name": name,
                "owning_principal": owner,
                "environment": environment,
            });
            print_json(&client.update_agent(&id, body).await?);
        }
        AgentAction::Delete { id } => print_json(&client.delete_agent(&id).await?),
        AgentAction::Kill { id, reason } => print_json(&client.kill_agent(&id, reason).await?),
        AgentAction::Resurrect { id } => print_json(&client.resurrect_agent(&id).await?),
        AgentAction::KillStatus { id } => print_json(&client.kill_status(&id).await?),
    }
    Ok(())
}

async fn handle_mandate_action(client: &ReaperClient, action: MandateAction) -> anyhow::Result<()> {
    match action {
        MandateAction::Issue { context } => {
            print_json(&client.issue_mandate(context_json(&context)).await?);
        }
        MandateAction::Get { id } => print_json(&client.get_mandate(&id).await?),
    }
    Ok(())
}

async fn handle_audit_action(client: &ReaperClient, action: AuditAction) -> anyhow::Result<()> {
    match action {
        AuditAction::Query { decision, action_type, from, to } => {
            let mut query = Vec::new();
            if let Some(decision) = decision {
                query.push(("decision", decision));
            }
            if let Some(action_type) = action_type {
                query.push(("actionType", action_type));
            }
            if let Some(from) = from {
                query.push(("from", from));
            }
            if let Some(to) = to {
                query.push(("to", to));
            }
            print_json(&client.query_audit(&query).await?);
        }
    }
    Ok(())
}

async fn handle_status(client: &ReaperClient, agent_url: &str) -> anyhow::Result<()> {
    println!("reaper-platform:");
    match client.health().await {
        Ok(body) => print_json(&body),
        Err(err) => println!("  unreachable: {err}"),
    }

    println!("reaper-agent:");
    let agent_client = ReaperClient::new(agent_url.to_string(), None);
    match agent_client.health().await {
        Ok(body) => print_json(&body),
        Err(err) => println!("  unreachable: {err}"),
    }
    Ok(())
}
