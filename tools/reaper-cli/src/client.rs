//! Thin `reqwest` wrapper over `reaper-platform`'s HTTP API (§4.11). No
//! business logic lives here — every method is one request plus a typed
//! deserialization of the response body.

use reaper_core::{NewAgent, NewPolicy, NewRule};
use serde_json::Value;

pub struct ReaperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReaperClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        ReaperClient { http: reqwest::Client::new(), base_url, api_key }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> anyhow::Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            anyhow::bail!("request failed with {status}: {body}");
        }
        Ok(body)
    }

    // --------------------------------------------------------------- agents

    pub async fn create_agent(&self, new_agent: NewAgent) -> anyhow::Result<Value> {
        self.send(self.http.post(self.url("/agents")).json(&new_agent)).await
    }

    pub async fn list_agents(&self) -> anyhow::Result<Value> {
        self.send(self.http.get(self.url("/agents"))).await
    }

    pub async fn get_agent(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.http.get(self.url(&format!("/agents/{id}")))).await
    }

    pub async fn update_agent(&self, id: &str, update: Value) -> anyhow::Result<Value> {
        self.send(self.http.put(self.url(&format!("/agents/{id}"))).json(&update)).await
    }

    pub async fn delete_agent(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.http.delete(self.url(&format!("/agents/{id}")))).await
    }

    pub async fn kill_agent(&self, id: &str, reason: String) -> anyhow::Result<Value> {
        let body = serde_json::json!({ "reason": reason });
        self.send(self.authorize(self.http.post(self.url(&format!("/agents/{id}/kill")))).json(&body)).await
    }

    pub async fn kill_status(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.http.get(self.url(&format!("/agents/{id}/kill-status")))).await
    }

    pub async fn resurrect_agent(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.authorize(self.http.post(self.url(&format!("/agents/{id}/resurrect"))))).await
    }

    // -------------------------------------------------------------- policies

    pub async fn create_policy(&self, new_policy: NewPolicy) -> anyhow::Result<Value> {
        self.send(self.http.post(self.url("/policies")).json(&new_policy)).await
    }

    pub async fn list_policies(&self, active: Option<bool>) -> anyhow::Result<Value> {
        let mut request = self.http.get(self.url("/policies"));
        if let Some(active) = active {
            request = request.query(&[("active", active)]);
        }
        self.send(request).await
    }

    pub async fn get_policy(&self, id: &str, version: Option<u64>) -> anyhow::Result<Value> {
        let mut request = self.http.get(self.url(&format!("/policies/{id}")));
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }
        self.send(request).await
    }

    pub async fn update_policy(&self, id: &str, update: Value) -> anyhow::Result<Value> {
        self.send(self.http.put(self.url(&format!("/policies/{id}"))).json(&update)).await
    }

    pub async fn delete_policy(&self, id: &str, version: Option<u64>) -> anyhow::Result<Value> {
        let mut request = self.http.delete(self.url(&format!("/policies/{id}")));
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }
        self.send(request).await
    }

    // ----------------------------------------------------------------- rules

    pub async fn create_rule(&self, new_rule: NewRule) -> anyhow::Result<Value> {
        self.send(self.http.post(self.url("/rules")).json(&new_rule)).await
    }

    pub async fn list_rules(&self, active: Option<bool>) -> anyhow::Result<Value> {
        let mut request = self.http.get(self.url("/rules"));
        if let Some(active) = active {
            request = request.query(&[("active", active)]);
        }
        self.send(request).await
    }

    pub async fn get_rule(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.http.get(self.url(&format!("/rules/{id}")))).await
    }

    pub async fn update_rule(&self, id: &str, update: Value) -> anyhow::Result<Value> {
        self.send(self.http.put(self.url(&format!("/rules/{id}"))).json(&update)).await
    }

    pub async fn delete_rule(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.http.delete(self.url(&format!("/rules/{id}")))).await
    }

    // -------------------------------------------------------------- mandates

    pub async fn issue_mandate(&self, context: Value) -> anyhow::Result<Value> {
        let body = serde_json::json!({ "context": context });
        self.send(self.authorize(self.http.post(self.url("/mandates/issue"))).json(&body)).await
    }

    pub async fn get_mandate(&self, id: &str) -> anyhow::Result<Value> {
        self.send(self.authorize(self.http.get(self.url(&format!("/mandates/{id}"))))).await
    }

    // ----------------------------------------------------------------- audit

    pub async fn query_audit(&self, query: &[(&str, String)]) -> anyhow::Result<Value> {
        self.send(self.authorize(self.http.get(self.url("/audit"))).query(query)).await
    }

    // ---------------------------------------------------------------- health

    pub async fn health(&self) -> anyhow::Result<Value> {
        self.send(self.http.get(self.url("/health"))).await
    }
}
