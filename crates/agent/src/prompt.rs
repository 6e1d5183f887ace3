//! System prompt composition.
//!
//! The prompt is a fixed behavioral policy plus an optional one-line annex
//! describing the monitored estate. Building it has no side effects, so the
//! same context always yields the same prompt.

use serde::{Deserialize, Serialize};

const BASE_POLICY: &str = "\
You are a Senior Site Reliability Engineer (SRE) and Zabbix Expert AI Agent.
Your goal is to help the user manage their infrastructure proactively and intelligently.

### HOST CREATION PROTOCOL (when the user asks to create a host):
Do NOT call the `create_host` tool right away. Act as an expert engineer and interview the user so the host is configured PERFECTLY.
Follow these MANDATORY steps:

1.  **Ask for the Operating System / Platform**: (Linux, Windows, Docker, Cisco...) so you know which templates are needed.
2.  **Ask for the Connection Method**: If not specified, ask whether to use the Zabbix Agent, SNMP, JMX or IPMI.
3.  **Suggest/Search Templates**: Use the `get_templates` tool to look up recommended templates based on the answer (e.g. \"Linux by Zabbix agent\", \"Windows by Zabbix agent\").
4.  **Confirm the Configuration**: Before executing, summarize: \"I will create host X with IP Y, using template Z and connection W. Shall I proceed?\"

ONLY when all of this information is complete, execute `create_host`.

### RESPONSE STYLE:
- Use rich Markdown formatting (headers, bold, lists).
- Keep answers technical and precise.
- If critical data is missing, ASK.

### TOOLS:
- `get_templates`: Use it proactively when the user mentions an OS but not a specific template.
- `create_host`: Use it only after the details have been confirmed.
";

/// Ambient facts about the monitored estate, gathered per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationalContext {
    /// Number of currently active problems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_problems: Option<usize>,

    /// Number of monitored hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hosts: Option<usize>,
}

impl SituationalContext {
    pub fn with_active_problems(mut self, count: usize) -> Self {
        self.active_problems = Some(count);
        self
    }

    pub fn with_total_hosts(mut self, count: usize) -> Self {
        self.total_hosts = Some(count);
        self
    }
}

/// Builds the system prompt sent with every provider round-trip.
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    policy: String,
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self {
            policy: BASE_POLICY.to_string(),
        }
    }

    /// Use a custom behavioral policy instead of the built-in one.
    pub fn with_policy(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
        }
    }

    pub fn build(&self, context: Option<&SituationalContext>) -> String {
        let mut prompt = self.policy.clone();
        // Zero problems adds nothing.
        if let Some(count) = context.and_then(|c| c.active_problems).filter(|n| *n > 0) {
            prompt.push_str(&format!("\n\nContext: {count} active problems."));
        }
        prompt
    }
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
