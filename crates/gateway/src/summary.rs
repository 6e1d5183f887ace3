//! `GET /api/summary/daily`: the dashboard's daily health widget.
//!
//! Severity counts and the overall level are computed here; the short
//! narrative comes from the agent, asked with no situational annex.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use zabbot_core::monitoring::{HostSummary, Problem};

use crate::SharedState;
use crate::api::{ApiError, ErrorResponse};

/// Problems beyond this count raise the level to caution even without high severities.
const CAUTION_PROBLEM_COUNT: usize = 3;
/// Only the first few problems are scanned for the issue list.
const ISSUE_SCAN: usize = 5;
const ISSUE_LIMIT: usize = 3;
const PROMPT_PROBLEM_NAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Caution,
    Critical,
}

impl HealthLevel {
    fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Caution => "Caution",
            Self::Critical => "Critical",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverallStatus {
    pub level: HealthLevel,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryStats {
    pub monitored_hosts: usize,
    pub active_problems: usize,
    pub critical: usize,
    pub high: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CriticalIssue {
    pub name: String,
    pub severity: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailySummary {
    pub title: String,
    pub overall_status: OverallStatus,
    pub stats: SummaryStats,
    pub critical_issues: Vec<CriticalIssue>,
    pub recommendations: Vec<String>,
    pub insights: String,
}

fn is_critical(problem: &Problem) -> bool {
    matches!(problem.severity.as_str(), "4" | "5")
}

fn is_high(problem: &Problem) -> bool {
    problem.severity == "3"
}

impl DailySummary {
    pub fn build(problems: &[Problem], hosts: &[HostSummary], insights: String) -> Self {
        let critical = problems.iter().filter(|p| is_critical(p)).count();
        let high = problems.iter().filter(|p| is_high(p)).count();

        let level = if critical > 0 {
            HealthLevel::Critical
        } else if high > 0 || problems.len() > CAUTION_PROBLEM_COUNT {
            HealthLevel::Caution
        } else {
            HealthLevel::Healthy
        };

        let critical_issues = problems
            .iter()
            .take(ISSUE_SCAN)
            .filter(|p| is_critical(p) || is_high(p))
            .take(ISSUE_LIMIT)
            .map(|p| CriticalIssue {
                name: p.name.clone(),
                severity: p.severity.clone(),
            })
            .collect();

        let first = if critical > 0 {
            "Review critical problems immediately"
        } else {
            "Keep up preventive monitoring"
        };

        Self {
            title: "Daily AI Summary".into(),
            overall_status: OverallStatus {
                level,
                label: level.label().into(),
                description: format!("{} active problem(s)", problems.len()),
            },
            stats: SummaryStats {
                monitored_hosts: hosts.len(),
                active_problems: problems.len(),
                critical,
                high,
            },
            critical_issues,
            recommendations: vec![
                first.into(),
                "Keep the Zabbix server up to date".into(),
                "Check disk space on the main servers".into(),
            ],
            insights,
        }
    }
}

/// The question put to the agent for the narrative part of the summary.
pub fn insight_prompt(problems: &[Problem], hosts: &[HostSummary]) -> String {
    let critical = problems.iter().filter(|p| is_critical(p)).count();
    let high = problems.iter().filter(|p| is_high(p)).count();
    let top: Vec<&str> = problems
        .iter()
        .take(PROMPT_PROBLEM_NAMES)
        .map(|p| p.name.as_str())
        .collect();

    format!(
        "Write a short analysis (2-3 sentences) of the current state of the infrastructure.\n\n\
         Current data:\n\
         - Total hosts: {}\n\
         - Active problems: {}\n\
         - Critical problems: {critical}\n\
         - High problems: {high}\n\n\
         Top problems: {}\n\n\
         Give only the analysis, without headings or formatting.",
        hosts.len(),
        problems.len(),
        top.join(", "),
    )
}

pub(crate) async fn daily_summary_handler(
    State(state): State<SharedState>,
) -> Result<Json<DailySummary>, ApiError> {
    let fetched = match state.monitor.get_problems().await {
        Ok(problems) => state.monitor.get_hosts().await.map(|hosts| (problems, hosts)),
        Err(e) => Err(e),
    };
    let (problems, hosts) = fetched.map_err(|e| {
        error!(error = %e, "Error generating daily summary");
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let insights = match state.settings.snapshot() {
        Ok(config) => {
            state
                .agent
                .chat(&insight_prompt(&problems, &hosts), None, &config)
                .await
        }
        Err(e) => {
            warn!(error = %e, "Agent settings unavailable");
            format!("AI Configuration Error: {e}")
        }
    };

    let summary = DailySummary::build(&problems, &hosts, insights);
    info!(level = ?summary.overall_status.level, problems = problems.len(), "Daily summary");
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support::{StubMonitor, harness};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;
    use zabbot_config::SettingsUpdate;
    use zabbot_core::agent::ProviderKind;

    fn problem(name: &str, severity: &str) -> Problem {
        Problem {
            event_id: name.into(),
            name: name.into(),
            severity: severity.into(),
            acknowledged: false,
        }
    }

    fn host(name: &str) -> HostSummary {
        HostSummary {
            host_id: name.into(),
            name: name.into(),
            monitored: true,
        }
    }

    async fn fetch(h: &crate::test_support::Harness) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri("/api/summary/daily")
            .body(Body::empty())
            .unwrap();
        let response = build_router(h.state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[test]
    fn quiet_estate_is_healthy() {
        let summary = DailySummary::build(&[problem("Low disk", "2")], &[host("a")], String::new());
        assert_eq!(summary.overall_status.level, HealthLevel::Healthy);
        assert_eq!(summary.overall_status.description, "1 active problem(s)");
        assert!(summary.critical_issues.is_empty());
        assert_eq!(summary.recommendations[0], "Keep up preventive monitoring");
    }

    #[test]
    fn many_minor_problems_raise_caution() {
        let problems: Vec<_> = (0..4).map(|i| problem(&format!("p{i}"), "1")).collect();
        let summary = DailySummary::build(&problems, &[], String::new());
        assert_eq!(summary.overall_status.level, HealthLevel::Caution);
        assert_eq!(summary.stats.high, 0);
    }

    #[test]
    fn critical_severity_wins_and_issues_are_capped() {
        let problems = vec![
            problem("Info only", "1"),
            problem("Disk full", "5"),
            problem("CPU high", "3"),
            problem("Agent down", "4"),
            problem("Swap high", "3"),
            problem("Ignored, past the scan window", "5"),
        ];
        let summary = DailySummary::build(&problems, &[host("a"), host("b")], "fine".into());

        assert_eq!(summary.overall_status.level, HealthLevel::Critical);
        assert_eq!(summary.stats.critical, 3);
        assert_eq!(summary.stats.high, 2);
        assert_eq!(summary.stats.monitored_hosts, 2);
        let names: Vec<&str> = summary.critical_issues.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Disk full", "CPU high", "Agent down"]);
        assert_eq!(summary.recommendations[0], "Review critical problems immediately");
    }

    #[test]
    fn prompt_lists_counts_and_top_problems() {
        let problems = vec![problem("A", "4"), problem("B", "3"), problem("C", "1"), problem("D", "1")];
        let prompt = insight_prompt(&problems, &[host("x")]);
        assert!(prompt.contains("- Total hosts: 1"));
        assert!(prompt.contains("- Active problems: 4"));
        assert!(prompt.contains("- Critical problems: 1"));
        assert!(prompt.contains("- High problems: 1"));
        assert!(prompt.contains("Top problems: A, B, C\n"));
    }

    #[tokio::test]
    async fn route_asks_agent_once_without_context() {
        let h = harness(StubMonitor {
            problems: 2,
            hosts: 4,
            critical: 1,
            ..Default::default()
        });
        h.state
            .settings
            .update(SettingsUpdate {
                provider: ProviderKind::OpenAi,
                openai_api_key: Some("sk-test-1234".into()),
                ..Default::default()
            })
            .unwrap();

        let (status, json) = fetch(&h).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(json["overall_status"]["level"], "critical");
        assert_eq!(json["stats"]["monitored_hosts"], 4);
        assert_eq!(json["stats"]["critical"], 1);
        assert_eq!(json["stats"]["high"], 1);
        // No situational annex: the echoed last prompt line is policy text.
        let insights = json["insights"].as_str().unwrap();
        assert!(!insights.is_empty());
        assert!(!insights.starts_with("Context:"));
    }

    #[tokio::test]
    async fn route_reports_configuration_error_as_insight() {
        let h = harness(StubMonitor::default());
        h.state
            .settings
            .update(SettingsUpdate {
                provider: ProviderKind::Gemini,
                ..Default::default()
            })
            .unwrap();

        let (status, json) = fetch(&h).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["overall_status"]["level"], "healthy");
        assert_eq!(json["insights"], "AI Configuration Error: Gemini API Key not configured.");
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn route_fails_on_monitoring_outage() {
        let h = harness(StubMonitor {
            down: true,
            ..Default::default()
        });
        let (status, json) = fetch(&h).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("connection refused"));
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }
}
