//! qalab-cli - command-line client for the qalab scenario validation API
//!
//! Lets automation scripts and operators record interactions, read verdicts
//! and clear session history without a browser.
//!
//! # Subcommands
//! - `status`                                             - show server health
//! - `scenarios [--label L]... [--json]`                  - list / search scenarios
//! - `record <id> --session S --action A --element E`     - record an interaction
//! - `validate <id> --session S [--json]`                 - current verdict
//! - `reset <id> --session S`                             - clear one scenario
//! - `reset-all --session S`                              - clear the whole session

use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const SESSION_HEADER: &str = "x-qalab-session";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "qalab-cli",
    version,
    about = "qalab scenario validation - command-line client"
)]
struct Cli {
    /// qalab HTTP server URL (overrides QALAB_HTTP_URL env var)
    #[arg(long, env = "QALAB_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show qalab server status
    Status,

    /// List scenarios, optionally filtered by labels (all must match)
    Scenarios {
        /// Label filter of the form dimension=value (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Record an interaction and print the resulting verdict
    Record {
        /// Scenario id
        scenario: String,

        #[arg(long)]
        session: String,

        /// fill, click or select
        #[arg(long)]
        action: String,

        /// Element identifier the action targeted
        #[arg(long)]
        element: String,

        /// Value typed (fill only)
        #[arg(long)]
        value: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the current verdict for a scenario
    Validate {
        scenario: String,

        #[arg(long)]
        session: String,

        #[arg(long)]
        json: bool,
    },

    /// Clear recorded interactions for one scenario
    Reset {
        scenario: String,

        #[arg(long)]
        session: String,
    },

    /// Clear recorded interactions for every scenario in a session
    ResetAll {
        #[arg(long)]
        session: String,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub title: String,
    pub expected_action: String,
    pub expected_target: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioList {
    pub scenarios: Vec<ScenarioSummary>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecordedAction {
    pub action_performed: String,
    pub element_interacted: String,
    pub value_filled: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct Verdict {
    pub status: String,
    pub message: String,
    pub actions: Vec<RecordedAction>,
    pub action_count: usize,
}

// ============================================================================
// Output formatting
// ============================================================================

/// One line per scenario: id, expected action/target, labels.
pub fn format_scenario_line(s: &ScenarioSummary) -> String {
    let labels = if s.labels.is_empty() {
        String::new()
    } else {
        format!("  [{}]", s.labels.join(", "))
    };
    format!(
        "{:<6} {:<7} {:<28} {}{}",
        s.id, s.expected_action, s.expected_target, s.title, labels
    )
}

/// Verdict summary line followed by a numbered action history.
pub fn format_verdict(v: &Verdict) -> String {
    let mut out = format!(
        "{} ({} action{}): {}",
        v.status.to_uppercase(),
        v.action_count,
        if v.action_count == 1 { "" } else { "s" },
        v.message
    );
    for (i, a) in v.actions.iter().enumerate() {
        out.push_str(&format!(
            "\n  {:>2}. {} {}",
            i + 1,
            a.action_performed,
            a.element_interacted
        ));
        if let Some(value) = &a.value_filled {
            out.push_str(&format!(" = {:?}", value));
        }
        out.push_str(&format!("  ({})", a.timestamp));
    }
    out
}

/// Extract the server's error message from an error body, if any.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// Join path segments onto the server URL, percent-encoding each one so
/// scenario ids containing `/`, `?` or `#` stay inside their segment.
pub fn endpoint(server: &str, segments: &[&str]) -> anyhow::Result<Url> {
    let mut url = Url::parse(server)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("server URL cannot take a path: {}", server))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Send a request and return the JSON body, exiting on transport or HTTP errors.
fn send_json(req: reqwest::blocking::RequestBuilder, url: &Url) -> anyhow::Result<serde_json::Value> {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("qalab-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("qalab-cli: server returned {}: {}", status, error_message(&body));
        std::process::exit(1);
    }

    Ok(resp.json()?)
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = endpoint(server, &["health"])?;
    match client.get(url.clone()).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("qalab server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:      {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:        {}", body["store"].as_str().unwrap_or("?"));
            println!("Scenarios:    {}", body["scenarios"].as_u64().unwrap_or(0));
            if let Some(pg) = body["postgresql"].as_str() {
                println!("PostgreSQL:   {}", pg);
            }
        }
        Ok(r) => {
            eprintln!("qalab-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("qalab-cli: cannot reach {} - {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn do_scenarios(server: &str, labels: &[String], json_output: bool) -> anyhow::Result<()> {
    let url = endpoint(server, &["api", "scenarios", "search"])?;
    let body = send_json(
        client()?
            .post(url.clone())
            .json(&serde_json::json!({ "labels": labels })),
        &url,
    )?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let list: ScenarioList = serde_json::from_value(body)?;
    if list.count == 0 {
        eprintln!("No scenarios match: {}", labels.join(", "));
        return Ok(());
    }
    for s in &list.scenarios {
        println!("{}", format_scenario_line(s));
    }
    Ok(())
}

fn do_record(
    server: &str,
    scenario: &str,
    session: &str,
    action: &str,
    element: &str,
    value: Option<&str>,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = endpoint(server, &["api", "scenarios", scenario, "interactions"])?;
    let payload = serde_json::json!({
        "action": action,
        "element": element,
        "value": value,
        "metadata": { "source": "qalab-cli" },
    });
    let body = send_json(
        client()?
            .post(url.clone())
            .header(SESSION_HEADER, session)
            .json(&payload),
        &url,
    )?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if body["result"].is_null() {
        println!(
            "Recorded interaction {} (verdict unavailable, run `validate` to retry)",
            body["recorded"]["id"]
        );
        return Ok(());
    }
    let verdict: Verdict = serde_json::from_value(body["result"].clone())?;
    println!("{}", format_verdict(&verdict));
    Ok(())
}

fn do_validate(server: &str, scenario: &str, session: &str, json_output: bool) -> anyhow::Result<()> {
    let url = endpoint(server, &["api", "scenarios", scenario, "validation"])?;
    let body = send_json(client()?.get(url.clone()).header(SESSION_HEADER, session), &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let verdict: Verdict = serde_json::from_value(body)?;
    println!("{}", format_verdict(&verdict));
    Ok(())
}

fn do_reset(server: &str, segments: &[&str], session: &str) -> anyhow::Result<()> {
    let url = endpoint(server, segments)?;
    let body = send_json(client()?.delete(url.clone()).header(SESSION_HEADER, session), &url)?;
    println!("Removed {} interaction(s)", body["removed"].as_u64().unwrap_or(0));
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server;

    let result = match cli.command {
        Commands::Status => do_status(&server),
        Commands::Scenarios { labels, json } => do_scenarios(&server, &labels, json),
        Commands::Record {
            scenario,
            session,
            action,
            element,
            value,
            json,
        } => do_record(
            &server,
            &scenario,
            &session,
            &action,
            &element,
            value.as_deref(),
            json,
        ),
        Commands::Validate {
            scenario,
            session,
            json,
        } => do_validate(&server, &scenario, &session, json),
        Commands::Reset { scenario, session } => do_reset(
            &server,
            &["api", "scenarios", scenario.as_str(), "interactions"],
            &session,
        ),
        Commands::ResetAll { session } => {
            do_reset(&server, &["api", "session", "interactions"], &session)
        }
    };

    if let Err(e) = result {
        eprintln!("qalab-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: &str, element: &str, value: Option<&str>) -> RecordedAction {
        RecordedAction {
            action_performed: kind.to_string(),
            element_interacted: element.to_string(),
            value_filled: value.map(str::to_string),
            timestamp: "2026-03-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_verdict_neutral() {
        let v = Verdict {
            status: "neutral".to_string(),
            message: "No actions recorded yet".to_string(),
            actions: vec![],
            action_count: 0,
        };
        assert_eq!(format_verdict(&v), "NEUTRAL (0 actions): No actions recorded yet");
    }

    #[test]
    fn test_format_verdict_history_numbered() {
        let v = Verdict {
            status: "pass".to_string(),
            message: "Correct: fill on '#email'".to_string(),
            actions: vec![
                action("click", "#email", None),
                action("fill", "#email", Some("qa@example.com")),
            ],
            action_count: 2,
        };
        let out = format_verdict(&v);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PASS (2 actions)"));
        assert!(lines[1].contains(" 1. click #email"));
        assert!(lines[2].contains(" 2. fill #email = \"qa@example.com\""));
    }

    #[test]
    fn test_format_verdict_singular() {
        let v = Verdict {
            status: "fail".to_string(),
            message: "x".to_string(),
            actions: vec![action("click", "#a", None)],
            action_count: 1,
        };
        assert!(format_verdict(&v).starts_with("FAIL (1 action): x"));
    }

    #[test]
    fn test_format_scenario_line() {
        let s = ScenarioSummary {
            id: "c1".to_string(),
            title: "Primary button".to_string(),
            expected_action: "click".to_string(),
            expected_target: "#submit-btn".to_string(),
            labels: vec!["action=click".to_string(), "element=button".to_string()],
        };
        let line = format_scenario_line(&s);
        assert!(line.starts_with("c1"));
        assert!(line.contains("#submit-btn"));
        assert!(line.ends_with("[action=click, element=button]"));
    }

    #[test]
    fn test_endpoint_encodes_scenario_id() {
        let url = endpoint(
            "http://127.0.0.1:8780",
            &["api", "scenarios", "a/b?c#d", "validation"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8780/api/scenarios/a%2Fb%3Fc%23d/validation"
        );
    }

    #[test]
    fn test_endpoint_keeps_server_prefix() {
        let url = endpoint("http://qa.internal/qalab/", &["health"]).unwrap();
        assert_eq!(url.as_str(), "http://qa.internal/qalab/health");
        let url = endpoint("http://qa.internal/qalab", &["health"]).unwrap();
        assert_eq!(url.as_str(), "http://qa.internal/qalab/health");
    }

    #[test]
    fn test_endpoint_rejects_non_base_url() {
        assert!(endpoint("mailto:qa@example.com", &["health"]).is_err());
        assert!(endpoint("not a url", &["health"]).is_err());
    }

    #[test]
    fn test_error_message_extracts_field() {
        assert_eq!(
            error_message(r#"{"error":"Scenario not found: zz","status":"error"}"#),
            "Scenario not found: zz"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn test_verdict_parses_server_shape() {
        let body = serde_json::json!({
            "status": "fail",
            "message": "Incorrect (wrong target)",
            "action_count": 1,
            "actions": [{
                "id": 7,
                "scenario_id": "c1",
                "session_id": "s",
                "action_performed": "click",
                "element_interacted": "#nope",
                "value_filled": null,
                "timestamp": "2026-03-01T12:00:00Z",
                "metadata": {}
            }]
        });
        let v: Verdict = serde_json::from_value(body).unwrap();
        assert_eq!(v.actions[0].element_interacted, "#nope");
        assert!(v.actions[0].value_filled.is_none());
    }
}
