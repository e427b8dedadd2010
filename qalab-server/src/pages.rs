//! Server-rendered results page.

use qalab_core::{ScenarioDefinition, ValidationResult};

pub fn render_results(def: &ScenarioDefinition, result: &ValidationResult) -> String {
    let mut rows = String::new();
    for (i, action) in result.actions.iter().enumerate() {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td></tr>\n",
            i + 1,
            action.action_performed,
            escape_html(&action.element_interacted),
            escape_html(action.value_filled.as_deref().unwrap_or("")),
            action.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        ));
    }

    let history = if result.actions.is_empty() {
        "<p class=\"empty\">Nothing recorded for this session.</p>".to_string()
    } else {
        format!(
            "<table class=\"history\">\n<thead><tr><th>#</th><th>Action</th><th>Element</th>\
             <th>Value</th><th>Time</th></tr></thead>\n<tbody>\n{}</tbody>\n</table>",
            rows
        )
    };

    let labels: String = def
        .labels
        .iter()
        .map(|l| format!("<span class=\"label\">{}</span>", escape_html(l)))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Results: {title}</title>
</head>
<body>
<h1>{title}</h1>
<p class="description">{description}</p>
<p class="labels">{labels}</p>
<dl class="expected">
<dt>Expected action</dt><dd>{action}</dd>
<dt>Expected target</dt><dd><code>{target}</code></dd>
</dl>
<div id="verdict" class="verdict {status}" data-status="{status}">
<strong>{status_upper}</strong> <span class="message">{message}</span>
</div>
<h2>Recorded actions ({count})</h2>
{history}
</body>
</html>
"#,
        title = escape_html(&def.title),
        description = escape_html(&def.description),
        labels = labels,
        action = def.expected_action,
        target = escape_html(&def.expected_target),
        status = result.status.as_str(),
        status_upper = result.status.as_str().to_ascii_uppercase(),
        message = escape_html(&result.message),
        count = result.action_count,
        history = history,
    )
}

pub fn render_not_found(scenario_id: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Not found</title></head>\n\
         <body><h1>Scenario not found</h1><p>No scenario with id <code>{}</code>.</p></body>\n</html>\n",
        escape_html(scenario_id)
    )
}

pub fn render_error() -> String {
    "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Error</title></head>\n\
     <body><h1>Something went wrong</h1><p>Results are unavailable right now.</p></body>\n</html>\n"
        .to_string()
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
