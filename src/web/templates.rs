use minijinja::Environment;

use crate::core::error::{PathquillError, Result};

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Pathquill</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  h1 { font-size: 1.4rem; }
  label { display: block; margin-top: 1rem; font-weight: 600; }
  input, textarea { width: 100%; padding: 0.5rem; margin-top: 0.25rem; box-sizing: border-box; }
  textarea { height: 6rem; }
  button { margin-top: 1.25rem; padding: 0.6rem 1.2rem; background: #2e7d32; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }
</style>
</head>
<body>
<h1>Pathquill &mdash; ask WikiPathways</h1>
<p>Generates a SPARQL query from your question and runs it against the locally materialized WikiPathways graph.</p>
<form method="post" action="/query">
  <label for="api_key">LLM API key</label>
  <input type="password" id="api_key" name="api_key" required>
  <label for="token">Data access token</label>
  <input type="password" id="token" name="token" required>
  <label for="question">Question</label>
  <textarea id="question" name="question" placeholder="e.g. Which pathways mention the ACE inhibitor pathway?" required></textarea>
  <button type="submit">Generate and execute query</button>
</form>
</body>
</html>
"#;

pub const RESULT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Pathquill &mdash; result</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  h1 { font-size: 1.4rem; }
  pre { background: #f5f5f5; padding: 1rem; overflow-x: auto; border-radius: 4px; }
  table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
  th, td { border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; font-size: 0.9rem; }
  th { background: #f0f0f0; }
  .question { font-style: italic; }
  .meta { color: #666; font-size: 0.85rem; }
  .error { color: #b00020; }
</style>
</head>
<body>
<h1>Result</h1>
<p><a href="/">&larr; ask another question</a></p>
<p class="question">{{ question }}</p>
{% if error %}
<p class="error">An error occurred: {{ error }}</p>
{% else %}
<h2>Generated SPARQL</h2>
<pre><code>{{ sparql }}</code></pre>
<p class="meta">{{ provider }} / {{ model }}{% if cached %} &middot; cached{% endif %}{% if fallback_used %} &middot; fallback{% endif %} &middot; {{ elapsed_ms }} ms</p>
{% if empty %}
<p>No data retrieved from the query.</p>
{% else %}
<table>
  <thead><tr>{% for column in columns %}<th>{{ column }}</th>{% endfor %}</tr></thead>
  <tbody>
  {% for row in rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
  </tbody>
</table>
{% endif %}
{% endif %}
</body>
</html>
"#;

/// Compiles the embedded templates. Called once at startup.
pub fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_HTML)
        .map_err(|e| PathquillError::Internal(format!("template 'index.html': {e}")))?;
    env.add_template("result.html", RESULT_HTML)
        .map_err(|e| PathquillError::Internal(format!("template 'result.html': {e}")))?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_templates_compile() {
        environment().unwrap();
    }

    #[test]
    fn test_index_has_all_three_fields() {
        let env = environment().unwrap();
        let html = env.get_template("index.html").unwrap().render(context! {}).unwrap();
        assert!(html.contains("name=\"api_key\""));
        assert!(html.contains("name=\"token\""));
        assert!(html.contains("name=\"question\""));
        assert!(html.contains("Generate and execute query"));
    }

    #[test]
    fn test_result_renders_table() {
        let env = environment().unwrap();
        let html = env
            .get_template("result.html")
            .unwrap()
            .render(context! {
                question => "list pathways",
                sparql => "SELECT ?title WHERE { ?p <http://purl.org/dc/terms/title> ?title }",
                columns => vec!["title"],
                rows => vec![vec!["Glycolysis"]],
                empty => false,
                cached => true,
                provider => "openai",
                model => "gpt-3.5-turbo",
                fallback_used => false,
                elapsed_ms => 42,
            })
            .unwrap();
        assert!(html.contains("<td>Glycolysis</td>"));
        assert!(html.contains("cached"));
        assert!(html.contains("SELECT ?title"));
        assert!(!html.contains("An error occurred"));
    }

    #[test]
    fn test_result_renders_empty_notice() {
        let env = environment().unwrap();
        let html = env
            .get_template("result.html")
            .unwrap()
            .render(context! {
                question => "q",
                sparql => "ASK {}",
                columns => Vec::<String>::new(),
                rows => Vec::<Vec<String>>::new(),
                empty => true,
                cached => false,
                provider => "openai",
                model => "gpt-3.5-turbo",
                fallback_used => false,
                elapsed_ms => 3,
            })
            .unwrap();
        assert!(html.contains("No data retrieved from the query."));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_result_renders_error_branch() {
        let env = environment().unwrap();
        let html = env
            .get_template("result.html")
            .unwrap()
            .render(context! {
                question => "q",
                error => "Validation error: API key must be provided",
            })
            .unwrap();
        assert!(html.contains("An error occurred: Validation error"));
        assert!(!html.contains("Generated SPARQL"));
    }

    #[test]
    fn test_cell_content_is_escaped() {
        let env = environment().unwrap();
        let html = env
            .get_template("result.html")
            .unwrap()
            .render(context! {
                question => "q",
                sparql => "SELECT 1",
                columns => vec!["v"],
                rows => vec![vec!["<script>alert(1)</script>"]],
                empty => false,
                cached => false,
                provider => "openai",
                model => "m",
                fallback_used => false,
                elapsed_ms => 1,
            })
            .unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
