use axum::{extract::State, response::Html};
use ezviewer_core::Registry;

use crate::error::ApiErr;

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const ALIASES_PLACEHOLDER: &str = "__ALIASES_JSON__";

/// GET /: the viewer page, with the current alias table inlined.
pub async fn index(State(registry): State<Registry>) -> Result<Html<String>, ApiErr> {
    let logs = tokio::task::spawn_blocking(move || registry.list()).await??;
    let aliases =
        serde_json::to_string(&logs).map_err(|e| ApiErr::internal("alias table", e))?;
    Ok(Html(render_index(&aliases)))
}

/// Inline `aliases_json` into the page. `</` is escaped so a path can never
/// close the surrounding `<script>` element.
fn render_index(aliases_json: &str) -> String {
    INDEX_HTML.replace(ALIASES_PLACEHOLDER, &aliases_json.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_inlines_aliases() {
        let html = render_index(r#"{"api":"/var/log/api.log"}"#);
        assert!(html.contains(r#"const ALIASES = {"api":"/var/log/api.log"};"#));
        assert!(!html.contains(ALIASES_PLACEHOLDER));
    }

    #[test]
    fn test_render_escapes_script_close() {
        let html = render_index(r#"{"x":"/tmp/</script>.log"}"#);
        assert!(html.contains(r#"/tmp/<\/script>.log"#));
    }
}
