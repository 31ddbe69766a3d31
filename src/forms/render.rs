//! HTML rendering for forms, plus a small LRU cache for unbound create
//! forms (the hot path when operators open the same entry screen all
//! day). Edit forms are never cached.

use super::{Form, FormField, FormMode, Widget};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_field(html: &mut String, field: &FormField) {
    if field.widget == Widget::Hidden {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
            escape(&field.input_name),
            escape(&field.value)
        ));
        return;
    }

    html.push_str("<div class=\"form-group\">");
    html.push_str(&format!(
        "<label for=\"id_{}\">{}</label>",
        escape(&field.input_name),
        escape(&field.label)
    ));

    let required = if field.required { " required" } else { "" };
    let readonly = if field.read_only { " readonly" } else { "" };

    match field.widget {
        Widget::Select => {
            html.push_str(&format!(
                "<select id=\"id_{0}\" name=\"{0}\"{1}>",
                escape(&field.input_name),
                required
            ));
            for choice in &field.choices {
                let selected = if *choice == field.value { " selected" } else { "" };
                html.push_str(&format!(
                    "<option value=\"{0}\"{1}>{0}</option>",
                    escape(choice),
                    selected
                ));
            }
            html.push_str("</select>");
        }
        Widget::Checkbox => {
            let checked = if field.value == "true" { " checked" } else { "" };
            html.push_str(&format!(
                "<input type=\"checkbox\" id=\"id_{0}\" name=\"{0}\" value=\"true\"{1}>",
                escape(&field.input_name),
                checked
            ));
        }
        _ => {
            let input_type = match field.widget {
                Widget::Number => "number",
                Widget::Password => "password",
                Widget::File => "file",
                // dates stay textual so both accepted formats work
                _ => "text",
            };
            let mut attrs = String::new();
            if let Some(pattern) = field.pattern {
                attrs.push_str(&format!(" pattern=\"{}\"", pattern));
            }
            if let Some(placeholder) = field.placeholder {
                attrs.push_str(&format!(" placeholder=\"{}\"", placeholder));
            }
            html.push_str(&format!(
                "<input type=\"{}\" id=\"id_{1}\" name=\"{1}\" value=\"{2}\"{3}{4}{5}>",
                input_type,
                escape(&field.input_name),
                escape(&field.value),
                attrs,
                required,
                readonly
            ));
        }
    }
    html.push_str("</div>");
}

/// Render a form as an embeddable fragment. The caller owns the page
/// around it; this is only the `<form>` element.
pub fn render_form(form: &Form) -> String {
    let mode = match form.mode {
        FormMode::Create => "create",
        FormMode::Edit(_) => "edit",
    };
    let mut html = format!(
        "<form class=\"entity-form\" data-entity=\"{}\" data-mode=\"{}\">",
        escape(form.entity),
        mode
    );
    html.push_str(&format!("<h2>{}</h2>", escape(&form.title)));
    if let Some(warning) = &form.warning {
        html.push_str(&format!(
            "<div class=\"form-warning\">{}</div>",
            escape(warning)
        ));
    }
    for field in &form.fields {
        render_field(&mut html, field);
    }
    html.push_str("</form>");
    html
}

// ============================================================================
// Fragment cache
// ============================================================================

type FragmentKey = (u64, String, Option<String>);

/// LRU cache for rendered create-form fragments, keyed by entity and the
/// current code preview. Column definitions feed into the rendered HTML,
/// so any column mutation bumps the epoch and strands older entries
/// until they age out.
pub struct FragmentCache {
    entries: Mutex<LruCache<FragmentKey, String>>,
    epoch: AtomicU64,
}

impl FragmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            epoch: AtomicU64::new(0),
        }
    }

    fn key(&self, entity: &str, code_preview: Option<&str>) -> FragmentKey {
        (
            self.epoch.load(Ordering::Relaxed),
            entity.to_string(),
            code_preview.map(str::to_string),
        )
    }

    pub async fn get(&self, entity: &str, code_preview: Option<&str>) -> Option<String> {
        let key = self.key(entity, code_preview);
        self.entries.lock().await.get(&key).cloned()
    }

    pub async fn put(&self, entity: &str, code_preview: Option<&str>, html: String) {
        let key = self.key(entity, code_preview);
        self.entries.lock().await.put(key, html);
    }

    /// Invalidate everything rendered against the previous column set.
    pub fn bump_columns_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for FragmentCache {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnSet;
    use crate::forms::build_form;
    use crate::registry::REGISTRY;

    #[test]
    fn test_escapes_markup_in_values() {
        assert_eq!(escape("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn test_renders_hidden_status_and_readonly_code() {
        let descriptor = REGISTRY.get("staff").unwrap();
        let form = build_form(descriptor, &ColumnSet::default(), None, Some("STF001"));
        let html = render_form(&form);
        assert!(html.contains("data-entity=\"staff\""));
        assert!(html.contains("data-mode=\"create\""));
        assert!(html.contains("<input type=\"hidden\" name=\"status\" value=\"active\">"));
        assert!(html.contains("value=\"STF001\""));
        assert!(html.contains(" readonly"));
        assert!(html.contains("pattern=\"[0-9]{10}\""));
    }

    #[test]
    fn test_renders_select_with_current_choice() {
        let descriptor = REGISTRY.get("kycdocument").unwrap();
        let form = build_form(descriptor, &ColumnSet::default(), None, None);
        let html = render_form(&form);
        // kyc status is hidden, but its pending default must survive
        assert!(html.contains("name=\"status\" value=\"pending\""));
    }

    #[tokio::test]
    async fn test_cache_round_trip_and_epoch_invalidation() {
        let cache = FragmentCache::new(4);
        cache.put("staff", Some("STF001"), "<form>a</form>".into()).await;
        assert_eq!(
            cache.get("staff", Some("STF001")).await.as_deref(),
            Some("<form>a</form>")
        );
        // a different preview misses
        assert!(cache.get("staff", Some("STF002")).await.is_none());

        cache.bump_columns_epoch();
        assert!(cache.get("staff", Some("STF001")).await.is_none());
    }
}
