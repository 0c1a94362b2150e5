//! Rich-text runs: annotated text segments → inline Markdown.
//!
//! A property value is a list of runs. Each run is either a bare string or a
//! `[text, annotations]` pair, where `annotations` is a list of tagged marks
//! such as `["b"]` or `["a", "https://..."]`.
//!
//! Marks always compose in the same order regardless of how the service
//! listed them: bold, italic, code, strikethrough, then link. Each mark wraps
//! the result of the previous one, so a bold link renders `[**text**](url)`.

use serde_json::Value;

/// One inline mark on a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Bold,
    Italic,
    Code,
    Strikethrough,
    Link(String),
}

impl Annotation {
    /// Parse one `[tag, value?]` entry. Unknown tags yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let parts = value.as_array()?;
        let tag = parts.first()?.as_str()?;
        match tag {
            "b" => Some(Annotation::Bold),
            "i" => Some(Annotation::Italic),
            "c" => Some(Annotation::Code),
            "s" => Some(Annotation::Strikethrough),
            "a" => {
                let target = parts.get(1).and_then(Value::as_str).unwrap_or_default();
                Some(Annotation::Link(target.to_string()))
            }
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Annotation::Bold => 0,
            Annotation::Italic => 1,
            Annotation::Code => 2,
            Annotation::Strikethrough => 3,
            Annotation::Link(_) => 4,
        }
    }

    fn wrap(&self, inner: &str) -> String {
        match self {
            Annotation::Bold => format!("**{inner}**"),
            Annotation::Italic => format!("*{inner}*"),
            Annotation::Code => format!("`{inner}`"),
            Annotation::Strikethrough => format!("~~{inner}~~"),
            Annotation::Link(target) => format!("[{inner}]({target})"),
        }
    }
}

/// A text segment with its marks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Run {
    pub text: String,
    pub annotations: Vec<Annotation>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Vec::new(),
        }
    }

    /// Parse a run: a bare string or a `[text, annotations]` pair.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(s) = value.as_str() {
            return Some(Run::plain(s));
        }
        let parts = value.as_array()?;
        let text = parts.first().and_then(Value::as_str).unwrap_or_default();
        let annotations = parts
            .get(1)
            .and_then(Value::as_array)
            .map(|marks| marks.iter().filter_map(Annotation::from_value).collect())
            .unwrap_or_default();
        Some(Run {
            text: text.to_string(),
            annotations,
        })
    }

    /// Render the run with its marks applied in canonical order.
    pub fn render(&self) -> String {
        let mut marks: Vec<&Annotation> = self.annotations.iter().collect();
        marks.sort_by_key(|a| a.rank());
        marks
            .into_iter()
            .fold(self.text.clone(), |acc, mark| mark.wrap(&acc))
    }
}

/// Parse a property value into runs. Entries that are not runs are skipped.
pub fn parse_runs(property: &Value) -> Vec<Run> {
    property
        .as_array()
        .map(|runs| runs.iter().filter_map(Run::from_value).collect())
        .unwrap_or_default()
}

/// Render a property value to inline Markdown.
///
/// An absent or empty property renders to the empty string.
pub fn render_rich_text(property: Option<&Value>) -> String {
    property
        .map(|p| parse_runs(p).iter().map(Run::render).collect::<String>())
        .unwrap_or_default()
}

/// The first segment of the first run (`prop[0][0]`), e.g. a language tag
/// or a link target. Bare-string runs count as their own first segment.
pub fn first_value(property: Option<&Value>) -> Option<&str> {
    let first_run = property?.as_array()?.first()?;
    match first_run {
        Value::String(s) => Some(s.as_str()),
        Value::Array(parts) => parts.first()?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(v: Value) -> String {
        render_rich_text(Some(&v))
    }

    #[test]
    fn plain_and_bare_runs_concatenate() {
        assert_eq!(render(json!([["Hello "], "world"])), "Hello world");
    }

    #[test]
    fn absent_or_empty_renders_empty() {
        assert_eq!(render_rich_text(None), "");
        assert_eq!(render(json!([])), "");
        assert_eq!(render(json!("not a run list")), "");
    }

    #[test]
    fn single_marks() {
        assert_eq!(render(json!([["x", [["b"]]]])), "**x**");
        assert_eq!(render(json!([["x", [["i"]]]])), "*x*");
        assert_eq!(render(json!([["x", [["c"]]]])), "`x`");
        assert_eq!(render(json!([["x", [["s"]]]])), "~~x~~");
        assert_eq!(render(json!([["x", [["a", "https://e.org"]]]])), "[x](https://e.org)");
    }

    #[test]
    fn link_wraps_outermost() {
        assert_eq!(
            render(json!([["text", [["b"], ["a", "https://u"]]]])),
            "[**text**](https://u)"
        );
        // Listed order does not matter.
        assert_eq!(
            render(json!([["text", [["a", "https://u"], ["b"]]]])),
            "[**text**](https://u)"
        );
    }

    #[test]
    fn all_marks_compose_in_fixed_order() {
        assert_eq!(
            render(json!([["t", [["s"], ["c"], ["a", "u"], ["i"], ["b"]]]])),
            "[~~`***t***`~~](u)"
        );
    }

    #[test]
    fn unknown_marks_are_ignored() {
        assert_eq!(render(json!([["t", [["h", "red"], ["b"]]]])), "**t**");
        assert_eq!(render(json!([["t", [["e"]]]])), "t");
    }

    #[test]
    fn first_value_reads_first_segment() {
        assert_eq!(first_value(Some(&json!([["python"]]))), Some("python"));
        assert_eq!(first_value(Some(&json!(["Yes"]))), Some("Yes"));
        assert_eq!(first_value(Some(&json!([]))), None);
        assert_eq!(first_value(Some(&json!([[1]]))), None);
        assert_eq!(first_value(None), None);
    }
}
