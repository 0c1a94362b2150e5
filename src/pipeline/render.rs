//! Block rendering: one block → one Markdown fragment.
//!
//! Rendering is a pure function of a single record. No state is carried
//! between siblings, which is why numbered-list items all use the literal
//! `1.` marker and leave numbering to the Markdown renderer.
//!
//! A record without a value renders to the empty string. Blocks missing the
//! properties their type expects fall back to empty text rather than failing.

use crate::document::{Block, BlockRecord, BlockType};
use crate::pipeline::rich_text::{first_value, render_rich_text};

/// Render one record to its Markdown fragment.
pub fn render_record(record: &BlockRecord) -> String {
    record.value.as_ref().map(render_block).unwrap_or_default()
}

/// Render one block to its Markdown fragment.
pub fn render_block(block: &Block) -> String {
    let title = render_rich_text(block.property("title"));

    match block.kind() {
        BlockType::Page | BlockType::Header => format!("# {title}\n\n"),
        BlockType::SubHeader => format!("## {title}\n\n"),
        BlockType::SubSubHeader => format!("### {title}\n\n"),
        BlockType::Text => {
            if title.is_empty() {
                "\n".to_string()
            } else {
                format!("{title}\n\n")
            }
        }
        BlockType::BulletedList => format!("- {title}\n"),
        BlockType::NumberedList => format!("1. {title}\n"),
        BlockType::ToDo => {
            let checked = first_value(block.property("checked")) == Some("Yes");
            format!("- [{}] {title}\n", if checked { 'x' } else { ' ' })
        }
        BlockType::Code => {
            let language = first_value(block.property("language")).unwrap_or_default();
            format!("```{language}\n{title}\n```\n\n")
        }
        BlockType::Quote => format!("> {title}\n\n"),
        BlockType::Divider => "---\n\n".to_string(),
        BlockType::Image => {
            let url = image_source(block);
            let caption = render_rich_text(block.property("caption"));
            let caption = if caption.is_empty() { "image".to_string() } else { caption };
            format!("![{caption}]({url})\n\n")
        }
        BlockType::Bookmark => {
            let url = first_value(block.property("link")).unwrap_or_default();
            let label = if title.is_empty() { url } else { title.as_str() };
            format!("[{label}]({url})\n\n")
        }
        BlockType::Unknown(_) => {
            if title.is_empty() {
                String::new()
            } else {
                format!("{title}\n\n")
            }
        }
    }
}

/// `format.display_source`, else the first value of `properties.source`.
fn image_source(block: &Block) -> &str {
    block
        .format_str("display_source")
        .filter(|s| !s.is_empty())
        .or_else(|| first_value(block.property("source")))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn block(kind: &str, properties: Value) -> Block {
        Block::from_value(&json!({"id": "b", "type": kind, "properties": properties}))
            .expect("object")
    }

    #[test]
    fn headings() {
        let title = json!({"title": [["Intro"]]});
        assert_eq!(render_block(&block("page", title.clone())), "# Intro\n\n");
        assert_eq!(render_block(&block("header", title.clone())), "# Intro\n\n");
        assert_eq!(render_block(&block("sub_header", title.clone())), "## Intro\n\n");
        assert_eq!(render_block(&block("sub_sub_header", title)), "### Intro\n\n");
    }

    #[test]
    fn text_paragraph_and_empty_line() {
        let para = block("text", json!({"title": [["Hello "], ["world", [["b"]]]]}));
        assert_eq!(render_block(&para), "Hello **world**\n\n");
        assert_eq!(render_block(&block("text", json!({}))), "\n");
    }

    #[test]
    fn list_items() {
        let title = json!({"title": [["item"]]});
        assert_eq!(render_block(&block("bulleted_list", title.clone())), "- item\n");
        assert_eq!(render_block(&block("numbered_list", title)), "1. item\n");
    }

    #[test]
    fn to_do_checked_only_on_yes() {
        let done = block("to_do", json!({"title": [["ship"]], "checked": [["Yes"]]}));
        assert_eq!(render_block(&done), "- [x] ship\n");

        let no = block("to_do", json!({"title": [["ship"]], "checked": [["No"]]}));
        assert_eq!(render_block(&no), "- [ ] ship\n");

        let absent = block("to_do", json!({"title": [["ship"]]}));
        assert_eq!(render_block(&absent), "- [ ] ship\n");

        let lowercase = block("to_do", json!({"title": [["ship"]], "checked": [["yes"]]}));
        assert_eq!(render_block(&lowercase), "- [ ] ship\n");
    }

    #[test]
    fn code_block_uses_language_tag() {
        let code = block("code", json!({"title": [["print(1)"]], "language": [["python"]]}));
        assert_eq!(render_block(&code), "```python\nprint(1)\n```\n\n");

        let bare = block("code", json!({"title": [["ls"]]}));
        assert_eq!(render_block(&bare), "```\nls\n```\n\n");
    }

    #[test]
    fn quote_and_divider() {
        assert_eq!(
            render_block(&block("quote", json!({"title": [["wise"]]}))),
            "> wise\n\n"
        );
        assert_eq!(
            render_block(&block("divider", json!({"title": [["ignored"]], "x": 1}))),
            "---\n\n"
        );
    }

    #[test]
    fn image_prefers_display_source() {
        let img = Block::from_value(&json!({
            "id": "i", "type": "image",
            "properties": {"source": [["https://raw/src.png"]], "caption": [["a ", [["i"]]], ["cat"]]},
            "format": {"display_source": "https://s3.amazonaws.com/x/cat.png"}
        }))
        .unwrap();
        assert_eq!(
            render_block(&img),
            "![*a *cat](https://s3.amazonaws.com/x/cat.png)\n\n"
        );
    }

    #[test]
    fn image_falls_back_to_source_and_default_caption() {
        let img = block("image", json!({"source": [["https://raw/src.png"]]}));
        assert_eq!(render_block(&img), "![image](https://raw/src.png)\n\n");

        let nothing = block("image", json!({}));
        assert_eq!(render_block(&nothing), "![image]()\n\n");
    }

    #[test]
    fn bookmark_label_falls_back_to_url() {
        let titled = block("bookmark", json!({"title": [["Docs"]], "link": [["https://d.io"]]}));
        assert_eq!(render_block(&titled), "[Docs](https://d.io)\n\n");

        let untitled = block("bookmark", json!({"link": [["https://d.io"]]}));
        assert_eq!(render_block(&untitled), "[https://d.io](https://d.io)\n\n");
    }

    #[test]
    fn unknown_types_are_best_effort() {
        assert_eq!(
            render_block(&block("callout", json!({"title": [["note"]]}))),
            "note\n\n"
        );
        assert_eq!(render_block(&block("column_list", json!({}))), "");
    }

    #[test]
    fn record_without_value_is_empty() {
        assert_eq!(render_record(&BlockRecord::default()), "");
    }
}
