use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::models::{BlockId, BlockRole, BlockStore, Document, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("Line {line}: text outside a list item")]
    StrayText { line: usize },
    #[error("Outline could not be built: {0}")]
    Store(#[from] StoreError),
}

/// A list item whose block may not exist yet
#[derive(Debug, Default)]
struct ItemFrame {
    text: String,
    block: Option<BlockId>,
}

/// Build a document from a nested Markdown bullet list.
///
/// Every list item becomes a text-bearing block nested under the item that
/// contains it. Top-level items share one hub; a thematic break (`---`)
/// starts the next hub. Inline markup is flattened to its text, code spans
/// keep their backticks and line breaks become spaces.
pub fn parse_outline(markdown: &str) -> Result<Document, OutlineError> {
    let mut doc = Document::new();
    let mut hub: Option<BlockId> = None;
    let mut items: Vec<ItemFrame> = Vec::new();

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Item) => items.push(ItemFrame::default()),
            Event::Start(Tag::List(_)) => {
                // Children follow, so the enclosing item must exist first
                if !items.is_empty() {
                    materialize(&mut doc, &mut hub, &mut items)?;
                }
            }
            Event::End(TagEnd::Item) => {
                materialize(&mut doc, &mut hub, &mut items)?;
                items.pop();
            }
            Event::Rule => hub = None,
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                push_text(&mut doc, &mut items, &text, markdown, range.start)?;
            }
            Event::Code(code) => {
                push_text(&mut doc, &mut items, &format!("`{code}`"), markdown, range.start)?;
            }
            Event::SoftBreak | Event::HardBreak => {
                push_text(&mut doc, &mut items, " ", markdown, range.start)?;
            }
            _ => {}
        }
    }

    log::debug!("parsed outline into {} blocks", doc.block_count());
    Ok(doc)
}

/// Create the block for the innermost item if it has none yet
fn materialize(
    doc: &mut Document,
    hub: &mut Option<BlockId>,
    items: &mut [ItemFrame],
) -> Result<(), OutlineError> {
    let Some((item, outer)) = items.split_last_mut() else {
        return Ok(());
    };
    if item.block.is_some() {
        return Ok(());
    }
    let parent = match outer.last().and_then(|frame| frame.block) {
        Some(block) => block,
        None => *hub.get_or_insert_with(|| doc.append_hub()),
    };
    let text = item.text.trim().to_string();
    item.block = Some(doc.append_block(parent, BlockRole::Content, Some(&text))?);
    Ok(())
}

fn push_text(
    doc: &mut Document,
    items: &mut [ItemFrame],
    text: &str,
    markdown: &str,
    offset: usize,
) -> Result<(), OutlineError> {
    let Some(item) = items.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        let line = markdown[..offset].matches('\n').count() + 1;
        return Err(OutlineError::StrayText { line });
    };
    match item.block {
        // Text after a nested list continues the item's own run
        Some(block) => {
            let end = doc.text_of(block).map_or(0, |text| text.chars().count());
            doc.insert_text(block, end, text)?;
        }
        None => item.text.push_str(text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Indented dump of the tree, one line per block
    fn dump(doc: &Document) -> String {
        fn walk(doc: &Document, id: BlockId, depth: usize, out: &mut Vec<String>) {
            let role = match doc.role(id) {
                Some(BlockRole::Root) => "root".to_string(),
                Some(BlockRole::Hub) => "hub".to_string(),
                Some(BlockRole::Content) => format!("{:?}", doc.text_of(id).unwrap_or_default()),
                None => "?".to_string(),
            };
            out.push(format!("{}{}", "  ".repeat(depth), role));
            for child in doc.children(id) {
                walk(doc, *child, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(doc, doc.root(), 0, &mut out);
        out.join("\n")
    }

    #[test]
    fn test_nested_list_builds_tree() {
        let doc = parse_outline("- alpha\n  - alpha one\n  - alpha two\n- beta\n").unwrap();

        assert_snapshot!(dump(&doc), @r#"
        root
          hub
            "alpha"
              "alpha one"
              "alpha two"
            "beta"
        "#);
    }

    #[test]
    fn test_rules_split_hubs() {
        let doc = parse_outline("- one\n\n---\n\n- two\n  - three\n").unwrap();

        assert_snapshot!(dump(&doc), @r#"
        root
          hub
            "one"
          hub
            "two"
              "three"
        "#);
    }

    #[test]
    fn test_inline_markup_is_flattened() {
        let doc = parse_outline("- **bold** and `code`\n- soft\n  wrapped\n").unwrap();

        assert_snapshot!(doc.to_outline(), @r"
        - bold and `code`
        - soft wrapped
        ");
    }

    #[rstest]
    #[case("- alpha\n  - alpha one\n- beta\n- gamma")]
    #[case("- 日本語\n  - deeper\n    - deepest")]
    #[case("- a\n\n---\n\n- b")]
    fn test_rendered_outline_parses_back(#[case] markdown: &str) {
        let doc = parse_outline(markdown).unwrap();
        assert_eq!(doc.to_outline(), markdown);
    }

    #[test]
    fn test_loose_list_items() {
        let doc = parse_outline("- first\n\n- second\n").unwrap();
        assert_eq!(doc.to_outline(), "- first\n- second");
    }

    #[test]
    fn test_empty_input_has_no_hub() {
        let doc = parse_outline("").unwrap();
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_text_outside_list_is_rejected() {
        let err = parse_outline("- fine\n\nstray paragraph\n").unwrap_err();
        assert!(matches!(err, OutlineError::StrayText { line: 3 }));
    }
}
