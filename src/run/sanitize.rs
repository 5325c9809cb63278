use ego_tree::NodeRef;
use scraper::Html;
use scraper::node::Node;

const STRIPPED_TAGS: [&str; 8] = [
    "script", "style", "img", "a", "video", "audio", "iframe", "input",
];

/// Strip markup that carries no summarizable text: script and style blocks,
/// images, anchors (their text is dropped, not unwrapped), media embeds,
/// iframes and inputs. Returns the text of everything else in document
/// order. Best-effort parse — malformed markup never fails.
pub fn sanitize(raw: &str) -> String {
    let doc = Html::parse_document(raw);
    let mut text = String::new();
    collect_text(doc.tree.root(), &mut text);
    text
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) if STRIPPED_TAGS.contains(&el.name()) => {}
            _ => collect_text(child, out),
        }
    }
}
