use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Named entities decoded in step text. `&BR/` variants are the tracker's
/// own spelling of an escaped line break and must precede `&gt;`.
const ENTITIES: &[(&str, &str)] = &[
    ("&BR/&gt;", "\n"),
    ("&BR/", "\n"),
    ("&amp;nbsp;", " "),
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

/// A run of adjacent block-level tags counts as a single boundary.
static BLOCK_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\s*</?(?:p|div|li|ul|ol|dl|dt|dd|tr|table|thead|tbody|tfoot|h[1-6]|blockquote|pre|hr|section|article|header|footer|nav|aside|main|figure|figcaption|address|details|summary|fieldset|legend|form)\b[^>]*>)+\s*",
    )
    .expect("valid block boundary regex")
});

static LIST_ITEM_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b").expect("valid list item regex"));

static CELL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:td|th)\b[^>]*>").expect("valid cell regex"));

/// Every other HTML element. `<button>` is left out: step text names UI
/// controls in angle brackets (`Click <button>`) and that must survive.
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:a|abbr|acronym|area|audio|b|base|basefont|bdi|bdo|big|blink|body|canvas|caption|center|cite|code|col|colgroup|data|datalist|del|dfn|dialog|dir|em|embed|font|frame|frameset|head|html|i|iframe|img|input|ins|kbd|label|link|map|mark|marquee|menu|meta|meter|nobr|noscript|object|optgroup|option|output|param|picture|progress|q|rp|rt|ruby|s|samp|script|select|slot|small|source|span|strike|strong|style|sub|sup|svg|template|textarea|time|title|tt|u|var|video|wbr|xml)\b[^>]*>",
    )
    .expect("valid inline tag regex")
});

/// Namespaced Office markup such as `<o:p>` or `<w:WordDocument>`.
static NAMESPACED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][\w.-]*:[A-Za-z][\w.-]*\b[^>]*>").expect("valid namespaced tag regex")
});

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid space regex"));

static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("valid newline regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Turns rich-text step content into plain text.
///
/// Entities are decoded, block boundaries become newlines (list items get a
/// `- ` marker), formatting tags are dropped, blank lines collapse to one and
/// horizontal whitespace to a single space. The markup passes repeat until
/// nothing changes, which also unwraps doubly escaped content; every
/// replacement shortens the text, so this terminates. The result is a fixed
/// point: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");

    loop {
        let next = strip_markup(&text);
        if next == text {
            break;
        }
        text = next;
    }

    collapse_whitespace(&text)
}

fn strip_markup(text: &str) -> String {
    let mut decoded = text.to_string();
    for (entity, replacement) in ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }

    let text = LINE_BREAK.replace_all(&decoded, "\n");
    let text = BLOCK_BOUNDARY.replace_all(&text, |caps: &Captures<'_>| {
        if LIST_ITEM_OPEN.is_match(&caps[0]) {
            "\n- "
        } else {
            "\n"
        }
    });
    let text = CELL_BOUNDARY.replace_all(&text, " ");
    let text = INLINE_TAG.replace_all(&text, "");
    NAMESPACED_TAG.replace_all(&text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    let text = text.replace('\u{a0}', " ");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
