use select::document::Document;
use select::node::Node;
use select::predicate::Predicate;
use url::Url;

/// Elements whose contents never show up as visible text.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line when rendered.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// A parsed page plus the address it was read from.
pub struct Page {
    pub url: Url,
    pub document: Document,
}

impl Page {
    pub fn parse(url: Url, html: &str) -> Self {
        Page {
            url,
            document: Document::from(html),
        }
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// `content` of the first `<meta>` whose `property` (then `name`) matches.
    pub fn meta(&self, key: &str) -> Option<String> {
        let by_property = self
            .document
            .find(select::predicate::Name("meta"))
            .find(|n| n.attr("property") == Some(key));
        let node = by_property.or_else(|| {
            self.document
                .find(select::predicate::Name("meta"))
                .find(|n| n.attr("name") == Some(key))
        })?;
        node.attr("content")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.document
            .find(select::predicate::Name("title"))
            .next()
            .map(|n| n.text().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// One way of pulling a field's text out of a page.
pub trait ExtractionRule {
    fn attempt(&self, page: &Page) -> Option<String>;
}

/// Text of the first element matching the predicate.
pub struct Select<P>(pub P);

impl<P: Predicate + Clone> ExtractionRule for Select<P> {
    fn attempt(&self, page: &Page) -> Option<String> {
        let node = page.document.find(self.0.clone()).next()?;
        non_empty(visible_text(&node))
    }
}

/// Like [`Select`], but searched inside the first `scope` element when the
/// page has one, and across the whole page otherwise.
pub struct Scoped<S, P> {
    pub scope: S,
    pub target: P,
}

impl<S, P> ExtractionRule for Scoped<S, P>
where
    S: Predicate + Clone,
    P: Predicate + Clone,
{
    fn attempt(&self, page: &Page) -> Option<String> {
        let node = match page.document.find(self.scope.clone()).next() {
            Some(root) => root.find(self.target.clone()).next(),
            None => page.document.find(self.target.clone()).next(),
        }?;
        non_empty(visible_text(&node))
    }
}

pub type Rules = Vec<Box<dyn ExtractionRule>>;

/// First rule yielding non-empty text wins.
pub fn first_match(rules: &[Box<dyn ExtractionRule>], page: &Page) -> Option<String> {
    rules.iter().find_map(|rule| rule.attempt(page))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Approximates what a browser would show for the node: hidden elements are
/// skipped, block elements break lines, runs of whitespace collapse.
pub fn visible_text(node: &Node) -> String {
    let mut raw = String::new();
    collect_text(node, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(node: &Node, out: &mut String) {
    if let Some(text) = node.as_text() {
        // source newlines inside a text run are layout, not content
        out.push_str(&text.replace(['\n', '\r'], " "));
        return;
    }
    let Some(name) = node.name() else {
        return;
    };
    if HIDDEN_TAGS.contains(&name) {
        return;
    }
    let block = BLOCK_TAGS.contains(&name);
    if block || name == "br" {
        out.push('\n');
    }
    for child in node.children() {
        collect_text(&child, out);
    }
    if block {
        out.push('\n');
    }
}
