use std::io::Cursor;
use std::sync::LazyLock;

use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType, Table, TableCell, TableRow};
use regex::Regex;
use scraper::{ElementRef, Html, Node};

use super::{ConvertError, Renderer};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Embedded content with no document-model equivalent. Hitting one of these
/// fails the translation so the fallback gets a go at the posting.
const UNSUPPORTED_TAGS: &[&str] = &[
    "svg", "math", "iframe", "object", "embed", "video", "audio", "canvas", "form",
];

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "img", "head", "title", "meta", "link", "caption",
];

/// Deeper markup than this is handed to the fallback instead of walked.
const MAX_NESTING: usize = 256;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "aside", "nav", "blockquote",
    "center", "address", "figure", "figcaption", "pre", "dl", "dt", "dd", "li", "hr",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Emphasis {
    bold: bool,
    italic: bool,
    underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inline {
    Text { text: String, emphasis: Emphasis },
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Para {
    Heading { level: u8, runs: Vec<Inline> },
    Text { runs: Vec<Inline> },
    Item { depth: usize, marker: String, runs: Vec<Inline> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Para(Para),
    /// rows → cells → cell paragraphs
    Table(Vec<Vec<Vec<Para>>>),
}

/// Walks an HTML fragment and flattens it into paragraphs and tables.
#[derive(Default)]
struct Translator {
    blocks: Vec<Block>,
    current: Vec<Inline>,
    list_depth: usize,
    pending_marker: Option<String>,
    in_table: bool,
    nesting: usize,
}

impl Translator {
    fn walk(&mut self, el: ElementRef, emphasis: Emphasis) -> Result<(), ConvertError> {
        if self.nesting >= MAX_NESTING {
            return Err(ConvertError::Unsupported(format!(
                "nesting deeper than {} elements",
                MAX_NESTING
            )));
        }
        self.nesting += 1;
        let walked = self.walk_children(el, emphasis);
        self.nesting -= 1;
        walked
    }

    fn walk_children(&mut self, el: ElementRef, emphasis: Emphasis) -> Result<(), ConvertError> {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text, emphasis),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, emphasis)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn element(&mut self, el: ElementRef, emphasis: Emphasis) -> Result<(), ConvertError> {
        let tag = el.value().name();
        if UNSUPPORTED_TAGS.contains(&tag) {
            return Err(ConvertError::Unsupported(format!("<{}>", tag)));
        }
        if SKIPPED_TAGS.contains(&tag) {
            return Ok(());
        }
        if let Some(level) = heading_level(tag) {
            return self.heading(el, level);
        }

        match tag {
            "br" => {
                self.current.push(Inline::Break);
                Ok(())
            }
            "b" | "strong" => self.walk(el, Emphasis { bold: true, ..emphasis }),
            "i" | "em" | "cite" => self.walk(el, Emphasis { italic: true, ..emphasis }),
            "u" | "ins" | "a" => self.walk(el, Emphasis { underline: true, ..emphasis }),
            "ul" => self.list(el, false, emphasis),
            "ol" => self.list(el, true, emphasis),
            "table" => self.table(el),
            t if BLOCK_TAGS.contains(&t) => {
                self.flush();
                self.walk(el, emphasis)?;
                self.flush();
                Ok(())
            }
            _ => self.walk(el, emphasis),
        }
    }

    fn heading(&mut self, el: ElementRef, level: u8) -> Result<(), ConvertError> {
        self.flush();
        self.walk(el, Emphasis::default())?;
        if let Some(runs) = take_runs(&mut self.current) {
            self.blocks.push(Block::Para(Para::Heading { level, runs }));
        }
        Ok(())
    }

    fn list(&mut self, el: ElementRef, ordered: bool, emphasis: Emphasis) -> Result<(), ConvertError> {
        self.flush();
        self.list_depth += 1;
        let mut n = 0;
        for item in el.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                self.element(item, emphasis)?;
                continue;
            }
            n += 1;
            self.pending_marker = Some(if ordered { format!("{}.", n) } else { "•".to_string() });
            self.walk(item, emphasis)?;
            self.flush();
            self.pending_marker = None;
        }
        self.list_depth -= 1;
        Ok(())
    }

    fn table(&mut self, el: ElementRef) -> Result<(), ConvertError> {
        if self.in_table {
            return Err(ConvertError::Unsupported("nested <table>".into()));
        }
        self.flush();

        let mut rows = Vec::new();
        for row in table_rows(el) {
            let mut cells = Vec::new();
            for cell in row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
            {
                let mut sub = Translator {
                    in_table: true,
                    nesting: self.nesting,
                    ..Default::default()
                };
                let emphasis = Emphasis {
                    bold: cell.value().name() == "th",
                    ..Default::default()
                };
                sub.walk(cell, emphasis)?;
                sub.flush();
                cells.push(
                    sub.blocks
                        .into_iter()
                        .filter_map(|b| match b {
                            Block::Para(p) => Some(p),
                            Block::Table(_) => None,
                        })
                        .collect(),
                );
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if !rows.is_empty() {
            self.blocks.push(Block::Table(rows));
        }
        Ok(())
    }

    fn push_text(&mut self, raw: &str, emphasis: Emphasis) {
        let collapsed = WHITESPACE.replace_all(raw, " ");
        let text = if self.at_line_start() {
            collapsed.trim_start()
        } else {
            &*collapsed
        };
        if text.is_empty() {
            return;
        }

        if let Some(Inline::Text { text: prev, emphasis: e }) = self.current.last_mut() {
            if *e == emphasis {
                prev.push_str(text);
                return;
            }
        }
        self.current.push(Inline::Text {
            text: text.to_string(),
            emphasis,
        });
    }

    fn at_line_start(&self) -> bool {
        match self.current.last() {
            None | Some(Inline::Break) => true,
            Some(Inline::Text { text, .. }) => text.ends_with(' '),
        }
    }

    fn flush(&mut self) {
        let Some(runs) = take_runs(&mut self.current) else {
            return;
        };
        let para = match self.pending_marker.take() {
            Some(marker) => Para::Item {
                depth: self.list_depth,
                marker,
                runs,
            },
            None => Para::Text { runs },
        };
        self.blocks.push(Block::Para(para));
    }
}

/// Take the pending runs with trailing whitespace and breaks removed; `None`
/// if nothing visible is left.
fn take_runs(current: &mut Vec<Inline>) -> Option<Vec<Inline>> {
    let mut runs = std::mem::take(current);
    loop {
        let drop_last = match runs.last_mut() {
            Some(Inline::Break) => true,
            Some(Inline::Text { text, .. }) => {
                let len = text.trim_end().len();
                text.truncate(len);
                text.is_empty()
            }
            None => break,
        };
        if !drop_last {
            break;
        }
        runs.pop();
    }
    (!runs.is_empty()).then_some(runs)
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| c.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn translate(html: &str) -> Result<Vec<Block>, ConvertError> {
    let fragment = Html::parse_fragment(html);
    let mut translator = Translator::default();
    translator.walk(fragment.root_element(), Emphasis::default())?;
    translator.flush();
    Ok(translator.blocks)
}

// ── Document model ──

fn styles() -> Vec<Style> {
    let mut styles = vec![Style::new("Title", StyleType::Paragraph)
        .name("Title")
        .size(56)
        .bold()];
    for (level, size) in [(1, 32), (2, 28), (3, 26), (4, 24), (5, 24), (6, 24)] {
        styles.push(
            Style::new(format!("Heading{}", level), StyleType::Paragraph)
                .name(format!("Heading {}", level))
                .size(size)
                .bold(),
        );
    }
    styles
}

fn with_runs(mut p: Paragraph, runs: &[Inline]) -> Paragraph {
    for inline in runs {
        let run = match inline {
            Inline::Break => Run::new().add_break(BreakType::TextWrapping),
            Inline::Text { text, emphasis } => {
                let mut run = Run::new().add_text(text.as_str());
                if emphasis.bold {
                    run = run.bold();
                }
                if emphasis.italic {
                    run = run.italic();
                }
                if emphasis.underline {
                    run = run.underline("single");
                }
                run
            }
        };
        p = p.add_run(run);
    }
    p
}

fn paragraph(para: &Para) -> Paragraph {
    match para {
        Para::Heading { level, runs } => {
            with_runs(Paragraph::new().style(&format!("Heading{}", level)), runs)
        }
        Para::Text { runs } => with_runs(Paragraph::new(), runs),
        Para::Item { depth, marker, runs } => {
            let indent = "    ".repeat(depth.saturating_sub(1));
            let lead = Run::new().add_text(format!("{}{} ", indent, marker));
            with_runs(Paragraph::new().add_run(lead), runs)
        }
    }
}

fn table(rows: &[Vec<Vec<Para>>]) -> Table {
    let rows = rows
        .iter()
        .map(|cells| {
            TableRow::new(
                cells
                    .iter()
                    .map(|paras| {
                        // a cell must hold at least one paragraph
                        if paras.is_empty() {
                            return TableCell::new().add_paragraph(Paragraph::new());
                        }
                        paras
                            .iter()
                            .fold(TableCell::new(), |cell, p| cell.add_paragraph(paragraph(p)))
                    })
                    .collect(),
            )
        })
        .collect();
    Table::new(rows)
}

fn build(title: &str, blocks: &[Block]) -> Docx {
    let mut docx = styles().into_iter().fold(Docx::new(), Docx::add_style);
    docx = docx.add_paragraph(Paragraph::new().style("Title").add_run(Run::new().add_text(title)));
    for block in blocks {
        docx = match block {
            Block::Para(p) => docx.add_paragraph(paragraph(p)),
            Block::Table(rows) => docx.add_table(table(rows)),
        };
    }
    docx
}

/// Primary strategy: translate the markup ourselves and build a .docx with
/// docx-rs, the job name as its title.
pub struct DocxRenderer;

impl Renderer for DocxRenderer {
    fn name(&self) -> &'static str {
        "docx-rs"
    }

    fn render(&self, html: &str, title: &str) -> Result<Vec<u8>, ConvertError> {
        let blocks = translate(html)?;
        let mut buf = Cursor::new(Vec::new());
        build(title, &blocks)
            .build()
            .pack(&mut buf)
            .map_err(|e| ConvertError::Render(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text {
            text: s.to_string(),
            emphasis: Emphasis::default(),
        }
    }

    fn bold(s: &str) -> Inline {
        Inline::Text {
            text: s.to_string(),
            emphasis: Emphasis { bold: true, ..Default::default() },
        }
    }

    #[test]
    fn paragraphs_and_inline_emphasis() {
        let blocks = translate("<div><p>Location:  <strong>Munich</strong>\n now</p><p>  </p></div>").unwrap();
        assert_eq!(
            blocks,
            vec![Block::Para(Para::Text {
                runs: vec![text("Location: "), bold("Munich"), text(" now")],
            })]
        );
    }

    #[test]
    fn headings_keep_level() {
        let blocks = translate("<h2>Responsibilities</h2><p>Build</p>").unwrap();
        assert_eq!(
            blocks[0],
            Block::Para(Para::Heading { level: 2, runs: vec![text("Responsibilities")] })
        );
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn nested_lists_get_markers_and_depth() {
        let blocks = translate("<ol><li>One<ul><li>sub</li></ul></li><li>Two</li></ol>").unwrap();
        let items: Vec<(usize, String)> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Para(Para::Item { depth, marker, .. }) => Some((*depth, marker.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            items,
            vec![(1, "1.".to_string()), (2, "•".to_string()), (1, "2.".to_string())]
        );
    }

    #[test]
    fn line_breaks_inside_paragraph() {
        let blocks = translate("<p>a<br>b<br></p>").unwrap();
        assert_eq!(
            blocks,
            vec![Block::Para(Para::Text { runs: vec![text("a"), Inline::Break, text("b")] })]
        );
    }

    #[test]
    fn tables_collect_cells() {
        let blocks = translate("<table><tr><th>Salary</th><td>EUR 3,200</td></tr></table>").unwrap();
        match &blocks[0] {
            Block::Table(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][0], vec![Para::Text { runs: vec![bold("Salary")] }]);
                assert_eq!(rows[0][1], vec![Para::Text { runs: vec![text("EUR 3,200")] }]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn scripts_are_dropped() {
        let blocks = translate("<p>keep</p><script>alert(1)</script>").unwrap();
        assert_eq!(blocks, vec![Block::Para(Para::Text { runs: vec![text("keep")] })]);
    }

    #[test]
    fn embedded_content_is_unsupported() {
        let err = translate("<div><p>x</p><svg><circle/></svg></div>").unwrap_err();
        assert!(matches!(err, ConvertError::Unsupported(ref t) if t == "<svg>"));
    }

    #[test]
    fn nested_tables_are_unsupported() {
        let html = "<table><tr><td><table><tr><td>inner</td></tr></table></td></tr></table>";
        assert!(matches!(translate(html), Err(ConvertError::Unsupported(_))));
    }

    #[test]
    fn deep_nesting_is_unsupported() {
        let depth = 10_000;
        let html = format!(
            "<div class=\"content\">{}deep{}</div>",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        assert!(matches!(translate(&html), Err(ConvertError::Unsupported(_))));
    }

    #[test]
    fn nesting_within_limit_translates() {
        let html = format!("{}ok{}", "<span>".repeat(100), "</span>".repeat(100));
        let blocks = translate(&html).unwrap();
        assert_eq!(blocks, vec![Block::Para(Para::Text { runs: vec![text("ok")] })]);
    }

    #[test]
    fn renders_a_docx_package() {
        let html = std::fs::read_to_string("tests/fixtures/posting.html").unwrap();
        let content = crate::parser::content::extract_content(&html).unwrap();
        let bytes = DocxRenderer.render(&content, "site-engineer-germany").unwrap();
        // .docx is a zip container
        assert!(bytes.starts_with(b"PK"));
    }
}
