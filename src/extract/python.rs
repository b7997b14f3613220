//! Python declaration extraction using tree-sitter.

use tree_sitter::Node;

use super::{
    find_child_by_kind, node_text, with_python_parser, DeclarationKind, ParseError,
    ParsedDeclaration, SourceParser,
};

const TAB_WIDTH: usize = 8;

/// Node kinds the grammar accepts for Python 2 compatibility but Python 3
/// rejects as syntax errors.
const LEGACY_KINDS: &[&str] = &["print_statement", "exec_statement", "<>"];

/// Parser adapter for Python source files.
///
/// Reports module-level `class` and `def` statements (including `async def`
/// and decorated definitions) with their docstrings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for PythonParser {
    fn language(&self) -> &'static str {
        "Python"
    }

    fn extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn parse(&self, content: &str) -> Result<Vec<ParsedDeclaration>, ParseError> {
        let tree = with_python_parser(|parser| parser.parse(content, None))?
            .ok_or(ParseError::NoTree)?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error(root).unwrap_or((1, 1));
            return Err(ParseError::Syntax { line, column });
        }

        if let Some((line, column)) = first_legacy(root) {
            return Err(ParseError::Syntax { line, column });
        }

        let mut declarations = Vec::new();
        let mut cursor = root.walk();

        for child in root.named_children(&mut cursor) {
            let definition = if child.kind() == "decorated_definition" {
                match child.child_by_field_name("definition") {
                    Some(def) => def,
                    None => continue,
                }
            } else {
                child
            };

            if let Some(decl) = extract_definition(definition, content) {
                declarations.push(decl);
            }
        }

        Ok(declarations)
    }
}

/// 1-indexed position of the first error or missing node.
fn first_error(node: Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        return Some((pos.row + 1, pos.column + 1));
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|c| c.has_error())
        .find_map(first_error);
    found
}

/// 1-indexed position of the first Python 2 only construct, in source order.
fn first_legacy(root: Node) -> Option<(usize, usize)> {
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if LEGACY_KINDS.contains(&node.kind()) {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column + 1));
        }

        if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn extract_definition(node: Node, content: &str) -> Option<ParsedDeclaration> {
    let kind = match node.kind() {
        "function_definition" => DeclarationKind::Function,
        "class_definition" => DeclarationKind::Class,
        _ => return None,
    };

    let name = node
        .child_by_field_name("name")
        .or_else(|| find_child_by_kind(node, "identifier"))
        .map(|n| node_text(n, content).to_string())?;

    let doc = node
        .child_by_field_name("body")
        .and_then(|body| extract_docstring(body, content));

    Some(ParsedDeclaration {
        kind,
        name,
        doc,
        line: node.start_position().row + 1,
    })
}

/// Docstring of a block: its first statement, when that is a plain string literal.
fn extract_docstring(block: Node, content: &str) -> Option<String> {
    let mut cursor = block.walk();
    let first = block
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;

    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }

    let expr = first.named_child(0)?;
    let raw = match expr.kind() {
        "string" => string_value(expr, content)?,
        "concatenated_string" => {
            let mut joined = String::new();
            let mut parts = expr.walk();
            for part in expr.named_children(&mut parts) {
                if part.kind() == "comment" {
                    continue;
                }
                joined.push_str(&string_value(part, content)?);
            }
            joined
        }
        _ => return None,
    };

    let cleaned = clean_docstring(&raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Value of a string literal. `None` for f-strings and bytes, which never
/// count as docstrings.
fn string_value(node: Node, content: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }

    let start = find_child_by_kind(node, "string_start")?;
    let end = find_child_by_kind(node, "string_end")?;

    let prefix: String = node_text(start, content)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if prefix.contains('f') || prefix.contains('b') || prefix.contains('t') {
        return None;
    }

    let inner = content.get(start.end_byte()..end.start_byte())?;

    if prefix.contains('r') {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

/// Decode backslash escapes of a non-raw string literal. Malformed escapes and
/// `\N{...}` are kept verbatim.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };

        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\\' | '\'' | '"' => out.push(next),
            '\n' => {}
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars
                    .clone()
                    .take(width)
                    .take_while(char::is_ascii_hexdigit)
                    .collect();

                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);

                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;

    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }

    out
}

/// Normalize docstring indentation the way Python's `inspect.cleandoc` does:
/// the first line loses its leading whitespace, the rest lose their common
/// indentation, and blank leading and trailing lines are dropped.
fn clean_docstring(doc: &str) -> String {
    let lines: Vec<String> = doc.lines().map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ').count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start().to_string()
            } else {
                line.chars().skip(margin).collect()
            }
        })
        .collect();

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }

    let leading = cleaned.iter().take_while(|l| l.trim().is_empty()).count();

    cleaned[leading..].join("\n")
}
