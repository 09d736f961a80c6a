/*!
 * Object literals in JavaScript and TypeScript modules.
 *
 * The module is parsed with tree-sitter and every string or template literal
 * that is the value of an object property becomes a translatable leaf.
 * Templates with `${...}` substitutions are never touched. Translations are
 * spliced back into the original text at the literals' byte ranges, so
 * imports, comments, identifiers and formatting survive as written.
 */

use std::collections::HashSet;
use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};

use crate::errors::ParseError;
use crate::parsers::ContentParser;
use crate::translation::grouping::{self, KeyedLeaf, SCRIPT_CATCH_ALL};
use crate::translation::unit::{TranslationResult, TranslationUnit};

/// Script language of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    JavaScript,
    TypeScript,
}

impl ScriptDialect {
    fn language(&self) -> tree_sitter::Language {
        match self {
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

/// Quoting of a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    Double,
    Single,
    Template,
}

impl LiteralStyle {
    fn quote(&self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
            Self::Template => '`',
        }
    }

    fn from_literal(raw: &str) -> Self {
        match raw.chars().next() {
            Some('\'') => Self::Single,
            Some('`') => Self::Template,
            _ => Self::Double,
        }
    }
}

/// A translatable literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLeaf {
    /// Keys of the enclosing properties, array indices included
    pub object_path: Vec<String>,
    /// `string_N` or `template_N`, numbered across the whole module
    pub synthetic_path: String,
    pub identity: String,
    /// Decoded literal value
    pub value: String,
    /// Byte range of the literal, quotes included
    pub range: Range<usize>,
    pub style: LiteralStyle,
}

/// Parsed script module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDocument {
    pub source: String,
    pub dialect: ScriptDialect,
    pub leaves: Vec<ScriptLeaf>,
}

/// Parser for `.js` and `.ts` translation modules
#[derive(Debug, Clone, Copy)]
pub struct ScriptParser {
    dialect: ScriptDialect,
}

impl ScriptParser {
    pub fn new(dialect: ScriptDialect) -> Self {
        Self { dialect }
    }

    pub fn javascript() -> Self {
        Self::new(ScriptDialect::JavaScript)
    }

    pub fn typescript() -> Self {
        Self::new(ScriptDialect::TypeScript)
    }

    fn parse_tree(&self, source: &str) -> Result<Tree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.dialect.language())
            .map_err(|e| ParseError::Script(format!("Failed to load grammar: {}", e)))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Script("Parser returned no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root)
                .map(|n| n.start_position())
                .unwrap_or_else(|| root.start_position());
            return Err(ParseError::Script(format!(
                "Syntax error at line {}, column {}",
                position.row + 1,
                position.column + 1
            )));
        }
        Ok(tree)
    }
}

struct LeafCollector<'s> {
    source: &'s str,
    counter: usize,
    leaves: Vec<ScriptLeaf>,
    identities: HashSet<String>,
}

impl<'s> LeafCollector<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn visit(&mut self, node: Node<'_>, path: &mut Vec<String>) {
        match node.kind() {
            "pair" => self.visit_pair(node, path),
            "array" => {
                let mut cursor = node.walk();
                let items: Vec<Node<'_>> = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                for (index, item) in items.into_iter().enumerate() {
                    path.push(index.to_string());
                    self.visit(item, path);
                    path.pop();
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.visit(child, path);
                }
            }
        }
    }

    fn visit_pair(&mut self, pair: Node<'_>, path: &mut Vec<String>) {
        let (Some(key), Some(value)) = (pair.child_by_field_name("key"), pair.child_by_field_name("value")) else {
            return;
        };
        path.push(self.key_name(key));
        match value.kind() {
            "string" => self.push_leaf(value, path, "string"),
            "template_string" => {
                if !has_substitution(value) {
                    self.push_leaf(value, path, "template");
                }
            }
            _ => self.visit(value, path),
        }
        path.pop();
    }

    fn key_name(&self, key: Node<'_>) -> String {
        let raw = self.text(key);
        match key.kind() {
            "string" => decode_literal(strip_quotes(raw)),
            _ => raw.to_string(),
        }
    }

    fn push_leaf(&mut self, literal: Node<'_>, path: &[String], prefix: &str) {
        let raw = self.text(literal);
        let synthetic_path = format!("{}_{}", prefix, self.counter);
        self.counter += 1;

        let joined = path.join(".");
        let identity = if !joined.is_empty() && !self.identities.contains(&joined) {
            joined
        } else {
            synthetic_path.clone()
        };
        self.identities.insert(identity.clone());

        self.leaves.push(ScriptLeaf {
            object_path: path.to_vec(),
            synthetic_path,
            identity,
            value: decode_literal(strip_quotes(raw)),
            range: literal.byte_range(),
            style: LiteralStyle::from_literal(raw),
        });
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn has_substitution(template: Node<'_>) -> bool {
    let mut cursor = template.walk();
    let found = template
        .named_children(&mut cursor)
        .any(|child| child.kind() == "template_substitution");
    found
}

fn strip_quotes(raw: &str) -> &str {
    if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { raw }
}

/// Decode the escape sequences of a literal body
pub fn decode_literal(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex, 'u');
            }
            other => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str, marker: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(hex);
        }
    }
}

/// Encode a value as a literal with the given quoting
pub fn encode_literal(value: &str, style: LiteralStyle) -> String {
    let quote = style.quote();
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' if style != LiteralStyle::Template => out.push_str("\\n"),
            '\r' if style != LiteralStyle::Template => out.push_str("\\r"),
            '$' if style == LiteralStyle::Template && chars.peek() == Some(&'{') => out.push_str("\\$"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl ContentParser for ScriptParser {
    type Tree = ScriptDocument;

    fn parse(&self, content: &str) -> Result<ScriptDocument, ParseError> {
        let tree = self.parse_tree(content)?;
        let mut collector = LeafCollector {
            source: content,
            counter: 0,
            leaves: Vec::new(),
            identities: HashSet::new(),
        };
        collector.visit(tree.root_node(), &mut Vec::new());

        Ok(ScriptDocument {
            source: content.to_string(),
            dialect: self.dialect,
            leaves: collector.leaves,
        })
    }

    fn serialize(&self, tree: &ScriptDocument) -> Result<String, ParseError> {
        Ok(tree.source.clone())
    }

    fn extract_units(&self, tree: &ScriptDocument) -> Vec<TranslationUnit> {
        let leaves = tree
            .leaves
            .iter()
            .map(|leaf| KeyedLeaf {
                address: if leaf.object_path.is_empty() {
                    vec![leaf.synthetic_path.clone()]
                } else {
                    leaf.object_path.clone()
                },
                identity: leaf.identity.clone(),
                value: leaf.value.clone(),
            })
            .collect();
        grouping::group_leaves(leaves, SCRIPT_CATCH_ALL)
    }

    fn reconstruct(&self, tree: &ScriptDocument, result: &TranslationResult) -> Result<ScriptDocument, ParseError> {
        let mut replacements: Vec<(Range<usize>, String)> = tree
            .leaves
            .iter()
            .filter_map(|leaf| {
                let value = result.get(&leaf.identity)?;
                (value != leaf.value).then(|| (leaf.range.clone(), encode_literal(value, leaf.style)))
            })
            .collect();
        if replacements.is_empty() {
            return Ok(tree.clone());
        }

        replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut source = tree.source.clone();
        for (range, literal) in replacements {
            source.replace_range(range, &literal);
        }
        ScriptParser::new(tree.dialect).parse(&source)
    }
}
