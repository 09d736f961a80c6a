/*!
 * JSON key-value trees.
 *
 * Every string leaf is translatable. Objects contribute their keys and arrays
 * their indices to a leaf's address; numbers, booleans and nulls are left
 * alone. Key order is preserved so rewritten files diff cleanly.
 */

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::ParseError;
use crate::parsers::ContentParser;
use crate::translation::grouping::{self, JSON_CATCH_ALL, KeyedLeaf};
use crate::translation::unit::{TranslationResult, TranslationUnit};

/// Parser for JSON documents
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }

    /// All string leaves of a tree in document order, with unique identities
    pub fn collect_leaves(&self, tree: &Value) -> Vec<KeyedLeaf> {
        let mut raw = Vec::new();
        walk(tree, &mut Vec::new(), &mut raw);

        let mut seen: HashMap<String, usize> = HashMap::new();
        raw.into_iter()
            .map(|(address, value)| {
                let base = address.join(".");
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                let identity = if *count == 1 { base } else { format!("{}#{}", base, count) };
                KeyedLeaf { address, identity, value }
            })
            .collect()
    }
}

fn walk(value: &Value, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
    match value {
        Value::String(s) => out.push((path.clone(), s.clone())),
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                walk(child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(child, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Replace the string found at `address`; missing addresses are ignored
fn set_at(tree: &mut Value, address: &[String], replacement: &str) {
    let mut node = tree;
    for segment in address {
        let next = match node {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return,
        }
    }
    if node.is_string() {
        *node = Value::String(replacement.to_string());
    }
}

impl ContentParser for JsonParser {
    type Tree = Value;

    fn parse(&self, content: &str) -> Result<Value, ParseError> {
        let content = content.trim_start_matches('\u{feff}');
        Ok(serde_json::from_str(content)?)
    }

    fn serialize(&self, tree: &Value) -> Result<String, ParseError> {
        Ok(serde_json::to_string_pretty(tree)?)
    }

    fn extract_units(&self, tree: &Value) -> Vec<TranslationUnit> {
        grouping::group_leaves(self.collect_leaves(tree), JSON_CATCH_ALL)
    }

    fn reconstruct(&self, tree: &Value, result: &TranslationResult) -> Result<Value, ParseError> {
        let mut rebuilt = tree.clone();
        for leaf in self.collect_leaves(tree) {
            if let Some(value) = result.get(&leaf.identity) {
                set_at(&mut rebuilt, &leaf.address, value);
            }
        }
        Ok(rebuilt)
    }
}
