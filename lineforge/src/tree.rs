use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::results::FileSearchResult;

/// One node of the display tree. Only leaf nodes carry an attached search
/// result; inner nodes are pure directory segments.
#[derive(Debug)]
pub struct ResultTreeNode {
    /// Path component, or several joined with `/` after compression
    pub segment: String,
    pub is_leaf: bool,
    pub children: BTreeMap<String, ResultTreeNode>,
    pub result: Option<FileSearchResult>,
}

impl ResultTreeNode {
    fn new(segment: impl Into<String>, is_leaf: bool) -> Self {
        Self {
            segment: segment.into(),
            is_leaf,
            children: BTreeMap::new(),
            result: None,
        }
    }

    fn child_entry(&mut self, segment: &str, is_leaf: bool) -> &mut ResultTreeNode {
        self.children
            .entry(segment.to_string())
            .or_insert_with(|| ResultTreeNode::new(segment, is_leaf))
    }

    /// Collapses single-child chains: while this node has exactly one child
    /// and that child is not a leaf, merge the child's segment into this
    /// node's and adopt its children. Applied recursively, so a chain of any
    /// length becomes one display row.
    fn compress(&mut self) {
        while self.children.len() == 1
            && self.children.values().next().map(|c| !c.is_leaf) == Some(true)
        {
            let key = self
                .children
                .keys()
                .next()
                .cloned()
                .unwrap_or_default();
            if let Some(child) = self.children.remove(&key) {
                self.segment = format!("{}/{}", self.segment, child.segment);
                self.children = child.children;
            }
        }

        for child in self.children.values_mut() {
            child.compress();
        }
    }

    fn format_into(&self, out: &mut String, prefix: &str, max_matches_per_file: usize) {
        let branch = if prefix.is_empty() { "" } else { "└── " };
        let _ = writeln!(out, "{}{}{}", prefix, branch, self.segment);

        if self.is_leaf {
            if let Some(result) = &self.result {
                // Indent the match rows under the branch symbol
                let indent = format!("{}{}", prefix, " ".repeat(branch.chars().count()));
                out.push_str(&result.format_matches(&indent, max_matches_per_file));
            }
        }

        let mut children: Vec<&ResultTreeNode> = self.children.values().collect();
        children.sort_by(|a, b| a.segment.cmp(&b.segment));
        let child_prefix = format!("{}    ", prefix);
        for child in children {
            child.format_into(out, &child_prefix, max_matches_per_file);
        }
    }
}

/// Directory tree aggregating many per-file search results for display.
#[derive(Debug, Default)]
pub struct ResultTree {
    root: Option<ResultTreeNode>,
}

impl ResultTree {
    /// Builds a tree from per-file results, optionally compressing
    /// single-child directory chains into one row.
    pub fn build(results: Vec<FileSearchResult>, compress: bool) -> Self {
        let mut tree = Self::default();
        for result in results {
            tree.insert(result);
        }
        if compress {
            if let Some(root) = &mut tree.root {
                root.compress();
            }
        }
        tree
    }

    fn insert(&mut self, result: FileSearchResult) {
        let parts: Vec<String> = result
            .path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(first) = parts.first() else {
            return;
        };

        let root = self
            .root
            .get_or_insert_with(|| ResultTreeNode::new(first.clone(), false));

        // The shared leading component becomes the root row itself
        let rest: &[String] = if *first == root.segment {
            &parts[1..]
        } else {
            &parts[..]
        };

        let mut node = root;
        let last = rest.len().saturating_sub(1);
        for (i, part) in rest.iter().enumerate() {
            node = node.child_entry(part, i == last);
        }
        node.result = Some(result);
    }

    /// Renders the tree depth-first, sorted by segment at each level. Leaf
    /// rows are followed by their matches, truncated per file.
    pub fn format(&self, max_matches_per_file: usize) -> String {
        let mut out = String::new();
        if let Some(root) = &self.root {
            root.format_into(&mut out, "", max_matches_per_file);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
