//! Asset resolution: scored fuzzy-name matching over a design-node tree.
//!
//! Pure functions over an immutable tree snapshot; resolution never fails,
//! it either finds a best-scoring node or reports not-found via `None`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Tier for an exact case-insensitive name match.
pub const EXACT_MATCH_SCORE: u32 = 1000;
/// Tier for a hyphenated node name matching its space-separated form.
pub const NORMALIZED_MATCH_SCORE: u32 = 900;
/// Base tier for a substring match in either direction.
pub const SUBSTRING_MATCH_SCORE: u32 = 50;
/// Added per word shared between the target and the node name.
pub const WORD_OVERLAP_BONUS: u32 = 10;

/// Node kinds in a design file's content tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Instance,
    Component,
    Frame,
    Group,
    Rectangle,
    Ellipse,
    Text,
    Vector,
    Canvas,
    Other,
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The design-tool API grows node types over time; anything
        // unrecognized folds into `Other` instead of failing the parse.
        let raw = String::deserialize(deserializer)?;
        Ok(NodeKind::from_api(&raw))
    }
}

impl NodeKind {
    /// Maps a raw API type string onto a kind, defaulting to [`Other`].
    ///
    /// [`Other`]: NodeKind::Other
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "INSTANCE" => NodeKind::Instance,
            "COMPONENT" => NodeKind::Component,
            "FRAME" => NodeKind::Frame,
            "GROUP" => NodeKind::Group,
            "RECTANGLE" => NodeKind::Rectangle,
            "ELLIPSE" => NodeKind::Ellipse,
            "TEXT" => NodeKind::Text,
            "VECTOR" => NodeKind::Vector,
            "CANVAS" => NodeKind::Canvas,
            _ => NodeKind::Other,
        }
    }
    /// Export-usefulness bonus, independent of the text score.
    ///
    /// Text nodes frequently carry a component's name (a button's label)
    /// but are never the exportable asset, so they rank below everything
    /// even on an exact name hit. These are heuristic constants, kept for
    /// behavioral compatibility; tune freely.
    pub fn export_bonus(self) -> u32 {
        match self {
            NodeKind::Instance => 1000,
            NodeKind::Component => 800,
            NodeKind::Frame => 600,
            NodeKind::Group => 400,
            NodeKind::Rectangle | NodeKind::Ellipse => 200,
            NodeKind::Text => 0,
            NodeKind::Vector | NodeKind::Canvas | NodeKind::Other => 100,
        }
    }
}

/// Read-only view of a design-file node. The core never mutates the tree;
/// it only scores and selects from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Text content, present on TEXT leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(default)]
    pub children: Vec<DesignNode>,
}

/// Scores how well a node name matches the requested target name.
///
/// Zero means no lexical relation; such nodes are not candidates at all.
pub fn name_match_score(node_name: &str, target: &str) -> u32 {
    let target = target.to_lowercase();
    let target = target.trim();
    let node = node_name.to_lowercase();

    if node == target {
        return EXACT_MATCH_SCORE;
    }
    if node.replace('-', " ") == target || target.replace(' ', "-") == node {
        return NORMALIZED_MATCH_SCORE;
    }
    if target.contains(node.as_str()) || node.contains(target) {
        let target_words: HashSet<&str> = target.split_whitespace().collect();
        let node_words: HashSet<&str> = node.split_whitespace().collect();
        let overlap = target_words.intersection(&node_words).count() as u32;
        return SUBSTRING_MATCH_SCORE + overlap * WORD_OVERLAP_BONUS;
    }
    0
}

/// Finds the node best matching `target` and returns its id.
///
/// Single pre-order walk (explicit stack, deterministic order); each node's
/// combined score is its text score plus the kind bonus, and only nodes
/// with a nonzero text score compete. Ties keep the first node seen.
pub fn resolve_asset<'a>(tree: &'a DesignNode, target: &str) -> Option<&'a str> {
    let mut best: Option<(&str, u32)> = None;
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        let text_score = name_match_score(&node.name, target);
        if text_score > 0 {
            let total = text_score + node.kind.export_bonus();
            if best.map_or(true, |(_, best_score)| total > best_score) {
                best = Some((node.id.as_str(), total));
            }
        }
        for child in node.children.iter().rev() {
            stack.push(child);
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str, name: &str, kind: NodeKind) -> DesignNode {
        DesignNode {
            id: id.into(),
            name: name.into(),
            kind,
            characters: None,
            children: vec![],
        }
    }

    fn canvas(children: Vec<DesignNode>) -> DesignNode {
        DesignNode {
            id: "0:0".into(),
            name: "Page 1".into(),
            kind: NodeKind::Canvas,
            characters: None,
            children,
        }
    }

    #[test]
    fn exact_match_beats_substring_match() {
        assert_eq!(name_match_score("Button", "button"), EXACT_MATCH_SCORE);
        assert!(name_match_score("Button", "button") > name_match_score("Button Large", "button"));
    }

    #[test]
    fn hyphenated_node_names_match_spaced_targets() {
        assert_eq!(
            name_match_score("ice-cream-cone", "ice cream cone"),
            NORMALIZED_MATCH_SCORE
        );
        // Normalization is one-directional: a spaced node name does not
        // match a hyphenated target (and shares no substring with it).
        assert_eq!(name_match_score("ice cream cone", "ice-cream-cone"), 0);
    }

    #[test]
    fn substring_score_grows_with_word_overlap() {
        // "primary button" vs "button": one shared word.
        assert_eq!(
            name_match_score("primary button", "button"),
            SUBSTRING_MATCH_SCORE + WORD_OVERLAP_BONUS
        );
        // Two shared words.
        assert_eq!(
            name_match_score("primary button", "primary button large"),
            SUBSTRING_MATCH_SCORE + 2 * WORD_OVERLAP_BONUS
        );
    }

    #[test]
    fn unrelated_names_score_zero() {
        assert_eq!(name_match_score("Avatar", "button"), 0);
    }

    #[test]
    fn instance_wins_over_frame_and_text_on_equal_names() {
        let tree = canvas(vec![
            leaf("text-1", "Button", NodeKind::Text),
            leaf("frame-1", "Button", NodeKind::Frame),
            leaf("instance-1", "Button", NodeKind::Instance),
        ]);
        assert_eq!(resolve_asset(&tree, "Button"), Some("instance-1"));
    }

    #[test]
    fn normalized_match_outranks_short_exact_substring_noise() {
        let tree = canvas(vec![
            leaf("ice-plain", "ice", NodeKind::Frame),
            leaf("cone-1", "ice-cream-cone", NodeKind::Frame),
        ]);
        // "ice" only substring-matches the target; the hyphen-normalized
        // exact match wins.
        assert_eq!(resolve_asset(&tree, "ice cream cone"), Some("cone-1"));
    }

    #[test]
    fn nothing_matches_means_not_found() {
        let tree = canvas(vec![
            leaf("a", "Avatar", NodeKind::Component),
            leaf("b", "Navbar", NodeKind::Frame),
        ]);
        assert_eq!(resolve_asset(&tree, "zzz-unrelated"), None);
    }

    #[test]
    fn first_seen_wins_ties_in_preorder() {
        let tree = canvas(vec![
            leaf("first", "Button", NodeKind::Instance),
            leaf("second", "Button", NodeKind::Instance),
        ]);
        assert_eq!(resolve_asset(&tree, "Button"), Some("first"));
    }

    #[test]
    fn deep_nodes_are_considered() {
        let tree = canvas(vec![DesignNode {
            id: "frame-1".into(),
            name: "Hero".into(),
            kind: NodeKind::Frame,
            characters: None,
            children: vec![leaf("nested", "ice-cream-cone", NodeKind::Instance)],
        }]);
        assert_eq!(resolve_asset(&tree, "ice cream cone"), Some("nested"));
    }

    #[test]
    fn node_kind_deserializes_from_api_strings() {
        let node: DesignNode = serde_json::from_str(
            r#"{"id": "1:2", "name": "Star", "type": "BOOLEAN_OPERATION"}"#,
        )
        .unwrap();
        assert_eq!(node.kind, NodeKind::Other);
        assert!(node.children.is_empty());

        let text: DesignNode = serde_json::from_str(
            r#"{"id": "1:3", "name": "Label", "type": "TEXT", "characters": "Buy now"}"#,
        )
        .unwrap();
        assert_eq!(text.kind, NodeKind::Text);
        assert_eq!(text.characters.as_deref(), Some("Buy now"));
    }
}
