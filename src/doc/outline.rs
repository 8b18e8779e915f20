//! Outline (table of contents) tree built from the engine's outline list

/// Navigation target of an outline node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutlineTarget {
    /// Internal page (0-indexed), already resolved by the engine
    Page(usize),
    /// External URI
    External(String),
    /// Entry with no usable destination
    None,
}

/// A node in the document outline, nested per the PDF's own hierarchy
#[derive(Clone, Debug)]
pub struct OutlineNode {
    pub title: String,
    pub target: OutlineTarget,
    pub children: Vec<OutlineNode>,
}

/// Build the outline tree from the engine's recursive outline entries.
///
/// Entries with a blank title are skipped, their children are promoted
/// to the parent level so nothing below them is lost.
pub fn build_outline(outlines: &[mupdf::Outline]) -> Vec<OutlineNode> {
    let mut nodes = Vec::new();

    for outline in outlines {
        let target = if let Some(dest) = &outline.dest {
            OutlineTarget::Page(dest.loc.page_number as usize)
        } else if let Some(uri) = &outline.uri {
            OutlineTarget::External(uri.clone())
        } else {
            OutlineTarget::None
        };

        let children = if outline.down.is_empty() {
            Vec::new()
        } else {
            build_outline(&outline.down)
        };

        let title = outline.title.trim();
        if title.is_empty() {
            nodes.extend(children);
        } else {
            nodes.push(OutlineNode {
                title: title.to_string(),
                target,
                children,
            });
        }
    }

    nodes
}

/// Clamp an internal target to the document, `None` for external or
/// unresolvable targets.
pub fn resolve_target(target: &OutlineTarget, page_count: usize) -> Option<usize> {
    match target {
        OutlineTarget::Page(page) if page_count > 0 => {
            Some((*page).min(page_count.saturating_sub(1)))
        }
        _ => None,
    }
}

/// A row of the flattened outline as shown in the panel
#[derive(Clone, Debug)]
pub struct VisibleOutlineRow {
    /// Path of child indices from the root to this node
    pub path: Vec<usize>,
    pub depth: usize,
    pub title: String,
    pub target: OutlineTarget,
    pub has_children: bool,
}

/// Flatten the tree into display rows, descending only into expanded nodes.
///
/// `collapsed` holds the paths the user closed; everything else counts as
/// expanded (the panel starts fully expanded).
pub fn flatten_visible(nodes: &[OutlineNode], collapsed: &[Vec<usize>]) -> Vec<VisibleOutlineRow> {
    let mut rows = Vec::new();
    let mut path = Vec::new();
    flatten_into(nodes, collapsed, &mut path, 0, &mut rows);
    rows
}

fn flatten_into(
    nodes: &[OutlineNode],
    collapsed: &[Vec<usize>],
    path: &mut Vec<usize>,
    depth: usize,
    rows: &mut Vec<VisibleOutlineRow>,
) {
    for (idx, node) in nodes.iter().enumerate() {
        path.push(idx);
        rows.push(VisibleOutlineRow {
            path: path.clone(),
            depth,
            title: node.title.clone(),
            target: node.target.clone(),
            has_children: !node.children.is_empty(),
        });

        let is_collapsed = collapsed.iter().any(|c| c == path);
        if !node.children.is_empty() && !is_collapsed {
            flatten_into(&node.children, collapsed, path, depth + 1, rows);
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, page: usize, children: Vec<OutlineNode>) -> OutlineNode {
        OutlineNode {
            title: title.to_string(),
            target: OutlineTarget::Page(page),
            children,
        }
    }

    fn sample_tree() -> Vec<OutlineNode> {
        vec![
            node(
                "Chapter 1",
                0,
                vec![node("Section 1.1", 2, vec![]), node("Section 1.2", 5, vec![])],
            ),
            node("Chapter 2", 9, vec![]),
        ]
    }

    #[test]
    fn flatten_fully_expanded() {
        let rows = flatten_visible(&sample_tree(), &[]);
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Chapter 1", "Section 1.1", "Section 1.2", "Chapter 2"]
        );
        assert_eq!(rows[0].depth, 0);
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[3].depth, 0);
    }

    #[test]
    fn flatten_respects_collapsed_paths() {
        let collapsed = vec![vec![0]];
        let rows = flatten_visible(&sample_tree(), &collapsed);
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Chapter 2"]);
    }

    #[test]
    fn resolve_clamps_to_document() {
        assert_eq!(resolve_target(&OutlineTarget::Page(3), 10), Some(3));
        assert_eq!(resolve_target(&OutlineTarget::Page(99), 10), Some(9));
        assert_eq!(resolve_target(&OutlineTarget::Page(0), 0), None);
        assert_eq!(
            resolve_target(&OutlineTarget::External("https://example.com".into()), 10),
            None
        );
        assert_eq!(resolve_target(&OutlineTarget::None, 10), None);
    }
}
