//! Sort engine: computes the moves that bring a bookmark tree into order.
//!
//! Every container is handled independently. Its direct children are split
//! into folders and bookmarks, folders are ordered by title and bookmarks by
//! the configured comparator, and the two groups are concatenated according
//! to the folder placement. The root and ignored folders keep their own order
//! but their subfolders are still visited.

use tracing::debug;

use crate::bookmarks::BookmarkNode;
use crate::compare::{comparator_for, compare_by_title, compare_factors};
use crate::moves::MoveOperation;
use crate::options::{CompareBy, ExtensionOptions, FolderPlacement};
use crate::url_factor::UrlFactors;

/// Stable partition of `children` into (folders, bookmarks).
pub fn group_children(children: &[BookmarkNode]) -> (Vec<&BookmarkNode>, Vec<&BookmarkNode>) {
    children.iter().partition(|child| child.is_folder())
}

/// Compute the moves needed to sort everything below `root`.
///
/// The root's own children are never reordered.
pub fn compute_moves(root: &BookmarkNode, options: &ExtensionOptions) -> Vec<MoveOperation> {
    let mut moves = Vec::new();
    sort_level(root, options, true, &mut moves);
    moves
}

fn sort_level(node: &BookmarkNode, options: &ExtensionOptions, is_root: bool, moves: &mut Vec<MoveOperation>) {
    let (folders, marks) = group_children(node.children());

    for folder in &folders {
        sort_level(folder, options, false, moves);
    }

    if is_root || options.is_ignored(&node.id) {
        debug!("Keeping order of {} children in {}", node.children().len(), node.id);
        return;
    }

    let folders = sort_folders(folders, options);
    let marks = sort_marks(marks, options);

    let target: Vec<&BookmarkNode> = match options.folder_placement {
        FolderPlacement::Top => folders.into_iter().chain(marks).collect(),
        FolderPlacement::Bottom => marks.into_iter().chain(folders).collect(),
    };

    let before = moves.len();
    plan_level(node, &target, moves);
    if moves.len() > before {
        debug!("Folder {} needs {} moves", node.id, moves.len() - before);
    }
}

fn sort_folders<'a>(mut folders: Vec<&'a BookmarkNode>, options: &ExtensionOptions) -> Vec<&'a BookmarkNode> {
    folders.sort_by(|a, b| compare_by_title(a, b, options.order));
    folders
}

fn sort_marks<'a>(marks: Vec<&'a BookmarkNode>, options: &ExtensionOptions) -> Vec<&'a BookmarkNode> {
    match options.compare_by {
        CompareBy::UrlSimple => {
            // Factors are computed once per bookmark for this pass.
            let mut keyed: Vec<(&BookmarkNode, Option<UrlFactors>)> = marks
                .into_iter()
                .map(|mark| (mark, UrlFactors::extract(mark.url.as_deref())))
                .collect();
            keyed.sort_by(|(_, af), (_, bf)| compare_factors(af.as_ref(), bf.as_ref(), options.order));
            keyed.into_iter().map(|(mark, _)| mark).collect()
        }
        other => {
            let compare = comparator_for(other);
            let mut marks = marks;
            marks.sort_by(|a, b| compare(a, b, options.order));
            marks
        }
    }
}

/// Replay `target` against the current child order and record a move for
/// every node that is not already in place.
///
/// A move removes the node and reinserts it at the target index, so applying
/// the emitted moves in order turns the current order into `target`.
fn plan_level(parent: &BookmarkNode, target: &[&BookmarkNode], moves: &mut Vec<MoveOperation>) {
    let mut working = parent.child_ids();

    for (index, node) in target.iter().enumerate() {
        let Some(current) = working.iter().position(|id| *id == node.id) else {
            continue;
        };
        if current == index {
            continue;
        }

        let id = working.remove(current);
        working.insert(index, id);
        moves.push(MoveOperation::new(&node.id, &parent.id, index));
    }
}

/// Apply `moves` to an owned tree using the same semantics as the stores.
/// Used to preview the outcome of a sort.
pub fn apply_to_tree(root: &mut BookmarkNode, moves: &[MoveOperation]) {
    for op in moves {
        let Some(parent) = root.find_parent_mut(&op.node_id) else {
            continue;
        };
        let Some(children) = parent.children.as_mut() else {
            continue;
        };
        let Some(current) = children.iter().position(|c| c.id == op.node_id) else {
            continue;
        };
        let node = children.remove(current);
        let index = op.index.min(children.len());
        children.insert(index, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::ROOT_NODE_ID;
    use crate::options::SortOrder;

    fn options(compare_by: CompareBy, order: SortOrder, placement: FolderPlacement) -> ExtensionOptions {
        ExtensionOptions {
            auto: false,
            order,
            compare_by,
            folder_placement: placement,
            folder_ignore: Default::default(),
        }
    }

    fn titles(node: &BookmarkNode) -> Vec<&str> {
        node.children().iter().map(|c| c.title.as_str()).collect()
    }

    fn tree() -> BookmarkNode {
        BookmarkNode::folder(
            ROOT_NODE_ID,
            "",
            vec![
                BookmarkNode::folder(
                    "1",
                    "Bookmarks bar",
                    vec![
                        BookmarkNode::bookmark("10", "Zulu", "https://z.example.org/"),
                        BookmarkNode::folder(
                            "11",
                            "Work",
                            vec![
                                BookmarkNode::bookmark("110", "beta", "https://beta.com/"),
                                BookmarkNode::bookmark("111", "Alpha", "https://alpha.com/"),
                            ],
                        ),
                        BookmarkNode::bookmark("12", "alpha", "https://a.example.org/"),
                        BookmarkNode::folder("13", "Archive", vec![]),
                    ],
                ),
                BookmarkNode::folder("2", "Other bookmarks", vec![]),
            ],
        )
    }

    fn sorted(root: &BookmarkNode, opts: &ExtensionOptions) -> BookmarkNode {
        let mut copy = root.clone();
        apply_to_tree(&mut copy, &compute_moves(root, opts));
        copy
    }

    #[test]
    fn test_group_children_stable() {
        let root = tree();
        let bar = root.find("1").unwrap();
        let (folders, marks) = group_children(bar.children());
        let folder_ids: Vec<_> = folders.iter().map(|n| n.id.as_str()).collect();
        let mark_ids: Vec<_> = marks.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(folder_ids, vec!["11", "13"]);
        assert_eq!(mark_ids, vec!["10", "12"]);
    }

    #[test]
    fn test_folders_on_top() {
        let opts = options(CompareBy::Title, SortOrder::Asc, FolderPlacement::Top);
        let result = sorted(&tree(), &opts);
        assert_eq!(titles(result.find("1").unwrap()), vec!["Archive", "Work", "alpha", "Zulu"]);
        assert_eq!(titles(result.find("11").unwrap()), vec!["Alpha", "beta"]);
    }

    #[test]
    fn test_folders_at_bottom_desc() {
        let opts = options(CompareBy::Title, SortOrder::Desc, FolderPlacement::Bottom);
        let result = sorted(&tree(), &opts);
        assert_eq!(titles(result.find("1").unwrap()), vec!["Zulu", "alpha", "Work", "Archive"]);
    }

    #[test]
    fn test_folders_sorted_by_title_regardless_of_compare_by() {
        let opts = options(CompareBy::Url, SortOrder::Asc, FolderPlacement::Top);
        let result = sorted(&tree(), &opts);
        let bar = titles(result.find("1").unwrap());
        assert_eq!(&bar[..2], &["Archive", "Work"]);
        // https://a.example.org/ < https://z.example.org/
        assert_eq!(&bar[2..], &["alpha", "Zulu"]);
    }

    #[test]
    fn test_root_never_reordered() {
        let root = BookmarkNode::folder(
            ROOT_NODE_ID,
            "",
            vec![
                BookmarkNode::folder("2", "Zeta", vec![]),
                BookmarkNode::bookmark("3", "Alpha", "https://alpha.com/"),
                BookmarkNode::folder("1", "Beta", vec![]),
            ],
        );
        let opts = options(CompareBy::Title, SortOrder::Asc, FolderPlacement::Top);
        assert!(compute_moves(&root, &opts).is_empty());
    }

    #[test]
    fn test_ignored_folder_keeps_order_but_descendants_sorted() {
        let mut opts = options(CompareBy::Title, SortOrder::Asc, FolderPlacement::Top);
        opts.folder_ignore.insert("1".to_string());

        let original = tree();
        let result = sorted(&original, &opts);
        assert_eq!(result.find("1").unwrap().child_ids(), original.find("1").unwrap().child_ids());
        assert_eq!(titles(result.find("11").unwrap()), vec!["Alpha", "beta"]);
    }

    #[test]
    fn test_second_pass_emits_nothing() {
        for placement in [FolderPlacement::Top, FolderPlacement::Bottom] {
            for compare_by in [CompareBy::Title, CompareBy::Url, CompareBy::UrlSimple] {
                let opts = options(compare_by, SortOrder::Desc, placement);
                let once = sorted(&tree(), &opts);
                assert!(compute_moves(&once, &opts).is_empty(), "{:?} {:?}", compare_by, placement);
            }
        }
    }

    #[test]
    fn test_plan_handles_reversed_order() {
        // A naive "skip if the snapshot index already matches" would leave
        // the middle node misplaced here.
        let parent = BookmarkNode::folder(
            "5",
            "f",
            vec![
                BookmarkNode::bookmark("c", "c", "https://c.com/"),
                BookmarkNode::bookmark("b", "b", "https://b.com/"),
                BookmarkNode::bookmark("a", "a", "https://a.com/"),
            ],
        );
        let root = BookmarkNode::folder(ROOT_NODE_ID, "", vec![parent]);
        let opts = options(CompareBy::Title, SortOrder::Asc, FolderPlacement::Top);
        let result = sorted(&root, &opts);
        assert_eq!(titles(result.find("5").unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_service_order_with_unparsable_last() {
        let parent = BookmarkNode::folder(
            "5",
            "f",
            vec![
                BookmarkNode::bookmark("bad", "bad", "notaurl"),
                BookmarkNode::bookmark("y", "y", "http://b.example.com/y"),
                BookmarkNode::bookmark("x", "x", "https://a.example.com/x"),
                BookmarkNode::bookmark("z", "z", "https://example.com/z"),
            ],
        );
        let root = BookmarkNode::folder(ROOT_NODE_ID, "", vec![parent]);

        let asc = sorted(&root, &options(CompareBy::UrlSimple, SortOrder::Asc, FolderPlacement::Top));
        assert_eq!(titles(asc.find("5").unwrap()), vec!["z", "x", "y", "bad"]);

        let desc = sorted(&root, &options(CompareBy::UrlSimple, SortOrder::Desc, FolderPlacement::Top));
        assert_eq!(titles(desc.find("5").unwrap()), vec!["y", "x", "z", "bad"]);
    }

    #[test]
    fn test_moves_target_direct_parent() {
        let opts = options(CompareBy::Title, SortOrder::Asc, FolderPlacement::Top);
        let root = tree();
        for op in compute_moves(&root, &opts) {
            let parent = root.find(&op.parent_id).unwrap();
            assert!(parent.children().iter().any(|c| c.id == op.node_id));
            assert!(op.index < parent.children().len());
        }
    }
}
