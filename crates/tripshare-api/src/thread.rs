//! Reply trees. A post's comments are loaded into an arena keyed by id, with
//! the parent stored as an optional id; trees are rebuilt by index lookup.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use tripshare_db::models::CommentRow;
use tripshare_types::api::CommentView;

use crate::media::MediaUrls;
use crate::views::{parse_id, parse_timestamp, user_summary};

/// Deepest reply nesting rendered. Inserts are held to the same bound, so
/// only rows written around the db layer are ever cut off.
pub const MAX_THREAD_DEPTH: usize = tripshare_db::MAX_REPLY_DEPTH;

pub struct CommentArena {
    nodes: HashMap<String, CommentRow>,
    /// parent id → child ids, in the order the rows were given
    children: HashMap<String, Vec<String>>,
}

impl CommentArena {
    /// Build from a post's comments, oldest first, so replies render in
    /// chronological order under their parent.
    pub fn build(rows: Vec<CommentRow>) -> Self {
        let mut nodes = HashMap::with_capacity(rows.len());
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for row in rows {
            if let Some(parent) = &row.parent_comment_id {
                children.entry(parent.clone()).or_default().push(row.id.clone());
            }
            nodes.insert(row.id.clone(), row);
        }

        Self { nodes, children }
    }

    pub fn get(&self, id: &str) -> Option<&CommentRow> {
        self.nodes.get(id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn replies_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// A comment without its replies.
pub fn comment_view(row: &CommentRow, media: &MediaUrls) -> CommentView {
    CommentView {
        id: parse_id(&row.id, "comment id"),
        post_id: parse_id(&row.post_id, "post id"),
        user: user_summary(
            &row.user_id,
            &row.author_username,
            row.author_avatar.as_deref(),
            media,
        ),
        content: row.content.clone(),
        parent_comment_id: row
            .parent_comment_id
            .as_deref()
            .map(|p| parse_id(p, "parent comment id")),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        replies: Vec::new(),
    }
}

/// Render `root` with all of its replies, recursively.
///
/// The parent relation is acyclic by construction, but the walk still keeps
/// a visited set and a depth limit so bad rows can never loop it.
pub fn render_tree(arena: &CommentArena, root: &CommentRow, media: &MediaUrls) -> CommentView {
    let mut visited = HashSet::new();
    visited.insert(root.id.clone());
    render_node(arena, root, media, 0, &mut visited)
}

fn render_node(
    arena: &CommentArena,
    row: &CommentRow,
    media: &MediaUrls,
    depth: usize,
    visited: &mut HashSet<String>,
) -> CommentView {
    let mut view = comment_view(row, media);

    let replies = arena.replies_of(&row.id);
    if replies.is_empty() {
        return view;
    }
    if depth >= MAX_THREAD_DEPTH {
        warn!(
            "Comment thread under '{}' exceeds {} levels; truncating",
            row.id, MAX_THREAD_DEPTH
        );
        return view;
    }

    for child_id in replies {
        if !visited.insert(child_id.clone()) {
            warn!("Comment '{}' reached twice while rendering; skipping", child_id);
            continue;
        }
        if let Some(child) = arena.get(child_id) {
            view.replies
                .push(render_node(arena, child, media, depth + 1, visited));
        }
    }

    view
}
