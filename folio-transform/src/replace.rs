//! Fitting a slice into a document range.
//!
//! When a slice does not trivially fit the range it is meant to replace,
//! the [`Fitter`] incrementally places its content: it tracks the open left
//! spine of the output being built (the frontier, one content-match state
//! per depth) and repeatedly moves the most shallow placeable content of
//! the unplaced slice over, opening the slice further or dropping content
//! when nothing fits.

use tracing::instrument;

use folio_model::{
    Attrs, ContentMatch, Fragment, Node, NodeType, PositionError, ResolvedPos, Slice,
};

use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::step::Step;

/// 'Fit' a slice into a given position in the document, producing a step
/// that inserts it. Returns `None` when there is no meaningful change.
#[instrument(level = "trace", skip(doc, slice))]
pub fn replace_step(
    doc: &Node,
    from: usize,
    to: usize,
    slice: &Slice,
) -> Result<Option<Step>, PositionError> {
    if from == to && slice.size() == 0 {
        return Ok(None);
    }
    let rp_from = doc.resolve(from)?;
    let rp_to = doc.resolve(to)?;
    if fits_trivially(&rp_from, &rp_to, slice) {
        return Ok(Some(ReplaceStep::new(from, to, slice.clone(), false).into()));
    }
    Ok(Fitter::new(rp_from, rp_to, slice.clone()).fit())
}

pub(crate) fn fits_trivially(rp_from: &ResolvedPos, rp_to: &ResolvedPos, slice: &Slice) -> bool {
    slice.open_start() == 0
        && slice.open_end() == 0
        && rp_from.start(rp_from.depth()) == rp_to.start(rp_to.depth())
        && rp_from.parent().can_replace(
            rp_from.index(rp_from.depth()),
            rp_to.index(rp_to.depth()),
            Some(slice.content()),
        )
}

struct FrontierItem {
    node_type: NodeType,
    matched: ContentMatch,
}

struct Fittable {
    slice_depth: usize,
    frontier_depth: usize,
    parent: Option<Node>,
    inject: Option<Fragment>,
    wrap: Option<Vec<NodeType>>,
}

struct CloseLevel {
    depth: usize,
    fit: Fragment,
    move_to: ResolvedPos,
}

pub(crate) struct Fitter {
    rp_from: ResolvedPos,
    rp_to: ResolvedPos,
    unplaced: Slice,
    frontier: Vec<FrontierItem>,
    placed: Fragment,
}

impl Fitter {
    pub(crate) fn new(rp_from: ResolvedPos, rp_to: ResolvedPos, slice: Slice) -> Fitter {
        let mut frontier = Vec::with_capacity(rp_from.depth() + 1);
        for i in 0..=rp_from.depth() {
            let node = rp_from.node(i);
            frontier.push(FrontierItem {
                node_type: node.node_type().clone(),
                matched: node.content_match_at(rp_from.index_after(i)),
            });
        }
        let mut placed = Fragment::empty();
        for i in (1..=rp_from.depth()).rev() {
            placed = Fragment::from(rp_from.node(i).copy(placed));
        }
        Fitter {
            rp_from,
            rp_to,
            unplaced: slice,
            frontier,
            placed,
        }
    }

    fn depth(&self) -> usize {
        self.frontier.len() - 1
    }

    pub(crate) fn fit(mut self) -> Option<Step> {
        while self.unplaced.size() > 0 {
            if let Some(fittable) = self.find_fittable() {
                self.place_nodes(fittable);
            } else if !self.open_more() {
                self.drop_node();
            }
        }

        let move_inline = self.must_move_inline();
        let placed_size =
            self.placed.size() as isize - self.depth() as isize - self.rp_from.depth() as isize;
        let close_target = match move_inline {
            Some(pos) => self
                .rp_from
                .doc()
                .resolve(pos)
                .expect("inline move target lies inside the document"),
            None => self.rp_to.clone(),
        };
        let rp_to = self.close(close_target)?;

        let mut content = self.placed.clone();
        let mut open_start = self.rp_from.depth();
        let mut open_end = rp_to.depth();
        while open_start > 0 && open_end > 0 && content.child_count() == 1 {
            content = content
                .first_child()
                .expect("single child")
                .content()
                .clone();
            open_start -= 1;
            open_end -= 1;
        }
        let slice = Slice::new(content, open_start, open_end);

        if let Some(move_inline) = move_inline {
            return Some(
                ReplaceAroundStep::new(
                    self.rp_from.pos(),
                    move_inline,
                    self.rp_to.pos(),
                    self.rp_to.end(self.rp_to.depth()),
                    slice,
                    usize::try_from(placed_size).expect("placed content covers the open depths"),
                    false,
                )
                .into(),
            );
        }
        if slice.size() > 0 || self.rp_from.pos() != self.rp_to.pos() {
            return Some(ReplaceStep::new(self.rp_from.pos(), rp_to.pos(), slice, false).into());
        }
        None
    }

    /// Find a position on the frontier where the first remaining content of
    /// the unplaced slice can be placed. The first pass looks for direct
    /// fits (possibly after injecting filler content); the second pass
    /// allows wrapping the content in additional nodes.
    fn find_fittable(&self) -> Option<Fittable> {
        let mut start_depth = self.unplaced.open_start();
        {
            let mut cur = self.unplaced.content().clone();
            let mut open_end = self.unplaced.open_end();
            for d in 0..start_depth {
                let node = cur
                    .first_child()
                    .expect("open depth implies a child")
                    .clone();
                if cur.child_count() > 1 {
                    open_end = 0;
                }
                if node.node_type().spec().isolating && open_end <= d {
                    start_depth = d;
                    break;
                }
                cur = node.content().clone();
            }
        }

        for pass in 1..=2 {
            let top = if pass == 1 {
                start_depth
            } else {
                self.unplaced.open_start()
            };
            for slice_depth in (0..=top).rev() {
                let (parent, fragment) = if slice_depth > 0 {
                    let parent = content_at(self.unplaced.content(), slice_depth - 1)
                        .first_child()
                        .expect("open depth implies a child")
                        .clone();
                    let fragment = parent.content().clone();
                    (Some(parent), fragment)
                } else {
                    (None, self.unplaced.content().clone())
                };
                let first = fragment.first_child().cloned();
                for frontier_depth in (0..=self.depth()).rev() {
                    let node_type = self.frontier[frontier_depth].node_type.clone();
                    let matched = self.frontier[frontier_depth].matched.clone();
                    // Memoized lazily so that neither fill nor wrapping is
                    // computed unless the cheaper checks fail.
                    let mut inject: Option<Option<Fragment>> = None;
                    let mut wrap: Option<Option<Vec<NodeType>>> = None;

                    if pass == 1 {
                        let fits = if let Some(first) = &first {
                            matched.match_type(first.node_type()).is_some() || {
                                let filled = inject.get_or_insert_with(|| {
                                    matched.fill_before(
                                        &Fragment::from(first.clone()),
                                        false,
                                        0,
                                    )
                                });
                                filled.is_some()
                            }
                        } else {
                            parent
                                .as_ref()
                                .is_some_and(|p| node_type.compatible_content(p.node_type()))
                        };
                        if fits {
                            return Some(Fittable {
                                slice_depth,
                                frontier_depth,
                                parent,
                                inject: inject.flatten(),
                                wrap: None,
                            });
                        }
                    } else if let Some(first) = &first {
                        let wrapped = wrap
                            .get_or_insert_with(|| matched.find_wrapping(first.node_type()));
                        if wrapped.is_some() {
                            return Some(Fittable {
                                slice_depth,
                                frontier_depth,
                                parent,
                                inject: None,
                                wrap: wrapped.clone(),
                            });
                        }
                    }
                    if parent
                        .as_ref()
                        .is_some_and(|p| matched.match_type(p.node_type()).is_some())
                    {
                        break;
                    }
                }
            }
        }
        None
    }

    fn open_more(&mut self) -> bool {
        let content = self.unplaced.content().clone();
        let (open_start, open_end) = (self.unplaced.open_start(), self.unplaced.open_end());
        let inner = content_at(&content, open_start);
        if inner.child_count() == 0 || inner.first_child().is_some_and(Node::is_leaf) {
            return false;
        }
        let grown_end = if inner.size() + open_start >= content.size() - open_end {
            open_start + 1
        } else {
            0
        };
        self.unplaced = Slice::new(content, open_start + 1, open_end.max(grown_end));
        true
    }

    fn drop_node(&mut self) {
        let content = self.unplaced.content().clone();
        let (open_start, open_end) = (self.unplaced.open_start(), self.unplaced.open_end());
        let inner = content_at(&content, open_start);
        if inner.child_count() <= 1 && open_start > 0 {
            let open_at_end = content.size() - open_start <= open_start + inner.size();
            self.unplaced = Slice::new(
                drop_from_fragment(&content, open_start - 1, 1),
                open_start - 1,
                if open_at_end { open_start - 1 } else { open_end },
            );
        } else {
            self.unplaced = Slice::new(
                drop_from_fragment(&content, open_start, 1),
                open_start,
                open_end,
            );
        }
    }

    /// Move content from the unplaced slice at `slice_depth` to the
    /// frontier node at `frontier_depth`. Close open nodes below it, open
    /// wrappers when given, take as many siblings as the content match
    /// accepts, and update the unplaced slice accordingly.
    fn place_nodes(&mut self, fittable: Fittable) {
        let Fittable {
            slice_depth,
            frontier_depth,
            parent,
            inject,
            wrap,
        } = fittable;
        while self.depth() > frontier_depth {
            self.close_frontier_node();
        }
        if let Some(wrap) = wrap {
            for node_type in &wrap {
                self.open_frontier_node(node_type, None, None);
            }
        }

        let slice = self.unplaced.clone();
        let fragment = parent
            .as_ref()
            .map_or_else(|| slice.content().clone(), |p| p.content().clone());
        let open_start = slice.open_start() - slice_depth;
        let mut taken = 0;
        let mut add: Vec<Node> = Vec::new();
        let node_type = self.frontier[frontier_depth].node_type.clone();
        let mut matched = self.frontier[frontier_depth].matched.clone();
        if let Some(inject) = &inject {
            for i in 0..inject.child_count() {
                add.push(inject.child(i).clone());
            }
            matched = matched
                .match_fragment(inject, 0, inject.child_count())
                .expect("injected filler matches the frontier");
        }

        let mut open_end_count = (fragment.size() + slice_depth) as isize
            - (slice.content().size() - slice.open_end()) as isize;

        while taken < fragment.child_count() {
            let next = fragment.child(taken).clone();
            let Some(matches) = matched.match_type(next.node_type()) else {
                break;
            };
            taken += 1;
            if taken > 1 || open_start == 0 || next.content().size() > 0 {
                matched = matches;
                add.push(close_node_start(
                    &next.mark(node_type.allowed_marks(next.marks())),
                    if taken == 1 { open_start } else { 0 },
                    if taken == fragment.child_count() {
                        open_end_count
                    } else {
                        -1
                    },
                ));
            }
        }
        let to_end = taken == fragment.child_count();
        if !to_end {
            open_end_count = -1;
        }

        self.placed = add_to_fragment(&self.placed, frontier_depth, &Fragment::from_nodes(add));
        self.frontier[frontier_depth].matched = matched;

        if to_end
            && open_end_count < 0
            && parent
                .as_ref()
                .is_some_and(|p| *p.node_type() == self.frontier[self.depth()].node_type)
            && self.frontier.len() > 1
        {
            self.close_frontier_node();
        }

        let mut cur = fragment;
        for _ in 0..open_end_count.max(0) {
            let node = cur
                .last_child()
                .expect("open end count stays within the fragment depth")
                .clone();
            self.frontier.push(FrontierItem {
                node_type: node.node_type().clone(),
                matched: node.content_match_at(node.child_count()),
            });
            cur = node.content().clone();
        }

        self.unplaced = if to_end {
            if slice_depth == 0 {
                Slice::empty()
            } else {
                Slice::new(
                    drop_from_fragment(slice.content(), slice_depth - 1, 1),
                    slice_depth - 1,
                    if open_end_count < 0 {
                        slice.open_end()
                    } else {
                        slice_depth - 1
                    },
                )
            }
        } else {
            Slice::new(
                drop_from_fragment(slice.content(), slice_depth, taken),
                slice.open_start(),
                slice.open_end(),
            )
        };
    }

    /// When the destination sits inside a textblock but the frontier does
    /// not close inside one, the content after the destination has to be
    /// moved out of the way, past the inserted inline content. Returns the
    /// position up to which that content reaches.
    fn must_move_inline(&self) -> Option<usize> {
        if !self.rp_to.parent().is_textblock() {
            return None;
        }
        let top_type = self.frontier[self.depth()].node_type.clone();
        let top_match = self.frontier[self.depth()].matched.clone();
        let mut level: Option<Option<CloseLevel>> = None;

        if !top_type.is_textblock()
            || content_after_fits(&self.rp_to, self.rp_to.depth(), &top_type, &top_match, false)
                .is_none()
        {
            return None;
        }
        if self.rp_to.depth() == self.depth() {
            let level = level.get_or_insert_with(|| self.find_close_level(&self.rp_to));
            if level.as_ref().is_some_and(|l| l.depth == self.depth()) {
                return None;
            }
        }

        let mut depth = self.rp_to.depth();
        let mut after = self.rp_to.after(depth);
        while depth > 1 {
            depth -= 1;
            if after != self.rp_to.end(depth) {
                break;
            }
            after += 1;
        }
        Some(after)
    }

    fn find_close_level(&self, rp_to: &ResolvedPos) -> Option<CloseLevel> {
        for i in (0..=self.depth().min(rp_to.depth())).rev() {
            let matched = &self.frontier[i].matched;
            let node_type = &self.frontier[i].node_type;
            let drop_inner = i < rp_to.depth()
                && rp_to.end(i + 1) == rp_to.pos() + (rp_to.depth() - (i + 1));
            let Some(fit) = content_after_fits(rp_to, i, node_type, matched, drop_inner) else {
                continue;
            };
            let blocked = (0..i).rev().any(|d| {
                let matches = content_after_fits(
                    rp_to,
                    d,
                    &self.frontier[d].node_type,
                    &self.frontier[d].matched,
                    true,
                );
                !matches.is_some_and(|m| m.child_count() == 0)
            });
            if !blocked {
                let move_to = if drop_inner {
                    rp_to
                        .doc()
                        .resolve(rp_to.after(i + 1))
                        .expect("position after an ancestor is valid")
                } else {
                    rp_to.clone()
                };
                return Some(CloseLevel {
                    depth: i,
                    fit,
                    move_to,
                });
            }
        }
        None
    }

    fn close(&mut self, rp_to: ResolvedPos) -> Option<ResolvedPos> {
        let close = self.find_close_level(&rp_to)?;
        while self.depth() > close.depth {
            self.close_frontier_node();
        }
        if close.fit.child_count() > 0 {
            self.placed = add_to_fragment(&self.placed, close.depth, &close.fit);
        }
        let rp_to = close.move_to;
        for d in close.depth + 1..=rp_to.depth() {
            let node = rp_to.node(d).clone();
            let add = node
                .node_type()
                .content_match()
                .fill_before(node.content(), true, rp_to.index(d));
            self.open_frontier_node(&node.node_type().clone(), Some(node.attrs().clone()), add);
        }
        Some(rp_to)
    }

    fn open_frontier_node(
        &mut self,
        node_type: &NodeType,
        attrs: Option<Attrs>,
        content: Option<Fragment>,
    ) {
        let depth = self.depth();
        let top = &mut self.frontier[depth];
        top.matched = top
            .matched
            .match_type(node_type)
            .expect("frontier accepts the opened node");
        let node = node_type
            .create(attrs.as_ref(), content, None)
            .expect("opened node types have complete attributes");
        self.placed = add_to_fragment(&self.placed, depth, &Fragment::from(node));
        self.frontier.push(FrontierItem {
            node_type: node_type.clone(),
            matched: node_type.content_match().clone(),
        });
    }

    fn close_frontier_node(&mut self) {
        let open = self.frontier.pop().expect("non-empty frontier");
        let add = open.matched.fill_before(&Fragment::empty(), true, 0);
        if let Some(add) = add {
            if add.child_count() > 0 {
                self.placed = add_to_fragment(&self.placed, self.frontier.len(), &add);
            }
        }
    }
}

fn drop_from_fragment(fragment: &Fragment, depth: usize, count: usize) -> Fragment {
    if depth == 0 {
        return fragment.cut_by_index(count, fragment.child_count());
    }
    let first = fragment.first_child().expect("open depth implies a child");
    fragment.replace_child(
        0,
        first.copy(drop_from_fragment(first.content(), depth - 1, count)),
    )
}

fn add_to_fragment(fragment: &Fragment, depth: usize, content: &Fragment) -> Fragment {
    if depth == 0 {
        return fragment.append(content);
    }
    let last = fragment.last_child().expect("open depth implies a child");
    fragment.replace_child(
        fragment.child_count() - 1,
        last.copy(add_to_fragment(last.content(), depth - 1, content)),
    )
}

fn content_at(fragment: &Fragment, depth: usize) -> Fragment {
    let mut fragment = fragment.clone();
    for _ in 0..depth {
        fragment = fragment
            .first_child()
            .expect("open depth implies a child")
            .content()
            .clone();
    }
    fragment
}

fn close_node_start(node: &Node, open_start: usize, open_end: isize) -> Node {
    if open_start == 0 {
        return node.clone();
    }
    let mut frag = node.content().clone();
    if open_start > 1 {
        let first = frag.first_child().expect("open start implies a child").clone();
        let closed = close_node_start(
            &first,
            open_start - 1,
            if frag.child_count() == 1 {
                open_end - 1
            } else {
                0
            },
        );
        frag = frag.replace_child(0, closed);
    }
    let fill = node
        .node_type()
        .content_match()
        .fill_before(&frag, false, 0)
        .expect("opened content can be closed at the start");
    frag = fill.append(&frag);
    if open_end <= 0 {
        let matched = node
            .node_type()
            .content_match()
            .match_fragment(&frag, 0, frag.child_count())
            .expect("filled content matches");
        let fill_end = matched
            .fill_before(&Fragment::empty(), true, 0)
            .expect("opened content can be closed at the end");
        frag = frag.append(&fill_end);
    }
    node.copy(frag)
}

fn content_after_fits(
    rp_to: &ResolvedPos,
    depth: usize,
    node_type: &NodeType,
    matched: &ContentMatch,
    open: bool,
) -> Option<Fragment> {
    let node = rp_to.node(depth);
    let index = if open {
        rp_to.index_after(depth)
    } else {
        rp_to.index(depth)
    };
    if index == node.child_count() && !node_type.compatible_content(node.node_type()) {
        return None;
    }
    let fit = matched.fill_before(node.content(), true, index)?;
    if invalid_marks(node_type, node.content(), index) {
        return None;
    }
    Some(fit)
}

fn invalid_marks(node_type: &NodeType, fragment: &Fragment, start: usize) -> bool {
    (start..fragment.child_count()).any(|i| !node_type.allows_marks(fragment.child(i).marks()))
}

/// Closes the left side of a fragment down from `old_open` to `new_open`
/// levels, filling the opened nodes so they become complete.
pub(crate) fn close_fragment(
    fragment: &Fragment,
    depth: usize,
    old_open: usize,
    new_open: usize,
    parent: Option<&Node>,
) -> Fragment {
    let mut fragment = fragment.clone();
    if depth < old_open {
        let first = fragment
            .first_child()
            .expect("open depth implies a child")
            .clone();
        let inner = close_fragment(first.content(), depth + 1, old_open, new_open, Some(&first));
        fragment = fragment.replace_child(0, first.copy(inner));
    }
    if depth > new_open {
        let parent = parent.expect("a parent exists above the new open depth");
        let matched = parent.content_match_at(0);
        let fill = matched
            .fill_before(&fragment, false, 0)
            .expect("fragment can be closed at the start");
        let start = fill.append(&fragment);
        let matched = matched
            .match_fragment(&start, 0, start.child_count())
            .expect("filled content matches");
        let fill_end = matched
            .fill_before(&Fragment::empty(), true, 0)
            .expect("fragment can be closed at the end");
        fragment = start.append(&fill_end);
    }
    fragment
}

/// Returns the depths at which both positions sit directly on the boundary
/// of a shared ancestor, from innermost outward.
pub(crate) fn covered_depths(rp_from: &ResolvedPos, rp_to: &ResolvedPos) -> Vec<usize> {
    let mut result = Vec::new();
    let min_depth = rp_from.depth().min(rp_to.depth());
    for d in (0..=min_depth).rev() {
        let start = rp_from.start(d);
        if start < rp_from.pos() - (rp_from.depth() - d)
            || rp_to.end(d) > rp_to.pos() + (rp_to.depth() - d)
            || rp_from.node(d).node_type().spec().isolating
            || rp_to.node(d).node_type().spec().isolating
        {
            break;
        }
        let joined_textblocks = d == rp_from.depth()
            && d == rp_to.depth()
            && rp_from.parent().inline_content()
            && rp_to.parent().inline_content()
            && d > 0
            && rp_to.start(d - 1) == start - 1;
        if start == rp_to.start(d) || joined_textblocks {
            result.push(d);
        }
    }
    result
}
