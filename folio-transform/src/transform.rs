//! The transform builder: a document plus an accumulating sequence of
//! steps, their intermediate documents, and the combined position mapping.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use folio_model::{
    text_length, Attrs, ContentMatch, Fragment, Mark, MarkType, Node, NodeRange, NodeType, Slice,
};

use crate::attr_step::{AttrStep, DocAttrStep};
use crate::error::TransformError;
use crate::map::{Mappable, Mapping};
use crate::mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
use crate::replace::{close_fragment, covered_depths, fits_trivially, replace_step};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::step::Step;
use crate::structure::{can_change_type, insert_point, TypeAndAttrs};

static NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n|\r").expect("valid pattern"));

fn defines_content(node_type: &NodeType) -> bool {
    node_type.spec().defining || node_type.spec().defining_for_content
}

/// An accumulation of document changes. A transform starts from one
/// document and applies steps one at a time, keeping every intermediate
/// document (so steps can be inverted against their exact pre-image) and
/// the combined [`Mapping`] that translates positions across the whole
/// sequence. A transform is a single-writer builder; the documents it holds
/// are immutable values that may be freely shared.
pub struct Transform {
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    /// Create a transform that starts with the given document.
    pub fn new(doc: Node) -> Transform {
        Transform {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document (the result of applying the steps in the
    /// transform).
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The steps in this transform.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The documents before each of the steps.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    /// A mapping with the maps for each of the steps in this transform.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// The starting document.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    /// True when the document has been changed (when there are any steps).
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a new step in this transform, saving the result.
    ///
    /// # Errors
    /// Returns a [`TransformError`] when the step fails to apply.
    pub fn step(&mut self, step: impl Into<Step>) -> Result<&mut Self, TransformError> {
        self.maybe_step(step.into()).map_err(TransformError::Step)?;
        Ok(self)
    }

    /// Try to apply a step in this transform. Unlike
    /// [`step`](Transform::step), a failed step is reported as an ordinary
    /// value and leaves the transform untouched.
    pub fn maybe_step(&mut self, step: Step) -> Result<(), crate::StepError> {
        let doc = step.apply(&self.doc)?;
        self.add_step(step, doc);
        Ok(())
    }

    fn add_step(&mut self, step: Step, doc: Node) {
        trace!(step = step.step_type(), "applied step");
        self.docs.push(self.doc.clone());
        self.mapping.append_map(step.get_map(), None);
        self.steps.push(step);
        self.doc = doc;
    }

    /// Add the given mark to the inline content between `from` and `to`.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, parent, _index| {
            if !node.is_inline() {
                return true;
            }
            let marks = node.marks();
            let allowed = parent
                .map_or(false, |p| p.node_type().allows_mark_type(mark.mark_type()));
            if !mark.is_in_set(marks) && allowed {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(marks);
                for old in marks {
                    if !old.is_in_set(&new_set) {
                        match removed.last_mut() {
                            Some(last) if last.1 == start && last.2 == *old => last.1 = end,
                            _ => removed.push((start, end, old.clone())),
                        }
                    }
                }
                match added.last_mut() {
                    Some(last) if last.1 == start => last.1 = end,
                    _ => added.push((start, end)),
                }
            }
            true
        });
        for (from, to, mark) in removed {
            self.step(RemoveMarkStep::new(from, to, mark))?;
        }
        for (from, to) in added {
            self.step(AddMarkStep::new(from, to, mark.clone()))?;
        }
        Ok(self)
    }

    /// Remove the given mark from the inline content between `from` and
    /// `to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self, TransformError> {
        self.remove_matched_marks(from, to, |node| {
            if mark.is_in_set(node.marks()) {
                vec![mark.clone()]
            } else {
                Vec::new()
            }
        })
    }

    /// Remove all marks of the given type from the inline content between
    /// `from` and `to`.
    pub fn remove_mark_by_type(
        &mut self,
        from: usize,
        to: usize,
        mark_type: &MarkType,
    ) -> Result<&mut Self, TransformError> {
        self.remove_matched_marks(from, to, |node| {
            let mut found = Vec::new();
            let mut set = node.marks().to_vec();
            while let Some(mark) = mark_type.is_in_set(&set).cloned() {
                set = mark.remove_from_set(&set);
                found.push(mark);
            }
            found
        })
    }

    /// Remove all marks from the inline content between `from` and `to`.
    pub fn remove_marks(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.remove_matched_marks(from, to, |node| node.marks().to_vec())
    }

    fn remove_matched_marks(
        &mut self,
        from: usize,
        to: usize,
        to_remove: impl Fn(&Node) -> Vec<Mark>,
    ) -> Result<&mut Self, TransformError> {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc.nodes_between(from, to, &mut |node, pos, _parent, _index| {
            if !node.is_inline() {
                return true;
            }
            step += 1;
            let remove = to_remove(node);
            if !remove.is_empty() {
                let end = (pos + node.node_size()).min(to);
                for mark in remove {
                    let found = matched
                        .iter_mut()
                        .find(|m| m.step == step - 1 && m.mark == mark);
                    match found {
                        Some(found) => {
                            found.to = end;
                            found.step = step;
                        }
                        None => matched.push(Matched {
                            mark,
                            from: pos.max(from),
                            to: end,
                            step,
                        }),
                    }
                }
            }
            true
        });
        for item in matched {
            self.step(RemoveMarkStep::new(item.from, item.to, item.mark))?;
        }
        Ok(self)
    }

    /// Removes all marks and nodes from the content of the node at `pos`
    /// that don't match the given new parent node type. Accepts an optional
    /// starting content match as third argument.
    pub fn clear_incompatible(
        &mut self,
        pos: usize,
        parent_type: &NodeType,
        start_match: Option<ContentMatch>,
    ) -> Result<&mut Self, TransformError> {
        let mut matched = start_match.unwrap_or_else(|| parent_type.content_match().clone());
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNode(pos))?;
        let mut repl_steps: Vec<ReplaceStep> = Vec::new();
        let mut cur = pos + 1;
        for i in 0..node.child_count() {
            let child = node.child(i).clone();
            let end = cur + child.node_size();
            match matched.match_type(child.node_type()) {
                None => repl_steps.push(ReplaceStep::new(cur, end, Slice::empty(), false)),
                Some(allowed) => {
                    matched = allowed;
                    for mark in child.marks() {
                        if !parent_type.allows_mark_type(mark.mark_type()) {
                            self.step(RemoveMarkStep::new(cur, end, mark.clone()))?;
                        }
                    }
                    if child.is_text() && !parent_type.spec().code {
                        // Outside code contexts, line breaks in the text are
                        // replaced by spaces carrying the allowed marks.
                        let mut slice: Option<Slice> = None;
                        let text = child.text().to_owned();
                        for found in NEWLINE.find_iter(&text) {
                            let slice = slice.get_or_insert_with(|| {
                                Slice::new(
                                    Fragment::from(parent_type.schema().text(
                                        " ",
                                        Some(parent_type.allowed_marks(child.marks())),
                                    )),
                                    0,
                                    0,
                                )
                            });
                            let start = cur + text_length(&text[..found.start()]);
                            let end = cur + text_length(&text[..found.end()]);
                            repl_steps.push(ReplaceStep::new(start, end, slice.clone(), false));
                        }
                    }
                }
            }
            cur = end;
        }
        if !matched.valid_end() {
            let fill = matched
                .fill_before(&Fragment::empty(), true, 0)
                .expect("incompatible content leaves a fillable state");
            self.replace(cur, cur, Slice::new(fill, 0, 0))?;
        }
        for item in repl_steps.into_iter().rev() {
            self.step(item)?;
        }
        Ok(self)
    }

    /// Replace the part of the document between `from` and `to` with the
    /// given slice.
    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, TransformError> {
        let step = replace_step(&self.doc, from, to, &slice)?;
        if let Some(step) = step {
            self.step(step)?;
        }
        Ok(self)
    }

    /// Replace the given range with the given content, which may be a
    /// fragment, node, or array of nodes.
    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: impl Into<Fragment>,
    ) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::new(content.into(), 0, 0))
    }

    /// Delete the content between the given positions.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::empty())
    }

    /// Insert the given content at the given position.
    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    /// Replace a range of the document with a given slice, using `from`,
    /// `to`, and the slice's open depths as hints, rather than fixed start
    /// and end points. This method may grow the replaced area or close open
    /// nodes in the slice in order to get a fit that is more in line with
    /// WYSIWYG expectations, by dropping fully covered parent nodes of the
    /// replaced region when they are marked non-defining as context, or
    /// including an open parent node from the slice that is marked as
    /// defining its content.
    ///
    /// This is the method, for example, to handle paste. The similar
    /// [`replace`](Transform::replace) method is a more primitive tool
    /// which will not move the start and end of its given range, and is
    /// useful in situations where you need more precise control over what
    /// happens.
    pub fn replace_range(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, TransformError> {
        if slice.size() == 0 {
            return self.delete_range(from, to);
        }
        let rp_from = self.doc.resolve(from)?;
        let rp_to = self.doc.resolve(to)?;
        if fits_trivially(&rp_from, &rp_to, &slice) {
            return self.step(ReplaceStep::new(from, to, slice, false));
        }

        let mut target_depths: Vec<isize> = covered_depths(&rp_from, &rp_to)
            .into_iter()
            .map(|d| d as isize)
            .collect();
        if target_depths.last() == Some(&0) {
            target_depths.pop();
        }
        let mut preferred_target = -(rp_from.depth() as isize + 1);
        target_depths.insert(0, preferred_target);

        let mut d = rp_from.depth();
        let mut pos = rp_from.pos().wrapping_sub(1);
        while d > 0 {
            let spec = rp_from.node(d).node_type().spec();
            if spec.defining || spec.defining_as_context || spec.isolating {
                break;
            }
            if target_depths.contains(&(d as isize)) {
                preferred_target = d as isize;
            } else if rp_from.before(d) == pos {
                target_depths.insert(1, -(d as isize));
            }
            d -= 1;
            pos = pos.wrapping_sub(1);
        }

        let preferred_target_index = target_depths
            .iter()
            .position(|&t| t == preferred_target)
            .expect("preferred target is in the list");

        let mut left_nodes: Vec<Node> = Vec::new();
        let mut preferred_depth = slice.open_start();
        {
            let mut content = slice.content().clone();
            let mut i = 0;
            loop {
                let node = content
                    .first_child()
                    .expect("open depth implies a child")
                    .clone();
                left_nodes.push(node.clone());
                if i == slice.open_start() {
                    break;
                }
                content = node.content().clone();
                i += 1;
            }
        }

        let mut d = preferred_depth as isize - 1;
        while d >= 0 {
            let left_node = &left_nodes[d as usize];
            let def = defines_content(left_node.node_type());
            if def
                && !left_node.same_markup(rp_from.node(preferred_target.unsigned_abs() - 1))
            {
                preferred_depth = d as usize;
            } else if def || !left_node.node_type().is_textblock() {
                break;
            }
            d -= 1;
        }

        for j in (0..=slice.open_start()).rev() {
            let open_depth = (j + preferred_depth + 1) % (slice.open_start() + 1);
            let Some(insert) = left_nodes.get(open_depth) else {
                continue;
            };
            for i in 0..target_depths.len() {
                let mut target_depth =
                    target_depths[(i + preferred_target_index) % target_depths.len()];
                let mut expand = true;
                if target_depth < 0 {
                    expand = false;
                    target_depth = -target_depth;
                }
                let target_depth = target_depth as usize;
                let parent = rp_from.node(target_depth - 1);
                let index = rp_from.index(target_depth - 1);
                if parent.can_replace_with(index, index, insert.node_type(), Some(insert.marks()))
                {
                    let closed = close_fragment(
                        slice.content(),
                        0,
                        slice.open_start(),
                        open_depth,
                        None,
                    );
                    return self.replace(
                        rp_from.before(target_depth),
                        if expand { rp_to.after(target_depth) } else { to },
                        Slice::new(closed, open_depth, slice.open_end()),
                    );
                }
            }
        }

        let start_steps = self.steps.len();
        let mut from = from;
        let mut to = to;
        for i in (0..target_depths.len()).rev() {
            self.replace(from, to, slice.clone())?;
            if self.steps.len() > start_steps {
                break;
            }
            let depth = target_depths[i];
            if depth < 0 {
                continue;
            }
            from = rp_from.before(depth as usize);
            to = rp_to.after(depth as usize);
        }
        Ok(self)
    }

    /// Replace the given range with a node, but use `from` and `to` as
    /// hints, rather than precise positions. When from and to are the same
    /// and are at the start or end of a parent node in which the given node
    /// doesn't fit, this method may move them out towards a parent that
    /// does allow the given node to be placed.
    pub fn replace_range_with(&mut self, from: usize, to: usize, node: Node) -> Result<&mut Self, TransformError> {
        let mut from = from;
        let mut to = to;
        if !node.is_inline() && from == to && self.doc.resolve(from)?.parent().content().size() > 0
        {
            if let Some(point) = insert_point(&self.doc, from, node.node_type()) {
                from = point;
                to = point;
            }
        }
        self.replace_range(from, to, Slice::new(Fragment::from(node), 0, 0))
    }

    /// Delete the given range, expanding it to cover fully covered parent
    /// nodes until a valid replace is found.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        let rp_from = self.doc.resolve(from)?;
        let rp_to = self.doc.resolve(to)?;
        let covered = covered_depths(&rp_from, &rp_to);
        for (i, &depth) in covered.iter().enumerate() {
            let last = i == covered.len() - 1;
            if (last && depth == 0) || rp_from.node(depth).node_type().content_match().valid_end() {
                return self.delete(rp_from.start(depth), rp_to.end(depth));
            }
            if depth > 0
                && (last
                    || rp_from.node(depth - 1).can_replace(
                        rp_from.index(depth - 1),
                        rp_to.index_after(depth - 1),
                        None,
                    ))
            {
                return self.delete(rp_from.before(depth), rp_to.after(depth));
            }
        }
        let mut d = 1;
        while d <= rp_from.depth() && d <= rp_to.depth() {
            if from - rp_from.start(d) == rp_from.depth() - d
                && to > rp_from.end(d)
                && rp_to.end(d) - to != rp_to.depth() - d
            {
                return self.delete(rp_from.before(d), to);
            }
            d += 1;
        }
        self.delete(from, to)
    }

    /// Split the content in the given range off from its parent, if there
    /// is sibling content before or after it, and move it up the tree to
    /// the depth specified by `target`. You'll probably want to use
    /// [`lift_target`](crate::lift_target) to compute `target`, to make
    /// sure the lift is valid.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, TransformError> {
        let rp_from = range.from();
        let rp_to = range.to();
        let depth = range.depth();

        let gap_start = rp_from.before(depth + 1);
        let gap_end = rp_to.after(depth + 1);
        let mut start = gap_start;
        let mut end = gap_end;

        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        let mut d = depth;
        while d > target {
            if splitting || rp_from.index(d) > 0 {
                splitting = true;
                before = Fragment::from(rp_from.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
            d -= 1;
        }
        let mut after = Fragment::empty();
        let mut open_end = 0;
        let mut splitting = false;
        let mut d = depth;
        while d > target {
            if splitting || rp_to.after(d + 1) < rp_to.end(d) {
                splitting = true;
                after = Fragment::from(rp_to.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
            d -= 1;
        }

        let before_size = before.size();
        self.step(ReplaceAroundStep::new(
            start,
            end,
            gap_start,
            gap_end,
            Slice::new(before.append(&after), open_start, open_end),
            before_size - open_start,
            true,
        ))
    }

    /// Wrap the given range in the given set of wrappers. The wrappers are
    /// assumed to be valid in this position; you probably want to compute
    /// them with [`find_wrapping`](crate::find_wrapping).
    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[TypeAndAttrs]) -> Result<&mut Self, TransformError> {
        let mut content = Fragment::empty();
        for wrapper in wrappers.iter().rev() {
            if content.size() > 0 {
                let matched = wrapper
                    .node_type
                    .content_match()
                    .match_fragment(&content, 0, content.child_count());
                if !matched.is_some_and(|m| m.valid_end()) {
                    return Err(TransformError::InvalidWrapContent);
                }
            }
            content = Fragment::from(wrapper.node_type.create(
                wrapper.attrs.as_ref(),
                Some(content),
                None,
            )?);
        }
        let start = range.start();
        let end = range.end();
        self.step(ReplaceAroundStep::new(
            start,
            end,
            start,
            end,
            Slice::new(content, 0, 0),
            wrappers.len(),
            true,
        ))
    }

    /// Set the type of all textblocks (partly) between `from` and `to` to
    /// the given node type with the given attributes.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self, TransformError> {
        if !node_type.is_textblock() {
            return Err(TransformError::NotATextblock);
        }
        let map_from = self.steps.len();
        let doc = self.doc.clone();
        let mut failure: Option<TransformError> = None;
        doc.nodes_between(from, to, &mut |node, pos, _parent, _index| {
            if failure.is_some() {
                return false;
            }
            let mapped_pos = self.mapping.slice_from(map_from).map(pos, 1);
            if node.is_textblock()
                && !node.has_markup(node_type, attrs, None)
                && can_change_type(&self.doc, mapped_pos, node_type)
            {
                // Ensure all markup that isn't allowed in the new node type
                // is removed.
                if let Err(err) = self.clear_incompatible(mapped_pos, node_type, None) {
                    failure = Some(err);
                    return false;
                }
                let mapping = self.mapping.slice_from(map_from);
                let start_m = mapping.map(pos, 1);
                let end_m = mapping.map(pos + node.node_size(), 1);
                let new_node = match node_type.create(attrs, None, Some(node.marks().to_vec())) {
                    Ok(n) => n,
                    Err(err) => {
                        failure = Some(err.into());
                        return false;
                    }
                };
                let step = ReplaceAroundStep::new(
                    start_m,
                    end_m,
                    start_m + 1,
                    end_m - 1,
                    Slice::new(Fragment::from(new_node), 0, 0),
                    1,
                    true,
                );
                if let Err(err) = self.step(step) {
                    failure = Some(err);
                }
                return false;
            }
            true
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Change the type, attributes, and/or marks of the node at `pos`.
    /// When `node_type` is `None`, the existing node type is preserved.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        node_type: Option<&NodeType>,
        attrs: Option<&Attrs>,
        marks: Option<Vec<Mark>>,
    ) -> Result<&mut Self, TransformError> {
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNode(pos))?;
        let node_type = node_type.unwrap_or_else(|| node.node_type());
        let new_node = node_type.create(attrs, None, marks.or_else(|| Some(node.marks().to_vec())))?;
        if node.is_leaf() {
            return self.replace_with(pos, pos + node.node_size(), new_node);
        }
        if !node_type.valid_content(node.content()) {
            return Err(TransformError::InvalidContent(node_type.name().to_owned()));
        }
        self.step(ReplaceAroundStep::new(
            pos,
            pos + node.node_size(),
            pos + 1,
            pos + node.node_size() - 1,
            Slice::new(Fragment::from(new_node), 0, 0),
            1,
            true,
        ))
    }

    /// Set a single attribute on a given node to a new value.
    pub fn set_node_attribute(
        &mut self,
        pos: usize,
        attr: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<&mut Self, TransformError> {
        self.step(AttrStep::new(pos, attr, value))
    }

    /// Set a single attribute on the document to a new value.
    pub fn set_doc_attribute(
        &mut self,
        attr: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<&mut Self, TransformError> {
        self.step(DocAttrStep::new(attr, value))
    }

    /// Add a mark to the node at position `pos`.
    pub fn add_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(AddNodeMarkStep::new(pos, mark))
    }

    /// Remove a mark from the node at position `pos`.
    pub fn remove_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(RemoveNodeMarkStep::new(pos, mark))
    }

    /// Remove any mark of the given type from the node at position `pos`.
    /// Does nothing when no such mark is present.
    pub fn remove_node_mark_type(
        &mut self,
        pos: usize,
        mark_type: &MarkType,
    ) -> Result<&mut Self, TransformError> {
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNode(pos))?;
        let Some(mark) = mark_type.is_in_set(node.marks()).cloned() else {
            return Ok(self);
        };
        self.step(RemoveNodeMarkStep::new(pos, mark))
    }

    /// Split the node at the given position, and optionally, if `depth` is
    /// greater than one, any number of nodes above that. By default, the
    /// parts split off will inherit the node type of the original node.
    /// This can be changed by passing an array of types and attributes to
    /// use after the split (with the outermost nodes coming first).
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Option<&[Option<TypeAndAttrs>]>,
    ) -> Result<&mut Self, TransformError> {
        let rp = self.doc.resolve(pos)?;
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        let mut d = rp.depth();
        // A depth beyond the position's own produces a slice that cannot
        // fit, which the step application below reports as a failure.
        let e = rp.depth().saturating_sub(depth);
        let mut i = depth as isize - 1;
        while d > e {
            before = Fragment::from(rp.node(d).copy(before));
            let type_after = types_after
                .and_then(|t| if i >= 0 { t.get(i as usize) } else { None })
                .and_then(Option::as_ref);
            after = Fragment::from(match type_after {
                Some(ta) => ta.node_type.create(ta.attrs.as_ref(), Some(after), None)?,
                None => rp.node(d).copy(after),
            });
            d -= 1;
            i -= 1;
        }
        self.step(ReplaceStep::new(
            pos,
            pos,
            Slice::new(before.append(&after), depth, depth),
            true,
        ))
    }

    /// Join the blocks around the given position. If depth is 2, their last
    /// and first siblings are also joined, and so on.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, TransformError> {
        self.step(ReplaceStep::new(pos - depth, pos + depth, Slice::empty(), true))
    }
}
