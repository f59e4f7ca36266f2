//! Compiling content expressions and matching content against them.
//!
//! A node type's content expression (`"paragraph+"`, `"heading block*"`,
//! `"(ordered_list | bullet_list)"`, …) is tokenized, parsed into an
//! expression tree, lowered to an NFA via Thompson construction, and
//! converted to a DFA with subset construction. Every DFA state is a
//! [`ContentMatch`]; states are compared by identity and the dedup map used
//! while exploring is keyed by the serialized state set.

use std::fmt;
use std::sync::{Arc, Mutex};

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::instrument;

use crate::error::SchemaError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::NodeType;
use crate::schema::NodeTypes;

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|\W").expect("valid pattern"));

static EMPTY: Lazy<ContentMatch> = Lazy::new(|| {
    let empty = ContentMatch::new(true);
    empty.set_edges(Vec::new());
    empty
});

/// An edge of the DFA: a node type and the state reached by matching it.
#[derive(Clone)]
pub struct MatchEdge {
    node_type: NodeType,
    next: ContentMatch,
}

impl MatchEdge {
    /// The node type this edge matches.
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    /// The state reached after matching.
    pub fn next(&self) -> &ContentMatch {
        &self.next
    }
}

struct MatchInner {
    valid_end: bool,
    // Set once at the end of subset construction; the DFA graph is cyclic,
    // so edges cannot be passed to the constructor.
    next: once_cell::sync::OnceCell<Vec<MatchEdge>>,
    wrap_cache: Mutex<Vec<(NodeType, Option<Vec<NodeType>>)>>,
}

/// Instances of this type represent a match state of a node type's content
/// expression, and can be used to find out whether further content matches
/// here, and whether a given position is a valid end of the node.
#[derive(Clone)]
pub struct ContentMatch {
    inner: Arc<MatchInner>,
}

impl ContentMatch {
    fn new(valid_end: bool) -> ContentMatch {
        ContentMatch {
            inner: Arc::new(MatchInner {
                valid_end,
                next: once_cell::sync::OnceCell::new(),
                wrap_cache: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The match state of an empty content expression.
    pub fn empty() -> ContentMatch {
        EMPTY.clone()
    }

    fn set_edges(&self, edges: Vec<MatchEdge>) {
        self.inner
            .next
            .set(edges)
            .unwrap_or_else(|_| unreachable!("edges are set exactly once"));
    }

    fn edges(&self) -> &[MatchEdge] {
        self.inner.next.get().map_or(&[], Vec::as_slice)
    }

    /// True when this state represents a valid end of the node.
    pub fn valid_end(&self) -> bool {
        self.inner.valid_end
    }

    /// True when both handles point at the same DFA state.
    pub fn ptr_eq(&self, other: &ContentMatch) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Parse a content expression into a start state.
    #[instrument(level = "trace", skip(node_types))]
    pub fn parse(string: &str, node_types: &NodeTypes) -> Result<ContentMatch, SchemaError> {
        let mut stream = TokenStream::new(string, node_types);
        if stream.next_token().is_none() {
            return Ok(ContentMatch::empty());
        }
        let expr = parse_expr(&mut stream)?;
        if stream.next_token().is_some() {
            return Err(stream.err("Unexpected trailing text"));
        }
        let matched = dfa(&nfa(&expr));
        check_for_dead_ends(&matched, &stream)?;
        Ok(matched)
    }

    /// Match a node type, returning the state after its content when
    /// successful.
    pub fn match_type(&self, node_type: &NodeType) -> Option<ContentMatch> {
        self.edges()
            .iter()
            .find(|edge| edge.node_type == *node_type)
            .map(|edge| edge.next.clone())
    }

    /// Try to match the children of a fragment between `start` and `end`.
    /// Returns the resulting state when successful.
    pub fn match_fragment(
        &self,
        frag: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end {
            cur = cur.match_type(frag.child(i).node_type())?;
        }
        Some(cur)
    }

    /// True when this state's first matchable node type is inline.
    pub fn inline_content(&self) -> bool {
        self.edges()
            .first()
            .is_some_and(|edge| edge.node_type.is_inline())
    }

    /// The first matchable node type that is neither text nor carries
    /// required attributes, if any. Suitable for synthesizing filler
    /// content.
    pub fn default_type(&self) -> Option<NodeType> {
        self.edges()
            .iter()
            .map(MatchEdge::node_type)
            .find(|t| !(t.is_text() || t.has_required_attrs()))
            .cloned()
    }

    /// True when some node type matches both this state and the other.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.edges().iter().any(|i| {
            other
                .edges()
                .iter()
                .any(|j| i.node_type == j.node_type)
        })
    }

    /// Try to find a minimal sequence of nodes that, inserted before the
    /// fragment `after` (from `start_index` on), would make the content
    /// match this state — reaching a valid end when `to_end` is set. The
    /// sequence is returned as a fragment of synthesized nodes.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.clone()];
        self.fill_search(after, to_end, start_index, &mut Vec::new(), &mut seen)
    }

    fn fill_search(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        types: &mut Vec<NodeType>,
        seen: &mut Vec<ContentMatch>,
    ) -> Option<Fragment> {
        let finished = self.match_fragment(after, start_index, after.child_count());
        if finished.is_some_and(|f| !to_end || f.valid_end()) {
            let nodes: Vec<Node> = types
                .iter()
                .map(|tp| {
                    tp.create_and_fill(None, None, None)
                        .expect("fill types have no required attributes")
                        .expect("fill types are generatable")
                })
                .collect();
            return Some(Fragment::from_nodes(nodes));
        }
        for edge in self.edges() {
            let node_type = &edge.node_type;
            let next = &edge.next;
            if !(node_type.is_text() || node_type.has_required_attrs())
                && !seen.iter().any(|m| m.ptr_eq(next))
            {
                seen.push(next.clone());
                types.push(node_type.clone());
                let found = next.fill_search(after, to_end, start_index, types, seen);
                types.pop();
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Find a set of wrapping node types that would allow a node of the
    /// given type to appear at this position. The result may be empty (when
    /// the type directly matches) and is cached per state.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        {
            let cache = self.inner.wrap_cache.lock().expect("wrap cache lock");
            if let Some((_, computed)) = cache.iter().find(|(t, _)| t == target) {
                return computed.clone();
            }
        }
        let computed = self.compute_wrapping(target);
        let mut cache = self.inner.wrap_cache.lock().expect("wrap cache lock");
        cache.push((target.clone(), computed.clone()));
        computed
    }

    fn compute_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            matched: ContentMatch,
            node_type: Option<NodeType>,
            via: Option<usize>,
        }
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut active = vec![Active {
            matched: self.clone(),
            node_type: None,
            via: None,
        }];
        let mut i = 0;
        while i < active.len() {
            let matched = active[i].matched.clone();
            if matched.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut idx = i;
                while let Some(node_type) = active[idx].node_type.clone() {
                    result.push(node_type);
                    idx = active[idx].via.expect("wrapper entries chain to the root");
                }
                result.reverse();
                return Some(result);
            }
            for edge in matched.edges() {
                let node_type = &edge.node_type;
                if !node_type.is_leaf()
                    && !node_type.has_required_attrs()
                    && !seen.contains(node_type.name())
                    && (active[i].node_type.is_none() || edge.next.valid_end())
                {
                    seen.insert(node_type.name().to_owned());
                    active.push(Active {
                        matched: node_type.content_match().clone(),
                        node_type: Some(node_type.clone()),
                        via: Some(i),
                    });
                }
            }
            i += 1;
        }
        None
    }

    /// The number of outgoing edges this state has.
    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Get the `n`th outgoing edge of this state.
    ///
    /// # Panics
    /// Panics when `n` is out of range.
    pub fn edge(&self, n: usize) -> &MatchEdge {
        assert!(
            n < self.edges().len(),
            "There's no {n}th edge in this content match"
        );
        &self.edges()[n]
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ContentMatch {}

impl fmt::Display for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen: Vec<ContentMatch> = Vec::new();
        fn scan(m: &ContentMatch, seen: &mut Vec<ContentMatch>) {
            seen.push(m.clone());
            for edge in m.edges() {
                if !seen.iter().any(|s| s.ptr_eq(&edge.next)) {
                    scan(&edge.next, seen);
                }
            }
        }
        scan(self, &mut seen);
        for (i, m) in seen.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}{} ", i, if m.valid_end() { "*" } else { " " })?;
            for (j, edge) in m.edges().iter().enumerate() {
                let target = seen
                    .iter()
                    .position(|s| s.ptr_eq(&edge.next))
                    .expect("every reachable state was scanned");
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}->{}", edge.node_type.name(), target)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ContentMatch>")
    }
}

struct TokenStream<'a> {
    string: &'a str,
    node_types: &'a NodeTypes,
    inline: Option<bool>,
    pos: usize,
    tokens: Vec<String>,
}

impl<'a> TokenStream<'a> {
    fn new(string: &'a str, node_types: &'a NodeTypes) -> TokenStream<'a> {
        let tokens = TOKEN_REGEX
            .find_iter(string)
            .map(|m| m.as_str())
            .filter(|tok| !tok.trim().is_empty())
            .map(ToOwned::to_owned)
            .collect();
        TokenStream {
            string,
            node_types,
            inline: None,
            pos: 0,
            tokens,
        }
    }

    fn next_token(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.next_token() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::ContentExpression {
            message: message.into(),
            expression: self.string.to_owned(),
        }
    }
}

enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(NodeType),
}

fn parse_expr(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_expr_seq(stream)?);
        if !stream.eat("|") {
            break;
        }
    }
    if exprs.len() == 1 {
        Ok(exprs.pop().expect("one expression"))
    } else {
        Ok(Expr::Choice(exprs))
    }
}

fn parse_expr_seq(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_expr_subscript(stream)?);
        match stream.next_token() {
            Some(tok) if tok != ")" && tok != "|" => {}
            _ => break,
        }
    }
    if exprs.len() == 1 {
        Ok(exprs.pop().expect("one expression"))
    } else {
        Ok(Expr::Seq(exprs))
    }
}

fn parse_expr_subscript(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    let mut expr = parse_expr_atom(stream)?;
    loop {
        if stream.eat("+") {
            expr = Expr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = Expr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = Expr::Opt(Box::new(expr));
        } else if stream.eat("{") {
            expr = parse_expr_range(stream, expr)?;
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_num(stream: &mut TokenStream<'_>) -> Result<usize, SchemaError> {
    let next = stream.next_token().unwrap_or("");
    let Ok(result) = next.parse::<usize>() else {
        return Err(stream.err(format!("Expected number, got \"{next}\"")));
    };
    stream.pos += 1;
    Ok(result)
}

fn parse_expr_range(stream: &mut TokenStream<'_>, expr: Expr) -> Result<Expr, SchemaError> {
    let min = parse_num(stream)?;
    let mut max = Some(min);
    if stream.eat(",") {
        max = if stream.next_token() == Some("}") {
            None
        } else {
            Some(parse_num(stream)?)
        };
    }
    if !stream.eat("}") {
        return Err(stream.err("Unclosed braced range"));
    }
    Ok(Expr::Range {
        min,
        max,
        expr: Box::new(expr),
    })
}

fn resolve_name(stream: &TokenStream<'_>, name: &str) -> Result<Vec<NodeType>, SchemaError> {
    if let Some(node_type) = stream.node_types.get(name) {
        return Ok(vec![node_type.clone()]);
    }
    let result: Vec<NodeType> = stream
        .node_types
        .values()
        .filter(|t| t.groups().iter().any(|g| g == name))
        .cloned()
        .collect();
    if result.is_empty() {
        return Err(stream.err(format!("No node type or group \"{name}\" found")));
    }
    Ok(result)
}

fn parse_expr_atom(stream: &mut TokenStream<'_>) -> Result<Expr, SchemaError> {
    if stream.eat("(") {
        let expr = parse_expr(stream)?;
        if !stream.eat(")") {
            return Err(stream.err("Missing closing paren"));
        }
        return Ok(expr);
    }
    let next = stream.next_token().unwrap_or("").to_owned();
    if next
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        let mut exprs = Vec::new();
        for node_type in resolve_name(stream, &next)? {
            match stream.inline {
                None => stream.inline = Some(node_type.is_inline()),
                Some(inline) => {
                    if inline != node_type.is_inline() {
                        return Err(stream.err("Mixing inline and block content"));
                    }
                }
            }
            exprs.push(Expr::Name(node_type));
        }
        stream.pos += 1;
        if exprs.len() == 1 {
            Ok(exprs.pop().expect("one expression"))
        } else {
            Ok(Expr::Choice(exprs))
        }
    } else {
        Err(stream.err(format!("Unexpected token \"{next}\"")))
    }
}

type StateId = usize;

struct NfaEdge {
    term: Option<NodeType>,
    to: Option<StateId>,
}

/// Thompson construction. States are adjacency lists of edges; `term: None`
/// edges are epsilon transitions. Dangling edges (no target yet) are
/// returned upward and connected by the caller; one terminal accepting
/// state is appended at the end.
struct NfaBuilder {
    states: Vec<Vec<NfaEdge>>,
}

impl NfaBuilder {
    fn node(&mut self) -> StateId {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: StateId, to: Option<StateId>, term: Option<NodeType>) -> (StateId, usize) {
        self.states[from].push(NfaEdge { term, to });
        (from, self.states[from].len() - 1)
    }

    fn connect(&mut self, edges: &[(StateId, usize)], to: StateId) {
        for &(state, edge) in edges {
            self.states[state][edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: StateId) -> Vec<(StateId, usize)> {
        match expr {
            Expr::Choice(exprs) => {
                let mut out = Vec::new();
                for expr in exprs {
                    out.extend(self.compile(expr, from));
                }
                out
            }
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut i = 0;
                loop {
                    let next = self.compile(&exprs[i], from);
                    if i == exprs.len() - 1 {
                        return next;
                    }
                    from = self.node();
                    self.connect(&next, from);
                    i += 1;
                }
            }
            Expr::Star(expr) => {
                let loop_node = self.node();
                self.edge(from, Some(loop_node), None);
                let inner = self.compile(expr, loop_node);
                self.connect(&inner, loop_node);
                vec![self.edge(loop_node, None, None)]
            }
            Expr::Plus(expr) => {
                let loop_node = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, loop_node);
                let again = self.compile(expr, loop_node);
                self.connect(&again, loop_node);
                vec![self.edge(loop_node, None, None)]
            }
            Expr::Opt(expr) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(expr, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(node_type) => {
                vec![self.edge(from, None, Some(node_type.clone()))]
            }
        }
    }
}

fn nfa(expr: &Expr) -> Vec<Vec<NfaEdge>> {
    let mut builder = NfaBuilder {
        states: vec![Vec::new()],
    };
    let dangling = builder.compile(expr, 0);
    let accept = builder.node();
    builder.connect(&dangling, accept);
    builder.states
}

fn null_from(nfa: &[Vec<NfaEdge>], from: StateId) -> Vec<StateId> {
    fn scan(nfa: &[Vec<NfaEdge>], n: StateId, result: &mut Vec<StateId>) {
        let edges = &nfa[n];
        if edges.len() == 1 && edges[0].term.is_none() {
            return scan(nfa, edges[0].to.expect("connected nfa"), result);
        }
        result.push(n);
        for edge in edges {
            if edge.term.is_none() {
                let to = edge.to.expect("connected nfa");
                if !result.contains(&to) {
                    scan(nfa, to, result);
                }
            }
        }
    }
    let mut result = Vec::new();
    scan(nfa, from, &mut result);
    result.sort_unstable();
    result
}

fn dfa(nfa: &[Vec<NfaEdge>]) -> ContentMatch {
    let mut labeled: AHashMap<String, ContentMatch> = AHashMap::new();
    explore(nfa, &null_from(nfa, 0), &mut labeled)
}

fn state_key(states: &[StateId]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn explore(
    nfa: &[Vec<NfaEdge>],
    states: &[StateId],
    labeled: &mut AHashMap<String, ContentMatch>,
) -> ContentMatch {
    let mut out: Vec<(NodeType, Vec<StateId>)> = Vec::new();
    for &node in states {
        for edge in &nfa[node] {
            let Some(term) = &edge.term else { continue };
            let mut set_idx = out.iter().position(|(t, _)| t == term);
            for n in null_from(nfa, edge.to.expect("connected nfa")) {
                let idx = match set_idx {
                    Some(idx) => idx,
                    None => {
                        out.push((term.clone(), Vec::new()));
                        let idx = out.len() - 1;
                        set_idx = Some(idx);
                        idx
                    }
                };
                if !out[idx].1.contains(&n) {
                    out[idx].1.push(n);
                }
            }
        }
    }
    let state = ContentMatch::new(states.contains(&(nfa.len() - 1)));
    labeled.insert(state_key(states), state.clone());
    let mut edges = Vec::new();
    for (term, mut set) in out {
        set.sort_unstable_by(|a, b| b.cmp(a));
        let key = state_key(&set);
        let next = match labeled.get(&key) {
            Some(next) => next.clone(),
            None => explore(nfa, &set, labeled),
        };
        edges.push(MatchEdge {
            node_type: term,
            next,
        });
    }
    state.set_edges(edges);
    state
}

fn check_for_dead_ends(
    matched: &ContentMatch,
    stream: &TokenStream<'_>,
) -> Result<(), SchemaError> {
    let mut work = vec![matched.clone()];
    let mut i = 0;
    while i < work.len() {
        let state = work[i].clone();
        let mut dead = !state.valid_end();
        let mut nodes = Vec::new();
        for edge in state.edges() {
            let node_type = &edge.node_type;
            nodes.push(node_type.name().to_owned());
            if dead && !(node_type.is_text() || node_type.has_required_attrs()) {
                dead = false;
            }
            if !work.iter().any(|m| m.ptr_eq(&edge.next)) {
                work.push(edge.next.clone());
            }
        }
        if dead {
            return Err(stream.err(format!(
                "Only non-generatable nodes ({}) in a required position",
                nodes.join(", ")
            )));
        }
        i += 1;
    }
    Ok(())
}
