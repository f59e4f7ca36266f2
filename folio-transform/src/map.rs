//! Mapping positions through document changes.
//!
//! A [`StepMap`] is the minimal description of how one step moves
//! positions: an ordered list of `(start, old_size, new_size)` replacement
//! spans. A [`Mapping`] composes step maps, tracking mirror pairs (a map
//! and its inverse inside the same mapping) so that rebasing does not drag
//! positions through a deletion and back out in the wrong place.

use std::fmt;

use once_cell::sync::Lazy;

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

static EMPTY: Lazy<StepMap> = Lazy::new(|| StepMap::new(Vec::new()));

/// An opaque token produced when a mapped position landed inside a replaced
/// range. Replaying it against the mirror-image map recovers the position
/// inside the old range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
    index: usize,
    offset: usize,
}

/// An object representing a mapped position with extra information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pos: usize,
    del_info: u8,
    recover: Option<Recover>,
}

impl MapResult {
    /// The mapped version of the position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Tells you whether the position was deleted, that is, whether the
    /// step removed the token on the side queried (via the `assoc`
    /// argument) from the document.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    /// Tells you whether the token before the mapped position was deleted.
    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    /// True when the token after the mapped position was deleted.
    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    /// Tells whether any of the steps mapped through deletes positions
    /// across the position (including both the token before and after the
    /// position).
    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }

    /// The recover token, when the position fell inside a replaced range.
    pub fn recover(&self) -> Option<Recover> {
        self.recover
    }
}

/// There are several things that positions can be mapped through. Such
/// objects conform to this trait.
pub trait Mappable {
    /// Map a position through this object. When given, `assoc` (should be
    /// -1 or 1, defaults to 1) determines with which side the position is
    /// associated, which determines in which direction to move when a
    /// chunk of content is inserted at the mapped position.
    fn map(&self, pos: usize, assoc: i32) -> usize;

    /// Map a position, and return an object containing additional
    /// information about the mapping. The result's `deleted` field tells
    /// you whether the position was deleted (completely enclosed in a
    /// replaced range) during the mapping.
    fn map_result(&self, pos: usize, assoc: i32) -> MapResult;
}

/// A map describing the deletions and insertions made by a step, which can
/// be used to find the correspondence between positions in the pre-step
/// version of a document and the same position in the post-step version.
#[derive(Clone, PartialEq, Eq)]
pub struct StepMap {
    /// Flat triples: `start`, `old_size`, `new_size`.
    ranges: Vec<usize>,
    inverted: bool,
}

impl StepMap {
    /// Create a position map. The modifications to the document are
    /// represented as an array of numbers, in which each group of three
    /// represents a modified chunk as `[start, old_size, new_size]`.
    pub fn new(ranges: Vec<usize>) -> StepMap {
        debug_assert!(ranges.len() % 3 == 0, "ranges come in triples");
        StepMap {
            ranges,
            inverted: false,
        }
    }

    /// A StepMap that contains no changed ranges.
    pub fn empty() -> StepMap {
        EMPTY.clone()
    }

    fn old_index(&self) -> usize {
        if self.inverted {
            2
        } else {
            1
        }
    }

    fn new_index(&self) -> usize {
        if self.inverted {
            1
        } else {
            2
        }
    }

    /// Recover a position that fell inside a replaced range, using a token
    /// produced by the mirror-image map.
    pub fn recover(&self, recover: Recover) -> usize {
        let mut diff = 0i64;
        if !self.inverted {
            for i in 0..recover.index {
                diff += self.ranges[i * 3 + 2] as i64 - self.ranges[i * 3 + 1] as i64;
            }
        }
        (self.ranges[recover.index * 3] as i64 + diff) as usize + recover.offset
    }

    /// Calls `f` on each of the changed ranges included in this map.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let (old_index, new_index) = (self.old_index(), self.new_index());
        let mut diff = 0i64;
        let mut i = 0;
        while i < self.ranges.len() {
            let start = self.ranges[i] as i64;
            let old_start = start - if self.inverted { diff } else { 0 };
            let new_start = start + if self.inverted { 0 } else { diff };
            let old_size = self.ranges[i + old_index] as i64;
            let new_size = self.ranges[i + new_index] as i64;
            f(
                old_start as usize,
                (old_start + old_size) as usize,
                new_start as usize,
                (new_start + new_size) as usize,
            );
            diff += new_size - old_size;
            i += 3;
        }
    }

    /// Create an inverted version of this map. The result can be used to
    /// map positions in the post-step document to the pre-step document.
    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    /// Determines whether this map touches the given range of positions
    /// associated with the given recover token.
    pub fn touches(&self, pos: usize, recover: Recover) -> bool {
        let (old_index, new_index) = (self.old_index(), self.new_index());
        let mut diff = 0i64;
        let mut i = 0;
        while i < self.ranges.len() {
            let start = self.ranges[i] as i64 - if self.inverted { diff } else { 0 };
            if start > pos as i64 {
                break;
            }
            let old_size = self.ranges[i + old_index] as i64;
            let end = start + old_size;
            if pos as i64 <= end && i == recover.index * 3 {
                return true;
            }
            diff += self.ranges[i + new_index] as i64 - old_size;
            i += 3;
        }
        false
    }
}

impl Mappable for StepMap {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_result(pos, assoc).pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        let (old_index, new_index) = (self.old_index(), self.new_index());
        let pos = pos as i64;
        let mut diff = 0i64;
        let mut i = 0;
        while i < self.ranges.len() {
            let start = self.ranges[i] as i64 - if self.inverted { diff } else { 0 };
            if start > pos {
                break;
            }
            let old_size = self.ranges[i + old_index] as i64;
            let new_size = self.ranges[i + new_index] as i64;
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let result = start + diff + if side < 0 { 0 } else { new_size };
                let recover = if pos == if assoc < 0 { start } else { end } {
                    None
                } else {
                    Some(Recover {
                        index: i / 3,
                        offset: (pos - start) as usize,
                    })
                };
                let mut del_info = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                if if assoc < 0 { pos != start } else { pos != end } {
                    del_info |= DEL_SIDE;
                }
                return MapResult {
                    pos: result as usize,
                    del_info,
                    recover,
                };
            }
            diff += new_size - old_size;
            i += 3;
        }
        MapResult {
            pos: (pos + diff) as usize,
            del_info: 0,
            recover: None,
        }
    }
}

impl fmt::Debug for StepMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}",
            if self.inverted { "-" } else { "" },
            self.ranges
        )
    }
}

/// A mapping represents a pipeline of zero or more step maps. It has
/// special provisions for losslessly handling mapping positions through a
/// series of maps which sometimes mirror each other (when a map is the
/// inverse of an earlier one in the pipeline).
#[derive(Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Option<Vec<usize>>,
    from: usize,
    to: usize,
}

impl Mapping {
    /// Create a new mapping.
    pub fn new() -> Mapping {
        Mapping::default()
    }

    /// Create a mapping that starts with the given step maps.
    pub fn from_maps(maps: Vec<StepMap>) -> Mapping {
        let to = maps.len();
        Mapping {
            maps,
            mirror: None,
            from: 0,
            to,
        }
    }

    /// Record that the maps at `n` and `m` are mirror images of each other.
    pub fn set_mirror_pair(&mut self, n: usize, m: usize) {
        self.set_mirror(n, m);
    }

    /// The step maps in this mapping.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// The starting position in the `maps` array, used when `map` or
    /// `map_result` is called.
    pub fn from(&self) -> usize {
        self.from
    }

    /// The end position in the `maps` array.
    pub fn to(&self) -> usize {
        self.to
    }

    /// Create a mapping that maps only through a part of this one.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping {
            maps: self.maps.clone(),
            mirror: self.mirror.clone(),
            from,
            to,
        }
    }

    /// Like [`slice`](Mapping::slice), keeping everything from `from` on.
    pub fn slice_from(&self, from: usize) -> Mapping {
        self.slice(from, self.maps.len())
    }

    /// Add a step map to the end of this mapping. If `mirrors` is given,
    /// it should be the index of the step map that is the mirror image of
    /// this one.
    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        self.to = self.maps.len();
        if let Some(m) = mirrors {
            self.set_mirror(self.maps.len() - 1, m);
        }
    }

    /// Add all the step maps in a given mapping to this one (preserving
    /// mirroring information).
    pub fn append_mapping(&mut self, mapping: &Mapping) {
        let start_size = self.maps.len();
        for i in 0..mapping.maps.len() {
            let mirr = mapping.get_mirror(i);
            let mirrors = match mirr {
                Some(m) if m < i => Some(start_size + m),
                _ => None,
            };
            self.append_map(mapping.maps[i].clone(), mirrors);
        }
    }

    /// Finds the offset of the step map that mirrors the map at the given
    /// offset, in this mapping (as per the second argument to
    /// [`append_map`](Mapping::append_map)).
    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        let mirror = self.mirror.as_ref()?;
        for (i, &entry) in mirror.iter().enumerate() {
            if entry == n {
                return Some(mirror[if i % 2 == 1 { i - 1 } else { i + 1 }]);
            }
        }
        None
    }

    fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirror.get_or_insert_with(Vec::new).extend([n, m]);
    }

    /// Append the inverse of the given mapping to this one.
    pub fn append_mapping_inverted(&mut self, mapping: &Mapping) {
        let total_size = self.maps.len() + mapping.maps.len();
        for i in (0..mapping.maps.len()).rev() {
            let mirr = mapping.get_mirror(i);
            let mirrors = match mirr {
                Some(m) if m > i => Some(total_size - m - 1),
                _ => None,
            };
            self.append_map(mapping.maps[i].invert(), mirrors);
        }
    }

    /// Create an inverted version of this mapping.
    pub fn invert(&self) -> Mapping {
        let mut inverse = Mapping::new();
        inverse.append_mapping_inverted(self);
        inverse
    }

    fn map_inner(&self, pos: usize, assoc: i32) -> MapResult {
        let mut del_info = 0;
        let mut pos = pos;
        let mut i = self.from;
        while i < self.to {
            let map = &self.maps[i];
            let result = map.map_result(pos, assoc);
            if let Some(recover) = result.recover() {
                if let Some(corr) = self.get_mirror(i) {
                    if corr > i && corr < self.to {
                        pos = self.maps[corr].recover(recover);
                        i = corr + 1;
                        continue;
                    }
                }
            }
            del_info |= result.del_info;
            pos = result.pos();
            i += 1;
        }
        MapResult {
            pos,
            del_info,
            recover: None,
        }
    }
}

impl Mappable for Mapping {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        if self.mirror.is_some() {
            return self.map_inner(pos, assoc).pos;
        }
        let mut pos = pos;
        for i in self.from..self.to {
            pos = self.maps[i].map(pos, assoc);
        }
        pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        self.map_inner(pos, assoc)
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("maps", &self.maps)
            .field("mirror", &self.mirror)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}
