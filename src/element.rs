//! OSM element types and the decoder contract (spec §3 "OSM element", §6
//! "Input file").
//!
//! The PBF wire format itself is out of scope (spec §1 "out of scope as
//! external collaborators"); this module only fixes the shape a decoder
//! must produce and the engine consumes.

use std::borrow::Cow;

/// A `key=value` pair. Borrowed where the decoder can hand out a slice
/// into its own buffer; engine code that needs to keep a tag past the
/// current element clones it.
pub type Tag<'a> = (Cow<'a, str>, Cow<'a, str>);

/// Element metadata, present only when `--metadata` is requested (spec
/// §6: "missing metadata is a fatal data-format error" when requested).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub version: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct Node<'a> {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<Tag<'a>>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone)]
pub struct Way<'a> {
    pub id: u64,
    pub node_ids: Vec<u64>,
    pub tags: Vec<Tag<'a>>,
    pub metadata: Option<Metadata>,
}

/// A relation member's kind (spec §3: "node/way/relation by id").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone)]
pub struct Member<'a> {
    pub member_type: MemberType,
    pub id: u64,
    pub role: Cow<'a, str>,
}

#[derive(Debug, Clone)]
pub struct Relation<'a> {
    pub id: u64,
    pub members: Vec<Member<'a>>,
    pub tags: Vec<Tag<'a>>,
    pub metadata: Option<Metadata>,
}

impl Relation<'_> {
    /// `type=multipolygon`, used to decide `complete-areas` eligibility
    /// (spec §4.4 "Relation").
    #[must_use]
    pub fn is_multipolygon(&self) -> bool {
        self.tags
            .iter()
            .any(|(k, v)| k.as_ref() == "type" && v.as_ref() == "multipolygon")
    }
}

/// A tile's lat/lon box, emitted as the first element of every per-tile
/// stream (spec §4.9: "a Bound element prefaces the element stream").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// One decoded unit from the input stream, in the canonical PBF element
/// order the engine relies on: bounds first, then all nodes, then all
/// ways, then all relations (spec §4.4).
#[derive(Debug, Clone)]
pub enum Element<'a> {
    Bound(Bound),
    Node(Node<'a>),
    Way(Way<'a>),
    Relation(Relation<'a>),
}

/// The contract an OSM decoder must satisfy (spec §6 "Input file"). The
/// concrete adapter lives outside this crate's core and is expected to be
/// backed by a real PBF-reading crate; this trait only fixes what the
/// engine needs to drive its three passes.
pub trait ElementSource {
    type Iter<'a>: Iterator<Item = crate::error::SplitResult<Element<'a>>>
    where
        Self: 'a;

    /// Stream the input from the beginning. Called once per pass: the
    /// engine may invoke this multiple times across pass 1/2/3 and must
    /// see the same elements in the same order every time.
    fn elements(&self) -> Self::Iter<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipolygon_tag_detected() {
        let rel = Relation {
            id: 1,
            members: vec![],
            tags: vec![(Cow::Borrowed("type"), Cow::Borrowed("multipolygon"))],
            metadata: None,
        };
        assert!(rel.is_multipolygon());
    }

    #[test]
    fn non_multipolygon_relation_is_not_flagged() {
        let rel = Relation {
            id: 1,
            members: vec![],
            tags: vec![(Cow::Borrowed("type"), Cow::Borrowed("route"))],
            metadata: None,
        };
        assert!(!rel.is_multipolygon());
    }
}
