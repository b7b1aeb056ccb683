//! The element encoder injected into the PBF/MBTiles sinks.
//!
//! The core treats wire-format encoding as an external collaborator
//! (spec §1): it only needs a function from [`Element`] to bytes. A
//! production deployment would plug in a real OSM-PBF writer (the
//! counterpart of the `osmpbf` reader this binary uses); this one writes
//! a compact length-prefixed encoding of the same element shapes, which
//! is enough to round-trip through the sinks' byte-blob contract.

use std::io::Write as _;

use byteorder::{LittleEndian, WriteBytesExt};
use tilesplit::element::{Bound, Element, Member, MemberType, Metadata, Node, Relation, Way};
use tilesplit::error::SplitResult;

const TAG_BOUND: u8 = 0;
const TAG_NODE: u8 = 1;
const TAG_WAY: u8 = 2;
const TAG_RELATION: u8 = 3;

fn write_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.write_u32::<LittleEndian>(bytes.len() as u32).expect("write to Vec never fails");
    buf.extend_from_slice(bytes);
}

fn write_tags(buf: &mut Vec<u8>, tags: &[(std::borrow::Cow<'_, str>, std::borrow::Cow<'_, str>)]) {
    buf.write_u32::<LittleEndian>(tags.len() as u32).expect("write to Vec never fails");
    for (k, v) in tags {
        write_str(buf, k);
        write_str(buf, v);
    }
}

fn write_metadata(buf: &mut Vec<u8>, metadata: Option<Metadata>) {
    match metadata {
        Some(m) => {
            buf.push(1);
            buf.write_u32::<LittleEndian>(m.version).expect("write to Vec never fails");
            buf.write_i64::<LittleEndian>(m.timestamp).expect("write to Vec never fails");
        }
        None => buf.push(0),
    }
}

fn encode_bound(buf: &mut Vec<u8>, bound: &Bound) {
    for v in [bound.min_lon, bound.min_lat, bound.max_lon, bound.max_lat] {
        buf.write_f64::<LittleEndian>(v).expect("write to Vec never fails");
    }
}

fn encode_node(buf: &mut Vec<u8>, node: &Node<'_>) {
    buf.write_u64::<LittleEndian>(node.id).expect("write to Vec never fails");
    buf.write_f64::<LittleEndian>(node.lat).expect("write to Vec never fails");
    buf.write_f64::<LittleEndian>(node.lon).expect("write to Vec never fails");
    write_tags(buf, &node.tags);
    write_metadata(buf, node.metadata);
}

fn encode_way(buf: &mut Vec<u8>, way: &Way<'_>) {
    buf.write_u64::<LittleEndian>(way.id).expect("write to Vec never fails");
    buf.write_u32::<LittleEndian>(way.node_ids.len() as u32).expect("write to Vec never fails");
    for &id in &way.node_ids {
        buf.write_u64::<LittleEndian>(id).expect("write to Vec never fails");
    }
    write_tags(buf, &way.tags);
    write_metadata(buf, way.metadata);
}

fn member_type_byte(member_type: MemberType) -> u8 {
    match member_type {
        MemberType::Node => 0,
        MemberType::Way => 1,
        MemberType::Relation => 2,
    }
}

fn encode_member(buf: &mut Vec<u8>, member: &Member<'_>) {
    buf.push(member_type_byte(member.member_type));
    buf.write_u64::<LittleEndian>(member.id).expect("write to Vec never fails");
    write_str(buf, &member.role);
}

fn encode_relation(buf: &mut Vec<u8>, relation: &Relation<'_>) {
    buf.write_u64::<LittleEndian>(relation.id).expect("write to Vec never fails");
    buf.write_u32::<LittleEndian>(relation.members.len() as u32).expect("write to Vec never fails");
    for member in &relation.members {
        encode_member(buf, member);
    }
    write_tags(buf, &relation.tags);
    write_metadata(buf, relation.metadata);
}

/// Encodes one [`Element`] as `[tag byte][body]`, suitable for the
/// `ElementEncodeFn` the PBF-file and MBTiles sinks expect.
pub fn encode_element(element: &Element<'_>) -> SplitResult<Vec<u8>> {
    let mut buf = Vec::new();
    match element {
        Element::Bound(bound) => {
            buf.push(TAG_BOUND);
            encode_bound(&mut buf, bound);
        }
        Element::Node(node) => {
            buf.push(TAG_NODE);
            encode_node(&mut buf, node);
        }
        Element::Way(way) => {
            buf.push(TAG_WAY);
            encode_way(&mut buf, way);
        }
        Element::Relation(relation) => {
            buf.push(TAG_RELATION);
            encode_relation(&mut buf, relation);
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_bound_with_leading_tag_byte() {
        let bytes = encode_element(&Element::Bound(Bound { min_lon: 1.0, min_lat: 2.0, max_lon: 3.0, max_lat: 4.0 }))
            .unwrap();
        assert_eq!(bytes[0], TAG_BOUND);
        assert_eq!(bytes.len(), 1 + 4 * 8);
    }

    #[test]
    fn encodes_a_node_with_tags() {
        let node = Node {
            id: 42,
            lat: 47.37,
            lon: 8.54,
            tags: vec![(std::borrow::Cow::Borrowed("amenity"), std::borrow::Cow::Borrowed("cafe"))],
            metadata: None,
        };
        let bytes = encode_element(&Element::Node(node)).unwrap();
        assert_eq!(bytes[0], TAG_NODE);
    }
}
