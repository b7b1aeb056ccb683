//! The `osmpbf`-backed [`ElementSource`] adapter.
//!
//! The core engine only needs elements in canonical PBF order and treats
//! the decoder itself as an external collaborator (spec §1, §6). This
//! module is that collaborator: it drives `osmpbf`'s callback-based reader
//! on its own thread and forwards decoded elements to the owner thread
//! over a bounded channel, matching the scheduling model in spec §5
//! ("the decoder runs on its own thread... the owner thread waits on
//! decoder completion with a join loop").

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use osmpbf::{Element as PbfElement, ElementReader, Info, RelMemberType};

use tilesplit::element::{Element, ElementSource, Member, MemberType, Metadata, Node, Relation, Way};
use tilesplit::error::{Error, SplitResult};

pub struct PbfElementSource {
    path: PathBuf,
}

impl PbfElementSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ElementSource for PbfElementSource {
    type Iter<'a>
        = PbfElementIter
    where
        Self: 'a;

    fn elements(&self) -> Self::Iter<'_> {
        PbfElementIter::spawn(self.path.clone())
    }
}

pub struct PbfElementIter {
    rx: Receiver<SplitResult<Element<'static>>>,
    handle: Option<JoinHandle<()>>,
}

impl PbfElementIter {
    fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::sync_channel(4096);
        let handle = thread::spawn(move || {
            let outcome = (|| -> SplitResult<()> {
                let reader = ElementReader::from_path(&path)
                    .map_err(|e| Error::DataFormat(format!("{}: {e}", path.display())))?;
                reader
                    .for_each(|element| {
                        // The receiver only closes if the owner thread
                        // stopped reading (e.g. a fatal error elsewhere);
                        // dropping the remaining blocks is then correct.
                        let _ = tx.send(convert(element));
                    })
                    .map_err(|e| Error::DataFormat(e.to_string()))
            })();
            if let Err(err) = outcome {
                let _ = tx.send(Err(err));
            }
        });
        Self { rx, handle: Some(handle) }
    }
}

impl Iterator for PbfElementIter {
    type Item = SplitResult<Element<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rx.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                None
            }
        }
    }
}

fn owned_tag<'a>(tag: (&'a str, &'a str)) -> (Cow<'static, str>, Cow<'static, str>) {
    (Cow::Owned(tag.0.to_string()), Cow::Owned(tag.1.to_string()))
}

fn metadata_of(info: Option<Info<'_>>) -> Option<Metadata> {
    info.map(|i| Metadata {
        version: i.version().max(0) as u32,
        timestamp: i.milli_timestamp().unwrap_or(0) / 1000,
    })
}

fn convert(element: PbfElement<'_>) -> SplitResult<Element<'static>> {
    match element {
        PbfElement::Node(n) => Ok(Element::Node(Node {
            id: n.id() as u64,
            lat: n.lat(),
            lon: n.lon(),
            tags: n.tags().map(owned_tag).collect(),
            metadata: metadata_of(n.info()),
        })),
        PbfElement::DenseNode(n) => Ok(Element::Node(Node {
            id: n.id() as u64,
            lat: n.lat(),
            lon: n.lon(),
            tags: n.tags().map(owned_tag).collect(),
            metadata: metadata_of(n.info()),
        })),
        PbfElement::Way(w) => Ok(Element::Way(Way {
            id: w.id() as u64,
            node_ids: w.refs().map(|id| id as u64).collect(),
            tags: w.tags().map(owned_tag).collect(),
            metadata: metadata_of(w.info()),
        })),
        PbfElement::Relation(r) => {
            let members = r
                .members()
                .map(|m| Member {
                    member_type: match m.member_type {
                        RelMemberType::Node => MemberType::Node,
                        RelMemberType::Way => MemberType::Way,
                        RelMemberType::Relation => MemberType::Relation,
                    },
                    id: m.member_id as u64,
                    role: Cow::Owned(m.role().unwrap_or_default().to_string()),
                })
                .collect();
            Ok(Element::Relation(Relation {
                id: r.id() as u64,
                members,
                tags: r.tags().map(owned_tag).collect(),
                metadata: metadata_of(r.info()),
            }))
        }
    }
}
