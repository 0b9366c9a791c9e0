use std::collections::BTreeMap;

use super::event::{MirrorEvent, MirrorEventKind, NodeRecord};

/// The materialised shadow of one mirrored ZooKeeper path.
///
/// Nodes are kept in a flat, ordered `path -> record` map: ordering makes
/// "children of" lookups a bounded range scan, and keeps snapshots
/// deterministic.
///
/// Mutation happens one [`MirrorEvent`] at a time, so readers always see a
/// coherent per-node value; no cross-node isolation is promised.
#[derive(Debug, Default)]
pub struct MirrorState {
    root: String,
    nodes: BTreeMap<String, NodeRecord>,
}

impl MirrorState {
    pub fn new(root: String) -> Self {
        Self {
            root,
            nodes: BTreeMap::new(),
        }
    }

    /// Apply a single observed change.
    pub fn apply(&mut self, event: &MirrorEvent) {
        match event.kind {
            MirrorEventKind::Added | MirrorEventKind::Updated => match &event.node {
                Some(node) => {
                    self.nodes.insert(event.path.clone(), node.clone());
                },
                None => {
                    warn!("Ignoring {:?} event for '{}' with no node content", event.kind, event.path);
                },
            },
            MirrorEventKind::Removed => {
                self.nodes.remove(&event.path);
            },
        }
    }

    /// `(version, data)` of the znode at `path`, if mirrored.
    pub fn data_at(&self, path: &str) -> Option<(i32, Vec<u8>)> {
        self.nodes.get(path).map(|n| (n.version, n.data.clone()))
    }

    /// Whether a znode at `path` is currently mirrored.
    pub fn has_node(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// The direct children of the znode at `path`: `name -> (version, data)`.
    ///
    /// Empty when the node is absent or childless; [`Self::has_node`] tells
    /// the two apart.
    pub fn children_of(&self, path: &str) -> BTreeMap<String, (i32, Vec<u8>)> {
        let prefix = format!("{path}/");
        let mut children = BTreeMap::new();

        for (p, node) in self.nodes.range(prefix.clone()..) {
            if !p.starts_with(&prefix) {
                break;
            }
            let name = &p[prefix.len()..];
            if name.contains('/') {
                continue; //< deeper descendant
            }
            children.insert(name.to_string(), (node.version, node.data.clone()));
        }

        children
    }

    /// The names of the direct children of the znode at `path`.
    pub fn child_names(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        let mut names = Vec::new();

        for p in self.nodes.range(prefix.clone()..).map(|(p, _)| p) {
            if !p.starts_with(&prefix) {
                break;
            }
            let name = &p[prefix.len()..];
            if !name.contains('/') {
                names.push(name.to_string());
            }
        }

        names
    }

    /// Every mirrored znode below the root, as `(path, version, data)`.
    ///
    /// The root znode itself is excluded: it is the container, not an entry.
    pub fn snapshot(&self) -> Vec<(String, i32, Vec<u8>)> {
        self.nodes
            .iter()
            .filter(|(p, _)| *p != &self.root)
            .map(|(p, n)| (p.clone(), n.version, n.data.clone()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::MirrorState;
    use crate::zk_mirror::event::{MirrorEvent, NodeRecord};

    fn record(version: i32, mtime_millis: i64, data: &[u8]) -> NodeRecord {
        NodeRecord {
            version,
            mtime_millis,
            data: data.to_vec(),
        }
    }

    fn state_with(paths: &[(&str, &[u8])]) -> MirrorState {
        let mut state = MirrorState::new("/brokers/topics".to_string());
        for (path, data) in paths {
            state.apply(&MirrorEvent::added(path.to_string(), record(0, 1, data)));
        }
        state
    }

    #[test]
    fn apply_add_update_remove() {
        let mut state = MirrorState::new("/brokers/ids".to_string());

        state.apply(&MirrorEvent::added("/brokers/ids/1".to_string(), record(0, 1, b"a")));
        assert_eq!(state.data_at("/brokers/ids/1"), Some((0, b"a".to_vec())));

        state.apply(&MirrorEvent::updated("/brokers/ids/1".to_string(), record(1, 2, b"b")));
        assert_eq!(state.data_at("/brokers/ids/1"), Some((1, b"b".to_vec())));

        state.apply(&MirrorEvent::removed("/brokers/ids/1".to_string(), 3));
        assert_eq!(state.data_at("/brokers/ids/1"), None);
        assert!(!state.has_node("/brokers/ids/1"));
    }

    #[test]
    fn children_are_direct_descendants_only() {
        let state = state_with(&[
            ("/brokers/topics", b""),
            ("/brokers/topics/t", b"assignment"),
            ("/brokers/topics/t/partitions", b""),
            ("/brokers/topics/t/partitions/0", b""),
            ("/brokers/topics/t/partitions/0/state", b"s0"),
            ("/brokers/topics/t/partitions/1", b""),
            ("/brokers/topics/u", b""),
        ]);

        assert_eq!(state.child_names("/brokers/topics"), vec!["t", "u"]);
        assert_eq!(
            state.child_names("/brokers/topics/t/partitions"),
            vec!["0", "1"]
        );

        let children = state.children_of("/brokers/topics/t/partitions/0");
        assert_eq!(children.len(), 1);
        assert_eq!(children["state"], (0, b"s0".to_vec()));
    }

    #[test]
    fn absent_node_has_no_children() {
        let state = state_with(&[("/brokers/topics", b"")]);

        assert!(state.children_of("/brokers/topics/ghost").is_empty());
        assert!(state.child_names("/brokers/topics/ghost").is_empty());
        assert!(!state.has_node("/brokers/topics/ghost"));
    }

    #[test]
    fn snapshot_excludes_the_root() {
        let state = state_with(&[
            ("/brokers/topics", b""),
            ("/brokers/topics/a", b"x"),
            ("/brokers/topics/b", b"y"),
        ]);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, "/brokers/topics/a");
        assert_eq!(snapshot[1].0, "/brokers/topics/b");
    }
}
