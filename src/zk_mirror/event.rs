/// What happened to a single znode, as observed by a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorEventKind {
    Added,
    Updated,
    Removed,
}

/// The content of a single znode, as held by a mirror shadow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeRecord {
    /// ZooKeeper data version of the znode.
    pub version: i32,

    /// ZooKeeper modification time of the znode, milliseconds since UTC Epoch.
    pub mtime_millis: i64,

    /// Raw znode payload.
    pub data: Vec<u8>,
}

/// A single observed change to a mirrored ZooKeeper path.
///
/// This is a `Send`-able struct to carry znode changes across thread boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEvent {
    pub kind: MirrorEventKind,

    /// Absolute path of the znode the event is about.
    pub path: String,

    /// The znode content: present for [`MirrorEventKind::Added`] and
    /// [`MirrorEventKind::Updated`], absent for [`MirrorEventKind::Removed`].
    pub node: Option<NodeRecord>,

    /// When the change happened, milliseconds since UTC Epoch.
    ///
    /// For additions and updates this is the znode mtime as reported by
    /// ZooKeeper; for removals it is the wall clock at observation time,
    /// as ZooKeeper does not report deletion times.
    pub at_millis: i64,
}

impl MirrorEvent {
    pub fn added(path: String, node: NodeRecord) -> Self {
        Self {
            kind: MirrorEventKind::Added,
            at_millis: node.mtime_millis,
            node: Some(node),
            path,
        }
    }

    pub fn updated(path: String, node: NodeRecord) -> Self {
        Self {
            kind: MirrorEventKind::Updated,
            at_millis: node.mtime_millis,
            node: Some(node),
            path,
        }
    }

    pub fn removed(path: String, at_millis: i64) -> Self {
        Self {
            kind: MirrorEventKind::Removed,
            path,
            node: None,
            at_millis,
        }
    }
}
