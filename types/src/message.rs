use serde::{Deserialize, Serialize};

/// Matrix entry and accumulator type.
pub type Element = i64;

/// Position of a participant in the process group.
pub type Rank = usize;

/// One unit of master/worker work.
///
/// `lhs` holds `rows` consecutive rows of A in row-major order and `rhs` holds
/// one column of B laid out as a contiguous vector. A per-cell task has
/// `rows == 1`, so its reply is a single scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub rows: usize,
    pub lhs: Vec<Element>,
    pub rhs: Vec<Element>,
}

impl WorkItem {
    pub fn new(rows: usize, lhs: Vec<Element>, rhs: Vec<Element>) -> Self {
        Self { rows, lhs, rhs }
    }

    /// Length of every dot product in this item.
    pub fn depth(&self) -> usize {
        self.rhs.len()
    }

    /// Returns `true` when `lhs` holds exactly `rows` rows of `depth` elements.
    pub fn is_well_formed(&self) -> bool {
        self.rows
            .checked_mul(self.rhs.len())
            .is_some_and(|expected| expected == self.lhs.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Contiguous chunk moved by scatter, broadcast or gather.
    Block(Vec<Element>),
    Task(WorkItem),
    /// Result of a [`Message::Task`], one value per task row.
    Reply(Vec<Element>),
    Terminate,
    Barrier,
    Ping(u64),
}

impl Message {
    /// Short name of the variant, used in protocol error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Block(_) => "block",
            Message::Task(_) => "task",
            Message::Reply(_) => "reply",
            Message::Terminate => "terminate",
            Message::Barrier => "barrier",
            Message::Ping(_) => "ping",
        }
    }
}
