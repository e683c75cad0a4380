//! Tracked variables and their usage records.
//!
//! Each tracked variable gets a stable [`VarHandle`] at collection time and
//! points at a [`RecordId`]. Several variables may share one record (sibling
//! implementations of an interface method); sharing is kept in a union-find
//! over records, so merging two groups that were each already shared still
//! leaves every member looking at one record.

use std::collections::{BTreeSet, HashMap};

use crate::program::{ObjectId, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u32);

/// How a variable was observed being used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRecord {
    /// Interface types the variable was used as (call arguments, struct
    /// fields, casts).
    pub interface_uses: BTreeSet<TypeId>,
    /// Methods called with the variable as receiver.
    pub method_uses: BTreeSet<String>,
    /// The variable is the context parameter of a memoized function.
    pub cached: bool,
}

impl UsageRecord {
    fn absorb(&mut self, other: UsageRecord) {
        self.interface_uses.extend(other.interface_uses);
        self.method_uses.extend(other.method_uses);
        self.cached |= other.cached;
    }

    pub fn is_empty(&self) -> bool {
        self.interface_uses.is_empty() && self.method_uses.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TrackedVariable {
    pub object: ObjectId,
    record: RecordId,
    /// Cleared when the variable is dropped from tracking.
    active: bool,
}

/// Arena of tracked variables and their (possibly shared) records.
#[derive(Debug, Default)]
pub struct Tracker {
    variables: Vec<TrackedVariable>,
    by_object: HashMap<ObjectId, VarHandle>,
    records: Vec<UsageRecord>,
    parent: Vec<RecordId>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `object` with a fresh, empty record.
    ///
    /// Tracking an object twice returns the existing handle.
    pub fn track(&mut self, object: ObjectId) -> VarHandle {
        if let Some(&handle) = self.by_object.get(&object) {
            return handle;
        }
        let record = RecordId(self.records.len() as u32);
        self.records.push(UsageRecord::default());
        self.parent.push(record);

        let handle = VarHandle(self.variables.len() as u32);
        self.variables.push(TrackedVariable {
            object,
            record,
            active: true,
        });
        self.by_object.insert(object, handle);
        handle
    }

    /// Handle of a tracked object, if it is (still) tracked.
    pub fn lookup(&self, object: ObjectId) -> Option<VarHandle> {
        self.by_object.get(&object).copied()
    }

    /// Stop tracking an object; its record is left to any sharers.
    pub fn untrack(&mut self, object: ObjectId) -> bool {
        match self.by_object.remove(&object) {
            Some(handle) => {
                self.variables[handle.0 as usize].active = false;
                true
            }
            None => false,
        }
    }

    pub fn variable(&self, handle: VarHandle) -> &TrackedVariable {
        &self.variables[handle.0 as usize]
    }

    fn find(&self, mut id: RecordId) -> RecordId {
        while self.parent[id.0 as usize] != id {
            id = self.parent[id.0 as usize];
        }
        id
    }

    /// The canonical record id of a variable.
    pub fn record_id(&self, handle: VarHandle) -> RecordId {
        self.find(self.variable(handle).record)
    }

    pub fn record(&self, handle: VarHandle) -> &UsageRecord {
        let id = self.record_id(handle);
        &self.records[id.0 as usize]
    }

    pub fn record_mut(&mut self, handle: VarHandle) -> &mut UsageRecord {
        let id = self.record_id(handle);
        &mut self.records[id.0 as usize]
    }

    /// Make two variables share one record holding the union of both.
    pub fn share(&mut self, a: VarHandle, b: VarHandle) {
        let ra = self.record_id(a);
        let rb = self.record_id(b);
        if ra == rb {
            return;
        }
        let absorbed = std::mem::take(&mut self.records[rb.0 as usize]);
        self.records[ra.0 as usize].absorb(absorbed);
        self.parent[rb.0 as usize] = ra;
    }

    /// Active variables in collection order.
    pub fn active(&self) -> impl Iterator<Item = (VarHandle, &TrackedVariable)> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.active)
            .map(|(i, v)| (VarHandle(i as u32), v))
    }

    pub fn len(&self) -> usize {
        self.by_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }

    /// Number of distinct records in use by active variables.
    pub fn distinct_records(&self) -> usize {
        self.active()
            .map(|(h, _)| self.record_id(h))
            .collect::<BTreeSet<_>>()
            .len()
    }
}
