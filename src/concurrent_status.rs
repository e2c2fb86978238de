use core::fmt;
use std::collections::{HashMap, HashSet};

use crate::error::{ErrorKind, SmallError};
use crate::heap::page_id::HeapPageID;
use crate::transaction::Transaction;
use crate::types::SmallResult;

#[derive(Debug, PartialEq)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// Per-page registry of granted locks: the lock table of strict two-phase
/// locking. Every mutation happens under the single `Database` guard for
/// this component, so each call is one atomic attempt.
///
/// Blocking/retry is not handled here; `BufferPool` owns the polling loop
/// and the deadlock timeout.
pub struct ConcurrentStatus {
    s_lock_map: HashMap<HeapPageID, HashSet<Transaction>>,
    x_lock_map: HashMap<HeapPageID, Transaction>,
    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            s_lock_map: HashMap::new(),
            x_lock_map: HashMap::new(),
            hold_pages: HashMap::new(),
        }
    }
}

impl ConcurrentStatus {
    /// A single, non-blocking lock attempt. This api is idempotent.
    ///
    /// # Return
    ///
    /// - `Ok(true)`: the lock is granted (or was already held).
    /// - `Ok(false)`: conflict, the caller may retry later.
    /// - `Err(TransactionAborted)`: the caller lost an upgrade race and
    ///   must not retry. Among the shared holders racing to upgrade the
    ///   same page, the lowest transaction id is allowed to keep waiting;
    ///   everyone else aborts on the spot. The asymmetry is what prevents
    ///   two upgraders from livelocking each other.
    pub fn acquire_lock(
        &mut self,
        tx: &Transaction,
        lock: &Lock,
        pid: &HeapPageID,
    ) -> Result<bool, SmallError> {
        // held exclusively by another transaction: no grant of any kind
        if let Some(holder) = self.x_lock_map.get(pid) {
            if holder != tx {
                return Ok(false);
            }
        }

        match lock {
            Lock::SLock => {
                self.s_lock_map
                    .entry(*pid)
                    .or_insert_with(HashSet::new)
                    .insert(tx.clone());
            }
            Lock::XLock => {
                if let Some(holders) = self.s_lock_map.get(pid) {
                    let has_others = holders.iter().any(|other| other != tx);
                    if has_others {
                        if !holders.contains(tx) {
                            // plain S/X conflict
                            return Ok(false);
                        }

                        let min_id = holders.iter().map(|t| t.get_id()).min().unwrap();
                        if tx.get_id() == min_id {
                            return Ok(false);
                        }
                        return Err(SmallError::new(
                            ErrorKind::TransactionAborted,
                            &format!("{} lost the upgrade race on {}", tx, pid),
                        ));
                    }
                }

                // sole holder (or no holder at all): grant, upgrading in
                // place when an S lock was already present
                self.x_lock_map.insert(*pid, tx.clone());
            }
        }

        self.hold_pages
            .entry(tx.clone())
            .or_insert_with(HashSet::new)
            .insert(*pid);
        Ok(true)
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        if let Some(holders) = self.s_lock_map.get(pid) {
            if holders.contains(tx) {
                return true;
            }
        }

        if let Some(holder) = self.x_lock_map.get(pid) {
            if holder == tx {
                return true;
            }
        }

        false
    }

    /// Release a single lock before transaction end. This breaks the
    /// two-phase discipline; `BufferPool::unsafe_release_page` is the only
    /// sanctioned caller.
    pub fn release_lock(&mut self, tx: &Transaction, pid: &HeapPageID) -> SmallResult {
        if let Some(holders) = self.s_lock_map.get_mut(pid) {
            holders.remove(tx);
            if holders.is_empty() {
                self.s_lock_map.remove(pid);
            }
        }

        if let Some(holder) = self.x_lock_map.get(pid) {
            if holder == tx {
                self.x_lock_map.remove(pid);
            }
        }

        if let Some(pages) = self.hold_pages.get_mut(tx) {
            pages.remove(pid);
        }

        Ok(())
    }

    /// Release every lock the transaction holds (transaction end).
    pub fn release_all(&mut self, tx: &Transaction) -> SmallResult {
        let hold_pages = match self.hold_pages.get(tx) {
            Some(pages) => pages.clone(),
            None => return Ok(()),
        };

        for pid in hold_pages {
            self.release_lock(tx, &pid)?;
        }

        self.hold_pages.remove(tx);

        Ok(())
    }

    pub fn clear(&mut self) {
        self.s_lock_map.clear();
        self.x_lock_map.clear();
        self.hold_pages.clear();
    }
}

impl fmt::Display for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depiction = "\n".to_string();

        depiction.push_str("s_lock_map: {");
        for (pid, holders) in self.s_lock_map.iter() {
            depiction.push_str(&format!("\n\t{} -> [", pid.get_short_repr()));
            for tx in holders {
                depiction.push_str(&format!("{:?}, ", tx));
            }
            depiction.push_str("]");
        }
        depiction.push_str("\n}\n");

        depiction.push_str("x_lock_map: {");
        for (pid, holder) in self.x_lock_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {:?}, ", pid.get_short_repr(), holder));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("hold_pages: {");
        for (tx, pages) in self.hold_pages.iter() {
            depiction.push_str(&format!("\n\t{:?} -> [", tx));
            for pid in pages {
                depiction.push_str(&format!("{}, ", pid.get_short_repr()));
            }
            depiction.push_str("]");
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
