//! Disk-resident B+-tree over integer keys.
//!
//! Every node lives inside one page and is read and written through the
//! same buffer pool as table data. Keys map to record ids; duplicates are
//! rejected. There is no delete; temporary trees are dropped wholesale
//! with [`BPlusTree::erase`].

mod error;
mod node;

pub use error::{BTreeError, BTreeResult};
pub use node::{BTreeNode, Child, MAX_CHILDREN, MAX_KEYS, NO_PARENT};

use crate::storage::{PageId, RecordId, SharedBufferPool};

/// B+-tree rooted at a page id. The root id changes when the tree grows;
/// persist [`BPlusTree::root_id`] to reopen the same tree later.
pub struct BPlusTree {
    pool: SharedBufferPool,
    root_id: PageId,
}

impl BPlusTree {
    /// Open the tree rooted at `root_id`, creating an empty leaf root if
    /// that page does not exist yet.
    pub fn new(pool: SharedBufferPool, root_id: PageId) -> BTreeResult<Self> {
        let exists = pool.lock().unwrap().exists(&root_id);
        if !exists {
            BTreeNode::create(&pool, root_id, None, true)?;
        }
        Ok(Self { pool, root_id })
    }

    pub fn root_id(&self) -> &PageId {
        &self.root_id
    }

    /// Point lookup: the record id stored under `key`, if any.
    pub fn search(&self, key: i32) -> BTreeResult<Option<RecordId>> {
        let leaf = self.find_leaf(key)?;
        let keys = leaf.keys()?;
        let children = leaf.children()?;

        for (i, stored) in keys.iter().enumerate() {
            if *stored == key {
                return match children.get(i) {
                    Some(Child::Record(record_id)) => Ok(Some(*record_id)),
                    _ => Err(BTreeError::CorruptNode(format!(
                        "leaf {} lacks a record pointer for key {}",
                        leaf.page_id(),
                        key
                    ))),
                };
            }
        }
        Ok(None)
    }

    /// Insert `key` → `record_id`, splitting and propagating upward as
    /// needed. Inserting an existing key is an error.
    pub fn insert(&mut self, key: i32, record_id: &RecordId) -> BTreeResult<()> {
        let leaf = self.find_leaf(key)?;
        let mut current = leaf.clone();
        let mut outcome = leaf.insert_record(key, record_id)?;

        while let Some((sibling, separator)) = outcome {
            check_balance(&current, &sibling)?;

            outcome = match current.parent_id()? {
                None => {
                    // the root split: grow the tree by one level
                    let root_id = self.pool.lock().unwrap().allocate()?;
                    let root = BTreeNode::create(&self.pool, root_id, None, false)?;
                    current.set_parent_id(Some(&root_id))?;
                    sibling.set_parent_id(Some(&root_id))?;
                    root.insert_separator(separator, current.page_id(), sibling.page_id())?;
                    self.root_id = root_id;
                    None
                }
                Some(parent_id) => {
                    let parent = BTreeNode::attach(&self.pool, parent_id);
                    current.set_parent_id(Some(&parent_id))?;
                    sibling.set_parent_id(Some(&parent_id))?;
                    let next =
                        parent.insert_separator(separator, current.page_id(), sibling.page_id())?;
                    current = parent;
                    next
                }
            };
        }
        Ok(())
    }

    /// Remove every page reachable from the root, consuming the tree. Used
    /// by the operators to dispose of temporary indexes.
    pub fn erase(self) -> BTreeResult<()> {
        let mut pending = vec![self.root_id];
        let mut pages = Vec::new();

        while let Some(page_id) = pending.pop() {
            let node = BTreeNode::attach(&self.pool, page_id);
            if !node.is_leaf()? {
                for child in node.children()? {
                    if let Child::Page(child_id) = child {
                        pending.push(child_id);
                    }
                }
            }
            // leaves are reached through their parents; next-leaf pointers
            // would only revisit them
            pages.push(page_id);
        }

        let mut pool = self.pool.lock().unwrap();
        for page_id in &pages {
            pool.erase(page_id)?;
        }
        Ok(())
    }

    /// Descend to the leaf that covers `key`: at each internal node follow
    /// the child before the first key greater than `key`, or the last child.
    fn find_leaf(&self, key: i32) -> BTreeResult<BTreeNode> {
        let mut current = BTreeNode::attach(&self.pool, self.root_id);

        while !current.is_leaf()? {
            let keys = current.keys()?;
            let children = current.children()?;
            let index = keys.partition_point(|stored| *stored <= key);

            match children.get(index) {
                Some(Child::Page(page_id)) => {
                    current = BTreeNode::attach(&self.pool, *page_id);
                }
                _ => {
                    return Err(BTreeError::CorruptNode(format!(
                        "internal node {} has no child for key {}",
                        current.page_id(),
                        key
                    )))
                }
            }
        }
        Ok(current)
    }
}

fn check_balance(left: &BTreeNode, right: &BTreeNode) -> BTreeResult<()> {
    if cfg!(debug_assertions) {
        let left_count = left.keys()?.len();
        let right_count = right.keys()?.len();
        debug_assert!(
            left_count.abs_diff(right_count) <= 1,
            "unbalanced split: {} vs {} keys",
            left_count,
            right_count
        );
        debug_assert_eq!(left.children()?.len(), left_count + 1);
    }
    Ok(())
}
