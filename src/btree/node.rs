use crate::record::{Attribute, Record};
use crate::storage::{Page, PageId, RecordId, SharedBufferPool, RECORD_ID_LEN};

use super::error::{BTreeError, BTreeResult};

/// Maximum number of keys stored in a node.
pub const MAX_KEYS: usize = 29;

/// Maximum number of child pointers stored in a node.
pub const MAX_CHILDREN: usize = 30;

/// Parent marker of the root node.
pub const NO_PARENT: &str = "-----";

// Fixed slot assignments within a node page.
const SLOT_PARENT: usize = 0;
const SLOT_LEAF: usize = 1;
const SLOT_KEY_COUNT: usize = 2;
const SLOT_KEYS: usize = 3;
const SLOT_CHILD_COUNT: usize = 32;
const SLOT_CHILDREN: usize = 33;

/// A child pointer. Internal nodes reference pages; leaves reference
/// records, plus an optional trailing page pointer to the next leaf. The
/// stored byte length tells the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Page(PageId),
    Record(RecordId),
}

impl Child {
    fn encode(&self) -> String {
        match self {
            Child::Page(page_id) => page_id.to_string(),
            Child::Record(record_id) => record_id.to_string(),
        }
    }

    fn parse(text: &str) -> BTreeResult<Self> {
        match text.len() {
            5 => Ok(Child::Page(PageId::parse(text)?)),
            10 => Ok(Child::Record(RecordId::parse(text)?)),
            _ => Err(BTreeError::CorruptNode(format!(
                "child pointer {:?} has no valid width",
                text
            ))),
        }
    }
}

/// A single tree node stored inside one page.
///
/// The node occupies fixed record slots: parent id, leaf flag, key count,
/// 29 key slots, child count, 30 child slots. Dummy child slots are laid
/// out ten bytes wide so either pointer variant fits an in-place update.
#[derive(Clone)]
pub struct BTreeNode {
    pool: SharedBufferPool,
    page_id: PageId,
}

impl BTreeNode {
    /// Attach to an existing node page.
    pub fn attach(pool: &SharedBufferPool, page_id: PageId) -> Self {
        Self {
            pool: pool.clone(),
            page_id,
        }
    }

    /// Lay the node schema into a freshly created page.
    pub fn create(
        pool: &SharedBufferPool,
        page_id: PageId,
        parent_id: Option<&PageId>,
        leaf: bool,
    ) -> BTreeResult<Self> {
        let parent = parent_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| NO_PARENT.to_string());

        let mut layout = Vec::with_capacity(3 + MAX_KEYS + 1 + MAX_CHILDREN);
        layout.push(Attribute::Str(parent));
        layout.push(Attribute::Bool(leaf));
        layout.push(Attribute::Int(0));
        layout.extend((0..MAX_KEYS).map(|_| Attribute::Int(-1)));
        layout.push(Attribute::Int(0));
        layout.extend((0..MAX_CHILDREN).map(|_| Attribute::Str("0".repeat(RECORD_ID_LEN))));

        let mut guard = pool.lock().unwrap();
        let page = guard.pin(&page_id)?;

        // a page that was read back from disk already carries node data
        let mut initialized = page.is_dirty();
        if initialized {
            for attribute in layout {
                if page.add_record(&[attribute]).is_none() {
                    initialized = false;
                    break;
                }
            }
        }
        guard.unpin(&page_id)?;
        drop(guard);

        if !initialized {
            return Err(BTreeError::CorruptNode(format!(
                "cannot initialize node {}",
                page_id
            )));
        }
        Ok(Self::attach(pool, page_id))
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// The parent page id, or `None` on the root.
    pub fn parent_id(&self) -> BTreeResult<Option<PageId>> {
        let text = self.with_page(|page| Ok(slot_record(page, SLOT_PARENT)?.str_attribute(1)))?;
        if text == NO_PARENT {
            Ok(None)
        } else {
            Ok(Some(PageId::parse(&text)?))
        }
    }

    pub fn is_leaf(&self) -> BTreeResult<bool> {
        self.with_page(|page| Ok(slot_record(page, SLOT_LEAF)?.bool_attribute(1)))
    }

    /// The valid keys, in ascending order.
    pub fn keys(&self) -> BTreeResult<Vec<i32>> {
        self.with_page(|page| {
            let count = slot_record(page, SLOT_KEY_COUNT)?.int_attribute(1) as usize;
            let mut keys = Vec::with_capacity(count);
            for i in 0..count {
                keys.push(slot_record(page, SLOT_KEYS + i)?.int_attribute(1));
            }
            Ok(keys)
        })
    }

    /// The valid child pointers.
    pub fn children(&self) -> BTreeResult<Vec<Child>> {
        self.with_page(|page| {
            let count = slot_record(page, SLOT_CHILD_COUNT)?.int_attribute(1) as usize;
            let mut children = Vec::with_capacity(count);
            for i in 0..count {
                let text = slot_record(page, SLOT_CHILDREN + i)?.str_attribute(1);
                children.push(Child::parse(&text)?);
            }
            Ok(children)
        })
    }

    pub fn set_parent_id(&self, parent_id: Option<&PageId>) -> BTreeResult<()> {
        let text = parent_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| NO_PARENT.to_string());
        self.with_page(|page| update_slot(page, SLOT_PARENT, Attribute::Str(text)))
    }

    /// Rewrite the key array: the count slot first, then the value slots.
    pub fn set_keys(&self, keys: &[i32]) -> BTreeResult<()> {
        if keys.len() > MAX_KEYS {
            return Err(BTreeError::CorruptNode(format!(
                "{} keys exceed the capacity of node {}",
                keys.len(),
                self.page_id
            )));
        }
        if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(BTreeError::CorruptNode(format!(
                "unsorted keys in node {}",
                self.page_id
            )));
        }

        self.with_page(|page| {
            update_slot(page, SLOT_KEY_COUNT, Attribute::Int(keys.len() as i32))?;
            for (i, key) in keys.iter().enumerate() {
                update_slot(page, SLOT_KEYS + i, Attribute::Int(*key))?;
            }
            Ok(())
        })
    }

    /// Rewrite the child array: the count slot first, then the value slots.
    pub fn set_children(&self, children: &[Child]) -> BTreeResult<()> {
        if children.len() > MAX_CHILDREN {
            return Err(BTreeError::CorruptNode(format!(
                "{} children exceed the capacity of node {}",
                children.len(),
                self.page_id
            )));
        }

        self.with_page(|page| {
            update_slot(page, SLOT_CHILD_COUNT, Attribute::Int(children.len() as i32))?;
            for (i, child) in children.iter().enumerate() {
                update_slot(page, SLOT_CHILDREN + i, Attribute::Str(child.encode()))?;
            }
            Ok(())
        })
    }

    /// Insert a key → record pointer into this leaf. Returns the new right
    /// sibling and the separator key when the leaf had to split; the
    /// separator stays stored in the sibling.
    pub fn insert_record(
        &self,
        key: i32,
        record_id: &RecordId,
    ) -> BTreeResult<Option<(BTreeNode, i32)>> {
        let mut keys = self.keys()?;
        let mut children = self.children()?;

        if keys.binary_search(&key).is_ok() {
            return Err(BTreeError::DuplicateKey(key));
        }

        // detach the trailing next-leaf pointer while editing data entries
        let next_leaf = if children.len() == keys.len() + 1 {
            children.pop()
        } else {
            None
        };

        let index = keys.partition_point(|stored| *stored < key);
        keys.insert(index, key);
        children.insert(index, Child::Record(*record_id));

        if keys.len() < MAX_KEYS {
            if let Some(pointer) = next_leaf {
                children.push(pointer);
            }
            self.set_keys(&keys)?;
            self.set_children(&children)?;
            return Ok(None);
        }

        // keep the lower half here, move the upper half into a fresh leaf
        let middle = keys.len() / 2;
        let separator = keys[middle];

        let sibling_id = self.pool.lock().unwrap().allocate()?;
        let sibling = BTreeNode::create(&self.pool, sibling_id, self.parent_id()?.as_ref(), true)?;

        let sibling_keys = keys.split_off(middle);
        let mut sibling_children = children.split_off(middle);
        if let Some(pointer) = next_leaf {
            sibling_children.push(pointer);
        }
        children.push(Child::Page(sibling_id));

        self.set_keys(&keys)?;
        self.set_children(&children)?;
        sibling.set_keys(&sibling_keys)?;
        sibling.set_children(&sibling_children)?;

        Ok(Some((sibling, separator)))
    }

    /// Insert a separator key with its flanking children into this internal
    /// node. `left` must already sit at the insertion point; a fresh empty
    /// root receives both children. On overflow the node splits around the
    /// median, which moves up and is kept in neither half.
    pub fn insert_separator(
        &self,
        key: i32,
        left: &PageId,
        right: &PageId,
    ) -> BTreeResult<Option<(BTreeNode, i32)>> {
        let mut keys = self.keys()?;
        let mut children = self.children()?;

        let index = keys.partition_point(|stored| *stored < key);
        keys.insert(index, key);
        if children.is_empty() {
            children.push(Child::Page(*left));
            children.push(Child::Page(*right));
        } else {
            debug_assert_eq!(children.get(index), Some(&Child::Page(*left)));
            children.insert(index + 1, Child::Page(*right));
        }

        if keys.len() < MAX_KEYS {
            self.set_keys(&keys)?;
            self.set_children(&children)?;
            return Ok(None);
        }

        let middle = keys.len() / 2;
        let separator = keys[middle];

        let sibling_id = self.pool.lock().unwrap().allocate()?;
        let sibling = BTreeNode::create(&self.pool, sibling_id, self.parent_id()?.as_ref(), false)?;

        let sibling_keys: Vec<i32> = keys[middle + 1..].to_vec();
        let sibling_children: Vec<Child> = children[middle + 1..].to_vec();
        keys.truncate(middle);
        children.truncate(middle + 1);

        // moved subtrees hang off the new sibling now
        for child in &sibling_children {
            if let Child::Page(child_id) = child {
                BTreeNode::attach(&self.pool, *child_id).set_parent_id(Some(&sibling_id))?;
            }
        }

        self.set_keys(&keys)?;
        self.set_children(&children)?;
        sibling.set_keys(&sibling_keys)?;
        sibling.set_children(&sibling_children)?;

        Ok(Some((sibling, separator)))
    }

    fn with_page<T>(&self, action: impl FnOnce(&mut Page) -> BTreeResult<T>) -> BTreeResult<T> {
        let mut guard = self.pool.lock().unwrap();
        let page = guard.pin(&self.page_id)?;
        let result = action(page);
        guard.unpin(&self.page_id)?;
        result
    }
}

fn slot_record(page: &Page, slot: usize) -> BTreeResult<Record> {
    page.get_record(&RecordId::new(&page.page_id(), slot))
        .ok_or_else(|| {
            BTreeError::CorruptNode(format!("missing slot {} in node {}", slot, page.page_id()))
        })
}

fn update_slot(page: &mut Page, slot: usize, attribute: Attribute) -> BTreeResult<()> {
    let record = Record::new(&RecordId::new(&page.page_id(), slot), &[attribute]);
    if page.update_record(&record) {
        Ok(())
    } else {
        Err(BTreeError::CorruptNode(format!(
            "cannot update slot {} in node {}",
            slot,
            page.page_id()
        )))
    }
}
