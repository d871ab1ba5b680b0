//! Insertion-ordered segment storage with stable handles.
//!
//! The pipe walks its in-flight segments in arrival order while inserting
//! reflections directly after the segment being processed. [`SegmentList`]
//! is a doubly-linked list living in a slot vector: inserting or removing an
//! entry never moves other entries, so every live [`SegmentId`] stays valid.
//! Freed slots are recycled; a generation counter makes stale handles miss.

use std::fmt;

/// Handle to an entry of a [`SegmentList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId {
    index: usize,
    generation: u32,
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly-linked list over a slot arena.
#[derive(Debug, Clone)]
pub struct SegmentList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for SegmentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SegmentList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Create an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every entry. Slot storage is kept for reuse.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.prev = None;
            slot.next = None;
            self.free.push(index);
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn id_at(&self, index: usize) -> SegmentId {
        SegmentId {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn resolve(&self, id: SegmentId) -> Option<usize> {
        let slot = self.slots.get(id.index)?;
        (slot.generation == id.generation && slot.value.is_some()).then_some(id.index)
    }

    fn allocate(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        let slot = Slot {
            value: Some(value),
            generation: 0,
            prev,
            next,
        };
        match self.free.pop() {
            Some(index) => {
                let generation = self.slots[index].generation;
                self.slots[index] = Slot { generation, ..slot };
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Insert at the front of the list.
    pub fn push_front(&mut self, value: T) -> SegmentId {
        let index = self.allocate(value, None, self.head);
        match self.head {
            Some(old_head) => self.slots[old_head].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
        self.id_at(index)
    }

    /// Insert at the back of the list.
    pub fn push_back(&mut self, value: T) -> SegmentId {
        match self.tail {
            Some(tail) => self.insert_after_index(tail, value),
            None => self.push_front(value),
        }
    }

    /// Insert directly after `id`. Returns `None` if `id` is stale.
    pub fn insert_after(&mut self, id: SegmentId, value: T) -> Option<SegmentId> {
        let index = self.resolve(id)?;
        Some(self.insert_after_index(index, value))
    }

    fn insert_after_index(&mut self, index: usize, value: T) -> SegmentId {
        let next = self.slots[index].next;
        let new_index = self.allocate(value, Some(index), next);
        self.slots[index].next = Some(new_index);
        match next {
            Some(next) => self.slots[next].prev = Some(new_index),
            None => self.tail = Some(new_index),
        }
        self.len += 1;
        self.id_at(new_index)
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, id: SegmentId) -> Option<T> {
        let index = self.resolve(id)?;
        let (prev, next) = (self.slots[index].prev, self.slots[index].next);
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }

        let slot = &mut self.slots[index];
        slot.prev = None;
        slot.next = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        slot.value.take()
    }

    /// Remove the last entry.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(self.id_at(tail))
    }

    /// Drop entries from the back until at most `max_len` remain.
    pub fn truncate(&mut self, max_len: usize) {
        while self.len > max_len {
            self.pop_back();
        }
    }

    pub fn front(&self) -> Option<SegmentId> {
        self.head.map(|index| self.id_at(index))
    }

    pub fn back(&self) -> Option<SegmentId> {
        self.tail.map(|index| self.id_at(index))
    }

    /// The entry following `id`.
    pub fn next(&self, id: SegmentId) -> Option<SegmentId> {
        let index = self.resolve(id)?;
        self.slots[index].next.map(|next| self.id_at(next))
    }

    pub fn get(&self, id: SegmentId) -> Option<&T> {
        let index = self.resolve(id)?;
        self.slots[index].value.as_ref()
    }

    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut T> {
        let index = self.resolve(id)?;
        self.slots[index].value.as_mut()
    }

    /// Iterate values front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

/// Front-to-back iterator over a [`SegmentList`].
pub struct Iter<'a, T> {
    list: &'a SegmentList<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.list.slots[index];
        self.cursor = slot.next;
        self.remaining -= 1;
        slot.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a SegmentList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &SegmentList<i32>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_and_iterate() {
        let mut list = SegmentList::new();
        list.push_back(2);
        list.push_front(1);
        list.push_back(3);
        assert_eq!(values(&list), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_insert_after_keeps_handles_valid() {
        let mut list = SegmentList::new();
        let a = list.push_back(1);
        let c = list.push_back(3);
        let b = list.insert_after(a, 2).unwrap();
        list.insert_after(c, 4).unwrap();

        assert_eq!(values(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.get(a), Some(&1));
        assert_eq!(list.get(b), Some(&2));
        assert_eq!(list.get(c), Some(&3));
        assert_eq!(list.next(a), Some(b));
        assert_eq!(list.next(b), Some(c));
    }

    #[test]
    fn test_remove_and_stale_handles() {
        let mut list = SegmentList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);
        let c = list.push_back(3);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(list.get(b), None);
        assert_eq!(list.next(a), Some(c));

        // the freed slot is reused but the old handle does not see it
        let d = list.push_back(4);
        assert_eq!(list.get(b), None);
        assert_eq!(list.get(d), Some(&4));
        assert_eq!(values(&list), vec![1, 3, 4]);
    }

    #[test]
    fn test_truncate_drops_from_back() {
        let mut list = SegmentList::new();
        for i in 0..10 {
            list.push_back(i);
        }
        list.truncate(4);
        assert_eq!(values(&list), vec![0, 1, 2, 3]);
        assert_eq!(list.back().and_then(|id| list.get(id)), Some(&3));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut list = SegmentList::new();
        let a = list.push_back(1);
        list.push_back(2);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.get(a), None);
        assert_eq!(list.front(), None);

        list.push_back(5);
        assert_eq!(values(&list), vec![5]);
        assert_eq!(list.get(a), None);
    }
}
