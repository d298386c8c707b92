//! Recency ordering for variant entries
//!
//! A sentinel-terminated doubly linked list stored as parallel `prev`/`next`
//! indices next to the entry arena. Node 0 is the sentinel: its `next` is the
//! least recently used entry and its `prev` the most recently used one, so
//! unlink and link-to-tail never branch on list ends.

/// Index of an entry slot in the cache arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

const SENTINEL: u32 = 0;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: u32,
    next: u32,
    linked: bool,
}

impl Link {
    const DETACHED: Link = Link {
        prev: SENTINEL,
        next: SENTINEL,
        linked: false,
    };
}

/// Intrusive LRU ordering, newest-used at the tail
#[derive(Debug)]
pub struct LruChain {
    links: Vec<Link>,
    len: usize,
}

#[inline]
fn node(id: EntryId) -> u32 {
    id.0 + 1
}

#[inline]
fn entry(node: u32) -> EntryId {
    EntryId(node - 1)
}

impl LruChain {
    pub fn new() -> Self {
        Self {
            links: vec![Link::DETACHED],
            len: 0,
        }
    }

    fn ensure(&mut self, n: u32) {
        let needed = n as usize + 1;
        if self.links.len() < needed {
            self.links.resize(needed, Link::DETACHED);
        }
    }

    pub fn is_linked(&self, id: EntryId) -> bool {
        self.links
            .get(node(id) as usize)
            .is_some_and(|link| link.linked)
    }

    /// Remove `id` from the chain (no-op if it is not linked)
    pub fn unlink(&mut self, id: EntryId) {
        let n = node(id);
        if !self.is_linked(id) {
            return;
        }
        let Link { prev, next, .. } = self.links[n as usize];
        self.links[prev as usize].next = next;
        self.links[next as usize].prev = prev;
        self.links[n as usize] = Link::DETACHED;
        self.len -= 1;
    }

    /// Make `id` the most recently used entry, unlinking it first if needed
    pub fn link_to_tail(&mut self, id: EntryId) {
        self.unlink(id);
        let n = node(id);
        self.ensure(n);

        let tail = self.links[SENTINEL as usize].prev;
        self.links[n as usize] = Link {
            prev: tail,
            next: SENTINEL,
            linked: true,
        };
        self.links[tail as usize].next = n;
        self.links[SENTINEL as usize].prev = n;
        self.len += 1;
    }

    /// Least recently used entry
    pub fn headmost(&self) -> Option<EntryId> {
        match self.links[SENTINEL as usize].next {
            SENTINEL => None,
            n => Some(entry(n)),
        }
    }

    /// Most recently used entry
    pub fn tailmost(&self) -> Option<EntryId> {
        match self.links[SENTINEL as usize].prev {
            SENTINEL => None,
            n => Some(entry(n)),
        }
    }

    /// Entry following `id` towards the tail
    pub fn next_of(&self, id: EntryId) -> Option<EntryId> {
        if !self.is_linked(id) {
            return None;
        }
        match self.links[node(id) as usize].next {
            SENTINEL => None,
            n => Some(entry(n)),
        }
    }

    /// Iterate from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = EntryId> + '_ {
        let mut cursor = self.links[SENTINEL as usize].next;
        std::iter::from_fn(move || {
            if cursor == SENTINEL {
                return None;
            }
            let current = cursor;
            cursor = self.links[current as usize].next;
            Some(entry(current))
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.links.push(Link::DETACHED);
        self.len = 0;
    }
}

impl Default for LruChain {
    fn default() -> Self {
        Self::new()
    }
}
