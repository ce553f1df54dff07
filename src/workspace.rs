//! A scoped storage arena owned by each parser and serializer.
//!
//! The workspace bounds the memory a codec instance may use for hosted
//! objects (erased sinks, sources, filters) and long-lived codec state.
//! It has two growth fronts: front reservations, which survive `clear`,
//! and scoped emplacements, which `clear` destroys in the reverse order
//! of their creation.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Kind, Result};

// every charge is rounded up to the worst-case alignment
const ALIGN: usize = 16;

/// Handle to an emplaced object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WsSlot(usize);

pub(crate) struct Workspace {
    cap: usize,
    front: usize,
    used: usize,
    slots: Vec<Slot>,
}

struct Slot {
    footprint: usize,
    obj: Box<dyn Any>,
}

fn aligned(n: usize) -> usize {
    n.checked_add(ALIGN - 1).map(|n| n & !(ALIGN - 1)).unwrap_or(usize::max_value())
}

impl Workspace {
    pub(crate) fn new(cap: usize) -> Workspace {
        Workspace {
            cap,
            front: 0,
            used: 0,
            slots: Vec::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cap - self.front - self.used
    }

    /// Reserve `n` bytes of long-lived storage. Retained by `clear`.
    pub(crate) fn reserve_front(&mut self, n: usize) -> Result<()> {
        let n = aligned(n);
        if n > self.remaining() {
            return Err(Error::new(Kind::BufferOverflow));
        }
        self.front += n;
        Ok(())
    }

    /// Emplace a scoped object, charging its aligned footprint.
    ///
    /// Objects live until `clear`, which destroys them in reverse
    /// order of emplacement.
    pub(crate) fn emplace<T: Any>(&mut self, value: T) -> Result<WsSlot> {
        self.emplace_sized(value, std::mem::size_of::<T>())
    }

    /// Emplace with an explicit size, for type-erased objects whose
    /// stored type (a box) hides the real footprint.
    pub(crate) fn emplace_sized<T: Any>(&mut self, value: T, footprint: usize) -> Result<WsSlot> {
        let footprint = aligned(footprint.max(std::mem::size_of::<T>()));
        if footprint > self.remaining() {
            return Err(Error::new(Kind::BufferOverflow));
        }
        self.used += footprint;
        self.slots.push(Slot {
            footprint,
            obj: Box::new(value),
        });
        Ok(WsSlot(self.slots.len() - 1))
    }

    pub(crate) fn get_mut<T: Any>(&mut self, slot: WsSlot) -> &mut T {
        self.slots[slot.0]
            .obj
            .downcast_mut::<T>()
            .expect("workspace slot holds a different type")
    }

    /// Destroy all scoped objects (in reverse order) and release their
    /// storage. Front reservations are retained.
    pub(crate) fn clear(&mut self) {
        while let Some(slot) = self.slots.pop() {
            self.used -= slot.footprint;
            drop(slot.obj);
        }
        debug_assert_eq!(self.used, 0);
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("cap", &self.cap)
            .field("front", &self.front)
            .field("used", &self.used)
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn front_reservations_survive_clear() {
        let mut ws = Workspace::new(256);
        ws.reserve_front(100).unwrap();
        assert!(ws.remaining() <= 256 - 100);
        let before = ws.remaining();
        ws.emplace(7u64).unwrap();
        assert!(ws.remaining() < before);
        ws.clear();
        assert_eq!(ws.remaining(), before);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut ws = Workspace::new(32);
        assert!(ws.reserve_front(64).is_err());
        ws.reserve_front(16).unwrap();
        assert!(ws.emplace([0u8; 64]).is_err());
        assert!(ws.emplace(1u8).is_ok());
    }

    #[test]
    fn emplaced_objects_are_reachable() {
        let mut ws = Workspace::new(256);
        let slot = ws.emplace(String::from("abc")).unwrap();
        ws.get_mut::<String>(slot).push('d');
        assert_eq!(ws.get_mut::<String>(slot), "abcd");
    }

    #[test]
    fn clear_drops_in_reverse_order() {
        struct Tracker(u32, Rc<RefCell<Vec<u32>>>);
        impl Drop for Tracker {
            fn drop(&mut self) {
                self.1.borrow_mut().push(self.0);
            }
        }

        let order = Rc::new(RefCell::new(Vec::new()));
        let mut ws = Workspace::new(1024);
        ws.emplace(Tracker(1, order.clone())).unwrap();
        ws.emplace(Tracker(2, order.clone())).unwrap();
        ws.emplace(Tracker(3, order.clone())).unwrap();
        ws.clear();
        assert_eq!(*order.borrow(), vec![3, 2, 1]);
        assert_eq!(ws.remaining(), 1024);
    }
}
