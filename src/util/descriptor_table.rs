use super::Descriptor;

/// A fixed-size table of open files, indexed by descriptor.
///
/// Freed slots are reused by the next open, so descriptors stay small and stable while a file is
/// open. Once every slot is taken, further opens are refused until something is closed.
#[derive(Debug)]
pub struct DescriptorTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> DescriptorTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        DescriptorTable { slots }
    }

    /// Store an open file in the first free slot. Returns `None` if the table is full.
    pub fn insert(&mut self, item: T) -> Option<Descriptor> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(item);
        Some(Descriptor::from_slot(index))
    }

    /// Checks whether every slot is taken, i.e. the next `insert` would be refused.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn get(&self, descriptor: Descriptor) -> Option<&T> {
        self.slots.get(descriptor.slot()?)?.as_ref()
    }

    pub fn get_mut(&mut self, descriptor: Descriptor) -> Option<&mut T> {
        self.slots.get_mut(descriptor.slot()?)?.as_mut()
    }

    pub fn remove(&mut self, descriptor: Descriptor) -> Option<T> {
        self.slots.get_mut(descriptor.slot()?)?.take()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
