/// Byte-addressable view of a memory window.
///
/// Offsets are relative to the start of the window. Implementations panic on
/// an offset outside `0..size()`, like slice indexing; callers only reach
/// offsets taken from a validated register table.
pub trait MemoryWindow {
    fn size(&self) -> usize;
    fn load(&self, offset: usize) -> u8;
    fn store(&mut self, offset: usize, value: u8);
}

/// A window backed by ordinary heap memory.
#[derive(Debug, Clone)]
pub struct HeapWindow {
    memory: Box<[u8]>,
}

impl HeapWindow {
    /// A zero-filled window of `size` bytes.
    pub fn new(size: usize) -> Self {
        HeapWindow {
            memory: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }
}

impl MemoryWindow for HeapWindow {
    fn size(&self) -> usize {
        self.memory.len()
    }

    fn load(&self, offset: usize) -> u8 {
        self.memory[offset]
    }

    fn store(&mut self, offset: usize, value: u8) {
        self.memory[offset] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_window_starts_zeroed() {
        let window = HeapWindow::new(16);
        assert_eq!(window.size(), 16);
        assert!(window.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_heap_window_store_load() {
        let mut window = HeapWindow::new(4);
        window.store(3, 0x5a);
        assert_eq!(window.load(3), 0x5a);
        assert_eq!(window.as_bytes(), &[0, 0, 0, 0x5a]);
    }

    #[test]
    #[should_panic]
    fn test_heap_window_out_of_bounds() {
        let window = HeapWindow::new(4);
        window.load(4);
    }
}
