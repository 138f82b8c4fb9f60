/// Byte order used when a multi-byte register is stored in the window.
///
/// This only affects the physical layout. The textual form of a register is
/// always most-significant byte first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Lowest offset holds the least significant byte.
    #[default]
    Little,
    /// Highest offset holds the least significant byte.
    Big,
}

impl Endianness {
    /// Offset, relative to the register start, of the byte with the given
    /// significance (0 is the least significant byte).
    pub fn displacement(self, significance: usize, size: usize) -> usize {
        debug_assert!(significance < size);
        match self {
            Endianness::Little => significance,
            Endianness::Big => size - 1 - significance,
        }
    }

    /// Reorder a most-significant-first value into physical order.
    pub fn to_physical(self, msb_first: &[u8]) -> Vec<u8> {
        let size = msb_first.len();
        let mut physical = vec![0u8; size];
        for (position, byte) in msb_first.iter().enumerate() {
            let significance = size - 1 - position;
            physical[self.displacement(significance, size)] = *byte;
        }
        physical
    }

    /// Reorder physically stored bytes into most-significant-first order.
    pub fn to_logical(self, physical: &[u8]) -> Vec<u8> {
        let size = physical.len();
        (0..size)
            .rev()
            .map(|significance| physical[self.displacement(significance, size)])
            .collect()
    }
}

impl std::str::FromStr for Endianness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "little" | "le" => Ok(Endianness::Little),
            "big" | "be" => Ok(Endianness::Big),
            other => Err(format!("unknown byte order '{other}' (expected little or big)")),
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}
