use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfportError {
    #[error("Mapping error: {0}")]
    Map(#[from] MapError),

    #[error("Register table error: {0}")]
    Table(#[from] TableError),

    #[error("Error while writing in {reg}: {cause}", reg = .0.register(), cause = .0)]
    Write(#[from] WriteError),

    #[error("Unknown register: {0}")]
    UnknownRegister(String),
}

/// Failures while establishing the device window. None of them leave a
/// partially established mapping behind.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot mmap {size} bytes at physical address 0x{base:x}: {source}")]
    Map {
        base: u64,
        size: usize,
        source: io::Error,
    },

    #[error("cannot lock process pages in memory: {source}")]
    Lock { source: io::Error },

    #[error("window of {size} bytes does not fit the register table: {source}")]
    Layout { size: usize, source: TableError },
}

impl MapError {
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn map(base: u64, size: usize, source: io::Error) -> Self {
        Self::Map { base, size, source }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("register {name} has a size of 0 bytes")]
    ZeroSize { name: &'static str },

    #[error("register name {name} is used more than once")]
    DuplicateName { name: &'static str },

    #[error(
        "register {name} [0x{offset:x}, 0x{end:x}) ends outside the {window}-byte window"
    )]
    OutOfWindow {
        name: &'static str,
        offset: usize,
        end: usize,
        window: usize,
    },

    #[error(
        "register {name} [0x{new_start:x}, 0x{new_end:x}) overlaps register {existing} [0x{existing_start:x}, 0x{existing_end:x})"
    )]
    Overlap {
        name: &'static str,
        existing: &'static str,
        existing_start: usize,
        existing_end: usize,
        new_start: usize,
        new_end: usize,
    },
}

impl TableError {
    pub fn overlap(
        existing: (&'static str, usize, usize),
        new: (&'static str, usize, usize),
    ) -> Self {
        Self::Overlap {
            name: new.0,
            existing: existing.0,
            existing_start: existing.1,
            existing_end: existing.2,
            new_start: new.1,
            new_end: new.2,
        }
    }
}

/// Refused register writes. When any of these is returned the register
/// memory has not been touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Register is read only")]
    ReadOnlyViolation { register: &'static str },

    #[error("Invalid character {character} in value 0x{value}")]
    InvalidCharacter {
        register: &'static str,
        character: char,
        value: String,
    },

    #[error(
        "size of value ({value_bytes} bytes) is greater than the size of the register {register} ({register_bytes} bytes)"
    )]
    ValueTooLarge {
        register: &'static str,
        value_bytes: usize,
        register_bytes: usize,
    },

    #[error("Failed to convert {pair} to a byte")]
    ConversionFailure { register: &'static str, pair: String },
}

impl WriteError {
    /// Name of the register the refused write targeted.
    pub fn register(&self) -> &'static str {
        match self {
            Self::ReadOnlyViolation { register }
            | Self::InvalidCharacter { register, .. }
            | Self::ValueTooLarge { register, .. }
            | Self::ConversionFailure { register, .. } => register,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_names_register() {
        let err = WriteError::InvalidCharacter {
            register: "pa",
            character: 'g',
            value: "12g4".to_string(),
        };
        assert_eq!(err.register(), "pa");
        assert!(err.to_string().contains('g'));

        let wrapped = ConfportError::from(err);
        let message = wrapped.to_string();
        assert!(message.contains("Error while writing in pa"));
        assert!(message.contains("0x12g4"));
    }

    #[test]
    fn test_value_too_large_message() {
        let err = WriteError::ValueTooLarge {
            register: "active",
            value_bytes: 2,
            register_bytes: 1,
        };
        let message = err.to_string();
        assert!(message.contains("2 bytes"));
        assert!(message.contains("active (1 bytes)"));
    }

    #[test]
    fn test_map_error_reports_os_error() {
        let err = MapError::open("/dev/mem", io::Error::from_raw_os_error(libc::EACCES));
        let message = err.to_string();
        assert!(message.contains("/dev/mem"));
        assert!(message.to_lowercase().contains("permission denied"));

        let err = MapError::map(0x8000_0000, 48, io::Error::from_raw_os_error(libc::EINVAL));
        assert!(err.to_string().contains("0x80000000"));
    }

    #[test]
    fn test_overlap_constructor() {
        let err = TableError::overlap(("pa", 0x10, 0x18), ("active", 0x14, 0x15));
        assert_eq!(
            err,
            TableError::Overlap {
                name: "active",
                existing: "pa",
                existing_start: 0x10,
                existing_end: 0x18,
                new_start: 0x14,
                new_end: 0x15,
            }
        );
    }
}
