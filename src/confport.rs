use crate::err::{ConfportError, MapError, TableError};
use crate::mems::{DevMem, MapConfig, MemoryWindow};
use crate::regs::{Endianness, REGISTERS, RegisterSpec, RegisterTable};
use crate::transcode;

/// Named register access on top of a memory window.
///
/// Register bytes are stored one at a time. A concurrent observer of the
/// same window may see a register half updated; nothing here serializes
/// access between processes.
#[derive(Debug)]
pub struct Confport<W: MemoryWindow> {
    window: W,
    table: RegisterTable<'static>,
    endianness: Endianness,
}

impl Confport<DevMem> {
    pub fn establish(config: &MapConfig, endianness: Endianness) -> Result<Self, MapError> {
        let window = DevMem::open(config)?;
        Self::new(window, &REGISTERS, endianness).map_err(|source| MapError::Layout {
            size: config.size,
            source,
        })
    }

    /// Release the mapping. Equivalent to dropping the handle.
    pub fn teardown(self) {
        self.window.teardown();
    }
}

impl<W: MemoryWindow> Confport<W> {
    pub fn new(
        window: W,
        specs: &'static [RegisterSpec],
        endianness: Endianness,
    ) -> Result<Self, TableError> {
        let table = RegisterTable::new(specs, window.size())?;
        Ok(Self {
            window,
            table,
            endianness,
        })
    }

    pub fn spec(&self, index: usize) -> Result<&'static RegisterSpec, ConfportError> {
        self.table
            .get(index)
            .ok_or_else(|| ConfportError::UnknownRegister(format!("#{index}")))
    }

    pub fn index_of(&self, name: &str) -> Result<usize, ConfportError> {
        self.table
            .index_of(name)
            .ok_or_else(|| ConfportError::UnknownRegister(name.to_string()))
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    /// Current value of register `index` as `0x` + hex, most significant
    /// byte first.
    pub fn read(&self, index: usize) -> Result<String, ConfportError> {
        let spec = self.spec(index)?;
        let physical: Vec<u8> = (spec.offset..spec.end())
            .map(|offset| self.window.load(offset))
            .collect();
        let value = transcode::render(&self.endianness.to_logical(&physical));
        log::debug!("read {} -> {value}", spec.name);
        Ok(value)
    }

    /// Parse `text` and store it into register `index`.
    ///
    /// The value is fully validated first; on error the register is left
    /// untouched.
    pub fn write(&mut self, index: usize, text: &str) -> Result<(), ConfportError> {
        let spec = self.spec(index)?;
        let value = transcode::encode(spec, text)?;
        let physical = self.endianness.to_physical(&value);
        for (offset, byte) in (spec.offset..spec.end()).zip(physical) {
            self.window.store(offset, byte);
        }
        log::debug!("wrote {} <- {}", spec.name, transcode::render(&value));
        Ok(())
    }

    pub fn read_by_name(&self, name: &str) -> Result<String, ConfportError> {
        self.read(self.index_of(name)?)
    }

    pub fn write_by_name(&mut self, name: &str, text: &str) -> Result<(), ConfportError> {
        let index = self.index_of(name)?;
        self.write(index, text)
    }

    /// Every register in table order, with its current value.
    pub fn dump(&self) -> Result<Vec<(&'static str, String)>, ConfportError> {
        self.table
            .iter()
            .enumerate()
            .map(|(index, spec)| self.read(index).map(|value| (spec.name, value)))
            .collect()
    }
}
