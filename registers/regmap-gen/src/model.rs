// Licensed under the Apache-2.0 license

//! In-memory register map: modules own registers, registers own layers of
//! fields.
//!
//! ```text
//! RegisterMap
//! └── Module (None = anonymous, emitted at top level)
//!     └── Register (address, size, atom, atom_list)
//!         └── Layer[] (alternate views of the same bits)
//!             └── Field (name, flags, range)
//! ```

use std::collections::BTreeMap;

//=============================================================================
// Atom
//=============================================================================

/// Memory access width for one byte of a register. Ordered by width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    Byte = 1,
    Half = 2,
    Word = 4,
}

impl Atom {
    /// The atom spanning `bytes` bytes, if there is one.
    pub fn from_bytes(bytes: u32) -> Option<Atom> {
        match bytes {
            1 => Some(Atom::Byte),
            2 => Some(Atom::Half),
            4 => Some(Atom::Word),
            _ => None,
        }
    }

    pub fn bytes(self) -> u32 {
        self as u32
    }

    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// C integer type used for bit-fields of this width.
    pub fn c_type(self) -> &'static str {
        match self {
            Atom::Byte => "uint8_t",
            Atom::Half => "uint16_t",
            Atom::Word => "uint32_t",
        }
    }

    /// Whole-register member placed first in each register union.
    pub fn union_base(self) -> &'static str {
        match self {
            Atom::Byte => "uint8_t BYTE",
            Atom::Half => "uint16_t WORD",
            Atom::Word => "uint32_t DWORD",
        }
    }
}

//=============================================================================
// Fields
//=============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldFlags {
    /// `A`: the field describes a whole access unit.
    pub array: bool,
    /// `R`
    pub read_only: bool,
}

impl FieldFlags {
    /// Parse `A`/`R` flag letters. The lexer guarantees no other letters.
    pub fn parse(letters: &str) -> Self {
        Self {
            array: letters.contains('A'),
            read_only: letters.contains('R'),
        }
    }
}

/// Bit position of a field within its register, bit 0 being the LSB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRange {
    /// No explicit position: a single bit placed right after the previous
    /// field of the layer.
    Implicit,
    /// Inclusive bit span, `start <= end`.
    Span { start: u32, end: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub flags: FieldFlags,
    pub range: FieldRange,
}

impl Field {
    pub fn new(name: &str, flags: FieldFlags, range: FieldRange) -> Self {
        Self {
            name: name.to_string(),
            flags,
            range,
        }
    }

    /// Single bit at `bit`.
    pub fn bit(name: &str, bit: u32) -> Self {
        Self::new(
            name,
            FieldFlags::default(),
            FieldRange::Span {
                start: bit,
                end: bit,
            },
        )
    }

    /// Inclusive span `start..=end`.
    pub fn span(name: &str, start: u32, end: u32) -> Self {
        Self::new(name, FieldFlags::default(), FieldRange::Span { start, end })
    }

    pub fn implicit(name: &str) -> Self {
        Self::new(name, FieldFlags::default(), FieldRange::Implicit)
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Fields sharing one bit space. A register has one layer per overlap marker
/// plus the initial one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layer {
    pub fields: Vec<Field>,
    /// Bit following the last field, where the next implicit field lands.
    pub(crate) next_bit: u32,
}

impl Layer {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

//=============================================================================
// Registers
//=============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterFlags {
    pub byte: bool,
    pub half: bool,
    pub word: bool,
    pub read_only: bool,
}

impl RegisterFlags {
    /// Parse `B`/`H`/`W`/`R` flag letters.
    pub fn parse(letters: &str) -> Self {
        Self {
            byte: letters.contains('B'),
            half: letters.contains('H'),
            word: letters.contains('W'),
            read_only: letters.contains('R'),
        }
    }

    /// Register size: the widest width flag present, one byte by default.
    pub fn size(&self) -> Atom {
        if self.word {
            Atom::Word
        } else if self.half {
            Atom::Half
        } else {
            Atom::Byte
        }
    }

    /// Default field access width: the narrowest width flag present, the
    /// register size by default. `.WB` is a 32-bit register accessed bytewise.
    pub fn atom(&self) -> Atom {
        if self.byte {
            Atom::Byte
        } else if self.half {
            Atom::Half
        } else if self.word {
            Atom::Word
        } else {
            self.size()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    pub name: String,
    pub flags: RegisterFlags,
    /// Absolute byte address.
    pub address: u64,
    pub size: Atom,
    pub atom: Atom,
    /// Access width per byte offset, `size` entries.
    pub atom_list: Vec<Atom>,
    pub layers: Vec<Layer>,
}

impl Register {
    pub fn new(name: &str, flags: RegisterFlags, address: u64) -> Self {
        let size = flags.size();
        let atom = flags.atom();
        Self {
            name: name.to_string(),
            flags,
            address,
            size,
            atom,
            atom_list: vec![atom; size.bytes() as usize],
            layers: vec![Layer::default()],
        }
    }

    pub fn size_bytes(&self) -> u64 {
        u64::from(self.size.bytes())
    }

    pub fn bits(&self) -> u32 {
        self.size.bits()
    }

    /// Address one past the register's last byte.
    pub fn end_address(&self) -> u64 {
        self.address + self.size_bytes()
    }
}

//=============================================================================
// Modules
//=============================================================================

/// A named group of registers, or the anonymous top-level group (`name == None`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub name: Option<String>,
    /// In declaration order.
    pub registers: Vec<Register>,
}

impl Module {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            registers: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    /// Registers by ascending address; equal addresses keep declaration order.
    pub fn sorted_registers(&self) -> Vec<&Register> {
        let mut registers: Vec<&Register> = self.registers.iter().collect();
        registers.sort_by_key(|r| r.address);
        registers
    }

    /// Lowest register address rounded down to a 4-byte boundary.
    pub fn base_address(&self) -> Option<u64> {
        self.registers
            .iter()
            .map(|r| r.address)
            .min()
            .map(|address| address / 4 * 4)
    }

    /// Symbol for one of this module's registers, `MODULE_REG` or `REG`.
    pub fn register_symbol(&self, register: &Register) -> String {
        match &self.name {
            Some(module) => format!("{module}_{}", register.name),
            None => register.name.clone(),
        }
    }
}

/// Every module seen during a run, keyed by name. Iteration yields the
/// anonymous module first and named modules in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterMap {
    modules: BTreeMap<Option<String>, Module>,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterMap {
    pub fn new() -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(None, Module::new(None));
        Self { modules }
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn module(&self, name: Option<&str>) -> Option<&Module> {
        self.modules.get(&name.map(str::to_string))
    }

    /// Look up a module, creating it on first reference.
    pub fn module_mut_or_insert(&mut self, name: Option<&str>) -> &mut Module {
        self.modules
            .entry(name.map(str::to_string))
            .or_insert_with(|| Module::new(name))
    }

    pub(crate) fn module_mut(&mut self, name: Option<&str>) -> Option<&mut Module> {
        self.modules.get_mut(&name.map(str::to_string))
    }

    pub fn register_count(&self) -> usize {
        self.modules.values().map(|m| m.registers.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_takes_widest_flag() {
        assert_eq!(RegisterFlags::parse("").size(), Atom::Byte);
        assert_eq!(RegisterFlags::parse("R").size(), Atom::Byte);
        assert_eq!(RegisterFlags::parse("H").size(), Atom::Half);
        assert_eq!(RegisterFlags::parse("BW").size(), Atom::Word);
        assert_eq!(RegisterFlags::parse("WB").size(), Atom::Word);
        assert_eq!(RegisterFlags::parse("HB").size(), Atom::Half);
    }

    #[test]
    fn test_atom_takes_narrowest_flag() {
        assert_eq!(RegisterFlags::parse("").atom(), Atom::Byte);
        assert_eq!(RegisterFlags::parse("W").atom(), Atom::Word);
        assert_eq!(RegisterFlags::parse("WB").atom(), Atom::Byte);
        assert_eq!(RegisterFlags::parse("WH").atom(), Atom::Half);
        assert_eq!(RegisterFlags::parse("HW").atom(), Atom::Half);
    }

    #[test]
    fn test_new_register() {
        let reg = Register::new("CTRL", RegisterFlags::parse("WH"), 0x20);
        assert_eq!(reg.size, Atom::Word);
        assert_eq!(reg.atom, Atom::Half);
        assert_eq!(reg.atom_list, vec![Atom::Half; 4]);
        assert_eq!(reg.layers.len(), 1);
        assert_eq!(reg.end_address(), 0x24);
        assert_eq!(reg.bits(), 32);
    }

    #[test]
    fn test_anonymous_module_sorts_first() {
        let mut map = RegisterMap::new();
        map.module_mut_or_insert(Some("UART"));
        map.module_mut_or_insert(Some("ADC"));
        let names: Vec<_> = map.modules().map(|m| m.name.clone()).collect();
        assert_eq!(
            names,
            vec![None, Some("ADC".to_string()), Some("UART".to_string())]
        );
    }

    #[test]
    fn test_sorted_registers_is_stable() {
        let mut module = Module::new(Some("M"));
        module.registers.push(Register::new("B", RegisterFlags::default(), 4));
        module.registers.push(Register::new("A", RegisterFlags::default(), 2));
        module.registers.push(Register::new("C", RegisterFlags::default(), 2));
        let names: Vec<_> = module
            .sorted_registers()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C", "B"]);
        assert_eq!(module.base_address(), Some(0));
        assert_eq!(module.register_symbol(&module.registers[0]), "M_B");
    }
}
