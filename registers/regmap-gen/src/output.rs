// Licensed under the Apache-2.0 license

//! Emitters projecting a finished [`RegisterMap`] into text.
//!
//! All three are pure functions of the model; none of them mutates it.
//!
//! ```text
//! RegisterMap ─┬─ generate_c_header        → .h   (volatile structs/unions)
//!              ├─ generate_offset_table    → .inc (.equ per register)
//!              └─ generate_symbol_resolver → .S   (.global/.set per symbol)
//! ```
//!
//! For a module `UART` holding `CTRL.W` at 0x1008 and nothing below it the
//! header reads:
//!
//! ```text
//! extern volatile struct {
//!     union {
//!         uint32_t DWORD;
//!         struct {
//!             uint32_t MODE : 4;
//!         };
//!     } CTRL;
//! } UART;
//! ```
//!
//! (indentation is one tab per level in the real output).

use std::fmt::Write;

use crate::config::GeneratorConfig;
use crate::layout::BitField;
use crate::model::{Module, Register, RegisterMap};

/// The three generated artifacts of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedFiles {
    /// C header with one union per register.
    pub c_header: String,
    /// Assembler include with one `.equ` per register.
    pub offset_table: String,
    /// Assembler source binding global symbols to addresses.
    pub symbol_resolver: String,
}

impl GeneratedFiles {
    pub fn render(map: &RegisterMap, config: &GeneratorConfig) -> Self {
        Self {
            c_header: generate_c_header(map, config),
            offset_table: generate_offset_table(map),
            symbol_resolver: generate_symbol_resolver(map),
        }
    }
}

//=============================================================================
// C header
//=============================================================================

/// Render the C header for every module holding at least one register.
pub fn generate_c_header(map: &RegisterMap, config: &GeneratorConfig) -> String {
    let mut output = String::new();
    for module in map.modules() {
        if module.registers.is_empty() {
            continue;
        }
        if module.is_anonymous() && config.layout_policy.volatile_top_level() {
            for register in module.sorted_registers() {
                write_union(&mut output, register, config, "extern volatile ", "");
            }
        } else {
            write_module(&mut output, module, config);
        }
    }
    output
}

fn write_module(output: &mut String, module: &Module, config: &GeneratorConfig) {
    if module.name.is_some() {
        writeln!(output, "extern volatile struct {{").unwrap();
    }

    let mut address = module.base_address().unwrap_or_default();
    for (index, register) in module.sorted_registers().into_iter().enumerate() {
        let padding = register.address.saturating_sub(address);
        if padding > 0 {
            writeln!(output, "\tuint8_t spacer{index}[{padding}];").unwrap();
        }
        write_union(output, register, config, "", "\t");
        address = register.end_address();
    }

    if let Some(name) = &module.name {
        writeln!(output, "}} {name};").unwrap();
    }
}

fn write_union(
    output: &mut String,
    register: &Register,
    config: &GeneratorConfig,
    qualifier: &str,
    indent: &str,
) {
    writeln!(output, "{indent}{qualifier}union {{").unwrap();
    writeln!(output, "{indent}\t{};", register.size.union_base()).unwrap();
    for layer in register.render_layers(config) {
        writeln!(output, "{indent}\tstruct {{").unwrap();
        for bits in &layer {
            writeln!(output, "{indent}\t\t{}", bit_field_decl(bits)).unwrap();
        }
        writeln!(output, "{indent}\t}};").unwrap();
    }
    writeln!(output, "{indent}}} {};", register.name).unwrap();
}

fn bit_field_decl(bits: &BitField) -> String {
    let ty = bits.atom.c_type();
    let qualifier = if bits.read_only { "const " } else { "" };
    match &bits.name {
        Some(name) => format!("{qualifier}{ty} {name} : {};", bits.width),
        None => format!("{ty} : {};", bits.width),
    }
}

//=============================================================================
// Assembler tables
//=============================================================================

/// One `.equ` per register binding its symbol to its absolute address.
pub fn generate_offset_table(map: &RegisterMap) -> String {
    let mut output = String::new();
    for module in map.modules() {
        for register in module.sorted_registers() {
            let symbol = module.register_symbol(register);
            writeln!(output, ".equ {symbol}, 0x{:X}", register.address).unwrap();
        }
    }
    output
}

/// Global symbols for the linker: one per anonymous register, one per named
/// module (bound to the module's 4-byte aligned base).
pub fn generate_symbol_resolver(map: &RegisterMap) -> String {
    let mut output = String::new();
    for module in map.modules() {
        match (&module.name, module.base_address()) {
            (None, _) => {
                for register in module.sorted_registers() {
                    write_global(&mut output, &register.name, register.address);
                }
            }
            (Some(name), Some(base)) => write_global(&mut output, name, base),
            (Some(_), None) => {}
        }
    }
    output
}

fn write_global(output: &mut String, symbol: &str, address: u64) {
    writeln!(output, "\t.global {symbol}").unwrap();
    writeln!(output, "\t.set {symbol}, 0x{address:X}").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutPolicy;
    use crate::parse::parse_register_map;

    fn render(source: &str, config: &GeneratorConfig) -> GeneratedFiles {
        let (map, _) = parse_register_map(source, config).unwrap();
        GeneratedFiles::render(&map, config)
    }

    #[test]
    fn test_named_module_header() {
        let files = render(
            "@1002\nUART/STAT.H\n READY\n@1008\nUART/CTRL.W\n MODE [3:0]\n EN [8]\n",
            &GeneratorConfig::new(),
        );
        let expected = "\
extern volatile struct {
\tuint8_t spacer0[2];
\tunion {
\t\tuint16_t WORD;
\t\tstruct {
\t\t\tuint16_t READY : 1;
\t\t};
\t} STAT;
\tuint8_t spacer1[4];
\tunion {
\t\tuint32_t DWORD;
\t\tstruct {
\t\t\tuint32_t MODE : 4;
\t\t\tuint32_t : 4;
\t\t\tuint32_t EN : 1;
\t\t};
\t} CTRL;
} UART;
";
        assert_eq!(files.c_header, expected);
        assert_eq!(
            files.offset_table,
            ".equ UART_STAT, 0x1002\n.equ UART_CTRL, 0x1008\n"
        );
        assert_eq!(
            files.symbol_resolver,
            "\t.global UART\n\t.set UART, 0x1000\n"
        );
    }

    #[test]
    fn test_spacers_between_registers() {
        let files = render("@2\nA\n@8\nB.H\n@8\nC\n", &GeneratorConfig::new());
        let expected = "\
\tuint8_t spacer0[2];
\tunion {
\t\tuint8_t BYTE;
\t} A;
\tuint8_t spacer1[5];
\tunion {
\t\tuint16_t WORD;
\t} B;
\tunion {
\t\tuint8_t BYTE;
\t} C;
";
        assert_eq!(files.c_header, expected);
        assert_eq!(
            files.symbol_resolver,
            "\t.global A\n\t.set A, 0x2\n\t.global B\n\t.set B, 0x8\n\t.global C\n\t.set C, 0x8\n"
        );
    }

    #[test]
    fn test_modules_in_name_order() {
        let files = render(
            "TOP\nZ/R1\n#module A\nR2.H\n#module EMPTY\n",
            &GeneratorConfig::new(),
        );
        assert_eq!(
            files.offset_table,
            ".equ TOP, 0x0\n.equ A_R2, 0x2\n.equ Z_R1, 0x1\n"
        );
        assert_eq!(
            files.symbol_resolver,
            "\t.global TOP\n\t.set TOP, 0x0\n\t.global A\n\t.set A, 0x0\n\t.global Z\n\t.set Z, 0x0\n"
        );
        assert!(!files.c_header.contains("EMPTY"));
        let top = files.c_header.find("} TOP;").unwrap();
        let a = files.c_header.find("} A;").unwrap();
        let z = files.c_header.find("} Z;").unwrap();
        assert!(top < a && a < z);
    }

    #[test]
    fn test_layers_share_one_union() {
        let files = render(
            "R.H\n LO [7:0]\n HI [15:8]\n&\n ALL [15:0]\n",
            &GeneratorConfig::new(),
        );
        let expected = "\
\tunion {
\t\tuint16_t WORD;
\t\tstruct {
\t\t\tuint16_t LO : 8;
\t\t\tuint16_t HI : 8;
\t\t};
\t\tstruct {
\t\t\tuint16_t ALL : 16;
\t\t};
\t} R;
";
        assert_eq!(files.c_header, expected);
    }

    #[test]
    fn test_array_flag_policy_header() {
        let config = GeneratorConfig::new().policy(LayoutPolicy::ArrayFlag);
        let files = render("@4\nR.W\n B0.A [7:0]\n LOCK.R [8]\n", &config);
        let expected = "\
extern volatile union {
\tuint32_t DWORD;
\tstruct {
\t\tuint8_t B0 : 8;
\t\tconst uint32_t LOCK : 1;
\t};
} R;
";
        assert_eq!(files.c_header, expected);
    }
}
