// Licensed under the Apache-2.0 license

//! Register-map text to C header and assembler tables.
//!
//! A register map is a line-oriented description of a peripheral:
//!
//! ```text
//! @10
//! STATUS.B
//!  READY [0]
//!  ERROR [1]
//! UART/CTRL.W
//!  MODE [3:0]
//! &
//!  RAW [31:0]
//! ```
//!
//! ## Usage
//!
//! ```
//! use regmap_gen::{generate, GeneratorConfig};
//!
//! let files = generate("@10\nSTATUS.B\n READY [0]\n", &GeneratorConfig::new()).unwrap();
//! assert!(files.c_header.contains("uint8_t READY : 1;"));
//! assert_eq!(files.offset_table, ".equ STATUS, 0x10\n");
//! ```
//!
//! ## Module Organization
//!
//! - [`lexer`]: line classification
//! - [`parse`]: model construction ([`RegisterMapParser`])
//! - [`model`]: modules, registers, layers and fields
//! - [`layout`]: per-register atom refinement and bit-field rendering
//! - [`output`]: the header, offset-table and symbol-resolver emitters
//! - [`config`]: layout policy ([`GeneratorConfig`])

pub mod config;
pub mod error;
pub mod layout;
pub mod lexer;
pub mod model;
pub mod output;
pub mod parse;

pub use config::{GeneratorConfig, LayoutPolicy};
pub use error::{RegmapError, Result};
pub use model::{Atom, Field, FieldFlags, FieldRange, Module, Register, RegisterFlags, RegisterMap};
pub use output::{
    generate_c_header, generate_offset_table, generate_symbol_resolver, GeneratedFiles,
};
pub use parse::{parse_register_map, Diagnostic, ParseContext, RegisterMapParser, Severity};

/// Parse `source` completely, then render all three artifacts.
pub fn generate(source: &str, config: &GeneratorConfig) -> Result<GeneratedFiles> {
    let (map, diagnostics) = parse_register_map(source, config)?;
    log::debug!(
        "parsed {} registers in {} modules ({} diagnostics)",
        map.register_count(),
        map.modules().count(),
        diagnostics.len()
    );
    Ok(GeneratedFiles::render(&map, config))
}
