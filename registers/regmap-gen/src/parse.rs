// Licensed under the Apache-2.0 license

//! Model construction from classified lines.
//!
//! [`RegisterMapParser`] makes a single pass over the source, threading an
//! explicit [`ParseContext`] (address cursor, radix, current module and
//! register) from one line to the next. The first fatal condition aborts the
//! pass; non-fatal conditions are collected as [`Diagnostic`]s and logged.

use log::{info, warn};

use crate::config::{GeneratorConfig, LayoutPolicy};
use crate::error::{RegmapError, Result};
use crate::lexer::{classify, Line};
use crate::model::{Field, FieldFlags, FieldRange, Register, RegisterFlags, RegisterMap};

/// Radix for address directives until a `#radix` directive changes it.
pub const DEFAULT_RADIX: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// A non-fatal message about the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Parser state carried from line to line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseContext {
    /// Address given to the next register.
    pub address: u64,
    /// Radix of address directive digits.
    pub radix: u32,
    /// Module receiving new registers; `None` is the anonymous module.
    pub module: Option<String>,
    /// Index of the register receiving fields, within the current module.
    pub register: Option<usize>,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            address: 0,
            radix: DEFAULT_RADIX,
            module: None,
            register: None,
        }
    }
}

pub struct RegisterMapParser {
    policy: LayoutPolicy,
    context: ParseContext,
    map: RegisterMap,
    diagnostics: Vec<Diagnostic>,
}

impl RegisterMapParser {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            policy: config.layout_policy,
            context: ParseContext::default(),
            map: RegisterMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    /// Feed every line of `source`, numbering lines from 1.
    pub fn parse_source(&mut self, source: &str) -> Result<()> {
        for (index, text) in source.lines().enumerate() {
            self.parse_line(index + 1, text)?;
        }
        Ok(())
    }

    /// Process one source line.
    pub fn parse_line(&mut self, line: usize, text: &str) -> Result<()> {
        match classify(text) {
            Line::Address(digits) => self.set_address(line, digits),
            Line::Option { name, value } => self.apply_option(line, name, value),
            Line::Register {
                module,
                name,
                flags,
            } => self.declare_register(line, module, name, flags),
            Line::Field { name, flags, range } => self.declare_field(line, name, flags, range),
            Line::Overlap => self.start_layer(line),
            Line::Blank => Ok(()),
            Line::Unrecognized(text) => Err(RegmapError::UnrecognizedLine {
                line,
                text: text.to_string(),
            }),
        }
    }

    /// The finished model and the diagnostics collected while building it.
    pub fn finish(self) -> (RegisterMap, Vec<Diagnostic>) {
        (self.map, self.diagnostics)
    }

    fn report(&mut self, line: usize, severity: Severity, message: String) {
        let diagnostic = Diagnostic {
            line,
            severity,
            message,
        };
        match severity {
            Severity::Info => info!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
        }
        self.diagnostics.push(diagnostic);
    }

    fn set_address(&mut self, line: usize, digits: &str) -> Result<()> {
        let radix = self.context.radix;
        let address =
            u64::from_str_radix(digits, radix).map_err(|_| RegmapError::InvalidAddress {
                line,
                digits: digits.to_string(),
                radix,
            })?;
        if address < self.context.address {
            let message = format!(
                "Address reverting from {:X} to {:X}.",
                self.context.address, address
            );
            self.report(line, Severity::Warning, message);
        }
        self.context.address = address;
        Ok(())
    }

    fn apply_option(&mut self, line: usize, name: &str, value: &str) -> Result<()> {
        match name {
            "radix" => {
                let radix = value
                    .parse::<u32>()
                    .ok()
                    .filter(|radix| (2..=36).contains(radix))
                    .ok_or_else(|| RegmapError::InvalidRadix {
                        line,
                        value: value.to_string(),
                    })?;
                self.context.radix = radix;
                self.report(line, Severity::Info, format!("Radix changed to {radix}."));
            }
            "module" => {
                self.enter_module(Some(value));
                self.report(line, Severity::Info, format!("Entered module {value}."));
            }
            _ => {
                if self.policy.reports_unknown_options() {
                    self.report(
                        line,
                        Severity::Info,
                        format!("Ignoring unknown option #{name}."),
                    );
                }
            }
        }
        Ok(())
    }

    fn enter_module(&mut self, name: Option<&str>) {
        self.map.module_mut_or_insert(name);
        if self.context.module.as_deref() != name {
            self.context.module = name.map(str::to_string);
            self.context.register = None;
        }
    }

    fn declare_register(
        &mut self,
        line: usize,
        module: Option<&str>,
        name: &str,
        flags: Option<&str>,
    ) -> Result<()> {
        if module.is_some() {
            self.enter_module(module);
        }

        let flags = flags.map(RegisterFlags::parse).unwrap_or_default();
        let register = Register::new(name, flags, self.context.address);
        let next_address = register
            .address
            .checked_add(register.size_bytes())
            .ok_or_else(|| RegmapError::AddressOverflow {
                line,
                register: name.to_string(),
            })?;

        let current = self.context.module.clone();
        let registers = &mut self.map.module_mut_or_insert(current.as_deref()).registers;
        registers.push(register);
        self.context.register = Some(registers.len() - 1);
        self.context.address = next_address;
        Ok(())
    }

    fn current_register(&mut self) -> Option<&mut Register> {
        let index = self.context.register?;
        let module = self.context.module.as_deref();
        self.map.module_mut(module)?.registers.get_mut(index)
    }

    fn declare_field(
        &mut self,
        line: usize,
        name: &str,
        flags: Option<&str>,
        range: Option<(&str, Option<&str>)>,
    ) -> Result<()> {
        let flags = flags.map(FieldFlags::parse).unwrap_or_default();
        let range = match range {
            None => FieldRange::Implicit,
            Some((high, low)) => {
                let end = parse_bit(line, high)?;
                let start = match low {
                    Some(low) => parse_bit(line, low)?,
                    None => end,
                };
                FieldRange::Span { start, end }
            }
        };

        let policy = self.policy;
        let register = self
            .current_register()
            .ok_or_else(|| RegmapError::FieldWithoutRegister {
                line,
                field: name.to_string(),
            })?;
        register.add_field(Field::new(name, flags, range), policy, line)
    }

    fn start_layer(&mut self, line: usize) -> Result<()> {
        self.current_register()
            .ok_or(RegmapError::OverlapWithoutRegister { line })?
            .add_layer();
        Ok(())
    }
}

fn parse_bit(line: usize, digits: &str) -> Result<u32> {
    digits
        .parse()
        .map_err(|_| RegmapError::InvalidBitIndex {
            line,
            value: digits.to_string(),
        })
}

/// Build the model for a whole source text.
pub fn parse_register_map(
    source: &str,
    config: &GeneratorConfig,
) -> Result<(RegisterMap, Vec<Diagnostic>)> {
    let mut parser = RegisterMapParser::new(config);
    parser.parse_source(source)?;
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Atom;

    fn parse(source: &str) -> Result<(RegisterMap, Vec<Diagnostic>)> {
        parse_register_map(source, &GeneratorConfig::new())
    }

    #[test]
    fn test_addresses_follow_cursor() {
        let (map, diagnostics) = parse("@10\nA.B\nB.H\nC.W\n@100\nD\n").unwrap();
        let module = map.module(None).unwrap();
        let addresses: Vec<_> = module
            .registers
            .iter()
            .map(|r| (r.name.as_str(), r.address))
            .collect();
        assert_eq!(
            addresses,
            vec![("A", 0x10), ("B", 0x11), ("C", 0x13), ("D", 0x100)]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_address_regression_warns() {
        let (map, diagnostics) = parse("@20\nA.W\n@8\nB\n").unwrap();
        assert_eq!(map.module(None).unwrap().registers[1].address, 8);
        assert_eq!(
            diagnostics,
            vec![Diagnostic {
                line: 3,
                severity: Severity::Warning,
                message: "Address reverting from 24 to 8.".to_string(),
            }]
        );
    }

    #[test]
    fn test_radix_directive() {
        let (map, diagnostics) = parse("#radix 10\n@16\nA\n").unwrap();
        assert_eq!(map.module(None).unwrap().registers[0].address, 16);
        assert_eq!(diagnostics[0].severity, Severity::Info);
        assert_eq!(diagnostics[0].message, "Radix changed to 10.");

        assert_eq!(
            parse("#radix 10\n@1F\n").unwrap_err(),
            RegmapError::InvalidAddress {
                line: 2,
                digits: "1F".to_string(),
                radix: 10,
            }
        );
        assert!(matches!(
            parse("#radix 0\n"),
            Err(RegmapError::InvalidRadix { line: 1, .. })
        ));
        assert!(matches!(
            parse("#radix hex\n"),
            Err(RegmapError::InvalidRadix { .. })
        ));
    }

    #[test]
    fn test_unknown_options_follow_policy() {
        let (_, diagnostics) = parse("#endian little\n").unwrap();
        assert!(diagnostics.is_empty());

        let config = GeneratorConfig::new().policy(LayoutPolicy::ArrayFlag);
        let (_, diagnostics) = parse_register_map("#endian little\n", &config).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Ignoring unknown option #endian.");
    }

    #[test]
    fn test_modules() {
        let source = "\
TOP
UART/CTRL.W
 EN [0]
STAT
#module ADC
DATA.H
UART/BAUD.H
";
        let (map, diagnostics) = parse(source).unwrap();
        let names: Vec<_> = map.modules().map(|m| m.name.clone()).collect();
        assert_eq!(
            names,
            vec![None, Some("ADC".to_string()), Some("UART".to_string())]
        );

        let uart = map.module(Some("UART")).unwrap();
        let regs: Vec<_> = uart.registers.iter().map(|r| r.name.as_str()).collect();
        // An unqualified register stays in the module entered last.
        assert_eq!(regs, vec!["CTRL", "STAT", "BAUD"]);
        assert_eq!(uart.registers[0].layers[0].fields.len(), 1);

        let adc = map.module(Some("ADC")).unwrap();
        assert_eq!(adc.registers[0].address, 6);
        assert_eq!(map.register_count(), 5);
        assert_eq!(diagnostics[0].message, "Entered module ADC.");
    }

    #[test]
    fn test_field_ranges() {
        let (map, _) = parse("R.W\n A [3]\n B.AR [15:8]\n C\n").unwrap();
        let fields = &map.module(None).unwrap().registers[0].layers[0].fields;
        assert_eq!(fields[0].range, FieldRange::Span { start: 3, end: 3 });
        assert_eq!(fields[1].range, FieldRange::Span { start: 8, end: 15 });
        assert!(fields[1].flags.array && fields[1].flags.read_only);
        assert_eq!(fields[2].range, FieldRange::Implicit);
    }

    #[test]
    fn test_overlap_starts_layer() {
        let (map, _) = parse("R.H\n A [7:0]\n&\n B [15:0]\n").unwrap();
        let reg = &map.module(None).unwrap().registers[0];
        assert_eq!(reg.layers.len(), 2);
        assert_eq!(reg.layers[1].fields[0].name, "B");
        assert_eq!(reg.size, Atom::Half);
    }

    #[test]
    fn test_fatal_conditions() {
        assert_eq!(
            parse(" EN [0]\n").unwrap_err(),
            RegmapError::FieldWithoutRegister {
                line: 1,
                field: "EN".to_string(),
            }
        );
        assert_eq!(
            parse("\n&\n").unwrap_err(),
            RegmapError::OverlapWithoutRegister { line: 2 }
        );
        assert_eq!(
            parse("A\n B [0]\n!!\n").unwrap_err(),
            RegmapError::UnrecognizedLine {
                line: 3,
                text: "!!".to_string(),
            }
        );
        // Entering another module leaves no active register.
        assert!(matches!(
            parse("A\n#module M\n B [0]\n"),
            Err(RegmapError::FieldWithoutRegister { line: 3, .. })
        ));
        assert!(matches!(
            parse("A\n B [99999999999]\n"),
            Err(RegmapError::InvalidBitIndex { line: 2, .. })
        ));
    }

    #[test]
    fn test_context_threads_between_lines() {
        let mut parser = RegisterMapParser::new(&GeneratorConfig::new());
        parser.parse_line(1, "@40").unwrap();
        parser.parse_line(2, "UART/CTRL.W").unwrap();
        assert_eq!(
            parser.context(),
            &ParseContext {
                address: 0x44,
                radix: DEFAULT_RADIX,
                module: Some("UART".to_string()),
                register: Some(0),
            }
        );
        parser.parse_line(3, "#module ADC").unwrap();
        assert_eq!(parser.context().register, None);
        assert_eq!(parser.context().module.as_deref(), Some("ADC"));
    }

    #[test]
    fn test_address_overflow() {
        assert!(matches!(
            parse("@FFFFFFFFFFFFFFFF\nA\n"),
            Err(RegmapError::AddressOverflow { line: 2, .. })
        ));
    }
}
