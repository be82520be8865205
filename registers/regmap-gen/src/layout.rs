// Licensed under the Apache-2.0 license

//! Bit-field layout for a single register.
//!
//! Two independent rules decide the C type of every bit-field:
//!
//! - Refinement: while fields are added, a field that covers a whole,
//!   self-aligned 1/2/4-byte unit may lower the access width recorded for
//!   those bytes in `atom_list`. Lowered widths are never raised again.
//! - Rendering: each field or padding run is typed at the widest atom found
//!   across the bytes it touches, so a bit-field never straddles a wider
//!   access unit than one of its bytes requires.

use log::debug;

use crate::config::{GeneratorConfig, LayoutPolicy};
use crate::error::{RegmapError, Result};
use crate::model::{Atom, Field, FieldRange, Layer, Register};

/// One rendered bit-field. `name == None` is anonymous padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitField {
    pub name: Option<String>,
    pub atom: Atom,
    pub width: u32,
    pub read_only: bool,
}

impl BitField {
    fn named(name: &str, atom: Atom, width: u32, read_only: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            atom,
            width,
            read_only,
        }
    }

    fn padding(atom: Atom, width: u32) -> Self {
        Self {
            name: None,
            atom,
            width,
            read_only: false,
        }
    }

    pub fn is_padding(&self) -> bool {
        self.name.is_none()
    }
}

impl Register {
    /// Append `field` to the active layer and refine `atom_list` with it.
    ///
    /// `line` is only used for error reporting.
    pub fn add_field(&mut self, field: Field, policy: LayoutPolicy, line: usize) -> Result<()> {
        let next_bit = self.active_layer_mut().next_bit;
        let last_bit = match field.range {
            FieldRange::Implicit => next_bit,
            FieldRange::Span { start, end } => {
                if start > end {
                    return Err(RegmapError::InvertedRange {
                        line,
                        field: field.name,
                        high: end,
                        low: start,
                    });
                }
                end
            }
        };
        if last_bit >= self.bits() {
            return Err(RegmapError::FieldOutOfRange {
                line,
                field: field.name,
                register: self.name.clone(),
                bit: last_bit,
                bits: self.bits(),
            });
        }

        self.refine_atoms(&field, policy);

        let layer = self.active_layer_mut();
        layer.next_bit = last_bit + 1;
        layer.fields.push(field);
        Ok(())
    }

    /// Start a new layer overlaying the same bits as the previous ones.
    pub fn add_layer(&mut self) {
        self.layers.push(Layer::default());
    }

    fn active_layer_mut(&mut self) -> &mut Layer {
        if self.layers.is_empty() {
            self.layers.push(Layer::default());
        }
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    fn refine_atoms(&mut self, field: &Field, policy: LayoutPolicy) {
        let FieldRange::Span { start, end } = field.range else {
            return;
        };
        if start % 8 != 0 || end % 8 != 7 {
            return;
        }
        let bytes = (end - start + 1) / 8;
        let Some(subunit) = Atom::from_bytes(bytes) else {
            return;
        };
        let first = start / 8;
        if first % bytes != 0 {
            return;
        }

        let eligible = match policy {
            LayoutPolicy::BaseAtom => subunit == self.atom,
            LayoutPolicy::ArrayFlag => subunit == self.atom || field.flags.array,
        };
        if !eligible {
            return;
        }

        let span = first as usize..(first + bytes) as usize;
        for slot in &mut self.atom_list[span] {
            if subunit < *slot {
                debug!(
                    "{}: narrowing byte atom from {} to {} for field {}",
                    self.name,
                    slot.bytes(),
                    subunit.bytes(),
                    field.name
                );
                *slot = subunit;
            }
        }
    }

    /// Render every non-empty layer, in declaration order.
    pub fn render_layers(&self, config: &GeneratorConfig) -> Vec<Vec<BitField>> {
        self.layers
            .iter()
            .filter(|layer| !layer.is_empty())
            .map(|layer| self.render_layer(layer, config))
            .collect()
    }

    fn render_layer(&self, layer: &Layer, config: &GeneratorConfig) -> Vec<BitField> {
        let const_fields = config.layout_policy.const_read_only_fields();
        let mut rendered = Vec::with_capacity(layer.fields.len() + 1);
        let mut position = 0;

        for field in &layer.fields {
            let read_only = const_fields && field.flags.read_only;
            match field.range {
                FieldRange::Implicit => {
                    rendered.push(BitField::named(
                        &field.name,
                        self.atom_at(position),
                        1,
                        read_only,
                    ));
                    position += 1;
                }
                FieldRange::Span { start, end } => {
                    if position < start {
                        rendered.push(BitField::padding(
                            self.widest_atom(position, start - 1),
                            start - position,
                        ));
                    }
                    rendered.push(BitField::named(
                        &field.name,
                        self.widest_atom(start, end),
                        end - start + 1,
                        read_only,
                    ));
                    position = end + 1;
                }
            }
        }

        if config.trailing_padding && position < self.bits() {
            rendered.push(BitField::padding(
                self.widest_atom(position, self.bits() - 1),
                self.bits() - position,
            ));
        }
        rendered
    }

    fn atom_at(&self, bit: u32) -> Atom {
        self.atom_list
            .get((bit / 8) as usize)
            .copied()
            .unwrap_or(self.atom)
    }

    /// Widest atom over the bytes holding bits `first..=last`.
    fn widest_atom(&self, first: u32, last: u32) -> Atom {
        let bytes = (first / 8) as usize..=(last / 8) as usize;
        self.atom_list
            .get(bytes)
            .and_then(|atoms| atoms.iter().copied().max())
            .unwrap_or(self.atom)
    }
}
