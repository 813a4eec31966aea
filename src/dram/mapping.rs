//! Address Mapping.
//!
//! Decomposes a physical address into DRAM coordinates with fixed
//! shift-and-mask bit fields. The fields are laid out contiguously above the
//! cache-line offset in the order channel, column, bank, rank, row, so
//! consecutive lines interleave across channels first and fill a row before
//! moving to the next bank.

use super::Coordinates;
use crate::config::{defaults, log2_ceil, Topology};

/// One bit field of a physical address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddressField {
    /// Position of the lowest bit.
    pub offset: u32,
    /// Number of bits; zero yields a constant 0.
    pub width: u32,
}

impl AddressField {
    /// Creates a field.
    pub fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// Mask of the field's value bits, right-aligned.
    #[inline(always)]
    pub fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Extracts the field from an address.
    #[inline(always)]
    pub fn value(&self, address: u64) -> usize {
        ((address >> self.offset) & self.mask()) as usize
    }

    /// Places a field value at its position in an address.
    #[inline(always)]
    pub fn place(&self, value: usize) -> u64 {
        ((value as u64) & self.mask()) << self.offset
    }

    /// First bit above the field.
    pub fn end(&self) -> u32 {
        self.offset + self.width
    }
}

/// Five-field address decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddressMapping {
    pub channel: AddressField,
    pub rank: AddressField,
    pub bank: AddressField,
    pub row: AddressField,
    pub column: AddressField,
}

impl AddressMapping {
    /// Builds the mapping for a topology.
    ///
    /// Each field is as wide as the log2 of its count, packed upward from
    /// the line offset.
    pub fn new(topology: &Topology) -> Self {
        let mut offset = defaults::LINE_OFFSET_BITS;
        let mut next = |count: usize| {
            let field = AddressField::new(offset, log2_ceil(count as u64));
            offset = field.end();
            field
        };

        let channel = next(topology.channels);
        let column = next(topology.columns);
        let bank = next(topology.banks);
        let rank = next(topology.ranks);
        let row = next(topology.rows);

        Self {
            channel,
            rank,
            bank,
            row,
            column,
        }
    }

    /// Decodes an address into coordinates.
    pub fn decode(&self, address: u64) -> Coordinates {
        Coordinates {
            channel: self.channel.value(address),
            rank: self.rank.value(address),
            bank: self.bank.value(address),
            row: self.row.value(address),
            column: self.column.value(address),
        }
    }

    /// Reassembles the line address of a set of coordinates.
    pub fn encode(&self, coordinates: &Coordinates) -> u64 {
        self.channel.place(coordinates.channel)
            | self.rank.place(coordinates.rank)
            | self.bank.place(coordinates.bank)
            | self.row.place(coordinates.row)
            | self.column.place(coordinates.column)
    }

    /// Mask of all address bits covered by the five fields.
    pub fn address_mask(&self) -> u64 {
        [self.channel, self.rank, self.bank, self.row, self.column]
            .iter()
            .fold(0, |mask, field| mask | (field.mask() << field.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_contiguous() {
        let topology = Topology {
            channels: 2,
            ranks: 2,
            banks: 8,
            rows: 1 << 15,
            columns: 128,
        };
        let mapping = AddressMapping::new(&topology);
        assert_eq!(mapping.channel, AddressField::new(6, 1));
        assert_eq!(mapping.column, AddressField::new(7, 7));
        assert_eq!(mapping.bank, AddressField::new(14, 3));
        assert_eq!(mapping.rank, AddressField::new(17, 1));
        assert_eq!(mapping.row, AddressField::new(18, 15));
    }

    #[test]
    fn zero_width_field_decodes_to_zero() {
        let field = AddressField::new(6, 0);
        assert_eq!(field.value(u64::MAX), 0);
        assert_eq!(field.place(5), 0);
    }
}
