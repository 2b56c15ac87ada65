use super::flipflops::FlipFlopState;
use crate::sim::Value;
use std::io::{self, BufRead, Write};

/// Header line of the hex format used to persist memory contents.
pub const HEX_HEADER: &str = "v2.0 raw";

/// Fixed size block of memory words, the contents of ROMs, RAMs and lookup tables.
///
/// Reads outside of the stored words return 0, writes beyond `size` are ignored.
///
/// # Example
/// ```
/// # use digisim::elements::DataField;
/// let mut data = DataField::new(4);
/// data.set(1, 0xab);
/// data.set(9, 1);
///
/// let mut hex = Vec::new();
/// data.write_hex(&mut hex).unwrap();
/// assert_eq!(String::from_utf8(hex).unwrap(), "v2.0 raw\n0\nab\n0\n0\n");
///
/// let read = DataField::read_hex("v2.0 raw\n0\nab\n".as_bytes()).unwrap();
/// assert_eq!(read.get(1), 0xab);
/// assert_eq!(read.size(), 2);
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct DataField {
    data: Vec<u64>,
    size: usize,
}

impl DataField {
    /// Returns a [DataField] of `size` words, all 0.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            size,
        }
    }

    /// Returns a [DataField] holding exactly `words`.
    pub fn from_words(words: Vec<u64>) -> Self {
        let size = words.len();
        Self { data: words, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the word at `addr`, 0 if it is out of range.
    pub fn get(&self, addr: usize) -> u64 {
        self.data.get(addr).copied().unwrap_or(0)
    }

    /// Stores `value` at `addr`, ignored if `addr` >= [DataField::size].
    pub fn set(&mut self, addr: usize, value: u64) {
        if addr < self.size {
            self.data[addr] = value;
        }
    }

    /// Sets every word to 0.
    pub fn clear(&mut self) {
        for word in &mut self.data {
            *word = 0;
        }
    }

    /// Returns the stored words without the trailing zeros.
    pub fn minimized(&self) -> &[u64] {
        let end = self
            .data
            .iter()
            .rposition(|w| *w != 0)
            .map_or(0, |last| last + 1);
        &self.data[..end]
    }

    /// Parses the `v2.0 raw` format: the header line followed by one hex word per line.
    pub fn read_hex<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut lines = reader.lines();
        let header = lines.next().transpose()?;
        if header.as_deref().map(str::trim_end) != Some(HEX_HEADER) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid file format, expected a 'v2.0 raw' header",
            ));
        }
        let mut words = Vec::new();
        for line in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let word = u64::from_str_radix(line, 16)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            words.push(word);
        }
        Ok(Self::from_words(words))
    }

    /// Writes the contents in the `v2.0 raw` format.
    pub fn write_hex<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{}", HEX_HEADER)?;
        for addr in 0..self.size {
            writeln!(w, "{:x}", self.get(addr))?;
        }
        Ok(())
    }
}

/// State of a counter: the count, the clock edge detector and the overflow flag.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub(crate) struct CounterState {
    pub count: u64,
    pub clock: FlipFlopState,
    pub overflow: bool,
}

/// Counter, inputs `[C, clr]`: counts rising edges, clear wins over the clock.
///
/// The overflow output is only set during the evaluation that wrapped the count to 0.
pub(crate) fn read_counter(inputs: &[Value], state: &mut CounterState, mask: u64) {
    state.overflow = false;
    if state.clock.clock(inputs[0]) {
        state.count = state.count.wrapping_add(1) & mask;
        state.overflow = state.count == 0;
    }
    if inputs[1].bool() {
        state.count = 0;
        state.overflow = false;
    }
}

/// Address formed by the 1 bit inputs of a lookup table, the first input is the lowest bit.
pub(crate) fn lookup_address(inputs: &[Value]) -> usize {
    inputs
        .iter()
        .enumerate()
        .fold(0, |addr, (i, v)| {
            addr | (v.bool() as usize).checked_shl(i as u32).unwrap_or(0)
        })
}

/// State of a dual port RAM.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub(crate) struct RamState {
    pub memory: DataField,
    pub clock: FlipFlopState,
    pub addr: usize,
    pub load: bool,
}

impl RamState {
    pub fn new(addr_bits: u8) -> Self {
        Self {
            memory: DataField::new(1 << addr_bits),
            ..Default::default()
        }
    }
}

/// Dual port RAM, inputs `[A, D, str, C, ld]`: stores D at A on a rising edge while
/// `str` is set, drives the addressed word while `ld` is set.
pub(crate) fn read_ram(inputs: &[Value], state: &mut RamState) {
    let store = state.clock.clock(inputs[3]) && inputs[2].bool();
    state.load = inputs[4].bool();
    if state.load || store {
        state.addr = inputs[0].value as usize;
    }
    if store {
        state.memory.set(state.addr, inputs[1].value);
    }
}

pub(crate) fn write_ram(state: &RamState) -> Value {
    if state.load {
        Value::new(state.memory.get(state.addr))
    } else {
        Value::HIGH_Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> Value {
        Value::new(n)
    }

    #[test]
    fn test_counter_wraps_and_clears() {
        let mut s = CounterState::default();
        let m = 0b11;
        let tick = |s: &mut CounterState| {
            read_counter(&[v(1), v(0)], s, m);
            let rising = (s.count, s.overflow);
            read_counter(&[v(0), v(0)], s, m);
            (rising, (s.count, s.overflow))
        };
        assert_eq!(tick(&mut s), ((1, false), (1, false)));
        assert_eq!(tick(&mut s), ((2, false), (2, false)));
        assert_eq!(tick(&mut s), ((3, false), (3, false)));
        assert_eq!(tick(&mut s), ((0, true), (0, false)));

        tick(&mut s);
        read_counter(&[v(0), v(1)], &mut s, m);
        assert_eq!(s.count, 0);
    }

    #[test]
    fn test_lookup_address() {
        assert_eq!(lookup_address(&[v(1), v(1), v(0)]), 3);
        assert_eq!(lookup_address(&[v(0), v(0), v(1)]), 4);

        let mut wide = vec![v(1); 70];
        wide[0] = v(0);
        assert_eq!(lookup_address(&wide), usize::MAX - 1);
    }

    #[test]
    fn test_ram_store_and_load() {
        let mut s = RamState::new(2);
        read_ram(&[v(2), v(7), v(1), v(1), v(0)], &mut s);
        assert_eq!(write_ram(&s), Value::HIGH_Z);
        assert_eq!(s.memory.get(2), 7);

        // No edge, no store.
        read_ram(&[v(2), v(9), v(1), v(1), v(1)], &mut s);
        assert_eq!(write_ram(&s), v(7));
    }

    #[test]
    fn test_data_field_bounds() {
        let mut d = DataField::new(2);
        d.set(5, 1);
        assert_eq!(d.get(5), 0);
        d.set(0, 3);
        assert_eq!(d.minimized(), &[3]);
        d.clear();
        assert!(d.minimized().is_empty());
    }

    #[test]
    fn test_read_hex_rejects_bad_input() {
        assert!(DataField::read_hex("0\n1\n".as_bytes()).is_err());
        assert!(DataField::read_hex("v2.0 raw\nxyz\n".as_bytes()).is_err());
        assert!(DataField::read_hex("".as_bytes()).is_err());
    }
}
