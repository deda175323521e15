//! Delta instruction encoding.

/// LSB-first 7-bit varint as used for delta sizes.
pub fn varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Builds a delta stream instruction by instruction.
pub struct DeltaBuilder {
    out: Vec<u8>,
}

impl DeltaBuilder {
    pub fn new(base_len: u64, target_len: u64) -> Self {
        let mut out = varint(base_len);
        out.extend(varint(target_len));
        Self { out }
    }

    /// Copy `size` bytes from `offset` in the base. `size` of 0x10000 is
    /// encoded as zero, the way git does.
    pub fn copy(mut self, offset: u32, size: u32) -> Self {
        assert!(size > 0 && size <= 0xff_ffff || size == 0x10000);
        let mut cmd = 0x80u8;
        let mut args = Vec::new();
        for i in 0..4 {
            let b = (offset >> (8 * i)) as u8;
            if b != 0 {
                cmd |= 1 << i;
                args.push(b);
            }
        }
        let size = if size == 0x10000 { 0 } else { size };
        for i in 0..3 {
            let b = (size >> (8 * i)) as u8;
            if b != 0 {
                cmd |= 0x10 << i;
                args.push(b);
            }
        }
        self.out.push(cmd);
        self.out.extend(args);
        self
    }

    /// Insert literal bytes, split into 127-byte instructions.
    pub fn insert(mut self, data: &[u8]) -> Self {
        for chunk in data.chunks(0x7f) {
            self.out.push(chunk.len() as u8);
            self.out.extend_from_slice(chunk);
        }
        self
    }

    /// Append raw bytes, for building malformed deltas.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

/// A delta that copies the common prefix and suffix of `base` and `target`
/// and inserts whatever differs in between.
pub fn diff(base: &[u8], target: &[u8]) -> Vec<u8> {
    let prefix = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = base.len().min(target.len()) - prefix;
    let suffix = base
        .iter()
        .rev()
        .zip(target.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let mut builder = DeltaBuilder::new(base.len() as u64, target.len() as u64);
    builder = copy_span(builder, 0, prefix);
    builder = builder.insert(&target[prefix..target.len() - suffix]);
    copy_span(builder, base.len() - suffix, suffix).build()
}

fn copy_span(mut builder: DeltaBuilder, mut offset: usize, mut len: usize) -> DeltaBuilder {
    while len > 0 {
        let n = len.min(0x10000);
        builder = builder.copy(offset as u32, n as u32);
        offset += n;
        len -= n;
    }
    builder
}
