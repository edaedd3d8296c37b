//! NBT tag types.

use std::fmt;

/// Any NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    /// Wire type id (1-12). TAG_End (0) has no value form.
    pub fn type_id(&self) -> u8 {
        match self {
            NbtTag::Byte(_) => 1,
            NbtTag::Short(_) => 2,
            NbtTag::Int(_) => 3,
            NbtTag::Long(_) => 4,
            NbtTag::Float(_) => 5,
            NbtTag::Double(_) => 6,
            NbtTag::ByteArray(_) => 7,
            NbtTag::String(_) => 8,
            NbtTag::List(_) => 9,
            NbtTag::Compound(_) => 10,
            NbtTag::IntArray(_) => 11,
            NbtTag::LongArray(_) => 12,
        }
    }
}

/// Named tags in insertion order. Re-inserting a name replaces the value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NbtCompound {
    entries: Vec<(String, NbtTag)>,
}

impl NbtCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: NbtTag) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = tag,
            None => self.entries.push((name, tag)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NbtTag)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    // --- Builders ---

    pub fn with(mut self, name: impl Into<String>, tag: NbtTag) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn with_byte(self, name: impl Into<String>, v: i8) -> Self {
        self.with(name, NbtTag::Byte(v))
    }

    pub fn with_int(self, name: impl Into<String>, v: i32) -> Self {
        self.with(name, NbtTag::Int(v))
    }

    pub fn with_float(self, name: impl Into<String>, v: f32) -> Self {
        self.with(name, NbtTag::Float(v))
    }

    pub fn with_string(self, name: impl Into<String>, v: impl Into<String>) -> Self {
        self.with(name, NbtTag::String(v.into()))
    }

    pub fn with_int_array(self, name: impl Into<String>, v: Vec<i32>) -> Self {
        self.with(name, NbtTag::IntArray(v))
    }

    pub fn with_compound(self, name: impl Into<String>, v: NbtCompound) -> Self {
        self.with(name, NbtTag::Compound(v))
    }

    // --- Typed getters ---

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        match self.get(name)? {
            NbtTag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            NbtTag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            NbtTag::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            NbtTag::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int_array(&self, name: &str) -> Option<&[i32]> {
        match self.get(name)? {
            NbtTag::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_compound(&self, name: &str) -> Option<&NbtCompound> {
        match self.get(name)? {
            NbtTag::Compound(v) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<(String, NbtTag)> for NbtCompound {
    fn from_iter<I: IntoIterator<Item = (String, NbtTag)>>(iter: I) -> Self {
        let mut compound = NbtCompound::new();
        for (name, tag) in iter {
            compound.insert(name, tag);
        }
        compound
    }
}

impl fmt::Display for NbtTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NbtTag::Byte(v) => write!(f, "{v}b"),
            NbtTag::Short(v) => write!(f, "{v}s"),
            NbtTag::Int(v) => write!(f, "{v}"),
            NbtTag::Long(v) => write!(f, "{v}L"),
            NbtTag::Float(v) => write!(f, "{v}f"),
            NbtTag::Double(v) => write!(f, "{v}d"),
            NbtTag::ByteArray(v) => write!(f, "[B; {} elements]", v.len()),
            NbtTag::String(v) => write!(f, "\"{v}\""),
            NbtTag::List(v) => write!(f, "[{} elements]", v.len()),
            NbtTag::Compound(v) => write!(f, "{{{} entries}}", v.len()),
            NbtTag::IntArray(v) => write!(f, "[I; {} elements]", v.len()),
            NbtTag::LongArray(v) => write!(f, "[L; {} elements]", v.len()),
        }
    }
}
