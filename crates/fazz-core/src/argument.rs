//! The typed argument algebra (spec §3, §4.1).
//!
//! An [`Argument`] carries a value, a `mutable` gate, and an optional name.
//! The mutation rule is fixed per kind; `mutable = false` is the only knob a
//! seed author has to pin a literal (e.g. a fixed SOP class UID).

use std::fs::File;
use std::io;
use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A finite enumeration's member set, carried alongside the current value so
/// mutation can resample uniformly from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub members: Vec<String>,
    pub current: String,
}

impl EnumValue {
    pub fn new(members: impl IntoIterator<Item = impl Into<String>>, current: impl Into<String>) -> Self {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            current: current.into(),
        }
    }
}

/// How a [`RecordValue`] reacts to `mutate`. Protocol-defined composites may
/// opt out of structural mutation entirely (spec §9: the DICOM dataset
/// record is deliberately a no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordMutation {
    /// `mutate` never touches the value.
    NoOp,
    /// `mutate` resamples scalar (string/number/bool) leaves of the JSON
    /// value in place; nested objects/arrays keep their shape.
    ResampleScalarFields,
}

/// A protocol-defined composite value (e.g. a DICOM dataset). Kept as JSON so
/// the type stays serializable without a generic parameter leaking through
/// [`Argument`]; protocol crates interpret the `schema` tag when unpacking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordValue {
    pub schema: String,
    pub value: serde_json::Value,
    pub mutation: RecordMutation,
}

/// An opaque reference to a function the client exposes as a callback
/// argument (spec §3: `Callable`). `mutate`/`unpack` are both no-ops; the
/// client resolves the tag to its own callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableTag(pub String);

/// The value produced by [`Argument::unpack`] and handed to the client.
#[derive(Debug)]
pub enum UnpackedValue {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    String(String),
    /// Opened fresh on every unpack; the caller owns and closes it.
    File(File),
    Callable(CallableTag),
    Enum(String),
    Record(RecordValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgumentKind {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    String(String),
    FilePath(PathBuf),
    Callable(CallableTag),
    Enum(EnumValue),
    Record(RecordValue),
}

/// `A = (kind, value, mutable, name?)` from spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub kind: ArgumentKind,
    pub mutable: bool,
    pub name: Option<String>,
}

impl Argument {
    fn new(kind: ArgumentKind) -> Self {
        Self {
            kind,
            mutable: true,
            name: None,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::new(ArgumentKind::Integer(value))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ArgumentKind::Real(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ArgumentKind::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ArgumentKind::String(value.into()))
    }

    pub fn file_path(path: impl Into<PathBuf>) -> Self {
        Self::new(ArgumentKind::FilePath(path.into()))
    }

    pub fn callable(tag: impl Into<String>) -> Self {
        Self::new(ArgumentKind::Callable(CallableTag(tag.into())))
    }

    pub fn enumeration(members: impl IntoIterator<Item = impl Into<String>>, current: impl Into<String>) -> Self {
        Self::new(ArgumentKind::Enum(EnumValue::new(members, current)))
    }

    pub fn record(schema: impl Into<String>, value: serde_json::Value, mutation: RecordMutation) -> Self {
        Self::new(ArgumentKind::Record(RecordValue {
            schema: schema.into(),
            value,
            mutation,
        }))
    }

    /// Pins the argument: `mutate` becomes a no-op regardless of kind.
    pub fn pinned(mut self) -> Self {
        self.mutable = false;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mutates the value in place. A no-op if `mutable` is false or the kind
    /// defines no mutation (`FilePath`, `Callable`, pinned `Record`).
    pub fn mutate(&mut self, rng: &mut impl Rng) {
        if !self.mutable {
            return;
        }
        match &mut self.kind {
            ArgumentKind::Integer(value) => *value = rng.gen_range(i64::MIN..=i64::MAX),
            ArgumentKind::Real(value) => {
                // `f64::MIN..=f64::MAX` has a non-finite span and breaks
                // `rand`'s uniform sampler; `MIN_POSITIVE..=MAX` is the
                // finite range spec §3 calls for (matches the ground truth
                // `random.uniform(sys.float_info.min, sys.float_info.max)`).
                *value = rng.gen_range(f64::MIN_POSITIVE..=f64::MAX);
            }
            ArgumentKind::Boolean(value) => *value = !*value,
            ArgumentKind::String(value) => mutate_string(value, rng),
            ArgumentKind::FilePath(_) => {}
            ArgumentKind::Callable(_) => {}
            ArgumentKind::Enum(enum_value) => {
                if let Some(member) = pick_uniform(&enum_value.members, rng) {
                    enum_value.current = member.clone();
                }
            }
            ArgumentKind::Record(record) => mutate_record(record, rng),
        }
    }

    /// Produces the value to pass to the client. Pure except for
    /// `FilePath`, which opens a fresh read handle so repeated executions
    /// never share file offsets.
    pub fn unpack(&self) -> io::Result<UnpackedValue> {
        Ok(match &self.kind {
            ArgumentKind::Integer(value) => UnpackedValue::Integer(*value),
            ArgumentKind::Real(value) => UnpackedValue::Real(*value),
            ArgumentKind::Boolean(value) => UnpackedValue::Boolean(*value),
            ArgumentKind::String(value) => UnpackedValue::String(value.clone()),
            ArgumentKind::FilePath(path) => UnpackedValue::File(File::open(path)?),
            ArgumentKind::Callable(tag) => UnpackedValue::Callable(tag.clone()),
            ArgumentKind::Enum(enum_value) => UnpackedValue::Enum(enum_value.current.clone()),
            ArgumentKind::Record(record) => UnpackedValue::Record(record.clone()),
        })
    }
}

fn pick_uniform<'a, T>(items: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}

/// Pick `p1 <= p2` uniformly in `[0, |s|)`, then apply one of the three
/// transforms with equal probability. Empty strings skip mutation.
fn mutate_string(value: &mut String, rng: &mut impl Rng) {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len == 0 {
        return;
    }
    let a = rng.gen_range(0..len);
    let b = rng.gen_range(0..len);
    let (p1, p2) = if a <= b { (a, b) } else { (b, a) };

    let prefix: String = chars[..p1].iter().collect();
    let mid: String = chars[p1..p2].iter().collect();
    let suffix: String = chars[p2..].iter().collect();

    *value = match rng.gen_range(0..3) {
        0 => mid,
        1 => format!("{prefix}{suffix}"),
        _ => format!("{prefix}{mid}{mid}{suffix}"),
    };
}

fn mutate_record(record: &mut RecordValue, rng: &mut impl Rng) {
    if record.mutation != RecordMutation::ResampleScalarFields {
        return;
    }
    resample_json_scalars(&mut record.value, rng);
}

fn resample_json_scalars(value: &mut serde_json::Value, rng: &mut impl Rng) {
    match value {
        serde_json::Value::String(s) => mutate_string(s, rng),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                *n = (i.wrapping_add(rng.gen_range(-128..=128))).into();
            }
        }
        serde_json::Value::Bool(b) => *b = !*b,
        serde_json::Value::Array(items) => {
            for item in items {
                resample_json_scalars(item, rng);
            }
        }
        serde_json::Value::Object(fields) => {
            for (_, item) in fields {
                resample_json_scalars(item, rng);
            }
        }
        serde_json::Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn empty_string_mutation_is_noop() {
        let mut arg = Argument::string("");
        arg.mutate(&mut rng());
        assert_eq!(arg.kind, ArgumentKind::String(String::new()));
    }

    #[test]
    fn pinned_argument_never_mutates() {
        let mut arg = Argument::integer(0).pinned();
        for _ in 0..50 {
            arg.mutate(&mut rng());
        }
        assert_eq!(arg.kind, ArgumentKind::Integer(0));
    }

    #[test]
    fn boolean_flips() {
        let mut arg = Argument::boolean(true);
        arg.mutate(&mut rng());
        assert_eq!(arg.kind, ArgumentKind::Boolean(false));
    }

    #[test]
    fn enum_mutation_stays_in_member_set() {
        let mut arg = Argument::enumeration(["a", "b", "c"], "a");
        for _ in 0..20 {
            arg.mutate(&mut rng());
            if let ArgumentKind::Enum(ref e) = arg.kind {
                assert!(e.members.contains(&e.current));
            } else {
                unreachable!();
            }
        }
    }

    #[test]
    fn file_path_and_callable_are_noop() {
        let mut file_arg = Argument::file_path("/tmp/does-not-matter");
        let before = file_arg.kind.clone();
        file_arg.mutate(&mut rng());
        assert_eq!(file_arg.kind, before);

        let mut callable_arg = Argument::callable("on_data");
        let before = callable_arg.kind.clone();
        callable_arg.mutate(&mut rng());
        assert_eq!(callable_arg.kind, before);
    }

    #[test]
    fn dicom_style_record_with_noop_mutation_is_preserved() {
        let mut arg = Argument::record(
            "dicom.dataset",
            serde_json::json!({ "PatientID": "1234567" }),
            RecordMutation::NoOp,
        );
        let before = arg.kind.clone();
        arg.mutate(&mut rng());
        assert_eq!(arg.kind, before);
    }
}
