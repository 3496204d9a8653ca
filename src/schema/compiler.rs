// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema compiler.
//!
//! Compiles a parsed schema into a flat operation program executed by a
//! small interpreter against either wire codec. Complex references are
//! resolved at compile time into direct program indexes; adjacent
//! primitive fields are grouped into one block op (same natural width
//! for CDR, unconditionally for ROS1). Compilation detects reference
//! cycles. Compiled programs are cached by schema id on the read side
//! and by message type on the write side and reused for every message
//! of that kind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{CodecError, DecodedMessage, Result, SchemaError, Value};
use crate::encoding::{CdrDecoder, CdrEncoder, Ros1Decoder, Ros1Encoder, WireDecoder, WireEncoder};
use crate::schema::{FieldType, ParsedSchema, PrimitiveKind, Schema, SchemaEntry, StringKind};

/// Which wire codec a compiled routine is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Aligned CDR with encapsulation header
    Cdr,
    /// Unaligned ROS1 stream
    Ros1,
}

/// Array/sequence element shapes.
#[derive(Debug, Clone, PartialEq)]
enum Elem {
    Prim(PrimitiveKind),
    Str {
        kind: StringKind,
        bound: Option<usize>,
    },
    Nested(usize),
}

/// One step of a compiled routine.
#[derive(Debug, Clone, PartialEq)]
enum Op {
    /// Materialise constants into the decoded message (no wire bytes)
    Constants(Vec<(String, Value)>),
    /// Adjacent primitive fields handled as one block
    PrimitiveBlock(Vec<(String, PrimitiveKind)>),
    /// Length-prefixed string
    Str {
        name: String,
        kind: StringKind,
        bound: Option<usize>,
    },
    /// Fixed-length array
    FixedArray {
        name: String,
        elem: Elem,
        len: usize,
    },
    /// Length-prefixed sequence, optionally bounded
    Sequence {
        name: String,
        elem: Elem,
        bound: Option<usize>,
    },
    /// Inlined call to a sub-routine
    Nested { name: String, program: usize },
}

/// A compiled routine for one message type.
#[derive(Debug, Clone)]
struct Program {
    type_name: String,
    ops: Vec<Op>,
    /// Field defaults used when an encoded message omits the field
    defaults: HashMap<String, Value>,
}

/// A schema compiled into encode/decode routines bound to one wire codec.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    wire: WireKind,
    programs: Vec<Program>,
    root: usize,
}

/// Compile `parsed` for the given wire codec.
pub fn compile_schema(parsed: &ParsedSchema, wire: WireKind) -> Result<CompiledSchema> {
    let mut compiler = Compiler {
        parsed,
        wire,
        programs: Vec::new(),
        index: HashMap::new(),
        in_progress: Vec::new(),
    };
    let root = compiler.compile_type(&parsed.root)?;
    Ok(CompiledSchema {
        wire,
        programs: compiler.programs,
        root,
    })
}

struct Compiler<'a> {
    parsed: &'a ParsedSchema,
    wire: WireKind,
    programs: Vec<Program>,
    index: HashMap<String, usize>,
    in_progress: Vec<String>,
}

impl Compiler<'_> {
    fn compile_type(&mut self, schema: &Schema) -> Result<usize> {
        if let Some(&idx) = self.index.get(&schema.name) {
            return Ok(idx);
        }
        if self.in_progress.iter().any(|n| *n == schema.name) {
            return Err(SchemaError::Cycle {
                type_name: schema.name.clone(),
            }
            .into());
        }
        self.in_progress.push(schema.name.clone());

        let mut ops: Vec<Op> = Vec::new();
        let mut defaults = HashMap::new();
        let mut group: Vec<(String, PrimitiveKind)> = Vec::new();

        for (name, entry) in &schema.entries {
            match entry {
                SchemaEntry::Constant { value, .. } => {
                    flush_group(&mut ops, &mut group);
                    match ops.last_mut() {
                        Some(Op::Constants(consts)) => {
                            consts.push((name.clone(), value.clone()))
                        }
                        _ => ops.push(Op::Constants(vec![(name.clone(), value.clone())])),
                    }
                }
                SchemaEntry::Field { ty, default } => {
                    if let Some(value) = default {
                        defaults.insert(name.clone(), value.clone());
                    }
                    self.compile_field(name, ty, &mut ops, &mut group)?;
                }
            }
        }
        flush_group(&mut ops, &mut group);

        self.in_progress.pop();
        let idx = self.programs.len();
        self.programs.push(Program {
            type_name: schema.name.clone(),
            ops,
            defaults,
        });
        self.index.insert(schema.name.clone(), idx);
        Ok(idx)
    }

    fn compile_field(
        &mut self,
        name: &str,
        ty: &FieldType,
        ops: &mut Vec<Op>,
        group: &mut Vec<(String, PrimitiveKind)>,
    ) -> Result<()> {
        match ty {
            FieldType::Primitive(kind) => {
                // CDR blocks hold fields of one natural width; ROS1 blocks
                // hold any run of adjacent primitives.
                let compatible = match (self.wire, group.last()) {
                    (_, None) => true,
                    (WireKind::Ros1, Some(_)) => true,
                    (WireKind::Cdr, Some((_, prev))) => prev.alignment() == kind.alignment(),
                };
                if !compatible {
                    flush_group(ops, group);
                }
                group.push((name.to_string(), *kind));
            }
            FieldType::String { kind, max_len } => {
                flush_group(ops, group);
                ops.push(Op::Str {
                    name: name.to_string(),
                    kind: *kind,
                    bound: *max_len,
                });
            }
            FieldType::Array { element, length } => {
                flush_group(ops, group);
                let elem = self.compile_elem(name, element)?;
                ops.push(Op::FixedArray {
                    name: name.to_string(),
                    elem,
                    len: *length,
                });
            }
            FieldType::Sequence { element, bound } => {
                flush_group(ops, group);
                let elem = self.compile_elem(name, element)?;
                ops.push(Op::Sequence {
                    name: name.to_string(),
                    elem,
                    bound: *bound,
                });
            }
            FieldType::Complex(type_name) => {
                flush_group(ops, group);
                let program = self.compile_complex(type_name)?;
                ops.push(Op::Nested {
                    name: name.to_string(),
                    program,
                });
            }
        }
        Ok(())
    }

    fn compile_elem(&mut self, field: &str, element: &FieldType) -> Result<Elem> {
        match element {
            FieldType::Primitive(kind) => Ok(Elem::Prim(*kind)),
            FieldType::String { kind, max_len } => Ok(Elem::Str {
                kind: *kind,
                bound: *max_len,
            }),
            FieldType::Complex(type_name) => {
                Ok(Elem::Nested(self.compile_complex(type_name)?))
            }
            FieldType::Array { .. } | FieldType::Sequence { .. } => Err(SchemaError::Parse {
                line: field.to_string(),
                reason: "nested container element types are not supported".to_string(),
            }
            .into()),
        }
    }

    fn compile_complex(&mut self, type_name: &str) -> Result<usize> {
        let schema = self
            .parsed
            .resolve(type_name)
            .ok_or_else(|| SchemaError::Unresolved {
                type_name: type_name.to_string(),
            })?
            .clone();
        self.compile_type(&schema)
    }
}

fn flush_group(ops: &mut Vec<Op>, group: &mut Vec<(String, PrimitiveKind)>) {
    if !group.is_empty() {
        ops.push(Op::PrimitiveBlock(std::mem::take(group)));
    }
}

// ============================================================================
// Decode interpreter
// ============================================================================

impl CompiledSchema {
    /// The wire codec this routine is bound to.
    pub fn wire(&self) -> WireKind {
        self.wire
    }

    /// The root type name.
    pub fn type_name(&self) -> &str {
        &self.programs[self.root].type_name
    }

    /// Decode a payload into a message.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedMessage> {
        match self.wire {
            WireKind::Cdr => {
                let mut decoder = CdrDecoder::new(data)?;
                self.run_decode(self.root, &mut decoder)
            }
            WireKind::Ros1 => {
                let mut decoder = Ros1Decoder::new(data);
                self.run_decode(self.root, &mut decoder)
            }
        }
    }

    /// Encode a message into a payload (header included for CDR).
    pub fn encode(&self, message: &DecodedMessage) -> Result<Vec<u8>> {
        match self.wire {
            WireKind::Cdr => {
                let mut encoder = CdrEncoder::new();
                self.run_encode(self.root, message, &mut encoder)?;
                Ok(encoder.into_bytes())
            }
            WireKind::Ros1 => {
                let mut encoder = Ros1Encoder::new();
                self.run_encode(self.root, message, &mut encoder)?;
                Ok(encoder.into_bytes())
            }
        }
    }

    fn run_decode<D: WireDecoder>(&self, program: usize, decoder: &mut D) -> Result<DecodedMessage> {
        let mut message = DecodedMessage::new();
        for op in &self.programs[program].ops {
            match op {
                Op::Constants(consts) => {
                    for (name, value) in consts {
                        message.insert(name.clone(), value.clone());
                    }
                }
                Op::PrimitiveBlock(fields) => {
                    for (name, kind) in fields {
                        message.insert(name.clone(), decode_prim(*kind, decoder)?);
                    }
                }
                Op::Str { name, kind, .. } => {
                    let value = match kind {
                        StringKind::String => decoder.read_string()?,
                        StringKind::WString => decoder.read_wstring()?,
                    };
                    message.insert(name.clone(), Value::String(value));
                }
                Op::FixedArray { name, elem, len } => {
                    message.insert(name.clone(), self.decode_elems(elem, *len, decoder)?);
                }
                Op::Sequence { name, elem, .. } => {
                    decoder.align(4)?;
                    let count = decoder.read_u32()? as usize;
                    message.insert(name.clone(), self.decode_elems(elem, count, decoder)?);
                }
                Op::Nested { name, program } => {
                    let nested = self.run_decode(*program, decoder)?;
                    message.insert(name.clone(), Value::Struct(nested));
                }
            }
        }
        Ok(message)
    }

    fn decode_elems<D: WireDecoder>(
        &self,
        elem: &Elem,
        count: usize,
        decoder: &mut D,
    ) -> Result<Value> {
        match elem {
            // Byte arrays are one contiguous copy
            Elem::Prim(PrimitiveKind::UInt8) | Elem::Prim(PrimitiveKind::Byte) => {
                Ok(Value::Bytes(decoder.read_bytes(count)?.to_vec()))
            }
            Elem::Prim(kind) => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(decode_prim(*kind, decoder)?);
                }
                Ok(Value::Array(values))
            }
            Elem::Str { kind, .. } => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let value = match kind {
                        StringKind::String => decoder.read_string()?,
                        StringKind::WString => decoder.read_wstring()?,
                    };
                    values.push(Value::String(value));
                }
                Ok(Value::Array(values))
            }
            Elem::Nested(program) => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(Value::Struct(self.run_decode(*program, decoder)?));
                }
                Ok(Value::Array(values))
            }
        }
    }

    fn run_encode<E: WireEncoder>(
        &self,
        program: usize,
        message: &DecodedMessage,
        encoder: &mut E,
    ) -> Result<()> {
        let prog = &self.programs[program];
        for op in &prog.ops {
            match op {
                Op::Constants(_) => {}
                Op::PrimitiveBlock(fields) => {
                    for (name, kind) in fields {
                        let value = field_value(prog, message, name)?;
                        encode_prim(*kind, value, encoder)?;
                    }
                }
                Op::Str { name, kind, bound } => {
                    let value = field_value(prog, message, name)?;
                    encode_str(*kind, *bound, value, encoder)?;
                }
                Op::FixedArray { name, elem, len } => {
                    let value = field_value(prog, message, name)?;
                    let actual = elem_count(value)?;
                    if actual != *len {
                        return Err(SchemaError::ArraySize {
                            expected: *len,
                            actual,
                        }
                        .into());
                    }
                    self.encode_elems(elem, value, encoder)?;
                }
                Op::Sequence { name, elem, bound } => {
                    let value = field_value(prog, message, name)?;
                    let count = elem_count(value)?;
                    if let Some(bound) = bound {
                        if count > *bound {
                            return Err(SchemaError::SequenceBound {
                                bound: *bound,
                                actual: count,
                            }
                            .into());
                        }
                    }
                    encoder.align(4);
                    encoder.write_u32(count as u32);
                    self.encode_elems(elem, value, encoder)?;
                }
                Op::Nested { name, program } => {
                    let value = field_value(prog, message, name)?;
                    let nested = value.as_struct().ok_or(CodecError::TypeMismatch {
                        expected: "struct",
                        actual: value.type_name(),
                    })?;
                    self.run_encode(*program, nested, encoder)?;
                }
            }
        }
        Ok(())
    }

    fn encode_elems<E: WireEncoder>(
        &self,
        elem: &Elem,
        value: &Value,
        encoder: &mut E,
    ) -> Result<()> {
        match (elem, value) {
            (Elem::Prim(PrimitiveKind::UInt8), Value::Bytes(bytes))
            | (Elem::Prim(PrimitiveKind::Byte), Value::Bytes(bytes)) => {
                encoder.write_bytes(bytes);
                Ok(())
            }
            (Elem::Prim(kind), Value::Array(values)) => {
                for item in values {
                    encode_prim(*kind, item, encoder)?;
                }
                Ok(())
            }
            (Elem::Str { kind, bound }, Value::Array(values)) => {
                for item in values {
                    encode_str(*kind, *bound, item, encoder)?;
                }
                Ok(())
            }
            (Elem::Nested(program), Value::Array(values)) => {
                for item in values {
                    let nested = item.as_struct().ok_or(CodecError::TypeMismatch {
                        expected: "struct",
                        actual: item.type_name(),
                    })?;
                    self.run_encode(*program, nested, encoder)?;
                }
                Ok(())
            }
            (_, other) => Err(CodecError::TypeMismatch {
                expected: "array",
                actual: other.type_name(),
            }
            .into()),
        }
    }
}

fn field_value<'a>(
    prog: &'a Program,
    message: &'a DecodedMessage,
    name: &str,
) -> Result<&'a Value> {
    if let Some(value) = message.get(name) {
        return Ok(value);
    }
    if let Some(default) = prog.defaults.get(name) {
        return Ok(default);
    }
    Err(SchemaError::MissingField {
        name: name.to_string(),
    }
    .into())
}

fn elem_count(value: &Value) -> Result<usize> {
    match value {
        Value::Array(values) => Ok(values.len()),
        Value::Bytes(bytes) => Ok(bytes.len()),
        other => Err(CodecError::TypeMismatch {
            expected: "array",
            actual: other.type_name(),
        }
        .into()),
    }
}

fn decode_prim<D: WireDecoder>(kind: PrimitiveKind, decoder: &mut D) -> Result<Value> {
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(decoder.read_bool()?),
        PrimitiveKind::Int8 | PrimitiveKind::Char => Value::Int8(decoder.read_i8()?),
        PrimitiveKind::UInt8 | PrimitiveKind::Byte => Value::UInt8(decoder.read_u8()?),
        PrimitiveKind::Int16 => Value::Int16(decoder.read_i16()?),
        PrimitiveKind::UInt16 => Value::UInt16(decoder.read_u16()?),
        PrimitiveKind::Int32 => Value::Int32(decoder.read_i32()?),
        PrimitiveKind::UInt32 => Value::UInt32(decoder.read_u32()?),
        PrimitiveKind::Int64 => Value::Int64(decoder.read_i64()?),
        PrimitiveKind::UInt64 => Value::UInt64(decoder.read_u64()?),
        PrimitiveKind::Float32 => Value::Float32(decoder.read_f32()?),
        PrimitiveKind::Float64 => Value::Float64(decoder.read_f64()?),
        PrimitiveKind::Time => Value::Time(decoder.read_time()?),
        PrimitiveKind::Duration => Value::Duration(decoder.read_duration()?),
    })
}

fn int_for<E: WireEncoder>(
    kind: PrimitiveKind,
    value: &Value,
    encoder: &mut E,
    write: impl FnOnce(&mut E, i128),
) -> Result<()> {
    let raw = value.as_i128().ok_or(CodecError::TypeMismatch {
        expected: kind.as_str(),
        actual: value.type_name(),
    })?;
    if !kind.fits(raw) {
        return Err(CodecError::Overflow {
            value: raw,
            target: kind.as_str(),
        }
        .into());
    }
    write(encoder, raw);
    Ok(())
}

fn encode_prim<E: WireEncoder>(kind: PrimitiveKind, value: &Value, encoder: &mut E) -> Result<()> {
    match kind {
        PrimitiveKind::Bool => match value {
            Value::Bool(v) => {
                encoder.write_bool(*v);
                Ok(())
            }
            other => int_for(kind, other, encoder, |e, raw| e.write_bool(raw != 0)),
        },
        PrimitiveKind::Int8 | PrimitiveKind::Char => {
            int_for(kind, value, encoder, |e, raw| e.write_i8(raw as i8))
        }
        PrimitiveKind::UInt8 | PrimitiveKind::Byte => {
            int_for(kind, value, encoder, |e, raw| e.write_u8(raw as u8))
        }
        PrimitiveKind::Int16 => int_for(kind, value, encoder, |e, raw| e.write_i16(raw as i16)),
        PrimitiveKind::UInt16 => int_for(kind, value, encoder, |e, raw| e.write_u16(raw as u16)),
        PrimitiveKind::Int32 => int_for(kind, value, encoder, |e, raw| e.write_i32(raw as i32)),
        PrimitiveKind::UInt32 => int_for(kind, value, encoder, |e, raw| e.write_u32(raw as u32)),
        PrimitiveKind::Int64 => int_for(kind, value, encoder, |e, raw| e.write_i64(raw as i64)),
        PrimitiveKind::UInt64 => int_for(kind, value, encoder, |e, raw| e.write_u64(raw as u64)),
        PrimitiveKind::Float32 => {
            let raw = value.as_f64().ok_or(CodecError::TypeMismatch {
                expected: "float32",
                actual: value.type_name(),
            })?;
            encoder.write_f32(raw as f32);
            Ok(())
        }
        PrimitiveKind::Float64 => {
            let raw = value.as_f64().ok_or(CodecError::TypeMismatch {
                expected: "float64",
                actual: value.type_name(),
            })?;
            encoder.write_f64(raw);
            Ok(())
        }
        PrimitiveKind::Time => match value {
            Value::Time(nanos) => {
                encoder.write_time(*nanos);
                Ok(())
            }
            other => int_for(kind, other, encoder, |e, raw| e.write_time(raw as i64)),
        },
        PrimitiveKind::Duration => match value {
            Value::Duration(nanos) => {
                encoder.write_duration(*nanos);
                Ok(())
            }
            other => int_for(kind, other, encoder, |e, raw| e.write_duration(raw as i64)),
        },
    }
}

fn encode_str<E: WireEncoder>(
    kind: StringKind,
    bound: Option<usize>,
    value: &Value,
    encoder: &mut E,
) -> Result<()> {
    let text = value.as_str().ok_or(CodecError::TypeMismatch {
        expected: "string",
        actual: value.type_name(),
    })?;
    let measured = match kind {
        StringKind::String => text.len(),
        StringKind::WString => text.encode_utf16().count(),
    };
    if let Some(bound) = bound {
        if measured > bound {
            return Err(SchemaError::StringBound {
                bound,
                actual: measured,
            }
            .into());
        }
    }
    match kind {
        StringKind::String => encoder.write_string(text),
        StringKind::WString => encoder.write_wstring(text),
    }
    Ok(())
}

// ============================================================================
// Cached codec facade
// ============================================================================

/// Cache of compiled routines, keyed by type name.
///
/// Writers key by message type; readers maintain their own schema-id map
/// over the same [`CompiledSchema`] values. The cache lives as long as its
/// owning reader/writer.
pub struct SchemaCodec {
    wire: WireKind,
    compiled: HashMap<String, Arc<CompiledSchema>>,
}

impl SchemaCodec {
    /// Create a cache bound to one wire codec.
    pub fn new(wire: WireKind) -> Self {
        Self {
            wire,
            compiled: HashMap::new(),
        }
    }

    /// Compile (or fetch) the routine for a parsed schema.
    pub fn get_or_compile(&mut self, parsed: &ParsedSchema) -> Result<Arc<CompiledSchema>> {
        if let Some(compiled) = self.compiled.get(&parsed.root.name) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(compile_schema(parsed, self.wire)?);
        self.compiled
            .insert(parsed.root.name.clone(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached routines.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_ros1msg, parse_ros2msg};

    fn vec3() -> ParsedSchema {
        parse_ros2msg(
            "geometry_msgs/msg/Vector3",
            "float64 x\nfloat64 y\nfloat64 z",
        )
        .unwrap()
    }

    #[test]
    fn test_vector3_cdr_wire_layout() {
        let compiled = compile_schema(&vec3(), WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("x".to_string(), Value::Float64(1.0));
        message.insert("y".to_string(), Value::Float64(2.0));
        message.insert("z".to_string(), Value::Float64(3.0));

        let bytes = compiled.encode(&message).unwrap();
        // 4-byte header + three unpadded doubles
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..4], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&bytes[4..12], &1.0f64.to_le_bytes());
        assert_eq!(&bytes[12..20], &2.0f64.to_le_bytes());
        assert_eq!(&bytes[20..28], &3.0f64.to_le_bytes());

        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_empty_sequence_between_fields() {
        let parsed = parse_ros2msg(
            "test_msgs/msg/Gap",
            "uint32 before\nuint32[] middle\nuint32 after",
        )
        .unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("before".to_string(), Value::UInt32(1));
        message.insert("middle".to_string(), Value::Array(vec![]));
        message.insert("after".to_string(), Value::UInt32(2));

        let bytes = compiled.encode(&message).unwrap();
        assert_eq!(
            &bytes[4..],
            &[0x01, 0, 0, 0, 0x00, 0, 0, 0, 0x02, 0, 0, 0]
        );
        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_fixed_array_size_checked() {
        let parsed = parse_ros2msg("test_msgs/msg/Fix", "int32[5] data").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert(
            "data".to_string(),
            Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
        );
        match compiled.encode(&message) {
            Err(crate::core::Error::Schema(SchemaError::ArraySize { expected, actual })) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bounded_sequence_checked() {
        let parsed = parse_ros2msg("test_msgs/msg/Bounded", "int32[<=2] data").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert(
            "data".to_string(),
            Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]),
        );
        match compiled.encode(&message) {
            Err(crate::core::Error::Schema(SchemaError::SequenceBound { bound, actual })) => {
                assert_eq!(bound, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bounded_string_checked() {
        let parsed = parse_ros2msg("test_msgs/msg/S", "string<=3 name").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("name".to_string(), Value::String("toolong".to_string()));
        match compiled.encode(&message) {
            Err(crate::core::Error::Schema(SchemaError::StringBound { bound, actual })) => {
                assert_eq!(bound, 3);
                assert_eq!(actual, 7);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_overflow_detected() {
        let parsed = parse_ros2msg("test_msgs/msg/Small", "int8 v").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("v".to_string(), Value::Int32(1000));
        match compiled.encode(&message) {
            Err(crate::core::Error::Codec(CodecError::Overflow { value, target })) => {
                assert_eq!(value, 1000);
                assert_eq!(target, "int8");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_nested_struct_round_trip() {
        let parsed = parse_ros2msg(
            "geometry_msgs/msg/Twist",
            "geometry_msgs/Vector3 linear\n\
             geometry_msgs/Vector3 angular\n\
             ================================================================================\n\
             MSG: geometry_msgs/msg/Vector3\n\
             float64 x\nfloat64 y\nfloat64 z",
        )
        .unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut vec = DecodedMessage::new();
        vec.insert("x".to_string(), Value::Float64(0.5));
        vec.insert("y".to_string(), Value::Float64(-1.5));
        vec.insert("z".to_string(), Value::Float64(9.0));
        let mut message = DecodedMessage::new();
        message.insert("linear".to_string(), Value::Struct(vec.clone()));
        message.insert("angular".to_string(), Value::Struct(vec));

        let bytes = compiled.encode(&message).unwrap();
        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_cycle_detected() {
        let parsed = parse_ros2msg(
            "test_msgs/msg/A",
            "test_msgs/B child\n\
             ================================================================================\n\
             MSG: test_msgs/B\n\
             test_msgs/A parent",
        )
        .unwrap();
        match compile_schema(&parsed, WireKind::Cdr) {
            Err(crate::core::Error::Schema(SchemaError::Cycle { .. })) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let parsed = parse_ros2msg("test_msgs/msg/A", "test_msgs/Missing child").unwrap();
        match compile_schema(&parsed, WireKind::Cdr) {
            Err(crate::core::Error::Schema(SchemaError::Unresolved { type_name })) => {
                assert_eq!(type_name, "test_msgs/msg/Missing");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_ros1_string_round_trip() {
        let parsed = parse_ros1msg("std_msgs/String", "string data").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Ros1).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("data".to_string(), Value::String("hi".to_string()));

        let bytes = compiled.encode(&message).unwrap();
        // uint32 byte length, payload, no NUL, no header
        assert_eq!(bytes, vec![0x02, 0x00, 0x00, 0x00, b'h', b'i']);
        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_ros1_header_with_time() {
        let parsed = parse_ros1msg(
            "std_msgs/Header",
            "uint32 seq\ntime stamp\nstring frame_id",
        )
        .unwrap();
        let compiled = compile_schema(&parsed, WireKind::Ros1).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("seq".to_string(), Value::UInt32(7));
        message.insert("stamp".to_string(), Value::Time(1_000_000_500));
        message.insert("frame_id".to_string(), Value::String("map".to_string()));

        let bytes = compiled.encode(&message).unwrap();
        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_constants_materialise_on_decode() {
        let parsed = parse_ros1msg("test_msgs/Mode", "uint8 MODE_A=1\nuint8 mode").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Ros1).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("mode".to_string(), Value::UInt8(1));
        let bytes = compiled.encode(&message).unwrap();
        assert_eq!(bytes, vec![1]);

        let decoded = compiled.decode(&bytes).unwrap();
        assert_eq!(decoded.get("MODE_A"), Some(&Value::UInt8(1)));
        assert_eq!(decoded.get("mode"), Some(&Value::UInt8(1)));
    }

    #[test]
    fn test_byte_sequence_decodes_to_bytes() {
        let parsed = parse_ros2msg("test_msgs/msg/Blob", "uint8[] data").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("data".to_string(), Value::Bytes(vec![9, 8, 7]));
        let bytes = compiled.encode(&message).unwrap();
        assert_eq!(compiled.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let parsed = parse_ros2msg("test_msgs/msg/D", "uint8 battery 100\nuint8 mode").unwrap();
        let compiled = compile_schema(&parsed, WireKind::Cdr).unwrap();

        let mut message = DecodedMessage::new();
        message.insert("mode".to_string(), Value::UInt8(2));
        let bytes = compiled.encode(&message).unwrap();

        let decoded = compiled.decode(&bytes).unwrap();
        assert_eq!(decoded.get("battery"), Some(&Value::UInt8(100)));
    }

    #[test]
    fn test_codec_cache_reuses_programs() {
        let mut codec = SchemaCodec::new(WireKind::Cdr);
        let first = codec.get_or_compile(&vec3()).unwrap();
        let second = codec.get_or_compile(&vec3()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(codec.len(), 1);
    }
}
