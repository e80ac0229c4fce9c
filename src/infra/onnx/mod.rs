// ============================================================
// Layer 6 — ONNX Artifact I/O
// ============================================================
// Reading and writing the portable artifact as an ONNX
// ModelProto, plus conversions between the domain's shape
// types and ONNX's TensorShapeProto. The message types are
// the ones tract-onnx generates from onnx.proto, so the file
// we write and the graph tract runs share one schema.
//
//   lower.rs — turns an LstmAutoencoder into a ModelProto
//
// Writes are atomic: bytes go to a temp file next to the
// target which is then renamed over it, so a failed export
// never leaves a truncated artifact behind.

pub mod lower;

use std::{
    collections::HashSet,
    io::Write,
    ops::RangeInclusive,
    path::Path,
};

use anyhow::{Context, Result};
use prost::Message;
use tempfile::NamedTempFile;
use tract_onnx::{prelude::Framework, Onnx};

pub use tract_onnx::pb;

use crate::domain::{contract::TensorSpec, error::PipelineError, shape::Dim};
use pb::{
    tensor_proto::DataType,
    tensor_shape_proto::{dimension, Dimension},
    type_proto, ModelProto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// Default-domain opsets the verifier accepts.
pub const SUPPORTED_OPSETS: RangeInclusive<i64> = 9..=18;

/// Encode `model` and atomically replace `path` with it.
/// Returns the number of bytes written.
pub fn write_model(model: &ModelProto, path: &Path) -> Result<u64> {
    let bytes = model.encode_to_vec();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Cannot create temp file in '{}'", dir.display()))?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Cannot write artifact '{}'", path.display()))?;

    Ok(bytes.len() as u64)
}

/// Read and decode an artifact with `framework`'s parser.
/// Any failure is an `ArtifactLoad` error.
pub fn read_model(framework: &Onnx, path: &Path) -> Result<ModelProto, PipelineError> {
    let model = framework
        .proto_model_for_path(path)
        .map_err(|e| PipelineError::artifact_load(path, format!("{e:#}")))?;
    if model.graph.is_none() {
        return Err(PipelineError::artifact_load(path, "model has no graph"));
    }
    Ok(model)
}

/// Version of the default ("" or "ai.onnx") operator set, if declared.
pub fn default_opset(model: &ModelProto) -> Option<i64> {
    model
        .opset_import
        .iter()
        .find(|op| op.domain.is_empty() || op.domain == "ai.onnx")
        .map(|op| op.version)
}

/// Reject artifacts whose default opset is outside `SUPPORTED_OPSETS`.
pub fn check_opset(model: &ModelProto, path: &Path) -> Result<i64, PipelineError> {
    let version = default_opset(model)
        .ok_or_else(|| PipelineError::artifact_load(path, "no default-domain opset declared"))?;
    if !SUPPORTED_OPSETS.contains(&version) {
        return Err(PipelineError::artifact_load(
            path,
            format!(
                "unsupported opset {version} (supported {}..={})",
                SUPPORTED_OPSETS.start(),
                SUPPORTED_OPSETS.end()
            ),
        ));
    }
    Ok(version)
}

/// Graph inputs that are real inputs. Older exporters also list
/// every initializer as an input; those are skipped.
pub fn declared_inputs(model: &ModelProto) -> Vec<TensorSpec> {
    let Some(graph) = &model.graph else {
        return Vec::new();
    };
    let initializers: HashSet<&str> = graph.initializer.iter().map(|t| t.name.as_str()).collect();
    graph
        .input
        .iter()
        .filter(|v| !initializers.contains(v.name.as_str()))
        .map(tensor_spec)
        .collect()
}

pub fn declared_outputs(model: &ModelProto) -> Vec<TensorSpec> {
    model
        .graph
        .as_ref()
        .map(|g| g.output.iter().map(tensor_spec).collect())
        .unwrap_or_default()
}

fn tensor_spec(value: &ValueInfoProto) -> TensorSpec {
    let dims = match value.r#type.as_ref().and_then(|t| t.value.as_ref()) {
        Some(type_proto::Value::TensorType(t)) => t
            .shape
            .as_ref()
            .map(|s| s.dim.iter().map(dim_from_proto).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    };
    TensorSpec::new(value.name.clone(), dims)
}

fn dim_from_proto(dim: &Dimension) -> Dim {
    match &dim.value {
        Some(dimension::Value::DimValue(n)) if *n >= 0 => Dim::Fixed(*n as usize),
        Some(dimension::Value::DimParam(s)) => Dim::Symbolic(s.clone()),
        // Unnamed or negative dims are unknown; give them a placeholder symbol
        _ => Dim::Symbolic("?".to_string()),
    }
}

fn dim_to_proto(dim: &Dim) -> Dimension {
    let value = match dim {
        Dim::Fixed(n)    => dimension::Value::DimValue(*n as i64),
        Dim::Symbolic(s) => dimension::Value::DimParam(s.clone()),
    };
    Dimension { value: Some(value), ..Default::default() }
}

/// A float tensor `ValueInfoProto` with the given declared dims.
pub fn float_value_info(name: &str, dims: &[Dim]) -> ValueInfoProto {
    let shape = TensorShapeProto { dim: dims.iter().map(dim_to_proto).collect() };
    let tensor = type_proto::Tensor { elem_type: DataType::Float as i32, shape: Some(shape) };
    ValueInfoProto {
        name:   name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(tensor)),
            ..Default::default()
        }),
        ..Default::default()
    }
}
