// ============================================================
// Layer 6 — Lowering the Autoencoder to ONNX
// ============================================================
// Rust has no tracer, so the graph is written out explicitly.
// The result is what torch.onnx.export produces for a
// batch-first two-stage nn.LSTM stack at opset 14:
//
//   input [N, S, F]
//     └─ Transpose(perm=[1,0,2])        → [S, N, F]
//   per layer (encoder l0..lk, then decoder l0..lk):
//     └─ LSTM(X, W, R, B)               → Y [S, 1, N, H]
//     └─ Squeeze(axes=[1])              → [S, N, H]
//   └─ Transpose(perm=[1,0,2])          → output [N, S, F]
//
// ONNX orders gate blocks i, o, f, c where torch uses i, f, g, o,
// and wants both biases in one [1, 8H] tensor. Those rewrites
// happen here, once, so the graph carries ready-to-use constants.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use super::{
    float_value_info,
    pb::{
        attribute_proto::AttributeType, tensor_proto::DataType, AttributeProto, GraphProto,
        ModelProto, NodeProto, OperatorSetIdProto, StringStringEntryProto, TensorProto,
        ValueInfoProto,
    },
};
use crate::domain::{
    contract::{ARTIFACT_FILE, INPUT_NAME, IR_VERSION, OPSET_VERSION, OUTPUT_NAME},
    shape::ShapeContract,
};
use crate::ml::{
    lstm::LstmLayer,
    model::{LstmAutoencoder, LstmAutoencoderConfig},
};

/// torch gate block → position in the ONNX layout (i, o, f, c).
const ONNX_GATE_ORDER: [usize; 4] = [0, 3, 1, 2];

/// Swap [1, 0, 2]: batch-first ↔ sequence-first.
const BATCH_SEQ_SWAP: [i64; 3] = [1, 0, 2];

// ─── GraphBuilder ────────────────────────────────────────────────────────────
/// Accumulates nodes, initializers and I/O declarations for one graph.
pub struct GraphBuilder {
    name:         String,
    nodes:        Vec<NodeProto>,
    initializers: Vec<TensorProto>,
    inputs:       Vec<ValueInfoProto>,
    outputs:      Vec<ValueInfoProto>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:         name.into(),
            nodes:        Vec::new(),
            initializers: Vec::new(),
            inputs:       Vec::new(),
            outputs:      Vec::new(),
        }
    }

    /// Declare a float graph input with `contract`'s dims.
    pub fn input(&mut self, name: &str, contract: &ShapeContract) -> String {
        self.inputs.push(float_value_info(name, &contract.dims()));
        name.to_string()
    }

    /// Declare a float graph output with `contract`'s dims.
    pub fn output(&mut self, name: &str, contract: &ShapeContract) {
        self.outputs.push(float_value_info(name, &contract.dims()));
    }

    pub fn initializer_f32(&mut self, name: &str, dims: &[usize], data: Vec<f32>) -> String {
        self.initializers.push(TensorProto {
            name:       name.to_string(),
            dims:       dims.iter().map(|&d| d as i64).collect(),
            data_type:  DataType::Float as i32,
            float_data: data,
            ..Default::default()
        });
        name.to_string()
    }

    pub fn initializer_i64(&mut self, name: &str, dims: &[usize], data: Vec<i64>) -> String {
        self.initializers.push(TensorProto {
            name:       name.to_string(),
            dims:       dims.iter().map(|&d| d as i64).collect(),
            data_type:  DataType::Int64 as i32,
            int64_data: data,
            ..Default::default()
        });
        name.to_string()
    }

    /// Append a node with a single output called `output`.
    pub fn node(
        &mut self,
        op_type:    &str,
        inputs:     &[&str],
        output:     &str,
        attributes: Vec<AttributeProto>,
    ) -> String {
        self.nodes.push(NodeProto {
            name:      format!("{op_type}_{}", self.nodes.len()),
            op_type:   op_type.to_string(),
            input:     inputs.iter().map(|s| s.to_string()).collect(),
            output:    vec![output.to_string()],
            attribute: attributes,
            ..Default::default()
        });
        output.to_string()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Wrap the graph in a model targeting the default domain at `opset`.
    pub fn finish(self, opset: i64) -> ModelProto {
        ModelProto {
            ir_version:       IR_VERSION,
            opset_import:     vec![OperatorSetIdProto { domain: String::new(), version: opset }],
            producer_name:    env!("CARGO_PKG_NAME").to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            graph: Some(GraphProto {
                name:        self.name,
                node:        self.nodes,
                initializer: self.initializers,
                input:       self.inputs,
                output:      self.outputs,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub fn attr_int(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name:   name.to_string(),
        i:      value,
        r#type: AttributeType::Int as i32,
        ..Default::default()
    }
}

pub fn attr_ints(name: &str, values: &[i64]) -> AttributeProto {
    AttributeProto {
        name:   name.to_string(),
        ints:   values.to_vec(),
        r#type: AttributeType::Ints as i32,
        ..Default::default()
    }
}

pub fn attr_string(name: &str, value: &str) -> AttributeProto {
    AttributeProto {
        name:   name.to_string(),
        s:      value.as_bytes().to_vec(),
        r#type: AttributeType::String as i32,
        ..Default::default()
    }
}

// ─── Gate reordering ─────────────────────────────────────────────────────────
/// Reorder the four gate blocks of a fused `[4 * hidden, row_len]`
/// row-major buffer from torch order (i, f, g, o) to ONNX order (i, o, f, c).
pub fn reorder_gates(data: &[f32], hidden: usize, row_len: usize) -> Vec<f32> {
    let block = hidden * row_len;
    ONNX_GATE_ORDER
        .iter()
        .flat_map(|&gate| data[gate * block..(gate + 1) * block].iter().copied())
        .collect()
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read parameter values: {e:?}"))
}

/// Emit LSTM + Squeeze for one layer. Returns the `[S, N, H]` output name.
fn lower_layer<B: Backend>(
    graph:  &mut GraphBuilder,
    prefix: &str,
    x:      &str,
    axes:   &str,
    layer:  &LstmLayer<B>,
) -> Result<String> {
    let h = layer.d_hidden;
    let [gates, d_input] = layer.weight_ih.val().dims();
    if gates != 4 * h {
        return Err(anyhow!("{prefix}: weight_ih has {gates} rows, expected {}", 4 * h));
    }

    let w = reorder_gates(&tensor_values(layer.weight_ih.val())?, h, d_input);
    let r = reorder_gates(&tensor_values(layer.weight_hh.val())?, h, h);
    let mut b = reorder_gates(&tensor_values(layer.bias_ih.val())?, h, 1);
    b.extend(reorder_gates(&tensor_values(layer.bias_hh.val())?, h, 1));

    let w = graph.initializer_f32(&format!("{prefix}.W"), &[1, 4 * h, d_input], w);
    let r = graph.initializer_f32(&format!("{prefix}.R"), &[1, 4 * h, h], r);
    let b = graph.initializer_f32(&format!("{prefix}.B"), &[1, 8 * h], b);

    let y = graph.node(
        "LSTM",
        &[x, w.as_str(), r.as_str(), b.as_str()],
        &format!("{prefix}.Y"),
        vec![
            attr_int("hidden_size", h as i64),
            attr_string("direction", "forward"),
        ],
    );
    Ok(graph.node("Squeeze", &[y.as_str(), axes], &format!("{prefix}.out"), Vec::new()))
}

/// Lower a loaded autoencoder to an ONNX model declaring `contract` for
/// both `input` and `output`. Parameters are embedded as initializers.
pub fn lower_autoencoder<B: Backend>(
    model:    &LstmAutoencoder<B>,
    config:   &LstmAutoencoderConfig,
    contract: &ShapeContract,
) -> Result<ModelProto> {
    let mut graph = GraphBuilder::new("lstm_autoencoder");

    let input = graph.input(INPUT_NAME, contract);
    let axes  = graph.initializer_i64("squeeze_axes", &[1], vec![1]);
    let mut x = graph.node(
        "Transpose",
        &[input.as_str()],
        "input_seq_major",
        vec![attr_ints("perm", &BATCH_SEQ_SWAP)],
    );

    for (slot, layer) in model.layers(config) {
        let prefix = format!("{}.l{}", slot.stage, slot.index);
        x = lower_layer(&mut graph, &prefix, &x, &axes, layer)?;
    }

    graph.node("Transpose", &[x.as_str()], OUTPUT_NAME, vec![attr_ints("perm", &BATCH_SEQ_SWAP)]);
    graph.output(OUTPUT_NAME, contract);

    tracing::debug!(
        "Lowered {} to {} ONNX nodes",
        config.descriptor(),
        graph.node_count()
    );

    let mut proto = graph.finish(OPSET_VERSION);
    proto.doc_string = format!("{} exported for {}", config.descriptor(), ARTIFACT_FILE);
    proto.metadata_props.push(StringStringEntryProto {
        key:   "architecture".to_string(),
        value: serde_json::to_string(&config.descriptor())?,
    });
    Ok(proto)
}
