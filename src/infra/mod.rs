// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches files or a foreign runtime:
//
//   checkpoint.rs — Loading trained weights
//                   PyTorch state dicts (.pth/.pt) through
//                   burn-store, or burn records (.mpk) with a
//                   JSON architecture sidecar.
//
//   onnx/         — The portable artifact
//                   prost messages for the ONNX schema, the
//                   lowering from LstmAutoencoder to a graph,
//                   and atomic read/write of the file.
//
//   session.rs    — Running an artifact
//                   tract-onnx loads the file and runs it on
//                   concrete input shapes.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Records and Recorders)

/// Trained weight loading and saving
pub mod checkpoint;

/// ONNX artifact encoding, lowering and file I/O
pub mod onnx;

/// tract-backed inference over an artifact
pub mod session;
