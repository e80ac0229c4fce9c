// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn module code lives here. The infra layer reads the
// parameters of these modules (checkpoint loading, ONNX
// lowering) but never defines modules of its own.
//
//   lstm.rs  — one batch-first LSTM layer with PyTorch's fused
//              parameter layout
//   model.rs — stacked LSTM + the encoder/decoder autoencoder
//
// Models are instantiated on the NdArray backend without
// autodiff, which is burn's inference mode: dropout is a no-op
// and no gradient graph is recorded.

/// Single LSTM layer
pub mod lstm;

/// Stacked LSTM and the ECG autoencoder
pub mod model;
