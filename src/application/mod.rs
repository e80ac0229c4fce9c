// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal: turning a checkpoint into an artifact, or checking
// that an artifact still runs.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1); progress is reported
//     through event callbacks
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Checkpoint → ONNX artifact
pub mod export_use_case;

// Artifact smoke test
pub mod verify_use_case;
