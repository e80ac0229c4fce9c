// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the pipeline moves around:
// the fixed interface contract of the ECG model, the shape
// constraint with its symbolic batch axis, the probe tensor
// used by the verifier and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn or tract types
//   - NO file I/O
//   - Only structs, enums and the functions that check them

// File names, tensor names and the architecture descriptor
pub mod contract;

// Shape constraint with one symbolic (batch) dimension
pub mod shape;

// Random input used to exercise an inference session
pub mod probe;

// Typed failures of the export / verify pipeline
pub mod error;
