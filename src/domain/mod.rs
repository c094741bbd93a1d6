// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// The system's core concepts as plain Rust: posts, streams,
// labelled windows, and the traits the other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain structs and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A post from a daily stream, plus the per-ticker stream type
pub mod post;

// A labelled multi-day trading window
pub mod window;

// Core abstractions (traits) that other layers implement
pub mod traits;
