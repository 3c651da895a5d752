/// Bundled node libraries
///
/// Ready-made node functions and tools that can be handed to the engine.

// Code review loop: function extraction, complexity, smells, quality gate
pub mod code_review;
