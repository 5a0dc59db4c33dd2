//! Dex planning
//!
//! - [`policy`]: split policy and its validation
//! - [`predex`]: memoized per-unit dexing
//! - [`grouping`]: count-bounded first-fit grouping
//! - [`rclass`]: the generated resource code chain
//! - [`merge`]: merge mode selection and merge groups
//! - [`layout`]: planned container layout
//! - [`nonpredex`]: inputs of the whole-program step

pub mod grouping;
pub mod layout;
pub mod merge;
pub mod nonpredex;
pub mod policy;
pub mod predex;
pub mod rclass;

pub use grouping::{DexGroup, group_artifacts};
pub use layout::{DexOutput, DexOutputKind, MergeResult, ModuleDexOutputs};
pub use merge::{MergeMode, Obfuscation, SdkProguardConfig, select_merge_mode};
pub use nonpredex::NonPreDexedInputs;
pub use policy::{DexPolicy, DexStore, DexStrategy};
pub use predex::{ArtifactId, ArtifactSource, DexArtifact, DexArtifactRegistry};
pub use rclass::ResourceCodeShard;
