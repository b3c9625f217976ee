//! Top-level facade crate for the ladon policy replica.
//!
//! Re-exports the domain types and the replica runtime so users can depend on a single crate.

pub mod core {
    pub use ladon_core::*;
}

pub mod replica {
    pub use ladon_replica::*;
}
