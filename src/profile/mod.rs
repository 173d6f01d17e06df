//! Candidate profile and the interview instructions generated from it
//!
//! The profile is static data compiled into the binary. Instructions are a
//! pure function of the profile and are generated once at startup.

mod instructions;
mod record;

pub use instructions::instructions;
pub use record::Profile;
