pub mod family_repo;

pub use family_repo::{FamilyError, FamilyRepository, MemberInput};
